use std::path::Path;
use tracing::{debug, warn};

use crate::errors::ZeronError;
use super::schema::CONFIG_SCHEMA;
use super::types::ZeronConfig;

const MAX_CONFIG_BYTES: u64 = 1_048_576;

pub async fn parse_config(path: &Path) -> Result<ZeronConfig, ZeronError> {
    if !path.exists() {
        return Err(ZeronError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(ZeronError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let config = parse_config_str(&content)?;
    debug!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

/// Parse and validate configuration text. An empty document yields the defaults.
pub fn parse_config_str(content: &str) -> Result<ZeronConfig, ZeronError> {
    if content.trim().is_empty() {
        return Ok(ZeronConfig::default());
    }

    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    if yaml.is_null() {
        return Ok(ZeronConfig::default());
    }

    validate_schema(&yaml)?;

    let config: ZeronConfig = serde_yaml::from_value(yaml)?;
    validate_semantics(&config)?;
    Ok(config)
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), ZeronError> {
    let json_value: serde_json::Value = serde_json::to_value(yaml)
        .map_err(|e| ZeronError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| ZeronError::Config(format!("Schema compilation error: {}", e)))?;

    let result = compiled.validate(&json_value);
    if let Err(errors) = result {
        let messages: Vec<String> = errors
            .map(|e| format!("{} at {}", e, e.instance_path))
            .collect();
        if !messages.is_empty() {
            return Err(ZeronError::Config(format!(
                "Config schema violations: {}",
                messages.join("; ")
            )));
        }
    }

    Ok(())
}

/// Checks the schema cannot express.
fn validate_semantics(config: &ZeronConfig) -> Result<(), ZeronError> {
    for (plan, limits) in &config.plans {
        if limits.max_endpoints == 0 || limits.max_payloads == 0 || limits.concurrency == 0 {
            return Err(ZeronError::Config(format!(
                "Plan '{}' limits must all be greater than zero",
                plan
            )));
        }
    }

    if config.exploit.confidence_threshold > 100 {
        return Err(ZeronError::Config(
            "exploit.confidence_threshold must be within 0-100".into(),
        ));
    }

    if config.surface.max_payloads_per_parameter < config.surface.payloads_per_category {
        warn!(
            max_payloads_per_parameter = config.surface.max_payloads_per_parameter,
            payloads_per_category = config.surface.payloads_per_category,
            "Per-parameter payload cap is below the per-category count; later categories will get no payloads"
        );
    }

    if config.discovery.crawl_max_depth == 0 {
        warn!("discovery.crawl_max_depth is 0; the crawler will only fetch the seed page");
    }

    Ok(())
}
