use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::models::{Plan, PlanLimits, VulnCategory};

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ZeronConfig {
    pub http: HttpConfig,
    pub discovery: DiscoveryConfig,
    pub surface: SurfaceConfig,
    pub exploit: ExploitConfig,
    pub plans: HashMap<Plan, PlanLimits>,
    pub server: ServerConfig,
}

impl ZeronConfig {
    /// Limits for a plan, with any configured override applied.
    pub fn limits_for(&self, plan: Plan) -> PlanLimits {
        self.plans.get(&plan).copied().unwrap_or_else(|| plan.default_limits())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_body_bytes: usize,
    pub default_scheme: String,
    /// Skip TLS certificate validation (self-signed staging targets).
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: format!("zeron/{} (+security-scanner)", env!("CARGO_PKG_VERSION")),
            max_body_bytes: 2 * 1024 * 1024,
            default_scheme: "https".into(),
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub enable_wayback: bool,
    pub enable_subdomains: bool,
    pub wayback_limit: usize,
    pub max_script_files: usize,
    pub fuzz_wordlist_limit: usize,
    pub fuzz_delay_ms: u64,
    pub crawl_max_depth: usize,
    pub crawl_max_pages: usize,
    pub subdomain_verify_limit: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enable_wayback: true,
            enable_subdomains: true,
            wayback_limit: 1000,
            max_script_files: 10,
            fuzz_wordlist_limit: 30,
            fuzz_delay_ms: 200,
            crawl_max_depth: 3,
            crawl_max_pages: 100,
            subdomain_verify_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub max_endpoints: usize,
    pub payloads_per_category: usize,
    pub max_payloads_per_parameter: usize,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            max_endpoints: 50,
            payloads_per_category: 4,
            max_payloads_per_parameter: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExploitConfig {
    pub confidence_threshold: u8,
    pub payloads_per_vector: usize,
    /// Maximum vectors visited per category; categories absent here test every vector.
    pub caps: BTreeMap<VulnCategory, usize>,
}

impl Default for ExploitConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 60,
            payloads_per_vector: 6,
            caps: BTreeMap::from([
                (VulnCategory::Ssrf, 20),
                (VulnCategory::Rce, 20),
                (VulnCategory::InfoDisclosure, 30),
                (VulnCategory::Idor, 25),
                (VulnCategory::Cors, 15),
                (VulnCategory::OpenRedirect, 25),
                (VulnCategory::AuthBypass, 20),
                (VulnCategory::BusinessLogic, 25),
            ]),
        }
    }
}

impl ExploitConfig {
    pub fn cap_for(&self, category: VulnCategory) -> Option<usize> {
        self.caps.get(&category).copied()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub max_concurrent_scans: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { max_concurrent_scans: 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ZeronConfig::default();
        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.discovery.wayback_limit, 1000);
        assert_eq!(config.surface.max_endpoints, 50);
        assert_eq!(config.exploit.confidence_threshold, 60);
        assert_eq!(config.exploit.cap_for(VulnCategory::Cors), Some(15));
        assert_eq!(config.exploit.cap_for(VulnCategory::Xss), None);
    }

    #[test]
    fn test_plan_override() {
        let yaml = "plans:\n  basic:\n    max_endpoints: 3\n    max_payloads: 30\n    concurrency: 2\n";
        let config: ZeronConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.limits_for(Plan::Basic).max_endpoints, 3);
        assert_eq!(config.limits_for(Plan::Pro), Plan::Pro.default_limits());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let yaml = "exploit:\n  caps:\n    CORS: 5\n";
        let config: ZeronConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.exploit.cap_for(VulnCategory::Cors), Some(5));
        // Replacing the map drops the other default caps
        assert_eq!(config.exploit.cap_for(VulnCategory::Ssrf), None);
        assert_eq!(config.exploit.confidence_threshold, 60);
    }
}
