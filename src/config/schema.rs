use serde_json::{json, Value};
use std::sync::LazyLock;

const CATEGORIES: [&str; 16] = [
    "SQLi", "XSS", "SSRF", "PathTraversal", "RCE", "XXE", "LFI", "AuthBypass", "CSRF",
    "PrivilegeEscalation", "InformationDisclosure", "IDOR", "CORS", "OpenRedirect",
    "BusinessLogic", "DoS",
];

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    let caps: serde_json::Map<String, Value> = CATEGORIES
        .iter()
        .map(|c| (c.to_string(), json!({ "type": "integer", "minimum": 1 })))
        .collect();

    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "http": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "timeout_secs": { "type": "integer", "minimum": 1, "maximum": 300 },
                    "user_agent": { "type": "string", "minLength": 1 },
                    "max_body_bytes": { "type": "integer", "minimum": 1024 },
                    "default_scheme": { "type": "string", "enum": ["http", "https"] },
                    "accept_invalid_certs": { "type": "boolean" }
                }
            },
            "discovery": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "enable_wayback": { "type": "boolean" },
                    "enable_subdomains": { "type": "boolean" },
                    "wayback_limit": { "type": "integer", "minimum": 0 },
                    "max_script_files": { "type": "integer", "minimum": 0 },
                    "fuzz_wordlist_limit": { "type": "integer", "minimum": 0 },
                    "fuzz_delay_ms": { "type": "integer", "minimum": 0 },
                    "crawl_max_depth": { "type": "integer", "minimum": 0 },
                    "crawl_max_pages": { "type": "integer", "minimum": 0 },
                    "subdomain_verify_limit": { "type": "integer", "minimum": 0 }
                }
            },
            "surface": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "max_endpoints": { "type": "integer", "minimum": 1 },
                    "payloads_per_category": { "type": "integer", "minimum": 1 },
                    "max_payloads_per_parameter": { "type": "integer", "minimum": 1 }
                }
            },
            "exploit": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "confidence_threshold": { "type": "integer", "minimum": 0, "maximum": 100 },
                    "payloads_per_vector": { "type": "integer", "minimum": 1 },
                    "caps": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": caps
                    }
                }
            },
            "plans": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "basic": { "$ref": "#/definitions/limits" },
                    "pro": { "$ref": "#/definitions/limits" },
                    "enterprise": { "$ref": "#/definitions/limits" }
                }
            },
            "server": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "max_concurrent_scans": { "type": "integer", "minimum": 1 }
                }
            }
        },
        "definitions": {
            "limits": {
                "type": "object",
                "required": ["max_endpoints", "max_payloads", "concurrency"],
                "properties": {
                    "max_endpoints": { "type": "integer", "minimum": 1 },
                    "max_payloads": { "type": "integer", "minimum": 1 },
                    "concurrency": { "type": "integer", "minimum": 1 }
                }
            }
        }
    })
});
