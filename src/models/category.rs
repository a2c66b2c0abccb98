use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of vulnerability categories handled by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VulnCategory {
    #[serde(rename = "SQLi")]
    Sqli,
    #[serde(rename = "XSS")]
    Xss,
    #[serde(rename = "SSRF")]
    Ssrf,
    PathTraversal,
    #[serde(rename = "RCE")]
    Rce,
    #[serde(rename = "XXE")]
    Xxe,
    #[serde(rename = "LFI")]
    Lfi,
    AuthBypass,
    #[serde(rename = "CSRF")]
    Csrf,
    PrivilegeEscalation,
    #[serde(rename = "InformationDisclosure", alias = "InfoDisclosure")]
    InfoDisclosure,
    #[serde(rename = "IDOR")]
    Idor,
    #[serde(rename = "CORS")]
    Cors,
    OpenRedirect,
    BusinessLogic,
    #[serde(rename = "DoS")]
    Dos,
}

/// Order in which the exploitation engine visits categories.
pub const EXPLOIT_ORDER: [VulnCategory; 10] = [
    VulnCategory::Xss,
    VulnCategory::Sqli,
    VulnCategory::Ssrf,
    VulnCategory::Rce,
    VulnCategory::InfoDisclosure,
    VulnCategory::Idor,
    VulnCategory::Cors,
    VulnCategory::OpenRedirect,
    VulnCategory::AuthBypass,
    VulnCategory::BusinessLogic,
];

/// Order in which payload templates are generated for a parameter.
pub const PAYLOAD_PRIORITY: [VulnCategory; 10] = [
    VulnCategory::Sqli,
    VulnCategory::Xss,
    VulnCategory::Ssrf,
    VulnCategory::PathTraversal,
    VulnCategory::Rce,
    VulnCategory::Xxe,
    VulnCategory::Lfi,
    VulnCategory::AuthBypass,
    VulnCategory::Csrf,
    VulnCategory::PrivilegeEscalation,
];

impl VulnCategory {
    pub const ALL: [VulnCategory; 16] = [
        VulnCategory::Sqli,
        VulnCategory::Xss,
        VulnCategory::Ssrf,
        VulnCategory::PathTraversal,
        VulnCategory::Rce,
        VulnCategory::Xxe,
        VulnCategory::Lfi,
        VulnCategory::AuthBypass,
        VulnCategory::Csrf,
        VulnCategory::PrivilegeEscalation,
        VulnCategory::InfoDisclosure,
        VulnCategory::Idor,
        VulnCategory::Cors,
        VulnCategory::OpenRedirect,
        VulnCategory::BusinessLogic,
        VulnCategory::Dos,
    ];

    /// Wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            VulnCategory::Sqli => "SQLi",
            VulnCategory::Xss => "XSS",
            VulnCategory::Ssrf => "SSRF",
            VulnCategory::PathTraversal => "PathTraversal",
            VulnCategory::Rce => "RCE",
            VulnCategory::Xxe => "XXE",
            VulnCategory::Lfi => "LFI",
            VulnCategory::AuthBypass => "AuthBypass",
            VulnCategory::Csrf => "CSRF",
            VulnCategory::PrivilegeEscalation => "PrivilegeEscalation",
            VulnCategory::InfoDisclosure => "InformationDisclosure",
            VulnCategory::Idor => "IDOR",
            VulnCategory::Cors => "CORS",
            VulnCategory::OpenRedirect => "OpenRedirect",
            VulnCategory::BusinessLogic => "BusinessLogic",
            VulnCategory::Dos => "DoS",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            VulnCategory::Sqli => "SQL Injection",
            VulnCategory::Xss => "Cross-Site Scripting",
            VulnCategory::Ssrf => "Server-Side Request Forgery",
            VulnCategory::PathTraversal => "Path Traversal",
            VulnCategory::Rce => "Remote Code Execution",
            VulnCategory::Xxe => "XML External Entity Injection",
            VulnCategory::Lfi => "Local File Inclusion",
            VulnCategory::AuthBypass => "Authentication Bypass",
            VulnCategory::Csrf => "Cross-Site Request Forgery",
            VulnCategory::PrivilegeEscalation => "Privilege Escalation",
            VulnCategory::InfoDisclosure => "Information Disclosure",
            VulnCategory::Idor => "Insecure Direct Object Reference",
            VulnCategory::Cors => "CORS Misconfiguration",
            VulnCategory::OpenRedirect => "Open Redirect",
            VulnCategory::BusinessLogic => "Business Logic Flaw",
            VulnCategory::Dos => "Denial of Service",
        }
    }

    /// Categories whose payloads come from the attack-surface templates.
    pub fn uses_surface_payloads(&self) -> bool {
        PAYLOAD_PRIORITY.contains(self)
    }
}

impl fmt::Display for VulnCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VulnCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let alias = match lower.as_str() {
            "infodisclosure" | "info_disclosure" => Some(VulnCategory::InfoDisclosure),
            "sql_injection" => Some(VulnCategory::Sqli),
            _ => None,
        };
        alias
            .or_else(|| {
                VulnCategory::ALL
                    .iter()
                    .copied()
                    .find(|c| c.as_str().eq_ignore_ascii_case(&lower))
            })
            .ok_or_else(|| format!("unknown vulnerability category '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_names_match_as_str() {
        for cat in VulnCategory::ALL {
            let json = serde_json::to_string(&cat).unwrap();
            assert_eq!(json, format!("\"{}\"", cat.as_str()));
        }
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("sqli".parse::<VulnCategory>().unwrap(), VulnCategory::Sqli);
        assert_eq!("xss".parse::<VulnCategory>().unwrap(), VulnCategory::Xss);
        assert_eq!(
            "InfoDisclosure".parse::<VulnCategory>().unwrap(),
            VulnCategory::InfoDisclosure
        );
        assert!("bogus".parse::<VulnCategory>().is_err());
    }

    #[test]
    fn test_exploit_order_starts_with_xss() {
        assert_eq!(EXPLOIT_ORDER[0], VulnCategory::Xss);
        assert_eq!(EXPLOIT_ORDER[9], VulnCategory::BusinessLogic);
    }

    #[test]
    fn test_payload_priority_starts_with_sqli() {
        assert_eq!(PAYLOAD_PRIORITY[0], VulnCategory::Sqli);
        assert!(VulnCategory::Lfi.uses_surface_payloads());
        assert!(!VulnCategory::Cors.uses_surface_payloads());
    }
}
