use regex::Regex;
use std::net::Ipv4Addr;

use crate::errors::ZeronError;

#[derive(Debug, Clone)]
pub enum ScopeEntry {
    /// A domain and all of its subdomains.
    Domain(String),
    /// `*.example.com` (subdomains only) or `example.*` (any suffix).
    Wildcard { pattern: String, regex: Regex },
    Ip(Ipv4Addr),
    Cidr { network: Ipv4Addr, prefix: u8 },
}

impl ScopeEntry {
    fn parse(token: &str) -> Option<Self> {
        let token = token.trim().to_ascii_lowercase();

        if let Some((addr, bits)) = token.split_once('/') {
            let network: Ipv4Addr = addr.parse().ok()?;
            let prefix: u8 = bits.parse().ok()?;
            return (prefix <= 32).then_some(ScopeEntry::Cidr { network, prefix });
        }

        if let Ok(ip) = token.parse::<Ipv4Addr>() {
            return Some(ScopeEntry::Ip(ip));
        }

        if token.contains('*') {
            let regex = wildcard_regex(&token)?;
            return Some(ScopeEntry::Wildcard { pattern: token, regex });
        }

        is_domain(&token).then_some(ScopeEntry::Domain(token))
    }

    pub fn matches(&self, host: &str) -> bool {
        match self {
            ScopeEntry::Domain(domain) => {
                host == domain || host.ends_with(&format!(".{}", domain))
            }
            ScopeEntry::Wildcard { regex, .. } => regex.is_match(host),
            ScopeEntry::Ip(ip) => host.parse::<Ipv4Addr>().map(|h| h == *ip).unwrap_or(false),
            ScopeEntry::Cidr { network, prefix } => host
                .parse::<Ipv4Addr>()
                .map(|h| in_cidr(h, *network, *prefix))
                .unwrap_or(false),
        }
    }
}

fn is_domain(token: &str) -> bool {
    static LABEL: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
        Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$").unwrap()
    });
    LABEL.is_match(token)
}

fn wildcard_regex(token: &str) -> Option<Regex> {
    let pattern = if let Some(rest) = token.strip_prefix("*.") {
        if rest.contains('*') || rest.is_empty() {
            return None;
        }
        format!(r"^(?:[a-z0-9-]+\.)+{}$", regex::escape(rest))
    } else if let Some(rest) = token.strip_suffix(".*") {
        if rest.contains('*') || rest.is_empty() {
            return None;
        }
        format!(r"^(?:[a-z0-9-]+\.)*{}\.[a-z0-9.-]+$", regex::escape(rest))
    } else {
        return None;
    };
    Regex::new(&pattern).ok()
}

fn in_cidr(addr: Ipv4Addr, network: Ipv4Addr, prefix: u8) -> bool {
    if prefix == 0 {
        return true;
    }
    let mask = u32::MAX << (32 - u32::from(prefix));
    (u32::from(addr) & mask) == (u32::from(network) & mask)
}

/// Reduce user input (`Shop.test`, `https://shop.test/path`) to a bare host, keeping any port.
pub fn normalize_domain(input: &str) -> Result<String, ZeronError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ZeronError::InvalidTarget("domain is empty".into()));
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };
    let parsed = url::Url::parse(&candidate)
        .map_err(|e| ZeronError::InvalidTarget(format!("'{}': {}", trimmed, e)))?;
    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ZeronError::InvalidTarget(format!("'{}' has no host", trimmed)))?
        .trim_end_matches('.')
        .to_ascii_lowercase();
    if host.contains(['*', ' ']) {
        return Err(ZeronError::InvalidTarget(format!("'{}' is not a host", trimmed)));
    }
    Ok(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Allow/deny list parsed from the newline-delimited scope text.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub allow: Vec<ScopeEntry>,
    pub deny: Vec<ScopeEntry>,
}

impl Scope {
    pub fn parse(text: &str) -> Result<Self, ZeronError> {
        let mut scope = Scope::default();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (excluded, token) = match line.strip_prefix('-') {
                Some(rest) => (true, rest.trim()),
                None => (false, line),
            };
            let entry = ScopeEntry::parse(token).ok_or_else(|| {
                ZeronError::InvalidScope(format!("line {}: unrecognised token '{}'", idx + 1, line))
            })?;
            if excluded {
                scope.deny.push(entry);
            } else {
                scope.allow.push(entry);
            }
        }
        Ok(scope)
    }

    pub fn from_lines(lines: &[String]) -> Result<Self, ZeronError> {
        Self::parse(&lines.join("\n"))
    }

    /// Exclusions win; an empty allow list admits everything else.
    pub fn is_in_scope(&self, host: &str) -> bool {
        let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
        if self.deny.iter().any(|e| e.matches(&host)) {
            return false;
        }
        self.allow.is_empty() || self.allow.iter().any(|e| e.matches(&host))
    }
}
