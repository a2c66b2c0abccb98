use super::types::ZeronError;

/// How far an error is allowed to travel before it must be absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorScope {
    /// A single request; the probe counts as a non-finding.
    Probe,
    /// A phase; the phase continues with partial data.
    Phase,
    /// The whole scan; it is marked failed and keeps its findings.
    Scan,
}

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub scope: ErrorScope,
}

impl ZeronError {
    /// Classify this error by type and by the pipeline level that recovers from it.
    pub fn classify(&self) -> ErrorClassification {
        let (error_type, scope) = match self {
            // Probe-local: always swallowed, never retried
            ZeronError::Network(_) => ("NetworkError", ErrorScope::Probe),
            ZeronError::Timeout(_) => ("TimeoutError", ErrorScope::Probe),
            ZeronError::Parse(_) => ("ParseError", ErrorScope::Probe),

            // Scan-fatal
            ZeronError::Config(_) => ("ConfigError", ErrorScope::Scan),
            ZeronError::InvalidTarget(_) => ("InvalidTargetError", ErrorScope::Scan),
            ZeronError::InvalidScope(_) => ("InvalidScopeError", ErrorScope::Scan),
            ZeronError::Cancelled => ("CancelledError", ErrorScope::Scan),

            ZeronError::Database(_) => ("DatabaseError", ErrorScope::Phase),
            ZeronError::NotFound(_) => ("NotFoundError", ErrorScope::Phase),
            ZeronError::Conflict(_) => ("ConflictError", ErrorScope::Phase),
            ZeronError::Io(_) => ("IoError", ErrorScope::Phase),
            ZeronError::Json(_) => ("JsonError", ErrorScope::Phase),
            ZeronError::Yaml(_) => ("YamlError", ErrorScope::Phase),
            ZeronError::Internal(_) => ("InternalError", ErrorScope::Phase),
        };
        ErrorClassification { error_type, scope }
    }

    pub fn is_probe_local(&self) -> bool {
        self.classify().scope == ErrorScope::Probe
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            ZeronError::Config(_) => 2,
            ZeronError::InvalidTarget(_) | ZeronError::InvalidScope(_) => 5,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ZeronError::Config("bad".into()).exit_code(), 2);
        assert_eq!(ZeronError::InvalidScope("bad".into()).exit_code(), 5);
        assert_eq!(ZeronError::InvalidTarget("bad".into()).exit_code(), 5);
        assert_eq!(ZeronError::Cancelled.exit_code(), 1);
    }

    #[test]
    fn test_network_error_is_probe_local() {
        let err = ZeronError::Network("connection refused".into());
        let class = err.classify();
        assert_eq!(class.scope, ErrorScope::Probe);
        assert_eq!(class.error_type, "NetworkError");
        assert!(err.is_probe_local());
    }

    #[test]
    fn test_timeout_is_probe_local() {
        let err = ZeronError::Timeout("timed out".into());
        assert!(err.is_probe_local());
    }

    #[test]
    fn test_config_error_is_scan_fatal() {
        let err = ZeronError::Config("invalid config".into());
        let class = err.classify();
        assert_eq!(class.scope, ErrorScope::Scan);
        assert_eq!(class.error_type, "ConfigError");
    }

    #[test]
    fn test_invalid_scope_is_scan_fatal() {
        let err = ZeronError::InvalidScope("line 3: '???'".into());
        assert_eq!(err.classify().scope, ErrorScope::Scan);
    }

    #[test]
    fn test_database_error_is_phase_scoped() {
        let err = ZeronError::Database("locked".into());
        assert_eq!(err.classify().scope, ErrorScope::Phase);
        assert!(!err.is_probe_local());
    }

    #[test]
    fn test_cancelled_display() {
        assert_eq!(ZeronError::Cancelled.to_string(), "Scan cancelled");
    }
}
