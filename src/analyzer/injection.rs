use regex::Regex;
use std::sync::LazyLock;

use crate::models::{payload, TestResult, VulnCategory};
use super::{Analyzer, Probe, Verdict};

/// Latency above which a sleep-style payload counts as a timing anomaly.
pub const TIME_BASED_THRESHOLD_MS: u64 = 5000;

static SQL_ERRORS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("MySQL", r"you have an error in your sql syntax"),
        ("MySQL", r"warning:\s*mysqli?_"),
        ("MySQL", r"mysql_fetch_(?:array|assoc|row)"),
        ("MySQL", r"com\.mysql\.jdbc"),
        ("MySQL", r"mysqlclient\."),
        ("PostgreSQL", r"pg_query\(\)"),
        ("PostgreSQL", r"postgresql.{0,40}error"),
        ("PostgreSQL", r"unterminated quoted string at or near"),
        ("PostgreSQL", r"syntax error at or near"),
        ("PostgreSQL", r"org\.postgresql\.util\.psqlexception"),
        ("MSSQL", r"microsoft ole db provider for sql server"),
        ("MSSQL", r"unclosed quotation mark after the character string"),
        ("MSSQL", r"\[sql server\]"),
        ("MSSQL", r"odbc sql server driver"),
        ("MSSQL", r"system\.data\.sqlclient\.sqlexception"),
        ("Oracle", r"\bora-\d{5}\b"),
        ("Oracle", r"oracle error"),
        ("Oracle", r"quoted string not properly terminated"),
        ("SQLite", r"sqlite3?::"),
        ("SQLite", r"sqlite_error"),
        ("SQLite", r"sqliteexception"),
        ("SQLite", r#"near ".{1,40}": syntax error"#),
        ("Generic", r"sqlstate\["),
        ("Generic", r"sql syntax.{0,40}mysql"),
    ]
    .into_iter()
    .map(|(family, re)| (family, Regex::new(re).unwrap()))
    .collect()
});

/// First database error signature in `body`, with its byte offset.
pub fn find_sql_error(body: &str) -> Option<(&'static str, usize)> {
    let lower = body.to_lowercase();
    SQL_ERRORS
        .iter()
        .find_map(|(family, re)| re.find(&lower).map(|m| (*family, m.start())))
}

pub struct SqliAnalyzer;

impl Analyzer for SqliAnalyzer {
    fn category(&self) -> VulnCategory {
        VulnCategory::Sqli
    }

    fn analyze(&self, probe: &Probe<'_>) -> TestResult {
        let mut verdict = Verdict::default();
        if let Some((family, _)) = find_sql_error(&probe.response.body) {
            verdict.indicate(format!("{} error signature in response", family));
            verdict.at_least(95);
            verdict.context("error_based");
        } else {
            if payload::is_time_based(probe.payload) && probe.response.elapsed_ms > TIME_BASED_THRESHOLD_MS {
                verdict.indicate(format!(
                    "Response delayed {}ms by sleep payload",
                    probe.response.elapsed_ms
                ));
                verdict.at_least(70);
                verdict.context("time_based");
            }
        }
        verdict.finish(VulnCategory::Sqli, probe.payload)
    }
}

static SSRF_STRONG: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("Cloud metadata (ami-id)", r"\bami-id\b"),
        ("Cloud metadata (instance-id)", r"\binstance-id\b"),
        ("Cloud metadata credentials", r"security-credentials|computemetadata"),
        ("SSH banner", r"ssh-\d\.\d-"),
        ("Local file content", r"root:[x*]?:0:0:"),
    ]
    .into_iter()
    .map(|(label, re)| (label, Regex::new(re).unwrap()))
    .collect()
});

static SSRF_WEAK: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("Loopback address", r"\b127\.0\.0\.1\b|\blocalhost\b"),
        (
            "Private address",
            r"\b(?:10\.\d{1,3}\.\d{1,3}\.\d{1,3}|192\.168\.\d{1,3}\.\d{1,3}|172\.(?:1[6-9]|2\d|3[01])\.\d{1,3}\.\d{1,3})\b",
        ),
        ("Internal service marker", r"internal server|intranet|\.internal\b|\.local\b"),
        ("Connection error from upstream", r"connection refused|couldn't connect to host|failed to connect"),
    ]
    .into_iter()
    .map(|(label, re)| (label, Regex::new(re).unwrap()))
    .collect()
});

pub struct SsrfAnalyzer;

impl Analyzer for SsrfAnalyzer {
    fn category(&self) -> VulnCategory {
        VulnCategory::Ssrf
    }

    fn analyze(&self, probe: &Probe<'_>) -> TestResult {
        let mut verdict = Verdict::default();
        let body = probe.body_without_payload().to_lowercase();
        for (label, re) in SSRF_STRONG.iter() {
            if re.is_match(&body) {
                verdict.indicate(*label);
                verdict.at_least(85);
            }
        }
        for (label, re) in SSRF_WEAK.iter() {
            if re.is_match(&body) {
                verdict.indicate(*label);
            }
        }
        verdict.finish(VulnCategory::Ssrf, probe.payload)
    }
}

static FILE_SIGNATURES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("/etc/passwd content", r"root:[x*]?:0:0:"),
        ("/etc/passwd content", r"daemon:[x*]?:1:1:"),
        ("win.ini content", r"\[boot loader\]|; for 16-bit app support|\[fonts\]\s*\[extensions\]"),
        ("Private key material", r"-----begin (?:rsa |ec |openssh |dsa )?private key-----"),
        ("Server-side source", r"<\?php"),
        ("Base64-encoded PHP source", r"pd9wahag"),
    ]
    .into_iter()
    .map(|(label, re)| (label, Regex::new(re).unwrap()))
    .collect()
});

/// Path traversal and local file inclusion share their evidence.
pub struct FileDisclosureAnalyzer(pub VulnCategory);

impl Analyzer for FileDisclosureAnalyzer {
    fn category(&self) -> VulnCategory {
        self.0
    }

    fn analyze(&self, probe: &Probe<'_>) -> TestResult {
        let mut verdict = Verdict::default();
        let body = probe.body_without_payload().to_lowercase();
        for (label, re) in FILE_SIGNATURES.iter() {
            if re.is_match(&body) {
                verdict.indicate(*label);
                verdict.at_least(90);
            }
        }
        verdict.finish(self.0, probe.payload)
    }
}

static COMMAND_OUTPUT: LazyLock<Vec<(&'static str, u8, Regex)>> = LazyLock::new(|| {
    [
        ("id(1) output", 95, r"uid=\d+\([\w.-]+\)\s+gid=\d+"),
        ("Group id output", 60, r"\bgid=\d+\("),
        ("Windows directory listing", 85, r"volume serial number is|directory of [a-z]:\\"),
        ("Windows path in output", 55, r"[a-z]:\\windows\\"),
        ("win.ini content", 85, r"; for 16-bit app support"),
    ]
    .into_iter()
    .map(|(label, conf, re)| (label, conf, Regex::new(re).unwrap()))
    .collect()
});

pub struct RceAnalyzer;

impl Analyzer for RceAnalyzer {
    fn category(&self) -> VulnCategory {
        VulnCategory::Rce
    }

    fn analyze(&self, probe: &Probe<'_>) -> TestResult {
        let mut verdict = Verdict::default();
        let body = probe.body_without_payload().to_lowercase();
        for (label, confidence, re) in COMMAND_OUTPUT.iter() {
            if re.is_match(&body) {
                verdict.indicate(*label);
                verdict.at_least(*confidence);
            }
        }
        verdict.finish(VulnCategory::Rce, probe.payload)
    }
}

pub struct XxeAnalyzer;

impl Analyzer for XxeAnalyzer {
    fn category(&self) -> VulnCategory {
        VulnCategory::Xxe
    }

    fn analyze(&self, probe: &Probe<'_>) -> TestResult {
        let mut verdict = Verdict::default();
        let stripped = probe.body_without_payload();
        let body = stripped.to_lowercase();

        if FILE_SIGNATURES[0].1.is_match(&body) || FILE_SIGNATURES[2].1.is_match(&body) {
            verdict.indicate("Resolved external entity file content");
            verdict.at_least(95);
        }
        for marker in ["<!doctype", "<!entity", " system \""] {
            if body.contains(marker) {
                verdict.indicate(format!("XML declaration echoed ({})", marker.trim()));
            }
        }
        if body.contains("doctype is disallowed") || body.contains("external entities are disabled") {
            // Parser refused the DTD
            return TestResult::negative(VulnCategory::Xxe, probe.payload)
                .with_context("entities_disabled");
        }
        verdict.finish(VulnCategory::Xxe, probe.payload)
    }
}
