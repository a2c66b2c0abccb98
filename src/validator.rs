//! Second opinion on analyzer verdicts before anything becomes a finding.

use serde::Serialize;

use crate::analyzer::injection::find_sql_error;
use crate::http::HttpResponse;
use crate::models::{Parameter, Sensitivity, TestResult, VulnCategory};
use crate::utils::truncation::window;

/// Averaged confidence must exceed this for a finding to be confirmed.
pub const CONFIRM_THRESHOLD: f64 = 60.0;

const WELL_FORMED_CONFIDENCE: u8 = 80;
const CONTEXT_CONFIDENCE: u8 = 70;
const TUTORIAL_WINDOW: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckOutcome {
    pub name: &'static str,
    pub passed: bool,
    pub confidence: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CheckOutcome {
    fn pass(name: &'static str, confidence: u8) -> Self {
        Self { name, passed: true, confidence, reason: None }
    }

    fn fail(name: &'static str, reason: impl Into<String>) -> Self {
        Self { name, passed: false, confidence: 0, reason: Some(reason.into()) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Validation {
    pub confirmed: bool,
    /// Floor of the averaged check confidences.
    pub confidence: u8,
    pub checks: Vec<CheckOutcome>,
    pub recommendation: String,
}

pub trait Validator: Send + Sync {
    fn validate(&self, result: &TestResult, response: &HttpResponse, parameter: &Parameter) -> Validation;
}

/// Analyzer verdict, false-positive signatures, well-formedness and parameter context, averaged.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicValidator;

impl Validator for HeuristicValidator {
    fn validate(&self, result: &TestResult, response: &HttpResponse, parameter: &Parameter) -> Validation {
        let checks = vec![
            analyzer_check(result),
            false_positive_check(result.category, &response.body),
            well_formed_check(response),
            context_check(parameter),
        ];
        let average = checks.iter().map(|c| c.confidence as f64).sum::<f64>() / checks.len() as f64;
        let confirmed =
            average > CONFIRM_THRESHOLD && checks[0].passed && checks[1].passed && checks[3].passed;
        let confidence = average.floor() as u8;
        Validation {
            confirmed,
            confidence,
            recommendation: recommendation(result.category, confidence).to_string(),
            checks,
        }
    }
}

fn analyzer_check(result: &TestResult) -> CheckOutcome {
    if result.vulnerable {
        CheckOutcome::pass("analyzer", result.confidence)
    } else {
        CheckOutcome {
            name: "analyzer",
            passed: false,
            confidence: result.confidence,
            reason: Some("analyzer did not flag the response".to_string()),
        }
    }
}

fn false_positive_check(category: VulnCategory, body: &str) -> CheckOutcome {
    const NAME: &str = "false_positive";
    let lower = body.to_lowercase();
    let signatures: &[&str] = match category {
        VulnCategory::Sqli => &["sql tutorial", "learn sql"],
        VulnCategory::Xss => &["xss protection", "x-xss-protection", "content security policy"],
        VulnCategory::PathTraversal | VulnCategory::Lfi => &["documentation", "help center", "learning"],
        VulnCategory::Rce => &["example uid=", "documentation"],
        _ => &[],
    };
    if let Some(sig) = signatures.iter().find(|s| lower.contains(*s)) {
        return CheckOutcome::fail(NAME, format!("false-positive signature '{}'", sig));
    }
    if category == VulnCategory::Sqli {
        if let Some((_, at)) = find_sql_error(body) {
            if window(&lower, at, TUTORIAL_WINDOW).contains("tutorial") {
                return CheckOutcome::fail(NAME, "SQL error appears inside tutorial content");
            }
        }
    }
    CheckOutcome::pass(NAME, 100)
}

fn well_formed_check(response: &HttpResponse) -> CheckOutcome {
    const NAME: &str = "well_formed";
    if !(100..600).contains(&response.status) {
        return CheckOutcome::fail(NAME, format!("invalid status {}", response.status));
    }
    if response.body.trim().is_empty() {
        return CheckOutcome::fail(NAME, "empty response body");
    }
    CheckOutcome::pass(NAME, WELL_FORMED_CONFIDENCE)
}

fn context_check(parameter: &Parameter) -> CheckOutcome {
    const NAME: &str = "context";
    if parameter.sensitivity == Sensitivity::Critical {
        return CheckOutcome::fail(NAME, format!("parameter '{}' is critical-sensitivity", parameter.name));
    }
    CheckOutcome::pass(NAME, CONTEXT_CONFIDENCE)
}

fn recommendation(category: VulnCategory, confidence: u8) -> &'static str {
    let tier = if confidence > 80 {
        0
    } else if confidence > 60 {
        1
    } else {
        2
    };
    let texts: [&str; 3] = match category {
        VulnCategory::Sqli => [
            "Confirmed SQL injection: switch to parameterized queries immediately",
            "Likely SQL injection: verify manually and review query construction",
            "Possible SQL injection: retest with time-based payloads",
        ],
        VulnCategory::Xss => [
            "Confirmed XSS: apply context-aware output encoding and a strict CSP",
            "Likely XSS: verify execution in a browser",
            "Possible XSS: check the reflection context manually",
        ],
        VulnCategory::PathTraversal | VulnCategory::Lfi => [
            "Confirmed file disclosure: canonicalize paths and restrict to an allow-list",
            "Likely file disclosure: verify which files are reachable",
            "Possible file disclosure: retest with encoded traversal sequences",
        ],
        VulnCategory::Rce => [
            "Confirmed command execution: remove shell invocation of user input",
            "Likely command execution: verify with an out-of-band callback",
            "Possible command execution: retest with time-based commands",
        ],
        _ => [
            "Confirmed: remediate according to category guidance",
            "Likely: verify manually before remediation",
            "Unconfirmed: manual review recommended",
        ],
    };
    texts[tier]
}

/// Several independent weak probes agreeing counts as confirmation.
pub fn cross_validate(results: &[TestResult]) -> (bool, u8) {
    let hits = results.iter().filter(|r| r.vulnerable).count();
    (hits >= 2, (hits * 40).min(100) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::models::{ParamLocation, ParamClass};

    fn param(sensitivity: Sensitivity) -> Parameter {
        Parameter {
            name: "id".to_string(),
            location: ParamLocation::Query,
            classification: ParamClass::Identifier,
            sensitivity,
            sample_value: Some("1".to_string()),
        }
    }

    #[test]
    fn test_sql_error_confirmed() {
        let resp = HttpResponse::new(200, "You have an error in your SQL syntax near ''1''");
        let result = analyze(&resp, "' OR '1'='1", VulnCategory::Sqli);
        let v = HeuristicValidator.validate(&result, &resp, &param(Sensitivity::Low));
        assert!(v.confirmed);
        assert_eq!(v.confidence, 86);
        assert!(v.recommendation.starts_with("Confirmed SQL injection"));
    }

    #[test]
    fn test_critical_parameter_never_confirmed() {
        let resp = HttpResponse::new(200, "You have an error in your SQL syntax");
        let result = analyze(&resp, "'", VulnCategory::Sqli);
        let v = HeuristicValidator.validate(&result, &resp, &param(Sensitivity::Critical));
        assert!(!v.confirmed);
        assert!(!v.checks[3].passed);
    }

    #[test]
    fn test_tutorial_page_rejected() {
        let body = "<h1>SQL Tutorial</h1><pre>You have an error in your SQL syntax</pre>";
        let resp = HttpResponse::new(200, body);
        let result = analyze(&resp, "'", VulnCategory::Sqli);
        assert!(result.vulnerable);
        let v = HeuristicValidator.validate(&result, &resp, &param(Sensitivity::Low));
        // (95 + 0 + 80 + 70) / 4
        assert_eq!(v.confidence, 61);
        assert!(!v.checks[1].passed);
        assert!(!v.confirmed);
    }

    #[test]
    fn test_tutorial_near_error() {
        let body = format!(
            "{}Example output from our tutorial: You have an error in your SQL syntax",
            "filler ".repeat(100)
        );
        let check = false_positive_check(VulnCategory::Sqli, &body);
        assert!(!check.passed);
        let far = format!("tutorial {} You have an error in your SQL syntax", "x".repeat(400));
        assert!(false_positive_check(VulnCategory::Sqli, &far).passed);
    }

    #[test]
    fn test_confidence_bounded_by_average() {
        let resp = HttpResponse::new(200, "uid=0(root) gid=0(root)");
        let result = analyze(&resp, ";id", VulnCategory::Rce);
        let v = HeuristicValidator.validate(&result, &resp, &param(Sensitivity::Medium));
        let avg = v.checks.iter().map(|c| c.confidence as u32).sum::<u32>() / 4;
        assert!(v.confidence as u32 <= avg);
    }

    #[test]
    fn test_cross_validate() {
        let hit = TestResult { vulnerable: true, ..TestResult::negative(VulnCategory::Idor, "2") };
        let miss = TestResult::negative(VulnCategory::Idor, "0");
        assert_eq!(cross_validate(&[hit.clone(), miss.clone()]), (false, 40));
        assert_eq!(cross_validate(&[hit.clone(), hit]), (true, 80));
        assert_eq!(cross_validate(&[miss]), (false, 0));
    }
}
