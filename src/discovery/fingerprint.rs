use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::http::HttpResponse;
use crate::models::Technology;

enum Check {
    /// Pattern against a response header value.
    Header(&'static str),
    /// Pattern against `<meta name="generator">` content.
    Generator,
    /// Pattern against HTML comments.
    Comment,
    /// Pattern against `<script src>` values.
    ScriptSrc,
    /// Pattern against the raw body.
    Body,
}

struct Rule {
    name: &'static str,
    category: &'static str,
    check: Check,
    /// First capture group, when present, is taken as the version.
    pattern: LazyLock<Regex>,
}

macro_rules! rule {
    ($name:expr, $cat:expr, $check:expr, $re:expr) => {
        Rule {
            name: $name,
            category: $cat,
            check: $check,
            pattern: LazyLock::new(|| Regex::new($re).unwrap()),
        }
    };
}

static RULES: [Rule; 25] = [
    rule!("Apache", "server", Check::Header("server"), r"(?i)apache(?:/([\d.]+))?"),
    rule!("nginx", "server", Check::Header("server"), r"(?i)nginx(?:/([\d.]+))?"),
    rule!("IIS", "server", Check::Header("server"), r"(?i)microsoft-iis(?:/([\d.]+))?"),
    rule!("Tomcat", "server", Check::Header("server"), r"(?i)tomcat(?:/([\d.]+))?"),
    rule!("Node.js", "server", Check::Header("server"), r"(?i)node(?:\.js)?(?:/([\d.]+))?"),
    rule!("Kestrel", "server", Check::Header("server"), r"(?i)kestrel"),
    rule!("LiteSpeed", "server", Check::Header("server"), r"(?i)litespeed"),
    rule!("Cloudflare", "cdn", Check::Header("server"), r"(?i)cloudflare"),
    rule!("PHP", "language", Check::Header("x-powered-by"), r"(?i)php(?:/([\d.]+))?"),
    rule!("ASP.NET", "framework", Check::Header("x-powered-by"), r"(?i)asp\.net"),
    rule!("Express", "framework", Check::Header("x-powered-by"), r"(?i)express"),
    rule!("Flask", "framework", Check::Header("x-powered-by"), r"(?i)flask"),
    rule!("Django", "framework", Check::Header("x-powered-by"), r"(?i)django"),
    rule!("Next.js", "framework", Check::Header("x-powered-by"), r"(?i)next\.js(?:\s*([\d.]+))?"),
    rule!("WordPress", "cms", Check::Generator, r"(?i)wordpress\s*([\d.]+)?"),
    rule!("Joomla", "cms", Check::Generator, r"(?i)joomla!?\s*([\d.]+)?"),
    rule!("Drupal", "cms", Check::Generator, r"(?i)drupal\s*([\d.]+)?"),
    rule!("WordPress", "cms", Check::Comment, r"(?i)wordpress"),
    rule!("Joomla", "cms", Check::Comment, r"(?i)joomla"),
    rule!("Drupal", "cms", Check::Comment, r"(?i)drupal"),
    rule!("jQuery", "library", Check::ScriptSrc, r"(?i)jquery[-.]?([\d]+\.[\d.]+)?"),
    rule!("Angular", "library", Check::ScriptSrc, r"(?i)angular(?:\.min)?\.js|angular[-@]([\d.]+)"),
    rule!("React", "library", Check::ScriptSrc, r"(?i)react(?:-dom)?(?:[.@-]([\d]+\.[\d.]+))?(?:\.production|\.development|\.min)?\.js"),
    rule!("Vue.js", "library", Check::ScriptSrc, r"(?i)vue(?:[.@-]([\d]+\.[\d.]+))?(?:\.min)?\.js"),
    rule!("WordPress", "cms", Check::Body, r"/wp-content/|/wp-includes/"),
];

static GENERATOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[name="generator"]"#).unwrap());
static SCRIPT_SRC: LazyLock<Selector> = LazyLock::new(|| Selector::parse("script[src]").unwrap());
static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--(.*?)-->").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub name: &'static str,
    pub category: &'static str,
    pub version: Option<String>,
}

fn capture(pattern: &Regex, haystack: &str) -> Option<Option<String>> {
    pattern
        .captures(haystack)
        .map(|caps| caps.get(1).map(|m| m.as_str().trim_end_matches('.').to_string()))
}

/// Technologies visible in a single response. Each technology is reported once.
pub fn detect(response: &HttpResponse) -> Vec<Detection> {
    let document = Html::parse_document(&response.body);
    let generators: Vec<String> = document
        .select(&GENERATOR)
        .filter_map(|el| el.value().attr("content").map(str::to_string))
        .collect();
    let scripts: Vec<String> = document
        .select(&SCRIPT_SRC)
        .filter_map(|el| el.value().attr("src").map(str::to_string))
        .collect();
    let comments: Vec<&str> = COMMENT
        .captures_iter(&response.body)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    let mut found: Vec<Detection> = Vec::new();
    for rule in RULES.iter() {
        let hit = match rule.check {
            Check::Header(name) => response.header(name).and_then(|v| capture(&rule.pattern, v)),
            Check::Generator => generators.iter().find_map(|g| capture(&rule.pattern, g)),
            Check::Comment => comments.iter().find_map(|c| capture(&rule.pattern, c)),
            Check::ScriptSrc => scripts.iter().find_map(|s| capture(&rule.pattern, s)),
            Check::Body => capture(&rule.pattern, &response.body),
        };
        let Some(version) = hit else { continue };

        match found.iter_mut().find(|d| d.name == rule.name) {
            Some(existing) => {
                if existing.version.is_none() {
                    existing.version = version;
                }
            }
            None => found.push(Detection {
                name: rule.name,
                category: rule.category,
                version,
            }),
        }
    }
    found
}

/// Fold per-page detections into a frequency-ordered technology list.
pub fn aggregate<I>(pages: I) -> Vec<Technology>
where
    I: IntoIterator<Item = Vec<Detection>>,
{
    let mut tally: HashMap<&'static str, Technology> = HashMap::new();
    for detections in pages {
        for d in detections {
            let entry = tally.entry(d.name).or_insert_with(|| Technology {
                name: d.name.to_string(),
                category: d.category.to_string(),
                version: None,
                occurrences: 0,
            });
            entry.occurrences += 1;
            if entry.version.is_none() {
                entry.version = d.version;
            }
        }
    }
    let mut techs: Vec<Technology> = tally.into_values().collect();
    techs.sort_by(|a, b| b.occurrences.cmp(&a.occurrences).then_with(|| a.name.cmp(&b.name)));
    techs
}
