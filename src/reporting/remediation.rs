//! Static guidance per category: CWE ids, references, impact and fixes.

use crate::models::{Impact, Remediation, VulnCategory};

pub fn cwe_ids(category: VulnCategory) -> Vec<u32> {
    match category {
        VulnCategory::Sqli => vec![89],
        VulnCategory::Xss => vec![79],
        VulnCategory::Ssrf => vec![918],
        VulnCategory::PathTraversal => vec![22],
        VulnCategory::Rce => vec![78, 94],
        VulnCategory::Xxe => vec![611],
        VulnCategory::Lfi => vec![98, 22],
        VulnCategory::AuthBypass => vec![287, 89],
        VulnCategory::Csrf => vec![352],
        VulnCategory::PrivilegeEscalation => vec![269],
        VulnCategory::InfoDisclosure => vec![200, 209],
        VulnCategory::Idor => vec![639],
        VulnCategory::Cors => vec![942],
        VulnCategory::OpenRedirect => vec![601],
        VulnCategory::BusinessLogic => vec![840],
        VulnCategory::Dos => vec![400],
    }
}

pub fn references(category: VulnCategory) -> Vec<String> {
    let owasp = match category {
        VulnCategory::Sqli => "https://owasp.org/www-community/attacks/SQL_Injection",
        VulnCategory::Xss => "https://owasp.org/www-community/attacks/xss/",
        VulnCategory::Ssrf => "https://owasp.org/www-community/attacks/Server_Side_Request_Forgery",
        VulnCategory::PathTraversal | VulnCategory::Lfi => "https://owasp.org/www-community/attacks/Path_Traversal",
        VulnCategory::Rce => "https://owasp.org/www-community/attacks/Command_Injection",
        VulnCategory::Xxe => "https://owasp.org/www-community/vulnerabilities/XML_External_Entity_(XXE)_Processing",
        VulnCategory::Csrf => "https://owasp.org/www-community/attacks/csrf",
        VulnCategory::OpenRedirect => {
            "https://cheatsheetseries.owasp.org/cheatsheets/Unvalidated_Redirects_and_Forwards_Cheat_Sheet.html"
        }
        VulnCategory::Idor | VulnCategory::PrivilegeEscalation => {
            "https://cheatsheetseries.owasp.org/cheatsheets/Insecure_Direct_Object_Reference_Prevention_Cheat_Sheet.html"
        }
        VulnCategory::Cors => "https://portswigger.net/web-security/cors",
        VulnCategory::AuthBypass => {
            "https://cheatsheetseries.owasp.org/cheatsheets/Authentication_Cheat_Sheet.html"
        }
        VulnCategory::InfoDisclosure => "https://owasp.org/www-community/Improper_Error_Handling",
        VulnCategory::BusinessLogic => "https://owasp.org/www-community/vulnerabilities/Business_logic_vulnerability",
        VulnCategory::Dos => "https://owasp.org/www-community/attacks/Denial_of_Service",
    };
    let mut refs = vec![owasp.to_string()];
    refs.extend(
        cwe_ids(category)
            .into_iter()
            .map(|id| format!("https://cwe.mitre.org/data/definitions/{}.html", id)),
    );
    refs
}

pub fn impact(category: VulnCategory) -> Impact {
    let (description, c, i, a, business): (&str, &str, &str, &str, &[&str]) = match category {
        VulnCategory::Sqli => (
            "An attacker can read, modify or delete database contents and may escalate to the host.",
            "HIGH", "HIGH", "HIGH",
            &["Customer data breach", "Regulatory exposure", "Data integrity loss"],
        ),
        VulnCategory::Xss => (
            "Attacker-controlled script runs in victims' browsers under the application's origin.",
            "LOW", "LOW", "NONE",
            &["Session hijacking", "Account takeover", "Phishing from a trusted domain"],
        ),
        VulnCategory::Ssrf => (
            "The server can be made to issue requests to internal services and cloud metadata endpoints.",
            "HIGH", "LOW", "LOW",
            &["Cloud credential theft", "Internal network exposure"],
        ),
        VulnCategory::Rce => (
            "Arbitrary operating-system commands execute with the application's privileges.",
            "HIGH", "HIGH", "HIGH",
            &["Full server compromise", "Lateral movement", "Service disruption"],
        ),
        VulnCategory::PathTraversal | VulnCategory::Lfi => (
            "Files outside the intended directory can be read from the server.",
            "HIGH", "NONE", "NONE",
            &["Source code and configuration disclosure", "Credential exposure"],
        ),
        VulnCategory::Xxe => (
            "The XML parser resolves external entities, exposing local files and internal hosts.",
            "HIGH", "NONE", "LOW",
            &["Configuration disclosure", "Internal network exposure"],
        ),
        VulnCategory::AuthBypass => (
            "Authentication can be bypassed without valid credentials.",
            "HIGH", "HIGH", "NONE",
            &["Unauthorized account access", "Privileged function exposure"],
        ),
        VulnCategory::Idor => (
            "Objects belonging to other users are returned by changing an identifier.",
            "HIGH", "LOW", "NONE",
            &["Customer data breach", "Privacy violations"],
        ),
        VulnCategory::Cors => (
            "Untrusted origins may read authenticated responses cross-origin.",
            "HIGH", "LOW", "NONE",
            &["Data theft through malicious websites"],
        ),
        VulnCategory::OpenRedirect => (
            "Users can be redirected from a trusted domain to an attacker-controlled site.",
            "LOW", "LOW", "NONE",
            &["Phishing", "OAuth token leakage"],
        ),
        VulnCategory::BusinessLogic => (
            "Out-of-range values are accepted and processed by business workflows.",
            "NONE", "HIGH", "NONE",
            &["Financial loss", "Inventory manipulation"],
        ),
        VulnCategory::InfoDisclosure => (
            "Internal details such as stack traces, paths, versions or secrets are exposed.",
            "LOW", "NONE", "NONE",
            &["Reconnaissance aid for further attacks"],
        ),
        VulnCategory::Csrf => (
            "State-changing requests can be forged from other origins.",
            "NONE", "LOW", "NONE",
            &["Unwanted actions on behalf of users"],
        ),
        VulnCategory::PrivilegeEscalation => (
            "A user can obtain privileges beyond those granted.",
            "HIGH", "HIGH", "LOW",
            &["Administrative takeover"],
        ),
        VulnCategory::Dos => (
            "Requests can exhaust server resources.",
            "NONE", "NONE", "HIGH",
            &["Service outage"],
        ),
    };
    Impact {
        description: description.to_string(),
        confidentiality: c.to_string(),
        integrity: i.to_string(),
        availability: a.to_string(),
        business: business.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn remediation(category: VulnCategory) -> Remediation {
    let (immediate, long_term, code): (&[&str], &[&str], Option<&str>) = match category {
        VulnCategory::Sqli => (
            &["Use parameterized queries for the affected parameter", "Suppress database error output"],
            &["Adopt an ORM or query builder", "Run the database account with least privilege"],
            Some("cursor.execute(\"SELECT * FROM items WHERE id = %s\", (item_id,))"),
        ),
        VulnCategory::Xss => (
            &["HTML-encode the reflected value in its output context"],
            &["Use a templating engine with auto-escaping", "Deploy a strict Content-Security-Policy"],
            Some("<p>{{ value | escape }}</p>"),
        ),
        VulnCategory::Ssrf => (
            &["Restrict outbound requests to an allow-list of hosts"],
            &["Block link-local and private ranges at the network layer", "Require IMDSv2 on cloud hosts"],
            None,
        ),
        VulnCategory::Rce => (
            &["Stop passing user input to a shell"],
            &["Use library APIs instead of external commands", "Sandbox the application process"],
            Some("subprocess.run([\"ping\", \"-c\", \"1\", host], shell=False)"),
        ),
        VulnCategory::PathTraversal | VulnCategory::Lfi => (
            &["Reject path separators and dot segments in file parameters"],
            &["Map user input to an allow-list of file identifiers", "Canonicalize and confine paths to a base directory"],
            None,
        ),
        VulnCategory::Xxe => (
            &["Disable DTD processing and external entity resolution"],
            &["Prefer JSON or a hardened XML parser configuration"],
            None,
        ),
        VulnCategory::AuthBypass => (
            &["Parameterize the credential lookup", "Invalidate sessions issued to bypass payloads"],
            &["Centralize authentication in a vetted framework", "Add login anomaly monitoring"],
            None,
        ),
        VulnCategory::Idor => (
            &["Check object ownership on every request"],
            &["Use unguessable identifiers", "Enforce authorization in a shared data-access layer"],
            None,
        ),
        VulnCategory::Cors => (
            &["Allow only explicitly trusted origins", "Never combine reflected origins with credentials"],
            &["Maintain the origin allow-list in configuration"],
            None,
        ),
        VulnCategory::OpenRedirect => (
            &["Only redirect to relative paths or allow-listed hosts"],
            &["Replace URL parameters with server-side redirect identifiers"],
            None,
        ),
        VulnCategory::BusinessLogic => (
            &["Validate numeric ranges server-side"],
            &["Recompute totals from trusted data", "Add invariant checks to business workflows"],
            None,
        ),
        VulnCategory::InfoDisclosure => (
            &["Disable debug output and verbose errors in production"],
            &["Remove version banners", "Rotate any exposed secrets"],
            None,
        ),
        VulnCategory::Csrf => (
            &["Require anti-CSRF tokens on state-changing requests"],
            &["Set SameSite cookies"],
            None,
        ),
        VulnCategory::PrivilegeEscalation => (
            &["Enforce role checks server-side"],
            &["Review role assignment workflows"],
            None,
        ),
        VulnCategory::Dos => (
            &["Apply request rate limiting"],
            &["Bound resource usage per request"],
            None,
        ),
    };
    Remediation {
        immediate: immediate.iter().map(|s| s.to_string()).collect(),
        long_term: long_term.iter().map(|s| s.to_string()).collect(),
        code_example: code.map(String::from),
    }
}

/// One-line recommendation for the aggregate report.
pub fn recommendation(category: VulnCategory) -> &'static str {
    match category {
        VulnCategory::Sqli => "Replace string-built SQL with parameterized queries across the codebase.",
        VulnCategory::Xss => "Enable context-aware output encoding and a strict Content-Security-Policy.",
        VulnCategory::Ssrf => "Constrain server-side fetches to an allow-list and block internal ranges.",
        VulnCategory::Rce => "Eliminate shell invocation of user-controlled data.",
        VulnCategory::PathTraversal | VulnCategory::Lfi => "Resolve file access through an allow-list of identifiers.",
        VulnCategory::Xxe => "Disable external entity resolution in every XML parser.",
        VulnCategory::AuthBypass => "Harden the authentication flow and parameterize credential checks.",
        VulnCategory::Idor => "Enforce per-object authorization checks.",
        VulnCategory::Cors => "Restrict CORS to trusted origins.",
        VulnCategory::OpenRedirect => "Validate redirect targets against an allow-list.",
        VulnCategory::BusinessLogic => "Validate business values server-side.",
        VulnCategory::InfoDisclosure => "Turn off debug output and remove version banners.",
        VulnCategory::Csrf => "Protect state-changing requests with anti-CSRF tokens.",
        VulnCategory::PrivilegeEscalation => "Enforce role checks on every privileged action.",
        VulnCategory::Dos => "Add rate limiting and resource bounds.",
    }
}
