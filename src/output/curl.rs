//! cURL command generation
//!
//! Converts a synthesized request into an equivalent curl command line.

use crate::engine::SynthesizedRequest;

/// Generate an equivalent curl command; `redact` swaps the key for the placeholder
pub fn to_curl(request: &SynthesizedRequest, redact: bool) -> String {
    let mut lines: Vec<String> = vec![format!("curl -X {} {}", request.method, shell_escape(request.url.as_str()))];

    for (name, value) in request.headers(redact) {
        lines.push(format!("-H {}", shell_escape(&format!("{}: {}", name, value))));
    }

    if let Some(ref body) = request.body {
        lines.push(format!("-d {}", shell_escape(&body.to_text())));
    }

    lines.join(" \\\n  ")
}

/// Shell-escape a string for safe inclusion in a command
fn shell_escape(s: &str) -> String {
    let needs_escaping = s.chars().any(|c| {
        matches!(c, ' ' | '\'' | '"' | '\\' | '$' | '`' | '!' | '*' | '?' |
                    '[' | ']' | '{' | '}' | '(' | ')' | '<' | '>' | '|' |
                    '&' | ';' | '\n' | '\t')
    });

    if !needs_escaping && !s.is_empty() {
        return s.to_string();
    }

    // single quotes, with embedded ones closed and reopened
    format!("'{}'", s.replace('\'', "'\"'\"'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_catalog;
    use crate::cli::SecretString;
    use crate::engine::{Credentials, Session};

    #[test]
    fn test_shell_escape() {
        assert_eq!(shell_escape("simple"), "simple");
        assert_eq!(shell_escape("with space"), "'with space'");
        assert_eq!(shell_escape("it's"), "'it'\"'\"'s'");
        assert_eq!(shell_escape(""), "''");
    }

    #[test]
    fn test_curl_for_create_invoice() {
        let credentials = Credentials::new(Some(SecretString("real-key".into())), "https://api.example.test/2.0");
        let mut session = Session::new(builtin_catalog(), credentials);
        session.select_workflow("invoice-creation", None).unwrap();
        let request = session.synthesize("create-invoice", true).unwrap();

        let curl = to_curl(&request, true);
        assert!(curl.starts_with("curl -X POST https://api.example.test/2.0/invoices \\\n"));
        assert!(curl.contains("'API-KEY: your-api-key'"));
        assert!(!curl.contains("real-key"));
        assert!(curl.contains("\"line_items\""));
    }
}
