//! Logging helpers: keep user-supplied text on one log line and keep bearer
//! tokens out of log files.

/// Escape a string for single-line logging.
///
/// Newlines, tabs and other control characters are rendered as escapes and
/// anything past 200 characters is cut with an ellipsis. Raw command lines go
/// through this before they reach a log record.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 200;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Shorten a bearer token to a recognisable but unusable prefix.
pub fn redact_token(token: &str) -> String {
    const VISIBLE: usize = 6;
    if token.chars().count() <= VISIBLE {
        return "***".to_string();
    }
    let head: String = token.chars().take(VISIBLE).collect();
    format!("{}…({} chars)", head, token.chars().count())
}

/// Mask everything after the verb when a command line carries a password.
pub fn mask_credentials(raw: &str) -> String {
    let mut parts = raw.split_whitespace();
    match parts.next() {
        Some(verb) if verb.eq_ignore_ascii_case("login") || verb.eq_ignore_ascii_case("register") => {
            match parts.next() {
                Some(user) => format!("{} {} ***", verb, escape_log(user)),
                None => verb.to_string(),
            }
        }
        _ => escape_log(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape_log("scan\nrepair\t\u{7}"), "scan\\nrepair\\t\\x07");
    }

    #[test]
    fn truncates_long_input() {
        let long = "a".repeat(500);
        let esc = escape_log(&long);
        assert!(esc.ends_with('…'));
        assert_eq!(esc.chars().count(), 201);
    }

    #[test]
    fn tokens_are_redacted() {
        assert_eq!(redact_token("abc"), "***");
        let r = redact_token("eyJzdWIiOiIxIn0.sig");
        assert!(r.starts_with("eyJzdW"));
        assert!(!r.contains("sig"));
    }

    #[test]
    fn passwords_never_reach_logs() {
        assert_eq!(mask_credentials("LOGIN alice hunter22"), "LOGIN alice ***");
        assert_eq!(mask_credentials("register bob"), "register bob ***");
        assert_eq!(mask_credentials("decipher x"), "decipher x");
    }
}
