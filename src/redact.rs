//! PII redaction applied before anything is persisted or logged.
//!
//! [`redact_text`] runs an ordered list of regex rules over a string;
//! [`redact_json`] walks a JSON value, redacting string leaves and masking any
//! value stored under a sensitive-looking key. Both are total and idempotent.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Replacement for values stored under a sensitive key.
pub const MASK: &str = "[REDACTED]";

/// Map keys whose values are masked wholesale, matched as lower-cased substrings.
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "token",
    "secret",
    "authorization",
    "cookie",
    "email",
];

struct Rule {
    regex: Regex,
    replacement: &'static str,
}

/// Compiled rules, in application order. Email must run before phone since
/// addresses can contain digit runs.
fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (
                r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b",
                "[REDACTED:EMAIL]",
            ),
            (
                r"\b(?:\+?\d{1,2}[\s.-]?)?(?:\(?\d{3}\)?[\s.-]?)\d{3}[\s.-]?\d{4}\b",
                "[REDACTED:PHONE]",
            ),
            (r"\b\d{3}-\d{2}-\d{4}\b", "[REDACTED:SSN]"),
            (r"\b(?:\d[ -]*?){13,16}\b", "[REDACTED:CARD]"),
            (
                r"(?i)(authorization|cookie|token|secret|password|api[-_]?key)\s*[:=]\s*[^\s,;]+",
                "${1}=[REDACTED:SECRET]",
            ),
        ]
        .into_iter()
        .map(|(pattern, replacement)| Rule {
            regex: Regex::new(pattern).expect("redaction pattern is a valid regex"),
            replacement,
        })
        .collect()
    })
}

/// Scrub emails, phone numbers, SSN-like groups, card-like digit runs and
/// `secret=value` pairs from `input`.
pub fn redact_text(input: &str) -> String {
    rules().iter().fold(input.to_string(), |acc, rule| {
        rule.regex.replace_all(&acc, rule.replacement).into_owned()
    })
}

/// Redact every string leaf of `value`; values under sensitive keys become [`MASK`].
pub fn redact_json(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(redact_text(s)),
        Value::Array(items) => Value::Array(items.iter().map(redact_json).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, nested)| {
                    let masked = if is_sensitive_key(key) {
                        Value::String(MASK.to_string())
                    } else {
                        redact_json(nested)
                    };
                    (key.clone(), masked)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Whether a map key names a credential or contact field.
pub fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    SENSITIVE_KEYS.iter().any(|k| lowered.contains(k))
}
