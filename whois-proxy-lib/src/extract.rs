//! Field extraction from raw WHOIS text.
//!
//! WHOIS replies are free-form, so values are located with a single
//! best-effort scan: lowercase the text, find the first line that starts with
//! a label, and take the rest of that line.

use crate::types::PatternList;
use regex::Regex;

/// Extract the value following `key` on the first line that starts with it.
///
/// `haystack` is lowercased before matching; `key` is matched literally and
/// is expected to be lowercase already. Only lines terminated by a newline
/// are considered. The captured remainder is trimmed.
///
/// Returns `None` when no line starts with `key`.
///
/// ```
/// use whois_proxy_lib::parse_value;
///
/// let text = "Domain Name: EXAMPLE.COM\nWhois Server: whois.example-registrar.com\n";
/// assert_eq!(
///     parse_value("whois server:", text),
///     Some("whois.example-registrar.com".to_string())
/// );
/// assert_eq!(parse_value("referral url:", text), None);
/// ```
pub fn parse_value(key: &str, haystack: &str) -> Option<String> {
    let pattern = format!(r"(?m)^{}(.*?)\n", regex::escape(key));
    let re = Regex::new(&pattern).ok()?;

    let lowered = haystack.to_lowercase();
    re.captures(&lowered)
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str().trim().to_string())
}

/// Try each label of `patterns` in order; the first one that matches wins.
pub fn resolve_referral_server(text: &str, patterns: &PatternList) -> Option<String> {
    patterns.iter().find_map(|key| parse_value(key, text))
}
