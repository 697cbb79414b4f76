//! Retry-delay extraction and the turn driver's backoff formula.
//!
//! Providers surface rate-limit delays inconsistently: a structured field,
//! or one of several string shapes embedded in an error message. This module
//! extracts whichever is present and combines it with an exponential
//! backoff floor plus jitter, per the turn driver's retry policy.

use rand::Rng;
use std::time::Duration;

const BASE: Duration = Duration::from_secs(12);
const CAP: Duration = Duration::from_secs(180);

/// Best-effort extraction of a provider-supplied retry delay from an error
/// message. Recognizes `"retry in 12.3s"`, `"retryDelay":"30s"`, and
/// `Retry-After: N` (seconds, per HTTP convention). Returns `None` if no
/// recognizable form is present.
pub fn extract_retry_delay(message: &str) -> Option<Duration> {
    if let Some(secs) = after_keyword(message, "retry in ") {
        return parse_seconds(secs);
    }
    if let Some(secs) = after_keyword(message, "\"retryDelay\":\"") {
        return parse_seconds(secs);
    }
    if let Some(secs) = after_keyword(message, "Retry-After: ") {
        return parse_seconds(secs);
    }
    if let Some(secs) = after_keyword(message, "Retry-After:") {
        return parse_seconds(secs);
    }
    None
}

/// Slice starting right after `keyword`, truncated to the leading run of
/// digits/`.`/`s` (enough to cover "12.3s", "30s", "5").
fn after_keyword<'a>(message: &'a str, keyword: &str) -> Option<&'a str> {
    let start = message.find(keyword)? + keyword.len();
    let rest = &message[start..];
    let end = rest.find(|c: char| !(c.is_ascii_digit() || c == '.' || c == 's')).unwrap_or(rest.len());
    if end == 0 { None } else { Some(&rest[..end]) }
}

fn parse_seconds(raw: &str) -> Option<Duration> {
    let numeric = raw.trim_end_matches('s');
    numeric.parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0).map(Duration::from_secs_f64)
}

/// `exponential_backoff(12s base, cap 180s)` for the given zero-indexed
/// retry attempt.
pub fn exponential_backoff(attempt: u32) -> Duration {
    let scaled = BASE.as_secs_f64() * 2f64.powi(attempt as i32);
    Duration::from_secs_f64(scaled.min(CAP.as_secs_f64()))
}

/// `max(extracted, exponential_backoff(...)) + jitter(0-1500ms)`, the sleep
/// duration between turn-level model retries.
pub fn retry_delay(attempt: u32, extracted: Option<Duration>) -> Duration {
    let floor = exponential_backoff(attempt);
    let base = extracted.map_or(floor, |d| d.max(floor));
    let jitter_ms = rand::rng().random_range(0..=1500);
    base + Duration::from_millis(jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_retry_in_form() {
        let delay = extract_retry_delay("rate limited, retry in 12.3s please").unwrap();
        assert!((delay.as_secs_f64() - 12.3).abs() < 0.001);
    }

    #[test]
    fn extracts_retry_delay_json_field() {
        let delay = extract_retry_delay(r#"{"retryDelay":"30s"}"#).unwrap();
        assert_eq!(delay, Duration::from_secs(30));
    }

    #[test]
    fn extracts_retry_after_header_form() {
        let delay = extract_retry_delay("Retry-After: 5").unwrap();
        assert_eq!(delay, Duration::from_secs(5));
    }

    #[test]
    fn returns_none_when_no_recognizable_form() {
        assert!(extract_retry_delay("internal server error").is_none());
    }

    #[test]
    fn backoff_grows_and_caps() {
        assert_eq!(exponential_backoff(0), Duration::from_secs(12));
        assert_eq!(exponential_backoff(1), Duration::from_secs(24));
        assert_eq!(exponential_backoff(10), Duration::from_secs(180));
    }

    #[test]
    fn retry_delay_is_at_least_the_backoff_floor() {
        let delay = retry_delay(0, None);
        assert!(delay >= Duration::from_secs(12));
        assert!(delay <= Duration::from_secs(12) + Duration::from_millis(1500));
    }

    #[test]
    fn retry_delay_honors_larger_extracted_value() {
        let delay = retry_delay(0, Some(Duration::from_secs(60)));
        assert!(delay >= Duration::from_secs(60));
    }
}
