//! Heuristic for deciding whether a failure is worth retrying.

/// Lower-cased substrings that mark an error message as transient.
const TRANSIENT_PATTERNS: &[&str] = &[
    "timeout",
    "timed out",
    "etimedout",
    "econnreset",
    "connection reset",
    "econnrefused",
    "connection refused",
    "socket hang up",
    "rate limit",
    "rate_limit",
    "too many requests",
    "429",
    "500",
    "502",
    "503",
    "504",
    "network",
    "temporarily unavailable",
    "service unavailable",
];

/// Returns true when `message` matches a known transient failure pattern.
pub fn is_transient_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_PATTERNS.iter().any(|p| lower.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_messages() {
        assert!(is_transient_error("Request Timed Out"));
        assert!(is_transient_error("read ECONNRESET"));
        assert!(is_transient_error("Rate limit reached for gpt-4o"));
        assert!(is_transient_error("HTTP 503 Service Unavailable"));
        assert!(is_transient_error("Error code: 429"));
        assert!(is_transient_error("Network is unreachable"));
    }

    #[test]
    fn test_permanent_messages() {
        assert!(!is_transient_error("Invalid API key provided"));
        assert!(!is_transient_error("No such file or directory"));
        assert!(!is_transient_error(""));
    }
}
