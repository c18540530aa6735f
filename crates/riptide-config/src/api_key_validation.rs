//! Bearer API key strength validation.
//!
//! Applies to the admin API key (`/api/whitelist`, `/api/static-whitelist`,
//! `/api/file/check*`) and the traffic report sink key — both are
//! shared-secret bearer tokens an operator drops into the environment, and
//! both deserve the same floor: long enough and not an obvious placeholder.

/// Minimum required length for API keys (32 characters for strong security).
pub const MIN_API_KEY_LENGTH: usize = 32;

/// Weak patterns that indicate insecure keys.
const WEAK_PATTERNS: &[&str] = &[
    "test", "password", "admin", "demo", "example", "sample", "default", "changeme",
];

/// Validates an API key against security requirements.
///
/// - Minimum length: 32 characters.
/// - Must contain both alphabetic and numeric characters.
/// - Must not be, start with, or embed a weak pattern at a word boundary.
pub fn validate_api_key(key: &str) -> Result<(), String> {
    if key.len() < MIN_API_KEY_LENGTH {
        return Err(format!(
            "API key too short: {} characters (minimum {})",
            key.len(),
            MIN_API_KEY_LENGTH
        ));
    }

    let has_alpha = key.chars().any(|c| c.is_alphabetic());
    let has_numeric = key.chars().any(|c| c.is_numeric());
    if !has_alpha || !has_numeric {
        return Err("API key must contain both letters and numbers".to_string());
    }

    let key_lower = key.to_lowercase();
    let key_trimmed = key_lower.trim();

    for pattern in WEAK_PATTERNS {
        if key_trimmed == *pattern {
            return Err(format!("API key is a weak pattern: '{}'", pattern));
        }

        if key_trimmed.starts_with(pattern) {
            let after_pattern = &key_trimmed[pattern.len()..];
            if after_pattern.is_empty()
                || after_pattern.starts_with('_')
                || after_pattern.starts_with('-')
                || after_pattern.chars().next().unwrap().is_numeric()
            {
                return Err(format!("API key starts with weak pattern: '{}'", pattern));
            }
        }

        if key_trimmed.contains(pattern) {
            let parts: Vec<&str> = key_trimmed.split(pattern).collect();
            if parts.len() > 1 {
                for i in 0..parts.len() - 1 {
                    let before = parts[i];
                    let after = parts[i + 1];
                    let before_is_boundary = before.is_empty()
                        || before.ends_with(|c: char| c.is_numeric() || c == '_' || c == '-');
                    let after_is_boundary = after.is_empty()
                        || after.starts_with(|c: char| c.is_numeric() || c == '_' || c == '-');
                    if before_is_boundary && after_is_boundary {
                        return Err(format!("API key contains weak pattern: '{}'", pattern));
                    }
                }
            }
        }
    }

    Ok(())
}
