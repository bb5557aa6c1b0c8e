// Helper functions for safe logging

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 {
            // First char, not first byte: the local part may start with a
            // multi-byte character.
            match parts[0].chars().next() {
                Some(first) => format!("{}***@{}", first, parts[1]),
                None => "***@***.***".to_string(),
            }
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Masks tokens for safe logging
/// Shows only first and last 4 characters
///
/// # Example
/// ```
/// let masked = safe_token_log("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9");
/// // Returns: "eyJh...kpXVCJ9"
/// ```
pub fn safe_token_log(token: &str) -> String {
    if token.len() > 8 {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}
