//! Random secret generation for database and admin passwords.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Default length for generated passwords.
pub const DEFAULT_SECRET_LEN: usize = 24;

/// Generate an alphanumeric secret of `len` characters.
///
/// Alphanumeric only, so the value can be embedded in SQL string literals
/// and shell arguments without escaping.
pub fn generate_secret(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_requested_length_and_charset() {
        let secret = generate_secret(DEFAULT_SECRET_LEN);
        assert_eq!(secret.len(), DEFAULT_SECRET_LEN);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn secrets_differ() {
        assert_ne!(generate_secret(32), generate_secret(32));
    }
}
