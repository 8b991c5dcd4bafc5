// src/utils/access_key.rs

use std::sync::OnceLock;

use rand::Rng;
use regex::Regex;

use crate::error::AppError;

const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const GROUPS: usize = 3;
const GROUP_LEN: usize = 4;

fn access_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9A-Z]{4}-[0-9A-Z]{4}-[0-9A-Z]{4}$").expect("access key pattern is valid")
    })
}

/// Generates a join code such as `7F3K-2QXP-9AL0`.
///
/// Uniqueness is not checked here; the quizzes table carries a unique index on `access_key`.
pub fn generate_access_key() -> String {
    let mut rng = rand::thread_rng();
    let mut key = String::with_capacity(GROUPS * (GROUP_LEN + 1));

    for group in 0..GROUPS {
        if group > 0 {
            key.push('-');
        }
        for _ in 0..GROUP_LEN {
            let idx = rng.gen_range(0..ALPHABET.len());
            key.push(ALPHABET[idx] as char);
        }
    }

    key
}

/// Trims and uppercases an author-supplied key, then checks the format.
pub fn normalize_access_key(input: &str) -> Result<String, AppError> {
    let key = input.trim().to_ascii_uppercase();
    if !is_valid_access_key(&key) {
        return Err(AppError::validation(
            "Access code must look like XXXX-XXXX-XXXX (letters and digits)",
        ));
    }
    Ok(key)
}

pub fn is_valid_access_key(key: &str) -> bool {
    access_key_pattern().is_match(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_match_format() {
        for _ in 0..200 {
            let key = generate_access_key();
            assert!(is_valid_access_key(&key), "bad key {}", key);
            assert_eq!(key.len(), 14);
        }
    }

    #[test]
    fn generated_keys_vary() {
        let a = generate_access_key();
        let b = generate_access_key();
        let c = generate_access_key();
        assert!(a != b || b != c);
    }

    #[test]
    fn normalize_uppercases_and_trims() {
        assert_eq!(normalize_access_key("  7f3k-2qxp-9al0 ").unwrap(), "7F3K-2QXP-9AL0");
    }

    #[test]
    fn normalize_rejects_bad_shapes() {
        for bad in ["", "7F3K2QXP9AL0", "7F3K-2QXP", "7F3K-2QXP-9AL!", "7F3K-2QXP-9AL0-AAAA"] {
            assert!(matches!(normalize_access_key(bad), Err(AppError::Validation(_))), "{}", bad);
        }
    }
}
