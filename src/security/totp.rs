//! Time-based one-time codes and backup codes for the second factor.
//!
//! The code derivation reproduces the behavior of the legacy system: a
//! simple non-cryptographic string hash of `secret + step`, reduced modulo
//! 1,000,000 and zero-padded to six digits. This is NOT RFC 6238 HMAC-based
//! TOTP and must not be treated as cryptographically sound; it is kept so
//! codes remain compatible with the documented behavior. See DESIGN.md.

use log::debug;
use rand::{rngs::OsRng, Rng};
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

// Secret and code shape
const SECRET_LEN: usize = 32;
const SECRET_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
const CODE_MODULUS: u32 = 1_000_000;

// Time stepping
const STEP_MS: u64 = 30_000;

// Backup codes
pub const BACKUP_CODE_COUNT: usize = 10;
pub const BACKUP_CODE_LENGTH: usize = 8;
const BACKUP_CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a fresh shared secret: 32 characters from the base32 alphabet
/// `A-Z2-7`.
pub fn generate_secret() -> String {
    let mut rng = OsRng;
    (0..SECRET_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..SECRET_ALPHABET.len());
            SECRET_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a set of single-use backup codes: uppercase alphanumeric,
/// fixed length. Collisions within a set are not explicitly checked;
/// with 36^8 possible codes they are acceptably rare.
pub fn generate_backup_codes() -> Vec<String> {
    let mut rng = OsRng;
    (0..BACKUP_CODE_COUNT)
        .map(|_| {
            (0..BACKUP_CODE_LENGTH)
                .map(|_| {
                    let idx = rng.gen_range(0..BACKUP_CODE_CHARSET.len());
                    BACKUP_CODE_CHARSET[idx] as char
                })
                .collect()
        })
        .collect()
}

/// Build the otpauth-style provisioning URI for authenticator apps.
///
/// Display-only: nothing in this crate parses it back. Label and query
/// components are percent-encoded so the result is a valid URI even when
/// the issuer contains spaces.
pub fn provisioning_uri(issuer: &str, account: &str, secret: &str) -> String {
    let mut url = Url::parse("otpauth://totp/").expect("static otpauth base URL");
    url.path_segments_mut()
        .expect("otpauth base URL has a path")
        .push(&format!("{}:{}", issuer, account));
    url.query_pairs_mut()
        .append_pair("secret", secret)
        .append_pair("issuer", issuer)
        .append_pair("algorithm", "SHA1")
        .append_pair("digits", "6")
        .append_pair("period", "30");
    url.to_string()
}

/// Current 30-second time step since the Unix epoch.
pub fn current_step() -> i64 {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    step_for(now_ms)
}

/// Time step for a wall-clock instant in milliseconds since the epoch.
pub fn step_for(now_ms: u64) -> i64 {
    (now_ms / STEP_MS) as i64
}

/// Derive the six-digit code for a secret at a given time step.
pub fn code_at(secret: &str, step: i64) -> String {
    let input = format!("{}{}", secret, step);
    let mut hash: i32 = 0;
    for byte in input.bytes() {
        // (hash << 5) - hash + byte, wrapping at 32 bits
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(byte));
    }
    format!("{:06}", hash.unsigned_abs() % CODE_MODULUS)
}

/// Derive the code for the current time step.
pub fn current_code(secret: &str) -> String {
    code_at(secret, current_step())
}

/// Verify a code against the current wall clock.
pub fn verify(secret: &str, code: &str) -> bool {
    verify_at_step(secret, code, current_step())
}

/// Verify a code at an explicit reference step, accepting the step itself
/// plus the immediately preceding and following steps (a ±30s window for
/// clock skew).
pub fn verify_at_step(secret: &str, code: &str, step: i64) -> bool {
    let valid = (-1..=1).any(|delta| code_at(secret, step + delta) == code);
    debug!("TOTP verification at step {}: {}", step, valid);
    valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_length_and_alphabet() {
        let secret = generate_secret();
        assert_eq!(secret.len(), SECRET_LEN);
        assert!(secret
            .bytes()
            .all(|b| SECRET_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_secrets_are_distinct() {
        let a = generate_secret();
        let b = generate_secret();
        assert_ne!(a, b);
    }

    #[test]
    fn test_backup_code_shape_and_distinctness() {
        // Large sample: collisions within any single set must not occur
        for _ in 0..100 {
            let codes = generate_backup_codes();
            assert_eq!(codes.len(), BACKUP_CODE_COUNT);
            for code in &codes {
                assert_eq!(code.len(), BACKUP_CODE_LENGTH);
                assert!(code.bytes().all(|b| BACKUP_CODE_CHARSET.contains(&b)));
            }
            let mut unique = codes.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), codes.len());
        }
    }

    #[test]
    fn test_code_is_deterministic_per_step() {
        let secret = "JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP";
        assert_eq!(code_at(secret, 1000), code_at(secret, 1000));
        assert_ne!(code_at(secret, 1000), code_at(secret, 1001));
    }

    #[test]
    fn test_code_is_six_digits() {
        let secret = generate_secret();
        for step in [0, 1, 57_000_000, i64::from(i32::MAX)] {
            let code = code_at(&secret, step);
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_verification_window() {
        let secret = generate_secret();
        let step = 57_123_456;
        let code = code_at(&secret, step);

        // Accepted at the step itself and its immediate neighbors
        assert!(verify_at_step(&secret, &code, step));
        assert!(verify_at_step(&secret, &code, step - 1));
        assert!(verify_at_step(&secret, &code, step + 1));

        // Rejected two steps away in either direction
        assert!(!verify_at_step(&secret, &code, step - 2));
        assert!(!verify_at_step(&secret, &code, step + 2));
    }

    #[test]
    fn test_step_for_epoch_milliseconds() {
        assert_eq!(step_for(0), 0);
        assert_eq!(step_for(29_999), 0);
        assert_eq!(step_for(30_000), 1);
        assert_eq!(step_for(90_000), 3);
    }

    #[test]
    fn test_provisioning_uri_contains_parts() {
        let uri = provisioning_uri("Secure Bank", "user@example.com", "ABCD2345");
        assert!(uri.starts_with("otpauth://totp/"));
        assert!(uri.contains("Secure%20Bank"));
        assert!(uri.contains("user"));
        assert!(uri.contains("example.com"));
        assert!(uri.contains("secret=ABCD2345"));
        assert!(uri.contains("issuer="));
        // Percent-encoded label: no raw spaces anywhere in the URI
        assert!(!uri.contains(' '));
    }
}
