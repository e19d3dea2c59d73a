use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Minimum password length required by the policy
pub const MIN_PASSWORD_LENGTH: usize = 12;

// Fixed deny-list of commonly used passwords, compared case-insensitively
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password123",
    "123456",
    "123456789",
    "12345678",
    "qwerty",
    "abc123",
    "letmein",
    "welcome",
    "admin",
    "iloveyou",
    "monkey",
    "dragon",
    "sunshine",
    "111111",
];

lazy_static! {
    static ref SPECIAL_CHARS: Regex =
        Regex::new(r#"[!@#$%^&*()_+\-=\[\]{};':"\\|,.<>/?]"#).expect("valid special-char regex");
}

/// The six independent policy requirements a password is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordRequirements {
    pub length: bool,
    pub uppercase: bool,
    pub lowercase: bool,
    pub numbers: bool,
    pub special_chars: bool,
    pub not_common: bool,
}

impl PasswordRequirements {
    /// Number of satisfied requirements.
    pub fn satisfied(&self) -> u8 {
        [
            self.length,
            self.uppercase,
            self.lowercase,
            self.numbers,
            self.special_chars,
            self.not_common,
        ]
        .iter()
        .filter(|met| **met)
        .count() as u8
    }
}

/// Outcome of a password-strength evaluation.
///
/// Invariants: `score` equals the count of satisfied requirements, and
/// `feedback` holds exactly one message per unmet requirement, in the fixed
/// policy order (length, uppercase, lowercase, numbers, special, common).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordStrengthResult {
    pub score: u8,
    pub requirements: PasswordRequirements,
    pub feedback: Vec<String>,
}

impl PasswordStrengthResult {
    /// True when every requirement is met.
    pub fn is_strong(&self) -> bool {
        self.score == 6
    }
}

/// Evaluate a password against the full policy.
///
/// Pure and deterministic: all six checks always run, there is no early
/// exit, and no I/O takes place.
pub fn evaluate(password: &str) -> PasswordStrengthResult {
    debug!("Evaluating password strength");

    let requirements = PasswordRequirements {
        length: password.chars().count() >= MIN_PASSWORD_LENGTH,
        uppercase: password.chars().any(|c| c.is_ascii_uppercase()),
        lowercase: password.chars().any(|c| c.is_ascii_lowercase()),
        numbers: password.chars().any(|c| c.is_ascii_digit()),
        special_chars: SPECIAL_CHARS.is_match(password),
        not_common: !is_common_password(password),
    };

    let mut feedback = Vec::new();
    if !requirements.length {
        feedback.push(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    }
    if !requirements.uppercase {
        feedback.push("Password must contain at least one uppercase letter".to_string());
    }
    if !requirements.lowercase {
        feedback.push("Password must contain at least one lowercase letter".to_string());
    }
    if !requirements.numbers {
        feedback.push("Password must contain at least one number".to_string());
    }
    if !requirements.special_chars {
        feedback.push("Password must contain at least one special character".to_string());
    }
    if !requirements.not_common {
        feedback.push("Password must not be a commonly used password".to_string());
    }

    PasswordStrengthResult {
        score: requirements.satisfied(),
        requirements,
        feedback,
    }
}

/// Case-insensitive exact match against the fixed deny-list.
fn is_common_password(password: &str) -> bool {
    let lowered = password.to_lowercase();
    COMMON_PASSWORDS.iter().any(|common| *common == lowered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_empty_password_fails_everything() {
        let result = evaluate("");
        assert_eq!(result.score, 0);
        assert_eq!(result.feedback.len(), 6);
        // Feedback order is fixed by the policy
        assert!(result.feedback[0].contains("12 characters"));
        assert!(result.feedback[1].contains("uppercase"));
        assert!(result.feedback[2].contains("lowercase"));
        assert!(result.feedback[3].contains("number"));
        assert!(result.feedback[4].contains("special character"));
        assert!(result.feedback[5].contains("commonly used"));
    }

    #[test]
    fn test_strong_password() {
        let result = evaluate("Aa1!Aa1!Aa1!");
        assert_eq!(result.score, 6);
        assert!(result.feedback.is_empty());
        assert!(result.is_strong());
    }

    #[test_case("Aa1!Aa1!Aa1!", 6 ; "all requirements met")]
    #[test_case("Aa1!Aa1!", 5 ; "too short")]
    #[test_case("aa1!aa1!aa1!", 5 ; "no uppercase")]
    #[test_case("AA1!AA1!AA1!", 5 ; "no lowercase")]
    #[test_case("Aaa!Aaa!Aaa!", 5 ; "no number")]
    #[test_case("Aa11Aa11Aa11", 5 ; "no special character")]
    #[test_case("", 0 ; "empty password")]
    fn test_score_boundaries(password: &str, expected: u8) {
        let result = evaluate(password);
        assert_eq!(result.score, expected);
        assert_eq!(result.feedback.len(), (6 - expected) as usize);
    }

    #[test]
    fn test_score_matches_requirement_count() {
        for password in ["", "a", "Password1!", "Tr0ub4dor&3x12", "qwerty"] {
            let result = evaluate(password);
            assert_eq!(result.score, result.requirements.satisfied());
            assert_eq!(result.feedback.len(), (6 - result.score) as usize);
        }
    }

    #[test]
    fn test_deny_list_is_case_insensitive() {
        let result = evaluate("Password");
        assert!(!result.requirements.not_common);

        let result = evaluate("PASSWORD123");
        assert!(!result.requirements.not_common);
    }

    #[test]
    fn test_deny_list_exact_match_only() {
        // Containing a common password is fine; only an exact match fails
        let result = evaluate("MyPassword123!xx");
        assert!(result.requirements.not_common);
    }
}
