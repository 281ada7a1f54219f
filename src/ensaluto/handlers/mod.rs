pub mod health;
pub use self::health::health;

pub mod user_register;
pub use self::user_register::register;

pub mod user_login;
pub use self::user_login::login;

// common functions for the handlers
use regex::Regex;

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_or(false, |re| re.is_match(email))
}

// minimum length only, anything else is the hasher's business
pub fn valid_password(password: &str) -> bool {
    password.chars().count() >= 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(valid_email("user@example.com"));
        assert!(valid_email("first.last@sub.example.org"));

        assert!(!valid_email(""));
        assert!(!valid_email("userexample.com"));
        assert!(!valid_email("user@examplecom"));
        assert!(!valid_email("user @example.com"));
        assert!(!valid_email("user@exam ple.com"));
        assert!(!valid_email("@example.com"));
    }

    #[test]
    fn test_valid_password() {
        assert!(valid_password("12345678"));
        assert!(valid_password("mypassword123"));
        assert!(valid_password("pässwörd"));

        assert!(!valid_password(""));
        assert!(!valid_password("1234567"));
        assert!(!valid_password("short"));
    }
}
