use once_cell::sync::Lazy;
use regex::Regex;

pub fn is_ascii_no_spaces(username: &str) -> Result<(), String> {
    match username.chars().all(|c| c.is_ascii() && !c.is_whitespace()) {
        true => Ok(()),
        false => Err("should be an ascii string without spaces".to_string()),
    }
}

pub fn is_valid_username(username: &str) -> Result<(), String> {
    if username.is_empty() || username.len() > 150 {
        return Err("username must be between 1 and 150 characters".to_string());
    }
    is_ascii_no_spaces(username).map_err(|e| format!("username {e}"))
}

pub fn is_valid_email(string: &str) -> Result<(), String> {
    static RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
        r#"^(?:[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*|"(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21\x23-\x5b\x5d-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])*")@(?:(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?|\[(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?|[a-z0-9-]*[a-z0-9]:(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21-\x5a\x53-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])+)\])$"#
    ).expect("email regex is valid")
    });
    match RE.is_match(&string.to_ascii_lowercase()) {
        true => Ok(()),
        false => Err("invalid email".to_string()),
    }
}

/// Participant display names ("surname, initials").
pub fn is_valid_display_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    match (1..=100).contains(&len) {
        true => Ok(()),
        false => Err("name must be between 1 and 100 characters".to_string()),
    }
}

#[cfg(test)]
#[test]
fn test_email() {
    assert!(is_valid_email("hello@example.com").is_ok());
    assert!(is_valid_email("Hello@Example.com").is_ok());
    assert!(is_valid_email("not an email").is_err());
}

#[cfg(test)]
#[test]
fn test_display_name() {
    assert!(is_valid_display_name("Ivanova A. B.").is_ok());
    assert!(is_valid_display_name("   ").is_err());
    assert!(is_valid_display_name(&"x".repeat(101)).is_err());
}
