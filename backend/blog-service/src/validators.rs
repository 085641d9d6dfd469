/// Input validation utilities for accounts and posts
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use validator::ValidationError;

// Compile regex patterns once at startup
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("hardcoded email regex is invalid - fix source code")
});

static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w.@+-]{1,150}$").expect("hardcoded username regex is invalid - fix source code")
});

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_TITLE_LENGTH: usize = 100;

pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
pub const REQUIRED: &str = "This field is required.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "12345678", "123456789", "1234567890",
    "qwerty123", "qwertyuiop", "iloveyou", "sunshine", "princess", "football",
    "baseball", "welcome1", "letmein1", "trustno1", "abc12345", "11111111",
    "00000000", "passw0rd", "admin123", "superman", "starwars", "whatever",
];

/// Validate email format (RFC 5322 simplified)
pub fn validate_email(email: &str) -> bool {
    !email.is_empty() && email.len() <= 254 && EMAIL_REGEX.is_match(email)
}

/// Validate username format (1-150 characters: letters, digits and @/./+/-/_)
pub fn validate_username(username: &str) -> bool {
    USERNAME_REGEX.is_match(username)
}

/// validator crate compatible custom validator for email shape
pub fn validate_email_shape_validator(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Err(ValidationError::new("required").with_message(Cow::Borrowed(REQUIRED)));
    }
    if validate_email(email) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_email").with_message(Cow::Borrowed(INVALID_EMAIL)))
    }
}

/// validator crate compatible custom validator for username shape
pub fn validate_username_shape_validator(username: &str) -> Result<(), ValidationError> {
    if username.is_empty() {
        return Err(ValidationError::new("required").with_message(Cow::Borrowed(REQUIRED)));
    }
    if validate_username(username) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username").with_message(Cow::Borrowed(INVALID_USERNAME)))
    }
}

/// validator crate compatible custom validator for post titles (1-100 characters)
pub fn validate_post_title(title: &str) -> Result<(), ValidationError> {
    let length = title.trim().chars().count();
    if length == 0 {
        return Err(ValidationError::new("required").with_message(Cow::Borrowed(REQUIRED)));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        let message = format!(
            "Ensure this value has at most {} characters (it has {}).",
            MAX_TITLE_LENGTH,
            title.chars().count()
        );
        return Err(ValidationError::new("max_length").with_message(Cow::Owned(message)));
    }
    Ok(())
}

/// Validate password strength against the account it is for.
///
/// Returns every failed rule, in a stable order:
/// - too similar to the username or the email's local part
/// - shorter than 8 characters
/// - one of a list of common passwords
/// - entirely numeric
pub fn password_problems(password: &str, username: &str, email: &str) -> Vec<String> {
    let mut problems = Vec::new();
    let lowered = password.to_lowercase();

    let email_local = email.split('@').next().unwrap_or_default();
    for (attribute, value) in [("username", username), ("email address", email_local)] {
        let value = value.to_lowercase();
        if value.len() >= 3
            && !lowered.is_empty()
            && (lowered.contains(&value) || value.contains(&lowered))
        {
            problems.push(format!("The password is too similar to the {}.", attribute));
            break;
        }
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }

    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        problems.push("This password is too common.".to_string());
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }

    problems
}
