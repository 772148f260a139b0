//! Request input rules: display names, passwords, pagination.

use crate::error::CoreError;

pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 64;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 64;

/// Characters accepted as the "special character" in a password.
pub const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Trim and length-check a display name, returning the trimmed value.
pub fn validate_display_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len < MIN_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Name must be at least {MIN_NAME_LENGTH} characters"
        )));
    }
    if len > MAX_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Enforce length bounds and character classes for a new password.
///
/// `label` names the field in the error message (e.g. `"New password"`).
pub fn validate_password_strength(label: &str, password: &str) -> Result<(), CoreError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "{label} must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "{label} must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c));

    if !(has_lower && has_upper && has_digit && has_special) {
        return Err(CoreError::Validation(format!(
            "{label} must contain at least one uppercase letter, one lowercase letter, \
             one number, and one special character"
        )));
    }
    Ok(())
}

/// Resolve optional paging parameters into `(limit, offset)`.
pub fn validate_pagination(page: Option<i64>, limit: Option<i64>) -> Result<(i64, i64), CoreError> {
    let page = page.unwrap_or(DEFAULT_PAGE);
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);

    if page < 1 {
        return Err(CoreError::Validation("Page must be at least 1".into()));
    }
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(CoreError::Validation(format!(
            "Limit must be between 1 and {MAX_PAGE_LIMIT}"
        )));
    }
    let offset = page
        .checked_sub(1)
        .and_then(|p| p.checked_mul(limit))
        .ok_or_else(|| CoreError::Validation("Page is out of range".into()))?;
    Ok((limit, offset))
}
