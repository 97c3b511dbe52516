//! Field rules shared by the request bodies.
//!
//! Each rule is a pure predicate paired with the message reported when it
//! fails. Request types wire them in through `#[validate(custom(...))]` and
//! [`crate::api::ValidatedJson`] turns the collected failures into a 400.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use validator::{ValidationError, ValidationErrors};

use crate::error::{AppError, FieldErrors};

pub const PASSWORD_MIN_LENGTH: usize = 8;

static SPECIAL_CHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s]").expect("valid special character pattern"));
static USERNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").expect("valid username pattern"));
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9 ()-]{6,20}$").expect("valid phone pattern"));

/// A named predicate and the message shown when it does not hold
pub struct Rule {
    pub code: &'static str,
    pub message: &'static str,
    pub check: fn(&str) -> bool,
}

/// Password composition, checked in order; the first failure is reported.
pub static PASSWORD_RULES: &[Rule] = &[
    Rule {
        code: "password_length",
        message: "Password must be at least 8 characters",
        check: |p| p.chars().count() >= PASSWORD_MIN_LENGTH,
    },
    Rule {
        code: "password_lowercase",
        message: "Password must contain at least one lowercase letter",
        check: |p| p.chars().any(char::is_lowercase),
    },
    Rule {
        code: "password_uppercase",
        message: "Password must contain at least one uppercase letter",
        check: |p| p.chars().any(char::is_uppercase),
    },
    Rule {
        code: "password_digit",
        message: "Password must contain at least one digit",
        check: |p| p.chars().any(|c| c.is_ascii_digit()),
    },
    Rule {
        code: "password_special",
        message: "Password must contain at least one special character",
        check: |p| SPECIAL_CHAR.is_match(p),
    },
];

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// First password rule that fails, if any
pub fn first_password_violation(password: &str) -> Option<&'static Rule> {
    PASSWORD_RULES.iter().find(|rule| !(rule.check)(password))
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    match first_password_violation(password) {
        Some(rule) => Err(error(rule.code, rule.message)),
        None => Ok(()),
    }
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("required", "This field is required"));
    }
    Ok(())
}

pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    if !USERNAME.is_match(value) {
        return Err(error(
            "username",
            "Username must be 3-32 characters of letters, digits, '_', '.' or '-'",
        ));
    }
    Ok(())
}

pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    if !PHONE.is_match(value) {
        return Err(error("phone", "Invalid phone number"));
    }
    Ok(())
}

/// Field names are reported the way they appear in JSON bodies
fn json_field_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let fields: FieldErrors = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("Invalid value ({})", e.code))
                    })
                    .collect();
                (json_field_name(&field), messages)
            })
            .collect();

        AppError::Validation(fields)
    }
}
