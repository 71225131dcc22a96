//! Sign-in and sign-up form schemas.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use validator::{Validate, ValidationError, ValidationErrors};

/// Sign-in payload.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignInForm {
    #[validate(custom(function = "email_required"), email(message = "Invalid email"))]
    pub identifier: String,
    #[validate(
        custom(function = "password_required"),
        length(min = 8, message = "Password must and should be 8 characters")
    )]
    pub password: String,
}

/// Sign-up payload. The confirmation must repeat the password.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpForm {
    #[validate(
        custom(function = "email_required"),
        email(message = "Please enter a valid email")
    )]
    pub email: String,
    #[validate(
        custom(function = "password_entered"),
        length(min = 8, message = "Password must be at least 8 characters long")
    )]
    pub password: String,
    #[validate(
        custom(function = "password_entered"),
        length(min = 8, message = "Password must be at least 8 characters long"),
        must_match(other = "password", message = "Passwords don't match")
    )]
    pub password_confirm: String,
}

fn required(value: &str, message: &'static str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new("required").with_message(Cow::Borrowed(message)));
    }
    Ok(())
}

fn email_required(value: &str) -> Result<(), ValidationError> {
    required(value, "Please enter an email")
}

fn password_required(value: &str) -> Result<(), ValidationError> {
    required(value, "password is required")
}

fn password_entered(value: &str) -> Result<(), ValidationError> {
    required(value, "Please enter a password")
}

/// Flatten validation errors into `field -> messages`, keyed by the wire name.
pub fn field_messages(errors: &ValidationErrors) -> BTreeMap<String, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (camel_case(&field), messages)
        })
        .collect()
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
