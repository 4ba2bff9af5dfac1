//! Form validation for client and interaction input.
//!
//! Runs at the store boundary before anything is written. The scoring engine
//! assumes well-formed records and never calls into this module.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{EngineError, ValidationErrors};

pub const NAME_MIN_LENGTH: usize = 2;
pub const NAME_MAX_LENGTH: usize = 100;
pub const PHONE_MIN_DIGITS: usize = 10;
pub const DESCRIPTION_MIN_LENGTH: usize = 5;
pub const DESCRIPTION_MAX_LENGTH: usize = 500;

fn phone_pattern() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^[+]?[0-9\s\-()]+$").expect("phone pattern is valid"))
}

/// Check a client's name and phone. All failing fields are reported together.
pub fn validate_client_form(name: &str, phone: &str) -> Result<(), EngineError> {
    let mut errors = ValidationErrors::new();

    let name = name.trim();
    let name_len = name.chars().count();
    if name.is_empty() {
        errors.insert("name".into(), "Name is required".into());
    } else if name_len < NAME_MIN_LENGTH {
        errors.insert(
            "name".into(),
            format!("Name must be at least {} characters", NAME_MIN_LENGTH),
        );
    } else if name_len > NAME_MAX_LENGTH {
        errors.insert(
            "name".into(),
            format!("Name cannot be longer than {} characters", NAME_MAX_LENGTH),
        );
    }

    if phone.trim().is_empty() {
        errors.insert("phone".into(), "Phone is required".into());
    } else if !phone_pattern().is_match(phone) {
        errors.insert("phone".into(), "Phone has an invalid format".into());
    } else if phone.chars().filter(|c| c.is_ascii_digit()).count() < PHONE_MIN_DIGITS {
        errors.insert(
            "phone".into(),
            format!("Phone must have at least {} digits", PHONE_MIN_DIGITS),
        );
    }

    into_result(errors)
}

/// Check an interaction description.
pub fn validate_interaction_form(description: &str) -> Result<(), EngineError> {
    let mut errors = ValidationErrors::new();

    let description = description.trim();
    let len = description.chars().count();
    if description.is_empty() {
        errors.insert("description".into(), "Description is required".into());
    } else if len < DESCRIPTION_MIN_LENGTH {
        errors.insert(
            "description".into(),
            format!(
                "Description must be at least {} characters",
                DESCRIPTION_MIN_LENGTH
            ),
        );
    } else if len > DESCRIPTION_MAX_LENGTH {
        errors.insert(
            "description".into(),
            format!(
                "Description cannot be longer than {} characters",
                DESCRIPTION_MAX_LENGTH
            ),
        );
    }

    into_result(errors)
}

fn into_result(errors: ValidationErrors) -> Result<(), EngineError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Validation(errors))
    }
}
