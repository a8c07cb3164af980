use std::borrow::Cow;
use std::collections::HashMap;
use std::time::SystemTime;

use regex::Regex;
use validator::{ValidationError, ValidationErrors};

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    lazy_static! {
        static ref PHONE_VALIDATION_RE: Regex = Regex::new(r"^\+?\d{7}\d*$").unwrap();
    }

    if PHONE_VALIDATION_RE.is_match(phone) {
        Ok(())
    } else {
        Err(ValidationError {
            code: Cow::from("phone"),
            message: Some(Cow::from("Incorrect phone format")),
            params: HashMap::new(),
        })
    }
}

pub fn validate_non_negative(value: f64) -> Result<(), ValidationError> {
    if value >= 0f64 {
        Ok(())
    } else {
        Err(ValidationError {
            code: Cow::from("value"),
            message: Some(Cow::from("Value must be non negative.")),
            params: HashMap::new(),
        })
    }
}

pub fn validate_positive_quantity(quantity: i32) -> Result<(), ValidationError> {
    if quantity >= 1 {
        Ok(())
    } else {
        Err(ValidationError {
            code: Cow::from("quantity"),
            message: Some(Cow::from("Value must be at least one.")),
            params: HashMap::new(),
        })
    }
}

/// Coupon validity window invariant: `valid_from <= valid_until`.
pub fn validate_coupon_window(valid_from: SystemTime, valid_until: SystemTime) -> Result<(), ValidationErrors> {
    if valid_from <= valid_until {
        Ok(())
    } else {
        let mut errors = ValidationErrors::new();
        errors.add(
            "valid_until",
            ValidationError {
                code: Cow::from("window"),
                message: Some(Cow::from("valid_until must not precede valid_from")),
                params: HashMap::new(),
            },
        );
        Err(errors)
    }
}
