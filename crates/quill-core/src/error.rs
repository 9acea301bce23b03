//! # Form Validation Errors
//!
//! Field-level errors produced by the validators in [`crate::forms`].
//! Messages are the ones shown next to form fields, so they are written
//! for visitors rather than operators.

use thiserror::Error;

/// A single validator failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The field was missing or contained only whitespace.
    #[error("This field is required.")]
    Required,

    /// The value does not look like an email address.
    #[error("Invalid email address.")]
    InvalidEmail,

    /// The value is not an absolute http(s) URL.
    #[error("Invalid URL.")]
    InvalidUrl,

    /// A confirmation field differs from the field it confirms.
    #[error("Passwords do not match")]
    Mismatch,

    /// The value has more characters than its database column holds.
    #[error("Field cannot be longer than {max} characters.")]
    TooLong {
        /// Largest accepted length, in characters.
        max: usize,
    },
}

/// A validator failure attached to the form field it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Name of the form field (the HTML `name` attribute).
    pub field: &'static str,
    /// What was wrong with it.
    pub error: ValidationError,
}

/// All field errors of one submission, in field declaration order.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("form has {} invalid field(s)", .0.len())]
pub struct FormErrors(Vec<FieldError>);

impl FormErrors {
    /// An empty error set.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Record the outcome of validating `field`. `Ok` results are ignored.
    pub fn record(&mut self, field: &'static str, outcome: Result<(), ValidationError>) {
        if let Err(error) = outcome {
            self.0.push(FieldError { field, error });
        }
    }

    /// True when no field failed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failed fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The first error message for `field`, if any.
    pub fn message_for(&self, field: &str) -> Option<String> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.error.to_string())
    }

    /// Whether `field` failed validation.
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// Iterate over all field errors.
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// `Ok(value)` when nothing failed, `Err(self)` otherwise.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_ignores_ok() {
        let mut errors = FormErrors::new();
        errors.record("title", Ok(()));
        assert!(errors.is_empty());
        assert_eq!(errors.into_result(7), Ok(7));
    }

    #[test]
    fn message_for_returns_first_error() {
        let mut errors = FormErrors::new();
        errors.record("email", Err(ValidationError::Required));
        errors.record("email", Err(ValidationError::InvalidEmail));
        assert_eq!(
            errors.message_for("email").as_deref(),
            Some("This field is required.")
        );
        assert!(errors.message_for("name").is_none());
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn display_counts_fields() {
        let mut errors = FormErrors::new();
        errors.record("body", Err(ValidationError::Required));
        assert_eq!(errors.to_string(), "form has 1 invalid field(s)");
    }

    #[test]
    fn mismatch_message_matches_form_copy() {
        assert_eq!(ValidationError::Mismatch.to_string(), "Passwords do not match");
    }

    #[test]
    fn too_long_names_the_limit() {
        assert_eq!(
            ValidationError::TooLong { max: 50 }.to_string(),
            "Field cannot be longer than 50 characters."
        );
    }
}
