//! Form error adapter
//!
//! Maps field-level validation errors surfaced by the backend onto named
//! form fields. This is the sole bridge between the data layer's error
//! type and form-rendering collaborators.

use crate::api::types::ApiClientError;
use std::collections::HashMap;

/// Reserved slot for errors that belong to no particular field
pub const ROOT_FIELD: &str = "root";

/// Field name to error message mapping for one form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors {
    fields: HashMap<String, String>,
}

impl FormErrors {
    /// Map an API error onto form fields
    ///
    /// Field-level errors win over the general message; each field gets its
    /// first message. The optional `field_mapping` renames API field names
    /// to form field names (identity when absent or unmapped). A general
    /// error with no field errors lands in the `root` slot.
    pub fn from_api_error(
        error: &ApiClientError,
        field_mapping: Option<&HashMap<String, String>>,
    ) -> Self {
        let mut fields = HashMap::new();

        if let Some(errors) = &error.errors {
            for (field, messages) in errors {
                let form_field = field_mapping
                    .and_then(|mapping| mapping.get(field))
                    .cloned()
                    .unwrap_or_else(|| field.clone());

                if let Some(message) = messages.first() {
                    fields.insert(form_field, message.clone());
                }
            }
            return Self { fields };
        }

        if !error.message.is_empty() {
            fields.insert(ROOT_FIELD.to_string(), error.message.clone());
        }

        Self { fields }
    }

    /// Get the error message for a field, if any
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(|s| s.as_str())
    }

    /// The general (non-field) error, if any
    pub fn root(&self) -> Option<&str> {
        self.get(ROOT_FIELD)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// Check if an error carries field-level validation errors
pub fn has_field_errors(error: &ApiClientError) -> bool {
    error
        .errors
        .as_ref()
        .map(|errors| !errors.is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_error() -> ApiClientError {
        let mut errors = HashMap::new();
        errors.insert(
            "email".to_string(),
            vec!["Format email tidak valid".to_string(), "second".to_string()],
        );
        errors.insert("whatsapp".to_string(), vec!["Required".to_string()]);
        ApiClientError::with_errors(422, "Validation failed", errors)
    }

    #[test]
    fn test_field_errors_take_precedence() {
        let form = FormErrors::from_api_error(&validation_error(), None);

        assert_eq!(form.get("email"), Some("Format email tidak valid"));
        assert_eq!(form.get("whatsapp"), Some("Required"));
        assert_eq!(form.root(), None);
    }

    #[test]
    fn test_field_mapping_renames() {
        let mut mapping = HashMap::new();
        mapping.insert("email".to_string(), "email_address".to_string());

        let form = FormErrors::from_api_error(&validation_error(), Some(&mapping));

        assert_eq!(form.get("email_address"), Some("Format email tidak valid"));
        assert_eq!(form.get("email"), None);
        // Unmapped fields keep their API name
        assert_eq!(form.get("whatsapp"), Some("Required"));
    }

    #[test]
    fn test_general_error_goes_to_root() {
        let error = ApiClientError::new(500, "Something went wrong");
        let form = FormErrors::from_api_error(&error, None);

        assert_eq!(form.root(), Some("Something went wrong"));
        assert_eq!(form.len(), 1);
    }

    #[test]
    fn test_has_field_errors() {
        assert!(has_field_errors(&validation_error()));
        assert!(!has_field_errors(&ApiClientError::new(500, "boom")));
        assert!(!has_field_errors(&ApiClientError::with_errors(
            422,
            "empty",
            HashMap::new()
        )));
    }
}
