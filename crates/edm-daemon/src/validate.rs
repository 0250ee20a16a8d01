//! Request input checks.

use axum::extract::FromRequest;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, FieldError};

/// `Json<T>` whose rejection renders as a validation error.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub(crate) struct ApiJson<T>(pub T);

/// Collects every failed check so one response lists them all.
#[derive(Debug, Default)]
pub(crate) struct Checks(Vec<FieldError>);

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.0.push(FieldError::new(field, message));
        }
        self
    }

    /// Trimmed value must be non-empty; returns it when present.
    pub fn required(&mut self, value: Option<&str>, field: &str) -> String {
        let v = value.map(str::trim).unwrap_or_default();
        self.check(!v.is_empty(), field, "is required");
        v.to_string()
    }

    /// Parses an optional enum value; a present but unknown value is an error.
    pub fn one_of<T>(
        &mut self,
        value: Option<&str>,
        field: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Option<T> {
        let raw = value?;
        let parsed = parse(raw.trim());
        self.check(parsed.is_some(), field, "has an unsupported value");
        parsed
    }

    pub fn finish(&mut self) -> ApiResult<()> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(std::mem::take(&mut self.0)))
        }
    }
}

/// Structural email check: one `@`, non-empty local part, dotted domain.
pub(crate) fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|p| !p.is_empty())
        && !email.chars().any(char::is_whitespace)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Parses a bare string through the type's serde representation.
pub(crate) fn parse_serde<T: DeserializeOwned>(s: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).ok()
}

/// Path ids that do not parse address nothing, so they read as not found.
pub(crate) fn parse_id(raw: &str, what: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(what))
}
