//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (interval > 0, sizes > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SidecarConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::SidecarConfig;

/// A single semantic problem found in a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check the config for values serde accepts but the sidecar cannot run with.
pub fn validate_config(config: &SidecarConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.trim().is_empty() {
        errors.push(ValidationError::new("listener.host", "must not be empty"));
    }

    if config.log_sink.file_name.trim().is_empty() {
        errors.push(ValidationError::new("log_sink.file_name", "must not be empty"));
    } else if config.log_sink.file_name.contains(['/', '\\']) {
        errors.push(ValidationError::new(
            "log_sink.file_name",
            "must be a bare file name, not a path",
        ));
    }

    if config.log_sink.max_bytes == 0 {
        errors.push(ValidationError::new("log_sink.max_bytes", "must be greater than 0"));
    }

    if config.stream.interval_ms == 0 {
        errors.push(ValidationError::new("stream.interval_ms", "must be greater than 0"));
    }

    if config.stream.buffer == 0 {
        errors.push(ValidationError::new("stream.buffer", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
