use std::path::PathBuf;

/// Precondition failures raised before any side effect takes place.
///
/// Runtime failures of the host primitives (fetch, extraction, filesystem)
/// are carried as `anyhow` errors with context instead; callers that need to
/// tell the two apart use `anyhow::Error::downcast_ref::<IngredientError>()`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngredientError {
    #[error("Package must be specified: {0}")]
    MissingFlavor(String),

    #[error("{resource}: {property} is required")]
    MissingProperty {
        resource: String,
        property: &'static str,
    },

    #[error("Unsupported Combination: {0}")]
    UnsupportedCombination(String),

    #[error("{0}")]
    Conflict(String),

    #[error("invalid version '{input}': unexpected token '{token}'")]
    InvalidVersion { input: String, token: String },

    #[error("Attempted to reference Splunk installation that does not exist: {}", .0.display())]
    MissingInstallation(PathBuf),
}

impl IngredientError {
    pub fn missing_property(resource: impl Into<String>, property: &'static str) -> Self {
        Self::MissingProperty {
            resource: resource.into(),
            property,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}
