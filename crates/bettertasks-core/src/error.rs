use thiserror::Error;

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Failure of a single API call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{label} failed with HTTP {status}: {}", detail.as_deref().unwrap_or("no detail"))]
    Status {
        label: &'static str,
        status: u16,
        detail: Option<String>,
    },

    #[error("{label} request failed: {source}")]
    Transport {
        label: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{label} returned an unreadable body: {source}")]
    Decode {
        label: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    /// Server-provided detail, if the backend sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    pub fn user_message(&self) -> &str {
        self.detail().unwrap_or(GENERIC_FAILURE)
    }
}

/// Input rejected before any request is issued.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please fill in all fields.")]
    MissingFields,
    #[error("Please enter your name.")]
    MissingName,
    #[error("Password must be at least 6 characters.")]
    PasswordTooShort,
    #[error("task title cannot be empty")]
    EmptyTitle,
    #[error("list name cannot be empty")]
    EmptyListName,
    #[error("invalid priority '{0}' (expected High, Medium or Low)")]
    InvalidPriority(String),
    #[error("invalid theme '{0}' (expected light or dark)")]
    InvalidTheme(String),
    #[error("unknown list id {0}")]
    UnknownList(u64),
}

/// Message to show for a failed user action: server detail or validation
/// text when available, the generic failure otherwise.
pub fn user_message(err: &anyhow::Error) -> String {
    if let Some(validation) = err.downcast_ref::<ValidationError>() {
        return validation.to_string();
    }
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ApiError>())
        .map(|api| api.user_message().to_string())
        .unwrap_or_else(|| GENERIC_FAILURE.to_string())
}
