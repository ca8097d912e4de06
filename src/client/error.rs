//! Typed errors for calls to the todo API.
//!
//! Lets callers distinguish failure modes without string matching:
//! - `Validation` (400 or rejected locally) - caller error; never retried
//! - `NotFound` (404)
//! - `Transport` - connection refused or timeout; retried
//! - `Server` - any other non-2xx; retried when 5xx
//! - `Decode` - a 2xx response whose payload could not be used

use thiserror::Error;

use crate::models::FieldErrors;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{message}")]
    Validation { message: String },

    #[error("{message}")]
    NotFound { message: String },

    /// No HTTP response was received.
    #[error("Network error: {message}")]
    Transport { message: String, timed_out: bool },

    #[error("{message}")]
    Server {
        status: u16,
        message: String,
        code: Option<String>,
    },

    #[error("Unexpected response: {message}")]
    Decode { message: String },

    #[error("Invalid client configuration: {message}")]
    Config { message: String },
}

impl ClientError {
    /// Build the error for a non-2xx response from its status and raw body.
    ///
    /// The body's `error` (or `message`) field becomes the message and its
    /// `code` field is kept when present.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let field = |name: &str| {
            parsed
                .as_ref()
                .and_then(|v| v.get(name))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        let message = field("error")
            .or_else(|| field("message"))
            .unwrap_or_else(|| format!("HTTP error! status: {}", status));

        match status {
            400 => ClientError::Validation { message },
            404 => ClientError::NotFound { message },
            _ => ClientError::Server {
                status,
                message,
                code: field("code"),
            },
        }
    }

    /// HTTP status associated with the failure. Transport failures report 0.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Validation { .. } => Some(400),
            ClientError::NotFound { .. } => Some(404),
            ClientError::Transport { .. } => Some(0),
            ClientError::Server { status, .. } => Some(*status),
            ClientError::Decode { .. } | ClientError::Config { .. } => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Server { code, .. } => code.as_deref(),
            ClientError::Transport { timed_out: true, .. } => Some("TIMEOUT"),
            ClientError::Transport { .. } => Some("NETWORK_ERROR"),
            _ => None,
        }
    }

    /// Check if a retry could succeed: transport failures and 5xx only.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Transport { .. } => true,
            ClientError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// One-line message suitable for an error banner.
    pub fn user_message(&self) -> String {
        let text = match self {
            ClientError::Transport {
                timed_out: true, ..
            } => "The server took too long to respond".to_string(),
            ClientError::Transport { .. } => "Cannot reach the server".to_string(),
            other => other.to_string(),
        };
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<FieldErrors> for ClientError {
    fn from(errors: FieldErrors) -> Self {
        ClientError::Validation {
            message: errors.summary(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ClientError::Decode {
                message: err.to_string(),
            };
        }
        if let Some(status) = err.status() {
            return ClientError::from_response(status.as_u16(), "");
        }
        if err.is_builder() {
            return ClientError::Config {
                message: err.to_string(),
            };
        }
        ClientError::Transport {
            message: err.to_string(),
            timed_out: err.is_timeout(),
        }
    }
}
