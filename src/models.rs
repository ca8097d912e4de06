//! Shared todo types and the validation rules both halves enforce.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    /// The description if it carries any text.
    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.trim().is_empty())
    }
}

/// Body of `POST /todos`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CreateTodo {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateTodo {
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            title: title.into(),
            description,
        }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        FieldErrors {
            title: validate_title(&self.title),
            description: validate_description(self.description.as_deref()),
        }
        .into_result()
    }
}

/// Body of `PUT /todos/{id}`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateTodo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl UpdateTodo {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        FieldErrors {
            title: self.title.as_deref().and_then(validate_title),
            description: validate_description(self.description.as_deref()),
        }
        .into_result()
    }
}

/// Per-field validation failures, as shown next to form inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }

    /// All messages joined on one line.
    pub fn summary(&self) -> String {
        [self.title.as_deref(), self.description.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary())
    }
}

pub fn validate_title(title: &str) -> Option<String> {
    if title.trim().is_empty() {
        Some("Title is required".to_string())
    } else if title.chars().count() > TITLE_MAX_CHARS {
        Some(format!("Title cannot exceed {} characters", TITLE_MAX_CHARS))
    } else {
        None
    }
}

pub fn validate_description(description: Option<&str>) -> Option<String> {
    match description {
        Some(d) if d.chars().count() > DESCRIPTION_MAX_CHARS => Some(format!(
            "Description cannot exceed {} characters",
            DESCRIPTION_MAX_CHARS
        )),
        _ => None,
    }
}

/// Blank descriptions are stored as absent.
pub fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|d| !d.trim().is_empty())
}

/// Current time at the precision timestamps are persisted with.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
