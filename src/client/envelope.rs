//! Response shapes the client accepts from the todo API.
//!
//! Servers in the wild wrap payloads differently; each shape is decoded once
//! here and converted into plain items.

use serde::Deserialize;

use crate::models::Todo;

/// A list response: a bare array or an object wrapping the array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope {
    Bare(Vec<Todo>),
    Wrapped {
        #[serde(alias = "items")]
        todos: Vec<Todo>,
        #[serde(default)]
        total: Option<u64>,
    },
}

impl ListEnvelope {
    pub fn into_items(self) -> Vec<Todo> {
        match self {
            ListEnvelope::Bare(items) => items,
            ListEnvelope::Wrapped { todos, total } => {
                if total.is_some_and(|t| t as usize != todos.len()) {
                    tracing::debug!(?total, received = todos.len(), "List total differs from items");
                }
                todos
            }
        }
    }
}

/// A single-item response: `{ "data": item }` or the bare item.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ItemEnvelope {
    Wrapped { data: Todo },
    Bare(Todo),
}

impl ItemEnvelope {
    pub fn into_item(self) -> Todo {
        match self {
            ItemEnvelope::Wrapped { data } => data,
            ItemEnvelope::Bare(item) => item,
        }
    }
}
