//! Filter and search over the full item list.

use std::fmt;
use std::str::FromStr;

use console::style;

use crate::models::Todo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub const ALL: [Filter; 3] = [Filter::All, Filter::Active, Filter::Completed];

    pub fn label(self) -> &'static str {
        match self {
            Filter::All => "All",
            Filter::Active => "Active",
            Filter::Completed => "Completed",
        }
    }

    pub fn matches(self, todo: &Todo) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !todo.completed,
            Filter::Completed => todo.completed,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Completed => "completed",
        })
    }
}

impl FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" | "done" => Ok(Filter::Completed),
            other => Err(format!(
                "unknown filter '{}' (expected all, active or completed)",
                other
            )),
        }
    }
}

/// Case-insensitive substring match over title and description.
/// A blank query matches everything.
pub fn matches_search(todo: &Todo, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    todo.title.to_lowercase().contains(&query)
        || todo
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&query))
}

/// Items passing the filter and search, incomplete first, newest first.
pub fn visible_items<'a>(items: &'a [Todo], filter: Filter, query: &str) -> Vec<&'a Todo> {
    let mut visible: Vec<&Todo> = items
        .iter()
        .filter(|t| filter.matches(t) && matches_search(t, query))
        .collect();
    visible.sort_by(|a, b| {
        a.completed
            .cmp(&b.completed)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    visible
}

/// Counts over the full list, independent of the active filter and search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterCounts {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl FilterCounts {
    pub fn from_items(items: &[Todo]) -> Self {
        let completed = items.iter().filter(|t| t.completed).count();
        Self {
            total: items.len(),
            active: items.len() - completed,
            completed,
        }
    }

    pub fn count_for(&self, filter: Filter) -> usize {
        match filter {
            Filter::All => self.total,
            Filter::Active => self.active,
            Filter::Completed => self.completed,
        }
    }

    /// Completion percentage, rounded; 0 for an empty list.
    pub fn percentage(&self) -> u32 {
        if self.total == 0 {
            0
        } else {
            (self.completed as f64 / self.total as f64 * 100.0).round() as u32
        }
    }
}

/// One-line filter bar: the three tabs with counts, plus the active search.
pub fn render_filter_bar(current: Filter, query: &str, counts: &FilterCounts) -> String {
    let tabs: Vec<String> = Filter::ALL
        .iter()
        .map(|&f| {
            let tab = format!("{} ({})", f.label(), counts.count_for(f));
            if f == current {
                style(format!("[{}]", tab)).cyan().bold().to_string()
            } else {
                style(format!(" {} ", tab)).dim().to_string()
            }
        })
        .collect();

    let mut line = tabs.join(" ");
    if !query.trim().is_empty() {
        line.push_str(&format!(
            "   {} \"{}\"",
            style("search:").dim(),
            query.trim()
        ));
    }
    line
}
