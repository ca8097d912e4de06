use chrono::{DateTime, Utc};
use console::style;

use super::filters::{Filter, FilterCounts, visible_items};
use super::icons::{CLIPBOARD, CROSS, PARTY, PLUS, PROGRESS, SEARCH};
use super::item_row::render_row;
use crate::state::Snapshot;

const PROGRESS_BAR_WIDTH: usize = 20;

/// Copy shown when nothing passes the current filter and search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmptyState {
    pub title: &'static str,
    pub message: String,
}

pub fn empty_state(filter: Filter, query: &str) -> EmptyState {
    let query = query.trim();
    if !query.is_empty() {
        return EmptyState {
            title: "No results",
            message: format!("No todo matches \"{}\"", query),
        };
    }
    match filter {
        Filter::Active => EmptyState {
            title: "All todos are done!",
            message: "Congratulations! You have completed every todo.".to_string(),
        },
        Filter::Completed => EmptyState {
            title: "No completed todos",
            message: "Todos you complete will show up here.".to_string(),
        },
        Filter::All => EmptyState {
            title: "No todos",
            message: "Start by adding your first todo!".to_string(),
        },
    }
}

/// Render the list area for a snapshot: loading placeholder, error state,
/// empty state, or numbered rows.
///
/// Returns the rendered text and the ids in display order, so a row
/// number picked by the user maps back to an item.
pub fn render_list(
    snapshot: &Snapshot,
    filter: Filter,
    query: &str,
    now: DateTime<Utc>,
) -> (String, Vec<String>) {
    if snapshot.loading && snapshot.items.is_empty() {
        return (style("Loading todos...").dim().to_string(), Vec::new());
    }

    let mut out = String::new();
    if let Some(error) = &snapshot.error {
        out.push_str(&format!("{}{}\n", CROSS, style(error).red()));
        if snapshot.items.is_empty() {
            out.push_str(&style("Choose \"Refresh\" to try again.").dim().to_string());
            return (out, Vec::new());
        }
        out.push('\n');
    }

    let visible = visible_items(&snapshot.items, filter, query);
    if visible.is_empty() {
        let empty = empty_state(filter, query);
        let icon = if !query.trim().is_empty() {
            SEARCH
        } else {
            match filter {
                Filter::Active => PARTY,
                Filter::Completed => CLIPBOARD,
                Filter::All => PLUS,
            }
        };
        out.push_str(&format!(
            "{}{}\n   {}",
            icon,
            style(empty.title).bold(),
            style(empty.message).dim()
        ));
        return (out, Vec::new());
    }

    let rows: Vec<String> = visible
        .iter()
        .enumerate()
        .map(|(i, todo)| render_row(i + 1, todo, now))
        .collect();
    out.push_str(&rows.join("\n"));
    let ids = visible.iter().map(|t| t.id.clone()).collect();
    (out, ids)
}

/// Summary line with a completion bar, e.g. `3 todos · 2 active · 1 done  [██████░░...] 33%`.
pub fn render_stats(counts: &FilterCounts) -> String {
    let pct = counts.percentage();
    let filled = (pct as usize * PROGRESS_BAR_WIDTH) / 100;
    let bar = format!(
        "{}{}",
        "█".repeat(filled),
        "░".repeat(PROGRESS_BAR_WIDTH - filled)
    );
    format!(
        "{}{} {} · {} active · {} done  {} {}%",
        PROGRESS,
        counts.total,
        if counts.total == 1 { "todo" } else { "todos" },
        counts.active,
        counts.completed,
        style(bar).green(),
        pct
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Todo;

    fn plain(s: &str) -> String {
        console::strip_ansi_codes(s).to_string()
    }

    fn item(id: &str, title: &str, completed: bool) -> Todo {
        let now = Utc::now();
        Todo {
            id: id.into(),
            title: title.into(),
            description: None,
            completed,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_state_depends_on_search_then_filter() {
        assert_eq!(empty_state(Filter::Active, "milk").title, "No results");
        assert!(empty_state(Filter::All, "milk").message.contains("\"milk\""));
        assert_eq!(empty_state(Filter::Active, "").title, "All todos are done!");
        assert_eq!(empty_state(Filter::Completed, " ").title, "No completed todos");
        assert_eq!(empty_state(Filter::All, "").title, "No todos");
    }

    #[test]
    fn test_loading_placeholder_only_when_empty() {
        let snapshot = Snapshot {
            loading: true,
            ..Snapshot::default()
        };
        let (text, ids) = render_list(&snapshot, Filter::All, "", Utc::now());
        assert_eq!(plain(&text), "Loading todos...");
        assert!(ids.is_empty());

        let snapshot = Snapshot {
            items: vec![item("1", "Visible", false)],
            loading: true,
            error: None,
        };
        let (text, ids) = render_list(&snapshot, Filter::All, "", Utc::now());
        assert!(plain(&text).contains("Visible"));
        assert_eq!(ids, vec!["1"]);
    }

    #[test]
    fn test_error_state() {
        let snapshot = Snapshot {
            items: Vec::new(),
            loading: false,
            error: Some("Failed to load todos: Cannot reach the server".into()),
        };
        let (text, _) = render_list(&snapshot, Filter::All, "", Utc::now());
        let text = plain(&text);
        assert!(text.contains("Cannot reach the server"));
        assert!(text.contains("Refresh"));

        let snapshot = Snapshot {
            items: vec![item("1", "Still here", false)],
            ..snapshot
        };
        let (text, ids) = render_list(&snapshot, Filter::All, "", Utc::now());
        assert!(plain(&text).contains("Still here"));
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn test_rows_in_display_order() {
        let snapshot = Snapshot {
            items: vec![item("done", "Done", true), item("open", "Open", false)],
            loading: false,
            error: None,
        };
        let (text, ids) = render_list(&snapshot, Filter::All, "", Utc::now());
        assert_eq!(ids, vec!["open", "done"]);
        let text = plain(&text);
        assert!(text.find("Open").unwrap() < text.find("Done").unwrap());
    }

    #[test]
    fn test_empty_filter_renders_empty_state() {
        let snapshot = Snapshot {
            items: vec![item("1", "Open", false)],
            loading: false,
            error: None,
        };
        let (text, ids) = render_list(&snapshot, Filter::Completed, "", Utc::now());
        assert!(ids.is_empty());
        assert!(plain(&text).contains("No completed todos"));
    }

    #[test]
    fn test_render_stats() {
        let counts = FilterCounts {
            total: 4,
            active: 1,
            completed: 3,
        };
        let text = plain(&render_stats(&counts));
        assert!(text.contains("4 todos · 1 active · 3 done"));
        assert!(text.ends_with("75%"));
        assert_eq!(text.matches('█').count(), 15);

        let one = plain(&render_stats(&FilterCounts {
            total: 1,
            active: 1,
            completed: 0,
        }));
        assert!(one.contains("1 todo ·"));
        assert!(one.ends_with("0%"));
    }
}
