use chrono::{DateTime, Utc};
use console::style;

use super::icons::{DONE_BOX, OPEN_BOX};
use crate::models::Todo;

/// Human-friendly age of a timestamp relative to `now`.
pub fn relative_date(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - ts).num_seconds();
    if secs < 3600 {
        "just now".to_string()
    } else if secs < 24 * 3600 {
        format!("{}h ago", secs / 3600)
    } else if secs < 48 * 3600 {
        "yesterday".to_string()
    } else {
        ts.format("%-d %b").to_string()
    }
}

/// Render one numbered item: checkbox, title, age, and the description
/// on an indented second line.
pub fn render_row(index: usize, todo: &Todo, now: DateTime<Utc>) -> String {
    let number = style(format!("{:>3}.", index)).dim();
    let (mark, title) = if todo.completed {
        (
            style(DONE_BOX.to_string()).green(),
            style(todo.title.clone()).strikethrough().dim(),
        )
    } else {
        (style(OPEN_BOX.to_string()).white(), style(todo.title.clone()).bold())
    };

    let mut age = relative_date(todo.created_at, now);
    if todo.updated_at != todo.created_at {
        age.push_str(&format!(", edited {}", relative_date(todo.updated_at, now)));
    }

    let mut out = format!("{} {}{}  {}", number, mark, title, style(format!("({})", age)).dim());
    if let Some(description) = todo.description_text() {
        out.push('\n');
        for line in description.lines() {
            out.push_str(&format!("        {}\n", style(line).dim()));
        }
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hours_ago: i64, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::hours(hours_ago)
    }

    #[test]
    fn test_relative_date_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(relative_date(now - Duration::minutes(59), now), "just now");
        assert_eq!(relative_date(at(1, now), now), "1h ago");
        assert_eq!(relative_date(at(23, now), now), "23h ago");
        assert_eq!(relative_date(at(24, now), now), "yesterday");
        assert_eq!(relative_date(at(47, now), now), "yesterday");
        assert_eq!(relative_date(at(48, now), now), "8 Mar");
    }

    #[test]
    fn test_relative_date_future_is_just_now() {
        let now = Utc::now();
        assert_eq!(relative_date(now + Duration::minutes(5), now), "just now");
    }

    #[test]
    fn test_render_row_plain_text() {
        let now = Utc::now();
        let todo = Todo {
            id: "1".into(),
            title: "Buy milk".into(),
            description: Some("2 litres\nsemi-skimmed".into()),
            completed: false,
            created_at: at(3, now),
            updated_at: at(3, now),
        };
        let row = console::strip_ansi_codes(&render_row(1, &todo, now)).to_string();
        let lines: Vec<&str> = row.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("1."));
        assert!(lines[0].contains("Buy milk"));
        assert!(lines[0].contains("(3h ago)"));
        assert!(lines[1].trim() == "2 litres");
        assert!(lines[2].trim() == "semi-skimmed");
    }

    #[test]
    fn test_render_row_completed_and_edited() {
        let now = Utc::now();
        let todo = Todo {
            id: "1".into(),
            title: "Done thing".into(),
            description: Some("   ".into()),
            completed: true,
            created_at: at(30, now),
            updated_at: now,
        };
        let row = console::strip_ansi_codes(&render_row(2, &todo, now)).to_string();
        assert_eq!(row.lines().count(), 1);
        assert!(row.contains("Done thing"));
        assert!(row.contains("yesterday, edited just now"));
    }
}
