//! Interactive terminal app: renders the list and drives the state
//! container from prompt selections.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use console::{Term, style};
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};

use super::filters::{Filter, FilterCounts, render_filter_bar};
use super::form::TodoForm;
use super::icons::{CHECK, SPARKLE, TRASH};
use super::list::{render_list, render_stats};
use super::progress::with_spinner;
use crate::models::{TITLE_MAX_CHARS, Todo};
use crate::state::{Poller, Snapshot, TodoState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Edit,
    Toggle,
    Delete,
    Filter,
    Search,
    ClearSearch,
    Refresh,
    Quit,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Add => "Add a todo",
            Action::Edit => "Edit a todo",
            Action::Toggle => "Complete / reopen a todo",
            Action::Delete => "Delete a todo",
            Action::Filter => "Change filter",
            Action::Search => "Search",
            Action::ClearSearch => "Clear search",
            Action::Refresh => "Refresh",
            Action::Quit => "Quit",
        }
    }
}

/// Actions offered for the current screen. Row actions need visible rows.
pub fn available_actions(has_rows: bool, has_search: bool) -> Vec<Action> {
    let mut actions = vec![Action::Add];
    if has_rows {
        actions.extend([Action::Toggle, Action::Edit, Action::Delete]);
    }
    actions.extend([Action::Filter, Action::Search]);
    if has_search {
        actions.push(Action::ClearSearch);
    }
    actions.extend([Action::Refresh, Action::Quit]);
    actions
}

/// Ask before deleting. Any prompt failure counts as "no".
pub fn confirm_delete(title: &str) -> bool {
    Confirm::new()
        .with_prompt(format!("Delete \"{}\"?", title))
        .default(false)
        .interact()
        .unwrap_or(false)
}

pub struct App {
    state: Arc<TodoState>,
    filter: Filter,
    query: String,
    api_url: String,
    theme: ColorfulTheme,
    term: Term,
    _poller: Option<Poller>,
}

impl App {
    pub fn new(state: Arc<TodoState>, api_url: impl Into<String>) -> Self {
        Self {
            state,
            filter: Filter::default(),
            query: String::new(),
            api_url: api_url.into(),
            theme: ColorfulTheme::default(),
            term: Term::stdout(),
            _poller: None,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Refetch in the background every `period` while the app runs.
    pub fn with_polling(mut self, period: Duration) -> Self {
        self._poller = Some(self.state.spawn_poller(period));
        self
    }

    pub async fn run(&mut self) -> Result<()> {
        let _ = with_spinner("Loading todos...", self.state.refetch()).await;

        loop {
            let snapshot = self.state.snapshot().await;
            let ids = self.draw(&snapshot)?;

            let actions = available_actions(!ids.is_empty(), !self.query.trim().is_empty());
            let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
            let choice = Select::with_theme(&self.theme)
                .with_prompt("What next?")
                .items(&labels)
                .default(0)
                .interact_opt()?;

            let action = choice.map(|i| actions[i]).unwrap_or(Action::Quit);
            match action {
                Action::Add => self.add().await?,
                Action::Edit => self.edit(&snapshot, &ids).await?,
                Action::Toggle => {
                    if let Some(todo) = self.pick(&snapshot, &ids, "Toggle which todo?")? {
                        let _ = with_spinner("Saving...", self.state.toggle(&todo.id)).await;
                    }
                }
                Action::Delete => {
                    if let Some(todo) = self.pick(&snapshot, &ids, "Delete which todo?")? {
                        if confirm_delete(&todo.title) {
                            let _ =
                                with_spinner("Deleting...", self.state.delete(&todo.id)).await;
                        }
                    }
                }
                Action::Filter => self.choose_filter()?,
                Action::Search => {
                    self.query = Input::<String>::with_theme(&self.theme)
                        .with_prompt("Search")
                        .with_initial_text(self.query.clone())
                        .allow_empty(true)
                        .interact_text()?;
                }
                Action::ClearSearch => self.query.clear(),
                Action::Refresh => {
                    let _ = with_spinner("Refreshing...", self.state.refetch()).await;
                }
                Action::Quit => break,
            }
        }

        self.term.clear_screen()?;
        println!("{}Bye!", SPARKLE);
        Ok(())
    }

    /// Clear and redraw the screen. Returns the ids of the rows shown.
    fn draw(&self, snapshot: &Snapshot) -> Result<Vec<String>> {
        self.term.clear_screen()?;
        let counts = FilterCounts::from_items(&snapshot.items);
        let (list, ids) = render_list(snapshot, self.filter, &self.query, Utc::now());

        println!(
            "{}{}  {}",
            SPARKLE,
            style("Checky").bold().cyan(),
            style(&self.api_url).dim()
        );
        println!("{}", render_stats(&counts));
        println!("{}", render_filter_bar(self.filter, &self.query, &counts));
        println!();
        println!("{}", list);
        println!();
        Ok(ids)
    }

    fn pick(&self, snapshot: &Snapshot, ids: &[String], prompt: &str) -> Result<Option<Todo>> {
        let rows: Vec<&Todo> = ids
            .iter()
            .filter_map(|id| snapshot.items.iter().find(|t| &t.id == id))
            .collect();
        let labels: Vec<String> = rows
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let mark = if t.completed { "[x]" } else { "[ ]" };
                format!("{:>3}. {} {}", i + 1, mark, t.title)
            })
            .collect();

        let choice = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(&labels)
            .default(0)
            .interact_opt()?;
        Ok(choice.map(|i| rows[i].clone()))
    }

    async fn add(&self) -> Result<()> {
        let mut form = TodoForm::create();
        loop {
            self.prompt_fields(&mut form)?;
            match form.submit_create() {
                Ok(req) => {
                    if let Ok(todo) = with_spinner("Creating...", self.state.create(req)).await {
                        println!("{}Added \"{}\"", CHECK, todo.title);
                    }
                    return Ok(());
                }
                Err(_) => {
                    println!("{}", form.render());
                    if !self.retry_prompt()? {
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn edit(&self, snapshot: &Snapshot, ids: &[String]) -> Result<()> {
        let Some(todo) = self.pick(snapshot, ids, "Edit which todo?")? else {
            return Ok(());
        };
        let mut form = TodoForm::edit(&todo);
        loop {
            self.prompt_fields(&mut form)?;
            match form.submit_edit() {
                Ok(None) => return Ok(()),
                Ok(Some(update)) => {
                    let _ = with_spinner("Saving...", self.state.update(&todo.id, update)).await;
                    return Ok(());
                }
                Err(_) => {
                    println!("{}", form.render());
                    if !self.retry_prompt()? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Prompt for both fields, pre-filled from the form.
    fn prompt_fields(&self, form: &mut TodoForm) -> Result<()> {
        let title = Input::<String>::with_theme(&self.theme)
            .with_prompt(format!("Title (max {})", TITLE_MAX_CHARS))
            .with_initial_text(form.title().to_string())
            .allow_empty(true)
            .interact_text()?;
        form.set_title(title);

        let description = Input::<String>::with_theme(&self.theme)
            .with_prompt("Description (optional)")
            .with_initial_text(form.description().to_string())
            .allow_empty(true)
            .interact_text()?;
        form.set_description(description);

        println!(
            "{}",
            style(format!(
                "title {}  description {}",
                form.title_counter(),
                form.description_counter()
            ))
            .dim()
        );
        Ok(())
    }

    fn retry_prompt(&self) -> Result<bool> {
        Ok(Confirm::with_theme(&self.theme)
            .with_prompt("Fix and try again?")
            .default(true)
            .interact()?)
    }

    fn choose_filter(&mut self) -> Result<()> {
        let labels: Vec<&str> = Filter::ALL.iter().map(|f| f.label()).collect();
        let current = Filter::ALL
            .iter()
            .position(|f| *f == self.filter)
            .unwrap_or(0);
        if let Some(i) = Select::with_theme(&self.theme)
            .with_prompt("Show")
            .items(&labels)
            .default(current)
            .interact_opt()?
        {
            self.filter = Filter::ALL[i];
        }
        Ok(())
    }
}

/// One-line notice printed after a deletion from the command line.
pub fn deleted_notice(title: &str) -> String {
    format!("{}Deleted \"{}\"", TRASH, title)
}
