//! Create and edit form state: a transient buffer of title and description
//! with per-field errors and length counters.

use console::style;

use crate::models::{
    CreateTodo, DESCRIPTION_MAX_CHARS, FieldErrors, TITLE_MAX_CHARS, Todo, UpdateTodo,
};

#[derive(Debug, Clone, PartialEq)]
pub struct TodoForm {
    /// The item being edited; `None` for a create form.
    original: Option<Box<Todo>>,
    title: String,
    description: String,
    errors: FieldErrors,
}

impl TodoForm {
    pub fn create() -> Self {
        Self {
            original: None,
            title: String::new(),
            description: String::new(),
            errors: FieldErrors::default(),
        }
    }

    /// Seed the form from an existing item.
    pub fn edit(todo: &Todo) -> Self {
        Self {
            original: Some(Box::new(todo.clone())),
            title: todo.title.clone(),
            description: todo.description.clone().unwrap_or_default(),
            errors: FieldErrors::default(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Editing a field clears that field's error.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.errors.title = None;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.errors.description = None;
    }

    pub fn title_counter(&self) -> String {
        counter(&self.title, TITLE_MAX_CHARS)
    }

    pub fn description_counter(&self) -> String {
        counter(&self.description, DESCRIPTION_MAX_CHARS)
    }

    fn trimmed(&self) -> CreateTodo {
        let description = self.description.trim();
        CreateTodo::new(
            self.title.trim(),
            (!description.is_empty()).then(|| description.to_string()),
        )
    }

    /// Validate and build a create request from the trimmed fields.
    /// Failures are kept on the form for display.
    pub fn submit_create(&mut self) -> Result<CreateTodo, FieldErrors> {
        let req = self.trimmed();
        if let Err(errors) = req.validate() {
            self.errors = errors.clone();
            return Err(errors);
        }
        Ok(req)
    }

    /// Validate and build an update carrying only the fields that differ
    /// from the seeded item. `Ok(None)` means nothing changed and no
    /// request is needed.
    pub fn submit_edit(&mut self) -> Result<Option<UpdateTodo>, FieldErrors> {
        let req = self.trimmed();
        if let Err(errors) = req.validate() {
            self.errors = errors.clone();
            return Err(errors);
        }

        let old_title = self.original.as_deref().map_or("", |t| t.title.as_str());
        let old_description = self
            .original
            .as_deref()
            .and_then(|t| t.description.as_deref())
            .unwrap_or("");
        let new_description = req.description.unwrap_or_default();
        let update = UpdateTodo {
            title: (req.title != old_title).then_some(req.title),
            description: (new_description != old_description).then_some(new_description),
            completed: None,
        };
        Ok((!update.is_empty()).then_some(update))
    }

    /// Field lines with counters and any validation messages.
    pub fn render(&self) -> String {
        let heading = if self.original.is_some() {
            "Edit todo"
        } else {
            "New todo"
        };
        let mut lines = vec![
            style(heading).bold().to_string(),
            format!(
                "  Title        {}  {}",
                self.title,
                style(self.title_counter()).dim()
            ),
        ];
        if let Some(err) = &self.errors.title {
            lines.push(format!("               {}", style(err).red()));
        }
        lines.push(format!(
            "  Description  {}  {}",
            self.description,
            style(self.description_counter()).dim()
        ));
        if let Some(err) = &self.errors.description {
            lines.push(format!("               {}", style(err).red()));
        }
        lines.join("\n")
    }
}

fn counter(value: &str, max: usize) -> String {
    format!("{}/{}", value.chars().count(), max)
}
