//! One-shot todo commands: list, add, edit, toggle, remove, health.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use console::style;

use checky::client::{ApiClient, ApiInfo, ClientConfig, TodoApi};
use checky::state::TodoState;
use checky::ui::app::{confirm_delete, deleted_notice};
use checky::ui::filters::render_filter_bar;
use checky::ui::icons::{CHECK, CROSS, SPARKLE};
use checky::ui::list::{render_list, render_stats};
use checky::ui::progress::with_spinner;
use checky::ui::{Filter, FilterCounts, TodoForm, visible_items};

/// Build the API client and a state container on top of it.
pub(crate) fn connect(config: ClientConfig) -> Result<(Arc<TodoState>, ApiInfo)> {
    let client = ApiClient::new(config)?;
    let info = client.info();
    tracing::debug!(base_url = %info.base_url, timeout_ms = info.timeout_ms, "API client ready");
    let api: Arc<dyn TodoApi> = Arc::new(client);
    Ok((Arc::new(TodoState::new(api)), info))
}

async fn load(state: &TodoState) -> Result<()> {
    with_spinner("Loading todos...", state.refetch())
        .await
        .context("Failed to load todos")
}

pub async fn cmd_list(
    config: ClientConfig,
    filter: Filter,
    search: Option<&str>,
    json: bool,
) -> Result<()> {
    let (state, _) = connect(config)?;
    load(&state).await?;

    let snapshot = state.snapshot().await;
    let query = search.unwrap_or("");

    if json {
        let visible = visible_items(&snapshot.items, filter, query);
        println!("{}", serde_json::to_string_pretty(&visible)?);
        return Ok(());
    }

    let counts = FilterCounts::from_items(&snapshot.items);
    let (body, _) = render_list(&snapshot, filter, query, Utc::now());
    println!("{}", render_stats(&counts));
    println!("{}", render_filter_bar(filter, query, &counts));
    println!();
    println!("{}", body);
    Ok(())
}

pub async fn cmd_add(config: ClientConfig, title: &str, description: Option<&str>) -> Result<()> {
    let mut form = TodoForm::create();
    form.set_title(title);
    form.set_description(description.unwrap_or(""));
    let req = match form.submit_create() {
        Ok(req) => req,
        Err(errors) => bail!("{}", errors.summary()),
    };

    let (state, _) = connect(config)?;
    let todo = with_spinner("Adding todo...", state.create(req))
        .await
        .context("Failed to create todo")?;

    println!("{}Added \"{}\"", SPARKLE, style(&todo.title).bold());
    println!("   {}", style(&todo.id).dim());
    Ok(())
}

pub async fn cmd_edit(
    config: ClientConfig,
    id: &str,
    title: Option<&str>,
    description: Option<&str>,
) -> Result<()> {
    if title.is_none() && description.is_none() {
        bail!("Nothing to change: pass --title and/or --description");
    }

    let (state, _) = connect(config)?;
    load(&state).await?;

    let snapshot = state.snapshot().await;
    let Some(todo) = snapshot.items.iter().find(|t| t.id == id) else {
        bail!("Todo {} not found", id);
    };

    let mut form = TodoForm::edit(todo);
    if let Some(title) = title {
        form.set_title(title);
    }
    if let Some(description) = description {
        form.set_description(description);
    }

    let req = match form.submit_edit() {
        Ok(Some(req)) => req,
        Ok(None) => {
            println!("No changes");
            return Ok(());
        }
        Err(errors) => bail!("{}", errors.summary()),
    };

    let updated = with_spinner("Saving...", state.update(id, req))
        .await
        .context("Failed to update todo")?;
    println!("{}Updated \"{}\"", CHECK, style(&updated.title).bold());
    Ok(())
}

pub async fn cmd_toggle(config: ClientConfig, id: &str) -> Result<()> {
    let (state, _) = connect(config)?;
    load(&state).await?;

    let todo = with_spinner("Saving...", state.toggle(id))
        .await
        .context("Failed to toggle todo")?;
    if todo.completed {
        println!("{}Completed \"{}\"", CHECK, style(&todo.title).bold());
    } else {
        println!("{}Reopened \"{}\"", SPARKLE, style(&todo.title).bold());
    }
    Ok(())
}

pub async fn cmd_remove(config: ClientConfig, id: &str, force: bool) -> Result<()> {
    let (state, _) = connect(config)?;
    load(&state).await?;

    let snapshot = state.snapshot().await;
    let Some(title) = snapshot
        .items
        .iter()
        .find(|t| t.id == id)
        .map(|t| t.title.clone())
    else {
        bail!("Todo {} not found", id);
    };

    if !force && !confirm_delete(&title) {
        println!("Cancelled");
        return Ok(());
    }

    with_spinner("Deleting...", state.delete(id))
        .await
        .context("Failed to delete todo")?;
    println!("{}", deleted_notice(&title));
    Ok(())
}

pub async fn cmd_health(config: ClientConfig) -> Result<()> {
    let client = ApiClient::new(config)?;
    let info = client.info();

    if with_spinner("Checking API...", client.health()).await {
        println!("{}API reachable at {}", CHECK, info.base_url);
        Ok(())
    } else {
        println!("{}API unreachable at {}", CROSS, info.base_url);
        bail!("Health check failed for {}", info.base_url)
    }
}
