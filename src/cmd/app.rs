//! Interactive todo list: `checky app`.

use std::time::Duration;

use anyhow::Result;

use checky::client::ClientConfig;
use checky::ui::{App, Filter};

use super::todo::connect;

pub async fn cmd_app(config: ClientConfig, poll_secs: Option<u64>, filter: Filter) -> Result<()> {
    let (state, info) = connect(config)?;

    let mut app = App::new(state, info.base_url).with_filter(filter);
    if let Some(secs) = poll_secs.filter(|s| *s > 0) {
        app = app.with_polling(Duration::from_secs(secs));
    }
    app.run().await
}
