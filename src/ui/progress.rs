use std::future::Future;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Spinner shown while a request is in flight.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .expect("progress bar template is a valid static string"),
    );
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

/// Await `fut` behind a spinner, clearing it when done.
pub async fn with_spinner<F: Future>(message: &str, fut: F) -> F::Output {
    let bar = spinner(message.to_string());
    let output = fut.await;
    bar.finish_and_clear();
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_spinner_returns_output() {
        let value = with_spinner("Working...", async { 41 + 1 }).await;
        assert_eq!(value, 42);
    }

    #[test]
    fn test_spinner_message() {
        let bar = spinner("Loading todos...");
        assert_eq!(bar.message(), "Loading todos...");
        bar.finish_and_clear();
    }
}
