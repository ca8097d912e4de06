//! Todo API server command: `checky serve`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use checky::backend::db::DEFAULT_TABLE;
use checky::backend::server::{
    self, DEFAULT_ENVIRONMENT, DEFAULT_PORT, DEFAULT_REGION, MetricsConfig, ServerConfig,
};

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// SQLite file holding the todo table
    #[arg(long, env = "TODO_DB_PATH", default_value = ".checky/todos.db")]
    pub db_path: PathBuf,

    /// Table name inside the store
    #[arg(long, env = "TODO_TABLE_NAME", default_value = DEFAULT_TABLE)]
    pub table_name: String,

    /// Region label sent with pushed metrics
    #[arg(long, env = "TODO_REGION", default_value = DEFAULT_REGION)]
    pub region: String,

    /// Deployment environment reported by /health
    #[arg(long, env = "APP_ENV", default_value = DEFAULT_ENVIRONMENT)]
    pub environment: String,

    /// Push request metrics periodically (default: only in production)
    #[arg(
        long,
        env = "METRICS_ENABLED",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub metrics: Option<bool>,

    /// Never push metrics, whatever --metrics or METRICS_ENABLED say
    #[arg(long)]
    pub no_metrics: bool,

    /// Monitoring endpoint that receives metric reports (logged when unset)
    #[arg(long, env = "METRICS_ENDPOINT")]
    pub metrics_endpoint: Option<String>,

    /// Seconds between metric pushes
    #[arg(long, env = "METRICS_INTERVAL_SECS", default_value = "300")]
    pub metrics_interval: u64,

    /// Create the table if missing, then exit
    #[arg(long)]
    pub init: bool,
}

impl ServeArgs {
    pub fn to_config(&self) -> ServerConfig {
        let override_flag = if self.no_metrics {
            Some(false)
        } else {
            self.metrics
        };
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            db_path: self.db_path.clone(),
            table_name: self.table_name.clone(),
            region: self.region.clone(),
            environment: self.environment.clone(),
            metrics: MetricsConfig {
                enabled: server::metrics_enabled_for(&self.environment, override_flag),
                endpoint: self.metrics_endpoint.clone(),
                interval: Duration::from_secs(self.metrics_interval.max(1)),
            },
        }
    }
}

pub async fn cmd_serve(args: &ServeArgs) -> Result<()> {
    let config = args.to_config();

    if args.init {
        server::init_store(&config)?;
        println!(
            "Todo table '{}' ready at {}",
            config.table_name,
            config.db_path.display()
        );
        return Ok(());
    }

    server::start_server(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        serve: ServeArgs,
    }

    fn parse(args: &[&str]) -> ServeArgs {
        let mut argv = vec!["serve"];
        argv.extend_from_slice(args);
        Harness::try_parse_from(argv).unwrap().serve
    }

    #[test]
    fn test_explicit_flags_map_into_config() {
        let args = parse(&[
            "--port",
            "8080",
            "--host",
            "127.0.0.1",
            "--table-name",
            "chores",
            "--environment",
            "staging",
            "--metrics-interval",
            "30",
        ]);
        let config = args.to_config();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.table_name, "chores");
        assert_eq!(config.environment, "staging");
        assert_eq!(config.metrics.interval, Duration::from_secs(30));
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_bare_metrics_flag_enables_metrics() {
        let config = parse(&["--environment", "staging", "--metrics"]).to_config();
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_no_metrics_wins_in_production() {
        let config = parse(&["--environment", "production", "--no-metrics"]).to_config();
        assert_eq!(config.environment, "production");
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_production_defaults_to_metrics_on() {
        let config = parse(&["--environment", "production"]).to_config();
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_no_metrics_overrides_explicit_metrics() {
        let config = parse(&["--metrics", "true", "--no-metrics"]).to_config();
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = parse(&["--metrics-interval", "0"]).to_config();
        assert_eq!(config.metrics.interval, Duration::from_secs(1));
    }
}
