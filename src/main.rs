use tracing_subscriber::{EnvFilter, fmt};
use tracing::info;

use fileserver::config::{self, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if config::wants_help(&args) {
        println!("{}", config::USAGE);
        return Ok(());
    }
    let cfg = ServerConfig::load(&args)?;

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "fileserver",
        "fileserver starting: RUST_LOG='{}', bind={}, http_port={}, root='{}', output_formatter={}",
        rust_log,
        cfg.bind_addr,
        cfg.http_port,
        cfg.root_dir.display(),
        cfg.output_formatter.as_deref().unwrap_or("<none>")
    );

    fileserver::server::run_with_config(cfg).await
}
