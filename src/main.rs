use clap::Parser;
use muxtree::cli::{run_cli, Cli};
use muxtree::logging::{init_logging_with_config, LogConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // logs go to stdout in JSON by default; keep them quiet unless asked for
    let mut log_config = LogConfig::from_env();
    if std::env::var_os("MUXTREE_LOG_LEVEL").is_none() && std::env::var_os("RUST_LOG").is_none() {
        log_config.log_level = "warn".to_string();
    }
    init_logging_with_config(&log_config)?;

    let stdout = std::io::stdout();
    run_cli(cli, &mut stdout.lock())
}
