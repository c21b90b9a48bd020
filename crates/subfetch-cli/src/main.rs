mod commands;
mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use subfetch_http::{DirectoryResolver, HttpLoader, SchemeLoader};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "subfetch")]
#[command(about = "Fetch, merge, and validate proxy subscription configurations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a subscription URL into a configuration directory
    Fetch {
        /// Subscription URL (http, https, or content)
        #[arg(long)]
        url: String,
        /// Directory that holds config.yaml
        #[arg(long)]
        dir: PathBuf,
        /// Refetch even when config.yaml already exists
        #[arg(long)]
        force: bool,
        /// Root directory backing content:// handles
        #[arg(long)]
        content_root: Option<PathBuf>,
    },
    /// Fetch a subscription configured as a named profile
    Profile {
        /// Profile name from profiles.toml
        name: String,
        /// Refetch even when config.yaml already exists
        #[arg(long)]
        force: bool,
    },
    /// List configured profiles
    Profiles,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_loader(config: &AppConfig, content_root: Option<PathBuf>) -> SchemeLoader {
    let http = HttpLoader::with_options(config.user_agent.clone(), Some(config.timeout()));
    let loader = SchemeLoader::new(http);

    match content_root.or_else(|| config.content_root.clone()) {
        Some(root) => loader.with_content_resolver(Arc::new(DirectoryResolver::new(root))),
        None => loader,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let app_config = config::load_config();

    match cli.command {
        Command::Fetch {
            url,
            dir,
            force,
            content_root,
        } => {
            let loader = build_loader(&app_config, content_root);
            commands::fetch::run(loader, &dir, &url, force).await
        }
        Command::Profile { name, force } => {
            let profile = app_config
                .profile(&name)
                .with_context(|| format!("no profile named {name:?}"))?;
            let loader = build_loader(&app_config, None);
            commands::fetch::run(loader, &profile.dir, &profile.url, force).await
        }
        Command::Profiles => {
            commands::profiles::run(&app_config);
            Ok(())
        }
    }
}
