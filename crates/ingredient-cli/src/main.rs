use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ingredient_core::{Flavor, ProductVersion};

mod dispatch;
mod fetch;
mod plan;
mod render;

use dispatch::run_cli;

#[derive(Parser, Debug)]
#[command(name = "ingredient")]
#[command(about = "Idempotent installer for Splunk and the universal forwarder", long_about = None)]
struct Cli {
    /// Platform name (`redhat`, `ubuntu`, `suse`, `windows`, `mac_os_x`); detected when omitted.
    #[arg(long, global = true)]
    platform: Option<String>,
    #[arg(long, global = true)]
    arch: Option<String>,
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
    /// Print outcomes as JSON lines.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Converge every resource of a TOML run plan, in order.
    Converge { plan: PathBuf },
    Install {
        flavor: Flavor,
        #[arg(long)]
        version: Option<ProductVersion>,
        #[arg(long)]
        build: Option<String>,
        #[arg(long)]
        install_dir: Option<PathBuf>,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        group: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        /// Unpack the archive instead of using the OS package manager.
        #[arg(long)]
        archive: bool,
    },
    Uninstall {
        flavor: Option<Flavor>,
        #[arg(long)]
        install_dir: Option<PathBuf>,
    },
    AppInstall {
        name: String,
        #[arg(long)]
        install_dir: Option<PathBuf>,
        #[arg(long)]
        flavor: Option<Flavor>,
        #[arg(long)]
        app_root: Option<String>,
        #[arg(long)]
        version: Option<ProductVersion>,
        /// Bundle to install; a custom app is created when omitted.
        #[arg(long)]
        source_url: Option<String>,
    },
    AppUninstall {
        name: String,
        #[arg(long)]
        install_dir: Option<PathBuf>,
        #[arg(long)]
        flavor: Option<Flavor>,
        #[arg(long)]
        app_root: Option<String>,
    },
    /// Print the download URL and default install directory without installing.
    Resolve {
        flavor: Flavor,
        #[arg(long)]
        version: ProductVersion,
        #[arg(long)]
        build: String,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        archive: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run_cli(cli)
}
