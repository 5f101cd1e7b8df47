use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ingredient_core::{resolve_download_url, InstallMethod, Platform};
use ingredient_installer::{
    converge_all, default_cache_root, ActionOutcome, AppRoot, AppSpec, AppTarget,
    AppUninstallSpec, CacheLayout, CommandHost, InstallSpec, Resource, RunContext, UninstallSpec,
};
use tracing::debug;

use crate::fetch::HttpFetcher;
use crate::plan::{load_plan, Settings};
use crate::render::{format_summary_line, print_outcome, ResolveReport};
use crate::{Cli, Commands};

const OS_RELEASE: &str = "/etc/os-release";

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    let overrides = Settings {
        platform: cli.platform,
        arch: cli.arch,
        cache_dir: cli.cache_dir,
        base_url: None,
    };
    let json = cli.json;

    match cli.command {
        Commands::Converge { plan } => {
            let mut plan = load_plan(&plan)?;
            plan.settings = merge_settings(&overrides, &plan.settings);
            let settings = plan.settings.clone();
            let resources = plan.into_resources()?;
            let outcomes = run_resources(&settings, &resources, json)?;
            if !json {
                println!("{}", format_summary_line(&outcomes));
            }
        }
        Commands::Install {
            flavor,
            version,
            build,
            install_dir,
            user,
            group,
            base_url,
            archive,
        } => {
            let spec = InstallSpec {
                name: flavor.as_str().to_string(),
                flavor: Some(flavor),
                version,
                build,
                install_dir,
                user,
                group,
                base_url,
                method: install_method(archive),
            };
            run_resources(&overrides, &[Resource::Install(spec)], json)?;
        }
        Commands::Uninstall {
            flavor,
            install_dir,
        } => {
            let spec = UninstallSpec {
                name: flavor
                    .map(|flavor| flavor.as_str().to_string())
                    .unwrap_or_else(|| "installation".to_string()),
                flavor,
                install_dir,
            };
            run_resources(&overrides, &[Resource::Uninstall(spec)], json)?;
        }
        Commands::AppInstall {
            name,
            install_dir,
            flavor,
            app_root,
            version,
            source_url,
        } => {
            let target = app_target(name, install_dir, flavor, app_root.as_deref());
            let mut spec = match source_url {
                Some(url) => AppSpec::package(target, url),
                None => AppSpec::custom(target),
            };
            spec.version = version;
            run_resources(&overrides, &[Resource::App(spec)], json)?;
        }
        Commands::AppUninstall {
            name,
            install_dir,
            flavor,
            app_root,
        } => {
            let spec = AppUninstallSpec {
                target: app_target(name, install_dir, flavor, app_root.as_deref()),
            };
            run_resources(&overrides, &[Resource::AppUninstall(spec)], json)?;
        }
        Commands::Resolve {
            flavor,
            version,
            build,
            base_url,
            archive,
        } => {
            let platform = resolve_platform(&overrides)?;
            let artifact = resolve_download_url(
                platform,
                flavor,
                &version,
                &build,
                base_url.as_deref(),
                install_method(archive),
            )?;
            let report = ResolveReport::new(platform, flavor, artifact);
            if json {
                println!(
                    "{}",
                    serde_json::to_string(&report).context("failed to encode report")?
                );
            } else {
                for line in report.lines() {
                    println!("{line}");
                }
            }
        }
    }

    Ok(())
}

fn run_resources(
    settings: &Settings,
    resources: &[Resource],
    json: bool,
) -> Result<Vec<ActionOutcome>> {
    let mut ctx = build_context(settings, json)?;
    let mut print_error = None;
    let outcomes = converge_all(&mut ctx, resources, |outcome| {
        if let Err(err) = print_outcome(outcome, json) {
            if print_error.is_none() {
                print_error = Some(err);
            }
        }
    })?;
    if let Some(err) = print_error {
        return Err(err);
    }
    Ok(outcomes)
}

fn build_context(settings: &Settings, json: bool) -> Result<RunContext> {
    let platform = resolve_platform(settings)?;
    let cache_root = match &settings.cache_dir {
        Some(dir) => dir.clone(),
        None => default_cache_root()?,
    };
    debug!(%platform, cache_root = %cache_root.display(), "run context");

    let show_progress = !json && std::io::stderr().is_terminal();
    Ok(RunContext::new(
        platform,
        CacheLayout::new(cache_root),
        Box::new(HttpFetcher::new(show_progress)?),
        Box::new(CommandHost),
    ))
}

/// Command-line flags win over the plan's `[settings]`.
pub(crate) fn merge_settings(overrides: &Settings, plan: &Settings) -> Settings {
    Settings {
        platform: overrides.platform.clone().or_else(|| plan.platform.clone()),
        arch: overrides.arch.clone().or_else(|| plan.arch.clone()),
        cache_dir: overrides
            .cache_dir
            .clone()
            .or_else(|| plan.cache_dir.clone()),
        base_url: overrides.base_url.clone().or_else(|| plan.base_url.clone()),
    }
}

pub(crate) fn resolve_platform(settings: &Settings) -> Result<Platform> {
    let platform = match settings.platform.as_deref() {
        Some(name) => Platform::from_names(
            name,
            settings.arch.as_deref().unwrap_or(std::env::consts::ARCH),
        )?,
        None => {
            let os_release = read_os_release(Path::new(OS_RELEASE));
            let mut detected = Platform::detect(os_release.as_deref())?;
            if let Some(arch) = settings.arch.as_deref() {
                detected.arch = ingredient_core::Arch::parse(arch)?;
            }
            detected
        }
    };
    Ok(platform)
}

fn read_os_release(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok()
}

fn install_method(archive: bool) -> InstallMethod {
    if archive {
        InstallMethod::Archive
    } else {
        InstallMethod::Package
    }
}

pub(crate) fn app_target(
    name: String,
    install_dir: Option<PathBuf>,
    flavor: Option<ingredient_core::Flavor>,
    app_root: Option<&str>,
) -> AppTarget {
    AppTarget {
        name,
        install_dir,
        flavor,
        app_root: app_root.map(AppRoot::parse).unwrap_or_default(),
    }
}
