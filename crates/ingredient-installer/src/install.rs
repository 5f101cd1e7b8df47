use anyhow::{Context, Result};
use ingredient_core::{
    default_install_dir, installer_format, resolve_download_url, Flavor, IngredientError,
    InstallMethod, Platform, ProductVersion, ResolvedArtifact,
};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::context::RunContext;
use crate::fs_utils::{copy_with_strip, remove_dir_if_exists};
use crate::host::NativeInstall;
use crate::{ActionOutcome, ActionStatus, InstallationRecord};

/// Desired state of one product installation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstallSpec {
    pub name: String,
    /// Inferred from `name` when it names a flavor.
    pub flavor: Option<Flavor>,
    pub version: Option<ProductVersion>,
    /// Falls back to the build metadata of `version`.
    pub build: Option<String>,
    /// Only honored for archive installs.
    pub install_dir: Option<PathBuf>,
    pub user: Option<String>,
    /// Defaults to `user`.
    pub group: Option<String>,
    pub base_url: Option<String>,
    pub method: InstallMethod,
}

impl InstallSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn resolved_flavor(&self) -> Option<Flavor> {
        self.flavor.or_else(|| Flavor::parse(&self.name))
    }
}

/// Everything an install needs, derived without touching the host.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallPlan {
    pub flavor: Flavor,
    pub version: ProductVersion,
    pub build: String,
    pub install_dir: PathBuf,
    pub method: InstallMethod,
    pub artifact: ResolvedArtifact,
    pub owner: Option<Owner>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub user: String,
    pub group: String,
    /// Group was requested explicitly and must be created/appended.
    pub manage_group: bool,
}

/// Validates `spec` for `platform` and resolves the artifact. Checks run in a
/// fixed order so the first problem reported is stable across platforms.
pub fn plan_install(platform: Platform, spec: &InstallSpec) -> Result<InstallPlan, IngredientError> {
    let flavor = spec.resolved_flavor().ok_or_else(|| {
        IngredientError::MissingFlavor(format!(
            "resource '{}' names no known package",
            spec.name
        ))
    })?;
    let version = spec
        .version
        .clone()
        .ok_or_else(|| IngredientError::missing_property(&spec.name, "version"))?;
    let build = match (spec.build.as_deref(), version.build()) {
        (Some(explicit), Some(embedded)) if explicit != embedded => {
            return Err(IngredientError::conflict(format!(
                "{}: build '{explicit}' does not match version build '{embedded}'",
                spec.name
            )));
        }
        (Some(explicit), _) => explicit.to_string(),
        (None, Some(embedded)) => embedded.to_string(),
        (None, None) => return Err(IngredientError::missing_property(&spec.name, "build")),
    };
    if build.trim().is_empty() {
        return Err(IngredientError::missing_property(&spec.name, "build"));
    }

    let format = installer_format(platform, spec.method);
    if spec.install_dir.is_some() && format.is_native() {
        return Err(IngredientError::conflict(format!(
            "{}: Property install_dir is only available for archive installs",
            spec.name
        )));
    }
    if platform.family.is_windows() && (spec.user.is_some() || spec.group.is_some()) {
        return Err(IngredientError::conflict(format!(
            "{}: Properties user and group are not supported on Windows",
            spec.name
        )));
    }
    if spec.user.is_none() && spec.group.is_some() {
        return Err(IngredientError::missing_property(&spec.name, "user"));
    }

    let artifact = resolve_download_url(
        platform,
        flavor,
        &version,
        &build,
        spec.base_url.as_deref(),
        spec.method,
    )?;

    let install_dir = spec
        .install_dir
        .clone()
        .unwrap_or_else(|| default_install_dir(platform, flavor));
    let owner = spec.user.as_ref().map(|user| Owner {
        user: user.clone(),
        group: spec.group.clone().unwrap_or_else(|| user.clone()),
        manage_group: spec.group.is_some(),
    });

    Ok(InstallPlan {
        flavor,
        version: version.without_build(),
        build,
        install_dir,
        method: spec.method,
        artifact,
        owner,
    })
}

pub struct InstallCurrent {
    pub plan: InstallPlan,
    pub existing: Option<InstallationRecord>,
}

pub fn load_install_current(ctx: &mut RunContext, spec: &InstallSpec) -> Result<InstallCurrent> {
    let plan = plan_install(ctx.platform, spec)?;
    let existing = ctx.tracker.probe(&plan.install_dir)?.cloned();
    if let Some(record) = &existing {
        if record.flavor != plan.flavor {
            return Err(IngredientError::conflict(format!(
                "{}: {} already holds {} and cannot be reused for {}",
                spec.name,
                plan.install_dir.display(),
                record.flavor,
                plan.flavor
            ))
            .into());
        }
    }
    Ok(InstallCurrent { plan, existing })
}

pub fn reconcile_install(
    ctx: &mut RunContext,
    spec: &InstallSpec,
    current: InstallCurrent,
) -> Result<ActionOutcome> {
    let InstallCurrent { plan, existing } = current;

    if let Some(record) = &existing {
        if record.matches(plan.flavor, &plan.version, &plan.build) {
            debug!(
                resource = %spec.name,
                install_dir = %plan.install_dir.display(),
                version = %plan.version,
                "installation already matches"
            );
            ctx.tracker.set_current(&plan.install_dir);
            return Ok(ActionOutcome::new(&spec.name, &plan.install_dir, ActionStatus::Unchanged)
                .with_version(Some(plan.version)));
        }
        if record.version.compare(&plan.version) == Some(Ordering::Greater) {
            warn!(
                resource = %spec.name,
                installed = %record.version,
                desired = %plan.version,
                "downgrading installation"
            );
        }
    }

    ctx.layout.ensure_base_dirs()?;
    let artifact_path = ctx.layout.artifact_cache_path(&plan.artifact.filename);
    let fetched = ctx
        .fetcher
        .fetch(&plan.artifact.url, &artifact_path)
        .with_context(|| format!("failed to fetch {}", plan.artifact.url))?;
    debug!(
        url = %plan.artifact.url,
        status = fetched.as_str(),
        "artifact ready"
    );

    if plan.artifact.format.is_native() {
        ctx.host.install_package(&NativeInstall {
            format: plan.artifact.format,
            artifact: &artifact_path,
            install_dir: &plan.install_dir,
        })?;
    } else {
        stage_archive(ctx, &plan, &artifact_path)?;
    }

    if let Some(owner) = &plan.owner {
        if owner.manage_group {
            ctx.host.ensure_group(&owner.group, &owner.user)?;
        }
        ctx.host
            .chown_recursive(&plan.install_dir, &owner.user, &owner.group)?;
    }

    let status = if existing.is_some() {
        ActionStatus::Upgraded
    } else {
        ActionStatus::Installed
    };
    ctx.tracker.record(InstallationRecord {
        install_dir: plan.install_dir.clone(),
        flavor: plan.flavor,
        version: plan.version.clone(),
        build: plan.build.clone(),
        arch: ctx.platform.arch,
        user: plan.owner.as_ref().map(|owner| owner.user.clone()),
        group: plan.owner.as_ref().map(|owner| owner.group.clone()),
        method: Some(plan.method),
    });
    ctx.tracker.set_current(&plan.install_dir);

    info!(
        resource = %spec.name,
        flavor = %plan.flavor,
        version = %plan.version,
        build = %plan.build,
        install_dir = %plan.install_dir.display(),
        status = status.as_str(),
        "installation converged"
    );
    Ok(ActionOutcome::new(&spec.name, &plan.install_dir, status).with_version(Some(plan.version)))
}

/// Extracts into a scratch directory, then copies into the install
/// directory without the archive's top-level folder.
fn stage_archive(ctx: &RunContext, plan: &InstallPlan, artifact_path: &Path) -> Result<()> {
    let raw_dir = ctx
        .layout
        .tmp_dir()
        .join(format!("{}.extract", plan.artifact.filename));
    remove_dir_if_exists(&raw_dir)?;
    fs::create_dir_all(&raw_dir)
        .with_context(|| format!("failed to create {}", raw_dir.display()))?;

    ctx.host
        .extract_archive(artifact_path, plan.artifact.format, &raw_dir)?;
    fs::create_dir_all(&plan.install_dir)
        .with_context(|| format!("failed to create {}", plan.install_dir.display()))?;
    copy_with_strip(&raw_dir, &plan.install_dir, 1).with_context(|| {
        format!(
            "failed to stage {} into {}",
            plan.artifact.filename,
            plan.install_dir.display()
        )
    })?;

    remove_dir_if_exists(&raw_dir)?;
    Ok(())
}
