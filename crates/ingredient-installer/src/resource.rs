use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::app::{
    load_app_current, load_app_uninstall_current, reconcile_app, reconcile_app_uninstall,
    AppCurrent, AppSpec, AppUninstallSpec,
};
use crate::context::RunContext;
use crate::install::{load_install_current, reconcile_install, InstallCurrent, InstallSpec};
use crate::uninstall::{
    load_uninstall_current, reconcile_uninstall, UninstallCurrent, UninstallSpec,
};
use crate::ActionOutcome;

/// A declarative resource: observe, then act on the difference.
///
/// `load_current` must not change the host; every precondition failure is
/// reported from it.
pub trait Reconcile {
    type Current;

    fn load_current(&self, ctx: &mut RunContext) -> Result<Self::Current>;

    fn reconcile(&self, ctx: &mut RunContext, current: Self::Current) -> Result<ActionOutcome>;

    fn converge(&self, ctx: &mut RunContext) -> Result<ActionOutcome> {
        let current = self.load_current(ctx)?;
        self.reconcile(ctx, current)
    }
}

impl Reconcile for InstallSpec {
    type Current = InstallCurrent;

    fn load_current(&self, ctx: &mut RunContext) -> Result<InstallCurrent> {
        load_install_current(ctx, self)
    }

    fn reconcile(&self, ctx: &mut RunContext, current: InstallCurrent) -> Result<ActionOutcome> {
        reconcile_install(ctx, self, current)
    }
}

impl Reconcile for UninstallSpec {
    type Current = UninstallCurrent;

    fn load_current(&self, ctx: &mut RunContext) -> Result<UninstallCurrent> {
        load_uninstall_current(ctx, self)
    }

    fn reconcile(&self, ctx: &mut RunContext, current: UninstallCurrent) -> Result<ActionOutcome> {
        reconcile_uninstall(ctx, self, current)
    }
}

impl Reconcile for AppSpec {
    type Current = AppCurrent;

    fn load_current(&self, ctx: &mut RunContext) -> Result<AppCurrent> {
        load_app_current(ctx, self)
    }

    fn reconcile(&self, ctx: &mut RunContext, current: AppCurrent) -> Result<ActionOutcome> {
        reconcile_app(ctx, self, current)
    }
}

impl Reconcile for AppUninstallSpec {
    type Current = PathBuf;

    fn load_current(&self, ctx: &mut RunContext) -> Result<PathBuf> {
        load_app_uninstall_current(ctx, self)
    }

    fn reconcile(&self, _ctx: &mut RunContext, app_path: PathBuf) -> Result<ActionOutcome> {
        reconcile_app_uninstall(self, app_path)
    }
}

pub enum Resource {
    Install(InstallSpec),
    Uninstall(UninstallSpec),
    App(AppSpec),
    AppUninstall(AppUninstallSpec),
}

impl Resource {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::Uninstall(_) => "uninstall",
            Self::App(_) => "app",
            Self::AppUninstall(_) => "app_uninstall",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Install(spec) => &spec.name,
            Self::Uninstall(spec) => &spec.name,
            Self::App(spec) => spec.name(),
            Self::AppUninstall(spec) => &spec.target.name,
        }
    }

    pub fn converge(&self, ctx: &mut RunContext) -> Result<ActionOutcome> {
        match self {
            Self::Install(spec) => spec.converge(ctx),
            Self::Uninstall(spec) => spec.converge(ctx),
            Self::App(spec) => spec.converge(ctx),
            Self::AppUninstall(spec) => spec.converge(ctx),
        }
    }
}

/// Converges `resources` in order, stopping at the first failure.
pub fn converge_all<F>(
    ctx: &mut RunContext,
    resources: &[Resource],
    mut on_outcome: F,
) -> Result<Vec<ActionOutcome>>
where
    F: FnMut(&ActionOutcome),
{
    let mut outcomes = Vec::with_capacity(resources.len());
    for resource in resources {
        info!(kind = resource.kind(), name = resource.name(), "converging resource");
        let outcome = resource
            .converge(ctx)
            .with_context(|| format!("{} '{}' failed", resource.kind(), resource.name()))?;
        on_outcome(&outcome);
        outcomes.push(outcome);
    }
    Ok(outcomes)
}
