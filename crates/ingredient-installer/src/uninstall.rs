use anyhow::Result;
use ingredient_core::{default_install_dir, Flavor, IngredientError};
use std::path::PathBuf;
use tracing::info;

use crate::context::RunContext;
use crate::fs_utils::remove_dir_if_exists;
use crate::{ActionOutcome, ActionStatus, InstallationRecord};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallSpec {
    pub name: String,
    pub flavor: Option<Flavor>,
    pub install_dir: Option<PathBuf>,
}

impl UninstallSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

pub struct UninstallCurrent {
    pub install_dir: PathBuf,
    pub existing: Option<InstallationRecord>,
}

pub fn load_uninstall_current(
    ctx: &mut RunContext,
    spec: &UninstallSpec,
) -> Result<UninstallCurrent> {
    let flavor = spec.flavor.or_else(|| Flavor::parse(&spec.name));
    let install_dir = match (&spec.install_dir, flavor) {
        (Some(dir), _) => dir.clone(),
        (None, Some(flavor)) => default_install_dir(ctx.platform, flavor),
        (None, None) => {
            return Err(IngredientError::MissingFlavor(format!(
                "resource '{}' names no known package and no install_dir",
                spec.name
            ))
            .into());
        }
    };

    let existing = ctx.tracker.probe(&install_dir)?.cloned();
    match (&existing, flavor) {
        (None, None) => {
            return Err(IngredientError::MissingFlavor(format!(
                "nothing is tracked at {} for resource '{}'",
                install_dir.display(),
                spec.name
            ))
            .into());
        }
        (Some(record), Some(flavor)) if spec.flavor.is_some() && record.flavor != flavor => {
            return Err(IngredientError::conflict(format!(
                "{}: {} holds {}, not {}",
                spec.name,
                install_dir.display(),
                record.flavor,
                flavor
            ))
            .into());
        }
        _ => {}
    }

    Ok(UninstallCurrent {
        install_dir,
        existing,
    })
}

pub fn reconcile_uninstall(
    ctx: &mut RunContext,
    spec: &UninstallSpec,
    current: UninstallCurrent,
) -> Result<ActionOutcome> {
    let UninstallCurrent {
        install_dir,
        existing,
    } = current;
    let Some(record) = existing else {
        return Ok(ActionOutcome::new(
            &spec.name,
            &install_dir,
            ActionStatus::NotInstalled,
        ));
    };

    remove_dir_if_exists(&install_dir)?;
    ctx.tracker.forget(&install_dir);

    info!(
        resource = %spec.name,
        flavor = %record.flavor,
        install_dir = %install_dir.display(),
        "installation removed"
    );
    Ok(ActionOutcome::new(&spec.name, &install_dir, ActionStatus::Uninstalled)
        .with_version(Some(record.version)))
}
