use anyhow::{anyhow, Context, Result};
use ingredient_core::{IngredientError, ProductVersion};
use std::cmp::Ordering;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

use crate::app::{read_app_version, APP_CONF};
use crate::fs_utils::{copy_dir_recursive, overlay_dir, remove_dir_if_exists};
use crate::layout::CacheLayout;

/// Top-level app directories that belong to the user once installed.
const USER_DIRS: [&str; 2] = ["local", "lookups"];
const USER_META: &str = "local.meta";

/// Copies the installed app to the backup area, replacing an older backup
/// of the same version.
pub fn backup_app(
    layout: &CacheLayout,
    name: &str,
    installed: &ProductVersion,
    app_path: &Path,
) -> Result<PathBuf> {
    let backup = layout.app_backup_path(name, &installed.to_string());
    remove_dir_if_exists(&backup)?;
    copy_dir_recursive(app_path, &backup)
        .with_context(|| format!("failed to back up app {name} to {}", backup.display()))?;
    info!(app = name, backup = %backup.display(), "app backed up");
    Ok(backup)
}

/// Checks the staged bundle carries the app and declares the expected
/// version. Returns the version the bundle declares, or the desired one when
/// the bundle is silent and nothing was asked for.
pub fn validate_extracted_app(
    staged_app: &Path,
    name: &str,
    desired: Option<&ProductVersion>,
) -> Result<Option<ProductVersion>> {
    if !staged_app.join(APP_CONF).is_file() {
        return Err(anyhow!(
            "app bundle for {name} does not contain {name}/{APP_CONF}"
        ));
    }

    let declared = read_app_version(staged_app)?;
    match (desired, &declared) {
        (Some(desired), Some(declared)) if desired != declared => {
            Err(IngredientError::conflict(format!(
                "{name}: bundle declares version {declared}, expected {desired}"
            ))
            .into())
        }
        (Some(desired), None) => Err(IngredientError::conflict(format!(
            "{name}: bundle declares no version, expected {desired}"
        ))
        .into()),
        _ => Ok(declared),
    }
}

pub fn validate_bundle_versions(
    name: &str,
    installed: Option<&ProductVersion>,
    bundle: Option<&ProductVersion>,
) -> Result<(), IngredientError> {
    if let (Some(installed), Some(bundle)) = (installed, bundle) {
        if installed.compare(bundle) == Some(Ordering::Greater) {
            return Err(IngredientError::conflict(format!(
                "{name}: Attempted to downgrade app from {installed} to {bundle}"
            )));
        }
    }
    Ok(())
}

pub(crate) fn is_user_owned(rel: &Path) -> bool {
    let mut components = rel.components().filter_map(|component| match component {
        Component::Normal(value) => value.to_str(),
        _ => None,
    });
    match (components.next(), components.next(), components.next()) {
        (Some(first), _, _) if USER_DIRS.contains(&first) => true,
        (Some("metadata"), Some(USER_META), None) => true,
        _ => false,
    }
}

/// Replaces the installed app with the staged one, keeping `local/`,
/// `lookups/` and `metadata/local.meta` where the user already has them.
pub fn merge_app(staged_app: &Path, app_path: &Path) -> Result<()> {
    if !app_path.exists() {
        return copy_dir_recursive(staged_app, app_path);
    }

    prune_packaged_content(app_path)?;
    overlay_dir(staged_app, app_path, &is_user_owned)
        .with_context(|| format!("failed to merge app into {}", app_path.display()))?;
    debug!(path = %app_path.display(), "app merged");
    Ok(())
}

fn prune_packaged_content(app_path: &Path) -> Result<()> {
    for entry in
        fs::read_dir(app_path).with_context(|| format!("failed to read {}", app_path.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        let rel = path
            .strip_prefix(app_path)
            .with_context(|| format!("failed to relativize {}", path.display()))?;
        if is_user_owned(rel) {
            continue;
        }
        if entry.file_name() == "metadata" && path.is_dir() {
            prune_dir_except(&path, app_path)?;
            continue;
        }
        remove_entry(&path)?;
    }
    Ok(())
}

fn prune_dir_except(dir: &Path, app_path: &Path) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let path = entry?.path();
        let rel = path
            .strip_prefix(app_path)
            .with_context(|| format!("failed to relativize {}", path.display()))?;
        if !is_user_owned(rel) {
            remove_entry(&path)?;
        }
    }
    Ok(())
}

fn remove_entry(path: &Path) -> Result<()> {
    let metadata = fs::symlink_metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?;
    if metadata.is_dir() {
        remove_dir_if_exists(path)?;
    } else {
        fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
    }
    Ok(())
}
