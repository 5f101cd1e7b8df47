use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk cache used by one convergence run: downloaded artifacts, app
/// packages, app staging areas and app backups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.join("artifacts")
    }

    pub fn apps_dir(&self) -> PathBuf {
        self.root.join("apps")
    }

    pub fn app_staging_root(&self) -> PathBuf {
        self.apps_dir().join("staging")
    }

    pub fn app_backup_root(&self) -> PathBuf {
        self.apps_dir().join("backup")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    /// Artifacts are keyed by filename so repeated runs reuse the download.
    pub fn artifact_cache_path(&self, filename: &str) -> PathBuf {
        self.artifacts_dir().join(filename)
    }

    pub fn app_package_path(&self, filename: &str) -> PathBuf {
        self.apps_dir().join(filename)
    }

    pub fn app_staging_dir(&self, app_name: &str) -> PathBuf {
        self.app_staging_root().join(app_name)
    }

    pub fn app_backup_path(&self, app_name: &str, version: &str) -> PathBuf {
        self.app_backup_root().join(format!("{app_name}-{version}"))
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [
            self.artifacts_dir(),
            self.apps_dir(),
            self.app_staging_root(),
            self.app_backup_root(),
            self.tmp_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn default_cache_root() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("INGREDIENT_CACHE_DIR").filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows cache root")?;
        return Ok(PathBuf::from(app_data).join("Ingredient").join("cache"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve cache root")?;
    Ok(PathBuf::from(home).join(".ingredient").join("cache"))
}
