use std::path::PathBuf;

use ingredient_core::{Arch, Flavor, InstallMethod, ProductVersion};
use serde::Serialize;

/// What the run knows about one installation, keyed by `install_dir`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallationRecord {
    pub install_dir: PathBuf,
    pub flavor: Flavor,
    pub version: ProductVersion,
    pub build: String,
    pub arch: Arch,
    pub user: Option<String>,
    pub group: Option<String>,
    /// Unknown when the record was learned by probing the host.
    pub method: Option<InstallMethod>,
}

impl InstallationRecord {
    pub fn matches(&self, flavor: Flavor, version: &ProductVersion, build: &str) -> bool {
        self.flavor == flavor && &self.version == version && self.build == build
    }

    pub fn owner(&self) -> Option<(&str, &str)> {
        let user = self.user.as_deref()?;
        Some((user, self.group.as_deref().unwrap_or(user)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Installed,
    Upgraded,
    Configured,
    Unchanged,
    Uninstalled,
    NotInstalled,
}

impl ActionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Upgraded => "upgraded",
            Self::Configured => "configured",
            Self::Unchanged => "unchanged",
            Self::Uninstalled => "uninstalled",
            Self::NotInstalled => "not-installed",
        }
    }

    pub fn changed(self) -> bool {
        !matches!(self, Self::Unchanged | Self::NotInstalled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub resource: String,
    pub path: PathBuf,
    pub status: ActionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<ProductVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
}

impl ActionOutcome {
    pub fn new(resource: impl Into<String>, path: impl Into<PathBuf>, status: ActionStatus) -> Self {
        Self {
            resource: resource.into(),
            path: path.into(),
            status,
            version: None,
            backup: None,
        }
    }

    pub fn with_version(mut self, version: Option<ProductVersion>) -> Self {
        self.version = version;
        self
    }

    pub fn with_backup(mut self, backup: Option<PathBuf>) -> Self {
        self.backup = backup;
        self
    }
}
