use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use ingredient_core::{Flavor, InstallMethod, ProductVersion};
use ingredient_installer::{
    AppRoot, AppSpec, AppTarget, AppUninstallSpec, InstallSpec, MetaAccess, MetaStanza, Resource,
    Stanzas, UninstallSpec,
};
use serde::Deserialize;

/// A TOML run plan: settings plus resources converged in declaration order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunPlan {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, rename = "resource")]
    pub resources: Vec<ResourceEntry>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub platform: Option<String>,
    pub arch: Option<String>,
    pub cache_dir: Option<PathBuf>,
    /// Used by install resources that set no base_url of their own.
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceEntry {
    Install(InstallEntry),
    Uninstall(UninstallEntry),
    App(AppEntry),
    AppUninstall(AppTargetEntry),
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallEntry {
    pub name: String,
    #[serde(default, alias = "package")]
    pub flavor: Option<Flavor>,
    pub version: Option<ProductVersion>,
    pub build: Option<String>,
    pub install_dir: Option<PathBuf>,
    pub user: Option<String>,
    pub group: Option<String>,
    pub base_url: Option<String>,
    #[serde(default)]
    pub method: InstallMethod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UninstallEntry {
    pub name: String,
    #[serde(default, alias = "package")]
    pub flavor: Option<Flavor>,
    pub install_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppTargetEntry {
    pub name: String,
    pub install_dir: Option<PathBuf>,
    #[serde(default, alias = "package")]
    pub flavor: Option<Flavor>,
    pub app_root: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppEntry {
    #[serde(flatten)]
    pub target: AppTargetEntry,
    pub version: Option<ProductVersion>,
    pub source_url: Option<String>,
    /// conf file -> stanza -> key -> value
    #[serde(default)]
    pub configs: BTreeMap<String, Stanzas>,
    /// relative path inside the app -> content
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, MetaEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaEntry {
    pub access: Option<AccessEntry>,
    #[serde(flatten)]
    pub properties: BTreeMap<String, String>,
}

/// `access` is either a literal metadata value or read/write role lists.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum AccessEntry {
    Raw(String),
    Roles {
        #[serde(default)]
        read: Vec<String>,
        #[serde(default)]
        write: Vec<String>,
    },
}

pub fn load_plan(path: &Path) -> Result<RunPlan> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read run plan: {}", path.display()))?;
    parse_plan(&raw).with_context(|| format!("invalid run plan: {}", path.display()))
}

pub fn parse_plan(raw: &str) -> Result<RunPlan> {
    Ok(toml::from_str(raw)?)
}

impl RunPlan {
    pub fn into_resources(self) -> Result<Vec<Resource>> {
        let base_url = self.settings.base_url;
        self.resources
            .into_iter()
            .map(|entry| entry.into_resource(base_url.as_deref()))
            .collect()
    }
}

impl ResourceEntry {
    pub fn into_resource(self, default_base_url: Option<&str>) -> Result<Resource> {
        match self {
            Self::Install(entry) => Ok(Resource::Install(InstallSpec {
                name: entry.name,
                flavor: entry.flavor,
                version: entry.version,
                build: entry.build,
                install_dir: entry.install_dir,
                user: entry.user,
                group: entry.group,
                base_url: entry
                    .base_url
                    .or_else(|| default_base_url.map(str::to_string)),
                method: entry.method,
            })),
            Self::Uninstall(entry) => Ok(Resource::Uninstall(UninstallSpec {
                name: entry.name,
                flavor: entry.flavor,
                install_dir: entry.install_dir,
            })),
            Self::App(entry) => entry.into_app_spec().map(Resource::App),
            Self::AppUninstall(entry) => Ok(Resource::AppUninstall(AppUninstallSpec {
                target: entry.into_target(),
            })),
        }
    }
}

impl AppTargetEntry {
    pub fn into_target(self) -> AppTarget {
        AppTarget {
            name: self.name,
            install_dir: self.install_dir,
            flavor: self.flavor,
            app_root: self
                .app_root
                .as_deref()
                .map(AppRoot::parse)
                .unwrap_or_default(),
        }
    }
}

impl AppEntry {
    pub fn into_app_spec(self) -> Result<AppSpec> {
        for rel in self.configs.keys() {
            validate_app_relative_path(rel)
                .with_context(|| format!("invalid conf file in app {}", self.target.name))?;
        }
        for rel in self.files.keys() {
            validate_app_relative_path(rel)
                .with_context(|| format!("invalid file path in app {}", self.target.name))?;
        }

        let target = self.target.into_target();
        let mut spec = match self.source_url {
            Some(url) => AppSpec::package(target, url),
            None => AppSpec::custom(target),
        };
        spec.version = self.version;
        spec.metadata = self
            .metadata
            .into_iter()
            .map(|(stanza, entry)| (stanza, entry.into_meta_stanza()))
            .collect();

        if !self.configs.is_empty() {
            let configs = self.configs;
            spec = spec.with_configs(move |conf| {
                for (file, stanzas) in &configs {
                    conf.write(file, stanzas)?;
                }
                Ok(())
            });
        }
        if !self.files.is_empty() {
            let files = self.files;
            spec = spec.with_files(move |app_path| {
                for (rel, content) in &files {
                    let path = app_path.join(rel);
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent)
                            .with_context(|| format!("failed to create {}", parent.display()))?;
                    }
                    fs::write(&path, content)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                }
                Ok(())
            });
        }
        Ok(spec)
    }
}

impl MetaEntry {
    pub fn into_meta_stanza(self) -> MetaStanza {
        let mut properties = self.properties;
        let access = match self.access {
            Some(AccessEntry::Roles { read, write }) => Some(MetaAccess { read, write }),
            Some(AccessEntry::Raw(raw)) => {
                properties.insert("access".to_string(), raw);
                None
            }
            None => None,
        };
        MetaStanza { access, properties }
    }
}

fn validate_app_relative_path(rel: &str) -> Result<()> {
    let path = Path::new(rel);
    if rel.trim().is_empty() || path.is_absolute() {
        return Err(anyhow!("'{rel}' must be a relative path"));
    }
    if path
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir))
    {
        return Err(anyhow!("'{rel}' must stay inside the app directory"));
    }
    Ok(())
}
