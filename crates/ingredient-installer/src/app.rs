use anyhow::{anyhow, Context, Result};
use ingredient_core::{filename_from_url, Flavor, IngredientError, PackageFormat, ProductVersion};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::app_upgrade::{backup_app, merge_app, validate_bundle_versions, validate_extracted_app};
use crate::conf::{read_conf_value, write_conf, Stanzas, WriteMode};
use crate::context::RunContext;
use crate::fs_utils::remove_dir_if_exists;
use crate::{ActionOutcome, ActionStatus, InstallationRecord};

pub const APP_CONF: &str = "default/app.conf";
const APP_SUBDIRS: [&str; 4] = ["default", "local", "lookups", "metadata"];

/// Where apps live inside an installation's `etc` directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AppRoot {
    #[default]
    Apps,
    ShCluster,
    MasterApps,
    /// Relative to `etc`, or absolute to leave the installation entirely.
    Custom(PathBuf),
}

impl AppRoot {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "apps" => Self::Apps,
            "shcluster" => Self::ShCluster,
            "master_apps" | "master-apps" => Self::MasterApps,
            other => Self::Custom(PathBuf::from(other)),
        }
    }

    pub fn resolve(&self, install_dir: &Path) -> PathBuf {
        let etc = install_dir.join("etc");
        match self {
            Self::Apps => etc.join("apps"),
            Self::ShCluster => etc.join("shcluster").join("apps"),
            Self::MasterApps => etc.join("master-apps").join("apps"),
            Self::Custom(root) => etc.join(root),
        }
    }
}

/// Which directory of the app relative configuration writes land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfScope {
    Default,
    Local,
}

impl ConfScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Local => "local",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppSource {
    /// Built in place from the configuration callbacks.
    Custom,
    /// Downloaded bundle (`.tgz`, `.tar.gz`, `.spl` or `.zip`).
    Package { url: String },
}

/// Identifies one app inside one installation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppTarget {
    pub name: String,
    pub install_dir: Option<PathBuf>,
    pub flavor: Option<Flavor>,
    pub app_root: AppRoot,
}

impl AppTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// `access` property of a metadata stanza.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaAccess {
    pub read: Vec<String>,
    pub write: Vec<String>,
}

impl MetaAccess {
    pub fn render(&self) -> String {
        format!(
            "read : [ {} ], write : [ {} ]",
            self.read.join(", "),
            self.write.join(", ")
        )
    }
}

impl fmt::Display for MetaAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaStanza {
    pub access: Option<MetaAccess>,
    pub properties: BTreeMap<String, String>,
}

/// Flattens metadata stanzas into conf stanzas, rendering `access`.
pub fn render_metadata(metadata: &BTreeMap<String, MetaStanza>) -> Stanzas {
    metadata
        .iter()
        .map(|(name, stanza)| {
            let mut entries = stanza.properties.clone();
            if let Some(access) = &stanza.access {
                entries.insert("access".to_string(), access.render());
            }
            (name.clone(), entries)
        })
        .collect()
}

/// Redirects relative configuration writes into `<app>/<scope>/` for the
/// duration of the configuration callback.
pub struct AppConfWriter<'a> {
    app_path: &'a Path,
    scope: ConfScope,
    written: Vec<PathBuf>,
}

impl<'a> AppConfWriter<'a> {
    pub fn new(app_path: &'a Path, scope: ConfScope) -> Self {
        Self {
            app_path,
            scope,
            written: Vec::new(),
        }
    }

    pub fn scope(&self) -> ConfScope {
        self.scope
    }

    pub fn app_path(&self) -> &Path {
        self.app_path
    }

    pub fn conf_path(&self, file: impl AsRef<Path>) -> PathBuf {
        let file = file.as_ref();
        if file.is_absolute() {
            return file.to_path_buf();
        }
        self.app_path.join(self.scope.as_str()).join(file)
    }

    /// Merges `stanzas` into `file`. Returns whether the file changed.
    pub fn write(&mut self, file: impl AsRef<Path>, stanzas: &Stanzas) -> Result<bool> {
        let path = self.conf_path(file);
        let changed = write_conf(&path, stanzas, WriteMode::Merge)?;
        if changed {
            debug!(path = %path.display(), "configuration written");
        }
        self.written.push(path);
        Ok(changed)
    }

    pub fn set(
        &mut self,
        file: impl AsRef<Path>,
        stanza: &str,
        key: &str,
        value: &str,
    ) -> Result<bool> {
        let mut stanzas = Stanzas::new();
        stanzas
            .entry(stanza.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self.write(file, &stanzas)
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

pub type ConfigCallback = Box<dyn Fn(&mut AppConfWriter<'_>) -> Result<()>>;
pub type FilesCallback = Box<dyn Fn(&Path) -> Result<()>>;

/// Desired state of one app.
pub struct AppSpec {
    pub target: AppTarget,
    pub version: Option<ProductVersion>,
    pub source: AppSource,
    pub configs: Option<ConfigCallback>,
    pub files: Option<FilesCallback>,
    pub metadata: BTreeMap<String, MetaStanza>,
}

impl AppSpec {
    pub fn custom(target: AppTarget) -> Self {
        Self {
            target,
            version: None,
            source: AppSource::Custom,
            configs: None,
            files: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn package(target: AppTarget, url: impl Into<String>) -> Self {
        Self {
            source: AppSource::Package { url: url.into() },
            ..Self::custom(target)
        }
    }

    pub fn with_version(mut self, version: ProductVersion) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_configs<F>(mut self, configs: F) -> Self
    where
        F: Fn(&mut AppConfWriter<'_>) -> Result<()> + 'static,
    {
        self.configs = Some(Box::new(configs));
        self
    }

    pub fn with_files<F>(mut self, files: F) -> Self
    where
        F: Fn(&Path) -> Result<()> + 'static,
    {
        self.files = Some(Box::new(files));
        self
    }

    pub fn with_metadata(mut self, stanza: impl Into<String>, meta: MetaStanza) -> Self {
        self.metadata.insert(stanza.into(), meta);
        self
    }

    pub fn name(&self) -> &str {
        &self.target.name
    }

    pub fn scope(&self) -> ConfScope {
        match self.source {
            AppSource::Custom => ConfScope::Default,
            AppSource::Package { .. } => ConfScope::Local,
        }
    }
}

/// Installation and app state an app action works against.
#[derive(Debug, Clone, PartialEq)]
pub struct AppCurrent {
    pub installation: InstallationRecord,
    pub app_path: PathBuf,
    pub installed_version: Option<ProductVersion>,
}

/// Finds the installation an app targets: its explicit install_dir, the
/// current installation, or the default directory of its flavor.
pub fn resolve_installation(
    ctx: &mut RunContext,
    target: &AppTarget,
) -> Result<InstallationRecord> {
    let install_dir = match (&target.install_dir, ctx.tracker.current()) {
        (Some(dir), _) => dir.clone(),
        (None, Some(current))
            if target.flavor.is_none() || target.flavor == Some(current.flavor) =>
        {
            current.install_dir.clone()
        }
        (None, _) => {
            let flavor = target.flavor.unwrap_or(Flavor::Splunk);
            ingredient_core::default_install_dir(ctx.platform, flavor)
        }
    };

    let record = ctx
        .tracker
        .probe(&install_dir)?
        .cloned()
        .ok_or_else(|| IngredientError::MissingInstallation(install_dir.clone()))?;
    if let Some(flavor) = target.flavor {
        if flavor != record.flavor {
            return Err(IngredientError::conflict(format!(
                "{}: {} holds {}, not {}",
                target.name,
                install_dir.display(),
                record.flavor,
                flavor
            ))
            .into());
        }
    }
    Ok(record)
}

pub fn app_path(installation: &InstallationRecord, target: &AppTarget) -> PathBuf {
    target
        .app_root
        .resolve(&installation.install_dir)
        .join(&target.name)
}

/// Version declared by `<app>/default/app.conf` under `[launcher]`.
pub fn read_app_version(app_path: &Path) -> Result<Option<ProductVersion>> {
    let conf = app_path.join(APP_CONF);
    let Some(raw) = read_conf_value(&conf, "launcher", "version")? else {
        return Ok(None);
    };
    let version = ProductVersion::parse(&raw)
        .with_context(|| format!("invalid app version in {}", conf.display()))?;
    Ok(Some(version))
}

pub fn load_app_current(ctx: &mut RunContext, spec: &AppSpec) -> Result<AppCurrent> {
    let installation = resolve_installation(ctx, &spec.target)?;
    let app_path = app_path(&installation, &spec.target);
    let installed_version = read_app_version(&app_path)?;

    if let Some(installed) = &installed_version {
        let Some(desired) = &spec.version else {
            return Err(IngredientError::conflict(format!(
                "{}: Version to install must be specified when app has a version.",
                spec.name()
            ))
            .into());
        };
        if prerelease_over_release(desired, installed) {
            return Err(IngredientError::conflict(format!(
                "{}: Attempted to install pre-release version over release version ({desired} vs. {installed})",
                spec.name()
            ))
            .into());
        }
        validate_bundle_versions(spec.name(), Some(installed), Some(desired))?;
    }

    Ok(AppCurrent {
        installation,
        app_path,
        installed_version,
    })
}

/// A prerelease may replace a release only when it is numerically newer.
pub fn prerelease_over_release(desired: &ProductVersion, installed: &ProductVersion) -> bool {
    desired.is_prerelease()
        && !installed.is_prerelease()
        && desired.release().compare(&installed.release()) != Some(std::cmp::Ordering::Greater)
}

fn version_unchanged(spec: &AppSpec, current: &AppCurrent) -> bool {
    match (&spec.version, &current.installed_version) {
        (Some(desired), Some(installed)) => desired == installed,
        _ => false,
    }
}

pub fn reconcile_app(ctx: &mut RunContext, spec: &AppSpec, current: AppCurrent) -> Result<ActionOutcome> {
    if version_unchanged(spec, &current) {
        debug!(app = spec.name(), path = %current.app_path.display(), "app already at desired version");
        return Ok(
            ActionOutcome::new(spec.name(), &current.app_path, ActionStatus::Unchanged)
                .with_version(current.installed_version),
        );
    }

    let outcome = match &spec.source {
        AppSource::Custom => install_custom_app(spec, &current)?,
        AppSource::Package { url } => install_packaged_app(ctx, spec, &current, url)?,
    };

    if let Some((user, group)) = current.installation.owner() {
        ctx.host.chown_recursive(&current.app_path, user, group)?;
    }

    info!(
        app = spec.name(),
        path = %current.app_path.display(),
        status = outcome.status.as_str(),
        "app converged"
    );
    Ok(outcome)
}

fn install_custom_app(spec: &AppSpec, current: &AppCurrent) -> Result<ActionOutcome> {
    let existed = current.app_path.exists();
    for subdir in APP_SUBDIRS {
        let dir = current.app_path.join(subdir);
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    if let Some(version) = &spec.version {
        let mut stanzas = Stanzas::new();
        stanzas
            .entry("launcher".to_string())
            .or_default()
            .insert("version".to_string(), version.to_string());
        write_conf(&current.app_path.join(APP_CONF), &stanzas, WriteMode::Merge)?;
    }

    apply_config(spec, &current.app_path)?;

    let status = match (existed, &current.installed_version) {
        (false, _) => ActionStatus::Installed,
        (true, Some(_)) => ActionStatus::Upgraded,
        (true, None) => ActionStatus::Configured,
    };
    Ok(ActionOutcome::new(spec.name(), &current.app_path, status).with_version(spec.version.clone()))
}

/// Cache filename for a bundle; `.spl` files are gzipped tarballs.
pub fn app_package_filename(url: &str) -> String {
    let filename = filename_from_url(url);
    match filename.strip_suffix(".spl") {
        Some(stem) => format!("{stem}.tgz"),
        None => filename,
    }
}

fn install_packaged_app(
    ctx: &mut RunContext,
    spec: &AppSpec,
    current: &AppCurrent,
    url: &str,
) -> Result<ActionOutcome> {
    ctx.layout.ensure_base_dirs()?;
    let filename = app_package_filename(url);
    let package_path = ctx.layout.app_package_path(&filename);
    ctx.fetcher
        .fetch(url, &package_path)
        .with_context(|| format!("failed to fetch app bundle {url}"))?;
    let format = PackageFormat::infer_from_url(&filename)
        .filter(|format| !format.is_native())
        .ok_or_else(|| anyhow!("unsupported app bundle format: {filename}"))?;

    let existed = current.app_path.exists();
    let app_root = current
        .app_path
        .parent()
        .ok_or_else(|| anyhow!("app path has no parent: {}", current.app_path.display()))?;
    fs::create_dir_all(app_root)
        .with_context(|| format!("failed to create {}", app_root.display()))?;

    let backup = match &current.installed_version {
        Some(installed) if existed && spec.version.as_ref() != Some(installed) => Some(backup_app(
            &ctx.layout,
            spec.name(),
            installed,
            &current.app_path,
        )?),
        _ => None,
    };

    let staging = ctx.layout.app_staging_dir(spec.name());
    remove_dir_if_exists(&staging)?;
    fs::create_dir_all(&staging)
        .with_context(|| format!("failed to create {}", staging.display()))?;
    ctx.host.extract_archive(&package_path, format, &staging)?;

    let staged_app = staging.join(spec.name());
    let bundle_version = validate_extracted_app(&staged_app, spec.name(), spec.version.as_ref())?;
    validate_bundle_versions(
        spec.name(),
        current.installed_version.as_ref(),
        bundle_version.as_ref(),
    )?;
    merge_app(&staged_app, &current.app_path)?;
    remove_dir_if_exists(&staging)?;

    apply_config(spec, &current.app_path)?;

    let status = if existed {
        ActionStatus::Upgraded
    } else {
        ActionStatus::Installed
    };
    Ok(ActionOutcome::new(spec.name(), &current.app_path, status)
        .with_version(bundle_version)
        .with_backup(backup))
}

/// Runs the configuration callback, then the files callback, then writes
/// metadata. The writer handed to the callback lives only for the call.
pub fn apply_config(spec: &AppSpec, app_path: &Path) -> Result<()> {
    let scope = spec.scope();
    if let Some(configs) = &spec.configs {
        let mut writer = AppConfWriter::new(app_path, scope);
        configs(&mut writer)
            .with_context(|| format!("configuration of app {} failed", spec.name()))?;
    }

    if let Some(files) = &spec.files {
        files(app_path).with_context(|| format!("file callback of app {} failed", spec.name()))?;
    }

    // local.meta of a packaged app stays with the user unless metadata is declared.
    if scope == ConfScope::Default || !spec.metadata.is_empty() {
        let meta_path = app_path
            .join("metadata")
            .join(format!("{}.meta", scope.as_str()));
        write_conf(&meta_path, &render_metadata(&spec.metadata), WriteMode::Reset)?;
    }
    Ok(())
}

/// Removal of one app directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppUninstallSpec {
    pub target: AppTarget,
}

pub fn load_app_uninstall_current(
    ctx: &mut RunContext,
    spec: &AppUninstallSpec,
) -> Result<PathBuf> {
    let installation = resolve_installation(ctx, &spec.target)?;
    Ok(app_path(&installation, &spec.target))
}

pub fn reconcile_app_uninstall(spec: &AppUninstallSpec, app_path: PathBuf) -> Result<ActionOutcome> {
    let status = if remove_dir_if_exists(&app_path)? {
        info!(app = %spec.target.name, path = %app_path.display(), "app removed");
        ActionStatus::Uninstalled
    } else {
        ActionStatus::NotInstalled
    };
    Ok(ActionOutcome::new(&spec.target.name, app_path, status))
}
