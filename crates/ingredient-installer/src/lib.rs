mod app;
mod app_upgrade;
mod conf;
mod context;
mod fetch;
mod fs_utils;
mod host;
mod install;
mod layout;
mod probe;
mod resource;
mod state;
mod types;
mod uninstall;

pub use app::{
    app_package_filename, app_path, prerelease_over_release, read_app_version, render_metadata,
    AppConfWriter, AppCurrent, AppRoot, AppSource, AppSpec, AppTarget, AppUninstallSpec,
    ConfScope, ConfigCallback, FilesCallback, MetaAccess, MetaStanza,
};
pub use app_upgrade::{merge_app, validate_bundle_versions, validate_extracted_app};
pub use conf::{parse_conf, read_conf, render_conf, write_conf, Stanzas, WriteMode};
pub use context::RunContext;
pub use fetch::{ArtifactFetcher, FetchStatus};
pub use fs_utils::{copy_dir_recursive, remove_dir_if_exists, remove_file_if_exists};
pub use host::{msi_install_options, CommandHost, HostOps, NativeInstall};
pub use install::{plan_install, InstallCurrent, InstallPlan, InstallSpec, Owner};
pub use layout::{default_cache_root, CacheLayout};
pub use probe::{parse_version_file, FsProber, Prober, VersionStamp, VERSION_FILE};
pub use resource::{converge_all, Reconcile, Resource};
pub use state::InstalledStateTracker;
pub use types::{ActionOutcome, ActionStatus, InstallationRecord};
pub use uninstall::{UninstallCurrent, UninstallSpec};
