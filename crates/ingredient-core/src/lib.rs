mod archive;
mod error;
mod platform;
mod resolver;
mod version;

pub use archive::PackageFormat;
pub use error::IngredientError;
pub use platform::{linux_family_from_os_release, Arch, Flavor, Platform, PlatformFamily};
pub use resolver::{
    default_install_dir, filename_from_url, installer_format, package_filename,
    resolve_download_url, InstallMethod, ResolvedArtifact, DEFAULT_BASE_URL,
};
pub use version::ProductVersion;

#[cfg(test)]
mod tests;
