use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::archive::PackageFormat;
use crate::error::IngredientError;
use crate::platform::{Arch, Flavor, Platform, PlatformFamily};
use crate::version::ProductVersion;

pub const DEFAULT_BASE_URL: &str = "https://download.splunk.com/products";

/// How an install resource wants the product laid down.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstallMethod {
    /// OS package manager where the platform has one, archive otherwise.
    #[default]
    Package,
    Archive,
}

impl InstallMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Package => "package",
            Self::Archive => "archive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "package" => Some(Self::Package),
            "archive" => Some(Self::Archive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub url: String,
    pub filename: String,
    pub format: PackageFormat,
}

/// Format the installer will actually use for `method` on `platform`.
pub fn installer_format(platform: Platform, method: InstallMethod) -> PackageFormat {
    match method {
        InstallMethod::Package => platform
            .family
            .native_format()
            .unwrap_or_else(|| platform.family.archive_format()),
        InstallMethod::Archive => platform.family.archive_format(),
    }
}

pub fn default_install_dir(platform: Platform, flavor: Flavor) -> PathBuf {
    let dir = match (platform.family, flavor) {
        (PlatformFamily::Windows, Flavor::Splunk) => r"C:\Program Files\Splunk",
        (PlatformFamily::Windows, Flavor::UniversalForwarder) => {
            r"C:\Program Files\SplunkUniversalForwarder"
        }
        (PlatformFamily::MacOs, Flavor::Splunk) => "/Applications/Splunk",
        (PlatformFamily::MacOs, Flavor::UniversalForwarder) => "/Applications/SplunkForwarder",
        (_, Flavor::Splunk) => "/opt/splunk",
        (_, Flavor::UniversalForwarder) => "/opt/splunkforwarder",
    };
    PathBuf::from(dir)
}

pub fn package_filename(
    platform: Platform,
    flavor: Flavor,
    version: &ProductVersion,
    build: &str,
    format: PackageFormat,
) -> Result<String, IngredientError> {
    let stem = format!(
        "{}-{}-{}",
        flavor.package_name(),
        version.without_build(),
        build
    );
    let suffix = match (platform.family, format, platform.arch) {
        (PlatformFamily::Rhel, PackageFormat::Rpm, Arch::X86_64) => "-linux-2.6-x86_64.rpm",
        (PlatformFamily::Rhel, PackageFormat::Rpm, Arch::X86) => ".i386.rpm",
        (PlatformFamily::Debian, PackageFormat::Deb, Arch::X86_64) => "-linux-2.6-amd64.deb",
        (PlatformFamily::Debian, PackageFormat::Deb, Arch::X86) => "-linux-2.6-intel.deb",
        (PlatformFamily::Windows, PackageFormat::Msi, Arch::X86_64) => "-x64-release.msi",
        (PlatformFamily::Windows, PackageFormat::Msi, Arch::X86) => "-x86-release.msi",
        (PlatformFamily::Windows, PackageFormat::Zip, Arch::X86_64) => "-windows-64.zip",
        (PlatformFamily::Windows, PackageFormat::Zip, Arch::X86) => "-windows-32.zip",
        (PlatformFamily::MacOs, PackageFormat::TarGz, Arch::X86_64) => "-darwin-64.tgz",
        (
            PlatformFamily::Rhel | PlatformFamily::Debian | PlatformFamily::Suse,
            PackageFormat::TarGz,
            Arch::X86_64,
        ) => "-Linux-x86_64.tgz",
        (
            PlatformFamily::Rhel | PlatformFamily::Debian | PlatformFamily::Suse,
            PackageFormat::TarGz,
            Arch::X86,
        ) => "-Linux-i686.tgz",
        _ => {
            return Err(IngredientError::UnsupportedCombination(format!(
                "{} {} {} has no {} artifact",
                platform.family,
                platform.arch,
                flavor,
                format.as_str()
            )))
        }
    };

    Ok(format!("{stem}{suffix}"))
}

pub fn resolve_download_url(
    platform: Platform,
    flavor: Flavor,
    version: &ProductVersion,
    build: &str,
    base_url: Option<&str>,
    method: InstallMethod,
) -> Result<ResolvedArtifact, IngredientError> {
    let format = installer_format(platform, method);
    let filename = package_filename(platform, flavor, version, build, format)?;
    let base = base_url
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_BASE_URL)
        .trim_end_matches('/');

    let url = format!(
        "{base}/{}/releases/{}/{}/{filename}",
        flavor.product_path(),
        version.without_build(),
        platform.family.download_os()
    );
    Ok(ResolvedArtifact {
        url,
        filename,
        format,
    })
}

/// Last path segment of `url`, ignoring any query string or fragment.
pub fn filename_from_url(url: &str) -> String {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
