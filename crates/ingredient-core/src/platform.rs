use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::archive::PackageFormat;
use crate::error::IngredientError;

/// Which product variant an installation holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Flavor {
    Splunk,
    UniversalForwarder,
}

impl Flavor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Splunk => "splunk",
            Self::UniversalForwarder => "universal_forwarder",
        }
    }

    /// Name of the native package and the prefix of every artifact filename.
    pub fn package_name(self) -> &'static str {
        match self {
            Self::Splunk => "splunk",
            Self::UniversalForwarder => "splunkforwarder",
        }
    }

    /// Path segment used by the download site.
    pub fn product_path(self) -> &'static str {
        match self {
            Self::Splunk => "splunk",
            Self::UniversalForwarder => "universalforwarder",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "splunk" => Some(Self::Splunk),
            "universal_forwarder" | "universalforwarder" | "splunkforwarder" | "forwarder" => {
                Some(Self::UniversalForwarder)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flavor {
    type Err = IngredientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| IngredientError::MissingFlavor(format!("unknown package '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlatformFamily {
    Rhel,
    Debian,
    Suse,
    Windows,
    MacOs,
}

impl PlatformFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rhel => "rhel",
            Self::Debian => "debian",
            Self::Suse => "suse",
            Self::Windows => "windows",
            Self::MacOs => "mac_os_x",
        }
    }

    /// Maps a platform name (as reported by the host, e.g. `redhat`, `ubuntu`)
    /// onto the family that decides URLs and installer behavior.
    pub fn from_platform_name(name: &str) -> Result<Self, IngredientError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "redhat" | "rhel" | "centos" | "fedora" | "amazon" | "oracle" | "rocky"
            | "almalinux" | "scientific" => Ok(Self::Rhel),
            "debian" | "ubuntu" | "linuxmint" => Ok(Self::Debian),
            "suse" | "opensuse" | "opensuseleap" | "sles" | "sled" => Ok(Self::Suse),
            "windows" => Ok(Self::Windows),
            "mac_os_x" | "macos" | "darwin" => Ok(Self::MacOs),
            other => Err(IngredientError::UnsupportedCombination(format!(
                "platform '{other}' is not supported"
            ))),
        }
    }

    pub fn is_windows(self) -> bool {
        self == Self::Windows
    }

    /// Native package format for this family, if the product ships one.
    pub fn native_format(self) -> Option<PackageFormat> {
        match self {
            Self::Rhel => Some(PackageFormat::Rpm),
            Self::Debian => Some(PackageFormat::Deb),
            Self::Windows => Some(PackageFormat::Msi),
            Self::Suse | Self::MacOs => None,
        }
    }

    pub fn archive_format(self) -> PackageFormat {
        match self {
            Self::Windows => PackageFormat::Zip,
            _ => PackageFormat::TarGz,
        }
    }

    pub fn download_os(self) -> &'static str {
        match self {
            Self::Rhel | Self::Debian | Self::Suse => "linux",
            Self::Windows => "windows",
            Self::MacOs => "osx",
        }
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    X86_64,
    X86,
}

impl Arch {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::X86 => "x86",
        }
    }

    pub fn parse(input: &str) -> Result<Self, IngredientError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "x86_64" | "amd64" | "x64" => Ok(Self::X86_64),
            "x86" | "i386" | "i686" => Ok(Self::X86),
            other => Err(IngredientError::UnsupportedCombination(format!(
                "architecture '{other}' is not supported"
            ))),
        }
    }

    pub fn is_64bit(self) -> bool {
        self == Self::X86_64
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub family: PlatformFamily,
    pub arch: Arch,
}

impl Platform {
    pub fn new(family: PlatformFamily, arch: Arch) -> Self {
        Self { family, arch }
    }

    pub fn from_names(platform: &str, arch: &str) -> Result<Self, IngredientError> {
        Ok(Self::new(
            PlatformFamily::from_platform_name(platform)?,
            Arch::parse(arch)?,
        ))
    }

    /// Platform of the running host. Linux distributions are told apart by
    /// the `ID`/`ID_LIKE` fields of an os-release document.
    pub fn detect(os_release: Option<&str>) -> Result<Self, IngredientError> {
        let arch = Arch::parse(std::env::consts::ARCH)?;
        let family = match std::env::consts::OS {
            "windows" => PlatformFamily::Windows,
            "macos" => PlatformFamily::MacOs,
            "linux" => linux_family_from_os_release(os_release.unwrap_or_default())?,
            other => PlatformFamily::from_platform_name(other)?,
        };
        Ok(Self::new(family, arch))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.family, self.arch)
    }
}

pub fn linux_family_from_os_release(raw: &str) -> Result<PlatformFamily, IngredientError> {
    let mut candidates = Vec::new();
    for line in raw.lines().map(str::trim) {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key == "ID" || key == "ID_LIKE" {
            let value = value.trim_matches('"');
            candidates.extend(value.split_whitespace().map(str::to_string));
        }
    }

    candidates
        .iter()
        .find_map(|candidate| PlatformFamily::from_platform_name(candidate).ok())
        .ok_or_else(|| {
            IngredientError::UnsupportedCombination(format!(
                "linux distribution '{}' is not supported",
                candidates.first().map(String::as_str).unwrap_or("unknown")
            ))
        })
}
