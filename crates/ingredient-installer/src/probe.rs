use anyhow::{Context, Result};
use ingredient_core::{Arch, Flavor, ProductVersion};
use std::fs;
use std::io;
use std::path::Path;

use crate::InstallationRecord;

/// Relative location of the version stamp every installation carries.
pub const VERSION_FILE: &str = "etc/splunk.version";

/// App bundled with the forwarder; its presence tells the flavors apart when
/// the version stamp does not.
const FORWARDER_MARKER_APP: &str = "etc/apps/SplunkUniversalForwarder";

/// Inspects an install directory on the live host.
pub trait Prober {
    fn probe(&self, install_dir: &Path) -> Result<Option<InstallationRecord>>;
}

/// Reads `etc/splunk.version` from the install directory.
#[derive(Debug, Clone, Copy)]
pub struct FsProber {
    pub default_arch: Arch,
}

impl Prober for FsProber {
    fn probe(&self, install_dir: &Path) -> Result<Option<InstallationRecord>> {
        let path = install_dir.join(VERSION_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read version file: {}", path.display()));
            }
        };

        let stamp = parse_version_file(&raw)
            .with_context(|| format!("failed to parse version file: {}", path.display()))?;
        let flavor = match stamp.product {
            Some(Flavor::UniversalForwarder) => Flavor::UniversalForwarder,
            _ if install_dir.join(FORWARDER_MARKER_APP).is_dir() => Flavor::UniversalForwarder,
            _ => Flavor::Splunk,
        };

        Ok(Some(InstallationRecord {
            install_dir: install_dir.to_path_buf(),
            flavor,
            version: stamp.version,
            build: stamp.build,
            arch: stamp.arch.unwrap_or(self.default_arch),
            user: None,
            group: None,
            method: None,
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VersionStamp {
    pub version: ProductVersion,
    pub build: String,
    pub product: Option<Flavor>,
    pub arch: Option<Arch>,
}

pub fn parse_version_file(raw: &str) -> Result<VersionStamp> {
    let mut version = None;
    let mut build = None;
    let mut product = None;
    let mut arch = None;

    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        let v = v.trim();
        match k.trim() {
            "VERSION" => version = Some(ProductVersion::parse(v)?),
            "BUILD" => build = Some(v.to_string()),
            "PRODUCT" => product = Flavor::parse(v),
            "PLATFORM" => arch = platform_arch(v),
            _ => {}
        }
    }

    Ok(VersionStamp {
        version: version.context("missing VERSION")?,
        build: build.context("missing BUILD")?,
        product,
        arch,
    })
}

fn platform_arch(platform: &str) -> Option<Arch> {
    let lower = platform.to_ascii_lowercase();
    if lower.contains("x86_64") || lower.contains("amd64") || lower.contains("x64") {
        return Some(Arch::X86_64);
    }
    if lower.contains("i386") || lower.contains("i686") || lower.contains("x86") {
        return Some(Arch::X86);
    }
    None
}
