#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageFormat {
    Rpm,
    Deb,
    Msi,
    TarGz,
    Zip,
}

impl PackageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rpm => "rpm",
            Self::Deb => "deb",
            Self::Msi => "msi",
            Self::TarGz => "tgz",
            Self::Zip => "zip",
        }
    }

    /// Installed through the OS package manager rather than unpacked.
    pub fn is_native(self) -> bool {
        matches!(self, Self::Rpm | Self::Deb | Self::Msi)
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "rpm" => Some(Self::Rpm),
            "deb" => Some(Self::Deb),
            "msi" => Some(Self::Msi),
            "tgz" | "tar.gz" | "spl" => Some(Self::TarGz),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }

    pub fn infer_from_url(url: &str) -> Option<Self> {
        let lower = url.to_ascii_lowercase();
        let without_fragment = lower.split('#').next().unwrap_or(&lower);
        let without_query = without_fragment
            .split('?')
            .next()
            .unwrap_or(without_fragment);

        if without_query.ends_with(".tar.gz") {
            return Some(Self::TarGz);
        }
        let (_, extension) = without_query.rsplit_once('.')?;
        Self::parse(extension)
    }
}
