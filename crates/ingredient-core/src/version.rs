use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::{BuildMetadata, Prerelease};
use serde::{Deserialize, Serialize};

use crate::error::IngredientError;

/// Version of an installation or app bundle, `MAJOR.MINOR[.PATCH][-pre][+build]`.
///
/// Ordering is partial: numeric fields compare numerically, a prerelease sits
/// directly below the release with the same numbers, and build identifiers
/// only take part in equality. Two versions that differ solely by build are
/// unordered (`partial_cmp` returns `None`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductVersion {
    major: u64,
    minor: u64,
    patch: u64,
    prerelease: Option<Prerelease>,
    build: Option<BuildMetadata>,
}

impl ProductVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    pub fn parse(input: &str) -> Result<Self, IngredientError> {
        let trimmed = input.trim();
        let invalid = |token: &str| IngredientError::InvalidVersion {
            input: input.to_string(),
            token: token.to_string(),
        };
        if trimmed.is_empty() {
            return Err(invalid(""));
        }

        let (rest, build) = match trimmed.split_once('+') {
            Some((rest, build)) => (rest, Some(build)),
            None => (trimmed, None),
        };
        let (core, prerelease) = match rest.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (rest, None),
        };

        let fields = core.split('.').collect::<Vec<_>>();
        if fields.len() < 2 || fields.len() > 3 {
            return Err(invalid(core));
        }
        let mut numbers = [0_u64; 3];
        for (slot, field) in numbers.iter_mut().zip(&fields) {
            if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(field));
            }
            *slot = field.parse().map_err(|_| invalid(field))?;
        }

        let prerelease = match prerelease {
            Some(pre) if pre.is_empty() => return Err(invalid("-")),
            Some(pre) => Some(Prerelease::new(pre).map_err(|_| invalid(pre))?),
            None => None,
        };
        let build = match build {
            Some(build) if build.is_empty() => return Err(invalid("+")),
            Some(build) => Some(BuildMetadata::new(build).map_err(|_| invalid(build))?),
            None => None,
        };

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            prerelease,
            build,
        })
    }

    pub fn with_prerelease(mut self, prerelease: &str) -> Result<Self, IngredientError> {
        let parsed = Prerelease::new(prerelease).map_err(|_| IngredientError::InvalidVersion {
            input: format!("{self}-{prerelease}"),
            token: prerelease.to_string(),
        })?;
        self.prerelease = (!parsed.is_empty()).then_some(parsed);
        Ok(self)
    }

    pub fn with_build(mut self, build: &str) -> Result<Self, IngredientError> {
        let parsed = BuildMetadata::new(build).map_err(|_| IngredientError::InvalidVersion {
            input: format!("{self}+{build}"),
            token: build.to_string(),
        })?;
        self.build = (!parsed.is_empty()).then_some(parsed);
        Ok(self)
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    pub fn prerelease(&self) -> Option<&str> {
        self.prerelease.as_ref().map(Prerelease::as_str)
    }

    pub fn build(&self) -> Option<&str> {
        self.build.as_ref().map(BuildMetadata::as_str)
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// The release this version belongs to: same numbers, no prerelease or build.
    pub fn release(&self) -> Self {
        Self::new(self.major, self.minor, self.patch)
    }

    pub fn without_build(&self) -> Self {
        Self {
            build: None,
            ..self.clone()
        }
    }

    pub fn same_numbers(&self, other: &Self) -> bool {
        self.numbers() == other.numbers()
    }

    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        self.partial_cmp(other)
    }

    fn numbers(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }

    fn build_matches(&self, other: &Self) -> bool {
        match (&self.build, &other.build) {
            (Some(left), Some(right)) => left.as_str() == right.as_str(),
            _ => true,
        }
    }
}

impl PartialEq for ProductVersion {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for ProductVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let numeric = self.numbers().cmp(&other.numbers());
        if numeric != Ordering::Equal {
            return Some(numeric);
        }

        let pre = match (&self.prerelease, &other.prerelease) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(left), Some(right)) => left.cmp(right),
        };
        if pre != Ordering::Equal {
            return Some(pre);
        }

        self.build_matches(other).then_some(Ordering::Equal)
    }
}

impl fmt::Display for ProductVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.prerelease {
            write!(f, "-{pre}")?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

impl FromStr for ProductVersion {
    type Err = IngredientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProductVersion {
    type Error = IngredientError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProductVersion> for String {
    fn from(value: ProductVersion) -> Self {
        value.to_string()
    }
}
