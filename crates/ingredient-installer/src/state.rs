use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::probe::Prober;
use crate::InstallationRecord;

/// Run-scoped view of the installations on this host.
///
/// Each install directory is probed at most once per run; later lookups,
/// including ones that found nothing, are answered from memory. Not meant to
/// be shared across threads or across runs.
pub struct InstalledStateTracker {
    prober: Box<dyn Prober>,
    installations: HashMap<PathBuf, Option<InstallationRecord>>,
    current: Option<PathBuf>,
}

impl InstalledStateTracker {
    pub fn new(prober: Box<dyn Prober>) -> Self {
        Self {
            prober,
            installations: HashMap::new(),
            current: None,
        }
    }

    pub fn probe(&mut self, install_dir: &Path) -> Result<Option<&InstallationRecord>> {
        if !self.installations.contains_key(install_dir) {
            let found = self.prober.probe(install_dir)?;
            debug!(
                install_dir = %install_dir.display(),
                found = found.is_some(),
                "probed installation"
            );
            self.installations.insert(install_dir.to_path_buf(), found);
        }
        Ok(self
            .installations
            .get(install_dir)
            .and_then(Option::as_ref))
    }

    /// Tracked record without touching the host.
    pub fn get(&self, install_dir: &Path) -> Option<&InstallationRecord> {
        self.installations.get(install_dir).and_then(Option::as_ref)
    }

    pub fn record(&mut self, record: InstallationRecord) {
        self.installations
            .insert(record.install_dir.clone(), Some(record));
    }

    pub fn forget(&mut self, install_dir: &Path) -> Option<InstallationRecord> {
        if self.current.as_deref() == Some(install_dir) {
            self.current = None;
        }
        self.installations
            .insert(install_dir.to_path_buf(), None)
            .flatten()
    }

    pub fn set_current(&mut self, install_dir: &Path) {
        self.current = Some(install_dir.to_path_buf());
    }

    pub fn current(&self) -> Option<&InstallationRecord> {
        self.current.as_deref().and_then(|dir| self.get(dir))
    }

    pub fn installations(&self) -> Vec<&InstallationRecord> {
        let mut records = self
            .installations
            .values()
            .filter_map(Option::as_ref)
            .collect::<Vec<_>>();
        records.sort_by(|a, b| a.install_dir.cmp(&b.install_dir));
        records
    }
}
