use ingredient_core::Platform;

use crate::fetch::ArtifactFetcher;
use crate::host::HostOps;
use crate::layout::CacheLayout;
use crate::probe::{FsProber, Prober};
use crate::state::InstalledStateTracker;

/// Everything one convergence run shares between resources. Built at run
/// start, passed by `&mut` through every action, dropped at run end.
pub struct RunContext {
    pub(crate) platform: Platform,
    pub(crate) layout: CacheLayout,
    pub(crate) tracker: InstalledStateTracker,
    pub(crate) fetcher: Box<dyn ArtifactFetcher>,
    pub(crate) host: Box<dyn HostOps>,
}

impl RunContext {
    pub fn new(
        platform: Platform,
        layout: CacheLayout,
        fetcher: Box<dyn ArtifactFetcher>,
        host: Box<dyn HostOps>,
    ) -> Self {
        let prober = FsProber {
            default_arch: platform.arch,
        };
        Self {
            platform,
            layout,
            tracker: InstalledStateTracker::new(Box::new(prober)),
            fetcher,
            host,
        }
    }

    pub fn with_prober(mut self, prober: Box<dyn Prober>) -> Self {
        self.tracker = InstalledStateTracker::new(prober);
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    pub fn tracker(&self) -> &InstalledStateTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut InstalledStateTracker {
        &mut self.tracker
    }
}
