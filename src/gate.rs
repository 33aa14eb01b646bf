//! Execution-mode gate.
//!
//! A [`Probe`] decides whether real storage work can happen. The stage asks it
//! once per top-level call and uses that answer for the whole call.

use std::sync::Arc;

use crate::storage::LayerStorage;

/// Environment variable read by [`EnvProbe`].
pub const MODE_ENV: &str = "OPENUSD_STAGE_MODE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Operations run against the real backend.
    Available,
    /// Mutations are acknowledged without effect and reads see an empty world.
    Degraded,
}

impl Mode {
    /// Parse a mode setting. `degraded`, `null` and `off` select
    /// [`Mode::Degraded`]; anything else is [`Mode::Available`].
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "degraded" | "null" | "off" => Mode::Degraded,
            _ => Mode::Available,
        }
    }
}

pub trait Probe: Send + Sync {
    fn probe(&self) -> Mode;
}

/// Always reports the same mode.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub Mode);

impl Probe for FixedProbe {
    fn probe(&self) -> Mode {
        self.0
    }
}

/// Reads [`MODE_ENV`] on every probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvProbe;

impl Probe for EnvProbe {
    fn probe(&self) -> Mode {
        std::env::var(MODE_ENV)
            .map(|value| Mode::from_setting(&value))
            .unwrap_or(Mode::Available)
    }
}

/// Available while the storage backend reports itself usable.
#[derive(Clone)]
pub struct StorageProbe {
    storage: Arc<dyn LayerStorage>,
}

impl StorageProbe {
    pub fn new(storage: Arc<dyn LayerStorage>) -> Self {
        Self { storage }
    }
}

impl std::fmt::Debug for StorageProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageProbe").finish_non_exhaustive()
    }
}

impl Probe for StorageProbe {
    fn probe(&self) -> Mode {
        if self.storage.is_available() {
            Mode::Available
        } else {
            Mode::Degraded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};

    #[test]
    fn mode_settings() {
        for degraded in ["degraded", "NULL", " off "] {
            assert_eq!(Mode::from_setting(degraded), Mode::Degraded);
        }
        for available in ["", "real", "available", "on"] {
            assert_eq!(Mode::from_setting(available), Mode::Available);
        }
    }

    #[test]
    fn fixed_probe() {
        assert_eq!(FixedProbe(Mode::Degraded).probe(), Mode::Degraded);
        assert_eq!(FixedProbe(Mode::Available).probe(), Mode::Available);
    }

    #[test]
    fn storage_probe_follows_storage() {
        let memory = Arc::new(MemoryStorage::new());
        let probe = StorageProbe::new(memory.clone());
        assert_eq!(probe.probe(), Mode::Available);
        memory.set_available(false);
        assert_eq!(probe.probe(), Mode::Degraded);

        let dir = tempfile::tempdir().unwrap();
        let missing = StorageProbe::new(Arc::new(FileStorage::new(dir.path().join("gone"))));
        assert_eq!(missing.probe(), Mode::Degraded);
        let present = StorageProbe::new(Arc::new(FileStorage::new(dir.path())));
        assert_eq!(present.probe(), Mode::Available);
    }
}
