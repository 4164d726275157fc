//! Per-user timer settings.
//!
//! The settings row is a singleton created lazily with defaults the first
//! time it is read.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError, ValidationError};
use crate::storage::Store;
use crate::timer::IntervalType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Work interval length in minutes.
    #[serde(default = "default_pomodoro_length")]
    pub pomodoro_length: u32,
    #[serde(default = "default_short_break_length")]
    pub short_break_length: u32,
    #[serde(default = "default_long_break_length")]
    pub long_break_length: u32,
    /// Start a break automatically once a work interval ends.
    #[serde(default)]
    pub auto_start_breaks: bool,
    /// Start a work interval automatically once a break ends.
    #[serde(default)]
    pub auto_start_pomodoros: bool,
    /// Every N-th consecutive work interval is followed by a long break.
    /// Zero disables long breaks in the auto-advance chain.
    #[serde(default)]
    pub long_break_interval: u32,
}

fn default_pomodoro_length() -> u32 {
    25
}
fn default_short_break_length() -> u32 {
    5
}
fn default_long_break_length() -> u32 {
    15
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            pomodoro_length: default_pomodoro_length(),
            short_break_length: default_short_break_length(),
            long_break_length: default_long_break_length(),
            auto_start_breaks: false,
            auto_start_pomodoros: false,
            long_break_interval: 0,
        }
    }
}

impl Settings {
    /// Configured length of an interval type, in minutes.
    pub fn minutes_for(&self, interval: IntervalType) -> u32 {
        match interval {
            IntervalType::Work => self.pomodoro_length,
            IntervalType::ShortBreak => self.short_break_length,
            IntervalType::LongBreak => self.long_break_length,
        }
    }

    pub fn duration_secs(&self, interval: IntervalType) -> u64 {
        u64::from(self.minutes_for(interval)).saturating_mul(60)
    }

    /// Apply a patch, validating before mutating.
    pub fn apply(&mut self, patch: &SettingsPatch) -> std::result::Result<(), ValidationError> {
        for (field, value) in [
            ("pomodoro_length", patch.pomodoro_length),
            ("short_break_length", patch.short_break_length),
            ("long_break_length", patch.long_break_length),
        ] {
            if value == Some(0) {
                return Err(ValidationError::NonPositiveDuration { field });
            }
        }

        if let Some(v) = patch.pomodoro_length {
            self.pomodoro_length = v;
        }
        if let Some(v) = patch.short_break_length {
            self.short_break_length = v;
        }
        if let Some(v) = patch.long_break_length {
            self.long_break_length = v;
        }
        if let Some(v) = patch.auto_start_breaks {
            self.auto_start_breaks = v;
        }
        if let Some(v) = patch.auto_start_pomodoros {
            self.auto_start_pomodoros = v;
        }
        if let Some(v) = patch.long_break_interval {
            self.long_break_interval = v;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default)]
    pub pomodoro_length: Option<u32>,
    #[serde(default)]
    pub short_break_length: Option<u32>,
    #[serde(default)]
    pub long_break_length: Option<u32>,
    #[serde(default)]
    pub auto_start_breaks: Option<bool>,
    #[serde(default)]
    pub auto_start_pomodoros: Option<bool>,
    #[serde(default)]
    pub long_break_interval: Option<u32>,
}

/// Handle over the settings singleton. Clones share the cached value.
#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn Store>,
    cached: Arc<Mutex<Option<Settings>>>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Settings>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current settings, creating and saving defaults on first access.
    pub fn get(&self) -> std::result::Result<Settings, StoreError> {
        if let Some(settings) = self.lock().clone() {
            return Ok(settings);
        }
        let settings = match self.store.load_settings()? {
            Some(s) => s,
            None => {
                let defaults = Settings::default();
                self.store.save_settings(&defaults)?;
                tracing::debug!("created default settings");
                defaults
            }
        };
        *self.lock() = Some(settings.clone());
        Ok(settings)
    }

    /// Last value seen, or defaults if nothing could be read yet.
    ///
    /// Never touches the store; used when the store is failing.
    pub fn cached_or_default(&self) -> Settings {
        self.lock().clone().unwrap_or_default()
    }

    pub fn update(&self, patch: &SettingsPatch) -> Result<Settings> {
        let mut settings = self.get()?;
        settings.apply(patch)?;
        self.store.save_settings(&settings)?;
        *self.lock() = Some(settings.clone());
        tracing::debug!(?patch, "settings updated");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn defaults_created_lazily() {
        let backend = Arc::new(MemoryStore::new());
        assert!(backend.load_settings().unwrap().is_none());

        let store = SettingsStore::new(backend.clone());
        let settings = store.get().unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.pomodoro_length, 25);
        assert_eq!(settings.short_break_length, 5);
        assert_eq!(settings.long_break_length, 15);
        assert!(!settings.auto_start_breaks);
        assert!(!settings.auto_start_pomodoros);
        assert_eq!(backend.load_settings().unwrap(), Some(Settings::default()));
    }

    #[test]
    fn update_round_trips() {
        let store = SettingsStore::new(Arc::new(MemoryStore::new()));
        store
            .update(&SettingsPatch {
                pomodoro_length: Some(50),
                ..Default::default()
            })
            .unwrap();
        let settings = store.get().unwrap();
        assert_eq!(settings.pomodoro_length, 50);
        assert_eq!(settings.duration_secs(IntervalType::Work), 3000);
        assert_eq!(settings.short_break_length, 5);
    }

    #[test]
    fn zero_duration_rejected_before_saving() {
        let backend = Arc::new(MemoryStore::new());
        let store = SettingsStore::new(backend.clone());
        let err = store.update(&SettingsPatch {
            short_break_length: Some(0),
            auto_start_breaks: Some(true),
            ..Default::default()
        });
        assert!(err.is_err());
        assert_eq!(store.get().unwrap(), Settings::default());
        assert_eq!(backend.load_settings().unwrap(), Some(Settings::default()));
    }

    #[test]
    fn clones_share_cache() {
        let a = SettingsStore::new(Arc::new(MemoryStore::new()));
        let b = a.clone();
        a.update(&SettingsPatch {
            auto_start_pomodoros: Some(true),
            ..Default::default()
        })
        .unwrap();
        assert!(b.get().unwrap().auto_start_pomodoros);
        assert!(b.cached_or_default().auto_start_pomodoros);
    }

    #[test]
    fn settings_toml_roundtrip_fills_missing_fields() {
        let parsed: Settings = toml::from_str("pomodoro_length = 40").unwrap();
        assert_eq!(parsed.pomodoro_length, 40);
        assert_eq!(parsed.long_break_length, 15);
        assert_eq!(parsed.long_break_interval, 0);
    }
}
