//! NVS persistence for keyer settings with schema versioning.
//!
//! [`NvsSettings`] keeps a [`MemorySettings`] cache and writes every change
//! through to flash. Reads never touch NVS after [`NvsSettings::open`].
//!
//! # Version History
//!
//! - **v1** (current): wpm, keying mode, left paddle, frequency, callsign,
//!   10 message slots with repeat minutes, 10 presets, active preset index
//!
//! # Migration
//!
//! When the layout changes:
//! 1. Increment `CURRENT_SCHEMA_VERSION`
//! 2. Add a `migrate_vN_to_vM()` step
//! 3. Route it in `migrate()`

use core::cmp::Ordering;
use core::fmt::Write;

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_svc::sys::EspError;
use heapless::String;

use super::{KeyerSettings, MemorySettings, Settings, MEMORY_LEN, MEMORY_SLOTS, PRESET_COUNT};
use crate::keyer::KeyingMode;
use crate::log_globals::MAIN_LOG_STREAM;
use crate::logging;
use crate::symbol::Symbol;
use crate::{rt_error, rt_info};

/// Current NVS schema version
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// NVS namespace for keyer settings
pub const NVS_NAMESPACE: &str = "cw_kbd";

const VERSION_KEY: &str = "schema_ver";
const ACTIVE_INDEX_KEY: &str = "active_idx";
const CALLSIGN_KEY: &str = "callsign";

/// NVS keys are at most 15 bytes.
type Key = String<15>;

/// Migration result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationResult {
    /// Fresh install, defaults written
    FreshInstall,
    /// Schema up-to-date, loaded successfully
    UpToDate,
    /// Migrated from older version
    Migrated { from_version: u32, to_version: u32 },
}

/// NVS operation errors
#[derive(Debug)]
pub enum NvsError {
    /// NVS initialization failed
    InitFailed(EspError),
    /// Schema version too new (downgrade not supported)
    TooNew { stored_version: u32 },
    /// NVS read/write error
    IoError(EspError),
    /// Unsupported migration path
    UnsupportedMigration { from: u32, to: u32 },
}

impl From<EspError> for NvsError {
    fn from(e: EspError) -> Self {
        NvsError::IoError(e)
    }
}

impl core::fmt::Display for NvsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NvsError::InitFailed(e) => write!(f, "NVS init failed: {}", e),
            NvsError::TooNew { stored_version } => {
                let current = CURRENT_SCHEMA_VERSION;
                write!(f, "NVS schema v{} is newer than v{}", stored_version, current)
            }
            NvsError::IoError(e) => write!(f, "NVS I/O error: {}", e),
            NvsError::UnsupportedMigration { from, to } => {
                write!(f, "no NVS migration from v{} to v{}", from, to)
            }
        }
    }
}

impl core::error::Error for NvsError {}

fn key(args: core::fmt::Arguments<'_>) -> Key {
    let mut k = Key::new();
    let _ = k.write_fmt(args);
    k
}

/// Write-through persistent settings.
pub struct NvsSettings {
    cache: MemorySettings,
    storage: EspNvs<NvsDefault>,
}

impl NvsSettings {
    /// Open the namespace and load it, migrating if needed.
    ///
    /// A fresh partition is initialised with factory defaults.
    pub fn open(partition: EspDefaultNvsPartition) -> Result<(Self, MigrationResult), NvsError> {
        let storage = EspNvs::new(partition, NVS_NAMESPACE, true).map_err(NvsError::InitFailed)?;
        let mut this = Self {
            cache: MemorySettings::new(),
            storage,
        };

        let stored_version = this.storage.get_u32(VERSION_KEY)?.unwrap_or(0);

        let result = match stored_version.cmp(&CURRENT_SCHEMA_VERSION) {
            Ordering::Equal => {
                this.load_v1()?;
                MigrationResult::UpToDate
            }
            Ordering::Less if stored_version == 0 => {
                this.save_all()?;
                MigrationResult::FreshInstall
            }
            Ordering::Less => {
                this.migrate(stored_version, CURRENT_SCHEMA_VERSION)?;
                this.load_v1()?;
                MigrationResult::Migrated {
                    from_version: stored_version,
                    to_version: CURRENT_SCHEMA_VERSION,
                }
            }
            Ordering::Greater => return Err(NvsError::TooNew { stored_version }),
        };

        rt_info!(MAIN_LOG_STREAM, logging::clock(), "nvs: settings {:?}", result);
        Ok((this, result))
    }

    /// The in-memory copy.
    pub fn cache(&self) -> &MemorySettings {
        &self.cache
    }

    /// Write everything with the current version stamp.
    pub fn save_all(&mut self) -> Result<(), NvsError> {
        self.storage.set_u32(VERSION_KEY, CURRENT_SCHEMA_VERSION)?;
        self.storage
            .set_u8(ACTIVE_INDEX_KEY, self.cache.active_preset() as u8)?;
        self.storage.set_str(CALLSIGN_KEY, self.cache.callsign())?;
        let current = self.cache.keyer();
        self.save_keyer("cur", &current)?;

        for i in 0..PRESET_COUNT {
            if let Some(p) = self.cache.preset(i).copied() {
                self.save_keyer_indexed(i, &p)?;
            }
        }
        for slot in 0..MEMORY_SLOTS {
            self.save_memory(slot)?;
        }
        Ok(())
    }

    fn load_v1(&mut self) -> Result<(), NvsError> {
        if let Some(k) = self.load_keyer("cur")? {
            self.cache.set_keyer(k);
        }

        for i in 0..PRESET_COUNT {
            if let Some(p) = self.load_keyer(key(format_args!("p{}", i)).as_str())? {
                self.cache.set_preset(i, p);
            }
        }

        if let Some(active) = self.storage.get_u8(ACTIVE_INDEX_KEY)? {
            self.cache.set_active_preset(active as usize);
        }

        let mut buf = [0u8; MEMORY_LEN + 1];
        if let Some(call) = self.storage.get_str(CALLSIGN_KEY, &mut buf)? {
            self.cache.set_callsign(call);
        }

        for slot in 0..MEMORY_SLOTS {
            let mut buf = [0u8; MEMORY_LEN + 1];
            let text_key = key(format_args!("m{}", slot));
            if let Some(text) = self.storage.get_str(text_key.as_str(), &mut buf)? {
                self.cache.set_memory(slot, text);
            }
            if let Some(r) = self.storage.get_u8(key(format_args!("m{}_rep", slot)).as_str())? {
                self.cache.set_memory_repeat(slot, r);
            }
        }
        Ok(())
    }

    fn load_keyer(&self, prefix: &str) -> Result<Option<KeyerSettings>, NvsError> {
        let Some(wpm) = self.storage.get_u8(key(format_args!("{}_wpm", prefix)).as_str())? else {
            return Ok(None);
        };
        let defaults = KeyerSettings::default();
        let mode = self
            .storage
            .get_u8(key(format_args!("{}_mode", prefix)).as_str())?
            .and_then(KeyingMode::from_u8)
            .unwrap_or(defaults.keying_mode);
        let left = match self.storage.get_u8(key(format_args!("{}_left", prefix)).as_str())? {
            Some(1) => Symbol::Dah,
            _ => Symbol::Dit,
        };
        let frequency = self
            .storage
            .get_u16(key(format_args!("{}_hz", prefix)).as_str())?
            .unwrap_or(defaults.frequency);

        Ok(Some(
            KeyerSettings {
                wpm,
                keying_mode: mode,
                left_paddle: left,
                frequency,
            }
            .sanitized(),
        ))
    }

    fn save_keyer(&mut self, prefix: &str, k: &KeyerSettings) -> Result<(), NvsError> {
        self.storage.set_u8(key(format_args!("{}_wpm", prefix)).as_str(), k.wpm)?;
        self.storage
            .set_u8(key(format_args!("{}_mode", prefix)).as_str(), k.keying_mode as u8)?;
        self.storage
            .set_u8(key(format_args!("{}_left", prefix)).as_str(), k.left_paddle as u8)?;
        self.storage.set_u16(key(format_args!("{}_hz", prefix)).as_str(), k.frequency)?;
        Ok(())
    }

    fn save_keyer_indexed(&mut self, index: usize, k: &KeyerSettings) -> Result<(), NvsError> {
        let prefix = key(format_args!("p{}", index));
        self.save_keyer(prefix.as_str(), k)
    }

    fn save_memory(&mut self, slot: usize) -> Result<(), NvsError> {
        let text = self.cache.memory(slot);
        self.storage.set_str(key(format_args!("m{}", slot)).as_str(), text)?;
        self.storage
            .set_u8(key(format_args!("m{}_rep", slot)).as_str(), self.cache.memory_repeat(slot))?;
        Ok(())
    }

    fn migrate(&mut self, from_version: u32, to_version: u32) -> Result<(), NvsError> {
        match (from_version, to_version) {
            // (1, 2) => migrate_v1_to_v2(&mut self.storage),
            _ => Err(NvsError::UnsupportedMigration {
                from: from_version,
                to: to_version,
            }),
        }
    }

    /// Log a failed write. The cache keeps the new value either way.
    fn persist(&self, what: &str, result: Result<(), NvsError>) {
        if let Err(e) = result {
            rt_error!(MAIN_LOG_STREAM, logging::clock(), "nvs: saving {} failed: {}", what, e);
        }
    }

    fn persist_current(&mut self) {
        let k = self.cache.keyer();
        let r = self.save_keyer("cur", &k);
        self.persist("keyer", r);
    }
}

impl Settings for NvsSettings {
    fn keyer(&self) -> KeyerSettings {
        self.cache.keyer()
    }

    fn set_wpm(&mut self, wpm: u8) {
        self.cache.set_wpm(wpm);
        self.persist_current();
    }

    fn set_frequency(&mut self, hz: u16) {
        self.cache.set_frequency(hz);
        self.persist_current();
    }

    fn set_keying_mode(&mut self, mode: KeyingMode) {
        self.cache.set_keying_mode(mode);
        self.persist_current();
    }

    fn set_left_paddle(&mut self, symbol: Symbol) {
        self.cache.set_left_paddle(symbol);
        self.persist_current();
    }

    fn callsign(&self) -> &str {
        self.cache.callsign()
    }

    fn set_callsign(&mut self, call: &str) {
        self.cache.set_callsign(call);
        let r = self
            .storage
            .set_str(CALLSIGN_KEY, self.cache.callsign())
            .map_err(NvsError::from);
        self.persist("callsign", r);
    }

    fn memory(&self, slot: usize) -> &str {
        self.cache.memory(slot)
    }

    fn set_memory(&mut self, slot: usize, text: &str) {
        self.cache.set_memory(slot, text);
        if slot < MEMORY_SLOTS {
            let r = self.save_memory(slot);
            self.persist("memory", r);
        }
    }

    fn memory_repeat(&self, slot: usize) -> u8 {
        self.cache.memory_repeat(slot)
    }

    fn set_memory_repeat(&mut self, slot: usize, minutes: u8) {
        self.cache.set_memory_repeat(slot, minutes);
        if slot < MEMORY_SLOTS {
            let r = self.save_memory(slot);
            self.persist("memory repeat", r);
        }
    }

    fn load_preset(&mut self, index: usize) {
        self.cache.load_preset(index);
        self.persist_current();
        let r = self
            .storage
            .set_u8(ACTIVE_INDEX_KEY, self.cache.active_preset() as u8)
            .map_err(NvsError::from);
        self.persist("active preset", r);
    }

    fn save_preset(&mut self, index: usize) {
        self.cache.save_preset(index);
        if index < PRESET_COUNT {
            let k = self.cache.keyer();
            let r = self.save_keyer_indexed(index, &k);
            self.persist("preset", r);
        }
    }
}
