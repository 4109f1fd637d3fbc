//! Persisted typed key/value settings store (§6 "Persistent configuration").
//!
//! Each named setting has an immutable default, a runtime value, a
//! one-line help string and an optional validation predicate. `save`
//! serializes the whole table plus a CRC-16; `load` rejects a
//! mismatched CRC. The on-wire query/set syntax is explicitly out of
//! scope per `spec.md` §6 — this module only owns the table and its
//! durability, not how a shell would address it.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A settings value. Sequences cover the "ordered sequences thereof"
/// clause of §6 (e.g. per-axis offset tables).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Str(String),
    I64(i64),
    U64(u64),
    F64(f64),
    BoolSeq(Vec<bool>),
    StrSeq(Vec<String>),
    I64Seq(Vec<i64>),
    U64Seq(Vec<u64>),
    F64Seq(Vec<f64>),
}

/// Errors from loading or saving the settings table.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(String),
    #[error("settings deserialization error: {0}")]
    Decode(String),
    #[error("settings CRC mismatch: stored {stored:#06x}, computed {computed:#06x}")]
    CrcMismatch { stored: u16, computed: u16 },
    #[error("unknown setting key: {0}")]
    UnknownKey(String),
    #[error("validation failed for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

type Validator = fn(&Value) -> Result<(), String>;

/// A single entry in the settings table.
struct Entry {
    default: Value,
    value: Value,
    help: &'static str,
    validator: Option<Validator>,
}

/// The full persisted settings table.
///
/// Keys are `&'static str` — the set of settings is fixed at compile
/// time (new keys are added by registering a default, not by runtime
/// discovery), matching §6's "each key has an immutable default".
pub struct SettingsTable {
    entries: BTreeMap<&'static str, Entry>,
}

impl SettingsTable {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Register a setting with its default, help string, and optional
    /// validator. Registration order doesn't matter — the table is
    /// serialized sorted by key for a deterministic CRC.
    pub fn register(
        &mut self,
        key: &'static str,
        default: Value,
        help: &'static str,
        validator: Option<Validator>,
    ) {
        self.entries.insert(
            key,
            Entry {
                value: default.clone(),
                default,
                help,
                validator,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(|e| &e.value)
    }

    pub fn help(&self, key: &str) -> Option<&'static str> {
        self.entries.get(key).map(|e| e.help)
    }

    pub fn default_of(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(|e| &e.default)
    }

    /// Set a value, running its validator (if any) first.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        let entry = self
            .entries
            .get_mut(key)
            .ok_or_else(|| SettingsError::UnknownKey(key.to_string()))?;
        if let Some(validator) = entry.validator {
            validator(&value).map_err(|reason| SettingsError::Invalid {
                key: key.to_string(),
                reason,
            })?;
        }
        entry.value = value;
        Ok(())
    }

    /// Reset every setting to its registered default.
    pub fn reset_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.value = entry.default.clone();
        }
    }

    fn snapshot(&self) -> BTreeMap<&'static str, Value> {
        self.entries
            .iter()
            .map(|(k, e)| (*k, e.value.clone()))
            .collect()
    }

    /// Serialize every registered value plus a CRC-16/CCITT trailer
    /// and write it to `writer`.
    pub fn save<W: Write>(&self, mut writer: W) -> Result<(), SettingsError> {
        let snapshot = self.snapshot();
        let body = toml::to_string(&snapshot).map_err(|e| SettingsError::Decode(e.to_string()))?;
        let crc = crc16::State::<crc16::CCITT_FALSE>::calculate(body.as_bytes());
        writer
            .write_all(&crc.to_le_bytes())
            .map_err(|e| SettingsError::Io(e.to_string()))?;
        writer
            .write_all(body.as_bytes())
            .map_err(|e| SettingsError::Io(e.to_string()))?;
        Ok(())
    }

    /// Read back a table saved by [`Self::save`], validating the CRC
    /// and applying each value through its validator before committing
    /// any of them (an all-or-nothing load).
    pub fn load<R: Read>(&mut self, mut reader: R) -> Result<(), SettingsError> {
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .map_err(|e| SettingsError::Io(e.to_string()))?;
        if buf.len() < 2 {
            return Err(SettingsError::Decode("truncated settings blob".into()));
        }
        let stored_crc = u16::from_le_bytes([buf[0], buf[1]]);
        let body = &buf[2..];
        let computed_crc = crc16::State::<crc16::CCITT_FALSE>::calculate(body);
        if stored_crc != computed_crc {
            return Err(SettingsError::CrcMismatch {
                stored: stored_crc,
                computed: computed_crc,
            });
        }
        let body_str =
            std::str::from_utf8(body).map_err(|e| SettingsError::Decode(e.to_string()))?;
        let loaded: BTreeMap<String, Value> =
            toml::from_str(body_str).map_err(|e| SettingsError::Decode(e.to_string()))?;

        // Validate everything before mutating the live table.
        for (key, value) in &loaded {
            let entry = self
                .entries
                .get(key.as_str())
                .ok_or_else(|| SettingsError::UnknownKey(key.clone()))?;
            if let Some(validator) = entry.validator {
                validator(value).map_err(|reason| SettingsError::Invalid {
                    key: key.clone(),
                    reason,
                })?;
            }
        }
        for (key, value) in loaded {
            if let Some(entry) = self.entries.get_mut(key.as_str()) {
                entry.value = value;
            }
        }
        Ok(())
    }
}

impl Default for SettingsTable {
    fn default() -> Self {
        Self::new()
    }
}
