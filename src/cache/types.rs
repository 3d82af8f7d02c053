//! Core data types for engine caching.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Shared handle to a cached engine.
///
/// Two handles for the same cache entry are `Arc::ptr_eq`.
pub type EngineHandle<E> = Arc<Mutex<E>>;

/// Compute device an engine is built for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Device {
    #[default]
    Cpu,
    /// Any accelerator identifier understood by the engine runtime (`"cuda"`, `"cuda:1"`, `"mps"`).
    Accelerator(String),
}

impl Device {
    pub fn is_cpu(&self) -> bool {
        matches!(self, Device::Cpu)
    }
}

impl From<&str> for Device {
    fn from(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("cpu") {
            Device::Cpu
        } else {
            Device::Accelerator(trimmed.to_string())
        }
    }
}

impl From<String> for Device {
    fn from(value: String) -> Self {
        Device::from(value.as_str())
    }
}

impl From<Device> for String {
    fn from(value: Device) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Accelerator(id) => f.write_str(id),
        }
    }
}

/// Numeric precision hint for engine construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Full,
    #[default]
    Half,
}

/// How a weight-file pair is turned into a cache key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    /// `basename(t2s)#basename(acoustic)`. Files may move between directories
    /// without invalidating the cache; same-named files in different
    /// directories share one entry.
    #[default]
    FileName,
    /// Canonicalized full paths. Falls back to the path as given when it
    /// cannot be resolved.
    CanonicalPath,
}

/// Cache key for a pair of weight files. Order-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(mode: KeyMode, t2s_weights: &Path, acoustic_weights: &Path) -> Self {
        let part = |path: &Path| match mode {
            KeyMode::FileName => file_label(path),
            KeyMode::CanonicalPath => std::fs::canonicalize(path)
                .unwrap_or_else(|_| path.to_path_buf())
                .to_string_lossy()
                .into_owned(),
        };
        Self(format!("{}#{}", part(t2s_weights), part(acoustic_weights)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File name of `path`, or the whole path when it has none (e.g. `..`).
pub(crate) fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// A resident engine with its bookkeeping.
pub(crate) struct CachedEngine<E> {
    pub engine: EngineHandle<E>,
    pub t2s_weights: PathBuf,
    pub acoustic_weights: PathBuf,
    /// Device the engine was built on; unaffected by later `set_device` calls.
    pub device: Device,
    /// Logical clock value of the last access. Strictly increasing across the
    /// cache, so the LRU victim is unique.
    pub last_used: u64,
    pub last_used_at: Instant,
    pub created_at: Instant,
    pub hits: u64,
}

impl<E> CachedEngine<E> {
    pub fn touch(&mut self, tick: u64) {
        self.last_used = tick;
        self.last_used_at = Instant::now();
        self.hits += 1;
    }

    pub fn summary(&self, key: &CacheKey) -> EntrySummary {
        EntrySummary {
            key: key.to_string(),
            t2s_weights: file_label(&self.t2s_weights),
            acoustic_weights: file_label(&self.acoustic_weights),
            device: self.device.to_string(),
            hits: self.hits,
            idle_secs: self.last_used_at.elapsed().as_secs_f64(),
            age_secs: self.created_at.elapsed().as_secs_f64(),
        }
    }
}

/// Per-entry line of [`CacheStats`].
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub key: String,
    pub t2s_weights: String,
    pub acoustic_weights: String,
    pub device: String,
    /// Hits served by this entry since it was loaded.
    pub hits: u64,
    /// Seconds since last access.
    pub idle_secs: f64,
    /// Seconds since the engine was loaded.
    pub age_secs: f64,
}

/// Cache statistics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Number of resident engines.
    pub count: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, or 0 before the first lookup.
    pub hit_rate: f64,
    /// Resident entries, most recently used first.
    pub entries: Vec<EntrySummary>,
}

pub(crate) fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}
