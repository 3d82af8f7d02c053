//! ModelCache implementation with lazy loading and LRU eviction.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use super::config::CacheConfig;
use super::types::{
    file_label, hit_rate, CacheKey, CacheStats, CachedEngine, Device, EngineHandle,
};
use crate::error::{AudiobookError, ModelLoadError};
use crate::{EngineLoader, LoadRequest};

struct CacheState<E> {
    entries: HashMap<CacheKey, CachedEngine<E>>,
    device: Device,
    clock: u64,
    hits: u64,
    misses: u64,
}

impl<E> CacheState<E> {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Bounded cache of synthesis engines.
///
/// Engines are loaded on first request and evicted least-recently-used first
/// once `max_models` are resident. Every mutation (lookup, eviction, load,
/// insert) happens under one lock held for the whole miss path, so concurrent
/// callers never load the same pair twice.
pub struct ModelCache<L: EngineLoader> {
    loader: L,
    config: CacheConfig,
    state: Mutex<CacheState<L::Engine>>,
}

impl<L: EngineLoader> ModelCache<L> {
    /// Create an empty cache.
    ///
    /// `config.device` may be `"auto"`, resolved through the loader's preferred
    /// accelerator.
    pub fn new(loader: L, config: CacheConfig) -> Result<Self, AudiobookError> {
        config.validate()?;
        let device = resolve_device(&loader, &config.device);
        log::info!(
            "Engine cache ready: capacity={}, device={}, key_mode={:?}",
            config.max_models,
            device,
            config.key_mode
        );

        Ok(Self {
            loader,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                device,
                clock: 0,
                hits: 0,
                misses: 0,
            }),
            config,
        })
    }

    /// Get the engine for a weight-file pair, loading it on a miss.
    ///
    /// A hit only refreshes recency; the weight files are not re-validated.
    /// On a miss the weight files must exist, then the least-recently-used
    /// entry is evicted if the cache is full, then the engine is built.
    pub fn get_model(
        &self,
        t2s_weights: &Path,
        acoustic_weights: &Path,
    ) -> Result<EngineHandle<L::Engine>, ModelLoadError> {
        let mut state = self.lock();
        self.get_or_load(&mut state, t2s_weights, acoustic_weights)
    }

    fn get_or_load(
        &self,
        state: &mut CacheState<L::Engine>,
        t2s_weights: &Path,
        acoustic_weights: &Path,
    ) -> Result<EngineHandle<L::Engine>, ModelLoadError> {
        let key = self.key(t2s_weights, acoustic_weights);

        let tick = state.tick();
        if let Some(entry) = state.entries.get_mut(&key) {
            entry.touch(tick);
            let engine = Arc::clone(&entry.engine);
            state.hits += 1;
            log::debug!("Engine cache hit: {key}");
            return Ok(engine);
        }

        state.misses += 1;
        log::info!("Engine cache miss: {key}");

        for path in [t2s_weights, acoustic_weights] {
            if !path.exists() {
                log::error!("Weight file not found: {}", path.display());
                return Err(ModelLoadError::MissingWeights(path.to_path_buf()));
            }
        }

        if state.entries.len() >= self.config.max_models {
            Self::evict_lru(state);
        }

        let device = state.device.clone();
        log::info!(
            "Loading engine: t2s={}, acoustic={}, device={device}",
            file_label(t2s_weights),
            file_label(acoustic_weights)
        );
        let start = Instant::now();
        let engine = self
            .loader
            .build(&LoadRequest {
                t2s_weights,
                acoustic_weights,
                device: &device,
                precision: self.config.precision,
            })
            .map_err(|source| {
                log::error!("Failed to load engine {key}: {source}");
                ModelLoadError::Build {
                    key: key.to_string(),
                    source,
                }
            })?;
        log::info!("Engine loaded in {:.2?}", start.elapsed());

        let handle = Arc::new(Mutex::new(engine));
        let now = Instant::now();
        state.entries.insert(
            key,
            CachedEngine {
                engine: Arc::clone(&handle),
                t2s_weights: t2s_weights.to_path_buf(),
                acoustic_weights: acoustic_weights.to_path_buf(),
                device,
                last_used: tick,
                last_used_at: now,
                created_at: now,
                hits: 0,
            },
        );

        Ok(handle)
    }

    /// Remove the entry with the oldest access tick.
    fn evict_lru(state: &mut CacheState<L::Engine>) {
        let lru_key = state
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());

        if let Some(key) = lru_key {
            if let Some(entry) = state.entries.remove(&key) {
                log::info!(
                    "Cache full, evicting least recently used engine {key} ({}, {})",
                    entry.t2s_weights.display(),
                    entry.acoustic_weights.display()
                );
                release(entry);
            }
        }
    }

    /// Change the device used for future loads. Resident engines stay where they are.
    ///
    /// `"auto"` picks the loader's preferred accelerator, falling back to CPU.
    pub fn set_device(&self, device: &str) {
        let resolved = resolve_device(&self.loader, device);
        log::info!("Engine cache device set to {resolved}");
        self.lock().device = resolved;
    }

    pub fn device(&self) -> Device {
        self.lock().device.clone()
    }

    /// Drop every resident engine. Hit and miss counters are kept.
    pub fn clear(&self) {
        let mut state = self.lock();
        let cleared = state.entries.len();
        for (_, entry) in state.entries.drain() {
            release(entry);
        }
        log::info!("Cleared {cleared} engines from cache");
    }

    /// Drop the engine for one weight-file pair.
    ///
    /// Returns `true` if an entry was removed.
    pub fn evict(&self, t2s_weights: &Path, acoustic_weights: &Path) -> bool {
        let key = self.key(t2s_weights, acoustic_weights);
        match self.lock().entries.remove(&key) {
            Some(entry) => {
                log::info!("Evicted engine {key}");
                release(entry);
                true
            }
            None => false,
        }
    }

    /// Whether the pair is resident. Does not count as a lookup.
    pub fn contains(&self, t2s_weights: &Path, acoustic_weights: &Path) -> bool {
        let key = self.key(t2s_weights, acoustic_weights);
        self.lock().entries.contains_key(&key)
    }

    /// Warm the cache with the given pairs.
    ///
    /// Stops as soon as the cache is full, never evicts, and skips pairs that
    /// are already resident. Load failures are logged and skipped. Returns
    /// the number of engines loaded.
    pub fn preload<P: AsRef<Path>>(&self, pairs: &[(P, P)]) -> usize {
        log::info!("Preloading up to {} engines", pairs.len());
        let mut state = self.lock();
        let mut loaded = 0;

        for (t2s_weights, acoustic_weights) in pairs {
            if state.entries.len() >= self.config.max_models {
                log::warn!("Cache full, stopping preload");
                break;
            }

            let (t2s_weights, acoustic_weights) = (t2s_weights.as_ref(), acoustic_weights.as_ref());
            if state
                .entries
                .contains_key(&self.key(t2s_weights, acoustic_weights))
            {
                continue;
            }

            match self.get_or_load(&mut state, t2s_weights, acoustic_weights) {
                Ok(_) => loaded += 1,
                Err(e) => log::warn!("Preload skipped: {e}"),
            }
        }

        log::info!(
            "Preload finished, {} engines resident",
            state.entries.len()
        );
        loaded
    }

    /// Snapshot of counters and resident entries.
    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let mut resident: Vec<_> = state.entries.iter().collect();
        resident.sort_by(|a, b| b.1.last_used.cmp(&a.1.last_used));

        CacheStats {
            count: state.entries.len(),
            capacity: self.config.max_models,
            hits: state.hits,
            misses: state.misses,
            hit_rate: hit_rate(state.hits, state.misses),
            entries: resident
                .into_iter()
                .map(|(key, entry)| entry.summary(key))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.config.max_models
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Cache key for a pair under the configured key mode.
    pub fn key(&self, t2s_weights: &Path, acoustic_weights: &Path) -> CacheKey {
        CacheKey::new(self.config.key_mode, t2s_weights, acoustic_weights)
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<L::Engine>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn resolve_device<L: EngineLoader>(loader: &L, requested: &str) -> Device {
    if requested.trim().eq_ignore_ascii_case("auto") {
        loader.preferred_accelerator().unwrap_or(Device::Cpu)
    } else {
        Device::from(requested)
    }
}

/// Drop the cache's reference to an engine.
///
/// The engine itself is freed here unless a caller still holds a handle.
fn release<E>(entry: CachedEngine<E>) {
    let outstanding = Arc::strong_count(&entry.engine) - 1;
    if outstanding > 0 {
        log::debug!("Engine released by cache, {outstanding} handle(s) still held by callers");
    }
    drop(entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{KeyMode, Precision};
    use crate::{BoxError, SynthesisEngine, SynthesisParams, SynthesisResult};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct MockEngine {
        id: usize,
        device: Device,
        precision: Precision,
    }

    impl SynthesisEngine for MockEngine {
        fn synthesize(
            &mut self,
            _params: &SynthesisParams,
        ) -> Result<Box<dyn Iterator<Item = SynthesisResult> + '_>, BoxError> {
            Ok(Box::new(std::iter::empty()))
        }
    }

    #[derive(Default)]
    struct MockLoader {
        builds: AtomicUsize,
        fail: bool,
        accelerator: Option<Device>,
        build_time: Option<Duration>,
    }

    impl EngineLoader for MockLoader {
        type Engine = MockEngine;

        fn build(&self, request: &LoadRequest<'_>) -> Result<MockEngine, BoxError> {
            if self.fail {
                return Err("out of memory".into());
            }
            if let Some(build_time) = self.build_time {
                std::thread::sleep(build_time);
            }
            Ok(MockEngine {
                id: self.builds.fetch_add(1, Ordering::SeqCst),
                device: request.device.clone(),
                precision: request.precision,
            })
        }

        fn preferred_accelerator(&self) -> Option<Device> {
            self.accelerator.clone()
        }
    }

    fn weights(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"weights").unwrap();
        path
    }

    fn pair(dir: &TempDir, n: usize) -> (PathBuf, PathBuf) {
        (
            weights(dir, &format!("voice{n}-e15.ckpt")),
            weights(dir, &format!("voice{n}_e8_s200.pth")),
        )
    }

    fn cache(capacity: usize) -> ModelCache<MockLoader> {
        ModelCache::new(MockLoader::default(), CacheConfig::with_capacity(capacity)).unwrap()
    }

    #[test]
    fn repeated_request_is_one_miss_then_one_hit() {
        let dir = TempDir::new().unwrap();
        let (gpt, sovits) = pair(&dir, 1);
        let cache = cache(3);

        let first = cache.get_model(&gpt, &sovits).unwrap();
        let second = cache.get_model(&gpt, &sovits).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.count, 1);
        assert_eq!(cache.loader.builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cache_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ModelCache<MockLoader>>();
    }

    #[test]
    fn concurrent_requests_for_one_pair_build_once() {
        const THREADS: usize = 8;
        let dir = TempDir::new().unwrap();
        let (gpt, sovits) = pair(&dir, 1);
        let loader = MockLoader {
            build_time: Some(Duration::from_millis(20)),
            ..MockLoader::default()
        };
        let cache = Arc::new(ModelCache::new(loader, CacheConfig::default()).unwrap());

        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let (gpt, sovits) = (gpt.clone(), sovits.clone());
                std::thread::spawn(move || cache.get_model(&gpt, &sovits).unwrap())
            })
            .collect();
        let handles: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
        assert_eq!(cache.loader.builds.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (THREADS as u64 - 1, 1));
        assert_eq!(stats.count, 1);
    }

    #[test]
    fn hit_does_not_revalidate_weight_files() {
        let dir = TempDir::new().unwrap();
        let (gpt, sovits) = pair(&dir, 1);
        let cache = cache(3);

        cache.get_model(&gpt, &sovits).unwrap();
        std::fs::remove_file(&gpt).unwrap();

        assert!(cache.get_model(&gpt, &sovits).is_ok());
    }

    #[test]
    fn evicts_least_recently_used_when_full() {
        let dir = TempDir::new().unwrap();
        let (a, b, c) = (pair(&dir, 1), pair(&dir, 2), pair(&dir, 3));
        let cache = cache(2);

        let first_a = cache.get_model(&a.0, &a.1).unwrap();
        cache.get_model(&b.0, &b.1).unwrap();
        // refresh a so b becomes the oldest
        cache.get_model(&a.0, &a.1).unwrap();
        cache.get_model(&c.0, &c.1).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&a.0, &a.1));
        assert!(!cache.contains(&b.0, &b.1));
        assert!(cache.contains(&c.0, &c.1));

        let again_a = cache.get_model(&a.0, &a.1).unwrap();
        assert!(Arc::ptr_eq(&first_a, &again_a));
    }

    #[test]
    fn size_never_exceeds_capacity_and_victim_is_oldest() {
        let dir = TempDir::new().unwrap();
        let pairs: Vec<_> = (0..5).map(|n| pair(&dir, n)).collect();
        let cache = cache(3);
        let sequence = [0, 1, 2, 0, 3, 1, 4, 4, 2, 0, 3, 1];

        // Reference model: most recently used at the back.
        let mut recency: Vec<usize> = Vec::new();
        for &n in &sequence {
            let was_resident = recency.contains(&n);
            if !was_resident && recency.len() == 3 {
                let victim = recency.remove(0);
                cache.get_model(&pairs[n].0, &pairs[n].1).unwrap();
                assert!(!cache.contains(&pairs[victim].0, &pairs[victim].1));
            } else {
                cache.get_model(&pairs[n].0, &pairs[n].1).unwrap();
            }
            recency.retain(|&m| m != n);
            recency.push(n);

            assert!(cache.len() <= 3);
            for &m in &recency {
                assert!(cache.contains(&pairs[m].0, &pairs[m].1));
            }
        }
    }

    #[test]
    fn hit_rate_matches_counters() {
        let dir = TempDir::new().unwrap();
        let (a, b) = (pair(&dir, 1), pair(&dir, 2));
        let cache = cache(3);
        assert_eq!(cache.stats().hit_rate, 0.0);

        for p in [&a, &b, &a, &a, &b] {
            cache.get_model(&p.0, &p.1).unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hit_rate, stats.hits as f64 / (stats.hits + stats.misses) as f64);
    }

    #[test]
    fn stats_list_entries_most_recent_first() {
        let dir = TempDir::new().unwrap();
        let (a, b) = (pair(&dir, 1), pair(&dir, 2));
        let cache = cache(3);
        cache.get_model(&a.0, &a.1).unwrap();
        cache.get_model(&b.0, &b.1).unwrap();
        cache.get_model(&a.0, &a.1).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.capacity, 3);
        assert_eq!(stats.entries.len(), 2);
        assert_eq!(stats.entries[0].key, "voice1-e15.ckpt#voice1_e8_s200.pth");
        assert_eq!(stats.entries[0].hits, 1);
        assert_eq!(stats.entries[1].t2s_weights, "voice2-e15.ckpt");
        assert_eq!(stats.entries[1].device, "cpu");
    }

    #[test]
    fn missing_weight_file_fails_without_touching_entries() {
        let dir = TempDir::new().unwrap();
        let (a, b) = (pair(&dir, 1), pair(&dir, 2));
        let cache = cache(1);
        cache.get_model(&a.0, &a.1).unwrap();

        let missing = dir.path().join("missing.ckpt");
        let err = cache.get_model(&missing, &b.1).unwrap_err();

        assert!(matches!(err, ModelLoadError::MissingWeights(ref p) if *p == missing));
        assert!(cache.contains(&a.0, &a.1));
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn build_failure_inserts_nothing_and_cache_stays_usable() {
        let dir = TempDir::new().unwrap();
        let (gpt, sovits) = pair(&dir, 1);
        let failing = ModelCache::new(
            MockLoader {
                fail: true,
                ..MockLoader::default()
            },
            CacheConfig::default(),
        )
        .unwrap();

        let err = failing.get_model(&gpt, &sovits).unwrap_err();
        assert!(matches!(err, ModelLoadError::Build { ref key, .. } if key.contains("voice1")));
        assert!(failing.is_empty());
        assert_eq!(failing.stats().misses, 1);
    }

    #[test]
    fn device_change_only_affects_future_loads() {
        let dir = TempDir::new().unwrap();
        let (a, b) = (pair(&dir, 1), pair(&dir, 2));
        let cache = cache(3);

        let on_cpu = cache.get_model(&a.0, &a.1).unwrap();
        cache.set_device("cuda:0");
        let on_gpu = cache.get_model(&b.0, &b.1).unwrap();

        assert_eq!(on_cpu.lock().unwrap().device, Device::Cpu);
        assert_eq!(
            on_gpu.lock().unwrap().device,
            Device::Accelerator("cuda:0".to_string())
        );
        let again = cache.get_model(&a.0, &a.1).unwrap();
        assert_eq!(again.lock().unwrap().device, Device::Cpu);
    }

    #[test]
    fn auto_device_uses_preferred_accelerator() {
        let with_gpu = ModelCache::new(
            MockLoader {
                accelerator: Some(Device::from("cuda")),
                ..MockLoader::default()
            },
            CacheConfig::default(),
        )
        .unwrap();
        with_gpu.set_device("auto");
        assert_eq!(with_gpu.device(), Device::Accelerator("cuda".to_string()));

        let cpu_only = cache(1);
        cpu_only.set_device("auto");
        assert_eq!(cpu_only.device(), Device::Cpu);
    }

    #[test]
    fn precision_hint_is_forwarded() {
        let dir = TempDir::new().unwrap();
        let (gpt, sovits) = pair(&dir, 1);
        let config = CacheConfig {
            precision: Precision::Full,
            ..CacheConfig::default()
        };
        let cache = ModelCache::new(MockLoader::default(), config).unwrap();

        let engine = cache.get_model(&gpt, &sovits).unwrap();
        assert_eq!(engine.lock().unwrap().precision, Precision::Full);
    }

    #[test]
    fn clear_drops_entries_but_keeps_counters() {
        let dir = TempDir::new().unwrap();
        let (a, b) = (pair(&dir, 1), pair(&dir, 2));
        let cache = cache(3);
        cache.get_model(&a.0, &a.1).unwrap();
        cache.get_model(&b.0, &b.1).unwrap();
        cache.get_model(&b.0, &b.1).unwrap();

        cache.clear();

        let stats = cache.stats();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);

        let reloaded = cache.get_model(&a.0, &a.1).unwrap();
        assert_eq!(reloaded.lock().unwrap().id, 2);
    }

    #[test]
    fn evict_removes_single_pair() {
        let dir = TempDir::new().unwrap();
        let (a, b) = (pair(&dir, 1), pair(&dir, 2));
        let cache = cache(3);
        cache.get_model(&a.0, &a.1).unwrap();
        cache.get_model(&b.0, &b.1).unwrap();

        assert!(cache.evict(&a.0, &a.1));
        assert!(!cache.evict(&a.0, &a.1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn preload_stops_at_capacity_without_evicting() {
        let dir = TempDir::new().unwrap();
        let pairs: Vec<_> = (0..4).map(|n| pair(&dir, n)).collect();
        let cache = cache(2);
        cache.get_model(&pairs[0].0, &pairs[0].1).unwrap();

        let loaded = cache.preload(&pairs);

        assert_eq!(loaded, 1);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&pairs[0].0, &pairs[0].1));
        assert!(cache.contains(&pairs[1].0, &pairs[1].1));
        assert!(!cache.contains(&pairs[2].0, &pairs[2].1));
        // the resident pair was skipped, not counted as a hit
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn preload_skips_unloadable_pairs() {
        let dir = TempDir::new().unwrap();
        let good = pair(&dir, 1);
        let bad = (dir.path().join("gone.ckpt"), dir.path().join("gone.pth"));
        let cache = cache(3);

        let loaded = cache.preload(&[bad, good.clone()]);

        assert_eq!(loaded, 1);
        assert!(cache.contains(&good.0, &good.1));
    }

    #[test]
    fn same_file_names_in_different_directories_share_an_entry() {
        let dir_a = TempDir::new().unwrap();
        let dir_b = TempDir::new().unwrap();
        let in_a = (weights(&dir_a, "gpt.ckpt"), weights(&dir_a, "sovits.pth"));
        let in_b = (weights(&dir_b, "gpt.ckpt"), weights(&dir_b, "sovits.pth"));

        let lenient = cache(3);
        let first = lenient.get_model(&in_a.0, &in_a.1).unwrap();
        let second = lenient.get_model(&in_b.0, &in_b.1).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let strict = ModelCache::new(
            MockLoader::default(),
            CacheConfig {
                key_mode: KeyMode::CanonicalPath,
                ..CacheConfig::default()
            },
        )
        .unwrap();
        let first = strict.get_model(&in_a.0, &in_a.1).unwrap();
        let second = strict.get_model(&in_b.0, &in_b.1).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(strict.stats().misses, 2);
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(ModelCache::new(MockLoader::default(), CacheConfig::with_capacity(0)).is_err());
    }
}
