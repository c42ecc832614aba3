//! Shared fixtures for slice tests

use arbor::prelude::*;
use std::sync::Arc;

/// Install a test-friendly subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub fn key(s: &str) -> StoreKey {
    StoreKey::new(s).unwrap()
}

/// A freshly created and opened slice plus a castime source
pub struct TestSlice {
    pub slice: Slice,
    pub castimes: CasGenerator,
}

impl TestSlice {
    pub fn new() -> Self {
        Self::build(CacheConfig::default(), KeyRange::universe(), SliceOptions::default())
    }

    /// Smallest blocks, so a few hundred keys give a multi-level tree
    pub fn small_blocks() -> Self {
        Self::build(CacheConfig::small_blocks(), KeyRange::universe(), SliceOptions::default())
    }

    pub fn with_options(options: SliceOptions) -> Self {
        Self::build(CacheConfig::small_blocks(), KeyRange::universe(), options)
    }

    pub fn build(config: CacheConfig, range: KeyRange, options: SliceOptions) -> Self {
        init_tracing();
        let cache = Arc::new(Cache::new(config).unwrap());
        Slice::create(&cache, &range).unwrap();
        TestSlice {
            slice: Slice::open_with_options(cache, options).unwrap(),
            castimes: CasGenerator::default(),
        }
    }

    pub fn apply(&self, mutation: Mutation) -> MutationResult {
        self.slice
            .change(&mutation, self.castimes.next_castime(), OrderToken::ignore())
            .unwrap()
    }

    pub fn set(&self, k: &str, data: &str) -> MutationResult {
        self.apply(Mutation::set(key(k), data))
    }

    pub fn get(&self, k: &str) -> Option<StoredValue> {
        self.slice.get(&key(k), OrderToken::ignore()).unwrap()
    }

    pub fn data(&self, k: &str) -> Option<String> {
        self.get(k)
            .map(|v| String::from_utf8(v.data).unwrap())
    }
}
