use eval_engine::{ImportFailurePolicy, LruEviction, ShapeCache};
use serde::{Deserialize, Serialize};
use shape_tessellation::TessellationConfig;

/// How the worker's shape cache is bounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionConfig {
    #[default]
    Unbounded,
    Lru {
        capacity: usize,
    },
}

/// Worker configuration. Every field has a default, so a partial JSON
/// file is enough.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub tessellation: TessellationConfig,
    pub eviction: EvictionConfig,
    pub import_failure: ImportFailurePolicy,
}

impl WorkerConfig {
    /// Coarse meshes and a bounded cache, for interactive previews.
    pub fn preview() -> Self {
        Self {
            tessellation: TessellationConfig::coarse(),
            eviction: EvictionConfig::Lru { capacity: 256 },
            import_failure: ImportFailurePolicy::SkipObject,
        }
    }

    pub fn build_cache(&self) -> ShapeCache {
        match self.eviction {
            EvictionConfig::Unbounded => ShapeCache::new(),
            EvictionConfig::Lru { capacity } => {
                ShapeCache::with_policy(Box::new(LruEviction::new(capacity)))
            }
        }
    }
}
