pub mod cache;
pub mod evaluate;
pub mod expand;
pub mod factory;
pub mod hash;
pub mod index;
pub mod ops;
pub mod types;

pub use cache::{CacheEntry, CacheStats, EvictionPolicy, LruEviction, ShapeCache, Unbounded};
pub use evaluate::{EvaluatedShape, EvaluationOutcome, Evaluator, ImportFailurePolicy};
pub use expand::{expand, expand_resolved, ExpandedKind, ExpandedTree};
pub use factory::ShapeFactory;
pub use hash::CacheKey;
pub use index::ObjectIndex;
pub use types::EvalError;
