use std::fmt;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::expand::ExpandedTree;
use crate::types::EvalError;

/// Content address of an expanded construction tree.
///
/// xxh3-64 of the tree's JSON form. Not collision resistant; fine for a
/// process-local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(pub u64);

impl CacheKey {
    pub fn of(tree: &ExpandedTree) -> Result<Self, EvalError> {
        let bytes = serde_json::to_vec(tree)?;
        Ok(CacheKey(xxh3_64(&bytes)))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
