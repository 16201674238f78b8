use std::collections::HashMap;

use cad_types::ObjectSpec;
use tracing::warn;

/// Name lookup over one snapshot of the object list, built once per pass.
///
/// When two objects share a name the first one in document order wins.
#[derive(Debug)]
pub struct ObjectIndex<'a> {
    by_name: HashMap<&'a str, &'a ObjectSpec>,
    order: Vec<&'a ObjectSpec>,
}

impl<'a> ObjectIndex<'a> {
    pub fn build(objects: &'a [ObjectSpec]) -> Self {
        let mut by_name = HashMap::with_capacity(objects.len());
        let mut order = Vec::with_capacity(objects.len());
        for spec in objects {
            if by_name.contains_key(spec.name.as_str()) {
                warn!(name = %spec.name, "duplicate object name, keeping the first");
                continue;
            }
            by_name.insert(spec.name.as_str(), spec);
            order.push(spec);
        }
        Self { by_name, order }
    }

    pub fn get(&self, name: &str) -> Option<&'a ObjectSpec> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Objects in document order, duplicates removed.
    pub fn iter(&self) -> impl Iterator<Item = &'a ObjectSpec> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
