//! Seams to the collaborators outside the worker: the document model that
//! owns the object list and the renderer that shows the meshes.

use std::collections::BTreeMap;

use cad_types::ObjectSpec;

use crate::messages::{DisplayEntry, DocumentContent};

pub trait DocumentSource {
    /// Every object in the document, in document order.
    fn all_objects(&self) -> Vec<ObjectSpec>;

    /// The LOAD_FILE content for the current snapshot.
    fn content(&self) -> DocumentContent {
        DocumentContent {
            objects: self.all_objects(),
            ..DocumentContent::default()
        }
    }
}

impl DocumentSource for DocumentContent {
    fn all_objects(&self) -> Vec<ObjectSpec> {
        self.objects.clone()
    }

    fn content(&self) -> DocumentContent {
        self.clone()
    }
}

impl DocumentSource for Vec<ObjectSpec> {
    fn all_objects(&self) -> Vec<ObjectSpec> {
        self.clone()
    }
}

pub trait DisplaySink {
    /// Receives the meshes of one pass and the objects to hide.
    fn display(&mut self, payload: &BTreeMap<String, DisplayEntry>, hidden: &[String]);
}

/// Keeps the latest pass in memory.
#[derive(Debug, Clone, Default)]
pub struct RetainedDisplay {
    pub shapes: BTreeMap<String, DisplayEntry>,
    pub hidden: Vec<String>,
    pub passes: usize,
}

impl DisplaySink for RetainedDisplay {
    fn display(&mut self, payload: &BTreeMap<String, DisplayEntry>, hidden: &[String]) {
        self.shapes = payload.clone();
        self.hidden = hidden.to_vec();
        self.passes += 1;
    }
}
