use std::collections::BTreeMap;

use cad_types::{MassProps, ObjectSpec};
use serde::{Deserialize, Serialize};
use shape_tessellation::{EdgePolyline, FaceMesh, TessellatedShape};

use crate::worker_state::WorkerError;

/// Requests from a consumer to the worker.
/// Serialized as JSON with the action name in `action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerRequest {
    /// Announces a consumer. Answered with INITIALIZED once the kernel is up.
    Register { id: u64, payload: RegisterPayload },

    /// Evaluates and tessellates a full object list.
    LoadFile { id: u64, payload: LoadFilePayload },

    /// Reserved.
    SaveFile {
        id: u64,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

impl WorkerRequest {
    /// Correlation id echoed by the reply.
    pub fn id(&self) -> u64 {
        match self {
            WorkerRequest::Register { id, .. }
            | WorkerRequest::LoadFile { id, .. }
            | WorkerRequest::SaveFile { id, .. } => *id,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            WorkerRequest::Register { .. } => "REGISTER",
            WorkerRequest::LoadFile { .. } => "LOAD_FILE",
            WorkerRequest::SaveFile { .. } => "SAVE_FILE",
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, WorkerError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterPayload {
    /// Consumer name, for logs.
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadFilePayload {
    pub content: DocumentContent,
}

/// A document snapshot as sent by the document layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentContent {
    pub objects: Vec<ObjectSpec>,
    #[serde(default)]
    pub options: LoadOptions,
}

/// Per-request tessellation overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linear_deflection: Option<f64>,
    /// Degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angular_deflection: Option<f64>,
}

/// Replies from the worker, one per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerReply {
    Initialized {
        id: u64,
    },

    /// Meshes keyed by object name, plus the objects consumed by booleans.
    DisplayShape {
        id: u64,
        payload: BTreeMap<String, DisplayEntry>,
        hidden: Vec<String>,
    },

    Error {
        id: u64,
        payload: ErrorPayload,
    },
}

impl WorkerReply {
    pub fn id(&self) -> u64 {
        match self {
            WorkerReply::Initialized { id }
            | WorkerReply::DisplayShape { id, .. }
            | WorkerReply::Error { id, .. } => *id,
        }
    }

    pub fn error(id: u64, err: &WorkerError) -> Self {
        WorkerReply::Error {
            id,
            payload: ErrorPayload {
                message: err.to_string(),
                fatal: err.is_fatal(),
            },
        }
    }

    pub fn to_json(&self) -> Result<String, WorkerError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    /// The worker cannot serve any further request.
    pub fatal: bool,
}

/// One displayable object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayEntry {
    pub source_object: String,
    pub face_list: Vec<FaceMesh>,
    pub edge_list: Vec<EdgePolyline>,
    pub meta: MassProps,
}

impl From<TessellatedShape> for DisplayEntry {
    fn from(shape: TessellatedShape) -> Self {
        Self {
            source_object: shape.source_name,
            face_list: shape.faces,
            edge_list: shape.edges,
            meta: shape.metadata,
        }
    }
}
