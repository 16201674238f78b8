use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::placement::Placement;
use crate::sketch::SketchGeometry;

/// A named object in the document. Names are the only cross-object
/// reference mechanism.
///
/// On the wire the kind is a plain string next to an untyped parameter
/// bag, so deserialization goes through [`RawObjectSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawObjectSpec", into = "RawObjectSpec")]
pub struct ObjectSpec {
    pub name: String,
    pub kind: ObjectKind,
    pub visible: bool,
    pub placement: Option<Placement>,
}

impl ObjectSpec {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            visible: true,
            placement: None,
        }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = Some(placement);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// The closed set of object kinds with their parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Box(BoxParams),
    Cylinder(CylinderParams),
    Sphere(SphereParams),
    Cone(ConeParams),
    Torus(TorusParams),
    Cut(CutParams),
    MultiFuse(MultiShapeParams),
    MultiCommon(MultiShapeParams),
    Extrusion(ExtrusionParams),
    SketchObject(SketchParams),
    RawBrep(RawBrepParams),
    /// Untyped object whose only usable content is an embedded B-rep.
    Any(RawBrepParams),
}

impl ObjectKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ObjectKind::Box(_) => "Box",
            ObjectKind::Cylinder(_) => "Cylinder",
            ObjectKind::Sphere(_) => "Sphere",
            ObjectKind::Cone(_) => "Cone",
            ObjectKind::Torus(_) => "Torus",
            ObjectKind::Cut(_) => "Cut",
            ObjectKind::MultiFuse(_) => "MultiFuse",
            ObjectKind::MultiCommon(_) => "MultiCommon",
            ObjectKind::Extrusion(_) => "Extrusion",
            ObjectKind::SketchObject(_) => "SketchObject",
            ObjectKind::RawBrep(_) => "RawBrep",
            ObjectKind::Any(_) => "Any",
        }
    }

    /// Names of other objects this kind reads, in declaration order.
    pub fn references(&self) -> Vec<&str> {
        match self {
            ObjectKind::Cut(p) => p.base.iter().chain(p.tool.iter()).map(String::as_str).collect(),
            ObjectKind::MultiFuse(p) | ObjectKind::MultiCommon(p) => {
                p.shapes.iter().map(String::as_str).collect()
            }
            ObjectKind::Extrusion(p) => p.base.iter().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(
            self,
            ObjectKind::Cut(_) | ObjectKind::MultiFuse(_) | ObjectKind::MultiCommon(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BoxParams {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for BoxParams {
    fn default() -> Self {
        Self {
            length: 10.0,
            width: 10.0,
            height: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CylinderParams {
    pub radius: f64,
    pub height: f64,
    pub angle: f64,
}

impl Default for CylinderParams {
    fn default() -> Self {
        Self {
            radius: 2.0,
            height: 10.0,
            angle: 360.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ConeParams {
    pub radius1: f64,
    pub radius2: f64,
    pub height: f64,
    pub angle: f64,
}

impl Default for ConeParams {
    fn default() -> Self {
        Self {
            radius1: 2.0,
            radius2: 4.0,
            height: 10.0,
            angle: 360.0,
        }
    }
}

/// Angle1/Angle2 bound the latitude, Angle3 is the longitudinal sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SphereParams {
    pub radius: f64,
    pub angle1: f64,
    pub angle2: f64,
    pub angle3: f64,
}

impl Default for SphereParams {
    fn default() -> Self {
        Self {
            radius: 5.0,
            angle1: -90.0,
            angle2: 90.0,
            angle3: 360.0,
        }
    }
}

/// Angle1/Angle2 bound the tube cross-section, Angle3 is the sweep
/// around the main axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TorusParams {
    pub radius1: f64,
    pub radius2: f64,
    pub angle1: f64,
    pub angle2: f64,
    pub angle3: f64,
}

impl Default for TorusParams {
    fn default() -> Self {
        Self {
            radius1: 10.0,
            radius2: 2.0,
            angle1: -180.0,
            angle2: 180.0,
            angle3: 360.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CutParams {
    pub base: Option<String>,
    pub tool: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MultiShapeParams {
    pub shapes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ExtrusionParams {
    pub base: Option<String>,
    pub dir: [f64; 3],
    pub length_fwd: f64,
    pub length_rev: f64,
    pub solid: bool,
}

impl Default for ExtrusionParams {
    fn default() -> Self {
        Self {
            base: None,
            dir: [0.0, 0.0, 1.0],
            length_fwd: 10.0,
            length_rev: 0.0,
            solid: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SketchParams {
    pub geometry: Vec<SketchGeometry>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawBrepParams {
    pub shape: RawBrepData,
}

/// Serialized B-rep bytes. Carried as base64 text in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawBrepData(pub Vec<u8>);

impl RawBrepData {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for RawBrepData {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for RawBrepData {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD
            .decode(text.as_bytes())
            .map(RawBrepData)
            .map_err(serde::de::Error::custom)
    }
}

/// Errors raised while decoding an object from its wire form.
#[derive(Debug, thiserror::Error)]
pub enum ObjectSpecError {
    #[error("object '{name}' has invalid {kind} parameters: {source}")]
    InvalidParameters {
        name: String,
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Wire form of [`ObjectSpec`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawObjectSpec {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
}

fn default_visible() -> bool {
    true
}

fn decode<T: serde::de::DeserializeOwned>(
    name: &str,
    kind: &str,
    parameters: Value,
) -> Result<T, ObjectSpecError> {
    // A missing parameter bag means "all defaults".
    let parameters = match parameters {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(parameters).map_err(|source| ObjectSpecError::InvalidParameters {
        name: name.to_string(),
        kind: kind.to_string(),
        source,
    })
}

impl TryFrom<RawObjectSpec> for ObjectSpec {
    type Error = ObjectSpecError;

    fn try_from(raw: RawObjectSpec) -> Result<Self, Self::Error> {
        let RawObjectSpec {
            name,
            kind,
            parameters,
            visible,
            placement,
        } = raw;
        let n = name.as_str();
        let k = kind.as_str();
        let kind = match k {
            "Box" => ObjectKind::Box(decode(n, k, parameters)?),
            "Cylinder" => ObjectKind::Cylinder(decode(n, k, parameters)?),
            "Sphere" => ObjectKind::Sphere(decode(n, k, parameters)?),
            "Cone" => ObjectKind::Cone(decode(n, k, parameters)?),
            "Torus" => ObjectKind::Torus(decode(n, k, parameters)?),
            "Cut" => ObjectKind::Cut(decode(n, k, parameters)?),
            "MultiFuse" => ObjectKind::MultiFuse(decode(n, k, parameters)?),
            "MultiCommon" => ObjectKind::MultiCommon(decode(n, k, parameters)?),
            "Extrusion" => ObjectKind::Extrusion(decode(n, k, parameters)?),
            "SketchObject" => ObjectKind::SketchObject(decode(n, k, parameters)?),
            "RawBrep" => ObjectKind::RawBrep(decode(n, k, parameters)?),
            // Any other kind is a shape carried as a B-rep payload.
            _ => ObjectKind::Any(decode(n, k, parameters)?),
        };
        Ok(ObjectSpec {
            name,
            kind,
            visible,
            placement,
        })
    }
}

impl From<ObjectSpec> for RawObjectSpec {
    fn from(spec: ObjectSpec) -> Self {
        let kind = spec.kind.type_name().to_string();
        // Plain parameter structs always serialize.
        let parameters = match &spec.kind {
            ObjectKind::Box(p) => serde_json::to_value(p),
            ObjectKind::Cylinder(p) => serde_json::to_value(p),
            ObjectKind::Sphere(p) => serde_json::to_value(p),
            ObjectKind::Cone(p) => serde_json::to_value(p),
            ObjectKind::Torus(p) => serde_json::to_value(p),
            ObjectKind::Cut(p) => serde_json::to_value(p),
            ObjectKind::MultiFuse(p) | ObjectKind::MultiCommon(p) => serde_json::to_value(p),
            ObjectKind::Extrusion(p) => serde_json::to_value(p),
            ObjectKind::SketchObject(p) => serde_json::to_value(p),
            ObjectKind::RawBrep(p) | ObjectKind::Any(p) => serde_json::to_value(p),
        }
        .unwrap_or_default();
        RawObjectSpec {
            name: spec.name,
            kind,
            parameters,
            visible: spec.visible,
            placement: spec.placement,
        }
    }
}
