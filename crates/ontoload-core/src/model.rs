//! Graph data model: labels, properties, node and edge requests.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{IngestError, IngestResult};

/// Property key holding a node's business identifier.
pub const ID_KEY: &str = "id";

/// A raw input row: column name to cell text.
pub type Row = BTreeMap<String, String>;

/// Node or edge properties.
pub type Properties = BTreeMap<String, PropertyValue>;

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A validated node label.
///
/// Labels are spliced into statements (they cannot be bound as parameters),
/// so only plain identifiers are accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    pub fn new(raw: impl AsRef<str>) -> IngestResult<Self> {
        let raw = raw.as_ref().trim();
        if is_identifier(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(IngestError::InvalidLabel(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A relationship type, normalized to upper case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RelType(String);

impl RelType {
    pub fn new(raw: impl AsRef<str>) -> IngestResult<Self> {
        let normalized = raw.as_ref().trim().to_uppercase();
        if is_identifier(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(IngestError::InvalidLabel(raw.as_ref().to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scalar property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl PropertyValue {
    /// Identifier form of the value; ids are always compared as strings.
    pub fn to_id_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Str(s) => s.clone(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Request to materialize one node.
///
/// The `id` property is always stored in its string form so that lookups by
/// `(label, id)` agree regardless of how the source typed the value.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRequest {
    pub label: Label,
    pub properties: Properties,
}

impl NodeRequest {
    pub fn new(label: Label, mut properties: Properties) -> IngestResult<Self> {
        let id = match properties.get(ID_KEY) {
            Some(value) if !value.is_null() => value.to_id_string(),
            _ => return Err(IngestError::MissingField(ID_KEY.to_string())),
        };
        if id.is_empty() {
            return Err(IngestError::MissingField(ID_KEY.to_string()));
        }
        if let Some(key) = properties.keys().find(|k| k.is_empty()) {
            return Err(IngestError::InvalidProperty(key.clone()));
        }
        properties.insert(ID_KEY.to_string(), PropertyValue::Str(id));
        Ok(Self { label, properties })
    }

    /// Build from a raw row, keeping every cell as a string property.
    pub fn from_row(label: Label, row: &Row) -> IngestResult<Self> {
        let properties = row
            .iter()
            .map(|(k, v)| (k.trim().to_string(), PropertyValue::Str(v.clone())))
            .collect();
        Self::new(label, properties)
    }

    pub fn id(&self) -> String {
        self.properties
            .get(ID_KEY)
            .map(PropertyValue::to_id_string)
            .unwrap_or_default()
    }
}

/// Declared characteristic of a relationship instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Characteristic {
    Functional,
    InverseFunctional,
    Transitive,
    Symmetric,
    Asymmetric,
    Reflexive,
    Irreflexive,
}

impl Characteristic {
    pub const ALL: [Characteristic; 7] = [
        Characteristic::Functional,
        Characteristic::InverseFunctional,
        Characteristic::Transitive,
        Characteristic::Symmetric,
        Characteristic::Asymmetric,
        Characteristic::Reflexive,
        Characteristic::Irreflexive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Functional => "FUNCTIONAL",
            Self::InverseFunctional => "INVERSE_FUNCTIONAL",
            Self::Transitive => "TRANSITIVE",
            Self::Symmetric => "SYMMETRIC",
            Self::Asymmetric => "ASYMMETRIC",
            Self::Reflexive => "REFLEXIVE",
            Self::Irreflexive => "IRREFLEXIVE",
        }
    }

    /// Parse from a column-name fragment (case-insensitive, `-`/space tolerant).
    pub fn from_name(s: &str) -> Option<Self> {
        let normalized = s.trim().to_uppercase().replace(['-', ' '], "_");
        Self::ALL.into_iter().find(|c| c.as_str() == normalized)
    }

    /// Only FUNCTIONAL and INVERSE_FUNCTIONAL are checked before writing;
    /// the rest are recorded on the request and not acted upon.
    pub fn is_enforced(&self) -> bool {
        matches!(self, Self::Functional | Self::InverseFunctional)
    }

    fn bit(&self) -> u8 {
        1 << (*self as u8)
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of characteristics declared on one relationship instance.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Characteristics(u8);

impl Characteristics {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, c: Characteristic) {
        self.0 |= c.bit();
    }

    pub fn with(mut self, c: Characteristic) -> Self {
        self.insert(c);
        self
    }

    pub fn contains(&self, c: Characteristic) -> bool {
        self.0 & c.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Characteristic> + '_ {
        Characteristic::ALL.into_iter().filter(|c| self.contains(*c))
    }

    /// Declared characteristics that are recorded but never checked.
    pub fn unenforced(&self) -> impl Iterator<Item = Characteristic> + '_ {
        self.iter().filter(|c| !c.is_enforced())
    }
}

impl fmt::Debug for Characteristics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Characteristic> for Characteristics {
    fn from_iter<I: IntoIterator<Item = Characteristic>>(iter: I) -> Self {
        let mut set = Self::empty();
        for c in iter {
            set.insert(c);
        }
        set
    }
}

impl Serialize for Characteristics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(|c| c.as_str()))
    }
}

/// Request to relate two existing nodes with a directed, typed edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeRequest {
    pub rel: RelType,
    pub subject_id: String,
    pub object_id: String,
    pub characteristics: Characteristics,
}

impl EdgeRequest {
    pub fn new(rel: RelType, subject_id: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            rel,
            subject_id: subject_id.into(),
            object_id: object_id.into(),
            characteristics: Characteristics::empty(),
        }
    }

    pub fn with(mut self, c: Characteristic) -> Self {
        self.characteristics.insert(c);
        self
    }

    pub fn is_functional(&self) -> bool {
        self.characteristics.contains(Characteristic::Functional)
    }

    pub fn is_inverse_functional(&self) -> bool {
        self.characteristics.contains(Characteristic::InverseFunctional)
    }
}

/// One unit of write work: a node, or an edge with its endpoint labels.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRequest {
    Entity(NodeRequest),
    Relationship {
        edge: EdgeRequest,
        subject_label: Label,
        object_label: Label,
    },
}

impl WriteRequest {
    pub fn relationship(edge: EdgeRequest, subject_label: Label, object_label: Label) -> Self {
        Self::Relationship {
            edge,
            subject_label,
            object_label,
        }
    }

    /// Short human-readable description for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Entity(node) => format!("({}:{})", node.label, node.id()),
            Self::Relationship {
                edge,
                subject_label,
                object_label,
            } => format!(
                "({}:{})-[:{}]->({}:{})",
                subject_label, edge.subject_id, edge.rel, object_label, edge.object_id
            ),
        }
    }
}
