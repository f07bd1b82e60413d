//! Ontoload Core
//!
//! Domain types shared by the ingestion engine and the CLI: labels,
//! relationship types, property maps, relationship characteristics,
//! write requests and the error taxonomy.

pub mod error;
pub mod model;
pub mod naming;

pub use error::{IngestError, IngestResult, StoreError, StoreResult};
pub use model::{
    Characteristic, Characteristics, EdgeRequest, Label, NodeRequest, Properties, PropertyValue,
    RelType, Row, WriteRequest, ID_KEY,
};
