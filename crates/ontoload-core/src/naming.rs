//! Source naming conventions.
//!
//! Labels come from file names and relationship fields from `$`-separated
//! column names:
//!
//! ```text
//! entity_student.csv                        -> (:Student)
//! relation-entity_student-entity_course.csv -> (:Student)-[..]->(:Course)
//!
//! subject$id, predict$id, rel$name, rel$type$functional, rel$type$symmetric, ...
//! ```

use std::path::Path;

use tracing::warn;

use crate::error::{IngestError, IngestResult};
use crate::model::{Characteristic, Characteristics, EdgeRequest, Label, RelType, Row};

const ENTITY_PREFIX: &str = "entity";
const RELATION_PREFIX: &str = "relation";
const SUBJECT: &str = "subject";
const PREDICT: &str = "predict";
const NAME: &str = "name";
const TYPE: &str = "type";

/// What a source file contains, derived from its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Entity { label: Label },
    Relation { subject: Label, object: Label },
}

/// Classify a source file by its stem.
pub fn classify_file(path: &Path) -> IngestResult<SourceKind> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| IngestError::InvalidSource(format!("unreadable file name: {}", path.display())))?;

    if stem.starts_with(ENTITY_PREFIX) {
        let label = label_from_stem(stem)?;
        Ok(SourceKind::Entity { label })
    } else if stem.starts_with(RELATION_PREFIX) {
        let (subject, object) = relation_labels(stem)?;
        Ok(SourceKind::Relation { subject, object })
    } else {
        Err(IngestError::InvalidSource(format!(
            "'{}' must start with '{}' or '{}'",
            stem, ENTITY_PREFIX, RELATION_PREFIX
        )))
    }
}

/// `entity_grad_student` -> `Grad_Student`.
pub fn label_from_stem(stem: &str) -> IngestResult<Label> {
    let joined = stem
        .split('_')
        .skip(1)
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("_");
    if joined.is_empty() {
        return Err(IngestError::InvalidSource(format!("no label in '{}'", stem)));
    }
    Label::new(joined)
}

/// Subject and object labels from `relation-entity_a-entity_b`.
pub fn relation_labels(stem: &str) -> IngestResult<(Label, Label)> {
    let mut labels = stem
        .split('-')
        .filter(|segment| segment.starts_with(ENTITY_PREFIX))
        .map(label_from_stem);

    match (labels.next(), labels.next()) {
        (Some(subject), Some(object)) => Ok((subject?, object?)),
        _ => Err(IngestError::InvalidSource(format!(
            "'{}' must name a subject and an object entity",
            stem
        ))),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn is_declared(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true")
}

/// Parse one relation row into an edge request.
pub fn parse_relation_row(row: &Row) -> IngestResult<EdgeRequest> {
    let mut subject_id = None;
    let mut object_id = None;
    let mut rel_name = None;
    let mut characteristics = Characteristics::empty();

    for (column, value) in row {
        let parts: Vec<&str> = column.trim().split('$').collect();
        match parts.as_slice() {
            [head, ..] if head.eq_ignore_ascii_case(SUBJECT) => subject_id = Some(value.trim()),
            [head, ..] if head.eq_ignore_ascii_case(PREDICT) => object_id = Some(value.trim()),
            [_, field, ..] if field.eq_ignore_ascii_case(NAME) => rel_name = Some(value.as_str()),
            [_, field, name, ..] if field.eq_ignore_ascii_case(TYPE) => {
                match Characteristic::from_name(name) {
                    Some(c) if is_declared(value) => characteristics.insert(c),
                    Some(_) => {}
                    None => warn!(column = %column, "Unknown relationship characteristic, ignoring"),
                }
            }
            _ => warn!(column = %column, "Unrecognized relation column, ignoring"),
        }
    }

    let subject_id = subject_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| IngestError::MissingField(SUBJECT.to_string()))?;
    let object_id = object_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| IngestError::MissingField(PREDICT.to_string()))?;
    let rel = RelType::new(rel_name.ok_or_else(|| IngestError::MissingField(NAME.to_string()))?)?;

    let mut edge = EdgeRequest::new(rel, subject_id, object_id);
    edge.characteristics = characteristics;
    Ok(edge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_entity_file_label() {
        let kind = classify_file(&PathBuf::from("data/entity_student.csv")).unwrap();
        assert_eq!(kind, SourceKind::Entity { label: Label::new("Student").unwrap() });

        let kind = classify_file(&PathBuf::from("entity_grad_STUDENT.csv")).unwrap();
        assert_eq!(kind, SourceKind::Entity { label: Label::new("Grad_Student").unwrap() });
    }

    #[test]
    fn test_relation_file_labels() {
        let kind = classify_file(&PathBuf::from("relation-entity_student-entity_course.csv")).unwrap();
        assert_eq!(
            kind,
            SourceKind::Relation {
                subject: Label::new("Student").unwrap(),
                object: Label::new("Course").unwrap(),
            }
        );
    }

    #[test]
    fn test_invalid_file_names() {
        assert!(matches!(
            classify_file(&PathBuf::from("students.csv")),
            Err(IngestError::InvalidSource(_))
        ));
        assert!(classify_file(&PathBuf::from("entity.csv")).is_err());
        assert!(classify_file(&PathBuf::from("relation-entity_student.csv")).is_err());
    }

    #[test]
    fn test_parse_relation_row() {
        let r = row(&[
            ("subject$id", "1"),
            ("predict$id", "9"),
            ("rel$name", "enrolled_in"),
            ("rel$type$functional", "1"),
            ("rel$type$inverse_functional", "0"),
            ("rel$type$transitive", "0"),
            ("rel$type$symmetric", "1"),
            ("rel$type$asymmetric", "0"),
            ("rel$type$reflexive", "0"),
            ("rel$type$irreflexive", "true"),
        ]);
        let edge = parse_relation_row(&r).unwrap();
        assert_eq!(edge.rel.as_str(), "ENROLLED_IN");
        assert_eq!(edge.subject_id, "1");
        assert_eq!(edge.object_id, "9");
        assert!(edge.is_functional());
        assert!(!edge.is_inverse_functional());
        assert!(edge.characteristics.contains(Characteristic::Symmetric));
        assert!(edge.characteristics.contains(Characteristic::Irreflexive));
        assert!(!edge.characteristics.contains(Characteristic::Transitive));
    }

    #[test]
    fn test_parse_relation_row_missing_fields() {
        let r = row(&[("predict$id", "9"), ("rel$name", "x")]);
        assert_eq!(parse_relation_row(&r).unwrap_err(), IngestError::MissingField("subject".into()));

        let r = row(&[("subject$id", "1"), ("predict$id", "9")]);
        assert_eq!(parse_relation_row(&r).unwrap_err(), IngestError::MissingField("name".into()));

        let r = row(&[("subject$id", "1"), ("predict$id", ""), ("rel$name", "x")]);
        assert_eq!(parse_relation_row(&r).unwrap_err(), IngestError::MissingField("predict".into()));
    }

    #[test]
    fn test_unknown_characteristic_is_ignored() {
        let r = row(&[
            ("subject$id", "1"),
            ("predict$id", "2"),
            ("rel$name", "knows"),
            ("rel$type$cyclic", "1"),
        ]);
        let edge = parse_relation_row(&r).unwrap();
        assert!(edge.characteristics.is_empty());
    }
}
