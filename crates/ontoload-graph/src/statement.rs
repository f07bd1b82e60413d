//! Store-agnostic statements issued by the ingestion engine.
//!
//! Every counting statement yields one record with an integer column named
//! [`COUNT_COLUMN`]. Adapters either interpret a statement directly
//! (the in-memory graph) or render it with [`Statement::to_cypher`].

use ontoload_core::{EdgeRequest, Label, Properties, RelType};

use crate::cypher::{CypherQuery, NodePattern, QueryBuilder};

/// Column carrying the result of every counting statement.
pub const COUNT_COLUMN: &str = "matched";

/// A fully qualified edge: typed, directed, endpoints addressed by (label, id).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub subject_label: Label,
    pub subject_id: String,
    pub rel: RelType,
    pub object_label: Label,
    pub object_id: String,
}

impl EdgeKey {
    pub fn new(edge: &EdgeRequest, subject_label: &Label, object_label: &Label) -> Self {
        Self {
            subject_label: subject_label.clone(),
            subject_id: edge.subject_id.clone(),
            rel: edge.rel.clone(),
            object_label: object_label.clone(),
            object_id: edge.object_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Count nodes carrying `label` and `id`.
    NodeExists { label: Label, id: String },
    /// Create one node; counts the nodes created.
    CreateNode { label: Label, properties: Properties },
    /// Count outgoing `rel` edges of the subject that end anywhere but the object.
    CountOtherObjects(EdgeKey),
    /// Count incoming `rel` edges of the object that start anywhere but the subject.
    CountOtherSubjects(EdgeKey),
    /// Count `rel` edges between exactly this subject and object.
    EdgeExists(EdgeKey),
    /// Match both endpoints and create the edge unless already present;
    /// counts the edges created.
    CreateEdge(EdgeKey),
    /// Install a uniqueness constraint on `(label, id)`. Yields no records.
    EnsureUniqueId { label: Label },
    /// Count nodes, optionally restricted to a label.
    CountNodes { label: Option<Label> },
    /// Count edges, optionally restricted to a type.
    CountEdges { rel: Option<RelType> },
}

impl Statement {
    pub fn node_exists(label: &Label, id: impl Into<String>) -> Self {
        Self::NodeExists {
            label: label.clone(),
            id: id.into(),
        }
    }

    /// Whether the statement mutates the graph or the schema.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::CreateNode { .. } | Self::CreateEdge(_) | Self::EnsureUniqueId { .. }
        )
    }

    /// Whether the statement yields a [`COUNT_COLUMN`] record.
    pub fn returns_count(&self) -> bool {
        !matches!(self, Self::EnsureUniqueId { .. })
    }

    pub fn to_cypher(&self) -> CypherQuery {
        match self {
            Self::NodeExists { label, id } => QueryBuilder::new()
                .match_node(NodePattern::var("n").labeled(label).with_id(id))
                .return_count("n", COUNT_COLUMN)
                .build(),
            Self::CreateNode { label, properties } => QueryBuilder::new()
                .create_node("n", label, properties)
                .return_count("n", COUNT_COLUMN)
                .build(),
            Self::CountOtherObjects(key) => QueryBuilder::new()
                .match_path(
                    NodePattern::var("s").labeled(&key.subject_label).with_id(&key.subject_id),
                    "",
                    &key.rel,
                    NodePattern::var("o"),
                )
                .where_not_node("o", &key.object_label, &key.object_id)
                .return_count("o", COUNT_COLUMN)
                .build(),
            Self::CountOtherSubjects(key) => QueryBuilder::new()
                .match_path(
                    NodePattern::var("s"),
                    "",
                    &key.rel,
                    NodePattern::var("o").labeled(&key.object_label).with_id(&key.object_id),
                )
                .where_not_node("s", &key.subject_label, &key.subject_id)
                .return_count("s", COUNT_COLUMN)
                .build(),
            Self::EdgeExists(key) => QueryBuilder::new()
                .match_path(
                    NodePattern::var("s").labeled(&key.subject_label).with_id(&key.subject_id),
                    "r",
                    &key.rel,
                    NodePattern::var("o").labeled(&key.object_label).with_id(&key.object_id),
                )
                .return_count("r", COUNT_COLUMN)
                .build(),
            Self::CreateEdge(key) => QueryBuilder::new()
                .match_node(NodePattern::var("s").labeled(&key.subject_label).with_id(&key.subject_id))
                .match_node(NodePattern::var("o").labeled(&key.object_label).with_id(&key.object_id))
                .where_no_edge("s", &key.rel, "o")
                .create_edge("s", "r", &key.rel, "o")
                .return_count("r", COUNT_COLUMN)
                .build(),
            Self::EnsureUniqueId { label } => QueryBuilder::new()
                .clause(format!(
                    "CREATE CONSTRAINT {}_id_unique IF NOT EXISTS FOR (n:{}) REQUIRE n.id IS UNIQUE",
                    label.as_str().to_lowercase(),
                    label
                ))
                .build(),
            Self::CountNodes { label } => {
                let node = match label {
                    Some(label) => NodePattern::var("n").labeled(label),
                    None => NodePattern::var("n"),
                };
                QueryBuilder::new()
                    .match_node(node)
                    .return_count("n", COUNT_COLUMN)
                    .build()
            }
            Self::CountEdges { rel } => {
                let pattern = match rel {
                    Some(rel) => format!("MATCH ()-[r:{}]->()", rel),
                    None => "MATCH ()-[r]->()".to_string(),
                };
                QueryBuilder::new()
                    .clause(pattern)
                    .return_count("r", COUNT_COLUMN)
                    .build()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontoload_core::Characteristic;

    fn key() -> EdgeKey {
        let edge = EdgeRequest::new(RelType::new("enrolled_in").unwrap(), "1", "9")
            .with(Characteristic::Functional);
        EdgeKey::new(&edge, &Label::new("Student").unwrap(), &Label::new("Course").unwrap())
    }

    #[test]
    fn test_create_edge_is_match_match_create() {
        let q = Statement::CreateEdge(key()).to_cypher();
        assert_eq!(
            q.text,
            "MATCH (s:Student {id: $p0})\n\
             MATCH (o:Course {id: $p1})\n\
             WHERE NOT (s)-[:ENROLLED_IN]->(o)\n\
             CREATE (s)-[r:ENROLLED_IN]->(o)\n\
             RETURN count(r) AS matched"
        );
        assert_eq!(q.params[0].1, "1".into());
        assert_eq!(q.params[1].1, "9".into());
    }

    #[test]
    fn test_inverse_functional_check_excludes_subject() {
        let q = Statement::CountOtherSubjects(key()).to_cypher();
        assert_eq!(
            q.text,
            "MATCH (s)-[:ENROLLED_IN]->(o:Course {id: $p0})\n\
             WHERE NOT (s:Student AND s.id = $p1)\n\
             RETURN count(s) AS matched"
        );
    }

    #[test]
    fn test_unique_constraint_statement() {
        let stmt = Statement::EnsureUniqueId { label: Label::new("Student").unwrap() };
        assert!(stmt.is_write());
        assert!(!stmt.returns_count());
        assert_eq!(
            stmt.to_cypher().text,
            "CREATE CONSTRAINT student_id_unique IF NOT EXISTS FOR (n:Student) REQUIRE n.id IS UNIQUE"
        );
    }

    #[test]
    fn test_count_statements() {
        assert_eq!(
            Statement::CountNodes { label: None }.to_cypher().text,
            "MATCH (n)\nRETURN count(n) AS matched"
        );
        assert_eq!(
            Statement::CountEdges { rel: Some(RelType::new("knows").unwrap()) }.to_cypher().text,
            "MATCH ()-[r:KNOWS]->()\nRETURN count(r) AS matched"
        );
    }
}
