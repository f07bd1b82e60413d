//! Cypher query builder.
//!
//! Labels and relationship types are validated identifiers and are spliced
//! into the text; every property value is bound as a parameter.

use ontoload_core::{Label, Properties, PropertyValue, RelType};

/// Rendered Cypher text plus its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CypherQuery {
    pub text: String,
    pub params: Vec<(String, PropertyValue)>,
}

/// A node pattern such as `(s:Student {id: $p0})`.
#[derive(Debug, Clone, Copy)]
pub struct NodePattern<'a> {
    var: &'a str,
    label: Option<&'a Label>,
    id: Option<&'a str>,
}

impl<'a> NodePattern<'a> {
    pub fn var(var: &'a str) -> Self {
        Self { var, label: None, id: None }
    }

    pub fn labeled(mut self, label: &'a Label) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_id(mut self, id: &'a str) -> Self {
        self.id = Some(id);
        self
    }
}

/// Accumulates clauses and parameters for a single query.
#[derive(Debug, Default)]
pub struct QueryBuilder {
    clauses: Vec<String>,
    params: Vec<(String, PropertyValue)>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn bind(&mut self, value: PropertyValue) -> String {
        let name = format!("p{}", self.params.len());
        let placeholder = format!("${}", name);
        self.params.push((name, value));
        placeholder
    }

    fn render_node(&mut self, node: &NodePattern<'_>) -> String {
        let mut out = format!("({}", node.var);
        if let Some(label) = node.label {
            out.push(':');
            out.push_str(label.as_str());
        }
        if let Some(id) = node.id {
            let placeholder = self.bind(PropertyValue::from(id));
            out.push_str(&format!(" {{id: {}}}", placeholder));
        }
        out.push(')');
        out
    }

    /// `MATCH (var:Label {id: $p})`
    pub fn match_node(mut self, node: NodePattern<'_>) -> Self {
        let rendered = self.render_node(&node);
        self.clauses.push(format!("MATCH {}", rendered));
        self
    }

    /// `MATCH (a)-[r:REL]->(b)`
    pub fn match_path(
        mut self,
        start: NodePattern<'_>,
        rel_var: &str,
        rel: &RelType,
        end: NodePattern<'_>,
    ) -> Self {
        let from = self.render_node(&start);
        let to = self.render_node(&end);
        self.clauses.push(format!("MATCH {}-[{}:{}]->{}", from, rel_var, rel, to));
        self
    }

    /// `WHERE NOT (var:Label AND var.id = $p)`
    pub fn where_not_node(mut self, var: &str, label: &Label, id: &str) -> Self {
        let placeholder = self.bind(PropertyValue::from(id));
        self.clauses.push(format!(
            "WHERE NOT ({var}:{label} AND {var}.id = {placeholder})"
        ));
        self
    }

    /// `WHERE NOT (from)-[:REL]->(to)`
    pub fn where_no_edge(mut self, from: &str, rel: &RelType, to: &str) -> Self {
        self.clauses.push(format!("WHERE NOT ({})-[:{}]->({})", from, rel, to));
        self
    }

    /// `CREATE (var:Label {k: $p, ...})`. Null properties are not stored.
    pub fn create_node(mut self, var: &str, label: &Label, properties: &Properties) -> Self {
        let mut assignments = Vec::with_capacity(properties.len());
        for (key, value) in properties {
            if value.is_null() {
                continue;
            }
            let placeholder = self.bind(value.clone());
            assignments.push(format!("{}: {}", quote_ident(key), placeholder));
        }
        self.clauses.push(format!(
            "CREATE ({}:{} {{{}}})",
            var,
            label,
            assignments.join(", ")
        ));
        self
    }

    /// `CREATE (from)-[var:REL]->(to)`
    pub fn create_edge(mut self, from: &str, var: &str, rel: &RelType, to: &str) -> Self {
        self.clauses.push(format!("CREATE ({})-[{}:{}]->({})", from, var, rel, to));
        self
    }

    /// Append a clause that binds nothing.
    pub fn clause(mut self, text: impl Into<String>) -> Self {
        self.clauses.push(text.into());
        self
    }

    /// `RETURN count(var) AS alias`
    pub fn return_count(mut self, var: &str, alias: &str) -> Self {
        self.clauses.push(format!("RETURN count({}) AS {}", var, alias));
        self
    }

    pub fn build(self) -> CypherQuery {
        CypherQuery {
            text: self.clauses.join("\n"),
            params: self.params,
        }
    }
}

/// Back-quote a property key unless it is a plain identifier.
pub fn quote_ident(key: &str) -> String {
    let mut chars = key.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        key.to_string()
    } else {
        format!("`{}`", key.replace('`', "``"))
    }
}
