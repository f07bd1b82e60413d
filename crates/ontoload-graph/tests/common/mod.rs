#![allow(dead_code)]

use ontoload_core::{Characteristic, EdgeRequest, Label, NodeRequest, Properties, RelType, WriteRequest, ID_KEY};
use ontoload_graph::{ensure_unique_ids, GraphStore, MemoryGraph};

pub fn label(name: &str) -> Label {
    Label::new(name).unwrap()
}

pub fn rel(name: &str) -> RelType {
    RelType::new(name).unwrap()
}

pub fn node(label_name: &str, id: &str) -> NodeRequest {
    let mut properties = Properties::new();
    properties.insert(ID_KEY.to_string(), id.into());
    NodeRequest::new(label(label_name), properties).unwrap()
}

pub fn named_node(label_name: &str, id: &str, name: &str) -> NodeRequest {
    let mut request = node(label_name, id);
    request.properties.insert("name".to_string(), name.into());
    request
}

pub fn entity(label_name: &str, id: &str) -> WriteRequest {
    WriteRequest::Entity(node(label_name, id))
}

pub fn takes(subject: &str, object: &str) -> EdgeRequest {
    EdgeRequest::new(rel("TAKES"), subject, object)
}

pub fn takes_functional(subject: &str, object: &str) -> EdgeRequest {
    takes(subject, object).with(Characteristic::Functional)
}

pub fn enrolment(edge: EdgeRequest) -> WriteRequest {
    WriteRequest::relationship(edge, label("Student"), label("Course"))
}

/// Empty graph with `(label, id)` uniqueness on Student and Course.
pub async fn school() -> MemoryGraph {
    let graph = MemoryGraph::new();
    let mut session = graph.session().await.unwrap();
    ensure_unique_ids(&mut session, &[label("Student"), label("Course")])
        .await
        .unwrap();
    graph
}

/// [`school`] with the given students and courses already committed.
pub async fn school_with(students: &[&str], courses: &[&str]) -> MemoryGraph {
    let graph = school().await;
    let mut session = graph.session().await.unwrap();
    for id in students {
        ontoload_graph::create_entity(&mut session, &node("Student", id)).await.unwrap();
    }
    for id in courses {
        ontoload_graph::create_entity(&mut session, &node("Course", id)).await.unwrap();
    }
    graph
}
