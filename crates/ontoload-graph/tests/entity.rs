mod common;

use common::*;
use ontoload_core::{IngestError, PropertyValue};
use ontoload_graph::{create_entity, exists, EntityOutcome, GraphStore, MemoryGraph};

#[tokio::test]
async fn test_create_then_already_exists() {
    let graph = school().await;
    let mut session = graph.session().await.unwrap();
    let alice = named_node("Student", "1", "Alice");

    assert_eq!(create_entity(&mut session, &alice).await.unwrap(), EntityOutcome::Created);
    assert_eq!(create_entity(&mut session, &alice).await.unwrap(), EntityOutcome::AlreadyExists);
    assert_eq!(graph.node_count(Some(&label("Student"))), 1);
}

#[tokio::test]
async fn test_existing_node_is_not_overwritten() {
    let graph = school().await;
    let mut session = graph.session().await.unwrap();

    create_entity(&mut session, &named_node("Student", "1", "Alice")).await.unwrap();
    let outcome = create_entity(&mut session, &named_node("Student", "1", "Mallory")).await.unwrap();

    assert_eq!(outcome, EntityOutcome::AlreadyExists);
    let properties = graph.node_properties(&label("Student"), "1").unwrap();
    assert_eq!(properties.get("name"), Some(&PropertyValue::Str("Alice".to_string())));
}

#[tokio::test]
async fn test_same_id_under_different_labels() {
    let graph = school().await;
    let mut session = graph.session().await.unwrap();

    assert_eq!(create_entity(&mut session, &node("Student", "1")).await.unwrap(), EntityOutcome::Created);
    assert_eq!(create_entity(&mut session, &node("Course", "1")).await.unwrap(), EntityOutcome::Created);
    assert_eq!(graph.node_count(None), 2);
}

#[tokio::test]
async fn test_numeric_id_matches_string_id() {
    let graph = school().await;
    let mut session = graph.session().await.unwrap();
    let mut numeric = node("Student", "1");
    numeric.properties.insert("id".to_string(), PropertyValue::Int(1));
    let numeric = ontoload_core::NodeRequest::new(label("Student"), numeric.properties).unwrap();

    create_entity(&mut session, &numeric).await.unwrap();
    assert!(exists(&graph, &label("Student"), "1").await.unwrap());
    assert_eq!(
        create_entity(&mut session, &node("Student", "1")).await.unwrap(),
        EntityOutcome::AlreadyExists
    );
}

#[tokio::test]
async fn test_exists_is_read_only() {
    let graph = school().await;
    assert!(!exists(&graph, &label("Student"), "42").await.unwrap());
    assert_eq!(graph.node_count(None), 0);
}

#[tokio::test]
async fn test_offline_store_is_unavailable_not_missing() {
    let graph = MemoryGraph::new();
    let mut session = graph.session().await.unwrap();
    graph.set_offline(true);

    let err = create_entity(&mut session, &node("Student", "1")).await.unwrap_err();
    assert!(matches!(err, IngestError::StoreUnavailable(_)));

    let err = exists(&graph, &label("Student"), "1").await.unwrap_err();
    assert!(matches!(err, IngestError::StoreUnavailable(_)));
    graph.set_offline(false);
    assert_eq!(graph.node_count(None), 0);
}
