mod common;

use common::*;
use ontoload_core::{Characteristic, IngestError, WriteRequest};
use ontoload_graph::{exists, run_batch, BatchOutcome, GraphStore, MemoryGraph};

#[tokio::test]
async fn test_batch_commits_all() {
    let graph = school().await;
    let mut session = graph.session().await.unwrap();
    let requests = vec![
        entity("Student", "1"),
        entity("Course", "9"),
        enrolment(takes("1", "9")),
    ];

    let outcome = run_batch(&mut session, &requests).await.unwrap();
    assert_eq!(outcome, BatchOutcome::Committed { applied: 3 });
    assert_eq!(graph.node_count(None), 2);
    assert_eq!(graph.edge_count(None), 1);
}

#[tokio::test]
async fn test_empty_batch() {
    let graph = MemoryGraph::new();
    let mut session = graph.session().await.unwrap();
    let outcome = run_batch(&mut session, &[]).await.unwrap();
    assert_eq!(outcome, BatchOutcome::Committed { applied: 0 });
}

#[tokio::test]
async fn test_duplicate_entity_rolls_back_whole_batch() {
    let graph = school_with(&["2"], &[]).await;
    let mut session = graph.session().await.unwrap();
    let requests = vec![
        entity("Student", "1"),
        entity("Course", "9"),
        entity("Student", "2"),
        entity("Student", "3"),
    ];

    let outcome = run_batch(&mut session, &requests).await.unwrap();
    assert_eq!(
        outcome,
        BatchOutcome::RolledBack {
            index: 2,
            reason: IngestError::already_exists("Student", "2"),
        }
    );
    // Only the pre-existing node survives.
    assert_eq!(graph.node_count(None), 1);
    for (name, id) in [("Student", "1"), ("Course", "9"), ("Student", "3")] {
        assert!(!exists(&graph, &label(name), id).await.unwrap());
    }
}

#[tokio::test]
async fn test_duplicate_inside_batch() {
    let graph = school().await;
    let mut session = graph.session().await.unwrap();
    let requests = vec![entity("Student", "1"), entity("Student", "1")];

    let outcome = run_batch(&mut session, &requests).await.unwrap();
    assert!(matches!(outcome, BatchOutcome::RolledBack { index: 1, .. }));
    assert_eq!(graph.node_count(None), 0);
}

#[tokio::test]
async fn test_edges_see_nodes_from_same_batch() {
    let graph = school().await;
    let mut session = graph.session().await.unwrap();
    let requests = vec![
        entity("Student", "1"),
        entity("Course", "9"),
        entity("Course", "10"),
        enrolment(takes_functional("1", "9")),
        enrolment(takes_functional("1", "10")),
    ];

    let outcome = run_batch(&mut session, &requests).await.unwrap();
    match outcome {
        BatchOutcome::RolledBack { index, reason } => {
            assert_eq!(index, 4);
            assert!(matches!(
                reason,
                IngestError::ConstraintViolated {
                    characteristic: Characteristic::Functional,
                    ..
                }
            ));
        }
        other => panic!("expected a rollback, got {other:?}"),
    }
    assert_eq!(graph.node_count(None), 0);
    assert_eq!(graph.edge_count(None), 0);
}

#[tokio::test]
async fn test_missing_endpoint_rolls_back() {
    let graph = school().await;
    let mut session = graph.session().await.unwrap();
    let requests: Vec<WriteRequest> = vec![entity("Student", "1"), enrolment(takes("1", "9"))];

    let outcome = run_batch(&mut session, &requests).await.unwrap();
    assert_eq!(
        outcome,
        BatchOutcome::RolledBack {
            index: 1,
            reason: IngestError::endpoint_missing("Course", "9"),
        }
    );
    assert_eq!(graph.node_count(None), 0);
}

#[tokio::test]
async fn test_duplicate_edge_in_batch_is_failure() {
    let graph = school_with(&["1"], &["9"]).await;
    let mut session = graph.session().await.unwrap();
    let requests = vec![entity("Student", "2"), enrolment(takes("1", "9")), enrolment(takes("1", "9"))];

    let outcome = run_batch(&mut session, &requests).await.unwrap();
    assert!(matches!(
        outcome,
        BatchOutcome::RolledBack {
            index: 2,
            reason: IngestError::AlreadyExists { .. }
        }
    ));
    assert_eq!(graph.edge_count(None), 0);
    assert_eq!(graph.node_count(None), 2);
}

#[tokio::test]
async fn test_batch_on_offline_store() {
    let graph = school().await;
    let mut session = graph.session().await.unwrap();
    graph.set_offline(true);

    let err = run_batch(&mut session, &[entity("Student", "1")]).await.unwrap_err();
    assert!(matches!(err, IngestError::StoreUnavailable(_)));
    graph.set_offline(false);
    assert_eq!(graph.node_count(None), 0);
}
