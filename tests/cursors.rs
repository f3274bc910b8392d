//! Integration tests for the cursor contract: lifecycle, sentinels,
//! suspend/resume and factory bookkeeping

use samyama_kernel::cursor::{CursorState, StubNodeCursor, UnionNodeCursor};
use samyama_kernel::helpers::degree;
use samyama_kernel::{
    AuthToken, Cursor, IndexOrder, Kernel, KernelConfig, KernelError, NodeId, PropertyKeyId,
    PropertyValue, RelTypeId, RelationshipId, RelationshipSelection, RelationshipTraversal,
    Session, Transaction,
};

fn session() -> Session {
    Kernel::default().begin_session(AuthToken::None).unwrap()
}

fn nodes(tx: &Transaction, count: usize) -> Vec<NodeId> {
    (0..count)
        .map(|_| tx.data_write().node_create().unwrap())
        .collect()
}

#[test]
fn test_lifecycle_of_a_cursor() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    let created = nodes(&tx, 1);
    let mut cursor = tx.cursors().allocate_node_cursor();

    // Unbound: nothing to return, but not an error
    assert!(!cursor.next().unwrap());

    tx.data_read().all_nodes_scan(&mut cursor).unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.node_reference(), created[0]);
    assert!(!cursor.next().unwrap());
    assert!(!cursor.next().unwrap());
    assert_eq!(cursor.node_reference(), NodeId::NONE);

    cursor.close();
    cursor.close();
    assert!(cursor.is_closed());
    assert_eq!(cursor.next(), Err(KernelError::CursorClosed));
    assert_eq!(cursor.suspend().unwrap_err(), KernelError::CursorClosed);
    assert_eq!(
        tx.data_read().all_nodes_scan(&mut cursor),
        Err(KernelError::CursorClosed)
    );
}

#[test]
fn test_unpositioned_sentinels() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    let cursors = tx.cursors();
    let nodes = cursors.allocate_node_cursor();
    let scan = cursors.allocate_relationship_scan_cursor();
    let traversal = cursors.allocate_relationship_traversal_cursor();
    let groups = cursors.allocate_relationship_group_cursor();
    let properties = cursors.allocate_property_cursor();
    let labels = cursors.allocate_node_label_index_cursor();
    let values = cursors.allocate_node_value_index_cursor();

    assert_eq!(nodes.node_reference(), NodeId::NONE);
    assert!(nodes.labels().is_empty());
    assert_eq!(nodes.degree(), 0);
    assert_eq!(scan.relationship_reference(), RelationshipId::NONE);
    assert_eq!(scan.source_node_reference(), NodeId::NONE);
    assert_eq!(traversal.relationship_reference(), RelationshipId::NONE);
    assert_eq!(traversal.relationship_type(), RelTypeId::NONE);
    assert_eq!(traversal.origin_node_reference(), NodeId::NONE);
    assert_eq!(groups.relationship_type(), RelTypeId::NONE);
    assert_eq!(groups.total_count(), 0);
    assert_eq!(properties.property_key(), PropertyKeyId::NONE);
    assert_eq!(properties.property_value(), &PropertyValue::Null);
    assert_eq!(labels.node_reference(), NodeId::NONE);
    assert_eq!(values.node_reference(), NodeId::NONE);
    assert_eq!(values.property_value(), &PropertyValue::Null);
}

#[test]
fn test_populating_from_unpositioned_cursor_fails() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    nodes(&tx, 1);
    let mut nodes = tx.cursors().allocate_node_cursor();
    let mut groups = tx.cursors().allocate_relationship_group_cursor();
    let mut properties = tx.cursors().allocate_property_cursor();

    assert_eq!(nodes.relationships(&mut groups), Err(KernelError::CursorNotPositioned));
    tx.data_read().all_nodes_scan(&mut nodes).unwrap();
    assert_eq!(nodes.properties(&mut properties), Err(KernelError::CursorNotPositioned));
    assert!(nodes.next().unwrap());
    nodes.properties(&mut properties).unwrap();
    assert!(!properties.next().unwrap());
}

#[test]
fn test_suspend_and_resume_around_a_loan() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    let created = nodes(&tx, 3);
    let mut cursor = tx.cursors().allocate_node_cursor();
    tx.data_read().all_nodes_scan(&mut cursor).unwrap();
    assert!(cursor.next().unwrap());

    let position = cursor.suspend().unwrap();
    assert_eq!(position.state(), &CursorState::Positioned(created[0]));

    // Loan the cursor to a point lookup, then hand it back
    tx.data_read().single_node(created[2], &mut cursor).unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.node_reference(), created[2]);
    cursor.resume(position).unwrap();
    assert_eq!(cursor.node_reference(), created[0]);

    assert!(cursor.next().unwrap());
    assert_eq!(cursor.node_reference(), created[1]);
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.node_reference(), created[2]);
    assert!(!cursor.next().unwrap());
}

#[test]
fn test_resume_rejects_foreign_position() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    nodes(&tx, 2);
    let mut first = tx.cursors().allocate_node_cursor();
    let mut second = tx.cursors().allocate_node_cursor();
    tx.data_read().all_nodes_scan(&mut first).unwrap();
    assert!(first.next().unwrap());

    let position = first.suspend().unwrap();
    assert_eq!(
        second.resume(position.clone()),
        Err(KernelError::ForeignCursorPosition)
    );
    first.close();
    assert_eq!(first.resume(position), Err(KernelError::CursorClosed));
}

#[test]
fn test_leaked_cursors_are_reported_and_closed() {
    let session = session();
    let mut tx = session.begin_transaction().unwrap();
    let mut kept = tx.cursors().allocate_node_cursor();
    let _leaked = tx.cursors().allocate_property_cursor();
    let mut closed = tx.cursors().allocate_relationship_scan_cursor();
    closed.close();

    assert_eq!(tx.cursors().open_cursors(), 2);
    assert_eq!(
        tx.cursors().assert_all_closed(),
        Err(KernelError::CursorsLeaked(2))
    );
    tx.close().unwrap();
    assert!(kept.is_closed());
    assert_eq!(kept.next(), Err(KernelError::CursorClosed));
}

#[test]
fn test_pool_reuses_recycled_cursors() {
    let kernel = Kernel::new(KernelConfig {
        cursor_pool_capacity: 1,
        ..KernelConfig::default()
    });
    let session = kernel.begin_session(AuthToken::None).unwrap();
    let tx = session.begin_transaction().unwrap();
    let created = nodes(&tx, 2);

    let mut cursor = tx.cursors().allocate_node_cursor();
    tx.data_read().all_nodes_scan(&mut cursor).unwrap();
    assert!(cursor.next().unwrap());
    tx.cursors().recycle(cursor);
    tx.cursors().recycle(tx.cursors().allocate_property_cursor());

    // The pooled cursor comes back unbound and open
    let mut reused = tx.cursors().allocate_node_cursor();
    assert!(!reused.is_closed());
    assert!(!reused.next().unwrap());
    tx.data_read().single_node(created[1], &mut reused).unwrap();
    assert!(reused.next().unwrap());
    assert_eq!(reused.node_reference(), created[1]);

    let stats = tx.cursors().statistics();
    assert_eq!(stats.allocated, 2);
    assert_eq!(stats.reused, 1);
    assert_eq!(stats.recycled, 1);
    assert_eq!(stats.pooled, 0);
}

#[test]
fn test_union_over_stub_cursors() {
    let inputs = vec![
        StubNodeCursor::new(vec![NodeId::new(5), NodeId::new(1)], IndexOrder::None),
        StubNodeCursor::new(vec![NodeId::new(3), NodeId::new(5)], IndexOrder::None),
    ];
    let mut union = UnionNodeCursor::new(inputs, IndexOrder::None);
    let mut seen = Vec::new();
    while union.next().unwrap() {
        seen.push(union.node_reference());
    }
    assert_eq!(seen, vec![NodeId::new(1), NodeId::new(3), NodeId::new(5)]);
}

#[test]
fn test_degree_matches_selection_count() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    let rel_type = tx
        .token_write()
        .relationship_type_get_or_create_for_name("R")
        .unwrap();
    let created = nodes(&tx, 3);
    for target in &created[1..] {
        tx.data_write().relationship_create(created[0], rel_type, *target).unwrap();
    }
    let mut traversal = tx.cursors().allocate_relationship_traversal_cursor();
    tx.data_read()
        .relationships(created[0], &RelationshipSelection::outgoing(), &mut traversal)
        .unwrap();
    assert_eq!(degree(&mut traversal).unwrap(), 2);
    assert_eq!(
        tx.data_read()
            .node_degree(created[0], &RelationshipSelection::outgoing())
            .unwrap(),
        2
    );
}
