//! Integration tests for label scans, union and intersection scans, and
//! the generic merge cursors

use samyama_kernel::cursor::{IntersectionNodeCursor, NodeLabelIndexCursor, UnionNodeCursor};
use samyama_kernel::{
    AuthToken, Cursor, IndexOrder, Kernel, LabelId, NodeId, NodeIndexCursor, Session, Transaction,
};

fn session() -> Session {
    Kernel::default().begin_session(AuthToken::None).unwrap()
}

fn commit(mut tx: Transaction) {
    tx.success().unwrap();
    tx.close().unwrap();
}

fn drain<C: NodeIndexCursor>(cursor: &mut C) -> Vec<NodeId> {
    let mut out = Vec::new();
    while cursor.next().unwrap() {
        out.push(cursor.node_reference());
    }
    out
}

fn label_scan(tx: &Transaction, label: LabelId, order: IndexOrder) -> Vec<NodeId> {
    let mut cursor = tx.cursors().allocate_node_label_index_cursor();
    tx.data_read().node_label_scan(label, &mut cursor, order).unwrap();
    let out = drain(&mut cursor);
    cursor.close();
    out
}

fn labeled_node(tx: &Transaction, labels: &[LabelId]) -> NodeId {
    let node = tx.data_write().node_create().unwrap();
    for label in labels {
        tx.data_write().node_add_label(node, *label).unwrap();
    }
    node
}

fn labels(tx: &Transaction) -> (LabelId, LabelId, LabelId) {
    let tokens = tx.token_write();
    (
        tokens.label_get_or_create_for_name("labelOne").unwrap(),
        tokens.label_get_or_create_for_name("labelTwo").unwrap(),
        tokens.label_get_or_create_for_name("labelThree").unwrap(),
    )
}

#[test]
fn test_label_scan_counts() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    let (one, _, three) = labels(&tx);
    let first = labeled_node(&tx, &[one]);
    labeled_node(&tx, &[one]);
    for _ in 0..3 {
        labeled_node(&tx, &[three]);
    }
    assert_eq!(label_scan(&tx, three, IndexOrder::None).len(), 3);
    commit(tx);

    let tx = session.begin_transaction().unwrap();
    assert_eq!(label_scan(&tx, one, IndexOrder::None).len(), 2);
    tx.data_write().node_delete(first).unwrap();
    assert_eq!(label_scan(&tx, one, IndexOrder::None).len(), 1);
    assert_eq!(tx.data_read().counts_for_node(Some(one)).unwrap(), 1);
    assert_eq!(tx.data_read().counts_for_node(Some(three)).unwrap(), 3);
}

#[test]
fn test_label_changes_in_transaction() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    let (one, two, _) = labels(&tx);
    let a = labeled_node(&tx, &[one]);
    let b = labeled_node(&tx, &[one]);
    let c = labeled_node(&tx, &[]);
    commit(tx);

    let tx = session.begin_transaction().unwrap();
    tx.data_write().node_remove_label(a, one).unwrap();
    tx.data_write().node_add_label(c, one).unwrap();
    tx.data_write().node_add_label(b, two).unwrap();
    let d = labeled_node(&tx, &[one]);
    assert_eq!(label_scan(&tx, one, IndexOrder::Ascending), vec![b, c, d]);
    assert_eq!(label_scan(&tx, one, IndexOrder::Descending), vec![d, c, b]);
    assert_eq!(label_scan(&tx, two, IndexOrder::None), vec![b]);

    // Removing and re-adding within the transaction is a no-op
    tx.data_write().node_remove_label(b, one).unwrap();
    tx.data_write().node_add_label(b, one).unwrap();
    assert_eq!(label_scan(&tx, one, IndexOrder::None), vec![b, c, d]);
    assert_eq!(tx.data_read().counts_for_node(Some(one)).unwrap(), 3);
    commit(tx);

    let tx = session.begin_transaction().unwrap();
    assert_eq!(label_scan(&tx, one, IndexOrder::None), vec![b, c, d]);
}

#[test]
fn test_scan_is_robust_to_changes_while_open() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    let (one, _, _) = labels(&tx);
    let nodes: Vec<NodeId> = (0..4).map(|_| labeled_node(&tx, &[one])).collect();
    commit(tx);

    let tx = session.begin_transaction().unwrap();
    let mut cursor = tx.cursors().allocate_node_label_index_cursor();
    tx.data_read().node_label_scan(one, &mut cursor, IndexOrder::None).unwrap();
    assert!(cursor.next().unwrap());
    assert_eq!(cursor.node_reference(), nodes[0]);

    tx.data_write().node_remove_label(nodes[1], one).unwrap();
    tx.data_write().node_delete(nodes[2]).unwrap();
    let late = labeled_node(&tx, &[one]);
    assert_eq!(drain(&mut cursor), vec![nodes[3], late]);
    cursor.close();
}

#[test]
fn test_union_and_intersection_scans() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    let (one, two, three) = labels(&tx);
    let a = labeled_node(&tx, &[one]);
    let b = labeled_node(&tx, &[one, two]);
    let c = labeled_node(&tx, &[two, three]);
    let d = labeled_node(&tx, &[one, two, three]);
    commit(tx);

    let tx = session.begin_transaction().unwrap();
    let e = labeled_node(&tx, &[three, one]);
    let read = tx.data_read();
    let mut cursor = tx.cursors().allocate_node_label_index_cursor();

    read.node_label_union_scan(&[one, two], &mut cursor, IndexOrder::None).unwrap();
    assert_eq!(drain(&mut cursor), vec![a, b, c, d, e]);

    read.node_label_union_scan(&[two, three], &mut cursor, IndexOrder::Descending).unwrap();
    assert_eq!(drain(&mut cursor), vec![e, d, c, b]);

    read.node_label_intersection_scan(&[one, two], &mut cursor, IndexOrder::None).unwrap();
    assert_eq!(drain(&mut cursor), vec![b, d]);

    read.node_label_intersection_scan(&[one, two, three], &mut cursor, IndexOrder::Descending)
        .unwrap();
    assert_eq!(drain(&mut cursor), vec![d]);

    read.node_label_intersection_scan(&[three, one], &mut cursor, IndexOrder::Ascending).unwrap();
    assert_eq!(drain(&mut cursor), vec![d, e]);

    read.node_label_intersection_scan(&[], &mut cursor, IndexOrder::None).unwrap();
    assert!(drain(&mut cursor).is_empty());
    cursor.close();
}

#[test]
fn test_merge_cursors_over_label_cursors() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    let (one, two, _) = labels(&tx);
    let a = labeled_node(&tx, &[one]);
    let b = labeled_node(&tx, &[one, two]);
    let c = labeled_node(&tx, &[two]);

    let inputs = |order: IndexOrder| -> Vec<NodeLabelIndexCursor> {
        [one, two]
            .iter()
            .map(|label| {
                let mut cursor = tx.cursors().allocate_node_label_index_cursor();
                tx.data_read().node_label_scan(*label, &mut cursor, order).unwrap();
                cursor
            })
            .collect()
    };

    let mut union = UnionNodeCursor::new(inputs(IndexOrder::Descending), IndexOrder::Descending);
    assert_eq!(drain(&mut union), vec![c, b, a]);
    union.close();

    let mut intersection = IntersectionNodeCursor::new(inputs(IndexOrder::None), IndexOrder::None);
    assert_eq!(drain(&mut intersection), vec![b]);
    for input in intersection.into_inputs() {
        tx.cursors().recycle(input);
    }
    assert!(tx.cursors().assert_all_closed().is_ok());
}
