//! Integration tests for value index seeks, index lifecycle and
//! uniqueness constraints

use std::ops::Bound;

use samyama_kernel::{
    AuthToken, Cursor, ErrorKind, IndexDescriptor, IndexOrder, IndexQuery, IndexState, Kernel,
    KernelError, LabelId, NodeId, PropertyKeyId, PropertyValue, Session, Transaction,
};

fn session() -> Session {
    Kernel::default().begin_session(AuthToken::None).unwrap()
}

fn commit(mut tx: Transaction) {
    tx.success().unwrap();
    tx.close().unwrap();
}

fn tokens(tx: &Transaction) -> (LabelId, PropertyKeyId) {
    (
        tx.token_write().label_get_or_create_for_name("Person").unwrap(),
        tx.token_write().property_key_get_or_create_for_name("name").unwrap(),
    )
}

fn person(tx: &Transaction, label: LabelId, key: PropertyKeyId, value: PropertyValue) -> NodeId {
    let node = tx.data_write().node_create().unwrap();
    tx.data_write().node_add_label(node, label).unwrap();
    tx.data_write().node_set_property(node, key, value).unwrap();
    node
}

fn seek(
    tx: &Transaction,
    index: &IndexDescriptor,
    order: IndexOrder,
    query: IndexQuery,
) -> Vec<(PropertyValue, NodeId)> {
    let mut cursor = tx.cursors().allocate_node_value_index_cursor();
    tx.data_read().node_index_seek(index, &mut cursor, order, query).unwrap();
    let mut out = Vec::new();
    while cursor.next().unwrap() {
        out.push((cursor.property_value().clone(), cursor.node_reference()));
    }
    cursor.close();
    out
}

/// Committed index on (Person, name) over alice, bob, carol, dave
fn populated(session: &Session) -> (IndexDescriptor, Vec<NodeId>, LabelId, PropertyKeyId) {
    let tx = session.begin_transaction().unwrap();
    let (label, key) = tokens(&tx);
    let nodes = ["carol", "alice", "dave", "bob"]
        .iter()
        .map(|name| person(&tx, label, key, (*name).into()))
        .collect();
    let index = tx.schema_write().index_create(label, key).unwrap();
    commit(tx);
    (index, nodes, label, key)
}

fn names(entries: &[(PropertyValue, NodeId)]) -> Vec<String> {
    entries
        .iter()
        .map(|(value, _)| value.as_string().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn test_exact_range_prefix_and_scan() {
    let session = session();
    let (index, nodes, _, _) = populated(&session);
    let tx = session.begin_transaction().unwrap();

    let exact = seek(&tx, &index, IndexOrder::None, IndexQuery::Exact("dave".into()));
    assert_eq!(exact, vec![(PropertyValue::from("dave"), nodes[2])]);

    let range = seek(
        &tx,
        &index,
        IndexOrder::Ascending,
        IndexQuery::range(Bound::Included("b".into()), Bound::Excluded("d".into())),
    );
    assert_eq!(names(&range), vec!["bob", "carol"]);

    let prefix = seek(&tx, &index, IndexOrder::None, IndexQuery::StringPrefix("da".into()));
    assert_eq!(names(&prefix), vec!["dave"]);

    let mut cursor = tx.cursors().allocate_node_value_index_cursor();
    tx.data_read()
        .node_index_scan(&index, &mut cursor, IndexOrder::Descending)
        .unwrap();
    let mut all = Vec::new();
    while cursor.next().unwrap() {
        all.push(cursor.property_value().as_string().unwrap_or_default().to_string());
    }
    assert_eq!(all, vec!["dave", "carol", "bob", "alice"]);
    cursor.close();
}

#[test]
fn test_seek_observes_transaction_changes() {
    let session = session();
    let (index, nodes, label, key) = populated(&session);
    let tx = session.begin_transaction().unwrap();

    // carol renamed, dave loses the label, a new erin appears
    tx.data_write().node_set_property(nodes[0], key, "zoe".into()).unwrap();
    tx.data_write().node_remove_label(nodes[2], label).unwrap();
    let erin = person(&tx, label, key, "erin".into());
    tx.data_write().node_delete(nodes[3]).unwrap();

    let all = seek(&tx, &index, IndexOrder::Ascending, IndexQuery::Exists);
    assert_eq!(names(&all), vec!["alice", "erin", "zoe"]);
    assert_eq!(all[1].1, erin);

    let none = seek(&tx, &index, IndexOrder::None, IndexQuery::Exact("carol".into()));
    assert!(none.is_empty());
    commit(tx);

    let tx = session.begin_transaction().unwrap();
    let all = seek(&tx, &index, IndexOrder::Descending, IndexQuery::Exists);
    assert_eq!(names(&all), vec!["zoe", "erin", "alice"]);
}

#[test]
fn test_numeric_ordering() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    let label = tx.token_write().label_get_or_create_for_name("Item").unwrap();
    let key = tx.token_write().property_key_get_or_create_for_name("price").unwrap();
    for value in [PropertyValue::Integer(10), PropertyValue::Float(2.5), PropertyValue::Integer(7)] {
        person(&tx, label, key, value);
    }
    person(&tx, label, key, "n/a".into());
    let index = tx.schema_write().index_create(label, key).unwrap();
    commit(tx);

    let tx = session.begin_transaction().unwrap();
    let numbers = seek(
        &tx,
        &index,
        IndexOrder::Descending,
        IndexQuery::range(Bound::Included(PropertyValue::Integer(0)), Bound::Unbounded),
    );
    let values: Vec<PropertyValue> = numbers.into_iter().map(|(value, _)| value).collect();
    assert_eq!(
        values,
        vec![
            PropertyValue::Integer(10),
            PropertyValue::Integer(7),
            PropertyValue::Float(2.5)
        ]
    );
}

#[test]
fn test_integer_and_float_tie_in_seeks() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    let label = tx.token_write().label_get_or_create_for_name("Item").unwrap();
    let key = tx.token_write().property_key_get_or_create_for_name("price").unwrap();
    let three = person(&tx, label, key, PropertyValue::Integer(3));
    let three_f = person(&tx, label, key, PropertyValue::Float(3.0));
    person(&tx, label, key, PropertyValue::Float(3.5));
    let two = person(&tx, label, key, PropertyValue::Integer(2));
    let index = tx.schema_write().index_create(label, key).unwrap();
    commit(tx);

    let tx = session.begin_transaction().unwrap();
    let up_to_three = seek(
        &tx,
        &index,
        IndexOrder::Ascending,
        IndexQuery::range(Bound::Unbounded, Bound::Included(PropertyValue::Integer(3))),
    );
    let mut nodes: Vec<NodeId> = up_to_three.iter().map(|(_, node)| *node).collect();
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0], two);
    nodes.sort();
    let mut expected = vec![two, three, three_f];
    expected.sort();
    assert_eq!(nodes, expected);

    let below_three = seek(
        &tx,
        &index,
        IndexOrder::Ascending,
        IndexQuery::range(Bound::Unbounded, Bound::Excluded(PropertyValue::Float(3.0))),
    );
    assert_eq!(below_three.len(), 1);
    assert_eq!(below_three[0].1, two);

    let mut tied = vec![three, three_f];
    tied.sort();
    for query in [PropertyValue::Integer(3), PropertyValue::Float(3.0)] {
        let hits = seek(&tx, &index, IndexOrder::None, IndexQuery::Exact(query));
        let mut nodes: Vec<NodeId> = hits.into_iter().map(|(_, node)| node).collect();
        nodes.sort();
        assert_eq!(nodes, tied);
    }
}

#[test]
fn test_unique_constraint_spans_numeric_types() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    let label = tx.token_write().label_get_or_create_for_name("Item").unwrap();
    let key = tx.token_write().property_key_get_or_create_for_name("sku").unwrap();
    tx.schema_write()
        .unique_property_constraint_create(label, key)
        .unwrap();
    commit(tx);

    let tx = session.begin_transaction().unwrap();
    let existing = person(&tx, label, key, PropertyValue::Float(3.0));
    commit(tx);

    let tx = session.begin_transaction().unwrap();
    let node = tx.data_write().node_create().unwrap();
    tx.data_write().node_add_label(node, label).unwrap();
    assert_eq!(
        tx.data_write().node_set_property(node, key, PropertyValue::Integer(3)),
        Err(KernelError::UniquePropertyValueViolation {
            label,
            property: key,
            value: PropertyValue::Integer(3),
            existing,
        })
    );
    tx.data_write().node_set_property(node, key, PropertyValue::Float(3.5)).unwrap();
}

#[test]
fn test_constraint_validation_treats_three_and_three_point_zero_as_equal() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    let label = tx.token_write().label_get_or_create_for_name("Item").unwrap();
    let key = tx.token_write().property_key_get_or_create_for_name("sku").unwrap();
    person(&tx, label, key, PropertyValue::Integer(3));
    person(&tx, label, key, PropertyValue::Float(3.0));
    commit(tx);

    let tx = session.begin_transaction().unwrap();
    assert!(matches!(
        tx.schema_write().unique_property_constraint_create(label, key),
        Err(KernelError::ConstraintValidationFailed { .. })
    ));
}

#[test]
fn test_index_lifecycle_errors() {
    let session = session();
    let mut tx = session.begin_transaction().unwrap();
    let (label, key) = tokens(&tx);
    let index = tx.schema_write().index_create(label, key).unwrap();
    assert_eq!(tx.schema_read().index_state(&index).unwrap(), IndexState::Populating);
    assert_eq!(
        tx.schema_write().index_create(label, key),
        Err(KernelError::IndexAlreadyExists { label, property: key })
    );

    let mut cursor = tx.cursors().allocate_node_value_index_cursor();
    let err = tx
        .data_read()
        .node_index_seek(&index, &mut cursor, IndexOrder::None, IndexQuery::Exists)
        .unwrap_err();
    assert_eq!(err, KernelError::IndexNotOnline { label, property: key });
    cursor.close();
    tx.success().unwrap();
    tx.close().unwrap();

    let tx = session.begin_transaction().unwrap();
    assert_eq!(tx.schema_read().index_state(&index).unwrap(), IndexState::Online);
    assert_eq!(tx.schema_read().indexes().unwrap(), vec![index]);

    let other = tx.token_write().property_key_get_or_create_for_name("other").unwrap();
    let missing = IndexDescriptor::new(label, other);
    let mut cursor = tx.cursors().allocate_node_value_index_cursor();
    let err = tx
        .data_read()
        .node_index_seek(&missing, &mut cursor, IndexOrder::None, IndexQuery::Exists)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);

    let err = tx
        .data_read()
        .node_index_seek(
            &index,
            &mut cursor,
            IndexOrder::Ascending,
            IndexQuery::Exact(PropertyValue::Array(vec![1.into()])),
        )
        .unwrap_err();
    assert_eq!(err, KernelError::IndexOrderNotSupported { order: IndexOrder::Ascending });
    cursor.close();

    tx.schema_write().index_drop(&index).unwrap();
    assert_eq!(tx.schema_read().index(label, key).unwrap(), None);
    assert_eq!(
        tx.schema_write().index_drop(&index),
        Err(KernelError::IndexNotFound { label, property: key })
    );
    commit(tx);

    let tx = session.begin_transaction().unwrap();
    assert!(tx.schema_read().indexes().unwrap().is_empty());
}

#[test]
fn test_unique_constraint_enforced() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    let (label, key) = tokens(&tx);
    let alice = person(&tx, label, key, "alice".into());
    let constraint = tx
        .schema_write()
        .unique_property_constraint_create(label, key)
        .unwrap();
    commit(tx);

    let tx = session.begin_transaction().unwrap();
    let owned = tx.schema_read().index(label, key).unwrap().unwrap();
    assert!(owned.unique);
    assert_eq!(tx.schema_write().index_drop(&owned), Err(KernelError::IndexOwnedByConstraint));

    let err = tx
        .schema_write()
        .unique_property_constraint_create(label, key)
        .unwrap_err();
    assert_eq!(err, KernelError::ConstraintAlreadyExists { label, property: key });
    assert_eq!(err.kind(), ErrorKind::ConstraintViolation);

    // Setting a duplicate fails, on labeling and on setting
    let node = tx.data_write().node_create().unwrap();
    tx.data_write().node_add_label(node, label).unwrap();
    let err = tx
        .data_write()
        .node_set_property(node, key, "alice".into())
        .unwrap_err();
    assert_eq!(
        err,
        KernelError::UniquePropertyValueViolation {
            label,
            property: key,
            value: "alice".into(),
            existing: alice,
        }
    );
    let unlabeled = tx.data_write().node_create().unwrap();
    tx.data_write().node_set_property(unlabeled, key, "alice".into()).unwrap();
    assert!(matches!(
        tx.data_write().node_add_label(unlabeled, label),
        Err(KernelError::UniquePropertyValueViolation { .. })
    ));

    // Freeing the value makes it available again
    tx.data_write().node_set_property(alice, key, "alicia".into()).unwrap();
    tx.data_write().node_set_property(node, key, "alice".into()).unwrap();

    tx.schema_write().constraint_drop(&constraint).unwrap();
    assert!(tx.schema_read().constraints().unwrap().is_empty());
    assert_eq!(
        tx.schema_write().constraint_drop(&constraint),
        Err(KernelError::NoSuchConstraint { label, property: key })
    );
    commit(tx);

    let tx = session.begin_transaction().unwrap();
    assert!(tx.schema_read().index(label, key).unwrap().is_none());
}

#[test]
fn test_constraint_creation_validates_existing_data() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    let (label, key) = tokens(&tx);
    let first = person(&tx, label, key, "same".into());
    let second = person(&tx, label, key, "same".into());
    commit(tx);

    let tx = session.begin_transaction().unwrap();
    let err = tx
        .schema_write()
        .unique_property_constraint_create(label, key)
        .unwrap_err();
    assert_eq!(
        err,
        KernelError::ConstraintValidationFailed {
            label,
            property: key,
            value: "same".into(),
            first,
            second,
        }
    );

    // Fixing the data in the same transaction lets it through
    tx.data_write().node_set_property(second, key, "other".into()).unwrap();
    tx.schema_write()
        .unique_property_constraint_create(label, key)
        .unwrap();
    commit(tx);
}

#[test]
fn test_plain_index_blocks_constraint() {
    let session = session();
    let tx = session.begin_transaction().unwrap();
    let (label, key) = tokens(&tx);
    tx.schema_write().index_create(label, key).unwrap();
    commit(tx);

    let tx = session.begin_transaction().unwrap();
    assert_eq!(
        tx.schema_write().unique_property_constraint_create(label, key),
        Err(KernelError::IndexAlreadyExists { label, property: key })
    );
}
