//! Integration tests for write locking between concurrent transactions

use std::sync::{mpsc, Barrier};
use std::thread;
use std::time::Duration;

use samyama_kernel::kernel::ResourceKey;
use samyama_kernel::{
    AuthToken, Cursor, ErrorKind, Kernel, KernelConfig, KernelError, LabelId, NodeId,
    PropertyKeyId, PropertyValue, Session,
};

fn kernel_with_timeout(lock_timeout_ms: u64) -> Kernel {
    Kernel::new(KernelConfig {
        lock_timeout_ms,
        ..KernelConfig::default()
    })
}

fn tokens(session: &Session) -> (LabelId, PropertyKeyId) {
    let mut tx = session.begin_transaction().unwrap();
    let label = tx.token_write().label_get_or_create_for_name("Account").unwrap();
    let key = tx.token_write().property_key_get_or_create_for_name("number").unwrap();
    tx.success().unwrap();
    tx.close().unwrap();
    (label, key)
}

fn committed_node(session: &Session, label: Option<LabelId>) -> NodeId {
    let mut tx = session.begin_transaction().unwrap();
    let node = tx.data_write().node_create().unwrap();
    if let Some(label) = label {
        tx.data_write().node_add_label(node, label).unwrap();
    }
    tx.success().unwrap();
    tx.close().unwrap();
    node
}

#[test]
fn test_concurrent_constraint_creation_has_one_winner() {
    let kernel = Kernel::default();
    let session = kernel.begin_session(AuthToken::None).unwrap();
    let (label, key) = tokens(&session);
    let barrier = Barrier::new(2);

    let results: Vec<Result<(), KernelError>> = thread::scope(|scope| {
        let workers: Vec<_> = (0..2)
            .map(|_| {
                scope.spawn(|| {
                    let mut tx = session.begin_transaction().unwrap();
                    barrier.wait();
                    let created = tx.schema_write().unique_property_constraint_create(label, key);
                    if created.is_ok() {
                        thread::sleep(Duration::from_millis(20));
                        tx.success().unwrap();
                    }
                    tx.close().unwrap();
                    created.map(|_| ())
                })
            })
            .collect();
        workers.into_iter().map(|worker| worker.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results.contains(&Err(KernelError::ConstraintAlreadyExists {
        label,
        property: key
    })));

    let tx = session.begin_transaction().unwrap();
    assert_eq!(tx.schema_read().constraints().unwrap().len(), 1);
}

#[test]
fn test_same_node_conflict_times_out() {
    let kernel = kernel_with_timeout(50);
    let session = kernel.begin_session(AuthToken::None).unwrap();
    let (_, key) = tokens(&session);
    let node = committed_node(&session, None);

    let holder = session.begin_transaction().unwrap();
    holder.data_write().node_set_property(node, key, 1.into()).unwrap();

    let other = session.begin_transaction().unwrap();
    let err = other
        .data_write()
        .node_set_property(node, key, 2.into())
        .unwrap_err();
    assert_eq!(
        err,
        KernelError::LockTimeout {
            resource: ResourceKey::Node(node),
            timeout_ms: 50,
        }
    );
    assert_eq!(err.kind(), ErrorKind::ConcurrencyTimeout);
    assert!(err.is_transient());
    assert!(!other.has_tx_state_with_changes());
}

#[test]
fn test_unrelated_writes_do_not_block() {
    let kernel = kernel_with_timeout(50);
    let session = kernel.begin_session(AuthToken::None).unwrap();
    let (label, key) = tokens(&session);
    let first = committed_node(&session, Some(label));
    let second = committed_node(&session, Some(label));

    let mut holder = session.begin_transaction().unwrap();
    holder.data_write().node_set_property(first, key, 1.into()).unwrap();

    // Shared schema locks on (Account, number) are compatible
    let mut other = session.begin_transaction().unwrap();
    other.data_write().node_set_property(second, key, 2.into()).unwrap();
    other.data_write().node_create().unwrap();
    other.success().unwrap();
    other.close().unwrap();

    holder.success().unwrap();
    holder.close().unwrap();
}

#[test]
fn test_schema_change_blocks_writes_on_its_pair_only() {
    let kernel = kernel_with_timeout(50);
    let session = kernel.begin_session(AuthToken::None).unwrap();
    let (label, key) = tokens(&session);
    let node = committed_node(&session, Some(label));

    let schema = session.begin_transaction().unwrap();
    schema.schema_write().index_create(label, key).unwrap();

    let writer = session.begin_transaction().unwrap();
    let other_key = writer
        .token_write()
        .property_key_get_or_create_for_name("other")
        .unwrap();
    writer.data_write().node_set_property(node, other_key, 1.into()).unwrap();
    let err = writer
        .data_write()
        .node_set_property(node, key, 1.into())
        .unwrap_err();
    assert_eq!(
        err,
        KernelError::LockTimeout {
            resource: ResourceKey::Schema { label, property: key },
            timeout_ms: 50,
        }
    );
}

#[test]
fn test_pending_constraint_leaves_other_pairs_writable() {
    let kernel = kernel_with_timeout(50);
    let session = kernel.begin_session(AuthToken::None).unwrap();
    let (label, key) = tokens(&session);
    let node = committed_node(&session, Some(label));

    let mut schema = session.begin_transaction().unwrap();
    schema
        .schema_write()
        .unique_property_constraint_create(label, key)
        .unwrap();

    let mut writer = session.begin_transaction().unwrap();
    let other_key = writer
        .token_write()
        .property_key_get_or_create_for_name("balance")
        .unwrap();
    writer.data_write().node_set_property(node, other_key, 10.into()).unwrap();
    let unlabeled = writer.data_write().node_create().unwrap();
    writer.data_write().node_set_property(unlabeled, key, 7.into()).unwrap();
    assert_eq!(
        writer.data_write().node_set_property(node, key, 7.into()),
        Err(KernelError::LockTimeout {
            resource: ResourceKey::Schema { label, property: key },
            timeout_ms: 50,
        })
    );
    writer.success().unwrap();
    writer.close().unwrap();

    schema.success().unwrap();
    schema.close().unwrap();

    let tx = session.begin_transaction().unwrap();
    assert_eq!(tx.schema_read().constraints().unwrap().len(), 1);
    let mut nodes = tx.cursors().allocate_node_cursor();
    tx.data_read().single_node(node, &mut nodes).unwrap();
    assert!(nodes.next().unwrap());
    assert_eq!(nodes.property(other_key), Some(PropertyValue::Integer(10)));
    assert_eq!(nodes.property(key), None);
    tx.data_read().single_node(unlabeled, &mut nodes).unwrap();
    assert!(nodes.next().unwrap());
    assert_eq!(nodes.property(key), Some(PropertyValue::Integer(7)));
    nodes.close();
}

#[test]
fn test_waiter_proceeds_when_holder_closes() {
    let kernel = kernel_with_timeout(5_000);
    let session = kernel.begin_session(AuthToken::None).unwrap();
    let node = committed_node(&session, None);

    let mut holder = session.begin_transaction().unwrap();
    let rel_type = holder
        .token_write()
        .relationship_type_get_or_create_for_name("OWNS")
        .unwrap();
    let other = holder.data_write().node_create().unwrap();
    holder.data_write().relationship_create(node, rel_type, other).unwrap();

    let (started, waiting) = mpsc::channel();
    let shared = &session;
    thread::scope(|scope| {
        let waiter = scope.spawn(move || {
            let mut tx = shared.begin_transaction().unwrap();
            started.send(()).unwrap();
            // Blocks on the node lock until the holder rolls back
            let deleted = tx.data_write().node_delete(node);
            tx.success().unwrap();
            tx.close().unwrap();
            deleted
        });
        waiting.recv().unwrap();
        thread::sleep(Duration::from_millis(30));
        holder.close().unwrap();
        assert_eq!(waiter.join().unwrap(), Ok(true));
    });

    let tx = session.begin_transaction().unwrap();
    assert!(!tx.data_read().node_exists(node).unwrap());
}

#[test]
fn test_locks_released_on_close() {
    let kernel = Kernel::default();
    let session = kernel.begin_session(AuthToken::None).unwrap();
    let (label, key) = tokens(&session);
    let node = committed_node(&session, Some(label));

    let mut tx = session.begin_transaction().unwrap();
    tx.data_write().node_set_property(node, key, "42".into()).unwrap();
    let held = kernel.lock_manager().held_by(tx.id());
    assert_eq!(
        held,
        vec![
            ResourceKey::Node(node),
            ResourceKey::Schema { label, property: key }
        ]
    );

    tx.success().unwrap();
    tx.close().unwrap();
    assert!(kernel.lock_manager().held_by(tx.id()).is_empty());
    assert_eq!(kernel.lock_manager().locked_resources(), 0);
}
