//! Traversal helpers built on the cursor traits
//!
//! The generic helpers drain any [`RelationshipTraversal`] cursor, store
//! backed or stub. The `Read`-based ones allocate their cursors once from a
//! transaction's factory and hand them back when done.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;

use crate::cursor::{Cursor, CursorFactory, RelationshipTraversal, RelationshipTraversalCursor};
use crate::error::KernelResult;
use crate::graph::NodeId;
use crate::kernel::{Read, RelationshipSelection};

/// Count the remaining relationships of a traversal cursor
pub fn degree<C: RelationshipTraversal>(cursor: &mut C) -> KernelResult<usize> {
    let mut count = 0;
    while cursor.next()? {
        count += 1;
    }
    Ok(count)
}

/// Other endpoints of the remaining relationships, in cursor order
///
/// A node reached over several relationships is listed once per
/// relationship; loops list the origin itself.
pub fn neighbours<C: RelationshipTraversal>(cursor: &mut C) -> KernelResult<Vec<NodeId>> {
    let mut out = Vec::new();
    while cursor.next()? {
        out.push(cursor.other_node_reference());
    }
    Ok(out)
}

/// Distinct neighbours of `node` over the selected relationships
pub fn expand(
    read: &Read<'_>,
    cursors: &CursorFactory,
    node: NodeId,
    selection: &RelationshipSelection,
) -> KernelResult<Vec<NodeId>> {
    let mut traversal = cursors.allocate_relationship_traversal_cursor();
    let result = read
        .relationships(node, selection, &mut traversal)
        .and_then(|_| neighbours(&mut traversal));
    cursors.recycle(traversal);
    let mut seen = FxHashSet::default();
    Ok(result?.into_iter().filter(|n| seen.insert(*n)).collect())
}

/// Number of hops on a shortest path from `from` to `to`
///
/// Breadth-first over the selected relationships, with one traversal
/// cursor re-populated for every visited node. `None` when `to` is
/// unreachable or either node is not visible.
pub fn shortest_path_length(
    read: &Read<'_>,
    cursors: &CursorFactory,
    from: NodeId,
    to: NodeId,
    selection: &RelationshipSelection,
) -> KernelResult<Option<usize>> {
    if !read.node_exists(from)? || !read.node_exists(to)? {
        return Ok(None);
    }
    if from == to {
        return Ok(Some(0));
    }
    let mut traversal = cursors.allocate_relationship_traversal_cursor();
    let result = breadth_first(read, &mut traversal, from, to, selection);
    cursors.recycle(traversal);
    result
}

fn breadth_first(
    read: &Read<'_>,
    traversal: &mut RelationshipTraversalCursor,
    from: NodeId,
    to: NodeId,
    selection: &RelationshipSelection,
) -> KernelResult<Option<usize>> {
    let mut visited = FxHashSet::default();
    visited.insert(from);
    let mut frontier = VecDeque::from([(from, 0usize)]);
    while let Some((node, depth)) = frontier.pop_front() {
        read.relationships(node, selection, traversal)?;
        while traversal.next()? {
            let next = traversal.other_node_reference();
            if next == to {
                return Ok(Some(depth + 1));
            }
            if visited.insert(next) {
                frontier.push_back((next, depth + 1));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{StubRelationship, StubRelationshipCursor};
    use crate::graph::RelTypeId;

    #[test]
    fn test_stub_degree_and_neighbours() {
        let origin = NodeId::new(1);
        let rels = vec![
            StubRelationship::new(1, RelTypeId(0), origin, NodeId::new(2)),
            StubRelationship::new(2, RelTypeId(0), NodeId::new(3), origin),
            StubRelationship::new(3, RelTypeId(1), origin, origin),
        ];
        let mut cursor = StubRelationshipCursor::new(origin, rels.clone());
        assert_eq!(degree(&mut cursor).unwrap(), 3);

        let mut cursor = StubRelationshipCursor::new(origin, rels);
        assert_eq!(
            neighbours(&mut cursor).unwrap(),
            vec![NodeId::new(2), NodeId::new(3), origin]
        );
    }
}
