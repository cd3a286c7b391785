//! Chain resolution over linked nodes.
//!
//! Layouts link to parent layouts by id, forming chains that end at a
//! root (no link), a missing link, or a cycle. Both walkers here resolve
//! the chain once and never fail on a broken chain: they return what was
//! reachable along with a [`ChainEnd`] describing how the walk stopped,
//! and the caller decides whether that warrants a warning.

use anyhow::Result;

/// How a chain walk terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEnd {
    /// Reached a node with no link. The normal case.
    Root,
    /// A node linked to an id that no node carries.
    MissingLink(String),
    /// The next node was already visited; the walk stopped before
    /// revisiting it. Carries the id of the repeated node.
    Cycle(String),
}

/// Resolve the chain starting at `start`, leaf first.
///
/// Every returned node is visited at most once, so the result is finite
/// even when the links form a cycle.
fn collect_chain<'n, N>(
    start: &'n N,
    nodes: &'n [N],
    link_of: &impl Fn(&N) -> Option<&str>,
    id_of: &impl Fn(&N) -> Option<&str>,
) -> (Vec<&'n N>, ChainEnd) {
    let mut chain: Vec<&'n N> = vec![start];
    let mut visited: Vec<*const N> = vec![std::ptr::from_ref(start)];
    let mut current = start;

    loop {
        let Some(link) = link_of(current) else {
            return (chain, ChainEnd::Root);
        };
        let Some(next) = nodes
            .iter()
            .find(|candidate| id_of(*candidate) == Some(link))
        else {
            return (chain, ChainEnd::MissingLink(link.to_string()));
        };
        if visited.contains(&std::ptr::from_ref(next)) {
            return (chain, ChainEnd::Cycle(link.to_string()));
        }
        chain.push(next);
        visited.push(std::ptr::from_ref(next));
        current = next;
    }
}

/// Walk the chain from `start` leaf-to-root, threading a value through
/// `callback` at each node.
///
/// The callback receives the node and the result of the previous call
/// (`None` at the leaf). Returns the final value and how the chain
/// ended; a callback error aborts the walk.
pub fn walk_chain_id_call<N, T>(
    start: &N,
    nodes: &[N],
    link_of: impl Fn(&N) -> Option<&str>,
    id_of: impl Fn(&N) -> Option<&str>,
    mut callback: impl FnMut(&N, Option<T>) -> Result<T>,
) -> Result<(T, ChainEnd)> {
    let (chain, end) = collect_chain(start, nodes, &link_of, &id_of);
    let mut carried = None;
    for node in chain {
        carried = Some(callback(node, carried.take())?);
    }
    // chain always holds at least `start`, so the callback ran.
    let Some(value) = carried else { unreachable!() };
    Ok((value, end))
}

/// Walk the chain from `start` and merge node values root-to-leaf.
///
/// `value_of` extracts each node's contribution; nodes without one are
/// skipped. The root's value is the base and each step toward the leaf
/// merges over it, so the leaf wins conflicts. Returns `None` when no
/// node on the chain carries a value.
pub fn walk_chain_id_merge<N>(
    start: &N,
    nodes: &[N],
    link_of: impl Fn(&N) -> Option<&str>,
    id_of: impl Fn(&N) -> Option<&str>,
    value_of: impl Fn(&N) -> Option<&serde_json::Value>,
    merge: impl Fn(serde_json::Value, serde_json::Value) -> serde_json::Value,
) -> (Option<serde_json::Value>, ChainEnd) {
    let (chain, end) = collect_chain(start, nodes, &link_of, &id_of);
    let mut merged: Option<serde_json::Value> = None;
    for node in chain.into_iter().rev() {
        if let Some(value) = value_of(node) {
            merged = Some(match merged.take() {
                None => value.clone(),
                Some(base) => merge(base, value.clone()),
            });
        }
    }
    (merged, end)
}
