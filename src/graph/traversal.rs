//! Multi-hop neighbor queries with direction alternation.
//!
//! Each requested verb is walked independently from the start node. After
//! every hop the direction marker flips, so distance 2 along `>Purchased`
//! means "items I purchased, then everyone who purchased those items".

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{GraphError, Result};
use crate::graph::{DirectedVerb, NodeRef};
use crate::store::EdgeStore;

/// Validate a caller-supplied distance; only positive values are defined.
pub fn checked_distance(distance: i64) -> Result<usize> {
    if distance < 1 {
        return Err(GraphError::InvalidDistance(distance));
    }
    usize::try_from(distance).map_err(|_| GraphError::InvalidDistance(distance))
}

fn ensure_positive(distance: usize) -> Result<()> {
    if distance == 0 {
        return Err(GraphError::InvalidDistance(0));
    }
    Ok(())
}

/// Canonical strings of every node reachable in exactly `distance` hops,
/// unioned over `verbs`.
///
/// The start node may appear in the result at even distances.
pub async fn neighbors(
    store: &EdgeStore,
    start: &NodeRef,
    verbs: &[DirectedVerb],
    distance: usize,
) -> Result<BTreeSet<String>> {
    ensure_positive(distance)?;

    let mut result = BTreeSet::new();
    for verb in verbs {
        let mut frontier = vec![start.canonical().to_string()];
        let mut current = verb.clone();

        for _ in 0..distance {
            let mut next = BTreeSet::new();
            for members in store.expand(&frontier, &current).await? {
                next.extend(members);
            }
            current = current.flipped();
            frontier = next.into_iter().collect();
            if frontier.is_empty() {
                break;
            }
        }

        result.extend(frontier);
    }

    log::debug!(
        "neighbors({}, {} verb(s), distance {}) -> {} node(s)",
        start,
        verbs.len(),
        distance,
        result.len()
    );
    Ok(result)
}

/// Like [`neighbors`], but counts the traversal paths reaching each node.
///
/// A node reached `n` times at one hop expands with weight `n` at the next.
/// Counts from different verbs are summed and saturate at `u64::MAX`.
/// Output is sorted ascending by `(count, node)` and then reversed, so ties
/// put the larger canonical string first.
pub async fn ranked_neighbors(
    store: &EdgeStore,
    start: &NodeRef,
    verbs: &[DirectedVerb],
    distance: usize,
) -> Result<Vec<(u64, String)>> {
    ensure_positive(distance)?;

    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    for verb in verbs {
        let mut frontier: BTreeMap<String, u64> = BTreeMap::from([(start.canonical().to_string(), 1)]);
        let mut current = verb.clone();

        for _ in 0..distance {
            let (nodes, weights): (Vec<String>, Vec<u64>) = frontier.into_iter().unzip();
            let mut next: BTreeMap<String, u64> = BTreeMap::new();
            for (members, weight) in store.expand(&nodes, &current).await?.into_iter().zip(weights) {
                for member in members {
                    let count = next.entry(member).or_insert(0);
                    *count = count.saturating_add(weight);
                }
            }
            current = current.flipped();
            frontier = next;
            if frontier.is_empty() {
                break;
            }
        }

        for (node, count) in frontier {
            let total = totals.entry(node).or_insert(0);
            *total = total.saturating_add(count);
        }
    }

    let mut ranked: Vec<(u64, String)> = totals.into_iter().map(|(node, count)| (count, node)).collect();
    ranked.sort();
    ranked.reverse();

    log::debug!(
        "ranked_neighbors({}, {} verb(s), distance {}) -> {} node(s)",
        start,
        verbs.len(),
        distance,
        ranked.len()
    );
    Ok(ranked)
}
