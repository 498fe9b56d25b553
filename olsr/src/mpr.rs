//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use itertools::Itertools;

use crate::debug::Debug;
use crate::error::Error;
use crate::instance::{InstanceArenas, InstanceView};
use crate::types::{NeighborId, TwoHopNodeId, Willingness};

// A neighbor eligible for MPR selection: symmetric and willing.
#[derive(Debug)]
pub(crate) struct MprCandidate {
    pub id: NeighborId,
    pub willingness: Willingness,
    // The neighbor's own symmetric neighborhood size, itself excluded.
    pub degree: u32,
    // Strict two-hop nodes reachable through this neighbor.
    pub covers: Vec<TwoHopNodeId>,
}

// ===== global functions =====

// Runs MPR selection over the current neighborhood and updates the per
// neighbor `is_mpr` flags and per two-hop-node coverage counts.
//
// Returns true if the MPR set changed.
pub(crate) fn select_mprs(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
) -> bool {
    let now = Instant::now();
    let coverage = view.config.mpr_coverage;

    // Gather the candidate set N and the coverage relation towards N2.
    let mut candidates: BTreeMap<NeighborId, MprCandidate> = arenas
        .neighbors
        .iter(&arenas.neighbor_arena)
        .filter(|nbr| nbr.is_sym && nbr.willingness != Willingness::NEVER)
        .map(|nbr| {
            (
                nbr.id,
                MprCandidate {
                    id: nbr.id,
                    willingness: nbr.willingness,
                    degree: nbr.degree,
                    covers: vec![],
                },
            )
        })
        .collect();

    for l2 in arenas.twohop_links.iter(&arenas.twohop_link_arena) {
        let Ok((_, n2)) = arenas
            .twohop_nodes
            .get_by_id(&arenas.twohop_node_arena, l2.dest_id)
        else {
            continue;
        };
        if !n2.is_strict {
            continue;
        }
        // The path to the two-hop node must enter through a symmetric link.
        let Ok((_, nexthop)) = arenas
            .neighbors
            .get_by_id(&arenas.neighbor_arena, l2.nexthop_id)
        else {
            continue;
        };
        if !nexthop.is_sym {
            continue;
        }
        if let Some(candidate) = candidates.get_mut(&l2.nexthop_id) {
            candidate.covers.push(l2.dest_id);
        }
    }

    let candidates = candidates.into_values().collect::<Vec<_>>();
    let mpr_set = compute(&candidates, coverage);

    // Apply the result.
    let mut changed = false;
    for (_, nbr) in arenas.neighbor_arena.iter_mut() {
        let is_mpr = mpr_set.contains(&nbr.id);
        if nbr.is_mpr != is_mpr {
            nbr.is_mpr = is_mpr;
            changed = true;
        }
    }

    // Record per-node coverage for introspection and verify the cover.
    let mut coverage_count: BTreeMap<TwoHopNodeId, u32> = BTreeMap::new();
    for candidate in &candidates {
        if !mpr_set.contains(&candidate.id) {
            continue;
        }
        for n2_id in candidate.covers.iter().unique() {
            *coverage_count.entry(*n2_id).or_default() += 1;
        }
    }
    let reachable = candidates
        .iter()
        .flat_map(|candidate| candidate.covers.iter().copied())
        .collect::<BTreeSet<_>>();
    for (_, n2) in arenas.twohop_node_arena.iter_mut() {
        n2.coverage = coverage_count.get(&n2.id).copied().unwrap_or(0);
        if n2.is_strict && reachable.contains(&n2.id) && n2.coverage == 0 {
            Error::BadTwoHopCoverage(n2.id).log();
        }
    }

    if changed {
        Debug::MprSetChange(mpr_set.len()).log();
    }
    changed
}

// The MPR selection heuristic of RFC 3626 section 8.3.1, generalized so
// that every reachable strict two-hop node ends up covered by at least
// `coverage` MPRs (or by all of its covering neighbors, whichever is
// smaller).
pub(crate) fn compute(
    candidates: &[MprCandidate],
    coverage: u32,
) -> BTreeSet<NeighborId> {
    let mut mpr_set: BTreeSet<NeighborId> = BTreeSet::new();

    // Required coverage per two-hop node, bounded by what is achievable.
    let mut coverers: BTreeMap<TwoHopNodeId, Vec<NeighborId>> =
        BTreeMap::new();
    for candidate in candidates {
        for n2_id in candidate.covers.iter().unique() {
            coverers.entry(*n2_id).or_default().push(candidate.id);
        }
    }
    let needed: BTreeMap<TwoHopNodeId, u32> = coverers
        .iter()
        .map(|(n2_id, list)| {
            (*n2_id, std::cmp::min(coverage, list.len() as u32))
        })
        .collect();
    let mut covered: BTreeMap<TwoHopNodeId, u32> =
        coverers.keys().map(|n2_id| (*n2_id, 0)).collect();

    let add_mpr = |mpr_set: &mut BTreeSet<NeighborId>,
                   covered: &mut BTreeMap<TwoHopNodeId, u32>,
                   candidate: &MprCandidate| {
        if mpr_set.insert(candidate.id) {
            for n2_id in candidate.covers.iter().unique() {
                *covered.get_mut(n2_id).unwrap() += 1;
            }
        }
    };

    // Neighbors with willingness ALWAYS are always selected.
    for candidate in candidates {
        if candidate.willingness == Willingness::ALWAYS {
            add_mpr(&mut mpr_set, &mut covered, candidate);
        }
    }

    // Select every neighbor which is the only path to some two-hop node,
    // or one of so few paths that all of them are required.
    for list in coverers.values() {
        if list.len() as u32 <= coverage {
            for nbr_id in list {
                let candidate = candidates
                    .iter()
                    .find(|candidate| candidate.id == *nbr_id)
                    .unwrap();
                add_mpr(&mut mpr_set, &mut covered, candidate);
            }
        }
    }

    // Greedily cover the remaining nodes, preferring high willingness,
    // then high residual reachability, then high degree.
    loop {
        let is_satisfied = |covered: &BTreeMap<TwoHopNodeId, u32>| {
            covered.iter().all(|(n2_id, count)| *count >= needed[n2_id])
        };
        if is_satisfied(&covered) {
            break;
        }

        let best = candidates
            .iter()
            .filter(|candidate| !mpr_set.contains(&candidate.id))
            .map(|candidate| {
                // Residual reachability: two-hop nodes still in need of
                // coverage which this neighbor can reach.
                let reach = candidate
                    .covers
                    .iter()
                    .unique()
                    .filter(|n2_id| covered[n2_id] < needed[n2_id])
                    .count();
                (candidate, reach)
            })
            .filter(|(_, reach)| *reach > 0)
            .max_by_key(|(candidate, reach)| {
                (candidate.willingness, *reach, candidate.degree)
            });

        match best {
            Some((candidate, _)) => {
                add_mpr(&mut mpr_set, &mut covered, candidate);
            }
            // No remaining candidate improves coverage; the cover is as
            // good as the topology allows.
            None => break,
        }
    }

    mpr_set
}

// ===== tests =====

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(
        id: NeighborId,
        willingness: Willingness,
        degree: u32,
        covers: &[TwoHopNodeId],
    ) -> MprCandidate {
        MprCandidate {
            id,
            willingness,
            degree,
            covers: covers.to_vec(),
        }
    }

    #[test]
    fn test_sole_coverer_is_selected() {
        let candidates = vec![
            candidate(1, Willingness::DEFAULT, 2, &[10, 11]),
            candidate(2, Willingness::DEFAULT, 1, &[11]),
        ];
        let mprs = compute(&candidates, 1);
        // Only neighbor 1 reaches node 10, so it must be an MPR, and it
        // also covers node 11.
        assert_eq!(mprs, BTreeSet::from([1]));
    }

    #[test]
    fn test_will_always_is_selected() {
        let candidates = vec![
            candidate(1, Willingness::ALWAYS, 0, &[]),
            candidate(2, Willingness::DEFAULT, 1, &[10]),
        ];
        let mprs = compute(&candidates, 1);
        assert!(mprs.contains(&1));
        assert!(mprs.contains(&2));
    }

    #[test]
    fn test_willingness_breaks_ties() {
        // Both neighbors cover both nodes; the more willing one wins.
        let candidates = vec![
            candidate(1, Willingness::LOW, 2, &[10, 11]),
            candidate(2, Willingness::HIGH, 2, &[10, 11]),
        ];
        let mprs = compute(&candidates, 1);
        assert_eq!(mprs, BTreeSet::from([2]));
    }

    #[test]
    fn test_reachability_breaks_ties() {
        let candidates = vec![
            candidate(1, Willingness::DEFAULT, 1, &[10]),
            candidate(2, Willingness::DEFAULT, 3, &[10, 11, 12]),
        ];
        let mprs = compute(&candidates, 1);
        assert_eq!(mprs, BTreeSet::from([2]));
    }

    #[test]
    fn test_degree_breaks_ties() {
        // Equal willingness and equal residual reach; the neighbor with
        // the larger one-hop neighborhood of its own wins.
        let candidates = vec![
            candidate(1, Willingness::DEFAULT, 2, &[10]),
            candidate(2, Willingness::DEFAULT, 7, &[10]),
        ];
        let mprs = compute(&candidates, 1);
        assert_eq!(mprs, BTreeSet::from([2]));
    }

    #[test]
    fn test_full_cover() {
        // Three two-hop nodes, no single neighbor covers all.
        let candidates = vec![
            candidate(1, Willingness::DEFAULT, 2, &[10, 11]),
            candidate(2, Willingness::DEFAULT, 1, &[12]),
            candidate(3, Willingness::DEFAULT, 1, &[11]),
        ];
        let mprs = compute(&candidates, 1);
        assert!(mprs.contains(&1));
        assert!(mprs.contains(&2));
        // Node 11 is already covered by neighbor 1.
        assert!(!mprs.contains(&3));
    }

    #[test]
    fn test_mpr_coverage_two() {
        let candidates = vec![
            candidate(1, Willingness::DEFAULT, 1, &[10]),
            candidate(2, Willingness::DEFAULT, 1, &[10]),
            candidate(3, Willingness::DEFAULT, 1, &[10]),
        ];
        // With MPR_COVERAGE=2, two of the three coverers are required.
        let mprs = compute(&candidates, 2);
        assert_eq!(mprs.len(), 2);
    }

    #[test]
    fn test_never_willing_candidates_are_not_offered() {
        // Callers exclude WILL_NEVER neighbors from the candidate set; a
        // lone coverer is still selected regardless of low willingness.
        let candidates = vec![candidate(1, Willingness::LOW, 1, &[10])];
        let mprs = compute(&candidates, 1);
        assert_eq!(mprs, BTreeSet::from([1]));
    }

    #[test]
    fn test_empty_neighborhood() {
        assert!(compute(&[], 1).is_empty());
    }
}
