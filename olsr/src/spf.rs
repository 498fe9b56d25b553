//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::types::FaceId;

// What produced a routing table entry.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum VertexType {
    Origin,
    // Nodes at radius one.
    Neighbor,
    // Nodes at radius two.
    TwoHop,
    Topology,
    // Not vertex types proper; used to tag routes derived from MID aliases
    // and HNA prefixes during table construction.
    Mid,
    Hna,
}

// The link chosen to reach a one-hop neighbor vertex.
#[derive(Clone, Copy, Debug, new)]
pub struct VertexLink {
    pub face_id: FaceId,
    pub remote_addr: Ipv4Addr,
}

// A vertex in the shortest-path tree.
//
// The main protocol address of the OLSR node is the unique vertex
// identifier.
#[derive(Clone, Debug, new)]
pub struct Vertex {
    pub main_addr: Ipv4Addr,
    pub vtype: VertexType,
    // The node from which this vertex was learned.
    pub producer: Ipv4Addr,
    // Set for one-hop neighbor vertices only; paths through the vertex
    // inherit it as their first hop.
    pub link: Option<VertexLink>,
}

// One computed path: a destination, the radius-one vertex the path enters
// the network through, and the total path cost.
#[derive(Debug, Eq, PartialEq, new)]
pub struct RouteCmd {
    pub dest: Ipv4Addr,
    pub first_hop: Ipv4Addr,
    pub metric: u32,
}

#[derive(Debug, Default)]
pub struct Spt {
    vertices: BTreeMap<Ipv4Addr, Vertex>,
    edges: BTreeMap<Ipv4Addr, Vec<(Ipv4Addr, u32)>>,
}

// ===== impl Spt =====

impl Spt {
    // Adds a vertex. Returns false if a vertex with the same address is
    // already present.
    pub(crate) fn add_vertex(&mut self, vertex: Vertex) -> bool {
        match self.vertices.contains_key(&vertex.main_addr) {
            true => false,
            false => {
                self.vertices.insert(vertex.main_addr, vertex);
                true
            }
        }
    }

    pub(crate) fn contains(&self, addr: Ipv4Addr) -> bool {
        self.vertices.contains_key(&addr)
    }

    pub(crate) fn vertex(&self, addr: Ipv4Addr) -> Option<&Vertex> {
        self.vertices.get(&addr)
    }

    pub(crate) fn add_edge(&mut self, from: Ipv4Addr, to: Ipv4Addr, weight: u32) {
        self.edges.entry(from).or_default().push((to, weight));
    }

    // Computes shortest paths from the given origin vertex.
    //
    // Returns one command per reached destination, excluding the origin
    // itself.
    pub(crate) fn compute(&self, origin: Ipv4Addr) -> Vec<RouteCmd> {
        // Shortest-path tree: destination -> (cost, first hop).
        let mut spt: BTreeMap<Ipv4Addr, (u32, Option<Ipv4Addr>)> =
            BTreeMap::new();
        // Candidate list keyed by (cost, address) so the cheapest vertex
        // is always first.
        let mut cand_list: BTreeMap<(u32, Ipv4Addr), Option<Ipv4Addr>> =
            BTreeMap::new();
        cand_list.insert((0, origin), None);

        while let Some(((cost, addr), first_hop)) = cand_list.pop_first() {
            spt.insert(addr, (cost, first_hop));

            for (next, weight) in
                self.edges.get(&addr).into_iter().flatten()
            {
                // Already on the shortest-path tree.
                if spt.contains_key(next) {
                    continue;
                }

                let next_cost = cost.saturating_add(*weight);
                // Paths starting at the origin enter the network through
                // the adjacent vertex itself.
                let next_first_hop = first_hop.or(Some(*next));

                // Keep only the cheapest candidate per vertex.
                if let Some((cand_key, _)) = cand_list
                    .iter()
                    .find(|((_, cand_addr), _)| cand_addr == next)
                {
                    if cand_key.0 <= next_cost {
                        continue;
                    }
                    let cand_key = *cand_key;
                    cand_list.remove(&cand_key);
                }
                cand_list.insert((next_cost, *next), next_first_hop);
            }
        }

        spt.into_iter()
            .filter(|(addr, _)| *addr != origin)
            .filter_map(|(addr, (cost, first_hop))| {
                first_hop.map(|first_hop| RouteCmd::new(addr, first_hop, cost))
            })
            .collect()
    }
}

// ===== tests =====

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> Ipv4Addr {
        Ipv4Addr::new(192, 0, 2, last)
    }

    fn vertex(last: u8, vtype: VertexType) -> Vertex {
        Vertex::new(addr(last), vtype, addr(last), None)
    }

    #[test]
    fn test_single_hop() {
        let mut spt = Spt::default();
        spt.add_vertex(vertex(1, VertexType::Origin));
        spt.add_vertex(vertex(2, VertexType::Neighbor));
        spt.add_edge(addr(1), addr(2), 5);

        let cmds = spt.compute(addr(1));
        assert_eq!(cmds, vec![RouteCmd::new(addr(2), addr(2), 5)]);
    }

    #[test]
    fn test_metric_is_sum_of_edge_weights() {
        // 1 -> 2 -> 3 -> 4, plus a costlier shortcut 1 -> 4.
        let mut spt = Spt::default();
        spt.add_vertex(vertex(1, VertexType::Origin));
        spt.add_vertex(vertex(2, VertexType::Neighbor));
        spt.add_vertex(vertex(3, VertexType::TwoHop));
        spt.add_vertex(vertex(4, VertexType::Topology));
        spt.add_edge(addr(1), addr(2), 1);
        spt.add_edge(addr(2), addr(3), 1);
        spt.add_edge(addr(3), addr(4), 1);
        spt.add_edge(addr(1), addr(4), 10);

        let cmds = spt.compute(addr(1));
        let to4 = cmds.iter().find(|cmd| cmd.dest == addr(4)).unwrap();
        assert_eq!(to4.metric, 3);
        assert_eq!(to4.first_hop, addr(2));
    }

    #[test]
    fn test_cheaper_first_hop_wins() {
        // Two neighbors reach the same two-hop node; the path through the
        // cheaper neighbor must be chosen.
        let mut spt = Spt::default();
        spt.add_vertex(vertex(1, VertexType::Origin));
        spt.add_vertex(vertex(2, VertexType::Neighbor));
        spt.add_vertex(vertex(3, VertexType::Neighbor));
        spt.add_vertex(vertex(4, VertexType::TwoHop));
        spt.add_edge(addr(1), addr(2), 4);
        spt.add_edge(addr(1), addr(3), 1);
        spt.add_edge(addr(2), addr(4), 1);
        spt.add_edge(addr(3), addr(4), 1);

        let cmds = spt.compute(addr(1));
        let to4 = cmds.iter().find(|cmd| cmd.dest == addr(4)).unwrap();
        assert_eq!(to4.first_hop, addr(3));
        assert_eq!(to4.metric, 2);
    }

    #[test]
    fn test_unreachable_vertex_produces_no_route() {
        let mut spt = Spt::default();
        spt.add_vertex(vertex(1, VertexType::Origin));
        spt.add_vertex(vertex(2, VertexType::Neighbor));
        spt.add_vertex(vertex(9, VertexType::Topology));
        spt.add_edge(addr(1), addr(2), 1);
        // No edge leads to 9.

        let cmds = spt.compute(addr(1));
        assert!(cmds.iter().all(|cmd| cmd.dest != addr(9)));
    }
}
