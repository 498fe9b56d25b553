//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, VecDeque};
use std::net::Ipv4Addr;
use std::time::Instant;

use ipnetwork::Ipv4Network;

use crate::debug::Debug;
use crate::error::{Error, IoError};
use crate::instance::{
    InstanceArenas, InstanceState, InstanceView, ProtocolInputChannelsTx,
};
use crate::io::{PolicyFilter, PolicyResult, PolicyTags, RouteAttrs};
use crate::spf::{Spt, Vertex, VertexLink, VertexType};
use crate::tasks::messages::input::RouteUpdateMsg;
use crate::types::{FaceId, Willingness};

// Maximum number of RIB operations in flight at once. Further operations
// queue until completions drain the window.
pub const RIB_WINDOW: usize = 100;

// One host or prefix route produced by the shortest-path computation.
#[derive(Clone, Debug)]
pub struct RouteEntry {
    // What produced the route.
    pub dest_type: VertexType,
    // Who produced the route.
    pub originator: Ipv4Addr,
    // The main address of the destination node.
    pub main_addr: Ipv4Addr,
    pub nexthop: Ipv4Addr,
    pub face_id: FaceId,
    pub metric: u32,
    // Routes rejected by policy stay in the table but are not pushed to
    // the RIB.
    pub filtered: bool,
}

// A RIB operation waiting for its turn in the window.
#[derive(Debug)]
pub enum RibOp {
    Add {
        net: Ipv4Network,
        nexthop: Ipv4Addr,
        face_id: FaceId,
        metric: u32,
        tags: PolicyTags,
    },
    Replace {
        net: Ipv4Network,
        nexthop: Ipv4Addr,
        face_id: FaceId,
        metric: u32,
        tags: PolicyTags,
    },
    Delete {
        net: Ipv4Network,
    },
}

#[derive(Debug, Default)]
pub struct RouteTable {
    // The committed routing table.
    pub routes: BTreeMap<Ipv4Network, RouteEntry>,
    rib_queue: VecDeque<RibOp>,
    rib_in_flight: usize,
}

// ===== impl RouteEntry =====

impl std::fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} route to {} nexthop {} metric {}",
            self.dest_type, self.main_addr, self.nexthop, self.metric
        )
    }
}

// ===== global functions =====

// Requests a route recomputation. Requests made while one is already
// pending collapse into a single recomputation.
pub(crate) fn schedule_route_update(
    state: &mut InstanceState,
    tx: &ProtocolInputChannelsTx,
) {
    if state.route_update_pending {
        return;
    }
    state.route_update_pending = true;
    let _ = tx.route_update.send(RouteUpdateMsg {});
}

pub(crate) fn process_route_update(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
) {
    if !view.state.route_update_pending {
        return;
    }
    view.state.route_update_pending = false;
    recompute_routes(view, arenas);
}

// Rebuilds the routing table from scratch: shortest-path tree over the
// neighborhood and topology databases, MID aliases, then HNA prefixes.
pub(crate) fn recompute_routes(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
) {
    Debug::RouteRecompute.log();

    let now = Instant::now();
    let origin = view.state.main_addr;

    let mut spt = Spt::default();
    spt.add_vertex(Vertex::new(origin, VertexType::Origin, origin, None));

    // Add one vertex and edge per symmetric, willing one-hop neighbor,
    // choosing the cheapest symmetric link to reach it.
    for nbr in arenas.neighbors.iter(&arenas.neighbor_arena) {
        if !nbr.is_sym || nbr.willingness == Willingness::NEVER {
            continue;
        }

        let best_link = nbr
            .links
            .iter()
            .filter_map(|link_id| {
                arenas
                    .links
                    .get_by_id(&arenas.link_arena, *link_id)
                    .ok()
                    .map(|(_, link)| link)
            })
            .filter(|link| link.is_sym(now))
            .filter_map(|link| {
                arenas
                    .faces
                    .get_by_id(&arenas.face_arena, link.face_id)
                    .ok()
                    .map(|(_, face)| (face.cost, link))
            })
            .min_by_key(|(cost, link)| (*cost, link.remote_addr));

        let Some((face_cost, link)) = best_link else {
            Error::BadLinkCoverage(nbr.id).log();
            continue;
        };

        // Prefer willing nodes and MPR selectors as next hops.
        let mut cost = face_cost
            + u32::from(Willingness::MAX - nbr.willingness.get());
        if !nbr.is_mpr_selector(now) {
            cost += 1;
        }

        spt.add_vertex(Vertex::new(
            nbr.main_addr,
            VertexType::Neighbor,
            nbr.main_addr,
            Some(VertexLink::new(link.face_id, link.remote_addr)),
        ));
        spt.add_edge(origin, nbr.main_addr, cost);
    }

    // Add the strict two-hop neighborhood.
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
        let Ok((_, nbr)) = arenas
            .neighbors
            .get_by_id(&arenas.neighbor_arena, l2.nexthop_id)
        else {
            continue;
        };
        if !spt.contains(nbr.main_addr) {
            continue;
        }

        if !spt.contains(n2.main_addr) {
            spt.add_vertex(Vertex::new(
                n2.main_addr,
                VertexType::TwoHop,
                nbr.main_addr,
                None,
            ));
        }
        spt.add_edge(nbr.main_addr, n2.main_addr, 1);
    }

    // Add the learned topology. Entries are visited in order of increasing
    // distance so that chains of TC links resolve in a single pass.
    let mut tc_entries =
        view.state.topology.iter().collect::<Vec<_>>();
    tc_entries.sort_by_key(|tc| (tc.distance, tc.destination, tc.lasthop));
    for tc in tc_entries {
        if !spt.contains(tc.lasthop) {
            continue;
        }
        if !spt.contains(tc.destination) {
            spt.add_vertex(Vertex::new(
                tc.destination,
                VertexType::Topology,
                tc.lasthop,
                None,
            ));
        }
        spt.add_edge(tc.lasthop, tc.destination, 1);
    }

    // Run the shortest-path computation and derive host routes.
    let mut new_routes: BTreeMap<Ipv4Network, RouteEntry> = BTreeMap::new();
    for cmd in spt.compute(origin) {
        let node = spt.vertex(cmd.dest).unwrap();
        let Some(first_hop_link) =
            spt.vertex(cmd.first_hop).and_then(|vertex| vertex.link)
        else {
            continue;
        };

        // One-hop neighbors are reached through the address advertised on
        // the chosen link; everything farther is reached through its main
        // address, via the link of the first hop.
        let (dest_addr, link) = match node.vtype {
            VertexType::Neighbor => {
                let link = node.link.unwrap();
                (link.remote_addr, link)
            }
            _ => (node.main_addr, first_hop_link),
        };

        let entry = RouteEntry {
            dest_type: node.vtype,
            originator: node.producer,
            main_addr: node.main_addr,
            nexthop: link.remote_addr,
            face_id: link.face_id,
            metric: cmd.metric,
            filtered: false,
        };
        new_routes
            .entry(Ipv4Network::from(dest_addr))
            .or_insert(entry.clone());

        // A one-hop neighbor whose link address differs from its main
        // address gets a route to both.
        if node.vtype == VertexType::Neighbor && node.main_addr != dest_addr
        {
            new_routes
                .entry(Ipv4Network::from(node.main_addr))
                .or_insert(entry.clone());
        }

        // One route per MID alias of the destination.
        for alias in view.state.mid.get_mid_addresses(node.main_addr) {
            if node.vtype == VertexType::Neighbor
                && (alias == dest_addr || alias == node.main_addr)
            {
                continue;
            }
            let mut alias_entry = entry.clone();
            alias_entry.dest_type = VertexType::Mid;
            new_routes
                .entry(Ipv4Network::from(alias))
                .or_insert(alias_entry);
        }
    }

    // Add one prefix route per elected HNA entry whose advertising node is
    // reachable, inheriting nexthop and metric from the route to it.
    let mut hna_routes = vec![];
    for er in view.state.external.elected() {
        let Some(lasthop_rt) =
            new_routes.get(&Ipv4Network::from(er.lasthop))
        else {
            continue;
        };
        let entry = RouteEntry {
            dest_type: VertexType::Hna,
            originator: er.lasthop,
            main_addr: er.lasthop,
            nexthop: lasthop_rt.nexthop,
            face_id: lasthop_rt.face_id,
            metric: lasthop_rt.metric,
            filtered: false,
        };
        hna_routes.push((er.dest, entry));
    }
    for (net, entry) in hna_routes {
        new_routes.entry(net).or_insert(entry);
    }

    commit(view, new_routes);
}

// Commits a freshly computed table against the previous one, queueing the
// resulting RIB operations.
fn commit(
    view: &mut InstanceView<'_>,
    mut new_routes: BTreeMap<Ipv4Network, RouteEntry>,
) {
    let previous = std::mem::take(&mut view.state.routes.routes);

    // Withdraw routes which no longer exist in the new table.
    for (net, old_rt) in &previous {
        if !new_routes.contains_key(net) && !old_rt.filtered {
            Debug::RouteDelete(net).log();
            view.state
                .routes
                .rib_queue
                .push_back(RibOp::Delete { net: *net });
        }
    }

    // Add or replace routes which exist in the new table.
    for (net, rt) in new_routes.iter_mut() {
        match previous.get(net) {
            // The route is new and should be added.
            None => match run_filter(view.policy, *net, rt) {
                Some(tags) => {
                    Debug::RouteAdd(net, &rt.nexthop, rt.metric).log();
                    view.state.routes.rib_queue.push_back(RibOp::Add {
                        net: *net,
                        nexthop: rt.nexthop,
                        face_id: rt.face_id,
                        metric: rt.metric,
                        tags,
                    });
                }
                None => rt.filtered = true,
            },
            // The cost or nexthop changed; replace the route.
            Some(old_rt)
                if old_rt.nexthop != rt.nexthop
                    || old_rt.metric != rt.metric =>
            {
                match run_filter(view.policy, *net, rt) {
                    Some(tags) => {
                        let op = if old_rt.filtered {
                            Debug::RouteAdd(net, &rt.nexthop, rt.metric)
                                .log();
                            RibOp::Add {
                                net: *net,
                                nexthop: rt.nexthop,
                                face_id: rt.face_id,
                                metric: rt.metric,
                                tags,
                            }
                        } else {
                            Debug::RouteReplace(net, &rt.nexthop, rt.metric)
                                .log();
                            RibOp::Replace {
                                net: *net,
                                nexthop: rt.nexthop,
                                face_id: rt.face_id,
                                metric: rt.metric,
                                tags,
                            }
                        };
                        view.state.routes.rib_queue.push_back(op);
                    }
                    None => {
                        if !old_rt.filtered {
                            Debug::RouteDelete(net).log();
                            view.state
                                .routes
                                .rib_queue
                                .push_back(RibOp::Delete { net: *net });
                        }
                        rt.filtered = true;
                    }
                }
            }
            // No change; keep the previous policy decision.
            Some(old_rt) => rt.filtered = old_rt.filtered,
        }
    }

    view.state.routes.routes = new_routes;
    rib_start(view);
}

// Re-runs the policy filters over the committed table without recomputing
// the shortest-path tree, and pushes the resulting changes to the RIB.
pub(crate) fn push_routes(view: &mut InstanceView<'_>) {
    let mut routes = std::mem::take(&mut view.state.routes.routes);

    for (net, rt) in routes.iter_mut() {
        let was_filtered = rt.filtered;
        match run_filter(view.policy, *net, rt) {
            Some(tags) => {
                let op = if was_filtered {
                    RibOp::Add {
                        net: *net,
                        nexthop: rt.nexthop,
                        face_id: rt.face_id,
                        metric: rt.metric,
                        tags,
                    }
                } else {
                    RibOp::Replace {
                        net: *net,
                        nexthop: rt.nexthop,
                        face_id: rt.face_id,
                        metric: rt.metric,
                        tags,
                    }
                };
                view.state.routes.rib_queue.push_back(op);
                rt.filtered = false;
            }
            None => {
                if !was_filtered {
                    view.state
                        .routes
                        .rib_queue
                        .push_back(RibOp::Delete { net: *net });
                }
                rt.filtered = true;
            }
        }
    }

    view.state.routes.routes = routes;
    rib_start(view);
}

// Starts queued RIB operations while the in-flight window has room.
pub(crate) fn rib_start(view: &mut InstanceView<'_>) {
    while view.state.routes.rib_in_flight < RIB_WINDOW {
        let Some(op) = view.state.routes.rib_queue.pop_front() else {
            break;
        };

        let result = match &op {
            RibOp::Add {
                net,
                nexthop,
                face_id,
                metric,
                tags,
            } => view.io.add_route(*net, *nexthop, *face_id, *metric, tags),
            RibOp::Replace {
                net,
                nexthop,
                face_id,
                metric,
                tags,
            } => {
                view.io.replace_route(*net, *nexthop, *face_id, *metric, tags)
            }
            RibOp::Delete { net } => view.io.delete_route(*net),
        };

        match result {
            Ok(()) => view.state.routes.rib_in_flight += 1,
            // Transient failure: log and retry on the next scheduled
            // update.
            Err(error) => match op {
                RibOp::Delete { .. } => {
                    IoError::RouteUninstallError(error).log()
                }
                _ => IoError::RouteInstallError(error).log(),
            },
        }
    }
}

// Handles the completion of one RIB operation.
pub(crate) fn process_rib_completion(
    view: &mut InstanceView<'_>,
    error: Option<String>,
) {
    if let Some(error) = error {
        tracing::warn!(%error, "RIB operation failed");
    }
    view.state.routes.rib_in_flight =
        view.state.routes.rib_in_flight.saturating_sub(1);
    rib_start(view);
}

// Runs the policy filter over one candidate route. A rejected route is
// reported as `None`.
fn run_filter(
    policy: &dyn PolicyFilter,
    net: Ipv4Network,
    rt: &RouteEntry,
) -> Option<PolicyTags> {
    let attrs = RouteAttrs {
        net,
        nexthop: rt.nexthop,
        metric: rt.metric,
        originator: rt.originator,
        main_addr: rt.main_addr,
        dest_type: rt.dest_type,
    };
    match policy.import(&attrs) {
        PolicyResult::Accept(tags) => Some(tags),
        PolicyResult::Reject => None,
    }
}
