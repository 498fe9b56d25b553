//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::time::Instant;

use ipnetwork::Ipv4Network;
use olsr_utils::task::TimeoutTask;

use crate::debug::Debug;
use crate::error::Error;
use crate::instance::{InstanceArenas, InstanceView};
use crate::neighbor;
use crate::packet::{HnaMessage, MessageHdr};
use crate::route;
use crate::tasks;
use crate::tasks::messages::input::ExpiryMsg;
use crate::types::{ExternalId, ObjectId, eight_bit_time};

// A prefix another node redistributes into OLSR, learned from its HNA
// advertisements.
#[derive(Debug)]
pub struct ExternalRoute {
    pub id: ExternalId,
    pub dest: Ipv4Network,
    pub lasthop: Ipv4Addr,
    pub distance: u16,
    pub hold_time: Instant,
    pub(crate) hold_timer: Option<TimeoutTask>,
}

// A prefix this node redistributes into OLSR. Originated prefixes never
// expire; they are withdrawn administratively.
#[derive(Debug)]
pub struct OriginatedRoute {
    pub id: ExternalId,
    pub dest: Ipv4Network,
}

#[derive(Debug, Default)]
pub struct ExternalRoutes {
    routes_in: BTreeMap<ExternalId, ExternalRoute>,
    // Entries per destination ordered by (distance, lasthop), so the first
    // entry is the elected route source for that destination.
    routes_in_by_dest: BTreeMap<Ipv4Network, BTreeSet<(u16, Ipv4Addr, ExternalId)>>,
    routes_out: BTreeMap<ExternalId, OriginatedRoute>,
    routes_out_by_dest: BTreeMap<Ipv4Network, ExternalId>,
    next_id: ObjectId,
}

// ===== impl ExternalRoutes =====

impl ExternalRoutes {
    pub fn iter_in(&self) -> impl Iterator<Item = &ExternalRoute> {
        self.routes_in.values()
    }

    pub fn iter_out(&self) -> impl Iterator<Item = &OriginatedRoute> {
        self.routes_out.values()
    }

    pub(crate) fn has_routes_out(&self) -> bool {
        !self.routes_out.is_empty()
    }

    // Returns, for every destination with learned entries, the entry with
    // the shortest distance (ties broken by lowest last-hop address).
    pub(crate) fn elected(&self) -> impl Iterator<Item = &ExternalRoute> {
        self.routes_in_by_dest.values().filter_map(|entries| {
            entries
                .first()
                .map(|(_, _, erid)| &self.routes_in[erid])
        })
    }

    fn update_route_in(
        &mut self,
        dest: Ipv4Network,
        lasthop: Ipv4Addr,
        distance: u16,
        hold_time: Instant,
    ) -> (ExternalId, bool) {
        // One entry per (destination, lasthop) pair.
        let found = self
            .routes_in_by_dest
            .get(&dest)
            .into_iter()
            .flatten()
            .find(|(_, entry_lasthop, _)| *entry_lasthop == lasthop)
            .copied();

        if let Some((old_distance, _, erid)) = found {
            let er = self.routes_in.get_mut(&erid).unwrap();
            er.hold_time = hold_time;
            if old_distance != distance {
                // Re-sort the entry under its new distance.
                er.distance = distance;
                let entries = self.routes_in_by_dest.get_mut(&dest).unwrap();
                entries.remove(&(old_distance, lasthop, erid));
                entries.insert((distance, lasthop, erid));
            }
            return (erid, old_distance != distance);
        }

        self.next_id += 1;
        let erid = self.next_id;
        Debug::HnaRouteCreate(&dest, &lasthop).log();
        self.routes_in.insert(
            erid,
            ExternalRoute {
                id: erid,
                dest,
                lasthop,
                distance,
                hold_time,
                hold_timer: None,
            },
        );
        self.routes_in_by_dest
            .entry(dest)
            .or_default()
            .insert((distance, lasthop, erid));

        (erid, true)
    }

    fn delete_route_in(&mut self, erid: ExternalId) -> Result<(), Error> {
        let er = self
            .routes_in
            .remove(&erid)
            .ok_or(Error::BadExternalRoute(erid))?;

        Debug::HnaRouteDelete(&er.dest, &er.lasthop).log();
        if let Some(entries) = self.routes_in_by_dest.get_mut(&er.dest) {
            entries.remove(&(er.distance, er.lasthop, erid));
            if entries.is_empty() {
                self.routes_in_by_dest.remove(&er.dest);
            }
        }

        Ok(())
    }

    // Starts redistributing the given prefix. Returns false if the prefix
    // is already originated.
    pub(crate) fn originate(&mut self, dest: Ipv4Network) -> bool {
        if self.routes_out_by_dest.contains_key(&dest) {
            return false;
        }

        self.next_id += 1;
        let erid = self.next_id;
        self.routes_out.insert(erid, OriginatedRoute { id: erid, dest });
        self.routes_out_by_dest.insert(dest, erid);

        true
    }

    // Stops redistributing the given prefix.
    pub(crate) fn withdraw(&mut self, dest: Ipv4Network) -> Result<(), Error> {
        let erid = self
            .routes_out_by_dest
            .remove(&dest)
            .ok_or(Error::BadExternalRoute(0))?;
        self.routes_out.remove(&erid);

        Ok(())
    }
}

impl std::fmt::Display for ExternalRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "hna {} via {} distance {}",
            self.dest, self.lasthop, self.distance
        )
    }
}

// ===== global functions =====

// Processes a received HNA message (RFC 3626 section 12.5).
pub(crate) fn process_hna(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
    src: Ipv4Addr,
    hdr: &MessageHdr,
    hna: &HnaMessage,
) -> Result<(), Error> {
    let now = Instant::now();

    // The sender interface must belong to a symmetric one-hop neighbor.
    if !neighbor::is_sym_neighbor_addr(arenas, now, src) {
        return Err(Error::NonNeighborOrigin("HNA", src));
    }

    let vtime = eight_bit_time::to_duration(hdr.vtime);
    let hold_time = now + vtime;
    // The hop count has not yet been incremented for forwarding.
    let distance = u16::from(hdr.hop_count) + 1;

    let mut changed = false;
    for dest in &hna.networks {
        let (erid, created) = view.state.external.update_route_in(
            *dest,
            hdr.origin,
            distance,
            hold_time,
        );
        changed |= created;

        let task = tasks::expiry_timer(
            ExpiryMsg::External(erid),
            vtime,
            &view.tx.expiry,
        );
        view.state.external.routes_in.get_mut(&erid).unwrap().hold_timer =
            Some(task);
    }

    if changed {
        route::schedule_route_update(view.state, view.tx);
    }

    Ok(())
}

// Handles the expiry of a learned HNA entry's validity timer.
pub(crate) fn process_hna_expiry(
    view: &mut InstanceView<'_>,
    erid: ExternalId,
) {
    let Some(er) = view.state.external.routes_in.get(&erid) else {
        return;
    };

    if er.hold_time <= Instant::now() {
        let _ = view.state.external.delete_route_in(erid);
        route::schedule_route_update(view.state, view.tx);
    }
}
