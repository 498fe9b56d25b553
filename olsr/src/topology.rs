//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::time::Instant;

use olsr_utils::task::TimeoutTask;

use crate::debug::Debug;
use crate::error::Error;
use crate::instance::{InstanceArenas, InstanceView};
use crate::neighbor;
use crate::packet::{MessageHdr, MidMessage, TcMessage};
use crate::route;
use crate::tasks;
use crate::tasks::messages::input::ExpiryMsg;
use crate::types::{
    MidEntryId, ObjectId, TopologyId, eight_bit_time, seqno_is_newer,
};

// An interface alias of a remote node, learned from a MID message.
#[derive(Debug)]
pub struct MidEntry {
    pub id: MidEntryId,
    pub main_addr: Ipv4Addr,
    pub iface_addr: Ipv4Addr,
    pub distance: u16,
    pub hold_time: Instant,
    pub(crate) hold_timer: Option<TimeoutTask>,
}

#[derive(Debug, Default)]
pub struct MidSet {
    entries: BTreeMap<MidEntryId, MidEntry>,
    main_tree: BTreeMap<Ipv4Addr, BTreeSet<MidEntryId>>,
    alias_tree: BTreeMap<Ipv4Addr, MidEntryId>,
    next_id: ObjectId,
}

// A topology tuple learned from a TC message: the originator `lasthop`
// claims adjacency with `destination`.
#[derive(Debug)]
pub struct TopologyEntry {
    pub id: TopologyId,
    pub destination: Ipv4Addr,
    pub lasthop: Ipv4Addr,
    pub distance: u16,
    pub ansn: u16,
    pub hold_time: Instant,
    pub(crate) hold_timer: Option<TimeoutTask>,
}

#[derive(Debug, Default)]
pub struct TopologySet {
    entries: BTreeMap<TopologyId, TopologyEntry>,
    dest_tree: BTreeMap<Ipv4Addr, BTreeSet<TopologyId>>,
    lasthop_tree: BTreeMap<Ipv4Addr, BTreeSet<TopologyId>>,
    next_id: ObjectId,
}

// ===== impl MidSet =====

impl MidSet {
    // Resolves an arbitrary interface address to the main address of the
    // node owning it.
    pub fn resolve_main_addr(&self, addr: Ipv4Addr) -> Option<Ipv4Addr> {
        self.alias_tree
            .get(&addr)
            .map(|mid_id| self.entries[mid_id].main_addr)
    }

    // Returns the known interface aliases of the given node.
    pub fn get_mid_addresses(&self, main_addr: Ipv4Addr) -> Vec<Ipv4Addr> {
        self.main_tree
            .get(&main_addr)
            .into_iter()
            .flatten()
            .map(|mid_id| self.entries[mid_id].iface_addr)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MidEntry> {
        self.entries.values()
    }

    fn update(
        &mut self,
        main_addr: Ipv4Addr,
        iface_addr: Ipv4Addr,
        distance: u16,
        hold_time: Instant,
    ) -> (MidEntryId, bool) {
        if let Some(mid_id) = self.alias_tree.get(&iface_addr)
            && let Some(entry) = self.entries.get_mut(mid_id)
            && entry.main_addr == main_addr
        {
            entry.distance = distance;
            entry.hold_time = hold_time;
            return (entry.id, false);
        }

        self.next_id += 1;
        let mid_id = self.next_id;
        Debug::MidEntryCreate(&main_addr, &iface_addr).log();
        self.entries.insert(
            mid_id,
            MidEntry {
                id: mid_id,
                main_addr,
                iface_addr,
                distance,
                hold_time,
                hold_timer: None,
            },
        );
        self.main_tree.entry(main_addr).or_default().insert(mid_id);
        self.alias_tree.insert(iface_addr, mid_id);

        (mid_id, true)
    }

    fn delete(&mut self, mid_id: MidEntryId) -> Result<(), Error> {
        let entry = self
            .entries
            .remove(&mid_id)
            .ok_or(Error::BadMidEntry(mid_id))?;

        Debug::MidEntryDelete(&entry.main_addr, &entry.iface_addr).log();
        if let Some(mid_ids) = self.main_tree.get_mut(&entry.main_addr) {
            mid_ids.remove(&mid_id);
            if mid_ids.is_empty() {
                self.main_tree.remove(&entry.main_addr);
            }
        }
        if self
            .alias_tree
            .get(&entry.iface_addr)
            .is_some_and(|id| *id == mid_id)
        {
            self.alias_tree.remove(&entry.iface_addr);
        }

        Ok(())
    }
}

impl std::fmt::Display for MidEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "mid {} alias {} distance {}",
            self.main_addr, self.iface_addr, self.distance
        )
    }
}

// ===== impl TopologySet =====

impl TopologySet {
    pub fn iter(&self) -> impl Iterator<Item = &TopologyEntry> {
        self.entries.values()
    }

    // Returns the topology entry for the given (destination, lasthop) pair.
    pub fn get(
        &self,
        destination: Ipv4Addr,
        lasthop: Ipv4Addr,
    ) -> Option<&TopologyEntry> {
        self.dest_tree
            .get(&destination)
            .into_iter()
            .flatten()
            .map(|tc_id| &self.entries[tc_id])
            .find(|entry| entry.lasthop == lasthop)
    }

    fn insert(
        &mut self,
        destination: Ipv4Addr,
        lasthop: Ipv4Addr,
        distance: u16,
        ansn: u16,
        hold_time: Instant,
    ) -> TopologyId {
        self.next_id += 1;
        let tc_id = self.next_id;
        Debug::TcEntryCreate(&destination, &lasthop).log();
        self.entries.insert(
            tc_id,
            TopologyEntry {
                id: tc_id,
                destination,
                lasthop,
                distance,
                ansn,
                hold_time,
                hold_timer: None,
            },
        );
        self.dest_tree.entry(destination).or_default().insert(tc_id);
        self.lasthop_tree.entry(lasthop).or_default().insert(tc_id);

        tc_id
    }

    fn delete(&mut self, tc_id: TopologyId) -> Result<(), Error> {
        let entry = self
            .entries
            .remove(&tc_id)
            .ok_or(Error::BadTopologyEntry(tc_id))?;

        Debug::TcEntryDelete(&entry.destination, &entry.lasthop).log();
        if let Some(tc_ids) = self.dest_tree.get_mut(&entry.destination) {
            tc_ids.remove(&tc_id);
            if tc_ids.is_empty() {
                self.dest_tree.remove(&entry.destination);
            }
        }
        if let Some(tc_ids) = self.lasthop_tree.get_mut(&entry.lasthop) {
            tc_ids.remove(&tc_id);
            if tc_ids.is_empty() {
                self.lasthop_tree.remove(&entry.lasthop);
            }
        }

        Ok(())
    }

    // Returns the ids of the entries advertised by the given originator.
    fn lasthop_entries(&self, lasthop: Ipv4Addr) -> Vec<TopologyId> {
        self.lasthop_tree
            .get(&lasthop)
            .into_iter()
            .flatten()
            .copied()
            .collect()
    }
}

impl std::fmt::Display for TopologyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "tc {} via {} ansn {} distance {}",
            self.destination, self.lasthop, self.ansn, self.distance
        )
    }
}

// ===== global functions =====

// Processes a received TC message (RFC 3626 section 9.5).
pub(crate) fn process_tc(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
    src: Ipv4Addr,
    hdr: &MessageHdr,
    tc: &TcMessage,
) -> Result<(), Error> {
    let now = Instant::now();

    // The sender interface must belong to a symmetric one-hop neighbor.
    if !neighbor::is_sym_neighbor_addr(arenas, now, src) {
        return Err(Error::NonNeighborOrigin("TC", src));
    }

    let origin = hdr.origin;
    let ansn = tc.ansn;
    let vtime = eight_bit_time::to_duration(hdr.vtime);
    let hold_time = now + vtime;
    let distance = u16::from(hdr.hop_count) + 1;

    // A TC older than the topology already recorded for its originator is
    // out of date and contributes nothing.
    let existing = view.state.topology.lasthop_entries(origin);
    if existing
        .iter()
        .any(|tc_id| seqno_is_newer(view.state.topology.entries[tc_id].ansn, ansn))
    {
        return Ok(());
    }

    let mut changed = false;

    // Purge entries superseded by the newer advertisement.
    for tc_id in existing {
        let entry = &view.state.topology.entries[&tc_id];
        if seqno_is_newer(ansn, entry.ansn) {
            let _ = view.state.topology.delete(tc_id);
            changed = true;
        }
    }

    // Create or refresh one tuple per advertised neighbor.
    for destination in &tc.neighbors {
        let tc_id = match view.state.topology.get(*destination, origin) {
            Some(entry) => {
                let tc_id = entry.id;
                let entry =
                    view.state.topology.entries.get_mut(&tc_id).unwrap();
                entry.ansn = ansn;
                entry.distance = distance;
                entry.hold_time = hold_time;
                tc_id
            }
            None => {
                changed = true;
                view.state.topology.insert(
                    *destination,
                    origin,
                    distance,
                    ansn,
                    hold_time,
                )
            }
        };

        let task = tasks::expiry_timer(
            ExpiryMsg::Topology(tc_id),
            vtime,
            &view.tx.expiry,
        );
        view.state.topology.entries.get_mut(&tc_id).unwrap().hold_timer =
            Some(task);
    }

    if changed {
        route::schedule_route_update(view.state, view.tx);
    }

    Ok(())
}

// Processes a received MID message (RFC 3626 section 5.4).
pub(crate) fn process_mid(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
    src: Ipv4Addr,
    hdr: &MessageHdr,
    mid: &MidMessage,
) -> Result<(), Error> {
    let now = Instant::now();

    // The sender interface must belong to a symmetric one-hop neighbor.
    if !neighbor::is_sym_neighbor_addr(arenas, now, src) {
        return Err(Error::NonNeighborOrigin("MID", src));
    }

    let vtime = eight_bit_time::to_duration(hdr.vtime);
    let hold_time = now + vtime;
    let distance = u16::from(hdr.hop_count) + 1;

    let mut changed = false;
    for iface_addr in &mid.interfaces {
        if *iface_addr == hdr.origin {
            continue;
        }
        let (mid_id, created) = view.state.mid.update(
            hdr.origin,
            *iface_addr,
            distance,
            hold_time,
        );
        changed |= created;

        let task = tasks::expiry_timer(
            ExpiryMsg::MidEntry(mid_id),
            vtime,
            &view.tx.expiry,
        );
        view.state.mid.entries.get_mut(&mid_id).unwrap().hold_timer =
            Some(task);
    }

    if changed {
        route::schedule_route_update(view.state, view.tx);
    }

    Ok(())
}

// Handles the expiry of a topology entry's validity timer.
pub(crate) fn process_topology_expiry(
    view: &mut InstanceView<'_>,
    tc_id: TopologyId,
) {
    let Some(entry) = view.state.topology.entries.get(&tc_id) else {
        return;
    };

    if entry.hold_time <= Instant::now() {
        let _ = view.state.topology.delete(tc_id);
        route::schedule_route_update(view.state, view.tx);
    }
}

// Handles the expiry of a MID entry's validity timer.
pub(crate) fn process_mid_expiry(
    view: &mut InstanceView<'_>,
    mid_id: MidEntryId,
) {
    let Some(entry) = view.state.mid.entries.get(&mid_id) else {
        return;
    };

    if entry.hold_time <= Instant::now() {
        let _ = view.state.mid.delete(mid_id);
        route::schedule_route_update(view.state, view.tx);
    }
}
