//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::time::Instant;

use olsr_utils::task::TimeoutTask;

use crate::collections::FaceIndex;
use crate::debug::Debug;
use crate::error::Error;
use crate::instance::{InstanceArenas, InstanceView};
use crate::neighbor;
use crate::packet::{Message, MessageBody, Packet};
use crate::tasks;
use crate::tasks::messages::input::ExpiryMsg;
use crate::types::FaceId;

// A member of the duplicate set, keyed by (origin, message seqno).
#[derive(Debug)]
pub struct DupeTuple {
    pub origin: Ipv4Addr,
    pub seqno: u16,
    // Interfaces this message has already been received on.
    pub iface_list: BTreeSet<FaceId>,
    pub is_forwarded: bool,
    pub hold_time: Instant,
    pub(crate) expiry_timer: Option<TimeoutTask>,
}

#[derive(Debug, Default)]
pub struct DuplicateSet {
    tuples: BTreeMap<(Ipv4Addr, u16), DupeTuple>,
}

// ===== impl DupeTuple =====

impl DupeTuple {
    pub(crate) fn is_seen_by_face(&self, face_id: FaceId) -> bool {
        self.iface_list.contains(&face_id)
    }
}

// ===== impl DuplicateSet =====

impl DuplicateSet {
    pub fn get(&self, origin: Ipv4Addr, seqno: u16) -> Option<&DupeTuple> {
        self.tuples.get(&(origin, seqno))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DupeTuple> {
        self.tuples.values()
    }

    fn get_mut(
        &mut self,
        origin: Ipv4Addr,
        seqno: u16,
    ) -> Option<&mut DupeTuple> {
        self.tuples.get_mut(&(origin, seqno))
    }

    fn insert(&mut self, tuple: DupeTuple) {
        self.tuples.insert((tuple.origin, tuple.seqno), tuple);
    }

    fn remove(&mut self, origin: Ipv4Addr, seqno: u16) {
        self.tuples.remove(&(origin, seqno));
    }
}

// ===== global functions =====

// Returns whether a received message is a duplicate that must be neither
// processed nor forwarded: it has already been forwarded by this node, or
// it was already received on the interface this copy arrived on.
//
// HELLO messages are excluded from duplicate detection.
pub(crate) fn is_duplicate_message(
    view: &InstanceView<'_>,
    face_id: FaceId,
    msg: &Message,
) -> bool {
    if matches!(msg.body, MessageBody::Hello(_)) {
        return false;
    }

    view.state
        .duplicate_set
        .get(msg.hdr.origin, msg.hdr.seqno)
        .is_some_and(|tuple| {
            tuple.is_forwarded || tuple.is_seen_by_face(face_id)
        })
}

// The default forwarding algorithm (RFC 3626 section 3.4.1). Records the
// message in the duplicate set and floods it when the sender is one of our
// MPR selectors. Returns whether the message was forwarded.
pub(crate) fn forward_message(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
    face_idx: FaceIndex,
    src: Ipv4Addr,
    msg: &Message,
) -> bool {
    debug_assert!(!matches!(msg.body, MessageBody::Hello(_)));

    let face_id = arenas.face_arena[face_idx].id;
    let now = Instant::now();

    // A message already forwarded, or already seen on the receiving
    // interface, is left alone.
    if view
        .state
        .duplicate_set
        .get(msg.hdr.origin, msg.hdr.seqno)
        .is_some_and(|tuple| {
            tuple.is_forwarded || tuple.is_seen_by_face(face_id)
        })
    {
        return false;
    }

    // The message is retransmitted iff the sender interface belongs to a
    // neighbor which has selected this node as MPR, and it can still
    // travel.
    let will_forward = neighbor::is_mpr_selector_addr(arenas, now, src)
        && msg.hdr.ttl > 1;

    update_dupetuple(view, face_id, msg, will_forward);

    if will_forward {
        let mut fwd = msg.clone();
        fwd.hdr.hop_count += 1;
        fwd.hdr.ttl -= 1;
        Debug::MessageForward(&fwd.hdr.origin, fwd.hdr.seqno).log();

        flood_message(view, arenas, &fwd);

        let face = &mut arenas.face_arena[face_idx];
        face.counters.forwarded += 1;
    }

    will_forward
}

// Transmits one encoded copy of the message on every enabled interface,
// stamping each copy with that interface's packet sequence number.
pub(crate) fn flood_message(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
    msg: &Message,
) {
    for face_idx in arenas.faces.indexes().collect::<Vec<_>>() {
        let face = &mut arenas.face_arena[face_idx];
        if !face.is_enabled() {
            continue;
        }

        let mut pkt = Packet::new(0, vec![msg.clone()]);
        let max_size = match face.mtu {
            0 => usize::MAX,
            mtu => mtu as usize,
        };
        let (mut buf, truncated) = pkt.encode(max_size);
        if truncated {
            Error::MessageTruncated(face.ifname.clone(), face.vifname.clone())
                .log();
        }

        pkt.seqno = face.get_pkt_seqno();
        Packet::update_encoded_seqno(&mut buf, pkt.seqno);

        Debug::PacketTx(&face.ifname, &face.vifname, &pkt).log();
        face.transmit(view.io, &buf);
    }
}

// Creates or refreshes the duplicate tuple for a message.
fn update_dupetuple(
    view: &mut InstanceView<'_>,
    face_id: FaceId,
    msg: &Message,
    is_forwarded: bool,
) {
    let origin = msg.hdr.origin;
    let seqno = msg.hdr.seqno;
    let hold = view.config.dup_hold_time;
    let hold_time = Instant::now() + hold;

    if view.state.duplicate_set.get(origin, seqno).is_none() {
        view.state.duplicate_set.insert(DupeTuple {
            origin,
            seqno,
            iface_list: Default::default(),
            is_forwarded: false,
            hold_time,
            expiry_timer: None,
        });
    }

    let tuple = view.state.duplicate_set.get_mut(origin, seqno).unwrap();
    tuple.hold_time = hold_time;
    tuple.iface_list.insert(face_id);
    tuple.is_forwarded = is_forwarded;
    let task = tasks::expiry_timer(
        ExpiryMsg::Duplicate(origin, seqno),
        hold,
        &view.tx.expiry,
    );
    tuple.expiry_timer = Some(task);
}

// Handles the expiry of a duplicate tuple.
pub(crate) fn process_duplicate_expiry(
    view: &mut InstanceView<'_>,
    origin: Ipv4Addr,
    seqno: u16,
) {
    if view
        .state
        .duplicate_set
        .get(origin, seqno)
        .is_some_and(|tuple| tuple.hold_time <= Instant::now())
    {
        view.state.duplicate_set.remove(origin, seqno);
    }
}
