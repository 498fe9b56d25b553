//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::debug;

use crate::debug::Debug;
use crate::error::Error;
use crate::instance::{InstanceArenas, InstanceView};
use crate::packet::{MessageBody, Packet};
use crate::tasks::messages::input::{
    AddressStatusMsg, ExpiryMsg, PacketRxMsg, VifStatusMsg,
};
use crate::{external, flood, neighbor, output, route, topology};

// ===== UDP packet receipt =====

pub(crate) fn process_packet(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
    msg: PacketRxMsg,
) {
    // Resolve the receiving interface; traffic for unknown or disabled
    // faces is dropped.
    let Some((face_idx, face)) = arenas.faces.get_by_name(
        &arenas.face_arena,
        &msg.ifname,
        &msg.vifname,
    ) else {
        return;
    };
    if !face.is_enabled() {
        return;
    }
    let face_id = face.id;

    let pkt = match Packet::decode(&msg.data) {
        Ok(pkt) => pkt,
        Err(error) => {
            Error::PacketDecodeError(msg.src, error).log();
            let face = &mut arenas.face_arena[face_idx];
            face.counters.bad_packets += 1;
            face.counters.update_discontinuity_time();
            return;
        }
    };

    Debug::PacketRx(&msg.ifname, &msg.vifname, &msg.src, &pkt).log();

    // Messages whose bodies could not be decoded are counted and skipped.
    for error in &pkt.msg_errors {
        Error::MessageDecodeError(msg.src, error.clone()).log();
        let face = &mut arenas.face_arena[face_idx];
        face.counters.bad_messages += 1;
        face.counters.update_discontinuity_time();
    }

    // A packet may carry several control messages; demultiplex them.
    for message in &pkt.messages {
        // Messages from ourselves must be silently dropped.
        if message.hdr.origin == view.state.main_addr {
            let face = &mut arenas.face_arena[face_idx];
            face.counters.messages_from_self += 1;
            continue;
        }

        // Messages recorded in the duplicate set are neither processed
        // nor forwarded.
        if flood::is_duplicate_message(view, face_id, message) {
            let face = &mut arenas.face_arena[face_idx];
            face.counters.duplicates += 1;
            continue;
        }

        let result = match &message.body {
            MessageBody::Hello(hello) => {
                neighbor::process_hello(
                    view,
                    arenas,
                    face_idx,
                    msg.src,
                    &message.hdr,
                    hello,
                );
                Ok(())
            }
            MessageBody::Tc(tc) => topology::process_tc(
                view,
                arenas,
                msg.src,
                &message.hdr,
                tc,
            ),
            MessageBody::Mid(mid) => topology::process_mid(
                view,
                arenas,
                msg.src,
                &message.hdr,
                mid,
            ),
            MessageBody::Hna(hna) => external::process_hna(
                view,
                arenas,
                msg.src,
                &message.hdr,
                hna,
            ),
            MessageBody::Unknown(_) => {
                let face = &mut arenas.face_arena[face_idx];
                face.counters.unknown_messages += 1;
                Ok(())
            }
        };

        if let Err(error) = result {
            error.log();
        }

        // Every non-HELLO message goes through the default forwarding
        // algorithm, whether or not it was accepted for processing. The
        // forwarding predicate is its own: MPR-selector sender, remaining
        // TTL and the duplicate set.
        if !matches!(message.body, MessageBody::Hello(_)) {
            flood::forward_message(view, arenas, face_idx, msg.src, message);
        }
    }
}

// ===== periodic emission =====

pub(crate) fn process_hello_interval(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
) {
    output::send_hello_all(view, arenas);
}

pub(crate) fn process_mid_interval(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
) {
    output::send_mid(view, arenas);
}

pub(crate) fn process_tc_interval(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
) {
    output::send_tc(view, arenas);
}

pub(crate) fn process_hna_interval(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
) {
    output::send_hna(view, arenas);
}

// ===== entity expiry =====

pub(crate) fn process_expiry(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
    msg: ExpiryMsg,
) {
    match msg {
        ExpiryMsg::Link(link_id) => {
            neighbor::process_link_expiry(view, arenas, link_id);
        }
        ExpiryMsg::MprSelector(nbr_id) => {
            neighbor::process_mpr_selector_expiry(view, arenas, nbr_id);
        }
        ExpiryMsg::TwoHopLink(l2_id) => {
            neighbor::process_twohop_link_expiry(view, arenas, l2_id);
        }
        ExpiryMsg::MidEntry(mid_id) => {
            topology::process_mid_expiry(view, mid_id);
        }
        ExpiryMsg::Topology(tc_id) => {
            topology::process_topology_expiry(view, tc_id);
        }
        ExpiryMsg::External(erid) => {
            external::process_hna_expiry(view, erid);
        }
        ExpiryMsg::Duplicate(origin, seqno) => {
            flood::process_duplicate_expiry(view, origin, seqno);
        }
    }
}

// ===== route recomputation =====

pub(crate) fn process_route_update(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
) {
    route::process_route_update(view, arenas);
}

pub(crate) fn process_rib_completion(
    view: &mut InstanceView<'_>,
    error: Option<String>,
) {
    route::process_rib_completion(view, error);
}

// ===== interface status notifications =====

// Link and address transitions are reported by the host; administrative
// face state is managed through the instance API, so these are purely
// informational.
pub(crate) fn process_vif_status(
    _view: &mut InstanceView<'_>,
    msg: VifStatusMsg,
) {
    debug!(interface = %msg.ifname, vif = %msg.vifname, up = %msg.up,
        "vif status change");
}

pub(crate) fn process_address_status(
    _view: &mut InstanceView<'_>,
    msg: AddressStatusMsg,
) {
    debug!(interface = %msg.ifname, vif = %msg.vifname,
        address = %msg.addr, enabled = %msg.enabled,
        "address status change");
}
