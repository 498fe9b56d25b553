//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use crate::debug::Debug;
use crate::error::Error;
use crate::instance::{InstanceArenas, InstanceView};
use crate::packet::{
    HnaMessage, Message, MessageBody, MessageHdr, MidMessage, Packet,
    TcMessage,
};
use crate::types::{MAX_TTL, eight_bit_time};
use crate::{flood, neighbor};

// ===== global functions =====

// Originates one HELLO per enabled interface, each carrying the link state
// known through that interface.
pub(crate) fn send_hello_all(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
) {
    for face_idx in arenas.faces.indexes().collect::<Vec<_>>() {
        if !arenas.face_arena[face_idx].is_enabled() {
            continue;
        }

        let face_id = arenas.face_arena[face_idx].id;
        let hello = neighbor::populate_hello(view, arenas, face_id);
        // Link advertisements stay valid for NEIGHB_HOLD_TIME.
        let vtime =
            eight_bit_time::from_duration(3 * view.config.refresh_interval);
        let hdr = MessageHdr {
            vtime,
            origin: view.state.main_addr,
            // HELLO messages never travel beyond one hop.
            ttl: 1,
            hop_count: 0,
            seqno: view.state.get_msg_seqno(),
        };
        let msg = Message::new(hdr, MessageBody::Hello(hello));

        let face = &mut arenas.face_arena[face_idx];
        let mut pkt = Packet::new(0, vec![msg]);
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

// Originates a MID message listing every enabled interface address other
// than the main address. Only called while more than one interface is
// enabled.
pub(crate) fn send_mid(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
) {
    let interfaces = arenas
        .faces
        .iter(&arenas.face_arena)
        .filter(|face| face.is_enabled())
        .map(|face| face.local_addr)
        .filter(|addr| *addr != view.state.main_addr)
        .collect::<Vec<_>>();
    if interfaces.is_empty() {
        return;
    }

    let hdr = MessageHdr {
        vtime: eight_bit_time::from_duration(3 * view.config.mid_interval),
        origin: view.state.main_addr,
        ttl: MAX_TTL,
        hop_count: 0,
        seqno: view.state.get_msg_seqno(),
    };
    let msg = Message::new(hdr, MessageBody::Mid(MidMessage::new(interfaces)));

    flood::flood_message(view, arenas, &msg);
}

// Originates a TC message carrying the advertised neighbor set under the
// current ANSN. Nothing is emitted while the advertised set is empty.
pub(crate) fn send_tc(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
) {
    let advertised = arenas
        .neighbors
        .iter(&arenas.neighbor_arena)
        .filter(|nbr| nbr.is_advertised)
        .map(|nbr| nbr.main_addr)
        .collect::<Vec<_>>();
    if advertised.is_empty() {
        return;
    }

    let hdr = MessageHdr {
        vtime: eight_bit_time::from_duration(3 * view.config.tc_interval),
        origin: view.state.main_addr,
        ttl: MAX_TTL,
        hop_count: 0,
        seqno: view.state.get_msg_seqno(),
    };
    let tc = TcMessage::new(view.state.ansn, advertised);
    let msg = Message::new(hdr, MessageBody::Tc(tc));

    flood::flood_message(view, arenas, &msg);
}

// Originates an HNA message listing every locally originated prefix. Only
// called while at least one prefix is originated.
pub(crate) fn send_hna(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
) {
    let networks = view
        .state
        .external
        .iter_out()
        .map(|route| route.dest)
        .collect::<Vec<_>>();
    if networks.is_empty() {
        return;
    }

    let hdr = MessageHdr {
        vtime: eight_bit_time::from_duration(3 * view.config.hna_interval),
        origin: view.state.main_addr,
        ttl: MAX_TTL,
        hop_count: 0,
        seqno: view.state.get_msg_seqno(),
    };
    let msg = Message::new(hdr, MessageBody::Hna(HnaMessage::new(networks)));

    flood::flood_message(view, arenas, &msg);
}
