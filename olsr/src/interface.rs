//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};

use crate::error::IoError;
use crate::io::Io;
use crate::types::{DEFAULT_OLSR_PORT, DEFAULT_STATIC_FACE_COST, FaceId};

// Operational status of an OLSR interface binding.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FaceStatus {
    // Administratively down. A disabled face neither sends nor receives.
    Disabled,
    Enabled,
    // The I/O layer failed to bind the face; the rest of the system keeps
    // running on the other faces.
    Failed,
}

// An OLSR interface binding.
//
// There is one Face per interface/vif pair OLSR is configured to run on.
// While an IPv4 interface may carry several addresses, OLSR uses one
// address per interface as a protocol key, so each Face tracks a single
// local address.
#[derive(Debug)]
pub struct Face {
    pub id: FaceId,
    pub ifname: String,
    pub vifname: String,
    pub status: FaceStatus,
    // Learned from the I/O layer when the face is enabled.
    pub mtu: u32,
    pub local_addr: Ipv4Addr,
    pub local_port: u16,
    pub all_nodes_addr: Ipv4Addr,
    pub all_nodes_port: u16,
    // Static cost of transiting this interface, used by the shortest-path
    // computation.
    pub cost: u32,
    pub counters: FaceCounters,
    next_pkt_seqno: u16,
}

// Per-interface protocol counters.
#[derive(Debug, Default)]
pub struct FaceCounters {
    pub bad_packets: u32,
    pub bad_messages: u32,
    pub duplicates: u32,
    pub messages_from_self: u32,
    pub unknown_messages: u32,
    pub forwarded: u32,
    pub discontinuity_time: Option<DateTime<Utc>>,
}

// ===== impl Face =====

impl Face {
    pub(crate) fn new(id: FaceId, ifname: String, vifname: String) -> Face {
        Face {
            id,
            ifname,
            vifname,
            status: FaceStatus::Disabled,
            mtu: 0,
            local_addr: Ipv4Addr::UNSPECIFIED,
            local_port: DEFAULT_OLSR_PORT,
            all_nodes_addr: Ipv4Addr::BROADCAST,
            all_nodes_port: DEFAULT_OLSR_PORT,
            cost: DEFAULT_STATIC_FACE_COST,
            counters: Default::default(),
            // Starting from a random value makes stale packets from a
            // previous incarnation unlikely to look fresh.
            next_pkt_seqno: rand::random(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.status == FaceStatus::Enabled
    }

    // Returns the next packet sequence number for this interface.
    //
    // Successive sequence numbers strictly increase modulo 2^16.
    pub(crate) fn get_pkt_seqno(&mut self) -> u16 {
        let seqno = self.next_pkt_seqno;
        self.next_pkt_seqno = self.next_pkt_seqno.wrapping_add(1);
        seqno
    }

    // Hands one encoded packet to the I/O layer for transmission to the
    // all-nodes address.
    pub(crate) fn transmit(&self, io: &dyn Io, data: &[u8]) {
        if let Err(error) = io.send_packet(
            &self.ifname,
            &self.vifname,
            self.local_addr,
            self.local_port,
            self.all_nodes_addr,
            self.all_nodes_port,
            data,
        ) {
            IoError::SendError(error).log();
        }
    }
}

// ===== impl FaceCounters =====

impl FaceCounters {
    pub(crate) fn update_discontinuity_time(&mut self) {
        self.discontinuity_time = Some(Utc::now());
    }
}
