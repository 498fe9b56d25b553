//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use tracing::{debug, debug_span};

use crate::packet::Packet;

// OLSR debug messages.
#[derive(Debug)]
pub enum Debug<'a> {
    InstanceCreate,
    InstanceShutdown,
    FaceCreate(&'a str, &'a str),
    FaceDelete(&'a str, &'a str),
    FaceUp(&'a str, &'a str),
    FaceDown(&'a str, &'a str),
    PacketRx(&'a str, &'a str, &'a Ipv4Addr, &'a Packet),
    PacketTx(&'a str, &'a str, &'a Packet),
    MessageForward(&'a Ipv4Addr, u16),
    LinkCreate(&'a Ipv4Addr, &'a Ipv4Addr),
    LinkDelete(&'a Ipv4Addr, &'a Ipv4Addr),
    NeighborCreate(&'a Ipv4Addr),
    NeighborDelete(&'a Ipv4Addr),
    TwoHopNodeCreate(&'a Ipv4Addr),
    TwoHopNodeDelete(&'a Ipv4Addr),
    MprSelectorAdd(&'a Ipv4Addr),
    MprSelectorExpire(&'a Ipv4Addr),
    MprSetChange(usize),
    AnsnIncrement(u16),
    TcEntryCreate(&'a Ipv4Addr, &'a Ipv4Addr),
    TcEntryDelete(&'a Ipv4Addr, &'a Ipv4Addr),
    MidEntryCreate(&'a Ipv4Addr, &'a Ipv4Addr),
    MidEntryDelete(&'a Ipv4Addr, &'a Ipv4Addr),
    HnaRouteCreate(&'a Ipv4Network, &'a Ipv4Addr),
    HnaRouteDelete(&'a Ipv4Network, &'a Ipv4Addr),
    RouteRecompute,
    RouteAdd(&'a Ipv4Network, &'a Ipv4Addr, u32),
    RouteReplace(&'a Ipv4Network, &'a Ipv4Addr, u32),
    RouteDelete(&'a Ipv4Network),
}

// ===== impl Debug =====

impl Debug<'_> {
    // Log debug message using the tracing API.
    pub(crate) fn log(&self) {
        match self {
            Debug::InstanceCreate | Debug::InstanceShutdown => {
                debug!("{}", self);
            }
            Debug::FaceCreate(ifname, vifname)
            | Debug::FaceDelete(ifname, vifname)
            | Debug::FaceUp(ifname, vifname)
            | Debug::FaceDown(ifname, vifname) => {
                debug_span!("interface", name = %ifname, vif = %vifname)
                    .in_scope(|| {
                        debug!("{}", self);
                    });
            }
            Debug::PacketRx(ifname, vifname, source, packet) => {
                debug_span!("network").in_scope(|| {
                    debug_span!("input", interface = %ifname, vif = %vifname,
                        %source)
                    .in_scope(|| {
                        let data = serde_json::to_string(&packet).unwrap();
                        debug!(%data, "{}", self);
                    });
                });
            }
            Debug::PacketTx(ifname, vifname, packet) => {
                debug_span!("network").in_scope(|| {
                    debug_span!("output", interface = %ifname, vif = %vifname)
                        .in_scope(|| {
                            let data =
                                serde_json::to_string(&packet).unwrap();
                            debug!(%data, "{}", self);
                        });
                });
            }
            Debug::MessageForward(origin, seqno) => {
                debug!(%origin, %seqno, "{}", self);
            }
            Debug::LinkCreate(local, remote)
            | Debug::LinkDelete(local, remote) => {
                debug!(%local, %remote, "{}", self);
            }
            Debug::NeighborCreate(addr)
            | Debug::NeighborDelete(addr)
            | Debug::TwoHopNodeCreate(addr)
            | Debug::TwoHopNodeDelete(addr)
            | Debug::MprSelectorAdd(addr)
            | Debug::MprSelectorExpire(addr) => {
                debug!(address = %addr, "{}", self);
            }
            Debug::MprSetChange(count) => {
                debug!(%count, "{}", self);
            }
            Debug::AnsnIncrement(ansn) => {
                debug!(%ansn, "{}", self);
            }
            Debug::TcEntryCreate(dest, lasthop)
            | Debug::TcEntryDelete(dest, lasthop) => {
                debug!(destination = %dest, %lasthop, "{}", self);
            }
            Debug::MidEntryCreate(main_addr, iface_addr)
            | Debug::MidEntryDelete(main_addr, iface_addr) => {
                debug!(%main_addr, %iface_addr, "{}", self);
            }
            Debug::HnaRouteCreate(dest, lasthop)
            | Debug::HnaRouteDelete(dest, lasthop) => {
                debug!(destination = %dest, %lasthop, "{}", self);
            }
            Debug::RouteRecompute => {
                debug!("{}", self);
            }
            Debug::RouteAdd(dest, nexthop, metric)
            | Debug::RouteReplace(dest, nexthop, metric) => {
                debug!(destination = %dest, %nexthop, %metric, "{}", self);
            }
            Debug::RouteDelete(dest) => {
                debug!(destination = %dest, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Debug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::InstanceCreate => {
                write!(f, "instance created")
            }
            Debug::InstanceShutdown => {
                write!(f, "instance shutting down")
            }
            Debug::FaceCreate(..) => {
                write!(f, "interface created")
            }
            Debug::FaceDelete(..) => {
                write!(f, "interface deleted")
            }
            Debug::FaceUp(..) => {
                write!(f, "interface is now up")
            }
            Debug::FaceDown(..) => {
                write!(f, "interface is now down")
            }
            Debug::PacketRx(..) | Debug::PacketTx(..) => {
                write!(f, "packet")
            }
            Debug::MessageForward(..) => {
                write!(f, "forwarding message")
            }
            Debug::LinkCreate(..) => {
                write!(f, "link created")
            }
            Debug::LinkDelete(..) => {
                write!(f, "link deleted")
            }
            Debug::NeighborCreate(..) => {
                write!(f, "neighbor created")
            }
            Debug::NeighborDelete(..) => {
                write!(f, "neighbor deleted")
            }
            Debug::TwoHopNodeCreate(..) => {
                write!(f, "two-hop neighbor created")
            }
            Debug::TwoHopNodeDelete(..) => {
                write!(f, "two-hop neighbor deleted")
            }
            Debug::MprSelectorAdd(..) => {
                write!(f, "MPR selector registered")
            }
            Debug::MprSelectorExpire(..) => {
                write!(f, "MPR selector expired")
            }
            Debug::MprSetChange(..) => {
                write!(f, "MPR set changed")
            }
            Debug::AnsnIncrement(..) => {
                write!(f, "advertised neighbor set changed")
            }
            Debug::TcEntryCreate(..) => {
                write!(f, "topology entry created")
            }
            Debug::TcEntryDelete(..) => {
                write!(f, "topology entry deleted")
            }
            Debug::MidEntryCreate(..) => {
                write!(f, "MID entry created")
            }
            Debug::MidEntryDelete(..) => {
                write!(f, "MID entry deleted")
            }
            Debug::HnaRouteCreate(..) => {
                write!(f, "external route created")
            }
            Debug::HnaRouteDelete(..) => {
                write!(f, "external route deleted")
            }
            Debug::RouteRecompute => {
                write!(f, "recomputing routes")
            }
            Debug::RouteAdd(..) => {
                write!(f, "route added")
            }
            Debug::RouteReplace(..) => {
                write!(f, "route replaced")
            }
            Debug::RouteDelete(..) => {
                write!(f, "route deleted")
            }
        }
    }
}
