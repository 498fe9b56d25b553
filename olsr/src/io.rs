//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use crate::spf::VertexType;
use crate::types::FaceId;

// Tags attached to installed routes by the policy filter.
pub type PolicyTags = BTreeSet<u32>;

// Outcome of running the policy filter over a candidate route.
#[derive(Debug)]
#[derive(Deserialize, Serialize)]
pub enum PolicyResult<T> {
    Accept(T),
    Reject,
}

// Attributes of a candidate route, as visible to the policy filter.
#[derive(Clone, Debug)]
#[derive(Deserialize, Serialize)]
pub struct RouteAttrs {
    pub net: Ipv4Network,
    pub nexthop: Ipv4Addr,
    pub metric: u32,
    // Main address of the node which produced the route.
    pub originator: Ipv4Addr,
    pub main_addr: Ipv4Addr,
    pub dest_type: VertexType,
}

/// The transport and forwarding-plane collaborator.
///
/// The core has no direct knowledge of sockets, interfaces or the RIB; the
/// host implements this trait and hands it to the instance at construction.
/// Callbacks resulting from these operations (received datagrams, interface
/// status changes, RIB completions) must be marshalled onto the instance
/// event loop through the protocol input channels.
pub trait Io: Send + Sync + std::fmt::Debug {
    /// Opens a UDP socket bound to `local_addr`:`local_port` on the given
    /// interface/vif, capable of sending to `all_nodes_addr`.
    fn enable_address(
        &self,
        ifname: &str,
        vifname: &str,
        local_addr: Ipv4Addr,
        local_port: u16,
        all_nodes_addr: Ipv4Addr,
    ) -> Result<(), std::io::Error>;

    /// Closes the socket previously opened by `enable_address`. Idempotent.
    fn disable_address(
        &self,
        ifname: &str,
        vifname: &str,
        local_addr: Ipv4Addr,
        local_port: u16,
    ) -> Result<(), std::io::Error>;

    /// Best-effort UDP send of one encoded packet.
    fn send_packet(
        &self,
        ifname: &str,
        vifname: &str,
        src: Ipv4Addr,
        sport: u16,
        dst: Ipv4Addr,
        dport: u16,
        data: &[u8],
    ) -> Result<(), std::io::Error>;

    /// Returns the MTU of the given interface.
    fn get_mtu(&self, ifname: &str) -> u32;

    /// Returns all protocol addresses configured on the given interface/vif.
    fn get_addresses(&self, ifname: &str, vifname: &str) -> Vec<Ipv4Addr>;

    fn is_vif_broadcast_capable(&self, ifname: &str, vifname: &str) -> bool;

    fn is_vif_multicast_capable(&self, ifname: &str, vifname: &str) -> bool;

    /// Returns the configured broadcast address of the given interface/vif,
    /// as seen by the host's interface manager.
    fn get_broadcast_address(
        &self,
        ifname: &str,
        vifname: &str,
        local_addr: Ipv4Addr,
    ) -> Option<Ipv4Addr>;

    /// Queues the installation of a host route. Completion is reported
    /// asynchronously via a `RibCompletionMsg`.
    fn add_route(
        &self,
        net: Ipv4Network,
        nexthop: Ipv4Addr,
        face_id: FaceId,
        metric: u32,
        tags: &PolicyTags,
    ) -> Result<(), std::io::Error>;

    /// Queues the replacement of a previously installed route.
    fn replace_route(
        &self,
        net: Ipv4Network,
        nexthop: Ipv4Addr,
        face_id: FaceId,
        metric: u32,
        tags: &PolicyTags,
    ) -> Result<(), std::io::Error>;

    /// Queues the removal of a previously installed route.
    fn delete_route(&self, net: Ipv4Network) -> Result<(), std::io::Error>;
}

/// The route import/export policy collaborator.
pub trait PolicyFilter: Send + Sync + std::fmt::Debug {
    /// Runs the import filter over a candidate route. A rejected route is
    /// kept in the routing table but not pushed to the RIB.
    fn import(&self, attrs: &RouteAttrs) -> PolicyResult<PolicyTags>;
}

// Policy filter which accepts every route with no tags. Used when the host
// does not supply a filter of its own.
#[derive(Debug, Default)]
pub struct AcceptAll();

impl PolicyFilter for AcceptAll {
    fn import(&self, _attrs: &RouteAttrs) -> PolicyResult<PolicyTags> {
        PolicyResult::Accept(PolicyTags::new())
    }
}
