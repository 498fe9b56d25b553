//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use ipnetwork::Ipv4Network;
use olsr_utils::task::IntervalTask;
use olsr_utils::{Receiver, Sender, UnboundedReceiver, UnboundedSender};
use tokio::sync::mpsc;
use tracing::warn;

use crate::collections::{
    Arena, Faces, Links, Neighbors, TwoHopLinks, TwoHopNodes,
};
use crate::debug::Debug;
use crate::error::{Error, IoError};
use crate::external::ExternalRoutes;
use crate::flood::DuplicateSet;
use crate::interface::{Face, FaceStatus};
use crate::io::{AcceptAll, Io, PolicyFilter};
use crate::neighbor::{LogicalLink, Neighbor, TwoHopLink, TwoHopNode};
use crate::route::{RouteEntry, RouteTable};
use crate::tasks::messages::ProtocolInputMsg;
use crate::tasks::messages::input::{
    AddressStatusMsg, ExpiryMsg, HelloIntervalMsg, HnaIntervalMsg,
    MidIntervalMsg, PacketRxMsg, RibCompletionMsg, RouteUpdateMsg,
    TcIntervalMsg, VifStatusMsg,
};
use crate::topology::{MidSet, TopologySet};
use crate::types::{
    DEFAULT_DUP_HOLD_TIME, DEFAULT_HELLO_INTERVAL, DEFAULT_HNA_INTERVAL,
    DEFAULT_MID_INTERVAL, DEFAULT_MPR_COVERAGE, DEFAULT_REFRESH_INTERVAL,
    DEFAULT_TC_INTERVAL, FaceId, TcRedundancy, Willingness,
};
use crate::{events, neighbor, route, tasks};

#[derive(Debug)]
pub struct Instance {
    // Instance configuration data.
    pub config: InstanceCfg,
    // Instance state data.
    pub state: InstanceState,
    // Protocol databases held in arenas.
    pub arenas: InstanceArenas,
    // Instance Tx channels.
    pub tx: ProtocolInputChannelsTx,
    // Transport and RIB collaborator.
    pub io: Arc<dyn Io>,
    // Route import policy collaborator.
    pub policy: Arc<dyn PolicyFilter>,
}

// Protocol variables (RFC 3626 section 18).
#[derive(Clone, Debug)]
pub struct InstanceCfg {
    pub hello_interval: Duration,
    pub refresh_interval: Duration,
    pub tc_interval: Duration,
    pub mid_interval: Duration,
    pub hna_interval: Duration,
    pub dup_hold_time: Duration,
    pub willingness: Willingness,
    pub tc_redundancy: TcRedundancy,
    pub mpr_coverage: u32,
    // Emit a MID as soon as an additional interface comes up.
    pub early_mid: bool,
    // Emit an HNA as soon as a new prefix is originated.
    pub early_hna: bool,
}

#[derive(Debug)]
pub struct InstanceState {
    // The main address uniquely identifies this node in the MANET.
    pub main_addr: Ipv4Addr,
    // Originated message sequence number, shared by all message types.
    next_msg_seqno: u16,
    // Advertised neighbor sequence number carried in TC messages.
    pub ansn: u16,
    pub enabled_face_count: u32,
    // Periodic emission tasks.
    pub hello_interval_task: Option<IntervalTask>,
    pub mid_interval_task: Option<IntervalTask>,
    pub tc_interval_task: Option<IntervalTask>,
    pub hna_interval_task: Option<IntervalTask>,
    // Protocol databases not kept in arenas.
    pub duplicate_set: DuplicateSet,
    pub mid: MidSet,
    pub topology: TopologySet,
    pub external: ExternalRoutes,
    pub routes: RouteTable,
    pub route_update_pending: bool,
}

#[derive(Debug, Default)]
pub struct InstanceArenas {
    pub faces: Faces,
    pub face_arena: Arena<Face>,
    pub links: Links,
    pub link_arena: Arena<LogicalLink>,
    pub neighbors: Neighbors,
    pub neighbor_arena: Arena<Neighbor>,
    pub twohop_nodes: TwoHopNodes,
    pub twohop_node_arena: Arena<TwoHopNode>,
    pub twohop_links: TwoHopLinks,
    pub twohop_link_arena: Arena<TwoHopLink>,
}

// Borrowed view over the instance, split from the arenas so that event
// handlers can mutate both sides at once.
pub struct InstanceView<'a> {
    pub config: &'a InstanceCfg,
    pub state: &'a mut InstanceState,
    pub tx: &'a ProtocolInputChannelsTx,
    pub io: &'a dyn Io,
    pub policy: &'a dyn PolicyFilter,
}

#[derive(Clone, Debug)]
pub struct ProtocolInputChannelsTx {
    // Packet Rx event.
    pub packet_rx: Sender<PacketRxMsg>,
    // Periodic emission events.
    pub hello_interval: Sender<HelloIntervalMsg>,
    pub mid_interval: Sender<MidIntervalMsg>,
    pub tc_interval: Sender<TcIntervalMsg>,
    pub hna_interval: Sender<HnaIntervalMsg>,
    // Entity expiry events.
    pub expiry: Sender<ExpiryMsg>,
    // Coalesced route recomputation signal.
    pub route_update: UnboundedSender<RouteUpdateMsg>,
    // RIB operation completions.
    pub rib_completion: Sender<RibCompletionMsg>,
    // Interface status notifications.
    pub vif_status: Sender<VifStatusMsg>,
    pub address_status: Sender<AddressStatusMsg>,
}

#[derive(Debug)]
pub struct ProtocolInputChannelsRx {
    pub packet_rx: Receiver<PacketRxMsg>,
    pub hello_interval: Receiver<HelloIntervalMsg>,
    pub mid_interval: Receiver<MidIntervalMsg>,
    pub tc_interval: Receiver<TcIntervalMsg>,
    pub hna_interval: Receiver<HnaIntervalMsg>,
    pub expiry: Receiver<ExpiryMsg>,
    pub route_update: UnboundedReceiver<RouteUpdateMsg>,
    pub rib_completion: Receiver<RibCompletionMsg>,
    pub vif_status: Receiver<VifStatusMsg>,
    pub address_status: Receiver<AddressStatusMsg>,
}

// ===== impl Instance =====

impl Instance {
    pub fn new(
        config: InstanceCfg,
        io: Arc<dyn Io>,
        policy: Option<Arc<dyn PolicyFilter>>,
    ) -> (Instance, ProtocolInputChannelsRx) {
        Debug::InstanceCreate.log();

        let (tx, rx) = protocol_input_channels();
        let instance = Instance {
            config,
            state: InstanceState::new(),
            arenas: Default::default(),
            tx,
            io,
            policy: policy.unwrap_or_else(|| Arc::new(AcceptAll::default())),
        };

        (instance, rx)
    }

    /// Runs the instance event loop until the input channels are closed.
    pub async fn run(mut self, mut rx: ProtocolInputChannelsRx) {
        while let Some(msg) = rx.recv().await {
            self.process_protocol_msg(msg);
        }
        self.shutdown();
    }

    /// Dispatches one protocol input message.
    pub fn process_protocol_msg(&mut self, msg: ProtocolInputMsg) {
        let (mut view, arenas) = self.as_view();
        match msg {
            ProtocolInputMsg::PacketRx(msg) => {
                events::process_packet(&mut view, arenas, msg);
            }
            ProtocolInputMsg::HelloInterval(_msg) => {
                events::process_hello_interval(&mut view, arenas);
            }
            ProtocolInputMsg::MidInterval(_msg) => {
                events::process_mid_interval(&mut view, arenas);
            }
            ProtocolInputMsg::TcInterval(_msg) => {
                events::process_tc_interval(&mut view, arenas);
            }
            ProtocolInputMsg::HnaInterval(_msg) => {
                events::process_hna_interval(&mut view, arenas);
            }
            ProtocolInputMsg::Expiry(msg) => {
                events::process_expiry(&mut view, arenas, msg);
            }
            ProtocolInputMsg::RouteUpdate(_msg) => {
                events::process_route_update(&mut view, arenas);
            }
            ProtocolInputMsg::RibCompletion(msg) => {
                events::process_rib_completion(&mut view, msg.error);
            }
            ProtocolInputMsg::VifStatus(msg) => {
                events::process_vif_status(&mut view, msg);
            }
            ProtocolInputMsg::AddressStatus(msg) => {
                events::process_address_status(&mut view, msg);
            }
        }
    }

    /// Stops all timers and disables every interface.
    pub fn shutdown(mut self) {
        Debug::InstanceShutdown.log();

        let face_ids = self
            .arenas
            .faces
            .iter(&self.arenas.face_arena)
            .map(|face| face.id)
            .collect::<Vec<_>>();
        for face_id in face_ids {
            let _ = self.set_face_enabled(face_id, false);
        }
    }

    pub(crate) fn as_view(
        &mut self,
    ) -> (InstanceView<'_>, &mut InstanceArenas) {
        let Instance {
            config,
            state,
            arenas,
            tx,
            io,
            policy,
        } = self;
        let view = InstanceView {
            config,
            state,
            tx,
            io: &**io,
            policy: &**policy,
        };
        (view, arenas)
    }

    // ===== interface management =====

    /// Adds a new interface binding. The face starts administratively
    /// disabled.
    pub fn create_face(
        &mut self,
        ifname: &str,
        vifname: &str,
    ) -> Result<FaceId, Error> {
        if let Some((_, face)) = self.arenas.faces.get_by_name(
            &self.arenas.face_arena,
            ifname,
            vifname,
        ) {
            return Err(Error::BadFace(face.id));
        }

        let (_, face) = self.arenas.faces.insert(
            &mut self.arenas.face_arena,
            ifname,
            vifname,
        );
        Debug::FaceCreate(ifname, vifname).log();

        Ok(face.id)
    }

    /// Removes an interface binding, disabling it first.
    pub fn delete_face(&mut self, face_id: FaceId) -> Result<(), Error> {
        self.set_face_enabled(face_id, false)?;

        let (face_idx, face) = self
            .arenas
            .faces
            .get_by_id(&self.arenas.face_arena, face_id)?;
        Debug::FaceDelete(&face.ifname, &face.vifname).log();
        self.arenas
            .faces
            .delete(&mut self.arenas.face_arena, face_idx);

        Ok(())
    }

    /// Changes the administrative status of an interface, binding or
    /// unbinding the underlying socket through the I/O layer.
    pub fn set_face_enabled(
        &mut self,
        face_id: FaceId,
        enabled: bool,
    ) -> Result<(), Error> {
        let io = self.io.clone();
        let (_, face) = self
            .arenas
            .faces
            .get_mut_by_id(&mut self.arenas.face_arena, face_id)?;

        if enabled {
            if face.status == FaceStatus::Enabled {
                return Ok(());
            }

            // Check that the interface can reach all nodes through the
            // configured addressing mode.
            let capable = if face.all_nodes_addr.is_multicast() {
                io.is_vif_multicast_capable(&face.ifname, &face.vifname)
            } else {
                io.is_vif_broadcast_capable(&face.ifname, &face.vifname)
            };
            if !capable {
                warn!(interface = %face.ifname, vif = %face.vifname,
                    "interface cannot reach the all-nodes address");
            }

            face.mtu = io.get_mtu(&face.ifname);
            if let Err(error) = io.enable_address(
                &face.ifname,
                &face.vifname,
                face.local_addr,
                face.local_port,
                face.all_nodes_addr,
            ) {
                // Socket setup failed; the face remains out of service
                // while the other faces keep running.
                face.status = FaceStatus::Failed;
                let error = Error::FaceStartError(
                    face.ifname.clone(),
                    face.vifname.clone(),
                    IoError::EnableAddressError(error),
                );
                error.log();
                return Err(error);
            }

            face.status = FaceStatus::Enabled;
            Debug::FaceUp(&face.ifname, &face.vifname).log();

            // The first enabled face was the missing requirement for the
            // main address.
            let local_addr = face.local_addr;
            if self.state.main_addr.is_unspecified() {
                self.state.main_addr = local_addr;
            }

            self.state.enabled_face_count += 1;
            if self.state.enabled_face_count == 1 {
                self.start_hello_timer();
                self.start_tc_timer();
            } else {
                if self.state.enabled_face_count == 2 {
                    self.start_mid_timer();
                }
                if self.config.early_mid {
                    let _ = self.tx.mid_interval.try_send(MidIntervalMsg {});
                }
            }
        } else {
            if face.status == FaceStatus::Disabled {
                return Ok(());
            }
            // A failed face never came into service, so only a face that
            // was in service affects the counters and databases below.
            let was_enabled = face.status == FaceStatus::Enabled;

            if let Err(error) = io.disable_address(
                &face.ifname,
                &face.vifname,
                face.local_addr,
                face.local_port,
            ) {
                IoError::DisableAddressError(error).log();
            }

            face.status = FaceStatus::Disabled;
            Debug::FaceDown(&face.ifname, &face.vifname).log();

            if was_enabled {
                self.state.enabled_face_count -= 1;
                if self.state.enabled_face_count == 1 {
                    self.state.mid_interval_task = None;
                } else if self.state.enabled_face_count == 0 {
                    self.state.hello_interval_task = None;
                    self.state.tc_interval_task = None;
                }

                // Links through a disabled interface are gone.
                if neighbor::delete_links_by_face(&mut self.arenas, face_id)
                {
                    let (mut view, arenas) = self.as_view();
                    neighbor::on_neighborhood_change(&mut view, arenas);
                }
            }
        }

        Ok(())
    }

    pub fn get_face(&self, face_id: FaceId) -> Result<&Face, Error> {
        self.arenas
            .faces
            .get_by_id(&self.arenas.face_arena, face_id)
            .map(|(_, face)| face)
    }

    pub fn set_face_cost(
        &mut self,
        face_id: FaceId,
        cost: u32,
    ) -> Result<(), Error> {
        let (_, face) = self
            .arenas
            .faces
            .get_mut_by_id(&mut self.arenas.face_arena, face_id)?;
        face.cost = cost;

        route::schedule_route_update(&mut self.state, &self.tx);
        Ok(())
    }

    pub fn set_local_addr(
        &mut self,
        face_id: FaceId,
        local_addr: Ipv4Addr,
    ) -> Result<(), Error> {
        let (_, face) = self
            .arenas
            .faces
            .get_mut_by_id(&mut self.arenas.face_arena, face_id)?;
        face.local_addr = local_addr;
        Ok(())
    }

    pub fn set_local_port(
        &mut self,
        face_id: FaceId,
        local_port: u16,
    ) -> Result<(), Error> {
        let (_, face) = self
            .arenas
            .faces
            .get_mut_by_id(&mut self.arenas.face_arena, face_id)?;
        face.local_port = local_port;
        Ok(())
    }

    /// Configures the all-nodes destination address for an interface.
    ///
    /// Broadcast addresses must be 255.255.255.255 or the configured
    /// broadcast address of the interface; multicast groups must be
    /// link-scope.
    pub fn set_all_nodes_addr(
        &mut self,
        face_id: FaceId,
        all_nodes_addr: Ipv4Addr,
    ) -> Result<(), Error> {
        let io = self.io.clone();
        let (_, face) = self
            .arenas
            .faces
            .get_mut_by_id(&mut self.arenas.face_arena, face_id)?;
        if face.all_nodes_addr == all_nodes_addr {
            return Ok(());
        }

        if all_nodes_addr.is_multicast() {
            let octets = all_nodes_addr.octets();
            if octets[0] != 224 || octets[1] != 0 || octets[2] != 0 {
                return Err(Error::BadAllNodesAddr(all_nodes_addr));
            }
        } else if all_nodes_addr != Ipv4Addr::BROADCAST {
            let bcast = io.get_broadcast_address(
                &face.ifname,
                &face.vifname,
                face.local_addr,
            );
            if bcast != Some(all_nodes_addr) {
                return Err(Error::BadAllNodesAddr(all_nodes_addr));
            }
        }

        face.all_nodes_addr = all_nodes_addr;
        Ok(())
    }

    pub fn set_all_nodes_port(
        &mut self,
        face_id: FaceId,
        all_nodes_port: u16,
    ) -> Result<(), Error> {
        let (_, face) = self
            .arenas
            .faces
            .get_mut_by_id(&mut self.arenas.face_arena, face_id)?;
        face.all_nodes_port = all_nodes_port;
        Ok(())
    }

    /// Sets the node's main address.
    ///
    /// While interfaces are enabled, the main address is restricted to the
    /// address of one of them.
    pub fn set_main_addr(&mut self, addr: Ipv4Addr) -> Result<(), Error> {
        if self.state.enabled_face_count > 0
            && !self
                .arenas
                .faces
                .iter(&self.arenas.face_arena)
                .any(|face| face.is_enabled() && face.local_addr == addr)
        {
            return Err(Error::MainAddrNotConfigured(addr));
        }

        self.state.main_addr = addr;
        Ok(())
    }

    // ===== protocol variable management =====

    pub fn set_hello_interval(&mut self, interval: Duration) {
        if self.config.hello_interval == interval {
            return;
        }
        self.config.hello_interval = interval;
        if let Some(task) = &mut self.state.hello_interval_task {
            task.reset(Some(interval));
        }
    }

    pub fn set_refresh_interval(&mut self, interval: Duration) {
        self.config.refresh_interval = interval;
    }

    pub fn set_mid_interval(&mut self, interval: Duration) {
        if self.config.mid_interval == interval {
            return;
        }
        self.config.mid_interval = interval;
        if let Some(task) = &mut self.state.mid_interval_task {
            task.reset(Some(interval));
        }
    }

    pub fn set_tc_interval(&mut self, interval: Duration) {
        if self.config.tc_interval == interval {
            return;
        }
        self.config.tc_interval = interval;
        if let Some(task) = &mut self.state.tc_interval_task {
            task.reset(Some(interval));
        }
    }

    pub fn set_hna_interval(&mut self, interval: Duration) {
        if self.config.hna_interval == interval {
            return;
        }
        self.config.hna_interval = interval;
        if let Some(task) = &mut self.state.hna_interval_task {
            task.reset(Some(interval));
        }
    }

    pub fn set_dup_hold_time(&mut self, hold_time: Duration) {
        self.config.dup_hold_time = hold_time;
    }

    pub fn set_willingness(&mut self, willingness: Willingness) {
        self.config.willingness = willingness;
    }

    pub fn set_tc_redundancy(&mut self, tc_redundancy: TcRedundancy) {
        if self.config.tc_redundancy == tc_redundancy {
            return;
        }
        self.config.tc_redundancy = tc_redundancy;
        let (mut view, arenas) = self.as_view();
        neighbor::on_neighborhood_change(&mut view, arenas);
    }

    pub fn set_mpr_coverage(&mut self, mpr_coverage: u32) {
        let mpr_coverage = std::cmp::max(mpr_coverage, 1);
        if self.config.mpr_coverage == mpr_coverage {
            return;
        }
        self.config.mpr_coverage = mpr_coverage;
        let (mut view, arenas) = self.as_view();
        neighbor::on_neighborhood_change(&mut view, arenas);
    }

    // ===== HNA origination =====

    /// Starts redistributing the given prefix into OLSR. Returns false if
    /// the prefix is already originated.
    pub fn originate_hna(&mut self, dest: Ipv4Network) -> bool {
        let created = self.state.external.originate(dest);
        if created {
            if self.state.hna_interval_task.is_none() {
                self.start_hna_timer();
            }
            if self.config.early_hna {
                let _ = self.tx.hna_interval.try_send(HnaIntervalMsg {});
            }
        }
        created
    }

    /// Stops redistributing the given prefix.
    pub fn withdraw_hna(&mut self, dest: Ipv4Network) -> Result<(), Error> {
        self.state.external.withdraw(dest)?;
        if !self.state.external.has_routes_out() {
            self.state.hna_interval_task = None;
        }
        Ok(())
    }

    /// Re-runs the policy filters over the current routing table and pushes
    /// the differences to the RIB, without recomputing the table.
    pub fn push_routes(&mut self) {
        let (mut view, _) = self.as_view();
        route::push_routes(&mut view);
    }

    // ===== introspection =====

    pub fn main_addr(&self) -> Ipv4Addr {
        self.state.main_addr
    }

    pub fn iter_faces(&self) -> impl Iterator<Item = &Face> {
        self.arenas.faces.iter(&self.arenas.face_arena)
    }

    pub fn iter_links(&self) -> impl Iterator<Item = &LogicalLink> {
        self.arenas.links.iter(&self.arenas.link_arena)
    }

    pub fn iter_neighbors(&self) -> impl Iterator<Item = &Neighbor> {
        self.arenas.neighbors.iter(&self.arenas.neighbor_arena)
    }

    pub fn iter_twohop_nodes(&self) -> impl Iterator<Item = &TwoHopNode> {
        self.arenas
            .twohop_nodes
            .iter(&self.arenas.twohop_node_arena)
    }

    pub fn iter_twohop_links(&self) -> impl Iterator<Item = &TwoHopLink> {
        self.arenas
            .twohop_links
            .iter(&self.arenas.twohop_link_arena)
    }

    pub fn mid_set(&self) -> &MidSet {
        &self.state.mid
    }

    pub fn topology_set(&self) -> &TopologySet {
        &self.state.topology
    }

    pub fn external_routes(&self) -> &ExternalRoutes {
        &self.state.external
    }

    pub fn routes(&self) -> &BTreeMap<Ipv4Network, RouteEntry> {
        &self.state.routes.routes
    }

    // ===== timer management =====

    fn start_hello_timer(&mut self) {
        self.state.hello_interval_task = Some(tasks::hello_interval(
            self.config.hello_interval,
            &self.tx.hello_interval,
        ));
    }

    fn start_mid_timer(&mut self) {
        self.state.mid_interval_task = Some(tasks::mid_interval(
            self.config.mid_interval,
            &self.tx.mid_interval,
        ));
    }

    fn start_tc_timer(&mut self) {
        self.state.tc_interval_task = Some(tasks::tc_interval(
            self.config.tc_interval,
            &self.tx.tc_interval,
        ));
    }

    fn start_hna_timer(&mut self) {
        self.state.hna_interval_task = Some(tasks::hna_interval(
            self.config.hna_interval,
            &self.tx.hna_interval,
        ));
    }
}

// ===== impl InstanceCfg =====

impl Default for InstanceCfg {
    fn default() -> InstanceCfg {
        InstanceCfg {
            hello_interval: Duration::from_secs(DEFAULT_HELLO_INTERVAL),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL),
            tc_interval: Duration::from_secs(DEFAULT_TC_INTERVAL),
            mid_interval: Duration::from_secs(DEFAULT_MID_INTERVAL),
            hna_interval: Duration::from_secs(DEFAULT_HNA_INTERVAL),
            dup_hold_time: Duration::from_secs(DEFAULT_DUP_HOLD_TIME),
            willingness: Willingness::DEFAULT,
            tc_redundancy: TcRedundancy::default(),
            mpr_coverage: DEFAULT_MPR_COVERAGE,
            early_mid: false,
            early_hna: false,
        }
    }
}

// ===== impl InstanceState =====

impl InstanceState {
    fn new() -> InstanceState {
        InstanceState {
            main_addr: Ipv4Addr::UNSPECIFIED,
            // Starting from a random value makes stale messages from a
            // previous incarnation unlikely to look fresh.
            next_msg_seqno: rand::random(),
            ansn: 0,
            enabled_face_count: 0,
            hello_interval_task: None,
            mid_interval_task: None,
            tc_interval_task: None,
            hna_interval_task: None,
            duplicate_set: Default::default(),
            mid: Default::default(),
            topology: Default::default(),
            external: Default::default(),
            routes: Default::default(),
            route_update_pending: false,
        }
    }

    // Returns the next message sequence number. A single counter serves
    // every originated message type.
    pub(crate) fn get_msg_seqno(&mut self) -> u16 {
        let seqno = self.next_msg_seqno;
        self.next_msg_seqno = self.next_msg_seqno.wrapping_add(1);
        seqno
    }
}

// ===== impl ProtocolInputChannelsRx =====

impl ProtocolInputChannelsRx {
    pub async fn recv(&mut self) -> Option<ProtocolInputMsg> {
        tokio::select! {
            msg = self.packet_rx.recv() => {
                msg.map(ProtocolInputMsg::PacketRx)
            }
            msg = self.hello_interval.recv() => {
                msg.map(ProtocolInputMsg::HelloInterval)
            }
            msg = self.mid_interval.recv() => {
                msg.map(ProtocolInputMsg::MidInterval)
            }
            msg = self.tc_interval.recv() => {
                msg.map(ProtocolInputMsg::TcInterval)
            }
            msg = self.hna_interval.recv() => {
                msg.map(ProtocolInputMsg::HnaInterval)
            }
            msg = self.expiry.recv() => {
                msg.map(ProtocolInputMsg::Expiry)
            }
            msg = self.route_update.recv() => {
                msg.map(ProtocolInputMsg::RouteUpdate)
            }
            msg = self.rib_completion.recv() => {
                msg.map(ProtocolInputMsg::RibCompletion)
            }
            msg = self.vif_status.recv() => {
                msg.map(ProtocolInputMsg::VifStatus)
            }
            msg = self.address_status.recv() => {
                msg.map(ProtocolInputMsg::AddressStatus)
            }
        }
    }
}

// ===== helper functions =====

fn protocol_input_channels()
-> (ProtocolInputChannelsTx, ProtocolInputChannelsRx) {
    let (packet_rxp, packet_rxc) = mpsc::channel(4);
    let (hello_intervalp, hello_intervalc) = mpsc::channel(4);
    let (mid_intervalp, mid_intervalc) = mpsc::channel(4);
    let (tc_intervalp, tc_intervalc) = mpsc::channel(4);
    let (hna_intervalp, hna_intervalc) = mpsc::channel(4);
    let (expiryp, expiryc) = mpsc::channel(4);
    let (route_updatep, route_updatec) = mpsc::unbounded_channel();
    let (rib_completionp, rib_completionc) = mpsc::channel(4);
    let (vif_statusp, vif_statusc) = mpsc::channel(4);
    let (address_statusp, address_statusc) = mpsc::channel(4);

    let tx = ProtocolInputChannelsTx {
        packet_rx: packet_rxp,
        hello_interval: hello_intervalp,
        mid_interval: mid_intervalp,
        tc_interval: tc_intervalp,
        hna_interval: hna_intervalp,
        expiry: expiryp,
        route_update: route_updatep,
        rib_completion: rib_completionp,
        vif_status: vif_statusp,
        address_status: address_statusp,
    };
    let rx = ProtocolInputChannelsRx {
        packet_rx: packet_rxc,
        hello_interval: hello_intervalc,
        mid_interval: mid_intervalc,
        tc_interval: tc_intervalc,
        hna_interval: hna_intervalc,
        expiry: expiryc,
        route_update: route_updatec,
        rib_completion: rib_completionc,
        vif_status: vif_statusc,
        address_status: address_statusc,
    };

    (tx, rx)
}
