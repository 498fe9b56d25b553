//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use const_addrs::{ip4, net4};
use ipnetwork::Ipv4Network;
use olsr::instance::{Instance, InstanceCfg, ProtocolInputChannelsRx};
use olsr::io::{Io, PolicyTags};
use olsr::packet::{
    HelloMessage, HnaMessage, LinkCode, LinkMessage, Message, MessageBody,
    MessageHdr, MidMessage, Packet, TcMessage,
};
use olsr::tasks::messages::ProtocolInputMsg;
use olsr::tasks::messages::input::{
    HelloIntervalMsg, HnaIntervalMsg, MidIntervalMsg, PacketRxMsg,
    RouteUpdateMsg, TcIntervalMsg,
};
use olsr::types::{
    FaceId, LinkType, MAX_TTL, NeighborType, Willingness, eight_bit_time,
    seqno_is_newer,
};

//
// Stub I/O collaborator. Transmitted packets and RIB operations are
// recorded for inspection.
//

#[derive(Debug, Default)]
struct TestIo {
    sent: Mutex<Vec<SentPacket>>,
    rib: Mutex<BTreeMap<Ipv4Network, (Ipv4Addr, u32)>>,
}

#[derive(Debug)]
struct SentPacket {
    ifname: String,
    src: Ipv4Addr,
    dst: Ipv4Addr,
    dport: u16,
    pkt: Packet,
    data: Vec<u8>,
}

impl TestIo {
    fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    fn sent_packets(&self) -> Vec<SentPacket> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    fn rib_snapshot(&self) -> BTreeMap<Ipv4Network, (Ipv4Addr, u32)> {
        self.rib.lock().unwrap().clone()
    }
}

impl Io for TestIo {
    fn enable_address(
        &self,
        _ifname: &str,
        _vifname: &str,
        _local_addr: Ipv4Addr,
        _local_port: u16,
        _all_nodes_addr: Ipv4Addr,
    ) -> Result<(), std::io::Error> {
        Ok(())
    }

    fn disable_address(
        &self,
        _ifname: &str,
        _vifname: &str,
        _local_addr: Ipv4Addr,
        _local_port: u16,
    ) -> Result<(), std::io::Error> {
        Ok(())
    }

    fn send_packet(
        &self,
        ifname: &str,
        _vifname: &str,
        src: Ipv4Addr,
        _sport: u16,
        dst: Ipv4Addr,
        dport: u16,
        data: &[u8],
    ) -> Result<(), std::io::Error> {
        let pkt = Packet::decode(data).expect("sent packet must decode");
        self.sent.lock().unwrap().push(SentPacket {
            ifname: ifname.to_owned(),
            src,
            dst,
            dport,
            pkt,
            data: data.to_vec(),
        });
        Ok(())
    }

    fn get_mtu(&self, _ifname: &str) -> u32 {
        1500
    }

    fn get_addresses(&self, _ifname: &str, _vifname: &str) -> Vec<Ipv4Addr> {
        vec![]
    }

    fn is_vif_broadcast_capable(&self, _ifname: &str, _vifname: &str) -> bool {
        true
    }

    fn is_vif_multicast_capable(&self, _ifname: &str, _vifname: &str) -> bool {
        true
    }

    fn get_broadcast_address(
        &self,
        _ifname: &str,
        _vifname: &str,
        _local_addr: Ipv4Addr,
    ) -> Option<Ipv4Addr> {
        None
    }

    fn add_route(
        &self,
        net: Ipv4Network,
        nexthop: Ipv4Addr,
        _face_id: FaceId,
        metric: u32,
        _tags: &PolicyTags,
    ) -> Result<(), std::io::Error> {
        self.rib.lock().unwrap().insert(net, (nexthop, metric));
        Ok(())
    }

    fn replace_route(
        &self,
        net: Ipv4Network,
        nexthop: Ipv4Addr,
        _face_id: FaceId,
        metric: u32,
        _tags: &PolicyTags,
    ) -> Result<(), std::io::Error> {
        self.rib.lock().unwrap().insert(net, (nexthop, metric));
        Ok(())
    }

    fn delete_route(&self, net: Ipv4Network) -> Result<(), std::io::Error> {
        self.rib.lock().unwrap().remove(&net);
        Ok(())
    }
}

//
// Helper functions.
//

const A: Ipv4Addr = ip4!("192.0.2.1");
const B: Ipv4Addr = ip4!("192.0.2.2");
const C: Ipv4Addr = ip4!("192.0.2.3");
const D: Ipv4Addr = ip4!("192.0.2.4");

fn new_instance() -> (Instance, Arc<TestIo>, ProtocolInputChannelsRx) {
    let io = Arc::new(TestIo::default());
    let (mut instance, rx) =
        Instance::new(InstanceCfg::default(), io.clone(), None);

    let face_id = instance.create_face("eth0", "vif0").unwrap();
    instance.set_local_addr(face_id, A).unwrap();
    instance.set_face_enabled(face_id, true).unwrap();

    (instance, io, rx)
}

fn recv(instance: &mut Instance, src: Ipv4Addr, data: Bytes) {
    instance.process_protocol_msg(ProtocolInputMsg::PacketRx(PacketRxMsg {
        ifname: "eth0".to_owned(),
        vifname: "vif0".to_owned(),
        src,
        sport: 698,
        dst: ip4!("255.255.255.255"),
        dport: 698,
        data,
    }));
}

fn run_route_update(instance: &mut Instance) {
    instance
        .process_protocol_msg(ProtocolInputMsg::RouteUpdate(RouteUpdateMsg {}));
}

fn encode_packet(msg: Message) -> Bytes {
    let (buf, truncated) = Packet::new(1, vec![msg]).encode(usize::MAX);
    assert!(!truncated);
    buf.freeze()
}

fn hello(
    origin: Ipv4Addr,
    seqno: u16,
    willingness: Willingness,
    links: Vec<(LinkType, NeighborType, Vec<Ipv4Addr>)>,
) -> Bytes {
    let vtime = eight_bit_time::from_duration(Duration::from_secs(6));
    let links = links
        .into_iter()
        .map(|(link_type, neighbor_type, addrs)| {
            LinkMessage::new(LinkCode::new(link_type, neighbor_type), addrs)
        })
        .collect();
    let hdr = MessageHdr::new(vtime, origin, 1, 0, seqno);
    let body = MessageBody::Hello(HelloMessage::new(
        eight_bit_time::from_duration(Duration::from_secs(2)),
        willingness,
        links,
    ));
    encode_packet(Message::new(hdr, body))
}

fn tc(
    origin: Ipv4Addr,
    seqno: u16,
    ansn: u16,
    neighbors: Vec<Ipv4Addr>,
) -> Bytes {
    let vtime = eight_bit_time::from_duration(Duration::from_secs(15));
    let hdr = MessageHdr::new(vtime, origin, MAX_TTL, 0, seqno);
    let body = MessageBody::Tc(TcMessage::new(ansn, neighbors));
    encode_packet(Message::new(hdr, body))
}

fn mid(origin: Ipv4Addr, seqno: u16, interfaces: Vec<Ipv4Addr>) -> Bytes {
    let vtime = eight_bit_time::from_duration(Duration::from_secs(15));
    let hdr = MessageHdr::new(vtime, origin, MAX_TTL, 0, seqno);
    let body = MessageBody::Mid(MidMessage::new(interfaces));
    encode_packet(Message::new(hdr, body))
}

fn hna(origin: Ipv4Addr, seqno: u16, networks: Vec<Ipv4Network>) -> Bytes {
    let vtime = eight_bit_time::from_duration(Duration::from_secs(15));
    let hdr = MessageHdr::new(vtime, origin, MAX_TTL, 0, seqno);
    let body = MessageBody::Hna(HnaMessage::new(networks));
    encode_packet(Message::new(hdr, body))
}

// Brings up a symmetric adjacency with the given peer: the peer's HELLO
// both proves it hears us and, optionally, selects us as MPR.
fn establish_adjacency(
    instance: &mut Instance,
    peer: Ipv4Addr,
    willingness: Willingness,
    neighbor_type: NeighborType,
) {
    recv(instance, peer, hello(peer, 1, willingness, vec![]));
    recv(
        instance,
        peer,
        hello(
            peer,
            2,
            willingness,
            vec![(LinkType::Sym, neighbor_type, vec![A])],
        ),
    );
}

//
// Tests.
//

#[test]
fn test_hello_origination() {
    let (mut instance, io, _rx) = new_instance();

    // Two HELLO interval ticks produce two packets and no neighbors.
    instance
        .process_protocol_msg(ProtocolInputMsg::HelloInterval(
            HelloIntervalMsg {},
        ));
    instance
        .process_protocol_msg(ProtocolInputMsg::HelloInterval(
            HelloIntervalMsg {},
        ));

    let sent = io.sent_packets();
    assert_eq!(sent.len(), 2);
    assert_eq!(instance.iter_neighbors().count(), 0);

    for sent_pkt in &sent {
        assert_eq!(sent_pkt.ifname, "eth0");
        assert_eq!(sent_pkt.dst, ip4!("255.255.255.255"));
        assert_eq!(sent_pkt.dport, 698);

        let msg = &sent_pkt.pkt.messages[0];
        assert_eq!(msg.hdr.origin, A);
        assert_eq!(msg.hdr.ttl, 1);
        let hello = msg.body.as_hello().unwrap();
        assert_eq!(hello.willingness, Willingness::DEFAULT);
        assert!(hello.links.is_empty());
    }

    // Packet sequence numbers strictly increase modulo 2^16.
    assert!(seqno_is_newer(sent[1].pkt.seqno, sent[0].pkt.seqno));
}

#[test]
fn test_two_node_adjacency() {
    let (mut instance, io, _rx) = new_instance();

    // B's first HELLO shows it does not hear us yet: asymmetric link.
    recv(&mut instance, B, hello(B, 1, Willingness::HIGH, vec![]));
    let nbr = instance.iter_neighbors().next().unwrap();
    assert_eq!(nbr.main_addr, B);
    assert!(!nbr.is_sym);

    // B's next HELLO lists our address: the link becomes symmetric.
    recv(
        &mut instance,
        B,
        hello(
            B,
            2,
            Willingness::HIGH,
            vec![(LinkType::Asym, NeighborType::NotNeigh, vec![A])],
        ),
    );
    let nbr = instance.iter_neighbors().next().unwrap();
    assert!(nbr.is_sym);
    assert_eq!(nbr.willingness, Willingness::HIGH);
    let link = instance.iter_links().next().unwrap();
    assert_eq!(link.remote_addr, B);

    // Our own HELLO now advertises B as a symmetric neighbor.
    io.sent_packets();
    instance
        .process_protocol_msg(ProtocolInputMsg::HelloInterval(
            HelloIntervalMsg {},
        ));
    let sent = io.sent_packets();
    let hello_out = sent[0].pkt.messages[0].body.as_hello().unwrap();
    assert_eq!(hello_out.links.len(), 1);
    assert_eq!(hello_out.links[0].addrs, vec![B]);
    assert_eq!(hello_out.links[0].code.link_type, LinkType::Sym);
    assert_eq!(hello_out.links[0].code.neighbor_type, NeighborType::SymNeigh);
}

#[test]
fn test_adjacency_loss_on_lost_link() {
    let (mut instance, _io, _rx) = new_instance();

    establish_adjacency(
        &mut instance,
        B,
        Willingness::HIGH,
        NeighborType::SymNeigh,
    );
    run_route_update(&mut instance);
    assert!(instance.routes().contains_key(&Ipv4Network::from(B)));

    // B declares the link lost.
    recv(
        &mut instance,
        B,
        hello(
            B,
            3,
            Willingness::HIGH,
            vec![(LinkType::Lost, NeighborType::NotNeigh, vec![A])],
        ),
    );
    let nbr = instance.iter_neighbors().next().unwrap();
    assert!(!nbr.is_sym);

    run_route_update(&mut instance);
    assert!(!instance.routes().contains_key(&Ipv4Network::from(B)));
}

#[test]
fn test_adjacency_loss_on_face_down() {
    let (mut instance, _io, _rx) = new_instance();

    establish_adjacency(
        &mut instance,
        B,
        Willingness::HIGH,
        NeighborType::SymNeigh,
    );
    assert_eq!(instance.iter_neighbors().count(), 1);

    let face_id = instance.iter_faces().next().unwrap().id;
    instance.set_face_enabled(face_id, false).unwrap();

    assert_eq!(instance.iter_links().count(), 0);
    assert_eq!(instance.iter_neighbors().count(), 0);
}

#[test]
fn test_tc_topology_and_route() {
    let (mut instance, io, _rx) = new_instance();

    establish_adjacency(
        &mut instance,
        B,
        Willingness::HIGH,
        NeighborType::MprNeigh,
    );

    // B advertises its adjacency with C.
    recv(&mut instance, B, tc(B, 10, 1, vec![C]));
    let entry = instance.topology_set().get(C, B).unwrap();
    assert_eq!(entry.ansn, 1);
    assert_eq!(entry.distance, 1);

    run_route_update(&mut instance);

    // Host route to C via B, at least two hops worth of metric.
    let route_c = instance.routes().get(&Ipv4Network::from(C)).unwrap();
    assert_eq!(route_c.nexthop, B);
    assert!(route_c.metric >= 2);
    let route_b = instance.routes().get(&Ipv4Network::from(B)).unwrap();
    assert_eq!(route_c.metric, route_b.metric + 1);

    // The computed table is mirrored into the RIB.
    let rib = io.rib_snapshot();
    assert_eq!(
        rib.get(&Ipv4Network::from(C)),
        Some(&(B, route_c.metric))
    );
}

#[test]
fn test_tc_ansn_supersession() {
    let (mut instance, _io, _rx) = new_instance();

    establish_adjacency(
        &mut instance,
        B,
        Willingness::HIGH,
        NeighborType::SymNeigh,
    );

    recv(&mut instance, B, tc(B, 10, 5, vec![C, D]));
    assert!(instance.topology_set().get(C, B).is_some());
    assert!(instance.topology_set().get(D, B).is_some());

    // A newer ANSN no longer advertising D supersedes the old entries.
    recv(&mut instance, B, tc(B, 11, 6, vec![C]));
    assert!(instance.topology_set().get(C, B).is_some());
    assert!(instance.topology_set().get(D, B).is_none());

    // A stale ANSN is ignored.
    recv(&mut instance, B, tc(B, 12, 5, vec![D]));
    assert!(instance.topology_set().get(D, B).is_none());
}

#[test]
fn test_tc_from_non_neighbor_rejected() {
    let (mut instance, _io, _rx) = new_instance();

    // No adjacency with B exists; its TC must be ignored.
    recv(&mut instance, B, tc(B, 10, 1, vec![C]));
    assert!(instance.topology_set().get(C, B).is_none());
}

#[test]
fn test_mid_alias_route() {
    let (mut instance, _io, _rx) = new_instance();

    establish_adjacency(
        &mut instance,
        B,
        Willingness::HIGH,
        NeighborType::SymNeigh,
    );

    // B declares a second interface.
    let alias = ip4!("192.0.2.12");
    recv(&mut instance, B, mid(B, 10, vec![alias]));
    assert_eq!(instance.mid_set().resolve_main_addr(alias), Some(B));
    assert_eq!(instance.mid_set().get_mid_addresses(B), vec![alias]);

    run_route_update(&mut instance);

    let route_b = instance.routes().get(&Ipv4Network::from(B)).unwrap();
    let route_alias =
        instance.routes().get(&Ipv4Network::from(alias)).unwrap();
    assert_eq!(route_alias.nexthop, route_b.nexthop);
    assert_eq!(route_alias.metric, route_b.metric);
}

#[test]
fn test_hna_route() {
    let (mut instance, io, _rx) = new_instance();

    establish_adjacency(
        &mut instance,
        B,
        Willingness::HIGH,
        NeighborType::SymNeigh,
    );

    let prefix = net4!("203.0.113.0/24");
    recv(&mut instance, B, hna(B, 10, vec![prefix]));

    run_route_update(&mut instance);

    // The prefix route reuses the nexthop and metric of the route to B.
    let route_b = instance.routes().get(&Ipv4Network::from(B)).unwrap();
    let route_hna = instance.routes().get(&prefix).unwrap();
    assert_eq!(route_hna.nexthop, B);
    assert_eq!(route_hna.metric, route_b.metric);

    let rib = io.rib_snapshot();
    assert_eq!(rib.get(&prefix), Some(&(B, route_b.metric)));
}

#[test]
fn test_hna_origination() {
    let (mut instance, io, _rx) = new_instance();

    establish_adjacency(
        &mut instance,
        B,
        Willingness::HIGH,
        NeighborType::SymNeigh,
    );
    io.sent_packets();

    let prefix = net4!("203.0.113.0/24");
    assert!(instance.originate_hna(prefix));
    // Originating the same prefix twice is a no-op.
    assert!(!instance.originate_hna(prefix));

    instance
        .process_protocol_msg(ProtocolInputMsg::HnaInterval(HnaIntervalMsg {}));
    let sent = io.sent_packets();
    assert_eq!(sent.len(), 1);
    let msg = &sent[0].pkt.messages[0];
    assert_eq!(msg.hdr.ttl, MAX_TTL);
    let hna_out = msg.body.as_hna().unwrap();
    assert_eq!(hna_out.networks, vec![prefix]);

    // After withdrawal nothing is emitted.
    instance.withdraw_hna(prefix).unwrap();
    instance
        .process_protocol_msg(ProtocolInputMsg::HnaInterval(HnaIntervalMsg {}));
    assert_eq!(io.sent_count(), 0);
}

#[test]
fn test_mpr_selection_and_advertisement() {
    let (mut instance, io, _rx) = new_instance();

    // B reaches the two-hop node D; C reaches nothing further.
    recv(&mut instance, B, hello(B, 1, Willingness::DEFAULT, vec![]));
    recv(
        &mut instance,
        B,
        hello(
            B,
            2,
            Willingness::DEFAULT,
            vec![(LinkType::Sym, NeighborType::SymNeigh, vec![A, D])],
        ),
    );
    establish_adjacency(
        &mut instance,
        C,
        Willingness::DEFAULT,
        NeighborType::SymNeigh,
    );

    let n2 = instance.iter_twohop_nodes().next().unwrap();
    assert_eq!(n2.main_addr, D);
    assert!(n2.is_strict);
    // Every reachable strict two-hop node is covered.
    assert!(n2.coverage >= 1);

    let nbr_b = instance
        .iter_neighbors()
        .find(|nbr| nbr.main_addr == B)
        .unwrap();
    assert!(nbr_b.is_mpr);
    let nbr_c = instance
        .iter_neighbors()
        .find(|nbr| nbr.main_addr == C)
        .unwrap();
    assert!(!nbr_c.is_mpr);

    // Our HELLO advertises B with neighbor type MPR.
    io.sent_packets();
    instance
        .process_protocol_msg(ProtocolInputMsg::HelloInterval(
            HelloIntervalMsg {},
        ));
    let sent = io.sent_packets();
    let hello_out = sent[0].pkt.messages[0].body.as_hello().unwrap();
    let mpr_group = hello_out
        .links
        .iter()
        .find(|lmsg| lmsg.code.neighbor_type == NeighborType::MprNeigh)
        .unwrap();
    assert_eq!(mpr_group.addrs, vec![B]);
}

#[test]
fn test_forwarding_and_duplicate_suppression() {
    let (mut instance, io, _rx) = new_instance();

    // B selects us as MPR, so messages it relays must be forwarded.
    establish_adjacency(
        &mut instance,
        B,
        Willingness::HIGH,
        NeighborType::MprNeigh,
    );
    io.sent_packets();

    // A TC originated by C, relayed through B.
    let tc_pkt = tc(C, 20, 1, vec![B]);
    recv(&mut instance, B, tc_pkt.clone());

    // The relayed message is flooded onward with its hop count and TTL
    // adjusted.
    let sent = io.sent_packets();
    assert_eq!(sent.len(), 1);
    let fwd = &sent[0].pkt.messages[0];
    assert_eq!(fwd.hdr.origin, C);
    assert_eq!(fwd.hdr.ttl, MAX_TTL - 1);
    assert_eq!(fwd.hdr.hop_count, 1);

    // The second copy is a duplicate: not processed, not forwarded.
    recv(&mut instance, B, tc_pkt);
    assert_eq!(io.sent_count(), 0);
    let face = instance.iter_faces().next().unwrap();
    assert_eq!(face.counters.duplicates, 1);
    assert_eq!(face.counters.forwarded, 1);
}

#[test]
fn test_hello_is_never_forwarded() {
    let (mut instance, io, _rx) = new_instance();

    establish_adjacency(
        &mut instance,
        B,
        Willingness::HIGH,
        NeighborType::MprNeigh,
    );
    io.sent_packets();

    // Another HELLO from our MPR selector: processed, never flooded.
    recv(
        &mut instance,
        B,
        hello(
            B,
            3,
            Willingness::HIGH,
            vec![(LinkType::Sym, NeighborType::MprNeigh, vec![A])],
        ),
    );
    assert_eq!(io.sent_count(), 0);
}

#[test]
fn test_message_from_self_dropped() {
    let (mut instance, io, _rx) = new_instance();

    recv(&mut instance, B, tc(A, 30, 1, vec![B]));
    assert_eq!(io.sent_count(), 0);
    let face = instance.iter_faces().next().unwrap();
    assert_eq!(face.counters.messages_from_self, 1);
}

#[test]
fn test_rib_tracks_routing_table() {
    let (mut instance, io, _rx) = new_instance();

    establish_adjacency(
        &mut instance,
        B,
        Willingness::HIGH,
        NeighborType::SymNeigh,
    );
    recv(&mut instance, B, tc(B, 10, 1, vec![C]));
    run_route_update(&mut instance);

    let expected: BTreeMap<_, _> = instance
        .routes()
        .iter()
        .map(|(net, rt)| (*net, (rt.nexthop, rt.metric)))
        .collect();
    assert_eq!(io.rib_snapshot(), expected);
    assert!(!expected.is_empty());

    // Tearing the adjacency down withdraws everything that depended on it.
    recv(
        &mut instance,
        B,
        hello(
            B,
            5,
            Willingness::HIGH,
            vec![(LinkType::Lost, NeighborType::NotNeigh, vec![A])],
        ),
    );
    run_route_update(&mut instance);
    assert!(io.rib_snapshot().is_empty());
    assert!(instance.routes().is_empty());
}

#[test]
fn test_mid_origination_requires_second_face() {
    let (mut instance, io, _rx) = new_instance();

    // With a single face there is nothing to declare.
    instance
        .process_protocol_msg(ProtocolInputMsg::MidInterval(MidIntervalMsg {}));
    assert_eq!(io.sent_count(), 0);

    // A second enabled face triggers MID origination on both faces.
    let face_id = instance.create_face("eth1", "vif1").unwrap();
    instance.set_local_addr(face_id, ip4!("192.0.2.12")).unwrap();
    instance.set_face_enabled(face_id, true).unwrap();

    instance
        .process_protocol_msg(ProtocolInputMsg::MidInterval(MidIntervalMsg {}));
    let sent = io.sent_packets();
    assert_eq!(sent.len(), 2);
    for sent_pkt in &sent {
        let mid_out = sent_pkt.pkt.messages[0].body.as_mid().unwrap();
        assert_eq!(mid_out.interfaces, vec![ip4!("192.0.2.12")]);
    }
}

#[test]
fn test_tc_origination_advertises_selectors() {
    let (mut instance, io, _rx) = new_instance();

    // Without MPR selectors no TC is emitted.
    instance
        .process_protocol_msg(ProtocolInputMsg::TcInterval(TcIntervalMsg {}));
    assert_eq!(io.sent_count(), 0);

    establish_adjacency(
        &mut instance,
        B,
        Willingness::HIGH,
        NeighborType::MprNeigh,
    );
    io.sent_packets();

    instance
        .process_protocol_msg(ProtocolInputMsg::TcInterval(TcIntervalMsg {}));
    let sent = io.sent_packets();
    assert_eq!(sent.len(), 1);
    let tc_out = sent[0].pkt.messages[0].body.as_tc().unwrap();
    assert_eq!(tc_out.neighbors, vec![B]);
}

#[test]
fn test_unknown_message_is_flooded() {
    let (mut instance, io, _rx) = new_instance();

    establish_adjacency(
        &mut instance,
        B,
        Willingness::HIGH,
        NeighborType::MprNeigh,
    );
    io.sent_packets();

    // A message type this implementation does not know, relayed by B.
    let bytes = vec![
        0x00, 0x14, 0x00, 0x07, // packet length 20, seqno 7
        0x80, 0xe7, 0x00, 0x10, // unknown type 128, vtime, size 16
        0xc0, 0x00, 0x02, 0x03, // origin 192.0.2.3
        0x0a, 0x00, 0x00, 0x2a, // ttl 10, hops 0, seqno 42
        0xde, 0xad, 0xbe, 0xef, // opaque body
    ];
    recv(&mut instance, B, Bytes::from(bytes));

    let sent = io.sent_packets();
    assert_eq!(sent.len(), 1);
    let fwd = &sent[0].pkt.messages[0];
    assert_eq!(fwd.msg_type(), 128);
    assert_eq!(fwd.hdr.ttl, 9);
    assert_eq!(fwd.hdr.hop_count, 1);
    let face = instance.iter_faces().next().unwrap();
    assert_eq!(face.counters.unknown_messages, 1);
}

#[test]
fn test_main_addr_restricted_to_enabled_faces() {
    let (mut instance, _io, _rx) = new_instance();

    assert_eq!(instance.main_addr(), A);
    assert!(instance.set_main_addr(ip4!("198.51.100.1")).is_err());
    assert!(instance.set_main_addr(A).is_ok());
}

//
// Emulated three-node line: A (eth0) --- (eth0) B (eth1) --- (eth0) C.
//
// Node B carries two interfaces; every packet a node transmits is handed
// to the instances on the same segment.
//

struct Node {
    instance: Instance,
    io: Arc<TestIo>,
    _rx: ProtocolInputChannelsRx,
}

const B2: Ipv4Addr = ip4!("192.0.2.12");

fn new_node(faces: &[(&str, Ipv4Addr)]) -> Node {
    let io = Arc::new(TestIo::default());
    let (mut instance, rx) =
        Instance::new(InstanceCfg::default(), io.clone(), None);

    for (ifname, addr) in faces {
        let face_id = instance.create_face(ifname, "vif0").unwrap();
        instance.set_local_addr(face_id, *addr).unwrap();
        instance.set_face_enabled(face_id, true).unwrap();
    }

    Node {
        instance,
        io,
        _rx: rx,
    }
}

fn deliver(node: &mut Node, ifname: &str, src: Ipv4Addr, data: &[u8]) {
    node.instance.process_protocol_msg(ProtocolInputMsg::PacketRx(
        PacketRxMsg {
            ifname: ifname.to_owned(),
            vifname: "vif0".to_owned(),
            src,
            sport: 698,
            dst: ip4!("255.255.255.255"),
            dport: 698,
            data: Bytes::from(data.to_vec()),
        },
    ));
}

// Moves transmitted packets across the emulated segments until the network
// is quiet. Forwarded floods are delivered in later iterations.
fn exchange(nodes: &mut [Node; 3]) {
    loop {
        let mut delivered = false;
        for i in 0..nodes.len() {
            let io = nodes[i].io.clone();
            for sent in io.sent_packets() {
                delivered = true;
                let targets: &[(usize, &str)] =
                    match (i, sent.ifname.as_str()) {
                        (0, "eth0") => &[(1, "eth0")],
                        (1, "eth0") => &[(0, "eth0")],
                        (1, "eth1") => &[(2, "eth0")],
                        (2, "eth0") => &[(1, "eth1")],
                        _ => &[],
                    };
                for (peer, ifname) in targets {
                    deliver(&mut nodes[*peer], ifname, sent.src, &sent.data);
                }
            }
        }
        if !delivered {
            break;
        }
    }
}

fn tick_hello(node: &mut Node) {
    node.instance
        .process_protocol_msg(ProtocolInputMsg::HelloInterval(
            HelloIntervalMsg {},
        ));
}

#[test]
fn test_three_node_line() {
    let mut nodes = [
        new_node(&[("eth0", A)]),
        new_node(&[("eth0", B), ("eth1", B2)]),
        new_node(&[("eth0", C)]),
    ];

    // Let link sensing, two-hop discovery and MPR selection stabilize:
    // one round to be heard, one to become symmetric, one to advertise the
    // two-hop neighborhood, one to advertise the MPR selection.
    for _ in 0..4 {
        for node in &mut nodes {
            tick_hello(node);
        }
        exchange(&mut nodes);
    }

    // The edge nodes selected the relay as MPR.
    let nbr_b = nodes[0]
        .instance
        .iter_neighbors()
        .find(|nbr| nbr.main_addr == B)
        .unwrap();
    assert!(nbr_b.is_sym);
    assert!(nbr_b.is_mpr);
    // The relay registered both MPR selectors.
    assert_eq!(
        nodes[1]
            .instance
            .iter_neighbors()
            .filter(|nbr| nbr.is_mpr_selector(std::time::Instant::now()))
            .count(),
        2
    );

    // Topology and MID dissemination.
    for node in &mut nodes {
        node.instance
            .process_protocol_msg(ProtocolInputMsg::TcInterval(
                TcIntervalMsg {},
            ));
        node.instance
            .process_protocol_msg(ProtocolInputMsg::MidInterval(
                MidIntervalMsg {},
            ));
    }
    exchange(&mut nodes);
    for node in &mut nodes {
        run_route_update(&mut node.instance);
    }

    // A learned the far edge through the relay's TC and routes to it.
    assert!(
        nodes[0].instance.topology_set().get(C, B).is_some()
            || nodes[0].instance.topology_set().get(C, B2).is_some()
    );
    let route_c = nodes[0]
        .instance
        .routes()
        .get(&Ipv4Network::from(C))
        .unwrap();
    assert_eq!(route_c.nexthop, B);
    assert!(route_c.metric >= 2);

    // A routes to the relay's second interface through the MID alias.
    let route_alias = nodes[0]
        .instance
        .routes()
        .get(&Ipv4Network::from(B2))
        .unwrap();
    assert_eq!(route_alias.nexthop, B);

    // C reaches the relay under both its link and main addresses, and A
    // beyond it.
    let c_routes = nodes[2].instance.routes();
    assert!(c_routes.contains_key(&Ipv4Network::from(B2)));
    assert!(c_routes.contains_key(&Ipv4Network::from(B)));
    let route_a = c_routes.get(&Ipv4Network::from(A)).unwrap();
    assert_eq!(route_a.nexthop, B2);
    let metric_to_a = route_a.metric;

    // An HNA prefix originated at one edge is flooded through the relay
    // and installed at the other edge.
    let prefix = net4!("203.0.113.0/24");
    assert!(nodes[0].instance.originate_hna(prefix));
    nodes[0]
        .instance
        .process_protocol_msg(ProtocolInputMsg::HnaInterval(
            HnaIntervalMsg {},
        ));
    exchange(&mut nodes);
    run_route_update(&mut nodes[2].instance);

    let route_hna = nodes[2].instance.routes().get(&prefix).unwrap();
    assert_eq!(route_hna.nexthop, B2);
    assert_eq!(route_hna.metric, metric_to_a);
}
