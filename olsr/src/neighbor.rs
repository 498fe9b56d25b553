//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::time::Instant;

use olsr_utils::task::TimeoutTask;

use crate::collections::{
    FaceIndex, LinkIndex, NeighborIndex, TwoHopLinkIndex,
};
use crate::debug::Debug;
use crate::instance::{InstanceArenas, InstanceView};
use crate::mpr;
use crate::packet::{HelloMessage, LinkCode, LinkMessage, MessageHdr};
use crate::route;
use crate::tasks;
use crate::tasks::messages::input::ExpiryMsg;
use crate::types::{
    FaceId, LinkId, LinkType, NeighborId, NeighborType, TcRedundancy,
    TwoHopLinkId, TwoHopNodeId, Willingness, eight_bit_time,
};

// A link between one of our interfaces and one interface of a neighbor.
#[derive(Debug)]
pub struct LogicalLink {
    pub id: LinkId,
    pub face_id: FaceId,
    pub local_addr: Ipv4Addr,
    pub remote_addr: Ipv4Addr,
    // The neighbor owning this link.
    pub neighbor_id: Option<NeighborId>,
    pub sym_time: Option<Instant>,
    pub asym_time: Option<Instant>,
    pub lost_time: Option<Instant>,
    pub hold_time: Instant,
    pub(crate) hold_timer: Option<TimeoutTask>,
}

// A one-hop neighbor, keyed by its main address.
#[derive(Debug)]
pub struct Neighbor {
    pub id: NeighborId,
    pub main_addr: Ipv4Addr,
    pub willingness: Willingness,
    pub is_sym: bool,
    pub is_mpr: bool,
    pub is_advertised: bool,
    // The number of symmetric neighbors this neighbor advertises,
    // excluding itself and this node. Used as the final MPR tie-breaker.
    pub degree: u32,
    pub mpr_selector_time: Option<Instant>,
    pub(crate) mpr_selector_timer: Option<TimeoutTask>,
    pub links: BTreeSet<LinkId>,
    pub twohop_links: BTreeSet<TwoHopLinkId>,
}

// A node reachable at radius two, keyed by its main address.
#[derive(Debug)]
pub struct TwoHopNode {
    pub id: TwoHopNodeId,
    pub main_addr: Ipv4Addr,
    // A strict two-hop neighbor is not also a one-hop neighbor.
    pub is_strict: bool,
    // Number of selected MPRs covering this node, updated by MPR selection.
    pub coverage: u32,
    pub links: BTreeSet<TwoHopLinkId>,
}

// A link from a one-hop neighbor to a two-hop node, learned from the
// neighbor's HELLO.
#[derive(Debug)]
pub struct TwoHopLink {
    pub id: TwoHopLinkId,
    pub nexthop_id: NeighborId,
    pub dest_addr: Ipv4Addr,
    pub dest_id: TwoHopNodeId,
    // The interface the advertising HELLO was received on.
    pub face_id: FaceId,
    pub hold_time: Instant,
    pub(crate) hold_timer: Option<TimeoutTask>,
}

// ===== impl LogicalLink =====

impl LogicalLink {
    pub(crate) fn new(
        id: LinkId,
        face_id: FaceId,
        local_addr: Ipv4Addr,
        remote_addr: Ipv4Addr,
    ) -> LogicalLink {
        LogicalLink {
            id,
            face_id,
            local_addr,
            remote_addr,
            neighbor_id: None,
            sym_time: None,
            asym_time: None,
            lost_time: None,
            hold_time: Instant::now(),
            hold_timer: None,
        }
    }

    // Derives the current link type from the link's time fields.
    pub fn link_type(&self, now: Instant) -> LinkType {
        if self.sym_time.is_some_and(|time| time > now) {
            LinkType::Sym
        } else if self.asym_time.is_some_and(|time| time > now) {
            LinkType::Asym
        } else if self.lost_time.is_some_and(|time| time > now) {
            LinkType::Lost
        } else {
            LinkType::Unspec
        }
    }

    pub fn is_sym(&self, now: Instant) -> bool {
        self.link_type(now) == LinkType::Sym
    }

    // Restarts the validity timer so that it fires at the next deadline of
    // interest: a link state transition or the final hold time expiry.
    pub(crate) fn restart_timer(&mut self, view: &InstanceView<'_>) {
        let now = Instant::now();
        let next = [self.sym_time, self.asym_time, self.lost_time]
            .into_iter()
            .flatten()
            .chain(std::iter::once(self.hold_time))
            .filter(|time| *time > now)
            .min()
            .unwrap_or(self.hold_time);

        let timeout = next.saturating_duration_since(now);
        let task = tasks::expiry_timer(
            ExpiryMsg::Link(self.id),
            timeout,
            &view.tx.expiry,
        );
        self.hold_timer = Some(task);
    }
}

impl std::fmt::Display for LogicalLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "link {} -> {} ({:?})",
            self.local_addr,
            self.remote_addr,
            self.link_type(Instant::now())
        )
    }
}

// ===== impl Neighbor =====

impl Neighbor {
    pub(crate) fn new(id: NeighborId, main_addr: Ipv4Addr) -> Neighbor {
        Debug::NeighborCreate(&main_addr).log();

        Neighbor {
            id,
            main_addr,
            willingness: Willingness::DEFAULT,
            is_sym: false,
            is_mpr: false,
            is_advertised: false,
            degree: 0,
            mpr_selector_time: None,
            mpr_selector_timer: None,
            links: Default::default(),
            twohop_links: Default::default(),
        }
    }

    pub fn is_mpr_selector(&self, now: Instant) -> bool {
        self.mpr_selector_time.is_some_and(|time| time > now)
    }
}

impl std::fmt::Display for Neighbor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "neighbor {} willingness {} sym {} mpr {} degree {} links {}",
            self.main_addr,
            self.willingness,
            self.is_sym,
            self.is_mpr,
            self.degree,
            self.links.len()
        )
    }
}

// ===== impl TwoHopNode =====

impl TwoHopNode {
    pub(crate) fn new(
        id: TwoHopNodeId,
        main_addr: Ipv4Addr,
        is_strict: bool,
    ) -> TwoHopNode {
        Debug::TwoHopNodeCreate(&main_addr).log();

        TwoHopNode {
            id,
            main_addr,
            is_strict,
            coverage: 0,
            links: Default::default(),
        }
    }
}

impl std::fmt::Display for TwoHopNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "two-hop {} strict {} coverage {}",
            self.main_addr, self.is_strict, self.coverage
        )
    }
}

// ===== impl TwoHopLink =====

impl TwoHopLink {
    pub(crate) fn new(
        id: TwoHopLinkId,
        nexthop_id: NeighborId,
        dest_addr: Ipv4Addr,
        dest_id: TwoHopNodeId,
        face_id: FaceId,
    ) -> TwoHopLink {
        TwoHopLink {
            id,
            nexthop_id,
            dest_addr,
            dest_id,
            face_id,
            hold_time: Instant::now(),
            hold_timer: None,
        }
    }

    pub(crate) fn restart_timer(&mut self, view: &InstanceView<'_>) {
        let timeout =
            self.hold_time.saturating_duration_since(Instant::now());
        let task = tasks::expiry_timer(
            ExpiryMsg::TwoHopLink(self.id),
            timeout,
            &view.tx.expiry,
        );
        self.hold_timer = Some(task);
    }
}

// ===== global functions =====

// Processes a received HELLO message (RFC 3626 sections 7 and 8).
pub(crate) fn process_hello(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
    face_idx: FaceIndex,
    src: Ipv4Addr,
    hdr: &MessageHdr,
    hello: &HelloMessage,
) {
    let now = Instant::now();
    let vtime = eight_bit_time::to_duration(hdr.vtime);
    let face = &arenas.face_arena[face_idx];
    let face_id = face.id;
    let face_local = face.local_addr;

    let mut changed = false;

    // Link sensing: find or create the link keyed by the address pair.
    let link_idx = match arenas.links.get_by_addrs(
        &arenas.link_arena,
        face_local,
        src,
    ) {
        Some((link_idx, _)) => link_idx,
        None => {
            let (link_idx, _) = arenas.links.insert(
                &mut arenas.link_arena,
                face_id,
                face_local,
                src,
            );
            Debug::LinkCreate(&face_local, &src).log();
            changed = true;
            link_idx
        }
    };

    let link = &mut arenas.link_arena[link_idx];
    let old_link_type = link.link_type(now);

    // Hearing the neighbor at all refreshes the asymmetric lifetime.
    link.asym_time = Some(now + vtime);

    // Update the symmetric lifetime from any link message that lists the
    // address of the receiving interface.
    for lmsg in &hello.links {
        if !lmsg.addrs.contains(&face_local) {
            continue;
        }
        match lmsg.code.link_type {
            LinkType::Sym | LinkType::Asym => {
                link.sym_time = Some(now + vtime);
                link.lost_time = None;
            }
            LinkType::Lost => {
                link.sym_time = None;
                link.asym_time = None;
                link.lost_time = Some(now + vtime);
            }
            LinkType::Unspec => (),
        }
    }

    // The hold time keeps the link alive at least as long as any of its
    // state lifetimes.
    link.hold_time = [link.sym_time, link.asym_time, link.lost_time]
        .into_iter()
        .flatten()
        .chain(std::iter::once(now + vtime))
        .max()
        .unwrap();
    link.restart_timer(view);

    if link.link_type(now) != old_link_type {
        changed = true;
    }

    // Neighbor update: bind the link to the neighbor owning the source
    // address, creating the neighbor if this is its first link. The
    // originator field of a HELLO carries the sender's main address.
    let main_addr = view
        .state
        .mid
        .resolve_main_addr(src)
        .unwrap_or(hdr.origin);
    let nbr_idx = match link.neighbor_id {
        Some(nbr_id) => {
            arenas
                .neighbors
                .get_by_id(&arenas.neighbor_arena, nbr_id)
                .expect("link owner must exist")
                .0
        }
        None => {
            let nbr_idx = match arenas
                .neighbors
                .get_by_main_addr(&arenas.neighbor_arena, main_addr)
            {
                Some((nbr_idx, _)) => nbr_idx,
                None => {
                    let (nbr_idx, _) = arenas
                        .neighbors
                        .insert(&mut arenas.neighbor_arena, main_addr);
                    changed = true;
                    nbr_idx
                }
            };
            let link = &mut arenas.link_arena[link_idx];
            let nbr = &mut arenas.neighbor_arena[nbr_idx];
            link.neighbor_id = Some(nbr.id);
            nbr.links.insert(link.id);
            nbr_idx
        }
    };

    let nbr = &mut arenas.neighbor_arena[nbr_idx];
    let nbr_id = nbr.id;
    if nbr.willingness != hello.willingness {
        nbr.willingness = hello.willingness;
        changed = true;
    }
    if refresh_neighbor_sym(arenas, nbr_idx, now) {
        changed = true;
    }

    // Degree update: the size of the symmetric neighborhood the originator
    // advertises, itself and this node excluded.
    let local_addrs = local_addrs(arenas);
    let mut advertised: BTreeSet<Ipv4Addr> = BTreeSet::new();
    for lmsg in &hello.links {
        if !matches!(
            lmsg.code.neighbor_type,
            NeighborType::SymNeigh | NeighborType::MprNeigh
        ) {
            continue;
        }
        for addr in &lmsg.addrs {
            let dest_addr = view
                .state
                .mid
                .resolve_main_addr(*addr)
                .unwrap_or(*addr);
            if local_addrs.contains(addr)
                || local_addrs.contains(&dest_addr)
                || dest_addr == view.state.main_addr
                || dest_addr == main_addr
            {
                continue;
            }
            advertised.insert(dest_addr);
        }
    }
    let nbr = &mut arenas.neighbor_arena[nbr_idx];
    if nbr.degree != advertised.len() as u32 {
        nbr.degree = advertised.len() as u32;
        changed = true;
    }

    // Two-hop neighborhood update. Only link messages of a HELLO received
    // over a symmetric link contribute.
    let link_is_sym = arenas.link_arena[link_idx].is_sym(now);
    if link_is_sym
        && process_hello_twohop(view, arenas, face_id, nbr_idx, hdr, hello)
    {
        changed = true;
    }

    // MPR selector update: the originator selects us as MPR iff its most
    // recent HELLO lists one of our addresses with neighbor type MPR.
    let mut listed = None;
    for lmsg in &hello.links {
        if lmsg.addrs.iter().any(|addr| {
            local_addrs.contains(addr) || *addr == view.state.main_addr
        }) {
            let is_mpr = lmsg.code.neighbor_type == NeighborType::MprNeigh;
            listed = Some(listed.unwrap_or(false) || is_mpr);
        }
    }
    if let Some(selected) = listed {
        let nbr = &mut arenas.neighbor_arena[nbr_idx];
        let was_selector = nbr.is_mpr_selector(now);
        if selected {
            nbr.mpr_selector_time = Some(now + vtime);
            let task = tasks::expiry_timer(
                ExpiryMsg::MprSelector(nbr_id),
                vtime,
                &view.tx.expiry,
            );
            nbr.mpr_selector_timer = Some(task);
            if !was_selector {
                Debug::MprSelectorAdd(&nbr.main_addr).log();
                changed = true;
            }
        } else if was_selector {
            Debug::MprSelectorExpire(&nbr.main_addr).log();
            nbr.mpr_selector_time = None;
            nbr.mpr_selector_timer = None;
            changed = true;
        }
    }

    if changed {
        on_neighborhood_change(view, arenas);
    }
}

// Registers the two-hop neighborhood advertised by a HELLO.
fn process_hello_twohop(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
    face_id: FaceId,
    nbr_idx: NeighborIndex,
    hdr: &MessageHdr,
    hello: &HelloMessage,
) -> bool {
    let now = Instant::now();
    let vtime = eight_bit_time::to_duration(hdr.vtime);
    let nbr_id = arenas.neighbor_arena[nbr_idx].id;
    let nbr_main = arenas.neighbor_arena[nbr_idx].main_addr;
    let local_addrs = local_addrs(arenas);

    let mut changed = false;

    for lmsg in &hello.links {
        match lmsg.code.neighbor_type {
            NeighborType::SymNeigh | NeighborType::MprNeigh => (),
            // An address demoted to non-neighbor withdraws the
            // corresponding two-hop link.
            NeighborType::NotNeigh => {
                for addr in &lmsg.addrs {
                    let dest_addr = view
                        .state
                        .mid
                        .resolve_main_addr(*addr)
                        .unwrap_or(*addr);
                    if let Some((l2_idx, _)) = arenas
                        .twohop_links
                        .get_mut_by_key(
                            &mut arenas.twohop_link_arena,
                            nbr_id,
                            dest_addr,
                        )
                    {
                        delete_twohop_link(arenas, l2_idx);
                        changed = true;
                    }
                }
                continue;
            }
        }

        for addr in &lmsg.addrs {
            let dest_addr = view
                .state
                .mid
                .resolve_main_addr(*addr)
                .unwrap_or(*addr);

            // Our own addresses never form two-hop entries.
            if dest_addr == view.state.main_addr
                || local_addrs.contains(addr)
                || local_addrs.contains(&dest_addr)
            {
                continue;
            }
            // The neighbor advertising itself adds no information.
            if dest_addr == nbr_main {
                continue;
            }

            // Find or create the two-hop node.
            let is_onehop = arenas
                .neighbors
                .get_by_main_addr(&arenas.neighbor_arena, dest_addr)
                .is_some_and(|(_, nbr)| nbr.is_sym);
            let n2_idx = match arenas
                .twohop_nodes
                .get_by_main_addr(&arenas.twohop_node_arena, dest_addr)
            {
                Some((n2_idx, _)) => n2_idx,
                None => {
                    let (n2_idx, _) = arenas.twohop_nodes.insert(
                        &mut arenas.twohop_node_arena,
                        dest_addr,
                        !is_onehop,
                    );
                    changed = true;
                    n2_idx
                }
            };
            arenas.twohop_node_arena[n2_idx].is_strict = !is_onehop;

            // Find or create the two-hop link and refresh its lifetime.
            let l2_idx = match arenas.twohop_links.get_mut_by_key(
                &mut arenas.twohop_link_arena,
                nbr_id,
                dest_addr,
            ) {
                Some((l2_idx, _)) => l2_idx,
                None => {
                    let n2_id = arenas.twohop_node_arena[n2_idx].id;
                    let (l2_idx, l2) = arenas.twohop_links.insert(
                        &mut arenas.twohop_link_arena,
                        nbr_id,
                        dest_addr,
                        n2_id,
                        face_id,
                    );
                    let l2_id = l2.id;
                    arenas.twohop_node_arena[n2_idx].links.insert(l2_id);
                    arenas.neighbor_arena[nbr_idx].twohop_links.insert(l2_id);
                    changed = true;
                    l2_idx
                }
            };
            let l2 = &mut arenas.twohop_link_arena[l2_idx];
            l2.face_id = face_id;
            l2.hold_time = now + vtime;
            l2.restart_timer(view);
        }
    }

    changed
}

// Recomputes a neighbor's symmetry flag as an OR over its links.
pub(crate) fn refresh_neighbor_sym(
    arenas: &mut InstanceArenas,
    nbr_idx: NeighborIndex,
    now: Instant,
) -> bool {
    let nbr = &arenas.neighbor_arena[nbr_idx];
    let is_sym = nbr.links.iter().any(|link_id| {
        arenas
            .links
            .get_by_id(&arenas.link_arena, *link_id)
            .map(|(_, link)| link.is_sym(now))
            .unwrap_or(false)
    });

    let nbr = &mut arenas.neighbor_arena[nbr_idx];
    if nbr.is_sym != is_sym {
        nbr.is_sym = is_sym;
        return true;
    }
    false
}

// Handles the expiry of a link's validity timer. The timer fires on every
// link state deadline; the link itself is destroyed only once its hold time
// has elapsed.
pub(crate) fn process_link_expiry(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
    link_id: LinkId,
) {
    let Ok((link_idx, link)) =
        arenas.links.get_by_id(&arenas.link_arena, link_id)
    else {
        return;
    };

    let now = Instant::now();
    if link.hold_time <= now {
        delete_link(arenas, link_idx);
        on_neighborhood_change(view, arenas);
        return;
    }

    // A state lifetime expired; re-derive the link state and wake up again
    // at the next deadline.
    let link = &mut arenas.link_arena[link_idx];
    link.restart_timer(view);
    let neighbor_id = link.neighbor_id;

    let mut changed = false;
    if let Some(nbr_id) = neighbor_id
        && let Ok((nbr_idx, _)) =
            arenas.neighbors.get_by_id(&arenas.neighbor_arena, nbr_id)
        && refresh_neighbor_sym(arenas, nbr_idx, now)
    {
        changed = true;
    }

    if changed {
        on_neighborhood_change(view, arenas);
    }
}

// Handles the expiry of a neighbor's MPR selector lifetime.
pub(crate) fn process_mpr_selector_expiry(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
    nbr_id: NeighborId,
) {
    let Ok((_, nbr)) =
        arenas.neighbors.get_mut_by_id(&mut arenas.neighbor_arena, nbr_id)
    else {
        return;
    };

    let now = Instant::now();
    if nbr.mpr_selector_time.is_some_and(|time| time <= now) {
        Debug::MprSelectorExpire(&nbr.main_addr).log();
        nbr.mpr_selector_time = None;
        nbr.mpr_selector_timer = None;
        on_neighborhood_change(view, arenas);
    }
}

// Handles the expiry of a two-hop link's validity timer.
pub(crate) fn process_twohop_link_expiry(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
    l2_id: TwoHopLinkId,
) {
    let Ok((l2_idx, l2)) = arenas
        .twohop_links
        .get_by_id(&arenas.twohop_link_arena, l2_id)
    else {
        return;
    };

    if l2.hold_time <= Instant::now() {
        delete_twohop_link(arenas, l2_idx);
        on_neighborhood_change(view, arenas);
    }
}

// Destroys a link; a neighbor losing its last link is destroyed with it.
pub(crate) fn delete_link(arenas: &mut InstanceArenas, link_idx: LinkIndex) {
    let link = &arenas.link_arena[link_idx];
    let link_id = link.id;
    let neighbor_id = link.neighbor_id;
    Debug::LinkDelete(&link.local_addr, &link.remote_addr).log();

    arenas.links.delete(&mut arenas.link_arena, link_idx);

    if let Some(nbr_id) = neighbor_id
        && let Ok((nbr_idx, nbr)) =
            arenas.neighbors.get_mut_by_id(&mut arenas.neighbor_arena, nbr_id)
    {
        nbr.links.remove(&link_id);
        if nbr.links.is_empty() {
            delete_neighbor(arenas, nbr_idx);
        } else {
            refresh_neighbor_sym(arenas, nbr_idx, Instant::now());
        }
    }
}

// Destroys all links bound to the given interface.
pub(crate) fn delete_links_by_face(
    arenas: &mut InstanceArenas,
    face_id: FaceId,
) -> bool {
    let link_indexes = arenas
        .links
        .indexes()
        .filter(|link_idx| arenas.link_arena[*link_idx].face_id == face_id)
        .collect::<Vec<_>>();

    let changed = !link_indexes.is_empty();
    for link_idx in link_indexes {
        delete_link(arenas, link_idx);
    }
    changed
}

// Destroys a neighbor together with the two-hop links reached through it.
fn delete_neighbor(arenas: &mut InstanceArenas, nbr_idx: NeighborIndex) {
    let nbr = &arenas.neighbor_arena[nbr_idx];
    Debug::NeighborDelete(&nbr.main_addr).log();

    let twohop_links = nbr.twohop_links.iter().copied().collect::<Vec<_>>();
    for l2_id in twohop_links {
        if let Ok((l2_idx, _)) = arenas
            .twohop_links
            .get_by_id(&arenas.twohop_link_arena, l2_id)
        {
            delete_twohop_link(arenas, l2_idx);
        }
    }

    arenas.neighbors.delete(&mut arenas.neighbor_arena, nbr_idx);
}

// Destroys a two-hop link; a two-hop node losing its last link is destroyed
// with it.
fn delete_twohop_link(arenas: &mut InstanceArenas, l2_idx: TwoHopLinkIndex) {
    let l2 = &arenas.twohop_link_arena[l2_idx];
    let l2_id = l2.id;
    let nexthop_id = l2.nexthop_id;
    let dest_id = l2.dest_id;

    arenas
        .twohop_links
        .delete(&mut arenas.twohop_link_arena, l2_idx);

    if let Ok((nbr_idx, _)) =
        arenas.neighbors.get_by_id(&arenas.neighbor_arena, nexthop_id)
    {
        arenas.neighbor_arena[nbr_idx].twohop_links.remove(&l2_id);
    }

    if let Ok((n2_idx, n2)) = arenas
        .twohop_nodes
        .get_mut_by_id(&mut arenas.twohop_node_arena, dest_id)
    {
        n2.links.remove(&l2_id);
        if n2.links.is_empty() {
            Debug::TwoHopNodeDelete(&n2.main_addr).log();
            arenas
                .twohop_nodes
                .delete(&mut arenas.twohop_node_arena, n2_idx);
        }
    }
}

// Reacts to any change in the one-hop or two-hop neighborhood: reselects
// MPRs, refreshes the advertised neighbor set and schedules a route
// recomputation.
pub(crate) fn on_neighborhood_change(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
) {
    mpr::select_mprs(view, arenas);

    if update_advertised_set(view, arenas) {
        view.state.ansn = view.state.ansn.wrapping_add(1);
        Debug::AnsnIncrement(view.state.ansn).log();
    }

    route::schedule_route_update(view.state, view.tx);
}

// Refreshes the per-neighbor advertised flag according to TC_REDUNDANCY.
// Returns true if the advertised neighbor set changed.
fn update_advertised_set(
    view: &mut InstanceView<'_>,
    arenas: &mut InstanceArenas,
) -> bool {
    let now = Instant::now();
    let mut changed = false;

    for (_, nbr) in arenas.neighbor_arena.iter_mut() {
        let is_advertised = nbr.is_sym
            && match view.config.tc_redundancy {
                TcRedundancy::MprsIn => nbr.is_mpr_selector(now),
                TcRedundancy::MprsInOut => {
                    nbr.is_mpr_selector(now) || nbr.is_mpr
                }
                TcRedundancy::All => true,
            };
        if nbr.is_advertised != is_advertised {
            nbr.is_advertised = is_advertised;
            changed = true;
        }
    }

    changed
}

// Populates the link state portion of an outgoing HELLO for the given
// interface, grouping remote addresses by link code.
//
// Links on other interfaces are advertised too, with link type UNSPEC, so
// every neighbor is visible in every HELLO (RFC 3626 section 6.2).
pub(crate) fn populate_hello(
    view: &InstanceView<'_>,
    arenas: &InstanceArenas,
    face_id: FaceId,
) -> HelloMessage {
    let now = Instant::now();
    let mut groups: Vec<(LinkCode, Vec<Ipv4Addr>)> = vec![];

    for link in arenas.links.iter(&arenas.link_arena) {
        let link_type = if link.face_id == face_id {
            link.link_type(now)
        } else {
            LinkType::Unspec
        };
        let neighbor_type = link
            .neighbor_id
            .and_then(|nbr_id| {
                arenas
                    .neighbors
                    .get_by_id(&arenas.neighbor_arena, nbr_id)
                    .ok()
            })
            .map(|(_, nbr)| {
                if nbr.is_mpr {
                    NeighborType::MprNeigh
                } else if nbr.is_sym {
                    NeighborType::SymNeigh
                } else {
                    NeighborType::NotNeigh
                }
            })
            .unwrap_or(NeighborType::NotNeigh);

        let code = LinkCode::new(link_type, neighbor_type);
        match groups.iter_mut().find(|(c, _)| *c == code) {
            Some((_, addrs)) => addrs.push(link.remote_addr),
            None => groups.push((code, vec![link.remote_addr])),
        }
    }

    let links = groups
        .into_iter()
        .map(|(code, addrs)| LinkMessage::new(code, addrs))
        .collect();

    HelloMessage {
        htime: eight_bit_time::from_duration(view.config.hello_interval),
        willingness: view.config.willingness,
        links,
    }
}

// Returns whether the given interface address belongs to a symmetric
// one-hop neighbor.
pub(crate) fn is_sym_neighbor_addr(
    arenas: &InstanceArenas,
    now: Instant,
    addr: Ipv4Addr,
) -> bool {
    arenas
        .links
        .iter_by_remote_addr(&arenas.link_arena, addr)
        .any(|(_, link)| link.is_sym(now))
}

// Returns whether the given interface address belongs to a neighbor which
// has selected us as MPR.
pub(crate) fn is_mpr_selector_addr(
    arenas: &InstanceArenas,
    now: Instant,
    addr: Ipv4Addr,
) -> bool {
    arenas
        .links
        .iter_by_remote_addr(&arenas.link_arena, addr)
        .filter_map(|(_, link)| link.neighbor_id)
        .filter_map(|nbr_id| {
            arenas
                .neighbors
                .get_by_id(&arenas.neighbor_arena, nbr_id)
                .ok()
        })
        .any(|(_, nbr)| nbr.is_mpr_selector(now))
}

// Returns the set of local interface addresses.
pub(crate) fn local_addrs(arenas: &InstanceArenas) -> BTreeSet<Ipv4Addr> {
    arenas
        .faces
        .iter(&arenas.face_arena)
        .map(|face| face.local_addr)
        .collect()
}
