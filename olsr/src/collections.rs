//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, HashMap};
use std::net::Ipv4Addr;

use generational_arena::Index;

use crate::error::Error;
use crate::interface::Face;
use crate::neighbor::{LogicalLink, Neighbor, TwoHopLink, TwoHopNode};
use crate::types::{
    FaceId, LinkId, NeighborId, ObjectId, TwoHopLinkId, TwoHopNodeId,
};

pub type FaceIndex = Index;
pub type LinkIndex = Index;
pub type NeighborIndex = Index;
pub type TwoHopNodeIndex = Index;
pub type TwoHopLinkIndex = Index;

#[derive(Debug)]
pub struct Arena<T>(generational_arena::Arena<T>);

#[derive(Debug, Default)]
pub struct Faces {
    id_tree: HashMap<FaceId, FaceIndex>,
    name_tree: BTreeMap<(String, String), FaceIndex>,
    next_id: ObjectId,
}

#[derive(Debug, Default)]
pub struct Links {
    id_tree: HashMap<LinkId, LinkIndex>,
    addr_tree: BTreeMap<(Ipv4Addr, Ipv4Addr), LinkIndex>,
    next_id: ObjectId,
}

#[derive(Debug, Default)]
pub struct Neighbors {
    id_tree: HashMap<NeighborId, NeighborIndex>,
    addr_tree: BTreeMap<Ipv4Addr, NeighborIndex>,
    next_id: ObjectId,
}

#[derive(Debug, Default)]
pub struct TwoHopNodes {
    id_tree: HashMap<TwoHopNodeId, TwoHopNodeIndex>,
    addr_tree: BTreeMap<Ipv4Addr, TwoHopNodeIndex>,
    next_id: ObjectId,
}

#[derive(Debug, Default)]
pub struct TwoHopLinks {
    id_tree: HashMap<TwoHopLinkId, TwoHopLinkIndex>,
    key_tree: BTreeMap<(NeighborId, Ipv4Addr), TwoHopLinkIndex>,
    next_id: ObjectId,
}

// ===== impl Arena =====

impl<T> Arena<T> {
    #[expect(unused)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (Index, &T)> {
        self.0.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (Index, &mut T)> {
        self.0.iter_mut()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Arena<T> {
        Arena(Default::default())
    }
}

impl<T> std::ops::Index<Index> for Arena<T> {
    type Output = T;

    fn index(&self, index: Index) -> &Self::Output {
        &self.0[index]
    }
}

impl<T> std::ops::IndexMut<Index> for Arena<T> {
    fn index_mut(&mut self, index: Index) -> &mut Self::Output {
        &mut self.0[index]
    }
}

// ===== impl Faces =====

impl Faces {
    pub(crate) fn insert<'a>(
        &mut self,
        arena: &'a mut Arena<Face>,
        ifname: &str,
        vifname: &str,
    ) -> (FaceIndex, &'a mut Face) {
        self.next_id += 1;
        let face =
            Face::new(self.next_id, ifname.to_owned(), vifname.to_owned());
        let face_idx = arena.0.insert(face);

        let face = &mut arena[face_idx];
        self.id_tree.insert(face.id, face_idx);
        if self
            .name_tree
            .insert((face.ifname.clone(), face.vifname.clone()), face_idx)
            .is_some()
        {
            panic!("face {}/{} already exists", face.ifname, face.vifname);
        }

        (face_idx, face)
    }

    pub(crate) fn delete(
        &mut self,
        arena: &mut Arena<Face>,
        face_idx: FaceIndex,
    ) {
        let face = &mut arena[face_idx];

        self.id_tree.remove(&face.id);
        self.name_tree
            .remove(&(face.ifname.clone(), face.vifname.clone()));

        arena.0.remove(face_idx);
    }

    // Returns a reference to the face corresponding to the given ID.
    pub(crate) fn get_by_id<'a>(
        &self,
        arena: &'a Arena<Face>,
        id: FaceId,
    ) -> Result<(FaceIndex, &'a Face), Error> {
        self.id_tree
            .get(&id)
            .copied()
            .map(|face_idx| (face_idx, &arena[face_idx]))
            .ok_or(Error::BadFace(id))
    }

    // Returns a mutable reference to the face corresponding to the given ID.
    pub(crate) fn get_mut_by_id<'a>(
        &mut self,
        arena: &'a mut Arena<Face>,
        id: FaceId,
    ) -> Result<(FaceIndex, &'a mut Face), Error> {
        self.id_tree
            .get(&id)
            .copied()
            .map(move |face_idx| (face_idx, &mut arena[face_idx]))
            .ok_or(Error::BadFace(id))
    }

    // Returns a reference to the face bound to the given interface/vif pair.
    pub(crate) fn get_by_name<'a>(
        &self,
        arena: &'a Arena<Face>,
        ifname: &str,
        vifname: &str,
    ) -> Option<(FaceIndex, &'a Face)> {
        self.name_tree
            .get(&(ifname.to_owned(), vifname.to_owned()))
            .copied()
            .map(|face_idx| (face_idx, &arena[face_idx]))
    }

    // Returns a mutable reference to the face bound to the given
    // interface/vif pair.
    #[expect(unused)]
    pub(crate) fn get_mut_by_name<'a>(
        &mut self,
        arena: &'a mut Arena<Face>,
        ifname: &str,
        vifname: &str,
    ) -> Option<(FaceIndex, &'a mut Face)> {
        self.name_tree
            .get(&(ifname.to_owned(), vifname.to_owned()))
            .copied()
            .map(move |face_idx| (face_idx, &mut arena[face_idx]))
    }

    // Returns an iterator visiting all faces.
    //
    // Faces are ordered by their interface/vif names.
    pub(crate) fn iter<'a>(
        &'a self,
        arena: &'a Arena<Face>,
    ) -> impl Iterator<Item = &'a Face> + 'a {
        self.name_tree.values().map(|face_idx| &arena[*face_idx])
    }

    // Returns an iterator over all face indexes.
    //
    // Faces are ordered by their interface/vif names.
    pub(crate) fn indexes(&self) -> impl Iterator<Item = FaceIndex> + '_ {
        self.name_tree.values().copied()
    }
}

// ===== impl Links =====

impl Links {
    pub(crate) fn insert<'a>(
        &mut self,
        arena: &'a mut Arena<LogicalLink>,
        face_id: FaceId,
        local_addr: Ipv4Addr,
        remote_addr: Ipv4Addr,
    ) -> (LinkIndex, &'a mut LogicalLink) {
        self.next_id += 1;
        let link =
            LogicalLink::new(self.next_id, face_id, local_addr, remote_addr);
        let link_idx = arena.0.insert(link);

        let link = &mut arena[link_idx];
        self.id_tree.insert(link.id, link_idx);
        if self
            .addr_tree
            .insert((link.local_addr, link.remote_addr), link_idx)
            .is_some()
        {
            panic!(
                "link {}:{} already exists",
                link.local_addr, link.remote_addr
            );
        }

        (link_idx, link)
    }

    pub(crate) fn delete(
        &mut self,
        arena: &mut Arena<LogicalLink>,
        link_idx: LinkIndex,
    ) {
        let link = &mut arena[link_idx];

        self.id_tree.remove(&link.id);
        self.addr_tree.remove(&(link.local_addr, link.remote_addr));

        arena.0.remove(link_idx);
    }

    // Returns a reference to the link corresponding to the given ID.
    pub(crate) fn get_by_id<'a>(
        &self,
        arena: &'a Arena<LogicalLink>,
        id: LinkId,
    ) -> Result<(LinkIndex, &'a LogicalLink), Error> {
        self.id_tree
            .get(&id)
            .copied()
            .map(|link_idx| (link_idx, &arena[link_idx]))
            .ok_or(Error::BadLink(id))
    }

    // Returns a mutable reference to the link corresponding to the given ID.
    #[expect(unused)]
    pub(crate) fn get_mut_by_id<'a>(
        &mut self,
        arena: &'a mut Arena<LogicalLink>,
        id: LinkId,
    ) -> Result<(LinkIndex, &'a mut LogicalLink), Error> {
        self.id_tree
            .get(&id)
            .copied()
            .map(move |link_idx| (link_idx, &mut arena[link_idx]))
            .ok_or(Error::BadLink(id))
    }

    // Returns a reference to the link keyed by the given address pair.
    pub(crate) fn get_by_addrs<'a>(
        &self,
        arena: &'a Arena<LogicalLink>,
        local_addr: Ipv4Addr,
        remote_addr: Ipv4Addr,
    ) -> Option<(LinkIndex, &'a LogicalLink)> {
        self.addr_tree
            .get(&(local_addr, remote_addr))
            .copied()
            .map(|link_idx| (link_idx, &arena[link_idx]))
    }

    // Returns an iterator over the links whose remote endpoint matches the
    // given address. There is one link per local interface the remote
    // endpoint is heard on.
    pub(crate) fn iter_by_remote_addr<'a>(
        &'a self,
        arena: &'a Arena<LogicalLink>,
        remote_addr: Ipv4Addr,
    ) -> impl Iterator<Item = (LinkIndex, &'a LogicalLink)> + 'a {
        self.addr_tree
            .iter()
            .filter(move |((_, remote), _)| *remote == remote_addr)
            .map(|(_, link_idx)| (*link_idx, &arena[*link_idx]))
    }

    // Returns an iterator visiting all links.
    //
    // Links are ordered by their local/remote address pairs.
    pub(crate) fn iter<'a>(
        &'a self,
        arena: &'a Arena<LogicalLink>,
    ) -> impl Iterator<Item = &'a LogicalLink> + 'a {
        self.addr_tree.values().map(|link_idx| &arena[*link_idx])
    }

    // Returns an iterator over all link indexes.
    pub(crate) fn indexes(&self) -> impl Iterator<Item = LinkIndex> + '_ {
        self.addr_tree.values().copied()
    }
}

// ===== impl Neighbors =====

impl Neighbors {
    pub(crate) fn insert<'a>(
        &mut self,
        arena: &'a mut Arena<Neighbor>,
        main_addr: Ipv4Addr,
    ) -> (NeighborIndex, &'a mut Neighbor) {
        self.next_id += 1;
        let nbr = Neighbor::new(self.next_id, main_addr);
        let nbr_idx = arena.0.insert(nbr);

        let nbr = &mut arena[nbr_idx];
        self.id_tree.insert(nbr.id, nbr_idx);
        if self.addr_tree.insert(nbr.main_addr, nbr_idx).is_some() {
            panic!("neighbor {} already exists", nbr.main_addr);
        }

        (nbr_idx, nbr)
    }

    pub(crate) fn delete(
        &mut self,
        arena: &mut Arena<Neighbor>,
        nbr_idx: NeighborIndex,
    ) {
        let nbr = &mut arena[nbr_idx];

        self.id_tree.remove(&nbr.id);
        self.addr_tree.remove(&nbr.main_addr);

        arena.0.remove(nbr_idx);
    }

    // Returns a reference to the neighbor corresponding to the given ID.
    pub(crate) fn get_by_id<'a>(
        &self,
        arena: &'a Arena<Neighbor>,
        id: NeighborId,
    ) -> Result<(NeighborIndex, &'a Neighbor), Error> {
        self.id_tree
            .get(&id)
            .copied()
            .map(|nbr_idx| (nbr_idx, &arena[nbr_idx]))
            .ok_or(Error::BadNeighbor(id))
    }

    // Returns a mutable reference to the neighbor corresponding to the given
    // ID.
    pub(crate) fn get_mut_by_id<'a>(
        &mut self,
        arena: &'a mut Arena<Neighbor>,
        id: NeighborId,
    ) -> Result<(NeighborIndex, &'a mut Neighbor), Error> {
        self.id_tree
            .get(&id)
            .copied()
            .map(move |nbr_idx| (nbr_idx, &mut arena[nbr_idx]))
            .ok_or(Error::BadNeighbor(id))
    }

    // Returns a reference to the neighbor corresponding to the given main
    // address.
    pub(crate) fn get_by_main_addr<'a>(
        &self,
        arena: &'a Arena<Neighbor>,
        main_addr: Ipv4Addr,
    ) -> Option<(NeighborIndex, &'a Neighbor)> {
        self.addr_tree
            .get(&main_addr)
            .copied()
            .map(|nbr_idx| (nbr_idx, &arena[nbr_idx]))
    }

    // Returns a mutable reference to the neighbor corresponding to the given
    // main address.
    #[expect(unused)]
    pub(crate) fn get_mut_by_main_addr<'a>(
        &mut self,
        arena: &'a mut Arena<Neighbor>,
        main_addr: Ipv4Addr,
    ) -> Option<(NeighborIndex, &'a mut Neighbor)> {
        self.addr_tree
            .get(&main_addr)
            .copied()
            .map(move |nbr_idx| (nbr_idx, &mut arena[nbr_idx]))
    }

    // Returns an iterator visiting all neighbors.
    //
    // Neighbors are ordered by their main addresses.
    pub(crate) fn iter<'a>(
        &'a self,
        arena: &'a Arena<Neighbor>,
    ) -> impl Iterator<Item = &'a Neighbor> + 'a {
        self.addr_tree.values().map(|nbr_idx| &arena[*nbr_idx])
    }

    // Returns an iterator over all neighbor indexes.
    //
    // Neighbors are ordered by their main addresses.
    #[expect(unused)]
    pub(crate) fn indexes(&self) -> impl Iterator<Item = NeighborIndex> + '_ {
        self.addr_tree.values().copied()
    }
}

// ===== impl TwoHopNodes =====

impl TwoHopNodes {
    pub(crate) fn insert<'a>(
        &mut self,
        arena: &'a mut Arena<TwoHopNode>,
        main_addr: Ipv4Addr,
        is_strict: bool,
    ) -> (TwoHopNodeIndex, &'a mut TwoHopNode) {
        self.next_id += 1;
        let n2 = TwoHopNode::new(self.next_id, main_addr, is_strict);
        let n2_idx = arena.0.insert(n2);

        let n2 = &mut arena[n2_idx];
        self.id_tree.insert(n2.id, n2_idx);
        if self.addr_tree.insert(n2.main_addr, n2_idx).is_some() {
            panic!("two-hop neighbor {} already exists", n2.main_addr);
        }

        (n2_idx, n2)
    }

    pub(crate) fn delete(
        &mut self,
        arena: &mut Arena<TwoHopNode>,
        n2_idx: TwoHopNodeIndex,
    ) {
        let n2 = &mut arena[n2_idx];

        self.id_tree.remove(&n2.id);
        self.addr_tree.remove(&n2.main_addr);

        arena.0.remove(n2_idx);
    }

    // Returns a reference to the two-hop neighbor corresponding to the given
    // ID.
    pub(crate) fn get_by_id<'a>(
        &self,
        arena: &'a Arena<TwoHopNode>,
        id: TwoHopNodeId,
    ) -> Result<(TwoHopNodeIndex, &'a TwoHopNode), Error> {
        self.id_tree
            .get(&id)
            .copied()
            .map(|n2_idx| (n2_idx, &arena[n2_idx]))
            .ok_or(Error::BadTwoHopNode(id))
    }

    // Returns a mutable reference to the two-hop neighbor corresponding to
    // the given ID.
    pub(crate) fn get_mut_by_id<'a>(
        &mut self,
        arena: &'a mut Arena<TwoHopNode>,
        id: TwoHopNodeId,
    ) -> Result<(TwoHopNodeIndex, &'a mut TwoHopNode), Error> {
        self.id_tree
            .get(&id)
            .copied()
            .map(move |n2_idx| (n2_idx, &mut arena[n2_idx]))
            .ok_or(Error::BadTwoHopNode(id))
    }

    // Returns a reference to the two-hop neighbor corresponding to the given
    // main address.
    pub(crate) fn get_by_main_addr<'a>(
        &self,
        arena: &'a Arena<TwoHopNode>,
        main_addr: Ipv4Addr,
    ) -> Option<(TwoHopNodeIndex, &'a TwoHopNode)> {
        self.addr_tree
            .get(&main_addr)
            .copied()
            .map(|n2_idx| (n2_idx, &arena[n2_idx]))
    }

    // Returns a mutable reference to the two-hop neighbor corresponding to
    // the given main address.
    #[expect(unused)]
    pub(crate) fn get_mut_by_main_addr<'a>(
        &mut self,
        arena: &'a mut Arena<TwoHopNode>,
        main_addr: Ipv4Addr,
    ) -> Option<(TwoHopNodeIndex, &'a mut TwoHopNode)> {
        self.addr_tree
            .get(&main_addr)
            .copied()
            .map(move |n2_idx| (n2_idx, &mut arena[n2_idx]))
    }

    // Returns an iterator visiting all two-hop neighbors.
    //
    // Two-hop neighbors are ordered by their main addresses.
    pub(crate) fn iter<'a>(
        &'a self,
        arena: &'a Arena<TwoHopNode>,
    ) -> impl Iterator<Item = &'a TwoHopNode> + 'a {
        self.addr_tree.values().map(|n2_idx| &arena[*n2_idx])
    }

    // Returns an iterator over all two-hop neighbor indexes.
    //
    // Two-hop neighbors are ordered by their main addresses.
    #[expect(unused)]
    pub(crate) fn indexes(&self) -> impl Iterator<Item = TwoHopNodeIndex> + '_ {
        self.addr_tree.values().copied()
    }
}

// ===== impl TwoHopLinks =====

impl TwoHopLinks {
    pub(crate) fn insert<'a>(
        &mut self,
        arena: &'a mut Arena<TwoHopLink>,
        nexthop_id: NeighborId,
        dest_addr: Ipv4Addr,
        dest_id: TwoHopNodeId,
        face_id: FaceId,
    ) -> (TwoHopLinkIndex, &'a mut TwoHopLink) {
        self.next_id += 1;
        let l2 = TwoHopLink::new(
            self.next_id,
            nexthop_id,
            dest_addr,
            dest_id,
            face_id,
        );
        let l2_idx = arena.0.insert(l2);

        let l2 = &mut arena[l2_idx];
        self.id_tree.insert(l2.id, l2_idx);
        if self
            .key_tree
            .insert((l2.nexthop_id, l2.dest_addr), l2_idx)
            .is_some()
        {
            panic!(
                "two-hop link {}:{} already exists",
                l2.nexthop_id, l2.dest_addr
            );
        }

        (l2_idx, l2)
    }

    pub(crate) fn delete(
        &mut self,
        arena: &mut Arena<TwoHopLink>,
        l2_idx: TwoHopLinkIndex,
    ) {
        let l2 = &mut arena[l2_idx];

        self.id_tree.remove(&l2.id);
        self.key_tree.remove(&(l2.nexthop_id, l2.dest_addr));

        arena.0.remove(l2_idx);
    }

    // Returns a reference to the two-hop link corresponding to the given ID.
    pub(crate) fn get_by_id<'a>(
        &self,
        arena: &'a Arena<TwoHopLink>,
        id: TwoHopLinkId,
    ) -> Result<(TwoHopLinkIndex, &'a TwoHopLink), Error> {
        self.id_tree
            .get(&id)
            .copied()
            .map(|l2_idx| (l2_idx, &arena[l2_idx]))
            .ok_or(Error::BadTwoHopLink(id))
    }

    // Returns a mutable reference to the two-hop link corresponding to the
    // given ID.
    #[expect(unused)]
    pub(crate) fn get_mut_by_id<'a>(
        &mut self,
        arena: &'a mut Arena<TwoHopLink>,
        id: TwoHopLinkId,
    ) -> Result<(TwoHopLinkIndex, &'a mut TwoHopLink), Error> {
        self.id_tree
            .get(&id)
            .copied()
            .map(move |l2_idx| (l2_idx, &mut arena[l2_idx]))
            .ok_or(Error::BadTwoHopLink(id))
    }

    // Returns a mutable reference to the two-hop link from the given
    // neighbor to the given destination.
    pub(crate) fn get_mut_by_key<'a>(
        &mut self,
        arena: &'a mut Arena<TwoHopLink>,
        nexthop_id: NeighborId,
        dest_addr: Ipv4Addr,
    ) -> Option<(TwoHopLinkIndex, &'a mut TwoHopLink)> {
        self.key_tree
            .get(&(nexthop_id, dest_addr))
            .copied()
            .map(move |l2_idx| (l2_idx, &mut arena[l2_idx]))
    }

    // Returns an iterator visiting all two-hop links.
    pub(crate) fn iter<'a>(
        &'a self,
        arena: &'a Arena<TwoHopLink>,
    ) -> impl Iterator<Item = &'a TwoHopLink> + 'a {
        self.key_tree.values().map(|l2_idx| &arena[*l2_idx])
    }

    // Returns an iterator over all two-hop link indexes.
    #[expect(unused)]
    pub(crate) fn indexes(&self) -> impl Iterator<Item = TwoHopLinkIndex> + '_ {
        self.key_tree.values().copied()
    }
}
