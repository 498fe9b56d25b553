//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::Duration;

use olsr_utils::Sender;
use olsr_utils::task::{IntervalTask, TimeoutTask};

//
// OLSR tasks diagram:
//
//                               +--------------+
//                 host I/O  ->  |              |
//        hello_interval (1x) -> |              |
//          mid_interval (1x) -> |              |
//           tc_interval (1x) -> |   instance   |  -> host I/O (Io trait)
//          hna_interval (1x) -> |              |
//                expiry (Nx) -> |              |
//        route_update (0/1x) -> |              |
//                               +--------------+
//

// OLSR inter-task message types.
pub mod messages {
    use std::net::Ipv4Addr;

    use bytes::Bytes;
    use serde::{Deserialize, Serialize};

    use crate::types::{
        ExternalId, LinkId, MidEntryId, NeighborId, TopologyId, TwoHopLinkId,
    };

    // Type aliases.
    pub type ProtocolInputMsg = input::ProtocolMsg;

    // Input messages (child task -> main task).
    pub mod input {
        use super::*;

        #[derive(Debug, Deserialize, Serialize)]
        pub enum ProtocolMsg {
            PacketRx(PacketRxMsg),
            HelloInterval(HelloIntervalMsg),
            MidInterval(MidIntervalMsg),
            TcInterval(TcIntervalMsg),
            HnaInterval(HnaIntervalMsg),
            Expiry(ExpiryMsg),
            RouteUpdate(RouteUpdateMsg),
            RibCompletion(RibCompletionMsg),
            VifStatus(VifStatusMsg),
            AddressStatus(AddressStatusMsg),
        }

        #[derive(Debug, Deserialize, Serialize)]
        pub struct PacketRxMsg {
            pub ifname: String,
            pub vifname: String,
            pub src: Ipv4Addr,
            pub sport: u16,
            pub dst: Ipv4Addr,
            pub dport: u16,
            pub data: Bytes,
        }

        #[derive(Debug, Deserialize, Serialize)]
        pub struct HelloIntervalMsg {}

        #[derive(Debug, Deserialize, Serialize)]
        pub struct MidIntervalMsg {}

        #[derive(Debug, Deserialize, Serialize)]
        pub struct TcIntervalMsg {}

        #[derive(Debug, Deserialize, Serialize)]
        pub struct HnaIntervalMsg {}

        // Expiry of one entity's validity timer.
        #[derive(Debug, Deserialize, Serialize)]
        pub enum ExpiryMsg {
            Link(LinkId),
            MprSelector(NeighborId),
            TwoHopLink(TwoHopLinkId),
            MidEntry(MidEntryId),
            Topology(TopologyId),
            External(ExternalId),
            Duplicate(Ipv4Addr, u16),
        }

        #[derive(Debug, Deserialize, Serialize)]
        pub struct RouteUpdateMsg {}

        #[derive(Debug, Deserialize, Serialize)]
        pub struct RibCompletionMsg {
            pub error: Option<String>,
        }

        #[derive(Debug, Deserialize, Serialize)]
        pub struct VifStatusMsg {
            pub ifname: String,
            pub vifname: String,
            pub up: bool,
        }

        #[derive(Debug, Deserialize, Serialize)]
        pub struct AddressStatusMsg {
            pub ifname: String,
            pub vifname: String,
            pub addr: Ipv4Addr,
            pub enabled: bool,
        }
    }
}

// ===== OLSR tasks =====

// Periodic HELLO emission.
pub(crate) fn hello_interval(
    interval: Duration,
    hello_intervalp: &Sender<messages::input::HelloIntervalMsg>,
) -> IntervalTask {
    let hello_intervalp = hello_intervalp.clone();
    IntervalTask::new(interval, false, move || {
        let hello_intervalp = hello_intervalp.clone();
        async move {
            let msg = messages::input::HelloIntervalMsg {};
            let _ = hello_intervalp.send(msg).await;
        }
    })
}

// Periodic MID emission.
pub(crate) fn mid_interval(
    interval: Duration,
    mid_intervalp: &Sender<messages::input::MidIntervalMsg>,
) -> IntervalTask {
    let mid_intervalp = mid_intervalp.clone();
    IntervalTask::new(interval, false, move || {
        let mid_intervalp = mid_intervalp.clone();
        async move {
            let msg = messages::input::MidIntervalMsg {};
            let _ = mid_intervalp.send(msg).await;
        }
    })
}

// Periodic TC emission.
pub(crate) fn tc_interval(
    interval: Duration,
    tc_intervalp: &Sender<messages::input::TcIntervalMsg>,
) -> IntervalTask {
    let tc_intervalp = tc_intervalp.clone();
    IntervalTask::new(interval, false, move || {
        let tc_intervalp = tc_intervalp.clone();
        async move {
            let msg = messages::input::TcIntervalMsg {};
            let _ = tc_intervalp.send(msg).await;
        }
    })
}

// Periodic HNA emission.
pub(crate) fn hna_interval(
    interval: Duration,
    hna_intervalp: &Sender<messages::input::HnaIntervalMsg>,
) -> IntervalTask {
    let hna_intervalp = hna_intervalp.clone();
    IntervalTask::new(interval, false, move || {
        let hna_intervalp = hna_intervalp.clone();
        async move {
            let msg = messages::input::HnaIntervalMsg {};
            let _ = hna_intervalp.send(msg).await;
        }
    })
}

// Entity validity timer.
//
// A single constructor serves every database entity; the message identifies
// the entity whose validity time has elapsed.
pub(crate) fn expiry_timer(
    msg: messages::input::ExpiryMsg,
    timeout: Duration,
    expiryp: &Sender<messages::input::ExpiryMsg>,
) -> TimeoutTask {
    let expiryp = expiryp.clone();
    TimeoutTask::new(timeout, move || async move {
        let _ = expiryp.send(msg).await;
    })
}
