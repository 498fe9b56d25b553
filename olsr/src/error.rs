//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use tracing::{error, warn, warn_span};

use crate::packet::DecodeError;
use crate::types::{
    ExternalId, FaceId, LinkId, MidEntryId, NeighborId, TopologyId,
    TwoHopLinkId, TwoHopNodeId,
};

// OLSR errors.
#[derive(Debug)]
pub enum Error {
    IoError(IoError),
    // Packet reception errors.
    PacketDecodeError(Ipv4Addr, DecodeError),
    MessageDecodeError(Ipv4Addr, DecodeError),
    NonNeighborOrigin(&'static str, Ipv4Addr),
    MessageTruncated(String, String),
    // Database lookup errors.
    BadFace(FaceId),
    BadLink(LinkId),
    BadNeighbor(NeighborId),
    BadTwoHopNode(TwoHopNodeId),
    BadTwoHopLink(TwoHopLinkId),
    BadMidEntry(MidEntryId),
    BadTopologyEntry(TopologyId),
    BadExternalRoute(ExternalId),
    // MPR selection diagnostics.
    BadLinkCoverage(NeighborId),
    BadTwoHopCoverage(TwoHopNodeId),
    // Configuration errors.
    MainAddrNotConfigured(Ipv4Addr),
    BadAllNodesAddr(Ipv4Addr),
    FaceStartError(String, String, IoError),
}

// OLSR I/O errors.
#[derive(Debug)]
pub enum IoError {
    EnableAddressError(std::io::Error),
    DisableAddressError(std::io::Error),
    SendError(std::io::Error),
    RouteInstallError(std::io::Error),
    RouteUninstallError(std::io::Error),
}

// ===== impl Error =====

impl Error {
    pub(crate) fn log(&self) {
        match self {
            Error::IoError(error) => {
                error.log();
            }
            Error::PacketDecodeError(source, error) => {
                warn!(%source, %error, "{}", self);
            }
            Error::MessageDecodeError(source, error) => {
                warn!(%source, %error, "{}", self);
            }
            Error::NonNeighborOrigin(msg_type, source) => {
                warn!(%msg_type, %source, "{}", self);
            }
            Error::MessageTruncated(ifname, vifname) => {
                warn_span!("interface", name = %ifname, vif = %vifname)
                    .in_scope(|| {
                        warn!("{}", self);
                    });
            }
            Error::BadFace(id)
            | Error::BadLink(id)
            | Error::BadNeighbor(id)
            | Error::BadTwoHopNode(id)
            | Error::BadTwoHopLink(id)
            | Error::BadMidEntry(id)
            | Error::BadTopologyEntry(id)
            | Error::BadExternalRoute(id)
            | Error::BadLinkCoverage(id)
            | Error::BadTwoHopCoverage(id) => {
                warn!(%id, "{}", self);
            }
            Error::MainAddrNotConfigured(addr)
            | Error::BadAllNodesAddr(addr) => {
                warn!(address = %addr, "{}", self);
            }
            Error::FaceStartError(ifname, vifname, error) => {
                error!(interface = %ifname, vif = %vifname,
                    error = %with_source(error), "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(error) => error.fmt(f),
            Error::PacketDecodeError(..) => {
                write!(f, "failed to decode packet")
            }
            Error::MessageDecodeError(..) => {
                write!(f, "failed to decode message")
            }
            Error::NonNeighborOrigin(..) => {
                write!(f, "message from non-neighbor sender")
            }
            Error::MessageTruncated(..) => {
                write!(f, "outgoing packet truncated by MTU")
            }
            Error::BadFace(..) => {
                write!(f, "interface not found")
            }
            Error::BadLink(..) => {
                write!(f, "link not found")
            }
            Error::BadNeighbor(..) => {
                write!(f, "neighbor not found")
            }
            Error::BadTwoHopNode(..) => {
                write!(f, "two-hop neighbor not found")
            }
            Error::BadTwoHopLink(..) => {
                write!(f, "two-hop link not found")
            }
            Error::BadMidEntry(..) => {
                write!(f, "MID entry not found")
            }
            Error::BadTopologyEntry(..) => {
                write!(f, "topology entry not found")
            }
            Error::BadExternalRoute(..) => {
                write!(f, "external route not found")
            }
            Error::BadLinkCoverage(..) => {
                write!(f, "no suitable link to one-hop neighbor")
            }
            Error::BadTwoHopCoverage(..) => {
                write!(f, "two-hop neighbor not covered by any MPR")
            }
            Error::MainAddrNotConfigured(..) => {
                write!(f, "main address is not an enabled interface address")
            }
            Error::BadAllNodesAddr(..) => {
                write!(f, "invalid all-nodes address")
            }
            Error::FaceStartError(..) => {
                write!(f, "failed to start interface")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(error) => Some(error),
            Error::FaceStartError(_, _, error) => Some(error),
            _ => None,
        }
    }
}

impl From<IoError> for Error {
    fn from(error: IoError) -> Error {
        Error::IoError(error)
    }
}

// ===== impl IoError =====

impl IoError {
    pub(crate) fn log(&self) {
        match self {
            IoError::EnableAddressError(error)
            | IoError::DisableAddressError(error)
            | IoError::SendError(error)
            | IoError::RouteInstallError(error)
            | IoError::RouteUninstallError(error) => {
                warn!(error = %with_source(error), "{}", self);
            }
        }
    }
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::EnableAddressError(..) => {
                write!(f, "failed to bring up I/O layer")
            }
            IoError::DisableAddressError(..) => {
                write!(f, "failed to shut down I/O layer")
            }
            IoError::SendError(..) => {
                write!(f, "failed to send packet")
            }
            IoError::RouteInstallError(..) => {
                write!(f, "failed to install route")
            }
            IoError::RouteUninstallError(..) => {
                write!(f, "failed to uninstall route")
            }
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IoError::EnableAddressError(error)
            | IoError::DisableAddressError(error)
            | IoError::SendError(error)
            | IoError::RouteInstallError(error)
            | IoError::RouteUninstallError(error) => Some(error),
        }
    }
}

// ===== global functions =====

fn with_source<E: std::error::Error>(error: E) -> String {
    if let Some(source) = error.source() {
        format!("{} ({})", error, with_source(source))
    } else {
        error.to_string()
    }
}
