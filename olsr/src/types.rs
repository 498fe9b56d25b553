//
// Copyright (c) The Olsr Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::Duration;

use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

// Stable object identifiers.
//
// Entities reference each other exclusively through these ids; the entity
// itself is owned by a single collection (see the `collections` module).
pub type ObjectId = u32;
pub type FaceId = ObjectId;
pub type LinkId = ObjectId;
pub type NeighborId = ObjectId;
pub type TwoHopNodeId = ObjectId;
pub type TwoHopLinkId = ObjectId;
pub type MidEntryId = ObjectId;
pub type TopologyId = ObjectId;
pub type ExternalId = ObjectId;

// The default UDP port for the OLSR protocol.
pub const DEFAULT_OLSR_PORT: u16 = 698;

// The maximum time-to-live of an OLSR message.
pub const MAX_TTL: u8 = 255;

// Protocol interval defaults, in seconds (RFC 3626 section 18.2).
pub const DEFAULT_HELLO_INTERVAL: u64 = 2;
pub const DEFAULT_REFRESH_INTERVAL: u64 = 2;
pub const DEFAULT_TC_INTERVAL: u64 = 5;
pub const DEFAULT_MID_INTERVAL: u64 = DEFAULT_TC_INTERVAL;
pub const DEFAULT_HNA_INTERVAL: u64 = DEFAULT_TC_INTERVAL;
pub const DEFAULT_DUP_HOLD_TIME: u64 = 30;

// The default static cost of an OLSR interface.
pub const DEFAULT_STATIC_FACE_COST: u32 = 0;

// The default number of MPRs which must cover a two-hop neighbor.
pub const DEFAULT_MPR_COVERAGE: u32 = 1;

// The type of an OLSR link, as advertised in a HELLO message.
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum LinkType {
    Unspec = 0,
    Asym = 1,
    Sym = 2,
    Lost = 3,
}

// The type of an OLSR neighbor, as advertised in a HELLO message.
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum NeighborType {
    NotNeigh = 0,
    SymNeigh = 1,
    MprNeigh = 2,
}

// A node's willingness to carry and forward traffic for other nodes.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct Willingness(u8);

// A node's TC redundancy mode (RFC 3626 section 15.1).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum TcRedundancy {
    // Advertise the MPR selector set only.
    #[default]
    MprsIn,
    // Advertise the MPR selector set and the MPR set.
    MprsInOut,
    // Advertise the full symmetric neighbor set.
    All,
}

// ===== impl Willingness =====

impl Willingness {
    pub const NEVER: Willingness = Willingness(0);
    pub const LOW: Willingness = Willingness(1);
    pub const DEFAULT: Willingness = Willingness(3);
    pub const HIGH: Willingness = Willingness(6);
    pub const ALWAYS: Willingness = Willingness(7);
    pub const MAX: u8 = 7;

    pub fn new(value: u8) -> Willingness {
        Willingness(std::cmp::min(value, Self::MAX))
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for Willingness {
    fn default() -> Willingness {
        Willingness::DEFAULT
    }
}

impl std::fmt::Display for Willingness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Willingness::NEVER => write!(f, "never"),
            Willingness::LOW => write!(f, "low"),
            Willingness::DEFAULT => write!(f, "default"),
            Willingness::HIGH => write!(f, "high"),
            Willingness::ALWAYS => write!(f, "always"),
            Willingness(value) => write!(f, "{value}"),
        }
    }
}

// ===== global functions =====

// Compares two 16-bit sequence numbers using the modular arithmetic of
// RFC 3626 section 19.
pub fn seqno_is_newer(seq1: u16, seq2: u16) -> bool {
    (seq1 > seq2 && seq1 - seq2 <= u16::MAX / 2)
        || (seq2 > seq1 && seq2 - seq1 > u16::MAX / 2)
}

// The 8-bit binary floating point time format used on the wire.
//
// The high four bits carry the mantissa and the low four bits the exponent;
// the represented value is (16 + mantissa) * 2^exponent / 256 seconds.
pub mod eight_bit_time {
    use super::*;

    const SCALING_FACTOR: f64 = 0.0625;
    const MOD: u32 = 16;

    // Smallest and largest representable durations.
    pub const MIN: f64 = SCALING_FACTOR;
    pub const MAX: f64 = (16.0 + 15.0) * 32768.0 / 256.0;

    pub fn to_duration(byte: u8) -> Duration {
        let mant = u32::from(byte >> 4);
        let exp = u32::from(byte & 0x0F);
        let secs = ((16 + mant) << exp) as f64 * SCALING_FACTOR / 16.0;
        Duration::from_secs_f64(secs)
    }

    pub fn from_duration(duration: Duration) -> u8 {
        let secs = duration.as_secs_f64().clamp(MIN, MAX);
        let isec = (secs / SCALING_FACTOR) as u32;

        let mut exp = 0;
        while isec >= (1 << exp) {
            exp += 1;
        }

        let mant;
        if exp == 0 {
            // The value is below the representable minimum.
            mant = 1;
        } else {
            exp -= 1;
            let scaled = (MOD as f64 * secs
                / SCALING_FACTOR
                / f64::from(1u32 << exp)
                - MOD as f64) as u32;
            exp += scaled >> 4;
            mant = scaled & 0x0F;
        }

        ((mant << 4) | (exp & 0x0F)) as u8
    }
}

// ===== tests =====

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seqno_is_newer() {
        assert!(seqno_is_newer(2, 1));
        assert!(!seqno_is_newer(1, 2));
        assert!(!seqno_is_newer(1, 1));

        // Wraparound cases.
        assert!(seqno_is_newer(0, 65535));
        assert!(!seqno_is_newer(65535, 0));
        assert!(seqno_is_newer(10, 65000));
        assert!(!seqno_is_newer(65000, 10));

        // Exactly half the space apart.
        assert!(seqno_is_newer(32768, 0));
        assert!(!seqno_is_newer(0, 32768));
    }

    #[test]
    fn test_eight_bit_time_roundtrip() {
        // Every byte value must survive a decode/encode roundtrip.
        for byte in 0..=u8::MAX {
            let duration = eight_bit_time::to_duration(byte);
            assert_eq!(
                byte,
                eight_bit_time::from_duration(duration),
                "byte {byte:#04x} did not roundtrip ({duration:?})",
            );
        }
    }

    #[test]
    fn test_eight_bit_time_bounds() {
        // The all-zeroes byte is the smallest representable value.
        assert_eq!(
            eight_bit_time::to_duration(0x00),
            Duration::from_secs_f64(0.0625)
        );

        // Durations outside the representable range are clamped.
        assert_eq!(eight_bit_time::from_duration(Duration::ZERO), 0x00);
        let max = eight_bit_time::from_duration(Duration::from_secs(100_000));
        assert_eq!(eight_bit_time::to_duration(max), eight_bit_time::to_duration(0xFF));
    }

    #[test]
    fn test_eight_bit_time_quantization() {
        // Encoding an arbitrary duration yields a value within one quantum.
        for secs in [1u64, 2, 5, 6, 15, 30, 120, 3600] {
            let duration = Duration::from_secs(secs);
            let byte = eight_bit_time::from_duration(duration);
            let decoded = eight_bit_time::to_duration(byte).as_secs_f64();
            let quantum = 2f64.powi(i32::from(byte & 0x0F)) * 0.0625;
            assert!(
                (decoded - secs as f64).abs() <= quantum,
                "{secs}s encoded as {byte:#04x} decoded to {decoded}s",
            );
        }
    }
}
