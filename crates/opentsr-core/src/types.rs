//! Strong type definitions for OpenTSR identifiers and clocks.
//!
//! A [`TsrId`] is a UUIDv7: 48 bits of unix milliseconds, the version
//! nibble, 12 random bits, the RFC 4122 variant and 62 more random bits.

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::{Uuid, Variant};

use crate::error::IdError;

/// Exclusive upper bound for the millisecond field of a [`TsrId`].
pub const MAX_ID_UNIX_MS: i64 = 1 << 48;

/// Largest accepted `tsr_timestamp_ns`.
pub const MAX_TIMESTAMP_NS: u64 = i64::MAX as u64;

const RAND_B_MASK: u64 = (1 << 62) - 1;

/// A time-ordered signal identifier (UUIDv7).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TsrId(Uuid);

impl TsrId {
    /// Generate an identifier stamped with the current wall clock.
    pub fn generate() -> Result<Self, IdError> {
        Self::generate_at(now_unix_ms()?)
    }

    /// Generate an identifier for the given unix millisecond timestamp.
    ///
    /// Fails when `unix_ms` does not fit the 48-bit time field.
    pub fn generate_at(unix_ms: i64) -> Result<Self, IdError> {
        if !(0..MAX_ID_UNIX_MS).contains(&unix_ms) {
            return Err(IdError::TimestampOutOfRange(unix_ms));
        }

        let mut rng = rand::thread_rng();
        let rand_a = u128::from(rng.gen::<u16>() & 0x0fff);
        let rand_b = u128::from(rng.gen::<u64>() & RAND_B_MASK);

        let bits = ((unix_ms as u128) << 80) | (0x7 << 76) | (rand_a << 64) | (0b10 << 62) | rand_b;
        Ok(Self(Uuid::from_u128(bits)))
    }

    /// Parse the lowercase hyphenated form and check version and variant.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        let uuid = Uuid::try_parse(s).map_err(|e| IdError::Malformed(e.to_string()))?;

        if uuid.hyphenated().to_string() != s {
            return Err(IdError::NotCanonical);
        }
        if uuid.get_version_num() != 7 {
            return Err(IdError::WrongVersion(uuid.get_version_num()));
        }
        if uuid.get_variant() != Variant::RFC4122 {
            return Err(IdError::WrongVariant);
        }

        Ok(Self(uuid))
    }

    /// The underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// The embedded unix millisecond timestamp.
    pub fn unix_ms(&self) -> u64 {
        (self.0.as_u128() >> 80) as u64
    }

    /// The leading 52 bits (timestamp plus version), which order identifiers in time.
    pub fn time_prefix(&self) -> u64 {
        (self.0.as_u128() >> 76) as u64
    }
}

impl fmt::Debug for TsrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TsrId({})", self.0.hyphenated())
    }
}

impl fmt::Display for TsrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for TsrId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TsrId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TsrId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Current wall clock in unix milliseconds.
pub fn now_unix_ms() -> Result<i64, IdError> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| IdError::ClockBeforeEpoch)?;
    Ok(i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
}

/// Current wall clock in unix nanoseconds, clamped to [`MAX_TIMESTAMP_NS`].
///
/// A clock set before the epoch reads as zero.
pub fn now_timestamp_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos().min(u128::from(MAX_TIMESTAMP_NS)) as u64)
        .unwrap_or(0)
}
