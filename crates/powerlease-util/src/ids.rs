//! Strongly-typed identifiers for powerlease

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Prefix given to lease ids generated by the server
const GENERATED_PREFIX: &str = "tmp:";

/// Unique identifier for a lease ("token")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseId(String);

impl LeaseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id for an anonymous renewal
    pub fn generate() -> Self {
        Self(format!("{}{}", GENERATED_PREFIX, Uuid::new_v4().simple()))
    }

    /// Whether this id was handed out by the server rather than chosen by a client
    pub fn is_generated(&self) -> bool {
        self.0.starts_with(GENERATED_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for LeaseId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for LeaseId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Error parsing a hardware address
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid MAC address '{0}': expected six hex octets separated by ':' or '-'")]
pub struct MacParseError(pub String);

/// Hardware (MAC) address of the managed machine, used to address wake packets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MacParseError(s.to_string());

        let parts: Vec<&str> = s.split([':', '-']).collect();
        if parts.len() != 6 {
            return Err(err());
        }

        let mut octets = [0u8; 6];
        for (octet, part) in octets.iter_mut().zip(&parts) {
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(err());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| err())?;
        }

        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl Serialize for MacAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_id_equality() {
        let id1 = LeaseId::new("backup-job");
        let id2 = LeaseId::new("backup-job");
        let id3 = LeaseId::new("media-server");

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn generated_lease_ids_are_unique() {
        let a = LeaseId::generate();
        let b = LeaseId::generate();
        assert_ne!(a, b);
        assert!(a.is_generated());
        assert!(!LeaseId::new("backup-job").is_generated());
    }

    #[test]
    fn lease_id_serializes_as_plain_string() {
        let id = LeaseId::new("backup-job");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"backup-job\"");
        let parsed: LeaseId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_mac_address() {
        let mac: MacAddress = "AA:bb:0c:dd:ee:01".parse().unwrap();
        assert_eq!(mac.octets(), [0xaa, 0xbb, 0x0c, 0xdd, 0xee, 0x01]);
        assert_eq!(mac.to_string(), "aa:bb:0c:dd:ee:01");

        let dashed: MacAddress = "aa-bb-0c-dd-ee-01".parse().unwrap();
        assert_eq!(mac, dashed);
    }

    #[test]
    fn reject_malformed_mac_address() {
        assert!("aa:bb:cc:dd:ee".parse::<MacAddress>().is_err());
        assert!("aa:bb:cc:dd:ee:ff:00".parse::<MacAddress>().is_err());
        assert!("aa:bb:cc:dd:ee:zz".parse::<MacAddress>().is_err());
        assert!("aabb:cc:dd:ee:ff".parse::<MacAddress>().is_err());
        assert!("".parse::<MacAddress>().is_err());
    }

    #[test]
    fn reject_signed_mac_octet() {
        assert!("+a:bb:cc:dd:ee:ff".parse::<MacAddress>().is_err());
        assert!("aa:bb:cc:dd:ee:+f".parse::<MacAddress>().is_err());
    }
}
