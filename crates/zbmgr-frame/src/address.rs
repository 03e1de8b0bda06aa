//! Node addresses carried in command and data frames.

use std::fmt;
use std::str::FromStr;

/// A 64-bit IEEE node address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address64(pub [u8; 8]);

impl Address64 {
    /// Every node on the network.
    pub const BROADCAST: Self = Self([0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF]);
    /// The network coordinator.
    pub const COORDINATOR: Self = Self([0x00; 8]);

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl Default for Address64 {
    fn default() -> Self {
        Self::BROADCAST
    }
}

impl From<u64> for Address64 {
    fn from(value: u64) -> Self {
        Self(value.to_be_bytes())
    }
}

impl fmt::Display for Address64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", u64::from_be_bytes(self.0))
    }
}

impl FromStr for Address64 {
    type Err = std::num::ParseIntError;

    /// Parses 16 hex digits, with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim_start_matches("0x");
        u64::from_str_radix(digits, 16).map(Self::from)
    }
}

/// A 16-bit network address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address16(pub u16);

impl Address16 {
    /// The network address is not known yet; the radio resolves it.
    pub const UNKNOWN: Self = Self(0xFFFE);
    /// The coordinator's network address.
    pub const COORDINATOR: Self = Self(0x0000);

    pub fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl Default for Address16 {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Display for Address16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

impl FromStr for Address16 {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim_start_matches("0x");
        u16::from_str_radix(digits, 16).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_addresses() {
        assert_eq!(
            Address64::BROADCAST.as_bytes(),
            &[0, 0, 0, 0, 0, 0, 0xFF, 0xFF]
        );
        assert_eq!(Address64::COORDINATOR.as_bytes(), &[0; 8]);
        assert_eq!(Address16::UNKNOWN.to_be_bytes(), [0xFF, 0xFE]);
        assert_eq!(Address64::default(), Address64::BROADCAST);
        assert_eq!(Address16::default(), Address16::UNKNOWN);
    }

    #[test]
    fn parse_and_display_hex() {
        let addr: Address64 = "0013a20040a1b2c3".parse().unwrap();
        assert_eq!(addr.0, [0x00, 0x13, 0xA2, 0x00, 0x40, 0xA1, 0xB2, 0xC3]);
        assert_eq!(addr.to_string(), "0013a20040a1b2c3");

        let net: Address16 = "0xfffe".parse().unwrap();
        assert_eq!(net, Address16::UNKNOWN);
        assert_eq!(net.to_string(), "fffe");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("not-hex".parse::<Address64>().is_err());
        assert!("12345".parse::<Address16>().is_err());
    }
}
