//! Opaque principal identifiers
//!
//! A principal is an opaque byte string naming a service or caller. The
//! textual form is base32 over a CRC32 checksum followed by the raw bytes,
//! lowercased and dash-grouped in fives, so typos are detected.

use std::fmt;
use std::str::FromStr;

use data_encoding::BASE32_NOPAD;

use crate::error::TypeError;

/// Maximum length of a principal's byte representation.
pub const MAX_PRINCIPAL_BYTES: usize = 29;

/// An opaque identifier for a service or caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Principal {
    bytes: Vec<u8>,
}

impl Principal {
    /// The anonymous principal.
    pub fn anonymous() -> Self {
        Principal { bytes: vec![0x04] }
    }

    /// Build a principal from raw bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() > MAX_PRINCIPAL_BYTES {
            return Err(TypeError::InvalidPrincipal {
                reason: format!("{} bytes exceeds the maximum of {}", bytes.len(), MAX_PRINCIPAL_BYTES),
            });
        }
        Ok(Principal {
            bytes: bytes.to_vec(),
        })
    }

    /// The raw byte representation.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl FromStr for Principal {
    type Err = TypeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let compact: String = text
            .chars()
            .filter(|c| *c != '-')
            .map(|c| c.to_ascii_uppercase())
            .collect();
        let data = BASE32_NOPAD
            .decode(compact.as_bytes())
            .map_err(|e| TypeError::InvalidPrincipal {
                reason: e.to_string(),
            })?;
        if data.len() < 4 {
            return Err(TypeError::InvalidPrincipal {
                reason: "too short to carry a checksum".to_string(),
            });
        }
        let (checksum, bytes) = data.split_at(4);
        let expected = crc32fast::hash(bytes).to_be_bytes();
        if checksum != expected {
            return Err(TypeError::InvalidPrincipal {
                reason: "checksum mismatch".to_string(),
            });
        }
        Principal::from_slice(bytes)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut data = crc32fast::hash(&self.bytes).to_be_bytes().to_vec();
        data.extend_from_slice(&self.bytes);
        let encoded = BASE32_NOPAD.encode(&data).to_ascii_lowercase();
        let mut first = true;
        for chunk in encoded.as_bytes().chunks(5) {
            if !first {
                write!(f, "-")?;
            }
            first = false;
            // chunks of an ASCII string are valid UTF-8
            f.write_str(std::str::from_utf8(chunk).map_err(|_| fmt::Error)?)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_roundtrip() {
        for bytes in [&b""[..], &[0x04], &[0xab, 0xcd, 0x01], &[0xef; 29]] {
            let p = Principal::from_slice(bytes).unwrap();
            let text = p.to_string();
            let back: Principal = text.parse().unwrap();
            assert_eq!(p, back, "roundtrip failed for {}", text);
        }
    }

    #[test]
    fn test_anonymous_text_form() {
        assert_eq!(Principal::anonymous().to_string(), "2vxsx-fae");
    }

    #[test]
    fn test_checksum_rejected() {
        // Valid base32, wrong checksum.
        assert!(matches!(
            "aaaaa-aaaab".parse::<Principal>(),
            Err(TypeError::InvalidPrincipal { .. })
        ));
    }

    #[test]
    fn test_too_long_rejected() {
        assert!(Principal::from_slice(&[0u8; 30]).is_err());
    }
}
