//! Account and validator-operator addresses.
//!
//! Both forms wrap the same raw bytes; a validator's own account address is
//! its operator address reinterpreted. The textual form is lowercase hex and
//! is compared as an opaque string.

use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};
use tessera_store::codec::KeyCodec;

/// Maximum address length in bytes.
pub const MAX_ADDR_LEN: usize = 255;

/// Address validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,

    #[error("address too long: {0} bytes (max {MAX_ADDR_LEN})")]
    TooLong(usize),

    #[error("invalid hex address: {0}")]
    InvalidHex(String),
}

fn check_len(bytes: &[u8]) -> Result<(), AddressError> {
    if bytes.is_empty() {
        return Err(AddressError::Empty);
    }
    if bytes.len() > MAX_ADDR_LEN {
        return Err(AddressError::TooLong(bytes.len()));
    }
    Ok(())
}

macro_rules! address_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, SerializeDisplay, DeserializeFromStr)]
        pub struct $name(Vec<u8>);

        impl $name {
            /// Wrap raw address bytes (1..=255 bytes).
            pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, AddressError> {
                let bytes = bytes.into();
                check_len(&bytes)?;
                Ok(Self(bytes))
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(&self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = AddressError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = hex::decode(s).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
                Self::new(bytes)
            }
        }

        /// One length byte followed by the raw bytes.
        impl KeyCodec for $name {
            fn encode_key(&self, buf: &mut Vec<u8>) {
                // check_len bounds the length to u8::MAX.
                buf.push(self.0.len() as u8);
                buf.extend_from_slice(&self.0);
            }

            fn decode_key(bytes: &[u8]) -> Result<Self, String> {
                let (len, rest) = bytes
                    .split_first()
                    .ok_or_else(|| "empty address key".to_string())?;
                if rest.len() != usize::from(*len) {
                    return Err(format!(
                        "address key length prefix {len} does not match {} bytes",
                        rest.len()
                    ));
                }
                Self::new(rest.to_vec()).map_err(|e| e.to_string())
            }
        }
    };
}

address_type!(
    /// Account address: the identity that signs and submits messages.
    AccAddress
);

address_type!(
    /// Validator operator address.
    ValAddress
);

impl From<&ValAddress> for AccAddress {
    fn from(val: &ValAddress) -> Self {
        Self(val.0.clone())
    }
}

impl From<&AccAddress> for ValAddress {
    fn from(acc: &AccAddress) -> Self {
        Self(acc.0.clone())
    }
}

impl PartialEq<ValAddress> for AccAddress {
    /// Byte equality across address forms.
    fn eq(&self, other: &ValAddress) -> bool {
        self.0 == other.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let addr = ValAddress::new(b"val0".to_vec()).expect("addr");
        assert_eq!(addr.to_string(), "76616c30");
        let parsed: ValAddress = "76616c30".parse().expect("parse");
        assert_eq!(parsed, addr);
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        assert_eq!(AccAddress::new(Vec::new()), Err(AddressError::Empty));
        assert_eq!(
            AccAddress::new(vec![1u8; 256]),
            Err(AddressError::TooLong(256))
        );
        assert!(AccAddress::new(vec![1u8; 255]).is_ok());
    }

    #[test]
    fn test_rejects_bad_hex() {
        assert!(matches!(
            "zz".parse::<AccAddress>(),
            Err(AddressError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_cross_form_equality() {
        let val = ValAddress::new(vec![7, 7, 7]).expect("val");
        let own = AccAddress::from(&val);
        let other = AccAddress::new(vec![8, 8, 8]).expect("acc");
        assert!(own == val);
        assert!(other != val);
    }

    #[test]
    fn test_key_codec_is_length_prefixed() {
        let short = ValAddress::new(vec![0xff]).expect("short");
        let long = ValAddress::new(vec![0x00, 0x00]).expect("long");

        let mut a = Vec::new();
        short.encode_key(&mut a);
        let mut b = Vec::new();
        long.encode_key(&mut b);

        assert_eq!(a, vec![1, 0xff]);
        assert_eq!(ValAddress::decode_key(&a).expect("decode"), short);
        assert_eq!(ValAddress::decode_key(&b).expect("decode"), long);
        assert!(ValAddress::decode_key(&[3, 1]).is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let addr = AccAddress::new(vec![0xab, 0xcd]).expect("addr");
        let json = serde_json::to_string(&addr).expect("serialize");
        assert_eq!(json, "\"abcd\"");
    }
}
