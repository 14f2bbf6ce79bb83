use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

use crate::fmt::hex;
use crate::Fingerprint;

/// The low 64 bits of a [`Fingerprint`].
///
/// Signatures name their issuer with it.  That is how a self
/// signature is told apart from a third-party certification, see
/// [`KeyID::to_reversed_hex`].
#[non_exhaustive]
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash)]
pub enum KeyID {
    /// Eight octets.
    V4([u8; 8]),
    /// Anything else found in an issuer subpacket.
    Invalid(Box<[u8]>),
}
assert_send_and_sync!(KeyID);

impl KeyID {
    /// Wraps `raw`, big endian.
    pub fn from_bytes(raw: &[u8]) -> KeyID {
        match <[u8; 8]>::try_from(raw) {
            Ok(id) => KeyID::V4(id),
            Err(_) => KeyID::Invalid(raw.into()),
        }
    }

    /// Returns the raw octets, big endian.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            KeyID::V4(id) => id,
            KeyID::Invalid(id) => id,
        }
    }

    /// Returns the uppercase hexadecimal digits.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Returns the lowercase hexadecimal digits in reverse order.
    ///
    /// For a certificate's own signatures this is a prefix of the
    /// certificate's [`Fingerprint::to_reversed_hex`].
    pub fn to_reversed_hex(&self) -> String {
        hex::encode_reversed(self.as_bytes())
    }
}

impl From<&Fingerprint> for KeyID {
    fn from(fp: &Fingerprint) -> Self {
        fp.to_keyid()
    }
}

impl fmt::Display for KeyID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for KeyID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "KeyID({})", self)
    }
}

impl FromStr for KeyID {
    type Err = anyhow::Error;

    /// Accepts a Key ID or a whole fingerprint.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode_pretty(s)?;
        if raw.len() == 8 {
            Ok(KeyID::from_bytes(&raw))
        } else {
            Ok(Fingerprint::from_bytes(&raw).to_keyid())
        }
    }
}

#[cfg(test)]
impl Arbitrary for KeyID {
    fn arbitrary(g: &mut Gen) -> Self {
        KeyID::from_bytes(&u64::arbitrary(g).to_be_bytes())
    }
}
