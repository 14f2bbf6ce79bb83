use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

use crate::fmt::hex;
use crate::KeyID;

/// A version 4 key fingerprint: the SHA-1 digest of the public key
/// packet ([RFC 4880, section 12.2]).
///
/// Certificates are indexed by their fingerprint's hexadecimal
/// digits in reverse order, see [`Fingerprint::to_reversed_hex`].
/// Reversed, the Key ID suffix becomes a prefix, so a signature's
/// issuer can be matched against a certificate with `starts_with`.
///
/// [RFC 4880, section 12.2]: https://tools.ietf.org/html/rfc4880#section-12.2
///
/// # Examples
///
/// ```rust
/// # fn main() -> keyserver_openpgp::Result<()> {
/// use keyserver_openpgp::Fingerprint;
///
/// let fp: Fingerprint =
///     "0123 4567 89AB CDEF 0123 4567 89AB CDEF 0123 4567".parse()?;
///
/// assert_eq!("0123456789ABCDEF0123456789ABCDEF01234567", fp.to_hex());
/// assert_eq!("76543210fedcba9876543210fedcba9876543210",
///            fp.to_reversed_hex());
/// # Ok(()) }
/// ```
#[non_exhaustive]
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash)]
pub enum Fingerprint {
    /// Twenty octets.
    V4([u8; 20]),
    /// Anything else found in an issuer fingerprint subpacket.
    Invalid(Box<[u8]>),
}
assert_send_and_sync!(Fingerprint);

impl Fingerprint {
    /// Wraps `raw`, big endian.
    pub fn from_bytes(raw: &[u8]) -> Fingerprint {
        match <[u8; 20]>::try_from(raw) {
            Ok(fp) => Fingerprint::V4(fp),
            Err(_) => Fingerprint::Invalid(raw.into()),
        }
    }

    /// Returns the raw octets, big endian.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Fingerprint::V4(fp) => fp,
            Fingerprint::Invalid(fp) => fp,
        }
    }

    /// Returns the uppercase hexadecimal digits without spaces.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Returns the lowercase hexadecimal digits in reverse order.
    ///
    /// This is the content identity of a certificate's root.
    pub fn to_reversed_hex(&self) -> String {
        hex::encode_reversed(self.as_bytes())
    }

    /// Returns the Key ID, the low 64 bits.
    pub fn to_keyid(&self) -> KeyID {
        let raw = self.as_bytes();
        KeyID::from_bytes(&raw[raw.len().saturating_sub(8)..])
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&hex::encode_pretty(self.as_bytes()))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

impl fmt::UpperHex for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = anyhow::Error;

    /// Accepts spaces between the digits and an optional `0x`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        Ok(Fingerprint::from_bytes(&hex::decode_pretty(s)?))
    }
}

#[cfg(test)]
impl Arbitrary for Fingerprint {
    fn arbitrary(g: &mut Gen) -> Self {
        let mut fp = [0; 20];
        fp.iter_mut().for_each(|p| *p = u8::arbitrary(g));
        Fingerprint::V4(fp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    quickcheck::quickcheck! {
        fn keyid_is_reversed_prefix(fp: Fingerprint) -> bool {
            fp.to_reversed_hex().starts_with(&fp.to_keyid().to_reversed_hex())
        }
    }

    #[test]
    fn formats() {
        let fp: Fingerprint = "0x8F17 7771 18A3 3DDA 9BA4  8E62 AACB 3243 6300 52D9"
            .parse().unwrap();
        assert_eq!(fp.to_string(),
                   "8F17 7771 18A3 3DDA 9BA4 8E62 AACB 3243 6300 52D9");
        assert_eq!(format!("{:X}", fp), "8F17777118A33DDA9BA48E62AACB3243630052D9");
        assert_eq!(fp.to_reversed_hex(), "9d2500363423bcaa26e84ab9add33a81177771f8");
    }

    #[test]
    fn invalid() {
        let fp = Fingerprint::from_bytes(&[1, 2, 3]);
        assert!(matches!(fp, Fingerprint::Invalid(_)));
        assert_eq!(fp.to_keyid().as_bytes(), &[1, 2, 3]);
    }
}
