//! Signature subpackets.
//!
//! OpenPGP signature packets include a set of key-value attributes
//! called subpackets.  These subpackets are used to indicate when a
//! signature was created, who created the signature, user and
//! implementation preferences, etc.  The full details are in [Section
//! 5.2.3.1 of RFC 4880].
//!
//! Only the subpackets needed to classify self signatures are decoded.
//! All other subpackets are preserved verbatim so that a signature
//! survives a parse and serialize cycle unchanged.
//!
//! [Section 5.2.3.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.1

use std::io;

use crate::{
    Error,
    Fingerprint,
    KeyID,
    Result,
};
use crate::packet::header::BodyLength;
use crate::serialize::Serialize;
use crate::types::{
    ReasonForRevocation,
    Timestamp,
};

code_table! {
    /// The subpacket types specified by [Section 5.2.3.1 of RFC 4880]
    /// that a key server interprets.
    ///
    /// [Section 5.2.3.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2.3.1
    pub enum SubpacketTag ("subpacket", private 100..=110) {
        /// Signature creation time.
        SignatureCreationTime = 2 => "signature creation time",
        /// Signature validity period.
        SignatureExpirationTime = 3 => "signature expiration time",
        /// Key validity period.
        KeyExpirationTime = 9 => "key expiration time",
        /// Issuer Key ID.
        Issuer = 16 => "issuer",
        /// Marks the certified user ID or attribute as the primary one.
        PrimaryUserID = 25 => "primary user id",
        /// Only meaningful in revocations.
        ReasonForRevocation = 29 => "reason for revocation",
        /// Issuer fingerprint, from RFC 4880bis.
        IssuerFingerprint = 33 => "issuer fingerprint",
    }
}

/// The value of a subpacket.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum SubpacketValue {
    /// The time the signature was made.
    SignatureCreationTime(Timestamp),
    /// The validity period of the signature, in seconds after its
    /// creation.  Zero means it does not expire.
    SignatureExpirationTime(u32),
    /// The validity period of the key, in seconds after its creation.
    /// Zero means it does not expire.
    KeyExpirationTime(u32),
    /// The issuer's Key ID.
    Issuer(KeyID),
    /// Whether the User ID is the primary one.
    PrimaryUserID(bool),
    /// Why a key or component was revoked.
    ReasonForRevocation {
        /// Machine-readable reason.
        code: ReasonForRevocation,
        /// Human-readable reason.
        reason: Vec<u8>,
    },
    /// The issuer's fingerprint.
    IssuerFingerprint(Fingerprint),
    /// A subpacket this crate does not interpret.
    Unknown {
        /// The subpacket's tag.
        tag: u8,
        /// The subpacket's body.
        body: Vec<u8>,
    },
}

impl SubpacketValue {
    /// Returns the subpacket's tag.
    pub fn tag(&self) -> SubpacketTag {
        match self {
            SubpacketValue::SignatureCreationTime(_) =>
                SubpacketTag::SignatureCreationTime,
            SubpacketValue::SignatureExpirationTime(_) =>
                SubpacketTag::SignatureExpirationTime,
            SubpacketValue::KeyExpirationTime(_) =>
                SubpacketTag::KeyExpirationTime,
            SubpacketValue::Issuer(_) => SubpacketTag::Issuer,
            SubpacketValue::PrimaryUserID(_) => SubpacketTag::PrimaryUserID,
            SubpacketValue::ReasonForRevocation { .. } =>
                SubpacketTag::ReasonForRevocation,
            SubpacketValue::IssuerFingerprint(_) =>
                SubpacketTag::IssuerFingerprint,
            SubpacketValue::Unknown { tag, .. } => SubpacketTag::from(*tag),
        }
    }

    fn parse(tag: u8, body: &[u8]) -> Result<Self> {
        fn be_u32(tag: u8, body: &[u8]) -> Result<u32> {
            if body.len() != 4 {
                return Err(Error::MalformedPacket(
                    format!("Subpacket {}: expected 4 bytes, got {}",
                            tag, body.len())).into());
            }
            Ok(u32::from_be_bytes([body[0], body[1], body[2], body[3]]))
        }

        Ok(match SubpacketTag::from(tag) {
            SubpacketTag::SignatureCreationTime =>
                SubpacketValue::SignatureCreationTime(be_u32(tag, body)?.into()),
            SubpacketTag::SignatureExpirationTime =>
                SubpacketValue::SignatureExpirationTime(be_u32(tag, body)?),
            SubpacketTag::KeyExpirationTime =>
                SubpacketValue::KeyExpirationTime(be_u32(tag, body)?),
            SubpacketTag::Issuer => {
                if body.len() != 8 {
                    return Err(Error::MalformedPacket(
                        format!("Issuer subpacket: expected 8 bytes, got {}",
                                body.len())).into());
                }
                SubpacketValue::Issuer(KeyID::from_bytes(body))
            },
            SubpacketTag::PrimaryUserID => {
                if body.len() != 1 {
                    return Err(Error::MalformedPacket(
                        format!("Primary user id subpacket: expected 1 byte, \
                                 got {}", body.len())).into());
                }
                SubpacketValue::PrimaryUserID(body[0] != 0)
            },
            SubpacketTag::ReasonForRevocation => {
                if body.is_empty() {
                    return Err(Error::MalformedPacket(
                        "Empty reason for revocation subpacket".into())
                               .into());
                }
                SubpacketValue::ReasonForRevocation {
                    code: body[0].into(),
                    reason: body[1..].to_vec(),
                }
            },
            SubpacketTag::IssuerFingerprint => {
                // Version octet followed by the fingerprint.
                if body.len() != 21 || body[0] != 4 {
                    return Err(Error::MalformedPacket(
                        "Malformed issuer fingerprint subpacket".into())
                               .into());
                }
                SubpacketValue::IssuerFingerprint(
                    Fingerprint::from_bytes(&body[1..]))
            },
            SubpacketTag::Private(_) | SubpacketTag::Unknown(_) =>
                SubpacketValue::Unknown { tag, body: body.to_vec() },
        })
    }

    fn body(&self) -> Vec<u8> {
        match self {
            SubpacketValue::SignatureCreationTime(t) =>
                u32::from(*t).to_be_bytes().to_vec(),
            SubpacketValue::SignatureExpirationTime(d)
                | SubpacketValue::KeyExpirationTime(d) =>
                d.to_be_bytes().to_vec(),
            SubpacketValue::Issuer(id) => id.as_bytes().to_vec(),
            SubpacketValue::PrimaryUserID(p) => vec![*p as u8],
            SubpacketValue::ReasonForRevocation { code, reason } => {
                let mut body = Vec::with_capacity(1 + reason.len());
                body.push((*code).into());
                body.extend_from_slice(reason);
                body
            },
            SubpacketValue::IssuerFingerprint(fp) => {
                let mut body = Vec::with_capacity(21);
                body.push(4);
                body.extend_from_slice(fp.as_bytes());
                body
            },
            SubpacketValue::Unknown { body, .. } => body.clone(),
        }
    }
}

/// A signature subpacket.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Subpacket {
    critical: bool,
    value: SubpacketValue,
}

impl Subpacket {
    /// Creates a new subpacket.
    pub fn new(value: SubpacketValue, critical: bool) -> Self {
        Subpacket { critical, value }
    }

    /// Returns whether the critical bit is set.
    pub fn critical(&self) -> bool {
        self.critical
    }

    /// Returns the subpacket's tag.
    pub fn tag(&self) -> SubpacketTag {
        self.value.tag()
    }

    /// Returns the subpacket's value.
    pub fn value(&self) -> &SubpacketValue {
        &self.value
    }
}

impl Serialize for Subpacket {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        let body = self.value.body();
        // The length includes the type octet.
        BodyLength::Full(1 + body.len() as u32).serialize(o)?;
        let tag: u8 = self.tag().into();
        o.write_all(&[tag | if self.critical { 0x80 } else { 0 }])?;
        o.write_all(&body)?;
        Ok(())
    }
}

/// Subpacket area.
///
/// Subpackets are kept in the order in which they appear.  When a
/// subpacket occurs more than once, the lookup functions return the
/// *last* occurrence.
///
/// The raw data is kept alongside the decoded subpackets.  A parsed
/// area is serialized from its raw data, so that a signature's hashed
/// area survives a round trip bit for bit even if it uses
/// non-canonical length encodings.
#[derive(Debug, Default, PartialEq, Eq, Hash, Clone)]
pub struct SubpacketArea {
    /// Raw subpacket data.
    data: Vec<u8>,
    /// The decoded subpackets.
    packets: Vec<Subpacket>,
}

impl SubpacketArea {
    /// Returns a new subpacket area containing the given packets.
    pub fn new(packets: Vec<Subpacket>) -> Result<Self> {
        let mut area = SubpacketArea { data: Vec::new(), packets };
        area.reencode()?;
        Ok(area)
    }

    /// Parses a subpacket area.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut packets = Vec::new();
        let mut data = raw;
        while ! data.is_empty() {
            let (len, consumed) = BodyLength::parse_new_format(data)?;
            let len = match len {
                BodyLength::Full(len) => len as usize,
                _ => return Err(Error::MalformedPacket(
                    "Partial subpacket length".into()).into()),
            };
            data = &data[consumed..];
            if len == 0 || len > data.len() {
                return Err(Error::MalformedPacket(
                    format!("Subpacket length {} exceeds area ({} bytes left)",
                            len, data.len())).into());
            }

            let critical = data[0] & 0x80 != 0;
            let tag = data[0] & 0x7f;
            let value = SubpacketValue::parse(tag, &data[1..len])?;
            packets.push(Subpacket::new(value, critical));
            data = &data[len..];
        }
        Ok(SubpacketArea { data: raw.to_vec(), packets })
    }

    /// Returns the raw subpacket data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Iterates over the subpackets.
    pub fn iter(&self) -> impl Iterator<Item = &Subpacket> {
        self.packets.iter()
    }

    /// Returns the number of subpackets.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Returns whether the area is empty.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Returns the last instance of the specified subpacket.
    pub fn lookup(&self, tag: SubpacketTag) -> Option<&Subpacket> {
        self.packets.iter().rev().find(|sp| sp.tag() == tag)
    }

    /// Adds the given subpacket.
    ///
    /// # Errors
    ///
    /// Fails if the area would exceed the 16-bit size limit.
    pub fn add(&mut self, packet: Subpacket) -> Result<()> {
        self.packets.push(packet);
        self.reencode()
    }

    /// Adds the given subpacket, replacing all other subpackets with
    /// the same tag.
    pub fn replace(&mut self, packet: Subpacket) -> Result<()> {
        let tag = packet.tag();
        self.packets.retain(|sp| sp.tag() != tag);
        self.add(packet)
    }

    /// Removes all subpackets with the given tag.
    pub fn remove_all(&mut self, tag: SubpacketTag) -> Result<()> {
        self.packets.retain(|sp| sp.tag() != tag);
        self.reencode()
    }

    fn reencode(&mut self) -> Result<()> {
        let mut data = Vec::new();
        for sp in self.packets.iter() {
            sp.serialize(&mut data)?;
        }
        if data.len() > std::u16::MAX as usize {
            return Err(Error::InvalidArgument(
                "Subpacket area exceeds 64 KiB".into()).into());
        }
        self.data = data;
        Ok(())
    }
}

impl Serialize for SubpacketArea {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(&self.data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    quickcheck::quickcheck! {
        fn tag_roundtrip(tag: SubpacketTag) -> bool {
            let val: u8 = tag.into();
            tag == SubpacketTag::from(val)
        }
    }

    #[test]
    fn parse_area() {
        let area = SubpacketArea::new(vec![
            Subpacket::new(SubpacketValue::SignatureCreationTime(
                Timestamp::from(1_500_000_000)), false),
            Subpacket::new(SubpacketValue::PrimaryUserID(true), false),
            Subpacket::new(SubpacketValue::Unknown {
                tag: 27, body: vec![0x03],
            }, false),
            Subpacket::new(SubpacketValue::ReasonForRevocation {
                code: ReasonForRevocation::UIDRetired,
                reason: b"moved".to_vec(),
            }, true),
        ]).unwrap();

        let bytes = area.to_vec().unwrap();
        assert_eq!(&bytes[..6], &[5, 2, 0x59, 0x68, 0x2f, 0x00]);
        let parsed = SubpacketArea::parse(&bytes).unwrap();
        assert_eq!(parsed, area);
        assert!(parsed.lookup(SubpacketTag::ReasonForRevocation)
                .unwrap().critical());
        assert_eq!(parsed.lookup(SubpacketTag::Unknown(27)).unwrap().value(),
                   &SubpacketValue::Unknown { tag: 27, body: vec![0x03] });
    }

    #[test]
    fn last_occurrence_wins() {
        let mut area = SubpacketArea::default();
        area.add(Subpacket::new(SubpacketValue::PrimaryUserID(true), false))
            .unwrap();
        area.add(Subpacket::new(SubpacketValue::PrimaryUserID(false), false))
            .unwrap();
        assert_eq!(area.lookup(SubpacketTag::PrimaryUserID).unwrap().value(),
                   &SubpacketValue::PrimaryUserID(false));

        area.replace(Subpacket::new(SubpacketValue::PrimaryUserID(true), false))
            .unwrap();
        assert_eq!(area.len(), 1);
        assert_eq!(area.data(), &[2, 25, 1]);
    }

    #[test]
    fn raw_data_is_preserved() {
        // A creation time subpacket using a five octet length.
        let raw = [0xff, 0, 0, 0, 5, 2, 0x59, 0x68, 0x2f, 0x00];
        let area = SubpacketArea::parse(&raw).unwrap();
        assert_eq!(area.len(), 1);
        assert_eq!(area.to_vec().unwrap(), raw.to_vec());
    }

    #[test]
    fn malformed() {
        // Length exceeds the area.
        assert!(SubpacketArea::parse(&[5, 2, 0, 0]).is_err());
        // Zero length.
        assert!(SubpacketArea::parse(&[0]).is_err());
        // Creation time with the wrong size.
        assert!(SubpacketArea::parse(&[3, 2, 0, 0]).is_err());
        // Empty area.
        assert!(SubpacketArea::parse(&[]).unwrap().is_empty());
    }
}
