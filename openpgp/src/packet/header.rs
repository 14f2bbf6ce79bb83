//! OpenPGP packet headers.
//!
//! A header consists of the Cipher Type Byte (CTB) and the body
//! length.  See [Section 4.2 of RFC 4880] for more details.
//!
//!   [Section 4.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2

use std::convert::TryFrom;
use std::io;

use crate::{
    Error,
    Result,
};
use crate::packet::Tag;
use crate::serialize::Serialize;

/// The body length as encoded in a packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLength {
    /// The packet's size is known.
    Full(u32),
    /// The parameter is the size of the first chunk.  Only data
    /// packets may use partial body lengths.
    Partial(u32),
    /// The packet extends to the end of the enclosing container.
    /// Only old format headers can express this.
    Indeterminate,
}

/// The old format length types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketLengthType {
    /// A one-octet length.
    OneOctet,
    /// A two-octet length.
    TwoOctets,
    /// A four-octet length.
    FourOctets,
    /// The length is determined by the container.
    Indeterminate,
}

impl From<u8> for PacketLengthType {
    fn from(u: u8) -> Self {
        match u & 0b11 {
            0 => PacketLengthType::OneOctet,
            1 => PacketLengthType::TwoOctets,
            2 => PacketLengthType::FourOctets,
            _ => PacketLengthType::Indeterminate,
        }
    }
}

/// The Cipher Type Byte.
///
/// There are two variants: the old format, which can only express
/// tags 0 to 15 and encodes the length's width in the CTB, and the
/// new format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CTB {
    /// A new format CTB.
    New(Tag),
    /// An old format CTB.
    Old(Tag, PacketLengthType),
}

impl CTB {
    /// Constructs a new format CTB.
    pub fn new(tag: Tag) -> Self {
        CTB::New(tag)
    }

    /// Returns the packet tag.
    pub fn tag(&self) -> Tag {
        match self {
            CTB::New(tag) => *tag,
            CTB::Old(tag, _) => *tag,
        }
    }
}

impl TryFrom<u8> for CTB {
    type Error = anyhow::Error;

    /// Decodes a CTB.
    fn try_from(ptag: u8) -> Result<CTB> {
        // The top bit of the ptag must be set.
        if ptag & 0b1000_0000 == 0 {
            return Err(Error::MalformedPacket(
                format!("Malformed CTB: MSB of ptag ({:#010b}) not set", ptag))
                       .into());
        }

        let new_format = ptag & 0b0100_0000 != 0;
        Ok(if new_format {
            CTB::New(Tag::from(ptag & 0b0011_1111))
        } else {
            let tag = (ptag & 0b0011_1100) >> 2;
            CTB::Old(Tag::from(tag), PacketLengthType::from(ptag))
        })
    }
}

impl Serialize for CTB {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        let ptag = match self {
            CTB::New(tag) => 0b1100_0000u8 | u8::from(*tag),
            CTB::Old(tag, length_type) => {
                let tag = u8::from(*tag);
                if tag > 15 {
                    return Err(Error::InvalidArgument(
                        format!("Only tags 0-15 are supported, got: {}",
                                tag)).into());
                }
                let lt = match length_type {
                    PacketLengthType::OneOctet => 0,
                    PacketLengthType::TwoOctets => 1,
                    PacketLengthType::FourOctets => 2,
                    PacketLengthType::Indeterminate => 3,
                };
                0b1000_0000u8 | (tag << 2) | lt
            }
        };
        o.write_all(&[ptag])?;
        Ok(())
    }
}

impl BodyLength {
    /// Decodes a new format body length as described in [Section
    /// 4.2.2 of RFC 4880].
    ///
    /// Returns the length and the number of octets consumed.
    ///
    ///   [Section 4.2.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2.2
    pub(crate) fn parse_new_format(data: &[u8]) -> Result<(BodyLength, usize)> {
        let octet1 = *data.get(0).ok_or_else(|| truncated("length"))?;
        match octet1 {
            0..=191 => // One octet.
                Ok((BodyLength::Full(octet1 as u32), 1)),
            192..=223 => { // Two octets length.
                let octet2 = *data.get(1).ok_or_else(|| truncated("length"))?;
                Ok((BodyLength::Full(((octet1 as u32 - 192) << 8)
                                     + octet2 as u32 + 192), 2))
            },
            224..=254 => // Partial body length.
                Ok((BodyLength::Partial(1 << (octet1 & 0x1F)), 1)),
            255 => // Five octets.
                Ok((BodyLength::Full(read_be_u32(&data[1..])?), 5)),
        }
    }

    /// Decodes an old format body length as described in [Section
    /// 4.2.1 of RFC 4880].
    ///
    ///   [Section 4.2.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4.2.1
    pub(crate) fn parse_old_format(data: &[u8], length_type: PacketLengthType)
        -> Result<(BodyLength, usize)>
    {
        match length_type {
            PacketLengthType::OneOctet => {
                let l = *data.get(0).ok_or_else(|| truncated("length"))?;
                Ok((BodyLength::Full(l as u32), 1))
            },
            PacketLengthType::TwoOctets => {
                if data.len() < 2 {
                    return Err(truncated("length"));
                }
                Ok((BodyLength::Full(u16::from_be_bytes([data[0], data[1]])
                                     as u32), 2))
            },
            PacketLengthType::FourOctets =>
                Ok((BodyLength::Full(read_be_u32(data)?), 4)),
            PacketLengthType::Indeterminate =>
                Ok((BodyLength::Indeterminate, 0)),
        }
    }
}

impl Serialize for BodyLength {
    /// Emits the length encoded for use with new format CTBs.
    ///
    /// Note: the CTB itself is not emitted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if invoked on
    /// [`BodyLength::Indeterminate`] or [`BodyLength::Partial`]:
    /// certificate packets are always written with a full length.
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        match self {
            BodyLength::Full(l) => {
                let l = *l;
                if l <= 191 {
                    o.write_all(&[l as u8])?;
                } else if l < 8384 {
                    let v = l - 192;
                    o.write_all(&[((v >> 8) as u8) + 192, (v & 0xFF) as u8])?;
                } else {
                    o.write_all(&[0xFF])?;
                    o.write_all(&l.to_be_bytes())?;
                }
            },
            BodyLength::Partial(_) =>
                return Err(Error::InvalidArgument(
                    "Partial body lengths are not supported".into()).into()),
            BodyLength::Indeterminate =>
                return Err(Error::InvalidArgument(
                    "Indeterminate lengths are not supported for new format \
                     packets".into()).into()),
        }
        Ok(())
    }
}

/// An OpenPGP packet's header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    /// The packet's CTB.
    ctb: CTB,
    /// The packet's length.
    length: BodyLength,
}

impl Header {
    /// Creates a new header.
    pub fn new(ctb: CTB, length: BodyLength) -> Self {
        Header { ctb, length }
    }

    /// Returns the packet's CTB.
    pub fn ctb(&self) -> &CTB {
        &self.ctb
    }

    /// Returns the packet's length.
    pub fn length(&self) -> &BodyLength {
        &self.length
    }

    /// Parses a header from the start of `data`.
    ///
    /// Returns the header and its size in octets.
    pub fn parse(data: &[u8]) -> Result<(Header, usize)> {
        let ptag = *data.get(0).ok_or_else(|| truncated("CTB"))?;
        let ctb = CTB::try_from(ptag)?;
        let (length, consumed) = match ctb {
            CTB::New(_) => BodyLength::parse_new_format(&data[1..])?,
            CTB::Old(_, length_type) =>
                BodyLength::parse_old_format(&data[1..], length_type)?,
        };
        Ok((Header::new(ctb, length), 1 + consumed))
    }

    /// Syntax checks the header.
    ///
    /// Reserved tags are never valid.  Partial body lengths are only
    /// valid for data packets, which a certificate never contains.
    pub fn valid(&self) -> Result<()> {
        let tag = self.ctb.tag();

        if tag == Tag::Reserved {
            return Err(Error::MalformedPacket(
                "Reserved packet tag".into()).into());
        }

        if let BodyLength::Partial(_) = self.length {
            if ! tag.is_foreign_to_certs() {
                return Err(Error::MalformedPacket(
                    format!("Partial body length not allowed for {}", tag))
                           .into());
            }
        }

        Ok(())
    }
}

impl Serialize for Header {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        self.ctb.serialize(o)?;
        match self.ctb {
            CTB::New(_) => self.length.serialize(o),
            CTB::Old(_, length_type) => {
                let l = match self.length {
                    BodyLength::Full(l) => l,
                    BodyLength::Indeterminate => return Ok(()),
                    BodyLength::Partial(_) =>
                        return Err(Error::InvalidArgument(
                            "Partial body lengths are not supported for old \
                             format packets".into()).into()),
                };
                match length_type {
                    PacketLengthType::OneOctet if l <= 0xFF =>
                        o.write_all(&[l as u8])?,
                    PacketLengthType::TwoOctets if l <= 0xFFFF =>
                        o.write_all(&(l as u16).to_be_bytes())?,
                    PacketLengthType::FourOctets =>
                        o.write_all(&l.to_be_bytes())?,
                    _ => return Err(Error::InvalidArgument(
                        format!("Length {} does not fit {:?}", l, length_type))
                                    .into()),
                }
                Ok(())
            }
        }
    }
}

fn read_be_u32(data: &[u8]) -> Result<u32> {
    if data.len() < 4 {
        return Err(truncated("length"));
    }
    Ok(u32::from_be_bytes([data[0], data[1], data[2], data[3]]))
}

fn truncated(what: &str) -> anyhow::Error {
    Error::MalformedPacket(format!("Truncated packet header: {}", what)).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_length_new_format() {
        fn test(input: &[u8], expected_result: BodyLength) {
            let (l, consumed) = BodyLength::parse_new_format(input).unwrap();
            assert_eq!(l, expected_result);
            assert_eq!(consumed, input.len());
        }

        // Examples from Section 4.2.3 of RFC4880.

        // Example #1.
        test(&[0x64][..], BodyLength::Full(100));

        // Example #2.
        test(&[0xC5, 0xFB][..], BodyLength::Full(1723));

        // Example #3.
        test(&[0xFF, 0x00, 0x01, 0x86, 0xA0][..], BodyLength::Full(100000));

        // Example #4.
        test(&[0xEF][..], BodyLength::Partial(32768));
        test(&[0xE1][..], BodyLength::Partial(2));
        test(&[0xF0][..], BodyLength::Partial(65536));
        test(&[0xC5, 0xDD][..], BodyLength::Full(1693));
    }

    #[test]
    fn body_length_old_format() {
        fn test(input: &[u8], plt: PacketLengthType,
                expected_result: BodyLength, consumed: usize) {
            assert_eq!(BodyLength::parse_old_format(input, plt).unwrap(),
                       (expected_result, consumed));
        }

        test(&[1], PacketLengthType::OneOctet, BodyLength::Full(1), 1);
        test(&[1, 2], PacketLengthType::TwoOctets,
             BodyLength::Full((1 << 8) + 2), 2);
        test(&[1, 2, 3, 4], PacketLengthType::FourOctets,
             BodyLength::Full((1 << 24) + (2 << 16) + (3 << 8) + 4), 4);
        test(&[1, 2, 3, 4, 5, 6], PacketLengthType::FourOctets,
             BodyLength::Full((1 << 24) + (2 << 16) + (3 << 8) + 4), 4);
        test(&[1, 2, 3, 4], PacketLengthType::Indeterminate,
             BodyLength::Indeterminate, 0);
    }

    quickcheck::quickcheck! {
        fn body_length_roundtrip(l: u32) -> bool {
            let mut encoded = Vec::new();
            BodyLength::Full(l).serialize(&mut encoded).unwrap();
            let (decoded, consumed) =
                BodyLength::parse_new_format(&encoded).unwrap();
            decoded == BodyLength::Full(l) && consumed == encoded.len()
        }
    }

    #[test]
    fn old_and_new_ctb() {
        // Old format user ID, one octet length.
        let (h, n) = Header::parse(&[0xb4, 0x05]).unwrap();
        assert_eq!(n, 2);
        assert_eq!(h.ctb().tag(), Tag::UserID);
        assert_eq!(h.length(), &BodyLength::Full(5));

        // New format user ID.
        let (h, n) = Header::parse(&[0xcd, 0x05]).unwrap();
        assert_eq!(n, 2);
        assert_eq!(h.ctb().tag(), Tag::UserID);
        assert_eq!(h.length(), &BodyLength::Full(5));

        // User attributes need a new format CTB.
        let (h, _) = Header::parse(&[0xd1, 0x05]).unwrap();
        assert_eq!(h.ctb().tag(), Tag::UserAttribute);

        assert!(Header::parse(&[0x42]).is_err());
        assert!(Header::parse(&[]).is_err());
    }

    #[test]
    fn partial_lengths_rejected_for_cert_packets() {
        let h = Header::new(CTB::new(Tag::Signature), BodyLength::Partial(512));
        assert!(h.valid().is_err());
        let h = Header::new(CTB::new(Tag::Literal), BodyLength::Partial(512));
        assert!(h.valid().is_ok());
        let h = Header::new(CTB::new(Tag::Reserved), BodyLength::Full(0));
        assert!(h.valid().is_err());
    }

    #[test]
    fn header_serialize() {
        let h = Header::new(CTB::Old(Tag::PublicKey,
                                     PacketLengthType::TwoOctets),
                            BodyLength::Full(0x10d));
        let mut buf = Vec::new();
        h.serialize(&mut buf).unwrap();
        assert_eq!(buf, vec![0x99, 0x01, 0x0d]);
        assert_eq!(Header::parse(&buf).unwrap(), (h, 3));
    }
}
