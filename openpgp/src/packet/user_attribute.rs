//! User Attribute packets and subpackets.
//!
//! See [Section 5.12 of RFC 4880] for details.
//!
//!   [Section 5.12 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.12

use std::fmt;
use std::io;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

use crate::{
    Error,
    Result,
};
use crate::packet::Tag;
use crate::packet::header::BodyLength;
use crate::parse::ParsedPacket;
use crate::serialize::{Serialize, SerializeBody};

/// Holds a UserAttribute packet.
///
/// See [Section 5.12 of RFC 4880] for details.
///
///   [Section 5.12 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.12
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct UserAttributeBody {
    /// The user attribute.
    value: Vec<u8>,
}

impl fmt::Debug for UserAttributeBody {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("UserAttributeBody")
            .field("value", &format!("{} bytes", self.value.len()))
            .finish()
    }
}

impl UserAttributeBody {
    /// Returns a new `UserAttributeBody` packet containing the given
    /// subpackets.
    pub fn new(subpackets: &[Subpacket]) -> Result<Self> {
        let mut value = Vec::new();
        for sp in subpackets {
            sp.serialize(&mut value)?;
        }
        Ok(UserAttributeBody { value })
    }

    /// Gets the user attribute packet's raw value.
    pub fn value(&self) -> &[u8] {
        self.value.as_slice()
    }

    /// Iterates over the subpackets.
    pub fn subpackets(&self) -> SubpacketIterator {
        SubpacketIterator {
            data: &self.value[..],
        }
    }

    /// Returns the payloads of all image subpackets, in order.
    ///
    /// Malformed subpackets are skipped.
    pub fn images(&self) -> Vec<Vec<u8>> {
        self.subpackets()
            .filter_map(|sp| match sp {
                Ok(Subpacket::Image(image)) => Some(image.data().to_vec()),
                _ => None,
            })
            .collect()
    }
}

impl ParsedPacket for UserAttributeBody {
    const TAG: Tag = Tag::UserAttribute;

    /// Parses the body, checking that every subpacket is well formed.
    fn parse_body(body: &[u8]) -> Result<Self> {
        let ua = UserAttributeBody { value: body.to_vec() };
        for sp in ua.subpackets() {
            sp?;
        }
        Ok(ua)
    }
}

impl SerializeBody for UserAttributeBody {
    fn serialize_body(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(&self.value)?;
        Ok(())
    }
}

assert_send_and_sync!(UserAttributeBody);

/// Iterates over subpackets.
pub struct SubpacketIterator<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for SubpacketIterator<'a> {
    type Item = Result<Subpacket>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }

        let (length, consumed) = match BodyLength::parse_new_format(self.data)
        {
            Ok((BodyLength::Full(l), consumed)) => (l as usize, consumed),
            Ok(_) => {
                self.data = &[];
                return Some(Err(Error::MalformedPacket(
                    "Partial or Indeterminate length of subpacket".into())
                                .into()));
            },
            Err(e) => {
                self.data = &[];
                return Some(Err(e));
            },
        };

        let rest = &self.data[consumed..];
        if rest.len() < length {
            self.data = &[];
            return Some(Err(Error::MalformedPacket(
                "Truncated user attribute subpacket".into()).into()));
        }
        let (raw, rest) = rest.split_at(length);
        self.data = rest;

        if raw.is_empty() {
            return Some(Err(Error::MalformedPacket(
                "Subpacket without type octet".into()).into()));
        }

        let typ = raw[0];
        let raw = &raw[1..];
        match typ {
            // Image.
            1 => if raw.len() >= 16
                    && raw[..3] == [0x10, 0x00, 0x01]
                    && raw[4..16].iter().all(|b| *b == 0)
            {
                let image_kind = raw[3];
                Some(Ok(Subpacket::Image(match image_kind {
                    1 =>
                        Image::JPEG(raw[16..].to_vec()),
                    n @ 100..=110 =>
                        Image::Private(n, raw[16..].to_vec()),
                    n =>
                        Image::Unknown(n, raw[16..].to_vec()),
                })))
            } else {
                Some(Err(Error::MalformedPacket(
                    "Malformed image subpacket".into()).into()))
            },
            n =>
                Some(Ok(Subpacket::Unknown(n, raw.to_vec()))),
        }
    }
}

/// User Attribute subpackets.
///
/// See [Section 5.12 of RFC 4880] for details.
///
///   [Section 5.12 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.12
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Subpacket {
    /// Image subpacket.
    ///
    /// See [Section 5.12.1 of RFC 4880] for details.
    ///
    ///   [Section 5.12.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.12.1
    Image(Image),
    /// Unknown subpacket.
    Unknown(u8, Vec<u8>),
}

impl Serialize for Subpacket {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        let (typ, header, data): (u8, Option<[u8; 16]>, &[u8]) = match self {
            Subpacket::Image(image) => {
                let mut header = [0u8; 16];
                header[..3].copy_from_slice(&[0x10, 0x00, 0x01]);
                header[3] = image.kind();
                (1, Some(header), image.data())
            },
            Subpacket::Unknown(typ, data) => (*typ, None, &data[..]),
        };

        let len = 1 + header.map(|h| h.len()).unwrap_or(0) + data.len();
        BodyLength::Full(len as u32).serialize(o)?;
        o.write_all(&[typ])?;
        if let Some(header) = header {
            o.write_all(&header)?;
        }
        o.write_all(data)?;
        Ok(())
    }
}

/// Image subpacket.
///
/// See [Section 5.12.1 of RFC 4880] for details.
///
///   [Section 5.12.1 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.12.1
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Image {
    /// A JPEG image format.
    JPEG(Vec<u8>),
    /// Private, experimental image format.
    Private(u8, Vec<u8>),
    /// Unknown image format.
    Unknown(u8, Vec<u8>),
}

impl Image {
    /// Returns the image encoding.
    pub fn kind(&self) -> u8 {
        match self {
            Image::JPEG(_) => 1,
            Image::Private(n, _) | Image::Unknown(n, _) => *n,
        }
    }

    /// Returns the image data.
    pub fn data(&self) -> &[u8] {
        match self {
            Image::JPEG(data)
                | Image::Private(_, data)
                | Image::Unknown(_, data) => data,
        }
    }
}

#[cfg(test)]
impl Arbitrary for UserAttributeBody {
    fn arbitrary(g: &mut Gen) -> Self {
        let image = Image::JPEG(Vec::<u8>::arbitrary(g));
        let other = Subpacket::Unknown(u8::arbitrary(g).max(2),
                                       Vec::<u8>::arbitrary(g));
        UserAttributeBody::new(&[Subpacket::Image(image), other])
            .expect("serializing to a vector cannot fail")
    }
}
