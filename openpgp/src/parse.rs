//! Packet parsing infrastructure.
//!
//! Parsing happens in two layers.  A [`PacketReader`] splits a byte
//! stream into [`OpaquePacket`]s, looking only at packet headers.
//! Packet bodies are decoded on demand by the types implementing
//! [`ParsedPacket`].
//!
//!   [`OpaquePacket`]: crate::packet::OpaquePacket

use crate::{
    Error,
    Result,
};
use crate::packet::{
    BodyLength,
    Header,
    OpaquePacket,
    Tag,
};

const TRACE : bool = false;

/// Decodes the body of one kind of packet.
pub trait ParsedPacket: Sized {
    /// The tag of packets this type decodes.
    const TAG: Tag;

    /// Decodes a packet body.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::MalformedPacket`] if the body cannot be
    /// decoded.
    fn parse_body(body: &[u8]) -> Result<Self>;

    /// Decodes an opaque packet.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidPacketType`] if the packet's tag is
    /// not [`Self::TAG`], and with [`Error::MalformedPacket`] if the
    /// body cannot be decoded.
    fn from_opaque(op: &OpaquePacket) -> Result<Self> {
        if op.tag() != Self::TAG {
            return Err(Error::InvalidPacketType {
                expected: Self::TAG,
                actual: op.tag(),
            }.into());
        }
        Self::parse_body(op.body())
    }
}

/// Splits a packet stream into opaque packets.
///
/// The reader understands old and new format headers.  Partial body
/// lengths are reassembled for data packets, which lets a caller skip
/// over them; packets that can be part of a certificate must use a
/// definite length.
///
/// After an error, the reader stops: a corrupted header leaves no way
/// to find the next packet boundary.
///
/// # Examples
///
/// ```rust
/// # fn main() -> keyserver_openpgp::Result<()> {
/// use keyserver_openpgp::packet::Tag;
/// use keyserver_openpgp::parse::PacketReader;
///
/// // An old format user ID followed by a new format one.
/// let data = b"\xb4\x03Bob\xcd\x05Alice";
/// let packets = PacketReader::from_bytes(&data[..])
///     .collect::<keyserver_openpgp::Result<Vec<_>>>()?;
/// assert_eq!(packets.len(), 2);
/// assert_eq!(packets[0].tag(), Tag::UserID);
/// assert_eq!(packets[1].body(), b"Alice");
/// # Ok(()) }
/// ```
pub struct PacketReader<'a> {
    data: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> PacketReader<'a> {
    /// Creates a reader for the given packet stream.
    pub fn from_bytes(data: &'a [u8]) -> Self {
        PacketReader { data, offset: 0, failed: false }
    }

    /// Returns the offset of the next packet.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn read_packet(&mut self) -> Result<OpaquePacket> {
        tracer!(TRACE, "PacketReader::read_packet");

        let data = &self.data[self.offset..];
        let (header, header_len) = Header::parse(data)?;
        header.valid()?;
        let tag = header.ctb().tag();
        t!("{} at offset {}, {:?}", tag, self.offset, header.length());

        let mut consumed = header_len;
        let body = match *header.length() {
            BodyLength::Full(len) => {
                let len = len as usize;
                let body = data.get(consumed..consumed + len)
                    .ok_or_else(|| truncated(tag, len, data.len() - consumed))?;
                consumed += len;
                body.to_vec()
            },
            BodyLength::Indeterminate => {
                consumed = data.len();
                data[header_len..].to_vec()
            },
            BodyLength::Partial(first) => {
                let mut body = Vec::new();
                let mut chunk = first as usize;
                loop {
                    let piece = data.get(consumed..consumed + chunk)
                        .ok_or_else(|| truncated(tag, chunk,
                                                 data.len() - consumed))?;
                    body.extend_from_slice(piece);
                    consumed += chunk;

                    let (length, n) =
                        BodyLength::parse_new_format(&data[consumed..])?;
                    consumed += n;
                    match length {
                        BodyLength::Partial(l) => chunk = l as usize,
                        BodyLength::Full(l) => {
                            let l = l as usize;
                            let piece = data.get(consumed..consumed + l)
                                .ok_or_else(|| truncated(
                                    tag, l, data.len() - consumed))?;
                            body.extend_from_slice(piece);
                            consumed += l;
                            break;
                        },
                        BodyLength::Indeterminate => unreachable!(),
                    }
                }
                body
            },
        };

        self.offset += consumed;
        Ok(OpaquePacket::new(tag, body))
    }
}

impl<'a> Iterator for PacketReader<'a> {
    type Item = Result<OpaquePacket>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.data.len() {
            return None;
        }

        let r = self.read_packet();
        if r.is_err() {
            self.failed = true;
        }
        Some(r)
    }
}

fn truncated(tag: Tag, expected: usize, got: usize) -> anyhow::Error {
    Error::MalformedPacket(
        format!("Truncated {}: expected {} bytes, got {}",
                tag, expected, got)).into()
}
