//! Packet-related types.
//!
//! Every packet that ends up in a certificate tree is wrapped in a
//! [`Packet`]: the packet's canonical bytes, its tag, whether its body
//! could be decoded, and its content identity (the packet's UUID).
//!
//! The content identity is a digest over the packet's bytes that is
//! scoped by the identities of all the packet's ancestors (see
//! [`scoped_digest`]).  The same signature appearing on two different
//! user IDs thus has two different identities, while importing the
//! same bytes under the same parent twice yields the same identity.
//!
//! See [Section 4 of RFC 4880] for more details on packets.
//!
//!   [Section 4 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-4

use std::fmt;
use std::io;

use sha2::Digest;

use crate::Result;
use crate::fmt::hex;
use crate::serialize::Serialize;

mod tag;
pub use self::tag::Tag;
pub mod header;
pub use self::header::{BodyLength, Header};
pub mod key;
pub use self::key::Key4;
mod userid;
pub use self::userid::UserIDBody;
pub mod user_attribute;
pub use self::user_attribute::UserAttributeBody;
pub mod signature;
pub use self::signature::Signature4;

/// Scope tags mixed into content identities.
///
/// The scope tag makes sure that, say, a user ID and a user attribute
/// with identical bodies still get different identities.
pub mod scope {
    /// User ID packets.
    pub const USER_ID: &str = "{uid}";
    /// User attribute packets.
    pub const USER_ATTRIBUTE: &str = "{uat}";
    /// Subkey packets.
    pub const SUBKEY: &str = "{sub}";
    /// Signature packets.
    pub const SIGNATURE: &str = "{sig}";
    /// Any other packet.
    pub const OTHER: &str = "{other}";
}

/// Computes a content identity.
///
/// The identity is the lowercase hex SHA-256 digest over each parent
/// identity followed by `{`, then `tag` and `bytes`, then one `}` per
/// parent.  It is a pure function of its arguments.
///
/// # Examples
///
/// ```rust
/// use keyserver_openpgp::packet::{scope, scoped_digest};
///
/// let a = scoped_digest(&["parent"], scope::USER_ID, b"\xcd\x01A");
/// let b = scoped_digest(&["parent"], scope::USER_ID, b"\xcd\x01A");
/// let c = scoped_digest(&["other parent"], scope::USER_ID, b"\xcd\x01A");
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// assert_eq!(a.len(), 64);
/// ```
pub fn scoped_digest(parents: &[&str], tag: &str, bytes: &[u8]) -> String {
    let mut h = sha2::Sha256::new();
    for parent in parents {
        h.update(parent.as_bytes());
        h.update(b"{");
    }
    h.update(tag.as_bytes());
    h.update(bytes);
    for _ in parents {
        h.update(b"}");
    }
    let mut digest = hex::encode(h.finalize());
    digest.make_ascii_lowercase();
    digest
}

/// An undecoded packet as produced by a packet stream reader.
///
/// This is the form in which packets enter the certificate layer.
/// See [`parse::PacketReader`].
///
///   [`parse::PacketReader`]: crate::parse::PacketReader
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OpaquePacket {
    tag: Tag,
    body: Vec<u8>,
}

impl fmt::Debug for OpaquePacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("OpaquePacket")
            .field("tag", &self.tag)
            .field("body", &format!("{} bytes", self.body.len()))
            .finish()
    }
}

impl OpaquePacket {
    /// Creates a new opaque packet.
    pub fn new(tag: Tag, body: Vec<u8>) -> Self {
        OpaquePacket { tag, body }
    }

    /// Returns the packet's tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Returns the packet's body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the header with which the packet is canonically
    /// serialized: a new format CTB and a full length.
    pub fn header(&self) -> Header {
        Header::new(header::CTB::new(self.tag),
                    BodyLength::Full(self.body.len() as u32))
    }
}

impl Serialize for OpaquePacket {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        self.header().serialize(o)?;
        o.write_all(&self.body)?;
        Ok(())
    }
}

/// A packet in a certificate tree.
///
/// A `Packet` never changes after it was created.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Packet {
    uuid: String,
    tag: Tag,
    parsed: bool,
    bytes: Vec<u8>,
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Packet")
            .field("uuid", &self.uuid)
            .field("tag", &self.tag)
            .field("parsed", &self.parsed)
            .field("bytes", &format!("{} bytes", self.bytes.len()))
            .finish()
    }
}

impl Packet {
    /// Wraps `op` using its canonical serialization.
    ///
    /// The packet's identity is the [`scoped_digest`] over the
    /// canonical bytes.
    pub fn new(parents: &[&str], scope: &str, op: &OpaquePacket, parsed: bool)
               -> Result<Self>
    {
        let bytes = op.to_vec()?;
        Ok(Packet {
            uuid: scoped_digest(parents, scope, &bytes),
            tag: op.tag(),
            parsed,
            bytes,
        })
    }

    /// Wraps `op` under an explicitly given identity.
    ///
    /// This is used for the certificate's root, whose identity is
    /// derived from its fingerprint.
    pub fn with_uuid(uuid: String, op: &OpaquePacket, parsed: bool)
                     -> Result<Self>
    {
        Ok(Packet {
            uuid,
            tag: op.tag(),
            parsed,
            bytes: op.to_vec()?,
        })
    }

    /// Wraps `op` as an opaque child packet of `parent`.
    pub fn other(parent: &str, op: &OpaquePacket) -> Result<Self> {
        Self::new(&[parent], scope::OTHER, op, false)
    }

    /// Returns the packet's content identity.
    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Returns the packet's tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Returns whether the packet's body was decoded.
    pub fn parsed(&self) -> bool {
        self.parsed
    }

    /// Returns the packet's canonical serialization, header included.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Recovers the opaque packet.
    pub fn opaque(&self) -> Result<OpaquePacket> {
        let (header, n) = Header::parse(&self.bytes)?;
        Ok(OpaquePacket::new(header.ctb().tag(), self.bytes[n..].to_vec()))
    }
}

impl Serialize for Packet {
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(&self.bytes)?;
        Ok(())
    }
}

assert_send_and_sync!(OpaquePacket);
assert_send_and_sync!(Packet);

#[cfg(test)]
mod tests {
    use super::*;

    quickcheck::quickcheck! {
        fn scoped_digest_is_deterministic(parents: Vec<String>, tag: String,
                                          bytes: Vec<u8>) -> bool {
            let parents: Vec<&str> =
                parents.iter().map(|p| p.as_str()).collect();
            scoped_digest(&parents, &tag, &bytes)
                == scoped_digest(&parents, &tag, &bytes)
        }
    }

    quickcheck::quickcheck! {
        fn scoped_digest_depends_on_bytes(bytes: Vec<u8>, i: usize) -> bool {
            if bytes.is_empty() {
                return true;
            }
            let mut changed = bytes.clone();
            let i = i % changed.len();
            changed[i] ^= 1;
            scoped_digest(&["p"], scope::SIGNATURE, &bytes)
                != scoped_digest(&["p"], scope::SIGNATURE, &changed)
        }
    }

    #[test]
    fn scoped_digest_depends_on_scope() {
        let bytes = b"\xcd\x03abc";
        let base = scoped_digest(&["a", "b"], scope::USER_ID, bytes);
        assert_ne!(base, scoped_digest(&["a", "c"], scope::USER_ID, bytes));
        assert_ne!(base, scoped_digest(&["c", "b"], scope::USER_ID, bytes));
        assert_ne!(base, scoped_digest(&["b"], scope::USER_ID, bytes));
        assert_ne!(base, scoped_digest(&["a", "b"], scope::SIGNATURE, bytes));
        assert!(base.chars().all(|c| c.is_ascii_hexdigit()
                                 && ! c.is_ascii_uppercase()));
    }

    #[test]
    fn canonical_bytes() {
        let op = OpaquePacket::new(Tag::UserID, b"Alice".to_vec());
        let p = Packet::new(&["root"], scope::USER_ID, &op, true).unwrap();
        assert_eq!(p.bytes(), b"\xcd\x05Alice");
        assert_eq!(p.opaque().unwrap(), op);
        assert_eq!(p.tag(), Tag::UserID);
        assert!(p.parsed());

        let other = Packet::other("root", &op).unwrap();
        assert_ne!(p.uuid(), other.uuid());
        assert!(! other.parsed());
    }
}
