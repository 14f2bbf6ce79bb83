//! Assembling certificate trees from packet streams.
//!
//! A keyring is a sequence of transferable public keys: a public key
//! packet, followed by its signatures, and then by user IDs, user
//! attributes and subkeys, each followed by its own signatures.
//! [`KeyringParser`] buffers the packets of one certificate until the
//! next public key packet or the end of the stream, and then builds
//! the tree.
//!
//! The parser is lenient where it can be without losing data, and
//! strict where it must be:
//!
//!   - A signature attaches to the most recent user ID, user
//!     attribute or subkey, or to the primary key if there is none
//!     yet.  A signature that cannot be decoded is kept as an other
//!     packet of that node.
//!
//!   - A component that cannot be decoded is kept as an other packet
//!     of the primary key, as are the signatures that follow it.
//!
//!   - Trust packets and packets with unknown tags are kept as other
//!     packets of the current node.  Marker packets are ignored.
//!
//!   - Secret keys and packets that have no place in a certificate,
//!     such as literal data, make the current certificate fail with
//!     [`Error::MalformedCert`].  The parser then skips ahead to the
//!     next public key packet.
//!
//! # Examples
//!
//! ```rust
//! # fn main() -> keyserver_openpgp::Result<()> {
//! use keyserver_openpgp::cert::parser::KeyringParser;
//!
//! # let bytes = b"";
//! for cert in KeyringParser::from_bytes(&bytes[..]) {
//!     match cert {
//!         Ok(cert) => println!("{}", cert.fingerprint()),
//!         Err(err) => eprintln!("Skipping certificate: {}", err),
//!     }
//! }
//! # Ok(()) }
//! ```

use std::mem;

use crate::{
    armor,
    Error,
    Result,
};
use crate::cert::{
    NodeId,
    PacketNode,
    PrimaryKey,
    Signable,
    Signature,
    SubKey,
    UserAttribute,
    UserID,
};
use crate::packet::{
    OpaquePacket,
    Packet,
    Tag,
};
use crate::parse::PacketReader;

const TRACE : bool = false;

/// Parses a keyring into certificates.
///
/// Yields one item per certificate in the stream: the certificate, or
/// the reason it was rejected.  A reader error ends the iteration;
/// the certificate being assembled when it occurred is returned
/// before the error.
pub struct KeyringParser<'a> {
    source: PacketReader<'a>,
    packets: Vec<OpaquePacket>,
    skipping: bool,
    pending: Option<anyhow::Error>,
}

assert_send_and_sync!(KeyringParser<'_>);

impl<'a> KeyringParser<'a> {
    /// Creates a parser for the given packet stream.
    pub fn from_bytes(data: &'a [u8]) -> Self {
        Self::from_reader(PacketReader::from_bytes(data))
    }

    /// Creates a parser reading from `source`.
    pub fn from_reader(source: PacketReader<'a>) -> Self {
        KeyringParser {
            source,
            packets: Vec::new(),
            skipping: false,
            pending: None,
        }
    }

    // Handles the next packet.
    //
    // Returns a certificate if `op` completes one.
    fn parse(&mut self, op: OpaquePacket) -> Result<Option<PrimaryKey>> {
        tracer!(TRACE, "KeyringParser::parse");
        let tag = op.tag();

        if tag == Tag::Marker {
            // RFC 4880, section 5.8: "Such a packet MUST be ignored
            // when received."
            return Ok(None);
        }

        if tag == Tag::PublicKey {
            self.skipping = false;
            if self.packets.is_empty() {
                self.packets.push(op);
                return Ok(None);
            }
            t!("Start of a new certificate, finishing buffered one");
            let cert = self.cert();
            self.packets.push(op);
            return cert.map(Some);
        }

        if self.skipping {
            t!("Skipping {}", tag);
            return Ok(None);
        }

        if self.packets.is_empty() {
            self.skipping = true;
            return Err(Error::MalformedCert(
                format!("{} before the first public key", tag)).into());
        }

        if tag.is_foreign_to_certs()
            || tag == Tag::SecretKey || tag == Tag::SecretSubkey
        {
            let dropped = mem::take(&mut self.packets);
            self.skipping = true;
            log::warn!("Dropping certificate of {} packets: unexpected {}",
                       dropped.len(), tag);
            return Err(Error::MalformedCert(
                format!("Unexpected {} in certificate", tag)).into());
        }

        self.packets.push(op);
        Ok(None)
    }

    // Builds a certificate from the buffered packets.
    fn cert(&mut self) -> Result<PrimaryKey> {
        build(mem::take(&mut self.packets))
    }
}

impl<'a> Iterator for KeyringParser<'a> {
    type Item = Result<PrimaryKey>;

    fn next(&mut self) -> Option<Self::Item> {
        tracer!(TRACE, "KeyringParser::next");

        loop {
            if let Some(err) = self.pending.take() {
                return Some(Err(err));
            }

            match self.source.next() {
                Some(Ok(op)) => match self.parse(op) {
                    Ok(Some(cert)) => return Some(Ok(cert)),
                    Ok(None) => (),
                    Err(err) => return Some(Err(err)),
                },
                Some(Err(err)) => {
                    t!("Error reading packet: {}", err);
                    if self.packets.is_empty() {
                        return Some(Err(err));
                    }
                    self.pending = Some(err);
                    return Some(self.cert());
                },
                None if self.packets.is_empty() => return None,
                None => return Some(self.cert()),
            }
        }
    }
}

/// Parses a binary keyring.
pub fn read_keys(data: &[u8]) -> KeyringParser<'_> {
    KeyringParser::from_bytes(data)
}

/// Parses an ASCII-armored keyring.
///
/// # Errors
///
/// Fails with [`Error::MalformedArmor`] if the armor is broken.
/// Errors in individual certificates are returned in the vector.
pub fn read_armored_keys(data: &[u8]) -> Result<Vec<Result<PrimaryKey>>> {
    let bytes = armor::dearmor(data)?;
    Ok(read_keys(&bytes).collect())
}

// Where the next signature or other packet goes.
#[derive(Clone, Copy, Debug)]
enum Target {
    Primary,
    Child(NodeId),
    // After a component that could not be decoded.
    Orphan,
}

// Builds the tree of one certificate.  `packets` starts with a public
// key packet and only holds packets that may appear in a certificate.
fn build(packets: Vec<OpaquePacket>) -> Result<PrimaryKey> {
    tracer!(TRACE, "build");

    let mut packets = packets.into_iter();
    let first = packets.next().ok_or_else(|| Error::MalformedCert(
        "Empty certificate".into()))?;
    let mut pk = PrimaryKey::from_opaque(&first)?;
    t!("Building {} from {} packets", pk.fingerprint(), packets.len() + 1);

    let mut target = Target::Primary;
    for op in packets {
        let component = match op.tag() {
            Tag::UserID => UserID::from_opaque(&op, pk.uuid())
                .map(|n| {
                    pk.userids.push(n);
                    NodeId::UserID(pk.userids.len() - 1)
                }),
            Tag::UserAttribute => UserAttribute::from_opaque(&op, pk.uuid())
                .map(|n| {
                    pk.user_attributes.push(n);
                    NodeId::UserAttribute(pk.user_attributes.len() - 1)
                }),
            Tag::PublicSubkey => SubKey::from_opaque(&op, pk.uuid())
                .map(|n| {
                    pk.subkeys.push(n);
                    NodeId::SubKey(pk.subkeys.len() - 1)
                }),
            _ => {
                attach(&mut pk, target, &op)?;
                continue;
            },
        };

        target = match component {
            Ok(id) => Target::Child(id),
            Err(err) => {
                log::warn!("{}: keeping undecodable {}: {}",
                           pk.fingerprint(), op.tag(), err);
                let other = Packet::other(pk.uuid(), &op)?;
                pk.append_other(other);
                Target::Orphan
            },
        };
    }

    Ok(pk)
}

// Attaches a signature or other packet to the current target.
fn attach(pk: &mut PrimaryKey, target: Target, op: &OpaquePacket)
          -> Result<()> {
    let node: &mut dyn Signable = match target {
        Target::Primary => pk,
        Target::Child(NodeId::UserID(i)) => &mut pk.userids[i],
        Target::Child(NodeId::UserAttribute(i)) =>
            &mut pk.user_attributes[i],
        Target::Child(NodeId::SubKey(i)) => &mut pk.subkeys[i],
        Target::Orphan => {
            let other = Packet::other(pk.uuid(), op)?;
            pk.append_other(other);
            return Ok(());
        },
    };

    if op.tag() == Tag::Signature {
        match Signature::from_opaque(op, node.uuid()) {
            Ok(sig) => {
                node.append_signature(sig);
                return Ok(());
            },
            Err(err) =>
                log::warn!("{}: keeping undecodable signature: {}",
                           node.uuid(), err),
        }
    }
    let other = Packet::other(node.uuid(), op)?;
    node.append_other(other);
    Ok(())
}
