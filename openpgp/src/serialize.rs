//! OpenPGP packet serializer.
//!
//! Packets in a certificate tree already carry their canonical
//! serialization, so serializing a tree is a matter of writing each
//! packet's bytes in [`PacketNode::contents`] order.
//!
//!   [`PacketNode::contents`]: crate::cert::PacketNode::contents

use std::io;

use crate::Result;
use crate::cert::{PacketNode, PrimaryKey};

/// Serializes OpenPGP data structures.
pub trait Serialize {
    /// Writes a serialized version of the object to `o`.
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()>;

    /// Serializes the object to a vector.
    fn to_vec(&self) -> Result<Vec<u8>> {
        let mut o = Vec::with_capacity(4096);
        self.serialize(&mut o)?;
        Ok(o)
    }
}

/// Serializes packet bodies.
///
/// This is implemented by the decoded packet types.  The packet
/// header is not written: the caller wraps the body in an
/// [`OpaquePacket`] to get a complete packet.
///
///   [`OpaquePacket`]: crate::packet::OpaquePacket
pub trait SerializeBody {
    /// Writes the serialized packet body to `o`.
    fn serialize_body(&self, o: &mut dyn io::Write) -> Result<()>;

    /// Serializes the packet body to a vector.
    fn body_to_vec(&self) -> Result<Vec<u8>> {
        let mut o = Vec::new();
        self.serialize_body(&mut o)?;
        Ok(o)
    }
}

impl Serialize for PrimaryKey {
    /// Writes every packet of the certificate.
    ///
    /// The packets are emitted in the order returned by
    /// [`PacketNode::contents`]: the primary key, its signatures and
    /// other packets, then each user ID, user attribute and subkey
    /// followed by its own signatures and other packets.
    fn serialize(&self, o: &mut dyn io::Write) -> Result<()> {
        for node in self.contents() {
            o.write_all(node.packet().bytes())?;
        }
        Ok(())
    }
}

/// Serializes a keyring.
pub fn serialize_keyring<'a, I>(certs: I, o: &mut dyn io::Write) -> Result<()>
    where I: IntoIterator<Item = &'a PrimaryKey>
{
    for cert in certs {
        cert.serialize(o)?;
    }
    Ok(())
}
