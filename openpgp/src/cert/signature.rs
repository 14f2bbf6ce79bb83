use std::ops::Deref;

use crate::Result;
use crate::cert::{NodeRef, PacketNode};
use crate::packet::{
    OpaquePacket,
    Packet,
    Signature4,
    scope,
};
use crate::parse::ParsedPacket;

/// A signature in a certificate tree.
///
/// Dereferences to the decoded [`Signature4`].
#[derive(Clone, Debug, PartialEq)]
pub struct Signature {
    packet: Packet,
    sig: Signature4,
}

impl Signature {
    /// Creates a signature node from a signature packet attached to
    /// the node identified by `parent_uuid`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidPacketType`] if `op` is not a
    /// signature packet, and with [`Error::MalformedPacket`] if it is
    /// not a well-formed version 4 signature.
    ///
    ///   [`Error::InvalidPacketType`]: crate::Error::InvalidPacketType
    ///   [`Error::MalformedPacket`]: crate::Error::MalformedPacket
    pub fn from_opaque(op: &OpaquePacket, parent_uuid: &str) -> Result<Self> {
        let sig = Signature4::from_opaque(op)?;
        Ok(Signature {
            packet: Packet::new(&[parent_uuid], scope::SIGNATURE, op, true)?,
            sig,
        })
    }

    /// Returns the decoded signature.
    pub fn signature(&self) -> &Signature4 {
        &self.sig
    }
}

impl Deref for Signature {
    type Target = Signature4;

    fn deref(&self) -> &Self::Target {
        &self.sig
    }
}

impl PacketNode for Signature {
    fn packet(&self) -> &Packet {
        &self.packet
    }

    fn contents(&self) -> Vec<NodeRef<'_>> {
        vec![NodeRef::Signature(self)]
    }
}

assert_send_and_sync!(Signature);
