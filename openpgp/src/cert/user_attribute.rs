use crate::Result;
use crate::cert::{Signable, SigClass, Signature};
use crate::packet::{
    Key4,
    OpaquePacket,
    Packet,
    Signature4,
    UserAttributeBody,
    scope,
};
use crate::parse::ParsedPacket;
use crate::types::SignatureType;

/// A user attribute and its signatures.
///
/// User attributes carry photo IDs.  The image payloads are decoded
/// when the node is created.
#[derive(Clone, Debug, PartialEq)]
pub struct UserAttribute {
    packet: Packet,
    parent: String,
    body: UserAttributeBody,
    images: Vec<Vec<u8>>,
    signatures: Vec<Signature>,
    others: Vec<Packet>,
}

impl UserAttribute {
    /// Creates a user attribute node from a user attribute packet of
    /// the certificate identified by `parent_uuid`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidPacketType`] if `op` is not a user
    /// attribute packet, and with [`Error::MalformedPacket`] if one
    /// of its subpackets is malformed.
    ///
    ///   [`Error::InvalidPacketType`]: crate::Error::InvalidPacketType
    ///   [`Error::MalformedPacket`]: crate::Error::MalformedPacket
    pub fn from_opaque(op: &OpaquePacket, parent_uuid: &str) -> Result<Self> {
        let body = UserAttributeBody::from_opaque(op)?;
        Ok(UserAttribute {
            packet: Packet::new(&[parent_uuid], scope::USER_ATTRIBUTE, op,
                                true)?,
            parent: parent_uuid.into(),
            images: body.images(),
            body,
            signatures: Vec::new(),
            others: Vec::new(),
        })
    }

    /// Returns the decoded user attribute.
    pub fn body(&self) -> &UserAttributeBody {
        &self.body
    }

    /// Returns the image payloads, in order.
    pub fn images(&self) -> &[Vec<u8>] {
        &self.images
    }
}

impl_signable_node!(UserAttribute, UserAttribute);

impl Signable for UserAttribute {
    fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    fn others(&self) -> &[Packet] {
        &self.others
    }

    fn append_signature(&mut self, sig: Signature) {
        self.signatures.push(sig);
    }

    fn append_other(&mut self, other: Packet) {
        self.others.push(other);
    }

    fn absorb(&mut self, other: Self) {
        self.signatures.extend(other.signatures);
        self.others.extend(other.others);
    }

    fn retain_signatures<F>(&mut self, f: F) -> usize
        where F: FnMut(&Signature) -> bool
    {
        let before = self.signatures.len();
        self.signatures.retain(f);
        before - self.signatures.len()
    }

    fn signed_content(&self, primary: &Key4, sig: &Signature4) -> Vec<u8> {
        sig.user_attribute_binding_content(primary, &self.body)
    }

    fn classify(&self, _: &Key4, sig: &Signature4) -> SigClass {
        match sig.typ() {
            SignatureType::CertificationRevocation =>
                SigClass::certification_revocation(sig),
            t if t.is_certification() => SigClass::Certification {
                expires_at: sig.signature_expiration_time(),
                primary: sig.primary_userid(),
            },
            _ => SigClass::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::cert::PacketNode;
    use crate::packet::Tag;

    #[test]
    fn images() {
        // One JPEG image subpacket.
        let mut body = vec![21, 1, 0x10, 0x00, 0x01, 0x01];
        body.extend_from_slice(&[0; 12]);
        body.extend_from_slice(b"JFIF");
        let op = OpaquePacket::new(Tag::UserAttribute, body);
        let ua = UserAttribute::from_opaque(&op, "parent").unwrap();
        assert_eq!(ua.images(), &[b"JFIF".to_vec()]);
        assert_eq!(ua.parent_uuid(), "parent");
        assert_eq!(ua.packet().tag(), Tag::UserAttribute);
        assert!(ua.packet().parsed());
    }

    #[test]
    fn invalid() {
        let op = OpaquePacket::new(Tag::UserID, b"Alice".to_vec());
        let err = UserAttribute::from_opaque(&op, "parent").unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(),
                   Some(&Error::InvalidPacketType {
                       expected: Tag::UserAttribute,
                       actual: Tag::UserID,
                   }));

        // Truncated subpacket.
        let op = OpaquePacket::new(Tag::UserAttribute, vec![9, 1, 0x10]);
        let err = UserAttribute::from_opaque(&op, "parent").unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(),
                         Some(Error::MalformedPacket(_))));
    }
}
