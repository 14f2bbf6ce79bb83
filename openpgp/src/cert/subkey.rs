use crate::{
    Error,
    Fingerprint,
    KeyID,
    Result,
};
use crate::cert::{Signable, SigClass, Signature};
use crate::packet::{
    Key4,
    OpaquePacket,
    Packet,
    Signature4,
    Tag,
    scope,
};
use crate::parse::ParsedPacket;
use crate::types::SignatureType;

/// A subkey and its signatures.
#[derive(Clone, Debug, PartialEq)]
pub struct SubKey {
    packet: Packet,
    parent: String,
    key: Key4,
    signatures: Vec<Signature>,
    others: Vec<Packet>,
}

impl SubKey {
    /// Creates a subkey node from a public subkey packet of the
    /// certificate identified by `parent_uuid`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidPacketType`] if `op` is not a
    /// public subkey packet, and with [`Error::MalformedPacket`] if
    /// it is not a version 4 key.
    pub fn from_opaque(op: &OpaquePacket, parent_uuid: &str) -> Result<Self> {
        // Subkeys share the key body with primary keys, but not the
        // tag.
        if op.tag() != Tag::PublicSubkey {
            return Err(Error::InvalidPacketType {
                expected: Tag::PublicSubkey,
                actual: op.tag(),
            }.into());
        }
        let key = Key4::parse_body(op.body())?;
        Ok(SubKey {
            packet: Packet::new(&[parent_uuid], scope::SUBKEY, op, true)?,
            parent: parent_uuid.into(),
            key,
            signatures: Vec::new(),
            others: Vec::new(),
        })
    }

    /// Returns the public key.
    pub fn key(&self) -> &Key4 {
        &self.key
    }

    /// Returns the subkey's fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        self.key.fingerprint()
    }

    /// Returns the subkey's Key ID.
    pub fn keyid(&self) -> KeyID {
        self.key.keyid()
    }
}

impl_signable_node!(SubKey, SubKey);

impl Signable for SubKey {
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
        sig.subkey_binding_content(primary, &self.key)
    }

    fn classify(&self, _: &Key4, sig: &Signature4) -> SigClass {
        match sig.typ() {
            SignatureType::SubkeyRevocation =>
                SigClass::key_revocation(sig),
            SignatureType::SubkeyBinding => SigClass::Certification {
                expires_at: sig.key_expiration_time(&self.key),
                primary: false,
            },
            _ => SigClass::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::PacketNode;

    #[test]
    fn tags() {
        let body = vec![4, 0x53, 0x6f, 0x7a, 0x00, 22, 0, 8, 7];
        let sub = SubKey::from_opaque(
            &OpaquePacket::new(Tag::PublicSubkey, body.clone()), "parent")
            .unwrap();
        assert_eq!(sub.key().creation_time(),
                   crate::types::Timestamp::from(0x536f7a00));
        assert_eq!(sub.keyid(), sub.fingerprint().to_keyid());
        assert_eq!(sub.packet().tag(), Tag::PublicSubkey);

        // A primary key packet is not a subkey.
        let err = SubKey::from_opaque(
            &OpaquePacket::new(Tag::PublicKey, body), "parent").unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(),
                   Some(&Error::InvalidPacketType {
                       expected: Tag::PublicSubkey,
                       actual: Tag::PublicKey,
                   }));
    }
}
