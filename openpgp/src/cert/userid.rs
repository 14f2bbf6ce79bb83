use crate::Result;
use crate::cert::{Signable, SigClass, Signature};
use crate::packet::{
    Key4,
    OpaquePacket,
    Packet,
    Signature4,
    UserIDBody,
    scope,
};
use crate::parse::ParsedPacket;
use crate::types::SignatureType;

/// A user ID and its signatures.
#[derive(Clone, Debug, PartialEq)]
pub struct UserID {
    packet: Packet,
    parent: String,
    body: UserIDBody,
    signatures: Vec<Signature>,
    others: Vec<Packet>,
}

impl UserID {
    /// Creates a user ID node from a user ID packet of the
    /// certificate identified by `parent_uuid`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidPacketType`] if `op` is not a user
    /// ID packet.
    ///
    ///   [`Error::InvalidPacketType`]: crate::Error::InvalidPacketType
    pub fn from_opaque(op: &OpaquePacket, parent_uuid: &str) -> Result<Self> {
        let body = UserIDBody::from_opaque(op)?;
        Ok(UserID {
            packet: Packet::new(&[parent_uuid], scope::USER_ID, op, true)?,
            parent: parent_uuid.into(),
            body,
            signatures: Vec::new(),
            others: Vec::new(),
        })
    }

    /// Returns the decoded user ID.
    pub fn body(&self) -> &UserIDBody {
        &self.body
    }

    /// Returns the user ID's value.
    pub fn value(&self) -> &[u8] {
        self.body.value()
    }
}

impl_signable_node!(UserID, UserID);

impl Signable for UserID {
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
        sig.userid_binding_content(primary, &self.body)
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
