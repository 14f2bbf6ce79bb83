//! Types for signatures.
//!
//! Only version 4 signatures are decoded.  A signature's public-key
//! material is kept as raw bytes: checking it is the job of a
//! [`SignatureVerifier`].
//!
//!   [`SignatureVerifier`]: crate::crypto::SignatureVerifier

use std::fmt;
use std::io;

use crate::{
    Error,
    Fingerprint,
    KeyID,
    Result,
};
use crate::crypto::Signer;
use crate::crypto::hash;
use crate::packet::{
    Key4,
    Tag,
    UserAttributeBody,
    UserIDBody,
};
use crate::parse::ParsedPacket;
use crate::serialize::{Serialize, SerializeBody};
use crate::types::{
    HashAlgorithm,
    PublicKeyAlgorithm,
    ReasonForRevocation,
    RevocationType,
    SignatureType,
    Timestamp,
};

pub mod subpacket;
use self::subpacket::{
    Subpacket,
    SubpacketArea,
    SubpacketTag,
    SubpacketValue,
};

const TRACE : bool = false;

/// Builds a signature packet.
///
/// This is the mutable version of a [`Signature4`].  To convert it to
/// one, use one of the `sign_*` functions.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct SignatureBuilder {
    typ: SignatureType,
    pk_algo: PublicKeyAlgorithm,
    hash_algo: HashAlgorithm,
    hashed_area: SubpacketArea,
    unhashed_area: SubpacketArea,
}

impl SignatureBuilder {
    /// Returns a new `SignatureBuilder` object.
    pub fn new(typ: SignatureType) -> Self {
        SignatureBuilder {
            typ,
            pk_algo: PublicKeyAlgorithm::Unknown(0),
            hash_algo: HashAlgorithm::default(),
            hashed_area: SubpacketArea::default(),
            unhashed_area: SubpacketArea::default(),
        }
    }

    /// Gets the signature type.
    pub fn typ(&self) -> SignatureType {
        self.typ
    }

    /// Gets the public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Gets the hash algorithm.
    pub fn hash_algo(&self) -> HashAlgorithm {
        self.hash_algo
    }

    /// Sets the hash algorithm.
    pub fn set_hash_algo(mut self, algo: HashAlgorithm) -> Self {
        self.hash_algo = algo;
        self
    }

    /// Gets a reference to the hashed area.
    pub fn hashed_area(&self) -> &SubpacketArea {
        &self.hashed_area
    }

    /// Gets a mutable reference to the hashed area.
    pub fn hashed_area_mut(&mut self) -> &mut SubpacketArea {
        &mut self.hashed_area
    }

    /// Gets a reference to the unhashed area.
    pub fn unhashed_area(&self) -> &SubpacketArea {
        &self.unhashed_area
    }

    /// Gets a mutable reference to the unhashed area.
    pub fn unhashed_area_mut(&mut self) -> &mut SubpacketArea {
        &mut self.unhashed_area
    }

    /// Sets the Signature Creation Time subpacket.
    pub fn set_signature_creation_time<T>(mut self, t: T) -> Result<Self>
        where T: Into<Timestamp>
    {
        self.hashed_area.replace(Subpacket::new(
            SubpacketValue::SignatureCreationTime(t.into()), true))?;
        Ok(self)
    }

    /// Sets the Signature Expiration Time subpacket.
    ///
    /// `validity` is the number of seconds after the signature's
    /// creation time.  `None` removes the subpacket.
    pub fn set_signature_validity_period(mut self, validity: Option<u32>)
        -> Result<Self>
    {
        match validity {
            Some(v) => self.hashed_area.replace(Subpacket::new(
                SubpacketValue::SignatureExpirationTime(v), true))?,
            None => self.hashed_area.remove_all(
                SubpacketTag::SignatureExpirationTime)?,
        }
        Ok(self)
    }

    /// Sets the Key Expiration Time subpacket.
    ///
    /// `validity` is the number of seconds after the key's creation
    /// time.  `None` removes the subpacket.
    pub fn set_key_validity_period(mut self, validity: Option<u32>)
        -> Result<Self>
    {
        match validity {
            Some(v) => self.hashed_area.replace(Subpacket::new(
                SubpacketValue::KeyExpirationTime(v), true))?,
            None => self.hashed_area.remove_all(
                SubpacketTag::KeyExpirationTime)?,
        }
        Ok(self)
    }

    /// Sets the Primary User ID subpacket.
    pub fn set_primary_userid(mut self, primary: bool) -> Result<Self> {
        self.hashed_area.replace(Subpacket::new(
            SubpacketValue::PrimaryUserID(primary), true))?;
        Ok(self)
    }

    /// Sets the Reason for Revocation subpacket.
    pub fn set_reason_for_revocation<R>(mut self, code: ReasonForRevocation,
                                        reason: R)
        -> Result<Self>
        where R: AsRef<[u8]>
    {
        self.hashed_area.replace(Subpacket::new(
            SubpacketValue::ReasonForRevocation {
                code,
                reason: reason.as_ref().to_vec(),
            }, false))?;
        Ok(self)
    }

    /// Sets the Issuer subpacket.
    ///
    /// The issuer is self-authenticating, so it goes into the
    /// unhashed area.
    pub fn set_issuer(mut self, id: KeyID) -> Result<Self> {
        self.unhashed_area.replace(Subpacket::new(
            SubpacketValue::Issuer(id), false))?;
        Ok(self)
    }

    /// Sets the Issuer Fingerprint subpacket.
    pub fn set_issuer_fingerprint(mut self, fp: Fingerprint) -> Result<Self> {
        self.hashed_area.replace(Subpacket::new(
            SubpacketValue::IssuerFingerprint(fp), false))?;
        Ok(self)
    }

    /// Signs the signer's own key, creating a direct key signature or
    /// a key revocation.
    pub fn sign_direct_key(self, signer: &mut dyn Signer)
        -> Result<Signature4>
    {
        let fields = self.prepare(signer)?;
        let content = fields.direct_key_content(signer.public());
        fields.sign(signer, &content)
    }

    /// Signs the binding between the signer's key and `subkey`.
    pub fn sign_subkey_binding(self, signer: &mut dyn Signer, subkey: &Key4)
        -> Result<Signature4>
    {
        let fields = self.prepare(signer)?;
        let content = fields.subkey_binding_content(signer.public(), subkey);
        fields.sign(signer, &content)
    }

    /// Signs the binding between the signer's key and `userid`.
    pub fn sign_userid_binding(self, signer: &mut dyn Signer,
                               userid: &UserIDBody)
        -> Result<Signature4>
    {
        let fields = self.prepare(signer)?;
        let content = fields.userid_binding_content(signer.public(), userid);
        fields.sign(signer, &content)
    }

    /// Signs the binding between the signer's key and `ua`.
    pub fn sign_user_attribute_binding(self, signer: &mut dyn Signer,
                                       ua: &UserAttributeBody)
        -> Result<Signature4>
    {
        let fields = self.prepare(signer)?;
        let content =
            fields.user_attribute_binding_content(signer.public(), ua);
        fields.sign(signer, &content)
    }

    /// Fills in the fields that depend on the signer.
    ///
    /// Adds a creation time if none is set, and the issuer subpackets
    /// unless they are already present.
    fn prepare(mut self, signer: &dyn Signer) -> Result<Signature4> {
        let key = signer.public();
        self.pk_algo = key.pk_algo();

        if self.hashed_area.lookup(SubpacketTag::SignatureCreationTime)
            .is_none()
        {
            self = self.set_signature_creation_time(
                Timestamp::now()?)?;
        }
        if self.hashed_area.lookup(SubpacketTag::IssuerFingerprint).is_none()
            && self.unhashed_area.lookup(SubpacketTag::IssuerFingerprint)
            .is_none()
        {
            self = self.set_issuer_fingerprint(key.fingerprint())?;
        }
        if self.hashed_area.lookup(SubpacketTag::Issuer).is_none()
            && self.unhashed_area.lookup(SubpacketTag::Issuer).is_none()
        {
            self = self.set_issuer(key.keyid())?;
        }

        Ok(Signature4 {
            typ: self.typ,
            pk_algo: self.pk_algo,
            hash_algo: self.hash_algo,
            hashed_area: self.hashed_area,
            unhashed_area: self.unhashed_area,
            digest_prefix: [0, 0],
            mpis: Vec::new(),
        })
    }
}

impl From<Signature4> for SignatureBuilder {
    fn from(sig: Signature4) -> Self {
        SignatureBuilder {
            typ: sig.typ,
            pk_algo: sig.pk_algo,
            hash_algo: sig.hash_algo,
            hashed_area: sig.hashed_area,
            unhashed_area: sig.unhashed_area,
        }
    }
}

/// Holds a version 4 signature packet.
///
/// The lookup functions follow OpenPGP's trust rules for subpacket
/// areas: attributes such as the creation time or the primary flag
/// are only taken from the hashed area, which the signature protects.
/// The issuer is self-authenticating, so it is also looked up in the
/// unhashed area, preferring the hashed one.
///
/// See [Section 5.2 of RFC 4880] for details.
///
///   [Section 5.2 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.2
#[derive(Clone, Hash, PartialEq, Eq)]
pub struct Signature4 {
    typ: SignatureType,
    pk_algo: PublicKeyAlgorithm,
    hash_algo: HashAlgorithm,
    hashed_area: SubpacketArea,
    unhashed_area: SubpacketArea,
    /// Lower 16 bits of the signed hash value.
    digest_prefix: [u8; 2],
    /// Signature MPIs, undecoded.
    mpis: Vec<u8>,
}

impl fmt::Debug for Signature4 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Signature4")
            .field("typ", &self.typ)
            .field("pk_algo", &self.pk_algo)
            .field("hash_algo", &self.hash_algo)
            .field("creation_time", &self.signature_creation_time())
            .field("issuer", &self.issuer())
            .field("hashed_area", &self.hashed_area)
            .field("unhashed_area", &self.unhashed_area)
            .field("digest_prefix",
                   &crate::fmt::hex::encode(&self.digest_prefix))
            .field("mpis", &format!("{} bytes", self.mpis.len()))
            .finish()
    }
}

impl Signature4 {
    /// Gets the signature type.
    pub fn typ(&self) -> SignatureType {
        self.typ
    }

    /// Gets the public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Gets the hash algorithm.
    pub fn hash_algo(&self) -> HashAlgorithm {
        self.hash_algo
    }

    /// Gets a reference to the hashed area.
    pub fn hashed_area(&self) -> &SubpacketArea {
        &self.hashed_area
    }

    /// Gets a reference to the unhashed area.
    pub fn unhashed_area(&self) -> &SubpacketArea {
        &self.unhashed_area
    }

    /// Gets the digest prefix.
    pub fn digest_prefix(&self) -> &[u8; 2] {
        &self.digest_prefix
    }

    /// Gets the raw signature MPIs.
    pub fn mpis(&self) -> &[u8] {
        &self.mpis
    }

    fn hashed(&self, tag: SubpacketTag) -> Option<&SubpacketValue> {
        self.hashed_area.lookup(tag).map(|sp| sp.value())
    }

    fn self_authenticating(&self, tag: SubpacketTag)
                           -> Option<&SubpacketValue> {
        self.hashed_area.lookup(tag)
            .or_else(|| self.unhashed_area.lookup(tag))
            .map(|sp| sp.value())
    }

    /// Returns the value of the Signature Creation Time subpacket.
    pub fn signature_creation_time(&self) -> Option<Timestamp> {
        match self.hashed(SubpacketTag::SignatureCreationTime) {
            Some(SubpacketValue::SignatureCreationTime(t)) => Some(*t),
            _ => None,
        }
    }

    /// Returns the value of the Signature Expiration Time subpacket.
    ///
    /// A value of zero means the signature does not expire and is
    /// returned as `None`.
    pub fn signature_validity_period(&self) -> Option<u32> {
        match self.hashed(SubpacketTag::SignatureExpirationTime) {
            Some(SubpacketValue::SignatureExpirationTime(d)) if *d > 0 =>
                Some(*d),
            _ => None,
        }
    }

    /// Returns the time at which the signature expires.
    pub fn signature_expiration_time(&self) -> Option<Timestamp> {
        let validity = self.signature_validity_period()?;
        self.signature_creation_time()?.checked_add(validity)
    }

    /// Returns the value of the Key Expiration Time subpacket.
    ///
    /// A value of zero means the key does not expire and is returned
    /// as `None`.
    pub fn key_validity_period(&self) -> Option<u32> {
        match self.hashed(SubpacketTag::KeyExpirationTime) {
            Some(SubpacketValue::KeyExpirationTime(d)) if *d > 0 => Some(*d),
            _ => None,
        }
    }

    /// Returns the time at which the key expires given its creation
    /// time.
    pub fn key_expiration_time(&self, key: &Key4) -> Option<Timestamp> {
        key.creation_time().checked_add(self.key_validity_period()?)
    }

    /// Returns whether the Primary User ID flag is set.
    pub fn primary_userid(&self) -> bool {
        matches!(self.hashed(SubpacketTag::PrimaryUserID),
                 Some(SubpacketValue::PrimaryUserID(true)))
    }

    /// Returns the value of the Reason for Revocation subpacket.
    pub fn reason_for_revocation(&self)
                                 -> Option<(ReasonForRevocation, &[u8])> {
        match self.hashed(SubpacketTag::ReasonForRevocation) {
            Some(SubpacketValue::ReasonForRevocation { code, reason }) =>
                Some((*code, &reason[..])),
            _ => None,
        }
    }

    /// Returns whether this revocation is hard.
    ///
    /// A revocation without a reason is hard.
    pub fn revocation_type(&self) -> RevocationType {
        self.reason_for_revocation()
            .map(|(code, _)| code.revocation_type())
            .unwrap_or(RevocationType::Hard)
    }

    /// Returns the issuer's fingerprint, if present.
    pub fn issuer_fingerprint(&self) -> Option<&Fingerprint> {
        match self.self_authenticating(SubpacketTag::IssuerFingerprint) {
            Some(SubpacketValue::IssuerFingerprint(fp)) => Some(fp),
            _ => None,
        }
    }

    /// Returns the issuer's Key ID.
    ///
    /// Falls back to the Key ID derived from the Issuer Fingerprint
    /// subpacket.
    pub fn issuer(&self) -> Option<KeyID> {
        match self.self_authenticating(SubpacketTag::Issuer) {
            Some(SubpacketValue::Issuer(id)) => Some(id.clone()),
            _ => self.issuer_fingerprint().map(|fp| fp.to_keyid()),
        }
    }

    /// Returns the issuer's Key ID as reversed lowercase hex digits.
    ///
    /// This is a prefix of the issuing certificate's identity (see
    /// [`Fingerprint::to_reversed_hex`]).  A signature without issuer
    /// information yields the empty string.
    pub fn r_issuer_key_id(&self) -> String {
        self.issuer().map(|id| id.to_reversed_hex()).unwrap_or_default()
    }

    /// Signs the given content, turning the template into a signature.
    fn sign(mut self, signer: &mut dyn Signer, content: &[u8])
            -> Result<Signature4>
    {
        tracer!(TRACE, "Signature4::sign");

        let digest = hash::digest(self.hash_algo, content)?;
        self.digest_prefix = [digest[0], digest[1]];
        self.mpis = signer.sign(self.hash_algo, &digest)?;
        t!("{} over {} bytes, prefix {:?}",
           self.typ, content.len(), self.digest_prefix);
        Ok(self)
    }
}

impl ParsedPacket for Signature4 {
    const TAG: Tag = Tag::Signature;

    fn parse_body(body: &[u8]) -> Result<Self> {
        fn malformed(msg: &str) -> anyhow::Error {
            Error::MalformedPacket(format!("Signature: {}", msg)).into()
        }

        fn area(body: &[u8], offset: usize) -> Result<(SubpacketArea, usize)> {
            if body.len() < offset + 2 {
                return Err(malformed("truncated subpacket area"));
            }
            let len = u16::from_be_bytes([body[offset], body[offset + 1]])
                as usize;
            let start = offset + 2;
            if body.len() < start + len {
                return Err(malformed("subpacket area exceeds packet"));
            }
            Ok((SubpacketArea::parse(&body[start..start + len])?, start + len))
        }

        match body.get(0) {
            Some(4) => (),
            Some(v) => return Err(Error::MalformedPacket(
                format!("Unsupported signature version {}", v)).into()),
            None => return Err(malformed("empty body")),
        }
        if body.len() < 4 {
            return Err(malformed("truncated header"));
        }

        let typ = body[1].into();
        let pk_algo = body[2].into();
        let hash_algo = body[3].into();
        let (hashed_area, offset) = area(body, 4)?;
        let (unhashed_area, offset) = area(body, offset)?;
        if body.len() < offset + 2 {
            return Err(malformed("missing digest prefix"));
        }
        let digest_prefix = [body[offset], body[offset + 1]];
        let mpis = body[offset + 2..].to_vec();

        Ok(Signature4 {
            typ,
            pk_algo,
            hash_algo,
            hashed_area,
            unhashed_area,
            digest_prefix,
            mpis,
        })
    }
}

impl SerializeBody for Signature4 {
    fn serialize_body(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(&[4, u8::from(self.typ), u8::from(self.pk_algo),
                      u8::from(self.hash_algo)])?;

        let hashed = self.hashed_area.data();
        o.write_all(&(hashed.len() as u16).to_be_bytes())?;
        o.write_all(hashed)?;

        let unhashed = self.unhashed_area.data();
        o.write_all(&(unhashed.len() as u16).to_be_bytes())?;
        self.unhashed_area.serialize(o)?;

        o.write_all(&self.digest_prefix)?;
        o.write_all(&self.mpis)?;
        Ok(())
    }
}

assert_send_and_sync!(Signature4);
assert_send_and_sync!(SignatureBuilder);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::NullSigner;
    use crate::packet::OpaquePacket;

    fn key() -> Key4 {
        Key4::new(Timestamp::from(1_400_000_000),
                  PublicKeyAlgorithm::EdDSA, vec![0, 8, 0x2a])
    }

    #[test]
    fn sign_and_parse() {
        let mut signer = NullSigner::new(key());
        let uid = UserIDBody::from("Alice <alice@example.org>");
        let sig = SignatureBuilder::new(SignatureType::PositiveCertification)
            .set_signature_creation_time(Timestamp::from(1_500_000_000))
            .unwrap()
            .set_primary_userid(true).unwrap()
            .set_key_validity_period(Some(3600)).unwrap()
            .sign_userid_binding(&mut signer, &uid)
            .unwrap();

        assert_eq!(sig.pk_algo(), PublicKeyAlgorithm::EdDSA);
        assert_eq!(sig.issuer(), Some(key().keyid()));
        assert_eq!(sig.issuer_fingerprint(), Some(&key().fingerprint()));
        assert!(sig.primary_userid());
        assert_eq!(sig.key_validity_period(), Some(3600));
        assert_eq!(sig.key_expiration_time(&key()),
                   Some(Timestamp::from(1_400_003_600)));
        assert_eq!(sig.signature_expiration_time(), None);

        let body = sig.body_to_vec().unwrap();
        let parsed = Signature4::from_opaque(
            &OpaquePacket::new(Tag::Signature, body)).unwrap();
        assert_eq!(parsed, sig);
        assert!(key().fingerprint().to_reversed_hex()
                .starts_with(&parsed.r_issuer_key_id()));
    }

    #[test]
    fn unhashed_attributes_are_ignored() {
        let mut signer = NullSigner::new(key());
        let mut builder =
            SignatureBuilder::new(SignatureType::PositiveCertification)
            .set_signature_creation_time(Timestamp::from(1_500_000_000))
            .unwrap();
        builder.unhashed_area_mut().add(Subpacket::new(
            SubpacketValue::PrimaryUserID(true), false)).unwrap();
        builder.unhashed_area_mut().add(Subpacket::new(
            SubpacketValue::SignatureCreationTime(
                Timestamp::from(1_600_000_000)), false)).unwrap();
        let sig = builder.sign_direct_key(&mut signer).unwrap();
        assert!(! sig.primary_userid());
        assert_eq!(sig.signature_creation_time(),
                   Some(Timestamp::from(1_500_000_000)));
    }

    #[test]
    fn revocation_reason() {
        let mut signer = NullSigner::new(key());
        let sig = SignatureBuilder::new(SignatureType::CertificationRevocation)
            .sign_direct_key(&mut signer).unwrap();
        assert_eq!(sig.revocation_type(), RevocationType::Hard);
        assert!(sig.signature_creation_time().is_some());

        let sig = SignatureBuilder::new(SignatureType::CertificationRevocation)
            .set_reason_for_revocation(ReasonForRevocation::UIDRetired,
                                       b"left").unwrap()
            .sign_direct_key(&mut signer).unwrap();
        assert_eq!(sig.revocation_type(), RevocationType::Soft);
        assert_eq!(sig.reason_for_revocation(),
                   Some((ReasonForRevocation::UIDRetired, &b"left"[..])));
    }

    #[test]
    fn malformed() {
        // Version 3 signatures are not decoded.
        assert!(Signature4::parse_body(&[3, 5, 0x10]).is_err());
        assert!(Signature4::parse_body(&[]).is_err());
        // Hashed area length exceeds the packet.
        assert!(Signature4::parse_body(&[4, 0x10, 1, 8, 0, 9, 0]).is_err());
        // Wrong tag.
        let err = Signature4::from_opaque(
            &OpaquePacket::new(Tag::UserID, vec![4])).unwrap_err();
        assert_eq!(err.downcast_ref::<Error>(),
                   Some(&Error::InvalidPacketType {
                       expected: Tag::Signature,
                       actual: Tag::UserID,
                   }));
    }
}
