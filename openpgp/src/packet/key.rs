//! Public key and public subkey packets.
//!
//! Only version 4 keys are decoded.  The algorithm-specific public
//! key material is kept as raw MPI bytes: this crate identifies keys
//! and computes what their signatures cover, it does not do public
//! key arithmetic.
//!
//! See [Section 5.5 of RFC 4880] for details.
//!
//!   [Section 5.5 of RFC 4880]: https://tools.ietf.org/html/rfc4880#section-5.5

use std::fmt;
use std::io;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

use crate::{
    Error,
    Fingerprint,
    KeyID,
    Result,
};
use crate::crypto::hash::{Context, Hash};
use crate::packet::Tag;
use crate::parse::ParsedPacket;
use crate::serialize::SerializeBody;
use crate::types::{
    PublicKeyAlgorithm,
    Timestamp,
};

/// Holds a version 4 public key.
///
/// The same body is used for primary keys and subkeys; the packet tag
/// makes the difference.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key4 {
    creation_time: Timestamp,
    pk_algo: PublicKeyAlgorithm,
    /// Public key MPIs, undecoded.
    mpis: Vec<u8>,
}

impl fmt::Debug for Key4 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Key4")
            .field("fingerprint", &self.fingerprint())
            .field("creation_time", &self.creation_time)
            .field("pk_algo", &self.pk_algo)
            .field("mpis", &format!("{} bytes", self.mpis.len()))
            .finish()
    }
}

impl Key4 {
    /// Creates a new key.
    pub fn new(creation_time: Timestamp, pk_algo: PublicKeyAlgorithm,
               mpis: Vec<u8>) -> Self {
        Key4 { creation_time, pk_algo, mpis }
    }

    /// Gets the key packet's creation time field.
    pub fn creation_time(&self) -> Timestamp {
        self.creation_time
    }

    /// Gets the public key algorithm.
    pub fn pk_algo(&self) -> PublicKeyAlgorithm {
        self.pk_algo
    }

    /// Gets the key packet's raw MPIs.
    pub fn mpis(&self) -> &[u8] {
        &self.mpis
    }

    /// Computes and returns the key's fingerprint as per Section 12.2
    /// of RFC 4880.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut h = Context::sha1();
        self.hash(&mut h);

        let mut digest = [0u8; 20];
        // A detected collision still yields the hardened digest.
        let _ = h.digest(&mut digest);
        Fingerprint::from_bytes(&digest[..])
    }

    /// Computes and returns the key's key ID as per Section 12.2 of
    /// RFC 4880.
    pub fn keyid(&self) -> KeyID {
        self.fingerprint().to_keyid()
    }
}

impl ParsedPacket for Key4 {
    const TAG: Tag = Tag::PublicKey;

    fn parse_body(body: &[u8]) -> Result<Self> {
        match body.get(0) {
            Some(4) => (),
            Some(v) => return Err(Error::MalformedPacket(
                format!("Unsupported key version {}", v)).into()),
            None => return Err(Error::MalformedPacket(
                "Empty key packet".into()).into()),
        }
        if body.len() < 6 {
            return Err(Error::MalformedPacket(
                "Truncated key packet".into()).into());
        }
        // The key hash covers the body with a two-octet length.
        if body.len() > std::u16::MAX as usize {
            return Err(Error::MalformedPacket(
                "Key packet too large".into()).into());
        }

        let creation_time =
            u32::from_be_bytes([body[1], body[2], body[3], body[4]]);
        Ok(Key4 {
            creation_time: creation_time.into(),
            pk_algo: body[5].into(),
            mpis: body[6..].to_vec(),
        })
    }
}

impl SerializeBody for Key4 {
    fn serialize_body(&self, o: &mut dyn io::Write) -> Result<()> {
        o.write_all(&[4])?;
        o.write_all(&u32::from(self.creation_time).to_be_bytes())?;
        o.write_all(&[u8::from(self.pk_algo)])?;
        o.write_all(&self.mpis)?;
        Ok(())
    }
}

assert_send_and_sync!(Key4);

#[cfg(test)]
impl Arbitrary for Key4 {
    fn arbitrary(g: &mut Gen) -> Self {
        let mut mpis = Vec::<u8>::arbitrary(g);
        mpis.truncate(512);
        Key4::new(Timestamp::arbitrary(g), PublicKeyAlgorithm::arbitrary(g),
                  mpis)
    }
}
