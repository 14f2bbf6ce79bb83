//! Cryptographic primitives.
//!
//! Public key operations are not implemented here.  Creating a
//! signature goes through a [`Signer`] and checking one through a
//! [`SignatureVerifier`]; this crate computes the content and digest
//! those operate on.

use crate::packet::{Key4, Signature4};
use crate::types::{HashAlgorithm, PublicKeyAlgorithm};
use crate::Result;

mod backend;
pub mod hash;

/// Creates a signature.
///
/// This is a low-level mechanism to produce an arbitrary OpenPGP
/// signature.  Using this trait allows all operations involving
/// signing to use a variety of secret key storage mechanisms
/// (e.g. smart cards or a hardware security module).
pub trait Signer {
    /// Returns a reference to the public key.
    fn public(&self) -> &Key4;

    /// Creates a signature over the `digest` produced by `hash_algo`.
    ///
    /// Returns the algorithm-specific signature MPIs, encoded as they
    /// appear in a signature packet.
    fn sign(&mut self, hash_algo: HashAlgorithm, digest: &[u8])
            -> Result<Vec<u8>>;
}

impl Signer for Box<dyn Signer> {
    fn public(&self) -> &Key4 {
        self.as_ref().public()
    }

    fn sign(&mut self, hash_algo: HashAlgorithm, digest: &[u8])
            -> Result<Vec<u8>> {
        self.as_mut().sign(hash_algo, digest)
    }
}

/// A signer without secret key material.
///
/// The resulting signatures carry a correct digest prefix and the
/// digest as their only MPI, which is enough for the
/// [`DigestPrefixVerifier`].  They are not verifiable OpenPGP
/// signatures.
///
/// Useful for building fixtures, and for re-creating the structure
/// of a certificate without access to its secrets.
#[derive(Clone, Debug)]
pub struct NullSigner {
    key: Key4,
}

impl NullSigner {
    /// Creates a signer for `key`.
    pub fn new(key: Key4) -> Self {
        NullSigner { key }
    }
}

impl Signer for NullSigner {
    fn public(&self) -> &Key4 {
        &self.key
    }

    fn sign(&mut self, _: HashAlgorithm, digest: &[u8]) -> Result<Vec<u8>> {
        // One MPI: bit length, then the value without leading zeros.
        let value = match digest.iter().position(|b| *b != 0) {
            Some(i) => &digest[i..],
            None => &[][..],
        };
        let bits = value.first()
            .map(|b| value.len() * 8 - b.leading_zeros() as usize)
            .unwrap_or(0);

        let mut mpis = Vec::with_capacity(2 + value.len());
        mpis.extend_from_slice(&(bits as u16).to_be_bytes());
        mpis.extend_from_slice(value);
        Ok(mpis)
    }
}

/// Why a signature failed to verify.
///
/// Verification errors are collected per signature, they never abort
/// the evaluation of a certificate.
#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The signature does not match the signed content.
    #[error("Bad signature: {0}")]
    BadSignature(String),

    /// The signature uses a hash algorithm that is not supported.
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(HashAlgorithm),

    /// The signing key uses a public key algorithm that cannot sign
    /// or is not supported.
    #[error("Unsupported public key algorithm: {0}")]
    UnsupportedPublicKeyAlgorithm(PublicKeyAlgorithm),

    /// The signature packet is structurally invalid.
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),

    /// The signature is valid, but rejected by the policy.
    #[error("Policy rejected signature: {0}")]
    Policy(String),
}

assert_send_and_sync!(VerificationError);

/// Verifies signatures.
///
/// This is the seam to the public key cryptography: given the
/// issuing key, the signature, and the octets the signature covers,
/// decide whether the signature is valid.  The signed content is the
/// input to the signature's hash function; see the `*_content`
/// methods of [`Signature4`].
///
/// Implementations must be pure: no I/O, and the same answer for the
/// same inputs.
pub trait SignatureVerifier {
    /// Verifies that `sig` is a signature by `key` over
    /// `signed_content`.
    fn verify(&self, key: &Key4, sig: &Signature4, signed_content: &[u8])
              -> std::result::Result<(), VerificationError>;
}

impl<V: SignatureVerifier + ?Sized> SignatureVerifier for &V {
    fn verify(&self, key: &Key4, sig: &Signature4, signed_content: &[u8])
              -> std::result::Result<(), VerificationError> {
        (**self).verify(key, sig, signed_content)
    }
}

impl<V: SignatureVerifier + ?Sized> SignatureVerifier for Box<V> {
    fn verify(&self, key: &Key4, sig: &Signature4, signed_content: &[u8])
              -> std::result::Result<(), VerificationError> {
        self.as_ref().verify(key, sig, signed_content)
    }
}

/// Checks a signature's digest prefix.
///
/// Every OpenPGP signature stores the first two octets of the digest
/// it signs.  Comparing them to the digest of the signed content
/// catches signatures that were attached to the wrong component, and
/// corrupted packets, without any public key operation.  It does not
/// prove authenticity: anyone can compute a matching prefix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DigestPrefixVerifier;

impl DigestPrefixVerifier {
    /// Returns a new verifier.
    pub fn new() -> Self {
        DigestPrefixVerifier
    }
}

impl SignatureVerifier for DigestPrefixVerifier {
    fn verify(&self, key: &Key4, sig: &Signature4, signed_content: &[u8])
              -> std::result::Result<(), VerificationError> {
        if ! key.pk_algo().for_signing() {
            return Err(VerificationError::UnsupportedPublicKeyAlgorithm(
                key.pk_algo()));
        }
        if sig.pk_algo() != key.pk_algo() {
            return Err(VerificationError::MalformedSignature(
                format!("made with {}, key is {}",
                        sig.pk_algo(), key.pk_algo())));
        }
        if sig.mpis().is_empty() {
            return Err(VerificationError::MalformedSignature(
                "no signature MPIs".into()));
        }
        if ! sig.hash_algo().is_supported() {
            return Err(VerificationError::UnsupportedHashAlgorithm(
                sig.hash_algo()));
        }

        let digest = hash::digest(sig.hash_algo(), signed_content)
            .map_err(|e| VerificationError::BadSignature(e.to_string()))?;
        if digest[..2] != sig.digest_prefix()[..] {
            return Err(VerificationError::BadSignature(
                format!("digest prefix mismatch: expected {}, got {}",
                        crate::fmt::hex::encode(&digest[..2]),
                        crate::fmt::hex::encode(sig.digest_prefix()))));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::UserIDBody;
    use crate::packet::signature::SignatureBuilder;
    use crate::parse::ParsedPacket;
    use crate::serialize::SerializeBody;
    use crate::types::{SignatureType, Timestamp};

    fn key() -> Key4 {
        Key4::new(Timestamp::from(1_400_000_000),
                  PublicKeyAlgorithm::EdDSA, vec![0, 8, 0x2a])
    }

    #[test]
    fn null_signer_mpi() {
        let mut signer = NullSigner::new(key());
        assert_eq!(signer.sign(HashAlgorithm::SHA256, &[0, 0x01, 0xff])
                   .unwrap(),
                   vec![0, 9, 0x01, 0xff]);
        assert_eq!(signer.sign(HashAlgorithm::SHA256, &[0, 0]).unwrap(),
                   vec![0, 0]);
    }

    #[test]
    fn digest_prefix() {
        let mut signer = NullSigner::new(key());
        let alice = UserIDBody::from("Alice");
        let mallory = UserIDBody::from("Mallory");
        let sig = SignatureBuilder::new(SignatureType::PositiveCertification)
            .sign_userid_binding(&mut signer, &alice).unwrap();

        let v = DigestPrefixVerifier::new();
        assert_eq!(v.verify(&key(), &sig,
                            &sig.userid_binding_content(&key(), &alice)),
                   Ok(()));

        // A corrupted digest prefix.
        let mut body = sig.body_to_vec().unwrap();
        let prefix = body.len() - sig.mpis().len() - 2;
        body[prefix] ^= 0xff;
        let corrupted = Signature4::parse_body(&body).unwrap();
        let r = v.verify(&key(), &corrupted,
                         &corrupted.userid_binding_content(&key(), &alice));
        assert!(matches!(r, Err(VerificationError::BadSignature(_))));

        // Verifying the same content twice gives the same answer.
        let content = sig.userid_binding_content(&key(), &mallory);
        assert_eq!(v.verify(&key(), &sig, &content),
                   v.verify(&key(), &sig, &content));
    }

    #[test]
    fn unsupported_algorithms() {
        let mut signer = NullSigner::new(key());
        let sig = SignatureBuilder::new(SignatureType::DirectKey)
            .set_hash_algo(HashAlgorithm::MD5)
            .sign_direct_key(&mut signer);
        // MD5 cannot even be computed to sign.
        assert!(sig.is_err());

        let elgamal = Key4::new(Timestamp::from(1_400_000_000),
                                PublicKeyAlgorithm::ElGamalEncrypt,
                                vec![0, 8, 0x2a]);
        let sig = SignatureBuilder::new(SignatureType::DirectKey)
            .sign_direct_key(&mut signer).unwrap();
        assert_eq!(DigestPrefixVerifier.verify(&elgamal, &sig, b""),
                   Err(VerificationError::UnsupportedPublicKeyAlgorithm(
                       PublicKeyAlgorithm::ElGamalEncrypt)));
    }
}
