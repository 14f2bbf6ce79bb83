//! Code tables and other primitive types.
//!
//! Certificates are stored as received, so every table maps each
//! octet to a value: codes without a name survive as `Unknown`, and
//! the private ranges as `Private`.  Converting back to `u8` returns
//! the original code.

use std::fmt;

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

mod timestamp;
pub use timestamp::Timestamp;

code_table! {
    /// Public key algorithms ([RFC 4880, section 9.1], [RFC 6637]).
    ///
    /// [RFC 4880, section 9.1]: https://tools.ietf.org/html/rfc4880#section-9.1
    /// [RFC 6637]: https://tools.ietf.org/html/rfc6637
    pub enum PublicKeyAlgorithm ("public key algorithm", private 100..=110) {
        /// RSA, for encryption and signing.
        RSAEncryptSign = 1 => "RSA",
        /// RSA, encryption only.
        RSAEncrypt = 2 => "RSA (encrypt only)",
        /// RSA, signing only.
        RSASign = 3 => "RSA (sign only)",
        /// ElGamal, encryption only.
        ElGamalEncrypt = 16 => "ElGamal (encrypt only)",
        /// DSA.
        DSA = 17 => "DSA",
        /// Elliptic curve Diffie-Hellman.
        ECDH = 18 => "ECDH",
        /// Elliptic curve DSA.
        ECDSA = 19 => "ECDSA",
        /// ElGamal, for encryption and signing.
        ElGamalEncryptSign = 20 => "ElGamal",
        /// Edwards curve DSA.
        EdDSA = 22 => "EdDSA",
    }
}

impl PublicKeyAlgorithm {
    /// Returns whether keys of this algorithm can make signatures.
    pub fn for_signing(&self) -> bool {
        use self::PublicKeyAlgorithm::*;
        matches!(self,
                 RSAEncryptSign | RSASign | DSA | ECDSA | ElGamalEncryptSign
                 | EdDSA)
    }
}

code_table! {
    /// Hash algorithms ([RFC 4880, section 9.4]).
    ///
    /// Serialized as the numeric code, so policies can be stored as
    /// plain data.
    ///
    /// [RFC 4880, section 9.4]: https://tools.ietf.org/html/rfc4880#section-9.4
    #[derive(serde::Serialize, serde::Deserialize)]
    #[serde(from = "u8", into = "u8")]
    pub enum HashAlgorithm ("hash algorithm", private 100..=110) {
        /// MD5.
        MD5 = 1 => "MD5",
        /// SHA-1.
        SHA1 = 2 => "SHA1",
        /// RIPEMD-160.
        RipeMD = 3 => "RipeMD160",
        /// SHA2-256.
        SHA256 = 8 => "SHA256",
        /// SHA2-384.
        SHA384 = 9 => "SHA384",
        /// SHA2-512.
        SHA512 = 10 => "SHA512",
        /// SHA2-224.
        SHA224 = 11 => "SHA224",
    }
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::SHA512
    }
}

code_table! {
    /// Revocation reason codes ([RFC 4880, section 5.2.3.23]).
    ///
    /// [RFC 4880, section 5.2.3.23]: https://tools.ietf.org/html/rfc4880#section-5.2.3.23
    pub enum ReasonForRevocation ("revocation reason", private 100..=110) {
        /// No reason given.
        Unspecified = 0 => "no reason specified",
        /// The key has been replaced by a new one.
        KeySuperseded = 1 => "key superseded",
        /// The secret key material leaked.
        KeyCompromised = 2 => "key compromised",
        /// The key is no longer used.
        KeyRetired = 3 => "key retired",
        /// The user ID or user attribute is no longer valid.
        UIDRetired = 32 => "user ID retired",
    }
}

impl ReasonForRevocation {
    /// Returns whether this reason revokes softly or hard.
    ///
    /// Only retirement and supersession are soft.  Everything else,
    /// including reasons this crate does not know, is hard.
    pub fn revocation_type(&self) -> RevocationType {
        use self::ReasonForRevocation::*;
        match self {
            KeySuperseded | KeyRetired | UIDRetired => RevocationType::Soft,
            _ => RevocationType::Hard,
        }
    }
}

/// How far back a revocation reaches.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RevocationType {
    /// Nothing signed by the revoked object can be trusted, whenever
    /// it was made.
    Hard,
    /// The revoked object is invalid from the revocation's creation
    /// time on.
    Soft,
}

/// Signature types ([RFC 4880, section 5.2.1]).
///
/// There is no private range; unassigned codes map to `Unknown`.
///
/// [RFC 4880, section 5.2.1]: https://tools.ietf.org/html/rfc4880#section-5.2.1
#[non_exhaustive]
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug)]
pub enum SignatureType {
    /// Over a binary document.
    Binary,
    /// Over a canonical text document.
    Text,
    /// Over its own subpackets only.
    Standalone,
    /// Certification of a user ID or user attribute, no claim made.
    GenericCertification,
    /// Certification of a user ID or user attribute, not checked.
    PersonaCertification,
    /// Certification of a user ID or user attribute, casually checked.
    CasualCertification,
    /// Certification of a user ID or user attribute, carefully checked.
    PositiveCertification,
    /// Binds a subkey to its primary key.
    SubkeyBinding,
    /// Back signature of a signing subkey over its primary key.
    PrimaryKeyBinding,
    /// Over the primary key itself.
    DirectKey,
    /// Revokes the primary key.
    KeyRevocation,
    /// Revokes a subkey binding.
    SubkeyRevocation,
    /// Revokes a certification.
    CertificationRevocation,
    /// Over a signature's creation time.
    Timestamp,
    /// Third-party confirmation of another signature.
    Confirmation,
    /// An unassigned code.
    Unknown(u8),
}

const SIGNATURE_TYPES: &[(u8, SignatureType)] = &[
    (0x00, SignatureType::Binary),
    (0x01, SignatureType::Text),
    (0x02, SignatureType::Standalone),
    (0x10, SignatureType::GenericCertification),
    (0x11, SignatureType::PersonaCertification),
    (0x12, SignatureType::CasualCertification),
    (0x13, SignatureType::PositiveCertification),
    (0x18, SignatureType::SubkeyBinding),
    (0x19, SignatureType::PrimaryKeyBinding),
    (0x1f, SignatureType::DirectKey),
    (0x20, SignatureType::KeyRevocation),
    (0x28, SignatureType::SubkeyRevocation),
    (0x30, SignatureType::CertificationRevocation),
    (0x40, SignatureType::Timestamp),
    (0x50, SignatureType::Confirmation),
];

impl SignatureType {
    /// Returns whether this is one of the four certification levels
    /// (0x10 to 0x13).
    pub fn is_certification(&self) -> bool {
        (0x10..=0x13).contains(&u8::from(*self))
    }
}

impl From<u8> for SignatureType {
    fn from(u: u8) -> Self {
        SIGNATURE_TYPES.iter()
            .find(|(code, _)| *code == u)
            .map(|(_, t)| *t)
            .unwrap_or(SignatureType::Unknown(u))
    }
}

impl From<SignatureType> for u8 {
    fn from(t: SignatureType) -> Self {
        if let SignatureType::Unknown(u) = t {
            return u;
        }
        SIGNATURE_TYPES.iter()
            .find(|(_, known)| *known == t)
            .map(|(code, _)| *code)
            .unwrap_or_default()
    }
}

impl fmt::Display for SignatureType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SignatureType::Unknown(u) =>
                write!(f, "unknown signature type {:#04x}", u),
            t => fmt::Debug::fmt(t, f),
        }
    }
}

#[cfg(test)]
impl Arbitrary for SignatureType {
    fn arbitrary(g: &mut Gen) -> Self {
        u8::arbitrary(g).into()
    }
}

/// Implemented by types that are `Send`, see `assert_send_and_sync!`.
pub(crate) trait Sendable : Send {}

/// Implemented by types that are `Sync`, see `assert_send_and_sync!`.
pub(crate) trait Syncable : Sync {}
