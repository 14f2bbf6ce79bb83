//! OpenPGP certificate object model for key servers.
//!
//! A key server receives the same certificate many times, from many
//! sources, each copy carrying an overlapping but rarely identical
//! set of signatures.  OpenPGP certificates are append-only: a
//! revocation that was accepted once must never disappear because a
//! peer later submitted a stale copy.  This crate provides the pieces
//! needed to uphold that:
//!
//!   - A [`packet`] layer that wraps every OpenPGP packet with a
//!     content-derived identity, its UUID, scoped by the chain of
//!     ancestor identities.
//!
//!   - A [`cert`] tree ([`PrimaryKey`] and its user IDs, user
//!     attributes, subkeys and signatures) assembled from a raw
//!     packet stream by the [`cert::parser`].
//!
//!   - A merge engine ([`cert::merge`]) that folds subtrees with equal
//!     identity into one another without ever dropping a signature.
//!
//!   - A self-signature classifier and resolver ([`cert::SelfSigs`])
//!     that decides whether a component is currently valid, revoked,
//!     or merely unverified, and whether it is the primary one.
//!
//! The cryptographic verification of a signature is delegated to a
//! [`crypto::SignatureVerifier`].  This crate computes exactly which
//! octets a self signature covers; the verifier performs the
//! public-key operation.
//!
//! Non-goals: the reconciliation protocol spoken between key servers,
//! trust models such as the web of trust, and multi-precision
//! arithmetic.
//!
//! [`PrimaryKey`]: cert::PrimaryKey

#![warn(missing_docs)]

#[macro_use]
mod macros;

pub mod armor;
pub mod cert;
pub mod crypto;
pub mod fmt;
pub mod packet;
pub mod parse;
pub mod policy;
pub mod serialize;
pub mod types;

mod fingerprint;
pub use fingerprint::Fingerprint;
mod keyid;
pub use keyid::KeyID;

use crate::cert::NodeKind;
use crate::packet::Tag;
use crate::types::HashAlgorithm;

/// Crate result specialization.
pub type Result<T> = ::std::result::Result<T, anyhow::Error>;

/// Errors used in this crate.
///
/// Note: This enum cannot be exhaustively matched to allow future
/// extensions.
#[non_exhaustive]
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A malformed packet.
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    /// A packet was handed to a constructor for a different packet
    /// type.
    #[error("Invalid packet type: expected {expected}, got {actual}")]
    InvalidPacketType {
        /// The tag the constructor accepts.
        expected: Tag,
        /// The tag of the offending packet.
        actual: Tag,
    },

    /// Malformed certificate.
    #[error("Malformed certificate: {0}")]
    MalformedCert(String),

    /// Malformed ASCII armor.
    #[error("Malformed armor: {0}")]
    MalformedArmor(String),

    /// A tree operation was invoked with a parent of the wrong kind.
    #[error("Invalid parent: expected {expected}, got {actual}")]
    InvalidParent {
        /// The kind of node the operation requires.
        expected: NodeKind,
        /// The kind of node that was passed.
        actual: NodeKind,
    },

    /// A tree operation was invoked with a duplicate of the wrong
    /// kind.
    #[error("Invalid duplicate: expected {expected}, got {actual}")]
    InvalidDuplicate {
        /// The kind of node the operation requires.
        expected: NodeKind,
        /// The kind of node that was passed.
        actual: NodeKind,
    },

    /// Two nodes that were supposed to be duplicates have different
    /// content identities.
    #[error("Identity mismatch: {0} != {1}")]
    IdentityMismatch(String, String),

    /// Unsupported hash algorithm identifier.
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedHashAlgorithm(HashAlgorithm),

    /// The policy rejected the object.
    #[error("Not secure: {0}")]
    PolicyViolation(String),

    /// Index out of range.
    #[error("Index out of range")]
    IndexOutOfRange,
}

assert_send_and_sync!(Error);
