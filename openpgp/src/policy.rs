//! A mechanism to specify policy.
//!
//! Deciding whether a self signature counts is not purely a matter of
//! cryptography.  Some algorithms are considered broken (e.g., MD5),
//! and a key server may want to ignore signatures relying on them
//! even though they verify.  Likewise, whether a hard revocation can
//! ever be superseded by a later certification is a question of
//! policy, not of the wire format.
//!
//! Rather than hard code these decisions, the classifier consults a
//! [`Policy`].  The [`StandardPolicy`] is configurable through
//! `serde`, so that the key server can load it from its own
//! configuration file:
//!
//! ```rust
//! # fn main() -> keyserver_openpgp::Result<()> {
//! use keyserver_openpgp::policy::StandardPolicy;
//!
//! let p: StandardPolicy =
//!     serde_json::from_str(r#"{ "rejected_hash_algorithms": [1, 2] }"#)?;
//! assert!(p.hard_revocations_are_final);
//! assert_eq!(p.rejected_hash_algorithms.len(), 2);
//! # Ok(()) }
//! ```
//!
//! When implementing the `Policy` trait, it is *essential* that the
//! functions are [pure].  That is, if the same `Policy` is used
//! to determine whether a given `Signature` is valid, it must always
//! return the same value.
//!
//! [pure]: https://en.wikipedia.org/wiki/Pure_function
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    packet::Signature4,
    Result,
    types::HashAlgorithm,
};

/// A policy for self-signature classification.
pub trait Policy : fmt::Debug {
    /// Returns an error if the signature violates the policy.
    ///
    /// This function performs the last check before a self signature
    /// is classified.  It is called after the signature has been
    /// verified, and a rejected signature is recorded as an error.
    ///
    /// Note: Whereas it is generally better to reject suspicious
    /// signatures, one should be more liberal when considering
    /// revocations: if you reject a revocation certificate, it may
    /// inadvertently make something else valid!
    fn signature(&self, _sig: &Signature4) -> Result<()> {
        Ok(())
    }

    /// Returns whether a hard revocation can never be superseded.
    ///
    /// A revocation without a reason, or one stating that the key was
    /// compromised, is hard.  If this returns `true`, such a
    /// revocation revokes the component regardless of any later
    /// certification.
    fn hard_revocations_are_final(&self) -> bool {
        true
    }
}

/// The standard policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandardPolicy {
    /// Whether hard revocations are final.
    ///
    /// See [`Policy::hard_revocations_are_final`].
    pub hard_revocations_are_final: bool,

    /// Hash algorithms whose signatures are ignored.
    ///
    /// Serialized as the algorithms' numeric identifiers.
    pub rejected_hash_algorithms: Vec<HashAlgorithm>,
}

impl Default for StandardPolicy {
    fn default() -> Self {
        Self {
            hard_revocations_are_final: true,
            rejected_hash_algorithms: vec![HashAlgorithm::MD5],
        }
    }
}

impl StandardPolicy {
    /// Instantiates a new `StandardPolicy` with the default parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects signatures made with `algo`.
    pub fn reject_hash_algorithm(&mut self, algo: HashAlgorithm) {
        if ! self.rejected_hash_algorithms.contains(&algo) {
            self.rejected_hash_algorithms.push(algo);
        }
    }
}

impl Policy for StandardPolicy {
    fn signature(&self, sig: &Signature4) -> Result<()> {
        if self.rejected_hash_algorithms.contains(&sig.hash_algo()) {
            return Err(Error::PolicyViolation(
                format!("{} is not accepted", sig.hash_algo())).into());
        }
        Ok(())
    }

    fn hard_revocations_are_final(&self) -> bool {
        self.hard_revocations_are_final
    }
}

/// A policy that accepts everything and lets later certifications
/// supersede any revocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullPolicy;

impl NullPolicy {
    /// Instantiates a new `NullPolicy`.
    pub const fn new() -> Self {
        NullPolicy
    }
}

impl Policy for NullPolicy {
    fn hard_revocations_are_final(&self) -> bool {
        false
    }
}
