//! Self-signature classification and resolution.
//!
//! A node of a certificate tree is only an asserted part of the
//! certificate if the certificate's own key says so.  [`SelfSigs`]
//! collects the self signatures of one node, verifies them, sorts
//! them into revocations and certifications, and resolves them into a
//! [`Verdict`]:
//!
//!   - The newest certification wins over older ones: it determines
//!     the expiration and whether the node is the primary one.
//!
//!   - A revocation wins over every certification that is not
//!     strictly newer.  A hard revocation is never superseded
//!     (unless the [`Policy`] says otherwise).  Key revocations are
//!     hard unless they state that the key was superseded or retired.
//!     User ID and user attribute revocations are only hard if they
//!     state that the key was compromised.
//!
//!   - Without any verified self signature the node is
//!     [`Verdict::Unverified`].
//!
//! The classification is a view: it borrows the node's signatures,
//! and is recomputed whenever the node may have changed.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::cert::{
    PacketNode,
    PrimaryKey,
    SigClass,
    Signable,
    Signature,
};
use crate::crypto::{SignatureVerifier, VerificationError};
use crate::policy::Policy;
use crate::types::Timestamp;

const TRACE : bool = false;

/// The verdict for one self signature.
#[derive(Clone, Debug)]
pub struct CheckSig<'a> {
    /// The signature.
    pub signature: &'a Signature,
    /// How the signature bears on the node.
    pub class: SigClass,
    /// Why the signature was rejected, if it was.
    pub error: Option<VerificationError>,
}

impl<'a> CheckSig<'a> {
    /// Returns whether this is a hard revocation.
    pub fn is_hard(&self) -> bool {
        matches!(self.class, SigClass::Revocation { hard: true })
    }

    /// Returns whether the signature was accepted.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the signature's creation time.
    pub fn creation_time(&self) -> Option<Timestamp> {
        self.signature.signature_creation_time()
    }
}

/// The resolved state of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// No self signature could be verified.
    ///
    /// The node must not be treated as part of the certificate.
    Unverified,

    /// The node is certified.
    Valid {
        /// Creation time of the newest certification.
        since: Option<Timestamp>,
        /// When the node expires, if ever.
        expires_at: Option<Timestamp>,
        /// Whether the newest certification flags the node as
        /// primary.
        primary: bool,
    },

    /// The node is revoked.
    Revoked {
        /// Creation time of the revocation.
        since: Option<Timestamp>,
        /// Whether the revocation is hard.
        hard: bool,
    },
}

impl Verdict {
    /// Returns whether the node is valid and not expired at `t`.
    pub fn is_alive_at(&self, t: Timestamp) -> bool {
        match self {
            Verdict::Valid { expires_at, .. } =>
                expires_at.map(|e| t < e).unwrap_or(true),
            _ => false,
        }
    }
}

/// The classified self signatures of a node.
///
/// A certification is in [`SelfSigs::certifications`]; if it carries
/// an expiration it is also in [`SelfSigs::expirations`], and if it
/// flags the node as primary it is also in [`SelfSigs::primaries`].
/// All lists are sorted newest first.  Signatures with equal
/// creation times keep their arrival order, and signatures without a
/// creation time come last.
///
/// # Examples
///
/// ```rust,no_run
/// # fn main() -> keyserver_openpgp::Result<()> {
/// use keyserver_openpgp::cert::Signable;
/// use keyserver_openpgp::cert::parser::read_keys;
/// use keyserver_openpgp::crypto::DigestPrefixVerifier;
/// use keyserver_openpgp::policy::StandardPolicy;
///
/// # let bytes = b"";
/// let p = &StandardPolicy::new();
/// for cert in read_keys(&bytes[..]) {
///     let cert = cert?;
///     for uid in cert.userids() {
///         let sigs = uid.self_sigs(&cert, &DigestPrefixVerifier, p);
///         println!("{}: {:?}, {} bad self signatures",
///                  String::from_utf8_lossy(uid.value()),
///                  sigs.verdict(), sigs.errors.len());
///     }
/// }
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct SelfSigs<'a> {
    /// Verified revocations.
    pub revocations: Vec<CheckSig<'a>>,
    /// Verified certifications.
    pub certifications: Vec<CheckSig<'a>>,
    /// Verified certifications carrying an expiration.
    pub expirations: Vec<CheckSig<'a>>,
    /// Verified certifications flagging the node as primary.
    pub primaries: Vec<CheckSig<'a>>,
    /// Self signatures that failed verification or were rejected by
    /// the policy.
    pub errors: Vec<CheckSig<'a>>,
    hard_revocations_are_final: bool,
    verdict: Verdict,
}

impl<'a> SelfSigs<'a> {
    /// Classifies the self signatures of `target`, a node of
    /// `primary`, and resolves them.
    ///
    /// A signature is a self signature if its issuer is a prefix of
    /// the certificate's identity.  Every self signature is checked
    /// with `verifier` and then with `policy`; failures end up in
    /// [`SelfSigs::errors`] and do not affect the verdict.
    pub fn new<S>(target: &'a S, primary: &PrimaryKey,
                  verifier: &dyn SignatureVerifier, policy: &dyn Policy)
                  -> Self
        where S: Signable
    {
        tracer!(TRACE, "SelfSigs::new");

        let mut result = SelfSigs {
            revocations: Vec::new(),
            certifications: Vec::new(),
            expirations: Vec::new(),
            primaries: Vec::new(),
            errors: Vec::new(),
            hard_revocations_are_final: policy.hard_revocations_are_final(),
            verdict: Verdict::Unverified,
        };

        let key = primary.key();
        for sig in target.signatures() {
            // Skip third-party signatures.
            if ! primary.uuid().starts_with(&sig.r_issuer_key_id()) {
                continue;
            }

            let content = target.signed_content(key, sig);
            let error = verifier.verify(key, sig, &content).err()
                .or_else(|| policy.signature(sig).err()
                         .map(|e| VerificationError::Policy(e.to_string())));
            let check = CheckSig {
                signature: sig,
                class: target.classify(key, sig),
                error,
            };
            if let Some(e) = check.error.as_ref() {
                t!("{}: rejected {}: {}", target.uuid(), sig.typ(), e);
                result.errors.push(check);
                continue;
            }

            match check.class {
                SigClass::Revocation { .. } =>
                    result.revocations.push(check),
                SigClass::Certification { expires_at, primary } => {
                    if expires_at.is_some() {
                        result.expirations.push(check.clone());
                    }
                    if primary {
                        result.primaries.push(check.clone());
                    }
                    result.certifications.push(check);
                },
                SigClass::Ignored =>
                    t!("{}: ignoring {}", target.uuid(), sig.typ()),
            }
        }

        result.resolve();
        t!("{}: {:?}", target.uuid(), result.verdict);
        result
    }

    /// Resolves the classified signatures into a verdict.
    ///
    /// This only depends on the sets, so resolving again yields the
    /// same verdict.  After editing the sets, call this to bring the
    /// verdict up to date.
    pub fn resolve(&mut self) {
        self.revocations.sort_by(newest_first);
        self.certifications.sort_by(newest_first);
        self.expirations.sort_by(newest_first);
        self.primaries.sort_by(newest_first);

        let newest_cert = self.certifications.first();
        let newest_rev = self.revocations.first();

        if self.hard_revocations_are_final {
            if let Some(hard) = self.revocations.iter().find(|c| c.is_hard()) {
                self.verdict = Verdict::Revoked {
                    since: hard.creation_time(),
                    hard: true,
                };
                return;
            }
        }

        if let Some(rev) = newest_rev {
            // A certification must be strictly newer to supersede a
            // revocation.  A missing creation time is older than any.
            let superseded = newest_cert
                .map(|c| c.creation_time() > rev.creation_time())
                .unwrap_or(false);
            if ! superseded {
                self.verdict = Verdict::Revoked {
                    since: rev.creation_time(),
                    hard: rev.is_hard(),
                };
                return;
            }
        }

        self.verdict = match newest_cert {
            Some(cert) => {
                let (expires_at, primary) = match cert.class {
                    SigClass::Certification { expires_at, primary } =>
                        (expires_at, primary),
                    _ => (None, false),
                };
                Verdict::Valid {
                    since: cert.creation_time(),
                    expires_at,
                    primary,
                }
            },
            None => Verdict::Unverified,
        };
    }

    /// Returns the verdict.
    pub fn verdict(&self) -> &Verdict {
        &self.verdict
    }

    /// Returns whether the node is certified and not revoked.
    ///
    /// This does not consider the expiration; see
    /// [`Verdict::is_alive_at`].
    pub fn is_valid(&self) -> bool {
        matches!(self.verdict, Verdict::Valid { .. })
    }

    /// Returns whether the node is revoked.
    pub fn is_revoked(&self) -> bool {
        matches!(self.verdict, Verdict::Revoked { .. })
    }

    /// Returns when the node was revoked, if it is.
    pub fn revoked_since(&self) -> Option<Timestamp> {
        match self.verdict {
            Verdict::Revoked { since, .. } => since,
            _ => None,
        }
    }

    /// Returns when the node expires, if it is valid and expires.
    pub fn expires_at(&self) -> Option<Timestamp> {
        match self.verdict {
            Verdict::Valid { expires_at, .. } => expires_at,
            _ => None,
        }
    }

    /// Returns since when the node is the primary one, if it is valid
    /// and flagged as primary.
    pub fn primary_since(&self) -> Option<Timestamp> {
        match self.verdict {
            Verdict::Valid { since, primary: true, .. } => since,
            _ => None,
        }
    }
}

assert_send_and_sync!(SelfSigs<'_>);

// Newest first.  Stable sorts keep arrival order for equal times, and
// `None` sorts after every time.
fn newest_first(a: &CheckSig, b: &CheckSig) -> Ordering {
    b.creation_time().cmp(&a.creation_time())
}

/// What [`PrimaryKey::prune`] removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Self signatures that failed verification.
    pub signatures: usize,
    /// User IDs, user attributes and subkeys without a verified self
    /// signature.
    pub nodes: usize,
}

impl PrimaryKey {
    /// Returns the primary user ID.
    ///
    /// Among the valid user IDs, this is the one flagged as primary
    /// by the newest certification.  If none is flagged, it is the
    /// one with the newest certification.  Ties go to the earlier
    /// user ID.
    pub fn primary_user_id(&self, verifier: &dyn SignatureVerifier,
                           policy: &dyn Policy)
                           -> Option<&crate::cert::UserID>
    {
        self.primary_among(self.userids(), verifier, policy)
    }

    /// Returns the primary user attribute.
    ///
    /// See [`PrimaryKey::primary_user_id`].
    pub fn primary_user_attribute(&self, verifier: &dyn SignatureVerifier,
                                  policy: &dyn Policy)
                                  -> Option<&crate::cert::UserAttribute>
    {
        self.primary_among(self.user_attributes(), verifier, policy)
    }

    fn primary_among<'a, S>(&self, nodes: &'a [S],
                            verifier: &dyn SignatureVerifier,
                            policy: &dyn Policy)
                            -> Option<&'a S>
        where S: Signable
    {
        let mut best: Option<(&'a S, bool, Option<Timestamp>)> = None;
        for node in nodes {
            let sigs = node.self_sigs(self, verifier, policy);
            let (since, primary) = match *sigs.verdict() {
                Verdict::Valid { since, primary, .. } => (since, primary),
                _ => continue,
            };
            // Later candidates must be strictly better.
            let better = match best {
                None => true,
                Some((_, p, s)) => (primary, since) > (p, s),
            };
            if better {
                best = Some((node, primary, since));
            }
        }
        best.map(|(node, _, _)| node)
    }

    /// Drops what the certificate's own key does not vouch for.
    ///
    /// Self signatures that fail verification or are rejected by the
    /// policy are removed, from the primary key and from every child.
    /// Then user IDs, user attributes and subkeys without a verified
    /// self signature are removed.  Third-party signatures are kept,
    /// and so are signatures without issuer information: they are
    /// checked as self signatures, but they may well be third-party
    /// certifications.
    pub fn prune(&mut self, verifier: &dyn SignatureVerifier,
                 policy: &dyn Policy)
                 -> PruneReport
    {
        tracer!(TRACE, "PrimaryKey::prune");

        fn assess<S: Signable>(node: &S, primary: &PrimaryKey,
                               verifier: &dyn SignatureVerifier,
                               policy: &dyn Policy)
                               -> (HashSet<String>, bool)
        {
            let sigs = node.self_sigs(primary, verifier, policy);
            let bad = sigs.errors.iter()
                .filter(|c| c.signature.issuer().is_some())
                .map(|c| c.signature.uuid().to_string())
                .collect();
            (bad, *sigs.verdict() == Verdict::Unverified)
        }

        let own = assess(&*self, self, verifier, policy);
        let userids: Vec<_> = self.userids().iter()
            .map(|n| assess(n, self, verifier, policy)).collect();
        let user_attributes: Vec<_> = self.user_attributes().iter()
            .map(|n| assess(n, self, verifier, policy)).collect();
        let subkeys: Vec<_> = self.subkeys().iter()
            .map(|n| assess(n, self, verifier, policy)).collect();

        let mut report = PruneReport::default();
        report.signatures +=
            self.retain_signatures(|s| ! own.0.contains(s.uuid()));
        report.signatures += prune_nodes(&mut self.userids, userids,
                                         &mut report.nodes);
        report.signatures += prune_nodes(&mut self.user_attributes,
                                         user_attributes, &mut report.nodes);
        report.signatures += prune_nodes(&mut self.subkeys, subkeys,
                                         &mut report.nodes);

        if report != PruneReport::default() {
            log::debug!("{}: pruned {} signatures and {} nodes",
                        self.fingerprint(), report.signatures, report.nodes);
        }
        t!("{:?}", report);
        report
    }
}

// Removes bad signatures from every node and unverified nodes from
// `nodes`.  Dropped nodes are counted in `dropped`; returns the
// number of signatures removed from the remaining nodes.
fn prune_nodes<S: Signable>(nodes: &mut Vec<S>,
                            assessment: Vec<(HashSet<String>, bool)>,
                            dropped: &mut usize)
                            -> usize
{
    let mut removed = 0;
    let mut keep = Vec::with_capacity(nodes.len());
    for (mut node, (bad, unverified)) in nodes.drain(..).zip(assessment) {
        if unverified {
            *dropped += 1;
            continue;
        }
        removed += node.retain_signatures(|s| ! bad.contains(s.uuid()));
        keep.push(node);
    }
    *nodes = keep;
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::tests::{at, Fixture};
    use crate::crypto::DigestPrefixVerifier;
    use crate::packet::signature::SignatureBuilder;
    use crate::packet::{OpaquePacket, Tag};
    use crate::policy::{NullPolicy, StandardPolicy};
    use crate::types::{HashAlgorithm, ReasonForRevocation, SignatureType};

    const T1: u32 = 1_500_000_000;
    const T2: u32 = 1_500_001_000;
    const T3: u32 = 1_500_002_000;

    fn revocation(t: u32) -> SignatureBuilder {
        SignatureBuilder::new(SignatureType::CertificationRevocation)
            .set_signature_creation_time(Timestamp::from(t)).unwrap()
            .set_reason_for_revocation(ReasonForRevocation::UIDRetired,
                                       b"").unwrap()
    }

    #[test]
    fn unverified_by_default() {
        let f = Fixture::new(1);
        let pk = f.primary();
        let uid = f.userid(&pk, "Alice");
        let p = StandardPolicy::new();
        let sigs = uid.self_sigs(&pk, &DigestPrefixVerifier, &p);
        assert_eq!(sigs.verdict(), &Verdict::Unverified);
        assert!(! sigs.is_valid());
        assert!(! sigs.is_revoked());
        assert!(! sigs.verdict().is_alive_at(Timestamp::from(T1)));
    }

    #[test]
    fn third_party_signatures_are_ignored() {
        let f = Fixture::new(1);
        let mut g = Fixture::new(2);
        let pk = f.primary();
        let mut uid = f.userid(&pk, "Alice");

        // g certifies Alice's user ID.
        let sig = g.certify_userid(&uid, at(T1));
        uid.append_signature(sig);

        let p = StandardPolicy::new();
        let sigs = uid.self_sigs(&pk, &DigestPrefixVerifier, &p);
        assert!(sigs.certifications.is_empty());
        assert!(sigs.errors.is_empty());
        assert_eq!(sigs.verdict(), &Verdict::Unverified);
    }

    #[test]
    fn revocation_precedence() {
        let mut f = Fixture::new(1);
        let pk = f.primary();
        let mut ua = f.user_attribute(&pk, b"jpeg");
        let p = StandardPolicy::new();

        let sig = f.certify_user_attribute(&ua, at(T1));
        ua.append_signature(sig);
        let sig = f.certify_user_attribute(&ua, revocation(T2));
        ua.append_signature(sig);

        let sigs = ua.self_sigs(&pk, &DigestPrefixVerifier, &p);
        assert_eq!(sigs.certifications.len(), 1);
        assert_eq!(sigs.revocations.len(), 1);
        assert_eq!(sigs.verdict(), &Verdict::Revoked {
            since: Some(Timestamp::from(T2)),
            hard: false,
        });
        assert_eq!(sigs.revoked_since(), Some(Timestamp::from(T2)));

        // A later certification supersedes the soft revocation.
        let sig = f.certify_user_attribute(
            &ua, at(T3).set_signature_validity_period(Some(3600)).unwrap());
        ua.append_signature(sig);
        let sigs = ua.self_sigs(&pk, &DigestPrefixVerifier, &p);
        assert_eq!(sigs.verdict(), &Verdict::Valid {
            since: Some(Timestamp::from(T3)),
            expires_at: Some(Timestamp::from(T3 + 3600)),
            primary: false,
        });
        assert_eq!(sigs.expirations.len(), 1);
        assert!(sigs.verdict().is_alive_at(Timestamp::from(T3)));
        assert!(! sigs.verdict().is_alive_at(Timestamp::from(T3 + 3600)));
    }

    #[test]
    fn equal_times_revocation_wins() {
        let mut f = Fixture::new(1);
        let pk = f.primary();
        let mut uid = f.userid(&pk, "Alice");
        let sig = f.certify_userid(&uid, revocation(T1));
        uid.append_signature(sig);
        let sig = f.certify_userid(&uid, at(T1));
        uid.append_signature(sig);

        let sigs = uid.self_sigs(&pk, &DigestPrefixVerifier,
                                 &StandardPolicy::new());
        assert!(sigs.is_revoked());
    }

    #[test]
    fn certification_revocations_are_soft() {
        let p = StandardPolicy::new();
        for reason in vec![None, Some(ReasonForRevocation::Unspecified)] {
            let mut f = Fixture::new(1);
            let pk = f.primary();
            let mut ua = f.user_attribute(&pk, b"jpeg");

            let sig = f.certify_user_attribute(&ua, at(T1));
            ua.append_signature(sig);
            let mut b = SignatureBuilder::new(
                SignatureType::CertificationRevocation)
                .set_signature_creation_time(Timestamp::from(T2)).unwrap();
            if let Some(reason) = reason {
                b = b.set_reason_for_revocation(reason, b"").unwrap();
            }
            let sig = f.certify_user_attribute(&ua, b);
            ua.append_signature(sig);
            assert_eq!(ua.self_sigs(&pk, &DigestPrefixVerifier, &p).verdict(),
                       &Verdict::Revoked {
                           since: Some(Timestamp::from(T2)),
                           hard: false,
                       });

            // Certified again.
            let sig = f.certify_user_attribute(&ua, at(T3));
            ua.append_signature(sig);
            assert_eq!(ua.self_sigs(&pk, &DigestPrefixVerifier, &p).verdict(),
                       &Verdict::Valid {
                           since: Some(Timestamp::from(T3)),
                           expires_at: None,
                           primary: false,
                       });
        }
    }

    #[test]
    fn compromised_user_id() {
        let mut f = Fixture::new(1);
        let pk = f.primary();
        let mut uid = f.userid(&pk, "Alice");

        let sig = f.certify_userid(&uid, at(T1));
        uid.append_signature(sig);
        let sig = f.certify_userid(&uid, SignatureBuilder::new(
            SignatureType::CertificationRevocation)
            .set_signature_creation_time(Timestamp::from(T2)).unwrap()
            .set_reason_for_revocation(ReasonForRevocation::KeyCompromised,
                                       b"").unwrap());
        uid.append_signature(sig);
        let sig = f.certify_userid(&uid, at(T3));
        uid.append_signature(sig);

        let sigs = uid.self_sigs(&pk, &DigestPrefixVerifier,
                                 &StandardPolicy::new());
        assert_eq!(sigs.verdict(), &Verdict::Revoked {
            since: Some(Timestamp::from(T2)),
            hard: true,
        });

        // Unless the policy allows superseding them.
        let sigs = uid.self_sigs(&pk, &DigestPrefixVerifier, &NullPolicy);
        assert!(sigs.is_valid());
        assert_eq!(sigs.revocations.len(), 1);
    }

    #[test]
    fn key_revocations_without_reason_are_hard() {
        let mut f = Fixture::new(1);
        let pk = f.primary();
        let mut subkey = f.subkey(&pk, 7);
        let binding = |t: u32| SignatureBuilder::new(
            SignatureType::SubkeyBinding)
            .set_signature_creation_time(Timestamp::from(t)).unwrap();

        let sig = f.bind_subkey(&subkey, binding(T1));
        subkey.append_signature(sig);
        let sig = f.bind_subkey(&subkey, SignatureBuilder::new(
            SignatureType::SubkeyRevocation)
            .set_signature_creation_time(Timestamp::from(T2)).unwrap());
        subkey.append_signature(sig);
        let sig = f.bind_subkey(&subkey, binding(T3));
        subkey.append_signature(sig);

        let sigs = subkey.self_sigs(&pk, &DigestPrefixVerifier,
                                    &StandardPolicy::new());
        assert_eq!(sigs.verdict(), &Verdict::Revoked {
            since: Some(Timestamp::from(T2)),
            hard: true,
        });
        assert!(sigs.revocations[0].is_hard());

        let sigs = subkey.self_sigs(&pk, &DigestPrefixVerifier, &NullPolicy);
        assert!(sigs.is_valid());
    }

    #[test]
    fn verification_isolation() {
        let mut f = Fixture::new(1);
        let pk = f.primary();
        let mut uid = f.userid(&pk, "Alice");
        let other = f.userid(&pk, "Mallory");

        let sig = f.certify_userid(&uid, at(T1));
        uid.append_signature(sig);
        // A self signature made over a different user ID.
        let misplaced = f.certify_userid(&other, at(T3));
        uid.append_signature(misplaced);
        let sig = f.certify_userid(
            &uid, at(T2).set_primary_userid(true).unwrap());
        uid.append_signature(sig);

        let sigs = uid.self_sigs(&pk, &DigestPrefixVerifier,
                                 &StandardPolicy::new());
        assert_eq!(sigs.errors.len(), 1);
        assert!(matches!(sigs.errors[0].error,
                         Some(VerificationError::BadSignature(_))));
        assert_eq!(sigs.errors[0].creation_time(), Some(Timestamp::from(T3)));
        assert_eq!(sigs.certifications.len(), 2);
        assert_eq!(sigs.verdict(), &Verdict::Valid {
            since: Some(Timestamp::from(T2)),
            expires_at: None,
            primary: true,
        });
        assert_eq!(sigs.primary_since(), Some(Timestamp::from(T2)));
    }

    #[test]
    fn policy_rejections_are_errors() {
        let mut f = Fixture::new(1);
        let pk = f.primary();
        let mut uid = f.userid(&pk, "Alice");
        let sig = f.certify_userid(
            &uid, at(T1).set_hash_algo(HashAlgorithm::SHA1));
        uid.append_signature(sig);

        let mut p = StandardPolicy::new();
        assert!(uid.self_sigs(&pk, &DigestPrefixVerifier, &p).is_valid());

        p.reject_hash_algorithm(HashAlgorithm::SHA1);
        let sigs = uid.self_sigs(&pk, &DigestPrefixVerifier, &p);
        assert_eq!(sigs.errors.len(), 1);
        assert!(matches!(sigs.errors[0].error,
                         Some(VerificationError::Policy(_))));
        assert_eq!(sigs.verdict(), &Verdict::Unverified);
    }

    #[test]
    fn ordering_and_idempotence() {
        let mut f = Fixture::new(1);
        let pk = f.primary();
        let mut uid = f.userid(&pk, "Alice");

        // Arrival order: T2, T1, T3 with expiration, T3.
        for b in vec![at(T2),
                      at(T1),
                      at(T3).set_signature_validity_period(Some(60)).unwrap(),
                      at(T3).set_primary_userid(true).unwrap()] {
            let sig = f.certify_userid(&uid, b);
            uid.append_signature(sig);
        }

        let mut sigs = uid.self_sigs(&pk, &DigestPrefixVerifier,
                                     &StandardPolicy::new());
        let times: Vec<_> = sigs.certifications.iter()
            .map(|c| c.creation_time().unwrap()).collect();
        assert_eq!(times, vec![Timestamp::from(T3), Timestamp::from(T3),
                               Timestamp::from(T2), Timestamp::from(T1)]);
        // Equal times keep arrival order: the expiring one is newest.
        let expected = Verdict::Valid {
            since: Some(Timestamp::from(T3)),
            expires_at: Some(Timestamp::from(T3 + 60)),
            primary: false,
        };
        assert_eq!(sigs.verdict(), &expected);

        sigs.resolve();
        assert_eq!(sigs.verdict(), &expected);
        sigs.resolve();
        assert_eq!(sigs.verdict(), &expected);
    }

    #[test]
    fn subkeys_and_primary_keys() {
        let mut f = Fixture::new(1);
        let mut pk = f.primary();
        let mut subkey = f.subkey(&pk, 7);
        let p = StandardPolicy::new();

        let sig = f.bind_subkey(&subkey, SignatureBuilder::new(
            SignatureType::SubkeyBinding)
            .set_signature_creation_time(Timestamp::from(T1)).unwrap()
            .set_key_validity_period(Some(100)).unwrap());
        subkey.append_signature(sig);
        let sigs = subkey.self_sigs(&pk, &DigestPrefixVerifier, &p);
        // Relative to the subkey's creation time.
        assert_eq!(sigs.expires_at(), Some(Timestamp::from(1_400_000_100)));

        let sig = f.bind_subkey(&subkey, SignatureBuilder::new(
            SignatureType::SubkeyRevocation)
            .set_signature_creation_time(Timestamp::from(T2)).unwrap()
            .set_reason_for_revocation(ReasonForRevocation::KeyCompromised,
                                       b"stolen").unwrap());
        subkey.append_signature(sig);
        let sigs = subkey.self_sigs(&pk, &DigestPrefixVerifier, &p);
        assert_eq!(sigs.verdict(), &Verdict::Revoked {
            since: Some(Timestamp::from(T2)),
            hard: true,
        });

        // Certification types mean nothing on a primary key.
        let sig = f.sign_direct_key(&pk, at(T1));
        pk.append_signature(sig);
        assert_eq!(pk.self_sigs(&pk, &DigestPrefixVerifier, &p).verdict(),
                   &Verdict::Unverified);
        let sig = f.sign_direct_key(&pk, SignatureBuilder::new(
            SignatureType::DirectKey)
            .set_signature_creation_time(Timestamp::from(T1)).unwrap());
        pk.append_signature(sig);
        assert!(pk.self_sigs(&pk, &DigestPrefixVerifier, &p).is_valid());
    }

    #[test]
    fn primary_user_id() {
        let mut f = Fixture::new(1);
        let mut pk = f.primary();
        let p = StandardPolicy::new();

        let mut alice = f.userid(&pk, "Alice");
        let sig = f.certify_userid(&alice, at(T3));
        alice.append_signature(sig);
        let mut bob = f.userid(&pk, "Bob");
        let sig = f.certify_userid(&bob, at(T1).set_primary_userid(true)
                                   .unwrap());
        bob.append_signature(sig);
        let mut carol = f.userid(&pk, "Carol");
        let sig = f.certify_userid(&carol, at(T2).set_primary_userid(true)
                                   .unwrap());
        carol.append_signature(sig);
        let dave = f.userid(&pk, "Dave");
        for uid in vec![alice, bob, carol, dave] {
            pk.add_userid(uid).unwrap();
        }

        // Carol's primary certification is the newest one.
        assert_eq!(pk.primary_user_id(&DigestPrefixVerifier, &p)
                   .map(|u| u.value()),
                   Some(&b"Carol"[..]));
        assert!(pk.primary_user_attribute(&DigestPrefixVerifier, &p)
                .is_none());
    }

    #[test]
    fn prune() {
        let mut f = Fixture::new(1);
        let mut g = Fixture::new(2);
        let mut pk = f.primary();
        let mut p = StandardPolicy::new();
        p.reject_hash_algorithm(HashAlgorithm::SHA1);

        let mut alice = f.userid(&pk, "Alice");
        let sig = f.certify_userid(&alice, at(T1));
        alice.append_signature(sig);
        let sig = g.certify_userid(&alice, at(T2));
        alice.append_signature(sig);
        // Rejected by the policy.
        let sig = f.certify_userid(&alice, at(T2)
                                   .set_hash_algo(HashAlgorithm::SHA1));
        alice.append_signature(sig);
        pk.add_userid(alice).unwrap();

        // Only a third-party certification.
        let mut bob = f.userid(&pk, "Bob");
        let sig = g.certify_userid(&bob, at(T1));
        bob.append_signature(sig);
        pk.add_userid(bob).unwrap();

        let report = pk.prune(&DigestPrefixVerifier, &p);
        assert_eq!(report, PruneReport { signatures: 1, nodes: 1 });
        assert_eq!(pk.userids().len(), 1);
        assert_eq!(pk.userids()[0].value(), b"Alice");
        // The third-party certification survives.
        assert_eq!(pk.userids()[0].signatures().len(), 2);

        // Pruning again changes nothing.
        assert_eq!(pk.prune(&DigestPrefixVerifier, &p),
                   PruneReport::default());
    }

    #[test]
    fn prune_keeps_signatures_without_issuer() {
        let mut f = Fixture::new(1);
        let mut pk = f.primary();
        let mut uid = f.userid(&pk, "Alice");
        let sig = f.certify_userid(&uid, at(T1));
        uid.append_signature(sig);

        // A positive certification that names no issuer, with a
        // digest prefix that does not match.
        let mut body = vec![4, 0x13, 22, 10];
        body.extend_from_slice(&[0, 6, 5, 2]);
        body.extend_from_slice(&T2.to_be_bytes());
        body.extend_from_slice(&[0, 0]);
        body.extend_from_slice(&[0xde, 0xad]);
        body.extend_from_slice(&[0, 8, 0x2a]);
        let anonymous = Signature::from_opaque(
            &OpaquePacket::new(Tag::Signature, body), uid.uuid()).unwrap();
        assert!(anonymous.issuer().is_none());
        uid.append_signature(anonymous.clone());
        pk.add_userid(uid).unwrap();

        let p = StandardPolicy::new();
        let sigs = pk.userids()[0].self_sigs(&pk, &DigestPrefixVerifier, &p);
        assert_eq!(sigs.errors.len(), 1);
        assert_eq!(sigs.errors[0].signature.uuid(), anonymous.uuid());

        assert_eq!(pk.prune(&DigestPrefixVerifier, &p),
                   PruneReport::default());
        assert_eq!(pk.userids()[0].signatures().len(), 2);
    }
}
