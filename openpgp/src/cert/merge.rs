//! Folding duplicate subtrees.
//!
//! The same certificate reaches a key server many times.  Each import
//! yields a tree whose nodes have the same content identities as the
//! nodes of earlier imports, but which may carry additional
//! signatures.  Folding one node into another with the same identity
//! keeps the union of both: the signatures and others of the
//! duplicate are appended to the survivor, and the duplicate is
//! removed from its parent.
//!
//! Merging never drops a signature.  A revocation that was accepted
//! once survives every later merge, no matter what a peer submits.
//! Signatures are not deduplicated: two byte-identical signatures
//! imported twice are both kept, and the classifier tolerates that.
//!
//! # Examples
//!
//! ```rust
//! # fn main() -> keyserver_openpgp::Result<()> {
//! use keyserver_openpgp::cert::merge::merge_keyring;
//! use keyserver_openpgp::cert::parser::read_keys;
//!
//! # let (first, second) = (b"", b"");
//! let mut keys = Vec::new();
//! for bytes in &[&first[..], &second[..]] {
//!     for cert in read_keys(bytes) {
//!         keys.push(cert?);
//!     }
//! }
//! for cert in merge_keyring(keys) {
//!     println!("{}: {} packets", cert.fingerprint(), cert.packet_count());
//! }
//! # Ok(()) }
//! ```

use std::collections::HashMap;

use crate::{
    Error,
    Result,
};
use crate::cert::{
    NodeId,
    NodeKind,
    NodeMut,
    PacketNode,
    PrimaryKey,
    Signable,
};

const TRACE : bool = false;

/// Folds the child `duplicate` of `parent` into the child `survivor`.
///
/// The duplicate's signatures and others are appended to the
/// survivor's, in order, and the duplicate is removed from the
/// parent.  The order of the remaining children is unchanged.  Since
/// the duplicate is removed, the indices of later children of the
/// same kind shift down by one.
///
/// # Errors
///
/// Fails with [`Error::InvalidParent`] if `parent` is not a primary
/// key, with [`Error::InvalidDuplicate`] if `duplicate` is not of the
/// same kind as `survivor`, with [`Error::IndexOutOfRange`] if either
/// does not exist, with [`Error::InvalidArgument`] if they are the
/// same node, and with [`Error::IdentityMismatch`] if their content
/// identities differ.  On error, the tree is not modified.
pub fn remove_duplicate(parent: NodeMut, survivor: NodeId, duplicate: NodeId)
                        -> Result<()>
{
    tracer!(TRACE, "remove_duplicate");
    t!("{:?} into {:?}", duplicate, survivor);

    let pk = match parent {
        NodeMut::PrimaryKey(pk) => pk,
        p => return Err(Error::InvalidParent {
            expected: NodeKind::PrimaryKey,
            actual: p.kind(),
        }.into()),
    };

    match (survivor, duplicate) {
        (NodeId::UserID(s), NodeId::UserID(d)) =>
            fold(&mut pk.userids, s, d),
        (NodeId::UserAttribute(s), NodeId::UserAttribute(d)) =>
            fold(&mut pk.user_attributes, s, d),
        (NodeId::SubKey(s), NodeId::SubKey(d)) =>
            fold(&mut pk.subkeys, s, d),
        (s, d) => Err(Error::InvalidDuplicate {
            expected: s.kind(),
            actual: d.kind(),
        }.into()),
    }
}

fn fold<S: Signable>(nodes: &mut Vec<S>, survivor: usize, duplicate: usize)
                     -> Result<()>
{
    if survivor >= nodes.len() || duplicate >= nodes.len() {
        return Err(Error::IndexOutOfRange.into());
    }
    if survivor == duplicate {
        return Err(Error::InvalidArgument(
            "cannot fold a node into itself".into()).into());
    }
    if nodes[survivor].uuid() != nodes[duplicate].uuid() {
        return Err(Error::IdentityMismatch(
            nodes[survivor].uuid().into(),
            nodes[duplicate].uuid().into()).into());
    }

    let dup = nodes.remove(duplicate);
    let survivor = if duplicate < survivor { survivor - 1 } else { survivor };
    nodes[survivor].absorb(dup);
    Ok(())
}

// Folds every later node into the first one with the same identity.
// Returns the number of folded nodes.
fn dedup_nodes<S: Signable>(nodes: &mut Vec<S>) -> usize {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<S> = Vec::with_capacity(nodes.len());
    let mut folded = 0;

    for node in nodes.drain(..) {
        match seen.get(node.uuid()) {
            Some(&i) => {
                log::debug!("folding duplicate {}", node.uuid());
                kept[i].absorb(node);
                folded += 1;
            },
            None => {
                seen.insert(node.uuid().to_string(), kept.len());
                kept.push(node);
            },
        }
    }

    *nodes = kept;
    folded
}

impl PrimaryKey {
    /// Folds children with equal identities into one another.
    ///
    /// Every child whose identity was already seen among the earlier
    /// children of the same kind is folded into the first occurrence,
    /// as if by [`remove_duplicate`].  Returns the number of folded
    /// children.
    pub fn dedup(&mut self) -> usize {
        let folded = dedup_nodes(&mut self.userids)
            + dedup_nodes(&mut self.user_attributes)
            + dedup_nodes(&mut self.subkeys);
        if folded > 0 {
            log::debug!("{}: folded {} duplicates", self.fingerprint(), folded);
        }
        folded
    }

    /// Merges another import of the same certificate into this one.
    ///
    /// Everything `other` carries is appended, then duplicates are
    /// folded.  The result carries every signature and every other
    /// packet of both.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidArgument`] if `other` is a
    /// different certificate.
    pub fn merge(&mut self, other: PrimaryKey) -> Result<()> {
        if self.uuid() != other.uuid() {
            return Err(Error::InvalidArgument(
                format!("primary key mismatch: {} != {}",
                        self.fingerprint(), other.fingerprint())).into());
        }
        self.append(other);
        self.dedup();
        Ok(())
    }

    // Appends everything of `other`, without checking its identity.
    fn append(&mut self, other: PrimaryKey) {
        self.signatures.extend(other.signatures);
        self.others.extend(other.others);
        self.userids.extend(other.userids);
        self.user_attributes.extend(other.user_attributes);
        self.subkeys.extend(other.subkeys);
    }
}

/// Merges all imports of the same certificate.
///
/// Certificates are grouped by identity.  The result holds one
/// certificate per identity, in the order in which each identity was
/// first seen, with duplicates folded.
pub fn merge_keyring<I>(keys: I) -> Vec<PrimaryKey>
    where I: IntoIterator<Item = PrimaryKey>
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<PrimaryKey> = Vec::new();

    for key in keys {
        match index.get(key.uuid()) {
            Some(&i) => merged[i].append(key),
            None => {
                index.insert(key.uuid().to_string(), merged.len());
                merged.push(key);
            },
        }
    }

    for key in merged.iter_mut() {
        key.dedup();
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::tests::{at, Fixture};
    use crate::cert::{UserID, Verdict};
    use crate::crypto::DigestPrefixVerifier;
    use crate::policy::StandardPolicy;
    use crate::types::{ReasonForRevocation, SignatureType, Timestamp};
    use crate::packet::signature::SignatureBuilder;

    fn sig_uuids<S: Signable>(node: &S) -> Vec<String> {
        node.signatures().iter().map(|s| s.uuid().to_string()).collect()
    }

    fn downcast(e: anyhow::Error) -> Error {
        e.downcast::<Error>().expect("crate error")
    }

    #[test]
    fn union_keeps_every_signature() {
        let mut f = Fixture::new(1);
        let mut pk = f.primary();

        let alice = f.userid(&pk, "Alice");
        let s1 = f.certify_userid(&alice, at(1));
        let s2 = f.certify_userid(&alice, at(2));
        let s3 = f.certify_userid(&alice, at(3));

        let mut a = f.userid(&pk, "Alice");
        a.append_signature(s1.clone());
        a.append_signature(s2.clone());
        let mut b = f.userid(&pk, "Alice");
        b.append_signature(s2.clone());
        b.append_signature(s3.clone());
        let bob = f.userid(&pk, "Bob");
        pk.add_userid(a).unwrap();
        pk.add_userid(bob).unwrap();
        pk.add_userid(b).unwrap();

        remove_duplicate(NodeMut::from(&mut pk),
                         NodeId::UserID(0), NodeId::UserID(2)).unwrap();
        assert_eq!(pk.userids().len(), 2);
        assert_eq!(pk.userids()[1].value(), b"Bob");
        assert_eq!(sig_uuids(&pk.userids()[0]),
                   vec![s1.uuid(), s2.uuid(), s2.uuid(), s3.uuid()]);
    }

    #[test]
    fn exact_duplicates_are_not_collapsed() {
        let mut f = Fixture::new(1);
        let mut pk = f.primary();
        let mut ua = f.user_attribute(&pk, b"jpeg");
        let sig = f.certify_user_attribute(&ua, at(1));
        ua.append_signature(sig);
        let copy = ua.clone();
        pk.add_user_attribute(ua).unwrap();
        pk.add_user_attribute(copy).unwrap();

        // The survivor may come after the duplicate.
        remove_duplicate(NodeMut::from(&mut pk),
                         NodeId::UserAttribute(1),
                         NodeId::UserAttribute(0)).unwrap();
        assert_eq!(pk.user_attributes().len(), 1);
        assert_eq!(pk.user_attributes()[0].signatures().len(), 2);
    }

    #[test]
    fn errors() {
        let f = Fixture::new(1);
        let mut pk = f.primary();
        let mut uid = f.userid(&pk, "Alice");
        pk.add_userid(f.userid(&pk, "Alice")).unwrap();
        pk.add_userid(f.userid(&pk, "Bob")).unwrap();
        pk.add_subkey(f.subkey(&pk, 7)).unwrap();
        let before = pk.clone();

        assert_eq!(downcast(remove_duplicate(NodeMut::UserID(&mut uid),
                                             NodeId::UserID(0),
                                             NodeId::UserID(1))
                            .unwrap_err()),
                   Error::InvalidParent {
                       expected: NodeKind::PrimaryKey,
                       actual: NodeKind::UserID,
                   });
        assert_eq!(downcast(remove_duplicate(NodeMut::from(&mut pk),
                                             NodeId::UserID(0),
                                             NodeId::SubKey(0))
                            .unwrap_err()),
                   Error::InvalidDuplicate {
                       expected: NodeKind::UserID,
                       actual: NodeKind::SubKey,
                   });
        assert_eq!(downcast(remove_duplicate(NodeMut::from(&mut pk),
                                             NodeId::UserID(0),
                                             NodeId::UserID(5))
                            .unwrap_err()),
                   Error::IndexOutOfRange);
        assert!(matches!(downcast(remove_duplicate(NodeMut::from(&mut pk),
                                                   NodeId::UserID(1),
                                                   NodeId::UserID(1))
                                  .unwrap_err()),
                         Error::InvalidArgument(_)));
        assert!(matches!(downcast(remove_duplicate(NodeMut::from(&mut pk),
                                                   NodeId::UserID(0),
                                                   NodeId::UserID(1))
                                  .unwrap_err()),
                         Error::IdentityMismatch(_, _)));

        assert_eq!(pk, before);
    }

    #[test]
    fn dedup() {
        let mut f = Fixture::new(1);
        let mut pk = f.primary();
        for (value, t) in &[("Alice", 1), ("Bob", 2), ("Alice", 3),
                            ("Carol", 4), ("Alice", 5), ("Bob", 6)] {
            let mut uid = f.userid(&pk, value);
            let sig = f.certify_userid(&uid, at(*t));
            uid.append_signature(sig);
            pk.add_userid(uid).unwrap();
        }
        let packets = pk.packet_count();

        assert_eq!(pk.dedup(), 3);
        let values: Vec<&[u8]> = pk.userids().iter().map(|u| u.value())
            .collect();
        assert_eq!(values, vec![&b"Alice"[..], &b"Bob"[..], &b"Carol"[..]]);
        let times: Vec<Timestamp> = pk.userids()[0].signatures().iter()
            .filter_map(|s| s.signature_creation_time()).collect();
        assert_eq!(times, vec![Timestamp::from(1), Timestamp::from(3),
                               Timestamp::from(5)]);
        // Only the duplicate user ID packets are gone.
        assert_eq!(pk.packet_count(), packets - 3);

        assert_eq!(pk.dedup(), 0);
    }

    #[test]
    fn merge_imports() {
        let mut f = Fixture::new(1);
        let g = Fixture::new(2);
        let p = StandardPolicy::new();

        let import = |f: &mut Fixture, b: SignatureBuilder| -> PrimaryKey {
            let mut pk = f.primary();
            let mut uid: UserID = f.userid(&pk, "Alice");
            let sig = f.certify_userid(&uid, b);
            uid.append_signature(sig);
            pk.add_userid(uid).unwrap();
            pk
        };

        let mut merged = import(&mut f, at(1_500_000_000));
        let revoked = import(&mut f, SignatureBuilder::new(
            SignatureType::CertificationRevocation)
            .set_signature_creation_time(Timestamp::from(1_500_000_100))
            .unwrap()
            .set_reason_for_revocation(ReasonForRevocation::UIDRetired, b"")
            .unwrap());
        merged.merge(revoked).unwrap();
        assert_eq!(merged.userids().len(), 1);
        assert!(merged.userids()[0]
                .self_sigs(&merged, &DigestPrefixVerifier, &p).is_revoked());

        // A stale copy does not resurrect the user ID.
        let stale = import(&mut f, at(1_500_000_000));
        merged.merge(stale).unwrap();
        assert_eq!(merged.userids()[0].signatures().len(), 3);
        let sigs = merged.userids()[0]
            .self_sigs(&merged, &DigestPrefixVerifier, &p);
        assert_eq!(sigs.verdict(), &Verdict::Revoked {
            since: Some(Timestamp::from(1_500_000_100)),
            hard: false,
        });

        let err = merged.merge(g.primary()).unwrap_err();
        assert!(matches!(downcast(err), Error::InvalidArgument(_)));
    }

    #[test]
    fn keyring() {
        let f = Fixture::new(1);
        let g = Fixture::new(2);

        let with_uid = |f: &Fixture, value: &str| {
            let mut pk = f.primary();
            pk.add_userid(f.userid(&pk, value)).unwrap();
            pk
        };

        let merged = merge_keyring(vec![
            with_uid(&g, "Bob"),
            with_uid(&f, "Alice"),
            with_uid(&g, "Bob"),
            with_uid(&f, "Alicia"),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].fingerprint(), g.key.fingerprint());
        assert_eq!(merged[0].userids().len(), 1);
        assert_eq!(merged[1].fingerprint(), f.key.fingerprint());
        assert_eq!(merged[1].userids().len(), 2);
    }
}
