//! Certificate trees.
//!
//! A key server stores a certificate as a tree: the [`PrimaryKey`] is
//! the root, and it owns its [`UserID`]s, [`UserAttribute`]s and
//! [`SubKey`]s.  Each of these nodes, the primary key included, owns
//! the [`Signature`]s made over it, and any packets that were
//! attached to it but are not needed to evaluate it, its *others*.
//!
//! Every node is identified by its content identity, the UUID of its
//! [`Packet`].  Since the identity of a child is scoped by its
//! parent's identity, the same user ID under two different keys has
//! two different identities, while importing literally the same
//! certificate twice yields the same identities again.  The
//! [`merge`] engine relies on that to fold duplicates together.
//!
//! No node refers to its parent.  Operations that need the parent,
//! like removing a duplicate or deciding whether a signature is a
//! self signature, take it as an argument.
//!
//! # Examples
//!
//! ```rust
//! # fn main() -> keyserver_openpgp::Result<()> {
//! use keyserver_openpgp::cert::parser::read_keys;
//!
//! # let bytes = b"";
//! for cert in read_keys(&bytes[..]) {
//!     let cert = cert?;
//!     println!("{}: {} packets, {} user IDs",
//!              cert.fingerprint(), cert.packet_count(),
//!              cert.userids().len());
//! }
//! # Ok(()) }
//! ```

use std::fmt;

use crate::{
    Error,
    Fingerprint,
    KeyID,
    Result,
};
use crate::crypto::SignatureVerifier;
use crate::packet::{
    Key4,
    OpaquePacket,
    Packet,
    Signature4,
};
use crate::parse::ParsedPacket;
use crate::policy::Policy;
use crate::types::{
    ReasonForRevocation,
    RevocationType,
    SignatureType,
    Timestamp,
};

// Trait impls shared by the child node types.  A child stores its
// packet in `packet` and its parent's identity in `parent`.
macro_rules! impl_signable_node {
    ( $t:ident, $kind:ident ) => {
        impl $t {
            /// Returns the content identity of the certificate this
            /// node was created under.
            pub fn parent_uuid(&self) -> &str {
                &self.parent
            }
        }

        impl crate::cert::PacketNode for $t {
            fn packet(&self) -> &crate::packet::Packet {
                &self.packet
            }

            fn contents(&self) -> Vec<crate::cert::NodeRef<'_>> {
                let mut contents = vec![crate::cert::NodeRef::$kind(self)];
                crate::cert::signable_contents(self, &mut contents);
                contents
            }
        }

        assert_send_and_sync!($t);
    };
}

pub mod merge;
pub mod parser;
mod selfsig;
pub use self::selfsig::{
    CheckSig,
    PruneReport,
    SelfSigs,
    Verdict,
};
mod signature;
pub use self::signature::Signature;
mod subkey;
pub use self::subkey::SubKey;
mod user_attribute;
pub use self::user_attribute::UserAttribute;
mod userid;
pub use self::userid::UserID;

/// The kinds of nodes in a certificate tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A [`PrimaryKey`].
    PrimaryKey,
    /// A [`UserID`].
    UserID,
    /// A [`UserAttribute`].
    UserAttribute,
    /// A [`SubKey`].
    SubKey,
    /// A [`Signature`].
    Signature,
    /// An opaque [`Packet`].
    Other,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            NodeKind::PrimaryKey => "primary key",
            NodeKind::UserID => "user ID",
            NodeKind::UserAttribute => "user attribute",
            NodeKind::SubKey => "subkey",
            NodeKind::Signature => "signature",
            NodeKind::Other => "other packet",
        })
    }
}

/// A reference to any node of a certificate tree.
#[derive(Clone, Copy, Debug)]
pub enum NodeRef<'a> {
    /// A primary key.
    PrimaryKey(&'a PrimaryKey),
    /// A user ID.
    UserID(&'a UserID),
    /// A user attribute.
    UserAttribute(&'a UserAttribute),
    /// A subkey.
    SubKey(&'a SubKey),
    /// A signature.
    Signature(&'a Signature),
    /// An opaque packet.
    Other(&'a Packet),
}

impl<'a> NodeRef<'a> {
    /// Returns the kind of the node.
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::PrimaryKey(_) => NodeKind::PrimaryKey,
            NodeRef::UserID(_) => NodeKind::UserID,
            NodeRef::UserAttribute(_) => NodeKind::UserAttribute,
            NodeRef::SubKey(_) => NodeKind::SubKey,
            NodeRef::Signature(_) => NodeKind::Signature,
            NodeRef::Other(_) => NodeKind::Other,
        }
    }

    /// Returns the node's packet.
    pub fn packet(&self) -> &'a Packet {
        match *self {
            NodeRef::PrimaryKey(n) => n.packet(),
            NodeRef::UserID(n) => n.packet(),
            NodeRef::UserAttribute(n) => n.packet(),
            NodeRef::SubKey(n) => n.packet(),
            NodeRef::Signature(n) => n.packet(),
            NodeRef::Other(p) => p,
        }
    }

    /// Returns the node's content identity.
    pub fn uuid(&self) -> &'a str {
        self.packet().uuid()
    }
}

/// A mutable reference to any node of a certificate tree.
///
/// Tree operations that act on a parent take a `NodeMut`, and check
/// that the parent has the kind they need.
#[derive(Debug)]
pub enum NodeMut<'a> {
    /// A primary key.
    PrimaryKey(&'a mut PrimaryKey),
    /// A user ID.
    UserID(&'a mut UserID),
    /// A user attribute.
    UserAttribute(&'a mut UserAttribute),
    /// A subkey.
    SubKey(&'a mut SubKey),
    /// A signature.
    Signature(&'a mut Signature),
    /// An opaque packet.
    Other(&'a mut Packet),
}

impl<'a> NodeMut<'a> {
    /// Returns the kind of the node.
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeMut::PrimaryKey(_) => NodeKind::PrimaryKey,
            NodeMut::UserID(_) => NodeKind::UserID,
            NodeMut::UserAttribute(_) => NodeKind::UserAttribute,
            NodeMut::SubKey(_) => NodeKind::SubKey,
            NodeMut::Signature(_) => NodeKind::Signature,
            NodeMut::Other(_) => NodeKind::Other,
        }
    }
}

impl<'a> From<&'a mut PrimaryKey> for NodeMut<'a> {
    fn from(n: &'a mut PrimaryKey) -> Self {
        NodeMut::PrimaryKey(n)
    }
}

/// Names a child of a primary key by its position.
///
/// A child is addressed by its kind and its index in the primary
/// key's collection of that kind.  Removing a child shifts the
/// indices of the later children of the same kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeId {
    /// The n-th user ID.
    UserID(usize),
    /// The n-th user attribute.
    UserAttribute(usize),
    /// The n-th subkey.
    SubKey(usize),
}

impl NodeId {
    /// Returns the kind of the node.
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeId::UserID(_) => NodeKind::UserID,
            NodeId::UserAttribute(_) => NodeKind::UserAttribute,
            NodeId::SubKey(_) => NodeKind::SubKey,
        }
    }

    /// Returns the index into the collection.
    pub fn index(&self) -> usize {
        match self {
            NodeId::UserID(i) | NodeId::UserAttribute(i) | NodeId::SubKey(i) =>
                *i,
        }
    }
}

/// A node of a certificate tree.
pub trait PacketNode {
    /// Returns the node's packet.
    fn packet(&self) -> &Packet;

    /// Returns the node's content identity.
    fn uuid(&self) -> &str {
        self.packet().uuid()
    }

    /// Returns the node and all its descendants, depth first.
    ///
    /// The node comes first, followed by its signatures and its
    /// others.  A primary key continues with its user IDs, user
    /// attributes and subkeys, each followed by its own descendants.
    fn contents(&self) -> Vec<NodeRef<'_>>;
}

impl PacketNode for Packet {
    fn packet(&self) -> &Packet {
        self
    }

    fn contents(&self) -> Vec<NodeRef<'_>> {
        vec![NodeRef::Other(self)]
    }
}

/// How a self signature bears on the node it is attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SigClass {
    /// The signature revokes the node.
    Revocation {
        /// Whether the revocation can never be superseded by a later
        /// certification, subject to
        /// [`Policy::hard_revocations_are_final`].
        ///
        ///   [`Policy::hard_revocations_are_final`]: crate::policy::Policy::hard_revocations_are_final
        hard: bool,
    },
    /// The signature certifies the node.
    Certification {
        /// When the certification, or what it certifies, expires.
        expires_at: Option<Timestamp>,
        /// Whether the node is flagged as the primary one of its kind.
        primary: bool,
    },
    /// The signature is not relevant for the node's validity.
    Ignored,
}

impl SigClass {
    /// Classifies a key revocation.
    ///
    /// Without a reason, or with a reason other than superseded or
    /// retired, the key may be compromised and the revocation is hard.
    pub(crate) fn key_revocation(sig: &Signature4) -> Self {
        SigClass::Revocation {
            hard: sig.revocation_type() == RevocationType::Hard,
        }
    }

    /// Classifies the revocation of a user ID or user attribute.
    ///
    /// Revoking a user ID says nothing about the key, so only a
    /// compromised key makes the revocation hard.  GnuPG's `revuid`
    /// uses "no reason specified" for an identity that may be
    /// certified again later.
    pub(crate) fn certification_revocation(sig: &Signature4) -> Self {
        SigClass::Revocation {
            hard: matches!(sig.reason_for_revocation(),
                           Some((ReasonForRevocation::KeyCompromised, _))),
        }
    }
}

/// A node that carries signatures.
///
/// Mutation is append-only and order preserving.  Nothing is
/// validated when a signature is appended; that is the job of
/// [`Signable::self_sigs`].
pub trait Signable: PacketNode {
    /// Returns the signatures, in arrival order.
    fn signatures(&self) -> &[Signature];

    /// Returns the opaque packets attached to the node.
    fn others(&self) -> &[Packet];

    /// Appends a signature.
    fn append_signature(&mut self, sig: Signature);

    /// Appends an opaque packet.
    fn append_other(&mut self, other: Packet);

    /// Appends the signatures and others of `other`.
    ///
    /// `other` is consumed.  Its identity is not checked; see
    /// [`merge::remove_duplicate`] for the checked operation.
    fn absorb(&mut self, other: Self) where Self: Sized;

    /// Keeps only the signatures for which `f` returns `true`.
    ///
    /// Returns the number of signatures removed.  This is the only
    /// operation that drops signatures; it is used to prune what the
    /// certificate does not vouch for.
    fn retain_signatures<F>(&mut self, f: F) -> usize
        where F: FnMut(&Signature) -> bool, Self: Sized;

    /// Returns the octets `sig` signs when it is a self signature
    /// over this node made by `primary`.
    fn signed_content(&self, primary: &Key4, sig: &Signature4) -> Vec<u8>;

    /// Classifies a verified self signature.
    fn classify(&self, primary: &Key4, sig: &Signature4) -> SigClass;

    /// Classifies this node's self signatures and resolves them into
    /// a verdict.
    ///
    /// `primary` is the certificate this node belongs to; for a
    /// primary key that is the key itself.
    fn self_sigs<'a>(&'a self, primary: &PrimaryKey,
                     verifier: &dyn SignatureVerifier, policy: &dyn Policy)
                     -> SelfSigs<'a>
        where Self: Sized
    {
        SelfSigs::new(self, primary, verifier, policy)
    }
}

/// Appends the descendants of a signable node to `contents`.
fn signable_contents<'a, S: Signable>(node: &'a S,
                                      contents: &mut Vec<NodeRef<'a>>) {
    for sig in node.signatures() {
        contents.extend(sig.contents());
    }
    for other in node.others() {
        contents.extend(other.contents());
    }
}

/// A certificate: the primary key and everything attached to it.
#[derive(Clone, Debug, PartialEq)]
pub struct PrimaryKey {
    packet: Packet,
    key: Key4,
    signatures: Vec<Signature>,
    others: Vec<Packet>,
    userids: Vec<UserID>,
    user_attributes: Vec<UserAttribute>,
    subkeys: Vec<SubKey>,
}

impl PrimaryKey {
    /// Creates a certificate from a public key packet.
    ///
    /// The certificate's identity is its reversed fingerprint, so
    /// that a reversed Key ID is a prefix of it.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidPacketType`] if `op` is not a
    /// public key packet, and with [`Error::MalformedPacket`] if it
    /// cannot be decoded.
    pub fn from_opaque(op: &OpaquePacket) -> Result<Self> {
        let key = Key4::from_opaque(op)?;
        let packet = Packet::with_uuid(key.fingerprint().to_reversed_hex(),
                                       op, true)?;
        Ok(PrimaryKey {
            packet,
            key,
            signatures: Vec::new(),
            others: Vec::new(),
            userids: Vec::new(),
            user_attributes: Vec::new(),
            subkeys: Vec::new(),
        })
    }

    /// Returns the public key.
    pub fn key(&self) -> &Key4 {
        &self.key
    }

    /// Returns the key's fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        self.key.fingerprint()
    }

    /// Returns the key's Key ID.
    pub fn keyid(&self) -> KeyID {
        self.key.keyid()
    }

    /// Returns the user IDs.
    pub fn userids(&self) -> &[UserID] {
        &self.userids
    }

    /// Returns the user attributes.
    pub fn user_attributes(&self) -> &[UserAttribute] {
        &self.user_attributes
    }

    /// Returns the subkeys.
    pub fn subkeys(&self) -> &[SubKey] {
        &self.subkeys
    }

    /// Adds a user ID.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidArgument`] if the user ID was not
    /// created under this certificate's identity.
    pub fn add_userid(&mut self, uid: UserID) -> Result<()> {
        self.check_scope(uid.parent_uuid(), NodeKind::UserID)?;
        self.userids.push(uid);
        Ok(())
    }

    /// Adds a user attribute.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidArgument`] if the user attribute
    /// was not created under this certificate's identity.
    pub fn add_user_attribute(&mut self, ua: UserAttribute) -> Result<()> {
        self.check_scope(ua.parent_uuid(), NodeKind::UserAttribute)?;
        self.user_attributes.push(ua);
        Ok(())
    }

    /// Adds a subkey.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidArgument`] if the subkey was not
    /// created under this certificate's identity.
    pub fn add_subkey(&mut self, subkey: SubKey) -> Result<()> {
        self.check_scope(subkey.parent_uuid(), NodeKind::SubKey)?;
        self.subkeys.push(subkey);
        Ok(())
    }

    fn check_scope(&self, parent: &str, kind: NodeKind) -> Result<()> {
        if parent != self.uuid() {
            return Err(Error::InvalidArgument(
                format!("{} belongs to {}, not {}",
                        kind, parent, self.uuid())).into());
        }
        Ok(())
    }

    /// Returns the child named by `id`.
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        match id {
            NodeId::UserID(i) =>
                self.userids.get(i).map(NodeRef::UserID),
            NodeId::UserAttribute(i) =>
                self.user_attributes.get(i).map(NodeRef::UserAttribute),
            NodeId::SubKey(i) =>
                self.subkeys.get(i).map(NodeRef::SubKey),
        }
    }

    /// Returns the names of all children, in order.
    pub fn children(&self) -> Vec<NodeId> {
        (0..self.userids.len()).map(NodeId::UserID)
            .chain((0..self.user_attributes.len()).map(NodeId::UserAttribute))
            .chain((0..self.subkeys.len()).map(NodeId::SubKey))
            .collect()
    }

    /// Returns the number of packets in the certificate.
    pub fn packet_count(&self) -> usize {
        self.contents().len()
    }
}

impl PacketNode for PrimaryKey {
    fn packet(&self) -> &Packet {
        &self.packet
    }

    fn contents(&self) -> Vec<NodeRef<'_>> {
        let mut contents = vec![NodeRef::PrimaryKey(self)];
        signable_contents(self, &mut contents);
        for uid in self.userids.iter() {
            contents.extend(uid.contents());
        }
        for ua in self.user_attributes.iter() {
            contents.extend(ua.contents());
        }
        for subkey in self.subkeys.iter() {
            contents.extend(subkey.contents());
        }
        contents
    }
}

impl Signable for PrimaryKey {
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
        sig.direct_key_content(primary)
    }

    fn classify(&self, _: &Key4, sig: &Signature4) -> SigClass {
        match sig.typ() {
            SignatureType::KeyRevocation => SigClass::key_revocation(sig),
            SignatureType::DirectKey => SigClass::Certification {
                expires_at: sig.key_expiration_time(&self.key),
                primary: false,
            },
            _ => SigClass::Ignored,
        }
    }
}

assert_send_and_sync!(PrimaryKey);
