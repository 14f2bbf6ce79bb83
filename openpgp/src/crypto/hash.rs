//! Cryptographic hash functions and hashing of OpenPGP data
//! structures.
//!
//! This module provides [`Context`] representing a hash function
//! context independent of the hash implementation, as well as trait
//! [`Hash`] that handles hashing of OpenPGP data structures.
//!
//! A self signature covers the serialized form of the component it
//! binds, with some aspects fixed to ensure consistent results.  The
//! `*_content` methods on [`Signature4`] return exactly those octets,
//! which is what a [`SignatureVerifier`] is handed.
//!
//!   [`SignatureVerifier`]: super::SignatureVerifier

use dyn_clone::DynClone;

use crate::Result;
use crate::packet::{
    Key4,
    Signature4,
    UserAttributeBody,
    UserIDBody,
};
use crate::serialize::SerializeBody;
use crate::types::HashAlgorithm;

/// Hasher capable of calculating a digest for the input byte stream.
pub(crate) trait Digest: DynClone + Send + Sync {
    /// Size of the digest in bytes
    fn digest_size(&self) -> usize;

    /// Writes data into the hash function.
    fn update(&mut self, data: &[u8]);

    /// Finalizes the hash function and writes the digest into the
    /// provided slice.
    ///
    /// Resets the hash function contexts.
    ///
    /// `digest` must be at least `self.digest_size()` bytes large,
    /// otherwise the digest will be truncated.
    fn digest(&mut self, digest: &mut [u8]) -> Result<()>;
}

dyn_clone::clone_trait_object!(Digest);

/// State of a hash function.
///
/// This provides an abstract interface to the hash functions used in
/// OpenPGP.  `Context`s are created using [`HashAlgorithm::context`].
///
/// # Examples
///
/// ```rust
/// # fn main() -> keyserver_openpgp::Result<()> {
/// use keyserver_openpgp::types::HashAlgorithm;
///
/// // Create a context and feed data to it.
/// let mut ctx = HashAlgorithm::SHA256.context()?;
/// ctx.update(&b"abc"[..]);
///
/// // Extract the digest.
/// let mut digest = vec![0; ctx.digest_size()];
/// ctx.digest(&mut digest)?;
///
/// use keyserver_openpgp::fmt::hex;
/// assert_eq!(&hex::encode(digest),
///            "BA7816BF8F01CFEA414140DE5DAE2223\
///             B00361A396177A9CB410FF61F20015AD");
/// # Ok(()) }
/// ```
#[derive(Clone)]
pub struct Context {
    algo: HashAlgorithm,
    ctx: Box<dyn Digest>,
}

impl Context {
    /// Returns a collision detecting SHA-1 context for computing
    /// fingerprints.
    pub(crate) fn sha1() -> Self {
        Context {
            algo: HashAlgorithm::SHA1,
            ctx: Box::new(super::backend::sha1cd::build()),
        }
    }

    /// Returns the algorithm.
    pub fn algo(&self) -> HashAlgorithm {
        self.algo
    }

    /// Size of the digest in bytes
    pub fn digest_size(&self) -> usize {
        self.ctx.digest_size()
    }

    /// Writes data into the hash function.
    pub fn update<D: AsRef<[u8]>>(&mut self, data: D) {
        self.ctx.update(data.as_ref());
    }

    /// Finalizes the hash function and writes the digest into the
    /// provided slice.
    ///
    /// Resets the hash function contexts.
    ///
    /// `digest` must be at least [`self.digest_size()`] bytes large,
    /// otherwise the digest will be truncated.
    ///
    /// # Errors
    ///
    /// SHA-1 contexts fail if the input shows signs of a collision
    /// attack.  The digest is still written; it is the hardened
    /// digest, not the plain SHA-1 one.
    ///
    ///   [`self.digest_size()`]: #method.digest_size
    pub fn digest<D: AsMut<[u8]>>(&mut self, mut digest: D) -> Result<()> {
        self.ctx.digest(digest.as_mut())
    }
}

impl HashAlgorithm {
    /// Creates a new hash context for this algorithm.
    ///
    /// # Errors
    ///
    /// Fails with `Error::UnsupportedHashAlgorithm` if this crate does
    /// not support this algorithm. See
    /// [`HashAlgorithm::is_supported`].
    ///
    ///   [`HashAlgorithm::is_supported`]: #method.is_supported
    pub fn context(self) -> Result<Context> {
        self.new_hasher()
            .map(|ctx| Context {
                algo: self,
                ctx,
            })
    }
}

/// Computes the digest of `content` using `algo`.
pub fn digest(algo: HashAlgorithm, content: &[u8]) -> Result<Vec<u8>> {
    let mut h = algo.context()?;
    h.update(content);
    let mut digest = vec![0u8; h.digest_size()];
    h.digest(&mut digest)?;
    Ok(digest)
}

/// A sink for hashed data.
///
/// Implemented by [`Context`], to hash directly, and by `Vec<u8>`, to
/// collect the octets a signature covers.
pub trait Update {
    /// Writes data into the sink.
    fn update(&mut self, data: &[u8]);
}

impl Update for Context {
    fn update(&mut self, data: &[u8]) {
        self.ctx.update(data);
    }
}

impl Update for Vec<u8> {
    fn update(&mut self, data: &[u8]) {
        self.extend_from_slice(data);
    }
}

/// Feeds an OpenPGP object to a hash in the form signatures cover.
///
/// Components are hashed with a fixed header so that the same
/// content hashes the same however it was framed on the wire.  See
/// [`Signature4::userid_binding_content`] and its siblings for the
/// compounds a binding covers.
pub trait Hash {
    /// Updates `hash` with this object.
    fn hash(&self, hash: &mut dyn Update);
}

// User IDs and user attributes are framed by one octet and a
// four-octet length.
fn hash_framed(hash: &mut dyn Update, frame: u8, value: &[u8]) {
    let mut header = [frame, 0, 0, 0, 0];
    header[1..].copy_from_slice(&(value.len() as u32).to_be_bytes());
    hash.update(&header);
    hash.update(value);
}

impl Hash for UserIDBody {
    fn hash(&self, hash: &mut dyn Update) {
        hash_framed(hash, 0xB4, self.value());
    }
}

impl Hash for UserAttributeBody {
    fn hash(&self, hash: &mut dyn Update) {
        hash_framed(hash, 0xD1, self.value());
    }
}

impl Hash for Key4 {
    fn hash(&self, hash: &mut dyn Update) {
        // Primary keys and subkeys alike are framed as an old format
        // public key packet with a two-octet length.  Parsed key
        // bodies never exceed that length.
        let body = self.body_to_vec().unwrap_or_default();
        let len = (body.len() as u16).to_be_bytes();
        hash.update(&[0x99, len[0], len[1]]);
        hash.update(&body);
    }
}

impl Hash for Signature4 {
    fn hash(&self, hash: &mut dyn Update) {
        // Version, type, algorithms, and the hashed subpacket area
        // with its length, followed by the trailer of RFC 4880,
        // section 5.2.4: version, 0xFF, and the number of octets
        // hashed so far.
        let area = self.hashed_area().data();
        let area_len = (area.len() as u16).to_be_bytes();
        let header: [u8; 6] = [
            4,
            self.typ().into(),
            self.pk_algo().into(),
            self.hash_algo().into(),
            area_len[0],
            area_len[1],
        ];
        hash.update(&header);
        hash.update(area);

        let hashed = ((header.len() + area.len()) as u32).to_be_bytes();
        hash.update(&[4, 0xff, hashed[0], hashed[1], hashed[2], hashed[3]]);
    }
}

/// Signed content.
///
/// These functions return the octets a signature covers, i.e. the
/// input of the signature's hash function.
impl Signature4 {
    /// Returns the content signed by a direct key signature or a key
    /// revocation over `key`.
    pub fn direct_key_content(&self, key: &Key4) -> Vec<u8> {
        let mut content: Vec<u8> = Vec::new();
        key.hash(&mut content);
        self.hash(&mut content);
        content
    }

    /// Returns the content signed by a subkey binding or a subkey
    /// revocation.
    pub fn subkey_binding_content(&self, key: &Key4, subkey: &Key4)
                                  -> Vec<u8> {
        let mut content: Vec<u8> = Vec::new();
        key.hash(&mut content);
        subkey.hash(&mut content);
        self.hash(&mut content);
        content
    }

    /// Returns the content signed by a user ID certification or a
    /// certification revocation.
    pub fn userid_binding_content(&self, key: &Key4, userid: &UserIDBody)
                                  -> Vec<u8> {
        let mut content: Vec<u8> = Vec::new();
        key.hash(&mut content);
        userid.hash(&mut content);
        self.hash(&mut content);
        content
    }

    /// Returns the content signed by a user attribute certification
    /// or a certification revocation.
    pub fn user_attribute_binding_content(&self, key: &Key4,
                                          ua: &UserAttributeBody)
                                          -> Vec<u8> {
        let mut content: Vec<u8> = Vec::new();
        key.hash(&mut content);
        ua.hash(&mut content);
        self.hash(&mut content);
        content
    }
}
