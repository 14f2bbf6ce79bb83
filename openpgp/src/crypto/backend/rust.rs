//! SHA-2 from the RustCrypto crates.

use crate::crypto::hash::Digest;
use crate::{Error, Result};
use crate::types::HashAlgorithm;

// `digest::Digest` hands out a `GenericArray` sized by the algorithm.
// The crate-internal `Digest` writes into a caller-sized slice.
macro_rules! sha2_digest {
    ( $t:ty, $size:expr ) => {
        impl Digest for $t {
            fn digest_size(&self) -> usize {
                $size
            }

            fn update(&mut self, data: &[u8]) {
                digest::Update::update(self, data);
            }

            fn digest(&mut self, out: &mut [u8]) -> Result<()> {
                let d = digest::Digest::finalize_reset(self);
                let n = out.len().min(d.len());
                out[..n].copy_from_slice(&d[..n]);
                Ok(())
            }
        }
    };
}

sha2_digest!(sha2::Sha224, 28);
sha2_digest!(sha2::Sha256, 32);
sha2_digest!(sha2::Sha384, 48);
sha2_digest!(sha2::Sha512, 64);

impl HashAlgorithm {
    /// Returns whether digests of this algorithm can be computed.
    ///
    /// MD5 and RIPEMD-160 are recognized on the wire but never
    /// computed.
    pub fn is_supported(self) -> bool {
        use HashAlgorithm::*;
        matches!(self, SHA1 | SHA224 | SHA256 | SHA384 | SHA512)
    }

    /// Returns a fresh hasher, or
    /// [`Error::UnsupportedHashAlgorithm`] unless
    /// [`HashAlgorithm::is_supported`].
    pub(crate) fn new_hasher(self) -> Result<Box<dyn Digest>> {
        let hasher: Box<dyn Digest> = match self {
            HashAlgorithm::SHA1 => Box::new(super::sha1cd::build()),
            HashAlgorithm::SHA224 => Box::new(sha2::Sha224::default()),
            HashAlgorithm::SHA256 => Box::new(sha2::Sha256::default()),
            HashAlgorithm::SHA384 => Box::new(sha2::Sha384::default()),
            HashAlgorithm::SHA512 => Box::new(sha2::Sha512::default()),
            _ => return Err(Error::UnsupportedHashAlgorithm(self).into()),
        };
        Ok(hasher)
    }
}
