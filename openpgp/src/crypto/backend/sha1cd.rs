//! SHA-1 with collision detection.
//!
//! Fingerprints and legacy signatures still use SHA-1.  Inputs that
//! show signs of a collision attack get a "safe" digest that differs
//! from the plain SHA-1 output, and [`Digest::digest`] reports the
//! detection as an error.

use generic_array::GenericArray;
use digest::consts::U20;
use sha1collisiondetection::Sha1CD;

use crate::crypto::hash::Digest;
use crate::Result;

pub(crate) fn build() -> Sha1CD {
    sha1collisiondetection::Builder::default()
        .detect_collisions(true)
        .use_ubc(true)
        .safe_hash(true)
        .build()
}

impl Digest for Sha1CD {
    fn digest_size(&self) -> usize {
        20
    }

    fn update(&mut self, data: &[u8]) {
        digest::Update::update(self, data);
    }

    fn digest(&mut self, out: &mut [u8]) -> Result<()> {
        let mut d = GenericArray::<u8, U20>::default();
        let detection = self.finalize_into_dirty_cd(&mut d);
        digest::Reset::reset(self);

        let n = out.len().min(d.len());
        out[..n].copy_from_slice(&d[..n]);
        detection.map_err(Into::into)
    }
}
