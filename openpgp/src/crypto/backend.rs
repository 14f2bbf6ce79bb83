//! Hash function implementations behind [`crate::crypto::hash`].

pub(crate) mod sha1cd;
mod rust;
