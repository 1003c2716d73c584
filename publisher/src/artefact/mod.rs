//! Built archives and the versioned gallery tree they are unpacked into.
//!
//! # Sub-modules
//!
//! - [`extraction`]: unpacking archives with path traversal protection.
//! - [`extracted`]: reading version directories back (`ExtractedVersion`).
//! - [`layout`]: file names and paths inside a version directory.
//! - [`sha256_digest`]: SHA-256 digest newtype (`Sha256Digest`).

pub mod extracted;
pub mod extraction;
pub mod layout;
pub mod sha256_digest;
