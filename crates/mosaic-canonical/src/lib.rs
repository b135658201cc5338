//! Canonical forms and content digests
//!
//! Decides whether two renditions of an entity's data differ meaningfully:
//! normalization strips everything that must never affect the comparison
//! (volatile fields, insertion order, producer-specific scalar encodings,
//! resolution caches inside component trees), and the digest turns the
//! surviving value into a fixed-size change detector.
//!
//! # Core Concepts
//!
//! - [`EntityData`]: an entity's full field payload
//! - [`Normalizer`] / [`NormalizerConfig`]: the normalization rules
//! - [`CanonicalForm`]: the comparison-ready value (not a string)
//! - [`Digest`]: 64-bit content digest, exact-equality comparison only
//!
//! # Example
//!
//! ```rust
//! use mosaic_canonical::{Digest, EntityData, Normalizer, NormalizerConfig};
//! use serde_json::json;
//!
//! let normalizer = Normalizer::new(NormalizerConfig::default());
//! let entity = EntityData::new("page", "42").with_field("label", json!("Hello"));
//!
//! let digest = Digest::of_canonical(&normalizer.normalize(&entity)).unwrap();
//! assert_eq!(digest, Digest::of_canonical(&normalizer.normalize(&entity)).unwrap());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod digest;
mod entity;
mod normalize;

pub use digest::{Digest, DigestError, DIGEST_LEN};
pub use entity::EntityData;
pub use normalize::{CanonicalForm, Normalizer, NormalizerConfig};
