//! `cpabe-core` is a ciphertext-policy attribute-based encryption (CP-ABE) scheme
//! over the BLS12-381 pairing.
//!
//! An authority generates a master key pair and issues user keys bound to sets of
//! attributes (e.g. `dept:HR`, `role:manager`). Anyone holding the master public key
//! can encrypt a message under an access policy expressed as a linear secret sharing
//! structure, and only keys whose attributes satisfy the policy can decrypt it.
//! Messages of any length are encrypted with AES-256-CBC, under a key derived from
//! a random target group element encapsulated by the scheme.
//!
//! ## Available feature flags
//!
//! * `default-rng` - adds methods that use the system RNG (default).
//! * `default-serialization` - adds methods for default binary serialization,
//!    MessagePack, `serde`-based (default).
//! * `serde` - implements `serde`-based serialization and deserialization.
//! * `std` - implements `std::error::Error` for the error types.
//! * `bench-internals` - exposes some internals for benchmarking.
//!
//! # Usage
//!
//! ```
//! use cpabe_core::*;
//!
//! // The authority generates the master key pair.
//! let params = Parameters::with_attribute_universe(["dept:HR", "role:manager", "role:admin"]);
//! let (mpk, msk) = setup(&params).unwrap();
//!
//! // ... and issues a key to a user holding two attributes.
//! let key = keygen(&params, &msk, &mpk, &["dept:HR", "role:manager"]).unwrap();
//!
//! // Anyone can encrypt under a policy using the master public key.
//! let policy = AccessStructure::from_policy("dept:HR AND (role:manager OR role:admin)").unwrap();
//! let plaintext = b"quarterly salaries";
//! let ciphertext = encrypt(&mpk, &policy, plaintext).unwrap();
//!
//! // The ciphertext can be sent over the wire.
//! let bytes = ciphertext.to_bytes().unwrap();
//! let received = Ciphertext::from_bytes(&bytes).unwrap();
//!
//! // The user's attributes satisfy the policy.
//! let decrypted = decrypt(&mpk, &key, &received).unwrap();
//! assert_eq!(&decrypted as &[u8], plaintext);
//!
//! // A key lacking `dept:HR` does not.
//! let other_key = keygen(&params, &msk, &mpk, &["role:admin"]).unwrap();
//! assert_eq!(
//!     decrypt(&mpk, &other_key, &received),
//!     Err(DecryptionError::InsufficientAttributes)
//! );
//! ```

#![doc(html_root_url = "https://docs.rs/cpabe-core")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]
#![no_std]
// Allows us to mark items in the documentation as gated under specific features.
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[cfg(any(test, feature = "std"))]
extern crate std;

extern crate alloc;

#[cfg(feature = "bench-internals")]
pub mod bench; // Re-export some internals for benchmarks.

mod abe;
mod access;
mod ciphertext;
mod curve;
mod dem;
mod hashing;
mod keys;
mod lsss;
mod params;
pub mod policy;
mod secret_box;
mod traits;

#[cfg(feature = "serde")]
pub mod serde_bytes;

pub use abe::{
    decrypt, encrypt_with_rng, keygen_with_rng, setup_with_rng, DecryptionError,
    EncryptionError, KeyGenerationError,
};
pub use access::{AccessStructure, AccessStructureError};
pub use ciphertext::Ciphertext;
pub use curve::{CurveScalar, G1Point, G2Point, GtElement, RandomnessError};
pub use hashing::hash_to_g2;
pub use keys::{MasterPublicKey, MasterSecretKey, UserKey};
pub use params::Parameters;
pub use policy::PolicyError;
pub use secret_box::SecretBox;
pub use traits::{ConstructionError, DeserializationError, HasTypeName};

#[cfg(feature = "default-rng")]
pub use abe::{encrypt, keygen, setup};

#[cfg(feature = "default-serialization")]
pub use traits::{DefaultDeserialize, DefaultSerialize};
