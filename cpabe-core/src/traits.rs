use alloc::string::String;
use core::fmt;

use sha2::{Digest, Sha256};

#[cfg(feature = "default-serialization")]
use alloc::{boxed::Box, string::ToString};

#[cfg(feature = "default-serialization")]
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

#[cfg(feature = "default-serialization")]
use serde::{de::DeserializeOwned, Serialize};

/// Errors that can happen during object construction from its parts or bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructionError {
    /// The name of the type that was being constructed.
    pub type_name: String,
    /// An error message.
    pub message: String,
}

impl ConstructionError {
    /// Creates a new object.
    pub fn new(type_name: &str, message: &str) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to construct a {} object: {}",
            self.type_name, self.message
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConstructionError {}

/// Errors that can happen when restoring an object from its stored form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeserializationError {
    /// The string form is not valid base64.
    NotBase64,
    /// The bytes do not describe a valid object of the requested type.
    InvalidEncoding(String),
}

impl fmt::Display for DeserializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotBase64 => write!(f, "Invalid encoding: not a base64 string"),
            Self::InvalidEncoding(message) => write!(f, "Invalid encoding: {}", message),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DeserializationError {}

/// A trait for objects that have a short human-readable type name.
pub trait HasTypeName {
    /// Returns a string with the name of the type.
    fn type_name() -> &'static str;
}

/// Writes `TypeName:<first 8 bytes of SHA-256 in hex>` for a public object.
pub(crate) fn fmt_public<T: HasTypeName>(
    fingerprint_source: &[u8],
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    let digest = Sha256::digest(fingerprint_source);
    write!(f, "{}:{}", T::type_name(), hex::encode(&digest[..8]))
}

/// Default serialization of an object that is used in all the bindings.
/// Uses MessagePack format.
#[cfg(feature = "default-serialization")]
pub trait DefaultSerialize: Serialize {
    /// Serializes this object.
    fn to_bytes(&self) -> Result<Box<[u8]>, rmp_serde::encode::Error> {
        rmp_serde::to_vec(self).map(|v| v.into_boxed_slice())
    }

    /// Serializes this object into a base64 string of its MessagePack bytes,
    /// suitable for text columns and JSON payloads.
    fn to_base64(&self) -> Result<String, rmp_serde::encode::Error> {
        self.to_bytes().map(|bytes| BASE64.encode(bytes))
    }
}

/// Default deserialization of an object that is used in all the bindings.
/// Uses MessagePack format.
#[cfg(feature = "default-serialization")]
pub trait DefaultDeserialize: DeserializeOwned {
    /// Deserializes a bytestring into this object.
    fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self, DeserializationError> {
        rmp_serde::from_slice(bytes.as_ref())
            .map_err(|err| DeserializationError::InvalidEncoding(err.to_string()))
    }

    /// Deserializes an object from the string produced by
    /// [`DefaultSerialize::to_base64`].
    fn from_base64(encoded: &str) -> Result<Self, DeserializationError> {
        if encoded.is_empty() {
            return Err(DeserializationError::InvalidEncoding("empty string".into()));
        }
        let bytes = BASE64
            .decode(encoded)
            .map_err(|_| DeserializationError::NotBase64)?;
        Self::from_bytes(bytes)
    }
}
