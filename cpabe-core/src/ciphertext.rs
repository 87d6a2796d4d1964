use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "default-serialization")]
use crate::{DefaultDeserialize, DefaultSerialize};

use crate::access::AccessStructure;
use crate::curve::{G1Point, G2Point, GtElement};
use crate::dem::{BLOCK_SIZE, IV_SIZE, TAG_SIZE};
use crate::traits::{fmt_public, ConstructionError, HasTypeName};

/// An encrypted message together with the encapsulation of its symmetric key
/// under an access structure.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "CiphertextRepr"))]
pub struct Ciphertext {
    pub(crate) c: GtElement,
    pub(crate) c_prime: G1Point,
    pub(crate) ci: Vec<G2Point>,
    pub(crate) di: Vec<G1Point>,
    pub(crate) access_structure: AccessStructure,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_bytes::as_base64"))]
    pub(crate) iv: [u8; IV_SIZE],
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_bytes::as_base64"))]
    pub(crate) payload: Box<[u8]>,
    #[cfg_attr(feature = "serde", serde(with = "crate::serde_bytes::as_base64"))]
    pub(crate) tag: [u8; TAG_SIZE],
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct CiphertextRepr {
    c: GtElement,
    c_prime: G1Point,
    ci: Vec<G2Point>,
    di: Vec<G1Point>,
    access_structure: AccessStructure,
    #[serde(with = "crate::serde_bytes::as_base64")]
    iv: [u8; IV_SIZE],
    #[serde(with = "crate::serde_bytes::as_base64")]
    payload: Box<[u8]>,
    #[serde(with = "crate::serde_bytes::as_base64")]
    tag: [u8; TAG_SIZE],
}

#[cfg(feature = "serde")]
impl TryFrom<CiphertextRepr> for Ciphertext {
    type Error = ConstructionError;

    fn try_from(repr: CiphertextRepr) -> Result<Self, Self::Error> {
        let ciphertext = Self {
            c: repr.c,
            c_prime: repr.c_prime,
            ci: repr.ci,
            di: repr.di,
            access_structure: repr.access_structure,
            iv: repr.iv,
            payload: repr.payload,
            tag: repr.tag,
        };
        ciphertext.check_consistency()?;
        Ok(ciphertext)
    }
}

impl Ciphertext {
    /// Checks the structural invariants: one `(Ci, Di)` pair per policy row,
    /// and a payload made of whole cipher blocks.
    pub(crate) fn check_consistency(&self) -> Result<(), ConstructionError> {
        let rows = self.access_structure.rows();
        if rows == 0 || self.access_structure.cols() == 0 {
            return Err(ConstructionError::new("Ciphertext", "Empty access structure"));
        }
        if self.ci.len() != rows || self.di.len() != rows {
            return Err(ConstructionError::new(
                "Ciphertext",
                "Number of row components does not match the access structure",
            ));
        }
        if self.payload.is_empty() || self.payload.len() % BLOCK_SIZE != 0 {
            return Err(ConstructionError::new(
                "Ciphertext",
                "Payload is not a whole number of cipher blocks",
            ));
        }
        Ok(())
    }

    /// The access structure the message was encrypted under.
    pub fn access_structure(&self) -> &AccessStructure {
        &self.access_structure
    }

    /// The symmetrically encrypted message (without IV and tag).
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn fingerprint_source(&self) -> Vec<u8> {
        let mut bytes = self.c_prime.to_compressed().to_vec();
        bytes.extend_from_slice(&self.iv);
        bytes.extend_from_slice(&self.tag);
        bytes
    }
}

impl HasTypeName for Ciphertext {
    fn type_name() -> &'static str {
        "Ciphertext"
    }
}

impl fmt::Display for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_public::<Self>(&self.fingerprint_source(), f)
    }
}

#[cfg(feature = "default-serialization")]
impl DefaultSerialize for Ciphertext {}

#[cfg(feature = "default-serialization")]
impl DefaultDeserialize for Ciphertext {}

#[cfg(test)]
mod tests {

    use alloc::string::{String, ToString};

    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    use rand_core::OsRng;
    use serde_json::Value;

    use super::Ciphertext;
    use crate::abe::{encrypt_with_rng, setup_with_rng};
    use crate::access::AccessStructure;
    use crate::params::Parameters;
    use crate::serde_bytes::tests::check_deserialization;
    use crate::{DefaultDeserialize, DefaultSerialize};

    fn ciphertext() -> Ciphertext {
        let (mpk, _msk) = setup_with_rng(&mut OsRng, &Parameters::new()).unwrap();
        let policy = AccessStructure::from_policy("a AND (b OR c)").unwrap();
        encrypt_with_rng(&mut OsRng, &mpk, &policy, b"peace at dawn").unwrap()
    }

    fn json_with(ciphertext: &Ciphertext, field: &str, value: Value) -> String {
        let mut object = serde_json::to_value(ciphertext).unwrap();
        object[field] = value;
        object.to_string()
    }

    #[test]
    fn serde_serialization() {
        check_deserialization(&ciphertext());
    }

    #[test]
    fn default_serialization() {
        let ciphertext = ciphertext();

        let bytes = ciphertext.to_bytes().unwrap();
        assert_eq!(Ciphertext::from_bytes(&bytes).unwrap(), ciphertext);

        let encoded = ciphertext.to_base64().unwrap();
        assert_eq!(Ciphertext::from_base64(&encoded).unwrap(), ciphertext);

        assert!(Ciphertext::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        assert!(Ciphertext::from_base64("").is_err());
        assert!(Ciphertext::from_base64("not base64!").is_err());
    }

    #[test]
    fn byte_fields_are_base64_in_json() {
        let ciphertext = ciphertext();
        let object = serde_json::to_value(&ciphertext).unwrap();
        assert_eq!(object["iv"], Value::String(BASE64.encode(ciphertext.iv)));
        assert_eq!(
            object["payload"],
            Value::String(BASE64.encode(&ciphertext.payload))
        );
    }

    #[test]
    fn inconsistent_components_are_rejected() {
        let ciphertext = ciphertext();

        // One `Ci` missing
        let mut object = serde_json::to_value(&ciphertext).unwrap();
        object["ci"].as_array_mut().unwrap().pop();
        assert!(serde_json::from_str::<Ciphertext>(&object.to_string()).is_err());

        // Payload not made of whole blocks
        let truncated = BASE64.encode(&ciphertext.payload[..15]);
        let json = json_with(&ciphertext, "payload", Value::String(truncated));
        assert!(serde_json::from_str::<Ciphertext>(&json).is_err());

        // Missing field
        let mut object = serde_json::to_value(&ciphertext).unwrap();
        object.as_object_mut().unwrap().remove("tag");
        assert!(serde_json::from_str::<Ciphertext>(&object.to_string()).is_err());
    }

    #[test]
    fn identity_points_are_rejected() {
        let ciphertext = ciphertext();
        let mut identity = [0u8; 48];
        identity[0] = 0xc0;
        let json = json_with(&ciphertext, "c_prime", Value::String(BASE64.encode(identity)));
        assert!(serde_json::from_str::<Ciphertext>(&json).is_err());
    }

    #[test]
    fn display_shows_fingerprint() {
        let ciphertext = ciphertext();
        let shown = ciphertext.to_string();
        assert!(shown.starts_with("Ciphertext:"));
        assert_eq!(shown, ciphertext.clone().to_string());
    }
}
