use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use sha2::{Digest, Sha256};
use zeroize::Zeroize;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "default-serialization")]
use crate::{DefaultDeserialize, DefaultSerialize};

use crate::curve::{G1Point, G2Point, GtElement, G2_SIZE};
use crate::secret_box::SecretBox;
use crate::traits::{fmt_public, ConstructionError, HasTypeName};

/// The public half of the authority's key pair: `P_g2 = g2 * a` and `P_gt = e(g1, g2) * alpha`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MasterPublicKey {
    pub(crate) p_g2: G2Point,
    pub(crate) p_gt: GtElement,
}

impl MasterPublicKey {
    fn fingerprint_source(&self) -> Vec<u8> {
        let mut bytes = self.p_g2.to_compressed().to_vec();
        bytes.extend_from_slice(&self.p_gt.to_bytes());
        bytes
    }
}

impl HasTypeName for MasterPublicKey {
    fn type_name() -> &'static str {
        "MasterPublicKey"
    }
}

impl fmt::Display for MasterPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_public::<Self>(&self.fingerprint_source(), f)
    }
}

#[cfg(feature = "default-serialization")]
impl DefaultSerialize for MasterPublicKey {}

#[cfg(feature = "default-serialization")]
impl DefaultDeserialize for MasterPublicKey {}

/// The authority's secret `S = g2 * alpha`. Only needed to issue user keys.
#[derive(Clone, PartialEq)] // No Debug derivation, to avoid exposing the key accidentally.
pub struct MasterSecretKey(SecretBox<G2Point>);

impl MasterSecretKey {
    pub(crate) fn new(point: G2Point) -> Self {
        Self(SecretBox::new(point))
    }

    pub(crate) fn as_point(&self) -> &G2Point {
        self.0.as_secret()
    }

    /// Returns the compressed encoding of the key, for storage by the authority.
    pub fn to_secret_bytes(&self) -> SecretBox<[u8; G2_SIZE]> {
        SecretBox::new(self.0.as_secret().to_compressed())
    }

    /// Restores the key from [`MasterSecretKey::to_secret_bytes`] output.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ConstructionError> {
        G2Point::from_compressed(bytes)
            .map(Self::new)
            .map_err(|_| ConstructionError::new("MasterSecretKey", "Invalid encoding"))
    }
}

/// A user's decryption key, bound to a set of attributes.
///
/// `K = S + P_g2 * t`, `L = g1 * t`, and `Kx[i] = H(attribute_i) * t`
/// for a blinding scalar `t` that is discarded after issuance.
#[derive(Clone, PartialEq)] // No Debug derivation, to avoid exposing the key accidentally.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "UserKeyRepr"))]
pub struct UserKey {
    pub(crate) k: G2Point,
    pub(crate) l: G1Point,
    pub(crate) kx: Vec<G2Point>,
    pub(crate) attrib_to_index: BTreeMap<String, usize>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct UserKeyRepr {
    k: G2Point,
    l: G1Point,
    kx: Vec<G2Point>,
    attrib_to_index: BTreeMap<String, usize>,
}

#[cfg(feature = "serde")]
impl TryFrom<UserKeyRepr> for UserKey {
    type Error = ConstructionError;

    fn try_from(repr: UserKeyRepr) -> Result<Self, Self::Error> {
        Self::from_parts(repr.k, repr.l, repr.kx, repr.attrib_to_index)
    }
}

impl UserKey {
    /// Assembles a key, checking that `attrib_to_index` is a bijection onto `kx`.
    #[cfg_attr(not(feature = "serde"), allow(dead_code))]
    pub(crate) fn from_parts(
        k: G2Point,
        l: G1Point,
        kx: Vec<G2Point>,
        attrib_to_index: BTreeMap<String, usize>,
    ) -> Result<Self, ConstructionError> {
        if kx.len() != attrib_to_index.len() {
            return Err(ConstructionError::new(
                "UserKey",
                "Attribute map and attribute components have different lengths",
            ));
        }
        let mut used = vec![false; kx.len()];
        for &index in attrib_to_index.values() {
            match used.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(ConstructionError::new(
                        "UserKey",
                        "Attribute map does not index the attribute components",
                    ))
                }
            }
        }
        Ok(Self {
            k,
            l,
            kx,
            attrib_to_index,
        })
    }

    /// Returns `true` if the key was issued for the given attribute.
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attrib_to_index.contains_key(attribute)
    }

    /// Iterates over the attributes of the key, in lexicographic order.
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.attrib_to_index.keys().map(String::as_str)
    }

    pub(crate) fn attribute_component(&self, attribute: &str) -> Option<&G2Point> {
        self.attrib_to_index
            .get(attribute)
            .and_then(|&index| self.kx.get(index))
    }

    fn fingerprint_source(&self) -> Vec<u8> {
        let mut digest = Sha256::new()
            .chain_update(self.k.to_compressed())
            .chain_update(self.l.to_compressed());
        for component in self.kx.iter() {
            digest.update(component.to_compressed());
        }
        digest.finalize().to_vec()
    }
}

impl Drop for UserKey {
    fn drop(&mut self) {
        self.k.zeroize();
        self.kx.iter_mut().for_each(Zeroize::zeroize);
    }
}

impl HasTypeName for UserKey {
    fn type_name() -> &'static str {
        "UserKey"
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only a digest of the key is shown.
        fmt_public::<Self>(&self.fingerprint_source(), f)
    }
}

#[cfg(feature = "default-serialization")]
impl DefaultSerialize for UserKey {}

#[cfg(feature = "default-serialization")]
impl DefaultDeserialize for UserKey {}
