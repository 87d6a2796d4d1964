use alloc::string::String;
use alloc::vec::Vec;

use bls12_381_plus::ff::PrimeField;
use bls12_381_plus::Scalar;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::hashing::ATTRIBUTE_DST;

/// System-wide configuration shared by the key-issuing authority and all parties.
///
/// The group (BLS12-381) and the hash-to-curve suite are fixed;
/// the attribute universe is an advisory list that the issuer may use
/// to flag keys requested for attributes it does not know about.
/// An empty universe means "any attribute".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Parameters {
    attribute_universe: Vec<String>,
}

impl Parameters {
    /// Creates parameters with an open attribute universe.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates parameters listing the attributes the issuer expects to see.
    pub fn with_attribute_universe<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attribute_universe: attributes.into_iter().map(Into::into).collect(),
        }
    }

    /// The order `p` of the pairing groups, as a `0x`-prefixed hex string.
    pub fn group_order(&self) -> &'static str {
        <Scalar as PrimeField>::MODULUS
    }

    /// The domain separation tag used when hashing attributes into `G2`.
    pub fn hash_to_curve_dst(&self) -> &'static [u8] {
        ATTRIBUTE_DST
    }

    /// The configured attribute universe (possibly empty).
    pub fn attribute_universe(&self) -> &[String] {
        &self.attribute_universe
    }

    pub(crate) fn is_known_attribute(&self, attribute: &str) -> bool {
        self.attribute_universe.is_empty()
            || self.attribute_universe.iter().any(|known| known == attribute)
    }
}

#[cfg(test)]
mod tests {

    use super::Parameters;

    #[test]
    fn test_default() {
        let p1 = Parameters::new();
        let p2 = Parameters::default();
        assert_eq!(p1, p2);
        assert!(p1.is_known_attribute("anything:at-all"));
        assert!(p1.group_order().starts_with("0x73eda753"));
    }

    #[test]
    fn universe_lookup() {
        let params = Parameters::with_attribute_universe(["dept:HR", "role:manager"]);
        assert!(params.is_known_attribute("dept:HR"));
        assert!(!params.is_known_attribute("dept:IT"));
        assert_eq!(params.attribute_universe().len(), 2);
    }
}
