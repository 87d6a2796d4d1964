//! This module is an adapter to the pairing backend.
//! `bls12_381_plus` exposes its groups through several trait families,
//! and we isolate all the related logic here.

use core::fmt;
use core::ops::{Add, Mul, Neg, Sub};

use bls12_381_plus::ff::Field;
use bls12_381_plus::group::{Curve, Group};
use bls12_381_plus::{pairing as backend_pairing, G1Affine, G1Projective, G2Affine, G2Projective};
use bls12_381_plus::{Gt, Scalar};
use rand_core::{CryptoRng, RngCore};
use subtle::CtOption;
use zeroize::Zeroize;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[cfg(feature = "serde")]
use crate::serde_bytes::{
    deserialize_with_encoding, serialize_with_encoding, Encoding, TryFromBytes,
};

use crate::traits::ConstructionError;

pub(crate) const SCALAR_SIZE: usize = 32;
pub(crate) const G1_SIZE: usize = 48;
pub(crate) const G2_SIZE: usize = 96;
pub(crate) const GT_SIZE: usize = 576;

/// The system RNG failed to produce the requested bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomnessError;

impl fmt::Display for RandomnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Random number generator failure")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RandomnessError {}

fn from_ct_option<T>(value: CtOption<T>) -> Option<T> {
    value.into()
}

/// An element of the scalar field `Z_p`, where `p` is the order of all three pairing groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CurveScalar(Scalar);

impl CurveScalar {
    /// The additive identity.
    pub fn zero() -> Self {
        Self(Scalar::ZERO)
    }

    /// The multiplicative identity.
    pub fn one() -> Self {
        Self(Scalar::ONE)
    }

    pub(crate) fn is_zero(&self) -> bool {
        self.0.is_zero().into()
    }

    pub(crate) fn invert(&self) -> Option<Self> {
        from_ct_option(self.0.invert()).map(Self)
    }

    /// Maps a signed integer into `Z_p`, so that negative values become `p - |value|`.
    ///
    /// This is the only place where signed matrix entries are normalized;
    /// everything downstream works with canonical field elements.
    pub fn from_i64(value: i64) -> Self {
        let magnitude = Scalar::from(value.unsigned_abs());
        if value < 0 {
            Self(-magnitude)
        } else {
            Self(magnitude)
        }
    }

    /// Samples a uniformly random non-zero scalar.
    pub(crate) fn random_nonzero(
        rng: &mut (impl CryptoRng + RngCore),
    ) -> Result<Self, RandomnessError> {
        loop {
            // 64 bytes of entropy reduced modulo `p` give a negligible bias.
            let mut wide = [0u8; 64];
            rng.try_fill_bytes(&mut wide)
                .map_err(|_| RandomnessError)?;
            let scalar = Scalar::from_bytes_wide(&wide);
            wide.zeroize();
            if !bool::from(scalar.is_zero()) {
                return Ok(Self(scalar));
            }
        }
    }

    /// Returns the big-endian encoding of the scalar.
    pub fn to_be_bytes(&self) -> [u8; SCALAR_SIZE] {
        self.0.to_be_bytes()
    }

    /// Restores a scalar from its big-endian encoding.
    /// Fails if the value is not reduced modulo `p`.
    pub fn from_be_bytes(bytes: &[u8]) -> Result<Self, ConstructionError> {
        let array = <[u8; SCALAR_SIZE]>::try_from(bytes)
            .map_err(|_| ConstructionError::new("CurveScalar", "Invalid length"))?;
        from_ct_option(Scalar::from_be_bytes(&array))
            .map(Self)
            .ok_or_else(|| ConstructionError::new("CurveScalar", "Value is not reduced"))
    }
}

impl Zeroize for CurveScalar {
    fn zeroize(&mut self) {
        self.0 = Scalar::ZERO;
    }
}

impl Add<&CurveScalar> for &CurveScalar {
    type Output = CurveScalar;

    fn add(self, other: &CurveScalar) -> CurveScalar {
        CurveScalar(self.0 + other.0)
    }
}

impl Sub<&CurveScalar> for &CurveScalar {
    type Output = CurveScalar;

    fn sub(self, other: &CurveScalar) -> CurveScalar {
        CurveScalar(self.0 - other.0)
    }
}

impl Mul<&CurveScalar> for &CurveScalar {
    type Output = CurveScalar;

    fn mul(self, other: &CurveScalar) -> CurveScalar {
        CurveScalar(self.0 * other.0)
    }
}

impl Neg for &CurveScalar {
    type Output = CurveScalar;

    fn neg(self) -> CurveScalar {
        CurveScalar(-self.0)
    }
}

/// An element of the first source group `G1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct G1Point(G1Projective);

impl G1Point {
    pub(crate) fn generator() -> Self {
        Self(G1Projective::generator())
    }

    pub(crate) fn to_affine(self) -> G1Affine {
        self.0.to_affine()
    }

    /// Returns the compressed encoding of the point.
    pub fn to_compressed(&self) -> [u8; G1_SIZE] {
        self.0.to_affine().to_compressed()
    }

    /// Restores a point from its compressed encoding.
    /// The identity element is rejected: it never appears in a valid key or ciphertext.
    pub fn from_compressed(bytes: &[u8]) -> Result<Self, ConstructionError> {
        let array = <[u8; G1_SIZE]>::try_from(bytes)
            .map_err(|_| ConstructionError::new("G1Point", "Invalid length"))?;
        let affine = from_ct_option(G1Affine::from_compressed(&array))
            .ok_or_else(|| ConstructionError::new("G1Point", "Not a valid curve point"))?;
        if bool::from(affine.is_identity()) {
            return Err(ConstructionError::new("G1Point", "Identity element"));
        }
        Ok(Self(G1Projective::from(affine)))
    }
}

impl Mul<&CurveScalar> for &G1Point {
    type Output = G1Point;

    fn mul(self, other: &CurveScalar) -> G1Point {
        G1Point(self.0 * other.0)
    }
}

/// An element of the second source group `G2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct G2Point(G2Projective);

impl G2Point {
    pub(crate) fn generator() -> Self {
        Self(G2Projective::generator())
    }

    pub(crate) fn from_backend_point(point: G2Projective) -> Self {
        Self(point)
    }

    pub(crate) fn to_affine(self) -> G2Affine {
        self.0.to_affine()
    }

    /// Returns the compressed encoding of the point.
    pub fn to_compressed(&self) -> [u8; G2_SIZE] {
        self.0.to_affine().to_compressed()
    }

    /// Restores a point from its compressed encoding.
    /// The identity element is rejected.
    pub fn from_compressed(bytes: &[u8]) -> Result<Self, ConstructionError> {
        let array = <[u8; G2_SIZE]>::try_from(bytes)
            .map_err(|_| ConstructionError::new("G2Point", "Invalid length"))?;
        let affine = from_ct_option(G2Affine::from_compressed(&array))
            .ok_or_else(|| ConstructionError::new("G2Point", "Not a valid curve point"))?;
        if bool::from(affine.is_identity()) {
            return Err(ConstructionError::new("G2Point", "Identity element"));
        }
        Ok(Self(G2Projective::from(affine)))
    }
}

impl Add<&G2Point> for &G2Point {
    type Output = G2Point;

    fn add(self, other: &G2Point) -> G2Point {
        G2Point(self.0 + other.0)
    }
}

impl Mul<&CurveScalar> for &G2Point {
    type Output = G2Point;

    fn mul(self, other: &CurveScalar) -> G2Point {
        G2Point(self.0 * other.0)
    }
}

impl Zeroize for G2Point {
    fn zeroize(&mut self) {
        self.0 = G2Projective::identity();
    }
}

/// An element of the target group `GT`. The group operation is written additively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GtElement(Gt);

impl GtElement {
    pub(crate) fn identity() -> Self {
        Self(Gt::identity())
    }

    /// Samples a uniformly random element as `e(g1, g2) * k` for a random non-zero `k`.
    pub(crate) fn random(rng: &mut (impl CryptoRng + RngCore)) -> Result<Self, RandomnessError> {
        let k = CurveScalar::random_nonzero(rng)?;
        Ok(Self(Gt::generator() * k.0))
    }

    /// Returns the canonical encoding of the element.
    pub fn to_bytes(&self) -> [u8; GT_SIZE] {
        self.0.to_bytes()
    }

    /// Restores an element from its canonical encoding.
    /// The identity element is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConstructionError> {
        let array = <[u8; GT_SIZE]>::try_from(bytes)
            .map_err(|_| ConstructionError::new("GtElement", "Invalid length"))?;
        let element = from_ct_option(Gt::from_bytes(&array))
            .ok_or_else(|| ConstructionError::new("GtElement", "Not a valid group element"))?;
        if bool::from(element.is_identity()) {
            return Err(ConstructionError::new("GtElement", "Identity element"));
        }
        Ok(Self(element))
    }
}

impl Add<&GtElement> for &GtElement {
    type Output = GtElement;

    fn add(self, other: &GtElement) -> GtElement {
        GtElement(self.0 + other.0)
    }
}

impl Sub<&GtElement> for &GtElement {
    type Output = GtElement;

    fn sub(self, other: &GtElement) -> GtElement {
        GtElement(self.0 - other.0)
    }
}

impl Mul<&CurveScalar> for &GtElement {
    type Output = GtElement;

    fn mul(self, other: &CurveScalar) -> GtElement {
        GtElement(self.0 * other.0)
    }
}

/// The bilinear map `e: G1 x G2 -> GT`.
pub(crate) fn pairing(p: &G1Point, q: &G2Point) -> GtElement {
    GtElement(backend_pairing(&p.to_affine(), &q.to_affine()))
}

#[cfg(feature = "serde")]
macro_rules! impl_serde_for_element {
    ($type:ty, $encoding:expr, $to_bytes:ident, $from_bytes:ident) => {
        impl Serialize for $type {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serialize_with_encoding(&self.$to_bytes(), serializer, $encoding)
            }
        }

        impl<'de> Deserialize<'de> for $type {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserialize_with_encoding(deserializer, $encoding)
            }
        }

        impl TryFromBytes for $type {
            type Error = ConstructionError;

            fn try_from_bytes(bytes: &[u8]) -> Result<Self, Self::Error> {
                Self::$from_bytes(bytes)
            }
        }
    };
}

#[cfg(feature = "serde")]
impl_serde_for_element!(CurveScalar, Encoding::Hex, to_be_bytes, from_be_bytes);
#[cfg(feature = "serde")]
impl_serde_for_element!(G1Point, Encoding::Base64, to_compressed, from_compressed);
#[cfg(feature = "serde")]
impl_serde_for_element!(G2Point, Encoding::Base64, to_compressed, from_compressed);
#[cfg(feature = "serde")]
impl_serde_for_element!(GtElement, Encoding::Base64, to_bytes, from_bytes);
