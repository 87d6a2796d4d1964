use bls12_381_plus::elliptic_curve::hash2curve::ExpandMsgXmd;
use bls12_381_plus::G2Projective;
use sha2::Sha256;

use crate::curve::G2Point;

/// Domain separation tag for hashing attribute strings into `G2`.
pub(crate) const ATTRIBUTE_DST: &[u8] = b"CPABE-V01-CS02-with-BLS12381G2_XMD:SHA-256_SSWU_RO_";

/// Hashes an attribute string into `G2` (RFC 9380, `expand_message_xmd` with SHA-256, SSWU).
///
/// The result has an unknown discrete logarithm,
/// and is the same for every party hashing the same attribute.
pub fn hash_to_g2(attribute: &str) -> G2Point {
    G2Point::from_backend_point(G2Projective::hash::<ExpandMsgXmd<Sha256>>(
        attribute.as_bytes(),
        ATTRIBUTE_DST,
    ))
}
