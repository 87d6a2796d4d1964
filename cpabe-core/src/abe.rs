//! The high-level attribute-based encryption API.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use log::{debug, warn};
use rand_core::{CryptoRng, RngCore};

#[cfg(feature = "default-rng")]
use rand_core::OsRng;

use crate::access::AccessStructure;
use crate::ciphertext::Ciphertext;
use crate::curve::{pairing, CurveScalar, G1Point, G2Point, GtElement, RandomnessError};
use crate::dem::{DemError, DEM};
use crate::hashing::hash_to_g2;
use crate::keys::{MasterPublicKey, MasterSecretKey, UserKey};
use crate::lsss;
use crate::params::Parameters;

/// Errors that can happen when issuing a user key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyGenerationError {
    /// The same attribute was requested more than once.
    DuplicateAttribute(String),
    /// The RNG failed.
    Randomness,
}

impl fmt::Display for KeyGenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateAttribute(attribute) => {
                write!(f, "Attribute requested more than once: {}", attribute)
            }
            Self::Randomness => write!(f, "Random number generator failure"),
        }
    }
}

/// Errors that can happen when encrypting a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptionError {
    /// The access structure has no rows or no columns.
    EmptyPolicy,
    /// An attribute labels more than one row of the access structure.
    InsecurePolicy(String),
    /// The RNG failed.
    Randomness,
    /// The symmetric layer could not be keyed.
    SymmetricKey,
}

impl fmt::Display for EncryptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPolicy => write!(f, "Access structure is empty"),
            Self::InsecurePolicy(attribute) => write!(
                f,
                "Access structure is insecure: attribute {} labels several rows",
                attribute
            ),
            Self::Randomness => write!(f, "Random number generator failure"),
            Self::SymmetricKey => write!(f, "Failed to derive the symmetric key"),
        }
    }
}

/// Errors that can happen when decrypting a ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptionError {
    /// The key's attributes do not satisfy the access structure.
    InsufficientAttributes,
    /// The key satisfied the structure, but the payload did not authenticate or unpad.
    DecryptionFailed,
    /// The ciphertext is structurally inconsistent.
    MalformedCiphertext,
}

impl fmt::Display for DecryptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Both report the same message.
            Self::InsufficientAttributes | Self::DecryptionFailed => {
                write!(f, "Decryption failed")
            }
            Self::MalformedCiphertext => write!(f, "Ciphertext is malformed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for KeyGenerationError {}

#[cfg(feature = "std")]
impl std::error::Error for EncryptionError {}

#[cfg(feature = "std")]
impl std::error::Error for DecryptionError {}

impl From<RandomnessError> for KeyGenerationError {
    fn from(_: RandomnessError) -> Self {
        Self::Randomness
    }
}

impl From<RandomnessError> for EncryptionError {
    fn from(_: RandomnessError) -> Self {
        Self::Randomness
    }
}

impl From<DemError> for EncryptionError {
    fn from(error: DemError) -> Self {
        match error {
            DemError::Randomness => Self::Randomness,
            _ => Self::SymmetricKey,
        }
    }
}

/// Generates the authority's key pair.
///
/// `params` is accepted for symmetry with [`keygen_with_rng`];
/// the group and generators are fixed.
pub fn setup_with_rng(
    rng: &mut (impl CryptoRng + RngCore),
    params: &Parameters,
) -> Result<(MasterPublicKey, MasterSecretKey), RandomnessError> {
    let alpha = CurveScalar::random_nonzero(rng)?;
    let a = CurveScalar::random_nonzero(rng)?;

    let g1 = G1Point::generator();
    let g2 = G2Point::generator();

    let secret = &g2 * &alpha;
    let p_g2 = &g2 * &a;
    let p_gt = &pairing(&g1, &g2) * &alpha;

    debug!(
        "Master key pair generated (attribute universe of {} entries)",
        params.attribute_universe().len()
    );

    Ok((MasterPublicKey { p_g2, p_gt }, MasterSecretKey::new(secret)))
}

/// Issues a key for the given attribute set.
///
/// Each call uses a fresh blinding scalar, so two keys for the same set
/// are unrelated bytestrings that decrypt the same ciphertexts.
/// An empty attribute set is allowed (the key satisfies no policy).
pub fn keygen_with_rng<S: AsRef<str>>(
    rng: &mut (impl CryptoRng + RngCore),
    params: &Parameters,
    msk: &MasterSecretKey,
    mpk: &MasterPublicKey,
    attributes: &[S],
) -> Result<UserKey, KeyGenerationError> {
    let mut attrib_to_index = BTreeMap::new();
    for (index, attribute) in attributes.iter().enumerate() {
        let attribute = attribute.as_ref();
        if attrib_to_index.insert(attribute.to_string(), index).is_some() {
            return Err(KeyGenerationError::DuplicateAttribute(attribute.to_string()));
        }
        if !params.is_known_attribute(attribute) {
            warn!("Issuing a key for an attribute outside the universe: {}", attribute);
        }
    }

    let t = CurveScalar::random_nonzero(rng)?;

    let k = msk.as_point() + &(&mpk.p_g2 * &t);
    let l = &G1Point::generator() * &t;
    let kx: Vec<G2Point> = attributes
        .iter()
        .map(|attribute| &hash_to_g2(attribute.as_ref()) * &t)
        .collect();

    debug!("User key issued for {} attributes", attributes.len());

    Ok(UserKey {
        k,
        l,
        kx,
        attrib_to_index,
    })
}

/// Encrypts `plaintext` so that only keys satisfying `access_structure` can decrypt it.
pub fn encrypt_with_rng(
    rng: &mut (impl CryptoRng + RngCore),
    mpk: &MasterPublicKey,
    access_structure: &AccessStructure,
    plaintext: &[u8],
) -> Result<Ciphertext, EncryptionError> {
    let rows = access_structure.rows();
    let cols = access_structure.cols();
    if rows == 0 || cols == 0 {
        return Err(EncryptionError::EmptyPolicy);
    }
    if let Some(attribute) = access_structure.repeated_attribute() {
        return Err(EncryptionError::InsecurePolicy(attribute.to_string()));
    }

    let v = (0..cols)
        .map(|_| CurveScalar::random_nonzero(rng))
        .collect::<Result<Vec<_>, _>>()?;
    let lambda = lsss::shares(access_structure.matrix(), &v);

    let key_gt = GtElement::random(rng)?;
    let c = &(&mpk.p_gt * &v[0]) + &key_gt;
    let c_prime = &G1Point::generator() * &v[0];

    let dem = DEM::new(&key_gt.to_bytes())?;
    let sealed = dem.encrypt(rng, plaintext)?;

    let mut ci = Vec::with_capacity(rows);
    let mut di = Vec::with_capacity(rows);
    for (lambda_i, attribute) in lambda.iter().zip(access_structure.attributes()) {
        let r_i = CurveScalar::random_nonzero(rng)?;
        di.push(&G1Point::generator() * &r_i);
        ci.push(&(&mpk.p_g2 * lambda_i) + &(&hash_to_g2(attribute) * &(-&r_i)));
    }

    debug!("Message encrypted under a {}x{} access structure", rows, cols);

    Ok(Ciphertext {
        c,
        c_prime,
        ci,
        di,
        access_structure: access_structure.clone(),
        iv: sealed.iv,
        payload: sealed.payload,
        tag: sealed.tag,
    })
}

/// Decrypts a ciphertext with a user key issued under `mpk`.
///
/// Fails with [`DecryptionError::InsufficientAttributes`] if the key's attributes
/// do not satisfy the ciphertext's access structure, and with
/// [`DecryptionError::DecryptionFailed`] if the key was not issued under `mpk`
/// or the payload has been tampered with.
/// Both have the same message.
pub fn decrypt(
    mpk: &MasterPublicKey,
    key: &UserKey,
    ciphertext: &Ciphertext,
) -> Result<Box<[u8]>, DecryptionError> {
    ciphertext
        .check_consistency()
        .map_err(|_| DecryptionError::MalformedCiphertext)?;

    let access_structure = &ciphertext.access_structure;
    let coefficients = access_structure
        .reconstruction_coefficients(|attribute| key.has_attribute(attribute))
        .ok_or(DecryptionError::InsufficientAttributes)?;

    // e(g1, K) = P_gt + e(L, P_g2) holds exactly for keys issued under `mpk`.
    let expected = &mpk.p_gt + &pairing(&key.l, &mpk.p_g2);
    if pairing(&G1Point::generator(), &key.k) != expected {
        return Err(DecryptionError::DecryptionFailed);
    }

    debug!("Decrypting with {} contributing rows", coefficients.len());

    let mut blinding = GtElement::identity();
    for (row, alpha) in coefficients {
        let attribute = access_structure
            .row_attribute(row)
            .ok_or(DecryptionError::MalformedCiphertext)?;
        let kx = key
            .attribute_component(attribute)
            .ok_or(DecryptionError::InsufficientAttributes)?;
        let term = &pairing(&key.l, &ciphertext.ci[row]) + &pairing(&ciphertext.di[row], kx);
        blinding = &blinding + &(&term * &alpha);
    }

    let key_gt = &(&ciphertext.c + &blinding) - &pairing(&ciphertext.c_prime, &key.k);

    let dem = DEM::new(&key_gt.to_bytes()).map_err(|_| DecryptionError::DecryptionFailed)?;
    dem.decrypt(&ciphertext.iv, &ciphertext.payload, &ciphertext.tag)
        .map_err(|_| DecryptionError::DecryptionFailed)
}

/// Generates the authority's key pair using the default RNG.
#[cfg(feature = "default-rng")]
pub fn setup(params: &Parameters) -> Result<(MasterPublicKey, MasterSecretKey), RandomnessError> {
    setup_with_rng(&mut OsRng, params)
}

/// Issues a key for the given attribute set using the default RNG.
#[cfg(feature = "default-rng")]
pub fn keygen<S: AsRef<str>>(
    params: &Parameters,
    msk: &MasterSecretKey,
    mpk: &MasterPublicKey,
    attributes: &[S],
) -> Result<UserKey, KeyGenerationError> {
    keygen_with_rng(&mut OsRng, params, msk, mpk, attributes)
}

/// Encrypts a message using the default RNG.
#[cfg(feature = "default-rng")]
pub fn encrypt(
    mpk: &MasterPublicKey,
    access_structure: &AccessStructure,
    plaintext: &[u8],
) -> Result<Ciphertext, EncryptionError> {
    encrypt_with_rng(&mut OsRng, mpk, access_structure, plaintext)
}

#[cfg(test)]
mod tests {

    use alloc::string::ToString;
    use alloc::sync::Arc;
    use alloc::vec;
    use alloc::vec::Vec;

    use rand_core::{CryptoRng, Error as RngError, OsRng, RngCore};

    use super::{
        decrypt, encrypt, encrypt_with_rng, keygen, keygen_with_rng, setup, setup_with_rng,
        DecryptionError, EncryptionError, KeyGenerationError,
    };
    use crate::access::AccessStructure;
    use crate::curve::RandomnessError;
    use crate::keys::{MasterPublicKey, MasterSecretKey};
    use crate::params::Parameters;

    /// An RNG that always fails, to check that errors are propagated.
    struct FailingRng;

    impl RngCore for FailingRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0)
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), RngError> {
            Err(RngError::from(core::num::NonZeroU32::new(RngError::CUSTOM_START).unwrap()))
        }
    }

    impl CryptoRng for FailingRng {}

    fn authority() -> (Parameters, MasterPublicKey, MasterSecretKey) {
        let params = Parameters::new();
        let (mpk, msk) = setup(&params).unwrap();
        (params, mpk, msk)
    }

    #[test]
    fn test_simple_api() {
        /*
        The authority sets up the system and issues a key for two attributes.
        A data owner encrypts under "dept:HR AND role:manager".
        The key holder decrypts; a holder of "dept:HR" alone cannot.
        */

        let (params, mpk, msk) = authority();

        let manager_key = keygen(&params, &msk, &mpk, &["dept:HR", "role:manager"]).unwrap();
        let hr_key = keygen(&params, &msk, &mpk, &["dept:HR"]).unwrap();

        let policy = AccessStructure::from_policy("dept:HR AND role:manager").unwrap();
        let plaintext = b"hello world";
        let ciphertext = encrypt(&mpk, &policy, plaintext).unwrap();

        let decrypted = decrypt(&mpk, &manager_key, &ciphertext).unwrap();
        assert_eq!(&decrypted as &[u8], plaintext);

        assert_eq!(
            decrypt(&mpk, &hr_key, &ciphertext),
            Err(DecryptionError::InsufficientAttributes)
        );
    }

    #[test]
    fn or_policy() {
        let (params, mpk, msk) = authority();
        let key = keygen(&params, &msk, &mpk, &["role:manager"]).unwrap();

        let policy = AccessStructure::from_policy("role:admin OR role:manager").unwrap();
        let ciphertext = encrypt(&mpk, &policy, b"quarterly report").unwrap();
        let decrypted = decrypt(&mpk, &key, &ciphertext).unwrap();
        assert_eq!(&decrypted as &[u8], b"quarterly report");

        let other = keygen(&params, &msk, &mpk, &["role:intern"]).unwrap();
        assert_eq!(
            decrypt(&mpk, &other, &ciphertext),
            Err(DecryptionError::InsufficientAttributes)
        );
    }

    #[test]
    fn nested_policy_with_extra_attributes() {
        let (params, mpk, msk) = authority();
        let policy = AccessStructure::from_policy(
            "(dept:HR AND role:manager) OR (dept:IT AND (role:admin OR role:lead))",
        )
        .unwrap();
        let ciphertext = encrypt(&mpk, &policy, b"payload").unwrap();

        let it_lead =
            keygen(&params, &msk, &mpk, &["dept:IT", "role:lead", "site:berlin"]).unwrap();
        let decrypted = decrypt(&mpk, &it_lead, &ciphertext).unwrap();
        assert_eq!(&decrypted as &[u8], b"payload");

        let hr_lead = keygen(&params, &msk, &mpk, &["dept:HR", "role:lead"]).unwrap();
        assert_eq!(
            decrypt(&mpk, &hr_lead, &ciphertext),
            Err(DecryptionError::InsufficientAttributes)
        );
    }

    #[test]
    fn message_lengths() {
        let (params, mpk, msk) = authority();
        let key = keygen(&params, &msk, &mpk, &["a"]).unwrap();
        let policy = AccessStructure::from_policy("a").unwrap();

        for len in [0usize, 1, 15, 16, 17, 1000] {
            let plaintext: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let ciphertext = encrypt(&mpk, &policy, &plaintext).unwrap();
            assert_eq!(ciphertext.payload().len() % 16, 0);
            assert!(ciphertext.payload().len() > len);
            let decrypted = decrypt(&mpk, &key, &ciphertext).unwrap();
            assert_eq!(&decrypted as &[u8], &plaintext[..]);
        }
    }

    #[test]
    fn keys_are_unlinkable() {
        let (params, mpk, msk) = authority();
        let attributes = ["dept:HR", "role:manager"];
        let key1 = keygen(&params, &msk, &mpk, &attributes).unwrap();
        let key2 = keygen(&params, &msk, &mpk, &attributes).unwrap();

        assert!(key1 != key2);
        assert_ne!(key1.l.to_compressed(), key2.l.to_compressed());
        assert_ne!(key1.k.to_compressed(), key2.k.to_compressed());

        let policy = AccessStructure::from_policy("dept:HR AND role:manager").unwrap();
        let ciphertext = encrypt(&mpk, &policy, b"same for both").unwrap();
        assert_eq!(
            decrypt(&mpk, &key1, &ciphertext).unwrap(),
            decrypt(&mpk, &key2, &ciphertext).unwrap()
        );
    }

    #[test]
    fn keys_from_another_authority_fail() {
        let (params, mpk, msk) = authority();
        let (_, other_mpk, other_msk) = authority();
        let foreign_key = keygen(&params, &other_msk, &other_mpk, &["a"]).unwrap();

        let policy = AccessStructure::from_policy("a").unwrap();
        let ciphertext = encrypt(&mpk, &policy, b"secret").unwrap();
        assert_eq!(
            decrypt(&mpk, &foreign_key, &ciphertext),
            Err(DecryptionError::DecryptionFailed)
        );

        // A genuine key presented together with another authority's public key
        let key = keygen(&params, &msk, &mpk, &["a"]).unwrap();
        assert_eq!(
            decrypt(&other_mpk, &key, &ciphertext),
            Err(DecryptionError::DecryptionFailed)
        );
        assert_eq!(&decrypt(&mpk, &key, &ciphertext).unwrap() as &[u8], b"secret");
    }

    #[test]
    fn empty_attribute_set() {
        let (params, mpk, msk) = authority();
        let key = keygen::<&str>(&params, &msk, &mpk, &[]).unwrap();
        assert_eq!(key.attributes().count(), 0);

        let policy = AccessStructure::from_policy("a OR b").unwrap();
        let ciphertext = encrypt(&mpk, &policy, b"secret").unwrap();
        assert_eq!(
            decrypt(&mpk, &key, &ciphertext),
            Err(DecryptionError::InsufficientAttributes)
        );
    }

    #[test]
    fn duplicate_attributes_in_key_request() {
        let (params, mpk, msk) = authority();
        // Checked before any randomness is requested.
        assert_eq!(
            keygen_with_rng(&mut FailingRng, &params, &msk, &mpk, &["a", "b", "a"]).err(),
            Some(KeyGenerationError::DuplicateAttribute("a".to_string()))
        );
    }

    #[test]
    fn policy_checks_precede_randomness() {
        let (_params, mpk, _msk) = authority();

        let repeated = AccessStructure::from_policy("a AND (a OR b)").unwrap();
        assert_eq!(
            encrypt_with_rng(&mut FailingRng, &mpk, &repeated, b"x"),
            Err(EncryptionError::InsecurePolicy("a".to_string()))
        );

        let empty = AccessStructure::from_signed_rows(vec![], vec![]).unwrap();
        assert_eq!(
            encrypt_with_rng(&mut FailingRng, &mpk, &empty, b"x"),
            Err(EncryptionError::EmptyPolicy)
        );

        let no_columns =
            AccessStructure::from_signed_rows(vec![vec![]], vec!["a".to_string()]).unwrap();
        assert_eq!(
            encrypt_with_rng(&mut FailingRng, &mpk, &no_columns, b"x"),
            Err(EncryptionError::EmptyPolicy)
        );
    }

    #[test]
    fn rng_failures_are_reported() {
        let params = Parameters::new();
        assert_eq!(
            setup_with_rng(&mut FailingRng, &params).err(),
            Some(RandomnessError)
        );

        let (mpk, msk) = setup_with_rng(&mut OsRng, &params).unwrap();
        assert_eq!(
            keygen_with_rng(&mut FailingRng, &params, &msk, &mpk, &["a"]).err(),
            Some(KeyGenerationError::Randomness)
        );

        let policy = AccessStructure::from_policy("a").unwrap();
        assert_eq!(
            encrypt_with_rng(&mut FailingRng, &mpk, &policy, b"x"),
            Err(EncryptionError::Randomness)
        );
    }

    #[test]
    fn unknown_attributes_are_still_issued() {
        let params = Parameters::with_attribute_universe(["dept:HR"]);
        let (mpk, msk) = setup(&params).unwrap();
        let key = keygen(&params, &msk, &mpk, &["dept:HR", "dept:unknown"]).unwrap();
        assert!(key.has_attribute("dept:unknown"));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let (params, mpk, msk) = authority();
        let key = keygen(&params, &msk, &mpk, &["a"]).unwrap();
        let policy = AccessStructure::from_policy("a").unwrap();
        let ciphertext = encrypt(&mpk, &policy, b"peace at dawn, twice over").unwrap();

        for position in 0..ciphertext.payload.len() {
            let mut tampered = ciphertext.clone();
            let mut payload = tampered.payload.to_vec();
            payload[position] ^= 0x01;
            tampered.payload = payload.into_boxed_slice();
            assert_eq!(
                decrypt(&mpk, &key, &tampered),
                Err(DecryptionError::DecryptionFailed)
            );
        }

        let mut tampered = ciphertext.clone();
        tampered.iv[0] ^= 0x01;
        assert_eq!(
            decrypt(&mpk, &key, &tampered),
            Err(DecryptionError::DecryptionFailed)
        );

        let mut tampered = ciphertext;
        tampered.c = &tampered.c + &tampered.c;
        assert_eq!(
            decrypt(&mpk, &key, &tampered),
            Err(DecryptionError::DecryptionFailed)
        );
    }

    #[test]
    fn malformed_ciphertext() {
        let (params, mpk, msk) = authority();
        let key = keygen(&params, &msk, &mpk, &["a", "b"]).unwrap();
        let policy = AccessStructure::from_policy("a AND b").unwrap();
        let ciphertext = encrypt(&mpk, &policy, b"secret").unwrap();

        let mut truncated = ciphertext.clone();
        truncated.ci.pop();
        assert_eq!(
            decrypt(&mpk, &key, &truncated),
            Err(DecryptionError::MalformedCiphertext)
        );

        let mut short_payload = ciphertext;
        short_payload.payload = vec![0u8; 7].into_boxed_slice();
        assert_eq!(
            decrypt(&mpk, &key, &short_payload),
            Err(DecryptionError::MalformedCiphertext)
        );
    }

    #[test]
    fn error_messages_do_not_leak_the_cause() {
        assert_eq!(
            DecryptionError::InsufficientAttributes.to_string(),
            DecryptionError::DecryptionFailed.to_string()
        );
    }

    #[test]
    fn concurrent_decryption() {
        let (params, mpk, msk) = authority();
        let key = Arc::new(keygen(&params, &msk, &mpk, &["a", "b"]).unwrap());
        let policy = AccessStructure::from_policy("a AND b").unwrap();
        let ciphertext = Arc::new(encrypt(&mpk, &policy, b"shared").unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let key = Arc::clone(&key);
                let ciphertext = Arc::clone(&ciphertext);
                std::thread::spawn(move || decrypt(&mpk, &key, &ciphertext).unwrap())
            })
            .collect();

        for handle in handles {
            assert_eq!(&handle.join().unwrap() as &[u8], b"shared");
        }
    }
}
