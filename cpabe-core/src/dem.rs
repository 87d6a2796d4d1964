use alloc::boxed::Box;
use alloc::vec::Vec;

use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand_core::{CryptoRng, RngCore};
use sha2::Sha256;

use crate::secret_box::SecretBox;

pub(crate) const IV_SIZE: usize = 16;
pub(crate) const TAG_SIZE: usize = 32;
pub(crate) const BLOCK_SIZE: usize = 16;

const KEY_SIZE: usize = 32;
const KDF_INFO: &[u8] = b"CPABE-DEM";

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Failures of the symmetric layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DemError {
    /// The key derivation or MAC keying was given an invalid length.
    KeyDerivation,
    /// The RNG failed to produce an IV.
    Randomness,
    /// The authentication tag does not match.
    Authentication,
    /// The plaintext padding is malformed.
    Padding,
}

/// The output of [`DEM::encrypt`].
pub(crate) struct Sealed {
    pub(crate) iv: [u8; IV_SIZE],
    pub(crate) payload: Box<[u8]>,
    pub(crate) tag: [u8; TAG_SIZE],
}

fn kdf(seed: &[u8]) -> Result<SecretBox<[u8; 2 * KEY_SIZE]>, DemError> {
    let hk = Hkdf::<Sha256>::new(None, seed);
    let mut okm = SecretBox::new([0u8; 2 * KEY_SIZE]);
    hk.expand(KDF_INFO, okm.as_mut_secret())
        .map_err(|_| DemError::KeyDerivation)?;
    Ok(okm)
}

/// AES-256-CBC with PKCS#7 padding, authenticated with HMAC-SHA256 over `IV || ciphertext`.
pub(crate) struct DEM {
    cipher_key: SecretBox<[u8; KEY_SIZE]>,
    mac_key: SecretBox<[u8; KEY_SIZE]>,
}

impl DEM {
    /// Derives both keys from the canonical bytes of the blinding value.
    pub fn new(key_seed: &[u8]) -> Result<Self, DemError> {
        let okm = kdf(key_seed)?;
        let mut cipher_key = SecretBox::new([0u8; KEY_SIZE]);
        let mut mac_key = SecretBox::new([0u8; KEY_SIZE]);
        cipher_key
            .as_mut_secret()
            .copy_from_slice(&okm.as_secret()[..KEY_SIZE]);
        mac_key
            .as_mut_secret()
            .copy_from_slice(&okm.as_secret()[KEY_SIZE..]);
        Ok(Self {
            cipher_key,
            mac_key,
        })
    }

    fn tag(&self, iv: &[u8; IV_SIZE], payload: &[u8]) -> Result<HmacSha256, DemError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.mac_key.as_secret())
            .map_err(|_| DemError::KeyDerivation)?;
        mac.update(iv);
        mac.update(payload);
        Ok(mac)
    }

    pub fn encrypt(
        &self,
        rng: &mut (impl CryptoRng + RngCore),
        data: &[u8],
    ) -> Result<Sealed, DemError> {
        let mut iv = [0u8; IV_SIZE];
        rng.try_fill_bytes(&mut iv)
            .map_err(|_| DemError::Randomness)?;

        let payload = Aes256CbcEnc::new(self.cipher_key.as_secret().into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(data);

        let tag = self.tag(&iv, &payload)?.finalize().into_bytes().into();

        Ok(Sealed {
            iv,
            payload: payload.into_boxed_slice(),
            tag,
        })
    }

    pub fn decrypt(
        &self,
        iv: &[u8; IV_SIZE],
        payload: &[u8],
        tag: &[u8; TAG_SIZE],
    ) -> Result<Box<[u8]>, DemError> {
        // Constant-time tag comparison, before the padding is looked at.
        self.tag(iv, payload)?
            .verify_slice(tag)
            .map_err(|_| DemError::Authentication)?;

        let plaintext: Vec<u8> = Aes256CbcDec::new(self.cipher_key.as_secret().into(), iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(payload)
            .map_err(|_| DemError::Padding)?;
        Ok(plaintext.into_boxed_slice())
    }
}
