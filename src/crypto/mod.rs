//! Codec for the WeCom message-callback scheme.
//!
//! Signatures are hex SHA-1 over the lexicographically sorted
//! `[token, timestamp, nonce, ciphertext]` tuple. Payloads are
//! AES-256-CBC with the IV taken from the first 16 bytes of the key and
//! PKCS#7 padding applied at a 32-byte block, handled manually because
//! the upstream block size differs from the cipher's.

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use sha1::{Digest, Sha1};

use crate::error::CryptoError;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const ENCODING_KEY_LENGTH: usize = 43;
const PAD_BLOCK: usize = 32;
const RANDOM_PREFIX_LENGTH: usize = 16;

#[derive(Debug)]
pub struct CallbackCodec {
    token: String,
    key: [u8; 32],
    receiver_id: String,
}

impl CallbackCodec {
    /// Builds a codec from the callback token, the 43-character
    /// EncodingAESKey, and the upstream-assigned recipient identifier.
    pub fn new(token: &str, encoding_aes_key: &str, receiver_id: &str) -> Result<Self, CryptoError> {
        if encoding_aes_key.len() != ENCODING_KEY_LENGTH {
            return Err(CryptoError::BadKeyLength);
        }
        let decoded = STANDARD
            .decode(format!("{}=", encoding_aes_key))
            .map_err(|_| CryptoError::BadKeyLength)?;
        let key: [u8; 32] = decoded.try_into().map_err(|_| CryptoError::BadKeyLength)?;

        Ok(Self {
            token: token.to_string(),
            key,
            receiver_id: receiver_id.to_string(),
        })
    }

    /// Hex SHA-1 over the sorted `[token, timestamp, nonce, ciphertext]`.
    pub fn signature(&self, timestamp: &str, nonce: &str, ciphertext: &str) -> String {
        let mut parts = [self.token.as_str(), timestamp, nonce, ciphertext];
        parts.sort_unstable();

        let mut hasher = Sha1::new();
        for part in parts {
            hasher.update(part.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Recomputes the signature and compares in constant time.
    pub fn verify(&self, received: &str, timestamp: &str, nonce: &str, ciphertext: &str) -> bool {
        let expected = self.signature(timestamp, nonce, ciphertext);
        constant_time_eq(expected.as_bytes(), received.as_bytes())
    }

    /// Decrypts a base64 ciphertext and returns the embedded message.
    ///
    /// The decoded layout is `random16 | len4_BE | msg | receiver_id`; the
    /// trailing receiver must match the configured one.
    pub fn decrypt(&self, ciphertext_b64: &str) -> Result<String, CryptoError> {
        let ciphertext = STANDARD
            .decode(ciphertext_b64.trim())
            .map_err(|_| CryptoError::MalformedPayload)?;
        if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
            return Err(CryptoError::MalformedPayload);
        }

        let cipher = Aes256CbcDec::new_from_slices(&self.key, &self.key[..16])
            .map_err(|_| CryptoError::BadKeyLength)?;
        let padded = cipher
            .decrypt_padded_vec_mut::<NoPadding>(&ciphertext)
            .map_err(|_| CryptoError::MalformedPayload)?;

        let plain = strip_pkcs7(&padded)?;
        if plain.len() < RANDOM_PREFIX_LENGTH + 4 {
            return Err(CryptoError::MalformedPayload);
        }

        let len_bytes: [u8; 4] = plain[RANDOM_PREFIX_LENGTH..RANDOM_PREFIX_LENGTH + 4]
            .try_into()
            .map_err(|_| CryptoError::MalformedPayload)?;
        let msg_len = u32::from_be_bytes(len_bytes) as usize;

        let msg_start = RANDOM_PREFIX_LENGTH + 4;
        let msg_end = msg_start
            .checked_add(msg_len)
            .ok_or(CryptoError::MalformedPayload)?;
        if msg_end > plain.len() {
            return Err(CryptoError::MalformedPayload);
        }

        let receiver = &plain[msg_end..];
        if receiver != self.receiver_id.as_bytes() {
            return Err(CryptoError::RecipientMismatch);
        }

        String::from_utf8(plain[msg_start..msg_end].to_vec())
            .map_err(|_| CryptoError::MalformedPayload)
    }

    /// Packs and encrypts a message; inverse of [`CallbackCodec::decrypt`].
    pub fn encrypt(&self, message: &str) -> Result<String, CryptoError> {
        let mut random = [0u8; RANDOM_PREFIX_LENGTH];
        OsRng.fill_bytes(&mut random);

        let msg = message.as_bytes();
        let mut plain =
            Vec::with_capacity(RANDOM_PREFIX_LENGTH + 4 + msg.len() + self.receiver_id.len());
        plain.extend_from_slice(&random);
        plain.extend_from_slice(&(msg.len() as u32).to_be_bytes());
        plain.extend_from_slice(msg);
        plain.extend_from_slice(self.receiver_id.as_bytes());

        apply_pkcs7(&mut plain);

        let cipher = Aes256CbcEnc::new_from_slices(&self.key, &self.key[..16])
            .map_err(|_| CryptoError::BadKeyLength)?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<NoPadding>(&plain);

        Ok(STANDARD.encode(ciphertext))
    }
}

/// PKCS#7 with the protocol's 32-byte block.
fn apply_pkcs7(buf: &mut Vec<u8>) {
    let pad = PAD_BLOCK - (buf.len() % PAD_BLOCK);
    buf.extend(std::iter::repeat(pad as u8).take(pad));
}

fn strip_pkcs7(buf: &[u8]) -> Result<&[u8], CryptoError> {
    let pad = *buf.last().ok_or(CryptoError::InvalidPadding)? as usize;
    if pad == 0 || pad > PAD_BLOCK || pad > buf.len() {
        return Err(CryptoError::InvalidPadding);
    }
    let (body, padding) = buf.split_at(buf.len() - pad);
    if padding.iter().any(|&b| b as usize != pad) {
        return Err(CryptoError::InvalidPadding);
    }
    Ok(body)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
