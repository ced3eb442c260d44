//! Payload encryption for Web Push (RFC 8291, `aes128gcm` coding from
//! RFC 8188).
//!
//! Every message gets a fresh ephemeral ECDH keypair and a fresh random
//! salt, so two encryptions of the same payload never share bytes. The
//! whole message fits in a single record; the push service caps the body
//! at 4096 bytes and RFC 8291 forbids splitting across records.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Nonce};
use hkdf::Hkdf;
use p256::ecdh::EphemeralSecret;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::WebPushError;
use crate::keys::ClientKeys;

const RECORD_SIZE: u32 = 4096;
const SALT_LEN: usize = 16;
const TAG_LEN: usize = 16;
const PUBLIC_KEY_LEN: usize = 65;
/// salt, record size, key id length, key id.
const HEADER_LEN: usize = SALT_LEN + 4 + 1 + PUBLIC_KEY_LEN;
/// What is left of the 4096 byte body after the header, the padding
/// delimiter and the GCM tag.
pub const MAX_PLAINTEXT_LEN: usize = RECORD_SIZE as usize - HEADER_LEN - TAG_LEN - 1;

/// Marks the end of plaintext in the final (here: only) record.
const PAD_DELIMITER: u8 = 0x02;

/// Encrypts `plaintext` for the subscription owning `keys` and returns the
/// complete `aes128gcm` body: header, then ciphertext with the GCM tag.
pub fn encrypt(keys: &ClientKeys, plaintext: &[u8]) -> Result<Vec<u8>, WebPushError> {
    if plaintext.len() > MAX_PLAINTEXT_LEN {
        return Err(WebPushError::PayloadTooLarge {
            size: plaintext.len(),
            limit: MAX_PLAINTEXT_LEN,
        });
    }

    let ephemeral = EphemeralSecret::random(&mut OsRng);
    let shared = ephemeral.diffie_hellman(keys.public());
    let server_public = ephemeral.public_key().to_encoded_point(false);

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let ua_public = keys.public().to_encoded_point(false);
    let (mut cek, nonce) = derive_keys(
        shared.raw_secret_bytes().as_slice(),
        keys.auth(),
        ua_public.as_bytes(),
        server_public.as_bytes(),
        &salt,
    )?;

    let cipher = Aes128Gcm::new_from_slice(&cek)
        .map_err(|_| WebPushError::Crypto("content encryption key has the wrong length"))?;
    cek.zeroize();

    let mut record = Vec::with_capacity(plaintext.len() + 1);
    record.extend_from_slice(plaintext);
    record.push(PAD_DELIMITER);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), record.as_slice())
        .map_err(|_| WebPushError::Crypto("AES-128-GCM encryption failed"))?;
    record.zeroize();

    let mut body = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    body.extend_from_slice(&salt);
    body.extend_from_slice(&RECORD_SIZE.to_be_bytes());
    body.push(PUBLIC_KEY_LEN as u8);
    body.extend_from_slice(server_public.as_bytes());
    body.extend_from_slice(&ciphertext);

    Ok(body)
}

/// Inverse of [`encrypt`], from the subscriber's side. Exists so tests can
/// prove a delivery is readable with nothing but the subscription's private
/// key and auth secret.
pub fn decrypt(
    recipient_key: &SecretKey,
    auth: &[u8; 16],
    body: &[u8],
) -> Result<Vec<u8>, WebPushError> {
    if body.len() < HEADER_LEN + TAG_LEN + 1 {
        return Err(WebPushError::Crypto("message is too short"));
    }

    let salt: [u8; SALT_LEN] = body[..SALT_LEN]
        .try_into()
        .map_err(|_| WebPushError::Crypto("message is too short"))?;
    let record_size = u32::from_be_bytes(
        body[SALT_LEN..SALT_LEN + 4]
            .try_into()
            .map_err(|_| WebPushError::Crypto("message is too short"))?,
    );
    if body[SALT_LEN + 4] as usize != PUBLIC_KEY_LEN {
        return Err(WebPushError::Crypto("unexpected key id length"));
    }
    let key_id = &body[SALT_LEN + 5..HEADER_LEN];
    let ciphertext = &body[HEADER_LEN..];
    if ciphertext.len() > record_size as usize {
        return Err(WebPushError::Crypto("message spans multiple records"));
    }

    let sender_public = PublicKey::from_sec1_bytes(key_id)
        .map_err(|_| WebPushError::Crypto("sender key id is not a valid P-256 point"))?;
    let shared = p256::ecdh::diffie_hellman(
        recipient_key.to_nonzero_scalar(),
        sender_public.as_affine(),
    );

    let ua_public = recipient_key.public_key().to_encoded_point(false);
    let (mut cek, nonce) = derive_keys(
        shared.raw_secret_bytes().as_slice(),
        auth,
        ua_public.as_bytes(),
        key_id,
        &salt,
    )?;

    let cipher = Aes128Gcm::new_from_slice(&cek)
        .map_err(|_| WebPushError::Crypto("content encryption key has the wrong length"))?;
    cek.zeroize();

    let mut record = cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext)
        .map_err(|_| WebPushError::Crypto("AES-128-GCM authentication failed"))?;

    let end = record
        .iter()
        .rposition(|&b| b != 0)
        .ok_or(WebPushError::Crypto("record is all padding"))?;
    if record[end] != PAD_DELIMITER {
        return Err(WebPushError::Crypto("missing final record delimiter"));
    }
    record.truncate(end);

    Ok(record)
}

/// RFC 8291 key schedule: the ECDH secret and auth secret yield the input
/// keying material, which salt-expands into the content encryption key and
/// nonce. `ua_public` and `as_public` are uncompressed SEC1 points.
fn derive_keys(
    ecdh_secret: &[u8],
    auth: &[u8; 16],
    ua_public: &[u8],
    as_public: &[u8],
    salt: &[u8; SALT_LEN],
) -> Result<([u8; 16], [u8; 12]), WebPushError> {
    let mut key_info = Vec::with_capacity(14 + 2 * PUBLIC_KEY_LEN);
    key_info.extend_from_slice(b"WebPush: info\0");
    key_info.extend_from_slice(ua_public);
    key_info.extend_from_slice(as_public);

    let mut ikm = [0u8; 32];
    Hkdf::<Sha256>::new(Some(auth.as_slice()), ecdh_secret)
        .expand(&key_info, &mut ikm)
        .map_err(|_| WebPushError::Crypto("HKDF expand failed for the keying material"))?;

    let prk = Hkdf::<Sha256>::new(Some(salt.as_slice()), &ikm);
    ikm.zeroize();

    let mut cek = [0u8; 16];
    prk.expand(b"Content-Encoding: aes128gcm\0", &mut cek)
        .map_err(|_| WebPushError::Crypto("HKDF expand failed for the content key"))?;
    let mut nonce = [0u8; 12];
    prk.expand(b"Content-Encoding: nonce\0", &mut nonce)
        .map_err(|_| WebPushError::Crypto("HKDF expand failed for the nonce"))?;

    Ok((cek, nonce))
}
