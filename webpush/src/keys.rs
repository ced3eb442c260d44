use p256::PublicKey;

use crate::base64url;
use crate::error::WebPushError;

/// Key material from a browser `PushSubscription`: the client's P-256 ECDH
/// public key (`p256dh`) and its 16 byte authentication secret (`auth`),
/// both base64url encoded on the wire.
#[derive(Debug, Clone)]
pub struct ClientKeys {
    public: PublicKey,
    auth: [u8; 16],
}

impl ClientKeys {
    /// Decodes and validates subscription keys. Everything is checked here so
    /// that encryption never starts from malformed key material.
    pub fn decode(p256dh: &str, auth: &str) -> Result<Self, WebPushError> {
        let point = base64url::decode(p256dh).map_err(|_| {
            WebPushError::InvalidSubscription("p256dh is not valid base64url".into())
        })?;
        if point.len() != 65 {
            return Err(WebPushError::InvalidSubscription(format!(
                "p256dh must decode to 65 bytes, got {}",
                point.len()
            )));
        }
        if point[0] != 0x04 {
            return Err(WebPushError::InvalidSubscription(
                "p256dh is not an uncompressed EC point".into(),
            ));
        }
        let public = PublicKey::from_sec1_bytes(&point).map_err(|_| {
            WebPushError::InvalidSubscription("p256dh is not a valid P-256 point".into())
        })?;

        let auth_bytes = base64url::decode(auth)
            .map_err(|_| WebPushError::InvalidSubscription("auth is not valid base64url".into()))?;
        let auth = <[u8; 16]>::try_from(auth_bytes.as_slice()).map_err(|_| {
            WebPushError::InvalidSubscription(format!(
                "auth must decode to 16 bytes, got {}",
                auth_bytes.len()
            ))
        })?;

        Ok(Self { public, auth })
    }

    pub(crate) fn public(&self) -> &PublicKey {
        &self.public
    }

    pub(crate) fn auth(&self) -> &[u8; 16] {
        &self.auth
    }
}
