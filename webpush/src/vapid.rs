use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use url::Url;

use crate::base64url;
use crate::error::WebPushError;

/// Tokens are minted per delivery, so the expiry stays well inside the
/// 24 hour maximum that push services accept.
const TOKEN_LIFETIME: Duration = Duration::hours(12);

/// VAPID keypair for push service authentication (RFC 8292).
///
/// The private key is stored as base64url PKCS8 DER, the public key as the
/// base64url uncompressed SEC1 point (65 bytes decoded). The public key
/// doubles as the `applicationServerKey` browsers use when subscribing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VapidKeys {
    private_key_b64: String,
    public_key_b64: String,
}

impl VapidKeys {
    /// Generates a fresh P-256 keypair.
    pub fn generate() -> Result<Self, WebPushError> {
        let signing_key = SigningKey::random(&mut OsRng);
        let der = signing_key
            .to_pkcs8_der()
            .map_err(|_| WebPushError::Crypto("failed to encode private key as PKCS8"))?;

        Ok(Self {
            private_key_b64: base64url::encode(der.as_bytes()),
            public_key_b64: encode_public_key(&signing_key),
        })
    }

    pub fn public_key_base64url(&self) -> &str {
        &self.public_key_b64
    }

    pub fn private_key_base64url(&self) -> &str {
        &self.private_key_b64
    }
}

fn encode_public_key(signing_key: &SigningKey) -> String {
    let point = signing_key.verifying_key().to_encoded_point(false);
    base64url::encode(point.as_bytes())
}

/// Accepts PKCS8 DER (the format [`VapidKeys::generate`] emits) and falls
/// back to a raw 32 byte scalar for keys generated by other tooling.
fn decode_private_key(private_key_b64: &str) -> Result<SigningKey, WebPushError> {
    let bytes = base64url::decode(private_key_b64)
        .map_err(|_| WebPushError::InvalidVapidKey("private key is not valid base64url".into()))?;

    if bytes.len() == 32 {
        return SigningKey::from_slice(&bytes)
            .map_err(|_| WebPushError::InvalidVapidKey("private key is not a valid P-256 scalar".into()));
    }

    SigningKey::from_pkcs8_der(&bytes).map_err(|_| {
        WebPushError::InvalidVapidKey(
            "private key is neither PKCS8 DER nor a raw 32 byte scalar".into(),
        )
    })
}

#[derive(Serialize)]
struct JwtHeader {
    typ: &'static str,
    alg: &'static str,
}

#[derive(Serialize, Deserialize)]
pub struct JwtClaims {
    pub aud: String,
    pub exp: i64,
    pub sub: String,
}

/// Signs `Authorization` headers for push service requests.
///
/// Built once at startup from configured key material and shared across
/// deliveries; every call mints a fresh ES256 JWT scoped to the endpoint's
/// origin.
#[derive(Debug)]
pub struct VapidSigner {
    signing_key: SigningKey,
    public_key_b64: String,
    subject: String,
}

impl VapidSigner {
    pub fn new(
        private_key_b64: &str,
        public_key_b64: &str,
        subject: &str,
    ) -> Result<Self, WebPushError> {
        let signing_key = decode_private_key(private_key_b64)?;

        let public = base64url::decode(public_key_b64)
            .map_err(|_| WebPushError::InvalidVapidKey("public key is not valid base64url".into()))?;
        if public.len() != 65 || public[0] != 0x04 {
            return Err(WebPushError::InvalidVapidKey(
                "public key must be a 65 byte uncompressed P-256 point".into(),
            ));
        }
        if public != signing_key.verifying_key().to_encoded_point(false).as_bytes() {
            return Err(WebPushError::InvalidVapidKey(
                "public key does not match the private key".into(),
            ));
        }

        if !subject.starts_with("mailto:") && !subject.starts_with("https://") {
            return Err(WebPushError::InvalidVapidKey(format!(
                "subject must be a mailto: or https: URI, got {subject:?}"
            )));
        }

        Ok(Self {
            signing_key,
            public_key_b64: public_key_b64.to_string(),
            subject: subject.to_string(),
        })
    }

    pub fn from_keys(keys: &VapidKeys, subject: &str) -> Result<Self, WebPushError> {
        Self::new(
            keys.private_key_base64url(),
            keys.public_key_base64url(),
            subject,
        )
    }

    /// The `applicationServerKey` browsers must subscribe with.
    pub fn public_key_base64url(&self) -> &str {
        &self.public_key_b64
    }

    /// Builds the `Authorization: vapid t=<jwt>, k=<key>` header value for
    /// one endpoint. The token audience is the endpoint's origin, never the
    /// full URL.
    pub fn authorization(&self, endpoint: &Url) -> Result<String, WebPushError> {
        let claims = JwtClaims {
            aud: endpoint_audience(endpoint)?,
            exp: (OffsetDateTime::now_utc() + TOKEN_LIFETIME).unix_timestamp(),
            sub: self.subject.clone(),
        };
        let token = self.sign_jwt(&claims)?;

        Ok(format!("vapid t={token}, k={}", self.public_key_b64))
    }

    fn sign_jwt(&self, claims: &JwtClaims) -> Result<String, WebPushError> {
        let header = serde_json::to_vec(&JwtHeader {
            typ: "JWT",
            alg: "ES256",
        })
        .map_err(|_| WebPushError::Crypto("failed to serialize JWT header"))?;
        let claims = serde_json::to_vec(claims)
            .map_err(|_| WebPushError::Crypto("failed to serialize JWT claims"))?;

        let signing_input = format!("{}.{}", base64url::encode(header), base64url::encode(claims));
        let signature: Signature = self
            .signing_key
            .try_sign(signing_input.as_bytes())
            .map_err(|_| WebPushError::Crypto("ES256 signing failed"))?;

        // Raw r || s (64 bytes), not ASN.1 DER.
        Ok(format!(
            "{signing_input}.{}",
            base64url::encode(signature.to_bytes())
        ))
    }
}

fn endpoint_audience(endpoint: &Url) -> Result<String, WebPushError> {
    if endpoint.scheme() != "https" && endpoint.scheme() != "http" {
        return Err(WebPushError::InvalidEndpoint(format!(
            "unsupported scheme {:?}",
            endpoint.scheme()
        )));
    }

    Ok(endpoint.origin().ascii_serialization())
}
