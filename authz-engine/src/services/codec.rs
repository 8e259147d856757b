//! Claim codec - encodes the canonical claim set into one of two opaque
//! token formats.
//!
//! The format is fixed per process: `from_config` builds the variant once
//! and `TokenService` holds it for its lifetime. Both formats authenticate
//! the token before any field (including expiry) is trusted.

use std::fs;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::config::{TokenConfig, TokenMode};
use crate::models::TokenClaims;
use crate::services::error::AuthzError;

const SEALED_PREFIX: &str = "v1.sealed.";
const AES_GCM_KEY_SIZE: usize = 32;
const AES_GCM_NONCE_SIZE: usize = 12;

/// Process-wide token format, chosen once at construction.
pub enum ClaimCodec {
    Signed(SignedCodec),
    Sealed(SealedCodec),
}

impl ClaimCodec {
    /// Build the configured format. Sealed mode loads the RSA key pair from
    /// the configured PEM files.
    pub fn from_config(config: &TokenConfig) -> Result<Self, AuthzError> {
        match config.mode {
            TokenMode::Signed => {
                tracing::info!("Claim codec initialized in signed mode (HS256)");
                Ok(ClaimCodec::Signed(SignedCodec::new(
                    config.signing_secret.as_bytes(),
                )))
            }
            TokenMode::Sealed => {
                let private_pem = fs::read_to_string(&config.private_key_path).map_err(|e| {
                    AuthzError::ConfigError(anyhow::anyhow!(
                        "Failed to read private key from {}: {}",
                        config.private_key_path,
                        e
                    ))
                })?;
                let private_key = RsaPrivateKey::from_pkcs8_pem(&private_pem).map_err(|e| {
                    AuthzError::ConfigError(anyhow::anyhow!("Failed to parse private key: {}", e))
                })?;

                let public_pem = fs::read_to_string(&config.public_key_path).map_err(|e| {
                    AuthzError::ConfigError(anyhow::anyhow!(
                        "Failed to read public key from {}: {}",
                        config.public_key_path,
                        e
                    ))
                })?;
                let public_key = RsaPublicKey::from_public_key_pem(&public_pem).map_err(|e| {
                    AuthzError::ConfigError(anyhow::anyhow!("Failed to parse public key: {}", e))
                })?;

                tracing::info!("Claim codec initialized in sealed mode (RSA-OAEP + AES-256-GCM)");
                Ok(ClaimCodec::Sealed(SealedCodec::new(private_key, public_key)))
            }
        }
    }

    pub fn encode(&self, claims: &TokenClaims) -> Result<String, AuthzError> {
        match self {
            ClaimCodec::Signed(codec) => codec.encode(claims),
            ClaimCodec::Sealed(codec) => codec.encode(claims),
        }
    }

    /// Authenticate, parse, and expiry-check a token.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, AuthzError> {
        match self {
            ClaimCodec::Signed(codec) => codec.decode(token, true),
            ClaimCodec::Sealed(codec) => codec.decode(token, true),
        }
    }

    /// Authenticate and parse without failing on expiry. Used by revocation,
    /// where an expired token is already in its terminal state.
    pub fn decode_ignoring_expiry(&self, token: &str) -> Result<TokenClaims, AuthzError> {
        match self {
            ClaimCodec::Signed(codec) => codec.decode(token, false),
            ClaimCodec::Sealed(codec) => codec.decode(token, false),
        }
    }
}

/// HS256 JWT over the canonical claims.
pub struct SignedCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl SignedCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    fn encode(&self, claims: &TokenClaims) -> Result<String, AuthzError> {
        let header = Header::new(Algorithm::HS256);
        encode(&header, claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode signed token: {}", e);
            AuthzError::MalformedToken
        })
    }

    fn decode(&self, token: &str, check_expiry: bool) -> Result<TokenClaims, AuthzError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = check_expiry;
        // No clock skew allowance; expiry windows are exact.
        validation.leeway = 0;

        // jsonwebtoken verifies the signature before evaluating claims, so
        // the expiry of a tampered token is never consulted.
        let data = decode::<TokenClaims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthzError::ExpiredToken,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthzError::SignatureInvalid,
                _ => AuthzError::MalformedToken,
            }
        })?;

        Ok(data.claims)
    }
}

/// Claims sealed under a fresh AES-256-GCM content key, the key wrapped
/// with RSA-OAEP(SHA-256). Authenticated and confidential.
pub struct SealedCodec {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl SealedCodec {
    pub fn new(private_key: RsaPrivateKey, public_key: RsaPublicKey) -> Self {
        Self {
            private_key,
            public_key,
        }
    }

    fn encode(&self, claims: &TokenClaims) -> Result<String, AuthzError> {
        let payload = serde_json::to_vec(claims).map_err(|e| {
            tracing::error!("Failed to serialize claims: {}", e);
            AuthzError::MalformedToken
        })?;

        let content_key = Aes256Gcm::generate_key(&mut OsRng);
        let cipher = Aes256Gcm::new(&content_key);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher.encrypt(&nonce, payload.as_ref()).map_err(|e| {
            tracing::error!("Failed to seal claims: {}", e);
            AuthzError::MalformedToken
        })?;

        let wrapped_key = self
            .public_key
            .encrypt(
                &mut rand::thread_rng(),
                Oaep::new::<Sha256>(),
                content_key.as_slice(),
            )
            .map_err(|e| {
                tracing::error!("Failed to wrap content key: {}", e);
                AuthzError::MalformedToken
            })?;

        Ok(format!(
            "{}{}.{}.{}",
            SEALED_PREFIX,
            URL_SAFE_NO_PAD.encode(wrapped_key),
            URL_SAFE_NO_PAD.encode(nonce),
            URL_SAFE_NO_PAD.encode(ciphertext),
        ))
    }

    fn decode(&self, token: &str, check_expiry: bool) -> Result<TokenClaims, AuthzError> {
        let body = token
            .strip_prefix(SEALED_PREFIX)
            .ok_or(AuthzError::MalformedToken)?;

        let mut segments = body.split('.');
        let (wrapped_key, nonce, ciphertext) =
            match (segments.next(), segments.next(), segments.next(), segments.next()) {
                (Some(k), Some(n), Some(c), None) => (
                    URL_SAFE_NO_PAD
                        .decode(k)
                        .map_err(|_| AuthzError::MalformedToken)?,
                    URL_SAFE_NO_PAD
                        .decode(n)
                        .map_err(|_| AuthzError::MalformedToken)?,
                    URL_SAFE_NO_PAD
                        .decode(c)
                        .map_err(|_| AuthzError::MalformedToken)?,
                ),
                _ => return Err(AuthzError::MalformedToken),
            };

        if nonce.len() != AES_GCM_NONCE_SIZE {
            return Err(AuthzError::MalformedToken);
        }

        // Anything wrong with the key wrap or the authentication tag fails
        // closed as SignatureInvalid; no claim field is trusted past here.
        let content_key = self
            .private_key
            .decrypt(Oaep::new::<Sha256>(), &wrapped_key)
            .map_err(|_| AuthzError::SignatureInvalid)?;
        if content_key.len() != AES_GCM_KEY_SIZE {
            return Err(AuthzError::SignatureInvalid);
        }

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&content_key));
        let payload = cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
            .map_err(|_| AuthzError::SignatureInvalid)?;

        let claims: TokenClaims =
            serde_json::from_slice(&payload).map_err(|_| AuthzError::MalformedToken)?;

        if check_expiry && claims.is_expired() {
            return Err(AuthzError::ExpiredToken);
        }

        Ok(claims)
    }
}
