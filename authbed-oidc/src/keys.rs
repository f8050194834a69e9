use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::rngs::OsRng;
use rsa::pkcs8::EncodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Serialize;

use crate::error::IssuerError;

/// An issuer's RSA signing key. Lives only as long as the issuer.
pub struct SigningKey {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// Base64url-encoded RSA modulus (for JWKS).
    n: String,
    /// Base64url-encoded RSA public exponent (for JWKS).
    e: String,
    kid: String,
}

impl SigningKey {
    /// Generate an RSA-2048 key with a random key id.
    pub fn generate() -> Result<Self, IssuerError> {
        let kid = uuid::Uuid::new_v4().simple().to_string();
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048)
            .map_err(|e| IssuerError::KeyGeneration(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);

        let pkcs8_pem = private_key
            .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
            .map_err(|e| IssuerError::KeyGeneration(e.to_string()))?;
        let encoding_key = EncodingKey::from_rsa_pem(pkcs8_pem.as_bytes())
            .map_err(|e| IssuerError::KeyGeneration(e.to_string()))?;

        let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
        let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());
        let decoding_key = DecodingKey::from_rsa_components(&n, &e)
            .map_err(|e| IssuerError::KeyGeneration(e.to_string()))?;

        tracing::debug!(%kid, "Generated RSA-2048 signing key");
        Ok(Self {
            encoding_key,
            decoding_key,
            n,
            e,
            kid,
        })
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub fn decoding_key(&self) -> DecodingKey {
        self.decoding_key.clone()
    }

    /// The public half as a JWKS document.
    pub fn jwks(&self) -> JwksDocument {
        JwksDocument {
            keys: vec![JwkEntry {
                kty: "RSA",
                alg: "RS256",
                key_use: "sig",
                kid: self.kid.clone(),
                n: self.n.clone(),
                e: self.e.clone(),
            }],
        }
    }
}

/// JWKS response body.
#[derive(Debug, Serialize)]
pub struct JwksDocument {
    pub keys: Vec<JwkEntry>,
}

#[derive(Debug, Serialize)]
pub struct JwkEntry {
    pub kty: &'static str,
    pub alg: &'static str,
    #[serde(rename = "use")]
    pub key_use: &'static str,
    pub kid: String,
    pub n: String,
    pub e: String,
}
