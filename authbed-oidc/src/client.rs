use std::collections::HashMap;

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::rand_core::OsRng;
use password_hash::{PasswordHash, SaltString};

use crate::config::Client;
use crate::error::IssuerError;

/// Hash a plaintext secret with argon2.
pub(crate) fn hash_secret(secret: &str) -> Result<String, IssuerError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| IssuerError::SecretHashing(e.to_string()))
}

fn hash_all(secrets: &[String]) -> Result<Vec<String>, IssuerError> {
    secrets.iter().map(|s| hash_secret(s)).collect()
}

/// Check `secret` against any of `hashes` without blocking the runtime.
pub(crate) async fn verify_secret(hashes: Vec<String>, secret: &str) -> bool {
    if hashes.is_empty() {
        return false;
    }
    let secret = secret.to_string();
    tokio::task::spawn_blocking(move || {
        hashes.iter().any(|hash| {
            PasswordHash::new(hash)
                .map(|parsed| {
                    Argon2::default()
                        .verify_password(secret.as_bytes(), &parsed)
                        .is_ok()
                })
                .unwrap_or(false)
        })
    })
    .await
    .unwrap_or(false)
}

struct RegisteredClient {
    client: Client,
    secret_hashes: Vec<String>,
}

/// Registered OAuth2 clients. Secrets are kept only as argon2 hashes.
pub struct ClientRegistry {
    clients: HashMap<String, RegisteredClient>,
}

impl ClientRegistry {
    /// Register `clients`, hashing their secrets.
    pub fn new(clients: Vec<Client>) -> Result<Self, IssuerError> {
        let mut map = HashMap::with_capacity(clients.len());
        for mut client in clients {
            let secret_hashes = hash_all(&client.secrets)?;
            client.secrets.clear();
            map.insert(
                client.client_id.clone(),
                RegisteredClient {
                    client,
                    secret_hashes,
                },
            );
        }
        Ok(Self { clients: map })
    }

    /// The client if `client_secret` matches one of its secrets.
    pub(crate) async fn authenticate(&self, client_id: &str, client_secret: &str) -> Option<&Client> {
        let registered = self.clients.get(client_id)?;
        verify_secret(registered.secret_hashes.clone(), client_secret)
            .await
            .then_some(&registered.client)
    }

    pub fn get(&self, client_id: &str) -> Option<&Client> {
        self.clients.get(client_id).map(|r| &r.client)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// Hashed secrets for the API resource, used to authenticate introspection.
pub(crate) struct ApiCredentials {
    name: String,
    secret_hashes: Vec<String>,
}

impl ApiCredentials {
    pub fn new(name: &str, secrets: &[String]) -> Result<Self, IssuerError> {
        Ok(Self {
            name: name.to_string(),
            secret_hashes: hash_all(secrets)?,
        })
    }

    pub async fn authenticate(&self, name: &str, secret: &str) -> bool {
        name == self.name && verify_secret(self.secret_hashes.clone(), secret).await
    }
}
