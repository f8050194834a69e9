use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;

/// What a refresh token stands for.
#[derive(Clone, Debug)]
pub(crate) struct RefreshGrant {
    pub client_id: String,
    pub subject_id: String,
    pub scopes: Vec<String>,
    pub auth_time: u64,
    pub expires_at: u64,
}

/// Outstanding refresh tokens. Each handle is redeemable once.
#[derive(Default)]
pub(crate) struct RefreshTokenStore {
    grants: DashMap<String, RefreshGrant>,
}

impl RefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `grant` under a fresh random handle, dropping every grant that
    /// expired by `now`.
    pub fn issue(&self, grant: RefreshGrant, now: u64) -> String {
        self.grants.retain(|_, g| g.expires_at > now);
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        let handle = URL_SAFE_NO_PAD.encode(bytes);
        self.grants.insert(handle.clone(), grant);
        handle
    }

    /// Consume `handle` if it belongs to `client_id` and has not expired.
    ///
    /// A handle presented by another client stays valid for its owner.
    pub fn redeem(&self, handle: &str, client_id: &str, now: u64) -> Option<RefreshGrant> {
        let (_, grant) = self
            .grants
            .remove_if(handle, |_, grant| grant.client_id == client_id)?;
        (grant.expires_at > now).then_some(grant)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.grants.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(client_id: &str, expires_at: u64) -> RefreshGrant {
        RefreshGrant {
            client_id: client_id.into(),
            subject_id: "1".into(),
            scopes: vec!["api".into(), "offline_access".into()],
            auth_time: 0,
            expires_at,
        }
    }

    #[test]
    fn handles_are_single_use() {
        let store = RefreshTokenStore::new();
        let handle = store.issue(grant("client", 100), 0);
        assert!(store.redeem(&handle, "client", 10).is_some());
        assert!(store.redeem(&handle, "client", 10).is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn other_clients_cannot_redeem() {
        let store = RefreshTokenStore::new();
        let handle = store.issue(grant("client", 100), 0);
        assert!(store.redeem(&handle, "intruder", 10).is_none());
        assert!(store.redeem(&handle, "client", 10).is_some());
    }

    #[test]
    fn expired_handles_are_dropped() {
        let store = RefreshTokenStore::new();
        let handle = store.issue(grant("client", 100), 0);
        assert!(store.redeem(&handle, "client", 100).is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn issuing_sweeps_expired_handles() {
        let store = RefreshTokenStore::new();
        let stale = store.issue(grant("client", 50), 0);
        let live = store.issue(grant("client", 500), 0);
        assert_eq!(store.len(), 2);

        store.issue(grant("client", 900), 100);
        assert_eq!(store.len(), 2);
        assert!(store.redeem(&stale, "client", 0).is_none());
        assert!(store.redeem(&live, "client", 100).is_some());
    }

    #[test]
    fn handles_are_unique() {
        let store = RefreshTokenStore::new();
        assert_ne!(store.issue(grant("c", 1), 0), store.issue(grant("c", 1), 0));
    }
}
