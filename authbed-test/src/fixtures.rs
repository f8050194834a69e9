//! The default cast of the harness: one client, one ordinary user and one
//! admin.

use authbed_oidc::{Client, GrantType, TestUser};
use authbed_security::ClientCredentials;

pub const API_NAME: &str = "api";
pub const API_SECRET: &str = "secret";
pub const CLIENT_ID: &str = "client";
pub const CLIENT_SECRET: &str = "secret";
pub const ADMIN_ROLE: &str = authbed_api::ADMIN_ROLE;

/// `client`/`secret`: password grant, `openid profile api`, offline access.
pub fn clients() -> Vec<Client> {
    clients_for(API_NAME)
}

/// Same as [`clients`], with `api_name` in place of the `api` scope.
pub fn clients_for(api_name: &str) -> Vec<Client> {
    vec![Client::new(CLIENT_ID)
        .with_secret(CLIENT_SECRET)
        .with_grant_types([GrantType::Password])
        .with_scopes(["openid", "profile", api_name])
        .with_offline_access(true)]
}

/// `user`/`password` (subject 1) and `admin`/`adminPassword` (subject 2).
pub fn users() -> Vec<TestUser> {
    vec![
        TestUser::new("1", "user", "password")
            .with_claim("name", "User")
            .with_claim("website", "https://user.com"),
        TestUser::new("2", "admin", "adminPassword")
            .with_claim("name", "Admin")
            .with_claim("role", ADMIN_ROLE),
    ]
}

pub fn credentials() -> ClientCredentials {
    ClientCredentials::new(CLIENT_ID, CLIENT_SECRET)
}
