use std::collections::HashMap;

use crate::config::TestUser;

/// Test users, indexed by username and by subject.
///
/// Passwords are fixture data and compared as plaintext.
pub struct UserStore {
    users: HashMap<String, TestUser>,
    /// Index: subject -> username
    subject_index: HashMap<String, String>,
}

impl UserStore {
    pub fn new(users: Vec<TestUser>) -> Self {
        let subject_index = users
            .iter()
            .map(|u| (u.subject_id.clone(), u.username.clone()))
            .collect();
        let users = users.into_iter().map(|u| (u.username.clone(), u)).collect();
        Self {
            users,
            subject_index,
        }
    }

    /// The user if `password` is theirs.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<&TestUser> {
        self.users
            .get(username)
            .filter(|user| user.password == password)
    }

    pub fn find_by_subject(&self, subject_id: &str) -> Option<&TestUser> {
        self.subject_index
            .get(subject_id)
            .and_then(|username| self.users.get(username))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
