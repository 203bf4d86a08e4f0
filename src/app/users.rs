use crate::errors::Condition;
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: u64,
    account: String,
    password: String,
    email: String,
}

impl User {
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn account(&self) -> &str {
        &self.account
    }

    #[inline]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[inline]
    pub fn check_password(&self, password: &str) -> bool {
        self.password == password
    }
}

/// In-memory account registry.
#[derive(Debug, Default)]
pub struct UserStore {
    inner: Mutex<Accounts>,
}

#[derive(Debug, Default)]
struct Accounts {
    next_id: u64,
    by_account: HashMap<String, User>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding the demo account `gugu` / `password`.
    pub fn seeded() -> Self {
        let store = Self::new();
        // Fresh store, the account cannot exist yet.
        let _ = store.register("gugu", "password", "hkkang@woowahan.com");
        store
    }

    pub fn find_by_account(&self, account: &str) -> Option<User> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_account
            .get(account)
            .cloned()
    }

    /// Adds an account.
    ///
    /// # Errors
    ///
    /// [`Condition::Internal`] when a field is empty or the account is taken.
    pub fn register(&self, account: &str, password: &str, email: &str) -> Result<User, Condition> {
        if [account, password, email].iter().any(|field| field.is_empty()) {
            return Err(Condition::Internal("registration requires account, password and email".into()));
        }

        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.by_account.contains_key(account) {
            return Err(Condition::Internal(format!("account `{account}` already exists")));
        }

        inner.next_id += 1;
        let user = User {
            id: inner.next_id,
            account: account.to_string(),
            password: password.to_string(),
            email: email.to_string(),
        };
        inner.by_account.insert(user.account.clone(), user.clone());

        tracing::info!(account, id = user.id, "account registered");
        Ok(user)
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_account
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded() {
        let users = UserStore::seeded();
        let gugu = users.find_by_account("gugu").unwrap();

        assert_eq!(users.len(), 1);
        assert_eq!(gugu.id(), 1);
        assert_eq!(gugu.email(), "hkkang@woowahan.com");
        assert!(gugu.check_password("password"));
        assert!(!gugu.check_password("Password"));
        assert!(users.find_by_account("nobody").is_none());
    }

    #[test]
    fn register() {
        let users = UserStore::seeded();

        let user = users.register("gugu2", "password", "hkkang%40woowahan.com").unwrap();
        assert_eq!(user.id(), 2);
        assert_eq!(users.find_by_account("gugu2"), Some(user));

        #[rustfmt::skip]
        let rejected = [
            ("gugu",  "password", "a@b.c"),
            ("",      "password", "a@b.c"),
            ("gugu3", "",         "a@b.c"),
            ("gugu3", "password", ""),
        ];
        for (account, password, email) in rejected {
            assert!(matches!(
                users.register(account, password, email),
                Err(Condition::Internal(_))
            ));
        }
        assert_eq!(users.len(), 2);
    }
}
