use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{
    repo::{StoreError, UserStore},
    repo_types::{NewUser, User, UserChanges},
};

/// In-process [`UserStore`] with the same uniqueness rules as the table.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    rows: Vec<User>,
}

impl Inner {
    fn conflict(
        &self,
        skip_id: Option<i64>,
        username: &str,
        email: Option<&str>,
    ) -> Option<&'static str> {
        for u in self.rows.iter().filter(|u| Some(u.id) != skip_id) {
            if u.username == username {
                return Some("username");
            }
            if email.is_some() && u.email.as_deref() == email {
                return Some("email");
            }
        }
        None
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(field) = inner.conflict(None, &user.username, user.email.as_deref()) {
            return Err(StoreError::Duplicate(field));
        }
        inner.next_id += 1;
        let row = User {
            id: inner.next_id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.rows.push(row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.rows.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.rows.iter().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .rows
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.inner.lock().unwrap().rows.clone())
    }

    async fn update(&self, id: i64, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.rows.iter().any(|u| u.id == id) {
            return Ok(None);
        }
        if let Some(field) = inner.conflict(Some(id), &changes.username, changes.email.as_deref()) {
            return Err(StoreError::Duplicate(field));
        }
        let row = inner.rows.iter_mut().find(|u| u.id == id);
        Ok(row.map(|u| {
            u.username = changes.username;
            u.email = changes.email;
            u.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.rows.len();
        inner.rows.retain(|u| u.id != id);
        Ok(inner.rows.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: Option<&str>) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.map(str::to_string),
            password_hash: "$argon2id$fake".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_insert_leaves_no_row() {
        let store = MemoryUserStore::default();
        store.insert(new_user("alice", Some("a@x.com"))).await.expect("first insert");
        let err = store
            .insert(new_user("alice", Some("other@x.com")))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("username")));
        assert_eq!(store.list().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn missing_emails_do_not_collide() {
        let store = MemoryUserStore::default();
        store.insert(new_user("alice", None)).await.expect("alice");
        store.insert(new_user("bob", None)).await.expect("bob");
        assert_eq!(store.list().await.expect("list").len(), 2);
    }
}
