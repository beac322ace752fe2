use chrono::{Duration, Utc};
use tracing::debug;

use chirpy_crypto::password;

use crate::models::{ChirpRow, UserRow, UserUpdate};
use crate::{Result, Store, StoreError};

/// Lifetime of a refresh token issued on login.
pub const REFRESH_TOKEN_TTL_DAYS: i64 = 60;

impl Store {
    // -- Users --

    pub fn create_user(&self, email: &str, password: &str) -> Result<UserRow> {
        // Hash before taking the lock; Argon2 is deliberately slow.
        let password_hash = password::hash(password)?;

        self.with_doc_mut(|doc| {
            if doc.user_id_by_email(email).is_some() {
                return Err(StoreError::EmailTaken);
            }

            let id = doc.next_user_id();
            let user = UserRow {
                id,
                email: email.to_string(),
                password_hash,
                refresh_token: String::new(),
                refresh_expires_at: Utc::now(),
                is_premium: false,
            };
            doc.users.insert(id, user.clone());
            Ok(user)
        })
    }

    pub fn update_user(&self, id: u64, update: UserUpdate) -> Result<UserRow> {
        let password_hash = update.password.as_deref().map(password::hash).transpose()?;

        self.with_doc_mut(|doc| {
            if let Some(email) = update.email.as_deref() {
                if doc.user_id_by_email(email).is_some_and(|owner| owner != id) {
                    return Err(StoreError::EmailTaken);
                }
            }

            let user = doc.users.get_mut(&id).ok_or(StoreError::NotFound)?;
            if let Some(email) = update.email {
                user.email = email;
            }
            if let Some(hash) = password_hash {
                user.password_hash = hash;
            }
            Ok(user.clone())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<UserRow> {
        self.with_doc(|doc| {
            doc.user_id_by_email(email)
                .and_then(|id| doc.users.get(&id))
                .cloned()
                .ok_or(StoreError::NotFound)
        })
    }

    pub fn get_user_by_id(&self, id: u64) -> Result<UserRow> {
        self.with_doc(|doc| doc.users.get(&id).cloned().ok_or(StoreError::NotFound))
    }

    /// Look up the holder of a refresh token. A stale token is `Expired`.
    pub fn get_user_by_refresh_token(&self, token: &str) -> Result<UserRow> {
        self.with_doc(|doc| {
            let user = doc
                .user_id_by_refresh_token(token)
                .and_then(|id| doc.users.get(&id))
                .ok_or(StoreError::NotFound)?;

            if !user.has_live_refresh_token(Utc::now()) {
                return Err(StoreError::Expired);
            }
            Ok(user.clone())
        })
    }

    /// Check a password and, on success, make sure the user holds a live
    /// refresh token. Lookup, verification and rotation all happen under one
    /// exclusive lock; a failed check writes nothing.
    pub fn verify_credentials(&self, email: &str, password: &str) -> Result<(UserRow, bool)> {
        let _guard = self.exclusive()?;
        let mut doc = self.load()?;

        let id = doc.user_id_by_email(email).ok_or(StoreError::NotFound)?;
        let user = doc.users.get(&id).ok_or(StoreError::NotFound)?;

        if !password::verify(&user.password_hash, password) {
            return Ok((user.clone(), false));
        }

        let now = Utc::now();
        if user.has_live_refresh_token(now) {
            return Ok((user.clone(), true));
        }

        let token = doc.unused_refresh_token();
        let user = doc.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.refresh_token = token;
        user.refresh_expires_at = now + Duration::days(REFRESH_TOKEN_TTL_DAYS);
        let user = user.clone();

        self.persist(&doc)?;
        debug!("Issued refresh token for user {}", id);
        Ok((user, true))
    }

    pub fn revoke_refresh_token(&self, token: &str) -> Result<()> {
        self.with_doc_mut(|doc| {
            let id = doc
                .user_id_by_refresh_token(token)
                .ok_or(StoreError::NotFound)?;
            let user = doc.users.get_mut(&id).ok_or(StoreError::NotFound)?;
            user.refresh_token.clear();
            user.refresh_expires_at = Utc::now();
            Ok(())
        })
    }

    pub fn upgrade_premium(&self, id: u64) -> Result<()> {
        self.with_doc_mut(|doc| {
            let user = doc.users.get_mut(&id).ok_or(StoreError::NotFound)?;
            user.is_premium = true;
            Ok(())
        })
    }

    // -- Chirps --

    /// Fails with `NotFound` when the author does not exist.
    pub fn create_chirp(&self, author_id: u64, body: &str) -> Result<ChirpRow> {
        self.with_doc_mut(|doc| {
            if !doc.users.contains_key(&author_id) {
                return Err(StoreError::NotFound);
            }

            let id = doc.next_chirp_id();
            let chirp = ChirpRow {
                id,
                author_id,
                body: body.to_string(),
            };
            doc.chirps.insert(id, chirp.clone());
            Ok(chirp)
        })
    }

    pub fn get_chirp(&self, id: u64) -> Result<ChirpRow> {
        self.with_doc(|doc| doc.chirps.get(&id).cloned().ok_or(StoreError::NotFound))
    }

    /// All chirps, ascending by id.
    pub fn list_chirps(&self) -> Result<Vec<ChirpRow>> {
        self.with_doc(|doc| Ok(doc.chirps.values().cloned().collect()))
    }

    pub fn delete_chirp(&self, id: u64, requesting_user_id: u64) -> Result<()> {
        self.with_doc_mut(|doc| {
            let chirp = doc.chirps.get(&id).ok_or(StoreError::NotFound)?;
            if chirp.author_id != requesting_user_id {
                return Err(StoreError::Forbidden);
            }
            doc.chirps.remove(&id);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;
    use std::thread;

    use tempfile::TempDir;

    use super::*;
    use crate::Document;

    fn open_store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::open(&dir.path().join("database.json")).unwrap();
        (dir, store)
    }

    fn on_disk(store: &Store) -> Document {
        serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap()
    }

    #[test]
    fn user_ids_count_up_from_one() {
        let (_dir, store) = open_store();

        let a = store.create_user("a@b", "pw").unwrap();
        let b = store.create_user("c@d", "pw").unwrap();

        assert_eq!((a.id, b.id), (1, 2));
        assert!(!a.is_premium);
        assert!(a.refresh_token.is_empty());
    }

    #[test]
    fn gapped_user_ids_are_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("database.json");
        let stamp = "2024-01-01T00:00:00Z";
        let seeded = format!(
            r#"{{"users":{{
                "1":{{"id":1,"email":"first@b","password":"x","refresh_token":"","RefreshExpiration":"{stamp}","is_chirpy_red":false}},
                "3":{{"id":3,"email":"victim@b","password":"x","refresh_token":"","RefreshExpiration":"{stamp}","is_chirpy_red":true}}
            }},"chirps":{{}}}}"#
        );
        fs::write(&path, seeded).unwrap();
        let store = Store::open(&path).unwrap();

        let created = store.create_user("new@b", "pw").unwrap();

        assert_eq!(created.id, 4);
        let doc = on_disk(&store);
        assert_eq!(doc.users.len(), 3);
        assert_eq!(doc.users[&3].email, "victim@b");
        assert!(doc.users[&3].is_premium);
        assert_eq!(doc.users[&4].email, "new@b");
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let (_dir, store) = open_store();
        store.create_user("a@b", "pw").unwrap();

        assert!(matches!(
            store.create_user("a@b", "other"),
            Err(StoreError::EmailTaken)
        ));
        // Comparison is byte-for-byte.
        assert!(store.create_user("A@b", "pw").is_ok());
    }

    #[test]
    fn credentials_verify_only_with_the_right_password() {
        let (_dir, store) = open_store();
        store.create_user("a@b", "pw").unwrap();

        let (user, ok) = store.verify_credentials("a@b", "pw").unwrap();
        assert!(ok);
        assert_eq!(user.id, 1);

        let (_, ok) = store.verify_credentials("a@b", "wrong").unwrap();
        assert!(!ok);

        assert!(matches!(
            store.verify_credentials("nobody@b", "pw"),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn bcrypt_hashes_from_older_files_still_log_in() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("database.json");
        let hash = bcrypt::hash("pw", 4).unwrap().replacen("$2b$", "$2a$", 1);
        let seeded = serde_json::json!({
            "users": { "1": {
                "id": 1,
                "email": "old@b",
                "password": hash,
                "refresh_token": "",
                "RefreshExpiration": "2024-01-01T00:00:00Z",
                "is_chirpy_red": false
            } },
            "chirps": {}
        });
        fs::write(&path, seeded.to_string()).unwrap();
        let store = Store::open(&path).unwrap();

        let (user, ok) = store.verify_credentials("old@b", "pw").unwrap();
        assert!(ok);
        assert_eq!(user.refresh_token.len(), 64);

        let (_, ok) = store.verify_credentials("old@b", "wrong").unwrap();
        assert!(!ok);
    }

    #[test]
    fn login_issues_refresh_token_once() {
        let (_dir, store) = open_store();
        store.create_user("a@b", "pw").unwrap();

        let (first, _) = store.verify_credentials("a@b", "pw").unwrap();
        assert_eq!(first.refresh_token.len(), 64);
        let ttl = first.refresh_expires_at - Utc::now();
        assert!(ttl > Duration::days(59) && ttl <= Duration::days(60));

        let (second, _) = store.verify_credentials("a@b", "pw").unwrap();
        assert_eq!(first.refresh_token, second.refresh_token);
        assert_eq!(on_disk(&store).users[&1].refresh_token, first.refresh_token);
    }

    #[test]
    fn failed_login_changes_nothing_on_disk() {
        let (_dir, store) = open_store();
        store.create_user("a@b", "pw").unwrap();
        let before = fs::read(store.path()).unwrap();

        let (_, ok) = store.verify_credentials("a@b", "wrong").unwrap();

        assert!(!ok);
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn expired_refresh_token_is_rejected_then_rotated_on_login() {
        let (_dir, store) = open_store();
        store.create_user("a@b", "pw").unwrap();
        let (user, _) = store.verify_credentials("a@b", "pw").unwrap();

        store
            .with_doc_mut(|doc| {
                let row = doc.users.get_mut(&user.id).ok_or(StoreError::NotFound)?;
                row.refresh_expires_at = Utc::now() - Duration::seconds(1);
                Ok(())
            })
            .unwrap();

        assert!(matches!(
            store.get_user_by_refresh_token(&user.refresh_token),
            Err(StoreError::Expired)
        ));

        let (rotated, ok) = store.verify_credentials("a@b", "pw").unwrap();
        assert!(ok);
        assert_ne!(rotated.refresh_token, user.refresh_token);
        assert_eq!(
            store.get_user_by_refresh_token(&rotated.refresh_token).unwrap().id,
            user.id
        );
    }

    #[test]
    fn revoked_token_no_longer_resolves() {
        let (_dir, store) = open_store();
        store.create_user("a@b", "pw").unwrap();
        let (user, _) = store.verify_credentials("a@b", "pw").unwrap();

        store.revoke_refresh_token(&user.refresh_token).unwrap();

        assert!(matches!(
            store.get_user_by_refresh_token(&user.refresh_token),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.revoke_refresh_token(&user.refresh_token),
            Err(StoreError::NotFound)
        ));
        assert!(on_disk(&store).users[&1].refresh_token.is_empty());
    }

    #[test]
    fn empty_refresh_token_never_matches() {
        let (_dir, store) = open_store();
        store.create_user("a@b", "pw").unwrap();

        assert!(matches!(
            store.get_user_by_refresh_token(""),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.revoke_refresh_token(""),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn update_user_changes_credentials() {
        let (_dir, store) = open_store();
        store.create_user("a@b", "pw").unwrap();

        let updated = store
            .update_user(
                1,
                UserUpdate {
                    email: Some("new@b".into()),
                    password: Some("pw2".into()),
                },
            )
            .unwrap();

        assert_eq!(updated.email, "new@b");
        assert!(store.verify_credentials("new@b", "pw2").unwrap().1);
        assert!(!store.verify_credentials("new@b", "pw").unwrap().1);
        assert!(matches!(
            store.get_user_by_email("a@b"),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn update_user_keeps_omitted_fields() {
        let (_dir, store) = open_store();
        store.create_user("a@b", "pw").unwrap();

        store
            .update_user(
                1,
                UserUpdate {
                    email: Some("new@b".into()),
                    password: None,
                },
            )
            .unwrap();

        assert!(store.verify_credentials("new@b", "pw").unwrap().1);
    }

    #[test]
    fn update_unknown_user_is_not_found() {
        let (_dir, store) = open_store();

        let result = store.update_user(
            9,
            UserUpdate {
                email: Some("x@y".into()),
                password: None,
            },
        );

        assert!(matches!(result, Err(StoreError::NotFound)));
        assert!(on_disk(&store).users.is_empty());
    }

    #[test]
    fn update_to_someone_elses_email_is_rejected() {
        let (_dir, store) = open_store();
        store.create_user("a@b", "pw").unwrap();
        store.create_user("c@d", "pw").unwrap();

        let taken = store.update_user(
            2,
            UserUpdate {
                email: Some("a@b".into()),
                password: None,
            },
        );
        assert!(matches!(taken, Err(StoreError::EmailTaken)));

        // Keeping one's own email is fine.
        let same = store.update_user(
            2,
            UserUpdate {
                email: Some("c@d".into()),
                password: None,
            },
        );
        assert!(same.is_ok());
    }

    #[test]
    fn upgrade_premium_sets_flag() {
        let (_dir, store) = open_store();
        store.create_user("a@b", "pw").unwrap();

        store.upgrade_premium(1).unwrap();

        assert!(store.get_user_by_id(1).unwrap().is_premium);
        assert!(matches!(store.upgrade_premium(2), Err(StoreError::NotFound)));
    }

    #[test]
    fn chirp_requires_existing_author() {
        let (_dir, store) = open_store();

        assert!(matches!(
            store.create_chirp(1, "hello"),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn chirp_ids_fill_the_lowest_gap() {
        let (_dir, store) = open_store();
        store.create_user("a@b", "pw").unwrap();

        for _ in 0..3 {
            let chirp = store.create_chirp(1, "again").unwrap();
            assert_eq!(chirp.id, 1);
            store.delete_chirp(chirp.id, 1).unwrap();
        }

        for expected in 1..=3 {
            assert_eq!(store.create_chirp(1, "x").unwrap().id, expected);
        }
        store.delete_chirp(2, 1).unwrap();
        assert_eq!(store.create_chirp(1, "x").unwrap().id, 2);
        assert_eq!(store.create_chirp(1, "x").unwrap().id, 4);
    }

    #[test]
    fn only_the_author_may_delete() {
        let (_dir, store) = open_store();
        store.create_user("a@b", "pw").unwrap();
        store.create_user("c@d", "pw").unwrap();
        let chirp = store.create_chirp(1, "mine").unwrap();

        assert!(matches!(
            store.delete_chirp(chirp.id, 2),
            Err(StoreError::Forbidden)
        ));
        assert_eq!(store.get_chirp(chirp.id).unwrap(), chirp);

        store.delete_chirp(chirp.id, 1).unwrap();
        assert!(matches!(store.get_chirp(chirp.id), Err(StoreError::NotFound)));
        assert!(matches!(
            store.delete_chirp(chirp.id, 1),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn disk_matches_replayed_operations() {
        let (_dir, store) = open_store();
        store.create_user("a@b", "pw").unwrap();
        store.create_user("c@d", "pw").unwrap();
        store.create_chirp(1, "one").unwrap();
        store.create_chirp(2, "two").unwrap();
        store.create_chirp(1, "three").unwrap();
        store.delete_chirp(2, 2).unwrap();
        store.upgrade_premium(2).unwrap();

        let doc = on_disk(&store);

        assert_eq!(doc, store.snapshot().unwrap());
        assert_eq!(doc.users.len(), 2);
        assert!(doc.users[&2].is_premium);
        assert_eq!(
            doc.chirps.values().map(|c| c.body.as_str()).collect::<Vec<_>>(),
            ["one", "three"]
        );

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["chirps"]["3"]["author_id"], 1);
        assert!(raw["users"]["1"]["password"].is_string());
        assert!(raw["users"]["1"]["RefreshExpiration"].is_string());
        assert_eq!(raw["users"]["2"]["is_chirpy_red"], true);
    }

    #[test]
    fn list_chirps_is_ascending() {
        let (_dir, store) = open_store();
        store.create_user("a@b", "pw").unwrap();
        for body in ["a", "b", "c"] {
            store.create_chirp(1, body).unwrap();
        }

        let ids: Vec<u64> = store.list_chirps().unwrap().iter().map(|c| c.id).collect();
        assert_eq!(ids, [1, 2, 3]);
    }

    #[test]
    fn concurrent_writers_are_serialized() {
        let (_dir, store) = open_store();
        store.create_user("a@b", "pw").unwrap();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..10 {
                        store.create_chirp(1, &format!("{t}-{i}")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let doc = on_disk(&store);
        assert_eq!(doc.chirps.len(), 80);
        assert_eq!(doc.chirps.keys().copied().collect::<Vec<_>>(), (1..=80).collect::<Vec<_>>());
    }
}
