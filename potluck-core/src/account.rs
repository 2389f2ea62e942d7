//! Signed-in user lifecycle: persisting the session, restoring it on start,
//! and tearing it down on sign-out or expiry.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::http::Transport;
use crate::session::SessionClient;
use crate::store::KeyValueStore;
use crate::types::{CreateUserRequest, RecipeId, UserResponse};

/// Key the signed-in user is persisted under.
pub const USER_STORAGE_KEY: &str = "user";

pub const USER_PATH: &str = "/user";

/// Where the user should be taken next. Implemented by the front end.
pub trait Navigator: Send + Sync {
    /// A recipe was created or updated.
    fn recipe(&self, id: RecipeId);
    /// The session ended, by sign-out or expiry.
    fn home(&self);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredUser {
    pub username: String,
    pub token: String,
    pub signed_in_at: DateTime<Utc>,
}

type SharedUser = Arc<Mutex<Option<StoredUser>>>;

fn lock_user(user: &SharedUser) -> MutexGuard<'_, Option<StoredUser>> {
    user.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct Account<T, S> {
    client: Arc<SessionClient<T>>,
    store: Arc<S>,
    navigator: Arc<dyn Navigator>,
    user: SharedUser,
}

impl<T: Transport, S: KeyValueStore + 'static> Account<T, S> {
    pub fn new(
        client: Arc<SessionClient<T>>,
        store: Arc<S>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            client,
            store,
            navigator,
            user: Arc::new(Mutex::new(None)),
        }
    }

    /// Build an account and resume any session left in the store.
    pub fn load(
        client: Arc<SessionClient<T>>,
        store: Arc<S>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, SyncError> {
        let account = Self::new(client, store, navigator);
        account.restore()?;
        Ok(account)
    }

    pub fn client(&self) -> &Arc<SessionClient<T>> {
        &self.client
    }

    /// The signed-in user, if any.
    pub fn user(&self) -> Option<StoredUser> {
        lock_user(&self.user).clone()
    }

    /// Runs when the server rejects the token: forget the stored session and
    /// send the user home. The session client has already dropped the token.
    fn expiry_hook(&self) -> impl FnOnce() + Send + 'static {
        let store = self.store.clone();
        let user = self.user.clone();
        let navigator = self.navigator.clone();
        move || {
            if let Err(e) = store.remove(USER_STORAGE_KEY) {
                tracing::warn!(error = %e, "failed to clear stored session");
            }
            *lock_user(&user) = None;
            navigator.home();
        }
    }

    fn restore(&self) -> Result<Option<StoredUser>, SyncError> {
        let Some(raw) = self.store.get(USER_STORAGE_KEY)? else {
            return Ok(None);
        };

        let stored: StoredUser = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable stored session");
                self.store.remove(USER_STORAGE_KEY)?;
                return Ok(None);
            }
        };

        self.client.resume(stored.token.clone(), self.expiry_hook());
        *lock_user(&self.user) = Some(stored.clone());
        tracing::info!(username = %stored.username, "restored session");
        Ok(Some(stored))
    }

    pub async fn sign_in(&self, username: &str, password: &str) -> Result<StoredUser, SyncError> {
        let token = self
            .client
            .sign_in(username, password, self.expiry_hook())
            .await?;

        let stored = StoredUser {
            username: username.to_string(),
            token: token.token,
            signed_in_at: Utc::now(),
        };
        if let Err(e) = self.persist(&stored) {
            // The client and the store must agree on whether a session exists.
            self.client.sign_out();
            tracing::warn!(error = %e, "failed to store session, signing out");
            return Err(e);
        }
        *lock_user(&self.user) = Some(stored.clone());
        Ok(stored)
    }

    fn persist(&self, stored: &StoredUser) -> Result<(), SyncError> {
        let raw = serde_json::to_string(stored)?;
        self.store.set(USER_STORAGE_KEY, &raw)?;
        Ok(())
    }

    /// Create a user, then sign in as them.
    pub async fn sign_up(
        &self,
        name: &str,
        username: &str,
        password: &str,
    ) -> Result<(UserResponse, StoredUser), SyncError> {
        let request = CreateUserRequest {
            username: username.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        };
        let created: UserResponse = self.client.post(USER_PATH, &request).await?;
        tracing::info!(id = created.id, username, "user created");

        let stored = self.sign_in(username, password).await?;
        Ok((created, stored))
    }

    /// End the session. The client and navigation are always updated; a
    /// failure to clear the stored session is still reported.
    pub fn sign_out(&self) -> Result<(), SyncError> {
        self.client.sign_out();
        *lock_user(&self.user) = None;
        let removed = self.store.remove(USER_STORAGE_KEY);
        self.navigator.home();
        Ok(removed?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::http::{Method, MockTransport};
    use crate::session::TOKEN_PATH;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingNavigator {
        visits: Mutex<Vec<String>>,
    }

    impl Navigator for RecordingNavigator {
        fn recipe(&self, id: RecipeId) {
            self.visits.lock().unwrap().push(format!("/recipes/{}", id));
        }

        fn home(&self) {
            self.visits.lock().unwrap().push("/".to_string());
        }
    }

    fn account(
        mock: MockTransport,
        store: Arc<MemoryStore>,
    ) -> (
        Account<Arc<MockTransport>, MemoryStore>,
        Arc<RecordingNavigator>,
    ) {
        let navigator = Arc::new(RecordingNavigator::default());
        let client = Arc::new(SessionClient::new(Arc::new(mock)));
        let account = Account::load(client, store, navigator.clone()).unwrap();
        (account, navigator)
    }

    #[tokio::test]
    async fn test_sign_in_persists_user() {
        let store = Arc::new(MemoryStore::new());
        let (account, _) = account(
            MockTransport::new().with_json(Method::Post, TOKEN_PATH, 200, json!({"token": "t1"})),
            store.clone(),
        );

        let user = account.sign_in("ann", "pw").await.unwrap();
        assert_eq!(user.token, "t1");

        let raw = store.get(USER_STORAGE_KEY).unwrap().unwrap();
        let stored: StoredUser = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.username, "ann");
        assert_eq!(account.user(), Some(stored));
    }

    #[tokio::test]
    async fn test_load_resumes_stored_session_without_network() {
        let store = Arc::new(MemoryStore::new());
        let stored = StoredUser {
            username: "ann".into(),
            token: "saved".into(),
            signed_in_at: Utc::now(),
        };
        store
            .set(USER_STORAGE_KEY, &serde_json::to_string(&stored).unwrap())
            .unwrap();

        let (account, _) = account(MockTransport::new(), store);
        assert_eq!(account.client().token().as_deref(), Some("saved"));
        assert!(account.client().transport().requests().is_empty());
        assert_eq!(account.user().unwrap().username, "ann");
    }

    #[tokio::test]
    async fn test_unreadable_stored_session_is_discarded() {
        let store = Arc::new(MemoryStore::new());
        store.set(USER_STORAGE_KEY, "{garbage").unwrap();

        let (account, _) = account(MockTransport::new(), store.clone());
        assert!(!account.client().is_authenticated());
        assert_eq!(store.get(USER_STORAGE_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_expiry_clears_store_and_goes_home() {
        let store = Arc::new(MemoryStore::new());
        let (account, navigator) = account(
            MockTransport::new()
                .with_json(Method::Post, TOKEN_PATH, 200, json!({"token": "t1"}))
                .with_json(Method::Get, "/recipe", 401, json!({"error": "expired"})),
            store.clone(),
        );
        account.sign_in("ann", "pw").await.unwrap();

        let err = account
            .client()
            .get::<serde_json::Value>("/recipe")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::SessionExpired));
        assert_eq!(store.get(USER_STORAGE_KEY).unwrap(), None);
        assert_eq!(account.user(), None);
        assert_eq!(*navigator.visits.lock().unwrap(), vec!["/".to_string()]);
    }

    #[tokio::test]
    async fn test_sign_up_creates_then_signs_in() {
        let store = Arc::new(MemoryStore::new());
        let (account, _) = account(
            MockTransport::new()
                .with_json(Method::Post, USER_PATH, 201, json!({"id": 7, "name": "Ann"}))
                .with_json(Method::Post, TOKEN_PATH, 200, json!({"token": "t1"})),
            store,
        );

        let (created, stored) = account.sign_up("Ann", "ann", "pw").await.unwrap();
        assert_eq!(created.id, 7);
        assert_eq!(stored.token, "t1");

        let requests = account.client().transport().requests();
        assert_eq!(requests[0].path, USER_PATH);
        let body: serde_json::Value =
            serde_json::from_slice(&requests[0].body.as_ref().unwrap().data).unwrap();
        assert_eq!(body, json!({"username": "ann", "password": "pw", "name": "Ann"}));
    }

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.set(key, "")
        }
    }

    fn read_only_account(
        mock: MockTransport,
    ) -> (
        Account<Arc<MockTransport>, ReadOnlyStore>,
        Arc<RecordingNavigator>,
    ) {
        let navigator = Arc::new(RecordingNavigator::default());
        let client = Arc::new(SessionClient::new(Arc::new(mock)));
        let account = Account::load(client, Arc::new(ReadOnlyStore), navigator.clone()).unwrap();
        (account, navigator)
    }

    #[tokio::test]
    async fn test_unpersistable_sign_in_leaves_client_anonymous() {
        let (account, _) = read_only_account(
            MockTransport::new().with_json(Method::Post, TOKEN_PATH, 200, json!({"token": "t1"})),
        );

        let err = account.sign_in("ann", "pw").await.unwrap_err();
        assert!(matches!(err, SyncError::Store(StoreError::Io(_))));
        assert!(!account.client().is_authenticated());
        assert_eq!(account.user(), None);
    }

    #[tokio::test]
    async fn test_sign_out_navigates_home_even_if_store_fails() {
        let (account, navigator) = read_only_account(MockTransport::new());
        account.client().resume("t1".to_string(), || {});

        let err = account.sign_out().unwrap_err();
        assert!(matches!(err, SyncError::Store(_)));
        assert!(!account.client().is_authenticated());
        assert_eq!(*navigator.visits.lock().unwrap(), vec!["/".to_string()]);
    }

    #[tokio::test]
    async fn test_sign_out_clears_everything() {
        let store = Arc::new(MemoryStore::new());
        let (account, navigator) = account(
            MockTransport::new().with_json(Method::Post, TOKEN_PATH, 200, json!({"token": "t1"})),
            store.clone(),
        );
        account.sign_in("ann", "pw").await.unwrap();
        account.sign_out().unwrap();

        assert!(!account.client().is_authenticated());
        assert_eq!(store.get(USER_STORAGE_KEY).unwrap(), None);
        assert_eq!(*navigator.visits.lock().unwrap(), vec!["/".to_string()]);
    }
}
