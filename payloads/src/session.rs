//! Client-side session state: the bearer token and the cached user profile.
//!
//! The session is handed to [`crate::APIClient`] explicitly. When the backend
//! answers 401 the client calls [`Session::expire`], which clears the stored
//! entries and hands the login route to the unauthorized handler.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use secrecy::SecretString;

use crate::responses::User;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";
pub const LOGIN_ROUTE: &str = "/login";

/// Key-value storage for session entries, e.g. browser local storage or a
/// file in the user's config directory.
pub trait SessionStore: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str);
    fn remove_item(&self, key: &str);
}

/// A store that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl SessionStore for MemoryStore {
    fn get_item(&self, key: &str) -> Option<String> {
        let entries =
            self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        let mut entries =
            self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
    }

    fn remove_item(&self, key: &str) {
        let mut entries =
            self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
    }
}

/// A store persisted as a flat JSON object on disk.
///
/// Entries are cached in memory and the whole file is rewritten on every
/// change. Write failures are logged rather than returned, matching the
/// fire-and-forget semantics of browser storage.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("ignoring corrupt session file {path:?}: {e}");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) {
        let result = serde_json::to_string_pretty(entries)
            .map_err(std::io::Error::other)
            .and_then(|contents| std::fs::write(&self.path, contents));
        if let Err(e) = result {
            tracing::error!(
                "failed to write session file {:?}: {e}",
                self.path
            );
        }
    }
}

impl SessionStore for JsonFileStore {
    fn get_item(&self, key: &str) -> Option<String> {
        let entries =
            self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        let mut entries =
            self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries);
    }

    fn remove_item(&self, key: &str) {
        let mut entries =
            self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.persist(&entries);
        }
    }
}

type UnauthorizedHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Shared handle to the session. Cloning is cheap and clones see the same
/// store.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
    on_unauthorized: UnauthorizedHandler,
    login_route: String,
}

impl Session {
    pub fn new(store: impl SessionStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
            on_unauthorized: Arc::new(|route| {
                tracing::info!("session expired, redirecting to {route}");
            }),
            login_route: LOGIN_ROUTE.to_string(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::default())
    }

    /// Called with the login route each time the backend rejects the
    /// session. This is where a UI performs its navigation.
    pub fn on_unauthorized(
        mut self,
        handler: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.on_unauthorized = Arc::new(handler);
        self
    }

    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    pub fn token(&self) -> Option<SecretString> {
        self.store
            .get_item(TOKEN_KEY)
            .filter(|token| !token.is_empty())
            .map(SecretString::from)
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// The cached profile of the signed-in user, if any.
    pub fn user(&self) -> Option<User> {
        let raw = self.store.get_item(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!("discarding unreadable cached user: {e}");
                None
            }
        }
    }

    /// Store a freshly issued token along with the user's profile.
    pub fn sign_in(
        &self,
        token: &str,
        user: &User,
    ) -> Result<(), serde_json::Error> {
        let user = serde_json::to_string(user)?;
        self.store.set_item(TOKEN_KEY, token);
        self.store.set_item(USER_KEY, &user);
        Ok(())
    }

    pub fn sign_out(&self) {
        self.store.remove_item(TOKEN_KEY);
        self.store.remove_item(USER_KEY);
    }

    /// Forget the session and send the user to the login route.
    pub fn expire(&self) {
        self.sign_out();
        (self.on_unauthorized)(&self.login_route);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .field("login_route", &self.login_route)
            .finish()
    }
}
