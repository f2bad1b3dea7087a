//! Client-side session state with change notification.
//!
//! The store holds at most one signed-in user. Every change is pushed to all
//! live subscribers, and a new subscriber is handed the current value right
//! away instead of waiting for the next change.
//!
//! Writes (`set_from_login_response`, `clear`) and `subscribe` take the same
//! writer lock and queue their notification before releasing it, so observers
//! see changes in the order they were made and never a half-applied update.
//! The queue is drained after the lock drops by one thread at a time; an
//! observer may call back into the store, and whatever it triggers is
//! delivered once the current callback returns.

use crate::token::Identity;
use serde::{Deserialize, Serialize};
use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex, PoisonError, RwLock, Weak},
    thread,
};
use tracing::{debug, warn};

use super::storage::SessionStorage;

/// Storage key for the persisted user.
pub const CURRENT_USER_KEY: &str = "currentUser";

/// The signed-in user as the client keeps it.
///
/// `token` is present when the client manages the bearer token itself; a
/// cookie-only session carries none.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: u64,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl StoredUser {
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

impl fmt::Debug for StoredUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredUser")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("token", &self.token.as_ref().map(|_| ".."))
            .finish()
    }
}

/// The parts of a login response the client keeps.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct LoginPayload {
    pub user: Identity,
    #[serde(default)]
    pub token: Option<String>,
}

impl fmt::Debug for LoginPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginPayload")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

type Observer = Arc<dyn Fn(Option<&StoredUser>) + Send + Sync>;

struct Inner {
    storage: Arc<dyn SessionStorage>,
    writer: Mutex<()>,
    current: RwLock<Option<StoredUser>>,
    observers: Mutex<Observers>,
    pending: Mutex<Pending>,
}

#[derive(Default)]
struct Observers {
    next_id: u64,
    entries: Vec<(u64, Observer)>,
}

/// A value waiting to be handed to the observers registered when it was queued.
struct Notice {
    value: Option<StoredUser>,
    recipients: Vec<u64>,
}

#[derive(Default)]
struct Pending {
    queue: VecDeque<Notice>,
    delivering: bool,
}

impl Inner {
    fn snapshot(&self) -> Option<StoredUser> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace(&self, value: Option<StoredUser>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    fn observer_ids(&self) -> Vec<u64> {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }

    /// Observers still registered among `recipients`.
    fn live_observers(&self, recipients: &[u64]) -> Vec<Observer> {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .filter(|(id, _)| recipients.contains(id))
            .map(|(_, observer)| observer.clone())
            .collect()
    }

    /// Must be called with the writer lock held.
    fn enqueue(&self, recipients: Vec<u64>) {
        let notice = Notice {
            value: self.snapshot(),
            recipients,
        };
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .queue
            .push_back(notice);
    }

    /// Drain queued notices unless another caller is already draining.
    fn deliver(&self) {
        {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            if pending.delivering {
                return;
            }
            pending.delivering = true;
        }
        let _reset = DeliveryReset(self);

        loop {
            let notice = {
                let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
                match pending.queue.pop_front() {
                    Some(notice) => notice,
                    None => {
                        pending.delivering = false;
                        return;
                    }
                }
            };
            for observer in self.live_observers(&notice.recipients) {
                observer(notice.value.as_ref());
            }
        }
    }
}

/// Releases the delivery slot when an observer panics mid-drain.
struct DeliveryReset<'a>(&'a Inner);

impl Drop for DeliveryReset<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .delivering = false;
        }
    }
}

/// Shared handle; clones observe and mutate the same session.
#[derive(Clone)]
pub struct ClientSessionStore {
    inner: Arc<Inner>,
}

impl fmt::Debug for ClientSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSessionStore")
            .field("current", &self.inner.snapshot())
            .finish_non_exhaustive()
    }
}

impl ClientSessionStore {
    /// Start from whatever `storage` holds under [`CURRENT_USER_KEY`].
    ///
    /// An unreadable or corrupt entry is logged, removed, and treated as
    /// signed out.
    #[must_use]
    pub fn load(storage: Arc<dyn SessionStorage>) -> Self {
        let current = match storage.get(CURRENT_USER_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<StoredUser>(&raw) {
                Ok(user) => {
                    debug!(user_id = user.id, "Restored session from storage");
                    Some(user)
                }
                Err(err) => {
                    warn!("Discarding corrupt stored session: {err}");
                    if let Err(err) = storage.remove(CURRENT_USER_KEY) {
                        warn!("Failed to remove corrupt stored session: {err:#}");
                    }
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!("Failed to read stored session: {err:#}");
                None
            }
        };

        Self {
            inner: Arc::new(Inner {
                storage,
                writer: Mutex::new(()),
                current: RwLock::new(current),
                observers: Mutex::new(Observers::default()),
                pending: Mutex::new(Pending::default()),
            }),
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<StoredUser> {
        self.inner.snapshot()
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.inner
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Bearer token to attach to outgoing requests, if the session holds one.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.inner
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|user| user.token.clone())
    }

    /// Register `observer`; it is called with the current value and again on
    /// every change until the [`Subscription`] drops.
    ///
    /// The first call happens before this returns, unless `subscribe` runs
    /// inside another observer or while another thread is delivering; then it
    /// is queued behind the notifications already pending.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(Option<&StoredUser>) + Send + Sync + 'static,
    {
        let observer: Observer = Arc::new(observer);
        let id = {
            let _writer = self.inner.writer.lock().unwrap_or_else(PoisonError::into_inner);
            let id = {
                let mut observers = self
                    .inner
                    .observers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                let id = observers.next_id;
                observers.next_id += 1;
                observers.entries.push((id, observer));
                id
            };
            self.inner.enqueue(vec![id]);
            id
        };
        self.inner.deliver();

        Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Adopt the user from a successful login.
    ///
    /// The user is persisted only when the payload carries a token. A
    /// cookie-only session lives in memory and removes any entry an earlier
    /// login left behind, so a reload cannot bring back the previous user.
    pub fn set_from_login_response(&self, payload: &LoginPayload) {
        {
            let _writer = self.inner.writer.lock().unwrap_or_else(PoisonError::into_inner);

            let user = StoredUser {
                id: payload.user.id,
                username: payload.user.username.clone(),
                token: payload.token.clone(),
            };

            if user.token.is_some() {
                match serde_json::to_string(&user) {
                    Ok(raw) => {
                        if let Err(err) = self.inner.storage.set(CURRENT_USER_KEY, &raw) {
                            warn!("Failed to persist session: {err:#}");
                        }
                    }
                    Err(err) => warn!("Failed to encode session: {err}"),
                }
            } else if let Err(err) = self.inner.storage.remove(CURRENT_USER_KEY) {
                warn!("Failed to remove stored session: {err:#}");
            }

            debug!(user_id = user.id, "Session set");
            self.inner.replace(Some(user));
            self.inner.enqueue(self.inner.observer_ids());
        }
        self.inner.deliver();
    }

    /// Forget the user, in memory and in storage.
    pub fn clear(&self) {
        {
            let _writer = self.inner.writer.lock().unwrap_or_else(PoisonError::into_inner);

            if let Err(err) = self.inner.storage.remove(CURRENT_USER_KEY) {
                warn!("Failed to remove stored session: {err:#}");
            }

            debug!("Session cleared");
            self.inner.replace(None);
            self.inner.enqueue(self.inner.observer_ids());
        }
        self.inner.deliver();
    }
}

/// Live registration of an observer; dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    inner: Weak<Inner>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner
                .observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entries
                .retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::storage::MemoryStorage;
    use anyhow::Result;

    type Seen = Arc<Mutex<Vec<Option<u64>>>>;

    fn recorder() -> (Seen, impl Fn(Option<&StoredUser>) + Send + Sync + 'static) {
        let seen: Seen = Arc::default();
        let sink = seen.clone();
        let observer = move |user: Option<&StoredUser>| {
            if let Ok(mut seen) = sink.lock() {
                seen.push(user.map(|user| user.id));
            }
        };
        (seen, observer)
    }

    fn seen(seen: &Seen) -> Vec<Option<u64>> {
        seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }

    fn payload(id: u64, token: Option<&str>) -> LoginPayload {
        LoginPayload {
            user: Identity {
                id,
                username: format!("user{id}@web.com"),
            },
            token: token.map(str::to_string),
        }
    }

    fn store() -> (ClientSessionStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (ClientSessionStore::load(storage.clone()), storage)
    }

    #[test]
    fn starts_signed_out_on_empty_storage() {
        let (store, _) = store();
        assert_eq!(store.current(), None);
        assert!(!store.is_signed_in());
        assert_eq!(store.token(), None);
    }

    #[test]
    fn login_with_token_persists_and_exposes_bearer() -> Result<()> {
        let (store, storage) = store();
        store.set_from_login_response(&payload(1, Some("tok")));

        assert!(store.is_signed_in());
        assert_eq!(store.token().as_deref(), Some("tok"));

        let raw = storage.get(CURRENT_USER_KEY)?.unwrap_or_default();
        let stored: StoredUser = serde_json::from_str(&raw)?;
        assert_eq!(stored.id, 1);
        assert_eq!(stored.token.as_deref(), Some("tok"));
        Ok(())
    }

    #[test]
    fn cookie_only_login_stays_in_memory() -> Result<()> {
        let (store, storage) = store();
        store.set_from_login_response(&payload(1, None));

        assert!(store.is_signed_in());
        assert_eq!(store.token(), None);
        assert_eq!(storage.get(CURRENT_USER_KEY)?, None);
        Ok(())
    }

    #[test]
    fn cookie_only_login_drops_previous_stored_user() -> Result<()> {
        let (store, storage) = store();
        store.set_from_login_response(&payload(1, Some("token-a")));
        store.set_from_login_response(&payload(2, None));
        assert_eq!(storage.get(CURRENT_USER_KEY)?, None);

        let reloaded = ClientSessionStore::load(storage);
        assert_eq!(reloaded.current(), None);
        assert_eq!(reloaded.token(), None);
        Ok(())
    }

    #[test]
    fn clear_removes_storage_entry() -> Result<()> {
        let (store, storage) = store();
        store.set_from_login_response(&payload(1, Some("tok")));
        store.clear();

        assert_eq!(store.current(), None);
        assert_eq!(storage.get(CURRENT_USER_KEY)?, None);
        Ok(())
    }

    #[test]
    fn restores_from_storage() -> Result<()> {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(
            CURRENT_USER_KEY,
            r#"{"id":1,"username":"miles@web.com","token":"tok"}"#,
        )?;

        let store = ClientSessionStore::load(storage);
        let user = store.current();
        assert_eq!(user.as_ref().map(|user| user.id), Some(1));
        assert_eq!(store.token().as_deref(), Some("tok"));
        Ok(())
    }

    #[test]
    fn corrupt_storage_entry_is_discarded() -> Result<()> {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(CURRENT_USER_KEY, "{not json")?;

        let store = ClientSessionStore::load(storage.clone());
        assert_eq!(store.current(), None);
        assert_eq!(storage.get(CURRENT_USER_KEY)?, None);
        Ok(())
    }

    #[test]
    fn new_subscriber_gets_current_value_immediately() {
        let (store, _) = store();
        store.set_from_login_response(&payload(7, Some("tok")));

        let (seen_values, observer) = recorder();
        let _subscription = store.subscribe(observer);
        assert_eq!(seen(&seen_values), vec![Some(7)]);
    }

    #[test]
    fn subscribers_see_every_change_in_order() {
        let (store, _) = store();
        let (first, first_observer) = recorder();
        let (second, second_observer) = recorder();
        let _a = store.subscribe(first_observer);
        let _b = store.subscribe(second_observer);

        store.set_from_login_response(&payload(1, Some("a")));
        store.set_from_login_response(&payload(2, None));
        store.clear();

        let expected = vec![None, Some(1), Some(2), None];
        assert_eq!(seen(&first), expected);
        assert_eq!(seen(&second), expected);
    }

    #[test]
    fn dropped_subscription_stops_updates() {
        let (store, _) = store();
        let (seen_values, observer) = recorder();
        let subscription = store.subscribe(observer);

        store.set_from_login_response(&payload(1, None));
        subscription.unsubscribe();
        store.clear();

        assert_eq!(seen(&seen_values), vec![None, Some(1)]);
    }

    #[test]
    fn observer_may_read_current() {
        let (store, _) = store();
        let reader = store.clone();
        let (seen_values, _) = recorder();
        let sink = seen_values.clone();
        let _subscription = store.subscribe(move |_| {
            if let Ok(mut seen) = sink.lock() {
                seen.push(reader.current().map(|user| user.id));
            }
        });

        store.set_from_login_response(&payload(3, None));
        assert_eq!(seen(&seen_values), vec![None, Some(3)]);
    }

    #[test]
    fn observer_may_clear_and_subscribe() {
        let (store, _) = store();
        let writer = store.clone();
        let nested: Arc<Mutex<Vec<Subscription>>> = Arc::default();
        let nested_sink = nested.clone();
        let (late, late_observer) = recorder();
        let late_observer = Arc::new(late_observer);

        let (seen_values, observer) = recorder();
        let _watch = store.subscribe(observer);
        let _logout_on_token_loss = store.subscribe(move |user| {
            if user.is_some_and(|user| user.token.is_none()) {
                writer.clear();
                let late_observer = late_observer.clone();
                let subscription = writer.subscribe(move |user| late_observer(user));
                if let Ok(mut nested) = nested_sink.lock() {
                    nested.push(subscription);
                }
            }
        });

        store.set_from_login_response(&payload(4, None));

        assert_eq!(seen(&seen_values), vec![None, Some(4), None]);
        assert_eq!(seen(&late), vec![None]);
        assert_eq!(store.current(), None);
    }

    #[test]
    fn concurrent_logins_never_mix_users() {
        let (store, _) = store();
        let handles: Vec<_> = (1..=8)
            .map(|id| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let token = format!("token-{id}");
                    store.set_from_login_response(&payload(id, Some(&token)));
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().is_ok());
        }

        let user = store.current();
        assert!(user.is_some());
        if let Some(user) = user {
            assert_eq!(user.username, format!("user{}@web.com", user.id));
            assert_eq!(user.token, Some(format!("token-{}", user.id)));
        }
    }

    #[test]
    fn debug_hides_token() {
        let user = StoredUser {
            id: 1,
            username: "miles@web.com".to_string(),
            token: Some("secret-token".to_string()),
        };
        assert!(!format!("{user:?}").contains("secret-token"));
    }
}
