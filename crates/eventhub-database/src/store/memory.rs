//! In-process inventory store.
//!
//! Row locks are per-id `tokio::sync::Mutex`es held as owned guards by the
//! transaction. Writes are staged on the transaction and applied atomically
//! on commit, so a rolled back or dropped transaction leaves no trace.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;
use uuid::Uuid;

use eventhub_core::error::AppError;
use eventhub_core::result::AppResult;
use eventhub_core::types::pagination::{PageRequest, PageResponse};
use eventhub_entity::event::{Event, EventQuery};
use eventhub_entity::registration::Registration;
use eventhub_entity::user::User;

use super::{InventoryStore, InventoryTx, UserStore};

type LockTable = Arc<DashMap<Uuid, Arc<Mutex<()>>>>;

#[derive(Debug, Default)]
struct Tables {
    events: HashMap<Uuid, Event>,
    registrations: HashMap<Uuid, Registration>,
    users: HashMap<Uuid, User>,
}

impl Tables {
    fn active_registration(&self, user_id: Uuid, event_id: Uuid) -> Option<&Registration> {
        self.registrations
            .values()
            .find(|r| r.user_id == user_id && r.event_id == event_id && r.is_active())
    }
}

/// Store kept entirely in process memory.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    event_locks: LockTable,
    registration_locks: LockTable,
    lock_timeout: Duration,
}

impl MemoryStore {
    /// Create an empty store whose lock waits give up after `lock_timeout`.
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            event_locks: Arc::new(DashMap::new()),
            registration_locks: Arc::new(DashMap::new()),
            lock_timeout,
        }
    }
}

async fn acquire(
    locks: &LockTable,
    id: Uuid,
    timeout: Duration,
    what: &str,
) -> AppResult<OwnedMutexGuard<()>> {
    let lock = locks
        .entry(id)
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone();
    tokio::time::timeout(timeout, lock.lock_owned())
        .await
        .map_err(|_| {
            AppError::service_unavailable(format!("Timed out waiting for {what} lock"))
        })
}

/// Drop lock entries nobody holds or waits on. Callers release their own
/// guards first.
fn prune(locks: &LockTable, ids: impl IntoIterator<Item = Uuid>) {
    for id in ids {
        locks.remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn InventoryTx>> {
        Ok(Box::new(MemoryTx {
            store: self.clone(),
            guards: Vec::new(),
            locked_events: HashSet::new(),
            locked_registrations: HashSet::new(),
            staged_events: HashMap::new(),
            staged_registrations: HashMap::new(),
        }))
    }

    async fn load_plain(&self, id: Uuid) -> AppResult<Option<Event>> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn paginate(
        &self,
        query: &EventQuery,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Event>> {
        let tables = self.tables.read().await;
        let mut matching: Vec<&Event> = tables
            .events
            .values()
            .filter(|e| query.matches(e))
            .collect();
        matching.sort_by(|a, b| query.compare(a, b));
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.limit() as usize)
            .cloned()
            .collect();
        Ok(PageResponse::new(items, page.page, page.page_size, total))
    }

    async fn insert_event(&self, event: &Event) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables.events.contains_key(&event.id) {
            return Err(AppError::conflict("Event already exists"));
        }
        tables.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn delete_event(&self, id: Uuid) -> AppResult<bool> {
        let guard = acquire(&self.event_locks, id, self.lock_timeout, "event").await?;
        let mut tables = self.tables.write().await;
        let removed = tables.events.remove(&id).is_some();
        let mut orphaned = Vec::new();
        if removed {
            tables.registrations.retain(|reg_id, r| {
                let keep = r.event_id != id;
                if !keep {
                    orphaned.push(*reg_id);
                }
                keep
            });
            debug!(
                event_id = %id,
                registrations = orphaned.len(),
                "Event and its registrations removed"
            );
        }
        drop(tables);
        drop(guard);
        prune(&self.event_locks, [id]);
        prune(&self.registration_locks, orphaned);
        Ok(removed)
    }

    async fn find_registration(&self, id: Uuid) -> AppResult<Option<Registration>> {
        Ok(self.tables.read().await.registrations.get(&id).cloned())
    }

    async fn find_active_registration(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<Option<Registration>> {
        Ok(self
            .tables
            .read()
            .await
            .active_registration(user_id, event_id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Registration>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .registrations
                .values()
                .filter(|r| r.user_id == user_id && r.is_active()),
        ))
    }

    async fn list_for_event(&self, event_id: Uuid) -> AppResult<Vec<Registration>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .registrations
                .values()
                .filter(|r| r.event_id == event_id && r.is_active()),
        ))
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

fn newest_first<'a>(rows: impl Iterator<Item = &'a Registration>) -> Vec<Registration> {
    let mut rows: Vec<Registration> = rows.cloned().collect();
    rows.sort_by(|a, b| {
        b.registration_date
            .cmp(&a.registration_date)
            .then_with(|| a.id.cmp(&b.id))
    });
    rows
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let email = user.email.to_lowercase();
        if tables
            .users
            .values()
            .any(|u| u.email.to_lowercase() == email)
        {
            return Err(AppError::conflict("A user with this email already exists"));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user_exists(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.tables.read().await.users.contains_key(&id))
    }
}

/// An in-memory transaction.
pub struct MemoryTx {
    store: MemoryStore,
    guards: Vec<OwnedMutexGuard<()>>,
    locked_events: HashSet<Uuid>,
    locked_registrations: HashSet<Uuid>,
    staged_events: HashMap<Uuid, Event>,
    staged_registrations: HashMap<Uuid, Registration>,
}

impl MemoryTx {
    async fn lock_event(&mut self, id: Uuid) -> AppResult<()> {
        if self.locked_events.contains(&id) {
            return Ok(());
        }
        let guard = acquire(&self.store.event_locks, id, self.store.lock_timeout, "event").await?;
        self.guards.push(guard);
        self.locked_events.insert(id);
        Ok(())
    }

    async fn lock_registration(&mut self, id: Uuid) -> AppResult<()> {
        if self.locked_registrations.contains(&id) {
            return Ok(());
        }
        let guard = acquire(
            &self.store.registration_locks,
            id,
            self.store.lock_timeout,
            "registration",
        )
        .await?;
        self.guards.push(guard);
        self.locked_registrations.insert(id);
        Ok(())
    }

    /// Staged writes take precedence over committed rows.
    fn active_in_view(
        &self,
        tables: &Tables,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Option<Registration> {
        let matches =
            |r: &Registration| r.user_id == user_id && r.event_id == event_id && r.is_active();
        self.staged_registrations
            .values()
            .find(|r| matches(r))
            .or_else(|| {
                tables.registrations.values().find(|r| {
                    matches(r) && !self.staged_registrations.contains_key(&r.id)
                })
            })
            .cloned()
    }
}

#[async_trait]
impl InventoryTx for MemoryTx {
    async fn load_for_update(&mut self, id: Uuid) -> AppResult<Event> {
        self.lock_event(id).await?;
        if let Some(event) = self.staged_events.get(&id) {
            return Ok(event.clone());
        }
        self.store
            .tables
            .read()
            .await
            .events
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Event not found"))
    }

    async fn save_event(&mut self, event: &Event) -> AppResult<()> {
        if !self.locked_events.contains(&event.id) {
            return Err(AppError::internal("Event saved without holding its lock"));
        }
        if !self.store.tables.read().await.events.contains_key(&event.id) {
            return Err(AppError::not_found("Event not found"));
        }
        self.staged_events.insert(event.id, event.clone());
        Ok(())
    }

    async fn find_active_registration(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<Option<Registration>> {
        let tables = self.store.tables.read().await;
        Ok(self.active_in_view(&tables, user_id, event_id))
    }

    async fn insert_registration(&mut self, registration: &Registration) -> AppResult<()> {
        let tables = self.store.tables.read().await;
        if !tables.events.contains_key(&registration.event_id) {
            return Err(AppError::not_found("Event not found"));
        }
        if !tables.users.contains_key(&registration.user_id) {
            return Err(AppError::not_found("User not found"));
        }
        if registration.is_active()
            && self
                .active_in_view(&tables, registration.user_id, registration.event_id)
                .is_some()
        {
            return Err(AppError::conflict(
                "You are already registered for this event",
            ));
        }
        drop(tables);
        self.staged_registrations
            .insert(registration.id, registration.clone());
        Ok(())
    }

    async fn load_registration_for_update(&mut self, id: Uuid) -> AppResult<Registration> {
        self.lock_registration(id).await?;
        if let Some(registration) = self.staged_registrations.get(&id) {
            return Ok(registration.clone());
        }
        self.store
            .tables
            .read()
            .await
            .registrations
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found("Registration not found"))
    }

    async fn save_registration(&mut self, registration: &Registration) -> AppResult<()> {
        if !self.locked_registrations.contains(&registration.id) {
            return Err(AppError::internal(
                "Registration saved without holding its lock",
            ));
        }
        if !self
            .store
            .tables
            .read()
            .await
            .registrations
            .contains_key(&registration.id)
        {
            return Err(AppError::not_found("Registration not found"));
        }
        self.staged_registrations
            .insert(registration.id, registration.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx {
            store,
            guards,
            locked_events,
            locked_registrations,
            staged_events,
            staged_registrations,
        } = *self;
        let result = apply(&store, staged_events, staged_registrations).await;
        drop(guards);
        prune(&store.event_locks, locked_events);
        prune(&store.registration_locks, locked_registrations);
        result
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let MemoryTx {
            store,
            guards,
            locked_events,
            locked_registrations,
            staged_events,
            staged_registrations,
        } = *self;
        debug!(
            staged_events = staged_events.len(),
            staged_registrations = staged_registrations.len(),
            "Transaction rolled back"
        );
        drop(guards);
        prune(&store.event_locks, locked_events);
        prune(&store.registration_locks, locked_registrations);
        Ok(())
    }
}

/// Apply staged writes in one step under the table write lock.
async fn apply(
    store: &MemoryStore,
    staged_events: HashMap<Uuid, Event>,
    staged_registrations: HashMap<Uuid, Registration>,
) -> AppResult<()> {
    let mut tables = store.tables.write().await;

    // Re-check the at-most-one-confirmed rule against the committed
    // state, mirroring the partial unique index.
    for registration in staged_registrations.values().filter(|r| r.is_active()) {
        let clash = tables.registrations.values().any(|r| {
            r.id != registration.id
                && r.user_id == registration.user_id
                && r.event_id == registration.event_id
                && r.is_active()
                && staged_registrations
                    .get(&r.id)
                    .map_or(true, |staged| staged.is_active())
        });
        if clash {
            return Err(AppError::conflict(
                "You are already registered for this event",
            ));
        }
    }

    for (id, event) in staged_events {
        if let Some(row) = tables.events.get_mut(&id) {
            *row = event;
        }
    }
    for (id, registration) in staged_registrations {
        if tables.events.contains_key(&registration.event_id) {
            tables.registrations.insert(id, registration);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use eventhub_core::error::ErrorKind;
    use eventhub_entity::event::CreateEvent;
    use eventhub_entity::registration::RegistrationStatus;
    use eventhub_entity::user::{CreateUser, UserRole};

    fn store() -> MemoryStore {
        MemoryStore::new(Duration::from_millis(200))
    }

    fn event(seats: i32) -> Event {
        let now = Utc::now();
        Event::create(
            CreateEvent {
                title: "Launch".to_string(),
                description: "Product launch".to_string(),
                date: now + ChronoDuration::days(7),
                venue: "Main hall".to_string(),
                total_seats: seats,
            },
            now,
        )
        .unwrap()
    }

    fn user(email: &str) -> User {
        User::new(
            CreateUser {
                name: "Test".to_string(),
                email: email.to_string(),
                password_hash: "hash".to_string(),
                role: UserRole::User,
            },
            Utc::now(),
        )
    }

    async fn seeded(seats: i32) -> (MemoryStore, Event, User) {
        let store = store();
        let event = event(seats);
        let user = user("a@example.com");
        store.insert_event(&event).await.unwrap();
        store.insert_user(&user).await.unwrap();
        (store, event, user)
    }

    #[tokio::test]
    async fn test_commit_applies_staged_writes() {
        let (store, event, user) = seeded(2).await;
        let mut tx = store.begin().await.unwrap();
        let mut loaded = tx.load_for_update(event.id).await.unwrap();
        loaded.reserve_seats(1).unwrap();
        tx.save_event(&loaded).await.unwrap();
        let registration = Registration::confirmed(user.id, event.id, Utc::now());
        tx.insert_registration(&registration).await.unwrap();

        // Not visible before commit.
        assert_eq!(
            store.load_plain(event.id).await.unwrap().unwrap().available_seats(),
            2
        );
        tx.commit().await.unwrap();

        assert_eq!(
            store.load_plain(event.id).await.unwrap().unwrap().available_seats(),
            1
        );
        assert!(store
            .find_active_registration(user.id, event.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let (store, event, _) = seeded(2).await;
        let mut tx = store.begin().await.unwrap();
        let mut loaded = tx.load_for_update(event.id).await.unwrap();
        loaded.reserve_seats(2).unwrap();
        tx.save_event(&loaded).await.unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(
            store.load_plain(event.id).await.unwrap().unwrap().available_seats(),
            2
        );
    }

    #[tokio::test]
    async fn test_lock_wait_times_out() {
        let (store, event, _) = seeded(2).await;
        let mut holder = store.begin().await.unwrap();
        holder.load_for_update(event.id).await.unwrap();

        let mut waiter = store.begin().await.unwrap();
        let err = waiter.load_for_update(event.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ServiceUnavailable);

        holder.rollback().await.unwrap();
        let mut retry = store.begin().await.unwrap();
        assert!(retry.load_for_update(event.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_lock_serializes_reservations() {
        let event = event(50);
        let store = Arc::new(MemoryStore::new(Duration::from_secs(5)));
        store.insert_event(&event).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = Arc::clone(&store);
            let id = event.id;
            handles.push(tokio::spawn(async move {
                let mut tx = store.begin().await.unwrap();
                let mut loaded = tx.load_for_update(id).await.unwrap();
                tokio::task::yield_now().await;
                loaded.reserve_seats(1).unwrap();
                tx.save_event(&loaded).await.unwrap();
                tx.commit().await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(
            store.load_plain(event.id).await.unwrap().unwrap().available_seats(),
            30
        );
    }

    #[tokio::test]
    async fn test_second_confirmed_registration_conflicts() {
        let (store, event, user) = seeded(5).await;
        let mut tx = store.begin().await.unwrap();
        tx.insert_registration(&Registration::confirmed(user.id, event.id, Utc::now()))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let err = tx
            .insert_registration(&Registration::confirmed(user.id, event.id, Utc::now()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_cancelled_registration_allows_new_one() {
        let (store, event, user) = seeded(5).await;
        let first = Registration::confirmed(user.id, event.id, Utc::now());
        let mut tx = store.begin().await.unwrap();
        tx.insert_registration(&first).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let mut loaded = tx.load_registration_for_update(first.id).await.unwrap();
        loaded.cancel().unwrap();
        tx.save_registration(&loaded).await.unwrap();
        tx.insert_registration(&Registration::confirmed(user.id, event.id, Utc::now()))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let stored = store.find_registration(first.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RegistrationStatus::Cancelled);
        assert_eq!(store.list_for_user(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_registration_requires_user_and_event() {
        let (store, event, _) = seeded(5).await;
        let mut tx = store.begin().await.unwrap();
        let err = tx
            .insert_registration(&Registration::confirmed(Uuid::new_v4(), event.id, Utc::now()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_event_cascades() {
        let (store, event, user) = seeded(5).await;
        let mut tx = store.begin().await.unwrap();
        tx.insert_registration(&Registration::confirmed(user.id, event.id, Utc::now()))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert!(store.delete_event(event.id).await.unwrap());
        assert!(store.load_plain(event.id).await.unwrap().is_none());
        assert!(store
            .list_for_event(event.id)
            .await
            .unwrap()
            .is_empty());
        assert!(!store.delete_event(event.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_lock_entries_released_after_use() {
        let (store, event, user) = seeded(5).await;
        let registration = Registration::confirmed(user.id, event.id, Utc::now());

        let mut tx = store.begin().await.unwrap();
        tx.load_for_update(event.id).await.unwrap();
        tx.insert_registration(&registration).await.unwrap();
        assert_eq!(store.event_locks.len(), 1);
        tx.commit().await.unwrap();
        assert!(store.event_locks.is_empty());

        let mut tx = store.begin().await.unwrap();
        tx.load_registration_for_update(registration.id).await.unwrap();
        assert_eq!(store.registration_locks.len(), 1);
        tx.rollback().await.unwrap();
        assert!(store.registration_locks.is_empty());

        // A held lock survives another transaction's release.
        let mut holder = store.begin().await.unwrap();
        holder.load_for_update(event.id).await.unwrap();
        let mut other = store.begin().await.unwrap();
        other.load_registration_for_update(registration.id).await.unwrap();
        other.rollback().await.unwrap();
        assert_eq!(store.event_locks.len(), 1);
        holder.rollback().await.unwrap();

        assert!(store.delete_event(event.id).await.unwrap());
        assert!(store.event_locks.is_empty());
        assert!(store.registration_locks.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = store();
        store.insert_user(&user("x@example.com")).await.unwrap();
        let err = store.insert_user(&user("X@Example.com")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(store
            .find_user_by_email("X@EXAMPLE.COM")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_list_events_paginates_sorted() {
        let store = store();
        for _ in 0..3 {
            store.insert_event(&event(10)).await.unwrap();
        }
        let page = store
            .paginate(&EventQuery::default(), &PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(page.total_items, 3);
        assert_eq!(page.items.len(), 1);
        assert!(page.has_previous);
    }
}
