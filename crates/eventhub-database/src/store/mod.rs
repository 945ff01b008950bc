//! Inventory store: transactional access to events, registrations and users.
//!
//! A transaction opened with [`InventoryStore::begin`] holds every row lock
//! it takes until [`InventoryTx::commit`] or [`InventoryTx::rollback`].
//! Dropping a transaction without either rolls it back.

pub mod memory;
pub mod postgres;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use eventhub_core::config::DatabaseConfig;
use eventhub_core::error::AppError;
use eventhub_core::result::AppResult;
use eventhub_core::types::pagination::{PageRequest, PageResponse};
use eventhub_entity::event::{Event, EventQuery};
use eventhub_entity::registration::Registration;
use eventhub_entity::user::User;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::connection::DatabasePool;
use crate::migration::run_migrations;

/// Persistent store of events and registrations.
#[async_trait]
pub trait InventoryStore: Send + Sync + 'static {
    /// Open a transaction. Lock waits inside it are bounded by the
    /// configured lock timeout.
    async fn begin(&self) -> AppResult<Box<dyn InventoryTx>>;

    /// Read an event without locking it.
    async fn load_plain(&self, id: Uuid) -> AppResult<Option<Event>>;

    /// Filtered, sorted, paginated event list.
    async fn paginate(
        &self,
        query: &EventQuery,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Event>>;

    /// Insert a freshly created event.
    async fn insert_event(&self, event: &Event) -> AppResult<()>;

    /// Delete an event and its registrations. Returns `false` if it did
    /// not exist. Waits for the event's row lock.
    async fn delete_event(&self, id: Uuid) -> AppResult<bool>;

    /// Read a registration without locking it.
    async fn find_registration(&self, id: Uuid) -> AppResult<Option<Registration>>;

    /// The confirmed registration of a (user, event) pair.
    async fn find_active_registration(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<Option<Registration>>;

    /// Confirmed registrations of a user, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Registration>>;

    /// Confirmed registrations of an event, newest first.
    async fn list_for_event(&self, event_id: Uuid) -> AppResult<Vec<Registration>>;

    /// Check store connectivity.
    async fn health_check(&self) -> AppResult<bool>;
}

/// A unit of work over the inventory.
#[async_trait]
pub trait InventoryTx: Send {
    /// Load an event and hold its row lock. `NotFound` if absent.
    async fn load_for_update(&mut self, id: Uuid) -> AppResult<Event>;

    /// Write back an event previously loaded for update.
    async fn save_event(&mut self, event: &Event) -> AppResult<()>;

    /// The confirmed registration of a (user, event) pair, as seen by this
    /// transaction.
    async fn find_active_registration(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<Option<Registration>>;

    /// Insert a registration. `Conflict` if the user already holds a
    /// confirmed one for the event.
    async fn insert_registration(&mut self, registration: &Registration) -> AppResult<()>;

    /// Load a registration and hold its row lock. `NotFound` if absent.
    async fn load_registration_for_update(&mut self, id: Uuid) -> AppResult<Registration>;

    /// Write back a registration previously loaded for update.
    async fn save_registration(&mut self, registration: &Registration) -> AppResult<()>;

    /// Make every write visible and release all locks.
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Discard every write and release all locks.
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Persistent store of user accounts.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Find a user by id.
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find a user by email, case-insensitively.
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Insert a user. `Conflict` if the email is taken.
    async fn insert_user(&self, user: &User) -> AppResult<()>;

    /// Whether a user with this id exists.
    async fn user_exists(&self, id: Uuid) -> AppResult<bool>;
}

/// The configured store backend.
///
/// The backend is selected at construction time from `database.provider`.
#[derive(Clone)]
pub struct StoreManager {
    inventory: Arc<dyn InventoryStore>,
    users: Arc<dyn UserStore>,
    pool: Option<DatabasePool>,
}

impl std::fmt::Debug for StoreManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreManager")
            .field("postgres", &self.pool.is_some())
            .finish()
    }
}

impl StoreManager {
    /// Connect to the configured backend, running migrations if enabled.
    pub async fn new(config: &DatabaseConfig) -> AppResult<Self> {
        let lock_timeout = Duration::from_millis(config.lock_timeout_ms);
        match config.provider.as_str() {
            "postgres" => {
                let pool = DatabasePool::connect(config).await?;
                if config.run_migrations {
                    run_migrations(pool.pool()).await?;
                }
                let store = Arc::new(PgStore::new(pool.pool().clone(), config.lock_timeout_ms));
                info!(lock_timeout_ms = config.lock_timeout_ms, "PostgreSQL store ready");
                Ok(Self {
                    inventory: store.clone(),
                    users: store,
                    pool: Some(pool),
                })
            }
            "memory" => {
                info!("Initializing in-memory store");
                Ok(Self::memory(lock_timeout))
            }
            other => Err(AppError::configuration(format!(
                "Unknown database provider: '{other}'. Supported: postgres, memory"
            ))),
        }
    }

    /// An empty in-process store.
    pub fn memory(lock_timeout: Duration) -> Self {
        let store = Arc::new(MemoryStore::new(lock_timeout));
        Self::from_stores(store.clone(), store)
    }

    /// Wrap existing store implementations (for testing).
    pub fn from_stores(inventory: Arc<dyn InventoryStore>, users: Arc<dyn UserStore>) -> Self {
        Self {
            inventory,
            users,
            pool: None,
        }
    }

    /// The event and registration store.
    pub fn inventory(&self) -> Arc<dyn InventoryStore> {
        Arc::clone(&self.inventory)
    }

    /// The user store.
    pub fn users(&self) -> Arc<dyn UserStore> {
        Arc::clone(&self.users)
    }

    /// Check backend connectivity.
    pub async fn health_check(&self) -> AppResult<bool> {
        self.inventory.health_check().await
    }

    /// Close the connection pool, if any.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
