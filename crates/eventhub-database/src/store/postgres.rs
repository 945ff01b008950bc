//! PostgreSQL-backed inventory store.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use eventhub_core::error::AppError;
use eventhub_core::result::AppResult;
use eventhub_core::types::pagination::{PageRequest, PageResponse};
use eventhub_entity::event::{Event, EventQuery};
use eventhub_entity::registration::Registration;
use eventhub_entity::user::User;

use super::{InventoryStore, InventoryTx, UserStore};
use crate::repositories::{
    map_db_error, EventRepository, RegistrationRepository, UserRepository,
};

/// Store over a PostgreSQL pool.
///
/// Row locks are `SELECT ... FOR UPDATE`; every transaction sets
/// `lock_timeout` so a blocked writer fails with `ServiceUnavailable`
/// instead of waiting indefinitely.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    events: EventRepository,
    registrations: RegistrationRepository,
    users: UserRepository,
    lock_timeout_ms: u64,
}

impl PgStore {
    /// Create a store over `pool`.
    pub fn new(pool: PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            events: EventRepository::new(pool.clone()),
            registrations: RegistrationRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            pool,
            lock_timeout_ms,
        }
    }

    async fn begin_tx(&self) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_db_error(e, "Failed to begin transaction"))?;
        // SET does not accept bind parameters; the value is a plain integer.
        let statement = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout_ms);
        sqlx::query(&statement)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_db_error(e, "Failed to set lock timeout"))?;
        Ok(tx)
    }
}

#[async_trait]
impl InventoryStore for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn InventoryTx>> {
        let tx = self.begin_tx().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn load_plain(&self, id: Uuid) -> AppResult<Option<Event>> {
        self.events.find_by_id(id).await
    }

    async fn paginate(
        &self,
        query: &EventQuery,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Event>> {
        self.events.paginate(query, page).await
    }

    async fn insert_event(&self, event: &Event) -> AppResult<()> {
        self.events.create(event).await
    }

    async fn delete_event(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.begin_tx().await?;
        let deleted = EventRepository::delete(&mut tx, id).await?;
        tx.commit()
            .await
            .map_err(|e| map_db_error(e, "Failed to commit event deletion"))?;
        Ok(deleted)
    }

    async fn find_registration(&self, id: Uuid) -> AppResult<Option<Registration>> {
        self.registrations.find_by_id(id).await
    }

    async fn find_active_registration(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<Option<Registration>> {
        self.registrations.find_active(user_id, event_id).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Registration>> {
        self.registrations.list_for_user(user_id).await
    }

    async fn list_for_event(&self, event_id: Uuid) -> AppResult<Vec<Registration>> {
        self.registrations.list_for_event(event_id).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|v| v == 1)
            .map_err(|e| map_db_error(e, "Health check failed"))
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        self.users.find_by_id(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.users.find_by_email(email).await
    }

    async fn insert_user(&self, user: &User) -> AppResult<()> {
        self.users.create(user).await
    }

    async fn user_exists(&self, id: Uuid) -> AppResult<bool> {
        self.users.exists(id).await
    }
}

/// A PostgreSQL transaction. Dropping it rolls back.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl InventoryTx for PgTx {
    async fn load_for_update(&mut self, id: Uuid) -> AppResult<Event> {
        EventRepository::find_by_id_for_update(&mut self.tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Event not found"))
    }

    async fn save_event(&mut self, event: &Event) -> AppResult<()> {
        if !EventRepository::update(&mut self.tx, event).await? {
            return Err(AppError::not_found("Event not found"));
        }
        Ok(())
    }

    async fn find_active_registration(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<Option<Registration>> {
        RegistrationRepository::find_active_in(&mut self.tx, user_id, event_id).await
    }

    async fn insert_registration(&mut self, registration: &Registration) -> AppResult<()> {
        RegistrationRepository::create(&mut self.tx, registration).await
    }

    async fn load_registration_for_update(&mut self, id: Uuid) -> AppResult<Registration> {
        RegistrationRepository::find_by_id_for_update(&mut self.tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("Registration not found"))
    }

    async fn save_registration(&mut self, registration: &Registration) -> AppResult<()> {
        if !RegistrationRepository::update_status(&mut self.tx, registration).await? {
            return Err(AppError::not_found("Registration not found"));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let PgTx { tx } = *self;
        tx.commit()
            .await
            .map_err(|e| map_db_error(e, "Failed to commit transaction"))
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let PgTx { tx } = *self;
        tx.rollback()
            .await
            .map_err(|e| map_db_error(e, "Failed to roll back transaction"))?;
        debug!("Transaction rolled back");
        Ok(())
    }
}
