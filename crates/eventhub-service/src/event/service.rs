//! Event catalogue: creation, reads through the cache, and admin edits.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use eventhub_auth::RbacEnforcer;
use eventhub_core::error::AppError;
use eventhub_core::types::pagination::{PageRequest, PageResponse};
use eventhub_database::store::{InventoryStore, InventoryTx};
use eventhub_entity::event::{CreateEvent, Event, EventQuery, UpdateEvent};

use super::cache::EventCache;
use crate::context::RequestContext;

/// Manages the event catalogue.
#[derive(Clone)]
pub struct EventService {
    /// Inventory store.
    store: Arc<dyn InventoryStore>,
    /// Read-through cache.
    cache: EventCache,
    /// Role checks.
    rbac: RbacEnforcer,
}

impl std::fmt::Debug for EventService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventService")
            .field("cache", &self.cache)
            .finish()
    }
}

impl EventService {
    /// Creates a new event service.
    pub fn new(store: Arc<dyn InventoryStore>, cache: EventCache) -> Self {
        Self {
            store,
            cache,
            rbac: RbacEnforcer::new(),
        }
    }

    /// Gets an event by ID, serving from the cache when possible.
    pub async fn get_event(&self, event_id: Uuid) -> Result<Event, AppError> {
        if let Some(event) = self.cache.get_event(event_id).await {
            debug!(event_id = %event_id, "Event served from cache");
            return Ok(event);
        }
        let seen = self.cache.generation();

        let event = self
            .store
            .load_plain(event_id)
            .await?
            .ok_or_else(|| AppError::not_found("Event not found"))?;
        self.cache.put_event(&event, seen).await;
        Ok(event)
    }

    /// Lists events matching the filters, serving from the cache when possible.
    pub async fn list_events(
        &self,
        query: EventQuery,
        page: PageRequest,
    ) -> Result<PageResponse<Event>, AppError> {
        query.validate()?;

        if let Some(events) = self.cache.get_list(&query, &page).await {
            debug!(page = page.page, "Event list served from cache");
            return Ok(events);
        }
        let seen = self.cache.generation();

        let events = self.store.paginate(&query, &page).await?;
        self.cache.put_list(&query, &page, &events, seen).await;
        Ok(events)
    }

    /// Creates a new event with every seat available. Admin only.
    pub async fn create_event(
        &self,
        ctx: &RequestContext,
        data: CreateEvent,
    ) -> Result<Event, AppError> {
        self.rbac.require_admin(ctx.role)?;

        let event = Event::create(data, Utc::now())?;
        self.store.insert_event(&event).await?;
        self.cache.invalidate(event.id).await;

        info!(
            user_id = %ctx.user_id,
            event_id = %event.id,
            total_seats = event.total_seats(),
            "Event created"
        );
        Ok(event)
    }

    /// Updates an event's descriptive fields under its row lock. Admin only.
    ///
    /// Seat counts are untouched, so the update cannot race a reservation.
    pub async fn update_event(
        &self,
        ctx: &RequestContext,
        event_id: Uuid,
        update: UpdateEvent,
    ) -> Result<Event, AppError> {
        self.rbac.require_admin(ctx.role)?;
        if update.is_empty() {
            return Err(AppError::validation("No fields to update"));
        }

        let mut tx = self.store.begin().await?;
        let event = match Self::apply_update(tx.as_mut(), event_id, update).await {
            Ok(event) => event,
            Err(e) => {
                abort(tx).await;
                return Err(e);
            }
        };
        tx.commit().await?;
        self.cache.invalidate(event_id).await;

        info!(user_id = %ctx.user_id, event_id = %event_id, "Event updated");
        Ok(event)
    }

    async fn apply_update(
        tx: &mut dyn InventoryTx,
        event_id: Uuid,
        update: UpdateEvent,
    ) -> Result<Event, AppError> {
        let mut event = tx.load_for_update(event_id).await?;
        event.apply_update(update, Utc::now())?;
        tx.save_event(&event).await?;
        Ok(event)
    }

    /// Deletes an event and its registrations. Admin only.
    pub async fn delete_event(&self, ctx: &RequestContext, event_id: Uuid) -> Result<(), AppError> {
        self.rbac.require_admin(ctx.role)?;

        if !self.store.delete_event(event_id).await? {
            return Err(AppError::not_found("Event not found"));
        }
        self.cache.invalidate(event_id).await;

        info!(user_id = %ctx.user_id, event_id = %event_id, "Event deleted");
        Ok(())
    }
}

/// Roll back a failed unit of work. The original error is what the caller
/// reports; a rollback failure is only logged.
pub(crate) async fn abort(tx: Box<dyn InventoryTx>) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, "Rollback failed");
    }
}
