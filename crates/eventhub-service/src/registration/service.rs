//! Seat reservation coordination.
//!
//! A registration and its seat decrement commit together or not at all.
//! Both run inside one store transaction holding the event's row lock; if
//! any step after the decrement fails, the seat is released on the loaded
//! event and the transaction is rolled back, so storage never observes the
//! decrement alone.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use eventhub_auth::RbacEnforcer;
use eventhub_core::error::{AppError, ErrorKind};
use eventhub_database::store::{InventoryStore, InventoryTx, UserStore};
use eventhub_entity::event::{Event, SeatError};
use eventhub_entity::registration::Registration;

use crate::context::RequestContext;
use crate::event::EventCache;
use crate::event::service::abort;

/// Coordinates seat reservations and cancellations.
#[derive(Clone)]
pub struct RegistrationService {
    /// Inventory store.
    store: Arc<dyn InventoryStore>,
    /// User store.
    users: Arc<dyn UserStore>,
    /// Event cache to invalidate after commits.
    cache: EventCache,
    /// Role checks.
    rbac: RbacEnforcer,
}

impl std::fmt::Debug for RegistrationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationService")
            .field("cache", &self.cache)
            .finish()
    }
}

impl RegistrationService {
    /// Creates a new registration service.
    pub fn new(
        store: Arc<dyn InventoryStore>,
        users: Arc<dyn UserStore>,
        cache: EventCache,
    ) -> Self {
        Self {
            store,
            users,
            cache,
            rbac: RbacEnforcer::new(),
        }
    }

    /// Reserves one seat on `event_id` for the calling user.
    ///
    /// Fails `NotFound` if the user or event is missing and `Conflict` if
    /// the event is full or the user already holds a confirmed registration.
    pub async fn register(
        &self,
        ctx: &RequestContext,
        event_id: Uuid,
    ) -> Result<Registration, AppError> {
        if !self.users.user_exists(ctx.user_id).await? {
            return Err(AppError::not_found("User not found"));
        }

        let mut tx = self.store.begin().await?;
        let mut event = match tx.load_for_update(event_id).await {
            Ok(event) => event,
            Err(e) => {
                abort(tx).await;
                return Err(e);
            }
        };

        if let Err(e) = event.reserve_seats(1) {
            abort(tx).await;
            if matches!(e, SeatError::CapacityExceeded { .. }) {
                info!(
                    user_id = %ctx.user_id,
                    event_id = %event_id,
                    "Registration rejected, event is full"
                );
            }
            return Err(e.into());
        }

        let registration = Registration::confirmed(ctx.user_id, event_id, Utc::now());
        if let Err(e) = Self::persist_reservation(tx.as_mut(), &event, &registration).await {
            let e = release_reserved_seat(&mut event, e);
            abort(tx).await;
            return Err(e);
        }

        if let Err(e) = tx.commit().await {
            // A failed commit leaves storage untouched.
            return Err(release_reserved_seat(&mut event, e));
        }

        self.cache.invalidate(event_id).await;
        info!(
            user_id = %ctx.user_id,
            event_id = %event_id,
            registration_id = %registration.id,
            available_seats = event.available_seats(),
            "Seat reserved"
        );
        Ok(registration)
    }

    /// Writes the decremented event and the new registration.
    async fn persist_reservation(
        tx: &mut dyn InventoryTx,
        event: &Event,
        registration: &Registration,
    ) -> Result<(), AppError> {
        tx.save_event(event).await?;
        if tx
            .find_active_registration(registration.user_id, registration.event_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(
                "You are already registered for this event",
            ));
        }
        tx.insert_registration(registration).await
    }

    /// Cancels a registration and returns its seat.
    ///
    /// Only the owner or an admin may cancel. Cancelling twice fails
    /// `Conflict`.
    pub async fn cancel(
        &self,
        ctx: &RequestContext,
        registration_id: Uuid,
    ) -> Result<Registration, AppError> {
        // The event id never changes, so an unlocked read is enough to find
        // which event row to lock first.
        let snapshot = self
            .store
            .find_registration(registration_id)
            .await?
            .ok_or_else(|| AppError::not_found("Registration not found"))?;
        self.rbac
            .require_owner_or_admin(snapshot.is_owned_by(ctx.user_id), ctx.role)?;

        let mut tx = self.store.begin().await?;
        let (registration, event) =
            match Self::cancel_in(tx.as_mut(), registration_id, snapshot.event_id).await {
                Ok(result) => result,
                Err(e) => {
                    abort(tx).await;
                    return Err(e);
                }
            };
        tx.commit().await?;

        self.cache.invalidate(registration.event_id).await;
        info!(
            user_id = %ctx.user_id,
            event_id = %registration.event_id,
            registration_id = %registration.id,
            available_seats = event.available_seats(),
            "Registration cancelled"
        );
        Ok(registration)
    }

    /// Locks event then registration, the same order `register` uses.
    async fn cancel_in(
        tx: &mut dyn InventoryTx,
        registration_id: Uuid,
        event_id: Uuid,
    ) -> Result<(Registration, Event), AppError> {
        let mut event = tx.load_for_update(event_id).await.map_err(|e| {
            // Registrations cascade with their event.
            if e.is(ErrorKind::NotFound) {
                AppError::not_found("Registration not found")
            } else {
                e
            }
        })?;
        let mut registration = tx.load_registration_for_update(registration_id).await?;
        registration.cancel()?;
        tx.save_registration(&registration).await?;

        if let Err(e) = event.release_seats(1) {
            error!(
                event_id = %event.id,
                registration_id = %registration.id,
                available_seats = event.available_seats(),
                total_seats = event.total_seats(),
                error = %e,
                "Seat release on cancellation violated the seat invariant"
            );
            return Err(AppError::invariant(e.to_string()));
        }
        tx.save_event(&event).await?;
        Ok((registration, event))
    }

    /// The caller's confirmed registrations, newest first.
    pub async fn list_my_registrations(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<Registration>, AppError> {
        self.store.list_for_user(ctx.user_id).await
    }

    /// Confirmed registrations of an event, newest first. Admin only.
    pub async fn list_event_registrations(
        &self,
        ctx: &RequestContext,
        event_id: Uuid,
    ) -> Result<Vec<Registration>, AppError> {
        self.rbac.require_admin(ctx.role)?;
        if self.store.load_plain(event_id).await?.is_none() {
            return Err(AppError::not_found("Event not found"));
        }
        self.store.list_for_event(event_id).await
    }
}

/// Undo the in-memory decrement after a failed reservation step and return
/// the error to report.
fn release_reserved_seat(event: &mut Event, cause: AppError) -> AppError {
    match event.release_seats(1) {
        Ok(()) => {
            if cause.kind.is_internal() {
                warn!(event_id = %event.id, error = %cause, "Reservation failed, seat released");
            }
            cause
        }
        Err(e) => {
            error!(
                event_id = %event.id,
                available_seats = event.available_seats(),
                total_seats = event.total_seats(),
                error = %e,
                cause = %cause,
                "Compensating seat release failed"
            );
            AppError::invariant(format!("Compensating seat release failed: {e}"))
        }
    }
}
