//! Registration repository implementation.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use eventhub_core::error::{AppError, ErrorKind};
use eventhub_core::result::AppResult;
use eventhub_entity::registration::Registration;

use super::map_db_error;

/// Repository for registration records.
///
/// The partial unique index `registrations_one_confirmed_per_user_event`
/// backs the at-most-one-confirmed rule; an insert racing past the
/// service-level check surfaces as `Conflict`.
#[derive(Debug, Clone)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    /// Create a new registration repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a registration by primary key.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Registration>> {
        sqlx::query_as::<_, Registration>("SELECT * FROM registrations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Failed to find registration by id"))
    }

    /// Find the confirmed registration for a (user, event) pair, if any.
    pub async fn find_active(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<Option<Registration>> {
        sqlx::query_as::<_, Registration>(
            r#"SELECT * FROM registrations
               WHERE user_id = $1 AND event_id = $2 AND status = 'confirmed'"#,
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Failed to find active registration"))
    }

    /// Confirmed registrations of a user, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<Registration>> {
        sqlx::query_as::<_, Registration>(
            r#"SELECT * FROM registrations
               WHERE user_id = $1 AND status = 'confirmed'
               ORDER BY registration_date DESC, id ASC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Failed to list user registrations"))
    }

    /// Confirmed registrations of an event, newest first.
    pub async fn list_for_event(&self, event_id: Uuid) -> AppResult<Vec<Registration>> {
        sqlx::query_as::<_, Registration>(
            r#"SELECT * FROM registrations
               WHERE event_id = $1 AND status = 'confirmed'
               ORDER BY registration_date DESC, id ASC"#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Failed to list event registrations"))
    }

    /// Confirmed registration lookup inside a transaction.
    pub async fn find_active_in(
        conn: &mut PgConnection,
        user_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<Option<Registration>> {
        sqlx::query_as::<_, Registration>(
            r#"SELECT * FROM registrations
               WHERE user_id = $1 AND event_id = $2 AND status = 'confirmed'"#,
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(conn)
        .await
        .map_err(|e| map_db_error(e, "Failed to find active registration"))
    }

    /// Load a registration and take its row lock.
    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> AppResult<Option<Registration>> {
        sqlx::query_as::<_, Registration>("SELECT * FROM registrations WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(|e| map_db_error(e, "Failed to lock registration"))
    }

    /// Insert a registration inside a transaction.
    pub async fn create(conn: &mut PgConnection, registration: &Registration) -> AppResult<()> {
        sqlx::query(
            r#"INSERT INTO registrations (id, user_id, event_id, registration_date, status)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(registration.id)
        .bind(registration.user_id)
        .bind(registration.event_id)
        .bind(registration.registration_date)
        .bind(registration.status)
        .execute(conn)
        .await
        .map_err(|e| match map_db_error(e, "Failed to create registration") {
            err if err.is(ErrorKind::Conflict) => AppError {
                message: "You are already registered for this event".to_string(),
                ..err
            },
            err => err,
        })?;
        Ok(())
    }

    /// Persist a registration's status inside a transaction.
    ///
    /// Returns `false` when the row no longer exists.
    pub async fn update_status(
        conn: &mut PgConnection,
        registration: &Registration,
    ) -> AppResult<bool> {
        let result = sqlx::query("UPDATE registrations SET status = $2 WHERE id = $1")
            .bind(registration.id)
            .bind(registration.status)
            .execute(conn)
            .await
            .map_err(|e| map_db_error(e, "Failed to update registration status"))?;
        Ok(result.rows_affected() > 0)
    }
}
