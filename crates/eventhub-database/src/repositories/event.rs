//! Event repository implementation.

use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use eventhub_core::result::AppResult;
use eventhub_core::types::pagination::{PageRequest, PageResponse};
use eventhub_entity::event::{Event, EventQuery};

use super::{escape_like, map_db_error};

/// Repository for event persistence and list queries.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    /// Create a new event repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an event by primary key without locking.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Event>> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Failed to find event by id"))
    }

    /// Insert a freshly created event.
    pub async fn create(&self, event: &Event) -> AppResult<()> {
        sqlx::query(
            r#"INSERT INTO events
                   (id, title, description, date, venue, total_seats, available_seats, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.venue)
        .bind(event.total_seats())
        .bind(event.available_seats())
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_db_error(e, "Failed to create event"))?;
        Ok(())
    }

    /// Filtered, sorted, paginated event list with total count.
    pub async fn paginate(
        &self,
        query: &EventQuery,
        page: &PageRequest,
    ) -> AppResult<PageResponse<Event>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events");
        push_filters(&mut count, query);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Failed to count events"))?;

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM events");
        push_filters(&mut select, query);
        // Column and direction come from closed enums, never from raw input.
        select.push(format!(
            " ORDER BY {} {}, id ASC",
            query.sort_by.column(),
            query.order.as_sql()
        ));
        select
            .push(" LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(i64::try_from(page.offset()).unwrap_or(i64::MAX));

        let events = select
            .build_query_as::<Event>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(e, "Failed to list events"))?;

        Ok(PageResponse::new(
            events,
            page.page,
            page.page_size,
            total.max(0) as u64,
        ))
    }

    /// Load an event and take its row lock for the rest of the transaction.
    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> AppResult<Option<Event>> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(|e| map_db_error(e, "Failed to lock event"))
    }

    /// Persist every mutable column of an event inside a transaction.
    ///
    /// Returns `false` when the row no longer exists.
    pub async fn update(conn: &mut PgConnection, event: &Event) -> AppResult<bool> {
        let result = sqlx::query(
            r#"UPDATE events
               SET title = $2, description = $3, date = $4, venue = $5,
                   available_seats = $6, updated_at = $7
               WHERE id = $1"#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.date)
        .bind(&event.venue)
        .bind(event.available_seats())
        .bind(event.updated_at)
        .execute(conn)
        .await
        .map_err(|e| map_db_error(e, "Failed to save event"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an event inside a transaction. Registrations cascade at the
    /// schema level.
    ///
    /// Waits for the row lock like any other writer.
    pub async fn delete(conn: &mut PgConnection, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| map_db_error(e, "Failed to delete event"))?;
        Ok(result.rows_affected() > 0)
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &EventQuery) {
    builder.push(" WHERE TRUE");
    if let Some(title) = query.title_filter() {
        builder
            .push(" AND title ILIKE ")
            .push_bind(format!("%{}%", escape_like(title)))
            .push(" ESCAPE '\\'");
    }
    if let Some(start) = query.start_date {
        builder.push(" AND date >= ").push_bind(start);
    }
    if let Some(end) = query.end_date {
        builder.push(" AND date <= ").push_bind(end);
    }
    if query.available_only {
        builder.push(" AND available_seats > 0");
    }
}
