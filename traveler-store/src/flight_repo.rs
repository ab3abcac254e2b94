use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use traveler_core::repository::FlightRepository;
use traveler_core::search::FlightQuery;
use traveler_core::{CoreResult, Flight, FlightId, NewFlight, Page};

use crate::error::db_err;

pub struct PostgresFlightRepository {
    pool: PgPool,
}

impl PostgresFlightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: i64,
    from_location: String,
    to_location: String,
    departure_time: DateTime<Utc>,
    capacity: i32,
}

impl From<FlightRow> for Flight {
    fn from(row: FlightRow) -> Self {
        Flight {
            id: row.id,
            from_location: row.from_location,
            to_location: row.to_location,
            departure_time: row.departure_time,
            capacity: row.capacity,
        }
    }
}

/// `%fragment%` with LIKE metacharacters escaped, for `ILIKE ... ESCAPE '\'`.
pub(crate) fn like_pattern(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    escaped.push('%');
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl FlightRepository for PostgresFlightRepository {
    async fn list_flights(&self, page: Page) -> CoreResult<(Vec<Flight>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM flights")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let rows = sqlx::query_as::<_, FlightRow>(
            r#"
            SELECT id, from_location, to_location, departure_time, capacity
            FROM flights
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(page.size))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok((rows.into_iter().map(Flight::from).collect(), total.max(0) as u64))
    }

    async fn get_flight(&self, id: FlightId) -> CoreResult<Option<Flight>> {
        let row = sqlx::query_as::<_, FlightRow>(
            "SELECT id, from_location, to_location, departure_time, capacity FROM flights WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(Flight::from))
    }

    async fn create_flight(&self, flight: &NewFlight) -> CoreResult<Flight> {
        let row = sqlx::query_as::<_, FlightRow>(
            r#"
            INSERT INTO flights (from_location, to_location, departure_time, capacity)
            VALUES ($1, $2, $3, $4)
            RETURNING id, from_location, to_location, departure_time, capacity
            "#,
        )
        .bind(&flight.from_location)
        .bind(&flight.to_location)
        .bind(flight.departure_time)
        .bind(flight.capacity)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.into())
    }

    async fn update_flight(&self, id: FlightId, flight: &NewFlight) -> CoreResult<Option<Flight>> {
        let row = sqlx::query_as::<_, FlightRow>(
            r#"
            UPDATE flights
            SET from_location = $1, to_location = $2, departure_time = $3, capacity = $4
            WHERE id = $5
            RETURNING id, from_location, to_location, departure_time, capacity
            "#,
        )
        .bind(&flight.from_location)
        .bind(&flight.to_location)
        .bind(flight.departure_time)
        .bind(flight.capacity)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(Flight::from))
    }

    async fn delete_flight(&self, id: FlightId) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM flights WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn search_flights(&self, query: &FlightQuery) -> CoreResult<Vec<Flight>> {
        let rows = sqlx::query_as::<_, FlightRow>(
            r#"
            SELECT id, from_location, to_location, departure_time, capacity
            FROM flights
            WHERE
                from_location ILIKE $1 ESCAPE '\'
                AND to_location ILIKE $2 ESCAPE '\'
                AND departure_time BETWEEN $3 AND $4
            ORDER BY id
            "#,
        )
        .bind(like_pattern(&query.from_location))
        .bind(like_pattern(&query.to_location))
        .bind(query.window_start)
        .bind(query.window_end)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(Flight::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Lagos"), "%Lagos%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\"), "%c:\\\\%");
    }
}
