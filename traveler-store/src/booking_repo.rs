use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use traveler_core::report::ReportRow;
use traveler_core::repository::BookingRepository;
use traveler_core::{Booking, BookingId, BookingScope, Caller, CoreResult, Flight};
use traveler_shared::Masked;
use uuid::Uuid;

use crate::error::db_err;

pub struct PostgresBookingRepository {
    pool: PgPool,
}

impl PostgresBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    flight_id: i64,
    user_id: Uuid,
    user_email: String,
    created_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            flight_id: row.flight_id,
            user_id: row.user_id,
            user_email: row.user_email,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReportRecord {
    booking_id: i64,
    flight_id: i64,
    from_location: String,
    to_location: String,
    departure_time: DateTime<Utc>,
    user_email: String,
    booked_at: DateTime<Utc>,
}

impl From<ReportRecord> for ReportRow {
    fn from(r: ReportRecord) -> Self {
        ReportRow {
            booking_id: r.booking_id,
            flight_id: r.flight_id,
            from_location: r.from_location,
            to_location: r.to_location,
            departure_time: r.departure_time,
            user_email: Masked(r.user_email),
            booked_at: r.booked_at,
        }
    }
}

/// `None` matches every user.
fn scope_user(scope: BookingScope) -> Option<Uuid> {
    match scope {
        BookingScope::Own(user_id) => Some(user_id),
        BookingScope::All => None,
    }
}

const REPORT_SELECT: &str = r#"
    SELECT
        b.id AS booking_id, b.flight_id, f.from_location, f.to_location,
        f.departure_time, b.user_email, b.created_at AS booked_at
    FROM bookings b
    JOIN flights f ON f.id = b.flight_id
"#;

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    async fn insert_booking(&self, flight: &Flight, caller: &Caller) -> CoreResult<Option<Booking>> {
        // The unique constraint arbitrates concurrent attempts; losers get no row back.
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            INSERT INTO bookings (flight_id, user_id, user_email)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, flight_id) DO NOTHING
            RETURNING id, flight_id, user_id, user_email, created_at
            "#,
        )
        .bind(flight.id)
        .bind(caller.user_id)
        .bind(&caller.email)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(Booking::from))
    }

    async fn list_bookings(&self, scope: BookingScope) -> CoreResult<Vec<Booking>> {
        let rows = match scope {
            BookingScope::Own(user_id) => {
                sqlx::query_as::<_, BookingRow>(
                    "SELECT id, flight_id, user_id, user_email, created_at FROM bookings WHERE user_id = $1 ORDER BY id",
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
            }
            BookingScope::All => {
                sqlx::query_as::<_, BookingRow>(
                    "SELECT id, flight_id, user_id, user_email, created_at FROM bookings ORDER BY id",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;

        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn report_rows(
        &self,
        scope: BookingScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> CoreResult<Vec<ReportRow>> {
        let sql = format!(
            "{} WHERE b.created_at BETWEEN $1 AND $2 AND ($3::uuid IS NULL OR b.user_id = $3) ORDER BY b.id LIMIT $4",
            REPORT_SELECT
        );
        let rows = sqlx::query_as::<_, ReportRecord>(&sql)
            .bind(from)
            .bind(to)
            .bind(scope_user(scope))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(rows.into_iter().map(ReportRow::from).collect())
    }

    async fn report_booking_ids(
        &self,
        scope: BookingScope,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> CoreResult<Vec<BookingId>> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id FROM bookings
            WHERE created_at BETWEEN $1 AND $2 AND ($3::uuid IS NULL OR user_id = $3)
            ORDER BY id
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(scope_user(scope))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn report_rows_by_ids(&self, ids: &[BookingId]) -> CoreResult<Vec<ReportRow>> {
        let sql = format!("{} WHERE b.id = ANY($1) ORDER BY b.id", REPORT_SELECT);
        let rows = sqlx::query_as::<_, ReportRecord>(&sql)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(rows.into_iter().map(ReportRow::from).collect())
    }

    async fn departing_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> CoreResult<Vec<ReportRow>> {
        let sql = format!(
            "{} WHERE f.departure_time > $1 AND f.departure_time <= $2 ORDER BY f.departure_time, b.id",
            REPORT_SELECT
        );
        let rows = sqlx::query_as::<_, ReportRecord>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(rows.into_iter().map(ReportRow::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_user_filters_only_owners() {
        let user_id = Uuid::new_v4();
        assert_eq!(scope_user(BookingScope::Own(user_id)), Some(user_id));
        assert_eq!(scope_user(BookingScope::All), None);
    }
}
