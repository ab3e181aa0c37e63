use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{OrderStatusType, StatusRecord};

/// Inserts every status that is not already present, leaving existing rows untouched. The uniqueness constraint on
/// the status name makes re-seeding a no-op. Returns the number of rows actually inserted.
pub async fn seed_statuses(statuses: &[OrderStatusType], conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let mut inserted = 0u64;
    for status in statuses {
        let result = sqlx::query("INSERT OR IGNORE INTO order_statuses (name) VALUES ($1)")
            .bind(status.as_str())
            .execute(&mut *conn)
            .await?;
        inserted += result.rows_affected();
    }
    trace!("🏷️ Seeded {inserted} order statuses");
    Ok(inserted)
}

pub async fn fetch_status_by_name(name: &str, conn: &mut SqliteConnection) -> Result<Option<StatusRecord>, sqlx::Error> {
    let record = sqlx::query_as("SELECT id, name FROM order_statuses WHERE name = $1")
        .bind(name)
        .fetch_optional(conn)
        .await?;
    Ok(record)
}
