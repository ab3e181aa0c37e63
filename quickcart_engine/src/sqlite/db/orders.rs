use log::{debug, trace};
use qc_common::Money;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{NewLineItem, NewOrder, Order, OrderId, OrderLineItem, OrderStatusType},
    helpers::generate_item_id,
    order_objects::{OrderQueryFilter, Pagination},
    traits::OrderDatabaseError,
};

/// Orders are stored with a foreign key into the status registry; every read resolves the status name with a join.
const ORDER_COLUMNS: &str = r#"
    o.id AS id,
    o.order_id AS order_id,
    o.customer_id AS customer_id,
    o.remark AS remark,
    o.total_amount AS total_amount,
    o.currency AS currency,
    o.payment_auth_id AS payment_auth_id,
    s.name AS status,
    o.created_at AS created_at,
    o.updated_at AS updated_at
"#;

/// Inserts a new order and all of its line items. New orders always start in `PENDING`.
///
/// This is not atomic on its own. Callers wrap it in a transaction and pass `&mut *tx` as the connection argument.
pub async fn insert_order(
    order: NewOrder,
    items: Vec<NewLineItem>,
    conn: &mut SqliteConnection,
) -> Result<Order, OrderDatabaseError> {
    if fetch_order_by_auth_id(&order.payment_auth_id, &mut *conn).await?.is_some() {
        return Err(OrderDatabaseError::DuplicateAuthorization(order.payment_auth_id));
    }
    let pending = OrderStatusType::Pending;
    let status = super::statuses::fetch_status_by_name(pending.as_str(), &mut *conn)
        .await?
        .ok_or_else(|| OrderDatabaseError::StatusNotFound(pending.to_string()))?;
    sqlx::query(
        r#"
            INSERT INTO orders (
                order_id,
                customer_id,
                remark,
                total_amount,
                currency,
                payment_auth_id,
                status_id,
                created_at,
                updated_at
            ) VALUES ($1, $2, '', $3, $4, $5, $6, $7, $7)
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(&order.customer_id)
    .bind(order.total_amount)
    .bind(&order.currency)
    .bind(&order.payment_auth_id)
    .bind(status.id)
    .bind(order.created_at)
    .execute(&mut *conn)
    .await?;
    for item in items {
        sqlx::query(
            r#"
                INSERT INTO order_items (item_id, order_id, product_id, qty, unit_price, discount)
                VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(generate_item_id())
        .bind(order.order_id.as_str())
        .bind(&item.product_id)
        .bind(item.qty)
        .bind(item.unit_price)
        .bind(item.discount)
        .execute(&mut *conn)
        .await?;
    }
    let order = fetch_order_by_order_id(&order.order_id, conn)
        .await?
        .ok_or_else(|| OrderDatabaseError::OrderNotFound(order.order_id.clone()))?;
    debug!("📝️ Order [{}] inserted with id {}", order.order_id, order.id);
    Ok(order)
}

pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let q = format!("SELECT {ORDER_COLUMNS} FROM orders o JOIN order_statuses s ON o.status_id = s.id WHERE o.order_id = $1");
    let order = sqlx::query_as(&q).bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Resolves the order referencing the given payment authorization. The schema enforces at most one such order; more
/// than one match means the store has been corrupted out-of-band and is reported as
/// [`OrderDatabaseError::AmbiguousAuthorization`].
pub async fn fetch_order_by_auth_id(
    auth_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderDatabaseError> {
    let q = format!(
        "SELECT {ORDER_COLUMNS} FROM orders o JOIN order_statuses s ON o.status_id = s.id WHERE o.payment_auth_id = \
         $1"
    );
    let mut orders: Vec<Order> = sqlx::query_as(&q).bind(auth_id).fetch_all(conn).await?;
    if orders.len() > 1 {
        return Err(OrderDatabaseError::AmbiguousAuthorization(auth_id.to_string()));
    }
    Ok(orders.pop())
}

pub async fn fetch_line_items(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderLineItem>, sqlx::Error> {
    let items = sqlx::query_as(
        "SELECT id, item_id, order_id, product_id, qty, unit_price, discount FROM order_items WHERE order_id = $1 \
         ORDER BY id ASC",
    )
    .bind(order_id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(items)
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: OrderQueryFilter) {
    if query.is_empty() {
        return;
    }
    builder.push(" WHERE ");
    let mut where_clause = builder.separated(" AND ");
    if let Some(text) = query.search_text {
        let pattern = format!("%{text}%");
        where_clause.push("(o.order_id LIKE ");
        where_clause.push_bind_unseparated(pattern.clone());
        where_clause.push_unseparated(" OR o.customer_id LIKE ");
        where_clause.push_bind_unseparated(pattern.clone());
        where_clause.push_unseparated(" OR o.remark LIKE ");
        where_clause.push_bind_unseparated(pattern);
        where_clause.push_unseparated(")");
    }
    if let Some(cid) = query.customer_id {
        where_clause.push("o.customer_id = ");
        where_clause.push_bind_unseparated(cid);
    }
    if let Some(status) = query.status {
        where_clause.push("s.name = ");
        where_clause.push_bind_unseparated(status.to_string());
    }
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`.
///
/// Resulting orders are ordered by `created_at` in ascending order.
pub async fn search_orders(
    query: OrderQueryFilter,
    pagination: Pagination,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {ORDER_COLUMNS} FROM orders o JOIN order_statuses s ON o.status_id = s.id"
    ));
    push_filters(&mut builder, query);
    builder.push(" ORDER BY o.created_at ASC LIMIT ");
    builder.push_bind(pagination.size as i64);
    builder.push(" OFFSET ");
    builder.push_bind(pagination.offset() as i64);
    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("📝️ Result of search_orders: {:?}", orders.len());
    Ok(orders)
}

pub async fn count_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::new("SELECT COUNT(*) FROM orders o JOIN order_statuses s ON o.status_id = s.id");
    push_filters(&mut builder, query);
    let count = builder.build_query_scalar::<i64>().fetch_one(conn).await?;
    Ok(count)
}

/// Moves the order to the given status. The status must already exist in the registry.
pub(crate) async fn update_order_status(
    order_id: &OrderId,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderDatabaseError> {
    let record = super::statuses::fetch_status_by_name(status.as_str(), &mut *conn)
        .await?
        .ok_or_else(|| OrderDatabaseError::StatusNotFound(status.to_string()))?;
    let result =
        sqlx::query("UPDATE orders SET status_id = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2")
            .bind(record.id)
            .bind(order_id.as_str())
            .execute(&mut *conn)
            .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    let order = fetch_order_by_order_id(order_id, conn).await?;
    Ok(order)
}

/// Replaces the full remark column. Callers are responsible for appending to the existing trail rather than
/// clobbering it; see [`crate::helpers::append_remark`].
pub(crate) async fn update_remark(
    order_id: &OrderId,
    remark: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderDatabaseError> {
    let result = sqlx::query("UPDATE orders SET remark = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2")
        .bind(remark)
        .bind(order_id.as_str())
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    let order = fetch_order_by_order_id(order_id, conn).await?;
    Ok(order)
}

pub(crate) async fn update_total(
    order_id: &OrderId,
    new_total: Money,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderDatabaseError> {
    let result =
        sqlx::query("UPDATE orders SET total_amount = $1, updated_at = CURRENT_TIMESTAMP WHERE order_id = $2")
            .bind(new_total)
            .bind(order_id.as_str())
            .execute(&mut *conn)
            .await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    let order = fetch_order_by_order_id(order_id, conn).await?;
    Ok(order)
}

/// Deletes the order and its line items. Returns `true` if an order row was removed.
pub(crate) async fn delete_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    sqlx::query("DELETE FROM order_items WHERE order_id = $1").bind(order_id.as_str()).execute(&mut *conn).await?;
    let result = sqlx::query("DELETE FROM orders WHERE order_id = $1").bind(order_id.as_str()).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}
