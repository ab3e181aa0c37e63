//! `SqliteDatabase` is a concrete implementation of a QuickCart order engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use log::*;
use qc_common::Money;
use sqlx::SqlitePool;

use super::db::{db_url, new_pool, orders, statuses};
use crate::{
    db_types::{NewLineItem, NewOrder, Order, OrderId, OrderLineItem, OrderStatusType, StatusRecord},
    helpers::append_remark,
    order_objects::{OrderQueryFilter, Pagination},
    traits::{OrderDatabaseError, OrderManagement, StatusManagement, StatusTransition},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder, items: Vec<NewLineItem>) -> Result<Order, OrderDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, items, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn fetch_order_by_id(&self, order_id: &OrderId) -> Result<Option<Order>, OrderDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_auth_id(&self, auth_id: &str) -> Result<Option<Order>, OrderDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_auth_id(auth_id, &mut conn).await
    }

    async fn fetch_line_items_for_order(&self, order_id: &OrderId) -> Result<Vec<OrderLineItem>, OrderDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_line_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn transition_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
        remark: Option<String>,
    ) -> Result<Order, OrderDatabaseError> {
        match self.transition_status_checked(order_id, new_status, remark, |_| true).await? {
            StatusTransition::Applied(order) | StatusTransition::Refused(order) => Ok(order),
        }
    }

    async fn transition_status_checked(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
        remark: Option<String>,
        accept_from: fn(OrderStatusType) -> bool,
    ) -> Result<StatusTransition, OrderDatabaseError> {
        let mut tx = self.pool.begin().await?;
        // The status the guard sees is the one this transaction would overwrite, not a possibly stale earlier read.
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| OrderDatabaseError::OrderNotFound(order_id.clone()))?;
        if !accept_from(order.status) {
            debug!("🗃️ Order [{order_id}] is {}. Transition to {new_status} refused.", order.status);
            return Ok(StatusTransition::Refused(order));
        }
        let order = orders::update_order_status(order_id, new_status, &mut tx)
            .await?
            .ok_or_else(|| OrderDatabaseError::OrderNotFound(order_id.clone()))?;
        let order = match remark {
            Some(entry) => {
                let trail = append_remark(&order.remark, &entry);
                orders::update_remark(order_id, &trail, &mut tx)
                    .await?
                    .ok_or_else(|| OrderDatabaseError::OrderNotFound(order_id.clone()))?
            },
            None => order,
        };
        tx.commit().await?;
        debug!("🗃️ Order [{order_id}] transitioned to {new_status}");
        Ok(StatusTransition::Applied(order))
    }

    async fn append_remark(&self, order_id: &OrderId, remark: &str) -> Result<Order, OrderDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut tx)
            .await?
            .ok_or_else(|| OrderDatabaseError::OrderNotFound(order_id.clone()))?;
        let trail = append_remark(&order.remark, remark);
        let order = orders::update_remark(order_id, &trail, &mut tx)
            .await?
            .ok_or_else(|| OrderDatabaseError::OrderNotFound(order_id.clone()))?;
        tx.commit().await?;
        Ok(order)
    }

    async fn refresh_order(&self, order_id: &OrderId, new_total: Money) -> Result<Order, OrderDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::update_total(order_id, new_total, &mut conn)
            .await?
            .ok_or_else(|| OrderDatabaseError::OrderNotFound(order_id.clone()))?;
        Ok(order)
    }

    async fn delete_order(&self, order_id: &OrderId) -> Result<(), OrderDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let deleted = orders::delete_order(order_id, &mut tx).await?;
        if !deleted {
            return Err(OrderDatabaseError::OrderNotFound(order_id.clone()));
        }
        tx.commit().await?;
        debug!("🗃️ Order [{order_id}] deleted");
        Ok(())
    }

    async fn search_orders(
        &self,
        query: OrderQueryFilter,
        pagination: Pagination,
    ) -> Result<Vec<Order>, OrderDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, pagination, &mut conn).await?;
        Ok(orders)
    }

    async fn search_count(&self, query: OrderQueryFilter) -> Result<i64, OrderDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let count = orders::count_orders(query, &mut conn).await?;
        Ok(count)
    }
}

impl StatusManagement for SqliteDatabase {
    async fn seed_statuses_if_empty(&self, names: &[OrderStatusType]) -> Result<u64, OrderDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let inserted = statuses::seed_statuses(names, &mut conn).await?;
        Ok(inserted)
    }

    async fn find_status_by_name(&self, name: &str) -> Result<Option<StatusRecord>, OrderDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let record = statuses::fetch_status_by_name(name, &mut conn).await?;
        Ok(record)
    }
}
