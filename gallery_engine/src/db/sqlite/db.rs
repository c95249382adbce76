use std::fmt::Debug;

use log::*;
use sqlx::{migrate, SqlitePool};

use crate::{
    db::sqlite::{
        catalog,
        catalog::ItemResolution,
        new_pool,
        orders,
    },
    db_types::{Artist, NewOrder, Order, OrderItem, OrderStatus, OrderUpdate, SessionId, Variant, Work},
    order_objects::{OrderQueryFilter, PaidOrderSummary},
    traits::{CatalogManagement, OrderManagement, ReconcileOutcome, StorefrontDatabase, StorefrontError},
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
    /// Connect to (creating if necessary) the database at `url` and bring the schema up to date.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StorefrontError> {
        let pool = new_pool(url, max_connections).await?;
        migrate!("./src/db/sqlite/migrations").run(&pool).await?;
        debug!("🗃️ Connected to database at {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl StorefrontDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn reconcile_paid_session(
        &self,
        order: NewOrder,
    ) -> Result<(ReconcileOutcome, Vec<String>), StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let mut existing = orders::fetch_order_by_session_id(&order.session_id, &mut tx).await?;
        if existing.is_none() {
            if let Some(id) = order.metadata_order_id {
                trace!("🗃️ No order carries session {}. Trying metadata order id #{id}.", order.session_id);
                existing = orders::fetch_order_by_id(id, &mut tx).await?;
            }
        }
        match existing {
            Some(o) if o.status == OrderStatus::Paid => {
                debug!("🗃️ Order #{} for session {} is already paid. No mutation.", o.id, order.session_id);
                Ok((ReconcileOutcome::AlreadyPaid(o), Vec::new()))
            },
            Some(o) => {
                let transitions = orders::mark_paid(o.id, &order, &mut tx).await?;
                let updated =
                    orders::fetch_order_by_id(o.id, &mut tx).await?.ok_or(StorefrontError::OrderNotFound(o.id))?;
                tx.commit().await?;
                if transitions == 0 {
                    info!("🗃️ Order #{} was marked paid by a concurrent delivery.", updated.id);
                    Ok((ReconcileOutcome::AlreadyPaid(updated), Vec::new()))
                } else {
                    debug!("🗃️ Order #{} transitioned to Paid for session {}", updated.id, updated.session_id);
                    Ok((ReconcileOutcome::MarkedPaid(updated), Vec::new()))
                }
            },
            None => {
                let mut missing = Vec::new();
                let mut valid = Vec::new();
                for item in &order.items {
                    match catalog::resolve_item(item, &mut tx).await? {
                        ItemResolution::Valid => valid.push(item.clone()),
                        ItemResolution::Missing(reason) => {
                            warn!("🗃️ Dropping line item from session {}: {reason}", order.session_id);
                            missing.push(reason);
                        },
                    }
                }
                match orders::insert_order(&order, &mut tx).await? {
                    Some(id) => {
                        for item in &valid {
                            orders::insert_order_item(id, item, &mut tx).await?;
                        }
                        let created = orders::fetch_order_by_id(id, &mut tx)
                            .await?
                            .ok_or(StorefrontError::OrderNotFound(id))?;
                        tx.commit().await?;
                        debug!(
                            "🗃️ Order #{id} created as Paid for session {} with {} item(s)",
                            created.session_id,
                            valid.len()
                        );
                        Ok((ReconcileOutcome::Created(created), missing))
                    },
                    None => {
                        // Lost the insert race against a concurrent delivery of the same session.
                        tx.rollback().await?;
                        let winner = self
                            .fetch_order_by_session_id(&order.session_id)
                            .await?
                            .ok_or(StorefrontError::DatabaseError(sqlx::Error::RowNotFound))?;
                        info!(
                            "🗃️ Session {} was reconciled concurrently as order #{}.",
                            order.session_id, winner.id
                        );
                        Ok((ReconcileOutcome::AlreadyPaid(winner), Vec::new()))
                    },
                }
            },
        }
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order_by_id(&self, id: i64) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_id(id, &mut conn).await?)
    }

    async fn fetch_order_by_session_id(&self, session_id: &SessionId) -> Result<Option<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_session_id(session_id, &mut conn).await?)
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_items(order_id, &mut conn).await?)
    }

    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::search_orders(&filter, &mut conn).await?)
    }

    async fn update_order(&self, id: i64, update: OrderUpdate) -> Result<(Order, Order), StorefrontError> {
        if update.is_empty() {
            return Err(StorefrontError::EmptyUpdate);
        }
        let mut tx = self.pool.begin().await?;
        let old = orders::fetch_order_by_id(id, &mut tx).await?.ok_or(StorefrontError::OrderNotFound(id))?;
        orders::update_order(id, &update, &mut tx).await?;
        let new = orders::fetch_order_by_id(id, &mut tx).await?.ok_or(StorefrontError::OrderNotFound(id))?;
        tx.commit().await?;
        debug!("🗃️ Order #{id} updated: {old_s} -> {new_s}", old_s = old.shipping_status, new_s = new.shipping_status);
        Ok((old, new))
    }

    async fn order_summary(&self, order_id: i64) -> Result<PaidOrderSummary, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(order_id, &mut conn)
            .await?
            .ok_or(StorefrontError::OrderNotFound(order_id))?;
        let items = orders::item_lines_for_order(order_id, &mut conn).await?;
        Ok(PaidOrderSummary { order, items, missing: Vec::new() })
    }

    async fn artist_ids_for_order(&self, order_id: i64) -> Result<Vec<i64>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::artist_ids_for_order(order_id, &mut conn).await?)
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_work(&self, work_id: i64) -> Result<Option<Work>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_work(work_id, &mut conn).await?)
    }

    async fn fetch_variant(&self, variant_id: i64) -> Result<Option<Variant>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_variant(variant_id, &mut conn).await?)
    }

    async fn fetch_artist(&self, artist_id: i64) -> Result<Option<Artist>, StorefrontError> {
        let mut conn = self.pool.acquire().await?;
        Ok(catalog::fetch_artist(artist_id, &mut conn).await?)
    }
}
