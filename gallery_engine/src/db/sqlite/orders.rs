use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, NewOrderItem, Order, OrderItem, OrderUpdate, SessionId},
    order_objects::{ItemLine, OrderQueryFilter},
};

const ORDER_COLUMNS: &str =
    "id, session_id, email, total, status, shipping_status, tracking_url, created_at, updated_at";

pub(crate) async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let q = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?");
    sqlx::query_as::<_, Order>(&q).bind(id).fetch_optional(conn).await
}

pub(crate) async fn fetch_order_by_session_id(
    session_id: &SessionId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let q = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE session_id = ?");
    sqlx::query_as::<_, Order>(&q).bind(session_id.as_str()).fetch_optional(conn).await
}

/// Insert the order with `Paid` status, returning the new row id. Returns `None` when another reconciliation has
/// already inserted an order for this session id; the unique constraint is what arbitrates concurrent webhook
/// deliveries, so callers must treat `None` as "lost the race", not as an error.
pub(crate) async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
            INSERT INTO orders (session_id, email, total, status)
            VALUES (?, ?, ?, 'Paid')
            ON CONFLICT (session_id) DO NOTHING
            RETURNING id
        "#,
    )
    .bind(order.session_id.as_str())
    .bind(order.email.as_deref())
    .bind(order.total)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|r| r.0))
}

pub(crate) async fn insert_order_item(
    order_id: i64,
    item: &NewOrderItem,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        r#"
            INSERT INTO order_items (order_id, work_id, variant_id, quantity, unit_price)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
        "#,
    )
    .bind(order_id)
    .bind(item.work_id)
    .bind(item.variant_id)
    .bind(item.quantity)
    .bind(item.unit_price)
    .fetch_one(conn)
    .await?;
    Ok(row.0)
}

/// Transition an existing (unpaid) order to `Paid`, refreshing the total and email from the provider session and
/// claiming the session id. Used for orders found via the metadata fallback. The status guard in the WHERE
/// clause makes the transition single-shot: the second of two racing deliveries affects zero rows and must
/// treat the order as already paid.
pub(crate) async fn mark_paid(id: i64, order: &NewOrder, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(
        r#"
            UPDATE orders
            SET status = 'Paid',
                session_id = ?,
                total = ?,
                email = COALESCE(?, email),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND status != 'Paid'
        "#,
    )
    .bind(order.session_id.as_str())
    .bind(order.total)
    .bind(order.email.as_deref())
    .bind(id)
    .execute(conn)
    .await?;
    Ok(res.rows_affected())
}

pub(crate) async fn update_order(
    id: i64,
    update: &OrderUpdate,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    if update.is_empty() {
        debug!("📄️ No fields to update for order #{id}. Update request skipped.");
        return Ok(());
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP,");
    let mut set_clause = builder.separated(", ");
    if let Some(status) = update.status {
        set_clause.push("status = ");
        set_clause.push_bind_unseparated(status.to_string());
    }
    if let Some(shipping_status) = update.shipping_status {
        set_clause.push("shipping_status = ");
        set_clause.push_bind_unseparated(shipping_status.to_string());
    }
    if let Some(tracking_url) = &update.tracking_url {
        set_clause.push("tracking_url = ");
        set_clause.push_bind_unseparated(tracking_url.clone());
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    trace!("📄️ Executing query: {}", builder.sql());
    let res = builder.build().execute(conn).await?;
    trace!("📄️ Result of update_order: {res:?}");
    Ok(())
}

/// Fetches orders according to the criteria in the `OrderQueryFilter`, most recent first by the requested sort
/// key. The artist filter joins through order_items onto works; DISTINCT collapses multi-item matches.
pub(crate) async fn search_orders(
    filter: &OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT DISTINCT {} FROM orders o",
        ORDER_COLUMNS.split(", ").map(|c| format!("o.{c}")).collect::<Vec<_>>().join(", ")
    ));
    if !filter.artists.is_empty() {
        builder.push(" JOIN order_items oi ON oi.order_id = o.id JOIN works w ON w.id = oi.work_id");
    }
    if !filter.is_empty() {
        builder.push(" WHERE ");
        let mut where_clause = builder.separated(" AND ");
        if let Some(status) = filter.status {
            where_clause.push("o.status = ");
            where_clause.push_bind_unseparated(status.to_string());
        }
        if let Some(shipping_status) = filter.shipping_status {
            where_clause.push("o.shipping_status = ");
            where_clause.push_bind_unseparated(shipping_status.to_string());
        }
        if !filter.artists.is_empty() {
            let ids = filter.artists.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
            where_clause.push(format!("w.artist_id IN ({ids})"));
        }
        if let Some(needle) = &filter.search {
            let pattern = format!("%{needle}%");
            where_clause.push("(o.email LIKE ");
            where_clause.push_bind_unseparated(pattern.clone());
            where_clause.push_unseparated(" OR o.session_id LIKE ");
            where_clause.push_bind_unseparated(pattern.clone());
            where_clause.push_unseparated(" OR o.tracking_url LIKE ");
            where_clause.push_bind_unseparated(pattern);
            where_clause.push_unseparated(")");
        }
    }
    let sort = filter.sort.unwrap_or_default();
    builder.push(format!(" ORDER BY o.{} DESC", sort.as_column()));
    builder.push(" LIMIT ");
    builder.push_bind(filter.effective_limit());
    trace!("📄️ Executing query: {}", builder.sql());
    let query = builder.build_query_as::<Order>();
    let orders = query.fetch_all(conn).await?;
    trace!("Result of search_orders: {} row(s)", orders.len());
    Ok(orders)
}

pub(crate) async fn fetch_order_items(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as::<_, OrderItem>(
        "SELECT id, order_id, work_id, variant_id, quantity, unit_price FROM order_items WHERE order_id = ? ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await
}

/// The order's items joined with their work, artist and variant context, in insertion order.
pub(crate) async fn item_lines_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ItemLine>, sqlx::Error> {
    sqlx::query_as::<_, ItemLine>(
        r#"
            SELECT oi.work_id,
                   w.title AS work_title,
                   w.artist_id,
                   a.name AS artist_name,
                   a.contact_email,
                   v.label AS variant_label,
                   oi.quantity,
                   oi.unit_price
            FROM order_items oi
            JOIN works w ON w.id = oi.work_id
            JOIN artists a ON a.id = w.artist_id
            LEFT JOIN variants v ON v.id = oi.variant_id
            WHERE oi.order_id = ?
            ORDER BY oi.id
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await
}

pub(crate) async fn artist_ids_for_order(
    order_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<i64>, sqlx::Error> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
            SELECT DISTINCT w.artist_id
            FROM order_items oi
            JOIN works w ON w.id = oi.work_id
            WHERE oi.order_id = ?
            ORDER BY w.artist_id
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}
