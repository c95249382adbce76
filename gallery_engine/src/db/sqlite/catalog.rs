use sqlx::SqliteConnection;

use crate::db_types::{Artist, NewOrderItem, Variant, Work};

pub(crate) async fn fetch_work(work_id: i64, conn: &mut SqliteConnection) -> Result<Option<Work>, sqlx::Error> {
    sqlx::query_as::<_, Work>("SELECT id, artist_id, title, price FROM works WHERE id = ?")
        .bind(work_id)
        .fetch_optional(conn)
        .await
}

pub(crate) async fn fetch_variant(
    variant_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Variant>, sqlx::Error> {
    sqlx::query_as::<_, Variant>("SELECT id, work_id, label, price FROM variants WHERE id = ?")
        .bind(variant_id)
        .fetch_optional(conn)
        .await
}

pub(crate) async fn fetch_artist(artist_id: i64, conn: &mut SqliteConnection) -> Result<Option<Artist>, sqlx::Error> {
    sqlx::query_as::<_, Artist>("SELECT id, name, contact_email FROM artists WHERE id = ?")
        .bind(artist_id)
        .fetch_optional(conn)
        .await
}

pub(crate) enum ItemResolution {
    Valid,
    Missing(String),
}

/// Resolve a reconciled line item against the catalog. The work must exist, and a claimed variant must both
/// exist and belong to that work. Failures describe the item well enough for the admin summary.
pub(crate) async fn resolve_item(
    item: &NewOrderItem,
    conn: &mut SqliteConnection,
) -> Result<ItemResolution, sqlx::Error> {
    let Some(work) = fetch_work(item.work_id, &mut *conn).await? else {
        return Ok(ItemResolution::Missing(format!("work #{} does not exist in the catalog", item.work_id)));
    };
    if let Some(variant_id) = item.variant_id {
        match fetch_variant(variant_id, &mut *conn).await? {
            None => {
                return Ok(ItemResolution::Missing(format!(
                    "variant #{variant_id} of work '{}' does not exist",
                    work.title
                )));
            },
            Some(variant) if variant.work_id != item.work_id => {
                return Ok(ItemResolution::Missing(format!(
                    "variant #{variant_id} does not belong to work '{}' (#{})",
                    work.title, item.work_id
                )));
            },
            Some(_) => {},
        }
    }
    Ok(ItemResolution::Valid)
}
