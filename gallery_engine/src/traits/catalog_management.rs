use crate::{
    db_types::{Artist, Variant, Work},
    traits::StorefrontError,
};

/// Read-only access to the catalog. The catalog is owned by the admin/author CRUD surfaces; the order flow only
/// resolves ids embedded in payment-session metadata back to priced, artist-attributed entities.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement: Clone {
    async fn fetch_work(&self, work_id: i64) -> Result<Option<Work>, StorefrontError>;

    async fn fetch_variant(&self, variant_id: i64) -> Result<Option<Variant>, StorefrontError>;

    async fn fetch_artist(&self, artist_id: i64) -> Result<Option<Artist>, StorefrontError>;
}
