//! Helpers for setting up throwaway databases in engine and server tests.

use log::*;

use crate::SqliteDatabase;

pub fn random_db_url() -> String {
    format!("sqlite://{}/gallery_test_{}.db", std::env::temp_dir().display(), rand::random::<u64>())
}

/// Create a fresh file-backed test database with the schema applied and the standard test catalog seeded.
pub async fn prepare_test_env() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = random_db_url();
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database");
    seed_catalog(&db).await;
    debug!("🚀️ Test database ready at {url}");
    db
}

/// Seed a small catalog:
/// * Artist #1 "Mara Voss" (has a contact email) with works #1 and #2. Work #1 has variants #1 and #2.
/// * Artist #2 "Ilya Brandt" (has a contact email) with work #3, which has variant #3.
/// * Artist #3 "Noa Lindqvist" (no contact email) with work #4.
pub async fn seed_catalog(db: &SqliteDatabase) {
    let pool = db.pool();
    sqlx::query(
        r#"
        INSERT INTO artists (id, name, contact_email) VALUES
            (1, 'Mara Voss', 'mara@example.com'),
            (2, 'Ilya Brandt', 'ilya@example.com'),
            (3, 'Noa Lindqvist', NULL);
        "#,
    )
    .execute(pool)
    .await
    .expect("Error seeding artists");
    sqlx::query(
        r#"
        INSERT INTO works (id, artist_id, title, price) VALUES
            (1, 1, 'Dune Study II', 4500),
            (2, 1, 'Tidal Drift', 12000),
            (3, 2, 'Red Interior', 8000),
            (4, 3, 'Untitled (Smoke)', 6400);
        "#,
    )
    .execute(pool)
    .await
    .expect("Error seeding works");
    sqlx::query(
        r#"
        INSERT INTO variants (id, work_id, label, price) VALUES
            (1, 1, '30x40 print', 4500),
            (2, 1, '50x70 print', 9500),
            (3, 3, 'Framed', 9900);
        "#,
    )
    .execute(pool)
    .await
    .expect("Error seeding variants");
}
