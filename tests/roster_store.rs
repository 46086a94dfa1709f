#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use escouade_lib::model::{Capacite, Personnage};
use escouade_lib::store::characters;

async fn setup_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    escouade_lib::migrate::apply_migrations(&pool).await?;
    Ok(pool)
}

#[tokio::test]
async fn get_attaches_the_abilities() -> Result<()> {
    let pool = setup_pool().await?;
    let mut p = Personnage::new("REGINA");
    p.capacites.push(Capacite {
        id: 0,
        nom: "Frappe éclair".into(),
        description: "Deux attaques par tour".into(),
        icone: "frappe.png".into(),
    });
    let id = characters::insert(&pool, &p).await?;

    let loaded = characters::get(&pool, id).await?.unwrap();
    assert_eq!(loaded.capacites.len(), 1);
    assert_eq!(loaded.capacites[0].nom, "Frappe éclair");

    // List stays shallow: no abilities attached.
    let listed = characters::list(&pool).await?;
    assert!(listed[0].capacites.is_empty());
    Ok(())
}

#[tokio::test]
async fn delete_cascades_to_abilities() -> Result<()> {
    let pool = setup_pool().await?;
    let mut p = Personnage::new("REGINA");
    p.capacites.push(Capacite {
        id: 0,
        nom: "Frappe éclair".into(),
        description: String::new(),
        icone: String::new(),
    });
    let id = characters::insert(&pool, &p).await?;

    characters::delete(&pool, id).await?;
    assert!(characters::get(&pool, id).await?.is_none());
    let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM capacites")
        .fetch_one(&pool)
        .await?;
    assert_eq!(orphans, 0);
    Ok(())
}
