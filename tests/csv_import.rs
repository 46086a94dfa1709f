#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use escouade_lib::import::csv::import_csv;
use escouade_lib::store::characters;

async fn setup_pool() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    escouade_lib::migrate::apply_migrations(&pool).await?;
    Ok(pool)
}

const HEADER: &str =
    "Nom;Rarete;Type;Puissance;PA;PV;TypeAttaque;Role;Niveau;Rang;Selectionne;Faction\n";

#[tokio::test]
async fn empty_file_is_a_fatal_error() -> Result<()> {
    let pool = setup_pool().await?;
    let result = import_csv(&pool, b"   \n  ").await?;
    assert!(!result.is_success());
    assert!(result.error.is_some());
    assert_eq!(characters::count(&pool).await?, 0);
    Ok(())
}

#[tokio::test]
async fn header_only_file_is_a_fatal_error() -> Result<()> {
    let pool = setup_pool().await?;
    let result = import_csv(&pool, HEADER.as_bytes()).await?;
    assert!(!result.is_success());
    assert!(result.error.unwrap().contains("entête"));
    Ok(())
}

#[tokio::test]
async fn short_rows_are_skipped_not_fatal() -> Result<()> {
    let pool = setup_pool().await?;
    let file = format!(
        "{HEADER}REGINA;SSR;Mercenaire;3320;140;509;Mêlée;Sentinelle;14;2;Oui;Syndicat\nLYA;SR;Mercenaire\n"
    );
    let result = import_csv(&pool, file.as_bytes()).await?;
    assert_eq!(result.success_count, 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("Ligne 3"));
    assert!(result.is_success());
    assert_eq!(characters::count(&pool).await?, 1);
    Ok(())
}

#[tokio::test]
async fn reimport_updates_by_name_without_duplicating() -> Result<()> {
    let pool = setup_pool().await?;
    let first = format!(
        "{HEADER}REGINA;SSR;Mercenaire;3320;140;509;Mêlée;Sentinelle;14;2;Oui;Syndicat\n"
    );
    let result = import_csv(&pool, first.as_bytes()).await?;
    assert_eq!(result.success_count, 1);

    // Same character, lowercased name and a new power reading.
    let second = format!(
        "{HEADER}regina;SSR;Mercenaire;3321;140;509;Mêlée;Sentinelle;15;2;Oui;Syndicat\n"
    );
    let result = import_csv(&pool, second.as_bytes()).await?;
    assert_eq!(result.success_count, 1);

    assert_eq!(characters::count(&pool).await?, 1);
    let stored = characters::find_by_name_ci(&pool, "REGINA").await?.unwrap();
    // Stored casing wins over the incoming one.
    assert_eq!(stored.nom, "REGINA");
    assert_eq!(stored.puissance, 3321);
    assert_eq!(stored.niveau, 15);
    Ok(())
}

#[tokio::test]
async fn unknown_tokens_fall_back_to_defaults() -> Result<()> {
    let pool = setup_pool().await?;
    let file = format!("{HEADER}MYSTERE;??;??;abc;;;??;??;;;non;??\n");
    let result = import_csv(&pool, file.as_bytes()).await?;
    assert_eq!(result.success_count, 1);

    let stored = characters::find_by_name_ci(&pool, "MYSTERE").await?.unwrap();
    assert_eq!(stored.rarete.as_str(), "R");
    assert_eq!(stored.archetype.as_str(), "Mercenaire");
    assert_eq!(stored.niveau, 1);
    assert_eq!(stored.rang, 1);
    assert_eq!(stored.puissance, 0);
    Ok(())
}
