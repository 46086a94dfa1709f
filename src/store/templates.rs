use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error::{AppError, AppResult};
use crate::model::{Template, TEMPLATE_DESCRIPTION_MAX, TEMPLATE_IDS_JSON_MAX, TEMPLATE_NOM_MAX};
use crate::time::now_ms;

fn from_row(row: &SqliteRow) -> AppResult<Template> {
    let ids_json: String = row.try_get("personnage_ids")?;
    let personnage_ids: Vec<i64> = serde_json::from_str(&ids_json)?;
    Ok(Template {
        id: row.try_get("id")?,
        nom: row.try_get("nom")?,
        description: row.try_get("description")?,
        personnage_ids,
        puissance_totale: row.try_get("puissance_totale")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn validate(template: &Template) -> AppResult<String> {
    if template.nom.trim().is_empty() {
        return Err(AppError::new("TEMPLATE/NOM_VIDE", "Template name is required"));
    }
    if template.nom.chars().count() > TEMPLATE_NOM_MAX {
        return Err(AppError::new("TEMPLATE/NOM_TROP_LONG", "Template name too long")
            .with_context("max", TEMPLATE_NOM_MAX.to_string()));
    }
    if template.description.chars().count() > TEMPLATE_DESCRIPTION_MAX {
        return Err(
            AppError::new("TEMPLATE/DESCRIPTION_TROP_LONGUE", "Description too long")
                .with_context("max", TEMPLATE_DESCRIPTION_MAX.to_string()),
        );
    }
    let ids_json = serde_json::to_string(&template.personnage_ids)?;
    if ids_json.len() > TEMPLATE_IDS_JSON_MAX {
        return Err(
            AppError::new("TEMPLATE/IDS_TROP_LONGS", "Too many character references")
                .with_context("max_json_len", TEMPLATE_IDS_JSON_MAX.to_string()),
        );
    }
    Ok(ids_json)
}

pub async fn count(pool: &SqlitePool) -> AppResult<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM templates")
        .fetch_one(pool)
        .await?)
}

pub async fn list(pool: &SqlitePool) -> AppResult<Vec<Template>> {
    let rows = sqlx::query("SELECT * FROM templates ORDER BY nom COLLATE NOCASE")
        .fetch_all(pool)
        .await?;
    rows.iter().map(from_row).collect()
}

pub async fn find_by_name_ci(pool: &SqlitePool, nom: &str) -> AppResult<Option<Template>> {
    let row = sqlx::query("SELECT * FROM templates WHERE nom = ?1 COLLATE NOCASE")
        .bind(nom.trim())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(from_row).transpose()
}

pub async fn insert(pool: &SqlitePool, template: &Template) -> AppResult<i64> {
    let ids_json = validate(template)?;
    let now = now_ms();
    let result = sqlx::query(
        "INSERT INTO templates (nom, description, personnage_ids, puissance_totale, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(template.nom.trim())
    .bind(&template.description)
    .bind(ids_json)
    .bind(template.puissance_totale)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, template: &Template) -> AppResult<()> {
    let ids_json = validate(template)?;
    sqlx::query(
        "UPDATE templates SET nom = ?1, description = ?2, personnage_ids = ?3, \
           puissance_totale = ?4, updated_at = ?5 WHERE id = ?6",
    )
    .bind(template.nom.trim())
    .bind(&template.description)
    .bind(ids_json)
    .bind(template.puissance_totale)
    .bind(now_ms())
    .bind(template.id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Name-keyed upsert used by PML import: update when a case-insensitive
/// match exists, create otherwise. Returns the stored row id.
pub async fn upsert_by_nom(pool: &SqlitePool, template: &Template) -> AppResult<i64> {
    match find_by_name_ci(pool, &template.nom).await? {
        Some(existing) => {
            let mut merged = template.clone();
            merged.id = existing.id;
            merged.nom = existing.nom;
            update(pool, &merged).await?;
            Ok(existing.id)
        }
        None => insert(pool, template).await,
    }
}
