use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error::AppResult;
use crate::model::{Aspect, Piece, MAX_PIECES_SELECTIONNEES};

fn from_row(row: &SqliteRow) -> AppResult<Piece> {
    let selectionnee: i64 = row.try_get("selectionnee")?;
    let bonus_tactiques: String = row.try_get("bonus_tactiques")?;
    let bonus_strategiques: String = row.try_get("bonus_strategiques")?;
    Ok(Piece {
        id: row.try_get("id")?,
        nom: row.try_get("nom")?,
        niveau: row.try_get("niveau")?,
        selectionnee: selectionnee != 0,
        tactique: Aspect {
            puissance: row.try_get("puissance_tactique")?,
            bonus: serde_json::from_str(&bonus_tactiques)?,
        },
        strategique: Aspect {
            puissance: row.try_get("puissance_strategique")?,
            bonus: serde_json::from_str(&bonus_strategiques)?,
        },
    })
}

pub async fn list(pool: &SqlitePool) -> AppResult<Vec<Piece>> {
    let rows = sqlx::query("SELECT * FROM pieces ORDER BY nom COLLATE NOCASE")
        .fetch_all(pool)
        .await?;
    rows.iter().map(from_row).collect()
}

pub async fn count(pool: &SqlitePool) -> AppResult<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM pieces")
        .fetch_one(pool)
        .await?)
}

pub async fn selected_count(pool: &SqlitePool) -> AppResult<i64> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM pieces WHERE selectionnee = 1")
            .fetch_one(pool)
            .await?,
    )
}

/// PML house import semantics: the stored house is replaced wholesale by
/// the incoming rooms, never merged.
pub async fn replace_all(pool: &SqlitePool, pieces: &[Piece]) -> AppResult<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM pieces").execute(&mut *tx).await?;
    for piece in pieces {
        sqlx::query(
            "INSERT INTO pieces \
               (nom, niveau, selectionnee, puissance_tactique, bonus_tactiques, \
                puissance_strategique, bonus_strategiques) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(piece.nom.trim())
        .bind(piece.niveau)
        .bind(piece.selectionnee as i64)
        .bind(piece.tactique.puissance)
        .bind(serde_json::to_string(&piece.tactique.bonus)?)
        .bind(piece.strategique.puissance)
        .bind(serde_json::to_string(&piece.strategique.bonus)?)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectOutcome {
    Selected,
    /// The 2-room cap was reached; the selection was refused without error.
    Refused,
    NotFound,
}

/// Select a room by name. Selecting a 3rd room while 2 are active is
/// silently refused; the caller surfaces it as a warning.
pub async fn select_room(pool: &SqlitePool, nom: &str) -> AppResult<SelectOutcome> {
    let row = sqlx::query("SELECT id, selectionnee FROM pieces WHERE nom = ?1 COLLATE NOCASE")
        .bind(nom.trim())
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Ok(SelectOutcome::NotFound);
    };
    let id: i64 = row.try_get("id")?;
    let already: i64 = row.try_get("selectionnee")?;
    if already != 0 {
        return Ok(SelectOutcome::Selected);
    }
    if selected_count(pool).await? >= MAX_PIECES_SELECTIONNEES as i64 {
        return Ok(SelectOutcome::Refused);
    }
    sqlx::query("UPDATE pieces SET selectionnee = 1 WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(SelectOutcome::Selected)
}

pub async fn deselect_room(pool: &SqlitePool, nom: &str) -> AppResult<bool> {
    let result = sqlx::query("UPDATE pieces SET selectionnee = 0 WHERE nom = ?1 COLLATE NOCASE")
        .bind(nom.trim())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
