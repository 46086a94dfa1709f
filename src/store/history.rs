use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use super::{archetype_from_db, rarete_from_db};
use crate::error::AppResult;
use crate::model::{
    ClassementEntree, ClassementType, HistoPersonnage, HistoPiece, HistoSlot,
    HistoriqueClassement,
};
use crate::time::now_ms;

fn snapshot_from_row(row: &SqliteRow) -> AppResult<HistoriqueClassement> {
    Ok(HistoriqueClassement {
        id: row.try_get("id")?,
        date: row.try_get("date")?,
        score: row.try_get("score")?,
        ligue: row.try_get("ligue")?,
        puissance_commandant: row.try_get("puissance_commandant")?,
        puissance_mercenaires: row.try_get("puissance_mercenaires")?,
        puissance_pieces: row.try_get("puissance_pieces")?,
        puissance_totale: row.try_get("puissance_totale")?,
        commandant: None,
        mercenaires: Vec::new(),
        androides: Vec::new(),
        pieces: Vec::new(),
        entrees: Vec::new(),
    })
}

fn slot_from_db(token: &str) -> HistoSlot {
    match token {
        "Commandant" => HistoSlot::Commandant,
        "Androide" => HistoSlot::Androide,
        _ => HistoSlot::Mercenaire,
    }
}

fn classement_from_db(token: &str) -> ClassementType {
    match token {
        "Nutaku" => ClassementType::Nutaku,
        "Top150" => ClassementType::Top150,
        _ => ClassementType::France,
    }
}

/// Snapshot headers only, newest first; owned copies stay unloaded.
pub async fn list(pool: &SqlitePool) -> AppResult<Vec<HistoriqueClassement>> {
    let rows = sqlx::query("SELECT * FROM historique_classement ORDER BY date DESC, id DESC")
        .fetch_all(pool)
        .await?;
    rows.iter().map(snapshot_from_row).collect()
}

pub async fn count(pool: &SqlitePool) -> AppResult<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM historique_classement")
        .fetch_one(pool)
        .await?)
}

pub async fn exists(pool: &SqlitePool, id: i64) -> AppResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM historique_classement WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Fetch one snapshot with all owned copies attached.
pub async fn get(pool: &SqlitePool, id: i64) -> AppResult<Option<HistoriqueClassement>> {
    let row = sqlx::query("SELECT * FROM historique_classement WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else { return Ok(None) };
    let mut snapshot = snapshot_from_row(&row)?;

    let copies = sqlx::query("SELECT * FROM historique_personnages WHERE historique_id = ?1 ORDER BY id")
        .bind(id)
        .fetch_all(pool)
        .await?;
    for copy in &copies {
        let slot: String = copy.try_get("slot")?;
        let rarete: String = copy.try_get("rarete")?;
        let archetype: String = copy.try_get("archetype")?;
        let perso = HistoPersonnage {
            id: copy.try_get("id")?,
            origine_id: copy.try_get("origine_id")?,
            slot: slot_from_db(&slot),
            nom: copy.try_get("nom")?,
            rarete: rarete_from_db(&rarete),
            archetype: archetype_from_db(&archetype),
            niveau: copy.try_get("niveau")?,
            rang: copy.try_get("rang")?,
            puissance: copy.try_get("puissance")?,
        };
        match perso.slot {
            HistoSlot::Commandant => snapshot.commandant = Some(perso),
            HistoSlot::Mercenaire => snapshot.mercenaires.push(perso),
            HistoSlot::Androide => snapshot.androides.push(perso),
        }
    }

    let pieces = sqlx::query("SELECT * FROM historique_pieces WHERE historique_id = ?1 ORDER BY id")
        .bind(id)
        .fetch_all(pool)
        .await?;
    for piece in &pieces {
        snapshot.pieces.push(HistoPiece {
            id: piece.try_get("id")?,
            origine_id: piece.try_get("origine_id")?,
            nom: piece.try_get("nom")?,
            niveau: piece.try_get("niveau")?,
            puissance: piece.try_get("puissance")?,
        });
    }

    let entrees = sqlx::query("SELECT * FROM historique_entrees WHERE historique_id = ?1 ORDER BY id")
        .bind(id)
        .fetch_all(pool)
        .await?;
    for entree in &entrees {
        let classement: String = entree.try_get("type")?;
        snapshot.entrees.push(ClassementEntree {
            r#type: classement_from_db(&classement),
            valeur: entree.try_get("valeur")?,
        });
    }

    Ok(Some(snapshot))
}

async fn insert_copies(
    tx: &mut Transaction<'_, Sqlite>,
    historique_id: i64,
    snapshot: &HistoriqueClassement,
) -> AppResult<()> {
    let all = snapshot
        .commandant
        .iter()
        .chain(snapshot.mercenaires.iter())
        .chain(snapshot.androides.iter());
    for copy in all {
        sqlx::query(
            "INSERT INTO historique_personnages \
               (historique_id, origine_id, slot, nom, rarete, archetype, niveau, rang, puissance) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(historique_id)
        .bind(copy.origine_id)
        .bind(copy.slot.as_str())
        .bind(&copy.nom)
        .bind(copy.rarete.as_str())
        .bind(copy.archetype.as_str())
        .bind(copy.niveau)
        .bind(copy.rang)
        .bind(copy.puissance)
        .execute(&mut **tx)
        .await?;
    }

    for piece in &snapshot.pieces {
        sqlx::query(
            "INSERT INTO historique_pieces (historique_id, origine_id, nom, niveau, puissance) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(historique_id)
        .bind(piece.origine_id)
        .bind(&piece.nom)
        .bind(piece.niveau)
        .bind(piece.puissance)
        .execute(&mut **tx)
        .await?;
    }

    for entree in &snapshot.entrees {
        sqlx::query(
            "INSERT INTO historique_entrees (historique_id, type, valeur) VALUES (?1, ?2, ?3)",
        )
        .bind(historique_id)
        .bind(entree.r#type.as_str())
        .bind(entree.valeur)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Insert a snapshot and its copies inside the caller's transaction.
pub async fn insert_tx(
    tx: &mut Transaction<'_, Sqlite>,
    snapshot: &HistoriqueClassement,
) -> AppResult<i64> {
    let now = now_ms();
    let result = sqlx::query(
        "INSERT INTO historique_classement \
           (date, score, ligue, puissance_commandant, puissance_mercenaires, \
            puissance_pieces, puissance_totale, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&snapshot.date)
    .bind(snapshot.score)
    .bind(snapshot.ligue)
    .bind(snapshot.puissance_commandant)
    .bind(snapshot.puissance_mercenaires)
    .bind(snapshot.puissance_pieces)
    .bind(snapshot.puissance_totale)
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?;
    let id = result.last_insert_rowid();
    insert_copies(tx, id, snapshot).await?;
    Ok(id)
}

/// Upsert-by-id counterpart: replaces the header row and re-creates the
/// owned copies for `snapshot.id`.
pub async fn update_tx(
    tx: &mut Transaction<'_, Sqlite>,
    snapshot: &HistoriqueClassement,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE historique_classement SET \
           date = ?1, score = ?2, ligue = ?3, puissance_commandant = ?4, \
           puissance_mercenaires = ?5, puissance_pieces = ?6, puissance_totale = ?7, \
           updated_at = ?8 \
         WHERE id = ?9",
    )
    .bind(&snapshot.date)
    .bind(snapshot.score)
    .bind(snapshot.ligue)
    .bind(snapshot.puissance_commandant)
    .bind(snapshot.puissance_mercenaires)
    .bind(snapshot.puissance_pieces)
    .bind(snapshot.puissance_totale)
    .bind(now_ms())
    .bind(snapshot.id)
    .execute(&mut **tx)
    .await?;

    for table in [
        "historique_personnages",
        "historique_pieces",
        "historique_entrees",
    ] {
        sqlx::query(&format!("DELETE FROM {table} WHERE historique_id = ?1"))
            .bind(snapshot.id)
            .execute(&mut **tx)
            .await?;
    }
    insert_copies(tx, snapshot.id, snapshot).await?;
    Ok(())
}
