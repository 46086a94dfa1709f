use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{archetype_from_db, faction_from_db, rarete_from_db, role_from_db, type_attaque_from_db};
use crate::error::AppResult;
use crate::model::{Capacite, Personnage};
use crate::time::now_ms;

fn from_row(row: &SqliteRow) -> AppResult<Personnage> {
    let rarete: String = row.try_get("rarete")?;
    let archetype: String = row.try_get("archetype")?;
    let role: String = row.try_get("role")?;
    let faction: String = row.try_get("faction")?;
    let type_attaque: String = row.try_get("type_attaque")?;
    let selectionne: i64 = row.try_get("selectionne")?;
    Ok(Personnage {
        id: row.try_get("id")?,
        nom: row.try_get("nom")?,
        rarete: rarete_from_db(&rarete),
        archetype: archetype_from_db(&archetype),
        niveau: row.try_get("niveau")?,
        rang: row.try_get("rang")?,
        puissance: row.try_get("puissance")?,
        pa: row.try_get("pa")?,
        pv: row.try_get("pv")?,
        role: role_from_db(&role),
        faction: faction_from_db(&faction),
        type_attaque: type_attaque_from_db(&type_attaque),
        selectionne: selectionne != 0,
        description: row.try_get("description")?,
        image_entete: row.try_get("image_entete")?,
        capacites: Vec::new(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn list(pool: &SqlitePool) -> AppResult<Vec<Personnage>> {
    let rows = sqlx::query("SELECT * FROM personnages ORDER BY nom COLLATE NOCASE")
        .fetch_all(pool)
        .await?;
    rows.iter().map(from_row).collect()
}

pub async fn count(pool: &SqlitePool) -> AppResult<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM personnages")
        .fetch_one(pool)
        .await?)
}

pub async fn find_by_name_ci(pool: &SqlitePool, nom: &str) -> AppResult<Option<Personnage>> {
    let row = sqlx::query("SELECT * FROM personnages WHERE nom = ?1 COLLATE NOCASE")
        .bind(nom.trim())
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(from_row).transpose()
}

/// Fetch one character with its abilities loaded.
pub async fn get(pool: &SqlitePool, id: i64) -> AppResult<Option<Personnage>> {
    let row = sqlx::query("SELECT * FROM personnages WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else { return Ok(None) };
    let mut personnage = from_row(&row)?;
    let capacites = sqlx::query(
        "SELECT id, nom, description, icone FROM capacites WHERE personnage_id = ?1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;
    personnage.capacites = capacites
        .iter()
        .map(|c| {
            Ok(Capacite {
                id: c.try_get("id")?,
                nom: c.try_get("nom")?,
                description: c.try_get("description")?,
                icone: c.try_get("icone")?,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Some(personnage))
}

pub async fn insert(pool: &SqlitePool, personnage: &Personnage) -> AppResult<i64> {
    let now = now_ms();
    let result = sqlx::query(
        "INSERT INTO personnages \
           (nom, rarete, archetype, niveau, rang, puissance, pa, pv, role, faction, \
            type_attaque, selectionne, description, image_entete, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
    )
    .bind(personnage.nom.trim())
    .bind(personnage.rarete.as_str())
    .bind(personnage.archetype.as_str())
    .bind(personnage.niveau)
    .bind(personnage.rang)
    .bind(personnage.puissance)
    .bind(personnage.pa)
    .bind(personnage.pv)
    .bind(personnage.role.as_str())
    .bind(personnage.faction.as_str())
    .bind(personnage.type_attaque.as_str())
    .bind(personnage.selectionne as i64)
    .bind(&personnage.description)
    .bind(&personnage.image_entete)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    let id = result.last_insert_rowid();

    for capacite in &personnage.capacites {
        sqlx::query(
            "INSERT INTO capacites (personnage_id, nom, description, icone) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(id)
        .bind(&capacite.nom)
        .bind(&capacite.description)
        .bind(&capacite.icone)
        .execute(pool)
        .await?;
    }
    Ok(id)
}

pub async fn update(pool: &SqlitePool, personnage: &Personnage) -> AppResult<()> {
    sqlx::query(
        "UPDATE personnages SET \
           nom = ?1, rarete = ?2, archetype = ?3, niveau = ?4, rang = ?5, puissance = ?6, \
           pa = ?7, pv = ?8, role = ?9, faction = ?10, type_attaque = ?11, selectionne = ?12, \
           description = ?13, image_entete = ?14, updated_at = ?15 \
         WHERE id = ?16",
    )
    .bind(personnage.nom.trim())
    .bind(personnage.rarete.as_str())
    .bind(personnage.archetype.as_str())
    .bind(personnage.niveau)
    .bind(personnage.rang)
    .bind(personnage.puissance)
    .bind(personnage.pa)
    .bind(personnage.pv)
    .bind(personnage.role.as_str())
    .bind(personnage.faction.as_str())
    .bind(personnage.type_attaque.as_str())
    .bind(personnage.selectionne as i64)
    .bind(&personnage.description)
    .bind(&personnage.image_entete)
    .bind(now_ms())
    .bind(personnage.id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_selected(pool: &SqlitePool, id: i64, selected: bool) -> AppResult<()> {
    sqlx::query("UPDATE personnages SET selectionne = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(selected as i64)
        .bind(now_ms())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: i64) -> AppResult<()> {
    sqlx::query("DELETE FROM personnages WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Created(i64),
    Updated(i64),
}

impl Upserted {
    pub fn id(&self) -> i64 {
        match self {
            Upserted::Created(id) | Upserted::Updated(id) => *id,
        }
    }
}

/// Pure merge of an incoming import onto the stored record: identity,
/// creation timestamp, abilities and the header-image override survive,
/// every field an import carries is overwritten.
pub fn merge_personnage(existing: &Personnage, incoming: &Personnage) -> Personnage {
    Personnage {
        id: existing.id,
        nom: existing.nom.clone(),
        rarete: incoming.rarete,
        archetype: incoming.archetype,
        niveau: incoming.niveau,
        rang: incoming.rang,
        puissance: incoming.puissance,
        pa: incoming.pa,
        pv: incoming.pv,
        role: incoming.role,
        faction: incoming.faction,
        type_attaque: incoming.type_attaque,
        selectionne: incoming.selectionne,
        description: incoming.description.clone(),
        image_entete: existing.image_entete.clone(),
        capacites: existing.capacites.clone(),
        created_at: existing.created_at,
        updated_at: existing.updated_at,
    }
}

/// Name-keyed upsert: a case-insensitive name match updates that record in
/// place, anything else creates a new one. One write per call.
pub async fn upsert_by_nom(pool: &SqlitePool, incoming: &Personnage) -> AppResult<Upserted> {
    match find_by_name_ci(pool, &incoming.nom).await? {
        Some(existing) => {
            let merged = merge_personnage(&existing, incoming);
            update(pool, &merged).await?;
            Ok(Upserted::Updated(existing.id))
        }
        None => {
            let id = insert(pool, incoming).await?;
            Ok(Upserted::Created(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Archetype, Rarity};

    #[test]
    fn merge_keeps_identity_and_overwrites_stats() {
        let mut existing = Personnage::new("REGINA");
        existing.id = 7;
        existing.created_at = 111;
        existing.image_entete = Some("images/custom.png".into());
        existing.puissance = 3320;

        let mut incoming = Personnage::new("regina");
        incoming.rarete = Rarity::Ssr;
        incoming.archetype = Archetype::Mercenaire;
        incoming.puissance = 3321;
        incoming.selectionne = true;

        let merged = merge_personnage(&existing, &incoming);
        assert_eq!(merged.id, 7);
        assert_eq!(merged.nom, "REGINA"); // stored casing wins
        assert_eq!(merged.created_at, 111);
        assert_eq!(merged.image_entete.as_deref(), Some("images/custom.png"));
        assert_eq!(merged.puissance, 3321);
        assert_eq!(merged.rarete, Rarity::Ssr);
        assert!(merged.selectionne);
    }
}
