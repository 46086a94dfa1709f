//! Semicolon-delimited CSV inventory import.
//!
//! The header line is mandatory but its content is never validated; rows
//! map through the lenient field mappers and upsert by case-insensitive
//! name, one commit per row. A malformed row is skipped and reported, it
//! never aborts the batch.

use csv::ReaderBuilder;
use sqlx::SqlitePool;
use tracing::info;

use super::ImportResult;
use crate::error::AppResult;
use crate::mappers;
use crate::model::Personnage;
use crate::store::characters;

/// Positional fields a data row must carry.
pub const CSV_FIELD_COUNT: usize = 12;

pub async fn import_csv(pool: &SqlitePool, bytes: &[u8]) -> AppResult<ImportResult> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(ImportResult::failed(
            "Fichier vide: aucune ligne d'entête trouvée",
        ));
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let mut result = ImportResult::new();
    let mut data_rows = 0_u64;

    for (index, record) in reader.records().enumerate() {
        let line = index + 2; // line 1 is the header
        data_rows += 1;

        let record = match record {
            Ok(record) => record,
            Err(err) => {
                result.record_error(format!("Ligne {line}: lecture impossible ({err})"));
                continue;
            }
        };
        if record.iter().all(|field| field.trim().is_empty()) {
            data_rows -= 1;
            continue;
        }
        if record.len() < CSV_FIELD_COUNT {
            result.record_error(format!(
                "Ligne {line}: {} champs au lieu de {CSV_FIELD_COUNT}",
                record.len()
            ));
            continue;
        }

        let personnage = match personnage_from_record(&record) {
            Ok(personnage) => personnage,
            Err(reason) => {
                result.record_error(format!("Ligne {line}: {reason}"));
                continue;
            }
        };

        // One commit per row: already-applied rows survive later failures.
        match characters::upsert_by_nom(pool, &personnage).await {
            Ok(_) => result.success_count += 1,
            Err(err) => {
                result.record_error(format!("Ligne {line}: écriture impossible ({err})"))
            }
        }
    }

    if data_rows == 0 {
        return Ok(ImportResult::failed(
            "Le fichier ne contient que l'entête: aucune donnée à importer",
        ));
    }

    info!(
        target: "escouade",
        event = "csv_import_done",
        imported = result.success_count,
        errors = result.errors.len(),
    );
    Ok(result)
}

fn personnage_from_record(record: &csv::StringRecord) -> Result<Personnage, String> {
    let field = |index: usize| record.get(index).unwrap_or_default();

    let nom = field(0).trim();
    if nom.is_empty() {
        return Err("nom manquant".to_string());
    }

    let mut personnage = Personnage::new(nom);
    personnage.rarete = mappers::rarete(field(1));
    personnage.archetype = mappers::archetype(field(2));
    personnage.puissance = mappers::entier(field(3), 0);
    personnage.pa = mappers::entier(field(4), 0);
    personnage.pv = mappers::entier(field(5), 0);
    personnage.type_attaque = mappers::type_attaque(field(6));
    personnage.role = mappers::role(field(7));
    personnage.niveau = mappers::entier(field(8), 1);
    personnage.rang = mappers::entier(field(9), 1);
    personnage.selectionne = mappers::booleen(field(10));
    personnage.faction = mappers::faction(field(11));
    Ok(personnage)
}
