//! Strict import path for `HistoriqueEscouade` ranking snapshots.
//!
//! Unlike the lenient live-data paths, every numeric field is range-checked
//! and every referenced character must exist in inventory with the
//! archetype its slot expects. A single bad record poisons the whole
//! batch: nothing is persisted unless everything validates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::mappers::strict;
use crate::model::{
    Archetype, ClassementEntree, HistoPersonnage, HistoPiece, HistoSlot, HistoriqueClassement,
    MAX_ANDROIDES, MAX_MERCENAIRES,
};
use crate::pml::Element;
use crate::store::{characters, history};

#[derive(Debug, Default)]
pub struct SnapshotImportOutcome {
    pub imported: u64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Embedded squad-composition blob carried by each record. Parsed
/// best-effort: a blob that is not valid JSON yields an empty composition
/// and a warning instead of an error.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DonneesEscouade {
    pub commandant: Option<MembreEscouade>,
    pub mercenaires: Vec<MembreEscouade>,
    pub androides: Vec<MembreEscouade>,
    pub pieces: Vec<PieceEscouade>,
    pub classements: Vec<EntreeClassement>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MembreEscouade {
    pub nom: String,
    pub rarete: String,
    pub niveau: i64,
    pub rang: i64,
    pub puissance: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PieceEscouade {
    pub nom: String,
    pub niveau: i64,
    pub puissance: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EntreeClassement {
    pub r#type: String,
    pub valeur: i64,
}

struct InventoryIndex {
    by_name: HashMap<String, (i64, Archetype)>,
}

impl InventoryIndex {
    async fn load(pool: &SqlitePool) -> AppResult<Self> {
        let roster = characters::list(pool).await?;
        let by_name = roster
            .into_iter()
            .map(|p| (p.nom.to_lowercase(), (p.id, p.archetype)))
            .collect();
        Ok(InventoryIndex { by_name })
    }

    fn resolve(&self, nom: &str, slot: HistoSlot) -> Result<i64, String> {
        match self.by_name.get(&nom.trim().to_lowercase()) {
            None => Err(format!("personnage {nom:?} absent de l'inventaire")),
            Some((_, archetype)) if *archetype != slot.expected_archetype() => Err(format!(
                "personnage {nom:?} est {} mais le slot {} attend {}",
                archetype.as_str(),
                slot.as_str(),
                slot.expected_archetype().as_str()
            )),
            Some((id, _)) => Ok(*id),
        }
    }
}

/// All-or-nothing snapshot import: validate every record first, then
/// persist the whole batch in one transaction only when no error was
/// accumulated.
pub async fn import_snapshots(
    pool: &SqlitePool,
    records: &[&Element],
) -> AppResult<SnapshotImportOutcome> {
    let index = InventoryIndex::load(pool).await?;
    let mut outcome = SnapshotImportOutcome::default();
    let mut parsed: Vec<(Option<i64>, HistoriqueClassement)> = Vec::new();

    for (position, element) in records.iter().enumerate() {
        let label = format!("HistoriqueEscouade {}", position + 1);
        match parse_record(element, &index, &mut outcome.warnings) {
            Ok((id, snapshot)) => {
                // Upsert-by-id only applies to ids that actually exist.
                let id = match id {
                    Some(id) => history::exists(pool, id).await?.then_some(id),
                    None => None,
                };
                parsed.push((id, snapshot));
            }
            Err(reasons) => {
                for reason in reasons {
                    outcome.errors.push(format!("{label}: {reason}"));
                }
            }
        }
    }

    if !outcome.errors.is_empty() {
        warn!(
            target: "escouade",
            event = "history_import_aborted",
            records = records.len(),
            errors = outcome.errors.len(),
        );
        return Ok(outcome);
    }

    let mut tx = pool.begin().await?;
    for (id, mut snapshot) in parsed {
        match id {
            Some(id) => {
                snapshot.id = id;
                history::update_tx(&mut tx, &snapshot).await?;
            }
            None => {
                history::insert_tx(&mut tx, &snapshot).await?;
            }
        }
        outcome.imported += 1;
    }
    tx.commit().await?;

    info!(
        target: "escouade",
        event = "history_import_done",
        imported = outcome.imported,
    );
    Ok(outcome)
}

fn parse_record(
    element: &Element,
    index: &InventoryIndex,
    warnings: &mut Vec<String>,
) -> Result<(Option<i64>, HistoriqueClassement), Vec<String>> {
    let mut errors = Vec::new();
    let text = |name: &str| element.child_text(name).unwrap_or_default();

    let id = match element.child_text("Id") {
        Some(raw) if !raw.is_empty() => match strict::entier("id", raw) {
            Ok(id) => Some(id),
            Err(reason) => {
                errors.push(reason);
                None
            }
        },
        _ => None,
    };

    let date = text("Date").to_string();
    if date.is_empty() {
        errors.push("date manquante".to_string());
    }

    let mut field = |name: &str, default_on_error: i64| match element.child_text(name) {
        Some(raw) if !raw.is_empty() => match strict::entier(name, raw) {
            Ok(value) => value,
            Err(reason) => {
                errors.push(reason);
                default_on_error
            }
        },
        _ => default_on_error,
    };

    let score = field("Score", 0);
    let ligue = field("Ligue", 0);
    let puissance_totale_declaree = field("PuissanceTotale", 0);

    let composition = match element.child_text("DonneesEscouadeJson") {
        Some(raw) if !raw.is_empty() => match serde_json::from_str::<DonneesEscouade>(raw) {
            Ok(composition) => composition,
            Err(err) => {
                // Opaque blob policy: unreadable JSON downgrades to an
                // empty composition instead of poisoning the batch.
                warnings.push(format!(
                    "DonneesEscouadeJson illisible, composition ignorée ({err})"
                ));
                DonneesEscouade::default()
            }
        },
        _ => DonneesEscouade::default(),
    };

    if composition.mercenaires.len() > MAX_MERCENAIRES {
        errors.push(format!(
            "{} mercenaires, le maximum est {MAX_MERCENAIRES}",
            composition.mercenaires.len()
        ));
    }
    if composition.androides.len() > MAX_ANDROIDES {
        errors.push(format!(
            "{} androïdes, le maximum est {MAX_ANDROIDES}",
            composition.androides.len()
        ));
    }

    let mut snapshot = HistoriqueClassement {
        date,
        score,
        ligue,
        ..HistoriqueClassement::default()
    };

    if let Some(membre) = &composition.commandant {
        match valide_membre(membre, HistoSlot::Commandant, index) {
            Ok(copy) => snapshot.commandant = Some(copy),
            Err(reason) => errors.push(reason),
        }
    }
    for membre in &composition.mercenaires {
        match valide_membre(membre, HistoSlot::Mercenaire, index) {
            Ok(copy) => snapshot.mercenaires.push(copy),
            Err(reason) => errors.push(reason),
        }
    }
    for membre in &composition.androides {
        match valide_membre(membre, HistoSlot::Androide, index) {
            Ok(copy) => snapshot.androides.push(copy),
            Err(reason) => errors.push(reason),
        }
    }

    for piece in &composition.pieces {
        if piece.nom.trim().is_empty() {
            errors.push("pièce sans nom".to_string());
            continue;
        }
        match strict::puissance(piece.puissance) {
            Ok(puissance) => snapshot.pieces.push(HistoPiece {
                id: 0,
                origine_id: None,
                nom: piece.nom.trim().to_string(),
                niveau: piece.niveau,
                puissance,
            }),
            Err(reason) => errors.push(format!("pièce {:?}: {reason}", piece.nom)),
        }
    }

    for entree in &composition.classements {
        match strict::classement(&entree.r#type) {
            Ok(classement) => snapshot.entrees.push(ClassementEntree {
                r#type: classement,
                valeur: entree.valeur,
            }),
            Err(reason) => errors.push(reason),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    snapshot.puissance_commandant = snapshot.commandant.as_ref().map_or(0, |c| c.puissance);
    snapshot.puissance_mercenaires = snapshot.mercenaires.iter().map(|m| m.puissance).sum();
    snapshot.puissance_pieces = snapshot.pieces.iter().map(|p| p.puissance).sum();
    snapshot.puissance_totale = if puissance_totale_declaree > 0 {
        puissance_totale_declaree
    } else {
        snapshot.puissance_commandant
            + snapshot.puissance_mercenaires
            + snapshot.androides.iter().map(|a| a.puissance).sum::<i64>()
            + snapshot.puissance_pieces
    };

    Ok((id, snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rarity;

    fn index_with(entries: &[(&str, i64, Archetype)]) -> InventoryIndex {
        InventoryIndex {
            by_name: entries
                .iter()
                .map(|(nom, id, archetype)| (nom.to_lowercase(), (*id, *archetype)))
                .collect(),
        }
    }

    fn record(blob: &str) -> Element {
        Element::new("HistoriqueEscouade")
            .with_child(Element::leaf("Date", "2026-01-15"))
            .with_child(Element::leaf("Score", "4200"))
            .with_child(Element::leaf("Ligue", "3"))
            .with_child(Element::leaf("DonneesEscouadeJson", blob))
    }

    #[test]
    fn valid_blob_populates_composition() {
        let index = index_with(&[("Regina", 7, Archetype::Commandant)]);
        let blob = r#"{"commandant":{"nom":"REGINA","rarete":"SSR","niveau":42,"rang":5,"puissance":3321}}"#;
        let mut warnings = Vec::new();
        let (id, snapshot) = parse_record(&record(blob), &index, &mut warnings).unwrap();
        assert_eq!(id, None);
        assert!(warnings.is_empty());
        let commandant = snapshot.commandant.unwrap();
        assert_eq!(commandant.origine_id, Some(7));
        assert_eq!(commandant.rarete, Rarity::Ssr);
        assert_eq!(snapshot.puissance_commandant, 3321);
        assert_eq!(snapshot.puissance_totale, 3321);
        assert_eq!(snapshot.score, 4200);
    }

    #[test]
    fn unreadable_blob_warns_and_keeps_record() {
        let index = index_with(&[]);
        let mut warnings = Vec::new();
        let (_, snapshot) =
            parse_record(&record("{not json"), &index, &mut warnings).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(snapshot.commandant.is_none());
        assert!(snapshot.mercenaires.is_empty());
    }

    #[test]
    fn archetype_mismatch_is_an_error() {
        let index = index_with(&[("Lya", 2, Archetype::Mercenaire)]);
        let blob = r#"{"commandant":{"nom":"Lya","rarete":"R","niveau":1,"rang":0,"puissance":10}}"#;
        let mut warnings = Vec::new();
        let errors = parse_record(&record(blob), &index, &mut warnings).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Commandant"));
    }

    #[test]
    fn missing_date_is_an_error() {
        let index = index_with(&[]);
        let element = Element::new("HistoriqueEscouade").with_child(Element::leaf("Score", "1"));
        let mut warnings = Vec::new();
        let errors = parse_record(&element, &index, &mut warnings).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("date")));
    }
}

fn valide_membre(
    membre: &MembreEscouade,
    slot: HistoSlot,
    index: &InventoryIndex,
) -> Result<HistoPersonnage, String> {
    if membre.nom.trim().is_empty() {
        return Err(format!("slot {}: nom manquant", slot.as_str()));
    }
    let origine_id = index.resolve(&membre.nom, slot)?;
    let rarete = strict::rarete(&membre.rarete)
        .map_err(|reason| format!("{}: {reason}", membre.nom))?;
    let niveau = strict::niveau(membre.niveau)
        .map_err(|reason| format!("{}: {reason}", membre.nom))?;
    let rang = strict::rang(membre.rang).map_err(|reason| format!("{}: {reason}", membre.nom))?;
    let puissance = strict::puissance(membre.puissance)
        .map_err(|reason| format!("{}: {reason}", membre.nom))?;

    Ok(HistoPersonnage {
        id: 0,
        origine_id: Some(origine_id),
        slot,
        nom: membre.nom.trim().to_string(),
        rarete,
        archetype: slot.expected_archetype(),
        niveau,
        rang,
        puissance,
    })
}
