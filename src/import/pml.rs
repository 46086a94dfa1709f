//! PML (XML) import. The document is parsed once into a tree, then each
//! requested section is dispatched independently: an error in one section
//! never aborts the others, and every section feeds the same shared error
//! list. Inventory and template parsing are lenient (live data); the
//! `HistoriqueEscouade` records go through the strict historical path.

use sqlx::SqlitePool;
use tracing::info;

use super::{historical, ImportResult, SectionFlags};
use crate::error::AppResult;
use crate::mappers;
use crate::model::{Aspect, Personnage, Piece, Template, MAX_PIECES_SELECTIONNEES};
use crate::pml::{self, Element};
use crate::store::{characters, house, settings, templates};
use crate::time::now_iso;

pub async fn import_pml(
    pool: &SqlitePool,
    bytes: &[u8],
    flags: SectionFlags,
    filename: Option<&str>,
) -> AppResult<ImportResult> {
    let root = match pml::parse(bytes) {
        Ok(root) => root,
        Err(err) => {
            return Ok(ImportResult::failed(format!(
                "Document PML illisible: {err}"
            )));
        }
    };

    let mut result = ImportResult::new();

    if flags.inventory {
        if let Some(section) = find_section(&root, pml::INVENTAIRE) {
            import_inventaire(pool, section, &mut result).await?;
        }
    }

    if flags.templates {
        let section = find_section(&root, pml::TEMPLATES);
        let elements: Vec<&Element> = match section {
            Some(section) => section.find_all(pml::TEMPLATE).collect(),
            // A templates-only export may carry <template> elements
            // directly under the root.
            None => root.find_all(pml::TEMPLATE).collect(),
        };
        for element in elements {
            import_template(pool, element, &mut result).await?;
        }
    }

    if flags.best_squad {
        if let Some(section) = find_section(&root, pml::MEILLEUR_ESCOUADE) {
            import_meilleur_escouade(pool, section, &mut result).await?;
        }
    }

    if flags.histories {
        let records: Vec<&Element> = root.find_all(pml::HISTORIQUE_ESCOUADE).collect();
        if !records.is_empty() {
            let outcome = historical::import_snapshots(pool, &records).await?;
            result.success_count += outcome.imported;
            result.errors.extend(outcome.errors);
            result.warnings.extend(outcome.warnings);
        }
    }

    if flags.house {
        if let Some(section) = find_section(&root, pml::LUCIE_HOUSE) {
            import_lucie_house(pool, section, &mut result).await?;
        }
    }

    // A zero count with per-record errors is already explained; the generic
    // message only covers the technically-valid-but-empty document.
    if result.success_count == 0 && result.error.is_none() && result.errors.is_empty() {
        result.error = Some("Aucune donnée à importer dans ce document".to_string());
    }

    if result.is_success() {
        if let Some(filename) = filename.filter(|f| !f.trim().is_empty()) {
            settings::set(pool, settings::DERNIER_IMPORT_FICHIER, filename.trim()).await?;
            settings::set(pool, settings::DERNIER_IMPORT_DATE, &now_iso()).await?;
        }
    }

    info!(
        target: "escouade",
        event = "pml_import_done",
        imported = result.success_count,
        errors = result.errors.len(),
        warnings = result.warnings.len(),
    );
    Ok(result)
}

/// The root element name varies with the export's intent: a combined
/// document nests the section, a single-purpose document *is* the section.
fn find_section<'a>(root: &'a Element, name: &str) -> Option<&'a Element> {
    if root.name == name {
        Some(root)
    } else {
        root.find(name)
    }
}

async fn import_inventaire(
    pool: &SqlitePool,
    section: &Element,
    result: &mut ImportResult,
) -> AppResult<()> {
    for (index, element) in section.find_all(pml::PERSONNAGE).enumerate() {
        let personnage = match personnage_from_element(element) {
            Ok(personnage) => personnage,
            Err(reason) => {
                result.record_error(format!("Inventaire, personnage {}: {reason}", index + 1));
                continue;
            }
        };
        match characters::upsert_by_nom(pool, &personnage).await {
            Ok(_) => result.success_count += 1,
            Err(err) => result.record_error(format!(
                "Inventaire, personnage {}: écriture impossible ({err})",
                index + 1
            )),
        }
    }
    Ok(())
}

/// Lenient element→character mapping, the PML mirror of a CSV row.
fn personnage_from_element(element: &Element) -> Result<Personnage, String> {
    let nom = element.child_text("Nom").unwrap_or_default();
    if nom.is_empty() {
        return Err("nom manquant".to_string());
    }

    let text = |name: &str| element.child_text(name).unwrap_or_default();

    let mut personnage = Personnage::new(nom);
    personnage.rarete = mappers::rarete(text("Rarete"));
    personnage.archetype = mappers::archetype(text("Type"));
    personnage.puissance = mappers::entier(text("Puissance"), 0);
    personnage.pa = mappers::entier(text("PA"), 0);
    personnage.pv = mappers::entier(text("PV"), 0);
    personnage.niveau = mappers::entier(text("Niveau"), 1);
    personnage.rang = mappers::entier(text("Rang"), 1);
    personnage.role = mappers::role(text("Role"));
    personnage.faction = mappers::faction(text("Faction"));
    personnage.type_attaque = mappers::type_attaque(text("TypeAttaque"));
    personnage.selectionne = mappers::booleen(text("Selectionne"));
    personnage.description = text("Description").to_string();
    Ok(personnage)
}

async fn import_template(
    pool: &SqlitePool,
    element: &Element,
    result: &mut ImportResult,
) -> AppResult<()> {
    let nom = element.child_text("Nom").unwrap_or_default();
    if nom.is_empty() {
        result.record_error("Template sans nom ignoré".to_string());
        return Ok(());
    }

    // Stubs resolve against the current inventory; names that no longer
    // exist are dropped without a report. Deliberately more lenient than
    // character import.
    let mut personnage_ids = Vec::new();
    let mut puissance_totale = 0;
    for stub in element.find_all(pml::PERSONNAGE) {
        let stub_nom = stub.child_text("Nom").unwrap_or_default();
        if stub_nom.is_empty() {
            continue;
        }
        if let Some(live) = characters::find_by_name_ci(pool, stub_nom).await? {
            personnage_ids.push(live.id);
            puissance_totale += live.puissance;
        }
    }

    let template = Template {
        id: 0,
        nom: nom.to_string(),
        description: element.child_text("Description").unwrap_or_default().to_string(),
        personnage_ids,
        puissance_totale,
        created_at: 0,
        updated_at: 0,
    };

    match templates::upsert_by_nom(pool, &template).await {
        Ok(_) => result.success_count += 1,
        Err(err) => result.record_error(format!("Template {nom:?}: {err}")),
    }
    Ok(())
}

async fn import_meilleur_escouade(
    pool: &SqlitePool,
    section: &Element,
    result: &mut ImportResult,
) -> AppResult<()> {
    for slot_name in ["Commandant", "Mercenaire", "Androide"] {
        for slot in section.find_all(slot_name) {
            let nom = match slot.child_text("Nom").filter(|n| !n.is_empty()) {
                Some(nom) => nom,
                None => {
                    result.record_error(format!("Meilleure escouade: slot {slot_name} sans nom"));
                    continue;
                }
            };
            match characters::find_by_name_ci(pool, nom).await? {
                Some(live) => {
                    characters::set_selected(pool, live.id, true).await?;
                    result.success_count += 1;
                }
                None => result.record_error(format!(
                    "Meilleure escouade: personnage {nom:?} absent de l'inventaire"
                )),
            }
        }
    }
    Ok(())
}

async fn import_lucie_house(
    pool: &SqlitePool,
    section: &Element,
    result: &mut ImportResult,
) -> AppResult<()> {
    let mut pieces = Vec::new();
    for (index, element) in section.find_all(pml::PIECE).enumerate() {
        let nom = element.child_text("Nom").unwrap_or_default();
        if nom.is_empty() {
            result.record_error(format!("LucieHouse, pièce {}: nom manquant", index + 1));
            continue;
        }
        pieces.push(piece_from_element(nom, element));
    }

    if pieces.is_empty() {
        return Ok(());
    }

    let selected = pieces.iter().filter(|p| p.selectionnee).count();
    if selected > MAX_PIECES_SELECTIONNEES {
        result.warn(format!(
            "LucieHouse: {selected} pièces sélectionnées, le maximum est {MAX_PIECES_SELECTIONNEES}"
        ));
    }

    // Full overwrite of the stored house, never a merge.
    let count = pieces.len() as u64;
    match house::replace_all(pool, &pieces).await {
        Ok(()) => result.success_count += count,
        Err(err) => result.record_error(format!("LucieHouse: écriture impossible ({err})")),
    }
    Ok(())
}

fn piece_from_element(nom: &str, element: &Element) -> Piece {
    let aspect = |list_name: &str, puissance_name: &str| Aspect {
        puissance: mappers::entier(element.child_text(puissance_name).unwrap_or_default(), 0),
        bonus: element
            .find(list_name)
            .map(|list| {
                list.find_all("Bonus")
                    .map(|b| b.text.trim().to_string())
                    .collect()
            })
            .unwrap_or_default(),
    };

    Piece {
        id: 0,
        nom: nom.to_string(),
        niveau: mappers::entier(element.child_text("Niveau").unwrap_or_default(), 1),
        selectionnee: mappers::booleen(element.child_text("Selectionnee").unwrap_or_default()),
        tactique: aspect("BonusTactiques", "PuissanceTactique"),
        strategique: aspect("BonusStrategiques", "PuissanceStrategique"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Archetype, Rarity};
    use crate::pml::Element;

    fn perso_element(nom: &str) -> Element {
        Element::new(pml::PERSONNAGE)
            .with_child(Element::leaf("Nom", nom))
            .with_child(Element::leaf("Rarete", "SSR"))
            .with_child(Element::leaf("Type", "Commandant"))
            .with_child(Element::leaf("Puissance", 4200))
            .with_child(Element::leaf("Niveau", 30))
            .with_child(Element::leaf("Rang", 5))
            .with_child(Element::leaf("Selectionne", "Oui"))
    }

    #[test]
    fn element_maps_to_character() {
        let p = personnage_from_element(&perso_element("ISABELLE")).unwrap();
        assert_eq!(p.nom, "ISABELLE");
        assert_eq!(p.rarete, Rarity::Ssr);
        assert_eq!(p.archetype, Archetype::Commandant);
        assert_eq!(p.puissance, 4200);
        assert_eq!(p.niveau, 30);
        assert_eq!(p.rang, 5);
        assert!(p.selectionne);
    }

    #[test]
    fn element_without_name_is_an_error() {
        let element = Element::new(pml::PERSONNAGE).with_child(Element::leaf("Rarete", "R"));
        assert!(personnage_from_element(&element).is_err());
    }

    #[test]
    fn piece_reads_both_aspects() {
        let element = Element::new(pml::PIECE)
            .with_child(Element::leaf("Niveau", 4))
            .with_child(Element::leaf("Selectionnee", "Oui"))
            .with_child(Element::leaf("PuissanceTactique", 120))
            .with_child(
                Element::new("BonusTactiques")
                    .with_child(Element::leaf("Bonus", "+5% PA"))
                    .with_child(Element::leaf("Bonus", "+3% PV")),
            )
            .with_child(Element::leaf("PuissanceStrategique", 80));
        let piece = piece_from_element("Salon", &element);
        assert_eq!(piece.niveau, 4);
        assert!(piece.selectionnee);
        assert_eq!(piece.tactique.puissance, 120);
        assert_eq!(piece.tactique.bonus, vec!["+5% PA", "+3% PV"]);
        assert_eq!(piece.strategique.puissance, 80);
        assert!(piece.strategique.bonus.is_empty());
    }

    #[test]
    fn root_can_be_the_section_itself() {
        let root = Element::new(pml::INVENTAIRE).with_child(perso_element("A"));
        assert!(find_section(&root, pml::INVENTAIRE).is_some());
        let nested = Element::new(pml::ROOT)
            .with_child(Element::new(pml::INVENTAIRE).with_child(perso_element("A")));
        assert!(find_section(&nested, pml::INVENTAIRE).is_some());
        assert!(find_section(&nested, pml::LUCIE_HOUSE).is_none());
    }
}
