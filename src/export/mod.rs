//! PML (XML) export. Each section is built by a pure function over already
//! loaded rows, assembled under a single `pml` root, then serialized in one
//! pass. The element shapes mirror what the importer reads, so an exported
//! document re-imports without loss on the stable fields.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::AppResult;
use crate::import::historical::{DonneesEscouade, EntreeClassement, MembreEscouade, PieceEscouade};
use crate::import::SectionFlags;
use crate::model::{HistoPersonnage, HistoriqueClassement, Personnage, Piece, Template};
use crate::pml::{self, Element};
use crate::squad;
use crate::store::{characters, history, house, settings, templates};
use crate::time::now_iso;

/// Serialize the requested sections into a PML document and remember the
/// export date.
pub async fn export_pml(pool: &SqlitePool, flags: SectionFlags) -> AppResult<Vec<u8>> {
    let export_date = now_iso();
    let mut root = Element::new(pml::ROOT)
        .with_attr("version", pml::FORMAT_VERSION)
        .with_attr("exportDate", export_date.as_str());

    let roster = if flags.inventory || flags.templates || flags.best_squad {
        characters::list(pool).await?
    } else {
        Vec::new()
    };

    if flags.inventory {
        root = root.with_child(inventaire_element(&roster));
    }

    if flags.templates {
        root = root.with_child(templates_element(&templates::list(pool).await?, &roster));
    }

    if flags.best_squad {
        root = root.with_child(meilleur_escouade_element(&roster));
    }

    if flags.histories {
        for header in history::list(pool).await? {
            if let Some(snapshot) = history::get(pool, header.id).await? {
                root = root.with_child(historique_element(&snapshot));
            }
        }
    }

    if flags.house {
        root = root.with_child(lucie_house_element(&house::list(pool).await?));
    }

    let bytes = pml::write(&root)?;
    settings::set(pool, settings::DERNIER_EXPORT_DATE, &export_date).await?;

    info!(
        target: "escouade",
        event = "pml_export_done",
        bytes = bytes.len(),
    );
    Ok(bytes)
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "Oui"
    } else {
        "Non"
    }
}

fn personnage_element(p: &Personnage) -> Element {
    let mut element = Element::new(pml::PERSONNAGE)
        .with_child(Element::leaf("Nom", &p.nom))
        .with_child(Element::leaf("Rarete", p.rarete.as_str()))
        .with_child(Element::leaf("Type", p.archetype.as_str()))
        .with_child(Element::leaf("Puissance", p.puissance))
        .with_child(Element::leaf("PA", p.pa))
        .with_child(Element::leaf("PV", p.pv))
        .with_child(Element::leaf("TypeAttaque", p.type_attaque.as_str()))
        .with_child(Element::leaf("Role", p.role.as_str()))
        .with_child(Element::leaf("Niveau", p.niveau))
        .with_child(Element::leaf("Rang", p.rang))
        .with_child(Element::leaf("Selectionne", bool_text(p.selectionne)))
        .with_child(Element::leaf("Faction", p.faction.as_str()));
    if !p.description.is_empty() {
        element = element.with_child(Element::leaf("Description", &p.description));
    }
    element
}

fn inventaire_element(roster: &[Personnage]) -> Element {
    let mut section = Element::new(pml::INVENTAIRE);
    for p in roster {
        section = section.with_child(personnage_element(p));
    }
    section
}

/// Template members are exported as name stubs; the importer resolves them
/// back against whatever inventory it lands in.
fn stub_element(p: &Personnage) -> Element {
    Element::new(pml::PERSONNAGE)
        .with_child(Element::leaf("Nom", &p.nom))
        .with_child(Element::leaf("Rarete", p.rarete.as_str()))
        .with_child(Element::leaf("Puissance", p.puissance))
        .with_child(Element::leaf("Niveau", p.niveau))
}

fn templates_element(list: &[Template], roster: &[Personnage]) -> Element {
    let mut section = Element::new(pml::TEMPLATES);
    for template in list {
        let mut element = Element::new(pml::TEMPLATE)
            .with_child(Element::leaf("Nom", &template.nom));
        if !template.description.is_empty() {
            element = element.with_child(Element::leaf("Description", &template.description));
        }
        element = element.with_child(Element::leaf("PuissanceTotale", template.puissance_totale));
        for id in &template.personnage_ids {
            if let Some(p) = roster.iter().find(|p| p.id == *id) {
                element = element.with_child(stub_element(p));
            }
        }
        section = section.with_child(element);
    }
    section
}

fn meilleur_escouade_element(roster: &[Personnage]) -> Element {
    let best = squad::meilleur_escouade(roster);
    let mut section = Element::new(pml::MEILLEUR_ESCOUADE)
        .with_child(Element::leaf("PuissanceTotale", best.puissance_totale()));
    if let Some(commandant) = &best.commandant {
        section = section.with_child(
            Element::new("Commandant").with_child(Element::leaf("Nom", &commandant.nom)),
        );
    }
    for p in &best.mercenaires {
        section = section
            .with_child(Element::new("Mercenaire").with_child(Element::leaf("Nom", &p.nom)));
    }
    for p in &best.androides {
        section = section
            .with_child(Element::new("Androide").with_child(Element::leaf("Nom", &p.nom)));
    }
    section
}

fn membre(copy: &HistoPersonnage) -> MembreEscouade {
    MembreEscouade {
        nom: copy.nom.clone(),
        rarete: copy.rarete.as_str().to_string(),
        niveau: copy.niveau,
        rang: copy.rang,
        puissance: copy.puissance,
    }
}

fn historique_element(snapshot: &HistoriqueClassement) -> Element {
    let donnees = DonneesEscouade {
        commandant: snapshot.commandant.as_ref().map(membre),
        mercenaires: snapshot.mercenaires.iter().map(membre).collect(),
        androides: snapshot.androides.iter().map(membre).collect(),
        pieces: snapshot
            .pieces
            .iter()
            .map(|p| PieceEscouade {
                nom: p.nom.clone(),
                niveau: p.niveau,
                puissance: p.puissance,
            })
            .collect(),
        classements: snapshot
            .entrees
            .iter()
            .map(|e| EntreeClassement {
                r#type: e.r#type.as_str().to_string(),
                valeur: e.valeur,
            })
            .collect(),
    };
    // The composition blob is opaque JSON on the wire; only the record
    // fields around it are structured XML.
    let blob = serde_json::to_string(&donnees).unwrap_or_default();

    Element::new(pml::HISTORIQUE_ESCOUADE)
        .with_child(Element::leaf("Id", snapshot.id))
        .with_child(Element::leaf("Date", &snapshot.date))
        .with_child(Element::leaf("Score", snapshot.score))
        .with_child(Element::leaf("Ligue", snapshot.ligue))
        .with_child(Element::leaf("PuissanceTotale", snapshot.puissance_totale))
        .with_child(Element::leaf("DonneesEscouadeJson", blob))
}

fn lucie_house_element(pieces: &[Piece]) -> Element {
    let mut section = Element::new(pml::LUCIE_HOUSE);
    for piece in pieces {
        let mut tactiques = Element::new("BonusTactiques");
        for bonus in &piece.tactique.bonus {
            tactiques = tactiques.with_child(Element::leaf("Bonus", bonus));
        }
        let mut strategiques = Element::new("BonusStrategiques");
        for bonus in &piece.strategique.bonus {
            strategiques = strategiques.with_child(Element::leaf("Bonus", bonus));
        }
        section = section.with_child(
            Element::new(pml::PIECE)
                .with_child(Element::leaf("Nom", &piece.nom))
                .with_child(Element::leaf("Niveau", piece.niveau))
                .with_child(Element::leaf("Selectionnee", bool_text(piece.selectionnee)))
                .with_child(Element::leaf("PuissanceTactique", piece.tactique.puissance))
                .with_child(tactiques)
                .with_child(Element::leaf(
                    "PuissanceStrategique",
                    piece.strategique.puissance,
                ))
                .with_child(strategiques),
        );
    }
    section
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Archetype, Aspect, HistoSlot, Rarity};

    #[test]
    fn character_element_round_trips_through_the_importer_shape() {
        let mut p = Personnage::new("REGINA");
        p.rarete = Rarity::Ssr;
        p.archetype = Archetype::Commandant;
        p.puissance = 3321;
        p.selectionne = true;
        let element = personnage_element(&p);
        assert_eq!(element.child_text("Nom"), Some("REGINA"));
        assert_eq!(element.child_text("Rarete"), Some("SSR"));
        assert_eq!(element.child_text("Type"), Some("Commandant"));
        assert_eq!(element.child_text("Puissance"), Some("3321"));
        assert_eq!(element.child_text("Selectionne"), Some("Oui"));
    }

    #[test]
    fn historique_blob_is_valid_json() {
        let snapshot = HistoriqueClassement {
            date: "2026-01-15".into(),
            score: 4200,
            commandant: Some(HistoPersonnage {
                id: 0,
                origine_id: Some(7),
                slot: HistoSlot::Commandant,
                nom: "REGINA".into(),
                rarete: Rarity::Ssr,
                archetype: Archetype::Commandant,
                niveau: 42,
                rang: 5,
                puissance: 3321,
            }),
            ..HistoriqueClassement::default()
        };
        let element = historique_element(&snapshot);
        let blob = element.child_text("DonneesEscouadeJson").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(blob).unwrap();
        assert_eq!(parsed["commandant"]["nom"], "REGINA");
        assert_eq!(parsed["commandant"]["puissance"], 3321);
    }

    #[test]
    fn house_element_carries_both_aspects() {
        let piece = Piece {
            id: 0,
            nom: "Salon".into(),
            niveau: 4,
            selectionnee: true,
            tactique: Aspect {
                puissance: 120,
                bonus: vec!["+5% PA".into()],
            },
            strategique: Aspect {
                puissance: 80,
                bonus: Vec::new(),
            },
        };
        let section = lucie_house_element(std::slice::from_ref(&piece));
        let element = section.find(pml::PIECE).unwrap();
        assert_eq!(element.child_text("PuissanceTactique"), Some("120"));
        assert_eq!(
            element.find("BonusTactiques").unwrap().children.len(),
            1
        );
        assert_eq!(element.child_text("PuissanceStrategique"), Some("80"));
    }
}
