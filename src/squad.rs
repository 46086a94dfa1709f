//! Best-squad computation. The best squad is computed from the live roster
//! (top power per slot type), not a stored selection.

use crate::model::{Archetype, Personnage, MAX_ANDROIDES, MAX_MERCENAIRES};

#[derive(Debug, Clone, Default)]
pub struct MeilleurEscouade {
    pub commandant: Option<Personnage>,
    pub mercenaires: Vec<Personnage>,
    pub androides: Vec<Personnage>,
}

impl MeilleurEscouade {
    pub fn puissance_totale(&self) -> i64 {
        self.commandant.as_ref().map_or(0, |c| c.puissance)
            + self.mercenaires.iter().map(|p| p.puissance).sum::<i64>()
            + self.androides.iter().map(|p| p.puissance).sum::<i64>()
    }
}

/// Pick the strongest commander, the 8 strongest mercenaries and the 3
/// strongest androids. Ties keep the roster order.
pub fn meilleur_escouade(roster: &[Personnage]) -> MeilleurEscouade {
    let commandant = top_by_power(roster, Archetype::Commandant, 1).pop();
    MeilleurEscouade {
        commandant,
        mercenaires: top_by_power(roster, Archetype::Mercenaire, MAX_MERCENAIRES),
        androides: top_by_power(roster, Archetype::Androide, MAX_ANDROIDES),
    }
}

fn top_by_power(roster: &[Personnage], archetype: Archetype, limit: usize) -> Vec<Personnage> {
    let mut picked: Vec<Personnage> = roster
        .iter()
        .filter(|p| p.archetype == archetype)
        .cloned()
        .collect();
    picked.sort_by(|a, b| b.puissance.cmp(&a.puissance));
    picked.truncate(limit);
    picked
}

/// Characters currently flagged selected, i.e. the active squad.
pub fn escouade_active(roster: &[Personnage]) -> Vec<&Personnage> {
    roster.iter().filter(|p| p.selectionne).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perso(nom: &str, archetype: Archetype, puissance: i64) -> Personnage {
        let mut p = Personnage::new(nom);
        p.archetype = archetype;
        p.puissance = puissance;
        p
    }

    #[test]
    fn slots_are_capped_at_one_eight_three() {
        let mut roster = Vec::new();
        for i in 0..3 {
            roster.push(perso(&format!("C{i}"), Archetype::Commandant, 100 + i));
        }
        for i in 0..10 {
            roster.push(perso(&format!("M{i}"), Archetype::Mercenaire, 200 + i));
        }
        for i in 0..5 {
            roster.push(perso(&format!("A{i}"), Archetype::Androide, 300 + i));
        }

        let best = meilleur_escouade(&roster);
        assert_eq!(best.commandant.as_ref().unwrap().nom, "C2");
        assert_eq!(best.mercenaires.len(), 8);
        assert_eq!(best.androides.len(), 3);
        assert_eq!(best.mercenaires[0].nom, "M9");
        assert_eq!(best.androides[0].nom, "A4");
    }

    #[test]
    fn empty_roster_yields_empty_squad() {
        let best = meilleur_escouade(&[]);
        assert!(best.commandant.is_none());
        assert!(best.mercenaires.is_empty());
        assert_eq!(best.puissance_totale(), 0);
    }

    #[test]
    fn active_squad_is_exactly_the_selected_flags() {
        let mut selected = perso("REGINA", Archetype::Mercenaire, 100);
        selected.selectionne = true;
        let bench = perso("LYA", Archetype::Mercenaire, 900);
        let roster = vec![selected, bench];

        let active = escouade_active(&roster);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].nom, "REGINA");
    }

    #[test]
    fn totale_sums_all_slots() {
        let roster = vec![
            perso("C", Archetype::Commandant, 10),
            perso("M", Archetype::Mercenaire, 20),
            perso("A", Archetype::Androide, 30),
        ];
        assert_eq!(meilleur_escouade(&roster).puissance_totale(), 60);
    }
}
