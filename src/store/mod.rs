//! sqlx persistence for the roster database. Enum columns are stored as
//! their display tokens and decoded back with unknown-variant fallbacks so
//! a hand-edited database never makes a read fail.

pub mod characters;
pub mod history;
pub mod house;
pub mod settings;
pub mod templates;

use crate::model::{Archetype, AttackStyle, Faction, Rarity, Role};

pub(crate) fn rarete_from_db(token: &str) -> Rarity {
    match token {
        "R" => Rarity::R,
        "SR" => Rarity::Sr,
        "SSR" => Rarity::Ssr,
        _ => Rarity::Inconnue,
    }
}

pub(crate) fn archetype_from_db(token: &str) -> Archetype {
    match token {
        "Mercenaire" => Archetype::Mercenaire,
        "Commandant" => Archetype::Commandant,
        "Androide" => Archetype::Androide,
        _ => Archetype::Inconnu,
    }
}

pub(crate) fn type_attaque_from_db(token: &str) -> AttackStyle {
    match token {
        "Mêlée" => AttackStyle::Melee,
        "Distance" => AttackStyle::Distance,
        "Androïde" => AttackStyle::Androide,
        _ => AttackStyle::Inconnu,
    }
}

pub(crate) fn role_from_db(token: &str) -> Role {
    match token {
        "Attaquant" => Role::Attaquant,
        "Défenseur" => Role::Defenseur,
        "Soutien" => Role::Soutien,
        "Sentinelle" => Role::Sentinelle,
        _ => Role::Inconnu,
    }
}

pub(crate) fn faction_from_db(token: &str) -> Faction {
    match token {
        "Syndicat" => Faction::Syndicat,
        "Consortium" => Faction::Consortium,
        "Académie" => Faction::Academie,
        "Pèlerins" => Faction::Pelerins,
        _ => Faction::Inconnue,
    }
}
