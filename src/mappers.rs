//! Closed string→value mapping tables shared by the CSV and PML import
//! paths.
//!
//! Two policies exist on purpose and must stay distinct: the lenient one
//! (live CSV/PML data) falls back to a documented default on an unknown
//! token, the strict one (historical snapshot import) turns the same
//! condition into a per-record error. Live data is correctable after the
//! fact; historical snapshots have to preserve the numbers they were taken
//! with.

use crate::model::{
    Archetype, AttackStyle, ClassementType, Faction, Rarity, Role, NIVEAU_MAX, NIVEAU_MIN,
    RANG_MAX, RANG_MIN,
};

// The `inconnu(e)` tokens keep the tables closed over the exported
// vocabulary: a record written with the unknown variant reads back as the
// unknown variant, not as the lenient default.
const RARETES: &[(&str, Rarity)] = &[
    ("r", Rarity::R),
    ("sr", Rarity::Sr),
    ("ssr", Rarity::Ssr),
    ("inconnue", Rarity::Inconnue),
];

const ARCHETYPES: &[(&str, Archetype)] = &[
    ("mercenaire", Archetype::Mercenaire),
    ("commandant", Archetype::Commandant),
    ("androide", Archetype::Androide),
    ("androïde", Archetype::Androide),
    ("inconnu", Archetype::Inconnu),
];

const TYPES_ATTAQUE: &[(&str, AttackStyle)] = &[
    ("melee", AttackStyle::Melee),
    ("mêlée", AttackStyle::Melee),
    ("mêlee", AttackStyle::Melee),
    ("melée", AttackStyle::Melee),
    ("distance", AttackStyle::Distance),
    ("androide", AttackStyle::Androide),
    ("androïde", AttackStyle::Androide),
];

const ROLES: &[(&str, Role)] = &[
    ("attaquant", Role::Attaquant),
    ("defenseur", Role::Defenseur),
    ("défenseur", Role::Defenseur),
    ("soutien", Role::Soutien),
    ("sentinelle", Role::Sentinelle),
];

const FACTIONS: &[(&str, Faction)] = &[
    ("syndicat", Faction::Syndicat),
    ("consortium", Faction::Consortium),
    ("academie", Faction::Academie),
    ("académie", Faction::Academie),
    ("pelerins", Faction::Pelerins),
    ("pèlerins", Faction::Pelerins),
];

const CLASSEMENTS: &[(&str, ClassementType)] = &[
    ("nutaku", ClassementType::Nutaku),
    ("top150", ClassementType::Top150),
    ("france", ClassementType::France),
];

fn lookup<T: Copy>(table: &[(&str, T)], token: &str) -> Option<T> {
    let token = token.trim().to_lowercase();
    table
        .iter()
        .find(|(key, _)| *key == token)
        .map(|(_, value)| *value)
}

// Lenient policy: unknown tokens collapse onto a fixed per-field default.

pub fn rarete(token: &str) -> Rarity {
    lookup(RARETES, token).unwrap_or(Rarity::R)
}

pub fn archetype(token: &str) -> Archetype {
    lookup(ARCHETYPES, token).unwrap_or(Archetype::Mercenaire)
}

pub fn type_attaque(token: &str) -> AttackStyle {
    lookup(TYPES_ATTAQUE, token).unwrap_or(AttackStyle::Inconnu)
}

pub fn role(token: &str) -> Role {
    lookup(ROLES, token).unwrap_or(Role::Inconnu)
}

pub fn faction(token: &str) -> Faction {
    lookup(FACTIONS, token).unwrap_or(Faction::Inconnue)
}

pub fn entier(token: &str, default: i64) -> i64 {
    token.trim().parse().unwrap_or(default)
}

pub fn booleen(token: &str) -> bool {
    matches!(
        token.trim().to_lowercase().as_str(),
        "oui" | "yes" | "true" | "1"
    )
}

// Strict policy: historical snapshot import. Unknown tokens and
// out-of-range values are per-record errors.

pub mod strict {
    use super::*;

    pub fn rarete(token: &str) -> Result<Rarity, String> {
        lookup(RARETES, token).ok_or_else(|| format!("rareté inconnue: {token:?}"))
    }

    pub fn archetype(token: &str) -> Result<Archetype, String> {
        lookup(ARCHETYPES, token).ok_or_else(|| format!("archétype inconnu: {token:?}"))
    }

    pub fn classement(token: &str) -> Result<ClassementType, String> {
        lookup(CLASSEMENTS, token).ok_or_else(|| format!("type de classement inconnu: {token:?}"))
    }

    pub fn entier(field: &str, token: &str) -> Result<i64, String> {
        token
            .trim()
            .parse()
            .map_err(|_| format!("{field} invalide: {token:?}"))
    }

    pub fn niveau(value: i64) -> Result<i64, String> {
        if (NIVEAU_MIN..=NIVEAU_MAX).contains(&value) {
            Ok(value)
        } else {
            Err(format!("niveau hors bornes ({NIVEAU_MIN}-{NIVEAU_MAX}): {value}"))
        }
    }

    pub fn rang(value: i64) -> Result<i64, String> {
        if (RANG_MIN..=RANG_MAX).contains(&value) {
            Ok(value)
        } else {
            Err(format!("rang hors bornes ({RANG_MIN}-{RANG_MAX}): {value}"))
        }
    }

    pub fn puissance(value: i64) -> Result<i64, String> {
        if value >= 0 {
            Ok(value)
        } else {
            Err(format!("puissance négative: {value}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lenient_known_tokens() {
        assert_eq!(rarete("SSR"), Rarity::Ssr);
        assert_eq!(rarete(" sr "), Rarity::Sr);
        assert_eq!(archetype("Commandant"), Archetype::Commandant);
        assert_eq!(archetype("Androïde"), Archetype::Androide);
        assert_eq!(type_attaque("Mêlée"), AttackStyle::Melee);
        assert_eq!(role("Sentinelle"), Role::Sentinelle);
        assert_eq!(faction("Syndicat"), Faction::Syndicat);
    }

    #[test]
    fn lenient_unknown_tokens_fall_back() {
        assert_eq!(rarete("legendaire"), Rarity::R);
        assert_eq!(archetype(""), Archetype::Mercenaire);
        assert_eq!(type_attaque("magie"), AttackStyle::Inconnu);
        assert_eq!(role("berserker"), Role::Inconnu);
        assert_eq!(faction("rebelles"), Faction::Inconnue);
        assert_eq!(entier("abc", 1), 1);
    }

    #[test]
    fn exported_tokens_all_read_back_to_their_variant() {
        for variant in [Rarity::R, Rarity::Sr, Rarity::Ssr, Rarity::Inconnue] {
            assert_eq!(rarete(variant.as_str()), variant);
        }
        for variant in [
            Archetype::Mercenaire,
            Archetype::Commandant,
            Archetype::Androide,
            Archetype::Inconnu,
        ] {
            assert_eq!(archetype(variant.as_str()), variant);
        }
    }

    #[test]
    fn booleen_accepts_french_and_english_affirmatives() {
        for token in ["Oui", "yes", "TRUE", "1"] {
            assert!(booleen(token), "{token}");
        }
        for token in ["Non", "no", "", "2"] {
            assert!(!booleen(token), "{token}");
        }
    }

    #[test]
    fn strict_rejects_what_lenient_defaults() {
        assert!(strict::rarete("legendaire").is_err());
        assert!(strict::archetype("paladin").is_err());
        assert!(strict::entier("niveau", "abc").is_err());
    }

    #[test]
    fn strict_ranges() {
        assert_eq!(strict::niveau(1), Ok(1));
        assert_eq!(strict::niveau(200), Ok(200));
        assert!(strict::niveau(0).is_err());
        assert!(strict::niveau(201).is_err());
        assert_eq!(strict::rang(0), Ok(0));
        assert_eq!(strict::rang(7), Ok(7));
        assert!(strict::rang(8).is_err());
        assert!(strict::puissance(-1).is_err());
    }
}
