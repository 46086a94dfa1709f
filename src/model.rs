use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// Rarity tiers, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rarity {
    R,
    Sr,
    Ssr,
    Inconnue,
}

impl Rarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::R => "R",
            Rarity::Sr => "SR",
            Rarity::Ssr => "SSR",
            Rarity::Inconnue => "Inconnue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Archetype {
    Mercenaire,
    Commandant,
    Androide,
    Inconnu,
}

impl Archetype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Mercenaire => "Mercenaire",
            Archetype::Commandant => "Commandant",
            Archetype::Androide => "Androide",
            Archetype::Inconnu => "Inconnu",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackStyle {
    Melee,
    Distance,
    Androide,
    Inconnu,
}

impl AttackStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackStyle::Melee => "Mêlée",
            AttackStyle::Distance => "Distance",
            AttackStyle::Androide => "Androïde",
            AttackStyle::Inconnu => "Inconnu",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Attaquant,
    Defenseur,
    Soutien,
    Sentinelle,
    Inconnu,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Attaquant => "Attaquant",
            Role::Defenseur => "Défenseur",
            Role::Soutien => "Soutien",
            Role::Sentinelle => "Sentinelle",
            Role::Inconnu => "Inconnu",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Faction {
    Syndicat,
    Consortium,
    Academie,
    Pelerins,
    Inconnue,
}

impl Faction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Faction::Syndicat => "Syndicat",
            Faction::Consortium => "Consortium",
            Faction::Academie => "Académie",
            Faction::Pelerins => "Pèlerins",
            Faction::Inconnue => "Inconnue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacite {
    #[serde(default)]
    pub id: i64,
    pub nom: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icone: String,
}

/// A roster character. `nom` is the business key: imports reconcile by
/// case-insensitive name match, never by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personnage {
    #[serde(default)]
    pub id: i64,
    pub nom: String,
    pub rarete: Rarity,
    pub archetype: Archetype,
    pub niveau: i64,
    pub rang: i64,
    pub puissance: i64,
    pub pa: i64,
    pub pv: i64,
    pub role: Role,
    pub faction: Faction,
    pub type_attaque: AttackStyle,
    pub selectionne: bool,
    #[serde(default)]
    pub description: String,
    /// Explicit header-image override; portrait paths are otherwise derived
    /// from the normalized name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_entete: Option<String>,
    #[serde(default)]
    pub capacites: Vec<Capacite>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Personnage {
    pub fn new(nom: impl Into<String>) -> Self {
        Personnage {
            id: 0,
            nom: nom.into(),
            rarete: Rarity::R,
            archetype: Archetype::Mercenaire,
            niveau: 1,
            rang: 1,
            puissance: 0,
            pa: 0,
            pv: 0,
            role: Role::Inconnu,
            faction: Faction::Inconnue,
            type_attaque: AttackStyle::Inconnu,
            selectionne: false,
            description: String::new(),
            image_entete: None,
            capacites: Vec::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Portrait path derived from the name: lowercased, diacritics folded,
    /// spaces collapsed to dashes.
    pub fn image_path(&self) -> String {
        format!("images/personnages/{}.png", normalize_name(&self.nom))
    }

    /// Header image, falling back to the derived portrait path.
    pub fn image_entete_path(&self) -> String {
        self.image_entete
            .clone()
            .unwrap_or_else(|| self.image_path())
    }
}

pub fn normalize_name(nom: &str) -> String {
    nom.trim()
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub id: i64,
    pub nom: String,
    #[serde(default)]
    pub description: String,
    /// Referenced live character ids, persisted as JSON.
    #[serde(default)]
    pub personnage_ids: Vec<i64>,
    #[serde(default)]
    pub puissance_totale: i64,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

pub const TEMPLATE_NOM_MAX: usize = 100;
pub const TEMPLATE_DESCRIPTION_MAX: usize = 500;
pub const TEMPLATE_IDS_JSON_MAX: usize = 2000;

/// Which snapshot slot a historical character copy occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoSlot {
    Commandant,
    Mercenaire,
    Androide,
}

impl HistoSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoSlot::Commandant => "Commandant",
            HistoSlot::Mercenaire => "Mercenaire",
            HistoSlot::Androide => "Androide",
        }
    }

    /// Archetype a live character must carry to be referenced from this slot.
    pub fn expected_archetype(&self) -> Archetype {
        match self {
            HistoSlot::Commandant => Archetype::Commandant,
            HistoSlot::Mercenaire => Archetype::Mercenaire,
            HistoSlot::Androide => Archetype::Androide,
        }
    }
}

/// Point-in-time copy of a character attached to a ranking snapshot.
/// `origine_id` records which live row it was copied from; the copy never
/// tracks that row afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoPersonnage {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub origine_id: Option<i64>,
    pub slot: HistoSlot,
    pub nom: String,
    pub rarete: Rarity,
    pub archetype: Archetype,
    pub niveau: i64,
    pub rang: i64,
    pub puissance: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoPiece {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub origine_id: Option<i64>,
    pub nom: String,
    pub niveau: i64,
    pub puissance: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassementType {
    Nutaku,
    Top150,
    France,
}

impl ClassementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassementType::Nutaku => "Nutaku",
            ClassementType::Top150 => "Top150",
            ClassementType::France => "France",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassementEntree {
    pub r#type: ClassementType,
    pub valeur: i64,
}

/// A ranking snapshot with its owned copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HistoriqueClassement {
    #[serde(default)]
    pub id: i64,
    pub date: String,
    pub score: i64,
    pub ligue: i64,
    pub puissance_commandant: i64,
    pub puissance_mercenaires: i64,
    pub puissance_pieces: i64,
    pub puissance_totale: i64,
    #[serde(default)]
    pub commandant: Option<HistoPersonnage>,
    #[serde(default)]
    pub mercenaires: Vec<HistoPersonnage>,
    #[serde(default)]
    pub androides: Vec<HistoPersonnage>,
    #[serde(default)]
    pub pieces: Vec<HistoPiece>,
    #[serde(default)]
    pub entrees: Vec<ClassementEntree>,
}

pub const MAX_MERCENAIRES: usize = 8;
pub const MAX_ANDROIDES: usize = 3;
pub const NIVEAU_MIN: i64 = 1;
pub const NIVEAU_MAX: i64 = 200;
pub const RANG_MIN: i64 = 0;
pub const RANG_MAX: i64 = 7;

/// One aspect (tactique or stratégique) of a Lucie house room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Aspect {
    pub puissance: i64,
    pub bonus: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    #[serde(default)]
    pub id: i64,
    pub nom: String,
    pub niveau: i64,
    pub selectionnee: bool,
    pub tactique: Aspect,
    pub strategique: Aspect,
}

/// At most this many rooms may be selected at once.
pub const MAX_PIECES_SELECTIONNEES: usize = 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_path_folds_diacritics_and_spaces() {
        let mut p = Personnage::new("Héra Lune");
        assert_eq!(p.image_path(), "images/personnages/hera-lune.png");
        p.image_entete = Some("images/custom.png".into());
        assert_eq!(p.image_entete_path(), "images/custom.png");
    }

    #[test]
    fn new_personnage_defaults_match_schema() {
        let p = Personnage::new("REGINA");
        assert_eq!(p.rarete, Rarity::R);
        assert_eq!(p.archetype, Archetype::Mercenaire);
        assert_eq!(p.niveau, 1);
        assert_eq!(p.rang, 1);
        assert!(!p.selectionne);
    }

    #[test]
    fn slot_archetype_mapping() {
        assert_eq!(
            HistoSlot::Commandant.expected_archetype(),
            Archetype::Commandant
        );
        assert_eq!(
            HistoSlot::Androide.expected_archetype(),
            Archetype::Androide
        );
    }
}
