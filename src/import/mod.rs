pub mod csv;
pub mod historical;
pub mod pml;
pub mod result;

pub use result::ImportResult;

/// Which PML sections an import or export touches. A section is processed
/// only when its flag is set and the document actually carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionFlags {
    pub inventory: bool,
    pub templates: bool,
    pub best_squad: bool,
    pub histories: bool,
    pub house: bool,
}

impl SectionFlags {
    pub const ALL: SectionFlags = SectionFlags {
        inventory: true,
        templates: true,
        best_squad: true,
        histories: true,
        house: true,
    };

    pub const NONE: SectionFlags = SectionFlags {
        inventory: false,
        templates: false,
        best_squad: false,
        histories: false,
        house: false,
    };

    pub fn any(&self) -> bool {
        self.inventory || self.templates || self.best_squad || self.histories || self.house
    }
}

impl Default for SectionFlags {
    fn default() -> Self {
        SectionFlags::ALL
    }
}
