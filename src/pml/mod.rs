//! PML is the project's XML vocabulary for roster import/export. Documents
//! are small (hundreds of records), so the reader materializes the whole
//! tree instead of streaming.

use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

pub const FORMAT_VERSION: &str = "1.0";

// Section element names shared by the import and export paths.
pub const ROOT: &str = "pml";
pub const INVENTAIRE: &str = "inventaire";
pub const TEMPLATES: &str = "templates";
pub const TEMPLATE: &str = "template";
pub const MEILLEUR_ESCOUADE: &str = "meilleurEscouade";
pub const HISTORIQUE_ESCOUADE: &str = "HistoriqueEscouade";
pub const LUCIE_HOUSE: &str = "LucieHouse";
pub const PIECE: &str = "Piece";
pub const PERSONNAGE: &str = "Personnage";

#[derive(Debug, Error)]
pub enum PmlError {
    #[error("xml parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("invalid attribute: {0}")]
    Attr(#[from] AttrError),
    #[error("document has no root element")]
    NoRoot,
    #[error("write error: {0}")]
    Io(#[from] std::io::Error),
}

/// One materialized XML element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            ..Element::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Convenience for `<Name>text</Name>` leaves.
    pub fn leaf(name: impl Into<String>, text: impl ToString) -> Self {
        Element::new(name).with_text(text.to_string())
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn find(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn find_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first child with the given name, if any.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.find(name).map(|c| c.text.trim())
    }
}

/// Parse a whole document into its root element.
pub fn parse(bytes: &[u8]) -> Result<Element, PmlError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => {
                stack.push(element_from_start(&start)?);
            }
            Event::Empty(start) => {
                let element = element_from_start(&start)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(_) => {
                let element = stack.pop().ok_or(PmlError::NoRoot)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => return Ok(element),
                }
            }
            Event::Eof => return Err(PmlError::NoRoot),
            _ => {}
        }
        buf.clear();
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, PmlError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

/// Serialize a tree as an indented UTF-8 document (no BOM) with an XML
/// declaration.
pub fn write(root: &Element) -> Result<Vec<u8>, PmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_element(&mut writer, root)?;
    Ok(writer.into_inner())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), PmlError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if !element.text.is_empty() {
        writer.write_event(Event::Text(BytesText::new(&element.text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_document_with_attributes() {
        let doc = br#"<?xml version="1.0"?>
<pml version="1.0" exportDate="2026-01-10T00:00:00Z">
  <inventaire>
    <Personnage>
      <Nom>REGINA</Nom>
      <Puissance>3320</Puissance>
    </Personnage>
  </inventaire>
</pml>"#;
        let root = parse(doc).unwrap();
        assert_eq!(root.name, "pml");
        assert_eq!(root.attr("version"), Some("1.0"));
        let inv = root.find(INVENTAIRE).unwrap();
        let perso = inv.find(PERSONNAGE).unwrap();
        assert_eq!(perso.child_text("Nom"), Some("REGINA"));
        assert_eq!(perso.child_text("Puissance"), Some("3320"));
        assert_eq!(perso.child_text("Niveau"), None);
    }

    #[test]
    fn rejects_empty_and_garbage_input() {
        assert!(matches!(parse(b""), Err(PmlError::NoRoot)));
        assert!(parse(b"pas du xml du tout").is_err());
    }

    #[test]
    fn writes_declaration_and_no_bom() {
        let root = Element::new(ROOT)
            .with_attr("version", FORMAT_VERSION)
            .with_child(Element::leaf("Nom", "A&B"));
        let bytes = write(&root).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(text.contains("A&amp;B"));
    }

    #[test]
    fn round_trips_tree() {
        let root = Element::new(ROOT).with_child(
            Element::new(INVENTAIRE).with_child(
                Element::new(PERSONNAGE)
                    .with_child(Element::leaf("Nom", "Héra"))
                    .with_child(Element::leaf("Niveau", 14)),
            ),
        );
        let bytes = write(&root).unwrap();
        let reparsed = parse(&bytes).unwrap();
        assert_eq!(
            reparsed
                .find(INVENTAIRE)
                .and_then(|i| i.find(PERSONNAGE))
                .and_then(|p| p.child_text("Nom")),
            Some("Héra")
        );
    }
}
