use crate::for_xml_events;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlTagHelper;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::reference::to_zero_based_row;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::ResultMessage;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::Path;
use zip::ZipArchive;

// SpreadsheetML local names; parts may prefix them (`x:row`)
const TAG_SHEET: &[u8] = b"sheet";
const TAG_RELATIONSHIP: &[u8] = b"Relationship";
const TAG_SHARED_STRING_ITEM: &[u8] = b"si";
const TAG_ROW: &[u8] = b"row";
const TAG_CELL: &[u8] = b"c";
const TAG_INLINE_STRING: &[u8] = b"is";
const TAG_VALUE: &[u8] = b"v";

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELATIONSHIPS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const WORKSHEET_RELATIONSHIP: &str = "/worksheet";

/// An opened `.xlsx` workbook held in memory.
pub struct Workbook {
    /// File name, or `<memory>` for uploaded bytes
    pub name: String,
    zip: ZipArchive<Cursor<Vec<u8>>>,
    /// Worksheets as (name, part) pairs in workbook order
    sheets: Vec<(String, String)>,
}

impl Workbook {
    /// Opens a workbook from the raw bytes of an uploaded file.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Workbook, SpreadsheetError> {
        Self::load("<memory>", bytes)
    }

    /// Opens a workbook from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Workbook, SpreadsheetError> {
        let name = path.as_ref().display().to_string();
        let bytes = std::fs::read(path.as_ref())
            .map_err(SpreadsheetError::from)
            .with_prefix(&format!("Read '{name}'"))?;
        Self::load(&name, bytes)
    }

    fn load(name: &str, bytes: Vec<u8>) -> Result<Workbook, SpreadsheetError> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))?;
        let sheets = load_sheet_list(&mut zip)?;
        log::debug!(
            "Workbook '{name}' declares sheets {:?}",
            sheets.iter().map(|(sheet_name, _)| sheet_name).collect::<Vec<_>>()
        );
        Ok(Workbook {
            name: name.to_owned(),
            zip,
            sheets,
        })
    }

    /// Names of all worksheets in workbook order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Loads the worksheet with exactly this name, `None` if the workbook has no such sheet.
    pub fn worksheet(&mut self, name: &str) -> Result<Option<Sheet>, SpreadsheetError> {
        let part = match self.sheets.iter().find(|(sheet_name, _)| sheet_name == name) {
            Some((_, part)) => part.to_owned(),
            None => return Ok(None),
        };
        let shared_strings = load_shared_strings(&mut self.zip)?;
        let sheet = read_sheet(&mut self.zip, name, &part, &shared_strings)
            .with_prefix(&format!("Read sheet '{name}' of '{}'", self.name))?;
        log::debug!("Sheet '{name}' loaded {} cells from '{part}'", sheet.len());
        Ok(Some(sheet))
    }
}

/// Worksheet list of `xl/workbook.xml`, each sheet resolved to its part
/// through the workbook relationships.
fn load_sheet_list<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<(String, String)>, SpreadsheetError> {
    let relationships = load_worksheet_relationships(zip)?;
    let mut reader = zip.required_xml_part(WORKBOOK_PART)?;
    let mut sheets = Vec::<(String, String)>::new();
    for_xml_events!(reader => {
        Event::Start(event) if event.is(TAG_SHEET) => {
            // `r:id`, whatever the relationships prefix is called
            match (event.attribute(b"name")?, event.attribute(b"id")?) {
                (Some(name), Some(id)) => match relationships.get(&*id) {
                    Some(part) => sheets.push((name.into_owned(), part.to_owned())),
                    None => log::warn!("Sheet '{name}' refers to unknown relationship '{id}'"),
                },
                _ => log::warn!("Skip sheet entry without name or relationship id"),
            }
        }
    });
    Ok(sheets)
}

/// Worksheet relationships of the workbook: relationship id -> part name.
fn load_worksheet_relationships<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
) -> Result<HashMap<String, String>, SpreadsheetError> {
    let mut reader = zip.required_xml_part(WORKBOOK_RELATIONSHIPS_PART)?;
    let mut relationships = HashMap::<String, String>::new();
    for_xml_events!(reader => {
        Event::Start(event) if event.is(TAG_RELATIONSHIP) => {
            let is_worksheet = event
                .attribute(b"Type")?
                .map(|kind| kind.ends_with(WORKSHEET_RELATIONSHIP))
                .unwrap_or(true);
            if is_worksheet {
                if let (Some(id), Some(target)) = (event.attribute(b"Id")?, event.attribute(b"Target")?) {
                    relationships.insert(id.into_owned(), to_part_name(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Resolves a relationship target against the `xl/` folder of the workbook part.
fn to_part_name(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_owned(),
        None if target.starts_with("xl/") => target.to_owned(),
        None => format!("xl/{target}"),
    }
}

/// Whole shared string table; a workbook without one has no shared strings.
fn load_shared_strings<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<String>, SpreadsheetError> {
    let mut shared_strings = Vec::<String>::new();
    let Some(mut reader) = zip.xml_part(SHARED_STRINGS_PART)? else {
        return Ok(shared_strings);
    };
    for_xml_events!(reader => {
        Event::Start(event) if event.is(TAG_SHARED_STRING_ITEM) => {
            shared_strings.push(reader.read_text(TAG_SHARED_STRING_ITEM, true)?);
        }
    });
    Ok(shared_strings)
}

/// Streams a worksheet part into a `Sheet`.
///
/// Cell positions come from the `r` attribute when present, otherwise from
/// the running row/column counters. Cells without a value are skipped, so
/// an empty cell and an absent cell look the same to callers.
fn read_sheet<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    sheet_name: &str,
    part: &str,
    shared_strings: &[String],
) -> Result<Sheet, SpreadsheetError> {
    let mut sheet = Sheet::new(sheet_name);
    let mut next_row = 0usize;
    let mut next_col = 0usize;
    let mut position = (0usize, 0usize);
    let mut kind = CellType::default();
    let mut value = String::new();
    let mut reader = zip.required_xml_part(part)?;
    for_xml_events!(reader => {
        Event::Start(event) if event.is(TAG_ROW) => {
            if let Some(number) = event.parse_attribute::<usize>(b"r")? {
                next_row = to_zero_based_row(number).unwrap_or(next_row);
            }
            next_col = 0;
        }
        Event::End(event) if event.is(TAG_ROW) => {
            next_row += 1;
            next_col = 0;
        }
        Event::Start(event) if event.is(TAG_CELL) => {
            position = event
                .attribute(b"r")?
                .and_then(|reference| reference_to_index(&reference))
                .unwrap_or((next_row, next_col));
            next_col = position.1 + 1;
            kind = CellType::from_attribute(event.attribute(b"t")?.as_deref());
            value.clear();
        }
        Event::Start(event) if event.is(TAG_INLINE_STRING) => {
            value = reader.read_text(TAG_INLINE_STRING, true)?;
        }
        Event::Start(event) if event.is(TAG_VALUE) => {
            value = reader.read_text(TAG_VALUE, false)?;
        }
        Event::End(event) if event.is(TAG_CELL) => {
            if !value.is_empty() {
                let value = match kind {
                    CellType::SharedString => {
                        let index = value.trim().parse::<usize>()?;
                        shared_strings
                            .get(index)
                            .cloned()
                            .ok_or(SpreadsheetError::SharedStringIndexError(index))?
                    }
                    _ => std::mem::take(&mut value),
                };
                let (row, col) = position;
                sheet.push(Cell { row, col, kind, value });
            }
            value.clear();
        }
    });
    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="ISTRUZIONI" sheetId="1" r:id="rId1"/>
    <sheet name="CALCOLO" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;

    const RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#;

    const SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="2" uniqueCount="2">
  <si><t>APP INTERNA</t></si>
  <si><r><t>Food &amp; </t></r><r><t>Beverage</t></r><rPh><t>ignored</t></rPh></si>
</sst>"#;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>
    <row r="1"><c r="D1" t="s"><v>0</v></c></row>
    <row r="15"><c r="C15" t="s"><v>1</v></c><c r="D15" s="3"><v>12.5</v></c><c r="E15"><f>D15*2</f><v>25</v></c><c r="F15"/></row>
    <row r="16"><c t="inlineStr"><is><t>text</t></is></c><c t="e"><v>#DIV/0!</v></c><c t="b"><v>1</v></c></row>
  </sheetData>
</worksheet>"#;

    fn workbook_bytes(members: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in members {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn workbook() -> Workbook {
        let bytes = workbook_bytes(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
            ("xl/sharedStrings.xml", SHARED_STRINGS),
            ("xl/worksheets/sheet1.xml", "<worksheet><sheetData/></worksheet>"),
            ("xl/worksheets/sheet2.xml", SHEET),
        ]);
        Workbook::from_bytes(bytes).unwrap()
    }

    #[test]
    fn lists_sheets_in_workbook_order() {
        assert_eq!(workbook().sheet_names(), vec!["ISTRUZIONI", "CALCOLO"]);
    }

    #[test]
    fn reads_cells_by_reference() {
        let sheet = workbook().worksheet("CALCOLO").unwrap().unwrap();

        assert_eq!(sheet.name, "CALCOLO");
        assert_eq!(sheet.get(0, 3).map(|cell| cell.value.as_str()), Some("APP INTERNA"));
        assert_eq!(sheet.get(14, 2).map(|cell| cell.value.as_str()), Some("Food & Beverage"));
        assert_eq!(sheet.number(14, 3), Some(12.5));
        assert_eq!(sheet.number(14, 4), Some(25.0));
        assert_eq!(sheet.get(14, 5), None);
    }

    const PREFIXED_WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<x:workbook xmlns:x="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:rel="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <x:sheets><x:sheet name="CALCOLO" sheetId="1" rel:id="rId2"/></x:sheets>
</x:workbook>"#;

    const PREFIXED_SHARED_STRINGS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<x:sst xmlns:x="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <x:si><x:t>APP INTERNA</x:t></x:si>
  <x:si><x:r><x:t>Food &amp; </x:t></x:r><x:r><x:t>Beverage</x:t></x:r><x:rPh><x:t>ignored</x:t></x:rPh></x:si>
</x:sst>"#;

    const PREFIXED_SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<x:worksheet xmlns:x="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <x:sheetData>
    <x:row r="1"><x:c r="D1" t="s"><x:v>0</x:v></x:c></x:row>
    <x:row r="15"><x:c r="C15" t="s"><x:v>1</x:v></x:c><x:c r="D15"><x:v>12.5</x:v></x:c><x:c r="E15"><x:f>D15*2</x:f><x:v>25</x:v></x:c></x:row>
    <x:row r="16"><x:c t="inlineStr"><x:is><x:t>text</x:t></x:is></x:c></x:row>
  </x:sheetData>
</x:worksheet>"#;

    #[test]
    fn reads_prefixed_spreadsheetml() {
        let bytes = workbook_bytes(&[
            ("xl/workbook.xml", PREFIXED_WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
            ("xl/sharedStrings.xml", PREFIXED_SHARED_STRINGS),
            ("xl/worksheets/sheet2.xml", PREFIXED_SHEET),
        ]);
        let mut workbook = Workbook::from_bytes(bytes).unwrap();

        assert_eq!(workbook.sheet_names(), vec!["CALCOLO"]);
        let sheet = workbook.worksheet("CALCOLO").unwrap().unwrap();
        assert_eq!(sheet.get(0, 3).map(|cell| cell.value.as_str()), Some("APP INTERNA"));
        assert_eq!(sheet.get(14, 2).map(|cell| cell.value.as_str()), Some("Food & Beverage"));
        assert_eq!(sheet.number(14, 3), Some(12.5));
        assert_eq!(sheet.number(14, 4), Some(25.0));
        assert_eq!(sheet.get(15, 0).map(|cell| cell.value.as_str()), Some("text"));
    }

    #[test]
    fn cells_without_reference_follow_counters() {
        let sheet = workbook().worksheet("CALCOLO").unwrap().unwrap();

        assert_eq!(sheet.get(15, 0).map(|cell| (cell.kind, cell.value.as_str())), Some((CellType::InlineString, "text")));
        assert_eq!(sheet.get(15, 1).map(|cell| cell.kind), Some(CellType::Error));
        assert_eq!(sheet.get(15, 2).map(|cell| cell.kind), Some(CellType::Boolean));
        assert_eq!(sheet.number(15, 1), None);
    }

    #[test]
    fn sheet_names_match_exactly() {
        let mut workbook = workbook();
        assert!(workbook.worksheet("calcolo").unwrap().is_none());
        assert!(workbook.worksheet("CALCOLO ").unwrap().is_none());
        assert!(workbook.worksheet("ISTRUZIONI").unwrap().unwrap().is_empty());
    }

    #[test]
    fn not_a_zip_archive() {
        let result = Workbook::from_bytes(b"Canale;Ricavo totale\n".to_vec());
        assert!(matches!(result, Err(SpreadsheetError::ZipError(_))));
    }

    #[test]
    fn open_missing_file() {
        let error = Workbook::open("no/such/margini.xlsx").err().unwrap();
        assert!(error.to_string().starts_with("Read 'no/such/margini.xlsx': "));
    }

    #[test]
    fn missing_workbook_part() {
        let bytes = workbook_bytes(&[("xl/_rels/workbook.xml.rels", RELATIONSHIPS)]);
        let result = Workbook::from_bytes(bytes);
        assert!(matches!(result, Err(SpreadsheetError::FileError(path)) if path == "xl/workbook.xml"));
    }

    #[test]
    fn undefined_shared_string() {
        let bytes = workbook_bytes(&[
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", RELATIONSHIPS),
            ("xl/worksheets/sheet2.xml", SHEET),
        ]);
        let error = Workbook::from_bytes(bytes).unwrap().worksheet("CALCOLO").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Read sheet 'CALCOLO' of '<memory>': Shared string #0 is not defined"
        );
    }

    #[test]
    fn relationship_targets() {
        assert_eq!(to_part_name("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_part_name("/xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_part_name("xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
    }
}
