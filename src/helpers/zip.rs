//! Workbook parts inside the zip package.
//!
//! Part names are compared the way OPC packages name them: case-insensitive,
//! `/` separated, with or without the leading `/` a relationship target may carry.

use crate::helpers::xml::XmlReader;
use crate::spreadsheet::SpreadsheetError;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::ZipArchive;

pub(crate) type PartReader<'a, RS> = XmlReader<BufReader<ZipFile<'a, RS>>>;

pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Archive entry holding `part`, if the package has one.
    fn find_part(&self, part: &str) -> Option<String>;

    /// XML reader over an optional part, such as `xl/sharedStrings.xml`.
    fn xml_part(&mut self, part: &str) -> Result<Option<PartReader<'_, RS>>, SpreadsheetError>;

    /// XML reader over a part the workbook cannot be read without.
    fn required_xml_part(&mut self, part: &str) -> Result<PartReader<'_, RS>, SpreadsheetError> {
        self.xml_part(part)?
            .ok_or_else(|| SpreadsheetError::FileError(part.to_owned()))
    }
}

fn normalize(part: &str) -> String {
    part.trim_start_matches(['/', '\\']).replace('\\', "/")
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn find_part(&self, part: &str) -> Option<String> {
        let part = normalize(part);
        self.file_names()
            .find(|entry| normalize(entry).eq_ignore_ascii_case(&part))
            .map(str::to_owned)
    }

    fn xml_part(&mut self, part: &str) -> Result<Option<PartReader<'_, RS>>, SpreadsheetError> {
        let Some(entry) = self.find_part(part) else {
            log::trace!("Package has no part '{part}'");
            return Ok(None);
        };
        log::trace!("Read part '{part}' from entry '{entry}'");
        let file = self.by_name(&entry)?;
        Ok(Some(XmlReader::new(BufReader::new(file))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn package(entries: &[&str]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in entries {
            writer.start_file(*entry, SimpleFileOptions::default()).unwrap();
            writer.write_all(b"<part/>").unwrap();
        }
        ZipArchive::new(writer.finish().unwrap()).unwrap()
    }

    #[test]
    fn part_names_ignore_case_and_leading_slash() {
        let zip = package(&["xl/Workbook.xml", "xl/worksheets/sheet1.xml"]);

        assert_eq!(zip.find_part("xl/workbook.xml").as_deref(), Some("xl/Workbook.xml"));
        assert_eq!(zip.find_part("/XL/WORKBOOK.XML").as_deref(), Some("xl/Workbook.xml"));
        assert_eq!(zip.find_part("xl\\worksheets\\sheet1.xml").as_deref(), Some("xl/worksheets/sheet1.xml"));
        assert_eq!(zip.find_part("xl/styles.xml"), None);
    }

    #[test]
    fn optional_and_required_parts() {
        let mut zip = package(&["xl/workbook.xml"]);

        assert!(zip.xml_part("xl/workbook.xml").unwrap().is_some());
        assert!(zip.xml_part("xl/sharedStrings.xml").unwrap().is_none());
        assert!(matches!(
            zip.required_xml_part("xl/_rels/workbook.xml.rels"),
            Err(SpreadsheetError::FileError(part)) if part == "xl/_rels/workbook.xml.rels"
        ));
    }
}
