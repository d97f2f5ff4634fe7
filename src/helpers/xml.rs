//! SpreadsheetML event reading on top of quick-xml
//!
//! Workbook parts come from many writers: Excel uses a default namespace
//! (`<row>`), the OpenXML SDK a prefixed one (`<x:row>`). Every lookup here
//! goes by local name so both read the same.

use crate::spreadsheet::SpreadsheetError;
use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesRef;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::borrow::Cow;
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;

const TAG_TEXT: &[u8] = b"t";
const TAG_PHONETIC_RUN: &[u8] = b"rPh";

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Parse entity '{0}' failed")]
    ParseEntityError(String),

    #[error("Parse attribute value '{0}' failed")]
    ParseAttributeValueError(String),
}

/// Runs the arms over every remaining event of an `XmlReader`; unmatched events are skipped.
#[macro_export]
macro_rules! for_xml_events {
    ($reader:expr => { $($arms:tt)* }) => {
        while let Some(event) = $reader.next()? {
            match event {
                $($arms)*
                _ => (),
            }
        }
    };
}

pub(crate) struct XmlReader<R: BufRead> {
    reader: Reader<R>,
    buffer: Vec<u8>,
}

impl<R: BufRead> XmlReader<R> {
    pub(crate) fn new(buf_reader: R) -> XmlReader<R> {
        let mut reader = Reader::from_reader(buf_reader);
        let config = reader.config_mut();
        config.check_comments = false;
        config.check_end_names = false;
        // `<c r="A1"/>` still opens and closes a cell
        config.expand_empty_elements = true;
        config.trim_text(false);

        XmlReader {
            reader,
            buffer: Vec::with_capacity(1024),
        }
    }

    /// Next event, `None` once the document is exhausted.
    pub(crate) fn next(&'_ mut self) -> Result<Option<Event<'_>>, SpreadsheetError> {
        self.buffer.clear();
        match self.reader.read_event_into(&mut self.buffer)? {
            Event::Eof => Ok(None),
            event => Ok(Some(event)),
        }
    }

    /// Collects the text of the element just opened, consuming events up to `end_tag`.
    ///
    /// With `runs` set only text inside `<t>` runs counts, as in `<si>` and `<is>`,
    /// and phonetic `<rPh>` runs are dropped. Otherwise all text counts, as in `<v>`.
    pub(crate) fn read_text(&mut self, end_tag: &[u8], runs: bool) -> Result<String, SpreadsheetError> {
        let mut in_phonetic_run = false;
        let mut in_text = !runs;
        let mut text = String::new();
        for_xml_events!(self => {
            Event::End(event) if event.is(end_tag) => break,
            Event::Start(event) if event.is(TAG_PHONETIC_RUN) => in_phonetic_run = true,
            Event::End(event) if event.is(TAG_PHONETIC_RUN) => in_phonetic_run = false,
            Event::Start(event) if runs && !in_phonetic_run && event.is(TAG_TEXT) => in_text = true,
            Event::End(event) if runs && event.is(TAG_TEXT) => in_text = false,
            Event::Text(event) if in_text => text.push_str(&event.xml_content()?),
            Event::CData(event) if in_text => text.push_str(&event.xml_content()?),
            Event::GeneralRef(event) if in_text => push_reference(&mut text, &event)?,
        });
        Ok(text)
    }
}

/// Resolves `&amp;`, `&#8364;` or `&#x20AC;` onto the end of `text`.
fn push_reference(text: &mut String, reference: &BytesRef) -> Result<(), SpreadsheetError> {
    let raw = reference.xml_content()?;
    match raw.strip_prefix('#') {
        Some(code) => {
            let code = match code.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16)?,
                None => code.parse::<u32>()?,
            };
            // Invalid code points are dropped
            text.extend(char::from_u32(code));
        }
        None => match resolve_xml_entity(&raw) {
            Some(entity) => text.push_str(entity),
            None => Err(XmlError::ParseEntityError(raw.to_string()))?,
        },
    }
    Ok(())
}

/// Tag name test that ignores the namespace prefix.
pub(crate) trait XmlTagHelper {
    fn is(&self, local_name: &[u8]) -> bool;
}

impl XmlTagHelper for BytesStart<'_> {
    fn is(&self, local_name: &[u8]) -> bool {
        self.local_name().as_ref() == local_name
    }
}

impl XmlTagHelper for BytesEnd<'_> {
    fn is(&self, local_name: &[u8]) -> bool {
        self.local_name().as_ref() == local_name
    }
}

/// Attribute lookup by local name: `r:id` is found as `id`.
pub(crate) trait XmlAttributeHelper {
    fn attribute(&self, local_name: &[u8]) -> Result<Option<Cow<'_, str>>, SpreadsheetError>;

    fn parse_attribute<T: FromStr>(&self, local_name: &[u8]) -> Result<Option<T>, SpreadsheetError>;
}

impl XmlAttributeHelper for BytesStart<'_> {
    fn attribute(&self, local_name: &[u8]) -> Result<Option<Cow<'_, str>>, SpreadsheetError> {
        for attribute in self.attributes() {
            let attribute = attribute?;
            if attribute.key.local_name().as_ref() == local_name {
                return Ok(Some(attribute.unescape_value()?));
            }
        }
        Ok(None)
    }

    fn parse_attribute<T: FromStr>(&self, local_name: &[u8]) -> Result<Option<T>, SpreadsheetError> {
        self.attribute(local_name)?
            .map(|value| {
                value
                    .trim()
                    .parse::<T>()
                    .map_err(|_| SpreadsheetError::from(XmlError::ParseAttributeValueError(value.to_string())))
            })
            .transpose()
    }
}
