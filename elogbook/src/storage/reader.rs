//! Logbook file reader
//!
//! Reading is best-effort. Malformed elements and attributes are recorded as
//! [`XmlError`]s and skipped; a fatal XML syntax error stops the parse of the
//! file but keeps everything read up to that point.

use super::compression::decompress;
use super::document::{EntryRecord, NodeDocument, XmlError};
use super::names;
use crate::error::Result;
use crate::model::{from_unix, Attachment, Backup, Entry, Keyword, TimeStamp};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Read and parse one logbook file
///
/// Only failing to read the file itself is an error; parse problems are
/// returned alongside the (possibly partial) document.
pub fn read_document(path: &Path) -> Result<(NodeDocument, Vec<XmlError>)> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_document(&content, path))
}

/// Parse the content of a logbook file; `file` is only used in error records
pub fn parse_document(content: &str, file: &Path) -> (NodeDocument, Vec<XmlError>) {
    let mut reader = Reader::from_str(content);
    let mut parser = Parser::new(file);

    loop {
        let position = reader.buffer_position() as u64;
        match reader.read_event() {
            Ok(Event::Start(element)) => parser.start(&element, position),
            Ok(Event::Empty(element)) => {
                parser.start(&element, position);
                parser.end(element.name().as_ref(), position);
            }
            Ok(Event::End(element)) => parser.end(element.name().as_ref(), position),
            Ok(Event::Text(text)) => {
                if parser.collects_text() {
                    match text.unescape() {
                        Ok(value) => parser.buffer.push_str(&value),
                        Err(e) => {
                            parser.error(format!("Invalid text content: {}", e), position);
                            break;
                        }
                    }
                }
            }
            Ok(Event::CData(data)) => {
                if parser.collects_text() {
                    parser.buffer.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                parser.error(format!("XML syntax error: {}", e), position);
                break;
            }
        }
    }

    parser.finish()
}

/// Where collected character data goes when its element closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextTarget {
    LogbookComments,
    EntryText { compressed: bool },
    AttachmentComments,
}

struct Parser<'f> {
    file: &'f Path,
    document: NodeDocument,
    errors: Vec<XmlError>,
    seen_root: bool,
    in_recent_entries: bool,
    entry: Option<EntryRecord>,
    /// Set when the current entry must be dropped
    entry_broken: bool,
    attachment: Option<Attachment>,
    text: Option<TextTarget>,
    buffer: String,
}

impl<'f> Parser<'f> {
    fn new(file: &'f Path) -> Self {
        Self {
            file,
            document: NodeDocument::default(),
            errors: Vec::new(),
            seen_root: false,
            in_recent_entries: false,
            entry: None,
            entry_broken: false,
            attachment: None,
            text: None,
            buffer: String::new(),
        }
    }

    fn collects_text(&self) -> bool {
        self.text.is_some()
    }

    fn error(&mut self, message: String, position: u64) {
        tracing::warn!("{}: {} (byte {})", self.file.display(), message, position);
        self.errors.push(XmlError::new(self.file, message, Some(position)));
    }

    fn start(&mut self, element: &BytesStart<'_>, position: u64) {
        let attributes = match Attributes::parse(element) {
            Ok(attributes) => attributes,
            Err(message) => {
                self.error(message, position);
                if element.name().as_ref() == names::ENTRY.as_bytes() {
                    self.entry_broken = true;
                }
                Attributes::default()
            }
        };

        let name = element.name();
        let name = String::from_utf8_lossy(name.as_ref());

        match name.as_ref() {
            names::LOGBOOK if !self.seen_root => {
                self.seen_root = true;
                self.read_header(&attributes, position);
            }
            names::COMMENTS if self.attachment.is_some() => {
                self.begin_text(TextTarget::AttachmentComments)
            }
            names::COMMENTS if self.entry.is_none() => self.begin_text(TextTarget::LogbookComments),
            names::CHILD => match attributes.get(names::FILE) {
                Some(file) if !file.is_empty() => self.document.children.push(file.to_string()),
                _ => self.error("Child reference without file name".to_string(), position),
            },
            names::RECENT_ENTRIES => self.in_recent_entries = true,
            names::RECENT if self.in_recent_entries => {
                match attributes.time(names::CREATION) {
                    Ok(Some(creation)) => self.document.recent_entries.push(creation),
                    Ok(None) => self.error("Recent entry without creation".to_string(), position),
                    Err(message) => self.error(message, position),
                }
            }
            names::ENTRY => self.begin_entry(&attributes, position),
            names::TEXT if self.entry.is_some() => {
                let compressed = attributes.get(names::ENCODING) == Some(names::ENCODING_DEFLATE);
                self.begin_text(TextTarget::EntryText { compressed })
            }
            names::ATTACHMENT if self.entry.is_some() => self.begin_attachment(&attributes, position),
            names::BACKUP => match (attributes.get(names::FILE), attributes.time(names::CREATION)) {
                (Some(file), Ok(Some(creation))) => {
                    self.document.backups.push(Backup::new(PathBuf::from(file), creation))
                }
                (_, Err(message)) => self.error(message, position),
                _ => self.error("Backup record without file or creation".to_string(), position),
            },
            other => {
                tracing::debug!("{}: ignoring element <{}>", self.file.display(), other);
            }
        }
    }

    fn end(&mut self, name: &[u8], position: u64) {
        let name = String::from_utf8_lossy(name);

        match name.as_ref() {
            names::COMMENTS | names::TEXT => self.end_text(position),
            names::RECENT_ENTRIES => self.in_recent_entries = false,
            names::ATTACHMENT => {
                if let (Some(attachment), Some(record)) = (self.attachment.take(), self.entry.as_mut()) {
                    record.attachments.push(attachment);
                }
            }
            names::ENTRY => {
                if let Some(record) = self.entry.take() {
                    if self.entry_broken {
                        tracing::warn!(
                            "{}: dropping unreadable entry created at {}",
                            self.file.display(),
                            record.entry.creation()
                        );
                    } else {
                        self.document.entries.push(record);
                    }
                }
                self.entry_broken = false;
            }
            _ => {}
        }
    }

    fn finish(mut self) -> (NodeDocument, Vec<XmlError>) {
        if !self.seen_root {
            self.errors.push(XmlError::new(
                self.file,
                format!("Missing <{}> element", names::LOGBOOK),
                None,
            ));
        }
        (self.document, self.errors)
    }

    fn begin_text(&mut self, target: TextTarget) {
        self.text = Some(target);
        self.buffer.clear();
    }

    fn end_text(&mut self, position: u64) {
        let Some(target) = self.text.take() else {
            return;
        };
        let value = std::mem::take(&mut self.buffer);

        match target {
            TextTarget::LogbookComments => self.document.header.comments = value,
            TextTarget::AttachmentComments => {
                if let Some(attachment) = self.attachment.as_mut() {
                    attachment.comments = value;
                }
            }
            TextTarget::EntryText { compressed: false } => {
                if let Some(record) = self.entry.as_mut() {
                    record.entry.text = value;
                }
            }
            TextTarget::EntryText { compressed: true } => match decompress(&value) {
                Ok(text) => {
                    if let Some(record) = self.entry.as_mut() {
                        record.entry.text = text;
                    }
                }
                Err(message) => {
                    self.error(message, position);
                    self.entry_broken = true;
                }
            },
        }
    }

    fn read_header(&mut self, attributes: &Attributes, position: u64) {
        let header = &mut self.document.header;
        header.title = attributes.get(names::TITLE).unwrap_or_default().to_string();
        header.author = attributes.get(names::AUTHOR).unwrap_or_default().to_string();
        header.directory = attributes.get(names::DIRECTORY).map(PathBuf::from);
        header.parent_file = attributes.get(names::PARENT_FILE).map(PathBuf::from);
        header.use_compression = attributes.flag(names::COMPRESSION);
        header.is_backup = attributes.flag(names::IS_BACKUP);

        let mut problems = Vec::new();

        match attributes.time(names::CREATION) {
            Ok(Some(time)) => header.creation = time,
            Ok(None) => {}
            Err(message) => problems.push(message),
        }
        match attributes.time(names::MODIFICATION) {
            Ok(Some(time)) => header.modification = time,
            Ok(None) => header.modification = header.creation,
            Err(message) => problems.push(message),
        }
        match attributes.time(names::BACKUP_TIME) {
            Ok(time) => header.backup = time,
            Err(message) => problems.push(message),
        }
        match attributes.time(names::SAVED) {
            Ok(time) => header.saved = time,
            Err(message) => problems.push(message),
        }
        match attributes.parsed(names::SORT_METHOD) {
            Ok(Some(method)) => header.sort_method = method,
            Ok(None) => {}
            Err(message) => problems.push(message),
        }
        match attributes.parsed(names::SORT_ORDER) {
            Ok(Some(order)) => header.sort_order = order,
            Ok(None) => {}
            Err(message) => problems.push(message),
        }
        match attributes.parsed::<usize>(names::ENTRIES) {
            Ok(count) => header.entry_count = count.unwrap_or_default(),
            Err(message) => problems.push(message),
        }
        match attributes.parsed::<usize>(names::CHILDREN) {
            Ok(count) => header.child_count = count.unwrap_or_default(),
            Err(message) => problems.push(message),
        }

        for message in problems {
            self.error(message, position);
        }
    }

    fn begin_entry(&mut self, attributes: &Attributes, position: u64) {
        if self.entry.is_some() {
            self.error("Nested entry element".to_string(), position);
            return;
        }

        let creation = match attributes.time(names::CREATION) {
            Ok(Some(creation)) => creation,
            Ok(None) => {
                self.error("Entry without creation time".to_string(), position);
                self.entry_broken = true;
                from_unix(0)
            }
            Err(message) => {
                self.error(message, position);
                self.entry_broken = true;
                from_unix(0)
            }
        };

        let mut entry = Entry::new(creation);
        match attributes.time(names::MODIFICATION) {
            Ok(Some(modification)) => entry.modification = modification,
            Ok(None) => {}
            Err(message) => self.error(message, position),
        }
        entry.title = attributes.get(names::TITLE).unwrap_or_default().to_string();
        entry.keyword = Keyword::new(attributes.get(names::KEYWORD).unwrap_or_default());
        entry.author = attributes.get(names::AUTHOR).unwrap_or_default().to_string();
        entry.color = attributes.get(names::COLOR).map(str::to_string);

        self.entry = Some(EntryRecord {
            entry,
            attachments: Vec::new(),
        });
    }

    fn begin_attachment(&mut self, attributes: &Attributes, position: u64) {
        let Some(file) = attributes.get(names::FILE).filter(|file| !file.is_empty()) else {
            self.error("Attachment without file".to_string(), position);
            return;
        };

        let mut attachment = Attachment::new(file);
        attachment.source_file = attributes.get(names::SOURCE_FILE).map(str::to_string);

        let mut problems = Vec::new();
        match attributes.parsed(names::TYPE) {
            Ok(Some(kind)) => attachment.attachment_type = kind,
            Ok(None) => {}
            Err(message) => problems.push(message),
        }
        match attributes.parsed(names::PROVENANCE) {
            Ok(Some(provenance)) => attachment.provenance = provenance,
            Ok(None) => {}
            Err(message) => problems.push(message),
        }
        match attributes.parsed::<u64>(names::SIZE) {
            Ok(size) => attachment.size = size,
            Err(message) => problems.push(message),
        }
        match attributes.time(names::MODIFICATION) {
            Ok(time) => attachment.modification = time,
            Err(message) => problems.push(message),
        }
        attachment.is_valid = attachment.is_url() || attachment.path().exists();

        for message in problems {
            self.error(message, position);
        }

        self.attachment = Some(attachment);
    }
}

/// Unescaped attributes of one element
#[derive(Debug, Default)]
struct Attributes(HashMap<String, String>);

impl Attributes {
    fn parse(element: &BytesStart<'_>) -> std::result::Result<Self, String> {
        let mut values = HashMap::new();
        for attribute in element.attributes() {
            let attribute = attribute.map_err(|e| format!("Invalid attribute: {}", e))?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|e| format!("Invalid value for attribute {}: {}", key, e))?
                .into_owned();
            values.insert(key, value);
        }
        Ok(Self(values))
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), Some("1") | Some("true"))
    }

    fn parsed<T>(&self, name: &str) -> std::result::Result<Option<T>, String>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(name) {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|e| format!("Invalid value {:?} for attribute {}: {}", value, name, e)),
        }
    }

    fn time(&self, name: &str) -> std::result::Result<Option<TimeStamp>, String> {
        Ok(self.parsed::<i64>(name)?.map(from_unix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttachmentType, Provenance, SortMethod};

    fn parse(content: &str) -> (NodeDocument, Vec<XmlError>) {
        parse_document(content, Path::new("test.xml"))
    }

    #[test]
    fn test_parse_full_document() {
        let (document, errors) = parse(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Logbook title="Shift log" author="ops" creation="100" modification="150" sort_method="title" entries="1" children="1">
  <Comments>Main &amp; only</Comments>
  <Child file="shift_include_0.xml"/>
  <RecentEntries>
    <Recent creation="100"/>
  </RecentEntries>
  <Entry creation="100" modification="120" title="First" keyword="/Runs" author="ops" color="red">
    <Text>line one
line two</Text>
    <Attachment file="https://example.org" type="url" provenance="link">
      <Comments>reference</Comments>
    </Attachment>
  </Entry>
  <Backup file="shift_backup_20240101.xml" creation="90"/>
</Logbook>
"#,
        );

        assert!(errors.is_empty(), "{:?}", errors);
        assert_eq!(document.header.title, "Shift log");
        assert_eq!(document.header.comments, "Main & only");
        assert_eq!(document.header.creation, from_unix(100));
        assert_eq!(document.header.sort_method, SortMethod::Title);
        assert_eq!(document.header.entry_count, 1);
        assert_eq!(document.children, vec!["shift_include_0.xml".to_string()]);
        assert_eq!(document.recent_entries, vec![from_unix(100)]);
        assert_eq!(document.backups.len(), 1);

        let record = &document.entries[0];
        assert_eq!(record.entry.title, "First");
        assert_eq!(record.entry.keyword, Keyword::new("/Runs"));
        assert_eq!(record.entry.text, "line one\nline two");
        assert_eq!(record.entry.color.as_deref(), Some("red"));
        assert_eq!(record.attachments.len(), 1);
        assert_eq!(record.attachments[0].attachment_type, AttachmentType::Url);
        assert_eq!(record.attachments[0].provenance, Provenance::Linked);
        assert_eq!(record.attachments[0].comments, "reference");
    }

    #[test]
    fn test_entry_without_creation_is_dropped() {
        let (document, errors) = parse(
            r#"<Logbook title="t">
  <Entry title="no stamp"/>
  <Entry creation="5" title="ok"/>
</Logbook>"#,
        );

        assert_eq!(errors.len(), 1);
        assert_eq!(document.entries.len(), 1);
        assert_eq!(document.entries[0].entry.title, "ok");
    }

    #[test]
    fn test_syntax_error_keeps_partial_content() {
        let (document, errors) = parse(
            r#"<Logbook title="t">
  <Entry creation="1" title="kept"/>
  <Entry creation="2" title="broken">
</Logbook>"#,
        );

        assert_eq!(errors.len(), 1);
        assert_eq!(document.header.title, "t");
        assert_eq!(document.entries.len(), 1);
        assert_eq!(document.entries[0].entry.title, "kept");
    }

    #[test]
    fn test_bad_compressed_text_drops_entry_only() {
        let (document, errors) = parse(
            r#"<Logbook compression="1">
  <Entry creation="1" title="broken"><Text encoding="deflate">@@@</Text></Entry>
  <Entry creation="2" title="fine"/>
</Logbook>"#,
        );

        assert_eq!(errors.len(), 1);
        assert!(document.header.use_compression);
        assert_eq!(document.entries.len(), 1);
        assert_eq!(document.entries[0].entry.title, "fine");
    }

    #[test]
    fn test_missing_root_is_reported() {
        let (_, errors) = parse("");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Logbook"));
    }
}
