//! Logbook file writer

use super::compression::compress;
use super::document::DocumentRef;
use super::names;
use crate::error::Result;
use crate::model::TimeStamp;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Serialize one logbook file
///
/// Output is deterministic: the same document always produces the same bytes.
pub fn serialize_document(document: &DocumentRef<'_>) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let header = document.header;
    let mut root = BytesStart::new(names::LOGBOOK);
    push(&mut root, names::TITLE, &header.title);
    push(&mut root, names::AUTHOR, &header.author);
    if let Some(directory) = &header.directory {
        push(&mut root, names::DIRECTORY, &directory.to_string_lossy());
    }
    if let Some(parent_file) = &header.parent_file {
        push(&mut root, names::PARENT_FILE, &parent_file.to_string_lossy());
    }
    push_time(&mut root, names::CREATION, Some(header.creation));
    push_time(&mut root, names::MODIFICATION, Some(header.modification));
    push_time(&mut root, names::BACKUP_TIME, header.backup);
    push_time(&mut root, names::SAVED, header.saved);
    push(&mut root, names::SORT_METHOD, header.sort_method.as_str());
    push(&mut root, names::SORT_ORDER, header.sort_order.as_str());
    push_flag(&mut root, names::COMPRESSION, header.use_compression);
    push_flag(&mut root, names::IS_BACKUP, header.is_backup);
    push(&mut root, names::ENTRIES, &document.entries.len().to_string());
    push(&mut root, names::CHILDREN, &document.children.len().to_string());
    writer.write_event(Event::Start(root))?;

    write_text_element(&mut writer, names::COMMENTS, BytesStart::new(names::COMMENTS), &header.comments)?;

    for child in document.children {
        let mut element = BytesStart::new(names::CHILD);
        push(&mut element, names::FILE, child);
        writer.write_event(Event::Empty(element))?;
    }

    if !document.recent_entries.is_empty() {
        writer.write_event(Event::Start(BytesStart::new(names::RECENT_ENTRIES)))?;
        for creation in document.recent_entries {
            let mut element = BytesStart::new(names::RECENT);
            push_time(&mut element, names::CREATION, Some(*creation));
            writer.write_event(Event::Empty(element))?;
        }
        writer.write_event(Event::End(BytesEnd::new(names::RECENT_ENTRIES)))?;
    }

    for (entry, attachments) in &document.entries {
        let mut element = BytesStart::new(names::ENTRY);
        push_time(&mut element, names::CREATION, Some(entry.creation()));
        push_time(&mut element, names::MODIFICATION, Some(entry.modification));
        push(&mut element, names::TITLE, &entry.title);
        push(&mut element, names::KEYWORD, entry.keyword.as_str());
        push(&mut element, names::AUTHOR, &entry.author);
        if let Some(color) = &entry.color {
            push(&mut element, names::COLOR, color);
        }

        if entry.text.is_empty() && attachments.is_empty() {
            writer.write_event(Event::Empty(element))?;
            continue;
        }

        writer.write_event(Event::Start(element))?;

        if header.use_compression && !entry.text.is_empty() {
            let mut text = BytesStart::new(names::TEXT);
            push(&mut text, names::ENCODING, names::ENCODING_DEFLATE);
            write_text_element(&mut writer, names::TEXT, text, &compress(&entry.text)?)?;
        } else {
            write_text_element(&mut writer, names::TEXT, BytesStart::new(names::TEXT), &entry.text)?;
        }

        for attachment in attachments {
            let mut element = BytesStart::new(names::ATTACHMENT);
            push(&mut element, names::FILE, &attachment.file);
            if let Some(source_file) = &attachment.source_file {
                push(&mut element, names::SOURCE_FILE, source_file);
            }
            push(&mut element, names::TYPE, attachment.attachment_type.as_str());
            push(&mut element, names::PROVENANCE, attachment.provenance.as_str());
            if let Some(size) = attachment.size {
                push(&mut element, names::SIZE, &size.to_string());
            }
            push_time(&mut element, names::MODIFICATION, attachment.modification);

            if attachment.comments.is_empty() {
                writer.write_event(Event::Empty(element))?;
            } else {
                writer.write_event(Event::Start(element))?;
                write_text_element(
                    &mut writer,
                    names::COMMENTS,
                    BytesStart::new(names::COMMENTS),
                    &attachment.comments,
                )?;
                writer.write_event(Event::End(BytesEnd::new(names::ATTACHMENT)))?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new(names::ENTRY)))?;
    }

    for backup in document.backups {
        let mut element = BytesStart::new(names::BACKUP);
        push(&mut element, names::FILE, &backup.file.to_string_lossy());
        push_time(&mut element, names::CREATION, Some(backup.creation));
        writer.write_event(Event::Empty(element))?;
    }

    writer.write_event(Event::End(BytesEnd::new(names::LOGBOOK)))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

/// Serialize a document and atomically replace `path` with it
pub fn write_document(path: &Path, document: &DocumentRef<'_>) -> Result<()> {
    let bytes = serialize_document(document)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    // Write to temp file first (atomic write)
    let temp_path = path.with_extension("xml.tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path)?;

    tracing::debug!(
        "Wrote logbook file {:?} ({} entries, {} bytes)",
        path,
        document.entries.len(),
        bytes.len()
    );

    Ok(())
}

fn push(element: &mut BytesStart<'_>, name: &str, value: &str) {
    element.push_attribute((name, value));
}

fn push_time(element: &mut BytesStart<'_>, name: &str, value: Option<TimeStamp>) {
    if let Some(time) = value {
        push(element, name, &time.timestamp().to_string());
    }
}

fn push_flag(element: &mut BytesStart<'_>, name: &str, value: bool) {
    if value {
        push(element, name, "1");
    }
}

/// Write `<name ...>text</name>`, skipping the element when text is empty
fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    start: BytesStart<'_>,
    text: &str,
) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
