use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader as _};
use engine_logging::engine_debug;
use normalizer_core::SourceKind;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::decode::decode;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Turns a local document into ordered text segments.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, kind: SourceKind, path: &Path) -> Result<Vec<String>, LoadError>;
}

/// Renders the first sheet of a workbook as an aligned text table.
pub trait TabularFlattener: Send + Sync {
    fn flatten(&self, path: &Path) -> Result<String, LoadError>;
}

/// PDF through pdf-extract, OOXML through zip and quick-xml, CSV through csv.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinLoader;

impl DocumentLoader for BuiltinLoader {
    fn load(&self, kind: SourceKind, path: &Path) -> Result<Vec<String>, LoadError> {
        let segments = match kind {
            SourceKind::Pdf => load_pdf(path)?,
            SourceKind::Word => load_word(path)?,
            SourceKind::Ppt => load_slides(path)?,
            SourceKind::Csv => load_csv(path)?,
            other => {
                return Err(LoadError::UnsupportedFormat(format!(
                    "no document loader for {other}"
                )))
            }
        };
        engine_debug!("loaded {} segments from {}", segments.len(), path.display());
        Ok(segments)
    }
}

fn load_pdf(path: &Path) -> Result<Vec<String>, LoadError> {
    pdf_extract::extract_text(path)
        .map(|text| vec![text])
        .map_err(|err| LoadError::Malformed(format!("{}: {err}", path.display())))
}

fn open_package(path: &Path) -> Result<zip::ZipArchive<BufReader<File>>, LoadError> {
    let file = File::open(path)?;
    zip::ZipArchive::new(BufReader::new(file)).map_err(|err| {
        LoadError::UnsupportedFormat(format!(
            "{} is not an Office Open XML package ({err}); legacy binary formats are not supported",
            path.display()
        ))
    })
}

fn read_part(
    archive: &mut zip::ZipArchive<BufReader<File>>,
    name: &str,
) -> Result<String, LoadError> {
    let mut part = archive
        .by_name(name)
        .map_err(|err| LoadError::Malformed(format!("{name}: {err}")))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    Ok(xml)
}

fn load_word(path: &Path) -> Result<Vec<String>, LoadError> {
    let mut archive = open_package(path)?;
    let xml = read_part(&mut archive, "word/document.xml")?;
    xml_paragraphs(&xml)
}

fn load_slides(path: &Path) -> Result<Vec<String>, LoadError> {
    let mut archive = open_package(path)?;
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            name.strip_prefix("ppt/slides/slide")
                .and_then(|rest| rest.strip_suffix(".xml"))
                .and_then(|number| number.parse::<u32>().ok())
                .map(|number| (number, name.to_string()))
        })
        .collect();
    slides.sort();

    let mut paragraphs = Vec::new();
    for (_, name) in slides {
        let xml = read_part(&mut archive, &name)?;
        paragraphs.extend(xml_paragraphs(&xml)?);
    }
    Ok(paragraphs)
}

/// Text of each `p` element (`w:p` in documents, `a:p` in slides), joined
/// from its `t` runs. Empty paragraphs are dropped.
fn xml_paragraphs(xml: &str) -> Result<Vec<String>, LoadError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"tab" => current.push(' '),
            Ok(Event::Text(e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|err| LoadError::Malformed(err.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let paragraph = current.trim();
                    if !paragraph.is_empty() {
                        paragraphs.push(paragraph.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(err) => return Err(LoadError::Malformed(err.to_string())),
            _ => {}
        }
    }
    Ok(paragraphs)
}

/// One segment per record, each field rendered as `header: value`.
fn load_csv(path: &Path) -> Result<Vec<String>, LoadError> {
    let bytes = std::fs::read(path)?;
    let decoded = decode(&bytes, None, None);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(decoded.text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|err| LoadError::Malformed(err.to_string()))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| LoadError::Malformed(err.to_string()))?;
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| format!("{}: {}", header.trim(), value.trim()))
            .collect::<Vec<_>>()
            .join("\n");
        rows.push(row);
    }
    Ok(rows)
}

/// First worksheet via calamine. The first row is the header; every column
/// is right-aligned to its widest cell and columns are separated by a space.
#[derive(Debug, Default, Clone, Copy)]
pub struct CalamineFlattener;

impl TabularFlattener for CalamineFlattener {
    fn flatten(&self, path: &Path) -> Result<String, LoadError> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|err| LoadError::Malformed(format!("{}: {err}", path.display())))?;
        let Some(first_sheet) = workbook.sheet_names().first().cloned() else {
            return Ok(String::new());
        };
        let range = workbook
            .worksheet_range(&first_sheet)
            .map_err(|err| LoadError::Malformed(format!("{first_sheet}: {err}")))?;

        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        Ok(render_table(&rows))
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        _ => String::new(),
    }
}

/// Right-align each column to its widest cell.
pub fn render_table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|col| {
            rows.iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    rows.iter()
        .map(|row| {
            widths
                .iter()
                .enumerate()
                .map(|(col, &width)| {
                    let cell = row.get(col).map(String::as_str).unwrap_or("");
                    format!("{cell:>width$}")
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
