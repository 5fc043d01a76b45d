use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use normalizer_engine::{
    fixed_clock, Dispatcher, EngineConfig, LoadError, NormalizeError, SourceKind,
    TabularFlattener,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

const AT: &str = "2024-05-01T09:30:00+09:00";

fn dispatcher() -> Dispatcher {
    Dispatcher::new(&EngineConfig::default().with_clock(fixed_clock(AT)))
}

fn write(dir: &TempDir, name: &str, bytes: &[u8]) -> String {
    let path = dir.path().join(name);
    fs::write(&path, bytes).expect("write fixture");
    path.to_string_lossy().into_owned()
}

fn write_package(path: &Path, parts: &[(&str, &str)]) {
    let file = File::create(path).expect("create package");
    let mut zip = zip::ZipWriter::new(file);
    for (name, xml) in parts {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("start part");
        zip.write_all(xml.as_bytes()).expect("write part");
    }
    zip.finish().expect("finish package");
}

fn word_xml(paragraphs: &[&str]) -> String {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{p}</w:t></w:r></w:p>"))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{body}</w:body></w:document>"
    )
}

fn slide_xml(text: &str) -> String {
    format!(
        "<p:sld xmlns:p=\"urn:p\" xmlns:a=\"urn:a\"><p:cSld><p:spTree><p:sp><p:txBody>\
         <a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"
    )
}

fn minimal_pdf(line: &str) -> Vec<u8> {
    let content = format!("BT /F1 18 Tf 72 720 Td ({line}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", index + 1).as_bytes());
    }
    let xref_at = pdf.len();
    let mut tail = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        tail.push_str(&format!("{offset:010} 00000 n \n"));
    }
    tail.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
        objects.len() + 1
    ));
    pdf.extend_from_slice(tail.as_bytes());
    pdf
}

fn inline_cell(reference: &str, text: &str) -> String {
    format!("<c r=\"{reference}\" t=\"inlineStr\"><is><t>{text}</t></is></c>")
}

fn number_cell(reference: &str, value: u32) -> String {
    format!("<c r=\"{reference}\"><v>{value}</v></c>")
}

fn write_workbook(path: &Path) {
    let rows = [
        [inline_cell("A1", "name"), inline_cell("B1", "qty")],
        [inline_cell("A2", "apple"), number_cell("B2", 3)],
        [inline_cell("A3", "kiwi"), number_cell("B3", 12)],
    ];
    let sheet_data: String = rows
        .iter()
        .enumerate()
        .map(|(index, cells)| format!("<row r=\"{}\">{}</row>", index + 1, cells.concat()))
        .collect();
    let sheet = format!(
        "<worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\
         <sheetData>{sheet_data}</sheetData></worksheet>"
    );
    let workbook = "<workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
        xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
        <sheets><sheet name=\"Stock\" sheetId=\"1\" r:id=\"rId1\"/></sheets></workbook>";
    let rels = "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
        <Relationship Id=\"rId1\" \
        Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" \
        Target=\"worksheets/sheet1.xml\"/></Relationships>";
    write_package(
        path,
        &[
            ("xl/workbook.xml", workbook),
            ("xl/_rels/workbook.xml.rels", rels),
            ("xl/worksheets/sheet1.xml", &sheet),
        ],
    );
}

#[tokio::test]
async fn text_file_is_read_verbatim() {
    init_logging();
    let dir = TempDir::new().expect("tempdir");
    let path = write(&dir, "memo.txt", "첫 번째 줄\n두 번째 줄".as_bytes());
    let text = dispatcher().extract_text(&path).await.expect("text");
    assert_eq!(text, "첫 번째 줄\n두 번째 줄");
}

#[tokio::test]
async fn declared_encoding_applies_to_text_files() {
    init_logging();
    let dir = TempDir::new().expect("tempdir");
    let (bytes, _, _) = encoding_rs::EUC_KR.encode("안녕하세요 여러분");
    let path = write(&dir, "greeting.txt", &bytes);

    let mut config = EngineConfig::default().with_clock(fixed_clock(AT));
    config.declared_encoding = Some("cp949".to_string());
    let text = Dispatcher::new(&config)
        .extract_text(&path)
        .await
        .expect("declared text");
    assert_eq!(text, "안녕하세요 여러분");

    config.declared_encoding = Some("windows-1252".to_string());
    let misread = Dispatcher::new(&config)
        .extract_text(&path)
        .await
        .expect("misdeclared text");
    assert_ne!(misread, "안녕하세요 여러분");
    assert_eq!(misread.chars().count(), bytes.len());
}

#[tokio::test]
async fn csv_rows_become_labelled_lines() {
    init_logging();
    let dir = TempDir::new().expect("tempdir");
    let path = write(&dir, "people.csv", b"name,city\nKim,Seoul\nLee, Busan \n");
    let text = dispatcher().extract_text(&path).await.expect("csv");
    assert_eq!(text, "name: Kim\ncity: Seoul\nname: Lee\ncity: Busan");
}

#[tokio::test]
async fn word_document_paragraphs_are_joined() {
    init_logging();
    let dir = TempDir::new().expect("tempdir");
    let path: PathBuf = dir.path().join("letter.docx");
    write_package(
        &path,
        &[(
            "word/document.xml",
            &word_xml(&["Dear reader,", "Thanks for writing.", "Regards"]),
        )],
    );
    let text = dispatcher()
        .extract_text(&path.to_string_lossy())
        .await
        .expect("docx");
    assert_eq!(text, "Dear reader,\nThanks for writing.\nRegards");
}

#[tokio::test]
async fn slides_are_read_in_numeric_order() {
    init_logging();
    let dir = TempDir::new().expect("tempdir");
    let path: PathBuf = dir.path().join("deck.pptx");
    write_package(
        &path,
        &[
            ("ppt/slides/slide10.xml", &slide_xml("tenth")),
            ("ppt/slides/slide2.xml", &slide_xml("second")),
            ("ppt/slides/slide1.xml", &slide_xml("first")),
        ],
    );
    let text = dispatcher()
        .extract_text(&path.to_string_lossy())
        .await
        .expect("pptx");
    assert_eq!(text, "first\nsecond\ntenth");
}

#[tokio::test]
async fn legacy_binary_office_file_is_unsupported() {
    init_logging();
    let dir = TempDir::new().expect("tempdir");
    let path = write(
        &dir,
        "old.doc",
        &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0, 0, 0, 0],
    );
    let err = dispatcher().extract_text(&path).await.unwrap_err();
    assert!(matches!(
        err,
        NormalizeError::Load(LoadError::UnsupportedFormat(_))
    ));
}

struct CannedTable;

impl TabularFlattener for CannedTable {
    fn flatten(&self, _path: &Path) -> Result<String, LoadError> {
        Ok(" name qty\napple   3".to_string())
    }
}

#[tokio::test]
async fn spreadsheets_go_through_the_flattener() {
    init_logging();
    let dir = TempDir::new().expect("tempdir");
    let path = write(&dir, "stock.xlsx", b"not really a workbook");
    let result = dispatcher()
        .with_flattener(Arc::new(CannedTable))
        .extract_with_metadata(&path)
        .await;
    assert!(result.is_success());
    assert_eq!(result.kind(), SourceKind::Excel);
    assert_eq!(result.text(), " name qty\napple   3");
    assert_eq!(result.line_count(), 2);
}

#[tokio::test]
async fn workbook_first_sheet_is_rendered_as_aligned_table() {
    init_logging();
    let dir = TempDir::new().expect("tempdir");
    let path: PathBuf = dir.path().join("stock.xlsx");
    write_workbook(&path);

    let result = dispatcher()
        .extract_with_metadata(&path.to_string_lossy())
        .await;
    assert!(result.is_success(), "{:?}", result.error());
    assert_eq!(result.kind(), SourceKind::Excel);
    assert_eq!(result.text(), " name qty\napple   3\n kiwi  12");
}

#[tokio::test]
async fn pdf_text_is_extracted() {
    init_logging();
    let dir = TempDir::new().expect("tempdir");
    let path = write(&dir, "summary.pdf", &minimal_pdf("Quarterly revenue grew"));

    let result = dispatcher().extract_with_metadata(&path).await;
    assert!(result.is_success(), "{:?}", result.error());
    assert_eq!(result.kind(), SourceKind::Pdf);
    assert!(result.text().contains("Quarterly"));
    assert!(result.text().contains("revenue"));
}

#[tokio::test]
async fn broken_workbook_becomes_a_failure_result() {
    init_logging();
    let dir = TempDir::new().expect("tempdir");
    let path = write(&dir, "broken.xlsx", b"not really a workbook");
    let result = dispatcher().extract_with_metadata(&path).await;
    assert!(!result.is_success());
    assert_eq!(result.kind(), SourceKind::Excel);
    assert!(result.error().is_some());
    assert_eq!(result.text(), "");
}

#[tokio::test]
async fn unknown_kind_is_rejected() {
    init_logging();
    let dir = TempDir::new().expect("tempdir");
    let path = write(&dir, "mystery", b"\x00\x01\x02\x03");
    let err = dispatcher().extract_text(&path).await.unwrap_err();
    assert!(matches!(
        err,
        NormalizeError::UnsupportedKind {
            kind: SourceKind::Unknown,
            ..
        }
    ));

    let result = dispatcher().extract_with_metadata(&path).await;
    assert!(!result.is_success());
    assert_eq!(result.kind(), SourceKind::Unknown);
}

#[tokio::test]
async fn missing_source_is_not_found() {
    init_logging();
    let missing = "/no/such/place/file.txt";
    let err = dispatcher().extract_text(missing).await.unwrap_err();
    assert!(matches!(err, NormalizeError::NotFound(ref input) if input == missing));

    let result = dispatcher().extract_with_metadata(missing).await;
    assert!(!result.is_success());
    assert_eq!(result.kind(), SourceKind::Unknown);
    assert_eq!(result.char_count(), 0);
    assert_eq!(result.processed_at(), AT);
    assert_eq!(
        result.error(),
        Some("source not found: /no/such/place/file.txt")
    );
}

#[tokio::test]
async fn web_page_is_fetched_decoded_and_scored() {
    init_logging();
    let server = MockServer::start().await;
    let page = "<html><body><nav><a href=\"/\">Home</a><a href=\"/news\">News</a></nav>\
        <div class=\"article-body\"><p>Local council approves the new library budget. \
        Construction starts in spring and should finish within two years.</p></div>\
        <footer>Copyright</footer></body></html>";
    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(page, "text/html; charset=utf-8"))
        .mount(&server)
        .await;

    let url = format!("{}/story", server.uri());
    let result = dispatcher().extract_with_metadata(&url).await;
    assert!(result.is_success());
    assert_eq!(result.kind(), SourceKind::Url);
    let sentence = "Local council approves the new library budget. Construction starts in \
        spring and should finish within two years.";
    assert_eq!(
        result.text(),
        format!("{sentence}\n{sentence}")
    );
    assert!(!result.text().contains("Copyright"));
}

#[tokio::test]
async fn unreachable_page_yields_empty_text_but_failed_metadata() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/gone", server.uri());
    let text = dispatcher().extract_text(&url).await.expect("degrades to empty");
    assert_eq!(text, "");

    let result = dispatcher().extract_with_metadata(&url).await;
    assert!(!result.is_success());
    assert_eq!(result.kind(), SourceKind::Url);
    assert!(result.error().is_some_and(|err| err.contains("404")));
}

#[tokio::test]
async fn metadata_counts_describe_the_text() {
    init_logging();
    let dir = TempDir::new().expect("tempdir");
    let path = write(&dir, "poem.txt", b"roses are red\nviolets are blue");
    let result = dispatcher().extract_with_metadata(&path).await;
    assert!(result.is_success());
    assert_eq!(result.kind(), SourceKind::Txt);
    assert_eq!(result.char_count(), 30);
    assert_eq!(result.word_count(), 6);
    assert_eq!(result.line_count(), 2);
    assert_eq!(result.processed_at(), AT);
    assert_eq!(result.error(), None);
}
