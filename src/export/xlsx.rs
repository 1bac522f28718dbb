//! XLSX Export Module
//! Writes workbooks through direct ZIP/XML generation (SpreadsheetML parts,
//! inline strings, no shared string table).

use crate::data::{DataProcessor, EntityTotal, ProcessorError, SalesTable};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;
use thiserror::Error;
use zip::write::FileOptions;
use zip::ZipWriter;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Aggregation failed: {0}")]
    Processor(#[from] ProcessorError),
}

/// One cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

/// A worksheet: header row followed by data rows.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Workbook writer.
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write `sheets` to `output_path`.
    pub fn write_file(sheets: &[Sheet], output_path: &Path, title: &str) -> Result<(), ExportError> {
        let file = File::create(output_path)?;
        Self::write(sheets, file, title)?;
        tracing::info!(
            path = %output_path.display(),
            sheets = sheets.len(),
            "workbook written"
        );
        Ok(())
    }

    /// Write `sheets` to any seekable sink.
    pub fn write<W: Write + Seek>(sheets: &[Sheet], sink: W, title: &str) -> Result<W, ExportError> {
        let mut zip = ZipWriter::new(sink);
        let options = FileOptions::default();

        // 1. [Content_Types].xml
        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(Self::content_types_xml(sheets.len()).as_bytes())?;

        // 2. _rels/.rels
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(Self::rels_xml().as_bytes())?;

        // 3. Workbook and its relationships
        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(Self::workbook_xml(sheets).as_bytes())?;
        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(Self::workbook_rels_xml(sheets.len()).as_bytes())?;

        // 4. Styles
        zip.start_file("xl/styles.xml", options)?;
        zip.write_all(Self::styles_xml().as_bytes())?;

        // 5. Sheets
        for (idx, sheet) in sheets.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", idx + 1), options)?;
            zip.write_all(Self::sheet_xml(sheet).as_bytes())?;
        }

        // 6. docProps
        zip.start_file("docProps/core.xml", options)?;
        zip.write_all(Self::core_props_xml(title).as_bytes())?;
        zip.start_file("docProps/app.xml", options)?;
        zip.write_all(Self::app_props_xml().as_bytes())?;

        Ok(zip.finish()?)
    }

    fn content_types_xml(sheet_count: usize) -> String {
        let mut xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
"#
        .to_string();

        for i in 1..=sheet_count {
            xml.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i
            ));
            xml.push('\n');
        }
        xml.push_str("</Types>");
        xml
    }

    fn rels_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#
    }

    fn workbook_xml(sheets: &[Sheet]) -> String {
        let mut entries = String::new();
        for (idx, sheet) in sheets.iter().enumerate() {
            entries.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape_xml(&sheet_name(&sheet.name)),
                idx + 1,
                idx + 1
            ));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets>{}</sheets>
</workbook>"#,
            entries
        )
    }

    fn workbook_rels_xml(sheet_count: usize) -> String {
        let mut xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#
        .to_string();

        for i in 1..=sheet_count {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i, i
            ));
            xml.push('\n');
        }
        // Styles come after the sheets so sheet ids stay 1..=n.
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
            sheet_count + 1
        ));
        xml.push_str("\n</Relationships>");
        xml
    }

    fn styles_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts>
<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/></cellXfs>
</styleSheet>"#
    }

    fn sheet_xml(sheet: &Sheet) -> String {
        let mut rows = String::new();

        // Header row in bold (style 1)
        rows.push_str(r#"<row r="1">"#);
        for (col, name) in sheet.header.iter().enumerate() {
            rows.push_str(&format!(
                r#"<c r="{}1" t="inlineStr" s="1"><is><t>{}</t></is></c>"#,
                column_letter(col),
                escape_xml(name)
            ));
        }
        rows.push_str("</row>");

        for (row_idx, row) in sheet.rows.iter().enumerate() {
            let r = row_idx + 2;
            rows.push_str(&format!(r#"<row r="{}">"#, r));
            for (col, cell) in row.iter().enumerate() {
                let reference = format!("{}{}", column_letter(col), r);
                match cell {
                    Cell::Number(v) if v.is_finite() => {
                        rows.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, v));
                    }
                    Cell::Number(_) => {}
                    Cell::Text(s) => rows.push_str(&format!(
                        r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        reference,
                        escape_xml(s)
                    )),
                }
            }
            rows.push_str("</row>");
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<sheetData>{}</sheetData>
</worksheet>"#,
            rows
        )
    }

    fn core_props_xml(title: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<dc:title>{}</dc:title>
<dc:creator>Salesboard</dc:creator>
</cp:coreProperties>"#,
            escape_xml(title)
        )
    }

    fn app_props_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">
<Application>Salesboard</Application>
</Properties>"#
    }
}

/// Sales table plus per-entity aggregate columns, and a ranking sheet.
pub fn sales_sheets(table: &SalesTable) -> Result<Vec<Sheet>, ExportError> {
    let totals = DataProcessor::entity_totals(table)?;
    let by_entity: HashMap<&str, &EntityTotal> =
        totals.iter().map(|t| (t.entity.as_str(), t)).collect();
    let columns = table.columns();

    let header = vec![
        columns.date.clone(),
        columns.entity.clone(),
        columns.amount.clone(),
        "Mês".to_string(),
        "Ano".to_string(),
        "Dia da semana".to_string(),
        "Total Cliente".to_string(),
        "Participação".to_string(),
    ];

    let rows = table
        .records()
        .iter()
        .map(|r| {
            let entity = by_entity.get(r.entity.as_str());
            vec![
                Cell::Text(r.date.format("%Y-%m-%d").to_string()),
                Cell::Text(r.entity.clone()),
                Cell::Number(r.amount),
                Cell::Text(r.month_name.clone()),
                Cell::Number(r.year as f64),
                Cell::Text(r.weekday_name.clone()),
                Cell::Number(entity.map(|t| t.total).unwrap_or(0.0)),
                Cell::Number(entity.map(|t| t.share).unwrap_or(0.0)),
            ]
        })
        .collect();

    let ranking = Sheet {
        name: "Ranking".to_string(),
        header: vec![
            columns.entity.clone(),
            "Total".to_string(),
            "Média".to_string(),
            "Vendas".to_string(),
            "Participação".to_string(),
        ],
        rows: totals
            .iter()
            .map(|t| {
                vec![
                    Cell::Text(t.entity.clone()),
                    Cell::Number(t.total),
                    Cell::Number(t.mean),
                    Cell::Number(t.count as f64),
                    Cell::Number(t.share),
                ]
            })
            .collect(),
    };

    Ok(vec![
        Sheet {
            name: "Dados".to_string(),
            header,
            rows,
        },
        ranking,
    ])
}

/// Export a cleaned table as `.xlsx`.
pub fn export_sales_table(table: &SalesTable, output_path: &Path) -> Result<(), ExportError> {
    let sheets = sales_sheets(table)?;
    XlsxWriter::write_file(&sheets, output_path, "Salesboard Export")
}

/// Zero-based column index to spreadsheet letters (0 -> A, 26 -> AA).
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Sheet names: at most 31 chars, none of `[]:*?/\`.
fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned
    }
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample_table;
    use std::io::{Cursor, Read};

    fn read_part(bytes: Vec<u8>, name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut content = String::new();
        part.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("A&B <x>"), "A&amp;B &lt;x&gt;");
        assert_eq!(escape_xml("a\u{1}b"), "ab");
    }

    #[test]
    fn test_sheet_name_cleanup() {
        assert_eq!(sheet_name("a/b:c"), "abc");
        assert_eq!(sheet_name("?"), "Sheet");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
    }

    #[test]
    fn test_workbook_parts() {
        let sheets = vec![Sheet {
            name: "Test".into(),
            header: vec!["Name".into(), "Value".into()],
            rows: vec![vec![Cell::from("R&D"), Cell::from(12.5)]],
        }];
        let bytes = XlsxWriter::write(&sheets, Cursor::new(Vec::new()), "t")
            .unwrap()
            .into_inner();

        let workbook = read_part(bytes.clone(), "xl/workbook.xml");
        assert!(workbook.contains(r#"<sheet name="Test" sheetId="1" r:id="rId1"/>"#));

        let sheet = read_part(bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains(r#"<c r="A2" t="inlineStr"><is><t>R&amp;D</t></is></c>"#));
        assert!(sheet.contains(r#"<c r="B2"><v>12.5</v></c>"#));
    }

    #[test]
    fn test_sales_sheets_aggregate_columns() {
        let sheets = sales_sheets(&sample_table()).unwrap();
        assert_eq!(sheets.len(), 2);

        let data = &sheets[0];
        assert_eq!(data.header[0], "Data");
        assert_eq!(data.header.len(), 8);
        assert_eq!(data.rows.len(), 5);
        // Beta total on the second row
        assert_eq!(data.rows[1][6], Cell::Number(260.0));
        // Every Alfa row carries the Alfa share
        assert_eq!(data.rows[0][7], Cell::Number(150.0 / 810.0));
        assert_eq!(data.rows[2][7], Cell::Number(150.0 / 810.0));

        let ranking = &sheets[1];
        assert_eq!(ranking.rows[0][0], Cell::Text("Gama".into()));
    }

    #[test]
    fn test_export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        export_sales_table(&sample_table(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let sheet2 = read_part(bytes, "xl/worksheets/sheet2.xml");
        assert!(sheet2.contains("Gama"));
    }
}
