//! Workbook Metadata Module
//!
//! XLSX内部のXMLから、calamineで取得できない情報を抽出するモジュール。
//! 最初のシートのセルごとのNumber Format Stringと1904年エポック判定を提供します。

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::RemapError;
use crate::format::FormatParser;
use crate::security::SecurityConfig;

/// ワークブックのメタデータ
///
/// 必要なXMLパーツが存在しない場合は空のまま返し、ワークブック自体の
/// 妥当性判定はcalamineに任せます。
#[derive(Debug, Default)]
pub(crate) struct WorkbookMetadata {
    /// スタイルID（cellXfsのインデックス）-> 書式。"General"は`None`
    formats: Vec<Option<FormatParser>>,
    /// 最初のシートの(行, 列) -> スタイルID（0始まり、スタイル0は含まない）
    cell_styles: HashMap<(u32, u32), u32>,
    /// 1904年エポックを使用するかどうか
    is_1904: bool,
}

impl WorkbookMetadata {
    /// XLSXファイル（ZIPアーカイブ）からメタデータを読み込む
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookMetadata)` - 読み込みに成功した場合
    /// * `Err(RemapError::Open)` - ZIPまたはXMLとして解析できない場合
    /// * `Err(RemapError::SecurityViolation)` - アーカイブが上限を超える場合
    pub fn read<R: Read + Seek>(
        reader: R,
        source: &Path,
        security: &SecurityConfig,
    ) -> Result<Self, RemapError> {
        let mut archive = ZipArchive::new(reader).map_err(|e| RemapError::open(source, e))?;
        security.check_archive(&mut archive, source)?;

        let xml_error = |e: quick_xml::Error| RemapError::open(source, e);

        let formats = match read_part(&mut archive, "xl/styles.xml", source)? {
            Some(xml) => parse_styles(&xml).map_err(xml_error)?,
            None => Vec::new(),
        };

        let Some(workbook_xml) = read_part(&mut archive, "xl/workbook.xml", source)? else {
            return Ok(Self {
                formats,
                ..Self::default()
            });
        };
        let (is_1904, first_sheet_rel) = parse_workbook(&workbook_xml).map_err(xml_error)?;

        let sheet_path = match (
            first_sheet_rel,
            read_part(&mut archive, "xl/_rels/workbook.xml.rels", source)?,
        ) {
            (Some(rel_id), Some(rels_xml)) => parse_relationships(&rels_xml)
                .map_err(xml_error)?
                .get(&rel_id)
                .map(|target| resolve_target(target)),
            _ => None,
        };

        let cell_styles = match sheet_path {
            Some(path) => match read_part(&mut archive, &path, source)? {
                Some(xml) => parse_cell_styles(&xml).map_err(xml_error)?,
                None => HashMap::new(),
            },
            None => HashMap::new(),
        };

        Ok(Self {
            formats,
            cell_styles,
            is_1904,
        })
    }

    /// セルに適用される書式を取得
    ///
    /// # 引数
    ///
    /// * `row` - シート上の行インデックス（0始まり）
    /// * `col` - シート上の列インデックス（0始まり）
    ///
    /// # 戻り値
    ///
    /// * `Some(&FormatParser)` - "General"以外の書式が設定されている場合
    /// * `None` - 書式が無い、または"General"の場合
    pub fn format_for(&self, row: u32, col: u32) -> Option<&FormatParser> {
        let style = self.cell_styles.get(&(row, col))?;
        self.formats.get(*style as usize)?.as_ref()
    }

    pub fn is_1904(&self) -> bool {
        self.is_1904
    }
}

/// アーカイブ内のパーツを読み込む。存在しない場合は`None`
fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    source: &Path,
) -> Result<Option<Vec<u8>>, RemapError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(RemapError::open(source, e)),
    };

    let mut xml = Vec::new();
    file.read_to_end(&mut xml)
        .map_err(|e| RemapError::open(source, e))?;
    Ok(Some(xml))
}

/// XMLの要素を順に走査する
///
/// 開始タグでは`Some(要素)`、終了タグでは`None`を渡します。
/// 自己終了タグ（`<xf/>`など）は開始と終了の両方として扱います。
fn for_each_element(
    xml: &[u8],
    mut visit: impl FnMut(&[u8], Option<&BytesStart<'_>>),
) -> Result<(), quick_xml::Error> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => visit(e.local_name().as_ref(), Some(&e)),
            Event::Empty(e) => {
                visit(e.local_name().as_ref(), Some(&e));
                visit(e.local_name().as_ref(), None);
            }
            Event::End(e) => visit(e.local_name().as_ref(), None),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// 属性値を取得（名前空間接頭辞は無視）
fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// xl/styles.xml の `<numFmts>` と `<cellXfs>` を解析
fn parse_styles(xml: &[u8]) -> Result<Vec<Option<FormatParser>>, quick_xml::Error> {
    let mut custom_formats: HashMap<u32, String> = HashMap::new();
    let mut xf_format_ids: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;

    for_each_element(xml, |name, element| match (name, element) {
        (b"numFmt", Some(e)) => {
            // <numFmt numFmtId="164" formatCode="000"/>
            let id = attribute(e, b"numFmtId").and_then(|v| v.parse().ok());
            if let (Some(id), Some(code)) = (id, attribute(e, b"formatCode")) {
                custom_formats.insert(id, code);
            }
        }
        (b"cellXfs", element) => in_cell_xfs = element.is_some(),
        (b"xf", Some(e)) if in_cell_xfs => {
            let id = attribute(e, b"numFmtId").and_then(|v| v.parse().ok());
            xf_format_ids.push(id.unwrap_or(0));
        }
        _ => {}
    })?;

    Ok(xf_format_ids
        .into_iter()
        .map(|id| {
            let code = custom_formats
                .get(&id)
                .map(String::as_str)
                .or_else(|| builtin_format(id))?;
            if code.eq_ignore_ascii_case("general") {
                return None;
            }
            Some(FormatParser::parse(code))
        })
        .collect())
}

/// xl/workbook.xml から1904年エポックと最初のシートのリレーションシップIDを取得
fn parse_workbook(xml: &[u8]) -> Result<(bool, Option<String>), quick_xml::Error> {
    let mut is_1904 = false;
    let mut first_sheet_rel = None;

    for_each_element(xml, |name, element| match (name, element) {
        (b"workbookPr", Some(e)) => {
            is_1904 = attribute(e, b"date1904").is_some_and(|v| v == "1" || v == "true");
        }
        // <sheet name="Sheet1" sheetId="1" r:id="rId1"/>
        (b"sheet", Some(e)) if first_sheet_rel.is_none() => {
            first_sheet_rel = attribute(e, b"id");
        }
        _ => {}
    })?;

    Ok((is_1904, first_sheet_rel))
}

/// リレーションシップファイルを解析（Id -> Target）
fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, quick_xml::Error> {
    let mut relationships = HashMap::new();

    for_each_element(xml, |name, element| {
        if let (b"Relationship", Some(e)) = (name, element) {
            if let (Some(id), Some(target)) = (attribute(e, b"Id"), attribute(e, b"Target")) {
                relationships.insert(id, target);
            }
        }
    })?;

    Ok(relationships)
}

/// ワークブックのリレーションシップのTargetをアーカイブ内のパスに変換
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

/// ワークシートXMLからセルごとのスタイルIDを取得
///
/// `r`属性の無い行・セルは直前の位置の次として扱います。
fn parse_cell_styles(xml: &[u8]) -> Result<HashMap<(u32, u32), u32>, quick_xml::Error> {
    let mut styles = HashMap::new();
    let mut row = 0u32;
    let mut next_row = 0u32;
    let mut next_col = 0u32;

    for_each_element(xml, |name, element| match (name, element) {
        // <row r="3">
        (b"row", Some(e)) => {
            row = attribute(e, b"r")
                .and_then(|v| v.parse::<u32>().ok())
                .and_then(|r| r.checked_sub(1))
                .unwrap_or(next_row);
            next_row = row.saturating_add(1);
            next_col = 0;
        }
        // <c r="B3" s="2">
        (b"c", Some(e)) => {
            let (r, c) = attribute(e, b"r")
                .and_then(|v| parse_cell_ref(&v))
                .unwrap_or((row, next_col));
            next_col = c.saturating_add(1);
            if let Some(style) = attribute(e, b"s").and_then(|v| v.parse::<u32>().ok()) {
                if style != 0 {
                    styles.insert((r, c), style);
                }
            }
        }
        _ => {}
    })?;

    Ok(styles)
}

/// セル参照文字列を座標に変換（例: "A1" -> (0, 0), "AA10" -> (9, 26)）
fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }

    let mut col = 0u32;
    for ch in letters.chars() {
        if !ch.is_ascii_uppercase() {
            return None;
        }
        col = col.checked_mul(26)?.checked_add(ch as u32 - 'A' as u32 + 1)?;
    }

    let row: u32 = digits.parse().ok()?;
    Some((row.checked_sub(1)?, col - 1))
}

/// ビルトイン書式ID（0-163）のマッピング
///
/// Excelの標準書式IDとフォーマット文字列の対応表です。
/// 地域依存のID（27-36, 50-58など）は含みません。
fn builtin_format(id: u32) -> Option<&'static str> {
    match id {
        0 => Some("General"),
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        5 => Some("$#,##0_);($#,##0)"),
        6 => Some("$#,##0_);[Red]($#,##0)"),
        7 => Some("$#,##0.00_);($#,##0.00)"),
        8 => Some("$#,##0.00_);[Red]($#,##0.00)"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        11 => Some("0.00E+00"),
        12 => Some("# ?/?"),
        13 => Some("# ??/??"),
        14 => Some("mm-dd-yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        37 => Some("#,##0_);(#,##0)"),
        38 => Some("#,##0_);[Red](#,##0)"),
        39 => Some("#,##0.00_);(#,##0.00)"),
        40 => Some("#,##0.00_);[Red](#,##0.00)"),
        41 => Some("_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)"),
        42 => Some("_($* #,##0_);_($* (#,##0);_($* \"-\"_);_(@_)"),
        43 => Some("_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)"),
        44 => Some("_($* #,##0.00_);_($* (#,##0.00);_($* \"-\"??_);_(@_)"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mm:ss.0"),
        48 => Some("##0.0E+0"),
        49 => Some("@"),
        _ => None,
    }
}
