//! Spreadsheet Extractor
//!
//! ワークブックの最初のシートをCSVファイルへ書き出すモジュール。

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use tracing::debug;

use crate::error::RemapError;
use crate::parser::WorkbookParser;
use crate::records::write_records;
use crate::security::SecurityConfig;

/// ワークブックの最初のシートを読み込む
///
/// 数値・日付はセルの書式を適用した表示文字列になります。
/// 各行は末尾の空セルを除いた可変長のセル列です。空行は含みません。
///
/// # 引数
///
/// * `reader` - ワークブックのバイト列を読み込むリーダー
/// * `source` - エラーメッセージに含める元ファイルのパス
///
/// # 使用例
///
/// ```rust,no_run
/// use std::io::Cursor;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let path = Path::new("report.xlsx");
/// let bytes = std::fs::read(path)?;
/// let rows = xlsxremap::read_first_sheet(Cursor::new(bytes), path)?;
/// println!("{} rows", rows.len());
/// # Ok(())
/// # }
/// ```
pub fn read_first_sheet<R: Read + Seek + Clone>(
    reader: R,
    source: &Path,
) -> Result<Vec<Vec<String>>, RemapError> {
    read_first_sheet_with(reader, source, &SecurityConfig::default())
}

pub(crate) fn read_first_sheet_with<R: Read + Seek + Clone>(
    reader: R,
    source: &Path,
    security: &SecurityConfig,
) -> Result<Vec<Vec<String>>, RemapError> {
    let mut parser = WorkbookParser::open(reader, source, security)?;
    parser.first_sheet_rows()
}

/// ワークブックの最初のシートをCSVに変換する
///
/// 出力先は作成または切り詰められます。シートが存在しない場合は
/// 出力ファイルを作成しません。
///
/// # 戻り値
///
/// * `Ok(usize)` - 書き出した行数
/// * `Err(RemapError::Open)` - ワークブックを解析できない場合
/// * `Err(RemapError::NoSheets)` - シートが存在しない場合
/// * `Err(RemapError::Read)` - 行の抽出に失敗した場合
/// * `Err(RemapError::Write)` - 出力に失敗した場合
pub fn extract_first_sheet(xlsx_path: &Path, csv_path: &Path) -> Result<usize, RemapError> {
    extract_first_sheet_with(xlsx_path, csv_path, &SecurityConfig::default())
}

pub(crate) fn extract_first_sheet_with(
    xlsx_path: &Path,
    csv_path: &Path,
    security: &SecurityConfig,
) -> Result<usize, RemapError> {
    let buffer = security.read_limited(xlsx_path)?;
    let rows = read_first_sheet_with(Cursor::new(buffer.as_slice()), xlsx_path, security)?;

    write_records(csv_path, &rows)?;
    debug!(
        source = %xlsx_path.display(),
        target = %csv_path.display(),
        rows = rows.len(),
        "extracted first sheet"
    );

    Ok(rows.len())
}
