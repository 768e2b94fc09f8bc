//! Workbook Parser
//!
//! calamineのラッパーとして、ワークブックレベルの操作を提供します。

use calamine::{open_workbook_auto_from_rs, Data, Range, Reader, Sheets, Xlsx};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use super::metadata::WorkbookMetadata;
use crate::error::RemapError;
use crate::formatter::CellFormatter;
use crate::security::SecurityConfig;

/// ワークブックパーサー
///
/// XLSX形式のみサポートします。エラーには元ファイルのパスを付与します。
pub(crate) struct WorkbookParser<R: Read + Seek> {
    /// calamineのワークブック
    workbook: Xlsx<R>,
    /// セルの書式と日付エポック
    metadata: WorkbookMetadata,
    /// エラー報告用の元ファイルパス
    source: PathBuf,
}

impl<R: Read + Seek + Clone> WorkbookParser<R> {
    /// ワークブックを開く
    ///
    /// # 引数
    ///
    /// * `reader` - ワークブックのバイト列を読み込むリーダー
    /// * `source` - エラーメッセージに含める元ファイルのパス
    /// * `security` - アーカイブの展開サイズ上限
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookParser)` - XLSXとして解析できた場合
    /// * `Err(RemapError::Open)` - 解析に失敗した場合、またはXLSX以外の形式の場合
    /// * `Err(RemapError::SecurityViolation)` - アーカイブが上限を超える場合
    pub fn open(reader: R, source: &Path, security: &SecurityConfig) -> Result<Self, RemapError> {
        let metadata = WorkbookMetadata::read(reader.clone(), source, security)?;
        let sheets = open_workbook_auto_from_rs(reader).map_err(|e| RemapError::open(source, e))?;
        match sheets {
            Sheets::Xlsx(workbook) => Ok(Self {
                workbook,
                metadata,
                source: source.to_path_buf(),
            }),
            _ => Err(RemapError::open(source, "only XLSX workbooks are supported")),
        }
    }
}

impl<R: Read + Seek> WorkbookParser<R> {
    /// 宣言順のシート名を取得
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    /// 最初のシートの全行を表示文字列として読み込む
    ///
    /// 数値・日付のセルには、セルに設定されたNumber Format Stringを適用します。
    /// 各行は末尾の空セルを除いた可変長で、パディングは行いません。
    /// シートの使用範囲より左の空列は空セルとして再現し、列位置をA列起点に
    /// 合わせます。
    ///
    /// すべてのセルが空の行（途中の空行を含む）は結果に含めません。
    /// CSVの空行はレコードとして読まれないため、出力しても下流では
    /// 同じ結果になります。そのため行番号はシートの行番号と一致しません。
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<Vec<String>>)` - 行のリスト（元の順序）
    /// * `Err(RemapError::NoSheets)` - シートが存在しない場合
    /// * `Err(RemapError::Read)` - シートの読み込みに失敗した場合
    pub fn first_sheet_rows(&mut self) -> Result<Vec<Vec<String>>, RemapError> {
        let first = self
            .sheet_names()
            .into_iter()
            .next()
            .ok_or_else(|| RemapError::NoSheets {
                path: self.source.clone(),
            })?;

        let range = self
            .workbook
            .worksheet_range(&first)
            .map_err(|e| RemapError::read(&self.source, e))?;

        Ok(rows_from_range(&range, &self.metadata))
    }
}

fn rows_from_range(range: &Range<Data>, metadata: &WorkbookMetadata) -> Vec<Vec<String>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };

    let formatter = CellFormatter::with_1904(metadata.is_1904());
    let mut rows = Vec::with_capacity(range.height());
    for (offset, row) in range.rows().enumerate() {
        // シート上の絶対位置で書式を引く
        let sheet_row = start_row + offset as u32;
        let cells = formatter.format_row(row, |col| {
            metadata.format_for(sheet_row, start_col + col as u32)
        });
        if cells.is_empty() {
            continue;
        }
        if start_col == 0 {
            rows.push(cells);
            continue;
        }

        let mut shifted = vec![String::new(); start_col as usize];
        shifted.extend(cells);
        rows.push(shifted);
    }

    rows
}
