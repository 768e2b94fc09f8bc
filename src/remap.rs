//! Column Remapper
//!
//! CSVの1列を置換表に従って書き換え、`sanitized_<ファイル名>`として出力するモジュール。

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::api::ShortRowPolicy;
use crate::config::Config;
use crate::error::RemapError;
use crate::lookup::LookupTable;
use crate::records::{read_records, write_records};
use crate::security::SecurityConfig;

/// 出力ファイル名の接頭辞
pub const SANITIZED_PREFIX: &str = "sanitized_";

/// 1ファイル分の列変換の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemapStats {
    /// 対象列のインデックス（0始まり）
    pub column_index: usize,
    /// 変換したデータ行の数（ヘッダーを除く）
    pub rows: usize,
    /// 値が実際に変わったセルの数
    pub changed: usize,
}

/// 列変換器
///
/// 列名・置換表・短い行の扱いを保持し、レコード列またはCSVファイルを変換します。
///
/// # 使用例
///
/// ```rust
/// use xlsxremap::{ColumnRemapper, LookupTable, ShortRowPolicy};
///
/// let lookup = LookupTable::from_lists("open,closed", "ACTIVE,DONE", "UNKNOWN");
/// let remapper = ColumnRemapper::new("status", &lookup, ShortRowPolicy::Reject);
///
/// let mut records = vec![
///     vec!["id".to_string(), "status".to_string()],
///     vec!["1".to_string(), "open".to_string()],
///     vec!["2".to_string(), "pending".to_string()],
/// ];
/// let stats = remapper.remap_records(&mut records, "tickets.csv".as_ref()).unwrap();
///
/// assert_eq!(records[1][1], "ACTIVE");
/// assert_eq!(records[2][1], "UNKNOWN");
/// assert_eq!(stats.changed, 2);
/// ```
#[derive(Debug, Clone)]
pub struct ColumnRemapper<'a> {
    column_name: &'a str,
    lookup: &'a LookupTable,
    short_rows: ShortRowPolicy,
    security: SecurityConfig,
}

impl<'a> ColumnRemapper<'a> {
    pub fn new(column_name: &'a str, lookup: &'a LookupTable, short_rows: ShortRowPolicy) -> Self {
        Self {
            column_name,
            lookup,
            short_rows,
            security: SecurityConfig::default(),
        }
    }

    /// 実行設定から変換器を生成する
    pub fn from_config(config: &'a Config) -> Self {
        Self {
            column_name: config.column_name(),
            lookup: config.lookup(),
            short_rows: config.short_row_policy(),
            security: config.security,
        }
    }

    /// ヘッダー行から対象列のインデックスを探す
    ///
    /// 左から走査し、完全一致した最初の列を返します。
    pub fn find_column(&self, header: &[String]) -> Option<usize> {
        header.iter().position(|name| name == self.column_name)
    }

    /// レコード列をその場で変換する
    ///
    /// 先頭のレコードをヘッダーとして扱い、変更しません。
    /// `source`はエラーメッセージに含めるパスです。
    ///
    /// # 戻り値
    ///
    /// * `Ok(RemapStats)` - 変換に成功した場合
    /// * `Err(RemapError::EmptyFile)` - レコードが1つも無い場合
    /// * `Err(RemapError::ColumnNotFound)` - ヘッダーに列名が無い場合
    /// * `Err(RemapError::MalformedRow)` - `ShortRowPolicy::Reject`で短い行があった場合
    pub fn remap_records(
        &self,
        records: &mut [Vec<String>],
        source: &Path,
    ) -> Result<RemapStats, RemapError> {
        let (header, rows) = records.split_first_mut().ok_or_else(|| RemapError::EmptyFile {
            path: source.to_path_buf(),
        })?;

        let column = self
            .find_column(header)
            .ok_or_else(|| RemapError::ColumnNotFound {
                column: self.column_name.to_string(),
                path: source.to_path_buf(),
            })?;

        let mut changed = 0;
        for (i, row) in rows.iter_mut().enumerate() {
            if row.len() <= column {
                match self.short_rows {
                    ShortRowPolicy::Reject => {
                        return Err(RemapError::MalformedRow {
                            path: source.to_path_buf(),
                            row: i + 1,
                            len: row.len(),
                            column,
                        });
                    }
                    ShortRowPolicy::Pad => row.resize(column + 1, String::new()),
                }
            }

            let mapped = self.lookup.remap(&row[column]);
            if mapped != row[column] {
                row[column] = mapped.to_string();
                changed += 1;
            }
        }

        Ok(RemapStats {
            column_index: column,
            rows: rows.len(),
            changed,
        })
    }

    /// CSVファイルを変換し、`out_dir/sanitized_<ファイル名>`に書き出す
    ///
    /// 検証はすべて出力ファイルの作成前に行われるため、失敗した場合に
    /// 書きかけの出力が残ることはありません。
    ///
    /// # 戻り値
    ///
    /// * `Ok((PathBuf, RemapStats))` - 出力ファイルのパスと変換結果
    /// * `Err(RemapError)` - `remap_records`のエラーに加え、
    ///   `Open` / `Read` / `Write` / `SecurityViolation`
    pub fn remap_file(
        &self,
        source: &Path,
        out_dir: &Path,
    ) -> Result<(PathBuf, RemapStats), RemapError> {
        let file_name = source
            .file_name()
            .ok_or_else(|| RemapError::open(source, "path has no file name"))?;
        let target = out_dir.join(format!(
            "{}{}",
            SANITIZED_PREFIX,
            file_name.to_string_lossy()
        ));

        let mut records = read_records(source, &self.security)?;
        let stats = self.remap_records(&mut records, source)?;
        write_records(&target, &records)?;

        debug!(
            source = %source.display(),
            target = %target.display(),
            rows = stats.rows,
            changed = stats.changed,
            "sanitized column {}",
            self.column_name
        );

        Ok((target, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn status_lookup() -> LookupTable {
        LookupTable::from_lists("open,closed", "ACTIVE,DONE", "UNKNOWN")
    }

    #[test]
    fn test_remap_records_scenario() {
        let lookup = status_lookup();
        let remapper = ColumnRemapper::new("status", &lookup, ShortRowPolicy::Reject);
        let mut records = vec![
            rec(&["id", "status"]),
            rec(&["1", "open"]),
            rec(&["2", "pending"]),
        ];

        let stats = remapper
            .remap_records(&mut records, Path::new("t.csv"))
            .unwrap();

        assert_eq!(records[0], rec(&["id", "status"]));
        assert_eq!(records[1], rec(&["1", "ACTIVE"]));
        assert_eq!(records[2], rec(&["2", "UNKNOWN"]));
        assert_eq!(
            stats,
            RemapStats {
                column_index: 1,
                rows: 2,
                changed: 2
            }
        );
    }

    #[test]
    fn test_header_is_never_transformed() {
        // 列名自体がVALUESに含まれていてもヘッダーは変わらない
        let lookup = LookupTable::from_lists("status", "X", "D");
        let remapper = ColumnRemapper::new("status", &lookup, ShortRowPolicy::Reject);
        let mut records = vec![rec(&["status"]), rec(&["status"])];

        remapper
            .remap_records(&mut records, Path::new("t.csv"))
            .unwrap();
        assert_eq!(records, vec![rec(&["status"]), rec(&["X"])]);
    }

    #[test]
    fn test_first_matching_header_column_wins() {
        let lookup = status_lookup();
        let remapper = ColumnRemapper::new("status", &lookup, ShortRowPolicy::Reject);
        let mut records = vec![rec(&["status", "status"]), rec(&["open", "open"])];

        let stats = remapper
            .remap_records(&mut records, Path::new("t.csv"))
            .unwrap();
        assert_eq!(stats.column_index, 0);
        assert_eq!(records[1], rec(&["ACTIVE", "open"]));
    }

    #[test]
    fn test_header_only() {
        let lookup = status_lookup();
        let remapper = ColumnRemapper::new("status", &lookup, ShortRowPolicy::Reject);
        let mut records = vec![rec(&["id", "status"])];

        let stats = remapper
            .remap_records(&mut records, Path::new("t.csv"))
            .unwrap();
        assert_eq!(stats.rows, 0);
        assert_eq!(stats.changed, 0);
    }

    #[test]
    fn test_empty_records() {
        let lookup = status_lookup();
        let remapper = ColumnRemapper::new("status", &lookup, ShortRowPolicy::Reject);
        let mut records: Vec<Vec<String>> = Vec::new();

        let result = remapper.remap_records(&mut records, Path::new("empty.csv"));
        assert!(matches!(result, Err(RemapError::EmptyFile { .. })));
    }

    #[test]
    fn test_column_not_found() {
        let lookup = status_lookup();
        let remapper = ColumnRemapper::new("Status", &lookup, ShortRowPolicy::Reject);
        let mut records = vec![rec(&["id", "status"]), rec(&["1", "open"])];

        match remapper.remap_records(&mut records, Path::new("t.csv")) {
            Err(RemapError::ColumnNotFound { column, .. }) => assert_eq!(column, "Status"),
            other => panic!("Expected ColumnNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_short_row_rejected() {
        let lookup = status_lookup();
        let remapper = ColumnRemapper::new("status", &lookup, ShortRowPolicy::Reject);
        let mut records = vec![
            rec(&["id", "status"]),
            rec(&["1", "open"]),
            rec(&["2"]),
        ];

        match remapper.remap_records(&mut records, Path::new("t.csv")) {
            Err(RemapError::MalformedRow {
                row, len, column, ..
            }) => {
                assert_eq!(row, 2);
                assert_eq!(len, 1);
                assert_eq!(column, 1);
            }
            other => panic!("Expected MalformedRow, got {:?}", other),
        }
    }

    #[test]
    fn test_short_row_padded() {
        let lookup = status_lookup();
        let remapper = ColumnRemapper::new("status", &lookup, ShortRowPolicy::Pad);
        let mut records = vec![rec(&["id", "note", "status"]), rec(&["2"])];

        remapper
            .remap_records(&mut records, Path::new("t.csv"))
            .unwrap();
        assert_eq!(records[1], rec(&["2", "", "UNKNOWN"]));
    }

    #[test]
    fn test_unchanged_values_are_not_counted() {
        let lookup = LookupTable::from_lists("open", "open", "UNKNOWN");
        let remapper = ColumnRemapper::new("status", &lookup, ShortRowPolicy::Reject);
        let mut records = vec![rec(&["status"]), rec(&["open"]), rec(&["UNKNOWN"])];

        let stats = remapper
            .remap_records(&mut records, Path::new("t.csv"))
            .unwrap();
        assert_eq!(stats.changed, 0);
    }

    #[test]
    fn test_remap_file_writes_sanitized_output() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tickets.csv");
        std::fs::write(&source, "id,status\n1,open\n2,closed\n3,pending\n").unwrap();
        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();

        let lookup = status_lookup();
        let remapper = ColumnRemapper::new("status", &lookup, ShortRowPolicy::Reject);
        let (target, stats) = remapper.remap_file(&source, &out_dir).unwrap();

        assert_eq!(target, out_dir.join("sanitized_tickets.csv"));
        assert_eq!(stats.rows, 3);
        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            "id,status\n1,ACTIVE\n2,DONE\n3,UNKNOWN\n"
        );
    }

    #[test]
    fn test_remap_file_failure_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("tickets.csv");
        std::fs::write(&source, "id,state\n1,open\n").unwrap();

        let lookup = status_lookup();
        let remapper = ColumnRemapper::new("status", &lookup, ShortRowPolicy::Reject);
        let result = remapper.remap_file(&source, dir.path());

        assert!(matches!(result, Err(RemapError::ColumnNotFound { .. })));
        assert!(!dir.path().join("sanitized_tickets.csv").exists());
    }
}
