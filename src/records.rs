//! CSV Records Module
//!
//! CSVファイルをレコード列として読み書きする。
//! レコードの長さは揃っていなくてもよい（flexible）。

use std::path::Path;

use crate::error::RemapError;
use crate::security::SecurityConfig;

/// CSVファイル全体をレコード列として読み込む
///
/// 先頭行もヘッダーとして区別せず、1つのレコードとして返します。
/// 空行は読み飛ばされます。
pub(crate) fn read_records(
    path: &Path,
    security: &SecurityConfig,
) -> Result<Vec<Vec<String>>, RemapError> {
    let buffer = security.read_limited(path)?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(buffer.as_slice());

    reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(|e| RemapError::read(path, e))
        })
        .collect()
}

/// レコード列をCSVファイルに書き出す
///
/// 出力先は作成または切り詰められます。
pub(crate) fn write_records<S: AsRef<[u8]>>(
    path: &Path,
    rows: &[Vec<S>],
) -> Result<(), RemapError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| RemapError::write(path, e))?;

    for row in rows {
        writer
            .write_record(row)
            .map_err(|e| RemapError::write(path, e))?;
    }

    writer.flush().map_err(|e| RemapError::write(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_records_ragged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let rows = vec![
            vec!["id", "status", "note"],
            vec!["1", "open"],
            vec!["2", "a,b", "say \"hi\""],
        ];

        write_records(&path, &rows).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "id,status,note\n1,open\n2,\"a,b\",\"say \"\"hi\"\"\"\n"
        );
    }

    #[test]
    fn test_write_records_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "old,content,that,is,longer\n").unwrap();

        write_records(&path, &[vec!["a"]]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\n");
    }

    #[test]
    fn test_write_records_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let result = write_records(&path, &[vec!["a"]]);
        assert!(matches!(result, Err(RemapError::Write { .. })));
    }

    #[test]
    fn test_read_records_flexible_and_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.csv");
        std::fs::write(&path, "id,status\n1,\"open, maybe\"\n\n2\n").unwrap();

        let records = read_records(&path, &SecurityConfig::default()).unwrap();
        assert_eq!(
            records,
            vec![vec!["id", "status"], vec!["1", "open, maybe"], vec!["2"]]
        );
    }

    #[test]
    fn test_read_records_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        std::fs::write(&path, "").unwrap();

        let records = read_records(&path, &SecurityConfig::default()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_read_records_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.csv");
        std::fs::write(&path, b"id,status\n1,\xff\xfe\n").unwrap();

        let result = read_records(&path, &SecurityConfig::default());
        assert!(matches!(result, Err(RemapError::Read { .. })));
    }
}
