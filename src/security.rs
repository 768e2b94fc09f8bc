//! Security Module
//!
//! 入力ファイルをメモリに読み込む前のサイズ制限と、ZIP bomb対策を提供します。
//! ワークブックもCSVも全体をメモリに展開して処理するため、上限を超える
//! ファイルは読み込み前に拒否します。

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::error::RemapError;

/// 入力ファイルの最大サイズのデフォルト値（バイト）
///
/// デフォルト: 2GB (2_147_483_648 bytes)
pub const DEFAULT_MAX_INPUT_FILE_SIZE: u64 = 2_147_483_648;

/// セキュリティ設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SecurityConfig {
    /// 展開後の最大サイズ（バイト）
    /// デフォルト: 1GB (1_073_741_824 bytes)
    pub max_decompressed_size: u64,
    /// ZIPアーカイブ内の最大ファイル数
    /// デフォルト: 10000
    pub max_file_count: usize,
    /// 単一ファイルの最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_file_size: u64,
    /// 入力ファイルの最大サイズ（バイト）
    pub max_input_file_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824, // 1GB
            max_file_count: 10_000,
            max_file_size: 104_857_600, // 100MB
            max_input_file_size: DEFAULT_MAX_INPUT_FILE_SIZE,
        }
    }
}

impl SecurityConfig {
    pub fn with_max_input_file_size(max_input_file_size: u64) -> Self {
        Self {
            max_input_file_size,
            ..Self::default()
        }
    }

    /// ワークブック（ZIPアーカイブ）のエントリ数と展開後サイズを検査
    ///
    /// サイズはセントラルディレクトリに記録された展開後サイズで判定します。
    ///
    /// # 戻り値
    ///
    /// * `Ok(())` - すべての上限内の場合
    /// * `Err(RemapError::Open)` - エントリを読めない場合
    /// * `Err(RemapError::SecurityViolation)` - 上限を超えた場合
    pub fn check_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        source: &Path,
    ) -> Result<(), RemapError> {
        if archive.len() > self.max_file_count {
            return Err(RemapError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} in {} (max: {})",
                archive.len(),
                source.display(),
                self.max_file_count
            )));
        }

        let mut total_decompressed_size = 0u64;
        for i in 0..archive.len() {
            let file = archive.by_index(i).map_err(|e| RemapError::open(source, e))?;

            let file_size = file.size();
            if file_size > self.max_file_size {
                return Err(RemapError::SecurityViolation(format!(
                    "File '{}' in {} exceeds maximum size: {} bytes (max: {} bytes)",
                    file.name(),
                    source.display(),
                    file_size,
                    self.max_file_size
                )));
            }

            total_decompressed_size = total_decompressed_size.saturating_add(file_size);
            if total_decompressed_size > self.max_decompressed_size {
                return Err(RemapError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} (max: {} bytes)",
                    source.display(),
                    self.max_decompressed_size
                )));
            }
        }

        Ok(())
    }

    /// ファイル全体を読み込む（サイズ制限付き）
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<u8>)` - ファイルの内容
    /// * `Err(RemapError::Open)` - ファイルを開けない場合
    /// * `Err(RemapError::Read)` - 読み込みに失敗した場合
    /// * `Err(RemapError::SecurityViolation)` - サイズ上限を超えた場合
    pub fn read_limited(&self, path: &Path) -> Result<Vec<u8>, RemapError> {
        let file = File::open(path).map_err(|e| RemapError::open(path, e))?;

        // 上限+1バイトまで読み、超過を検出する
        let mut buffer = Vec::new();
        let bytes_read = file
            .take(self.max_input_file_size.saturating_add(1))
            .read_to_end(&mut buffer)
            .map_err(|e| RemapError::read(path, e))?;

        if bytes_read as u64 > self.max_input_file_size {
            return Err(RemapError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} (max: {} bytes)",
                path.display(),
                self.max_input_file_size
            )));
        }

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;
    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn archive_with(entries: &[(&str, usize)]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, size) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(&vec![b'x'; *size]).unwrap();
        }
        let cursor = zip.finish().unwrap();
        ZipArchive::new(cursor).unwrap()
    }

    #[test]
    fn test_read_limited_within_limit() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"id,status\n1,open\n").unwrap();

        let config = SecurityConfig::with_max_input_file_size(1024);
        let data = config.read_limited(file.path()).unwrap();
        assert_eq!(data, b"id,status\n1,open\n");
    }

    #[test]
    fn test_read_limited_exact_limit() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"12345").unwrap();

        let config = SecurityConfig::with_max_input_file_size(5);
        assert!(config.read_limited(file.path()).is_ok());
    }

    #[test]
    fn test_read_limited_exceeds_limit() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"123456").unwrap();

        let config = SecurityConfig::with_max_input_file_size(5);
        match config.read_limited(file.path()) {
            Err(RemapError::SecurityViolation(msg)) => {
                assert!(msg.contains("exceeds maximum"));
            }
            other => panic!("Expected SecurityViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_read_limited_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = SecurityConfig::default();
        let result = config.read_limited(&dir.path().join("missing.csv"));
        assert!(matches!(result, Err(RemapError::Open { .. })));
    }

    #[test]
    fn test_check_archive_within_limits() {
        let mut archive = archive_with(&[("xl/workbook.xml", 10), ("xl/styles.xml", 10)]);
        let config = SecurityConfig::default();
        assert!(config.check_archive(&mut archive, Path::new("a.xlsx")).is_ok());
    }

    #[test]
    fn test_check_archive_too_many_files() {
        let mut archive = archive_with(&[("a.xml", 1), ("b.xml", 1), ("c.xml", 1)]);
        let config = SecurityConfig {
            max_file_count: 2,
            ..SecurityConfig::default()
        };
        match config.check_archive(&mut archive, Path::new("a.xlsx")) {
            Err(RemapError::SecurityViolation(msg)) => assert!(msg.contains("too many files")),
            other => panic!("Expected SecurityViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_check_archive_entry_too_large() {
        let mut archive = archive_with(&[("xl/worksheets/sheet1.xml", 64)]);
        let config = SecurityConfig {
            max_file_size: 32,
            ..SecurityConfig::default()
        };
        match config.check_archive(&mut archive, Path::new("a.xlsx")) {
            Err(RemapError::SecurityViolation(msg)) => {
                assert!(msg.contains("xl/worksheets/sheet1.xml"));
            }
            other => panic!("Expected SecurityViolation, got {:?}", other),
        }
    }

    #[test]
    fn test_check_archive_total_too_large() {
        let mut archive = archive_with(&[("a.xml", 30), ("b.xml", 30)]);
        let config = SecurityConfig {
            max_decompressed_size: 50,
            ..SecurityConfig::default()
        };
        let result = config.check_archive(&mut archive, Path::new("a.xlsx"));
        assert!(matches!(result, Err(RemapError::SecurityViolation(_))));
    }
}
