//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーメッセージのフォーマットを実現する。

use std::path::PathBuf;
use thiserror::Error;

/// xlsxremapクレート全体で使用するエラー型
///
/// 設定の読み込み、ディレクトリ操作、ワークブックの抽出、CSVの列変換中に
/// 発生するすべてのエラーを統一的に扱うために使用されます。
/// ファイルに関するエラーは、原因となったパスを保持します。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxremap::{ConfigBuilder, Dispatcher, RemapError};
///
/// # fn main() -> Result<(), RemapError> {
/// let config = ConfigBuilder::new()
///     .with_docs_dir("docs")
///     .with_output_dir("out")
///     .with_column_name("status")
///     .build()?;
///
/// match Dispatcher::new(config).run() {
///     Err(RemapError::DirectoryCreate { path, .. }) => {
///         eprintln!("cannot create {}", path.display());
///     }
///     Err(e) => return Err(e),
///     Ok(summary) => println!("{} files processed", summary.processed.len()),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Error, Debug)]
pub enum RemapError {
    /// 必須の設定キーが存在しない、または空文字列
    #[error("{0} is not set")]
    ConfigMissing(String),

    /// 設定値が不正
    ///
    /// 任意キーの値が認識できない場合や、`.env`ファイルの書式が
    /// 不正な場合に発生します。
    #[error("Configuration error: {0}")]
    Config(String),

    /// 出力ディレクトリの作成に失敗した
    #[error("cannot create folder {}: {source}", path.display())]
    DirectoryCreate {
        /// 作成しようとしたディレクトリ
        path: PathBuf,
        /// 元のI/Oエラー
        #[source]
        source: std::io::Error,
    },

    /// 入力ディレクトリの列挙に失敗した
    #[error("failed to list files in {}: {source}", path.display())]
    DirectoryRead {
        /// 列挙しようとしたディレクトリ
        path: PathBuf,
        /// 元のI/Oエラー
        #[source]
        source: std::io::Error,
    },

    /// ワークブックにシートが1つも存在しない
    #[error("no sheets in {}", path.display())]
    NoSheets {
        /// ワークブックのパス
        path: PathBuf,
    },

    /// 入力ファイルを開けない、またはワークブックとして解析できない
    #[error("failed to open {}: {reason}", path.display())]
    Open {
        /// 入力ファイルのパス
        path: PathBuf,
        /// 失敗の詳細
        reason: String,
    },

    /// シートの行、またはCSVレコードの読み込みに失敗した
    #[error("failed to read {}: {reason}", path.display())]
    Read {
        /// 入力ファイルのパス
        path: PathBuf,
        /// 失敗の詳細
        reason: String,
    },

    /// 出力ファイルへの書き込みに失敗した
    #[error("failed to write {}: {reason}", path.display())]
    Write {
        /// 出力ファイルのパス
        path: PathBuf,
        /// 失敗の詳細
        reason: String,
    },

    /// CSVファイルにレコードが1つも存在しない
    #[error("empty CSV: {}", path.display())]
    EmptyFile {
        /// CSVファイルのパス
        path: PathBuf,
    },

    /// ヘッダー行に対象の列名が存在しない
    #[error("column {column} not found in {}", path.display())]
    ColumnNotFound {
        /// 探索した列名
        column: String,
        /// CSVファイルのパス
        path: PathBuf,
    },

    /// データ行のセル数が対象列に届かない
    ///
    /// `row`はヘッダーを0行目とした行番号です。
    #[error(
        "row {row} of {} has {len} cells, column index {column} is out of range",
        path.display()
    )]
    MalformedRow {
        /// CSVファイルのパス
        path: PathBuf,
        /// 行番号（ヘッダー = 0）
        row: usize,
        /// 行のセル数
        len: usize,
        /// 対象列のインデックス（0始まり）
        column: usize,
    },

    /// 同じ実行内の別のファイルと変換結果の出力先が重なる
    ///
    /// `report.csv`と`report.xlsx`のように、ベース名が同じで
    /// 出力ファイル名も一致する場合に発生します。列挙順で先のファイルだけが処理されます。
    #[error(
        "output {} of {} is already produced by {}",
        target.display(),
        path.display(),
        first.display()
    )]
    OutputConflict {
        /// 処理しなかった入力ファイル
        path: PathBuf,
        /// 重なった出力ファイル
        target: PathBuf,
        /// 先に出力先を使う入力ファイル
        first: PathBuf,
    },

    /// セキュリティ制限に違反したエラー
    ///
    /// 入力ファイルやワークブック内のエントリがサイズ上限を超えた場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

impl RemapError {
    /// 原因を文字列化して読み込みエラーを生成する
    pub(crate) fn read(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        RemapError::Read {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        RemapError::Write {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn open(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        RemapError::Open {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}
