//! Config Module
//!
//! 実行設定を保持する不変の`Config`と、それを段階的に構築する
//! Fluent Builder APIを提供する。環境変数（および`.env`ファイル）からの
//! 読み込みもここで行う。

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::api::{ErrorPolicy, ShortRowPolicy};
use crate::error::RemapError;
use crate::lookup::LookupTable;
use crate::security::SecurityConfig;

/// 出力ルートディレクトリ
pub const KEY_DATA_OUTPUT_DIR: &str = "DATA_OUTPUT_DIR";
/// 入力ディレクトリ
pub const KEY_DOCS_DIR: &str = "DOCS_DIR";
/// 置換対象の列名
pub const KEY_COLUMN_NAME: &str = "COLUMN_NAME";
/// 置換元の値（カンマ区切り）
pub const KEY_VALUES: &str = "VALUES";
/// 置換後の値（カンマ区切り）
pub const KEY_OVERWRITE: &str = "OVERWRITE";
/// 一致しない場合の値
pub const KEY_DEFAULT: &str = "DEFAULT";
/// 短い行の扱い（任意: `reject` / `pad`）
pub const KEY_SHORT_ROWS: &str = "SHORT_ROWS";
/// 失敗時の振る舞い（任意: `continue` / `halt`）
pub const KEY_ON_ERROR: &str = "ON_ERROR";
/// ファイル単位の並列処理（任意: `true` / `false`）
pub const KEY_PARALLEL: &str = "PARALLEL";

/// 実行設定
///
/// 起動時に一度だけ構築され、各コンポーネントには参照として渡されます。
#[derive(Debug, Clone)]
pub struct Config {
    output_dir: PathBuf,
    docs_dir: PathBuf,
    column_name: String,
    lookup: LookupTable,
    short_rows: ShortRowPolicy,
    on_error: ErrorPolicy,
    parallel: bool,
    pub(crate) security: SecurityConfig,
}

impl Config {
    /// `.env`ファイルとプロセス環境変数から設定を読み込む
    ///
    /// `.env`が存在しない場合は警告を出してプロセス環境変数のみを使用します。
    /// `.env`の値は既存の環境変数を上書きしません。
    ///
    /// # 戻り値
    ///
    /// * `Ok(Config)` - すべての必須キーが設定されている場合
    /// * `Err(RemapError::ConfigMissing)` - 必須キーが存在しない、または空の場合
    /// * `Err(RemapError::Config)` - `.env`の書式や任意キーの値が不正な場合
    pub fn from_env() -> Result<Self, RemapError> {
        load_dotenv(dotenvy::dotenv().map(|_| ()))?;
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// 指定した`.env`ファイルとプロセス環境変数から設定を読み込む
    pub fn from_env_file(path: &Path) -> Result<Self, RemapError> {
        load_dotenv(dotenvy::from_path(path))?;
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// 任意のキー検索関数から設定を読み込む
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use std::collections::HashMap;
    /// use xlsxremap::Config;
    ///
    /// let vars: HashMap<&str, &str> = [
    ///     ("DATA_OUTPUT_DIR", "out"),
    ///     ("DOCS_DIR", "docs"),
    ///     ("COLUMN_NAME", "status"),
    ///     ("VALUES", "open,closed"),
    ///     ("OVERWRITE", "ACTIVE,DONE"),
    ///     ("DEFAULT", "UNKNOWN"),
    /// ]
    /// .into_iter()
    /// .collect();
    ///
    /// let config = Config::from_source(|key| vars.get(key).map(|v| v.to_string())).unwrap();
    /// assert_eq!(config.column_name(), "status");
    /// assert_eq!(config.lookup().remap("closed"), "DONE");
    /// ```
    pub fn from_source<F>(get: F) -> Result<Self, RemapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, RemapError> {
            get(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| RemapError::ConfigMissing(key.to_string()))
        };

        let output_dir = required(KEY_DATA_OUTPUT_DIR)?;
        let docs_dir = required(KEY_DOCS_DIR)?;
        let column_name = required(KEY_COLUMN_NAME)?;
        let values = required(KEY_VALUES)?;
        let overwrite = required(KEY_OVERWRITE)?;
        let default = required(KEY_DEFAULT)?;

        let mut builder = ConfigBuilder::new()
            .with_output_dir(output_dir)
            .with_docs_dir(docs_dir)
            .with_column_name(column_name)
            .with_lookup(LookupTable::from_lists(&values, &overwrite, default));

        if let Some(v) = get(KEY_SHORT_ROWS).filter(|v| !v.is_empty()) {
            builder = builder.with_short_row_policy(v.parse()?);
        }
        if let Some(v) = get(KEY_ON_ERROR).filter(|v| !v.is_empty()) {
            builder = builder.with_error_policy(v.parse()?);
        }
        if let Some(v) = get(KEY_PARALLEL).filter(|v| !v.is_empty()) {
            builder = builder.parallel(parse_bool(KEY_PARALLEL, &v)?);
        }

        builder.build()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }

    pub fn lookup(&self) -> &LookupTable {
        &self.lookup
    }

    pub fn short_row_policy(&self) -> ShortRowPolicy {
        self.short_rows
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.on_error
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// 一部の設定だけを差し替えるためのビルダーに戻す
    ///
    /// CLIのフラグで環境変数の値を上書きする場合に使用します。
    pub fn into_builder(self) -> ConfigBuilder {
        ConfigBuilder { config: self }
    }
}

fn load_dotenv<T>(result: Result<T, dotenvy::Error>) -> Result<(), RemapError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => {
            warn!(".env not found, using system environment variables");
            Ok(())
        }
        Err(e) => Err(RemapError::Config(format!("failed to load .env: {}", e))),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, RemapError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(RemapError::Config(format!(
            "Invalid {} value: '{}' (expected true or false)",
            key, other
        ))),
    }
}

/// Fluent Builder APIを提供する構造体
///
/// 必須項目（出力ディレクトリ、入力ディレクトリ、列名）は`build()`時に検証されます。
///
/// # 使用例
///
/// ```rust
/// use xlsxremap::{ConfigBuilder, ErrorPolicy, LookupTable, ShortRowPolicy};
///
/// # fn main() -> Result<(), xlsxremap::RemapError> {
/// let config = ConfigBuilder::new()
///     .with_docs_dir("docs")
///     .with_output_dir("out")
///     .with_column_name("status")
///     .with_lookup(LookupTable::from_lists("open,closed", "ACTIVE,DONE", "UNKNOWN"))
///     .with_short_row_policy(ShortRowPolicy::Pad)
///     .with_error_policy(ErrorPolicy::Halt)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    /// 内部設定（構築中）
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 置換表: 空（すべての値が空文字列に置換される）
    /// - 短い行: `ShortRowPolicy::Reject`
    /// - 失敗時: `ErrorPolicy::Continue`
    /// - 並列処理: 無効
    pub fn new() -> Self {
        Self {
            config: Config {
                output_dir: PathBuf::new(),
                docs_dir: PathBuf::new(),
                column_name: String::new(),
                lookup: LookupTable::default(),
                short_rows: ShortRowPolicy::default(),
                on_error: ErrorPolicy::default(),
                parallel: false,
                security: SecurityConfig::default(),
            },
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn with_docs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.docs_dir = dir.into();
        self
    }

    pub fn with_column_name(mut self, name: impl Into<String>) -> Self {
        self.config.column_name = name.into();
        self
    }

    pub fn with_lookup(mut self, lookup: LookupTable) -> Self {
        self.config.lookup = lookup;
        self
    }

    pub fn with_short_row_policy(mut self, policy: ShortRowPolicy) -> Self {
        self.config.short_rows = policy;
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.config.on_error = policy;
        self
    }

    /// ファイル単位の並列処理を有効にする
    ///
    /// 結果は常に列挙順に並べ直されます。
    pub fn parallel(mut self, enable: bool) -> Self {
        self.config.parallel = enable;
        self
    }

    /// 入力ファイルの最大サイズ（バイト）を指定する
    pub fn with_max_input_file_size(mut self, bytes: u64) -> Self {
        self.config.security = SecurityConfig::with_max_input_file_size(bytes);
        self
    }

    /// 設定を検証し、`Config`インスタンスを生成する
    ///
    /// # 発生し得るエラー
    ///
    /// * `RemapError::ConfigMissing` - 必須項目が空の場合（キー名を含む）
    pub fn build(self) -> Result<Config, RemapError> {
        if self.config.output_dir.as_os_str().is_empty() {
            return Err(RemapError::ConfigMissing(KEY_DATA_OUTPUT_DIR.to_string()));
        }
        if self.config.docs_dir.as_os_str().is_empty() {
            return Err(RemapError::ConfigMissing(KEY_DOCS_DIR.to_string()));
        }
        if self.config.column_name.is_empty() {
            return Err(RemapError::ConfigMissing(KEY_COLUMN_NAME.to_string()));
        }

        Ok(self.config)
    }
}
