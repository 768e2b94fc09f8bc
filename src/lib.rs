//! xlsxremap - Batch XLSX-to-CSV converter with single-column value remapping
//!
//! 入力ディレクトリ内のワークブック（XLSX）をCSVに変換し、指定した1列の値を
//! 静的な置換表に従って書き換えた`sanitized_*.csv`をファイルごとの
//! 出力ディレクトリに書き出します。
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use xlsxremap::{Config, Dispatcher};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // .env とプロセス環境変数から設定を読み込む
//!     let config = Config::from_env()?;
//!
//!     // DOCS_DIR 直下のファイルをすべて処理する
//!     let summary = Dispatcher::new(config).run()?;
//!     println!("{} processed, {} failed", summary.processed.len(), summary.failed.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use xlsxremap::{ConfigBuilder, Dispatcher, ErrorPolicy, LookupTable, ShortRowPolicy};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigBuilder::new()
//!         .with_docs_dir("docs")
//!         .with_output_dir("data")
//!         .with_column_name("status")
//!         .with_lookup(LookupTable::from_lists("open,closed", "ACTIVE,DONE", "UNKNOWN"))
//!         .with_short_row_policy(ShortRowPolicy::Pad)
//!         .with_error_policy(ErrorPolicy::Halt)
//!         .parallel(true)
//!         .build()?;
//!
//!     Dispatcher::new(config).run()?;
//!     Ok(())
//! }
//! ```
//!
//! # Single Files
//!
//! ```rust,no_run
//! use std::path::Path;
//! use xlsxremap::{extract_first_sheet, ColumnRemapper, LookupTable, ShortRowPolicy};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let csv = Path::new("out/report.csv");
//!     extract_first_sheet(Path::new("report.xlsx"), csv)?;
//!
//!     let lookup = LookupTable::from_lists("open,closed", "ACTIVE,DONE", "UNKNOWN");
//!     let remapper = ColumnRemapper::new("status", &lookup, ShortRowPolicy::Reject);
//!     let (sanitized, stats) = remapper.remap_file(csv, Path::new("out"))?;
//!     println!("{}: {} cells changed", sanitized.display(), stats.changed);
//!
//!     Ok(())
//! }
//! ```

mod api;
mod config;
mod dispatch;
mod error;
mod extract;
mod format;
mod formatter;
mod lookup;
mod parser;
mod records;
mod remap;
mod security;

// 公開API
pub use api::{ErrorPolicy, FileKind, ShortRowPolicy};
pub use config::{
    Config, ConfigBuilder, KEY_COLUMN_NAME, KEY_DATA_OUTPUT_DIR, KEY_DEFAULT, KEY_DOCS_DIR,
    KEY_ON_ERROR, KEY_OVERWRITE, KEY_PARALLEL, KEY_SHORT_ROWS, KEY_VALUES,
};
pub use dispatch::{
    discover_files, Dispatcher, FailedFile, FileOutcome, FileReport, RunSummary, SkippedFile,
};
pub use error::RemapError;
pub use extract::{extract_first_sheet, read_first_sheet};
pub use lookup::LookupTable;
pub use remap::{ColumnRemapper, RemapStats, SANITIZED_PREFIX};
pub use security::DEFAULT_MAX_INPUT_FILE_SIZE;
