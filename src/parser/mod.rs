//! Parser Module
//!
//! calamineを使用したワークブック解析の実装。
//! 最初のシートの行を、セルの書式を適用した表示文字列として取り出します。

mod metadata;
mod workbook;

pub(crate) use workbook::WorkbookParser;
