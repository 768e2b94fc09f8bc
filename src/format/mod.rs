//! Number Format Module
//!
//! セルに設定されたExcel Number Format Stringを解析し、
//! Excelで表示される文字列を再現します。

mod parser;
mod sections;
mod tokens;

pub(crate) use parser::FormatParser;
