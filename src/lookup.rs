//! Lookup Table Module
//!
//! 列の値を置換するための静的な対応表。
//! `values[i]`が`overwrite[i]`に対応し、一致しない値は`default`に置換されます。

/// 値の置換表
///
/// 起動時に一度だけ構築され、以降は読み取り専用です。
///
/// # 使用例
///
/// ```rust
/// use xlsxremap::LookupTable;
///
/// let table = LookupTable::new(
///     vec!["open".to_string(), "closed".to_string()],
///     vec!["ACTIVE".to_string(), "DONE".to_string()],
///     "UNKNOWN",
/// );
///
/// assert_eq!(table.remap("open"), "ACTIVE");
/// assert_eq!(table.remap("pending"), "UNKNOWN");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LookupTable {
    values: Vec<String>,
    overwrite: Vec<String>,
    default: String,
}

impl LookupTable {
    pub fn new(values: Vec<String>, overwrite: Vec<String>, default: impl Into<String>) -> Self {
        Self {
            values,
            overwrite,
            default: default.into(),
        }
    }

    /// カンマ区切りの文字列から置換表を生成する
    ///
    /// 各要素はトリムされず、空要素も保持されます（`"a,,b"`は3要素）。
    pub fn from_lists(values: &str, overwrite: &str, default: impl Into<String>) -> Self {
        Self::new(split_list(values), split_list(overwrite), default)
    }

    /// 元の値を置換後の値に変換する
    ///
    /// `values`を先頭から走査し、最初に一致した位置`i`について
    /// `overwrite[i]`を返します。一致しない場合、または`i`が`overwrite`の
    /// 範囲外の場合は`default`を返します。
    pub fn remap(&self, original: &str) -> &str {
        self.values
            .iter()
            .position(|v| v == original)
            .and_then(|i| self.overwrite.get(i))
            .unwrap_or(&self.default)
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn overwrite(&self) -> &[String] {
        &self.overwrite
    }

    pub fn default_value(&self) -> &str {
        &self.default
    }

    /// `values`の要素数が`overwrite`を上回るか
    ///
    /// 上回る分の値はすべて`default`に置換されます。
    pub fn has_unmapped_values(&self) -> bool {
        self.values.len() > self.overwrite.len()
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn status_table() -> LookupTable {
        LookupTable::from_lists("open,closed", "ACTIVE,DONE", "UNKNOWN")
    }

    #[test]
    fn test_remap_match() {
        let table = status_table();
        assert_eq!(table.remap("open"), "ACTIVE");
        assert_eq!(table.remap("closed"), "DONE");
    }

    #[test]
    fn test_remap_fallback() {
        let table = status_table();
        assert_eq!(table.remap("pending"), "UNKNOWN");
        assert_eq!(table.remap(""), "UNKNOWN");
        // 大文字小文字は区別する
        assert_eq!(table.remap("Open"), "UNKNOWN");
    }

    #[test]
    fn test_first_match_wins() {
        let table = LookupTable::from_lists("a,b,a", "1,2,3", "D");
        assert_eq!(table.remap("a"), "1");
    }

    #[test]
    fn test_overwrite_shorter_than_values() {
        let table = LookupTable::from_lists("a,b,c", "1", "D");
        assert!(table.has_unmapped_values());
        assert_eq!(table.remap("a"), "1");
        assert_eq!(table.remap("b"), "D");
        assert_eq!(table.remap("c"), "D");
    }

    #[test]
    fn test_from_lists_keeps_empty_and_untrimmed_items() {
        let table = LookupTable::from_lists("a,, b", "x,y,z", "D");
        assert_eq!(table.values(), &["a", "", " b"]);
        assert_eq!(table.remap(""), "y");
        assert_eq!(table.remap(" b"), "z");
        assert_eq!(table.remap("b"), "D");
    }

    proptest! {
        #[test]
        fn prop_values_map_to_overwrite(
            values in proptest::collection::vec("[a-z]{1,6}", 1..8),
            extra in 0usize..3,
            candidate in "[A-Z]{1,6}",
        ) {
            let overwrite: Vec<String> = (0..values.len() + extra)
                .map(|i| format!("out{}", i))
                .collect();
            let table = LookupTable::new(values.clone(), overwrite.clone(), "DEFAULT");

            for v in &values {
                let first = values.iter().position(|x| x == v).unwrap();
                prop_assert_eq!(table.remap(v), overwrite[first].as_str());
            }
            // 小文字のみのvaluesに大文字のcandidateは一致しない
            prop_assert_eq!(table.remap(&candidate), "DEFAULT");
        }

        #[test]
        fn prop_out_of_range_index_falls_back(
            values in proptest::collection::vec("[a-z]{1,6}", 2..8),
            cut in 0usize..2,
        ) {
            let overwrite: Vec<String> = (0..cut).map(|i| format!("out{}", i)).collect();
            let table = LookupTable::new(values.clone(), overwrite.clone(), "DEFAULT");

            for v in &values {
                let first = values.iter().position(|x| x == v).unwrap();
                let expected = overwrite.get(first).map(String::as_str).unwrap_or("DEFAULT");
                prop_assert_eq!(table.remap(v), expected);
            }
        }
    }
}
