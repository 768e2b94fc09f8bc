//! FormatToken Module
//!
//! Excel Number Format Stringのトークン定義を提供します。

/// 経過時間の単位（`[h]`, `[mm]`, `[ss]`）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElapsedUnit {
    Hours,
    Minutes,
    Seconds,
}

/// フォーマットトークン
///
/// Excel Number Format Stringを解析した際に生成されるトークンです。
/// 数字プレースホルダーは小数点の前後で別のトークンになります。
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FormatToken {
    /// 年（"yy" -> 2桁, "yyyy" -> 4桁）
    Year(usize),

    /// 月（"m", "mm", "mmm" -> Jan, "mmmm" -> January, "mmmmm" -> J）
    Month(usize),

    /// 日（"d", "dd", "ddd" -> Mon, "dddd" -> Monday）
    Day(usize),

    /// 時（"h", "hh"）
    Hour(usize),

    /// 分（"m", "mm"）
    /// 時の直後、または秒の直前にある"m"は分として扱う
    Minute(usize),

    /// 秒（"s", "ss"）
    Second(usize),

    /// 秒の小数部（"ss.00"の"00"）
    SubSecond(usize),

    /// 午前・午後（`true`: "AM/PM", `false`: "A/P"）
    AmPm(bool),

    /// 経過時間（"[h]", "[mm]", "[ss]"）
    Elapsed(ElapsedUnit, usize),

    /// 整数部の"0"（桁が無ければ0を表示）
    IntegerZero(usize),

    /// 整数部の"#"または"?"（桁が無ければ何も表示しない）
    IntegerHash(usize),

    /// 小数点
    DecimalPoint,

    /// 小数部の"0"
    DecimalZero(usize),

    /// 小数部の"#"または"?"
    DecimalHash(usize),

    /// 千の位区切り（整数部の桁の間の","）
    ThousandSeparator,

    /// 1000で割る（整数部の末尾の","）
    ThousandScale,

    /// パーセント記号（値を100倍する）
    Percent,

    /// 指数表記（"E+00"）
    Exponent,

    /// リテラル文字列（例: "$", "-", " kg"）
    Literal(String),

    /// 色指定（例: "[Red]"）。出力には影響しない
    Color(String),

    /// テキストプレースホルダー（"@"）
    TextPlaceholder,

    /// "General"
    General,
}

impl FormatToken {
    /// トークンが日付・時刻関連かどうかを判定
    pub fn is_datetime(&self) -> bool {
        matches!(
            self,
            FormatToken::Year(_)
                | FormatToken::Month(_)
                | FormatToken::Day(_)
                | FormatToken::Hour(_)
                | FormatToken::Minute(_)
                | FormatToken::Second(_)
                | FormatToken::SubSecond(_)
                | FormatToken::AmPm(_)
                | FormatToken::Elapsed(..)
        )
    }

    /// トークンが数字プレースホルダーかどうかを判定
    pub fn is_digit(&self) -> bool {
        matches!(
            self,
            FormatToken::IntegerZero(_)
                | FormatToken::IntegerHash(_)
                | FormatToken::DecimalZero(_)
                | FormatToken::DecimalHash(_)
        )
    }

    /// トークンが整数部のプレースホルダーかどうかを判定
    pub fn is_integer_digit(&self) -> bool {
        matches!(self, FormatToken::IntegerZero(_) | FormatToken::IntegerHash(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_datetime() {
        assert!(FormatToken::Year(4).is_datetime());
        assert!(FormatToken::Month(2).is_datetime());
        assert!(FormatToken::Minute(2).is_datetime());
        assert!(FormatToken::AmPm(true).is_datetime());
        assert!(FormatToken::Elapsed(ElapsedUnit::Hours, 1).is_datetime());
        assert!(!FormatToken::IntegerZero(1).is_datetime());
        assert!(!FormatToken::Literal("/".to_string()).is_datetime());
    }

    #[test]
    fn test_is_digit() {
        assert!(FormatToken::IntegerZero(3).is_digit());
        assert!(FormatToken::DecimalHash(1).is_digit());
        assert!(FormatToken::IntegerHash(1).is_integer_digit());
        assert!(!FormatToken::DecimalZero(2).is_integer_digit());
        assert!(!FormatToken::Percent.is_digit());
        assert!(!FormatToken::ThousandSeparator.is_digit());
    }
}
