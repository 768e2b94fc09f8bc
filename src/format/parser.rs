//! FormatParser Module
//!
//! Excel Number Format Stringの構文解析と適用を提供します。

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use super::sections::{FormatSection, SectionKind};
use super::tokens::{ElapsedUnit, FormatToken};

const MS_PER_DAY: i64 = 86_400_000;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Number Format Stringパーサー
///
/// Excel Number Format Stringを解析し、数値をExcelの表示文字列に変換します。
#[derive(Debug, Clone)]
pub(crate) struct FormatParser {
    /// パースされたセクション（1つ以上）
    sections: Vec<FormatSection>,
}

impl FormatParser {
    /// フォーマット文字列をパース
    ///
    /// 解釈できない文字はリテラルとして扱うため、パースは失敗しません。
    pub fn parse(format_string: &str) -> Self {
        let mut sections: Vec<FormatSection> = Self::split_sections(format_string)
            .iter()
            .take(4)
            .enumerate()
            .map(|(idx, section_str)| {
                let kind = match idx {
                    0 => SectionKind::Positive,
                    1 => SectionKind::Negative,
                    2 => SectionKind::Zero,
                    _ => SectionKind::Text,
                };
                Self::parse_section(section_str, kind)
            })
            .collect();

        if sections.is_empty() {
            sections.push(FormatSection::new(SectionKind::Positive));
        }

        Self { sections }
    }

    /// セクションに分割
    ///
    /// `;`で分割します。引用符・ブラケット内とエスケープされた`;`は区切りにしません。
    fn split_sections(format_string: &str) -> Vec<String> {
        let mut sections = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;
        let mut in_brackets = false;
        let mut escaped = false;

        for ch in format_string.chars() {
            if escaped {
                escaped = false;
                current.push(ch);
                continue;
            }
            match ch {
                '\\' if !in_quotes => {
                    escaped = true;
                    current.push(ch);
                }
                '"' => {
                    in_quotes = !in_quotes;
                    current.push(ch);
                }
                '[' if !in_quotes => {
                    in_brackets = true;
                    current.push(ch);
                }
                ']' if !in_quotes => {
                    in_brackets = false;
                    current.push(ch);
                }
                ';' if !in_quotes && !in_brackets => {
                    sections.push(std::mem::take(&mut current));
                }
                _ => current.push(ch),
            }
        }

        sections.push(current);
        sections
    }

    /// セクションをパース
    fn parse_section(section_str: &str, kind: SectionKind) -> FormatSection {
        let chars: Vec<char> = section_str.chars().collect();
        let mut section = FormatSection::new(kind);
        let tokens = &mut section.tokens;
        let mut seen_decimal = false;
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            match ch {
                '"' => {
                    let end = chars[i + 1..]
                        .iter()
                        .position(|&c| c == '"')
                        .map_or(chars.len(), |p| i + 1 + p);
                    tokens.push(FormatToken::Literal(chars[i + 1..end].iter().collect()));
                    i = end + 1;
                    continue;
                }
                '\\' => {
                    if let Some(&next) = chars.get(i + 1) {
                        tokens.push(FormatToken::Literal(next.to_string()));
                    }
                    i += 2;
                    continue;
                }
                // 次の文字の幅の空白
                '_' => {
                    tokens.push(FormatToken::Literal(" ".to_string()));
                    i += 2;
                    continue;
                }
                // セル幅までの繰り返しは再現しない
                '*' => {
                    i += 2;
                    continue;
                }
                '[' => {
                    let end = chars[i + 1..]
                        .iter()
                        .position(|&c| c == ']')
                        .map_or(chars.len(), |p| i + 1 + p);
                    let content: String = chars[i + 1..end].iter().collect();
                    Self::parse_bracket(&content, tokens);
                    i = end + 1;
                    continue;
                }
                '0' | '#' | '?' => {
                    let count = Self::run_length(&chars, i, |c| c == ch);
                    let is_zero = ch == '0';
                    tokens.push(match (seen_decimal, is_zero) {
                        (false, true) => FormatToken::IntegerZero(count),
                        (false, false) => FormatToken::IntegerHash(count),
                        (true, true) => FormatToken::DecimalZero(count),
                        (true, false) => FormatToken::DecimalHash(count),
                    });
                    i += count;
                    continue;
                }
                '.' if !seen_decimal => {
                    seen_decimal = true;
                    tokens.push(FormatToken::DecimalPoint);
                }
                ',' => {
                    let after_digit = tokens
                        .last()
                        .is_some_and(|t| t.is_digit() || *t == FormatToken::ThousandScale);
                    let before_digit = matches!(chars.get(i + 1), Some('0' | '#' | '?'));
                    if after_digit && before_digit && !seen_decimal {
                        tokens.push(FormatToken::ThousandSeparator);
                    } else if after_digit {
                        tokens.push(FormatToken::ThousandScale);
                    } else {
                        tokens.push(FormatToken::Literal(",".to_string()));
                    }
                }
                '%' => tokens.push(FormatToken::Percent),
                'E' | 'e' if matches!(chars.get(i + 1), Some('+' | '-')) => {
                    tokens.push(FormatToken::Exponent);
                    i += 2;
                    continue;
                }
                '@' => tokens.push(FormatToken::TextPlaceholder),
                'y' | 'Y' | 'm' | 'M' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' => {
                    let lower = ch.to_ascii_lowercase();
                    let count = Self::run_length(&chars, i, |c| c.to_ascii_lowercase() == lower);
                    tokens.push(match lower {
                        'y' => FormatToken::Year(count),
                        'm' => FormatToken::Month(count),
                        'd' => FormatToken::Day(count),
                        'h' => FormatToken::Hour(count),
                        _ => FormatToken::Second(count),
                    });
                    i += count;
                    continue;
                }
                'a' | 'A' if Self::starts_with_ignore_case(&chars[i..], "am/pm") => {
                    tokens.push(FormatToken::AmPm(true));
                    i += 5;
                    continue;
                }
                'a' | 'A' if Self::starts_with_ignore_case(&chars[i..], "a/p") => {
                    tokens.push(FormatToken::AmPm(false));
                    i += 3;
                    continue;
                }
                'g' | 'G' if Self::starts_with_ignore_case(&chars[i..], "general") => {
                    tokens.push(FormatToken::General);
                    i += 7;
                    continue;
                }
                _ => tokens.push(FormatToken::Literal(ch.to_string())),
            }
            i += 1;
        }

        Self::resolve_minutes(tokens);
        Self::resolve_subseconds(tokens);
        section
    }

    /// ブラケット内の要素を解析
    ///
    /// 経過時間・通貨記号・色指定を認識し、条件（`[>100]`など）は無視します。
    fn parse_bracket(content: &str, tokens: &mut Vec<FormatToken>) {
        let lower = content.to_ascii_lowercase();
        let elapsed = |unit: char| !lower.is_empty() && lower.chars().all(|c| c == unit);

        if elapsed('h') {
            tokens.push(FormatToken::Elapsed(ElapsedUnit::Hours, lower.len()));
        } else if elapsed('m') {
            tokens.push(FormatToken::Elapsed(ElapsedUnit::Minutes, lower.len()));
        } else if elapsed('s') {
            tokens.push(FormatToken::Elapsed(ElapsedUnit::Seconds, lower.len()));
        } else if let Some(currency) = content.strip_prefix('$') {
            // [$€-407] -> "€"
            let symbol = currency.split('-').next().unwrap_or_default();
            if !symbol.is_empty() {
                tokens.push(FormatToken::Literal(symbol.to_string()));
            }
        } else if content.starts_with(char::is_alphabetic) {
            tokens.push(FormatToken::Color(content.to_string()));
        }
    }

    /// 時の直後、または秒の直前の"m"/"mm"を分に置き換える
    fn resolve_minutes(tokens: &mut [FormatToken]) {
        let positions: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_datetime())
            .map(|(idx, _)| idx)
            .collect();

        for (n, &idx) in positions.iter().enumerate() {
            let FormatToken::Month(count) = tokens[idx] else {
                continue;
            };
            if count > 2 {
                continue;
            }
            let after_hour = n > 0
                && matches!(
                    tokens[positions[n - 1]],
                    FormatToken::Hour(_) | FormatToken::Elapsed(ElapsedUnit::Hours, _)
                );
            let before_second = positions.get(n + 1).is_some_and(|&next| {
                matches!(
                    tokens[next],
                    FormatToken::Second(_) | FormatToken::Elapsed(ElapsedUnit::Seconds, _)
                )
            });
            if after_hour || before_second {
                tokens[idx] = FormatToken::Minute(count);
            }
        }
    }

    /// 秒の後の"."と"0"を秒の小数部に置き換える（"ss.00"）
    fn resolve_subseconds(tokens: &mut [FormatToken]) {
        let Some(second) = tokens.iter().position(|t| {
            matches!(
                t,
                FormatToken::Second(_) | FormatToken::Elapsed(ElapsedUnit::Seconds, _)
            )
        }) else {
            return;
        };

        for token in tokens.iter_mut().skip(second + 1) {
            match token {
                FormatToken::DecimalPoint => *token = FormatToken::Literal(".".to_string()),
                FormatToken::DecimalZero(n) => {
                    let digits = *n;
                    *token = FormatToken::SubSecond(digits);
                }
                _ => {}
            }
        }
    }

    /// 条件を満たす文字が`start`から連続する数
    fn run_length(chars: &[char], start: usize, pred: impl Fn(char) -> bool) -> usize {
        chars[start..].iter().take_while(|&&c| pred(c)).count()
    }

    fn starts_with_ignore_case(chars: &[char], pattern: &str) -> bool {
        let pattern: Vec<char> = pattern.chars().collect();
        chars.len() >= pattern.len()
            && chars
                .iter()
                .zip(&pattern)
                .all(|(a, b)| a.to_ascii_lowercase() == *b)
    }

    /// 数値をフォーマット
    ///
    /// # 引数
    ///
    /// * `value` - セルの数値（日付はシリアル値）
    /// * `is_1904` - ワークブックが1904年エポックを使用するかどうか
    ///
    /// # 戻り値
    ///
    /// * `Some(String)` - 書式を適用した表示文字列
    /// * `None` - "General"・テキスト書式、指数・分数、範囲外の日付など、
    ///   標準の表示にフォールバックすべき場合
    pub fn format_number(&self, value: f64, is_1904: bool) -> Option<String> {
        if !value.is_finite() {
            return None;
        }

        let (section, auto_minus) = self.select_section(value);
        if section.is_general()
            || section.is_unsupported()
            || section.tokens.contains(&FormatToken::TextPlaceholder)
        {
            return None;
        }

        if section.is_datetime() {
            // Excelは負の日付を表示できない
            if value < 0.0 {
                return None;
            }
            return Self::format_datetime(value, section, is_1904);
        }

        if section.is_numeric() {
            let mut text = Self::format_numeric(value.abs(), section);
            if auto_minus && text.chars().any(|c| ('1'..='9').contains(&c)) {
                text.insert(0, '-');
            }
            return Some(text);
        }

        if section.tokens.is_empty() && self.sections.len() == 1 {
            return None;
        }

        // リテラルのみのセクション（例: `"-"`）
        Some(
            section
                .tokens
                .iter()
                .filter_map(|t| match t {
                    FormatToken::Literal(s) => Some(s.as_str()),
                    FormatToken::Percent => Some("%"),
                    _ => None,
                })
                .collect(),
        )
    }

    /// 値に対応するセクションを選択
    ///
    /// 戻り値の`bool`は、負数に`-`を付ける必要があるかどうかです。
    fn select_section(&self, value: f64) -> (&FormatSection, bool) {
        let numeric = &self.sections[..self.sections.len().min(3)];
        match numeric {
            [only] => (only, value < 0.0),
            [positive, negative] => {
                if value < 0.0 {
                    (negative, false)
                } else {
                    (positive, false)
                }
            }
            [positive, negative, zero, ..] => {
                if value > 0.0 {
                    (positive, false)
                } else if value < 0.0 {
                    (negative, false)
                } else {
                    (zero, false)
                }
            }
            [] => (&self.sections[0], value < 0.0),
        }
    }

    /// 数値書式を適用（`value`は絶対値）
    fn format_numeric(value: f64, section: &FormatSection) -> String {
        let mut percent = 0;
        let mut scale = 0;
        let mut grouping = false;
        let mut decimals = 0usize;
        let mut min_decimals = 0usize;
        // 整数部の各プレースホルダーが"0"かどうか（左から）
        let mut int_slots: Vec<bool> = Vec::new();

        for token in &section.tokens {
            match token {
                FormatToken::IntegerZero(n) => int_slots.extend(std::iter::repeat(true).take(*n)),
                FormatToken::IntegerHash(n) => {
                    int_slots.extend(std::iter::repeat(false).take(*n))
                }
                FormatToken::DecimalZero(n) => {
                    decimals += n;
                    min_decimals += n;
                }
                FormatToken::DecimalHash(n) => decimals += n,
                FormatToken::ThousandSeparator => grouping = true,
                FormatToken::ThousandScale => scale += 1,
                FormatToken::Percent => percent += 1,
                _ => {}
            }
        }

        let scaled = value * 100f64.powi(percent) / 1000f64.powi(scale);
        let factor = 10f64.powi(decimals as i32);
        // 四捨五入（0.5は切り上げ）
        let rounded = (scaled * factor).round() / factor;
        let text = format!("{:.*}", decimals, rounded);
        let (int_raw, frac_raw) = text.split_once('.').unwrap_or((text.as_str(), ""));

        let min_int = int_slots
            .iter()
            .position(|&zero| zero)
            .map_or(0, |p| int_slots.len() - p);
        let digits = if int_raw == "0" { "" } else { int_raw };
        let padded = format!("{:0>width$}", digits, width = min_int);
        let int_chars: Vec<char> = padded.chars().collect();
        let grouped = if grouping {
            Self::add_thousand_separators(&padded)
        } else {
            padded.clone()
        };

        let mut frac = frac_raw.to_string();
        while frac.len() > min_decimals && frac.ends_with('0') {
            frac.pop();
        }
        let frac_chars: Vec<char> = frac.chars().collect();

        let total_slots = int_slots.len();
        let mut slot = 0;
        let mut frac_pos = 0;
        let mut result = String::new();

        for token in &section.tokens {
            match token {
                FormatToken::IntegerZero(n) | FormatToken::IntegerHash(n) => {
                    for _ in 0..*n {
                        if grouping {
                            // 区切り付きの整数部は最初のプレースホルダーにまとめて出力
                            if slot == 0 {
                                result.push_str(&grouped);
                            }
                        } else {
                            // 右詰めで桁を割り当て、溢れた上位桁は最初のプレースホルダーに出す
                            if slot == 0 && int_chars.len() > total_slots {
                                result.extend(&int_chars[..int_chars.len() - total_slots]);
                            }
                            let from_right = total_slots - 1 - slot;
                            if from_right < int_chars.len() {
                                result.push(int_chars[int_chars.len() - 1 - from_right]);
                            }
                        }
                        slot += 1;
                    }
                }
                FormatToken::DecimalZero(n) | FormatToken::DecimalHash(n) => {
                    let is_zero = matches!(token, FormatToken::DecimalZero(_));
                    for _ in 0..*n {
                        match frac_chars.get(frac_pos) {
                            Some(c) => result.push(*c),
                            None if is_zero => result.push('0'),
                            None => {}
                        }
                        frac_pos += 1;
                    }
                }
                FormatToken::DecimalPoint => result.push('.'),
                FormatToken::Percent => result.push('%'),
                FormatToken::Literal(s) => result.push_str(s),
                _ => {}
            }
        }

        result
    }

    /// 千の位区切りを追加
    fn add_thousand_separators(s: &str) -> String {
        let len = s.len();
        let mut result = String::with_capacity(len + len / 3);

        for (i, ch) in s.chars().enumerate() {
            result.push(ch);
            let remaining = len - i - 1;
            if remaining > 0 && remaining % 3 == 0 {
                result.push(',');
            }
        }

        result
    }

    /// 日付・時刻書式を適用
    fn format_datetime(value: f64, section: &FormatSection, is_1904: bool) -> Option<String> {
        let sub_digits = section
            .tokens
            .iter()
            .find_map(|t| match t {
                FormatToken::SubSecond(n) => Some((*n).min(3)),
                _ => None,
            })
            .unwrap_or(0);
        let twelve_hour = section
            .tokens
            .iter()
            .any(|t| matches!(t, FormatToken::AmPm(_)));

        // 表示する桁で丸めた経過ミリ秒
        let unit = 10i64.pow(3 - sub_digits as u32);
        let total_ms = ((value * MS_PER_DAY as f64) / unit as f64).round() as i64 * unit;
        let datetime = serial_to_datetime(total_ms, is_1904)?;

        let mut result = String::new();
        for token in &section.tokens {
            match token {
                FormatToken::Year(n) => {
                    if *n <= 2 {
                        result.push_str(&format!("{:02}", datetime.year() % 100));
                    } else {
                        result.push_str(&format!("{:04}", datetime.year()));
                    }
                }
                FormatToken::Month(n) => {
                    let month = datetime.month();
                    let name = MONTH_NAMES[month as usize - 1];
                    match n {
                        1 => result.push_str(&month.to_string()),
                        2 => result.push_str(&format!("{:02}", month)),
                        3 => result.push_str(&name[..3]),
                        5 => result.push_str(&name[..1]),
                        _ => result.push_str(name),
                    }
                }
                FormatToken::Day(n) => {
                    let name = DAY_NAMES[datetime.weekday().num_days_from_monday() as usize];
                    match n {
                        1 => result.push_str(&datetime.day().to_string()),
                        2 => result.push_str(&format!("{:02}", datetime.day())),
                        3 => result.push_str(&name[..3]),
                        _ => result.push_str(name),
                    }
                }
                FormatToken::Hour(n) => {
                    let hour = if twelve_hour {
                        match datetime.hour() % 12 {
                            0 => 12,
                            h => h,
                        }
                    } else {
                        datetime.hour()
                    };
                    Self::push_padded(&mut result, hour, *n);
                }
                FormatToken::Minute(n) => Self::push_padded(&mut result, datetime.minute(), *n),
                FormatToken::Second(n) => Self::push_padded(&mut result, datetime.second(), *n),
                FormatToken::SubSecond(n) => {
                    let millis = format!("{:03}", datetime.nanosecond() / 1_000_000);
                    result.push_str(&millis[..(*n).min(3)]);
                    for _ in 3..*n {
                        result.push('0');
                    }
                }
                FormatToken::AmPm(full) => {
                    let am = datetime.hour() < 12;
                    result.push_str(match (*full, am) {
                        (true, true) => "AM",
                        (true, false) => "PM",
                        (false, true) => "A",
                        (false, false) => "P",
                    });
                }
                FormatToken::Elapsed(unit, n) => {
                    let elapsed = match unit {
                        ElapsedUnit::Hours => total_ms / 3_600_000,
                        ElapsedUnit::Minutes => total_ms / 60_000,
                        ElapsedUnit::Seconds => total_ms / 1000,
                    };
                    result.push_str(&format!("{:0width$}", elapsed, width = *n));
                }
                FormatToken::Literal(s) => result.push_str(s),
                _ => {}
            }
        }

        Some(result)
    }

    fn push_padded(result: &mut String, value: u32, width: usize) {
        if width >= 2 {
            result.push_str(&format!("{:02}", value));
        } else {
            result.push_str(&value.to_string());
        }
    }
}

/// 経過ミリ秒（シリアル値×86,400,000）を日時に変換
///
/// 1900年エポックでは、Excelが存在するものとして扱う1900-02-29（シリアル値60）を
/// 表現できないため`None`を返します。
fn serial_to_datetime(total_ms: i64, is_1904: bool) -> Option<NaiveDateTime> {
    if total_ms < 0 {
        return None;
    }
    let days = total_ms / MS_PER_DAY;
    let ms_of_day = total_ms % MS_PER_DAY;

    let epoch = if is_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else if days == 60 {
        return None;
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };

    let date = epoch.checked_add_days(Days::new(u64::try_from(days).ok()?))?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(
        (ms_of_day / 1000) as u32,
        ((ms_of_day % 1000) * 1_000_000) as u32,
    )?;
    Some(NaiveDateTime::new(date, time))
}
