//! FormatSection Module
//!
//! Excel Number Format Stringのセクション定義を提供します。

use super::tokens::FormatToken;

/// セクションの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SectionKind {
    /// 正数（セクションが1つの場合はすべての数値）
    Positive,
    /// 負数
    Negative,
    /// ゼロ
    Zero,
    /// テキスト
    Text,
}

/// フォーマットのセクション
///
/// Excel Number Format Stringは`;`で最大4つのセクションに分割されます:
/// 1. 正数
/// 2. 負数
/// 3. ゼロ
/// 4. テキスト
#[derive(Debug, Clone)]
pub(crate) struct FormatSection {
    /// セクションの種類
    pub kind: SectionKind,

    /// フォーマットトークン
    pub tokens: Vec<FormatToken>,
}

impl FormatSection {
    /// 新しいセクションを生成
    pub fn new(kind: SectionKind) -> Self {
        Self {
            kind,
            tokens: Vec::new(),
        }
    }

    /// セクションが日付・時刻書式かどうかを判定
    pub fn is_datetime(&self) -> bool {
        self.tokens.iter().any(|t| t.is_datetime())
    }

    /// セクションが数字プレースホルダーを含むかどうかを判定
    pub fn is_numeric(&self) -> bool {
        self.tokens.iter().any(|t| t.is_digit())
    }

    /// "General"を含むか
    pub fn is_general(&self) -> bool {
        self.tokens.contains(&FormatToken::General)
    }

    /// 表示を再現できない書式か
    ///
    /// 指数表記と分数（`# ?/?`）は再現しません。
    pub fn is_unsupported(&self) -> bool {
        self.tokens.contains(&FormatToken::Exponent)
            || (self.is_numeric()
                && !self.is_datetime()
                && self
                    .tokens
                    .iter()
                    .any(|t| matches!(t, FormatToken::Literal(s) if s == "/")))
    }
}
