//! 入力テキストの内部表現を提供するモジュール
//!
//! このモジュールは、形態素解析のために入力テキストを文字単位に分割し、
//! 文字位置からバイト位置へのマッピングと各文字のカテゴリを計算・保持します。
//! バッファは解析のたびに再利用されます。

use crate::dictionary::{CharCategory, CharTable};

/// 入力テキストの内部表現を保持する構造体
///
/// # フィールド
///
/// * `input` - 元の入力文字列
/// * `chars` - 入力文字列を文字単位に分割した配列
/// * `c2b` - 文字位置からバイト位置へのマッピング配列
/// * `categories` - 各文字のカテゴリ
#[derive(Default, Clone, Debug)]
pub struct Sentence {
    input: String,
    chars: Vec<char>,
    c2b: Vec<usize>,
    categories: Vec<CharCategory>,
}

impl Sentence {
    /// 新しい空の`Sentence`インスタンスを生成します。
    pub fn new() -> Self {
        Self::default()
    }

    /// 内部状態をクリアします。
    #[inline(always)]
    pub fn clear(&mut self) {
        self.input.clear();
        self.chars.clear();
        self.c2b.clear();
        self.categories.clear();
    }

    /// 入力文字列を設定し、内部データ構造を構築します。
    ///
    /// # 引数
    ///
    /// * `input` - 解析対象の入力文字列
    /// * `char_table` - 文字カテゴリ表
    pub fn compile<S>(&mut self, input: S, char_table: &CharTable)
    where
        S: AsRef<str>,
    {
        self.clear();
        self.input.push_str(input.as_ref());
        for (bi, ch) in self.input.char_indices() {
            self.chars.push(ch);
            self.c2b.push(bi);
            self.categories.push(char_table.category(ch));
        }
        self.c2b.push(self.input.len());
    }

    /// 元の入力文字列への参照を返します。
    #[inline(always)]
    pub fn raw(&self) -> &str {
        &self.input
    }

    /// 文字配列への参照を返します。
    #[inline(always)]
    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// 文字数（バイト数ではない）を返します。
    #[inline(always)]
    pub fn len_char(&self) -> usize {
        self.chars.len()
    }

    /// 指定された文字位置に対応するバイト位置を返します。
    ///
    /// 位置`len_char()`は入力のバイト長に対応します。
    #[inline(always)]
    pub fn byte_position(&self, pos_char: usize) -> usize {
        self.c2b[pos_char]
    }

    /// 指定された文字位置の文字カテゴリを返します。
    #[inline(always)]
    pub fn category(&self, pos_char: usize) -> CharCategory {
        self.categories[pos_char]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;

    #[test]
    fn test_positions() {
        let dict = Dictionary::fallback();
        let mut sent = Sentence::new();
        sent.compile("猫とA", dict.char_table());

        assert_eq!(sent.chars(), &['猫', 'と', 'A']);
        assert_eq!(sent.len_char(), 3);
        assert_eq!(sent.byte_position(0), 0);
        assert_eq!(sent.byte_position(1), 3);
        assert_eq!(sent.byte_position(2), 6);
        assert_eq!(sent.byte_position(3), 7);
        assert_eq!(sent.category(0), CharCategory::Kanji);
        assert_eq!(sent.category(1), CharCategory::Hiragana);
        assert_eq!(sent.category(2), CharCategory::Alpha);
    }

    #[test]
    fn test_reuse_clears_previous_state() {
        let dict = Dictionary::fallback();
        let mut sent = Sentence::new();
        sent.compile("こんにちは", dict.char_table());
        sent.compile("", dict.char_table());
        assert_eq!(sent.len_char(), 0);
        assert_eq!(sent.raw(), "");
        assert_eq!(sent.byte_position(0), 0);
    }
}
