//! 文字カテゴリ表
//!
//! このモジュールは、Unicodeスカラー値を固定の文字カテゴリに分類する表を
//! 管理します。カテゴリごとのフラグが、未知語処理の起動と連続同カテゴリ
//! 文字のグルーピングを制御します。

use bincode::{Decode, Encode};

/// 文字カテゴリ
///
/// 数値順は未知語表のカテゴリ索引と互換であり、変更できません。
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CharCategory {
    /// 未分類
    #[default]
    Default = 0,
    /// 空白
    Space = 1,
    /// 数字
    Numeric = 2,
    /// 英字
    Alpha = 3,
    /// 記号
    Symbol = 4,
    /// ひらがな
    Hiragana = 5,
    /// カタカナ
    Katakana = 6,
    /// 漢字
    Kanji = 7,
    /// ギリシャ文字
    Greek = 8,
    /// キリル文字
    Cyrillic = 9,
}

impl CharCategory {
    /// 分類表のバイト値からカテゴリを復元します。
    ///
    /// 未知の値は`Default`になります。
    #[inline(always)]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Space,
            2 => Self::Numeric,
            3 => Self::Alpha,
            4 => Self::Symbol,
            5 => Self::Hiragana,
            6 => Self::Katakana,
            7 => Self::Kanji,
            8 => Self::Greek,
            9 => Self::Cyrillic,
            _ => Self::Default,
        }
    }

    /// カテゴリの総数
    pub const COUNT: usize = 10;
}

/// 文字カテゴリ表
///
/// 基本多言語面（`0..=U+FFFF`）の各コードポイントをカテゴリに対応付けます。
/// 表の範囲外のスカラー値は`Default`に分類されます。
#[derive(Default, Decode, Encode)]
pub struct CharTable {
    /// コードポイントからカテゴリ値へのマッピング
    category: Vec<u8>,
    /// カテゴリごとの未知語処理起動フラグ
    invoke: Vec<bool>,
    /// カテゴリごとのグルーピングフラグ
    group: Vec<bool>,
}

impl CharTable {
    /// 生の分類表とフラグ列から文字カテゴリ表を構築します。
    pub fn from_raw(category: Vec<u8>, invoke: Vec<bool>, group: Vec<bool>) -> Self {
        Self {
            category,
            invoke,
            group,
        }
    }

    /// スカラー値のカテゴリを返します。
    ///
    /// # 引数
    ///
    /// * `c` - 分類する文字
    #[inline(always)]
    pub fn category(&self, c: char) -> CharCategory {
        let cp = c as usize;
        if cp < self.category.len() {
            CharCategory::from_u8(self.category[cp])
        } else {
            CharCategory::Default
        }
    }

    /// カテゴリが未知語処理を起動するかどうかを返します。
    ///
    /// フラグが定義されていないカテゴリは起動する扱いです。
    #[inline(always)]
    pub fn should_invoke(&self, category: CharCategory) -> bool {
        self.invoke.get(category as usize).copied().unwrap_or(true)
    }

    /// カテゴリの連続文字をグルーピングするかどうかを返します。
    ///
    /// フラグが定義されていないカテゴリはグルーピングしない扱いです。
    #[inline(always)]
    pub fn should_group(&self, category: CharCategory) -> bool {
        self.group.get(category as usize).copied().unwrap_or(false)
    }
}

impl std::fmt::Debug for CharTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharTable")
            .field("codepoints", &self.category.len())
            .field("invoke", &self.invoke)
            .field("group", &self.group)
            .finish()
    }
}
