//! 未知語辞書
//!
//! このモジュールは、辞書に登録されていない語を文字カテゴリごとの
//! テンプレートから合成するための表を管理します。

use bincode::{
    de::{BorrowDecode, BorrowDecoder, Decoder},
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};
use hashbrown::HashMap;

use crate::dictionary::character::CharCategory;
use crate::dictionary::contents::ContentsMeta;
use crate::dictionary::morph::Morph;

/// 未知語辞書
///
/// 文字カテゴリごとに基準形態素IDと追加ID数を持ち、独自の形態素表と
/// 素性表を保持します。
#[derive(Default)]
pub struct UnknownDict {
    /// 未知語形態素のパラメータ
    pub morphs: Vec<Morph>,
    /// カテゴリから基準形態素IDへの索引
    index: HashMap<i32, i32>,
    /// カテゴリごとの追加ID数
    index_dup: HashMap<i32, i32>,
    /// 素性表のメタデータ
    pub contents_meta: ContentsMeta,
    /// 未知語の素性行
    pub contents: Vec<Vec<String>>,
}

impl UnknownDict {
    /// 表一式から未知語辞書を構築します。
    pub fn from_raw(
        morphs: Vec<Morph>,
        index: HashMap<i32, i32>,
        index_dup: HashMap<i32, i32>,
        contents_meta: ContentsMeta,
        contents: Vec<Vec<String>>,
    ) -> Self {
        Self {
            morphs,
            index,
            index_dup,
            contents_meta,
            contents,
        }
    }

    /// カテゴリに対応する基準形態素IDを返します。
    ///
    /// カテゴリが未知語辞書の外にある場合は`None`です。
    #[inline(always)]
    pub fn base_id(&self, category: CharCategory) -> Option<i32> {
        self.index.get(&(category as i32)).copied()
    }

    /// カテゴリに対応する追加ID数を返します。既定値は0です。
    #[inline(always)]
    pub fn dup_count(&self, category: CharCategory) -> i32 {
        self.index_dup.get(&(category as i32)).copied().unwrap_or(0)
    }

    /// 未知語形態素のパラメータを返します。
    ///
    /// 範囲外のIDは既定値（すべて0）になります。
    #[inline(always)]
    pub fn morph(&self, id: i32) -> Morph {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.morphs.get(i))
            .copied()
            .unwrap_or_default()
    }

    /// 未知語の素性行を返します。範囲外のIDは空です。
    #[inline(always)]
    pub fn content(&self, id: i32) -> &[String] {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.contents.get(i))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl std::fmt::Debug for UnknownDict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnknownDict")
            .field("morphs", &self.morphs.len())
            .field("categories", &self.index.len())
            .field("contents", &self.contents.len())
            .finish()
    }
}

fn encode_pairs<E: Encoder>(map: &HashMap<i32, i32>, encoder: &mut E) -> Result<(), EncodeError> {
    let mut pairs: Vec<(i32, i32)> = map.iter().map(|(k, v)| (*k, *v)).collect();
    pairs.sort();
    Encode::encode(&pairs, encoder)
}

fn decode_pairs<D: Decoder>(decoder: &mut D) -> Result<HashMap<i32, i32>, DecodeError> {
    let pairs: Vec<(i32, i32)> = Decode::decode(decoder)?;
    Ok(pairs.into_iter().collect())
}

impl Encode for UnknownDict {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.morphs, encoder)?;
        encode_pairs(&self.index, encoder)?;
        encode_pairs(&self.index_dup, encoder)?;
        Encode::encode(&self.contents_meta, encoder)?;
        Encode::encode(&self.contents, encoder)
    }
}

impl<Context> Decode<Context> for UnknownDict {
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        Ok(Self {
            morphs: Decode::decode(decoder)?,
            index: decode_pairs(decoder)?,
            index_dup: decode_pairs(decoder)?,
            contents_meta: Decode::decode(decoder)?,
            contents: Decode::decode(decoder)?,
        })
    }
}

impl<'de, Context> BorrowDecode<'de, Context> for UnknownDict {
    fn borrow_decode<D: BorrowDecoder<'de>>(decoder: &mut D) -> Result<Self, DecodeError> {
        Decode::decode(decoder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_defaults() {
        let mut index = HashMap::new();
        index.insert(CharCategory::Hiragana as i32, 5);
        let mut index_dup = HashMap::new();
        index_dup.insert(CharCategory::Hiragana as i32, 2);

        let dict = UnknownDict::from_raw(
            vec![Morph::new(38, 39, 800)],
            index,
            index_dup,
            ContentsMeta::default(),
            vec![vec!["助詞".to_string()]],
        );

        assert_eq!(dict.base_id(CharCategory::Hiragana), Some(5));
        assert_eq!(dict.dup_count(CharCategory::Hiragana), 2);
        assert_eq!(dict.base_id(CharCategory::Greek), None);
        assert_eq!(dict.dup_count(CharCategory::Greek), 0);
        assert_eq!(dict.morph(0), Morph::new(38, 39, 800));
        assert_eq!(dict.morph(7), Morph::default());
        assert_eq!(dict.content(0), &["助詞".to_string()]);
        assert!(dict.content(-2).is_empty());
    }
}
