//! ユーザー辞書
//!
//! このモジュールは、システム辞書より優先して引かれるユーザー定義の
//! 語彙を管理します。

use bincode::{Decode, Encode};

use crate::dictionary::trie::DoubleArray;

/// ユーザー辞書の1エントリ
///
/// 表層形に対する品詞と、分割後のトークン列・読み列を保持します。
#[derive(Default, Debug, Clone, Decode, Encode)]
pub struct UserEntry {
    /// 表層形
    pub surface: String,
    /// 品詞
    pub pos: String,
    /// 分割後のトークン列
    pub tokens: Vec<String>,
    /// 読み列
    pub yomi: Vec<String>,
}

/// ユーザー辞書
///
/// エントリIDはトライの終端IDと一致します。読み込み後は不変です。
#[derive(Debug, Decode, Encode)]
pub struct UserDictionary {
    entries: Vec<UserEntry>,
    index: DoubleArray,
}

impl UserDictionary {
    /// エントリ列からユーザー辞書を構築します。
    ///
    /// エントリは表層形のバイト順に並べ替えられ、並べ替え後の位置が
    /// エントリIDになります。表層形が空のエントリは無視されます。
    pub fn new(mut entries: Vec<UserEntry>) -> Self {
        entries.retain(|e| !e.surface.is_empty());
        entries.sort_by(|a, b| a.surface.as_bytes().cmp(b.surface.as_bytes()));
        entries.dedup_by(|a, b| a.surface == b.surface);

        let keys: Vec<(&[u8], i32, i32)> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.surface.as_bytes(), i as i32, 0))
            .collect();
        let index = DoubleArray::from_entries(&keys);
        Self { entries, index }
    }

    /// エントリIDからエントリを返します。範囲外は`None`です。
    #[inline(always)]
    pub fn entry(&self, id: i32) -> Option<&UserEntry> {
        usize::try_from(id).ok().and_then(|i| self.entries.get(i))
    }

    /// エントリ数を返します。
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 辞書が空かどうかを返します。
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 表層形索引への参照を返します。
    #[inline(always)]
    pub(crate) fn index(&self) -> &DoubleArray {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_order() {
        let dict = UserDictionary::new(vec![
            UserEntry {
                surface: "東京スカイツリー".to_string(),
                pos: "カスタム名詞".to_string(),
                tokens: vec!["東京".to_string(), "スカイツリー".to_string()],
                yomi: vec!["トウキョウ".to_string(), "スカイツリー".to_string()],
            },
            UserEntry {
                surface: "東京".to_string(),
                pos: "カスタム名詞".to_string(),
                tokens: vec!["東京".to_string()],
                yomi: vec!["トウキョウ".to_string()],
            },
        ]);
        assert_eq!(dict.len(), 2);

        let mut hits = Vec::new();
        dict.index()
            .common_prefix_search("東京スカイツリーです".as_bytes(), |id, len| {
                hits.push((id, len))
            });
        assert_eq!(hits.len(), 2);
        // Shorter prefix first.
        assert_eq!(hits[0].1, "東京".len());
        assert_eq!(
            dict.entry(hits[0].0).unwrap().surface,
            "東京".to_string()
        );
        assert_eq!(hits[1].1, "東京スカイツリー".len());
        assert_eq!(
            dict.entry(hits[1].0).unwrap().surface,
            "東京スカイツリー".to_string()
        );
    }
}
