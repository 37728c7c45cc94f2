//! 品詞表
//!
//! このモジュールは、品詞名の一覧と、形態素IDごとの品詞名インデックス列を
//! 保持する品詞表を定義します。

use bincode::{Decode, Encode};

/// 品詞表
///
/// 品詞名はすべての形態素で共有される`names`に一度だけ格納され、
/// 各形態素は`entries[id]`として`names`へのインデックス列を持ちます。
///
/// 不変条件: `entries[i][k] < names.len()`。
#[derive(Default, Debug, Decode, Encode)]
pub struct PosTable {
    /// 品詞名のリスト
    pub names: Vec<String>,
    /// 形態素IDごとの品詞名インデックス列
    pub entries: Vec<Vec<u32>>,
}

impl PosTable {
    /// 形態素IDに対応する品詞名インデックス列を返します。
    ///
    /// # 引数
    ///
    /// * `id` - 形態素ID
    ///
    /// # 戻り値
    ///
    /// IDが範囲内ならインデックス列、範囲外なら空スライス
    #[inline(always)]
    pub fn entry(&self, id: i32) -> &[u32] {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.entries.get(i))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 品詞名インデックスを品詞名に解決します。
    ///
    /// 範囲外のインデックスは`None`になります。
    #[inline(always)]
    pub fn name(&self, idx: u32) -> Option<&str> {
        self.names.get(idx as usize).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_out_of_range() {
        let table = PosTable {
            names: vec!["名詞".to_string()],
            entries: vec![vec![0]],
        };
        assert_eq!(table.entry(0), &[0]);
        assert_eq!(table.entry(1), &[] as &[u32]);
        assert_eq!(table.entry(-1), &[] as &[u32]);
        assert_eq!(table.name(0), Some("名詞"));
        assert_eq!(table.name(9), None);
    }
}
