//! 素性表とそのメタデータ
//!
//! このモジュールは、形態素IDごとの素性文字列の行（内容表）と、
//! 基本形・読みなどの既知キーから列オフセットへの対応表を定義します。

use bincode::{
    de::{BorrowDecode, BorrowDecoder, Decoder},
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};
use hashbrown::HashMap;

/// 品詞列の開始オフセットを示すメタキー
pub const POS_START_INDEX: &str = "_pos_start";
/// 品詞階層の深さを示すメタキー
pub const POS_HIERARCHY: &str = "_pos_hierarchy";
/// 活用型の列を示すメタキー
pub const INFLECTIONAL_TYPE: &str = "_inflectional_type";
/// 活用形の列を示すメタキー
pub const INFLECTIONAL_FORM: &str = "_inflectional_form";
/// 基本形の列を示すメタキー
pub const BASE_FORM_INDEX: &str = "_base";
/// 読みの列を示すメタキー
pub const READING_INDEX: &str = "_reading";
/// 発音の列を示すメタキー
pub const PRONUNCIATION_INDEX: &str = "_pronunciation";

/// 素性の欠損を表すプレースホルダ
pub const FEATURE_PLACEHOLDER: &str = "*";

/// 既知キーから素性行の列オフセットへの対応表
///
/// アーカイブ上ではキー昇順のペア列として表現されます。
#[derive(Default, Debug, Clone)]
pub struct ContentsMeta {
    map: HashMap<String, u32>,
}

impl ContentsMeta {
    /// キーに対応する列オフセットを返します。
    #[inline(always)]
    pub fn get(&self, key: &str) -> Option<u32> {
        self.map.get(key).copied()
    }

    /// キーと列オフセットの対応を登録します。
    pub fn insert<S>(&mut self, key: S, column: u32)
    where
        S: Into<String>,
    {
        self.map.insert(key.into(), column);
    }

    /// 登録済みの対応数を返します。
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// 対応表が空かどうかを返します。
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl FromIterator<(String, u32)> for ContentsMeta {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

impl Encode for ContentsMeta {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        let mut pairs: Vec<(String, u32)> = self
            .map
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        pairs.sort();
        Encode::encode(&pairs, encoder)
    }
}

impl<Context> Decode<Context> for ContentsMeta {
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        let pairs: Vec<(String, u32)> = Decode::decode(decoder)?;
        Ok(pairs.into_iter().collect())
    }
}

impl<'de, Context> BorrowDecode<'de, Context> for ContentsMeta {
    fn borrow_decode<D: BorrowDecoder<'de>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let pairs: Vec<(String, u32)> = Decode::decode(decoder)?;
        Ok(pairs.into_iter().collect())
    }
}
