//! 形態素パラメータ
//!
//! このモジュールは、辞書エントリ1件分の接続IDと生起コストを保持する
//! 形態素パラメータを定義します。

use bincode::{Decode, Encode};

/// 形態素パラメータ
///
/// この構造体は、形態素IDで引かれる並列配列の1要素であり、
/// 接続コスト計算に使用される左右の文脈IDと、生起コスト（重み）を保持します。
#[derive(Default, Debug, Clone, Copy, Decode, Encode, PartialEq, Eq)]
pub struct Morph {
    /// 左側文脈ID
    pub left_id: i16,
    /// 右側文脈ID
    pub right_id: i16,
    /// 生起コスト
    pub weight: i16,
}

impl Morph {
    /// 新しい形態素パラメータを生成します。
    pub const fn new(left_id: i16, right_id: i16, weight: i16) -> Self {
        Self {
            left_id,
            right_id,
            weight,
        }
    }
}
