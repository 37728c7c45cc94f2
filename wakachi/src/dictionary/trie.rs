//! ダブル配列トライ
//!
//! このモジュールは、バイト列の完全一致検索と共通接頭辞検索を提供する
//! ダブル配列トライを実装します。1つの終端に複数の形態素IDが割り当てられる
//! 場合は、`dup`マップが追加ID数を与えます。

use bincode::{
    de::{BorrowDecode, BorrowDecoder, Decoder},
    enc::Encoder,
    error::{DecodeError, EncodeError},
    Decode, Encode,
};
use hashbrown::HashMap;

/// 未使用スロットの`check`値
const VACANT: i32 = -1;

/// ダブル配列の1要素
///
/// 状態`p`はバイト`b`で`q = base[p] + b`に遷移し、`check[q] == p`のとき
/// 遷移は有効です。ラベル0は終端記号であり、`base[q] <= 0`のとき
/// ID `-base[q]`の一致を表します。
#[derive(Debug, Clone, Copy, Decode, Encode)]
pub struct DaNode {
    /// 遷移ベース値（終端スロットでは`-id`）
    pub base: i32,
    /// 親状態のインデックス（未使用スロットは`-1`）
    pub check: i32,
}

/// ダブル配列トライ
///
/// 1つの表層形に複数の形態素が対応する場合、それらのIDは連続しており、
/// `dup[id]`が先頭IDに続く追加IDの個数を与えます。
pub struct DoubleArray {
    nodes: Vec<DaNode>,
    dup: HashMap<i32, i32>,
}

impl DoubleArray {
    /// 生のダブル配列と重複マップからトライを構築します。
    ///
    /// 辞書ローダーがアーカイブから復元した論理表をそのまま受け取ります。
    pub fn from_raw(nodes: Vec<DaNode>, dup: HashMap<i32, i32>) -> Self {
        Self { nodes, dup }
    }

    /// ソート済みのエントリ列からトライを構築します。
    ///
    /// 組み込みフォールバック辞書、ユーザー辞書の索引、およびテストで
    /// 使用します。
    ///
    /// # 引数
    ///
    /// * `entries` - `(キー, 先頭ID, 追加ID数)`の列。キーはバイト列として
    ///   昇順・一意であること。
    pub fn from_entries<K>(entries: &[(K, i32, i32)]) -> Self
    where
        K: AsRef<[u8]>,
    {
        let mut builder = Builder::default();
        for (key, id, _) in entries {
            builder.insert(key.as_ref(), *id);
        }
        let nodes = builder.finish();

        let mut dup = HashMap::new();
        for (_, id, extra) in entries {
            if *extra > 0 {
                dup.insert(*id, *extra);
            }
        }
        Self { nodes, dup }
    }

    /// 配列の要素数を返します。
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// トライが空かどうかを返します。
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 完全一致検索を行います。
    ///
    /// # 引数
    ///
    /// * `input` - 検索するバイト列
    ///
    /// # 戻り値
    ///
    /// 一致した場合は`[id, id+1, ..., id+dup[id]]`、一致しない場合は空
    pub fn search(&self, input: &[u8]) -> Vec<i32> {
        match self.find(input) {
            Some(id) => {
                let extra = self.dup.get(&id).copied().unwrap_or(0);
                (id..=id + extra).collect()
            }
            None => Vec::new(),
        }
    }

    /// 共通接頭辞検索を行います。
    ///
    /// 入力のバイトを1つずつ消費し、各ステップで終端記号を探索します。
    /// 到達した有効な終端ごとに、接頭辞の長さが増える順で
    /// `emit(id, prefix_byte_length)`を呼び出します。次のバイト遷移が
    /// 無効になるか入力が尽きた時点で停止します。
    ///
    /// # 引数
    ///
    /// * `input` - 検索するバイト列
    /// * `emit` - 一致ごとに呼ばれるコールバック
    pub fn common_prefix_search<F>(&self, input: &[u8], mut emit: F)
    where
        F: FnMut(i32, usize),
    {
        if self.nodes.is_empty() || input.is_empty() {
            return;
        }

        let len = self.nodes.len();
        let mut p = 0usize;
        for (i, &b) in input.iter().enumerate() {
            if b == 0 {
                // Label 0 is reserved for the terminator.
                return;
            }
            let q = (self.nodes[p].base + i32::from(b)) as usize;
            if q >= len || self.nodes[q].check != p as i32 {
                return;
            }
            let ahead = (self.nodes[q].base) as usize;
            if ahead < len && self.nodes[ahead].check == q as i32 && self.nodes[ahead].base <= 0 {
                emit(-self.nodes[ahead].base, i + 1);
            }
            p = q;
        }
    }

    /// 先頭IDに対する追加ID数を返します。
    #[inline(always)]
    pub fn dup_count(&self, id: i32) -> i32 {
        self.dup.get(&id).copied().unwrap_or(0)
    }

    fn find(&self, input: &[u8]) -> Option<i32> {
        if self.nodes.is_empty() || input.is_empty() {
            return None;
        }
        let len = self.nodes.len();
        let mut p = 0usize;
        for &b in input {
            if b == 0 {
                return None;
            }
            let q = (self.nodes[p].base + i32::from(b)) as usize;
            if q >= len || self.nodes[q].check != p as i32 {
                return None;
            }
            p = q;
        }
        let q = (self.nodes[p].base) as usize;
        if q >= len || self.nodes[q].check != p as i32 || self.nodes[q].base > 0 {
            return None;
        }
        Some(-self.nodes[q].base)
    }
}

impl std::fmt::Debug for DoubleArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoubleArray")
            .field("len", &self.nodes.len())
            .field("dup", &self.dup.len())
            .finish()
    }
}

impl Encode for DoubleArray {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.nodes, encoder)?;
        let mut pairs: Vec<(i32, i32)> = self.dup.iter().map(|(k, v)| (*k, *v)).collect();
        pairs.sort();
        Encode::encode(&pairs, encoder)
    }
}

impl<Context> Decode<Context> for DoubleArray {
    fn decode<D: Decoder>(decoder: &mut D) -> Result<Self, DecodeError> {
        let nodes: Vec<DaNode> = Decode::decode(decoder)?;
        let pairs: Vec<(i32, i32)> = Decode::decode(decoder)?;
        Ok(Self {
            nodes,
            dup: pairs.into_iter().collect(),
        })
    }
}

impl<'de, Context> BorrowDecode<'de, Context> for DoubleArray {
    fn borrow_decode<D: BorrowDecoder<'de>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let nodes: Vec<DaNode> = Decode::decode(decoder)?;
        let pairs: Vec<(i32, i32)> = Decode::decode(decoder)?;
        Ok(Self {
            nodes,
            dup: pairs.into_iter().collect(),
        })
    }
}

/// トライ木からダブル配列への変換器
#[derive(Default)]
struct Builder {
    children: Vec<Vec<(u8, usize)>>,
    values: Vec<Option<i32>>,
}

impl Builder {
    fn insert(&mut self, key: &[u8], id: i32) {
        if self.children.is_empty() {
            self.children.push(Vec::new());
            self.values.push(None);
        }
        let mut node = 0usize;
        for &b in key {
            debug_assert_ne!(b, 0);
            node = match self.children[node].iter().find(|(label, _)| *label == b) {
                Some((_, child)) => *child,
                None => {
                    let child = self.children.len();
                    self.children.push(Vec::new());
                    self.values.push(None);
                    self.children[node].push((b, child));
                    child
                }
            };
        }
        self.values[node] = Some(id);
    }

    fn finish(self) -> Vec<DaNode> {
        let vacant = DaNode {
            base: 0,
            check: VACANT,
        };
        let mut nodes = vec![vacant];
        if self.children.is_empty() {
            return nodes;
        }

        // (trie node, assigned state)
        let mut queue = std::collections::VecDeque::new();
        queue.push_back((0usize, 0usize));

        while let Some((trie_node, state)) = queue.pop_front() {
            let mut labels = Vec::new();
            if self.values[trie_node].is_some() {
                labels.push(0u8);
            }
            for (label, _) in &self.children[trie_node] {
                labels.push(*label);
            }
            if labels.is_empty() {
                continue;
            }

            // Find the smallest positive base whose slots are all vacant.
            let mut base = 1i32;
            'probe: loop {
                for &label in &labels {
                    let q = base as usize + label as usize;
                    if q < nodes.len() && nodes[q].check != VACANT {
                        base += 1;
                        continue 'probe;
                    }
                }
                break;
            }

            let max_q = base as usize + labels.iter().map(|&l| l as usize).max().unwrap();
            if max_q >= nodes.len() {
                nodes.resize(max_q + 1, vacant);
            }

            nodes[state].base = base;
            if let Some(id) = self.values[trie_node] {
                let q = base as usize;
                nodes[q].check = state as i32;
                nodes[q].base = -id;
            }
            for &(label, child) in &self.children[trie_node] {
                let q = base as usize + label as usize;
                nodes[q].check = state as i32;
                queue.push_back((child, q));
            }
        }
        nodes
    }
}
