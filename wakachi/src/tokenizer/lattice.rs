//! ラティス（格子）構造の実装モジュール。
//!
//! このモジュールは、入力テキストのすべての分割候補を保持するラティスと、
//! その上での前向きビタビ探索・後向きトレースを提供します。ノードは
//! 文字単位の終了位置ごとのバケットに格納され、前任ノードへの参照は
//! ラティス内のインデックスで表現されます。

use std::io::Write;

use hashbrown::HashSet;

use crate::detect::is_ideographic;
use crate::dictionary::{
    Dictionary, Morph, UserDictionary, FEATURE_PLACEHOLDER, POS_HIERARCHY, POS_START_INDEX,
};
use crate::sentence::Sentence;
use crate::tokenizer::Mode;

/// BOS（文頭）とEOS（文末）を示す特別なノードID
pub const BOS_EOS_ID: i32 = -1;

/// 未知語辞書にカテゴリが存在しない場合の接続維持用ノードID
pub const UNCATEGORIZED_ID: i32 = -2;

const MAX_COST: i32 = i32::MAX;

/// 未知語グルーピングの最大文字数
const MAX_UNKNOWN_WORD_LENGTH: usize = 1024;

// Search mode penalties.
const SEARCH_MODE_KANJI_LENGTH: usize = 2;
const SEARCH_MODE_KANJI_PENALTY: i32 = 3000;
const SEARCH_MODE_OTHER_LENGTH: usize = 7;
const SEARCH_MODE_OTHER_PENALTY: i32 = 1700;

/// ノードの分類
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeClass {
    /// ダミーノード（BOS/EOSおよびExtendedモードの分割ノード）
    #[default]
    Dummy,
    /// システム辞書の既知語
    Known,
    /// 未知語
    Unknown,
    /// ユーザー辞書の語
    User,
}

impl NodeClass {
    /// 分類の文字列表現を返します。
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dummy => "DUMMY",
            Self::Known => "KNOWN",
            Self::Unknown => "UNKNOWN",
            Self::User => "USER",
        }
    }
}

/// ラティス内のノード。
///
/// 各ノードは分割候補1つを表し、入力中のバイト範囲と文字範囲の両方を
/// 保持します。`prev`は同じラティス内の`(バケット, インデックス)`への
/// 非所有の後方参照です。
#[derive(Debug, Clone, Copy)]
pub struct Node {
    /// 辞書内の形態素ID（BOS/EOSは−1、未分類の未知語は−2）
    pub id: i32,
    /// ノードの分類
    pub class: NodeClass,
    /// 入力中の開始バイト位置
    pub start_byte: u32,
    /// 入力中の開始文字位置
    pub start_char: u32,
    /// 入力中の終了バイト位置
    pub end_byte: u32,
    /// 入力中の終了文字位置
    pub end_char: u32,
    /// 左側文脈ID
    pub left_id: i16,
    /// 右側文脈ID
    pub right_id: i16,
    /// 生起コスト
    pub weight: i16,
    /// BOSからの累積コスト
    pub cost: i32,
    /// 最良の前任ノードへの参照
    pub prev: Option<(u32, u32)>,
}

impl Node {
    /// BOS/EOSノードかどうかを判定します。
    #[inline(always)]
    pub const fn is_bos_eos(&self) -> bool {
        self.id == BOS_EOS_ID
    }

    /// 表層形の文字数を返します。
    #[inline(always)]
    pub const fn len_char(&self) -> usize {
        (self.end_char - self.start_char) as usize
    }

    /// 入力から表層形を切り出します。
    #[inline(always)]
    pub fn surface<'a>(&self, input: &'a str) -> &'a str {
        &input[self.start_byte as usize..self.end_byte as usize]
    }
}

/// ビタビ探索のためのラティス構造体。
///
/// バケット`i`には文字位置`i`で終わるノードが入ります。バケット0はBOS、
/// バケット`N+1`はEOSのためのものです。バッファは解析のたびに再利用されます。
#[derive(Default)]
pub struct Lattice {
    ends: Vec<Vec<Node>>,
    len_char: usize,
    path: Vec<Node>,
    best_refs: Vec<(u32, u32)>,
}

impl Lattice {
    /// 設定された文の文字数を返します。
    #[inline(always)]
    pub const fn len_char(&self) -> usize {
        self.len_char
    }

    /// 最良パス（BOSからEOSの順）を返します。
    ///
    /// [`Self::backward`]の後に有効です。
    #[inline(always)]
    pub fn path(&self) -> &[Node] {
        &self.path
    }

    fn reset_vec<T>(data: &mut Vec<Vec<T>>, new_len: usize) {
        for v in data.iter_mut() {
            v.clear();
        }
        let cur_len = data.len();
        if cur_len < new_len {
            data.reserve(new_len - cur_len);
            for _ in cur_len..new_len {
                data.push(Vec::with_capacity(16))
            }
        }
    }

    /// 入力文からラティスを構築します。
    ///
    /// 各文字境界で、ユーザー辞書、システム辞書、未知語生成の順に
    /// 候補ノードを挿入します。未知語生成は辞書が一致を返さなかった
    /// 位置でのみ起動されます。
    ///
    /// # 引数
    ///
    /// * `sent` - コンパイル済みの入力文
    /// * `dict` - システム辞書
    /// * `user_dict` - 任意のユーザー辞書
    pub fn build(&mut self, sent: &Sentence, dict: &Dictionary, user_dict: Option<&UserDictionary>) {
        let len_char = sent.len_char();
        Self::reset_vec(&mut self.ends, len_char + 2);
        self.ends.truncate(len_char + 2);
        self.len_char = len_char;
        self.path.clear();
        self.best_refs.clear();

        self.insert_bos();
        self.insert_eos(sent);

        let input = sent.raw();
        let mut char_pos = 0usize;
        while char_pos < len_char {
            let byte_pos = sent.byte_position(char_pos);
            let suffix = &input[byte_pos..];

            let mut any_matches = false;
            let mut longest_chars = 0usize;

            if let Some(user) = user_dict {
                user.index().common_prefix_search(suffix.as_bytes(), |id, match_bytes| {
                    let match_chars = suffix[..match_bytes].chars().count();
                    self.add_node(
                        id,
                        NodeClass::User,
                        char_pos,
                        byte_pos,
                        match_chars,
                        match_bytes,
                        Morph::default(),
                    );
                    any_matches = true;
                    longest_chars = longest_chars.max(match_chars);
                });
            }

            if !any_matches {
                dict.index().common_prefix_search(suffix.as_bytes(), |id, match_bytes| {
                    let match_chars = suffix[..match_bytes].chars().count();
                    self.add_node(
                        id,
                        NodeClass::Known,
                        char_pos,
                        byte_pos,
                        match_chars,
                        match_bytes,
                        dict.morph(id),
                    );
                    any_matches = true;
                    longest_chars = longest_chars.max(match_chars);
                });
            }

            if any_matches {
                char_pos += longest_chars;
                continue;
            }

            char_pos += self.add_unknown_nodes(sent, dict, char_pos, byte_pos);
        }
    }

    fn insert_bos(&mut self) {
        self.ends[0].push(Node {
            id: BOS_EOS_ID,
            class: NodeClass::Dummy,
            start_byte: 0,
            start_char: 0,
            end_byte: 0,
            end_char: 0,
            left_id: 0,
            right_id: 0,
            weight: 0,
            cost: 0,
            prev: None,
        });
    }

    fn insert_eos(&mut self, sent: &Sentence) {
        let len_char = sent.len_char() as u32;
        let len_byte = sent.raw().len() as u32;
        let eos_bucket = self.ends.len() - 1;
        self.ends[eos_bucket].push(Node {
            id: BOS_EOS_ID,
            class: NodeClass::Dummy,
            start_byte: len_byte,
            start_char: len_char,
            end_byte: len_byte,
            end_char: len_char,
            left_id: 0,
            right_id: 0,
            weight: 0,
            cost: 0,
            prev: None,
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn add_node(
        &mut self,
        id: i32,
        class: NodeClass,
        start_char: usize,
        start_byte: usize,
        len_char: usize,
        len_byte: usize,
        morph: Morph,
    ) {
        let target = start_char + len_char;
        if target >= self.ends.len() {
            return;
        }
        self.ends[target].push(Node {
            id,
            class,
            start_byte: start_byte as u32,
            start_char: start_char as u32,
            end_byte: (start_byte + len_byte) as u32,
            end_char: target as u32,
            left_id: morph.left_id,
            right_id: morph.right_id,
            weight: morph.weight,
            cost: 0,
            prev: None,
        });
    }

    /// 未知語仮説を挿入し、消費した文字数を返します。
    fn add_unknown_nodes(
        &mut self,
        sent: &Sentence,
        dict: &Dictionary,
        char_pos: usize,
        byte_pos: usize,
    ) -> usize {
        let category = sent.category(char_pos);

        let mut span = 1usize;
        if dict.char_table().should_group(category) {
            while char_pos + span < sent.len_char()
                && span < MAX_UNKNOWN_WORD_LENGTH
                && sent.category(char_pos + span) == category
            {
                span += 1;
            }
        }
        let span_bytes = sent.byte_position(char_pos + span) - byte_pos;

        match dict.unknown().base_id(category) {
            Some(base_id) => {
                let dup_count = dict.unknown().dup_count(category);
                for i in 0..=dup_count {
                    let id = base_id + i;
                    let morph = dict.unknown().morph(id);
                    if span > 1 {
                        // A truncated hypothesis covering all but the last character.
                        let truncated_bytes = sent.byte_position(char_pos + span - 1) - byte_pos;
                        self.add_node(
                            id,
                            NodeClass::Unknown,
                            char_pos,
                            byte_pos,
                            span - 1,
                            truncated_bytes,
                            morph,
                        );
                    }
                    self.add_node(
                        id,
                        NodeClass::Unknown,
                        char_pos,
                        byte_pos,
                        span,
                        span_bytes,
                        morph,
                    );
                }
            }
            None => {
                // The category has no unknown-word template. Insert a single
                // node so that the lattice stays connected.
                self.add_node(
                    UNCATEGORIZED_ID,
                    NodeClass::Unknown,
                    char_pos,
                    byte_pos,
                    span,
                    span_bytes,
                    Morph::default(),
                );
            }
        }
        span
    }

    /// 前向きビタビ探索を実行します。
    ///
    /// バケットを位置の昇順に処理し、各ノードの最小累積コストと最良の
    /// 前任ノードを確定します。同コストの場合は最初に見つかった前任が
    /// 維持されます。
    ///
    /// # 引数
    ///
    /// * `sent` - コンパイル済みの入力文
    /// * `dict` - システム辞書
    /// * `mode` - 解析モード
    pub fn forward(&mut self, sent: &Sentence, dict: &Dictionary, mode: Mode) {
        for i in 1..self.ends.len() {
            for j in 0..self.ends[i].len() {
                let target = self.ends[i][j];
                let start = target.start_char as usize;

                if start >= self.ends.len() || self.ends[start].is_empty() {
                    self.ends[i][j].cost = MAX_COST;
                    continue;
                }

                let mut best_cost = 0i32;
                let mut best_prev = None;
                for (k, prev) in self.ends[start].iter().enumerate() {
                    let connection_cost =
                        if prev.class == NodeClass::User || target.class == NodeClass::User {
                            0
                        } else {
                            dict.connection().at(prev.right_id, target.left_id)
                        };

                    let mut total = i64::from(prev.cost)
                        + i64::from(connection_cost)
                        + i64::from(target.weight);
                    if mode != Mode::Normal {
                        total += i64::from(additional_cost(prev, sent));
                    }
                    let total = total.min(i64::from(MAX_COST)) as i32;

                    if k == 0 || total < best_cost {
                        best_cost = total;
                        best_prev = Some((start as u32, k as u32));
                    }
                }

                self.ends[i][j].cost = best_cost;
                self.ends[i][j].prev = best_prev;
            }
        }
    }

    /// 後向きトレースを実行し、最良パスを確定します。
    ///
    /// EOSから`prev`参照をたどり、BOSからEOSの順に並べ替えます。
    /// Extendedモードでは、パス上の未知語ノードは1文字ごとのダミーノード
    /// の列に置き換えられます。分割ノードは元のノードの形態素IDと
    /// バイト・文字オフセットを保持します。
    ///
    /// # 引数
    ///
    /// * `sent` - コンパイル済みの入力文
    /// * `mode` - 解析モード
    pub fn backward(&mut self, sent: &Sentence, mode: Mode) {
        self.path.clear();
        self.best_refs.clear();

        if self.ends.is_empty() {
            return;
        }
        let last = self.ends.len() - 1;
        if self.ends[last].is_empty() {
            return;
        }

        let mut current = Some((last as u32, 0u32));
        while let Some((bucket, idx)) = current {
            let node = self.ends[bucket as usize][idx as usize];
            self.best_refs.push((bucket, idx));

            if mode != Mode::Extended || node.class != NodeClass::Unknown {
                self.path.push(node);
            } else {
                // Break the unknown word into single-character dummy nodes.
                // They are collected in reverse so that the final path reads
                // forward after the reversal below.
                let surface = node.surface(sent.raw());
                let mut splits: Vec<Node> = Vec::with_capacity(node.len_char());
                let mut byte_off = node.start_byte;
                let mut char_off = node.start_char;
                for c in surface.chars() {
                    let char_bytes = c.len_utf8() as u32;
                    splits.push(Node {
                        id: node.id,
                        class: NodeClass::Dummy,
                        start_byte: byte_off,
                        start_char: char_off,
                        end_byte: byte_off + char_bytes,
                        end_char: char_off + 1,
                        left_id: 0,
                        right_id: 0,
                        weight: 0,
                        cost: node.cost,
                        prev: None,
                    });
                    byte_off += char_bytes;
                    char_off += 1;
                }
                self.path.extend(splits.into_iter().rev());
            }

            current = node.prev;
        }

        self.path.reverse();
    }

    /// ラティスをDOTグラフとして書き出します。
    ///
    /// 最良パス上のノードは二重楕円で強調され、最良パスに含まれない
    /// 未知語ノードは省略されます。
    ///
    /// # 引数
    ///
    /// * `sent` - コンパイル済みの入力文
    /// * `dict` - システム辞書
    /// * `user_dict` - 任意のユーザー辞書
    /// * `wtr` - 書き込み先
    pub fn export_dot<W>(
        &self,
        sent: &Sentence,
        dict: &Dictionary,
        user_dict: Option<&UserDictionary>,
        mut wtr: W,
    ) -> std::io::Result<()>
    where
        W: Write,
    {
        let best: HashSet<(u32, u32)> = self.best_refs.iter().copied().collect();
        let hidden = |node: &Node, bucket: usize, idx: usize| {
            node.class == NodeClass::Unknown && !best.contains(&(bucket as u32, idx as u32))
        };

        writeln!(wtr, "graph lattice {{")?;
        writeln!(wtr, "dpi=48;")?;
        writeln!(
            wtr,
            "graph [style=filled, splines=true, overlap=false, fontsize=30, rankdir=LR]"
        )?;
        writeln!(
            wtr,
            "edge [fontname=Helvetica, fontcolor=red, color=\"#606060\"]"
        )?;
        writeln!(
            wtr,
            "node [shape=box, style=filled, fillcolor=\"#e8e8f0\", fontname=Helvetica]"
        )?;

        for (i, bucket) in self.ends.iter().enumerate() {
            for (j, node) in bucket.iter().enumerate() {
                if hidden(node, i, j) {
                    continue;
                }
                let surface = if node.is_bos_eos() {
                    if i == 0 {
                        "BOS"
                    } else {
                        "EOS"
                    }
                } else {
                    node.surface(sent.raw())
                };
                let pos = pos_feature(node, dict, user_dict);
                if best.contains(&(i as u32, j as u32)) {
                    writeln!(
                        wtr,
                        "  \"n{i}_{j}\" [label=\"{surface}\\n{pos}\\n{}\",shape=ellipse, peripheries=2];",
                        node.weight
                    )?;
                } else {
                    writeln!(
                        wtr,
                        "  \"n{i}_{j}\" [label=\"{surface}\\n{pos}\\n{}\"];",
                        node.weight
                    )?;
                }
            }
        }

        for (i, bucket) in self.ends.iter().enumerate().skip(1) {
            for (j, node) in bucket.iter().enumerate() {
                if hidden(node, i, j) {
                    continue;
                }
                let start = node.start_char as usize;
                if start >= self.ends.len() {
                    continue;
                }
                for (k, from) in self.ends[start].iter().enumerate() {
                    if hidden(from, start, k) {
                        continue;
                    }
                    let connection_cost =
                        if from.class == NodeClass::User || node.class == NodeClass::User {
                            0
                        } else {
                            dict.connection().at(from.right_id, node.left_id)
                        };
                    if best.contains(&(start as u32, k as u32)) && best.contains(&(i as u32, j as u32))
                    {
                        writeln!(
                            wtr,
                            "  \"n{start}_{k}\" -- \"n{i}_{j}\" [label=\"{connection_cost}\", style=bold, color=blue, fontcolor=blue];"
                        )?;
                    } else {
                        writeln!(
                            wtr,
                            "  \"n{start}_{k}\" -- \"n{i}_{j}\" [label=\"{connection_cost}\"];"
                        )?;
                    }
                }
            }
        }

        writeln!(wtr, "}}")
    }
}

/// SearchおよびExtendedモードで前任ノードに課される追加ペナルティを
/// 計算します。
///
/// 表層形が2文字を超える漢字のみの語には1文字ごとに3000、それ以外で
/// 7文字を超える語には1文字ごとに1700が課されます。
pub(crate) fn additional_cost(node: &Node, sent: &Sentence) -> i32 {
    let len = node.len_char();
    if len == 0 {
        return 0;
    }
    let chars = &sent.chars()[node.start_char as usize..node.end_char as usize];
    if len > SEARCH_MODE_KANJI_LENGTH && chars.iter().all(|&c| is_ideographic(c)) {
        return (len - SEARCH_MODE_KANJI_LENGTH) as i32 * SEARCH_MODE_KANJI_PENALTY;
    }
    if len > SEARCH_MODE_OTHER_LENGTH {
        return (len - SEARCH_MODE_OTHER_LENGTH) as i32 * SEARCH_MODE_OTHER_PENALTY;
    }
    0
}

/// DOT出力用の品詞ラベルを構築します。
fn pos_feature(node: &Node, dict: &Dictionary, user_dict: Option<&UserDictionary>) -> String {
    let mut features: Vec<&str> = Vec::new();
    match node.class {
        NodeClass::Known => {
            for &name_idx in dict.pos_table().entry(node.id) {
                if let Some(name) = dict.pos_table().name(name_idx) {
                    if name != FEATURE_PLACEHOLDER {
                        features.push(name);
                    }
                }
            }
        }
        NodeClass::Unknown => {
            let meta = &dict.unknown().contents_meta;
            let start = meta.get(POS_START_INDEX).unwrap_or(0) as usize;
            let hierarchy = meta.get(POS_HIERARCHY).unwrap_or(1) as usize;
            let row = dict.unknown().content(node.id);
            let end = start + hierarchy;
            if start < end && end <= row.len() {
                for cell in &row[start..end] {
                    if cell != FEATURE_PLACEHOLDER {
                        features.push(cell);
                    }
                }
            }
        }
        NodeClass::User => {
            if let Some(entry) = user_dict.and_then(|u| u.entry(node.id)) {
                features.push(&entry.pos);
            }
        }
        NodeClass::Dummy => {}
    }
    if features.is_empty() {
        "---".to_string()
    } else {
        features.join("/")
    }
}
