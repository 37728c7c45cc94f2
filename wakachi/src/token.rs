//! トークンの結果コンテナ
//!
//! このモジュールは、形態素解析の結果として得られるトークンを表現する型を
//! 提供します。トークンは最良パス上のノードへの読み取り専用ビューであり、
//! 表層形、品詞、基本形、読み、発音、位置情報へのアクセスを提供します。

use std::ops::Range;

use serde::Serialize;

use crate::dictionary::{
    BASE_FORM_INDEX, FEATURE_PLACEHOLDER, INFLECTIONAL_FORM, INFLECTIONAL_TYPE, POS_HIERARCHY,
    POS_START_INDEX, PRONUNCIATION_INDEX, READING_INDEX,
};
use crate::tokenizer::lattice::{Node, NodeClass};
use crate::tokenizer::worker::Worker;

/// 形態素解析の結果トークン
///
/// このトークンは[`Worker`]への軽量な参照であり、実際のデータはWorkerが
/// 保持しています。トークンはWorkerが生存している間のみ有効です。
///
/// 素性の列オフセットは辞書のメタデータから引かれます。メタデータが
/// 不完全な場合はIPA辞書レイアウトの固定列（基本形=2、読み=3、発音=4、
/// 活用型=0、活用形=1）への互換フォールバックが使われます。
pub struct Token<'w> {
    worker: &'w Worker,
    index: usize,
}

impl<'w> Token<'w> {
    #[inline(always)]
    pub(crate) const fn new(worker: &'w Worker, index: usize) -> Self {
        Self { worker, index }
    }

    #[inline(always)]
    fn node(&self) -> &'w Node {
        &self.worker.path[self.index]
    }

    /// トークンの表層形（元のテキスト中の文字列）を取得します。
    #[inline(always)]
    pub fn surface(&self) -> &'w str {
        self.node().surface(self.worker.sent.raw())
    }

    /// 辞書内の形態素IDを取得します。
    ///
    /// BOS/EOSは−1、未分類の未知語は−2です。
    #[inline(always)]
    pub fn id(&self) -> i32 {
        self.node().id
    }

    /// トークンの分類を取得します。
    #[inline(always)]
    pub fn class(&self) -> NodeClass {
        self.node().class
    }

    /// 入力中の開始バイト位置を取得します。
    #[inline(always)]
    pub fn start(&self) -> usize {
        self.node().start_byte as usize
    }

    /// 入力中の終了バイト位置を取得します。
    #[inline(always)]
    pub fn end(&self) -> usize {
        self.node().end_byte as usize
    }

    /// トークンのバイト単位の位置範囲を取得します。
    #[inline(always)]
    pub fn range_byte(&self) -> Range<usize> {
        self.start()..self.end()
    }

    /// トークンの文字単位の位置範囲を取得します。
    #[inline(always)]
    pub fn range_char(&self) -> Range<usize> {
        let node = self.node();
        node.start_char as usize..node.end_char as usize
    }

    /// 文頭からこのトークンまでの累積コストを取得します。
    #[inline(always)]
    pub fn total_cost(&self) -> i32 {
        self.node().cost
    }

    /// トークンの素性一覧を取得します。
    ///
    /// 既知語では品詞名の列と素性行の連結、未知語では未知語辞書の素性行、
    /// ユーザー語では品詞・トークン列・読み列の3要素です。
    pub fn features(&self) -> Vec<String> {
        let dict = self.worker.tokenizer.dictionary();
        let node = self.node();
        match node.class {
            NodeClass::Known => {
                let mut features = Vec::new();
                for &name_idx in dict.pos_table().entry(node.id) {
                    if let Some(name) = dict.pos_table().name(name_idx) {
                        features.push(name.to_string());
                    }
                }
                features.extend(dict.content(node.id).iter().cloned());
                features
            }
            NodeClass::Unknown => dict.unknown().content(node.id).to_vec(),
            NodeClass::User => {
                match self
                    .worker
                    .tokenizer
                    .user_dictionary_ref()
                    .and_then(|u| u.entry(node.id))
                {
                    Some(entry) => vec![
                        entry.pos.clone(),
                        entry.tokens.join("/"),
                        entry.yomi.join("/"),
                    ],
                    None => Vec::new(),
                }
            }
            NodeClass::Dummy => Vec::new(),
        }
    }

    /// トークンの品詞タグ列を取得します。
    ///
    /// 既知語ではまず品詞表を引き、空の場合は素性行の先頭2列から
    /// プレースホルダを除いたものを返します。未知語では未知語素性行の
    /// `[pos_start, pos_start + pos_hierarchy)`区間を返します。
    pub fn pos(&self) -> Vec<String> {
        let dict = self.worker.tokenizer.dictionary();
        let node = self.node();
        match node.class {
            NodeClass::Known => {
                let mut names = Vec::new();
                for &name_idx in dict.pos_table().entry(node.id) {
                    if let Some(name) = dict.pos_table().name(name_idx) {
                        names.push(name.to_string());
                    }
                }
                if !names.is_empty() {
                    return names;
                }
                // IPA-layout compatibility: the first two content columns.
                let row = dict.content(node.id);
                row.iter()
                    .take(2)
                    .filter(|cell| cell.as_str() != FEATURE_PLACEHOLDER)
                    .cloned()
                    .collect()
            }
            NodeClass::Unknown => {
                let meta = &dict.unknown().contents_meta;
                let start = meta.get(POS_START_INDEX).unwrap_or(0) as usize;
                let hierarchy = meta.get(POS_HIERARCHY).unwrap_or(1) as usize;
                let row = dict.unknown().content(node.id);
                let end = start + hierarchy;
                if start >= end || end > row.len() {
                    return Vec::new();
                }
                row[start..end].to_vec()
            }
            NodeClass::User => {
                match self
                    .worker
                    .tokenizer
                    .user_dictionary_ref()
                    .and_then(|u| u.entry(node.id))
                {
                    Some(entry) => vec![entry.pos.clone()],
                    None => Vec::new(),
                }
            }
            NodeClass::Dummy => Vec::new(),
        }
    }

    /// 基本形を取得します。未定義の場合は`*`です。
    pub fn base_form(&self) -> String {
        self.lookup_feature(BASE_FORM_INDEX, 2)
    }

    /// 読みを取得します。未定義の場合は`*`です。
    pub fn reading(&self) -> String {
        self.lookup_feature(READING_INDEX, 3)
    }

    /// 発音を取得します。未定義の場合は`*`です。
    pub fn pronunciation(&self) -> String {
        self.lookup_feature(PRONUNCIATION_INDEX, 4)
    }

    /// 活用型を取得します。未定義の場合は`*`です。
    pub fn inflectional_type(&self) -> String {
        self.lookup_feature(INFLECTIONAL_TYPE, 0)
    }

    /// 活用形を取得します。未定義の場合は`*`です。
    pub fn inflectional_form(&self) -> String {
        self.lookup_feature(INFLECTIONAL_FORM, 1)
    }

    /// このトークンを所有型の[`TokenData`]に変換します。
    ///
    /// JSON出力やスレッド間での受け渡しに使用します。
    pub fn to_data(&self) -> TokenData {
        TokenData {
            id: self.id(),
            start: self.start(),
            end: self.end(),
            surface: self.surface().to_string(),
            class: self.class().as_str().to_string(),
            pos: self.pos(),
            base_form: self.base_form(),
            reading: self.reading(),
            pronunciation: self.pronunciation(),
            features: self.features(),
        }
    }

    /// メタキーで素性行の列を引きます。キーが未定義、または値が
    /// プレースホルダの場合は固定列`positional`にフォールバックします。
    fn lookup_feature(&self, key: &str, positional: usize) -> String {
        let row = self.content_row();
        if let Some(column) = self.meta_column(key) {
            if let Some(cell) = row.get(column) {
                if cell.as_str() != FEATURE_PLACEHOLDER {
                    return cell.clone();
                }
            }
        }
        row.get(positional)
            .cloned()
            .unwrap_or_else(|| FEATURE_PLACEHOLDER.to_string())
    }

    fn meta_column(&self, key: &str) -> Option<usize> {
        let dict = self.worker.tokenizer.dictionary();
        let meta = match self.node().class {
            NodeClass::Known => dict.contents_meta(),
            NodeClass::Unknown => &dict.unknown().contents_meta,
            NodeClass::Dummy | NodeClass::User => return None,
        };
        meta.get(key).map(|column| column as usize)
    }

    fn content_row(&self) -> &'w [String] {
        let dict = self.worker.tokenizer.dictionary();
        let node = self.node();
        match node.class {
            NodeClass::Known => dict.content(node.id),
            NodeClass::Unknown => dict.unknown().content(node.id),
            NodeClass::Dummy | NodeClass::User => &[],
        }
    }
}

impl std::fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("surface", &self.surface())
            .field("id", &self.id())
            .field("class", &self.class())
            .field("range_byte", &self.range_byte())
            .field("range_char", &self.range_char())
            .field("total_cost", &self.total_cost())
            .finish()
    }
}

/// トークンのイテレータ
///
/// 形態素解析の結果得られたトークン列を順次取得するためのイテレータです。
/// 前方および後方からの走査をサポートしています。
pub struct TokenIter<'w> {
    worker: &'w Worker,
    front: usize,
    back: usize,
}

impl<'w> TokenIter<'w> {
    #[inline(always)]
    pub(crate) fn new(worker: &'w Worker) -> Self {
        let num_tokens = worker.num_tokens();
        Self {
            worker,
            front: 0,
            back: num_tokens,
        }
    }
}

impl<'w> Iterator for TokenIter<'w> {
    type Item = Token<'w>;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.front < self.back {
            let t = self.worker.token(self.front);
            self.front += 1;
            Some(t)
        } else {
            None
        }
    }
}

impl<'w> DoubleEndedIterator for TokenIter<'w> {
    #[inline(always)]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front < self.back {
            self.back -= 1;
            let t = self.worker.token(self.back);
            Some(t)
        } else {
            None
        }
    }
}

/// 所有型の自己完結したトークンデータ
///
/// このトークンは[`Token`]の所有型版であり、JSONシリアライズに対応します。
/// 位置はバイト単位です。
#[derive(Debug, Clone, Serialize)]
pub struct TokenData {
    /// 形態素ID
    pub id: i32,
    /// 開始バイト位置
    pub start: usize,
    /// 終了バイト位置
    pub end: usize,
    /// 表層形
    pub surface: String,
    /// トークンの分類
    pub class: String,
    /// 品詞タグ列
    pub pos: Vec<String>,
    /// 基本形
    pub base_form: String,
    /// 読み
    pub reading: String,
    /// 発音
    pub pronunciation: String,
    /// 素性一覧
    pub features: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;
    use crate::tokenizer::Tokenizer;

    #[test]
    fn test_known_token_features() {
        let tokenizer = Tokenizer::new(Dictionary::fallback()).omit_bos_eos(true);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("猫");
        worker.tokenize();

        let token = worker.token(0);
        assert_eq!(token.class(), NodeClass::Known);
        assert_eq!(token.pos(), vec!["名詞".to_string()]);
        assert_eq!(token.base_form(), "猫");
        assert_eq!(token.reading(), "ネコ");
        assert_eq!(token.pronunciation(), "ネコ");
        // The feature list is the POS names followed by the content row.
        let features = token.features();
        assert_eq!(features[0], "名詞");
        assert!(features.contains(&"ネコ".to_string()));
    }

    #[test]
    fn test_unknown_token_pos_slice() {
        let tokenizer = Tokenizer::new(Dictionary::fallback()).omit_bos_eos(true);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("ABC");
        worker.tokenize();

        let token = worker.token(0);
        assert_eq!(token.class(), NodeClass::Unknown);
        assert_eq!(
            token.pos(),
            vec!["名詞".to_string(), "固有名詞".to_string()]
        );
        // Unknown entries carry placeholders for base form and reading.
        assert_eq!(token.base_form(), FEATURE_PLACEHOLDER);
        assert_eq!(token.reading(), FEATURE_PLACEHOLDER);
    }

    #[test]
    fn test_dummy_token_is_empty() {
        let tokenizer = Tokenizer::new(Dictionary::fallback());
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("");
        worker.tokenize();

        let bos = worker.token(0);
        assert_eq!(bos.class(), NodeClass::Dummy);
        assert!(bos.surface().is_empty());
        assert!(bos.features().is_empty());
        assert!(bos.pos().is_empty());
        assert_eq!(bos.base_form(), FEATURE_PLACEHOLDER);
    }

    #[test]
    fn test_to_data() {
        let tokenizer = Tokenizer::new(Dictionary::fallback()).omit_bos_eos(true);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("東京都");
        worker.tokenize();

        let data = worker.token(0).to_data();
        assert_eq!(data.surface, "東京");
        assert_eq!(data.class, "KNOWN");
        assert_eq!(data.start, 0);
        assert_eq!(data.end, "東京".len());
        assert_eq!(data.pos, vec!["名詞".to_string()]);
        assert_eq!(data.reading, "トウキョウ");

        let json = serde_json::to_string(&data).unwrap();
        assert!(json.contains("\"surface\":\"東京\""));
    }

    #[test]
    fn test_iter_front_and_back() {
        let tokenizer = Tokenizer::new(Dictionary::fallback()).omit_bos_eos(true);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("東京都");
        worker.tokenize();

        let forward: Vec<String> = worker
            .token_iter()
            .map(|t| t.surface().to_string())
            .collect();
        let mut backward: Vec<String> = worker
            .token_iter()
            .rev()
            .map(|t| t.surface().to_string())
            .collect();
        backward.reverse();
        assert_eq!(forward, backward);
    }
}
