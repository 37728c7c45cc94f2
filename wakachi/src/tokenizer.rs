//! ビタビアルゴリズムに基づくトークナイザー。
//!
//! このモジュールは、日本語形態素解析のためのメイントークナイザーを提供します。
//! 入力文からラティスを構築し、ビタビ探索で最小コストの形態素列を求めます。
//!
//! # 主要な構造体
//!
//! - [`Tokenizer`]: 辞書と設定を保持するメイン構造体
//! - [`Worker`]: 実際の解析処理を行うワーカー
//!
//! # 例
//!
//! ```
//! use wakachi::{Dictionary, Mode, Tokenizer};
//!
//! let dict = Dictionary::fallback();
//! let tokenizer = Tokenizer::new(dict).mode(Mode::Normal).omit_bos_eos(true);
//! let mut worker = tokenizer.new_worker();
//!
//! worker.reset_sentence("東京都");
//! worker.tokenize();
//!
//! let surfaces: Vec<&str> = worker.token_iter().map(|t| t.surface()).collect();
//! assert_eq!(surfaces, vec!["東京", "都"]);
//! ```
pub(crate) mod lattice;
pub mod worker;

use std::str::FromStr;
use std::sync::Arc;

use crate::dictionary::{Dictionary, UserDictionary};
use crate::tokenizer::worker::Worker;

pub use crate::tokenizer::lattice::{Node, NodeClass};

/// 解析モード
///
/// SearchとExtendedは長い語にペナルティを課して検索向けの細かい分割を
/// 促します。Extendedはさらに、最良パス上の未知語を1文字ごとに分割します。
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// 通常の分割
    #[default]
    Normal,
    /// 検索向けの追加分割ヒューリスティックを適用
    Search,
    /// Searchに加えて未知語を1文字ごとに分割
    Extended,
}

impl FromStr for Mode {
    type Err = &'static str;

    /// 文字列から解析モードをパースします。
    ///
    /// # 引数
    ///
    /// * `mode` - "normal"、"search"、"extended"のいずれか
    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "normal" => Ok(Self::Normal),
            "search" => Ok(Self::Search),
            "extended" => Ok(Self::Extended),
            _ => Err("Could not parse a mode"),
        }
    }
}

/// 形態素解析を行うトークナイザー。
///
/// 辞書データを保持し、複数の[`Worker`]インスタンスを生成して並列処理を
/// 行うことができます。辞書は`Arc`で共有され、`Tokenizer`自体のクローンは
/// 安価です。
#[derive(Clone)]
pub struct Tokenizer {
    dict: Arc<Dictionary>,
    user_dict: Option<Arc<UserDictionary>>,
    mode: Mode,
    omit_bos_eos: bool,
}

impl Tokenizer {
    /// 新しいトークナイザーを作成します。
    ///
    /// 辞書の所有権はトークナイザーに移動します。複数のトークナイザー間で
    /// 辞書を共有する場合は[`Tokenizer::from_shared_dictionary`]を使用して
    /// ください。
    ///
    /// # 引数
    ///
    /// * `dict` - 形態素解析に使用する辞書
    pub fn new(dict: Dictionary) -> Self {
        Self {
            dict: Arc::new(dict),
            user_dict: None,
            mode: Mode::Normal,
            omit_bos_eos: false,
        }
    }

    /// 共有された辞書から新しいトークナイザーを作成します。
    ///
    /// 複数のトークナイザーインスタンスが辞書データを再読み込みすることなく
    /// 同じ辞書を共有するマルチスレッドシナリオで便利です。
    ///
    /// # 引数
    ///
    /// * `dict` - 共有される辞書への`Arc`参照
    pub fn from_shared_dictionary(dict: Arc<Dictionary>) -> Self {
        Self {
            dict,
            user_dict: None,
            mode: Mode::Normal,
            omit_bos_eos: false,
        }
    }

    /// ユーザー辞書を設定します。
    ///
    /// ユーザー辞書はシステム辞書より優先して引かれます。
    ///
    /// # 引数
    ///
    /// * `user_dict` - ユーザー辞書
    pub fn user_dictionary(mut self, user_dict: UserDictionary) -> Self {
        self.user_dict = Some(Arc::new(user_dict));
        self
    }

    /// 既定の解析モードを設定します。
    ///
    /// # 引数
    ///
    /// * `mode` - 解析モード
    pub const fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// 出力からBOS/EOSトークンを省くかどうかを設定します。
    ///
    /// # 引数
    ///
    /// * `yes` - `true`の場合、BOS/EOSトークンを出力に含めません
    pub const fn omit_bos_eos(mut self, yes: bool) -> Self {
        self.omit_bos_eos = yes;
        self
    }

    /// 新しいワーカーを作成します。
    ///
    /// 各ワーカーは独立したラティス構造を保持するため、複数のワーカーを
    /// 並列に使用して同時に複数の文を解析できます。
    pub fn new_worker(&self) -> Worker {
        Worker::new(self.clone())
    }

    /// 辞書への参照を取得します。
    #[inline(always)]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    /// ユーザー辞書への参照を取得します。
    #[inline(always)]
    pub fn user_dictionary_ref(&self) -> Option<&UserDictionary> {
        self.user_dict.as_deref()
    }

    /// 既定の解析モードを返します。
    #[inline(always)]
    pub const fn default_mode(&self) -> Mode {
        self.mode
    }

    /// BOS/EOSトークンを省く設定かどうかを返します。
    #[inline(always)]
    pub const fn omits_bos_eos(&self) -> bool {
        self.omit_bos_eos
    }

    #[inline(always)]
    pub(crate) fn dict_arc(&self) -> &Arc<Dictionary> {
        &self.dict
    }

    #[inline(always)]
    pub(crate) fn user_dict_arc(&self) -> Option<&Arc<UserDictionary>> {
        self.user_dict.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dictionary::{
        CharCategory, CharTable, ConnectionMatrix, ContentsMeta, DoubleArray, Morph, PosTable,
        UnknownDict, UserEntry, POS_HIERARCHY, POS_START_INDEX,
    };
    use hashbrown::HashMap;

    /// Builds a dictionary whose unknown-word table lacks the Alpha
    /// category, with grouping enabled for it.
    fn dict_without_alpha_unknowns() -> Dictionary {
        let mut category = vec![CharCategory::Default as u8; 0x100];
        for cp in 0x41..=0x5A {
            category[cp] = CharCategory::Alpha as u8;
        }
        for cp in 0x61..=0x7A {
            category[cp] = CharCategory::Alpha as u8;
        }
        let mut group = vec![false; CharCategory::COUNT];
        group[CharCategory::Alpha as usize] = true;
        let char_table = CharTable::from_raw(category, vec![true; CharCategory::COUNT], group);

        let mut meta = ContentsMeta::default();
        meta.insert(POS_START_INDEX, 0);
        meta.insert(POS_HIERARCHY, 1);
        let unk = UnknownDict::from_raw(
            vec![Morph::new(0, 0, 100)],
            {
                let mut index = HashMap::new();
                index.insert(CharCategory::Default as i32, 0);
                index
            },
            HashMap::new(),
            meta,
            vec![vec!["名詞".to_string()]],
        );

        Dictionary::from_tables(
            Vec::new(),
            PosTable::default(),
            ContentsMeta::default(),
            Vec::new(),
            ConnectionMatrix::new(1, 1, vec![0]),
            DoubleArray::from_entries(&[] as &[(&str, i32, i32)]),
            char_table,
            unk,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_fallback_dict_segments_classic_sentence() {
        let tokenizer = Tokenizer::new(Dictionary::fallback()).omit_bos_eos(true);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("すもももももももものうち");
        worker.tokenize();

        let surfaces: Vec<&str> = worker.token_iter().map(|t| t.surface()).collect();
        assert_eq!(surfaces, vec!["すもも", "もも", "もも", "もも", "の", "うち"]);

        // Coverage: the best-path tokens tile the whole input.
        let total_chars: usize = worker.token_iter().map(|t| t.surface().chars().count()).sum();
        assert_eq!(total_chars, "すもももももももものうち".chars().count());
    }

    #[test]
    fn test_fallback_dict_splits_tokyoto() {
        let tokenizer = Tokenizer::new(Dictionary::fallback()).omit_bos_eos(true);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("東京都");
        worker.tokenize();

        let surfaces: Vec<&str> = worker.token_iter().map(|t| t.surface()).collect();
        assert_eq!(surfaces, vec!["東京", "都"]);
        assert!(worker
            .token_iter()
            .all(|t| t.class() == NodeClass::Known));
    }

    #[test]
    fn test_ascii_run_groups_into_one_unknown() {
        let tokenizer = Tokenizer::new(Dictionary::fallback()).omit_bos_eos(true);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("ABC");
        worker.tokenize();

        assert_eq!(worker.num_tokens(), 1);
        let token = worker.token(0);
        assert_eq!(token.surface(), "ABC");
        assert_eq!(token.class(), NodeClass::Unknown);
    }

    #[test]
    fn test_empty_input() {
        let tokenizer = Tokenizer::new(Dictionary::fallback());
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("");
        worker.tokenize();

        // BOS and EOS survive unless omitted.
        assert_eq!(worker.num_tokens(), 2);
        assert_eq!(worker.token(0).surface(), "");
        assert_eq!(worker.token(1).surface(), "");
        assert!(worker.token_iter().all(|t| t.class() == NodeClass::Dummy));

        let tokenizer = Tokenizer::new(Dictionary::fallback()).omit_bos_eos(true);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("");
        worker.tokenize();
        assert_eq!(worker.num_tokens(), 0);
        assert!(worker.wakati().is_empty());
    }

    #[test]
    fn test_fallback_analyzes_single_kanji() {
        let tokenizer = Tokenizer::new(Dictionary::fallback()).omit_bos_eos(true);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("猫");
        worker.tokenize();

        assert!(worker.num_tokens() >= 1);
        assert_eq!(worker.token(0).surface(), "猫");
    }

    #[test]
    fn test_extended_mode_splits_uncategorized_run() {
        let tokenizer = Tokenizer::new(Dictionary::fallback())
            .mode(Mode::Extended)
            .omit_bos_eos(true);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("ℵℵℵℵ");
        worker.tokenize();

        assert_eq!(worker.num_tokens(), 4);
        for token in worker.token_iter() {
            assert_eq!(token.class(), NodeClass::Dummy);
            assert_eq!(token.surface().chars().count(), 1);
            assert_eq!(token.surface(), "ℵ");
        }
        // Splitting preserves the original span.
        let concat: String = worker.token_iter().map(|t| t.surface()).collect();
        assert_eq!(concat, "ℵℵℵℵ");
    }

    #[test]
    fn test_uncategorized_category_yields_connectivity_node() {
        let tokenizer = Tokenizer::new(dict_without_alpha_unknowns()).omit_bos_eos(true);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("AB");
        worker.tokenize();

        assert_eq!(worker.num_tokens(), 1);
        let token = worker.token(0);
        assert_eq!(token.surface(), "AB");
        assert_eq!(token.class(), NodeClass::Unknown);
        assert_eq!(token.id(), lattice::UNCATEGORIZED_ID);
        assert!(token.features().is_empty());
    }

    #[test]
    fn test_wakati_round_trip() {
        let tokenizer = Tokenizer::new(Dictionary::fallback()).omit_bos_eos(true);
        let mut worker = tokenizer.new_worker();
        for input in ["すもももももももものうち", "東京都の猫とABC123", "ℵ猫x"] {
            worker.reset_sentence(input);
            worker.tokenize();
            let concat: String = worker.wakati().concat();
            assert_eq!(concat, *input);
        }
    }

    #[test]
    fn test_cost_monotonicity_and_boundaries() {
        let tokenizer = Tokenizer::new(Dictionary::fallback());
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("東京都の猫");
        worker.tokenize();

        let input_len = "東京都の猫".len();
        let mut last_cost = i32::MIN;
        let mut last_end = 0usize;
        for token in worker.token_iter() {
            assert!(token.total_cost() >= last_cost);
            last_cost = token.total_cost();
            // Byte offsets lie on UTF-8 boundaries of the input.
            assert!(worker.input().is_char_boundary(token.start()));
            assert!(token.end() <= input_len);
            assert!(token.start() >= last_end);
            last_end = token.end();
            // Surface faithfulness.
            assert_eq!(&worker.input()[token.start()..token.end()], token.surface());
        }
    }

    #[test]
    fn test_mode_ordering_on_eos_cost() {
        let tokenizer = Tokenizer::new(Dictionary::fallback());
        let mut worker = tokenizer.new_worker();

        let eos_cost = |worker: &mut Worker, mode: Mode| {
            worker.reset_sentence("東京都の猫はすもももももも食べない");
            worker.tokenize_with_mode(mode);
            let eos = worker.token(worker.num_tokens() - 1);
            eos.total_cost()
        };

        let normal = eos_cost(&mut worker, Mode::Normal);
        let search = eos_cost(&mut worker, Mode::Search);
        let extended = eos_cost(&mut worker, Mode::Extended);
        assert!(normal <= search);
        assert!(search <= extended);
    }

    #[test]
    fn test_search_mode_penalizes_long_kanji_entries() {
        // 東京都庁 as a single 4-kanji entry: crossing it in Search mode
        // costs an extra (4 - 2) * 3000 on the way to EOS.
        let morphs = vec![Morph::new(0, 0, 100)];
        let pos_table = PosTable {
            names: vec!["名詞".to_string()],
            entries: vec![vec![0]],
        };
        let index = DoubleArray::from_entries(&[("東京都庁", 0, 0)]);
        let dict = Dictionary::from_tables(
            morphs,
            pos_table,
            ContentsMeta::default(),
            vec![vec!["名詞".to_string()]],
            ConnectionMatrix::new(1, 1, vec![0]),
            index,
            CharTable::from_raw(Vec::new(), Vec::new(), Vec::new()),
            UnknownDict::default(),
            None,
        )
        .unwrap();

        let tokenizer = Tokenizer::new(dict);
        let mut worker = tokenizer.new_worker();

        worker.reset_sentence("東京都庁");
        worker.tokenize_with_mode(Mode::Normal);
        let normal = worker.token(worker.num_tokens() - 1).total_cost();

        worker.reset_sentence("東京都庁");
        worker.tokenize_with_mode(Mode::Search);
        let search = worker.token(worker.num_tokens() - 1).total_cost();

        assert_eq!(search - normal, 2 * 3000);
    }

    #[test]
    fn test_tie_break_prefers_first_predecessor() {
        // Two unknown hypotheses with identical parameters occupy the same
        // bucket; the successor must keep the first one discovered.
        let mut meta = ContentsMeta::default();
        meta.insert(POS_START_INDEX, 0);
        meta.insert(POS_HIERARCHY, 1);
        let unk = UnknownDict::from_raw(
            vec![Morph::new(0, 0, 100), Morph::new(0, 0, 100)],
            {
                let mut index = HashMap::new();
                index.insert(CharCategory::Default as i32, 0);
                index
            },
            {
                let mut index_dup = HashMap::new();
                index_dup.insert(CharCategory::Default as i32, 1);
                index_dup
            },
            meta,
            vec![vec!["名詞".to_string()], vec!["名詞".to_string()]],
        );
        let dict = Dictionary::from_tables(
            Vec::new(),
            PosTable::default(),
            ContentsMeta::default(),
            Vec::new(),
            ConnectionMatrix::new(1, 1, vec![0]),
            DoubleArray::from_entries(&[] as &[(&str, i32, i32)]),
            CharTable::from_raw(Vec::new(), Vec::new(), Vec::new()),
            unk,
            None,
        )
        .unwrap();

        let tokenizer = Tokenizer::new(dict).omit_bos_eos(true);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("ℵℵ");
        worker.tokenize();

        // Both positions resolve to the first hypothesis (morph id 0).
        assert_eq!(worker.num_tokens(), 2);
        for token in worker.token_iter() {
            assert_eq!(token.id(), 0);
        }
    }

    #[test]
    fn test_user_dictionary_wins_over_system() {
        let user = UserDictionary::new(vec![UserEntry {
            surface: "東京都".to_string(),
            pos: "カスタム名詞".to_string(),
            tokens: vec!["東京".to_string(), "都".to_string()],
            yomi: vec!["トウキョウ".to_string(), "ト".to_string()],
        }]);
        let tokenizer = Tokenizer::new(Dictionary::fallback())
            .user_dictionary(user)
            .omit_bos_eos(true);
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("東京都");
        worker.tokenize();

        assert_eq!(worker.num_tokens(), 1);
        let token = worker.token(0);
        assert_eq!(token.surface(), "東京都");
        assert_eq!(token.class(), NodeClass::User);
        assert_eq!(token.pos(), vec!["カスタム名詞".to_string()]);
        assert_eq!(
            token.features(),
            vec![
                "カスタム名詞".to_string(),
                "東京/都".to_string(),
                "トウキョウ/ト".to_string(),
            ]
        );
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!(Mode::from_str("normal"), Ok(Mode::Normal));
        assert_eq!(Mode::from_str("search"), Ok(Mode::Search));
        assert_eq!(Mode::from_str("extended"), Ok(Mode::Extended));
        assert!(Mode::from_str("fast").is_err());
    }

    #[test]
    fn test_char_table_invoke_defaults() {
        let dict = Dictionary::fallback();
        assert!(dict.char_table().should_invoke(CharCategory::Kanji));
        assert!(dict.char_table().should_group(CharCategory::Hiragana));
        assert!(!dict.char_table().should_group(CharCategory::Symbol));
    }
}
