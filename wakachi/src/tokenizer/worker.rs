//! トークン化処理のためのルーチンを提供するモジュール。
//!
//! このモジュールは、形態素解析のための主要なワーカー構造体を提供します。
//! ワーカーは文・ラティス・出力パスの内部バッファを保持し、解析のたびに
//! 再利用することで不要なメモリアロケーションを避けます。

use std::io::Write;
use std::sync::Arc;

use crate::sentence::Sentence;
use crate::token::{Token, TokenIter};
use crate::tokenizer::lattice::{Lattice, Node, BOS_EOS_ID};
use crate::tokenizer::{Mode, Tokenizer};

/// トークン化処理のためのルーチンを提供する構造体。
///
/// トークン化に使用される内部データ構造を保持し、それらを再利用することで
/// 不要なメモリ再割り当てを回避します。ワーカーは共有状態を持たないため、
/// 1スレッドに1つずつ作成して並列に解析できます。
///
/// # 例
///
/// ```
/// use wakachi::{Dictionary, Tokenizer};
///
/// let tokenizer = Tokenizer::new(Dictionary::fallback()).omit_bos_eos(true);
/// let mut worker = tokenizer.new_worker();
/// worker.reset_sentence("東京都");
/// worker.tokenize();
/// for token in worker.token_iter() {
///     println!("{}", token.surface());
/// }
/// ```
pub struct Worker {
    pub(crate) tokenizer: Tokenizer,
    pub(crate) sent: Sentence,
    pub(crate) lattice: Lattice,
    pub(crate) path: Vec<Node>,
}

impl Worker {
    /// 新しいインスタンスを作成します。
    ///
    /// # 引数
    ///
    /// * `tokenizer` - 使用するトークナイザー
    pub(crate) fn new(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            sent: Sentence::new(),
            lattice: Lattice::default(),
            path: Vec::new(),
        }
    }

    /// トークン化する入力文をリセットします。
    ///
    /// 新しい文を設定し、以前の解析結果をクリアします。
    ///
    /// # 引数
    ///
    /// * `input` - トークン化する入力文字列
    pub fn reset_sentence<S>(&mut self, input: S)
    where
        S: AsRef<str>,
    {
        self.path.clear();
        let char_table = self.tokenizer.dictionary().char_table();
        self.sent.compile(input, char_table);
    }

    /// 設定された入力文を既定のモードでトークン化します。
    ///
    /// 結果は内部状態に保存され、[`Self::token_iter`]や[`Self::token`]で
    /// アクセスできます。
    pub fn tokenize(&mut self) {
        self.tokenize_with_mode(self.tokenizer.default_mode());
    }

    /// 設定された入力文を指定したモードでトークン化します。
    ///
    /// # 引数
    ///
    /// * `mode` - 解析モード
    pub fn tokenize_with_mode(&mut self, mode: Mode) {
        let dict = Arc::clone(self.tokenizer.dict_arc());
        let user_dict = self.tokenizer.user_dict_arc().cloned();

        self.lattice.build(&self.sent, &dict, user_dict.as_deref());
        self.lattice.forward(&self.sent, &dict, mode);
        self.lattice.backward(&self.sent, mode);

        self.path.clear();
        let omit = self.tokenizer.omits_bos_eos();
        for node in self.lattice.path() {
            if omit && node.id == BOS_EOS_ID {
                continue;
            }
            self.path.push(*node);
        }
    }

    /// 元の入力文字列を返します。
    #[inline(always)]
    pub fn input(&self) -> &str {
        self.sent.raw()
    }

    /// トークン化結果のトークン数を取得します。
    #[inline(always)]
    pub fn num_tokens(&self) -> usize {
        self.path.len()
    }

    /// `i`番目のトークンを取得します。
    ///
    /// # 引数
    ///
    /// * `i` - トークンのインデックス（0から始まる）
    ///
    /// # パニック
    ///
    /// `i`が範囲外の場合、[`Token`]のアクセサがパニックします。
    #[inline(always)]
    pub fn token(&self, i: usize) -> Token<'_> {
        Token::new(self, i)
    }

    /// トークン化結果のイテレータを作成します。
    #[inline(always)]
    pub fn token_iter(&self) -> TokenIter<'_> {
        TokenIter::new(self)
    }

    /// 分かち書き（表層形のみ）の結果を返します。
    ///
    /// 表層形が空のトークン（BOS/EOS）は含まれません。
    pub fn wakati(&self) -> Vec<&str> {
        self.token_iter()
            .map(|t| t.surface())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// 直近の解析のラティスをDOTグラフとして書き出します。
    ///
    /// # 引数
    ///
    /// * `wtr` - 書き込み先
    pub fn export_dot<W>(&self, wtr: W) -> std::io::Result<()>
    where
        W: Write,
    {
        self.lattice.export_dot(
            &self.sent,
            self.tokenizer.dictionary(),
            self.tokenizer.user_dictionary_ref(),
            wtr,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;

    #[test]
    fn test_worker_reuse() {
        let tokenizer = Tokenizer::new(Dictionary::fallback()).omit_bos_eos(true);
        let mut worker = tokenizer.new_worker();

        worker.reset_sentence("東京都");
        worker.tokenize();
        assert_eq!(worker.num_tokens(), 2);

        worker.reset_sentence("猫");
        worker.tokenize();
        assert_eq!(worker.num_tokens(), 1);
        assert_eq!(worker.token(0).surface(), "猫");

        // Resetting clears the previous result even without tokenize().
        worker.reset_sentence("犬");
        assert_eq!(worker.num_tokens(), 0);
    }

    #[test]
    fn test_export_dot_smoke() {
        let tokenizer = Tokenizer::new(Dictionary::fallback());
        let mut worker = tokenizer.new_worker();
        worker.reset_sentence("東京都");
        worker.tokenize();

        let mut out = Vec::new();
        worker.export_dot(&mut out).unwrap();
        let dot = String::from_utf8(out).unwrap();
        assert!(dot.starts_with("graph lattice {"));
        assert!(dot.contains("BOS"));
        assert!(dot.contains("EOS"));
        assert!(dot.contains("東京"));
        assert!(dot.trim_end().ends_with('}'));
    }
}
