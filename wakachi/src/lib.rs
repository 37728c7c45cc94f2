//! # Wakachi
//!
//! Wakachiは、ビタビアルゴリズムに基づく日本語形態素解析（トークン化）の実装です。
//!
//! ## 概要
//!
//! このライブラリは、スパム分類器などのテキスト処理ホストに組み込むことを想定した
//! 形態素解析エンジンを提供します。辞書はダブル配列トライ、形態素表、品詞表、
//! 接続コスト行列、文字カテゴリ表、未知語表から構成され、入力テキストから
//! ラティスを構築してビタビ探索で最小コストの分割を求めます。
//!
//! ## 主な機能
//!
//! - **3つの解析モード**: Normal（通常）、Search（検索向け追加分割）、
//!   Extended（未知語の1文字分割）
//! - **未知語処理**: 文字カテゴリ駆動のグルーピングによる未知語仮説の生成
//! - **ユーザー辞書**: システム辞書より優先される任意のユーザー語彙
//! - **組み込み向け設計**: 辞書は読み取り専用で共有可能、解析はワーカー単位で独立
//!
//! ## 使用例
//!
//! ```
//! use wakachi::{Dictionary, Tokenizer};
//!
//! let dict = Dictionary::fallback();
//! let tokenizer = Tokenizer::new(dict).omit_bos_eos(true);
//! let mut worker = tokenizer.new_worker();
//!
//! worker.reset_sentence("猫");
//! worker.tokenize();
//! assert!(worker.num_tokens() >= 1);
//! assert_eq!(worker.token(0).surface(), "猫");
//! ```

#[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))]
compile_error!("`target_pointer_width` must be 32 or 64");

/// 日本語テキストの判定
pub mod detect;

/// 辞書データ構造とローダー
pub mod dictionary;

/// エラー型の定義
pub mod errors;

/// 文の内部表現
mod sentence;

/// トークン型の定義
pub mod token;

/// トークナイザーの実装
pub mod tokenizer;

// Re-exports
pub use dictionary::{Dictionary, UserDictionary};
pub use token::{Token, TokenData};
pub use tokenizer::{Mode, Tokenizer};

/// このライブラリのバージョン番号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
