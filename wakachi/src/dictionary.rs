//! トークン化のための辞書モジュール。
//!
//! このモジュールは、形態素解析に必要な辞書データの読み込みと管理を行います。
//! 辞書は以下の論理表の合成です:
//!
//! - 形態素表（接続IDと生起コスト）
//! - 品詞表
//! - 素性表とそのメタデータ
//! - 接続コスト行列
//! - ダブル配列トライによる索引
//! - 文字カテゴリ表
//! - 未知語辞書
//!
//! # 辞書の読み込み方法
//!
//! - [`Dictionary::from_path`]: アーカイブファイルから読み込む（推奨）
//! - [`Dictionary::read`]: リーダーから読み込む
//! - [`Dictionary::locate_or_fallback`]: 候補パスを順に試し、最終的に
//!   組み込みフォールバック辞書へ切り替える
pub(crate) mod character;
pub(crate) mod connection;
pub(crate) mod contents;
pub(crate) mod morph;
pub(crate) mod pos;
pub(crate) mod trie;
pub(crate) mod unknown;
pub(crate) mod user;

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use bincode::config::{self, Fixint, LittleEndian};
use bincode::{Decode, Encode};
use hashbrown::HashMap;
use tracing::{info, warn};

use crate::errors::{Result, WakachiError};

pub use crate::dictionary::character::{CharCategory, CharTable};
pub use crate::dictionary::connection::ConnectionMatrix;
pub use crate::dictionary::contents::{
    ContentsMeta, BASE_FORM_INDEX, FEATURE_PLACEHOLDER, INFLECTIONAL_FORM, INFLECTIONAL_TYPE,
    POS_HIERARCHY, POS_START_INDEX, PRONUNCIATION_INDEX, READING_INDEX,
};
pub use crate::dictionary::morph::Morph;
pub use crate::dictionary::pos::PosTable;
pub use crate::dictionary::trie::{DaNode, DoubleArray};
pub use crate::dictionary::unknown::UnknownDict;
pub use crate::dictionary::user::{UserDictionary, UserEntry};

/// Wakachi辞書アーカイブを識別するマジックバイト。
///
/// "0.1"はアーカイブフォーマットのバージョンを示しており、クレートの
/// セマンティックバージョンからは切り離されています。
pub const MODEL_MAGIC: &[u8] = b"WakachiDict 0.1\n";

const MODEL_MAGIC_LEN: usize = MODEL_MAGIC.len();

/// 辞書アーカイブの最大サイズ（バイト）。これを超えるファイルは破損として
/// 拒否されます。
pub const MAX_MODEL_SIZE: u64 = 500 * 1024 * 1024;

/// シリアライゼーションの共通bincode設定を取得します。
///
/// リトルエンディアンと固定長整数エンコーディングにより、プラットフォーム間で
/// 一貫したアーカイブが保証されます。
pub(crate) const fn bincode_config() -> config::Configuration<LittleEndian, Fixint> {
    config::standard()
        .with_little_endian()
        .with_fixed_int_encoding()
}

/// 辞書のメタ情報
#[derive(Debug, Clone, Decode, Encode)]
pub struct DictInfo {
    /// 辞書名
    pub name: String,
    /// 辞書の出典
    pub src: String,
}

/// トークン化のための読み取り専用辞書。
///
/// 読み込み後は不変であり、`Arc`で包んで複数のトークナイザー・スレッド間で
/// 自由に共有できます。解析はこの辞書への読み取り参照のみを使用します。
#[derive(Decode, Encode)]
pub struct Dictionary {
    morphs: Vec<Morph>,
    pos_table: PosTable,
    contents_meta: ContentsMeta,
    contents: Vec<Vec<String>>,
    connection: ConnectionMatrix,
    index: DoubleArray,
    char_table: CharTable,
    unk: UnknownDict,
    info: Option<DictInfo>,
}

impl Dictionary {
    /// 論理表一式から辞書を構築します。
    ///
    /// 構築時に[`Self::validate`]と同じ整合性検査が行われます。
    #[allow(clippy::too_many_arguments)]
    pub fn from_tables(
        morphs: Vec<Morph>,
        pos_table: PosTable,
        contents_meta: ContentsMeta,
        contents: Vec<Vec<String>>,
        connection: ConnectionMatrix,
        index: DoubleArray,
        char_table: CharTable,
        unk: UnknownDict,
        info: Option<DictInfo>,
    ) -> Result<Self> {
        let dict = Self {
            morphs,
            pos_table,
            contents_meta,
            contents,
            connection,
            index,
            char_table,
            unk,
            info,
        };
        dict.validate()?;
        Ok(dict)
    }

    /// リーダーから辞書を読み込みます。
    ///
    /// # エラー
    ///
    /// マジックバイトの不一致、デコード失敗、整合性検査の失敗で
    /// [`WakachiError`]を返します。
    pub fn read<R>(mut rdr: R) -> Result<Self>
    where
        R: Read,
    {
        let mut magic = [0u8; MODEL_MAGIC_LEN];
        rdr.read_exact(&mut magic)?;
        if magic != MODEL_MAGIC {
            return Err(WakachiError::invalid_format(
                "dictionary",
                "unexpected magic bytes; not a wakachi dictionary archive",
            ));
        }
        let dict: Self = bincode::decode_from_std_read(&mut rdr, bincode_config())?;
        dict.validate()?;
        Ok(dict)
    }

    /// ライターに辞書アーカイブを書き出します。
    pub fn write<W>(&self, mut wtr: W) -> Result<()>
    where
        W: Write,
    {
        wtr.write_all(MODEL_MAGIC)?;
        bincode::encode_into_std_write(self, &mut wtr, bincode_config())?;
        Ok(())
    }

    /// アーカイブファイルから辞書を読み込みます。
    ///
    /// # エラー
    ///
    /// ファイルが空、または[`MAX_MODEL_SIZE`]を超える場合は読み込みを
    /// 試みずに拒否します。
    pub fn from_path<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        if metadata.len() == 0 {
            return Err(WakachiError::invalid_argument(
                "path",
                format!("dictionary file is empty: {}", path.display()),
            ));
        }
        if metadata.len() > MAX_MODEL_SIZE {
            return Err(WakachiError::invalid_argument(
                "path",
                format!(
                    "dictionary file exceeds {} bytes: {}",
                    MAX_MODEL_SIZE,
                    path.display()
                ),
            ));
        }
        let reader = BufReader::new(File::open(path)?);
        Self::read(reader)
    }

    /// 候補パスを順に試して辞書を読み込み、すべて失敗した場合は
    /// 組み込みフォールバック辞書を返します。
    ///
    /// # 引数
    ///
    /// * `candidates` - 試行するアーカイブパスの列
    ///
    /// # 戻り値
    ///
    /// 読み込まれた辞書と、フォールバックが使われたかどうか
    pub fn locate_or_fallback(candidates: &[PathBuf]) -> (Self, bool) {
        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::from_path(path) {
                Ok(dict) => {
                    info!(path = %path.display(), "loaded dictionary archive");
                    return (dict, false);
                }
                Err(err) => {
                    warn!(path = %path.display(), %err, "failed to load dictionary archive");
                }
            }
        }
        info!("no dictionary archive found; using the built-in fallback dictionary");
        (Self::fallback(), true)
    }

    /// 既定の辞書アーカイブ候補パスを返します。
    ///
    /// 環境変数`WAKACHI_DICT_PATH`が設定されていれば先頭に置かれます。
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(env_path) = std::env::var("WAKACHI_DICT_PATH") {
            if !env_path.is_empty() {
                paths.push(PathBuf::from(env_path));
            }
        }
        paths.push(PathBuf::from("data/system.dict"));
        paths.push(PathBuf::from("/usr/local/share/wakachi/system.dict"));
        paths.push(PathBuf::from("/usr/share/wakachi/system.dict"));
        paths
    }

    /// 辞書の整合性を検査します。
    ///
    /// 接続行列の次元不一致や索引の範囲逸脱はアーカイブ破損として
    /// 読み込み時に拒否されます。解析パスでは検査は行われません。
    pub fn validate(&self) -> Result<()> {
        let expected = self.connection.rows() as usize * self.connection.cols() as usize;
        if self.connection.len() != expected {
            return Err(WakachiError::invalid_format(
                "connection",
                format!(
                    "connection matrix length {} does not match {}x{}",
                    self.connection.len(),
                    self.connection.rows(),
                    self.connection.cols()
                ),
            ));
        }
        for (id, entry) in self.pos_table.entries.iter().enumerate() {
            for &name_idx in entry {
                if name_idx as usize >= self.pos_table.names.len() {
                    return Err(WakachiError::invalid_format(
                        "pos_table",
                        format!("entry {id} references unknown pos name {name_idx}"),
                    ));
                }
            }
        }
        for category in 0..CharCategory::COUNT as i32 {
            let category = CharCategory::from_u8(category as u8);
            if let Some(base_id) = self.unk.base_id(category) {
                let last = base_id + self.unk.dup_count(category);
                if base_id < 0 || last as usize >= self.unk.morphs.len() {
                    return Err(WakachiError::invalid_format(
                        "unk",
                        format!("category {category:?} references morph range {base_id}..={last} out of bounds"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// 形態素パラメータを返します。範囲外のIDは既定値（すべて0）です。
    #[inline(always)]
    pub fn morph(&self, id: i32) -> Morph {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.morphs.get(i))
            .copied()
            .unwrap_or_default()
    }

    /// 登録形態素数を返します。
    #[inline(always)]
    pub fn num_morphs(&self) -> usize {
        self.morphs.len()
    }

    /// 形態素の素性行を返します。範囲外のIDは空です。
    #[inline(always)]
    pub fn content(&self, id: i32) -> &[String] {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.contents.get(i))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 品詞表への参照を返します。
    #[inline(always)]
    pub fn pos_table(&self) -> &PosTable {
        &self.pos_table
    }

    /// 素性表メタデータへの参照を返します。
    #[inline(always)]
    pub fn contents_meta(&self) -> &ContentsMeta {
        &self.contents_meta
    }

    /// 接続コスト行列への参照を返します。
    #[inline(always)]
    pub fn connection(&self) -> &ConnectionMatrix {
        &self.connection
    }

    /// 表層形索引への参照を返します。
    #[inline(always)]
    pub fn index(&self) -> &DoubleArray {
        &self.index
    }

    /// 文字カテゴリ表への参照を返します。
    #[inline(always)]
    pub fn char_table(&self) -> &CharTable {
        &self.char_table
    }

    /// 未知語辞書への参照を返します。
    #[inline(always)]
    pub fn unknown(&self) -> &UnknownDict {
        &self.unk
    }

    /// 辞書のメタ情報を返します。
    #[inline(always)]
    pub fn info(&self) -> Option<&DictInfo> {
        self.info.as_ref()
    }

    /// 表層形の完全一致検索を行い、対応する形態素ID列を返します。
    pub fn lookup_ids(&self, surface: &str) -> Vec<i32> {
        self.index.search(surface.as_bytes())
    }

    /// 組み込みフォールバック辞書を構築します。
    ///
    /// アーカイブが見つからない場合でも解析器を機能させ続けるための
    /// 最小限の辞書です。基本多言語面の文字分類、カテゴリごとの未知語
    /// エントリ、少数の頻出語を含みます。
    pub fn fallback() -> Self {
        // Context ids: 0 = boundary, 1 = noun, 2 = particle.
        let rows = 3u32;
        let cols = 3u32;
        // Stored transposed: vec[rows * col + row].
        let connection = ConnectionMatrix::new(
            rows,
            cols,
            vec![
                0, 0, 0, // col 0
                0, 300, -100, // col 1
                0, -100, 500, // col 2
            ],
        );

        let noun = |weight| Morph::new(1, 1, weight);
        let particle = |weight| Morph::new(2, 2, weight);

        // Sorted by the UTF-8 byte order of the surfaces.
        let lexicon: Vec<(&str, Morph, Vec<u32>, Vec<&str>)> = vec![
            ("うち", noun(2500), vec![0], vec!["名詞", "一般", "うち", "ウチ", "ウチ"]),
            ("すもも", noun(2000), vec![0], vec!["名詞", "一般", "すもも", "スモモ", "スモモ"]),
            ("の", particle(1000), vec![1], vec!["助詞", "連体化", "の", "ノ", "ノ"]),
            ("も", particle(1200), vec![1], vec!["助詞", "係助詞", "も", "モ", "モ"]),
            ("もも", noun(2000), vec![0], vec!["名詞", "一般", "もも", "モモ", "モモ"]),
            ("日本", noun(2000), vec![0], vec!["名詞", "固有名詞", "日本", "ニッポン", "ニッポン"]),
            ("東京", noun(2000), vec![0], vec!["名詞", "固有名詞", "東京", "トウキョウ", "トーキョー"]),
            ("犬", noun(2500), vec![0], vec!["名詞", "一般", "犬", "イヌ", "イヌ"]),
            ("猫", noun(2500), vec![0], vec!["名詞", "一般", "猫", "ネコ", "ネコ"]),
            ("都", noun(2900), vec![0], vec!["名詞", "接尾", "都", "ト", "ト"]),
        ];

        let keys: Vec<(&str, i32, i32)> = lexicon
            .iter()
            .enumerate()
            .map(|(i, (surface, _, _, _))| (*surface, i as i32, 0))
            .collect();
        let index = DoubleArray::from_entries(&keys);

        let morphs: Vec<Morph> = lexicon.iter().map(|(_, m, _, _)| *m).collect();
        let pos_entries: Vec<Vec<u32>> = lexicon.iter().map(|(_, _, e, _)| e.clone()).collect();
        let contents: Vec<Vec<String>> = lexicon
            .iter()
            .map(|(_, _, _, row)| row.iter().map(|s| s.to_string()).collect())
            .collect();

        let pos_table = PosTable {
            names: vec!["名詞".to_string(), "助詞".to_string()],
            entries: pos_entries,
        };

        let mut contents_meta = ContentsMeta::default();
        contents_meta.insert(POS_START_INDEX, 0);
        contents_meta.insert(POS_HIERARCHY, 2);
        contents_meta.insert(BASE_FORM_INDEX, 2);
        contents_meta.insert(READING_INDEX, 3);
        contents_meta.insert(PRONUNCIATION_INDEX, 4);

        let dict = Self {
            morphs,
            pos_table,
            contents_meta,
            contents,
            connection,
            index,
            char_table: Self::fallback_char_table(),
            unk: Self::fallback_unknown_dict(),
            info: Some(DictInfo {
                name: "wakachi built-in".to_string(),
                src: "fallback".to_string(),
            }),
        };
        debug_assert!(dict.validate().is_ok());
        dict
    }

    fn fallback_char_table() -> CharTable {
        let mut category = vec![CharCategory::Default as u8; 0x10000];
        let mut set = |range: std::ops::RangeInclusive<u32>, cat: CharCategory| {
            for cp in range {
                category[cp as usize] = cat as u8;
            }
        };

        set(0x0020..=0x0020, CharCategory::Space);
        set(0x3000..=0x3000, CharCategory::Space);
        set(0x0030..=0x0039, CharCategory::Numeric);
        set(0x0041..=0x005A, CharCategory::Alpha);
        set(0x0061..=0x007A, CharCategory::Alpha);
        set(0x0021..=0x002F, CharCategory::Symbol);
        set(0x003A..=0x0040, CharCategory::Symbol);
        set(0x005B..=0x0060, CharCategory::Symbol);
        set(0x007B..=0x007E, CharCategory::Symbol);
        set(0x0370..=0x03FF, CharCategory::Greek);
        set(0x0400..=0x04FF, CharCategory::Cyrillic);
        set(0x3041..=0x309F, CharCategory::Hiragana);
        set(0x30A0..=0x30FF, CharCategory::Katakana);
        set(0x31F0..=0x31FF, CharCategory::Katakana);
        set(0xFF66..=0xFF9F, CharCategory::Katakana);
        set(0x3005..=0x3007, CharCategory::Kanji);
        set(0x3400..=0x4DBF, CharCategory::Kanji);
        set(0x4E00..=0x9FFF, CharCategory::Kanji);
        set(0xF900..=0xFAFF, CharCategory::Kanji);

        let invoke = vec![true; CharCategory::COUNT];
        let mut group = vec![false; CharCategory::COUNT];
        group[CharCategory::Numeric as usize] = true;
        group[CharCategory::Alpha as usize] = true;
        group[CharCategory::Hiragana as usize] = true;
        group[CharCategory::Katakana as usize] = true;
        group[CharCategory::Kanji as usize] = true;

        CharTable::from_raw(category, invoke, group)
    }

    fn fallback_unknown_dict() -> UnknownDict {
        // One unknown entry per character category, id = category value.
        let morphs = vec![
            Morph::new(1, 1, 1000), // Default
            Morph::new(0, 0, 500),  // Space
            Morph::new(1, 1, 1500), // Numeric
            Morph::new(1, 1, 2000), // Alpha
            Morph::new(0, 0, 3000), // Symbol
            Morph::new(2, 2, 800),  // Hiragana
            Morph::new(1, 1, 1200), // Katakana
            Morph::new(1, 1, 1000), // Kanji
            Morph::new(1, 1, 2000), // Greek
            Morph::new(1, 1, 2000), // Cyrillic
        ];
        let rows: Vec<Vec<&str>> = vec![
            vec!["名詞", "一般", "*", "*", "*"],
            vec!["記号", "空白", "*", "*", "*"],
            vec!["名詞", "数", "*", "*", "*"],
            vec!["名詞", "固有名詞", "*", "*", "*"],
            vec!["記号", "一般", "*", "*", "*"],
            vec!["助詞", "格助詞", "*", "*", "*"],
            vec!["名詞", "一般", "*", "*", "*"],
            vec!["名詞", "一般", "*", "*", "*"],
            vec!["名詞", "固有名詞", "*", "*", "*"],
            vec!["名詞", "固有名詞", "*", "*", "*"],
        ];
        let contents = rows
            .into_iter()
            .map(|row| row.into_iter().map(str::to_string).collect())
            .collect();

        let mut index = HashMap::new();
        let index_dup = HashMap::new();
        for category in 0..CharCategory::COUNT as i32 {
            index.insert(category, category);
        }

        let mut contents_meta = ContentsMeta::default();
        contents_meta.insert(POS_START_INDEX, 0);
        contents_meta.insert(POS_HIERARCHY, 2);

        UnknownDict::from_raw(morphs, index, index_dup, contents_meta, contents)
    }
}

impl std::fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dictionary")
            .field("morphs", &self.morphs.len())
            .field("contents", &self.contents.len())
            .field("connection", &self.connection)
            .field("index", &self.index)
            .field("info", &self.info)
            .finish()
    }
}
