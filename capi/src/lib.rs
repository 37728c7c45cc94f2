//! テキスト処理ホスト向けのC ABIシム
//!
//! このクレートは、wakachi解析器をC ABI越しに公開します。ホストの
//! カスタムトークナイザAPI（init / deinit / detect_language / tokenize /
//! cleanup_result / get_language_hint / get_min_confidence）に対応する
//! エントリポイントと、`#[repr(C)]`のワードレコード型を提供します。
//!
//! # 所有権の契約
//!
//! [`WakachiWord`]の`original.begin`は常に呼び出し側の入力バッファ内を
//! 指し、解放してはいけません。`unicode`・`normalized`・`stemmed`は
//! 結果が所有するヒープコピーであり、[`wakachi_cleanup_result`]が
//! 解放します。
//!
//! # スレッド契約
//!
//! グローバルな解析器は初期化1回・解析多数・終了1回のライフサイクルを
//! 持ちます。ホストは`init`/`deinit`と`tokenize`の並行実行を行わない
//! ことを保証します。`tokenize`同士の並行実行は安全です。

use std::borrow::Cow;
use std::os::raw::{c_char, c_int, c_uint, c_void};
use std::ptr;
use std::sync::RwLock;

use wakachi::tokenizer::worker::Worker;
use wakachi::{detect, Dictionary, Tokenizer};

/// ワードフラグ: 通常のテキストトークン
pub const WAKACHI_WORD_FLAG_TEXT: c_uint = 1 << 0;
/// ワードフラグ: 例外トークン（記号など）
pub const WAKACHI_WORD_FLAG_EXCEPTION: c_uint = 1 << 3;
/// ワードフラグ: UTF-8として有効
pub const WAKACHI_WORD_FLAG_UTF: c_uint = 1 << 6;
/// ワードフラグ: 正規化済み
pub const WAKACHI_WORD_FLAG_NORMALISED: c_uint = 1 << 7;
/// ワードフラグ: ストップワード（助詞・助動詞）
pub const WAKACHI_WORD_FLAG_STOP_WORD: c_uint = 1 << 10;

/// バイト列への参照（ホストの`ftok`互換）
#[repr(C)]
#[derive(Clone, Copy)]
pub struct WakachiFtok {
    /// バイト長
    pub len: usize,
    /// 先頭へのポインタ
    pub begin: *const c_char,
}

impl WakachiFtok {
    const fn null() -> Self {
        Self {
            len: 0,
            begin: ptr::null(),
        }
    }
}

/// UTF-32列への参照
#[repr(C)]
#[derive(Clone, Copy)]
pub struct WakachiFtokUnicode {
    /// スカラー値の個数
    pub len: usize,
    /// 先頭へのポインタ
    pub begin: *const u32,
}

/// 1トークン分のワードレコード
#[repr(C)]
#[derive(Clone, Copy)]
pub struct WakachiWord {
    /// 呼び出し側バッファ内の元表層形（所有しない）
    pub original: WakachiFtok,
    /// UTF-32コピー（結果が所有）
    pub unicode: WakachiFtokUnicode,
    /// 正規化形（基本形、なければ表層形。結果が所有）
    pub normalized: WakachiFtok,
    /// 語幹形（日本語では正規化形と同一。結果が所有）
    pub stemmed: WakachiFtok,
    /// ワードフラグ
    pub flags: c_uint,
}

/// トークン列の結果コンテナ（ホストのkvec互換）
#[repr(C)]
pub struct WakachiWords {
    /// 有効なワード数
    pub n: usize,
    /// 確保済みワード数
    pub m: usize,
    /// ワード配列
    pub a: *mut WakachiWord,
}

static ANALYZER: RwLock<Option<Tokenizer>> = RwLock::new(None);

fn write_error(error_buf: *mut c_char, error_buf_size: usize, message: &str) {
    if error_buf.is_null() || error_buf_size == 0 {
        return;
    }
    let bytes = message.as_bytes();
    let len = bytes.len().min(error_buf_size - 1);
    unsafe {
        ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, error_buf, len);
        *error_buf.add(len) = 0;
    }
}

/// 解析器を初期化します。
///
/// 既定の候補パスから辞書アーカイブを探し、見つからなければ組み込みの
/// フォールバック辞書で初期化します。フォールバック時も成功（0）を
/// 返し、警告を`error_buf`に書き込みます。
///
/// # 引数
///
/// * `_config` - ホストの設定オブジェクト（現在は未使用）
/// * `error_buf` - エラーメッセージの書き込み先（NULL可）
/// * `error_buf_size` - `error_buf`のサイズ
///
/// # 戻り値
///
/// 成功時は0、失敗時は負数
///
/// # Safety
///
/// `error_buf`はNULLであるか、`error_buf_size`バイト以上の書き込み可能な
/// バッファを指していなければなりません。
#[no_mangle]
pub unsafe extern "C" fn wakachi_init(
    _config: *const c_void,
    error_buf: *mut c_char,
    error_buf_size: usize,
) -> c_int {
    let (dict, used_fallback) = Dictionary::locate_or_fallback(&Dictionary::default_paths());
    if used_fallback {
        write_error(
            error_buf,
            error_buf_size,
            "Warning: Using the built-in fallback dictionary. \
             For full functionality, install a dictionary archive.",
        );
    }

    let tokenizer = Tokenizer::new(dict).omit_bos_eos(true);
    match ANALYZER.write() {
        Ok(mut guard) => {
            *guard = Some(tokenizer);
            0
        }
        Err(_) => {
            write_error(error_buf, error_buf_size, "Analyzer lock is poisoned");
            -1
        }
    }
}

/// 解析器を解放します。
#[no_mangle]
pub extern "C" fn wakachi_deinit() {
    if let Ok(mut guard) = ANALYZER.write() {
        *guard = None;
    }
}

/// テキストが日本語である確信度を返します。
///
/// ひらがな・カタカナ・漢字を含まない場合は`-1.0`、含む場合は
/// `[0.30, 0.95]`の確信度を返します。
///
/// # Safety
///
/// `text`はNULLであるか、`len`バイト以上の読み取り可能なバッファを
/// 指していなければなりません。
#[no_mangle]
pub unsafe extern "C" fn wakachi_detect_language(text: *const c_char, len: usize) -> f64 {
    if text.is_null() || len == 0 {
        return -1.0;
    }
    let bytes = std::slice::from_raw_parts(text as *const u8, len);
    let text = String::from_utf8_lossy(bytes);
    detect::japanese_confidence(&text)
}

/// テキストをトークン化し、ワードレコード列を`result`に書き込みます。
///
/// 各レコードの`original.begin`は呼び出し側の`text`バッファ内を指します。
/// 元のバッファ中にUTF-8境界で位置を特定できないトークンは出力から
/// 除外されます。
///
/// # 戻り値
///
/// 成功時は0、失敗時は負数
///
/// # Safety
///
/// `text`は`len`バイト以上の読み取り可能なバッファを、`result`は有効な
/// [`WakachiWords`]を指していなければなりません。`result`の所有フィールドは
/// [`wakachi_cleanup_result`]以外で解放してはいけません。
#[no_mangle]
pub unsafe extern "C" fn wakachi_tokenize(
    text: *const c_char,
    len: usize,
    result: *mut WakachiWords,
) -> c_int {
    if text.is_null() || len == 0 || result.is_null() {
        return -1;
    }
    let result = &mut *result;
    result.n = 0;
    result.m = 0;
    result.a = ptr::null_mut();

    let tokenizer = match ANALYZER.read() {
        Ok(guard) => match guard.as_ref() {
            Some(tokenizer) => tokenizer.clone(),
            None => return -1,
        },
        Err(_) => return -1,
    };

    let bytes = std::slice::from_raw_parts(text as *const u8, len);
    let input: Cow<str> = String::from_utf8_lossy(bytes);

    let mut worker = tokenizer.new_worker();
    worker.reset_sentence(input.as_ref());
    worker.tokenize();

    let words = collect_words(&worker, bytes);
    if words.is_empty() {
        return 0;
    }

    let mut words = words.into_boxed_slice();
    result.n = words.len();
    result.m = words.len();
    result.a = words.as_mut_ptr();
    std::mem::forget(words);
    0
}

/// 最良パスのトークンを、元のバッファ内に位置づけられたワードレコードに
/// 変換します。
fn collect_words(worker: &Worker, original: &[u8]) -> Vec<WakachiWord> {
    let mut words = Vec::with_capacity(worker.num_tokens());
    let mut search_start = 0usize;

    for token in worker.token_iter() {
        let surface = token.surface();
        if surface.is_empty() {
            continue;
        }
        // Locate the surface in the caller's buffer; tokens that cannot be
        // relocated on a UTF-8 boundary are dropped.
        let position = match find_in_buffer(original, surface.as_bytes(), search_start) {
            Some(position) => position,
            None => continue,
        };
        search_start = position + surface.len();

        let mut flags = WAKACHI_WORD_FLAG_TEXT | WAKACHI_WORD_FLAG_UTF | WAKACHI_WORD_FLAG_NORMALISED;
        let pos_tags = token.pos();
        if let Some(first) = pos_tags.first() {
            if first.starts_with("記号") {
                flags |= WAKACHI_WORD_FLAG_EXCEPTION;
            }
            if first == "助詞" || first == "助動詞" {
                flags |= WAKACHI_WORD_FLAG_STOP_WORD;
            }
        }

        let base_form = token.base_form();
        let normalized = if base_form.is_empty() || base_form == "*" {
            surface.to_string()
        } else {
            base_form
        };

        words.push(WakachiWord {
            original: WakachiFtok {
                len: surface.len(),
                begin: unsafe { original.as_ptr().add(position) as *const c_char },
            },
            unicode: owned_unicode(surface),
            normalized: owned_ftok(normalized.clone()),
            stemmed: owned_ftok(normalized),
            flags,
        });
    }

    let dropped = worker
        .token_iter()
        .filter(|t| !t.surface().is_empty())
        .count()
        - words.len();
    if dropped > 0 {
        tracing::debug!(dropped, "tokens not relocatable in the caller's buffer");
    }
    words
}

/// `haystack[from..]`から`needle`をUTF-8先頭バイト境界上で探します。
fn find_in_buffer(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    let mut position = from;
    while position + needle.len() <= haystack.len() {
        if &haystack[position..position + needle.len()] == needle
            && (position == 0 || !is_utf8_continuation(haystack[position]))
        {
            return Some(position);
        }
        position += 1;
    }
    None
}

#[inline]
fn is_utf8_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

fn owned_ftok(s: String) -> WakachiFtok {
    if s.is_empty() {
        return WakachiFtok::null();
    }
    let mut bytes = s.into_bytes();
    bytes.shrink_to_fit();
    let ftok = WakachiFtok {
        len: bytes.len(),
        begin: bytes.as_ptr() as *const c_char,
    };
    std::mem::forget(bytes);
    ftok
}

fn owned_unicode(s: &str) -> WakachiFtokUnicode {
    let mut scalars: Vec<u32> = s.chars().map(u32::from).collect();
    scalars.shrink_to_fit();
    let ftok = WakachiFtokUnicode {
        len: scalars.len(),
        begin: scalars.as_ptr(),
    };
    std::mem::forget(scalars);
    ftok
}

/// トークン化結果の所有フィールドを解放します。
///
/// `original.begin`は呼び出し側のバッファを指すため解放されません。
///
/// # Safety
///
/// `result`は[`wakachi_tokenize`]が書き込んだ[`WakachiWords`]を指して
/// いなければならず、二重解放してはいけません。
#[no_mangle]
pub unsafe extern "C" fn wakachi_cleanup_result(result: *mut WakachiWords) {
    if result.is_null() {
        return;
    }
    let result = &mut *result;
    if result.a.is_null() {
        result.n = 0;
        result.m = 0;
        return;
    }

    let words = Vec::from_raw_parts(result.a, result.n, result.m);
    for word in &words {
        if !word.unicode.begin.is_null() {
            drop(Vec::from_raw_parts(
                word.unicode.begin as *mut u32,
                word.unicode.len,
                word.unicode.len,
            ));
        }
        if !word.normalized.begin.is_null() {
            drop(Vec::from_raw_parts(
                word.normalized.begin as *mut u8,
                word.normalized.len,
                word.normalized.len,
            ));
        }
        if !word.stemmed.begin.is_null() {
            drop(Vec::from_raw_parts(
                word.stemmed.begin as *mut u8,
                word.stemmed.len,
                word.stemmed.len,
            ));
        }
    }
    drop(words);

    result.a = ptr::null_mut();
    result.n = 0;
    result.m = 0;
}

/// 言語ヒントを返します。
#[no_mangle]
pub extern "C" fn wakachi_get_language_hint() -> *const c_char {
    b"ja\0".as_ptr() as *const c_char
}

/// 日本語判定の最小確信度を返します。
#[no_mangle]
pub extern "C" fn wakachi_get_min_confidence() -> f64 {
    detect::MIN_CONFIDENCE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_analyzer() {
        let mut guard = ANALYZER.write().unwrap();
        *guard = Some(Tokenizer::new(Dictionary::fallback()).omit_bos_eos(true));
    }

    #[test]
    fn test_detect_language() {
        unsafe {
            assert_eq!(wakachi_detect_language(ptr::null(), 0), -1.0);

            let ascii = b"hello world";
            let c = wakachi_detect_language(ascii.as_ptr() as *const c_char, ascii.len());
            assert_eq!(c, -1.0);

            let japanese = "東京都の猫".as_bytes();
            let c = wakachi_detect_language(japanese.as_ptr() as *const c_char, japanese.len());
            assert!((0.30..=0.95).contains(&c));
        }
    }

    #[test]
    fn test_tokenize_and_cleanup() {
        init_analyzer();

        let text = "東京都の猫".as_bytes();
        let mut result = WakachiWords {
            n: 0,
            m: 0,
            a: ptr::null_mut(),
        };
        unsafe {
            let status =
                wakachi_tokenize(text.as_ptr() as *const c_char, text.len(), &mut result);
            assert_eq!(status, 0);
            assert!(result.n >= 3);

            let words = std::slice::from_raw_parts(result.a, result.n);
            let mut cursor = 0usize;
            for word in words {
                // original points into the caller's buffer, in order.
                let offset = (word.original.begin as usize) - (text.as_ptr() as usize);
                assert!(offset >= cursor);
                assert!(offset + word.original.len <= text.len());
                cursor = offset + word.original.len;
                assert_ne!(word.flags & WAKACHI_WORD_FLAG_TEXT, 0);
                assert!(!word.normalized.begin.is_null());
                assert!(!word.unicode.begin.is_null());
            }

            // の is a particle and must carry the stop-word flag.
            let particle = words
                .iter()
                .find(|w| {
                    std::slice::from_raw_parts(w.original.begin as *const u8, w.original.len)
                        == "の".as_bytes()
                })
                .unwrap();
            assert_ne!(particle.flags & WAKACHI_WORD_FLAG_STOP_WORD, 0);

            wakachi_cleanup_result(&mut result);
            assert!(result.a.is_null());
            assert_eq!(result.n, 0);
        }
    }

    #[test]
    fn test_tokenize_rejects_empty_input() {
        init_analyzer();
        let mut result = WakachiWords {
            n: 0,
            m: 0,
            a: ptr::null_mut(),
        };
        unsafe {
            assert_eq!(wakachi_tokenize(ptr::null(), 0, &mut result), -1);
        }
    }

    #[test]
    fn test_find_in_buffer_boundary() {
        let haystack = "あいう".as_bytes();
        // A continuation byte of あ equals the lead byte of another scalar's
        // tail; matches starting inside a scalar must be rejected.
        assert_eq!(find_in_buffer(haystack, "い".as_bytes(), 0), Some(3));
        assert_eq!(find_in_buffer(haystack, b"xyz", 0), None);
        assert_eq!(find_in_buffer(haystack, b"", 0), None);
    }
}
