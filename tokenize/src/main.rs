//! 形態素解析を実行するユーティリティ
//!
//! このバイナリは、引数または標準入力から読み込んだテキストを形態素解析し、
//! 指定された出力形式（表形式、分かち書き、JSON）で結果を出力します。

use std::error::Error;
use std::fs::File;
use std::io::{BufRead, BufWriter, IsTerminal, Write};
use std::path::PathBuf;

use wakachi::tokenizer::worker::Worker;
use wakachi::{Dictionary, Mode, TokenData, Tokenizer};

use clap::Parser;

/// コマンドライン引数
#[derive(Parser, Debug)]
#[clap(name = "tokenize", about = "Predicts morphemes")]
struct Args {
    /// Text to analyze. Reads lines from stdin when omitted.
    text: Option<String>,

    /// System dictionary archive. Falls back to the built-in dictionary
    /// when no archive is found.
    #[clap(short = 'i', long)]
    sysdic: Option<PathBuf>,

    /// Tokenization mode. Choices are normal, search, and extended.
    #[clap(short = 'm', long, default_value = "normal")]
    mode: Mode,

    /// Prints surface forms only.
    #[clap(short = 'w', long)]
    wakati: bool,

    /// Prints tokens as a JSON array.
    #[clap(short = 'j', long)]
    json: bool,

    /// Omits BOS/EOS tokens from the output.
    #[clap(long)]
    omit_bos_eos: bool,

    /// Writes the lattice of the last analyzed line as a DOT graph.
    #[clap(long)]
    dot: Option<PathBuf>,
}

/// メイン関数
///
/// 辞書をロードし、入力テキストを形態素解析して、指定された形式で
/// 結果を標準出力に出力します。
///
/// # 戻り値
///
/// 実行が成功した場合は`Ok(())`、エラーが発生した場合はエラー情報
fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let dict = match &args.sysdic {
        Some(path) => Dictionary::from_path(path)?,
        None => Dictionary::locate_or_fallback(&Dictionary::default_paths()).0,
    };

    let tokenizer = Tokenizer::new(dict)
        .mode(args.mode)
        .omit_bos_eos(args.omit_bos_eos);
    let mut worker = tokenizer.new_worker();

    let out = std::io::stdout();
    let is_tty = out.is_terminal();
    let mut out = BufWriter::new(out.lock());

    if let Some(text) = &args.text {
        analyze_line(&mut worker, text, &args, &mut out)?;
    } else {
        let lines = std::io::stdin().lock().lines();
        for line in lines {
            let line = line?;
            analyze_line(&mut worker, &line, &args, &mut out)?;
            if is_tty {
                out.flush()?;
            }
        }
    }
    out.flush()?;

    if let Some(dot_path) = &args.dot {
        let mut dot_out = BufWriter::new(File::create(dot_path)?);
        worker.export_dot(&mut dot_out)?;
        dot_out.flush()?;
    }

    Ok(())
}

/// 1行を解析して指定の形式で出力します。
///
/// # 引数
///
/// * `worker` - 解析に使用するワーカー
/// * `line` - 解析する1行
/// * `args` - コマンドライン引数
/// * `out` - 書き込み先
fn analyze_line<W>(
    worker: &mut Worker,
    line: &str,
    args: &Args,
    out: &mut W,
) -> Result<(), Box<dyn Error>>
where
    W: Write,
{
    worker.reset_sentence(line);
    worker.tokenize();

    if args.wakati {
        writeln!(out, "{}", worker.wakati().join(" "))?;
    } else if args.json {
        let tokens: Vec<TokenData> = worker.token_iter().map(|t| t.to_data()).collect();
        writeln!(out, "{}", serde_json::to_string_pretty(&tokens)?)?;
    } else {
        for token in worker.token_iter() {
            if token.surface().is_empty() {
                continue;
            }
            writeln!(out, "{}\t{}", token.surface(), token.features().join(","))?;
        }
        writeln!(out, "EOS")?;
    }
    Ok(())
}
