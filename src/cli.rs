use card_scan_common::BoundingBox;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "card-scan")]
#[command(about = "トレーディングカード撮影画像のAI識別・切り出し・コレクション管理ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 画像を識別してカードを切り出す
    Scan {
        /// 画像ファイルまたはフォルダ（複数指定可）
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// 結果（scan.json と切り出し画像）の出力先フォルダ
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 対話セッション（スキャン・コレクション管理、状態はメモリのみ）
    Session {
        /// 最初にスキャンする画像（省略時はセッション内で指定）
        paths: Vec<PathBuf>,
    },

    /// 1枚の画像から指定ボックスを切り出す
    Crop {
        /// 入力画像
        #[arg(required = true)]
        image: PathBuf,

        /// 正規化ボックス cx,cy,w,h（各0〜1）
        #[arg(short, long, allow_hyphen_values = true)]
        bbox: BoundingBox,

        /// 出力JPEGファイル
        #[arg(short, long, default_value = "crop.jpg")]
        output: PathBuf,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// モデル名を設定
        #[arg(long)]
        set_model: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
