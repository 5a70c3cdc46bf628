//! 設定モデル（config.toml）と保存処理。

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::jobs::TranslateOptions;

/// `config.toml`に保存する設定全体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// 翻訳サービスの接続先
    pub server: ServerCfg,
    /// 進捗バー（見た目だけ）の刻み
    pub progress: ProgressCfg,
    /// 新しいドキュメントに適用する既定値
    pub translate: TranslateCfg,
    /// ダウンロードした翻訳の保存先
    pub download: DownloadCfg,
}

/// リモートサービスへの接続設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerCfg {
    /// `/api`を含まないベースURL
    pub base_url: String,
    /// リクエストごとのタイムアウト秒数（0で無効）
    pub timeout_secs: u64,
}

/// 進捗エミッタの刻み
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressCfg {
    /// 1ティックの間隔（ミリ秒）
    pub tick_ms: u64,
    /// アップロード中の1ティックあたりの増分
    pub upload_step: u8,
    /// 翻訳中の1ティックあたりの増分
    pub translate_step: u8,
    /// 呼び出し完了前に表示する上限値
    pub cap: u8,
}

/// 翻訳の既定値
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateCfg {
    /// 言語一覧の取得後に選択しておく言語
    pub default_language: String,
    pub preserve_formatting: bool,
    pub include_original: bool,
}

impl TranslateCfg {
    /// 新しいドキュメントの初期オプション
    pub fn options(&self) -> TranslateOptions {
        TranslateOptions {
            preserve_formatting: self.preserve_formatting,
            include_original: self.include_original,
        }
    }
}

/// ダウンロード先
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadCfg {
    /// 保存ディレクトリ（必要になった時点で作成する）
    pub output_dir: String,
}

impl Config {
    /// ファイルから読み込む。なければデフォルトを書き出して返す。
    pub fn load_or_default(path: &Path) -> Result<Self> {
        // 既存ファイルがあればそのまま読み込む。
        if path.exists() {
            let s = fs::read_to_string(path)?;
            Ok(toml::from_str(&s)?)
        } else {
            // 初回起動時は編集しやすいようデフォルトを保存しておく。
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// 整形済みTOMLとして保存する。
    pub fn save(&self, path: &Path) -> Result<()> {
        // TOML文字列へ変換する。
        let s = toml::to_string_pretty(self)?;
        // ファイルへ書き込む。
        fs::write(path, s)?;
        Ok(())
    }
}

impl Default for Config {
    /// ローカルで動かしたサービスに合わせた既定値
    fn default() -> Self {
        let options = TranslateOptions::default();
        Self {
            server: ServerCfg {
                base_url: "http://localhost:8000".into(),
                timeout_secs: 120,
            },
            // 100msごとに増やし、完了までは90%で止める。
            progress: ProgressCfg {
                tick_ms: 100,
                upload_step: 5,
                translate_step: 3,
                cap: 90,
            },
            translate: TranslateCfg {
                default_language: "English".into(),
                preserve_formatting: options.preserve_formatting,
                include_original: options.include_original,
            },
            download: DownloadCfg {
                output_dir: "downloads".into(),
            },
        }
    }
}
