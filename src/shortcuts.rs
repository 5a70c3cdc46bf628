//! キーバインド設定（shortcut.toml）。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 画面ごとのキーバインド一式
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shortcuts {
    pub main: MainShortcuts,
    pub settings: SettingsShortcuts,
    pub input_box: InputBoxShortcuts,
}

/// メイン画面のキーバインド
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainShortcuts {
    pub quit: Vec<String>,
    pub settings: Vec<String>,
    pub open_file: Vec<String>,
    pub remove_file: Vec<String>,
    pub extract: Vec<String>,
    pub translate: Vec<String>,
    pub download: Vec<String>,
    /// 翻訳プレビューをクリップボードへコピー
    #[serde(default = "default_copy_translation")]
    pub copy_translation: Vec<String>,
    pub next_language: Vec<String>,
    pub prev_language: Vec<String>,
    pub toggle_formatting: Vec<String>,
    pub toggle_original: Vec<String>,
}

/// Settings画面のキーバインド
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsShortcuts {
    pub cancel: Vec<String>,
    pub save: Vec<String>,
    pub output_dir: Vec<String>,
    pub default_language: Vec<String>,
}

/// InputBoxのキーバインド
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputBoxShortcuts {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub backspace: Vec<String>,
    pub delete: Vec<String>,
    pub left: Vec<String>,
    pub right: Vec<String>,
    pub home: Vec<String>,
    pub end: Vec<String>,
    pub clear_line: Vec<String>,
}

// 古いshortcut.tomlにはこのキーがない。
fn default_copy_translation() -> Vec<String> {
    vec!["c".into()]
}

impl Shortcuts {
    /// TOMLから読み込む。ファイルがなければデフォルトを使う。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        // ファイルの有無で分岐する。
        if path.exists() {
            // 読み込んでTOMLとして解釈する。
            let content = std::fs::read_to_string(path)?;
            let shortcuts: Shortcuts = toml::from_str(&content)?;
            Ok(shortcuts)
        } else {
            Ok(Self::default())
        }
    }
}

impl Default for Shortcuts {
    fn default() -> Self {
        Self {
            main: MainShortcuts {
                quit: vec!["q".into()],
                settings: vec!["s".into()],
                open_file: vec!["o".into()],
                remove_file: vec!["x".into()],
                extract: vec!["e".into()],
                translate: vec!["t".into()],
                download: vec!["d".into()],
                copy_translation: default_copy_translation(),
                // 矢印キーとvi風キーの両方で言語を切り替える。
                next_language: vec!["Right".into(), "l".into()],
                prev_language: vec!["Left".into(), "h".into()],
                toggle_formatting: vec!["f".into()],
                toggle_original: vec!["i".into()],
            },
            settings: SettingsShortcuts {
                cancel: vec!["Esc".into()],
                save: vec!["Enter".into()],
                output_dir: vec!["o".into()],
                default_language: vec!["l".into()],
            },
            input_box: InputBoxShortcuts {
                confirm: vec!["Enter".into()],
                cancel: vec!["Esc".into()],
                backspace: vec!["Backspace".into()],
                delete: vec!["Delete".into()],
                // 入力中は文字キーを奪わないよう矢印のみ。
                left: vec!["Left".into()],
                right: vec!["Right".into()],
                home: vec!["Home".into()],
                end: vec!["End".into()],
                clear_line: vec!["Ctrl+u".into()],
            },
        }
    }
}

/// キーイベントがいずれかのバインドに一致すればtrue。
pub fn matches_shortcut(key: &KeyEvent, bindings: &[String]) -> bool {
    bindings
        .iter()
        // 解釈できないバインドは読み飛ばす。
        .filter_map(|b| parse_binding(b))
        // 修飾キーまで完全一致したものだけを採用する。
        .any(|(modifiers, code)| key.modifiers == modifiers && key.code == code)
}

/// `"Ctrl+u"`、`"a"`、`"Enter"`のようなバインド文字列を解釈する。
///
/// 未知の修飾キーやキー名は`None`を返し、そのバインドは無効になる。
fn parse_binding(binding: &str) -> Option<(KeyModifiers, KeyCode)> {
    // `+`で区切り、最後の要素をキー本体とする。
    let mut parts: Vec<&str> = binding.split('+').collect();
    let key = parts.pop()?;

    // 残りを修飾キーとして合成する。
    let mut modifiers = KeyModifiers::empty();
    for m in parts {
        modifiers |= match m.to_ascii_lowercase().as_str() {
            "ctrl" => KeyModifiers::CONTROL,
            "alt" => KeyModifiers::ALT,
            "shift" => KeyModifiers::SHIFT,
            _ => return None,
        };
    }

    // 名前付きキーを先に判定する（大文字小文字は区別しない）。
    let code = match key.to_ascii_lowercase().as_str() {
        "enter" => KeyCode::Enter,
        "esc" => KeyCode::Esc,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "delete" => KeyCode::Delete,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        _ => {
            // それ以外はちょうど1文字のときだけ文字キーとみなす。
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return None,
            }
        }
    };
    Some((modifiers, code))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    #[test]
    fn test_language_cycling_accepts_arrow_and_letter() {
        let sc = Shortcuts::default();
        assert!(matches_shortcut(&key(KeyCode::Right), &sc.main.next_language));
        assert!(matches_shortcut(&key(KeyCode::Char('l')), &sc.main.next_language));
        assert!(matches_shortcut(&key(KeyCode::Left), &sc.main.prev_language));
        assert!(!matches_shortcut(&key(KeyCode::Right), &sc.main.prev_language));
    }

    #[test]
    fn test_modifier_must_match_exactly() {
        let clear = [String::from("Ctrl+u")];
        assert!(matches_shortcut(
            &KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL),
            &clear
        ));
        assert!(!matches_shortcut(&key(KeyCode::Char('u')), &clear));
        assert!(!matches_shortcut(
            &KeyEvent::new(KeyCode::Char('e'), KeyModifiers::CONTROL),
            &Shortcuts::default().main.extract
        ));
    }

    #[test]
    fn test_key_names_are_case_insensitive() {
        assert!(matches_shortcut(&key(KeyCode::Enter), &[String::from("enter")]));
        assert!(matches_shortcut(&key(KeyCode::Esc), &[String::from("ESC")]));
    }

    #[test]
    fn test_malformed_bindings_never_match() {
        assert_eq!(parse_binding("Hyper+x"), None);
        assert_eq!(parse_binding("xy"), None);
        assert_eq!(parse_binding(""), None);
        assert!(!matches_shortcut(&key(KeyCode::Char('x')), &[String::from("Meta+x")]));
    }

    #[test]
    fn test_main_bindings_do_not_overlap() {
        let m = Shortcuts::default().main;
        let groups = [
            &m.quit,
            &m.settings,
            &m.open_file,
            &m.remove_file,
            &m.extract,
            &m.translate,
            &m.download,
            &m.copy_translation,
            &m.next_language,
            &m.prev_language,
            &m.toggle_formatting,
            &m.toggle_original,
        ];
        let mut all: Vec<&String> = groups.iter().flat_map(|g| g.iter()).collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn test_load_overrides_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shortcut.toml");
        let mut sc = Shortcuts::default();
        sc.main.extract = vec!["Ctrl+e".into()];
        std::fs::write(&path, toml::to_string_pretty(&sc).unwrap()).unwrap();

        let loaded = Shortcuts::load_or_default(&path).unwrap();
        assert_eq!(loaded.main.extract, vec![String::from("Ctrl+e")]);
        assert_eq!(
            Shortcuts::load_or_default(dir.path().join("missing.toml"))
                .unwrap()
                .main
                .quit,
            vec![String::from("q")]
        );
    }

    #[test]
    fn test_copy_binding_defaults_when_missing_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shortcut.toml");
        let mut table: toml::Table =
            toml::from_str(&toml::to_string_pretty(&Shortcuts::default()).unwrap()).unwrap();
        table
            .get_mut("main")
            .and_then(|v| v.as_table_mut())
            .unwrap()
            .remove("copy_translation");
        std::fs::write(&path, toml::to_string_pretty(&table).unwrap()).unwrap();

        let loaded = Shortcuts::load_or_default(&path).unwrap();
        assert_eq!(loaded.main.copy_translation, vec![String::from("c")]);
    }
}
