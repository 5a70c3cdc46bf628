//! 一行入力のポップアップ（InputBox）。

use ratatui::{
    layout::Alignment,
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

/// InputBoxの入力状態
#[derive(Clone, Debug)]
pub struct InputBoxState {
    /// 入力欄の上に出すプロンプト
    pub prompt: String,
    /// 現在の入力値
    pub value: String,
    /// カーソル位置（文字単位）
    pub cursor: usize,
    /// 確定時に値を適用する先
    pub callback_id: InputCallbackId,
}

/// 確定した入力の適用先
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputCallbackId {
    // メイン画面用
    OpenFile,

    // Settings画面用
    SettingsOutputDir,
    SettingsDefaultLanguage,
}

impl InputBoxState {
    /// 初期値つきで開く。カーソルは末尾に置く。
    pub fn new(prompt: impl Into<String>, value: impl Into<String>, callback_id: InputCallbackId) -> Self {
        let value = value.into();
        Self {
            prompt: prompt.into(),
            cursor: value.chars().count(),
            value,
            callback_id,
        }
    }

    /// 文字位置`idx`のバイトオフセット（範囲外なら末尾）
    fn byte_at(&self, idx: usize) -> usize {
        self.value
            .char_indices()
            .nth(idx)
            .map(|(b, _)| b)
            .unwrap_or(self.value.len())
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    /// 文字を挿入
    pub fn insert_char(&mut self, c: char) {
        // マルチバイト文字を壊さないようバイト位置へ変換する。
        let at = self.byte_at(self.cursor);
        self.value.insert(at, c);
        // カーソルを1文字進める。
        self.cursor += 1;
    }

    /// Backspace（カーソル前の文字を削除）
    pub fn backspace(&mut self) {
        // 先頭なら何もしない。
        if self.cursor == 0 {
            return;
        }
        // 一つ左へ移動してから、その位置の文字を消す。
        self.cursor -= 1;
        let at = self.byte_at(self.cursor);
        self.value.remove(at);
    }

    /// Delete（カーソル位置の文字を削除）
    pub fn delete(&mut self) {
        // 末尾ならカーソル位置に文字がない。
        if self.cursor < self.len() {
            let at = self.byte_at(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        // 末尾を越えないようにする。
        self.cursor = (self.cursor + 1).min(self.len());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.len();
    }

    /// 行全体をクリア
    pub fn clear_line(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// 幅`width`に収まる部分を`|`カーソル付きで返す。カーソルが見える位置までスクロールする。
    fn visible_with_cursor(&self, width: usize) -> String {
        // カーソル記号の分を含めて最低2文字を確保する。
        let width = width.max(2);
        // カーソルが右端に来るよう表示開始位置をずらす。
        let offset = self.cursor.saturating_sub(width - 1);
        // 表示範囲の文字だけを取り出す。
        let chars: Vec<char> = self.value.chars().skip(offset).take(width).collect();
        // 表示範囲内でのカーソル位置を求める。
        let at = (self.cursor - offset).min(chars.len());
        // カーソル前、カーソル記号、カーソル後の順に連結する。
        let mut out: String = chars[..at].iter().collect();
        out.push('|');
        out.extend(&chars[at..]);
        out
    }
}

/// InputBoxを現在の画面の上に描画する。
pub fn render_input_box(f: &mut Frame, state: &InputBoxState) {
    // 画面中央にポップアップ領域を確保する。
    let area = centered_popup(f.area(), 70, 7);
    // 背面の描画を消してから重ねる。
    f.render_widget(Clear, area);

    // 枠を描画し、内側の領域を得る。
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Input")
        .style(Style::default().bg(Color::DarkGray));
    let inner = block.inner(area);
    f.render_widget(block, area);

    // プロンプト、入力欄、空行、ヘルプの4行に分ける。
    let [prompt_row, field_row, _, help_row] = Layout::vertical([Constraint::Length(1); 4]).areas(inner);

    // プロンプトを描画する。
    f.render_widget(
        Paragraph::new(state.prompt.as_str()).style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        prompt_row,
    );
    // 入力値をカーソル付きで描画する。
    f.render_widget(
        Paragraph::new(state.visible_with_cursor(field_row.width as usize))
            .style(Style::default().fg(Color::Green)),
        field_row,
    );
    // 操作ヘルプを描画する。
    f.render_widget(
        Paragraph::new("Enter=confirm | Esc=cancel | Ctrl+U=clear")
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center),
        help_row,
    );
}

/// `area`の中央に、高さ`height`行・幅`width_percent`%の領域を返す。
fn centered_popup(area: Rect, width_percent: u16, height: u16) -> Rect {
    // 縦方向の中央に行を取る。
    let [_, row, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(height),
        Constraint::Fill(1),
    ])
    .areas(area);
    // 横方向の中央に指定幅を取る。
    let [_, popup, _] = Layout::horizontal([
        Constraint::Fill(1),
        Constraint::Percentage(width_percent),
        Constraint::Fill(1),
    ])
    .areas(row);
    popup
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(value: &str) -> InputBoxState {
        InputBoxState::new("Path:", value, InputCallbackId::OpenFile)
    }

    #[test]
    fn test_edit_multibyte_path() {
        let mut s = input("書類.pdf");
        assert_eq!(s.cursor, 6);
        s.move_home();
        s.move_right();
        s.insert_char('x');
        assert_eq!(s.value, "書x類.pdf");
        s.backspace();
        s.delete();
        assert_eq!(s.value, "書.pdf");
        assert_eq!(s.cursor, 1);
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let mut s = input("ab");
        s.move_right();
        assert_eq!(s.cursor, 2);
        s.delete();
        assert_eq!(s.value, "ab");
        s.clear_line();
        s.move_left();
        s.backspace();
        assert_eq!((s.value.as_str(), s.cursor), ("", 0));
    }

    #[test]
    fn test_visible_window_follows_cursor() {
        let s = input("/home/user/documents/report.pdf");
        let shown = s.visible_with_cursor(10);
        assert!(shown.ends_with("t.pdf|"));
        assert_eq!(input("doc").visible_with_cursor(10), "doc|");
    }
}
