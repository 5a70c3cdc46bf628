//! UI側の画面・ステータス状態。

/// 表示中の画面
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    /// ドキュメントと翻訳のパネル
    Main,
    /// 設定編集
    Settings,
}

/// ログとして保持する最大行数
const LOG_CAPACITY: usize = 500;

/// 描画側と共有する状態
#[derive(Clone, Debug)]
pub struct UiState {
    /// 現在の画面
    pub screen: Screen,
    /// INFOパネルに出す時刻付きログ（最大`LOG_CAPACITY`行）
    pub log: Vec<String>,
    /// ステータス行の文言
    pub status: String,
    /// 直近のエラー。次のコマンドまで強調表示する。
    pub error: Option<String>,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Main,
            log: vec![],
            status: "Ready".into(),
            error: None,
        }
    }

    /// ローカル時刻を先頭に付けてログを追加する。
    pub fn push_log(&mut self, msg: impl AsRef<str>) {
        // 現在時刻を取得する。
        let now = chrono::Local::now();
        // 時刻付きで末尾に追加する。
        self.log
            .push(format!("[{}] {}", now.format("%H:%M:%S"), msg.as_ref()));
        // 上限を超えた分は古い行から捨てる。
        if self.log.len() > LOG_CAPACITY {
            let excess = self.log.len() - LOG_CAPACITY;
            self.log.drain(..excess);
        }
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_log_drops_oldest_past_capacity() {
        let mut ui = UiState::new();
        for i in 0..LOG_CAPACITY + 20 {
            ui.push_log(format!("line {i}"));
        }
        assert_eq!(ui.log.len(), LOG_CAPACITY);
        assert!(ui.log.first().unwrap().ends_with("] line 20"));
        assert!(ui.log.last().unwrap().ends_with(&format!("] line {}", LOG_CAPACITY + 19)));
    }
}
