use card_scan_common::ScanPhase;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// スキャン中に表示するスピナー
pub fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// フェーズ表示文字列（例: "[2/3] カードを識別中..."）
pub fn phase_message(phase: &ScanPhase) -> String {
    match phase.step() {
        Some((current, total)) => format!("[{}/{}] {}", current, total, phase),
        None => phase.to_string(),
    }
}

pub fn report(pb: &ProgressBar, phase: &ScanPhase) {
    match phase {
        ScanPhase::Done => pb.finish_with_message("✔ 識別完了"),
        // 失敗メッセージは呼び出し側で1回だけ表示する
        ScanPhase::Failed(_) => pb.finish_and_clear(),
        _ => pb.set_message(phase_message(phase)),
    }
}
