//! Countdown, counters, penguin art and toasts.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::{cursor, queue, terminal};
use focus15_core::storage::Config;
use focus15_core::{Notifier, ProgressState, Renderer, Stage};

/// `MM:SS` for a number of seconds.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Penguin art for each stage.
pub fn art(stage: Stage) -> &'static [&'static str] {
    match stage {
        Stage::Egg => &["（卵）", "  __", " (__)"],
        Stage::Chick => &["ヒナ", "  (•ᴗ•)", "  /| |\\"],
        Stage::Juvenile => &["若鳥", "  (•◡•) ﾉ", "  /|_|\\"],
        Stage::Adult => &["大人", "  (•ㅅ•)ゝ", "  /|██|\\"],
    }
}

/// Latest frame handed over by the session controller.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    progress: ProgressState,
    remaining_secs: u64,
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, progress: &ProgressState, remaining_secs: u64) {
        self.progress = *progress;
        self.remaining_secs = remaining_secs;
    }
}

impl TerminalRenderer {
    pub fn progress(&self) -> ProgressState {
        self.progress
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }
}

/// One toast at a time; a new message replaces the old one.
#[derive(Debug)]
pub struct ToastNotifier {
    enabled: bool,
    ttl: Duration,
    current: Option<(String, Instant)>,
}

impl ToastNotifier {
    pub fn new(config: &Config) -> Self {
        Self {
            enabled: config.notifications.enabled,
            ttl: Duration::from_millis(config.notifications.toast_ms),
            current: None,
        }
    }

    /// The message still on screen at `now`, if any.
    pub fn visible(&self, now: Instant) -> Option<&str> {
        self.current
            .as_ref()
            .filter(|(_, shown_at)| now.duration_since(*shown_at) < self.ttl)
            .map(|(message, _)| message.as_str())
    }
}

impl Notifier for ToastNotifier {
    fn notify(&mut self, message: &str) {
        if !self.enabled {
            return;
        }
        self.current = Some((message.to_string(), Instant::now()));
    }
}

/// What the bottom of the screen is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Idle,
    Active,
    ConfirmReset,
}

/// Lines of one screen, without terminal control codes.
pub fn compose(
    renderer: &TerminalRenderer,
    toast: Option<&str>,
    prompt: Prompt,
    show_art: bool,
) -> Vec<String> {
    let progress = renderer.progress();
    let stage = progress.stage();
    let mut lines = vec![
        "focus15 ─ 15分集中".to_string(),
        String::new(),
        format!("    {}", format_clock(renderer.remaining_secs())),
        String::new(),
        format!(
            "Lv.{}   成功 {}   失敗 {}",
            progress.level, progress.wins, progress.fails
        ),
        format!("段階: {}", stage.label()),
    ];
    if show_art {
        lines.push(String::new());
        lines.extend(art(stage).iter().map(|l| l.to_string()));
    }
    lines.push(String::new());
    lines.push(
        match prompt {
            Prompt::Idle => "s: スタート   r: リセット   q: 終了",
            Prompt::Active => "集中中… 触ると失敗します（Esc: 緊急終了）",
            Prompt::ConfirmReset => "成長・統計をリセットしますか？ (y/N)",
        }
        .to_string(),
    );
    if let Some(message) = toast {
        lines.push(String::new());
        lines.push(message.to_string());
    }
    lines
}

/// Clear and redraw the whole screen.
pub fn draw(out: &mut impl Write, lines: &[String]) -> io::Result<()> {
    queue!(
        out,
        terminal::Clear(terminal::ClearType::All),
        cursor::MoveTo(0, 0)
    )?;
    for line in lines {
        // Raw mode: explicit carriage return.
        write!(out, "{line}\r\n")?;
    }
    out.flush()
}
