use std::io::{self, BufRead, Write};

use focus15_core::storage::{Config, Database};
use focus15_core::{Notifier, ProgressState, Renderer, SessionController};

/// Nothing to draw outside the interactive timer.
struct Headless;

impl Renderer for Headless {
    fn render(&mut self, _progress: &ProgressState, _remaining_secs: u64) {}
}

struct Stdout;

impl Notifier for Stdout {
    fn notify(&mut self, message: &str) {
        println!("{message}");
    }
}

fn confirmed(input: &mut impl BufRead) -> io::Result<bool> {
    print!("成長・統計をリセットしますか？ (y/N) ");
    io::stdout().flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

pub fn run(yes: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    if !yes && config.ui.confirm_reset && !confirmed(&mut io::stdin().lock())? {
        println!("cancelled");
        return Ok(());
    }

    let mut controller = SessionController::boot(Database::open()?, Headless, Stdout);
    if let Some(event) = controller.reset() {
        tracing::debug!(?event, "progress reset from command line");
    }
    Ok(())
}
