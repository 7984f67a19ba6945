use focus15_core::storage::{Database, HistoryStats};
use focus15_core::{ProgressState, ProgressStore, Stage};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct StatusReport {
    progress: ProgressState,
    stage: Stage,
    history: HistoryStats,
}

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let history = Database::open()?.history_stats()?;
    let progress = ProgressStore::new(Database::open()?).load();
    let report = StatusReport {
        progress,
        stage: progress.stage(),
        history,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Lv.{} ({})  成功 {}  失敗 {}",
            report.progress.level,
            report.stage.label(),
            report.progress.wins,
            report.progress.fails
        );
        println!(
            "today: {} sessions, {} completed",
            report.history.today_sessions, report.history.today_successes
        );
    }
    Ok(())
}
