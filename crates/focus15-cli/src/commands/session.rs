//! Interactive focus timer.
//!
//! One task owns the [`SessionController`] and drains a single channel.
//! Producers are the terminal reader thread and one ticker task per clock
//! run. Each message is handled to completion before the next is received,
//! so the first terminal event of a burst is the only one that counts.

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{Event as TermEvent, KeyCode, KeyEventKind, KeyModifiers};
use focus15_core::storage::{Config, Database};
use focus15_core::{Event, Input, RunId, SessionController, Signal, Target, Verdict};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

use crate::terminal::input::{self, InputReader};
use crate::terminal::view::{self, Prompt, TerminalRenderer, ToastNotifier};
use crate::terminal::TerminalSession;

type Controller = SessionController<Database, TerminalRenderer, ToastNotifier>;

/// Everything the driver loop reacts to.
#[derive(Debug)]
pub enum Message {
    Terminal(TermEvent),
    Tick(RunId),
    InputClosed,
}

/// Keeps exactly one 1 Hz ticker alive for the clock's current run.
#[derive(Default)]
struct Ticker {
    current: Option<(RunId, JoinHandle<()>)>,
}

impl Ticker {
    fn sync(&mut self, run: Option<RunId>, tx: &UnboundedSender<Message>) {
        if self.current.as_ref().map(|(r, _)| *r) == run {
            return;
        }
        if let Some((_, handle)) = self.current.take() {
            handle.abort();
        }
        if let Some(run) = run {
            let tx = tx.clone();
            let handle = tokio::spawn(async move {
                let period = Duration::from_secs(1);
                let mut interval =
                    tokio::time::interval_at(tokio::time::Instant::now() + period, period);
                loop {
                    interval.tick().await;
                    if tx.send(Message::Tick(run)).is_err() {
                        break;
                    }
                }
            });
            self.current = Some((run, handle));
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.current.take() {
            handle.abort();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct Driver {
    controller: Controller,
    history: Database,
    config: Config,
    confirming_reset: bool,
}

impl Driver {
    fn on_message(&mut self, message: Message) -> Flow {
        match message {
            Message::Tick(run) => {
                let event = self.controller.handle(Input::Tick(run));
                self.record(event);
                Flow::Continue
            }
            Message::Terminal(event) => self.on_terminal(&event),
            Message::InputClosed => {
                // Losing the input stream mid-session is treated like walking away.
                let event = self.controller.manual_abort();
                self.record(event);
                Flow::Quit
            }
        }
    }

    fn on_terminal(&mut self, event: &TermEvent) -> Flow {
        if self.controller.is_active() {
            if let Some(signal) = input::to_signal(event) {
                let outcome = self.controller.signal(signal);
                self.record(outcome.event);
                let emergency = matches!(
                    signal,
                    Signal::Interaction {
                        target: Target::EmergencyExit,
                        ..
                    }
                ) && outcome.verdict == Verdict::PassThrough;
                if emergency {
                    let event = self.controller.manual_abort();
                    self.record(event);
                }
            }
            return Flow::Continue;
        }

        let TermEvent::Key(key) = event else {
            return Flow::Continue;
        };
        if key.kind == KeyEventKind::Release {
            return Flow::Continue;
        }

        if self.confirming_reset {
            self.confirming_reset = false;
            if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
                let event = self.controller.reset();
                self.record(event);
            }
            return Flow::Continue;
        }

        match key.code {
            KeyCode::Char('s') | KeyCode::Enter => {
                let event = self.controller.start();
                self.record(event);
            }
            KeyCode::Char('r') => {
                if self.config.ui.confirm_reset {
                    self.confirming_reset = true;
                } else {
                    let event = self.controller.reset();
                    self.record(event);
                }
            }
            KeyCode::Char('q') => return Flow::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Flow::Quit
            }
            _ => {}
        }
        Flow::Continue
    }

    fn record(&self, event: Option<Event>) {
        let Some(event) = event else {
            return;
        };
        if !event.is_terminal() {
            return;
        }
        if let Err(err) = self.history.record_event(&event) {
            tracing::warn!(error = %err, "failed to record session history");
        }
    }

    fn prompt(&self) -> Prompt {
        if self.controller.is_active() {
            Prompt::Active
        } else if self.confirming_reset {
            Prompt::ConfirmReset
        } else {
            Prompt::Idle
        }
    }

    fn redraw(&self, out: &mut impl io::Write) -> io::Result<()> {
        let lines = view::compose(
            self.controller.renderer(),
            self.controller.notifier().visible(Instant::now()),
            self.prompt(),
            self.config.ui.show_art,
        );
        view::draw(out, &lines)
    }
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let progress_db = Database::open()?;
    let history = Database::open()?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(drive(config, progress_db, history))
}

async fn drive(
    config: Config,
    progress_db: Database,
    history: Database,
) -> Result<(), Box<dyn std::error::Error>> {
    let notifier = ToastNotifier::new(&config);
    let controller = SessionController::boot(progress_db, TerminalRenderer::default(), notifier);
    let mut driver = Driver {
        controller,
        history,
        config,
        confirming_reset: false,
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _terminal = TerminalSession::enter()?;
    let _reader = InputReader::spawn(tx.clone());
    let mut ticker = Ticker::default();
    // Repaints between inputs so expired toasts disappear.
    let mut repaint = tokio::time::interval(Duration::from_millis(250));
    let mut stdout = io::stdout();

    driver.redraw(&mut stdout)?;
    loop {
        let flow = tokio::select! {
            message = rx.recv() => match message {
                Some(message) => driver.on_message(message),
                None => Flow::Quit,
            },
            _ = repaint.tick() => Flow::Continue,
        };
        ticker.sync(driver.controller.clock_run(), &tx);
        if flow == Flow::Quit {
            break;
        }
        driver.redraw(&mut stdout)?;
    }

    tracing::info!(progress = ?driver.controller.progress(), "exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, KeyEventState};
    use focus15_core::{FailReason, SessionOutcome};

    fn driver(dir: &tempfile::TempDir, config: Config) -> Driver {
        let progress = Database::open_at(&dir.path().join("focus15.db")).unwrap();
        let history = Database::open_at(&dir.path().join("focus15.db")).unwrap();
        let notifier = ToastNotifier::new(&config);
        Driver {
            controller: SessionController::boot(progress, TerminalRenderer::default(), notifier),
            history,
            config,
            confirming_reset: false,
        }
    }

    fn press(code: KeyCode) -> Message {
        Message::Terminal(TermEvent::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }))
    }

    #[test]
    fn start_key_begins_session_and_any_key_fails_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = driver(&dir, Config::default());

        assert_eq!(driver.on_message(press(KeyCode::Char('s'))), Flow::Continue);
        assert!(driver.controller.is_active());
        assert_eq!(driver.prompt(), Prompt::Active);

        // 'q' is just another distraction while a session runs.
        assert_eq!(driver.on_message(press(KeyCode::Char('q'))), Flow::Continue);
        assert!(!driver.controller.is_active());
        assert_eq!(driver.controller.progress().fails, 1);

        let recent = driver.history.recent_sessions(5).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].reason.as_deref(), Some(FailReason::Interaction.as_str()));
    }

    #[test]
    fn escape_is_a_manual_abort() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = driver(&dir, Config::default());
        driver.on_message(press(KeyCode::Char('s')));
        driver.on_message(press(KeyCode::Esc));

        let recent = driver.history.recent_sessions(5).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].reason.as_deref(), Some("manual"));
        assert_eq!(driver.controller.progress().fails, 1);
    }

    #[test]
    fn ticks_from_the_current_run_count_down() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = driver(&dir, Config::default());
        driver.on_message(press(KeyCode::Enter));
        let run = driver.controller.clock_run().unwrap();

        driver.on_message(Message::Tick(run));
        driver.on_message(Message::Tick(RunId(run.0 + 100)));
        assert_eq!(driver.controller.renderer().remaining_secs(), 899);
    }

    #[test]
    fn reset_asks_for_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = driver(&dir, Config::default());
        driver.on_message(press(KeyCode::Char('s')));
        driver.controller.succeed();
        assert_eq!(driver.controller.progress().level, 1);

        driver.on_message(press(KeyCode::Char('r')));
        assert_eq!(driver.prompt(), Prompt::ConfirmReset);
        driver.on_message(press(KeyCode::Char('n')));
        assert_eq!(driver.controller.progress().level, 1);

        driver.on_message(press(KeyCode::Char('r')));
        driver.on_message(press(KeyCode::Char('y')));
        assert_eq!(driver.controller.progress().level, 0);
        assert_eq!(driver.prompt(), Prompt::Idle);
    }

    #[test]
    fn reset_without_confirmation_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.ui.confirm_reset = false;
        let mut driver = driver(&dir, config);
        driver.on_message(press(KeyCode::Char('s')));
        driver.controller.succeed();
        driver.on_message(press(KeyCode::Char('r')));
        assert_eq!(driver.controller.progress().wins, 0);
    }

    #[test]
    fn quit_only_from_idle_and_input_loss_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = driver(&dir, Config::default());
        driver.on_message(press(KeyCode::Char('s')));
        assert_eq!(driver.on_message(Message::InputClosed), Flow::Quit);
        assert!(!driver.controller.is_active());
        let recent = driver.history.recent_sessions(1).unwrap();
        assert_eq!(recent[0].outcome, SessionOutcome::Failure);

        assert_eq!(driver.on_message(press(KeyCode::Char('q'))), Flow::Quit);
    }
}
