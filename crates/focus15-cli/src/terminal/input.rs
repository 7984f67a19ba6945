//! Terminal events in, guard signals out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseButton, MouseEventKind};
use focus15_core::{InteractionKind, Signal, Target};
use tokio::sync::mpsc::UnboundedSender;

use crate::commands::session::Message;

/// Key bound to the emergency exit.
pub const EMERGENCY_EXIT: KeyCode = KeyCode::Esc;

/// Translate a terminal event into the signal the guard sees.
///
/// Terminals have no separate "hidden" state, so losing focus counts as the
/// view being hidden.
pub fn to_signal(event: &Event) -> Option<Signal> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Release => None,
        Event::Key(key) => Some(Signal::Interaction {
            kind: InteractionKind::KeyDown,
            target: if key.code == EMERGENCY_EXIT {
                Target::EmergencyExit
            } else {
                Target::Other
            },
        }),
        Event::Paste(_) => Some(Signal::interaction(InteractionKind::KeyDown)),
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::Down(MouseButton::Right) => {
                Some(Signal::interaction(InteractionKind::ContextMenu))
            }
            MouseEventKind::Down(_) | MouseEventKind::Drag(_) => {
                Some(Signal::interaction(InteractionKind::PointerDown))
            }
            MouseEventKind::Up(_) | MouseEventKind::Moved => None,
            _ => Some(Signal::interaction(InteractionKind::Wheel)),
        },
        Event::FocusLost => Some(Signal::VisibilityChange { hidden: true }),
        Event::FocusGained => Some(Signal::VisibilityChange { hidden: false }),
        Event::Resize(..) => None,
    }
}

/// Blocking reader thread forwarding terminal events to the driver.
///
/// Polls with a short timeout so it can notice shutdown.
pub struct InputReader {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl InputReader {
    pub fn spawn(tx: UnboundedSender<Message>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                match event::poll(Duration::from_millis(100)) {
                    Ok(false) => continue,
                    Ok(true) => match event::read() {
                        Ok(ev) => {
                            if tx.send(Message::Terminal(ev)).is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "terminal read failed");
                            let _ = tx.send(Message::InputClosed);
                            break;
                        }
                    },
                    Err(err) => {
                        tracing::warn!(error = %err, "terminal poll failed");
                        let _ = tx.send(Message::InputClosed);
                        break;
                    }
                }
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for InputReader {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
