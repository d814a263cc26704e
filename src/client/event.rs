use std::{
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::Duration,
};

use color_eyre::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use log::{trace, warn};

/// Terminal client events.
#[derive(Clone, Copy, Debug)]
pub enum Event {
    /// Key press
    Key(KeyEvent),
    /// Terminal resize
    Resize(u16, u16),
}

/// Terminal event handler
pub struct EventHandler {
    /// Event receiver channel
    receiver: mpsc::Receiver<Event>,
    /// Thread polls crossterm for user input and sends them along the channel
    #[allow(dead_code)]
    handler: thread::JoinHandle<()>,
}

impl EventHandler {
    pub fn new() -> Self {
        let timeout = Duration::from_secs_f64(1.0 / 120.0);
        let (sender, receiver) = mpsc::channel();

        let handler = thread::spawn(move || loop {
            match event::poll(timeout) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    warn!("input: polling failed: {e}");
                    return;
                }
            }
            let event = match event::read() {
                Ok(CrosstermEvent::Key(e)) if e.kind == KeyEventKind::Press => Event::Key(e),
                Ok(CrosstermEvent::Resize(w, h)) => Event::Resize(w, h),
                // key releases, mouse and focus changes
                Ok(other) => {
                    trace!("input: ignoring {other:?}");
                    continue;
                }
                Err(e) => {
                    warn!("input: reading failed: {e}");
                    return;
                }
            };
            if sender.send(event).is_err() {
                // the app is gone
                return;
            }
        });
        Self { receiver, handler }
    }

    /// The next event, waiting at most `timeout` for one.
    pub fn next(&self, timeout: Duration) -> Result<Option<Event>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Everything that is already waiting, without blocking.
    pub fn drain(&self) -> Vec<Event> {
        self.receiver.try_iter().collect()
    }
}
