use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use futures::{FutureExt, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Terminal events delivered to the UI loop
#[derive(Clone, Debug)]
pub enum Event {
    /// Key press event
    Key(KeyEvent),
    /// Terminal resize
    Resize(u16, u16),
    /// Error occurred while reading input
    Error(String),
}

/// Background input-capture worker.
///
/// A spawned task reads raw terminal events and places them on a bounded
/// queue; the UI loop drains the queue non-blockingly and falls back to a
/// short sleep when it is empty, never suspending on the channel.
pub struct EventHandler {
    receiver: mpsc::Receiver<Event>,
    cancel: CancellationToken,
    #[allow(dead_code)]
    task: tokio::task::JoinHandle<()>,
}

impl EventHandler {
    /// Spawn the capture worker with the given queue capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        let cancel = CancellationToken::new();

        let task = {
            let cancel = cancel.clone();

            tokio::spawn(async move {
                let mut reader = event::EventStream::new();

                loop {
                    let crossterm_event = reader.next().fuse();

                    tokio::select! {
                        _ = cancel.cancelled() => break,

                        maybe_event = crossterm_event => {
                            let event = match maybe_event {
                                Some(Ok(CrosstermEvent::Key(key))) => {
                                    // Filter out release events (important for Windows)
                                    if key.kind == KeyEventKind::Press {
                                        Some(Event::Key(key))
                                    } else {
                                        None
                                    }
                                }
                                Some(Ok(CrosstermEvent::Resize(w, h))) => {
                                    Some(Event::Resize(w, h))
                                }
                                Some(Ok(_)) => None,
                                Some(Err(e)) => Some(Event::Error(e.to_string())),
                                None => break,
                            };

                            if let Some(event) = event {
                                if sender.send(event).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                }
            })
        };

        Self {
            receiver,
            cancel,
            task,
        }
    }

    /// Drain one pending event without blocking
    pub fn try_next(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }

    /// Shutdown the capture worker
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
