use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, MouseEvent};
use futures::StreamExt;
use tokio::sync::{mpsc, watch};

use crate::system::kill::{TerminateError, Termination};
use crate::system::snapshot::Snapshot;

#[derive(Debug)]
pub enum Event {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Snapshot(Arc<Snapshot>),
    Terminated {
        pid: u32,
        outcome: Result<Termination, TerminateError>,
    },
    Tick,
    Resize,
}

pub struct EventHandler {
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    _task: tokio::task::JoinHandle<()>,
}

impl EventHandler {
    /// Merges terminal input, published snapshots and a housekeeping tick
    /// into one stream.
    pub fn new(mut snapshots: watch::Receiver<Arc<Snapshot>>, tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<Event>();
        let task_tx = tx.clone();

        let task = tokio::spawn(async move {
            let tx = task_tx;
            let mut reader = event::EventStream::new();
            let mut tick_interval = tokio::time::interval(tick_rate);
            let mut publishing = true;

            loop {
                tokio::select! {
                    maybe_event = reader.next() => {
                        match maybe_event {
                            Some(Ok(evt)) => {
                                let mapped = match evt {
                                    CrosstermEvent::Key(key) => Some(Event::Key(key)),
                                    CrosstermEvent::Mouse(mouse) => Some(Event::Mouse(mouse)),
                                    CrosstermEvent::Resize(_, _) => Some(Event::Resize),
                                    _ => None,
                                };
                                if let Some(e) = mapped
                                    && tx.send(e).is_err()
                                {
                                    break;
                                }
                            }
                            Some(Err(_)) => break,
                            None => break,
                        }
                    }
                    changed = snapshots.changed(), if publishing => {
                        if changed.is_err() {
                            publishing = false;
                            continue;
                        }
                        let snapshot = Arc::clone(&snapshots.borrow_and_update());
                        if tx.send(Event::Snapshot(snapshot)).is_err() {
                            break;
                        }
                    }
                    _ = tick_interval.tick() => {
                        if tx.send(Event::Tick).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self {
            tx,
            rx,
            _task: task,
        }
    }

    /// For work finishing off the event task, such as termination requests.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
