//! Background thread that persists the file hash map after a quiet period.
//!
//! Each [`HashFlusher::touch`] restarts the debounce window; the persist
//! callback runs once the window passes without another touch. Explicit
//! flushes and shutdown persist immediately if anything is pending.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use super::debouncer::Debouncer;

enum Command {
    Touch,
    Flush(Sender<()>),
    Shutdown,
}

pub type PersistFn = Box<dyn Fn() + Send + 'static>;

pub struct HashFlusher {
    tx: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl HashFlusher {
    /// Start the flusher thread.
    pub fn spawn(window: Duration, persist: PersistFn) -> std::io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = std::thread::Builder::new()
            .name("codescope-hash-flush".to_string())
            .spawn(move || run(rx, window, persist))?;
        Ok(Self {
            tx,
            handle: Some(handle),
        })
    }

    /// Schedule a debounced persist.
    pub fn touch(&self) {
        if self.tx.send(Command::Touch).is_err() {
            tracing::warn!(target: "cache", "hash flusher is gone, update not scheduled");
        }
    }

    /// Persist now and wait for the write to finish.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        if self.tx.send(Command::Flush(ack_tx)).is_ok() {
            let _ = ack_rx.recv();
        }
    }
}

impl Drop for HashFlusher {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!(target: "cache", "hash flusher thread panicked");
            }
        }
    }
}

fn run(rx: Receiver<Command>, window: Duration, persist: PersistFn) {
    let mut debouncer = Debouncer::with_clock(window, super::debouncer::SystemClock);

    loop {
        let next = match debouncer.time_until_due() {
            Some(wait) => rx.recv_timeout(wait),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match next {
            Ok(Command::Touch) => debouncer.record(),
            Ok(Command::Flush(ack)) => {
                debouncer.cancel();
                persist();
                let _ = ack.send(());
            }
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                if debouncer.has_pending() {
                    persist();
                }
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                if debouncer.take_due() {
                    persist();
                }
            }
        }
    }
    tracing::debug!(target: "cache", "hash flusher stopped");
}
