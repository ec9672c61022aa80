//! OS clipboard selection-owner thread (§5's concurrency model): a second
//! thread holds the text behind a mutex so it can answer selection requests
//! without the UI thread ever blocking on them. The UI thread is the sole
//! producer (`set`); the owner thread is the responder, parked on its
//! request channel until asked for the current text or told to shut down.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

enum Request {
    Get(Sender<String>),
    Shutdown,
}

/// Handle held by the UI thread. Dropping it stops the owner thread.
pub struct ClipboardOwner {
    text: Arc<Mutex<String>>,
    requests: Sender<Request>,
    worker: Option<JoinHandle<()>>,
}

impl ClipboardOwner {
    pub fn spawn() -> Self {
        let text = Arc::new(Mutex::new(String::new()));
        let (tx, rx) = mpsc::channel();
        let worker_text = Arc::clone(&text);
        let worker = std::thread::Builder::new()
            .name("clipboard-owner".into())
            .spawn(move || run_owner(worker_text, rx))
            .expect("failed to spawn clipboard-owner thread");
        Self { text, requests: tx, worker: Some(worker) }
    }

    /// Producer side: stores the latest yanked/deleted text. Never blocks on
    /// the owner thread, only on the mutex, which is held for the duration
    /// of a single assignment.
    pub fn set(&self, text: String) {
        let mut guard = self.text.lock().unwrap();
        if *guard != text {
            *guard = text;
        }
    }

    /// Requests the current selection from the owner thread, the same path
    /// an external selection request would take.
    pub fn request(&self) -> String {
        let (reply_tx, reply_rx) = mpsc::channel();
        if self.requests.send(Request::Get(reply_tx)).is_err() {
            return self.text.lock().unwrap().clone();
        }
        reply_rx.recv().unwrap_or_default()
    }
}

impl Drop for ClipboardOwner {
    fn drop(&mut self) {
        let _ = self.requests.send(Request::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_owner(text: Arc<Mutex<String>>, requests: Receiver<Request>) {
    while let Ok(req) = requests.recv() {
        match req {
            Request::Get(reply) => {
                let snapshot = text.lock().unwrap().clone();
                let _ = reply.send(snapshot);
            }
            Request::Shutdown => break,
        }
    }
}
