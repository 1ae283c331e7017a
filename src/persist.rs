use crate::storage::{KeyValueStore, StorageError};
use log::{debug, warn};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

enum Message {
    Write { key: String, value: String },
    Flush(Sender<()>),
}

/// Performs persistence writes on a dedicated thread, in the order they were
/// issued. Callers never wait on a write unless they ask to via `flush`.
pub struct WriteQueue {
    sender: Option<Sender<Message>>,
    handle: Option<JoinHandle<()>>,
}

impl WriteQueue {
    pub fn spawn<S>(backend: S) -> Result<Self, StorageError>
    where
        S: KeyValueStore + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("errand-writer".into())
            .spawn(move || run(backend, receiver))
            .map_err(StorageError::Spawn)?;
        Ok(WriteQueue {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    pub fn write(&self, key: &str, value: String) {
        let message = Message::Write {
            key: key.to_string(),
            value,
        };
        if !self.send(message) {
            warn!("writer is gone, dropping write to {}", key);
        }
    }

    /// Blocks until every write issued before this call has been applied.
    pub fn flush(&self) {
        let (ack, done) = mpsc::channel();
        if self.send(Message::Flush(ack)) {
            let _ = done.recv();
        }
    }

    fn send(&self, message: Message) -> bool {
        match &self.sender {
            Some(sender) => sender.send(message).is_ok(),
            None => false,
        }
    }
}

impl Drop for WriteQueue {
    fn drop(&mut self) {
        // Closing the channel lets the writer drain what is queued and exit.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("writer thread panicked");
            }
        }
    }
}

fn run<S: KeyValueStore>(mut backend: S, receiver: Receiver<Message>) {
    for message in receiver {
        match message {
            Message::Write { key, value } => match backend.set(&key, &value) {
                Ok(()) => debug!("persisted {} ({} bytes)", key, value.len()),
                Err(err) => warn!("failed to persist {}: {}", key, err),
            },
            Message::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!("writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recording {
        writes: Arc<Mutex<Vec<(String, String)>>>,
        fail_first: Arc<Mutex<bool>>,
    }

    impl KeyValueStore for Recording {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
            let mut fail = self.fail_first.lock().unwrap();
            if *fail {
                *fail = false;
                return Err(StorageError::Spawn(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )));
            }
            self.writes
                .lock()
                .unwrap()
                .push((key.to_string(), value.to_string()));
            Ok(())
        }
    }

    #[test]
    fn writes_apply_in_issue_order() {
        let backend = Recording::default();
        let queue = WriteQueue::spawn(backend.clone()).unwrap();
        for n in 0..20 {
            queue.write("todos", n.to_string());
        }
        queue.flush();
        let writes = backend.writes.lock().unwrap().clone();
        let values: Vec<_> = writes.iter().map(|(_, v)| v.as_str()).collect();
        let expected: Vec<_> = (0..20).map(|n| n.to_string()).collect();
        assert_eq!(values, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn failed_write_does_not_stop_later_writes() {
        let backend = Recording::default();
        *backend.fail_first.lock().unwrap() = true;
        let queue = WriteQueue::spawn(backend.clone()).unwrap();
        queue.write("todos", "lost".into());
        queue.write("todos", "kept".into());
        queue.flush();
        let writes = backend.writes.lock().unwrap().clone();
        assert_eq!(writes, vec![("todos".to_string(), "kept".to_string())]);
    }

    #[test]
    fn drop_drains_pending_writes() {
        let store = MemoryStore::new();
        {
            let queue = WriteQueue::spawn(store.clone()).unwrap();
            queue.write("workingState", "\"travel\"".into());
        }
        assert_eq!(
            store.get("workingState").unwrap().as_deref(),
            Some("\"travel\"")
        );
    }
}
