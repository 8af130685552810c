use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

pub type DiagnosticCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Receiver for non-fatal conditions met while reading or writing files.
///
/// Clones share the same callback, so replacing it through any handle affects
/// every file opened with that handle. The callback runs synchronously on the
/// thread that emitted the message, outside of the sink's lock, so it may
/// itself emit or replace the callback.
#[derive(Clone)]
pub struct DiagnosticSink {
    callback: Arc<Mutex<DiagnosticCallback>>,
}

impl DiagnosticSink {
    pub fn new(callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        let callback: DiagnosticCallback = Arc::new(callback);
        Self {
            callback: Arc::new(Mutex::new(callback)),
        }
    }

    /// Replaces the callback for every clone of this sink.
    pub fn set_callback(&self, callback: impl Fn(&str) + Send + Sync + 'static) {
        let mut guard = self.callback.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(callback);
    }

    pub fn emit(&self, message: &str) {
        let callback = self.callback.lock().unwrap_or_else(PoisonError::into_inner).clone();
        callback(message);
    }

    /// Emits `"{context}: {message}"`.
    pub fn warn(&self, context: impl fmt::Display, message: impl fmt::Display) {
        self.emit(&format!("{context}: {message}"));
    }

    /// A sink that drops every message.
    pub fn silent() -> Self {
        Self::new(|_| {})
    }

    #[cfg(test)]
    pub(crate) fn collecting() -> (Self, Arc<Mutex<Vec<String>>>) {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::clone(&messages);
        let sink = Self::new(move |message| {
            store
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(message.to_string());
        });
        (sink, messages)
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new(|message| eprintln!("[moltraj] {message}"))
    }
}

impl fmt::Debug for DiagnosticSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticSink").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_replaced_callback() {
        let (sink, messages) = DiagnosticSink::collecting();
        let clone = sink.clone();
        clone.warn("file.pdb", "unknown record 'FOO'");
        assert_eq!(messages.lock().unwrap().as_slice(), ["file.pdb: unknown record 'FOO'"]);

        sink.set_callback(|_| {});
        clone.emit("dropped");
        assert_eq!(messages.lock().unwrap().len(), 1);
    }

    #[test]
    fn callbacks_may_emit_and_replace_the_callback() {
        let (sink, messages) = DiagnosticSink::collecting();
        let store = Arc::clone(&messages);
        let inner = sink.clone();
        sink.set_callback(move |message| {
            let store = Arc::clone(&store);
            inner.set_callback(move |message| store.lock().unwrap().push(message.to_string()));
            inner.emit(&format!("forwarded {message}"));
        });
        sink.emit("warning");
        sink.emit("second");
        assert_eq!(messages.lock().unwrap().as_slice(), ["forwarded warning", "second"]);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let (sink, messages) = DiagnosticSink::collecting();
        let panicking = sink.clone();
        let _ = std::thread::spawn(move || {
            let _guard = panicking.callback.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        sink.emit("still delivered");
        assert_eq!(messages.lock().unwrap().as_slice(), ["still delivered"]);
    }
}
