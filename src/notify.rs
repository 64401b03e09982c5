//! User-facing sync notices.
//!
//! Fire-and-forget by contract: a notifier must never fail a sync, so the
//! trait returns nothing and implementations swallow their own errors.

/// Delivery seam for sync summaries ("3 entries added for Example").
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Prints notices to stdout. The CLI default.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        println!("{message}");
    }
}

/// Drops notices on the floor; for `--quiet` and tests.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _message: &str) {}
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Notifier;
    use std::sync::Mutex;

    /// Captures notices for assertions.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub messages: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }
}
