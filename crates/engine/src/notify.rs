// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification dispatch seam between the supervisor and the webhook
//! adapter, so sweeps are testable without network I/O.

use warden_adapters::{Notification, WebhookNotifier};

/// Fire-and-forget notification dispatch. Returns the number of
/// destinations queued; never blocks on delivery.
pub trait Notifier: Send + Sync + 'static {
    fn dispatch(&self, note: &Notification, urls: &[String]) -> usize;
}

impl Notifier for WebhookNotifier {
    fn dispatch(&self, note: &Notification, urls: &[String]) -> usize {
        WebhookNotifier::dispatch(self, note, urls)
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Recorded dispatch call.
    #[derive(Debug, Clone, PartialEq)]
    pub struct NotifyCall {
        pub note: Notification,
        pub urls: Vec<String>,
    }

    /// Fake notifier for testing
    #[derive(Clone, Default)]
    pub struct FakeNotifier {
        calls: Arc<Mutex<Vec<NotifyCall>>>,
    }

    impl FakeNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<NotifyCall> {
            self.calls.lock().clone()
        }
    }

    impl Notifier for FakeNotifier {
        fn dispatch(&self, note: &Notification, urls: &[String]) -> usize {
            self.calls.lock().push(NotifyCall { note: note.clone(), urls: urls.to_vec() });
            urls.len()
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifier, NotifyCall};
