// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OS and network adapters for the warden daemon.
//!
//! `process` abstracts the host process table behind a trait so the
//! supervisor is testable; `webhook` dispatches notifications to chat
//! webhooks with per-program conversation threading.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod process;
mod threads;
mod webhook;

pub use process::{names_match, HostMemory, ProcessAdapter, ProcessProbe, SysinfoAdapter};
pub use threads::ThreadBindings;
pub use webhook::{Notification, NotifyError, WebhookNotifier, HTTP_TIMEOUT};

#[cfg(any(test, feature = "test-support"))]
pub use process::{FakeProcessAdapter, StopCall};
