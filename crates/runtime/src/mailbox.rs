//! Single-slot intent handoff between producer threads and one consumer.
//!
//! Producers call [`IntentMailbox::try_enqueue`] from any thread; it never
//! blocks and refuses a second intent while one is still pending. The single
//! consumer awaits [`IntentMailbox::recv`]. The slot is taken under the lock,
//! so an intent is handed over exactly once even when a wake-up races with a
//! cancellation.
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use wizard_core::Intent;

/// Outcome of waiting on the mailbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MailboxRecv {
    Intent(Intent),
    /// The token fired or the mailbox was closed. Nothing was consumed.
    Cancelled,
}

#[derive(Debug, Default)]
struct Slot {
    pending: Option<Intent>,
    closed: bool,
}

#[derive(Debug, Default)]
pub struct IntentMailbox {
    slot: Mutex<Slot>,
    notify: Notify,
}

impl IntentMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `intent` if the slot is free and wake the consumer.
    ///
    /// Returns `false` when an intent is already pending or the mailbox is
    /// closed. That is back-pressure, not an error.
    pub fn try_enqueue(&self, intent: Intent) -> bool {
        {
            let mut slot = self.lock();
            if slot.closed || slot.pending.is_some() {
                trace!(target: "wizard::mailbox", %intent, "slot occupied, intent refused");
                return false;
            }
            slot.pending = Some(intent);
        }
        self.notify.notify_one();
        true
    }

    /// Wait for the next intent or for `cancel` to fire.
    pub async fn recv(&self, cancel: &CancellationToken) -> MailboxRecv {
        loop {
            let notified = self.notify.notified();
            {
                let mut slot = self.lock();
                if slot.closed {
                    return MailboxRecv::Cancelled;
                }
                if let Some(intent) = slot.pending.take() {
                    return MailboxRecv::Intent(intent);
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return MailboxRecv::Cancelled,
                _ = notified => {}
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    /// Close the mailbox, discarding any pending intent, and wake the consumer.
    /// Returns the discarded intent.
    pub fn close(&self) -> Option<Intent> {
        let discarded = {
            let mut slot = self.lock();
            slot.closed = true;
            slot.pending.take()
        };
        self.notify.notify_waiters();
        discarded
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
