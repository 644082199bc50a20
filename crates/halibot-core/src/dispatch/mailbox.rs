//! Per-actor inbox and the worker task that drains it.

use std::sync::Arc;

use halibot_types::message::Message;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::actor::ActorDyn;

/// Sending half of an actor's inbox.
///
/// Unbounded: enqueueing never waits on the recipient.
#[derive(Debug, Clone)]
pub struct Mailbox {
    tx: mpsc::UnboundedSender<Arc<Message>>,
}

impl Mailbox {
    /// Enqueue a message. Returns `false` if the worker has stopped.
    pub fn deliver(&self, msg: Arc<Message>) -> bool {
        self.tx.send(msg).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Start the inbox worker for `actor` on `runtime` and return its mailbox.
///
/// The caller does not need to be inside `runtime`. The worker hands messages to `receive` one at a time in arrival order and
/// stops when `cancel` fires or every `Mailbox` clone has been dropped.
/// Handler errors are logged, never propagated back to the sender.
pub fn spawn_worker(
    runtime: &Handle,
    name: String,
    actor: Arc<dyn ActorDyn>,
    cancel: CancellationToken,
) -> Mailbox {
    let (tx, mut rx) = mpsc::unbounded_channel::<Arc<Message>>();

    runtime.spawn(async move {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(actor = %name, "mailbox worker cancelled");
                    break;
                }
                next = rx.recv() => match next {
                    Some(msg) => {
                        if let Err(err) = actor.receive_boxed(&msg).await {
                            warn!(actor = %name, message_id = %msg.id, error = %err, "message handling failed");
                        }
                    }
                    None => {
                        debug!(actor = %name, "mailbox closed");
                        break;
                    }
                },
            }
        }
    });

    Mailbox { tx }
}
