//! Generic actor runtime (spec §5 Scheduling / §9 Design Note): "the
//! backup/restore pipelines... are independent tasks over bounded
//! channels; model as message-passing actors". Directly modeled on
//! `client/actors-framework/src/actor.rs`'s `Actor`/`ActorHandle`/
//! `ActorEventLoop` trait trio, but using `tokio::sync::mpsc` instead of
//! the teacher's Substrate-specific `sc_utils::mpsc::TracingUnboundedSender`
//! and `tokio::task::spawn` instead of `sc_service::SpawnTaskHandle`.

use tokio::sync::mpsc;

/// Default bound on an actor's inbound message queue; chosen to match the
/// bounded-channel requirement in spec §5 ("Pipelines... are composed of
/// cooperative tasks communicating over bounded channels").
pub const DEFAULT_QUEUE_SIZE: usize = 256;

/// An actor: owns its state and handles messages one at a time on its own
/// task, suspending only at explicit await points (spec §5 "Suspension
/// points").
pub trait Actor: Sized + Send + 'static {
    type Message: Send + 'static;

    fn handle_message(&mut self, message: Self::Message) -> impl std::future::Future<Output = ()> + Send;
}

/// A clonable handle to a running actor's inbound channel.
pub struct ActorHandle<T: Actor> {
    sender: mpsc::Sender<T::Message>,
}

impl<T: Actor> Clone for ActorHandle<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T: Actor> ActorHandle<T> {
    /// Sends a message, suspending if the actor's queue is full (the
    /// channel-write suspension point of spec §5).
    pub async fn send(&self, message: T::Message) {
        if self.sender.send(message).await.is_err() {
            log::warn!("actor handle send failed: receiver already dropped");
        }
    }

    pub fn try_send(&self, message: T::Message) -> Result<(), mpsc::error::TrySendError<T::Message>> {
        self.sender.try_send(message)
    }
}

/// Spawns `actor` onto its own task with a bounded inbound channel of size
/// `queue_size`, returning a handle. The event loop runs until every handle
/// is dropped.
pub fn spawn_actor<T: Actor>(actor: T, queue_size: usize) -> ActorHandle<T> {
    let (sender, receiver) = mpsc::channel(queue_size);
    tokio::spawn(run_event_loop(actor, receiver));
    ActorHandle { sender }
}

async fn run_event_loop<T: Actor>(mut actor: T, mut receiver: mpsc::Receiver<T::Message>) {
    while let Some(message) = receiver.recv().await {
        actor.handle_message(message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counter(Arc<AtomicUsize>);

    impl Actor for Counter {
        type Message = usize;

        async fn handle_message(&mut self, message: usize) {
            self.0.fetch_add(message, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn actor_processes_messages_in_order_until_handle_dropped() {
        let total = Arc::new(AtomicUsize::new(0));
        let handle = spawn_actor(Counter(total.clone()), 8);
        for i in 1..=5 {
            handle.send(i).await;
        }
        drop(handle);
        // Give the spawned task a chance to drain the channel.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(total.load(Ordering::SeqCst), 15);
    }
}
