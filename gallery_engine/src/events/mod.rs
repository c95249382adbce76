//! Order lifecycle events.
//!
//! The order flow publishes an event when an order transitions to `Paid` and when it transitions into `Shipped`.
//! Subscribers (the server's mailer integration) receive events over an mpsc channel and handle them in spawned
//! tasks, so the webhook handler's transactional commit is the only thing on the HTTP response's critical path.
//! Handler failures are the handler's own problem; nothing propagates back into the request.

mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::{OrderPaidEvent, OrderShippedEvent};
pub use hooks::{EventHandlers, EventHooks, EventProducers};
