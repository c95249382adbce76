use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderPaidEvent, OrderShippedEvent};

/// The sending side of the event system. Cloned into every API instance that publishes events.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_paid_producers: Vec<EventProducer<OrderPaidEvent>>,
    pub order_shipped_producers: Vec<EventProducer<OrderShippedEvent>>,
}

/// The receiving side: one [`EventHandler`] per hook that was actually registered.
pub struct EventHandlers {
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_order_shipped: Option<EventHandler<OrderShippedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_paid = hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_order_shipped = hooks.on_order_shipped.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_paid, on_order_shipped }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producers.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_shipped {
            result.order_shipped_producers.push(handler.subscribe());
        }
        result
    }

    /// Run all registered handlers to completion. Each handler shuts down once every producer cloned from
    /// [`Self::producers`] has been dropped, so this future resolves when the system quiesces. Servers typically
    /// `tokio::spawn` it; tests await it directly to observe the drained state.
    pub async fn run(self) {
        let Self { on_order_paid, on_order_shipped } = self;
        let paid = async move {
            if let Some(handler) = on_order_paid {
                handler.start_handler().await;
            }
        };
        let shipped = async move {
            if let Some(handler) = on_order_shipped {
                handler.start_handler().await;
            }
        };
        tokio::join!(paid, shipped);
    }
}

/// Hook registration. Build one of these, attach closures, then turn it into [`EventHandlers`].
#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_order_shipped: Option<Handler<OrderShippedEvent>>,
}

impl EventHooks {
    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_order_shipped<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderShippedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_shipped = Some(Arc::new(f));
        self
    }
}
