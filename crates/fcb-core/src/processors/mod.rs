//! Background processors: one polling loop per transient lifecycle state.
//!
//! All five share the same loop shape, factored into [`drive`]: check the
//! shutdown signal, take the next order of the current pass, process it
//! under the order's lock, and keep going without sleeping while the queue
//! has work. An empty pass resets the cursor and sleeps one interval.
//! A failing order is logged and never kills the loop.

mod closed;
mod fulfilled;
mod open;
mod spawning;
mod stopping;

pub(crate) use closed::ClosedProcessor;
pub(crate) use fulfilled::FulfilledProcessor;
pub(crate) use open::OpenProcessor;
pub(crate) use spawning::SpawningProcessor;
pub(crate) use stopping::StoppingProcessor;

use crate::order::Order;
use crate::registry::OrderRegistry;
use fcb_schemas::{BrokerError, OrderState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// One state's polling worker. `process` runs with the processor's own
/// mutable state (e.g. the spawning failure counters) and is expected to
/// take the order's lock itself.
#[async_trait::async_trait]
pub(crate) trait Processor: Send {
    fn name(&self) -> &'static str;
    fn state(&self) -> OrderState;
    fn registry(&self) -> &Arc<OrderRegistry>;
    async fn process(&mut self, order: &Arc<Order>) -> Result<(), BrokerError>;
}

/// Run a processor until the shutdown signal flips.
pub(crate) async fn drive<P: Processor>(
    mut processor: P,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(processor = processor.name(), "processor started");
    loop {
        if *shutdown.borrow() {
            break;
        }
        let next = processor.registry().queue(processor.state()).next();
        match next {
            Some(order) => {
                if let Err(err) = processor.process(&order).await {
                    warn!(
                        processor = processor.name(),
                        order_id = %order.id(),
                        error = %err,
                        "order processing failed; continuing with the next order"
                    );
                }
            }
            None => {
                // Pass exhausted: restart from the head after one interval.
                processor.registry().queue(processor.state()).reset_cursor();
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        }
    }
    info!(processor = processor.name(), "processor stopped");
}
