use super::Processor;
use crate::connector::ConnectorFactory;
use crate::order::Order;
use crate::registry::OrderRegistry;
use crate::transition::StateTransitioner;
use fcb_schemas::{BrokerError, InstanceState, OrderState};
use std::sync::Arc;
use tracing::debug;

/// Drives OPEN orders: issues the backend request through the
/// factory-resolved connector. A local success moves the order to SPAWNING
/// with its instance id recorded; a remote dispatch parks it in PENDING
/// until the provider pushes an outcome; a failure is terminal (FAILED)
/// with the fault recorded.
pub(crate) struct OpenProcessor {
    registry: Arc<OrderRegistry>,
    transitioner: Arc<StateTransitioner>,
    factory: Arc<ConnectorFactory>,
}

impl OpenProcessor {
    pub(crate) fn new(
        registry: Arc<OrderRegistry>,
        transitioner: Arc<StateTransitioner>,
        factory: Arc<ConnectorFactory>,
    ) -> Self {
        Self {
            registry,
            transitioner,
            factory,
        }
    }
}

#[async_trait::async_trait]
impl Processor for OpenProcessor {
    fn name(&self) -> &'static str {
        "open"
    }

    fn state(&self) -> OrderState {
        OrderState::Open
    }

    fn registry(&self) -> &Arc<OrderRegistry> {
        &self.registry
    }

    async fn process(&mut self, order: &Arc<Order>) -> Result<(), BrokerError> {
        let mut record = order.lock().await;
        // A concurrent delete may have closed the order between the queue
        // pass and taking the lock.
        if record.state != OrderState::Open {
            return Ok(());
        }

        let connector = self.factory.for_record(&record)?;
        match connector.request_instance(&record).await {
            Ok(Some(instance_id)) if !instance_id.is_empty() => {
                debug!(order_id = %record.id, instance_id = %instance_id, "instance requested");
                record.instance_id = Some(instance_id);
                record.cached_instance_state = InstanceState::Creating;
                self.transitioner
                    .transition(order, &mut record, OrderState::Spawning);
                Ok(())
            }
            Ok(Some(_)) => {
                let fault = "backend returned an empty instance id";
                record.set_once_fault_message(fault);
                record.cached_instance_state = InstanceState::Failed;
                self.transitioner
                    .transition(order, &mut record, OrderState::Failed);
                Err(BrokerError::Unexpected(fault.to_string()))
            }
            Ok(None) => {
                // Dispatched to the remote provider; its outcome arrives as
                // an event.
                self.transitioner
                    .transition(order, &mut record, OrderState::Pending);
                Ok(())
            }
            Err(err) => {
                record.set_once_fault_message(err.to_string());
                record.cached_instance_state = InstanceState::Failed;
                self.transitioner
                    .transition(order, &mut record, OrderState::Failed);
                Err(err)
            }
        }
    }
}
