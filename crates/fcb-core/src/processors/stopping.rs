use super::Processor;
use crate::connector::ConnectorFactory;
use crate::order::Order;
use crate::registry::OrderRegistry;
use crate::transition::StateTransitioner;
use fcb_schemas::{BrokerError, InstanceState, MemberId, OrderState, ResourceType};
use std::sync::Arc;
use tracing::error;

/// Monitors STOPPING compute orders: keeps checking the instance until the
/// backend reports it stopped. Once an order is here only this loop and a
/// user delete can touch it, but the state re-check under the lock stays;
/// safe programming is cheap.
pub(crate) struct StoppingProcessor {
    registry: Arc<OrderRegistry>,
    transitioner: Arc<StateTransitioner>,
    factory: Arc<ConnectorFactory>,
    local_member: MemberId,
}

impl StoppingProcessor {
    pub(crate) fn new(
        registry: Arc<OrderRegistry>,
        transitioner: Arc<StateTransitioner>,
        factory: Arc<ConnectorFactory>,
        local_member: MemberId,
    ) -> Self {
        Self {
            registry,
            transitioner,
            factory,
            local_member,
        }
    }
}

#[async_trait::async_trait]
impl Processor for StoppingProcessor {
    fn name(&self) -> &'static str {
        "stopping"
    }

    fn state(&self) -> OrderState {
        OrderState::Stopping
    }

    fn registry(&self) -> &Arc<OrderRegistry> {
        &self.registry
    }

    async fn process(&mut self, order: &Arc<Order>) -> Result<(), BrokerError> {
        let mut record = order.lock().await;
        if record.state != OrderState::Stopping {
            return Ok(());
        }
        // Only compute orders can be stopped.
        if record.resource_type() != ResourceType::Compute {
            return Ok(());
        }
        if record.is_provider_remote(&self.local_member) {
            error!(order_id = %record.id, provider = %record.provider, "remote order found in STOPPING");
            self.transitioner
                .transition(order, &mut record, OrderState::Pending);
            return Ok(());
        }

        let connector = self.factory.for_record_unaudited(&record)?;
        match connector.get_instance(&record).await {
            Ok(instance) => {
                if instance.state() == InstanceState::Stopped {
                    record.cached_instance_state = InstanceState::Stopped;
                    self.transitioner
                        .transition(order, &mut record, OrderState::Stopped);
                }
                Ok(())
            }
            Err(err) if err.is_connectivity() => {
                self.transitioner
                    .transition(order, &mut record, OrderState::UnableToCheckStatus);
                Err(err)
            }
            Err(BrokerError::NotFound(_)) => {
                record.cached_instance_state = InstanceState::Failed;
                record.set_once_fault_message("instance disappeared while stopping");
                self.transitioner.transition(
                    order,
                    &mut record,
                    OrderState::FailedAfterSuccessfulRequest,
                );
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
