use super::Processor;
use crate::connector::ConnectorFactory;
use crate::order::Order;
use crate::registry::OrderRegistry;
use crate::transition::StateTransitioner;
use fcb_schemas::{BrokerError, MemberId, OrderState};
use std::sync::Arc;
use tracing::debug;

/// Finalizes CLOSED orders. A locally-provided order with an instance gets
/// exactly one confirmed `delete_instance` before leaving the registry; a
/// not-found answer counts as already deleted. Any other deletion failure
/// leaves the order in the queue for the next pass. Orders with nothing
/// provisioned locally (pre-provision closes and requester-side copies of
/// remote orders) are removed immediately.
pub(crate) struct ClosedProcessor {
    registry: Arc<OrderRegistry>,
    transitioner: Arc<StateTransitioner>,
    factory: Arc<ConnectorFactory>,
    local_member: MemberId,
}

impl ClosedProcessor {
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
impl Processor for ClosedProcessor {
    fn name(&self) -> &'static str {
        "closed"
    }

    fn state(&self) -> OrderState {
        OrderState::Closed
    }

    fn registry(&self) -> &Arc<OrderRegistry> {
        &self.registry
    }

    async fn process(&mut self, order: &Arc<Order>) -> Result<(), BrokerError> {
        let record = order.lock().await;
        if record.state != OrderState::Closed {
            return Ok(());
        }

        if record.is_provider_local(&self.local_member) && record.instance_id.is_some() {
            let connector = self.factory.for_record(&record)?;
            match connector.delete_instance(&record).await {
                Ok(()) => {}
                Err(BrokerError::NotFound(_)) => {
                    debug!(order_id = %record.id, "backend instance already gone");
                }
                // Deletion unconfirmed: keep the order queued and retry.
                Err(err) => return Err(err),
            }
        }

        self.transitioner.deactivate(&record);
        Ok(())
    }
}
