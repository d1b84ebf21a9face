use super::Processor;
use crate::connector::ConnectorFactory;
use crate::order::Order;
use crate::registry::OrderRegistry;
use crate::transition::StateTransitioner;
use fcb_schemas::{BrokerError, InstanceState, MemberId, OrderState};
use std::sync::Arc;
use tracing::info;

/// Re-checks FULFILLED orders served by the local clouds to catch
/// out-of-band failures: an instance that disappeared or started reporting
/// failure is demoted. Remote copies are monitored by their provider and
/// skipped here.
pub(crate) struct FulfilledProcessor {
    registry: Arc<OrderRegistry>,
    transitioner: Arc<StateTransitioner>,
    factory: Arc<ConnectorFactory>,
    local_member: MemberId,
}

impl FulfilledProcessor {
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
impl Processor for FulfilledProcessor {
    fn name(&self) -> &'static str {
        "fulfilled"
    }

    fn state(&self) -> OrderState {
        OrderState::Fulfilled
    }

    fn registry(&self) -> &Arc<OrderRegistry> {
        &self.registry
    }

    async fn process(&mut self, order: &Arc<Order>) -> Result<(), BrokerError> {
        let mut record = order.lock().await;
        if record.state != OrderState::Fulfilled {
            return Ok(());
        }
        if record.is_provider_remote(&self.local_member) {
            return Ok(());
        }

        let connector = self.factory.for_record_unaudited(&record)?;
        match connector.get_instance(&record).await {
            Ok(instance) => {
                if instance.state() == InstanceState::Failed {
                    info!(order_id = %record.id, "fulfilled instance started failing");
                    record.cached_instance_state = InstanceState::Failed;
                    record.set_once_fault_message("backend reported the instance as failed");
                    self.transitioner.transition(
                        order,
                        &mut record,
                        OrderState::FailedAfterSuccessfulRequest,
                    );
                } else {
                    record.cached_instance_state = instance.state();
                }
                Ok(())
            }
            Err(err) if err.is_connectivity() => {
                self.transitioner
                    .transition(order, &mut record, OrderState::UnableToCheckStatus);
                Err(err)
            }
            Err(BrokerError::NotFound(_)) => {
                info!(order_id = %record.id, "fulfilled instance disappeared from the backend");
                record.cached_instance_state = InstanceState::Failed;
                record.set_once_fault_message("backend instance disappeared");
                self.transitioner.transition(
                    order,
                    &mut record,
                    OrderState::FailedAfterSuccessfulRequest,
                );
                Ok(())
            }
            // Transient trouble; keep the order fulfilled and retry on the
            // next pass.
            Err(err) => Err(err),
        }
    }
}
