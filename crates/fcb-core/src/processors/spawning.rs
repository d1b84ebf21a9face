use super::Processor;
use crate::connector::ConnectorFactory;
use crate::order::Order;
use crate::registry::OrderRegistry;
use crate::transition::StateTransitioner;
use fcb_schemas::{
    BrokerError, ComputeAllocation, InstanceState, MemberId, OrderId, OrderInstance, OrderState,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

/// Polls SPAWNING orders until the backend reports the instance ready or
/// failed.
///
/// Only local orders are monitored here; remote orders are advanced by the
/// providing member and observed through the synchronization protocol. The
/// consecutive-failure counter lives outside the order, keyed by id; a
/// connectivity-classified error bypasses it entirely and parks the order
/// in UNABLE_TO_CHECK_STATUS.
pub(crate) struct SpawningProcessor {
    registry: Arc<OrderRegistry>,
    transitioner: Arc<StateTransitioner>,
    factory: Arc<ConnectorFactory>,
    local_member: MemberId,
    failure_limit: u32,
    failed_attempts: HashMap<OrderId, u32>,
}

impl SpawningProcessor {
    pub(crate) fn new(
        registry: Arc<OrderRegistry>,
        transitioner: Arc<StateTransitioner>,
        factory: Arc<ConnectorFactory>,
        local_member: MemberId,
        failure_limit: u32,
    ) -> Self {
        Self {
            registry,
            transitioner,
            factory,
            local_member,
            failure_limit,
            failed_attempts: HashMap::new(),
        }
    }
}

#[async_trait::async_trait]
impl Processor for SpawningProcessor {
    fn name(&self) -> &'static str {
        "spawning"
    }

    fn state(&self) -> OrderState {
        OrderState::Spawning
    }

    fn registry(&self) -> &Arc<OrderRegistry> {
        &self.registry
    }

    async fn process(&mut self, order: &Arc<Order>) -> Result<(), BrokerError> {
        let mut record = order.lock().await;
        // Re-check under the lock: a user delete may have closed the order
        // since the queue pass picked it.
        if record.state != OrderState::Spawning {
            return Ok(());
        }
        if record.is_provider_remote(&self.local_member) {
            // A remote order must never sit in SPAWNING. Park it with the
            // other remote-driven orders so the bug cannot wedge the queue.
            error!(order_id = %record.id, provider = %record.provider, "remote order found in SPAWNING");
            self.transitioner
                .transition(order, &mut record, OrderState::Pending);
            return Ok(());
        }

        // The engine's own polling is not audited.
        let connector = self.factory.for_record_unaudited(&record)?;
        match connector.get_instance(&record).await {
            Ok(instance) => {
                self.failed_attempts.remove(&record.id);
                match instance.state() {
                    InstanceState::Failed => {
                        record.cached_instance_state = InstanceState::Failed;
                        record.set_once_fault_message("backend reported the instance as failed");
                        self.transitioner.transition(
                            order,
                            &mut record,
                            OrderState::FailedAfterSuccessfulRequest,
                        );
                    }
                    InstanceState::Ready => {
                        record.cached_instance_state = InstanceState::Ready;
                        if let OrderInstance::Compute(compute) = &instance {
                            record.actual_allocation = Some(ComputeAllocation {
                                instances: 1,
                                vcpu: compute.vcpu,
                                ram_mb: compute.ram_mb,
                                disk_gb: compute.disk_gb,
                            });
                        }
                        self.transitioner
                            .transition(order, &mut record, OrderState::Fulfilled);
                    }
                    // Still coming up; check again next pass.
                    _ => {}
                }
                Ok(())
            }
            Err(err) if err.is_connectivity() => {
                self.transitioner
                    .transition(order, &mut record, OrderState::UnableToCheckStatus);
                Err(err)
            }
            Err(err) => {
                let attempts = self.failed_attempts.entry(record.id.clone()).or_insert(0);
                *attempts += 1;
                if *attempts >= self.failure_limit {
                    self.failed_attempts.remove(&record.id);
                    record.set_once_fault_message(err.to_string());
                    record.cached_instance_state = InstanceState::Failed;
                    self.transitioner.transition(
                        order,
                        &mut record,
                        OrderState::FailedAfterSuccessfulRequest,
                    );
                } else {
                    let attempts_left = self.failure_limit - *attempts;
                    info!(
                        order_id = %record.id,
                        attempts_left,
                        error = %err,
                        "instance status check failed; will retry"
                    );
                }
                Ok(())
            }
        }
    }
}
