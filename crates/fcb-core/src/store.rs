use fcb_schemas::{BrokerError, OrderId, OrderRecord, OrderState};
use std::collections::HashMap;
use std::sync::Mutex;

/// Persistence seam notified by the state transitioner.
///
/// Calls are fire-and-forget from the engine's point of view: a failing
/// store is logged and never blocks a transition. `recover_active` runs once
/// at startup to re-populate the registry with the orders that were alive
/// when the process last stopped.
pub trait OrderStore: Send + Sync {
    fn save(&self, record: &OrderRecord) -> Result<(), BrokerError>;
    fn update(&self, record: &OrderRecord) -> Result<(), BrokerError>;
    fn remove(&self, id: &OrderId) -> Result<(), BrokerError>;
    fn recover_active(&self) -> Result<Vec<OrderRecord>, BrokerError>;
}

/// In-memory store backing tests and single-process deployments. A durable
/// implementation plugs in behind the same trait.
pub struct InMemoryOrderStore {
    records: Mutex<HashMap<OrderId, OrderRecord>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &OrderId) -> Option<OrderRecord> {
        self.records.lock().unwrap().get(id).cloned()
    }
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn save(&self, record: &OrderRecord) -> Result<(), BrokerError> {
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn update(&self, record: &OrderRecord) -> Result<(), BrokerError> {
        let mut records = self.records.lock().unwrap();
        if !records.contains_key(&record.id) {
            return Err(BrokerError::NotFound(format!(
                "order {} not in store",
                record.id
            )));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn remove(&self, id: &OrderId) -> Result<(), BrokerError> {
        self.records.lock().unwrap().remove(id);
        Ok(())
    }

    fn recover_active(&self) -> Result<Vec<OrderRecord>, BrokerError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.state != OrderState::Closed)
            .cloned()
            .collect())
    }
}
