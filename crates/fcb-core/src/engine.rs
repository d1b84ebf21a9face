use crate::connector::ConnectorFactory;
use crate::processors::{
    drive, ClosedProcessor, FulfilledProcessor, OpenProcessor, SpawningProcessor,
    StoppingProcessor,
};
use crate::registry::OrderRegistry;
use crate::transition::StateTransitioner;
use fcb_schemas::MemberId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

// ---------------------------------------------------------------------------
// EngineSettings
// ---------------------------------------------------------------------------

/// Tunables for the processor loops.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub open_poll: Duration,
    pub spawning_poll: Duration,
    pub fulfilled_poll: Duration,
    pub stopping_poll: Duration,
    pub closed_poll: Duration,
    /// Consecutive status-check failures before a spawning order is given
    /// up on.
    pub failure_limit: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            open_poll: Duration::from_secs(1),
            spawning_poll: Duration::from_secs(1),
            fulfilled_poll: Duration::from_secs(5),
            stopping_poll: Duration::from_secs(1),
            closed_poll: Duration::from_secs(1),
            failure_limit: 5,
        }
    }
}

impl EngineSettings {
    /// The same interval for every loop. Tests use this with a few
    /// milliseconds to keep scenarios fast.
    pub fn uniform(interval: Duration) -> Self {
        Self {
            open_poll: interval,
            spawning_poll: interval,
            fulfilled_poll: interval,
            stopping_poll: interval,
            closed_poll: interval,
            failure_limit: 5,
        }
    }

    pub fn with_failure_limit(mut self, limit: u32) -> Self {
        self.failure_limit = limit;
        self
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Owns the five background processors. `start` spawns one task per
/// processor; the returned handle flips a shared watch signal on shutdown,
/// which every loop checks at the top of each iteration.
pub struct Engine {
    registry: Arc<OrderRegistry>,
    transitioner: Arc<StateTransitioner>,
    factory: Arc<ConnectorFactory>,
    local_member: MemberId,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(
        registry: Arc<OrderRegistry>,
        transitioner: Arc<StateTransitioner>,
        factory: Arc<ConnectorFactory>,
        local_member: MemberId,
        settings: EngineSettings,
    ) -> Self {
        Self {
            registry,
            transitioner,
            factory,
            local_member,
            settings,
        }
    }

    pub fn start(&self) -> EngineHandle {
        let (tx, rx) = watch::channel(false);
        let s = &self.settings;

        let tasks = vec![
            tokio::spawn(drive(
                OpenProcessor::new(
                    self.registry.clone(),
                    self.transitioner.clone(),
                    self.factory.clone(),
                ),
                s.open_poll,
                rx.clone(),
            )),
            tokio::spawn(drive(
                SpawningProcessor::new(
                    self.registry.clone(),
                    self.transitioner.clone(),
                    self.factory.clone(),
                    self.local_member.clone(),
                    s.failure_limit,
                ),
                s.spawning_poll,
                rx.clone(),
            )),
            tokio::spawn(drive(
                FulfilledProcessor::new(
                    self.registry.clone(),
                    self.transitioner.clone(),
                    self.factory.clone(),
                    self.local_member.clone(),
                ),
                s.fulfilled_poll,
                rx.clone(),
            )),
            tokio::spawn(drive(
                StoppingProcessor::new(
                    self.registry.clone(),
                    self.transitioner.clone(),
                    self.factory.clone(),
                    self.local_member.clone(),
                ),
                s.stopping_poll,
                rx.clone(),
            )),
            tokio::spawn(drive(
                ClosedProcessor::new(
                    self.registry.clone(),
                    self.transitioner.clone(),
                    self.factory.clone(),
                    self.local_member.clone(),
                ),
                s.closed_poll,
                rx,
            )),
        ];

        info!(member = %self.local_member, "order engine started");
        EngineHandle { shutdown: tx, tasks }
    }
}

/// Handle to a running engine. Dropping it without calling `shutdown`
/// leaves the processors running for the process lifetime.
pub struct EngineHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl EngineHandle {
    /// Signal every processor and wait for the loops to finish their
    /// current iteration.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            let _ = task.await;
        }
        info!("order engine stopped");
    }
}
