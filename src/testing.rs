//! Test doubles shared by the unit tests

use crate::component::{Component, ComponentKind};
use crate::context::AppContext;
use crate::lifecycle::Phase;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Ordered trace of operations shared between probes
#[derive(Clone, Default)]
pub(crate) struct TraceLog(Arc<Mutex<Vec<String>>>);

impl TraceLog {
    pub(crate) fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub(crate) fn clear(&self) {
        self.0.lock().clear();
    }
}

/// Component that records `<name>.Init`, `<name>.Start` and `<name>.Stop`
/// into a [`TraceLog`] and can be scripted to fail or cancel.
pub(crate) struct Probe {
    name: String,
    kind: ComponentKind,
    log: TraceLog,
    fail_on: Mutex<Option<Phase>>,
    cancel_after: Mutex<Option<(Phase, CancellationToken)>>,
}

impl Probe {
    pub(crate) fn new(name: &str, kind: ComponentKind, log: &TraceLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            kind,
            log: log.clone(),
            fail_on: Mutex::new(None),
            cancel_after: Mutex::new(None),
        })
    }

    /// Fail the given phase with an error named `<name>.<phase>.err`.
    pub(crate) fn failing(self: Arc<Self>, phase: Phase) -> Arc<Self> {
        *self.fail_on.lock() = Some(phase);
        self
    }

    /// Cancel `token` right after this probe completes `phase`.
    pub(crate) fn cancel_after(self: Arc<Self>, phase: Phase, token: &CancellationToken) -> Arc<Self> {
        *self.cancel_after.lock() = Some((phase, token.clone()));
        self
    }

    fn record(&self, phase: Phase) -> anyhow::Result<()> {
        let label = match phase {
            Phase::Initialize => "Init",
            Phase::Start => "Start",
            Phase::Stop => "Stop",
        };
        self.log.push(format!("{}.{}", self.name, label));

        if *self.fail_on.lock() == Some(phase) {
            anyhow::bail!("{}.{}.err", self.name, label);
        }
        if let Some((at, token)) = self.cancel_after.lock().as_ref() {
            if *at == phase {
                token.cancel();
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Component for Probe {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ComponentKind {
        self.kind
    }

    async fn initialize(&self, _ctx: &CancellationToken, _app: &AppContext) -> anyhow::Result<()> {
        self.record(Phase::Initialize)
    }

    async fn start(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
        self.record(Phase::Start)
    }

    async fn stop(&self, _ctx: &CancellationToken) -> anyhow::Result<()> {
        self.record(Phase::Stop)
    }
}
