//! Scenario descriptors
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use surge_core::ScenarioConfig;

pub type BoxedFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One iteration of a workflow, with the shared data already bound.
pub type IterationFn = Arc<dyn Fn(Vu) -> BoxedFut<'static, ()> + Send + Sync>;

pub(crate) type WorkflowFn<D> = Arc<dyn Fn(Arc<D>, Vu) -> BoxedFut<'static, ()> + Send + Sync>;

/// Identity of the worker running an iteration.
///
/// `id` is stable for the lifetime of the worker and unique within its scenario; workers are
/// numbered from zero in the order they are started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vu {
    id: u64,
    iteration: u64,
}

impl Vu {
    pub fn new(id: u64, iteration: u64) -> Self {
        Self { id, iteration }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// How many iterations this worker completed before the current one.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }
}

/// Load test scenario structure
///
/// Binds a [`ScenarioConfig`] to the workflow it drives. The workflow receives the data
/// produced by the setup phase and the identity of the worker running it.
pub struct Scenario<D> {
    config: ScenarioConfig,
    workflow: WorkflowFn<D>,
}

impl<D> Scenario<D>
where
    D: Send + Sync + 'static,
{
    pub fn new<T, F>(config: ScenarioConfig, workflow: T) -> Self
    where
        T: Fn(Arc<D>, Vu) -> F + Send + Sync + 'static,
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            config,
            workflow: Arc::new(move |data, vu| Box::pin(workflow(data, vu))),
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub(crate) fn into_parts(self) -> (ScenarioConfig, WorkflowFn<D>) {
        (self.config, self.workflow)
    }
}

impl<D> fmt::Debug for Scenario<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
