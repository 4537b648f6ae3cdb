// Fakes shared by the warmup integration tests

#![allow(dead_code)]

use warmup::{
    ActorHandle, ActorRuntime, AgentTypeDescriptor, Error, Identifier,
    IdentifierSource,
};

use async_trait::async_trait;
use futures::{
    StreamExt,
    stream::{self, BoxStream},
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

// Logs to the test output, filtered by RUST_LOG.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Shared state of the fake runtime.
#[derive(Default)]
pub struct RuntimeState {
    pub touches: Mutex<Vec<(String, Identifier)>>,
    pub failures: Mutex<HashMap<Identifier, usize>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

// Actor runtime whose actors take `latency` to activate and fail on demand.
#[derive(Clone, Default)]
pub struct FakeRuntime {
    pub state: Arc<RuntimeState>,
    pub latency: Duration,
}

impl FakeRuntime {
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: Arc::new(RuntimeState::default()),
            latency,
        }
    }

    // The next `times` activations of `identifier` fail.
    pub fn fail(&self, identifier: Identifier, times: usize) {
        self.state.failures.lock().unwrap().insert(identifier, times);
    }

    pub fn touches(&self) -> Vec<(String, Identifier)> {
        self.state.touches.lock().unwrap().clone()
    }

    pub fn touched_by(&self, interface: &str) -> Vec<Identifier> {
        self.touches()
            .into_iter()
            .filter(|(i, _)| i == interface)
            .map(|(_, id)| id)
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

impl ActorRuntime for FakeRuntime {
    fn actor_reference(
        &self,
        interface: &str,
        identifier: &Identifier,
    ) -> Result<Arc<dyn ActorHandle>, Error> {
        Ok(Arc::new(FakeHandle {
            state: self.state.clone(),
            latency: self.latency,
            interface: interface.to_owned(),
            identifier: identifier.clone(),
        }))
    }
}

pub struct FakeHandle {
    state: Arc<RuntimeState>,
    latency: Duration,
    interface: String,
    identifier: Identifier,
}

#[async_trait]
impl ActorHandle for FakeHandle {
    async fn touch(&self) -> Result<(), Error> {
        let in_flight = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.state
            .touches
            .lock()
            .unwrap()
            .push((self.interface.clone(), self.identifier.clone()));

        let mut failures = self.state.failures.lock().unwrap();
        match failures.get_mut(&self.identifier) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(Error::Activation(format!(
                    "{} is not ready",
                    self.identifier
                )))
            }
            _ => Ok(()),
        }
    }
}

// Identifier source backed by a map from type name to identifiers.
#[derive(Default)]
pub struct MapSource {
    pub identifiers: HashMap<String, Vec<Identifier>>,
}

impl MapSource {
    pub fn with(
        mut self,
        type_name: &str,
        identifiers: Vec<Identifier>,
    ) -> Self {
        self.identifiers.insert(type_name.to_owned(), identifiers);
        self
    }
}

#[async_trait]
impl IdentifierSource for MapSource {
    fn stream_identifiers<'a>(
        &'a self,
        agent_type: &'a AgentTypeDescriptor,
        max_count: Option<usize>,
        _token: CancellationToken,
    ) -> BoxStream<'a, Identifier> {
        let identifiers = self
            .identifiers
            .get(&agent_type.type_name)
            .cloned()
            .unwrap_or_default();
        let max = max_count.unwrap_or(usize::MAX);
        stream::iter(identifiers.into_iter().take(max)).boxed()
    }

    fn collection_name(&self, agent_type: &AgentTypeDescriptor) -> String {
        agent_type.type_name.clone()
    }

    async fn count(
        &self,
        agent_type: &AgentTypeDescriptor,
    ) -> Result<u64, Error> {
        Ok(self
            .identifiers
            .get(&agent_type.type_name)
            .map(|ids| ids.len() as u64)
            .unwrap_or(0))
    }

    async fn exists(
        &self,
        agent_type: &AgentTypeDescriptor,
    ) -> Result<bool, Error> {
        Ok(self.identifiers.contains_key(&agent_type.type_name))
    }
}
