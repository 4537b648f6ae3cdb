// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use super::{PACING_DELAY, WarmupStrategy, paced_stream};

use crate::{
    Error, discovery::AgentTypeDescriptor, identifier::Identifier,
    source::IdentifierSource,
};

use futures::{
    StreamExt,
    stream::{self, BoxStream},
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use std::sync::{Arc, Mutex};

/// Activates a uniform random sample of the persisted instances of one agent type.
///
/// Every identifier is read from the source before sampling, so memory grows with the size of
/// the collection.
pub struct SampleStrategy {
    name: String,
    applicable_types: Vec<String>,
    source: Arc<dyn IdentifierSource>,
    ratio: f64,
    batch_size: usize,
    rng: Mutex<StdRng>,
}

impl SampleStrategy {
    /// Samples `ratio` of the identifiers, pausing after every `batch_size` of them. A `seed`
    /// makes the sample reproducible.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if `ratio` is not in `(0, 1]` or `batch_size` is zero.
    ///
    pub fn new(
        name: &str,
        agent_type: &str,
        source: Arc<dyn IdentifierSource>,
        ratio: f64,
        batch_size: usize,
        seed: Option<u64>,
    ) -> Result<Self, Error> {
        if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
            return Err(Error::Validation(format!(
                "Sample ratio must be in (0, 1], got {}",
                ratio
            )));
        }
        if batch_size == 0 {
            return Err(Error::Validation(
                "Sample batch size must be positive".to_owned(),
            ));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            name: name.to_owned(),
            applicable_types: vec![agent_type.to_owned()],
            source,
            ratio,
            batch_size,
            rng: Mutex::new(rng),
        })
    }

    /// Number of identifiers sampled out of `total`.
    pub fn sample_size(&self, total: usize) -> usize {
        if total == 0 {
            return 0;
        }
        ((total as f64 * self.ratio).floor() as usize).clamp(1, total)
    }

    /// Partial Fisher-Yates shuffle over the first `sample_size` positions.
    pub fn sample(&self, mut identifiers: Vec<Identifier>) -> Vec<Identifier> {
        let size = self.sample_size(identifiers.len());
        let mut rng = match self.rng.lock() {
            Ok(rng) => rng,
            Err(poisoned) => poisoned.into_inner(),
        };
        for i in 0..size {
            let j = rng.random_range(i..identifiers.len());
            identifiers.swap(i, j);
        }
        identifiers.truncate(size);
        identifiers
    }
}

impl WarmupStrategy for SampleStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn applicable_types(&self) -> &[String] {
        &self.applicable_types
    }

    fn priority(&self) -> i32 {
        75
    }

    fn estimated_count(&self) -> usize {
        ((1000.0 * self.ratio) as usize).max(1)
    }

    fn generate_identifiers<'a>(
        &'a self,
        agent_type: &'a AgentTypeDescriptor,
        token: CancellationToken,
    ) -> BoxStream<'a, Identifier> {
        let load_token = token.clone();
        stream::once(async move {
            let all: Vec<Identifier> = self
                .source
                .stream_identifiers(agent_type, None, load_token.clone())
                .collect()
                .await;
            if load_token.is_cancelled() {
                return Vec::new();
            }
            let total = all.len();
            let sample = self.sample(all);
            info!(
                "Sampled {} of {} identifiers for {} with strategy {}",
                sample.len(),
                total,
                agent_type.type_name,
                self.name
            );
            sample
        })
        .flat_map(move |sample| {
            debug!("Yielding sample of {} identifiers", sample.len());
            paced_stream(
                sample.into_iter(),
                self.batch_size,
                PACING_DELAY,
                token.clone(),
            )
        })
        .boxed()
    }
}
