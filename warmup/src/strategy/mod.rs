// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Warmup strategies
//!
//! A strategy decides which agent instances of the types it applies to get activated, by
//! producing a lazy stream of identifiers. The orchestrator assigns every discovered agent type
//! to exactly one strategy, the applicable one with the highest [`WarmupStrategy::priority`].
//!
//! | Strategy | Priority | Identifiers |
//! |----------|----------|-------------|
//! | [`PredefinedStrategy`] | 100 | A fixed list |
//! | [`SampleStrategy`] | 75 | A uniform random sample of the persisted identifiers |
//! | [`RangeStrategy`] | 50 | Sequential integers |
//! | [`DefaultStrategy`] | configured (0) | Persisted, predefined or sequential identifiers |
//!

mod default;
mod predefined;
mod range;
mod sample;

pub use default::DefaultStrategy;
pub use predefined::PredefinedStrategy;
pub use range::RangeStrategy;
pub use sample::SampleStrategy;

use crate::{
    Error,
    discovery::AgentTypeDescriptor,
    identifier::Identifier,
    runtime::{ActorHandle, ActorRuntime},
};

use futures::{
    StreamExt,
    stream::{self, BoxStream},
};
use tokio_util::sync::CancellationToken;

use std::{sync::Arc, time::Duration};

/// Pause strategies take after a run of paced identifiers.
pub const PACING_DELAY: Duration = Duration::from_millis(10);

/// Pause between two identifiers of a one-by-one paced stream.
pub const ITEM_DELAY: Duration = Duration::from_millis(1);

/// Policy that produces the identifiers of the agent instances to activate.
pub trait WarmupStrategy: Send + Sync {
    /// Strategy name, used in logs and in the warmup status.
    fn name(&self) -> &str;

    /// Full type names this strategy targets. Empty means every type.
    fn applicable_types(&self) -> &[String];

    /// Higher runs first and wins ties in type assignment.
    fn priority(&self) -> i32;

    /// Expected number of identifiers per agent type, used for progress only.
    fn estimated_count(&self) -> usize;

    /// Lazily produces the identifiers to activate for `agent_type`.
    fn generate_identifiers<'a>(
        &'a self,
        agent_type: &'a AgentTypeDescriptor,
        token: CancellationToken,
    ) -> BoxStream<'a, Identifier>;

    /// True if the strategy targets every type, `agent_type` itself or one of its base types.
    fn applies_to(&self, agent_type: &AgentTypeDescriptor) -> bool {
        let types = self.applicable_types();
        types.is_empty() || types.iter().any(|name| agent_type.is_a(name))
    }

    /// Resolves the actor addressed by `identifier`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedIdentifierKind` if the identifier is not of the kind the agent
    /// type is keyed by, or the runtime error if the reference can not be resolved.
    ///
    fn create_actor_reference(
        &self,
        runtime: &dyn ActorRuntime,
        agent_type: &AgentTypeDescriptor,
        identifier: &Identifier,
    ) -> Result<Arc<dyn ActorHandle>, Error> {
        if identifier.kind() != agent_type.identifier_kind {
            return Err(Error::UnsupportedIdentifierKind {
                expected: agent_type.identifier_kind,
                actual: identifier.kind(),
            });
        }
        runtime.actor_reference(&agent_type.interface, identifier)
    }

    /// False if the strategy can not run. Invalid strategies are left out of the plan.
    fn is_valid(&self) -> bool {
        true
    }
}

/// Sleeps for `duration` unless `token` is cancelled first. Returns false on cancellation.
pub(crate) async fn pause(
    duration: Duration,
    token: &CancellationToken,
) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Streams `items`, pausing `delay` after every `every` identifiers. Ends early on cancellation.
pub(crate) fn paced_stream<'a, I>(
    items: I,
    every: usize,
    delay: Duration,
    token: CancellationToken,
) -> BoxStream<'a, Identifier>
where
    I: Iterator<Item = Identifier> + Send + 'a,
{
    let every = every.max(1);
    stream::unfold(
        (items, 0usize, token),
        move |(mut items, yielded, token)| async move {
            if token.is_cancelled() {
                return None;
            }
            let next = items.next()?;
            let due = yielded > 0 && yielded % every == 0;
            if due && !pause(delay, &token).await {
                return None;
            }
            Some((next, (items, yielded + 1, token)))
        },
    )
    .boxed()
}

#[cfg(test)]
mod tests {

    use super::*;

    use crate::identifier::IdentifierKind;

    struct Everything;

    impl WarmupStrategy for Everything {
        fn name(&self) -> &str {
            "Everything"
        }

        fn applicable_types(&self) -> &[String] {
            &[]
        }

        fn priority(&self) -> i32 {
            0
        }

        fn estimated_count(&self) -> usize {
            0
        }

        fn generate_identifiers<'a>(
            &'a self,
            _agent_type: &'a AgentTypeDescriptor,
            _token: CancellationToken,
        ) -> BoxStream<'a, Identifier> {
            stream::empty().boxed()
        }
    }

    struct NoRuntime;

    impl ActorRuntime for NoRuntime {
        fn actor_reference(
            &self,
            interface: &str,
            _identifier: &Identifier,
        ) -> Result<Arc<dyn ActorHandle>, Error> {
            Err(Error::Runtime(format!("no actor behind {}", interface)))
        }
    }

    #[test]
    fn test_default_applies_to_everything() {
        let agent_type =
            AgentTypeDescriptor::new("A.Order", IdentifierKind::Uuid, "IOrder");
        assert!(Everything.applies_to(&agent_type));
        assert!(Everything.is_valid());
    }

    #[test]
    fn test_create_actor_reference_checks_kind() {
        let agent_type =
            AgentTypeDescriptor::new("A.Order", IdentifierKind::Int64, "IOrder");
        let result = Everything.create_actor_reference(
            &NoRuntime,
            &agent_type,
            &Identifier::from("order-1"),
        );
        assert_eq!(
            result.err(),
            Some(Error::UnsupportedIdentifierKind {
                expected: IdentifierKind::Int64,
                actual: IdentifierKind::String,
            })
        );

        let result = Everything.create_actor_reference(
            &NoRuntime,
            &agent_type,
            &Identifier::from(7i64),
        );
        assert_eq!(
            result.err(),
            Some(Error::Runtime("no actor behind IOrder".to_owned()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_paced_stream_pauses_and_cancels() {
        let token = CancellationToken::new();
        let start = tokio::time::Instant::now();
        let items: Vec<Identifier> = (1..=6).map(Identifier::Int32).collect();
        let yielded: Vec<Identifier> =
            paced_stream(items.clone().into_iter(), 2, PACING_DELAY, token)
                .collect()
                .await;
        assert_eq!(yielded, items);
        assert!(start.elapsed() >= PACING_DELAY * 2);
        assert!(start.elapsed() < PACING_DELAY * 3);

        let token = CancellationToken::new();
        token.cancel();
        let yielded: Vec<Identifier> =
            paced_stream(items.into_iter(), 1, ITEM_DELAY, token)
                .collect()
                .await;
        assert!(yielded.is_empty());
    }
}
