// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

use super::{PACING_DELAY, WarmupStrategy, paced_stream};

use crate::{
    Error,
    discovery::AgentTypeDescriptor,
    identifier::{Identifier, IdentifierKind},
};

use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Activates the integer identifiers in `[start, end)` of one agent type.
#[derive(Debug, Clone)]
pub struct RangeStrategy {
    name: String,
    applicable_types: Vec<String>,
    kind: IdentifierKind,
    start: i64,
    end: i64,
    batch_size: usize,
}

impl RangeStrategy {
    /// # Errors
    ///
    /// Returns `Error::Validation` if `kind` is not an integer kind, the range is empty or does
    /// not fit `kind`, or `batch_size` is zero.
    ///
    pub fn new(
        name: &str,
        agent_type: &str,
        kind: IdentifierKind,
        start: i64,
        end: i64,
        batch_size: usize,
    ) -> Result<Self, Error> {
        if !kind.is_numeric() {
            return Err(Error::Validation(format!(
                "Range strategy only supports integer identifiers, got {}",
                kind
            )));
        }
        if start >= end {
            return Err(Error::Validation(format!(
                "Range start {} must be less than end {}",
                start, end
            )));
        }
        if kind == IdentifierKind::Int32
            && (i32::try_from(start).is_err()
                || i32::try_from(end - 1).is_err())
        {
            return Err(Error::Validation(format!(
                "Range [{}, {}) does not fit int32 identifiers",
                start, end
            )));
        }
        if batch_size == 0 {
            return Err(Error::Validation(
                "Range batch size must be positive".to_owned(),
            ));
        }
        Ok(Self {
            name: name.to_owned(),
            applicable_types: vec![agent_type.to_owned()],
            kind,
            start,
            end,
            batch_size,
        })
    }
}

impl WarmupStrategy for RangeStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn applicable_types(&self) -> &[String] {
        &self.applicable_types
    }

    fn priority(&self) -> i32 {
        50
    }

    fn estimated_count(&self) -> usize {
        usize::try_from(self.end.abs_diff(self.start)).unwrap_or(usize::MAX)
    }

    fn generate_identifiers<'a>(
        &'a self,
        agent_type: &'a AgentTypeDescriptor,
        token: CancellationToken,
    ) -> BoxStream<'a, Identifier> {
        debug!(
            "Generating range identifiers from {} to {} for {}",
            self.start, self.end, agent_type.type_name
        );
        let kind = self.kind;
        let identifiers = (self.start..self.end).map(move |value| match kind {
            // Bounds were checked at construction.
            IdentifierKind::Int32 => Identifier::Int32(value as i32),
            _ => Identifier::Int64(value),
        });
        paced_stream(identifiers, self.batch_size, PACING_DELAY, token)
    }
}
