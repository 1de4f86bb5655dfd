//! The build protocol for asynchronous factories.
//!
//! Mirrors the synchronous protocol step for step; every suspension point is
//! an awaited generator, deferred value, or derivation.

use serde_json::Value;

use super::builder::{AsyncBuilder, AsyncBuilderProvider, resolve_async};
use crate::builder::{PendingDerivation, ResolvedBase};
use crate::factory::engine::{Targets, directly_specified, in_declared_order};
use crate::merge::merge_record;
use crate::{FactoryResult, Record, SequenceNumber};

/// Run the protocol for an already captured sequence number.
pub(crate) async fn run_protocol_async(
    builder: &AsyncBuilder,
    seq: SequenceNumber,
    partial: Option<Record>,
    targets: Targets<'_>,
) -> FactoryResult<Record> {
    let ResolvedBase { value, derived } = resolve_async(seq, builder).await?;
    let specified = directly_specified(partial.as_ref());
    let mut object = match partial {
        Some(layer) => merge_record(value, layer),
        None => value,
    };
    for PendingDerivation { key, derived } in derived {
        if specified.contains(&key) {
            tracing::trace!(field = %key, seq, "override takes precedence over derivation");
            continue;
        }
        if !targets.includes(&key) {
            continue;
        }
        let computed = derived.derive(&key, object.clone(), seq).await?;
        tracing::trace!(field = %key, seq, "derived field");
        object.insert(key, computed);
    }
    Ok(in_declared_order(builder, object))
}

/// The value `field` would take without its self-derivation, computed on
/// the receiver's builder with the outer build's sequence number.
pub(crate) async fn would_be_value_async(
    receiver: &AsyncBuilderProvider,
    field: &str,
    mut owner: Record,
    seq: SequenceNumber,
) -> FactoryResult<Value> {
    owner.remove(field);
    let builder = receiver.materialize().await?;
    let mut rebuilt = run_protocol_async(&builder, seq, Some(owner), Targets::Only(field)).await?;
    Ok(rebuilt.remove(field).unwrap_or(Value::Null))
}
