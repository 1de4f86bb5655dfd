//! The build protocol shared by synchronous factories.
//!
//! One run moves through four steps: resolve the builder for a captured
//! sequence number, merge the caller's partial override, evaluate pending
//! derivations in declaration order, and hand back the record. Capturing the
//! number is the caller's job, so self-derivations can replay the protocol
//! with the number of the build that triggered them.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::builder::{Builder, BuilderProvider, PendingDerivation, ResolvedBase, resolve};
use crate::merge::merge_record;
use crate::{FactoryError, FactoryResult, FactoryResultExt, Record, SequenceNumber};

/// Which pending derivations a protocol run evaluates.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Targets<'a> {
    /// Every derived field.
    All,
    /// Only the named field.
    Only(&'a str),
}

impl Targets<'_> {
    pub(crate) fn includes(self, key: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(target) => target == key,
        }
    }
}

/// Interpret a caller-supplied override; `null` means no override.
pub(crate) fn partial_record(partial: Value) -> FactoryResult<Option<Record>> {
    match partial {
        Value::Null => Ok(None),
        Value::Object(record) => Ok(Some(record)),
        other => Err(FactoryError::not_a_record("override", &other)),
    }
}

/// Check an override against the declared fields of a factory.
pub(crate) fn validate_partial<S>(
    builder: &Builder<S>,
    required: &[String],
    partial: Option<&Record>,
) -> FactoryResult<()> {
    if let Some(missing) = required
        .iter()
        .find(|key| !partial.is_some_and(|record| record.contains_key(key.as_str())))
    {
        return Err(FactoryError::missing_required(missing.as_str()));
    }
    if let Some(unknown) = partial.and_then(|record| {
        record
            .keys()
            .find(|key| !builder.contains_key(key) && !required.contains(key))
    }) {
        return Err(FactoryError::unknown_field(unknown.as_str()));
    }
    Ok(())
}

/// Keys the caller specified directly; derivations never replace them.
pub(crate) fn directly_specified(partial: Option<&Record>) -> Vec<String> {
    partial
        .map(|record| record.keys().cloned().collect())
        .unwrap_or_default()
}

/// Run the protocol for an already captured sequence number.
pub(crate) fn run_protocol(
    builder: &Builder,
    seq: SequenceNumber,
    partial: Option<Record>,
    targets: Targets<'_>,
) -> FactoryResult<Record> {
    let ResolvedBase { value, derived } = resolve(seq, builder)?;
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
        let computed = derived.derive(&key, &object, seq)?;
        tracing::trace!(field = %key, seq, "derived field");
        object.insert(key, computed);
    }
    Ok(in_declared_order(builder, object))
}

/// Reorder `object` so declared fields follow the builder's order.
///
/// Keys supplied only by the override keep their relative order after the
/// declared ones.
pub(crate) fn in_declared_order<S>(builder: &Builder<S>, object: Record) -> Record {
    let mut entries: Vec<(String, Value)> = object.into_iter().collect();
    entries.sort_by_key(|(key, _)| builder.position(key).unwrap_or(usize::MAX));
    entries.into_iter().collect()
}

/// The value `field` would take if its self-derivation were not installed.
///
/// Replays the protocol on the receiver's builder with the same sequence
/// number, the current object (minus `field`) as override, and only `field`
/// as a derivation target.
pub(crate) fn would_be_value(
    receiver: &BuilderProvider,
    field: &str,
    owner: &Record,
    seq: SequenceNumber,
) -> FactoryResult<Value> {
    let mut partial = owner.clone();
    partial.remove(field);
    let builder = receiver.materialize()?;
    let mut rebuilt = run_protocol(&builder, seq, Some(partial), Targets::Only(field))?;
    Ok(rebuilt.remove(field).unwrap_or(Value::Null))
}

/// Deserialise a built record into the factory's output type.
pub(crate) fn decode<T: DeserializeOwned>(record: Record) -> FactoryResult<T> {
    serde_json::from_value(Value::Object(record)).into_factory()
}
