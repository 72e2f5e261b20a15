use super::types::Operator;
use crate::error::{EngineError, Result};
use crate::sketch::BitFilter;
use crate::storage::SummaryStore;

/// Combines the named keys' filters bit by bit, then tests `value` once
/// against the composite.
///
/// OR can report a value present in no single key: bits contributed by
/// different keys may jointly cover all `k` probe positions. Unknown keys
/// contribute an empty filter of the configured shape. Every filter must share
/// one shape, otherwise the whole query fails with `DimensionMismatch`.
pub fn bitwise_exists(
    store: &SummaryStore,
    keys: &[String],
    value: &[u8],
    op: Operator,
) -> Result<bool> {
    let composite = keys
        .iter()
        .map(|key| store.filter_or_empty(key))
        .try_fold(None::<BitFilter>, |acc, filter| {
            let next = match acc {
                None => filter,
                Some(acc) => match op {
                    Operator::And => acc.combine_and(&filter)?,
                    Operator::Or => acc.combine_or(&filter)?,
                },
            };
            Ok::<_, EngineError>(Some(next))
        })?;

    Ok(match composite {
        Some(filter) => filter.test(value),
        None => op.identity(),
    })
}

/// Tests `value` against each key's filter in order and folds the answers with
/// `op`, stopping at the first deciding result (false for AND, true for OR).
/// Unknown keys answer `false`.
pub fn chaining_exists(store: &SummaryStore, keys: &[String], value: &[u8], op: Operator) -> bool {
    let mut answers = keys.iter().map(|key| store.test(key, value));
    match op {
        Operator::And => answers.all(|hit| hit),
        Operator::Or => answers.any(|hit| hit),
    }
}

/// Jaccard similarity of two keys' sets, estimated from bit populations:
/// `|A AND B| / |A OR B|`. Two empty (or unknown) keys are identical (1.0).
pub fn similarity(store: &SummaryStore, key_a: &str, key_b: &str) -> Result<f64> {
    let a = store.filter_or_empty(key_a);
    let b = store.filter_or_empty(key_b);

    let intersection = a.combine_and(&b)?.pop_count();
    let union = a.combine_or(&b)?.pop_count();

    if union == 0 {
        return Ok(1.0);
    }
    Ok(intersection as f64 / union as f64)
}
