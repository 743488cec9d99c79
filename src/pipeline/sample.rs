// Deterministic sampling of raw sources. Repeated invocations on identical
// input produce identical output; downstream tests depend on this.

use crate::error::{PipelineError, Result};
use crate::table::Table;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value as Json;
use tracing::info;

/// Return the full table when it is already within `target` rows, otherwise
/// a uniform random subset of exactly `target` rows drawn with a fixed
/// seed. Original row order is preserved.
pub fn sample_rows(table: &Table, target: usize, seed: u64) -> Table {
    if table.n_rows() <= target {
        return table.clone();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices = rand::seq::index::sample(&mut rng, table.n_rows(), target).into_vec();
    indices.sort_unstable();
    info!(
        "Sampled {} of {} rows (seed {})",
        target,
        table.n_rows(),
        seed
    );
    table.subset(&indices)
}

/// Truncate a JSON label map (or label list) to its first `target` entries,
/// re-serialized as JSON. Mirrors the head-truncation the label source gets
/// instead of row sampling.
pub fn truncate_label_map(bytes: &[u8], target: usize, resource: &str) -> Result<Vec<u8>> {
    let parsed: Json = serde_json::from_slice(bytes)?;
    let truncated = match parsed {
        Json::Array(items) => Json::Array(items.into_iter().take(target).collect()),
        Json::Object(map) => Json::Object(map.into_iter().take(target).collect()),
        _ => {
            return Err(PipelineError::UnsupportedJsonShape {
                resource: resource.to_string(),
            })
        }
    };
    Ok(serde_json::to_vec(&truncated)?)
}
