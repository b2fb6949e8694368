//! Random cluster names.

use rand::Rng;

/// Default prefix for generated names.
pub const DEFAULT_NAME_PREFIX: &str = "k3s-cluster";

/// Upper bound (exclusive) of the numeric suffix.
const NAME_SUFFIX_RANGE: u32 = 1000;

/// Generate `<prefix>-<n>` with `n` in `0..1000`.
#[must_use]
pub fn random_name(prefix: &str) -> String {
    let n = rand::thread_rng().gen_range(0..NAME_SUFFIX_RANGE);
    format!("{prefix}-{n}")
}
