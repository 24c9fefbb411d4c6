//! Environment fallbacks for transport settings.

use contracts::TransportConfig;

pub const ENV_REGION: &str = "AWS_REGION";
pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";

/// Fill missing region and credentials from `lookup`.
///
/// Values present in the configuration are never replaced.
pub fn apply_fallbacks<F>(transport: &mut TransportConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    fill(&mut transport.region, ENV_REGION, &lookup);
    fill(&mut transport.access_key_id, ENV_ACCESS_KEY_ID, &lookup);
    fill(&mut transport.secret_access_key, ENV_SECRET_ACCESS_KEY, &lookup);
}

/// Lookup backed by the process environment
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn fill<F>(slot: &mut Option<String>, key: &str, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    if slot.is_none() {
        *slot = lookup(key);
    }
}
