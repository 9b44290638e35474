//! Environment lookups for [`ConfigBuilder::from_env`](crate::ConfigBuilder::from_env).

const PREFIX: &str = "PAYFLOW_";

/// Value of `PAYFLOW_{key}`, or of the bare `{key}` when the prefixed one is unset.
///
/// The prefixed name wins even when both are set.
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    [format!("{PREFIX}{key}"), key.to_string()]
        .iter()
        .find_map(|name| std::env::var(name).ok())
}

/// Like [`get_env_with_prefix`] but treats blank values as unset.
pub fn get_non_empty_env(key: &str) -> Option<String> {
    get_env_with_prefix(key).filter(|v| !v.trim().is_empty())
}
