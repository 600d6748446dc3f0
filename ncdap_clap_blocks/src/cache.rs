//! Config for the per-session fetch cache.

use std::time::Duration;

use tracing::{trace, warn};

use crate::memory_size::MemorySize;

/// CLI config for caching, prefetching and request validation.
#[derive(Debug, Clone, Copy, clap::Parser)]
pub struct CacheConfig {
    /// Keep fetched variables in an in-memory LRU cache.
    #[clap(
        long = "dap-cache",
        env = "NCDAP_CACHE",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub cache: bool,

    /// Fetch every small variable in one request the first time any variable is read.
    #[clap(
        long = "dap-prefetch",
        env = "NCDAP_PREFETCH",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub prefetch: bool,

    /// Upper bound on the summed payload size of the LRU cache.
    ///
    /// Can be given as a byte count or with a `K`, `M` or `G` suffix.
    #[clap(
        long = "dap-cache-limit",
        env = "NCDAP_CACHE_LIMIT",
        default_value = "100M",
        action
    )]
    pub cache_limit: MemorySize,

    /// Upper bound on the number of payloads in the LRU cache.
    #[clap(
        long = "dap-cache-count",
        env = "NCDAP_CACHE_COUNT",
        default_value = "100",
        action
    )]
    pub cache_count: usize,

    /// Largest element count of a variable that is prefetched.
    #[clap(
        long = "dap-small-size-limit",
        env = "NCDAP_SMALL_SIZE_LIMIT",
        default_value = "1024",
        action
    )]
    pub small_size_limit: usize,

    /// Most dimensions a request may address.
    #[clap(
        long = "dap-max-rank",
        env = "NCDAP_MAX_RANK",
        default_value = "1024",
        action
    )]
    pub max_rank: usize,

    /// Log every remote fetch, with its constraint and duration, at info level.
    #[clap(long = "dap-show-fetch", env = "NCDAP_SHOW_FETCH", action)]
    pub show_fetch: bool,

    /// Timeout for each remote request, expressed as a human-readable time, e.g., "30s", "2m".
    #[clap(long = "dap-fetch-timeout", env = "NCDAP_FETCH_TIMEOUT", action)]
    pub fetch_timeout: Option<humantime::Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache: true,
            prefetch: true,
            cache_limit: MemorySize::from_bytes(100 * 1024 * 1024),
            cache_count: 100,
            small_size_limit: 1024,
            max_rank: 1024,
            show_fetch: false,
            fetch_timeout: None,
        }
    }
}

impl CacheConfig {
    /// Override settings from the client parameters of a dataset URL.
    ///
    /// Recognized keys are `cache`, `prefetch`, `cachelimit`, `cachecount`, `smallsizelimit`
    /// and `show`. A flag is on when its value is empty, `1` or starts with `y`. Unparsable
    /// values are logged and leave the setting unchanged.
    pub fn apply_client_params<'a>(
        &mut self,
        params: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) {
        for (key, value) in params {
            match key {
                "cache" => self.cache = flag(value),
                "prefetch" => self.prefetch = flag(value),
                "cachelimit" => set_parsed(&mut self.cache_limit, key, value),
                "cachecount" => set_parsed(&mut self.cache_count, key, value),
                "smallsizelimit" => set_parsed(&mut self.small_size_limit, key, value),
                "show" if value == "fetch" => self.show_fetch = true,
                _ => trace!(key, value, "ignoring client parameter"),
            }
        }
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout.as_ref().map(|d| **d)
    }
}

/// Split a URL fragment such as `cache&cachelimit=10M&show=fetch` into key/value pairs.
pub fn parse_client_params(fragment: &str) -> Vec<(&str, &str)> {
    fragment
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| p.split_once('=').unwrap_or((p, "")))
        .collect()
}

fn flag(value: &str) -> bool {
    value.is_empty() || value == "1" || value.starts_with(['y', 'Y'])
}

fn set_parsed<T: std::str::FromStr>(target: &mut T, key: &str, value: &str) {
    match value.parse() {
        Ok(v) => *target = v,
        Err(_) => warn!(key, value, "invalid client parameter value, ignoring"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_the_parser() {
        let parsed = CacheConfig::parse_from(["ncdap"]);
        let default = CacheConfig::default();
        assert_eq!(parsed.cache, default.cache);
        assert_eq!(parsed.prefetch, default.prefetch);
        assert_eq!(parsed.cache_limit, default.cache_limit);
        assert_eq!(parsed.cache_count, default.cache_count);
        assert_eq!(parsed.small_size_limit, default.small_size_limit);
        assert_eq!(parsed.max_rank, default.max_rank);
        assert_eq!(parsed.show_fetch, default.show_fetch);
        assert_eq!(parsed.fetch_timeout(), None);
    }

    #[test]
    fn flags() {
        let config = CacheConfig::parse_from([
            "ncdap",
            "--dap-cache",
            "false",
            "--dap-cache-limit",
            "10M",
            "--dap-cache-count",
            "7",
            "--dap-show-fetch",
            "--dap-fetch-timeout",
            "30s",
        ]);
        assert!(!config.cache);
        assert_eq!(config.cache_limit.bytes(), 10 * 1024 * 1024);
        assert_eq!(config.cache_count, 7);
        assert!(config.show_fetch);
        assert_eq!(config.fetch_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn client_params_override() {
        let mut config = CacheConfig {
            cache: false,
            prefetch: true,
            ..Default::default()
        };
        config.apply_client_params(parse_client_params(
            "cache&prefetch=no&cachelimit=1K&cachecount=oops&smallsizelimit=16&show=fetch&x=1",
        ));
        assert!(config.cache);
        assert!(!config.prefetch);
        assert_eq!(config.cache_limit.bytes(), 1024);
        assert_eq!(config.cache_count, 100);
        assert_eq!(config.small_size_limit, 16);
        assert!(config.show_fetch);

        config.apply_client_params([("cache", "0")]);
        assert!(!config.cache);
        config.apply_client_params([("cache", "yes")]);
        assert!(config.cache);
    }

    #[test]
    fn fragments() {
        assert_eq!(
            parse_client_params("cache&&show=fetch"),
            vec![("cache", ""), ("show", "fetch")]
        );
        assert!(parse_client_params("").is_empty());
    }
}
