// src/constants.rs

/// The name of the application directory under the user's config and cache dirs.
pub const APP_DIR_NAME: &str = "netscope";

/// The name of the main configuration file (in ~/.config/netscope/).
pub const CONFIG_FILENAME: &str = "config.toml";

/// The default name of the offline inventory document (in ~/.config/netscope/).
pub const INVENTORY_FILENAME: &str = "inventory.json";

/// Suffix of every on-disk cache namespace file.
pub const CACHE_FILE_SUFFIX: &str = ".cache.bin";

/// Bumped whenever the on-disk cache envelope changes shape.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Default lifetime of a cache entry.
pub const DEFAULT_CACHE_TTL_MINUTES: u64 = 30;

/// Default size of the region fan-out worker pool.
pub const DEFAULT_MAX_WORKERS: usize = 10;

/// Default maximum length of the rendered prompt.
pub const DEFAULT_PROMPT_MAX_LENGTH: usize = 50;

/// Account identity used when no profile is configured.
pub const DEFAULT_ACCOUNT: &str = "default";

/// Cache namespace holding the normalised routing sources.
pub const ROUTING_CACHE_NAMESPACE: &str = "routing-cache";

/// Key under [`ROUTING_CACHE_NAMESPACE`] for the persisted sources.
pub const ROUTING_CACHE_KEY: &str = "sources";

/// Cache namespace for route tables listed from a context frame.
pub const ROUTE_TABLE_NAMESPACE: &str = "route-table";

/// Regions used when neither the config nor the inventory names any.
pub const FALLBACK_REGIONS: &[&str] = &["us-east-1"];
