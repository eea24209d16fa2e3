//! Static bounds shared by every layer.
//!
//! Size caps, cache capacities, and timing windows the rest of the
//! system consumes. Pure data; nothing here allocates.

use std::time::Duration;

/// Maximum highlight text length, in characters.
pub const MAX_TEXT_CHARS: usize = 1000;

/// Maximum stored page URL length, in characters.
pub const MAX_URL_CHARS: usize = 500;

/// Maximum stored page title length, in characters.
pub const MAX_TITLE_CHARS: usize = 200;

/// Maximum stored domain length, in characters.
pub const MAX_DOMAIN_CHARS: usize = 100;

/// Maximum number of persisted highlights; overflow drops the tail.
pub const MAX_HIGHLIGHTS: usize = 1000;

/// Surrounding-context window captured with a selection, per side.
pub const CONTEXT_CHARS: usize = 200;

/// Local context window used when scoring locator candidates, per side.
pub const SCORE_CONTEXT_CHARS: usize = 50;

/// Node-location cache capacity.
pub const NODE_CACHE_CAP: usize = 50;

/// Node-location cache entry lifetime.
pub const NODE_CACHE_TTL: Duration = Duration::from_secs(30);

/// Summary cache capacity.
pub const SUMMARY_CACHE_CAP: usize = 50;

/// Summary cache entry lifetime.
pub const SUMMARY_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Interval between proactive expired-entry sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Text prefix length folded into the summary fingerprint.
pub const FINGERPRINT_TEXT_CHARS: usize = 100;

/// Maximum admitted summarization calls per rate window.
pub const RATE_LIMIT_CALLS: usize = 5;

/// Sliding rate-limit window.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Bound on any page-to-service round trip.
pub const RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Attempts made waiting for fragment-targeted text to render.
pub const FRAGMENT_RETRIES: usize = 5;

/// Delay between fragment retries.
pub const FRAGMENT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Match cap for short (< 3 char) locator scans.
pub const SHORT_TEXT_MATCH_CAP: usize = 10;

/// Match cap for regular locator scans.
pub const TEXT_MATCH_CAP: usize = 5;

/// Search text shorter than this takes the short-scan path.
pub const SHORT_TEXT_CHARS: usize = 3;
