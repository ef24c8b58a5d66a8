use time::Duration;

use crate::UtcDateTime;

/// A snapshot is fresh while its age is strictly below the TTL.
pub fn is_fresh(cached_at: UtcDateTime, now: UtcDateTime, ttl: Duration) -> bool {
    cached_at.age_at(now) < ttl
}
