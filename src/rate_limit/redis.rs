use chrono::{DateTime, Duration, DurationRound, Utc};
use redis::Commands;

use super::{RateLimitResult, RateLimiter};

/// A rate limiter that uses Redis as a backing store.
pub struct RedisRateLimiter {
    client: redis::Client,
}

impl RedisRateLimiter {
    /// Create a new rate limiter.
    ///
    /// # Arguments
    ///
    /// * `connection_uri` - The connection string used to connect to Redis.
    pub fn new(connection_uri: &str) -> anyhow::Result<Self> {
        Ok(Self {
            client: redis::Client::open(connection_uri)?,
        })
    }
}

/// Compute the cache key for a rate limit window.
///
/// We only do per-minute rate limiting. This means we can use the current
/// minute as our cache key because by the time it's used again, the previous
/// value will have expired 58 minutes ago.
fn window_key(key: &str, now: DateTime<Utc>) -> String {
    format!("{}:{}", key, now.format("%M"))
}

/// Compute the timestamp at which the current rate limit window resets.
fn window_reset(now: DateTime<Utc>) -> DateTime<Utc> {
    (now + Duration::minutes(1))
        .duration_trunc(Duration::minutes(1))
        // Truncation only fails if the timestamp excedes the max representable
        // timestamp in nanoseconds or if the duration exceeds the timestamp.
        // Neither of those cases is true here, so we can just unwrap the
        // result.
        .expect("failed to truncate time")
}

impl RateLimiter for RedisRateLimiter {
    fn is_limited(&self, key: &str, max_req_per_min: u64) -> anyhow::Result<RateLimitResult> {
        // Rate limiting is implemented using the basic algorithm suggested by
        // the Redis documentation:
        // https://redis.com/redis-best-practices/basic-rate-limiting/

        let mut conn = self.client.get_connection()?;

        let now = Utc::now();
        let cache_key = window_key(key, now);

        let hits: Option<u64> = conn.get(&cache_key)?;
        if let Some(hit_count) = hits {
            if hit_count > max_req_per_min {
                // Rate limit for the current minute has already been exceeded,
                // so just report the error along with the timestamp for when
                // the rate limit resets.
                return Ok(RateLimitResult::LimitedUntil(window_reset(now)));
            }
        }

        // The cache key either doesn't exist or is below the allowable rate
        // limit. Increment it by one, and ensure that the key has an expiration
        // time of one minute.
        //
        // Note that the "worst case" for expiration is if the key is
        // incremented the moment before the minute rolls over, meaning it will
        // expire the moment before the next minute rolls over. This gives us
        // the buffer of 58 minutes stated previously.
        redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(&cache_key)
            .ignore()
            .cmd("EXPIRE")
            .arg(&cache_key)
            .arg(59)
            .execute(&mut conn);

        Ok(RateLimitResult::NotLimited)
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn window_key_uses_current_minute() {
        let now = Utc.ymd(2023, 2, 11).and_hms(10, 7, 33);

        assert_eq!("sessions_post_127.0.0.1:07", window_key("sessions_post_127.0.0.1", now));
    }

    #[test]
    fn window_reset_truncates_to_next_whole_minute() {
        let now = Utc.ymd(2023, 2, 11).and_hms(10, 7, 33);

        assert_eq!(Utc.ymd(2023, 2, 11).and_hms(10, 8, 0), window_reset(now));
    }
}
