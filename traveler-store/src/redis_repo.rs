use redis::RedisResult;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Fixed-window counter. `true` while the key is within `limit` hits for the window.
    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .add_command(window_expiry(key, window_seconds))
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(within_limit(count, limit))
    }
}

/// `EXPIRE ... NX` starts the window on the first hit only; later hits leave the TTL alone.
fn window_expiry(key: &str, window_seconds: i64) -> redis::Cmd {
    let mut cmd = redis::cmd("EXPIRE");
    cmd.arg(key).arg(window_seconds).arg("NX");
    cmd
}

fn within_limit(count: i64, limit: i64) -> bool {
    count <= limit
}

pub fn rate_limit_key(ip: &str) -> String {
    format!("ratelimit:{}", ip)
}
