use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{FromRedisValue, IntoConnectionInfo, Pipeline};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::RemoteSettings;
use crate::error::RemoteFailure;
use crate::queue_sink::RemoteList;

/// Redis-backed [`RemoteList`].
///
/// Holds at most one multiplexed connection. Every round trip is bounded by
/// `timeout`. With `reconnect` enabled a missing connection is re-established
/// lazily on the next operation, and a connection-level failure drops the
/// current connection so the following push starts fresh.
pub struct RedisList {
    client: redis::Client,
    conn: Option<MultiplexedConnection>,
    timeout: Duration,
    reconnect: bool,
}

impl RedisList {
    /// Builds a client for `settings` without connecting.
    pub fn open(settings: &RemoteSettings) -> Result<Self, RemoteFailure> {
        let mut info = (settings.host.as_str(), settings.port).into_connection_info()?;
        info.redis.password = settings.auth.clone();
        Ok(Self {
            client: redis::Client::open(info)?,
            conn: None,
            timeout: settings.timeout(),
            reconnect: settings.reconnect,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub async fn connect(&mut self) -> Result<(), RemoteFailure> {
        let conn = tokio::time::timeout(
            self.timeout,
            self.client.get_multiplexed_async_connection(),
        )
        .await
        .map_err(|_| RemoteFailure::Timeout(self.timeout))??;
        info!("Connected to remote store");
        self.conn = Some(conn);
        Ok(())
    }

    pub async fn ping(&mut self) -> Result<(), RemoteFailure> {
        let mut pipe = redis::pipe();
        pipe.cmd("PING");
        self.query::<redis::Value>(&pipe).await.map(|_| ())
    }

    async fn connection(&mut self) -> Result<&mut MultiplexedConnection, RemoteFailure> {
        if self.conn.is_none() {
            if !self.reconnect {
                return Err(RemoteFailure::NotConnected);
            }
            debug!("Reconnecting to remote store");
            self.connect().await?;
        }
        self.conn.as_mut().ok_or(RemoteFailure::NotConnected)
    }

    async fn query<T: FromRedisValue>(&mut self, pipe: &Pipeline) -> Result<T, RemoteFailure> {
        let timeout = self.timeout;
        let conn = self.connection().await?;
        let result: Result<T, RemoteFailure> =
            match tokio::time::timeout(timeout, pipe.query_async(conn)).await {
                Ok(reply) => reply.map_err(RemoteFailure::from),
                Err(_) => Err(RemoteFailure::Timeout(timeout)),
            };
        if let Err(e) = &result {
            if self.reconnect && e.is_connection_lost() {
                self.conn = None;
            }
        }
        result
    }
}

/// Redis LTRIM stop index that keeps `max_items` entries from the head.
fn trim_stop(max_items: usize) -> isize {
    isize::try_from(max_items.max(1)).unwrap_or(isize::MAX) - 1
}

/// MULTI, LPUSH, LTRIM, EXEC: the record lands at the head and the list is
/// cut back to `max_items` in the same transaction.
fn bounded_push_pipeline(key: &str, record: &str, max_items: usize) -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .lpush(key, record)
        .ignore()
        .ltrim(key, 0, trim_stop(max_items))
        .ignore();
    pipe
}

#[async_trait]
impl RemoteList for RedisList {
    async fn push_front(&mut self, key: &str, record: &str) -> Result<(), RemoteFailure> {
        let mut pipe = redis::pipe();
        pipe.lpush(key, record).ignore();
        self.query::<()>(&pipe).await
    }

    async fn trim(&mut self, key: &str, max_items: usize) -> Result<(), RemoteFailure> {
        let mut pipe = redis::pipe();
        pipe.ltrim(key, 0, trim_stop(max_items)).ignore();
        self.query::<()>(&pipe).await
    }

    /// LPUSH and LTRIM inside one MULTI/EXEC so the list is never left
    /// untrimmed by a failure between the two.
    async fn push_bounded(
        &mut self,
        key: &str,
        record: &str,
        max_items: usize,
    ) -> Result<(), RemoteFailure> {
        let pipe = bounded_push_pipeline(key, record, max_items);
        self.query::<()>(&pipe).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(reconnect: bool) -> RemoteSettings {
        RemoteSettings {
            // Port 1 is never a redis server; connecting is refused at once.
            host: "127.0.0.1".to_string(),
            port: 1,
            auth: Some("secret".to_string()),
            key: "playlogd".to_string(),
            timeout_secs: 2,
            reconnect,
        }
    }

    #[test]
    fn trim_stop_keeps_max_items() {
        assert_eq!(trim_stop(8000), 7999);
        assert_eq!(trim_stop(3), 2);
        assert_eq!(trim_stop(0), 0);
    }

    /// Byte offset of a RESP bulk string `word` in `packed`.
    fn position_of(packed: &[u8], word: &str) -> usize {
        let needle = format!("${}\r\n{}\r\n", word.len(), word);
        packed
            .windows(needle.len())
            .position(|w| w == needle.as_bytes())
            .unwrap_or_else(|| panic!("{word} not in pipeline"))
    }

    #[test]
    fn bounded_push_is_one_transaction() {
        let pipe = bounded_push_pipeline("played", "{\"path\":\"/a.mp3\"}", 3);
        let packed = pipe.get_packed_pipeline();

        let multi = position_of(&packed, "MULTI");
        let lpush = position_of(&packed, "LPUSH");
        let record = position_of(&packed, "{\"path\":\"/a.mp3\"}");
        let ltrim = position_of(&packed, "LTRIM");
        let exec = position_of(&packed, "EXEC");
        assert!(multi < lpush && lpush < record && record < ltrim && ltrim < exec);

        // LTRIM played 0 2 keeps the three newest entries.
        let trim_args = b"$5\r\nLTRIM\r\n$6\r\nplayed\r\n$1\r\n0\r\n$1\r\n2\r\n";
        assert!(packed.windows(trim_args.len()).any(|w| w == trim_args));
    }

    #[test]
    fn open_does_not_connect() {
        let list = RedisList::open(&settings(true)).unwrap();
        assert!(!list.is_connected());
    }

    #[tokio::test]
    async fn push_without_connection_and_no_reconnect_fails_fast() {
        let mut list = RedisList::open(&settings(false)).unwrap();
        let err = list.push_bounded("k", "{}", 10).await.unwrap_err();
        assert!(matches!(err, RemoteFailure::NotConnected));
    }

    #[tokio::test]
    async fn unreachable_store_is_remote_failure() {
        let mut list = RedisList::open(&settings(true)).unwrap();
        assert!(list.connect().await.is_err());
        let err = list.push_bounded("k", "{}", 10).await.unwrap_err();
        assert!(err.is_connection_lost());
        assert!(!list.is_connected());
    }
}
