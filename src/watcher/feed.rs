//! Inbound lifecycle feeds.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::io::{self, ErrorKind, Read};
use std::path::Path;
use std::thread;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};
use tokio_util::io::StreamReader;

use crate::error::FeedError;
use crate::events::LifecycleEvent;

/// Longest accepted event line, in bytes, unless configured otherwise.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

const READ_CHUNK: usize = 8 * 1024;

/// Async side of a blocking reader drained on its own thread.
pub type ThreadReader = StreamReader<ReceiverStream<io::Result<Bytes>>, Bytes>;

/// Source of fleet lifecycle events, delivered one at a time in order.
#[async_trait]
pub trait FleetFeed: Send {
    /// Next event. `Ok(None)` means the feed closed cleanly; `Err` is an
    /// abnormal termination the feed cannot recover from.
    async fn next_event(&mut self) -> Result<Option<LifecycleEvent>, FeedError>;
}

/// In-process feed backed by a tokio mpsc channel.
#[derive(Debug)]
pub struct ChannelFeed {
    rx: mpsc::Receiver<Result<LifecycleEvent, FeedError>>,
}

impl ChannelFeed {
    pub fn new(rx: mpsc::Receiver<Result<LifecycleEvent, FeedError>>) -> Self {
        Self { rx }
    }

    /// Create a bounded feed and the sender that drives it.
    pub fn channel(buffer: usize) -> (mpsc::Sender<Result<LifecycleEvent, FeedError>>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl FleetFeed for ChannelFeed {
    async fn next_event(&mut self) -> Result<Option<LifecycleEvent>, FeedError> {
        self.rx.recv().await.transpose()
    }
}

/// Newline-delimited JSON feed: one `{"kind": ..., "payload": ...}` object per line.
///
/// Blank lines are skipped. A line that does not parse, or that is longer than
/// the configured maximum, is logged and skipped; only read errors end the feed.
pub struct JsonLinesFeed<R> {
    reader: R,
    buffer: BytesMut,
    codec: LinesCodec,
    eof: bool,
    line_number: u64,
}

impl<R: AsyncRead + Unpin + Send> JsonLinesFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            codec: LinesCodec::new_with_max_length(DEFAULT_MAX_LINE_LENGTH),
            eof: false,
            line_number: 0,
        }
    }

    /// Replace the line length bound. Call before the first read.
    pub fn max_line_length(mut self, max_length: usize) -> Self {
        self.codec = LinesCodec::new_with_max_length(max_length);
        self
    }

    async fn next_line(&mut self) -> Result<Option<String>, FeedError> {
        loop {
            let decoded = if self.eof {
                self.codec.decode_eof(&mut self.buffer)
            } else {
                self.codec.decode(&mut self.buffer)
            };

            match decoded {
                Ok(Some(line)) => {
                    self.line_number += 1;
                    return Ok(Some(line));
                }
                Ok(None) if self.eof => return Ok(None),
                Ok(None) => {
                    if self.reader.read_buf(&mut self.buffer).await? == 0 {
                        self.eof = true;
                    }
                }
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    // The codec discards the rest of the line on the following calls.
                    self.line_number += 1;
                    tracing::warn!(
                        line = self.line_number,
                        max_length = self.codec.max_length(),
                        "Skipping oversized fleet event"
                    );
                }
                Err(LinesCodecError::Io(e)) => return Err(e.into()),
            }
        }
    }
}

impl JsonLinesFeed<ThreadReader> {
    /// Feed reading the process's standard input.
    ///
    /// Stdin is drained on a detached thread, so a read blocked on an idle
    /// pipe never holds up runtime shutdown.
    pub fn stdin() -> io::Result<Self> {
        Self::from_blocking_reader("fleet-feed-stdin", io::stdin())
    }

    /// Feed over any blocking reader, drained on a dedicated thread named `name`.
    pub fn from_blocking_reader<T>(name: &str, reader: T) -> io::Result<Self>
    where
        T: Read + Send + 'static,
    {
        let rx = spawn_reader_thread(name, reader)?;
        Ok(Self::new(StreamReader::new(ReceiverStream::new(rx))))
    }
}

impl JsonLinesFeed<File> {
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::open(path.as_ref()).await?;
        Ok(Self::new(file))
    }
}

fn spawn_reader_thread<T>(name: &str, mut reader: T) -> io::Result<mpsc::Receiver<io::Result<Bytes>>>
where
    T: Read + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);

    thread::Builder::new().name(name.to_owned()).spawn(move || {
        let mut chunk = vec![0u8; READ_CHUNK];
        loop {
            let item = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => Ok(Bytes::copy_from_slice(&chunk[..n])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => Err(e),
            };

            let failed = item.is_err();
            // A closed receiver means the feed was dropped.
            if tx.blocking_send(item).is_err() || failed {
                break;
            }
        }
    })?;

    Ok(rx)
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> FleetFeed for JsonLinesFeed<R> {
    async fn next_event(&mut self) -> Result<Option<LifecycleEvent>, FeedError> {
        while let Some(line) = self.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<LifecycleEvent>(line) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => {
                    tracing::warn!(
                        line = self.line_number,
                        error = %e,
                        "Skipping malformed fleet event"
                    );
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventKind, Payload};
    use crate::fleet::Fleet;
    use std::sync::mpsc as std_mpsc;
    use std::time::{Duration, Instant};

    fn added_line(name: &str) -> String {
        let fleet = serde_json::to_string(&Fleet::new(name, "gameserver:latest")).unwrap();
        format!("{{\"kind\":\"added\",\"payload\":{fleet}}}")
    }

    #[tokio::test]
    async fn test_json_lines_feed() {
        let fleet = serde_json::to_string(&Fleet::new("fleet-x", "gameserver:latest")).unwrap();
        let input = format!(
            "{{\"kind\":\"added\",\"payload\":{fleet}}}\n\
             \n\
             not json\n\
             {{\"kind\":\"fleet.events.deleted\",\"payload\":{{\"source\":\"OnDelete\",\"fleet\":{fleet}}}}}"
        );
        let mut feed = JsonLinesFeed::new(input.as_bytes());

        let first = feed.next_event().await.unwrap().unwrap();
        assert_eq!(first.kind, EventKind::Added);
        assert!(matches!(first.payload, Payload::Direct(_)));

        // Last line has no trailing newline.
        let second = feed.next_event().await.unwrap().unwrap();
        assert_eq!(second.kind, EventKind::Deleted);
        assert!(matches!(second.payload, Payload::Wrapped(_)));

        assert!(feed.next_event().await.unwrap().is_none());
        assert_eq!(feed.line_number, 4);
    }

    #[tokio::test]
    async fn test_oversized_line_is_skipped() {
        let input = format!(
            "{}\n{}\n{}\n",
            added_line("before"),
            "x".repeat(4096),
            added_line("after")
        );
        let mut feed = JsonLinesFeed::new(input.as_bytes()).max_line_length(1024);

        let first = feed.next_event().await.unwrap().unwrap();
        let second = feed.next_event().await.unwrap().unwrap();
        assert!(feed.next_event().await.unwrap().is_none());

        let names: Vec<_> = [first, second]
            .iter()
            .map(|event| crate::events::unwrap_fleet(&event.payload).unwrap().name().to_owned())
            .collect();
        assert_eq!(names, vec!["before", "after"]);
        assert_eq!(feed.line_number, 3);
    }

    #[tokio::test]
    async fn test_blocking_reader_feed() {
        let input = format!("{}\n{}\n", added_line("a"), added_line("b"));
        let mut feed =
            JsonLinesFeed::from_blocking_reader("feed-test", io::Cursor::new(input.into_bytes()))
                .unwrap();

        assert!(feed.next_event().await.unwrap().is_some());
        assert!(feed.next_event().await.unwrap().is_some());
        assert!(feed.next_event().await.unwrap().is_none());
    }

    /// Reader that blocks until its sender is dropped, like an idle pipe.
    struct IdlePipe(std_mpsc::Receiver<Vec<u8>>);

    impl Read for IdlePipe {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.recv() {
                Ok(bytes) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                Err(_) => Ok(0),
            }
        }
    }

    #[test]
    fn test_idle_reader_does_not_block_runtime_shutdown() {
        let (_writer, pipe) = std_mpsc::channel::<Vec<u8>>();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let mut feed = JsonLinesFeed::from_blocking_reader("idle-pipe", IdlePipe(pipe)).unwrap();
            tokio::select! {
                _ = feed.next_event() => panic!("idle pipe produced an event"),
                _ = tokio::time::sleep(Duration::from_millis(50)) => {}
            }
        });

        let started = Instant::now();
        drop(runtime);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_channel_feed_surfaces_errors() {
        let (tx, mut feed) = ChannelFeed::channel(4);
        tx.send(Err(FeedError::Disconnected("watch expired".to_owned())))
            .await
            .unwrap();
        drop(tx);

        assert!(matches!(
            feed.next_event().await,
            Err(FeedError::Disconnected(_))
        ));
        assert!(feed.next_event().await.unwrap().is_none());
    }
}
