use crossbeam_utils::{Backoff, CachePadded};
use http::{HeaderMap, StatusCode};
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A finished response, borrowed from the slot that produced it.
#[derive(Debug, Clone, Copy)]
pub struct Response<'a> {
    pub status: StatusCode,
    pub headers: &'a HeaderMap,
    pub body: &'a [u8],
    /// The transport should frame `body` with chunked transfer encoding
    pub chunked: bool,
}

/// Transport side of a connection: receives responses in request order.
///
/// Called from serialization worker threads. For one connection the calls
/// never overlap and arrive in the order the requests were published.
pub trait ResponseWriter: Send + Sync {
    /// # Errors
    ///
    /// Any I/O error is logged and counted by the pipeline; the connection's
    /// later responses are still delivered.
    fn write_response(&self, connection: u64, response: &Response<'_>) -> io::Result<()>;
}

/// Turn-taking state shared by every request of one connection.
#[derive(Debug, Default)]
struct ChannelOrdering {
    /// Next ordinal handed out by the producer
    next_ordinal: AtomicU64,
    /// Ordinal whose response may be written now
    next_to_flush: CachePadded<AtomicU64>,
}

/// Per-connection output handle carried through the pipeline.
///
/// Cloning is cheap and clones share the ordering state, so the transport
/// keeps one per connection and passes it with every request.
#[derive(Clone)]
pub struct OutputChannel {
    id: u64,
    writer: Arc<dyn ResponseWriter>,
    ordering: Arc<ChannelOrdering>,
}

impl OutputChannel {
    pub fn new(id: u64, writer: Arc<dyn ResponseWriter>) -> Self {
        Self {
            id,
            writer,
            ordering: Arc::new(ChannelOrdering::default()),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Responses written so far on this channel.
    #[must_use]
    pub fn flushed(&self) -> u64 {
        self.ordering.next_to_flush.load(Ordering::Acquire)
    }

    /// Only the producer thread assigns ordinals.
    pub(crate) fn assign_ordinal(&self) -> u64 {
        self.ordering.next_ordinal.fetch_add(1, Ordering::Relaxed)
    }

    /// Wait until `ordinal` is next to be written on this channel.
    ///
    /// The returned turn passes to `ordinal + 1` when dropped, including
    /// during a panic, so one failed write never blocks the connection.
    pub(crate) fn take_turn(&self, ordinal: u64) -> FlushTurn<'_> {
        let backoff = Backoff::new();
        while self.ordering.next_to_flush.load(Ordering::Acquire) != ordinal {
            backoff.snooze();
        }
        FlushTurn {
            channel: self,
            ordinal,
        }
    }
}

impl fmt::Debug for OutputChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputChannel")
            .field("id", &self.id)
            .field("ordering", &self.ordering)
            .finish_non_exhaustive()
    }
}

/// Exclusive right to write the next response of a channel.
pub(crate) struct FlushTurn<'a> {
    channel: &'a OutputChannel,
    ordinal: u64,
}

impl FlushTurn<'_> {
    pub(crate) fn write(&self, response: &Response<'_>) -> io::Result<()> {
        self.channel
            .writer
            .write_response(self.channel.id, response)
    }
}

impl Drop for FlushTurn<'_> {
    fn drop(&mut self) {
        self.channel
            .ordering
            .next_to_flush
            .store(self.ordinal + 1, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        written: Mutex<Vec<(u64, Vec<u8>)>>,
    }

    impl ResponseWriter for Recorder {
        fn write_response(&self, connection: u64, response: &Response<'_>) -> io::Result<()> {
            self.written.lock().push((connection, response.body.to_vec()));
            Ok(())
        }
    }

    #[test]
    fn test_turns_follow_ordinals() {
        let recorder = Arc::new(Recorder::default());
        let channel = OutputChannel::new(3, Arc::clone(&recorder) as Arc<dyn ResponseWriter>);
        assert_eq!(channel.assign_ordinal(), 0);
        assert_eq!(channel.assign_ordinal(), 1);

        let late = channel.clone();
        let headers = HeaderMap::new();
        let writer = std::thread::spawn(move || {
            let turn = late.take_turn(1);
            let response = Response {
                status: StatusCode::OK,
                headers: &HeaderMap::new(),
                body: b"second",
                chunked: false,
            };
            turn.write(&response).unwrap();
        });

        std::thread::sleep(std::time::Duration::from_millis(10));
        {
            let turn = channel.take_turn(0);
            let response = Response {
                status: StatusCode::OK,
                headers: &headers,
                body: b"first",
                chunked: false,
            };
            turn.write(&response).unwrap();
        }
        writer.join().unwrap();

        assert_eq!(channel.flushed(), 2);
        let written = recorder.written.lock();
        assert_eq!(written[0], (3, b"first".to_vec()));
        assert_eq!(written[1], (3, b"second".to_vec()));
    }

    #[test]
    fn test_turn_passes_on_panic() {
        struct Exploding;
        impl ResponseWriter for Exploding {
            fn write_response(&self, _: u64, _: &Response<'_>) -> io::Result<()> {
                panic!("socket on fire");
            }
        }

        let channel = OutputChannel::new(1, Arc::new(Exploding));
        let ordinal = channel.assign_ordinal();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let turn = channel.take_turn(ordinal);
            let headers = HeaderMap::new();
            let _written = turn.write(&Response {
                status: StatusCode::OK,
                headers: &headers,
                body: b"",
                chunked: false,
            });
        }));
        assert!(outcome.is_err());
        assert_eq!(channel.flushed(), 1);
    }
}
