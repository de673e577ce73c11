#![allow(dead_code)]

pub mod recording {
    use http::{HeaderMap, StatusCode};
    use parking_lot::Mutex;
    use serde_json::Value;
    use smack::pipeline::{Response, ResponseWriter};
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Arc;

    /// Owned copy of one written response
    #[derive(Debug, Clone)]
    pub struct Recorded {
        pub connection: u64,
        pub status: StatusCode,
        pub headers: HeaderMap,
        pub body: Vec<u8>,
        pub chunked: bool,
    }

    impl Recorded {
        pub fn json(&self) -> Value {
            serde_json::from_slice(&self.body).unwrap()
        }

        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(name).and_then(|v| v.to_str().ok())
        }
    }

    /// Keeps every response it is given
    #[derive(Default)]
    pub struct RecordingWriter {
        responses: Mutex<Vec<Recorded>>,
        fail_writes: AtomicBool,
    }

    impl RecordingWriter {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn responses(&self) -> Vec<Recorded> {
            self.responses.lock().clone()
        }

        pub fn for_connection(&self, connection: u64) -> Vec<Recorded> {
            self.responses
                .lock()
                .iter()
                .filter(|r| r.connection == connection)
                .cloned()
                .collect()
        }

        pub fn len(&self) -> usize {
            self.responses.lock().len()
        }

        /// Make every later write fail with `BrokenPipe`
        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::Release);
        }
    }

    impl ResponseWriter for RecordingWriter {
        fn write_response(&self, connection: u64, response: &Response<'_>) -> io::Result<()> {
            if self.fail_writes.load(Ordering::Acquire) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"));
            }
            self.responses.lock().push(Recorded {
                connection,
                status: response.status,
                headers: response.headers.clone(),
                body: response.body.to_vec(),
                chunked: response.chunked,
            });
            Ok(())
        }
    }

    /// Counts responses without keeping them, for high-volume runs
    #[derive(Default)]
    pub struct CountingWriter {
        pub ok: AtomicU64,
        pub not_ok: AtomicU64,
    }

    impl CountingWriter {
        pub fn total(&self) -> u64 {
            self.ok.load(Ordering::Relaxed) + self.not_ok.load(Ordering::Relaxed)
        }
    }

    impl ResponseWriter for CountingWriter {
        fn write_response(&self, _connection: u64, response: &Response<'_>) -> io::Result<()> {
            if response.status.is_success() {
                self.ok.fetch_add(1, Ordering::Relaxed);
            } else {
                self.not_ok.fetch_add(1, Ordering::Relaxed);
            }
            Ok(())
        }
    }
}

pub mod wait {
    use std::time::{Duration, Instant};

    /// Poll `condition` until it holds or `timeout` elapses
    pub fn until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        condition()
    }
}
