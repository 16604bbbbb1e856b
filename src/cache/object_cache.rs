//! Content-addressed on-disk cache for remote resources.
//!
//! Every fetched resource is stored as one file in the cache directory, named by
//! the percent-encoded source URI. The presence of that file means "already
//! fetched": it is served from disk and no network call is made.
//!
//! # Concurrency
//!
//! Requests for the same key are de-duplicated. The first requester claims the
//! key in the in-flight table and downloads; concurrent requesters wait until
//! that download has been persisted, then read from disk. A failed or abandoned
//! download releases the claim and waiters retry on their own.
//!
//! Bodies are written to `<key>%.part` and renamed into place once complete, so a
//! partially written file is never mistaken for a cache entry. A percent-encoded
//! key never contains `%` followed by `.`, so no URI maps to that name.

use crate::core::QueryContext;
use crate::error::{Error, Result};
use crate::services::{ByteStream, HttpFetcher};
use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{ready, Context, Poll};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// Key -> completion signal of the download currently running for it.
type InFlight = Arc<Mutex<HashMap<String, watch::Receiver<Option<bool>>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Suffix of in-progress downloads.
const PART_SUFFIX: &str = "%.part";

/// File name under which `uri` is cached.
pub fn cache_key(uri: &str) -> String {
    urlencoding::encode(uri).into_owned()
}

/// Process-wide object cache, shared by all concurrent queries.
pub struct ObjectCache {
    dir: PathBuf,
    fetcher: Arc<dyn HttpFetcher>,
    in_flight: InFlight,
}

enum Claim {
    Cached(PathBuf),
    Wait(watch::Receiver<Option<bool>>),
    Fetch(FetchGuard),
}

/// Exclusive right to download one key.
///
/// Dropping the guard releases the claim and wakes all waiters, reporting
/// success only when [`FetchGuard::complete`] was called.
struct FetchGuard {
    key: String,
    path: PathBuf,
    in_flight: InFlight,
    done: watch::Sender<Option<bool>>,
    succeeded: bool,
}

impl FetchGuard {
    fn part_path(&self) -> PathBuf {
        self.path.with_file_name(format!("{}{}", self.key, PART_SUFFIX))
    }

    fn complete(mut self) {
        self.succeeded = true;
    }
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.key);
        self.done.send_replace(Some(self.succeeded));
    }
}

impl ObjectCache {
    /// Opens (and creates if needed) a cache directory.
    pub fn new(dir: impl Into<PathBuf>, fetcher: Arc<dyn HttpFetcher>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, fetcher, in_flight: Arc::new(Mutex::new(HashMap::new())) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the cache entry for `uri`, whether or not it exists yet.
    pub fn local_path(&self, uri: &str) -> PathBuf {
        self.dir.join(cache_key(uri))
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.local_path(uri).exists()
    }

    fn claim(&self, uri: &str) -> Claim {
        let key = cache_key(uri);
        let path = self.dir.join(&key);

        let mut in_flight = lock(&self.in_flight);
        if let Some(receiver) = in_flight.get(&key) {
            return Claim::Wait(receiver.clone());
        }
        if path.exists() {
            return Claim::Cached(path);
        }

        let (sender, receiver) = watch::channel(None);
        in_flight.insert(key.clone(), receiver);
        Claim::Fetch(FetchGuard {
            key,
            path,
            in_flight: Arc::clone(&self.in_flight),
            done: sender,
            succeeded: false,
        })
    }

    async fn wait_for(uri: &str, mut receiver: watch::Receiver<Option<bool>>) {
        debug!("Waiting for concurrent download of {}", uri);
        // Either outcome leads to a new claim: a cache hit or our own download.
        let _ = receiver.wait_for(Option::is_some).await;
    }

    /// Returns the local file holding `uri`, downloading it first if needed.
    pub async fn fetch_location(&self, uri: &str, context: &QueryContext) -> Result<PathBuf> {
        loop {
            match self.claim(uri) {
                Claim::Cached(path) => {
                    debug!("Cache hit for {}", uri);
                    return Ok(path);
                }
                Claim::Wait(receiver) => Self::wait_for(uri, receiver).await,
                Claim::Fetch(guard) => {
                    debug!("Cache miss for {}, fetching", uri);
                    let body = self.fetcher.fetch(uri, context).await?;
                    write_body(uri, body, &guard.part_path(), &guard.path).await?;
                    let path = guard.path.clone();
                    guard.complete();
                    return Ok(path);
                }
            }
        }
    }

    /// Returns the body of `uri`, from disk if cached.
    ///
    /// On a miss the network stream is tee'd: the caller reads the chunks as they
    /// arrive while a background task persists the same chunks. The entry only
    /// becomes visible once the caller has read the body to its end.
    pub async fn fetch_stream(&self, uri: &str, context: &QueryContext) -> Result<ByteStream> {
        loop {
            match self.claim(uri) {
                Claim::Cached(path) => {
                    debug!("Cache hit for {}", uri);
                    // Cached entries are read in one go; large partition files go
                    // through fetch_location instead.
                    let bytes = tokio::fs::read(&path).await?;
                    let body = stream::once(async move {
                        Ok::<_, std::io::Error>(Bytes::from(bytes))
                    });
                    return Ok(body.boxed());
                }
                Claim::Wait(receiver) => Self::wait_for(uri, receiver).await,
                Claim::Fetch(guard) => {
                    debug!("Cache miss for {}, fetching", uri);
                    let body = self.fetcher.fetch(uri, context).await?;
                    let (sink, chunks) = mpsc::unbounded_channel();
                    tokio::spawn(persist(uri.to_string(), chunks, guard));
                    return Ok(TeeStream { inner: body, sink: Some(sink) }.boxed());
                }
            }
        }
    }

    /// Reads the full body of `uri` into memory through [`ObjectCache::fetch_stream`].
    pub async fn fetch_bytes(&self, uri: &str, context: &QueryContext) -> Result<Vec<u8>> {
        let mut body = self.fetch_stream(uri, context).await?;
        let mut buffer = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk =
                chunk.map_err(|e| Error::Fetch { uri: uri.to_string(), reason: e.to_string() })?;
            buffer.extend_from_slice(&chunk);
        }
        Ok(buffer)
    }
}

impl fmt::Debug for ObjectCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCache").field("dir", &self.dir).finish_non_exhaustive()
    }
}

async fn write_body(uri: &str, mut body: ByteStream, part: &Path, path: &Path) -> Result<()> {
    let result = async {
        let mut file = tokio::fs::File::create(part).await?;
        while let Some(chunk) = body.next().await {
            let chunk =
                chunk.map_err(|e| Error::Fetch { uri: uri.to_string(), reason: e.to_string() })?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);
        tokio::fs::rename(part, path).await?;
        Ok::<(), Error>(())
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(part).await;
    }
    result
}

enum TeeChunk {
    Data(Bytes),
    End,
}

/// Forwards a body stream to the caller while mirroring it into a channel.
struct TeeStream {
    inner: ByteStream,
    sink: Option<mpsc::UnboundedSender<TeeChunk>>,
}

impl Stream for TeeStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let item = ready!(self.inner.poll_next_unpin(cx));
        match &item {
            Some(Ok(bytes)) => {
                let closed = self
                    .sink
                    .as_ref()
                    .is_some_and(|sink| sink.send(TeeChunk::Data(bytes.clone())).is_err());
                if closed {
                    self.sink = None;
                }
            }
            // A broken body must not end up in the cache.
            Some(Err(_)) => self.sink = None,
            None => {
                if let Some(sink) = self.sink.take() {
                    let _ = sink.send(TeeChunk::End);
                }
            }
        }
        Poll::Ready(item)
    }
}

async fn persist(uri: String, mut chunks: mpsc::UnboundedReceiver<TeeChunk>, guard: FetchGuard) {
    let part = guard.part_path();
    match write_chunks(&mut chunks, &part, &guard.path).await {
        Ok(true) => {
            debug!("Cached {} at {}", uri, guard.path.display());
            guard.complete();
        }
        Ok(false) => {
            debug!("Body of {} was not read to the end, not caching it", uri);
            let _ = tokio::fs::remove_file(&part).await;
        }
        Err(e) => {
            warn!("Failed to cache {}: {}", uri, e);
            let _ = tokio::fs::remove_file(&part).await;
        }
    }
}

async fn write_chunks(
    chunks: &mut mpsc::UnboundedReceiver<TeeChunk>,
    part: &Path,
    path: &Path,
) -> std::io::Result<bool> {
    let mut file = tokio::fs::File::create(part).await?;
    while let Some(chunk) = chunks.recv().await {
        match chunk {
            TeeChunk::Data(bytes) => file.write_all(&bytes).await?,
            TeeChunk::End => {
                file.flush().await?;
                drop(file);
                tokio::fs::rename(part, path).await?;
                return Ok(true);
            }
        }
    }
    Ok(false)
}
