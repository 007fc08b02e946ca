//! # Striped Stream Transcoder
//!
//! Turns an encrypted striped byte stream into plaintext on the fly.
//!
//! ```text
//!  source ─▶ [ buffer ] ─▶ chunk 0 ─▶ decrypt ─┐
//!                          chunk 1 ───────────┤
//!                          chunk 2 ───────────┤─▶ output
//!                          chunk 3 ─▶ decrypt ─┤
//!                          ...                 │
//!                          tail    ───────────┘
//! ```
//!
//! The output is pull driven: the source is only read when the consumer
//! polls for more, so back-pressure flows straight through and dropping the
//! output stops all further reads.

use std::pin::Pin;
use std::sync::Arc;

use bridge_traits::http::ByteStream;
use bytes::{Bytes, BytesMut};
use core_crypto::ChunkCipher;
use core_runtime::config::StripeLayout;
use futures::stream::{self, Stream, StreamExt};
use tokio_util::io::StreamReader;
use tracing::{debug, trace, warn};

use crate::error::{Result, StreamError};

/// Plaintext output of a transcoded stream. Items are whole chunks except
/// for the final tail.
pub type DecryptedStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// `AsyncRead` view of a [`DecryptedStream`].
pub type DecryptedReader = StreamReader<DecryptedStream, Bytes>;

/// Decrypts every `period`-th chunk of a striped stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripedStreamTranscoder {
    layout: StripeLayout,
}

impl StripedStreamTranscoder {
    pub fn new(layout: StripeLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> StripeLayout {
        self.layout
    }

    /// Wrap `source` so that it yields plaintext.
    ///
    /// Chunk `n` goes through `cipher` iff `n % period == 0`; other chunks and
    /// the trailing partial chunk are forwarded untouched. The first error
    /// (from the source or the cipher) is yielded once and ends the stream.
    pub fn transcode(&self, source: ByteStream, cipher: Arc<dyn ChunkCipher>) -> DecryptedStream {
        debug!(
            chunk_size = self.layout.chunk_size,
            period = self.layout.period,
            backend = %cipher.backend(),
            "Starting striped transcode"
        );

        let state = TranscodeState {
            source,
            cipher,
            layout: self.layout,
            buffer: BytesMut::with_capacity(self.layout.chunk_size * 2),
            chunk_index: 0,
            source_done: false,
            finished: false,
        };

        Box::pin(stream::unfold(state, |mut state| async move {
            let item = state.next_item().await?;
            Some((item, state))
        }))
    }
}

/// Adapt a decrypted stream into a `tokio::io::AsyncRead`.
///
/// Stream errors surface as `io::Error`s (`InvalidData` for decryption
/// failures).
pub fn into_async_read(stream: DecryptedStream) -> DecryptedReader {
    StreamReader::new(stream)
}

struct TranscodeState {
    source: ByteStream,
    cipher: Arc<dyn ChunkCipher>,
    layout: StripeLayout,
    buffer: BytesMut,
    chunk_index: u64,
    source_done: bool,
    finished: bool,
}

impl TranscodeState {
    async fn next_item(&mut self) -> Option<Result<Bytes>> {
        loop {
            if self.finished {
                return None;
            }

            if self.buffer.len() >= self.layout.chunk_size {
                let chunk = self.buffer.split_to(self.layout.chunk_size).freeze();
                return Some(self.process_chunk(chunk).await);
            }

            if self.source_done {
                self.finished = true;
                debug!(chunks = self.chunk_index, tail = self.buffer.len(), "Source exhausted");
                if self.buffer.is_empty() {
                    return None;
                }
                return Some(Ok(self.buffer.split().freeze()));
            }

            match self.source.next().await {
                Some(Ok(bytes)) => {
                    trace!(len = bytes.len(), buffered = self.buffer.len(), "Source read");
                    self.buffer.extend_from_slice(&bytes);
                }
                Some(Err(e)) => {
                    warn!(error = %e, chunk_index = self.chunk_index, "Source stream failed");
                    self.finished = true;
                    return Some(Err(StreamError::SourceFailed(e.to_string())));
                }
                None => self.source_done = true,
            }
        }
    }

    async fn process_chunk(&mut self, chunk: Bytes) -> Result<Bytes> {
        let index = self.chunk_index;
        self.chunk_index += 1;

        if !self.layout.is_encrypted(index) {
            return Ok(chunk);
        }

        match self.cipher.decrypt_chunk(chunk).await {
            Ok(plaintext) => Ok(plaintext),
            Err(source) => {
                warn!(chunk_index = index, error = %source, "Chunk decryption failed");
                self.finished = true;
                Err(StreamError::DecryptionFailed {
                    chunk_index: index,
                    source,
                })
            }
        }
    }
}
