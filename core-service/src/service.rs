use std::fmt;
use std::sync::Arc;

use bridge_traits::http::HttpClient;
use core_crypto::{
    derive_track_key, select_cipher, CipherBackend, CipherFactory, MasterSecret, STRIPE_IV,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, StreamEvent};
use core_session::{CredentialSource, SessionError, SessionManager, SessionSettings, SessionState};
use core_stream::{into_async_read, DecryptedReader, DecryptedStream, StripedStreamTranscoder};
use futures::stream::{self, StreamExt};
use provider_deezer::{GatewayCredentialSource, StreamResolver, TrackId, TrackInfo};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::error::{CoreError, Result};

/// A decrypted track ready for consumption.
pub struct TrackStream {
    pub info: TrackInfo,
    /// Wire name of the format served, e.g. `FLAC`.
    pub format: String,
    pub backend: CipherBackend,
    /// Plaintext audio bytes in source order.
    pub stream: DecryptedStream,
}

impl TrackStream {
    /// `AsyncRead` view of the plaintext.
    pub fn into_async_read(self) -> DecryptedReader {
        into_async_read(self.stream)
    }
}

impl fmt::Debug for TrackStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackStream")
            .field("info", &self.info)
            .field("format", &self.format)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

/// Primary façade exposed to host applications.
///
/// Owns the session lifecycle and runs the whole pipeline for a track:
/// resolve the media URL, open the download, derive the key and decrypt.
pub struct CoreService {
    config: CoreConfig,
    master_secret: Option<MasterSecret>,
    session: SessionManager,
    resolver: StreamResolver,
    transcoder: StripedStreamTranscoder,
    cipher_factory: Option<CipherFactory>,
    event_bus: EventBus,
}

impl CoreService {
    /// Build a service that talks to the Deezer gateway for session credentials.
    pub fn new(config: CoreConfig) -> Result<Self> {
        let source = Arc::new(GatewayCredentialSource::from_config(&config));
        Self::with_credential_source(config, source)
    }

    /// Build a service around a custom credential source.
    ///
    /// # Errors
    ///
    /// `Config` if the configuration is invalid, `Crypto` if the master
    /// secret is not 16 bytes.
    pub fn with_credential_source(
        config: CoreConfig,
        source: Arc<dyn CredentialSource>,
    ) -> Result<Self> {
        config.validate()?;

        let master_secret = config
            .decryption_key
            .as_deref()
            .map(MasterSecret::try_from)
            .transpose()?;

        let event_bus = EventBus::default();
        let session = SessionManager::new(
            source,
            SessionSettings::from(&config),
            event_bus.clone(),
        );

        Ok(Self {
            resolver: StreamResolver::from_config(&config),
            transcoder: StripedStreamTranscoder::new(config.stripe_layout),
            cipher_factory: None,
            master_secret,
            session,
            event_bus,
            config,
        })
    }

    /// Decrypt with ciphers built by `factory` instead of the configured
    /// [`CipherPreference`](core_runtime::config::CipherPreference).
    pub fn with_cipher_factory(mut self, factory: CipherFactory) -> Self {
        self.cipher_factory = Some(factory);
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn can_decrypt(&self) -> bool {
        self.master_secret.is_some()
    }

    /// Starts the session lifecycle.
    ///
    /// Without a master secret no stream can be decrypted, so the session is
    /// not fetched and only a warning is logged.
    #[instrument(skip(self))]
    pub async fn activate(&self) -> Result<()> {
        if self.master_secret.is_none() {
            warn!("Decryption Key missing! This is needed for extracting streams.");
            return Ok(());
        }

        self.session.activate().await?;
        info!("Core service activated");
        Ok(())
    }

    pub async fn deactivate(&self) {
        self.session.deactivate().await;
    }

    /// Resolves, downloads and decrypts the track named by `query`.
    ///
    /// `query` is a numeric track id or a track URL. The returned stream is
    /// independent of later session refreshes.
    ///
    /// # Errors
    ///
    /// - `DecryptionKeyMissing` without a master secret
    /// - `Provider(InvalidTrackId)` for anything that is not a track
    /// - `Session(NotActive | Deactivated)` outside an active session
    /// - `Provider(TrackInfoUnavailable | MediaUrlUnavailable)` from resolution
    /// - `SourceUnavailable` if the download cannot be opened
    #[instrument(skip(self))]
    pub async fn stream_track(&self, query: &str) -> Result<TrackStream> {
        let secret = self
            .master_secret
            .as_ref()
            .ok_or(CoreError::DecryptionKeyMissing)?;

        let track = TrackId::parse(query)?;

        if self.session.state() == SessionState::Deactivated {
            return Err(SessionError::Deactivated.into());
        }
        let credentials = self.session.current()?;

        let resolved = self.resolver.resolve(&track, &credentials).await?;
        self.emit(StreamEvent::Resolved {
            track_id: track.to_string(),
            format: resolved.format.clone(),
        });

        let key = derive_track_key(track.as_str(), secret)?;
        let cipher = match &self.cipher_factory {
            Some(factory) => factory(key, STRIPE_IV)?,
            None => select_cipher(key, STRIPE_IV, self.config.cipher_preference)?,
        };
        let backend = cipher.backend();

        let source = self.open_source(&resolved.media_url).await?;
        let stream = self.transcoder.transcode(source, cipher);

        info!(track_id = %track, format = %resolved.format, backend = %backend, "Streaming track");
        self.emit(StreamEvent::Started {
            track_id: track.to_string(),
            backend: backend.to_string(),
        });

        Ok(TrackStream {
            info: resolved.info,
            format: resolved.format,
            backend,
            stream: observe(
                stream,
                track.to_string(),
                self.config.stripe_layout.chunk_size,
                self.event_bus.clone(),
            ),
        })
    }

    async fn open_source(&self, url: &str) -> Result<bridge_traits::http::ByteStream> {
        let http_client: &dyn HttpClient = self.config.http_client.as_ref();
        let limit = self.config.request_timeout;

        match timeout(limit, http_client.download_stream(url.to_string())).await {
            Ok(Ok(source)) => Ok(source),
            Ok(Err(e)) => Err(CoreError::SourceUnavailable(e.to_string())),
            Err(_) => Err(CoreError::SourceUnavailable(format!(
                "download did not start within {:?}",
                limit
            ))),
        }
    }

    fn emit(&self, event: StreamEvent) {
        let _ = self.event_bus.emit(CoreEvent::Stream(event));
    }
}

impl fmt::Debug for CoreService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreService")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("transcoder", &self.transcoder)
            .field("custom_cipher", &self.cipher_factory.is_some())
            .finish_non_exhaustive()
    }
}

struct Progress {
    inner: DecryptedStream,
    track_id: String,
    chunk_size: usize,
    event_bus: EventBus,
    bytes: u64,
    done: bool,
}

/// Reports completion or failure of `stream` on the event bus.
fn observe(
    stream: DecryptedStream,
    track_id: String,
    chunk_size: usize,
    event_bus: EventBus,
) -> DecryptedStream {
    let progress = Progress {
        inner: stream,
        track_id,
        chunk_size,
        event_bus,
        bytes: 0,
        done: false,
    };

    Box::pin(stream::unfold(progress, |mut progress| async move {
        if progress.done {
            return None;
        }

        match progress.inner.next().await {
            Some(Ok(bytes)) => {
                progress.bytes += bytes.len() as u64;
                Some((Ok(bytes), progress))
            }
            Some(Err(e)) => {
                warn!(track_id = %progress.track_id, error = %e, "Decrypted stream failed");
                progress.done = true;
                let _ = progress.event_bus.emit(CoreEvent::Stream(StreamEvent::Failed {
                    track_id: progress.track_id.clone(),
                    message: e.to_string(),
                }));
                Some((Err(e), progress))
            }
            None => {
                let chunks = progress.bytes / progress.chunk_size as u64;
                debug!(
                    track_id = %progress.track_id,
                    bytes = progress.bytes,
                    chunks,
                    "Decrypted stream completed"
                );
                let _ = progress.event_bus.emit(CoreEvent::Stream(StreamEvent::Completed {
                    track_id: progress.track_id,
                    bytes: progress.bytes,
                    chunks,
                }));
                None
            }
        }
    }))
}
