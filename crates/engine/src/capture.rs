//! The module contains the photo capture pipeline.
//!
//! A [`CaptureSession`] drives one capture attempt through an ordered chain of
//! [`CaptureStrategy`] implementations, trying each until one yields a photo:
//!
//! ```text
//! Idle -> Requesting -> Live --snapshot--> Captured
//!                    -> DeviceIntent ----> Captured
//!                    -> Error (every strategy failed)
//! any state --cancel--> Idle
//! ```
//!
//! A live stream holds the camera open. It is released exactly once: after a
//! snapshot, on cancel, or when the session is dropped with the form it
//! belongs to. Dropping a pending `start` returns the session to `Idle`.
use std::fmt;

use async_trait::async_trait;
use image::DynamicImage;

pub use strategies::{
    CameraDevice, DeviceCameraStrategy, Facing, PhotoPicker, PickerStrategy, StaticPhotoStrategy,
    StreamRequest,
};

use crate::{
    CaptureError, EngineError, ItemDraft, Photo, ResultEngine,
    photo::{self, PhotoOptions},
};

mod strategies;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Requesting,
    Live,
    DeviceIntent,
    Error(String),
    Captured,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyKind {
    /// Direct camera access with a live preview.
    DeviceCamera,
    /// The platform's own capture screen or file picker.
    DeviceIntent,
    /// Preset image, for demos and tests.
    Simulated,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::DeviceCamera => "camera",
            StrategyKind::DeviceIntent => "picker",
            StrategyKind::Simulated => "simulated",
        };
        f.write_str(name)
    }
}

/// What a strategy handed back.
#[derive(Debug)]
pub enum Acquisition {
    /// Open camera stream waiting for a snapshot.
    Live(LiveStream),
    /// Image file already captured by the platform.
    File(Vec<u8>),
    /// The user backed out.
    Cancelled,
}

#[async_trait]
pub trait CaptureStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn acquire(&self) -> Result<Acquisition, CaptureError>;
}

/// An open hardware stream.
pub trait FrameSource: Send {
    /// Current frame of the preview.
    fn frame(&mut self) -> Result<DynamicImage, CaptureError>;

    /// Stop the stream and free the device.
    fn stop(&mut self);
}

/// Owner of a [`FrameSource`], stopping it once and only once.
pub struct LiveStream {
    source: Box<dyn FrameSource>,
    released: bool,
}

impl LiveStream {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self {
            source,
            released: false,
        }
    }

    pub fn frame(&mut self) -> Result<DynamicImage, CaptureError> {
        if self.released {
            return Err(CaptureError::Unavailable("stream already released".to_string()));
        }
        self.source.frame()
    }

    pub fn release(&mut self) {
        if !self.released {
            self.source.stop();
            self.released = true;
            tracing::debug!("camera stream released");
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for LiveStream {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for LiveStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveStream")
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

/// One capture attempt for the item being written.
pub struct CaptureSession {
    strategies: Vec<Box<dyn CaptureStrategy>>,
    options: PhotoOptions,
    state: CaptureState,
    stream: Option<LiveStream>,
    photo: Option<Photo>,
}

impl CaptureSession {
    pub fn new(strategies: Vec<Box<dyn CaptureStrategy>>, options: PhotoOptions) -> Self {
        Self {
            strategies,
            options,
            state: CaptureState::Idle,
            stream: None,
            photo: None,
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn photo(&self) -> Option<&Photo> {
        self.photo.as_ref()
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Walk the strategy chain until one produces a live stream or a photo.
    ///
    /// Ends in `Live`, `Captured`, `Idle` (user cancelled) or `Error`; the
    /// last one also returns [`EngineError::CaptureDenied`] listing every
    /// strategy's failure.
    pub async fn start(&mut self) -> ResultEngine<()> {
        if matches!(
            self.state,
            CaptureState::Requesting | CaptureState::Live | CaptureState::DeviceIntent
        ) {
            return Err(EngineError::InvalidCaptureState(format!(
                "capture already in progress ({:?})",
                self.state
            )));
        }

        self.photo = None;
        let mut request = Request::begin(&mut self.state);
        let mut failures = Vec::new();

        for strategy in &self.strategies {
            let kind = strategy.kind();
            if kind == StrategyKind::DeviceIntent {
                request.set(CaptureState::DeviceIntent);
            }

            let acquired = match strategy.acquire().await {
                Ok(acquired) => acquired,
                Err(err) => {
                    tracing::warn!("{kind} capture failed: {err}");
                    request.set(CaptureState::Error(err.to_string()));
                    failures.push(format!("{kind}: {err}"));
                    continue;
                }
            };

            match acquired {
                Acquisition::Live(stream) => {
                    tracing::debug!("{kind} stream open");
                    self.stream = Some(stream);
                    request.finish(CaptureState::Live);
                    return Ok(());
                }
                Acquisition::File(bytes) => match photo::encode_file(&bytes, &self.options) {
                    Ok(photo) => {
                        tracing::debug!("{kind} returned a photo");
                        self.photo = Some(photo);
                        request.finish(CaptureState::Captured);
                        return Ok(());
                    }
                    Err(err) => {
                        tracing::warn!("{kind} returned an unreadable image: {err}");
                        request.set(CaptureState::Error(err.to_string()));
                        failures.push(format!("{kind}: {err}"));
                    }
                },
                Acquisition::Cancelled => {
                    tracing::debug!("{kind} capture cancelled");
                    request.finish(CaptureState::Idle);
                    return Ok(());
                }
            }
        }

        let message = if failures.is_empty() {
            "no capture method available".to_string()
        } else {
            failures.join("; ")
        };
        tracing::error!("photo capture failed: {message}");
        request.finish(CaptureState::Error(message.clone()));
        Err(EngineError::CaptureDenied(message))
    }

    /// Freeze the live preview into a photo and release the camera.
    pub fn snapshot(&mut self) -> ResultEngine<&Photo> {
        let mut stream = match (&self.state, self.stream.take()) {
            (CaptureState::Live, Some(stream)) => stream,
            (state, stream) => {
                self.stream = stream;
                return Err(EngineError::InvalidCaptureState(format!(
                    "snapshot requires a live stream ({state:?})"
                )));
            }
        };

        let frame = stream.frame();
        stream.release();

        let encoded = frame
            .map_err(|err| EngineError::CaptureDenied(err.to_string()))
            .and_then(|frame| photo::encode(&photo::crop_square(&frame), &self.options));
        match encoded {
            Ok(photo) => {
                self.state = CaptureState::Captured;
                Ok(self.photo.insert(photo))
            }
            Err(err) => {
                self.state = CaptureState::Error(err.to_string());
                Err(err)
            }
        }
    }

    /// Abandon the attempt. Releases the camera and discards any photo.
    pub fn cancel(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
        }
        self.photo = None;
        self.state = CaptureState::Idle;
    }

    /// Hand the captured photo over, returning to `Idle`.
    pub fn take_photo(&mut self) -> Option<Photo> {
        if self.state != CaptureState::Captured {
            return None;
        }
        self.state = CaptureState::Idle;
        self.photo.take()
    }

    /// Move the captured photo into the draft.
    pub fn attach_to(&mut self, draft: &mut ItemDraft) -> ResultEngine<()> {
        let photo = self.take_photo().ok_or_else(|| {
            EngineError::InvalidCaptureState(format!("no photo captured ({:?})", self.state))
        })?;
        draft.attach_photo(photo);
        Ok(())
    }
}

/// State of a pending [`CaptureSession::start`].
///
/// Dropping the `start` future while a strategy is still waiting (the user
/// closed the form) puts the session back to `Idle`.
struct Request<'a> {
    state: &'a mut CaptureState,
    finished: bool,
}

impl<'a> Request<'a> {
    fn begin(state: &'a mut CaptureState) -> Self {
        *state = CaptureState::Requesting;
        Self {
            state,
            finished: false,
        }
    }

    fn set(&mut self, state: CaptureState) {
        *self.state = state;
    }

    fn finish(mut self, state: CaptureState) {
        *self.state = state;
        self.finished = true;
    }
}

impl Drop for Request<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!("capture request abandoned");
            *self.state = CaptureState::Idle;
        }
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("strategies", &self.strategies.len())
            .field("state", &self.state)
            .field("stream", &self.stream)
            .field("photo", &self.photo.as_ref().map(Photo::len))
            .finish()
    }
}
