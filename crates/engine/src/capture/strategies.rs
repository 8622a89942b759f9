//! Capture strategies shipped with the engine.
//!
//! Platform bindings implement [`CameraDevice`] and [`PhotoPicker`]; the
//! strategies wrap them so they can be chained in a
//! [`CaptureSession`](super::CaptureSession).
use async_trait::async_trait;

use super::{Acquisition, CaptureStrategy, FrameSource, LiveStream, StrategyKind};
use crate::CaptureError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Facing {
    User,
    Environment,
}

/// Constraints sent with a camera request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamRequest {
    pub facing: Facing,
    /// Width over height.
    pub aspect_ratio: f32,
    pub ideal_width: u32,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            facing: Facing::Environment,
            aspect_ratio: 1.0,
            ideal_width: 800,
        }
    }
}

/// Direct access to a camera. Suspends until the user grants or denies it.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn open(&self, request: &StreamRequest) -> Result<Box<dyn FrameSource>, CaptureError>;
}

/// The platform's native capture screen or file picker.
///
/// `Ok(None)` means the user closed it without choosing anything.
#[async_trait]
pub trait PhotoPicker: Send + Sync {
    async fn pick(&self) -> Result<Option<Vec<u8>>, CaptureError>;
}

/// Rear camera with live preview.
#[derive(Debug)]
pub struct DeviceCameraStrategy<D> {
    device: D,
    request: StreamRequest,
}

impl<D: CameraDevice> DeviceCameraStrategy<D> {
    pub fn new(device: D) -> Self {
        Self::with_request(device, StreamRequest::default())
    }

    pub fn with_request(device: D, request: StreamRequest) -> Self {
        Self { device, request }
    }
}

#[async_trait]
impl<D: CameraDevice> CaptureStrategy for DeviceCameraStrategy<D> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DeviceCamera
    }

    async fn acquire(&self) -> Result<Acquisition, CaptureError> {
        let source = self.device.open(&self.request).await?;
        Ok(Acquisition::Live(LiveStream::new(source)))
    }
}

#[derive(Debug)]
pub struct PickerStrategy<P> {
    picker: P,
}

impl<P: PhotoPicker> PickerStrategy<P> {
    pub fn new(picker: P) -> Self {
        Self { picker }
    }
}

#[async_trait]
impl<P: PhotoPicker> CaptureStrategy for PickerStrategy<P> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DeviceIntent
    }

    async fn acquire(&self) -> Result<Acquisition, CaptureError> {
        match self.picker.pick().await? {
            Some(bytes) if bytes.is_empty() => {
                Err(CaptureError::Failed("picker returned an empty file".to_string()))
            }
            Some(bytes) => Ok(Acquisition::File(bytes)),
            None => Ok(Acquisition::Cancelled),
        }
    }
}

/// Always returns the same image file.
#[derive(Clone, Debug)]
pub struct StaticPhotoStrategy {
    bytes: Vec<u8>,
}

impl StaticPhotoStrategy {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[async_trait]
impl CaptureStrategy for StaticPhotoStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Simulated
    }

    async fn acquire(&self) -> Result<Acquisition, CaptureError> {
        Ok(Acquisition::File(self.bytes.clone()))
    }
}
