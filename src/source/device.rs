//! Local capture devices via nokhwa

use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;
use tracing::{info, warn};

use super::config::ConnectorConfig;
use super::error::{ConnectError, ReadError};
use super::SourceHandle;

/// Camera opened by device index
pub struct DeviceSource {
    camera: Option<Camera>,
    index: u32,
}

impl DeviceSource {
    /// Open the camera at `index` and start its stream
    pub fn open(index: u32, config: &ConnectorConfig) -> Result<Self, ConnectError> {
        let (width, height) = config.resolution;
        // Most cameras support MJPEG at useful resolutions
        let target = CameraFormat::new(
            Resolution::new(width, height),
            FrameFormat::MJPEG,
            config.target_fps,
        );
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(target));

        let mut camera = Camera::new(CameraIndex::Index(index), requested).map_err(|e| {
            ConnectError::Unavailable(format!("failed to open camera {}: {}", index, e))
        })?;

        camera.open_stream().map_err(|e| {
            ConnectError::Failed(format!("failed to open camera {} stream: {}", index, e))
        })?;

        let resolution = camera.resolution();
        info!(
            device = index,
            width = resolution.width(),
            height = resolution.height(),
            "Camera opened"
        );

        Ok(Self {
            camera: Some(camera),
            index,
        })
    }
}

impl SourceHandle for DeviceSource {
    fn read_frame(&mut self) -> Result<RgbImage, ReadError> {
        let camera = self.camera.as_mut().ok_or(ReadError::Closed)?;

        let frame = camera
            .frame()
            .map_err(|e| ReadError::Io(std::io::Error::other(e.to_string())))?;
        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| ReadError::Decode(e.to_string()))?;

        let (width, height) = (decoded.width(), decoded.height());
        RgbImage::from_raw(width, height, decoded.into_raw())
            .ok_or_else(|| ReadError::Decode("frame buffer size mismatch".into()))
    }

    fn is_open(&self) -> bool {
        self.camera
            .as_ref()
            .map(|camera| camera.is_stream_open())
            .unwrap_or(false)
    }

    fn close(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                warn!(device = self.index, error = %e, "Failed to stop camera stream");
            }
        }
    }
}

impl Drop for DeviceSource {
    fn drop(&mut self) {
        self.close();
    }
}
