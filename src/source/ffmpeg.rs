//! Network sources via an ffmpeg subprocess
//!
//! ffmpeg pulls the stream (RTSP, HTTP, RTMP, ...) and writes MJPEG to a
//! pipe. A reader thread splits the pipe into JPEG frames and keeps only the
//! newest one, so a slow consumer never sees a backlog.
//!
//! ```text
//! ffmpeg stdout ──► reader thread ──► JpegSplitter ──► LatestJpeg (1 deep)
//!                                                         │
//!                         capture thread: read_frame() ◄──┘ (wait ≤ read_timeout)
//! ```

use std::io::Read;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use image::{ImageFormat, RgbImage};

use super::config::ConnectorConfig;
use super::error::{ConnectError, ReadError};
use super::{ForceClose, SourceHandle};

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Frames larger than this are discarded as corrupt
const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

const READ_CHUNK: usize = 64 * 1024;

/// Build the ffmpeg argument list for a URL
///
/// Buffering is kept to a minimum (`nobuffer`, `low_delay`) and the output
/// rate is capped at `target_fps`.
pub fn ffmpeg_args(url: &str, target_fps: u32) -> Vec<String> {
    let mut args: Vec<String> = Vec::with_capacity(20);

    if url.starts_with("rtsp://") || url.starts_with("rtsps://") {
        args.extend(["-rtsp_transport", "tcp"].map(String::from));
    }

    args.extend(
        [
            "-fflags", "nobuffer", "-flags", "low_delay", "-probesize", "32768", "-i",
        ]
        .map(String::from),
    );
    args.push(url.to_string());
    args.extend(["-an", "-r"].map(String::from));
    args.push(target_fps.max(1).to_string());
    args.extend(
        [
            "-f",
            "image2pipe",
            "-vcodec",
            "mjpeg",
            "-q:v",
            "3",
            "-loglevel",
            "error",
            "-",
        ]
        .map(String::from),
    );

    args
}

/// Splits a byte stream into complete JPEG images
#[derive(Debug, Default)]
pub(crate) struct JpegSplitter {
    buf: BytesMut,
}

impl JpegSplitter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed bytes, returning every JPEG completed by them
    pub(crate) fn push(&mut self, data: &[u8]) -> Vec<Bytes> {
        self.buf.extend_from_slice(data);
        let mut frames = Vec::new();

        loop {
            let Some(start) = find_marker(&self.buf, 0, SOI) else {
                // Keep a trailing 0xFF, it may be the first half of a marker
                let keep = usize::from(self.buf.last() == Some(&0xFF));
                let discard = self.buf.len() - keep;
                self.buf.advance(discard);
                break;
            };
            self.buf.advance(start);

            match find_marker(&self.buf, SOI.len(), EOI) {
                Some(end) => {
                    frames.push(self.buf.split_to(end + EOI.len()).freeze());
                }
                None => {
                    if self.buf.len() > MAX_FRAME_SIZE {
                        tracing::warn!(bytes = self.buf.len(), "Discarding oversized frame");
                        self.buf.clear();
                    }
                    break;
                }
            }
        }

        frames
    }
}

fn find_marker(buf: &[u8], from: usize, marker: [u8; 2]) -> Option<usize> {
    buf.get(from..)?
        .windows(2)
        .position(|w| w == marker)
        .map(|pos| pos + from)
}

#[derive(Debug, Default)]
struct Latest {
    frame: Option<Bytes>,
    closed: bool,
}

/// Single-frame handoff between the pipe reader and the capture thread
#[derive(Debug, Default)]
struct LatestJpeg {
    slot: Mutex<Latest>,
    ready: Condvar,
}

impl LatestJpeg {
    fn lock(&self) -> MutexGuard<'_, Latest> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn put(&self, frame: Bytes) {
        self.lock().frame = Some(frame);
        self.ready.notify_one();
    }

    fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_all();
    }

    fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Wait for a frame. Pending frames are still returned after close.
    fn take(&self, timeout: Duration) -> Result<Bytes, ReadError> {
        let guard = self.lock();
        let (mut guard, _) = self
            .ready
            .wait_timeout_while(guard, timeout, |latest| {
                latest.frame.is_none() && !latest.closed
            })
            .unwrap_or_else(|e| e.into_inner());

        match guard.frame.take() {
            Some(frame) => Ok(frame),
            None if guard.closed => Err(ReadError::Closed),
            None => Err(ReadError::Timeout),
        }
    }
}

/// Network stream read through ffmpeg
pub struct FfmpegSource {
    child: Arc<Mutex<Option<Child>>>,
    latest: Arc<LatestJpeg>,
    reader: Option<JoinHandle<()>>,
    read_timeout: Duration,
}

impl FfmpegSource {
    /// Spawn ffmpeg for `url` and wait for the first frame
    pub fn open(url: &str, config: &ConnectorConfig) -> Result<Self, ConnectError> {
        let mut child = Command::new(&config.ffmpeg_path)
            .args(ffmpeg_args(url, config.target_fps))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ConnectError::Unavailable(format!(
                    "ffmpeg not found at {}",
                    config.ffmpeg_path.display()
                )),
                _ => ConnectError::Failed(format!("ffmpeg spawn failed: {}", e)),
            })?;

        let Some(stdout) = child.stdout.take() else {
            kill(&mut child);
            return Err(ConnectError::Failed("ffmpeg stdout unavailable".into()));
        };

        let latest = Arc::new(LatestJpeg::default());
        let reader_latest = Arc::clone(&latest);
        let reader = thread::Builder::new()
            .name("ffmpeg-reader".into())
            .spawn(move || pipe_reader(stdout, reader_latest));

        let reader = match reader {
            Ok(handle) => handle,
            Err(e) => {
                kill(&mut child);
                return Err(ConnectError::Failed(format!(
                    "failed to spawn reader thread: {}",
                    e
                )));
            }
        };

        let mut source = Self {
            child: Arc::new(Mutex::new(Some(child))),
            latest,
            reader: Some(reader),
            read_timeout: config.read_timeout,
        };

        // Validate: the source must produce a frame before we call it connected
        match source.latest.take(config.connect_timeout) {
            Ok(first) => {
                // Put it back so the first read returns it
                source.latest.put(first);
                tracing::debug!(url = %url, "ffmpeg source produced first frame");
                Ok(source)
            }
            Err(e) => {
                source.close();
                Err(ConnectError::Failed(format!("no frames from {}: {}", url, e)))
            }
        }
    }
}

fn pipe_reader(mut stdout: ChildStdout, latest: Arc<LatestJpeg>) {
    let mut splitter = JpegSplitter::new();
    let mut chunk = vec![0u8; READ_CHUNK];

    loop {
        match stdout.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                if let Some(frame) = splitter.push(&chunk[..n]).pop() {
                    latest.put(frame);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::debug!(error = %e, "ffmpeg pipe read failed");
                break;
            }
        }
    }

    latest.close();
}

fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn decode_jpeg(data: &[u8]) -> Result<RgbImage, ReadError> {
    image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map(|img| img.to_rgb8())
        .map_err(|e| ReadError::Decode(e.to_string()))
}

impl SourceHandle for FfmpegSource {
    fn read_frame(&mut self) -> Result<RgbImage, ReadError> {
        let jpeg = self.latest.take(self.read_timeout)?;
        decode_jpeg(&jpeg)
    }

    fn is_open(&self) -> bool {
        !self.latest.is_closed()
    }

    fn close(&mut self) {
        if let Some(mut child) = self
            .child
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            kill(&mut child);
        }
        self.latest.close();

        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }

    fn force_close(&self) -> Option<ForceClose> {
        let child = Arc::clone(&self.child);
        let latest = Arc::clone(&self.latest);
        Some(Arc::new(move || {
            if let Some(mut child) = child.lock().unwrap_or_else(|e| e.into_inner()).take() {
                kill(&mut child);
            }
            latest.close();
        }))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(body: &[u8]) -> Vec<u8> {
        let mut data = SOI.to_vec();
        data.extend_from_slice(body);
        data.extend_from_slice(&EOI);
        data
    }

    #[test]
    fn test_args_rtsp_uses_tcp() {
        let args = ffmpeg_args("rtsp://10.0.0.2:8554/stream", 30);
        assert_eq!(&args[..2], &["-rtsp_transport", "tcp"]);
        assert!(args.contains(&"nobuffer".to_string()));
        assert!(args.contains(&"image2pipe".to_string()));

        let rate = args.iter().position(|a| a == "-r").unwrap();
        assert_eq!(args[rate + 1], "30");
        assert_eq!(args.last().map(String::as_str), Some("-"));
    }

    #[test]
    fn test_args_http_has_no_rtsp_flags() {
        let args = ffmpeg_args("http://cam.local/mjpeg", 0);
        assert!(!args.contains(&"-rtsp_transport".to_string()));

        let rate = args.iter().position(|a| a == "-r").unwrap();
        assert_eq!(args[rate + 1], "1");
    }

    #[test]
    fn test_splitter_single_frame() {
        let mut splitter = JpegSplitter::new();
        let frame = jpeg(&[1, 2, 3]);

        let frames = splitter.push(&frame);
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], &frame[..]);
    }

    #[test]
    fn test_splitter_across_chunks() {
        let mut splitter = JpegSplitter::new();
        let frame = jpeg(&[9, 8, 7, 6]);

        // Split inside the EOI marker
        let cut = frame.len() - 1;
        assert!(splitter.push(&frame[..cut]).is_empty());
        let frames = splitter.push(&frame[cut..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], &frame[..]);
    }

    #[test]
    fn test_splitter_marker_split_at_start() {
        let mut splitter = JpegSplitter::new();
        let frame = jpeg(&[5]);

        assert!(splitter.push(&[0x00, 0x11, 0xFF]).is_empty());
        let frames = splitter.push(&frame[1..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..], &frame[..]);
    }

    #[test]
    fn test_splitter_multiple_frames_and_garbage() {
        let mut splitter = JpegSplitter::new();
        let mut data = vec![0x00, 0x42];
        data.extend(jpeg(&[1]));
        data.extend([0x13, 0x37]);
        data.extend(jpeg(&[2, 2]));

        let frames = splitter.push(&data);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].len(), 5);
        assert_eq!(frames[1].len(), 6);
    }

    #[test]
    fn test_latest_keeps_newest() {
        let latest = LatestJpeg::default();
        latest.put(Bytes::from_static(b"old"));
        latest.put(Bytes::from_static(b"new"));

        let frame = latest.take(Duration::from_millis(10)).unwrap();
        assert_eq!(&frame[..], b"new");
        assert!(matches!(
            latest.take(Duration::from_millis(10)),
            Err(ReadError::Timeout)
        ));
    }

    #[test]
    fn test_latest_close_wakes_reader() {
        let latest = Arc::new(LatestJpeg::default());
        let closer = Arc::clone(&latest);

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            closer.close();
        });

        let result = latest.take(Duration::from_secs(5));
        assert!(matches!(result, Err(ReadError::Closed)));
        handle.join().unwrap();
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let config = ConnectorConfig::default().ffmpeg_path("/nonexistent/ffmpeg-binary");
        let result = FfmpegSource::open("rtsp://127.0.0.1:1/none", &config);
        assert!(matches!(result, Err(ConnectError::Unavailable(_))));
    }
}
