use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;

use crossbeam_channel::{Receiver, TryRecvError, bounded};
use tracing::{debug, warn};

use crate::constants::FRAME_QUEUE_DEPTH;
use crate::error::MediaError;
use crate::player::{FramePoll, FrameSource, MediaBackend};

/// Decodes slides through external `ffprobe` / `ffmpeg` processes.
pub struct FfmpegBackend {
    width: i32,
    height: i32,
    fps: u32,
}

impl FfmpegBackend {
    pub fn new(width: i32, height: i32, fps: u32) -> Self {
        Self { width, height, fps }
    }

    pub fn frame_len(&self) -> usize {
        (self.width * self.height * 4) as usize // 4 bytes per pixel (RGBA)
    }
}

impl MediaBackend for FfmpegBackend {
    fn probe(&self, path: &Path) -> Result<f32, MediaError> {
        let output = Command::new("ffprobe")
            .args(["-v", "error"])
            .args(["-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path)
            .output()
            .map_err(|source| MediaError::Spawn { program: "ffprobe", source })?;

        if !output.status.success() {
            return Err(MediaError::Probe {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout);
        parse_duration(&text).ok_or_else(|| MediaError::Probe {
            path: path.to_path_buf(),
            reason: format!("unexpected duration {:?}", text.trim()),
        })
    }

    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, MediaError> {
        Ok(Box::new(Decoder::spawn(path, self.width, self.height, self.fps, self.frame_len())?))
    }

    fn frame_interval(&self) -> f32 {
        1.0 / self.fps as f32
    }
}

fn parse_duration(text: &str) -> Option<f32> {
    text.trim()
        .parse::<f32>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// A running `ffmpeg` process writing raw RGBA frames to its stdout.
pub struct Decoder {
    process: Child,
    frames: Receiver<Vec<u8>>,
}

impl Decoder {
    pub fn spawn(path: &Path, width: i32, height: i32, fps: u32, frame_len: usize) -> Result<Decoder, MediaError> {
        let mut process = Command::new("ffmpeg")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .args(["-loglevel", "error"])
            .arg("-i")
            .arg(path)
            .arg("-an")
            .args(["-f", "rawvideo"])
            .args(["-pix_fmt", "rgba"])
            .args(["-vf", &format!("scale={}:{}", width, height)])
            .args(["-r", &format!("{}", fps)])
            .arg("-")
            .spawn()
            .map_err(|source| MediaError::Spawn { program: "ffmpeg", source })?;

        let mut stdout = process
            .stdout
            .take()
            .ok_or(MediaError::MissingPipe { program: "ffmpeg" })?;

        // Whole frames only; a short trailing read is discarded.
        let (tx, frames) = bounded(FRAME_QUEUE_DEPTH);
        let name = path.display().to_string();
        thread::spawn(move || {
            let mut count = 0usize;
            loop {
                let mut frame = vec![0u8; frame_len];
                if stdout.read_exact(&mut frame).is_err() {
                    break;
                }
                if tx.send(frame).is_err() {
                    break;
                }
                count += 1;
            }
            debug!(path = %name, frames = count, "decoder drained");
        });

        Ok(Decoder { process, frames })
    }
}

impl FrameSource for Decoder {
    fn poll_frame(&mut self) -> FramePoll {
        match self.frames.try_recv() {
            Ok(frame) => FramePoll::Frame(frame),
            Err(TryRecvError::Empty) => FramePoll::Pending,
            Err(TryRecvError::Disconnected) => FramePoll::Finished,
        }
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        // Killing an already exited child is fine; reap it either way.
        let _ = self.process.kill();
        if let Err(e) = self.process.wait() {
            warn!(error = %e, "failed to reap ffmpeg");
        }
    }
}
