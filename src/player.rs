use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::MediaError;
use crate::slide::Slide;

/// Raw notifications from the playback collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    MetadataLoaded { slide: usize, duration: f32 },
    Started { slide: usize },
    Ended { slide: usize },
}

/// Imperative command surface the sequencer drives.
pub trait Playback {
    fn play(&mut self, slide: usize);
    fn pause(&mut self, slide: usize);
}

pub trait MediaClock {
    /// Elapsed playback time of `slide`, in seconds, once it has been opened.
    fn current_time(&self, slide: usize) -> Option<f32>;
}

pub enum FramePoll {
    Frame(Vec<u8>),
    Pending,
    Finished,
}

pub trait FrameSource {
    fn poll_frame(&mut self) -> FramePoll;
}

pub trait MediaBackend {
    fn probe(&self, path: &Path) -> Result<f32, MediaError>;
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, MediaError>;
    /// Seconds between two decoded frames.
    fn frame_interval(&self) -> f32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Idle,
    Playing,
    Paused,
    Ended,
}

struct Stream {
    path: PathBuf,
    status: StreamStatus,
    source: Option<Box<dyn FrameSource>>,
    current_time: Option<f32>,
    next_frame_at: f32,
    duration: Option<f32>,
    frame: Option<Vec<u8>>,
    frame_dirty: bool,
}

/// One stream per slide. Streams only move when told to, and report what
/// happened through [`MediaLibrary::update`].
pub struct MediaLibrary<B: MediaBackend> {
    backend: B,
    streams: Vec<Stream>,
    pending: Vec<MediaEvent>,
}

impl<B: MediaBackend> MediaLibrary<B> {
    pub fn new(backend: B, slides: &[Slide]) -> Self {
        let mut pending = Vec::new();
        let streams = slides
            .iter()
            .enumerate()
            .map(|(slide, s)| {
                let duration = match backend.probe(&s.video_source) {
                    Ok(duration) => {
                        pending.push(MediaEvent::MetadataLoaded { slide, duration });
                        Some(duration)
                    }
                    Err(e) => {
                        // Still counts towards readiness; the duration stays unknown.
                        warn!(slide, error = %e, "metadata unavailable");
                        pending.push(MediaEvent::MetadataLoaded { slide, duration: 0.0 });
                        None
                    }
                };
                Stream {
                    path: s.video_source.clone(),
                    status: StreamStatus::Idle,
                    source: None,
                    current_time: None,
                    next_frame_at: 0.0,
                    duration,
                    frame: None,
                    frame_dirty: false,
                }
            })
            .collect();

        Self { backend, streams, pending }
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn status(&self, slide: usize) -> Option<StreamStatus> {
        self.streams.get(slide).map(|s| s.status)
    }

    /// Advances every playing stream by `dt` seconds and returns the events
    /// raised since the previous call.
    pub fn update(&mut self, dt: f32) -> Vec<MediaEvent> {
        let mut events = std::mem::take(&mut self.pending);
        let interval = self.backend.frame_interval();

        for (slide, stream) in self.streams.iter_mut().enumerate() {
            if stream.status != StreamStatus::Playing {
                continue;
            }
            let Some(source) = stream.source.as_mut() else {
                continue;
            };

            let mut now = stream.current_time.unwrap_or(0.0) + dt;
            while stream.next_frame_at <= now {
                match source.poll_frame() {
                    FramePoll::Frame(pixels) => {
                        stream.frame = Some(pixels);
                        stream.frame_dirty = true;
                        stream.next_frame_at += interval;
                    }
                    FramePoll::Pending => {
                        // Decoder is behind; hold the clock like a buffering player.
                        now = now.min(stream.next_frame_at);
                        break;
                    }
                    FramePoll::Finished => {
                        stream.status = StreamStatus::Ended;
                        stream.source = None;
                        now = stream.duration.map_or(now, |d| now.max(d));
                        debug!(slide, elapsed = now, "stream ended");
                        events.push(MediaEvent::Ended { slide });
                        break;
                    }
                }
            }
            stream.current_time = Some(now);
        }

        events
    }

    /// Newest decoded frame of `slide`, if it changed since the last call.
    pub fn take_frame(&mut self, slide: usize) -> Option<&[u8]> {
        let stream = self.streams.get_mut(slide)?;
        if !stream.frame_dirty {
            return None;
        }
        stream.frame_dirty = false;
        stream.frame.as_deref()
    }
}

impl<B: MediaBackend> Playback for MediaLibrary<B> {
    fn play(&mut self, slide: usize) {
        let Some(stream) = self.streams.get_mut(slide) else {
            return;
        };
        match stream.status {
            StreamStatus::Playing => {}
            StreamStatus::Paused => {
                stream.status = StreamStatus::Playing;
                self.pending.push(MediaEvent::Started { slide });
            }
            StreamStatus::Idle | StreamStatus::Ended => match self.backend.open(&stream.path) {
                Ok(source) => {
                    stream.source = Some(source);
                    stream.status = StreamStatus::Playing;
                    stream.current_time = Some(0.0);
                    stream.next_frame_at = 0.0;
                    self.pending.push(MediaEvent::Started { slide });
                    debug!(slide, path = %stream.path.display(), "stream opened");
                }
                Err(e) => warn!(slide, error = %e, "cannot start stream"),
            },
        }
    }

    fn pause(&mut self, slide: usize) {
        if let Some(stream) = self.streams.get_mut(slide) {
            if stream.status == StreamStatus::Playing {
                stream.status = StreamStatus::Paused;
            }
        }
        // A start that has not been reported yet is void once paused.
        self.pending.retain(|event| *event != MediaEvent::Started { slide });
    }
}

impl<B: MediaBackend> MediaClock for MediaLibrary<B> {
    fn current_time(&self, slide: usize) -> Option<f32> {
        self.streams.get(slide).and_then(|s| s.current_time)
    }
}
