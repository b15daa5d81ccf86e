use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::constants::*;
use crate::error::DeckError;

/// One video clip of the carousel, in play order.
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub id: usize,
    pub video_source: PathBuf,
    /// Seconds; zero until known.
    pub duration_seconds: f32,
    pub caption_lines: Vec<String>,
}

impl Slide {
    pub fn new(id: usize, video_source: impl Into<PathBuf>, duration_seconds: f32) -> Self {
        Self {
            id,
            video_source: video_source.into(),
            duration_seconds,
            caption_lines: Vec::new(),
        }
    }

    pub fn with_captions<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.caption_lines = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_known_duration(&self) -> bool {
        self.duration_seconds.is_finite() && self.duration_seconds > 0.0
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    slides: Vec<ManifestSlide>,
}

#[derive(Debug, Deserialize)]
struct ManifestSlide {
    video: PathBuf,
    #[serde(default)]
    duration: Option<f32>,
    #[serde(default)]
    captions: Vec<String>,
}

/// Loads the deck from `carousel.toml` when present, otherwise from the video
/// files found in `dir`, sorted by file name.
pub fn load_deck(dir: &Path) -> Result<Vec<Slide>, DeckError> {
    let manifest_path = dir.join(MANIFEST_FILE_NAME);
    let slides = if manifest_path.is_file() {
        load_manifest(dir, &manifest_path)?
    } else {
        scan_directory(dir)?
    };

    if slides.is_empty() {
        return Err(DeckError::Empty(dir.to_path_buf()));
    }
    for slide in &slides {
        debug!(id = slide.id, path = %slide.video_source.display(), captions = slide.caption_lines.len(), "slide");
    }
    info!(count = slides.len(), dir = %dir.display(), "deck loaded");
    Ok(slides)
}

fn load_manifest(dir: &Path, manifest_path: &Path) -> Result<Vec<Slide>, DeckError> {
    let raw = fs::read_to_string(manifest_path).map_err(|source| DeckError::Io {
        path: manifest_path.to_path_buf(),
        source,
    })?;
    let manifest: Manifest = toml::from_str(&raw).map_err(|source| DeckError::Manifest {
        path: manifest_path.to_path_buf(),
        source,
    })?;

    Ok(manifest
        .slides
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let source = if entry.video.is_absolute() {
                entry.video
            } else {
                dir.join(entry.video)
            };
            Slide::new(i + 1, source, entry.duration.unwrap_or(0.0)).with_captions(entry.captions)
        })
        .collect())
}

fn scan_directory(dir: &Path) -> Result<Vec<Slide>, DeckError> {
    let io_err = |source| DeckError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && is_video(&path) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| {
            let captions = read_sidecar_captions(&path);
            Slide::new(i + 1, path, 0.0).with_captions(captions)
        })
        .collect())
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

// Missing sidecar just means no captions.
fn read_sidecar_captions(video: &Path) -> Vec<String> {
    let sidecar = video.with_extension("txt");
    match fs::read_to_string(&sidecar) {
        Ok(text) => text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect(),
        Err(_) => {
            debug!(path = %sidecar.display(), "no caption sidecar");
            Vec::new()
        }
    }
}
