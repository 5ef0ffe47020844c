//! Text recognizers
//!
//! A [`Recognizer`] turns one raster image into text plus a confidence
//! score. Recognizers hold external resources (a worker process, scratch
//! files) and must be released with [`Recognizer::terminate`]; the
//! orchestration in [`super::recognize`] does that through [`RecognizerGuard`].

use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::process::Command;

use image::{DynamicImage, ImageFormat};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Recognized text of one image
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    /// Mean confidence, 0 to 100
    pub confidence: f32,
}

/// An OCR engine session for a fixed language
pub trait Recognizer {
    /// Recognize the text in an image
    fn recognize(&mut self, image: &DynamicImage) -> Result<Recognition>;

    /// Release the engine's resources; called exactly once
    fn terminate(&mut self);
}

/// Owns a recognizer and terminates it when dropped
///
/// Dropping happens on every exit path, including early returns through
/// `?` and unwinding panics.
pub struct RecognizerGuard<R: Recognizer> {
    inner: R,
}

impl<R: Recognizer> RecognizerGuard<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Recognizer> Deref for RecognizerGuard<R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.inner
    }
}

impl<R: Recognizer> DerefMut for RecognizerGuard<R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

impl<R: Recognizer> Drop for RecognizerGuard<R> {
    fn drop(&mut self) {
        self.inner.terminate();
    }
}

/// Recognizer backed by the `tesseract` command-line program
///
/// Each image is written to a scratch directory as PNG and recognized with
/// TSV output, which carries per-word confidences.
pub struct TesseractRecognizer {
    program: PathBuf,
    language: String,
    scratch: Option<TempDir>,
    images_seen: usize,
}

impl TesseractRecognizer {
    /// Start a session, checking that the program runs
    pub fn start(program: impl Into<PathBuf>, language: &str) -> Result<Self> {
        let program = program.into();
        let output = Command::new(&program).arg("--version").output().map_err(|e| {
            Error::Ocr(format!("cannot run {}: {}", program.display(), e))
        })?;
        if !output.status.success() {
            return Err(Error::Ocr(format!(
                "{} --version exited with {}",
                program.display(),
                output.status
            )));
        }

        debug!(program = %program.display(), language, "tesseract session started");
        Ok(Self {
            program,
            language: language.to_string(),
            scratch: Some(TempDir::new()?),
            images_seen: 0,
        })
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(&mut self, image: &DynamicImage) -> Result<Recognition> {
        let scratch = self
            .scratch
            .as_ref()
            .ok_or_else(|| Error::Ocr("recognizer already terminated".to_string()))?;

        self.images_seen += 1;
        let input = scratch.path().join(format!("page-{}.png", self.images_seen));
        image
            .save_with_format(&input, ImageFormat::Png)
            .map_err(|e| Error::Ocr(format!("cannot write scratch image: {}", e)))?;

        let output = Command::new(&self.program)
            .arg(&input)
            .arg("stdout")
            .args(["-l", &self.language])
            .arg("tsv")
            .output();

        // The scratch image goes whether or not tesseract succeeded
        if let Err(e) = std::fs::remove_file(&input) {
            warn!(path = %input.display(), "failed to remove scratch image: {}", e);
        }

        let output = output.map_err(|e| Error::Ocr(format!("failed to run tesseract: {}", e)))?;
        if !output.status.success() {
            return Err(Error::Ocr(format!(
                "tesseract failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }

    fn terminate(&mut self) {
        if let Some(scratch) = self.scratch.take() {
            if let Err(e) = scratch.close() {
                warn!("failed to remove tesseract scratch directory: {}", e);
            }
            debug!(images = self.images_seen, "tesseract session terminated");
        }
    }
}

/// Rebuild text and mean word confidence from tesseract TSV output
///
/// Columns: level page block par line word left top width height conf text.
/// Words (level 5) on the same line are joined with spaces; a new paragraph
/// or block starts after a blank line.
pub fn parse_tsv(tsv: &str) -> Recognition {
    let mut text = String::new();
    let mut confidences = Vec::new();
    let mut current: Option<(u32, u32, u32)> = None;

    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 || fields[0] != "5" {
            continue;
        }
        let word = fields[11].trim();
        let confidence: f32 = fields[10].trim().parse().unwrap_or(-1.0);
        if word.is_empty() || confidence < 0.0 {
            continue;
        }

        let number = |i: usize| fields[i].parse::<u32>().unwrap_or(0);
        let position = (number(2), number(3), number(4));

        match current {
            Some((block, par, _)) if (block, par) != (position.0, position.1) => text.push_str("\n\n"),
            Some(previous) if previous != position => text.push('\n'),
            Some(_) => text.push(' '),
            None => {}
        }
        current = Some(position);

        text.push_str(word);
        confidences.push(confidence);
    }

    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32
    };

    Recognition { text, confidence }
}
