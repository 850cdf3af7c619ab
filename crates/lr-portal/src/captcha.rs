//! Digit captcha solving: color-band binarization followed by OCR.

use std::io::{Cursor, Write};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use image::{GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use thiserror::Error;

/// Red channel range of the captcha's digit ink.
pub const INK_RED: RangeInclusive<u8> = 0..=70;
/// Green channel range of the captcha's digit ink.
pub const INK_GREEN: RangeInclusive<u8> = 40..=140;
/// Blue channel range of the captcha's digit ink.
pub const INK_BLUE: RangeInclusive<u8> = 0..=70;

const BLACK: Luma<u8> = Luma([0]);
const WHITE: Luma<u8> = Luma([255]);

/// Captcha solving errors.
#[derive(Debug, Error)]
pub enum CaptchaError {
    /// The captcha bytes could not be decoded, or re-encoded for OCR.
    #[error("captcha image error: {0}")]
    Image(#[from] image::ImageError),
    /// The OCR engine could not be run or reported failure.
    #[error("OCR failed: {0}")]
    Ocr(String),
    /// OCR ran but produced no usable digits.
    #[error("unreadable captcha (OCR returned {text:?})")]
    Unreadable { text: String },
}

/// Whether a pixel belongs to the digit ink.
pub fn is_ink(pixel: Rgb<u8>) -> bool {
    let Rgb([r, g, b]) = pixel;
    INK_RED.contains(&r) && INK_GREEN.contains(&g) && INK_BLUE.contains(&b)
}

/// Paints ink pixels black and everything else white.
pub fn binarize(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if is_ink(*image.get_pixel(x, y)) {
            BLACK
        } else {
            WHITE
        }
    })
}

/// Single-line, digits-only text recognition.
pub trait OcrEngine {
    fn recognize_digits(&self, image: &GrayImage) -> Result<String, CaptchaError>;
}

/// Runs the `tesseract` command-line tool.
///
/// The image is piped in as PNG and read back from stdout, using page
/// segmentation mode 7 (single text line) and a `0-9` whitelist.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl OcrEngine for TesseractCli {
    fn recognize_digits(&self, image: &GrayImage) -> Result<String, CaptchaError> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let mut child = Command::new(&self.binary)
            .args([
                "stdin",
                "stdout",
                "--psm",
                "7",
                "-c",
                "tessedit_char_whitelist=0123456789",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                CaptchaError::Ocr(format!("failed to run {}: {err}", self.binary.display()))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&png)
                .map_err(|err| CaptchaError::Ocr(format!("failed to send image: {err}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|err| CaptchaError::Ocr(format!("tesseract did not finish: {err}")))?;
        if !output.status.success() {
            return Err(CaptchaError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Turns captcha image bytes into the digit string to submit.
#[derive(Debug, Clone)]
pub struct CaptchaSolver<O> {
    ocr: O,
}

impl<O: OcrEngine> CaptchaSolver<O> {
    pub const fn new(ocr: O) -> Self {
        Self { ocr }
    }

    /// Decodes, binarizes and reads the captcha.
    ///
    /// Whitespace the OCR engine inserts between glyphs is dropped. Anything
    /// other than a non-empty run of digits is reported as unreadable.
    pub fn solve(&self, image_bytes: &[u8]) -> Result<String, CaptchaError> {
        let decoded = image::load_from_memory(image_bytes)?.to_rgb8();
        let binarized = binarize(&decoded);
        let raw = self.ocr.recognize_digits(&binarized)?;
        let digits: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(CaptchaError::Unreadable { text: raw });
        }
        tracing::debug!(%digits, "captcha recognized");
        Ok(digits)
    }
}
