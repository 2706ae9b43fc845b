//! Text recognition through the system Tesseract installation
//!
//! Tesseract reports individual words; they are grouped into lines here so
//! the gateway receives one observation per line of text.

use image::DynamicImage;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::vision::detector::{
    DetectionError, Detector, RecognitionLevel, TextCandidate, TextObservation, TextRequest,
};
use crate::vision::models::NormalizedRect;

/// Word box reported by Tesseract, in pixels
#[derive(Debug, Clone)]
struct WordBox {
    block: i32,
    paragraph: i32,
    line: i32,
    word: i32,
    left: i32,
    top: i32,
    width: i32,
    height: i32,
    /// 0 - 100, negative for non-word rows
    confidence: f32,
    text: String,
}

impl From<rusty_tesseract::Data> for WordBox {
    fn from(d: rusty_tesseract::Data) -> Self {
        Self {
            block: d.block_num,
            paragraph: d.par_num,
            line: d.line_num,
            word: d.word_num,
            left: d.left,
            top: d.top,
            width: d.width,
            height: d.height,
            confidence: d.conf,
            text: d.text,
        }
    }
}

/// Tesseract-backed text recognizer
pub struct TesseractTextDetector {
    language: String,
}

impl TesseractTextDetector {
    /// Create a recognizer for a Tesseract language code (e.g. "eng")
    pub fn new(language: impl Into<String>) -> Self {
        let language = language.into();
        info!("Using Tesseract text recognition with language: {}", language);
        Self { language }
    }

    fn args(&self, request: &TextRequest) -> rusty_tesseract::Args {
        let dictionary = if request.uses_language_correction { "1" } else { "0" };
        let mut config_variables = HashMap::new();
        config_variables.insert("load_system_dawg".to_string(), dictionary.to_string());
        config_variables.insert("load_freq_dawg".to_string(), dictionary.to_string());

        let (psm, dpi) = match request.recognition_level {
            // fully automatic page segmentation
            RecognitionLevel::Accurate => (3, 300),
            // sparse text, lower resolution
            RecognitionLevel::Fast => (11, 150),
        };

        rusty_tesseract::Args {
            lang: self.language.clone(),
            config_variables,
            dpi: Some(dpi),
            psm: Some(psm),
            oem: Some(3),
        }
    }
}

impl Detector for TesseractTextDetector {
    type Request = TextRequest;
    type Observation = TextObservation;

    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn detect(
        &self,
        image: &DynamicImage,
        request: &TextRequest,
    ) -> Result<Vec<TextObservation>, DetectionError> {
        let tess_image = rusty_tesseract::Image::from_dynamic_image(image).map_err(|e| {
            DetectionError::failed(format!("Failed to create tesseract image: {}", e))
        })?;

        let output = rusty_tesseract::image_to_data(&tess_image, &self.args(request))
            .map_err(|e| DetectionError::failed(format!("Tesseract OCR failed: {}", e)))?;

        debug!("Tesseract returned {} data entries", output.data.len());
        let words: Vec<WordBox> = output.data.into_iter().map(WordBox::from).collect();
        Ok(group_lines(words, image.width(), image.height()))
    }
}

/// Merge word boxes into one observation per (block, paragraph, line)
fn group_lines(words: Vec<WordBox>, image_width: u32, image_height: u32) -> Vec<TextObservation> {
    let mut lines: BTreeMap<(i32, i32, i32), Vec<WordBox>> = BTreeMap::new();
    for word in words
        .into_iter()
        .filter(|w| !w.text.trim().is_empty() && w.confidence >= 0.0)
    {
        lines
            .entry((word.block, word.paragraph, word.line))
            .or_default()
            .push(word);
    }

    lines
        .into_values()
        .map(|mut words| {
            words.sort_by_key(|w| w.word);

            let text = words
                .iter()
                .map(|w| w.text.trim())
                .collect::<Vec<_>>()
                .join(" ");
            let confidence =
                words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32 / 100.0;

            let corners: Vec<(i32, i32)> = words
                .iter()
                .flat_map(|w| [(w.left, w.top), (w.left + w.width, w.top + w.height)])
                .collect();

            TextObservation {
                candidates: vec![TextCandidate { text, confidence }],
                bounding_box: NormalizedRect::enclosing_pixels(&corners, image_width, image_height),
            }
        })
        .collect()
}
