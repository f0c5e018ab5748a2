use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog has no {0} entries")]
    Empty(&'static str),
    #[error("duplicate {category} label: {label}")]
    DuplicateLabel { category: &'static str, label: String },
    #[error("invalid word bounds {min}-{max}: both must be positive and min <= max")]
    InvalidBounds { min: u32, max: u32 },
}

/// Inclusive target word-count range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawBounds", into = "RawBounds")]
pub struct LengthBounds {
    min_words: u32,
    max_words: u32,
}

#[derive(Serialize, Deserialize)]
struct RawBounds {
    min_words: u32,
    max_words: u32,
}

impl TryFrom<RawBounds> for LengthBounds {
    type Error = CatalogError;
    fn try_from(raw: RawBounds) -> Result<Self, Self::Error> {
        Self::new(raw.min_words, raw.max_words)
    }
}

impl From<LengthBounds> for RawBounds {
    fn from(b: LengthBounds) -> Self {
        Self { min_words: b.min_words, max_words: b.max_words }
    }
}

impl LengthBounds {
    pub fn new(min_words: u32, max_words: u32) -> Result<Self, CatalogError> {
        if min_words == 0 || min_words > max_words {
            return Err(CatalogError::InvalidBounds { min: min_words, max: max_words });
        }
        Ok(Self { min_words, max_words })
    }

    pub fn min_words(&self) -> u32 { self.min_words }
    pub fn max_words(&self) -> u32 { self.max_words }
}

impl fmt::Display for LengthBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min_words, self.max_words)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DescribedOption {
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LengthOption {
    pub label: String,
    pub bounds: LengthBounds,
}

/// Label lookup tables for content types, tones and target lengths.
/// Lists keep their configured order, which is also display order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    pub content_types: Vec<DescribedOption>,
    pub tones: Vec<DescribedOption>,
    pub lengths: Vec<LengthOption>,
}

fn described(label: &str, description: &str) -> DescribedOption {
    DescribedOption { label: label.into(), description: description.into() }
}

fn length(label: &str, min: u32, max: u32) -> LengthOption {
    LengthOption { label: label.into(), bounds: LengthBounds { min_words: min, max_words: max } }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            content_types: vec![
                described("Blog Post", "Long-form, SEO-friendly, informative content"),
                described("Product Description", "Sales-focused, concise, persuasive copy"),
                described("Social Media", "Short, attention-grabbing, engagement-focused"),
                described("Email", "Professional, clear, action-oriented"),
                described("Creative Writing", "Narrative-driven, original, flowing story"),
            ],
            tones: vec![
                described("Professional", "Suitable for business, serious and trustworthy"),
                described("Friendly", "Warm, relaxed and approachable"),
                described("Formal", "Corporate, serious and authoritative"),
                described("Creative", "Original, distinctive and inspiring"),
                described("Informative", "Educational, explanatory and clear"),
            ],
            lengths: vec![
                length("Short", 100, 200),
                length("Medium", 300, 500),
                length("Long", 600, 1000),
            ],
        }
    }
}

impl Catalog {
    pub fn content_type(&self, label: &str) -> Option<&DescribedOption> {
        self.content_types.iter().find(|o| o.label == label)
    }

    pub fn tone(&self, label: &str) -> Option<&DescribedOption> {
        self.tones.iter().find(|o| o.label == label)
    }

    pub fn length(&self, label: &str) -> Option<&LengthOption> {
        self.lengths.iter().find(|o| o.label == label)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        check_labels("content type", self.content_types.iter().map(|o| o.label.as_str()))?;
        check_labels("tone", self.tones.iter().map(|o| o.label.as_str()))?;
        // bounds can only be built through LengthBounds::new or the checked deserializer
        check_labels("length", self.lengths.iter().map(|o| o.label.as_str()))
    }
}

fn check_labels<'a>(category: &'static str, labels: impl Iterator<Item = &'a str>) -> Result<(), CatalogError> {
    let mut seen: Vec<&str> = Vec::new();
    for label in labels {
        if seen.contains(&label) {
            return Err(CatalogError::DuplicateLabel { category, label: label.to_string() });
        }
        seen.push(label);
    }
    if seen.is_empty() {
        return Err(CatalogError::Empty(category));
    }
    Ok(())
}
