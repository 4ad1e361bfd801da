//! The in-progress override state for one template instance.
//!
//! Every mutator consumes the record and returns the updated one; nothing here
//! looks at the template schema. Keys that do not match the schema are caught
//! at commit time (see [`crate::validation`]).

use brandkit_core::{BrandProfile, BrandkitError, BrandkitResult, FontFamily, HexColor};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_TEXT_COLOR: &str = "#FFFFFF";
pub const DEFAULT_FONT_SIZE: &str = "16px";

pub const FONT_SIZES: [&str; 8] = ["12px", "14px", "16px", "18px", "20px", "24px", "28px", "32px"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogoPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl LogoPosition {
    pub const ALL: [LogoPosition; 5] = [
        LogoPosition::TopLeft,
        LogoPosition::TopRight,
        LogoPosition::BottomLeft,
        LogoPosition::BottomRight,
        LogoPosition::Center,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogoPosition::TopLeft => "top-left",
            LogoPosition::TopRight => "top-right",
            LogoPosition::BottomLeft => "bottom-left",
            LogoPosition::BottomRight => "bottom-right",
            LogoPosition::Center => "center",
        }
    }
}

impl FromStr for LogoPosition {
    type Err = BrandkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogoPosition::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| BrandkitError::Validation(format!("unknown logo position '{s}'")))
    }
}

impl fmt::Display for LogoPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The scalar (single-valued) fields of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarField {
    BackgroundColor,
    TextColor,
    FontSize,
    FontFamily,
    LogoPosition,
}

impl ScalarField {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarField::BackgroundColor => "backgroundColor",
            ScalarField::TextColor => "textColor",
            ScalarField::FontSize => "fontSize",
            ScalarField::FontFamily => "fontFamily",
            ScalarField::LogoPosition => "logoPosition",
        }
    }

    /// Input check for the UI boundary. The record itself accepts any string;
    /// callers taking free-form input should run it through here first.
    /// Returns the normalised value.
    pub fn validate_input(&self, value: &str) -> BrandkitResult<String> {
        match self {
            ScalarField::BackgroundColor | ScalarField::TextColor => {
                Ok(HexColor::parse(value)?.to_string())
            }
            ScalarField::FontSize => FONT_SIZES
                .iter()
                .find(|s| **s == value)
                .map(|s| s.to_string())
                .ok_or_else(|| BrandkitError::Validation(format!("unknown font size '{value}'"))),
            ScalarField::FontFamily => Ok(value.parse::<FontFamily>()?.to_string()),
            ScalarField::LogoPosition => Ok(value.parse::<LogoPosition>()?.to_string()),
        }
    }
}

impl FromStr for ScalarField {
    type Err = BrandkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backgroundColor" | "background_color" => Ok(ScalarField::BackgroundColor),
            "textColor" | "text_color" => Ok(ScalarField::TextColor),
            "fontSize" | "font_size" => Ok(ScalarField::FontSize),
            "fontFamily" | "font_family" => Ok(ScalarField::FontFamily),
            "logoPosition" | "logo_position" => Ok(ScalarField::LogoPosition),
            other => Err(BrandkitError::Validation(format!("unknown field '{other}'"))),
        }
    }
}

/// Reference to an image placed in a content slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageRef {
    /// Retrievable after the session ends.
    Durable(String),
    /// Only meaningful inside the current editing session; must be uploaded
    /// before the record can be committed.
    Draft(String),
}

impl ImageRef {
    pub fn durable(url: impl Into<String>) -> Self {
        ImageRef::Durable(url.into())
    }

    pub fn draft(local_key: impl Into<String>) -> Self {
        ImageRef::Draft(local_key.into())
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, ImageRef::Draft(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ImageRef::Durable(s) | ImageRef::Draft(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomizationRecord {
    pub background_color: String,
    pub text_color: String,
    pub font_size: String,
    pub font_family: String,
    pub logo_position: String,
    /// Sparse; a missing index means "use the element's placeholder".
    pub custom_texts: BTreeMap<u32, String>,
    pub custom_images: BTreeMap<u32, ImageRef>,
}

impl CustomizationRecord {
    /// Initial record for a brand. Deterministic and infallible.
    pub fn seed(profile: &BrandProfile) -> Self {
        Self {
            background_color: profile.primary_color.to_string(),
            text_color: DEFAULT_TEXT_COLOR.to_string(),
            font_size: DEFAULT_FONT_SIZE.to_string(),
            font_family: profile.font_family.to_string(),
            logo_position: LogoPosition::default().to_string(),
            custom_texts: BTreeMap::new(),
            custom_images: BTreeMap::new(),
        }
    }

    /// Replace exactly one scalar field.
    pub fn set_field(mut self, field: ScalarField, value: impl Into<String>) -> Self {
        let value = value.into();
        match field {
            ScalarField::BackgroundColor => self.background_color = value,
            ScalarField::TextColor => self.text_color = value,
            ScalarField::FontSize => self.font_size = value,
            ScalarField::FontFamily => self.font_family = value,
            ScalarField::LogoPosition => self.logo_position = value,
        }
        self
    }

    pub fn field(&self, field: ScalarField) -> &str {
        match field {
            ScalarField::BackgroundColor => &self.background_color,
            ScalarField::TextColor => &self.text_color,
            ScalarField::FontSize => &self.font_size,
            ScalarField::FontFamily => &self.font_family,
            ScalarField::LogoPosition => &self.logo_position,
        }
    }

    /// Insert or overwrite the text for `index`.
    pub fn set_text(mut self, index: u32, text: impl Into<String>) -> Self {
        self.custom_texts.insert(index, text.into());
        self
    }

    /// Insert or overwrite the image for `index`.
    pub fn set_image(mut self, index: u32, image: ImageRef) -> Self {
        self.custom_images.insert(index, image);
        self
    }

    /// Indices whose image is still a draft.
    pub fn draft_indices(&self) -> Vec<u32> {
        self.custom_images
            .iter()
            .filter(|(_, image)| image.is_draft())
            .map(|(index, _)| *index)
            .collect()
    }
}

impl Default for CustomizationRecord {
    fn default() -> Self {
        Self::seed(&BrandProfile::default())
    }
}
