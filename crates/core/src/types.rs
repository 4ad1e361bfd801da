use crate::error::{BrandkitError, BrandkitResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const DEFAULT_PRIMARY_COLOR: &str = "#8B5CF6";
pub const DEFAULT_SECONDARY_COLOR: &str = "#EC4899";

// ─── Identity ───────────────────────────────────────────────────────────────

/// Opaque user identity. Threaded explicitly into every store call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Validate a raw identity. It ends up inside storage keys, so path
    /// separators and whitespace are rejected.
    pub fn parse(raw: impl Into<String>) -> BrandkitResult<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(BrandkitError::Validation("user id is empty".into()));
        }
        if raw.chars().any(|c| c == '/' || c == '\\' || c.is_whitespace()) {
            return Err(BrandkitError::Validation(format!(
                "user id '{raw}' contains a path separator or whitespace"
            )));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = BrandkitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        UserId::parse(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier assigned to a brand profile the first time it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub Uuid);

impl ProfileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProfileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ─── Colors ─────────────────────────────────────────────────────────────────

/// A colour in `#RRGGBB` form, always upper case.
///
/// Parsing accepts either case and expands the `#RGB` shorthand; every other
/// shape is rejected, so a `HexColor` can never hold a malformed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    pub fn parse(raw: &str) -> BrandkitResult<Self> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix('#')
            .filter(|d| d.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| BrandkitError::Validation(format!("'{raw}' is not a hex colour")))?;

        let expanded = match digits.len() {
            6 => digits.to_ascii_uppercase(),
            3 => digits
                .chars()
                .flat_map(|c| [c, c])
                .collect::<String>()
                .to_ascii_uppercase(),
            _ => {
                return Err(BrandkitError::Validation(format!(
                    "'{raw}' is not a hex colour"
                )))
            }
        };
        Ok(Self(format!("#{expanded}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for HexColor {
    type Err = BrandkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HexColor::parse(s)
    }
}

impl TryFrom<String> for HexColor {
    type Error = BrandkitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        HexColor::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Fonts ──────────────────────────────────────────────────────────────────

/// The fonts a brand can choose from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontFamily {
    #[default]
    Inter,
    Roboto,
    Poppins,
    Montserrat,
    #[serde(rename = "Open Sans")]
    OpenSans,
    #[serde(rename = "Playfair Display")]
    PlayfairDisplay,
    Oswald,
    Raleway,
}

impl FontFamily {
    pub const ALL: [FontFamily; 8] = [
        FontFamily::Inter,
        FontFamily::Roboto,
        FontFamily::Poppins,
        FontFamily::Montserrat,
        FontFamily::OpenSans,
        FontFamily::PlayfairDisplay,
        FontFamily::Oswald,
        FontFamily::Raleway,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FontFamily::Inter => "Inter",
            FontFamily::Roboto => "Roboto",
            FontFamily::Poppins => "Poppins",
            FontFamily::Montserrat => "Montserrat",
            FontFamily::OpenSans => "Open Sans",
            FontFamily::PlayfairDisplay => "Playfair Display",
            FontFamily::Oswald => "Oswald",
            FontFamily::Raleway => "Raleway",
        }
    }
}

impl FromStr for FontFamily {
    type Err = BrandkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FontFamily::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| BrandkitError::Validation(format!("unknown font family '{s}'")))
    }
}

impl fmt::Display for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Brand profile ──────────────────────────────────────────────────────────

/// Per-user default visual identity. Exactly one per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ProfileId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    pub primary_color: HexColor,
    pub secondary_color: HexColor,
    #[serde(default)]
    pub font_family: FontFamily,
}

impl Default for BrandProfile {
    fn default() -> Self {
        Self {
            id: None,
            logo_url: None,
            primary_color: HexColor(DEFAULT_PRIMARY_COLOR.to_string()),
            secondary_color: HexColor(DEFAULT_SECONDARY_COLOR.to_string()),
            font_family: FontFamily::Inter,
        }
    }
}

impl BrandProfile {
    /// Shallow merge: every field set in `update` replaces the current value,
    /// every unset field keeps it. The identifier is never touched.
    pub fn merged(&self, update: &BrandProfileUpdate) -> BrandProfile {
        BrandProfile {
            id: self.id,
            logo_url: update.logo_url.clone().or_else(|| self.logo_url.clone()),
            primary_color: update
                .primary_color
                .clone()
                .unwrap_or_else(|| self.primary_color.clone()),
            secondary_color: update
                .secondary_color
                .clone()
                .unwrap_or_else(|| self.secondary_color.clone()),
            font_family: update.font_family.unwrap_or(self.font_family),
        }
    }
}

/// A partial brand profile; `None` means "keep the current value".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandProfileUpdate {
    pub logo_url: Option<String>,
    pub primary_color: Option<HexColor>,
    pub secondary_color: Option<HexColor>,
    pub font_family: Option<FontFamily>,
}

impl BrandProfileUpdate {
    pub fn logo(url: impl Into<String>) -> Self {
        Self {
            logo_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// ─── Template content schema ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Image,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Text => f.write_str("text"),
            ElementKind::Image => f.write_str("image"),
        }
    }
}

/// One addressable slot of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentElement {
    pub index: u32,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl ContentElement {
    pub fn text(index: u32, placeholder: impl Into<String>) -> Self {
        Self {
            index,
            kind: ElementKind::Text,
            placeholder: Some(placeholder.into()),
        }
    }

    pub fn image(index: u32) -> Self {
        Self {
            index,
            kind: ElementKind::Image,
            placeholder: None,
        }
    }
}

/// Ordered, read-only slot description of a template. Indices are unique.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawSchema")]
pub struct TemplateContentSchema {
    elements: Vec<ContentElement>,
}

#[derive(Deserialize)]
struct RawSchema {
    #[serde(default)]
    elements: Vec<ContentElement>,
}

impl TryFrom<RawSchema> for TemplateContentSchema {
    type Error = BrandkitError;

    fn try_from(raw: RawSchema) -> Result<Self, Self::Error> {
        TemplateContentSchema::new(raw.elements)
    }
}

impl TemplateContentSchema {
    pub fn new(elements: Vec<ContentElement>) -> BrandkitResult<Self> {
        let mut seen = HashSet::with_capacity(elements.len());
        for element in &elements {
            if !seen.insert(element.index) {
                return Err(BrandkitError::Validation(format!(
                    "duplicate element index {} in content schema",
                    element.index
                )));
            }
        }
        Ok(Self { elements })
    }

    pub fn elements(&self) -> &[ContentElement] {
        &self.elements
    }

    pub fn element(&self, index: u32) -> Option<&ContentElement> {
        self.elements.iter().find(|e| e.index == index)
    }

    pub fn kind_of(&self, index: u32) -> Option<ElementKind> {
        self.element(index).map(|e| e.kind)
    }

    pub fn accepts(&self, index: u32, kind: ElementKind) -> bool {
        self.kind_of(index) == Some(kind)
    }
}

/// Catalog entry for a template, as returned by the template schema source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDescriptor {
    pub id: String,
    pub title: String,
    pub description: String,
    pub platform: String,
    #[serde(rename = "type")]
    pub template_type: String,
    pub category: String,
    #[serde(default)]
    pub premium: bool,
    pub content_structure: TemplateContentSchema,
}
