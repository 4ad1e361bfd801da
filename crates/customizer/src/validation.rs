//! Commit-time shape validation and the persisted form of a record.

use crate::record::{CustomizationRecord, ImageRef};
use brandkit_core::{
    BrandkitError, BrandkitResult, ElementKind, HexColor, StalePolicy, TemplateContentSchema,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A record as it is persisted: colours normalised, only schema-conforming
/// keys, only durable image URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomizationData {
    pub background_color: HexColor,
    pub text_color: HexColor,
    pub font_size: String,
    pub font_family: String,
    pub logo_position: String,
    #[serde(default)]
    pub custom_texts: BTreeMap<u32, String>,
    #[serde(default)]
    pub custom_images: BTreeMap<u32, String>,
}

impl CustomizationData {
    pub fn to_json(&self) -> BrandkitResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: serde_json::Value) -> BrandkitResult<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

impl From<CustomizationData> for CustomizationRecord {
    fn from(data: CustomizationData) -> Self {
        CustomizationRecord {
            background_color: data.background_color.into(),
            text_color: data.text_color.into(),
            font_size: data.font_size,
            font_family: data.font_family,
            logo_position: data.logo_position,
            custom_texts: data.custom_texts,
            custom_images: data
                .custom_images
                .into_iter()
                .map(|(index, url)| (index, ImageRef::Durable(url)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// No element with this index exists.
    Missing,
    /// The element exists but is of the other kind.
    WrongKind(ElementKind),
}

/// A map entry that does not match the template schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleKey {
    /// Which map the key lives in.
    pub map: ElementKind,
    pub index: u32,
    pub reason: StaleReason,
}

impl fmt::Display for StaleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = match self.map {
            ElementKind::Text => "customTexts",
            ElementKind::Image => "customImages",
        };
        match self.reason {
            StaleReason::Missing => write!(f, "{map}[{}]: no such element", self.index),
            StaleReason::WrongKind(actual) => {
                write!(f, "{map}[{}]: element is {actual}", self.index)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitValidation {
    pub data: CustomizationData,
    /// Keys removed under [`StalePolicy::DropAndWarn`].
    pub dropped: Vec<StaleKey>,
}

fn stale_reason(schema: &TemplateContentSchema, index: u32, expected: ElementKind) -> Option<StaleReason> {
    if schema.accepts(index, expected) {
        return None;
    }
    Some(match schema.kind_of(index) {
        Some(actual) => StaleReason::WrongKind(actual),
        None => StaleReason::Missing,
    })
}

/// Check `record` against `schema` and produce its persisted form.
///
/// Order of checks: stale keys (dropped or rejected per `policy`), then
/// unresolved draft images among the surviving keys, then colours. Running it
/// on a record that already conforms drops nothing.
pub fn validate_for_commit(
    record: &CustomizationRecord,
    schema: &TemplateContentSchema,
    policy: StalePolicy,
) -> BrandkitResult<CommitValidation> {
    let mut dropped = Vec::new();

    let mut custom_texts = BTreeMap::new();
    for (&index, text) in &record.custom_texts {
        match stale_reason(schema, index, ElementKind::Text) {
            Some(reason) => dropped.push(StaleKey {
                map: ElementKind::Text,
                index,
                reason,
            }),
            None => {
                custom_texts.insert(index, text.clone());
            }
        }
    }

    let mut images = BTreeMap::new();
    for (&index, image) in &record.custom_images {
        match stale_reason(schema, index, ElementKind::Image) {
            Some(reason) => dropped.push(StaleKey {
                map: ElementKind::Image,
                index,
                reason,
            }),
            None => {
                images.insert(index, image);
            }
        }
    }

    if policy == StalePolicy::Reject && !dropped.is_empty() {
        let indices = |kind: ElementKind| {
            dropped
                .iter()
                .filter(|k| k.map == kind)
                .map(|k| k.index)
                .collect::<Vec<_>>()
        };
        return Err(BrandkitError::StaleReference {
            texts: indices(ElementKind::Text),
            images: indices(ElementKind::Image),
        });
    }

    let drafts: Vec<u32> = images
        .iter()
        .filter(|(_, image)| image.is_draft())
        .map(|(index, _)| *index)
        .collect();
    if !drafts.is_empty() {
        return Err(BrandkitError::Validation(format!(
            "images at indices {drafts:?} are unresolved drafts; upload them before committing"
        )));
    }

    let data = CustomizationData {
        background_color: HexColor::parse(&record.background_color)?,
        text_color: HexColor::parse(&record.text_color)?,
        font_size: record.font_size.clone(),
        font_family: record.font_family.clone(),
        logo_position: record.logo_position.clone(),
        custom_texts,
        custom_images: images
            .into_iter()
            .map(|(index, image)| (index, image.as_str().to_string()))
            .collect(),
    };

    Ok(CommitValidation { data, dropped })
}
