//! Read-only template schema source.

use brandkit_core::{
    BrandkitResult, ContentElement, TemplateContentSchema, TemplateDescriptor,
};
use std::collections::BTreeMap;

pub trait TemplateCatalog: Send + Sync {
    fn get(&self, template_id: &str) -> Option<TemplateDescriptor>;

    /// All templates ordered by id.
    fn list(&self) -> Vec<TemplateDescriptor>;
}

/// Catalog over a fixed set of templates.
#[derive(Debug, Clone, Default)]
pub struct StaticTemplateCatalog {
    templates: BTreeMap<String, TemplateDescriptor>,
}

impl StaticTemplateCatalog {
    pub fn new(templates: impl IntoIterator<Item = TemplateDescriptor>) -> Self {
        Self {
            templates: templates.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    /// Parse a JSON array of template descriptors.
    pub fn from_json(json: &str) -> BrandkitResult<Self> {
        let templates: Vec<TemplateDescriptor> = serde_json::from_str(json)?;
        Ok(Self::new(templates))
    }

    /// The templates shipped with the application.
    pub fn builtin() -> BrandkitResult<Self> {
        Ok(Self::new([
            descriptor(
                "instagram-promo-post",
                "Promo Post",
                "Square announcement post with headline, product shot and call to action",
                "Instagram",
                "post",
                "promotion",
                false,
                vec![
                    ContentElement::text(0, "Big announcement headline"),
                    ContentElement::image(1),
                    ContentElement::text(2, "Shop now"),
                ],
            )?,
            descriptor(
                "instagram-story-quote",
                "Quote Story",
                "Vertical story with a single quote over a background image",
                "Instagram",
                "story",
                "engagement",
                false,
                vec![ContentElement::image(0), ContentElement::text(1, "Your quote here")],
            )?,
            descriptor(
                "facebook-event-cover",
                "Event Cover",
                "Wide event cover with title, date line and hero image",
                "Facebook",
                "cover",
                "events",
                true,
                vec![
                    ContentElement::text(0, "Event title"),
                    ContentElement::text(1, "Date and venue"),
                    ContentElement::image(2),
                ],
            )?,
            descriptor(
                "linkedin-hiring-post",
                "We're Hiring",
                "Recruiting post with role, perks and team photo",
                "LinkedIn",
                "post",
                "recruiting",
                true,
                vec![
                    ContentElement::text(0, "Role title"),
                    ContentElement::text(1, "Why join us"),
                    ContentElement::image(2),
                    ContentElement::image(3),
                ],
            )?,
        ]))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateCatalog for StaticTemplateCatalog {
    fn get(&self, template_id: &str) -> Option<TemplateDescriptor> {
        self.templates.get(template_id).cloned()
    }

    fn list(&self) -> Vec<TemplateDescriptor> {
        self.templates.values().cloned().collect()
    }
}

#[allow(clippy::too_many_arguments)]
fn descriptor(
    id: &str,
    title: &str,
    description: &str,
    platform: &str,
    template_type: &str,
    category: &str,
    premium: bool,
    elements: Vec<ContentElement>,
) -> BrandkitResult<TemplateDescriptor> {
    Ok(TemplateDescriptor {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        platform: platform.to_string(),
        template_type: template_type.to_string(),
        category: category.to_string(),
        premium,
        content_structure: TemplateContentSchema::new(elements)?,
    })
}
