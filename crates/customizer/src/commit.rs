use crate::record::CustomizationRecord;
use crate::validation::{validate_for_commit, CustomizationData, StaleKey};
use brandkit_core::{BrandkitResult, StalePolicy, TemplateContentSchema, TemplateDescriptor, UserId};
use brandkit_storage::{CreateCustomizedTemplate, CustomizedTemplateId, CustomizedTemplateRepository};
use tracing::{info, warn};

/// Who is committing what: everything the creation request needs besides
/// the customization itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitContext {
    pub user_id: UserId,
    pub original_template_id: String,
    pub platform: String,
    pub template_type: String,
    pub name: String,
}

impl CommitContext {
    /// Context for a template, named `"{title} - {suffix}"`.
    pub fn for_template(user_id: UserId, template: &TemplateDescriptor, suffix: &str) -> Self {
        Self {
            user_id,
            original_template_id: template.id.clone(),
            platform: template.platform.clone(),
            template_type: template.template_type.clone(),
            name: format!("{} - {suffix}", template.title),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    pub id: CustomizedTemplateId,
    pub name: String,
    pub data: CustomizationData,
    pub dropped: Vec<StaleKey>,
}

/// Validate `record` against `schema` and hand it to the repository as a
/// single immutable creation request.
pub async fn commit(
    record: &CustomizationRecord,
    schema: &TemplateContentSchema,
    context: &CommitContext,
    repository: &dyn CustomizedTemplateRepository,
    policy: StalePolicy,
) -> BrandkitResult<CommitOutcome> {
    let validation = validate_for_commit(record, schema, policy)?;
    for key in &validation.dropped {
        warn!(
            user_id = %context.user_id,
            template_id = %context.original_template_id,
            stale = %key,
            "dropping stale customization key"
        );
    }

    let request = CreateCustomizedTemplate {
        user_id: context.user_id.clone(),
        original_template_id: context.original_template_id.clone(),
        name: context.name.clone(),
        platform: context.platform.clone(),
        template_type: context.template_type.clone(),
        customization_data: validation.data.to_json()?,
    };
    let id = repository.create(request).await?;

    metrics::counter!("customizer.commit").increment(1);
    if !validation.dropped.is_empty() {
        metrics::counter!("customizer.stale_keys_dropped").increment(validation.dropped.len() as u64);
    }
    info!(
        id = %id,
        user_id = %context.user_id,
        template_id = %context.original_template_id,
        texts = validation.data.custom_texts.len(),
        images = validation.data.custom_images.len(),
        "customization committed"
    );

    Ok(CommitOutcome {
        id,
        name: context.name.clone(),
        data: validation.data,
        dropped: validation.dropped,
    })
}
