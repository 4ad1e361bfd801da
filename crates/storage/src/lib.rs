//! Capability interfaces the brand store and the customizer talk to, plus
//! in-memory implementations backed by DashMap.
//!
//! Production deployments swap the memory implementations for a database and
//! an object store; the traits are the whole contract.

pub mod catalog;
pub mod memory;
pub mod repository;
pub mod upload;

pub use catalog::{StaticTemplateCatalog, TemplateCatalog};
pub use memory::{
    FailureInjector, MemoryBrandProfileRepository, MemoryCustomizedTemplateRepository,
    MemoryObjectStore,
};
pub use repository::{
    BrandProfileRepository, CreateCustomizedTemplate, CustomizedTemplate, CustomizedTemplateId,
    CustomizedTemplateRepository,
};
pub use upload::{ImageUpload, ObjectKey, ObjectKind, UploadCapability};
