//! Brand profile store: one profile per user, loaded once per session and
//! used to seed every template customization.

pub mod store;

pub use store::BrandProfileStore;
