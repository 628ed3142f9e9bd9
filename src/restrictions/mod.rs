//! Restriction storage
//!
//! Restrictions are rectangles that hide part of a document page from a
//! subject user or role. They live in a backing service (REST) or a local
//! SQLite database and are normalized into [`Restriction`] on read.

mod backend;
mod error;
mod sqlite;
mod store;
mod templates;
mod types;

pub use backend::{HttpRestrictionBackend, RestrictionBackend};
pub use error::{RestrictionError, RestrictionResult};
pub use sqlite::{create_pool, initialize_schema, SqliteRestrictionBackend};
pub use store::{validate, RestrictionStore};
pub use templates::{
    HttpTemplateDirectory, StaticTemplateDirectory, TemplateCache, TemplateDirectory, TemplateError,
};
pub use types::{
    parse_persisted_list, restrictions_for_view, NewRestriction, PersistedRestriction, Restriction,
    RestrictionKind, Viewer,
};
