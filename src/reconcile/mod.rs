//! Document ingestion reconciliation engine.
//!
//! `matcher` and `plan` are pure; `session` holds the per-upload state
//! machine, `validate` the step gates and submission rules, and `store` the
//! in-memory session map. The async orchestration (extraction call,
//! auto-creates, catalog refresh) lives in the route layer and drives these
//! pieces in a fixed order.

pub mod matcher;
pub mod plan;
pub mod session;
pub mod store;
pub mod validate;

pub use session::{SessionPhase, UploadSession};
pub use store::SessionStore;
