//! Domain services.
//!
//! - [`PaginationEngine`] serves every paginated search, in cursor or offset mode
//! - [`CursorCodec`] owns the continuation token format
//! - [`reconcile`] and [`AssociationSyncCoordinator`] keep many-to-many links in sync

mod association;
mod cursor;
mod pagination;

pub use association::{
    AssociationDelta, AssociationFailure, AssociationSyncCoordinator, SyncOutcome, reconcile,
};
pub use cursor::{CursorCodec, CursorError, MAX_CURSOR_TOKEN_LEN};
pub use pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PaginationConfig, PaginationEngine};
