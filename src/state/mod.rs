pub mod snapshot;
pub mod store;

pub use snapshot::{BoardState, ColumnView, EntityKey, PendingMutation, RollbackOutcome, Undo};
pub use store::BoardStore;
