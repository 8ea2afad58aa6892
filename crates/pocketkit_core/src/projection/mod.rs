//! View-model building blocks.
//!
//! # Responsibility
//! - Hold UI-facing snapshots and keep them fresh from store signals.
//! - Provide pure client-side filters over snapshots.
//! - Run cancellable background work: debounced search and periodic ticks.
//!
//! # Invariants
//! - Snapshots are immutable `Arc`s; a reload swaps the pointer.
//! - Background handlers hold weak references so dropping a view-model
//!   tears its subscription and worker down.

mod filter;
mod live;
mod search;
mod ticker;

pub use filter::{FlagFilter, Filterable, ProjectionFilter};
pub use live::LiveProjection;
pub use search::DebouncedSearch;
pub use ticker::Ticker;
