//! # Pulseboard Core
//!
//! Board state, data access and the KPI ticker feed for the Pulseboard
//! project dashboard.
//!
//! The board state core applies mutations optimistically and rolls them
//! back when the backend rejects them. Data access goes through the
//! [`BoardApi`] and [`ProjectApi`] traits, so the same state code runs
//! against the REST backend or the in-memory backend used in tests.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod state;
pub mod telemetry;
pub mod ticker;

// Re-export commonly used types
pub use api::{ApiClient, BoardApi, HttpBoardApi, InMemoryBoardApi, ProjectApi, TokenProvider};
pub use config::{ClientConfig, MetricsSource};
pub use domain::{Board, BoardBundle, BoardId, Card, CardId, Column, ColumnId, Project, ProjectId};
pub use error::{BoardError, Result};
pub use state::{BoardState, BoardStore};
pub use ticker::{ProjectTickerDatum, TickerDelta, TickerFeed, TickerSynthesizer};
