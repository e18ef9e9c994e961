use crate::{
    domain::{
        Board, BoardBundle, BoardId, BoardList, Card, CardId, CardPatch, Column, ColumnId,
        ColumnPatch, NewBoard, NewCard, NewColumn, PositionUpdate, Project, ProjectId,
        ProjectList, ProjectQuery,
    },
    error::Result,
};
use async_trait::async_trait;

pub mod client;
pub mod http;
pub mod memory;

pub use client::ApiClient;
pub use http::HttpBoardApi;
pub use memory::InMemoryBoardApi;

/// Data access for boards, columns and cards
#[async_trait]
pub trait BoardApi: Send + Sync {
    /// `GET /api/boards`
    async fn list_boards(&self) -> Result<BoardList>;

    /// `GET /api/projects/{id}/boards`
    async fn list_project_boards(&self, project_id: &ProjectId) -> Result<BoardList>;

    /// `GET /api/boards/{id}`: the board with all of its columns and cards.
    /// Fails with `NotFound` for an unknown board.
    async fn get_board(&self, id: &BoardId) -> Result<BoardBundle>;

    /// `POST /api/boards`
    async fn create_board(&self, body: &NewBoard) -> Result<Board>;

    /// `PATCH /api/boards/{id}`
    async fn rename_board(&self, id: &BoardId, name: &str) -> Result<()>;

    /// `DELETE /api/boards/{id}`
    async fn delete_board(&self, id: &BoardId) -> Result<()>;

    /// `POST /api/columns`; the id is assigned by the server
    async fn create_column(&self, body: &NewColumn) -> Result<Column>;

    /// `PATCH /api/columns/{id}`
    async fn update_column(&self, id: &ColumnId, patch: &ColumnPatch) -> Result<()>;

    /// `DELETE /api/columns/{id}`
    async fn delete_column(&self, id: &ColumnId) -> Result<()>;

    /// `POST /api/cards`; the id is assigned by the server
    async fn create_card(&self, body: &NewCard) -> Result<Card>;

    /// `PATCH /api/cards/{id}`
    async fn update_card(&self, id: &CardId, patch: &CardPatch) -> Result<()>;

    /// `DELETE /api/cards/{id}`
    async fn delete_card(&self, id: &CardId) -> Result<()>;

    /// `PATCH /api/cards/reorder`
    async fn reorder_cards(&self, updates: &[PositionUpdate]) -> Result<()>;

    /// `PATCH /api/columns/reorder`
    async fn reorder_columns(&self, updates: &[PositionUpdate]) -> Result<()>;
}

/// Read access to projects
#[async_trait]
pub trait ProjectApi: Send + Sync {
    /// `GET /api/projects`
    async fn list_projects(&self, query: &ProjectQuery) -> Result<ProjectList>;

    /// `GET /api/projects/{id}`
    async fn get_project(&self, id: &ProjectId) -> Result<Project>;
}

/// Source of bearer tokens.
///
/// Token acquisition itself (SSO, device flow, ...) lives behind this trait.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a bearer token valid for `scopes`
    async fn access_token(&self, scopes: &[String]) -> Result<String>;

    /// Called after the server answered 401/403
    async fn reauthenticate(&self) -> Result<()>;
}

/// A fixed token, e.g. from `PULSEBOARD_API_TOKEN`
#[derive(Debug, Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self, _scopes: &[String]) -> Result<String> {
        Ok(self.token.clone())
    }

    async fn reauthenticate(&self) -> Result<()> {
        tracing::warn!("static token was rejected; set PULSEBOARD_API_TOKEN to a fresh token");
        Ok(())
    }
}
