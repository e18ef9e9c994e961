use crate::{
    api::{client::ApiClient, BoardApi, ProjectApi},
    domain::{
        Board, BoardBundle, BoardId, BoardList, Card, CardId, CardPatch, Column, ColumnId,
        ColumnPatch, NewBoard, NewCard, NewColumn, PositionUpdate, Project, ProjectId,
        ProjectList, ProjectQuery,
    },
    error::{BoardError, Result},
};
use async_trait::async_trait;
use serde_json::json;

/// [`BoardApi`] and [`ProjectApi`] over the REST backend
pub struct HttpBoardApi {
    client: ApiClient,
}

impl HttpBoardApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

/// Turns a 404 on a single-entity read into `NotFound`
fn not_found_as(what: String) -> impl FnOnce(BoardError) -> BoardError {
    move |err| match err {
        BoardError::RequestFailed { status: 404 } => BoardError::NotFound(what),
        other => other,
    }
}

#[async_trait]
impl BoardApi for HttpBoardApi {
    async fn list_boards(&self) -> Result<BoardList> {
        self.client.get_json("/api/boards").await
    }

    async fn list_project_boards(&self, project_id: &ProjectId) -> Result<BoardList> {
        self.client
            .get_json(&format!("/api/projects/{}/boards", project_id))
            .await
    }

    async fn get_board(&self, id: &BoardId) -> Result<BoardBundle> {
        self.client
            .get_json(&format!("/api/boards/{}", id))
            .await
            .map_err(not_found_as(format!("board {}", id)))
    }

    async fn create_board(&self, body: &NewBoard) -> Result<Board> {
        self.client.post_json("/api/boards", body).await
    }

    async fn rename_board(&self, id: &BoardId, name: &str) -> Result<()> {
        self.client
            .patch(&format!("/api/boards/{}", id), &json!({ "name": name }))
            .await
    }

    async fn delete_board(&self, id: &BoardId) -> Result<()> {
        self.client.delete(&format!("/api/boards/{}", id)).await
    }

    async fn create_column(&self, body: &NewColumn) -> Result<Column> {
        self.client.post_json("/api/columns", body).await
    }

    async fn update_column(&self, id: &ColumnId, patch: &ColumnPatch) -> Result<()> {
        self.client
            .patch(&format!("/api/columns/{}", id), patch)
            .await
    }

    async fn delete_column(&self, id: &ColumnId) -> Result<()> {
        self.client.delete(&format!("/api/columns/{}", id)).await
    }

    async fn create_card(&self, body: &NewCard) -> Result<Card> {
        self.client.post_json("/api/cards", body).await
    }

    async fn update_card(&self, id: &CardId, patch: &CardPatch) -> Result<()> {
        self.client.patch(&format!("/api/cards/{}", id), patch).await
    }

    async fn delete_card(&self, id: &CardId) -> Result<()> {
        self.client.delete(&format!("/api/cards/{}", id)).await
    }

    async fn reorder_cards(&self, updates: &[PositionUpdate]) -> Result<()> {
        self.client
            .patch("/api/cards/reorder", &json!({ "updates": updates }))
            .await
    }

    async fn reorder_columns(&self, updates: &[PositionUpdate]) -> Result<()> {
        self.client
            .patch("/api/columns/reorder", &json!({ "updates": updates }))
            .await
    }
}

#[async_trait]
impl ProjectApi for HttpBoardApi {
    async fn list_projects(&self, query: &ProjectQuery) -> Result<ProjectList> {
        self.client
            .get_json_query("/api/projects", &query.to_pairs())
            .await
    }

    async fn get_project(&self, id: &ProjectId) -> Result<Project> {
        self.client
            .get_json(&format!("/api/projects/{}", id))
            .await
            .map_err(not_found_as(format!("project {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_mapping() {
        let map = not_found_as("board b1".to_string());
        assert_eq!(
            map(BoardError::RequestFailed { status: 404 }),
            BoardError::NotFound("board b1".to_string())
        );

        let map = not_found_as("board b1".to_string());
        assert_eq!(
            map(BoardError::RequestFailed { status: 500 }),
            BoardError::RequestFailed { status: 500 }
        );
    }
}
