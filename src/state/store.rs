use crate::{
    api::{BoardApi, ProjectApi},
    domain::{
        Board, BoardId, Card, CardFields, CardId, CardPatch, Column, ColumnId, ColumnPatch,
        DragMachine, DragPhase, DropTarget, Project,
    },
    error::{BoardError, Result},
    state::snapshot::{BoardState, ColumnView, PendingMutation},
};
use std::sync::Arc;

/// Board state core: owns the open board's snapshot and keeps it in step
/// with the backend.
///
/// Creates are write-after (the server assigns ids). Every other mutation is
/// applied locally first and reverted to the captured prior value if the
/// server rejects it. Errors are returned to the caller as-is; nothing is
/// retried.
pub struct BoardStore<A: ?Sized> {
    api: Arc<A>,
    state: BoardState,
    drag: DragMachine,
}

impl<A: BoardApi + ?Sized> BoardStore<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            state: BoardState::new(),
            drag: DragMachine::new(),
        }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn board(&self) -> Option<&Board> {
        self.state.board()
    }

    /// Columns left to right
    pub fn columns(&self) -> Vec<&Column> {
        self.state.ordered_columns()
    }

    pub fn cards(&self) -> &[Card] {
        self.state.cards()
    }

    pub fn column_view(&self, column_id: &ColumnId) -> Vec<&Card> {
        self.state.column_view(column_id)
    }

    pub fn column_views(&self) -> Vec<ColumnView<'_>> {
        self.state.column_views()
    }

    /// (columns, cards)
    pub fn counts(&self) -> (usize, usize) {
        self.state.counts()
    }

    /// Fetches the board with its columns and cards and replaces the
    /// snapshot. On failure the previous snapshot is kept.
    pub async fn load_board(&mut self, board_id: &BoardId) -> Result<()> {
        let bundle = self.api.get_board(board_id).await.map_err(|err| {
            tracing::warn!(board_id = %board_id, error = %err, "failed to load board");
            match err {
                BoardError::RequestFailed { status: 404 } => {
                    BoardError::NotFound(format!("board {}", board_id))
                }
                other => other,
            }
        })?;

        tracing::info!(
            board_id = %board_id,
            columns = bundle.columns.len(),
            cards = bundle.cards.len(),
            "board loaded"
        );
        self.state.replace(bundle);
        Ok(())
    }

    /// Fetches the project the open board belongs to, if any
    pub async fn linked_project<P>(&self, projects: &P) -> Result<Option<Project>>
    where
        P: ProjectApi + ?Sized,
    {
        match self.board().and_then(|b| b.project_id.clone()) {
            Some(project_id) => Ok(Some(projects.get_project(&project_id).await?)),
            None => Ok(None),
        }
    }

    /// Creates a column at the right edge of the board
    pub async fn create_column(&mut self, title: &str) -> Result<Column> {
        let body = self.state.prepare_new_column(title)?;
        let column = self.api.create_column(&body).await?;
        if !self.state.insert_column(column.clone()) {
            tracing::debug!(column_id = %column.id, "created column belongs to another board");
        }
        Ok(column)
    }

    pub async fn rename_column(&mut self, column_id: &ColumnId, title: &str) -> Result<()> {
        let pending = self.state.begin_rename_column(column_id, title)?;
        let patch = ColumnPatch::title(title.trim());
        let result = self.api.update_column(column_id, &patch).await;
        self.settle(pending, result)
    }

    /// Removes the column and its cards locally, then on the server
    pub async fn delete_column(&mut self, column_id: &ColumnId) -> Result<()> {
        let pending = self.state.begin_delete_column(column_id)?;
        let result = self.api.delete_column(column_id).await;
        self.settle(pending, result)
    }

    /// Creates a card at the bottom of `column_id`
    pub async fn create_card(
        &mut self,
        column_id: &ColumnId,
        title: &str,
        fields: CardFields,
    ) -> Result<Card> {
        let body = self.state.prepare_new_card(column_id, title, fields)?;
        let card = self.api.create_card(&body).await?;
        if !self.state.insert_card(card.clone()) {
            tracing::debug!(card_id = %card.id, "created card's column is gone");
        }
        Ok(card)
    }

    /// Moves a card to the bottom of `destination`
    pub async fn move_card(&mut self, card_id: &CardId, destination: &ColumnId) -> Result<()> {
        let (pending, patch) = self.state.begin_move_card(card_id, destination)?;
        tracing::debug!(
            card_id = %card_id,
            destination = %destination,
            position = patch.position,
            "moving card"
        );
        let result = self.api.update_card(card_id, &patch).await;
        self.settle(pending, result)
    }

    pub async fn update_card(&mut self, card_id: &CardId, patch: &CardPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let mut patch = patch.clone();
        if let Some(title) = patch.title.as_mut() {
            *title = title.trim().to_string();
        }
        let pending = self.state.begin_update_card(card_id, &patch)?;
        let result = self.api.update_card(card_id, &patch).await;
        self.settle(pending, result)
    }

    pub async fn delete_card(&mut self, card_id: &CardId) -> Result<()> {
        let pending = self.state.begin_delete_card(card_id)?;
        let result = self.api.delete_card(card_id).await;
        self.settle(pending, result)
    }

    pub async fn rename_board(&mut self, name: &str) -> Result<()> {
        let pending = self.state.begin_rename_board(name)?;
        let board_id = self
            .board()
            .map(|b| b.id.clone())
            .ok_or_else(|| BoardError::Validation("no board is loaded".to_string()))?;
        let result = self.api.rename_board(&board_id, name.trim()).await;
        self.settle(pending, result)
    }

    /// Renumbers the columns in the given left-to-right order
    pub async fn reorder_columns(&mut self, order: &[ColumnId]) -> Result<()> {
        let (pending, updates) = self.state.begin_reorder_columns(order)?;
        let result = self.api.reorder_columns(&updates).await;
        self.settle(pending, result)
    }

    pub fn drag_phase(&self) -> &DragPhase {
        self.drag.phase()
    }

    /// Pointer went down on a card
    pub fn start_drag(&mut self, card_id: CardId) {
        self.drag.pointer_down(card_id);
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    /// Pointer released over drop zone `over`.
    ///
    /// Drop zones are columns: the card goes to the bottom of the column,
    /// wherever in it the pointer was released. Returns `Ok(None)` when the
    /// drop resolves to no known column or card.
    pub async fn drop_on(&mut self, over: Option<&str>) -> Result<Option<DropTarget>> {
        let Some(target) = self
            .drag
            .drop_over(over, self.state.columns(), self.state.cards())
        else {
            return Ok(None);
        };

        match self.move_card(&target.card_id, &target.destination).await {
            Ok(()) => {
                self.drag.resolve_success(&target.card_id);
                Ok(Some(target))
            }
            Err(err) => {
                self.drag.resolve_failure(&target.card_id, err.clone());
                Err(err)
            }
        }
    }

    fn settle(&mut self, pending: PendingMutation, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.state.commit(pending);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "server rejected change; rolling back");
                self.state.rollback(pending);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::InMemoryBoardApi,
        domain::{
            project::OwnerRef, Board, BoardBundle, Card, Column, Label, NewBoard, ProjectId,
            ProjectStatus,
        },
    };

    fn column(id: &str, position: i64) -> Column {
        Column {
            id: ColumnId::from(id),
            board_id: BoardId::from("b1"),
            title: id.to_uppercase(),
            position,
        }
    }

    /// Two columns c1/c2, cards t1 and t2 in c1
    async fn loaded() -> (Arc<InMemoryBoardApi>, BoardStore<InMemoryBoardApi>) {
        let api = Arc::new(InMemoryBoardApi::with_bundle(BoardBundle {
            board: Board {
                id: BoardId::from("b1"),
                name: "Roadmap".into(),
                project_id: Some(ProjectId::from("p1")),
                description: None,
            },
            columns: vec![column("c1", 1), column("c2", 2)],
            cards: vec![
                Card::new("t1", "c1", "First", 1),
                Card::new("t2", "c1", "Second", 2),
            ],
        }));
        let mut store = BoardStore::new(api.clone());
        store.load_board(&BoardId::from("b1")).await.unwrap();
        (api, store)
    }

    fn view(store: &BoardStore<InMemoryBoardApi>, column: &str) -> Vec<String> {
        store
            .state()
            .column_view(&ColumnId::from(column))
            .iter()
            .map(|c| c.id.to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_column_views_match_card_set() {
        let (_, store) = loaded().await;
        for view in store.state().column_views() {
            let expected: Vec<&Card> = store
                .state()
                .cards()
                .iter()
                .filter(|c| c.column_id == view.column.id)
                .collect();
            assert_eq!(view.cards.len(), expected.len());
            assert!(view.cards.windows(2).all(|w| w[0].position <= w[1].position));
        }
    }

    #[tokio::test]
    async fn test_move_card_success() {
        let (api, mut store) = loaded().await;
        store
            .move_card(&CardId::from("t1"), &ColumnId::from("c2"))
            .await
            .unwrap();

        let t1 = store.state().card(&CardId::from("t1")).unwrap();
        assert_eq!(t1.column_id, "c2");
        assert_eq!(t1.position, 1);
        assert_eq!(view(&store, "c1"), vec!["t2"]);

        let t2 = store.state().card(&CardId::from("t2")).unwrap();
        assert_eq!((t2.column_id.as_str(), t2.position), ("c1", 2));

        let stored = api.stored_bundle(&BoardId::from("b1")).unwrap();
        let server_t1 = stored.cards.iter().find(|c| c.id == "t1").unwrap();
        assert_eq!(server_t1.column_id, "c2");
    }

    #[tokio::test]
    async fn test_move_card_appends_after_existing_cards() {
        let (_, mut store) = loaded().await;
        store
            .create_card(&ColumnId::from("c2"), "Existing", CardFields::default())
            .await
            .unwrap();
        store
            .move_card(&CardId::from("t2"), &ColumnId::from("c2"))
            .await
            .unwrap();
        let t2 = store.state().card(&CardId::from("t2")).unwrap();
        assert_eq!(t2.position, 2);
    }

    #[tokio::test]
    async fn test_move_card_failure_rolls_back_exactly() {
        let (api, mut store) = loaded().await;
        let before = store.state().to_bundle().unwrap();

        api.fail_writes(Some(BoardError::from_status(500)));
        let err = store
            .move_card(&CardId::from("t1"), &ColumnId::from("c2"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "request_failed_500");
        assert_eq!(store.state().to_bundle().unwrap(), before);
        let t1 = store.state().card(&CardId::from("t1")).unwrap();
        assert_eq!((t1.column_id.as_str(), t1.position), ("c1", 1));
        assert_eq!(view(&store, "c1"), vec!["t1", "t2"]);
    }

    #[tokio::test]
    async fn test_create_card_with_blank_title_makes_no_request() {
        let (api, mut store) = loaded().await;
        let requests = api.request_count();

        let err = store
            .create_card(&ColumnId::from("c1"), "  ", CardFields::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));

        let err = store
            .create_card(&ColumnId::from("nope"), "Title", CardFields::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::Validation(_)));

        assert_eq!(api.request_count(), requests);
    }

    #[tokio::test]
    async fn test_first_card_in_new_column_gets_position_one() {
        let (_, mut store) = loaded().await;
        let column = store.create_column("Review").await.unwrap();
        assert_eq!(column.position, 3);
        assert!(store.state().column(&column.id).is_some());

        let fields = CardFields {
            labels: vec![Label::new("qa", "#0af")],
            ..CardFields::default()
        };
        let card = store.create_card(&column.id, "Check", fields).await.unwrap();
        assert_eq!(card.position, 1);
        assert_eq!(card.labels.len(), 1);
        assert_eq!(store.state().column_view(&column.id).len(), 1);
    }

    #[tokio::test]
    async fn test_create_failure_leaves_state_unchanged() {
        let (api, mut store) = loaded().await;
        let before = store.state().to_bundle().unwrap();
        api.fail_writes(Some(BoardError::Network("offline".into())));

        assert!(store.create_column("Review").await.is_err());
        assert!(store
            .create_card(&ColumnId::from("c1"), "New", CardFields::default())
            .await
            .is_err());
        assert_eq!(store.state().to_bundle().unwrap(), before);
    }

    #[tokio::test]
    async fn test_delete_column_removes_its_cards() {
        let (api, mut store) = loaded().await;
        store.delete_column(&ColumnId::from("c1")).await.unwrap();

        assert!(store.state().column(&ColumnId::from("c1")).is_none());
        assert!(store.state().card(&CardId::from("t1")).is_none());
        assert!(store.state().card(&CardId::from("t2")).is_none());
        assert_eq!(store.state().counts(), (1, 0));
        assert!(api
            .stored_bundle(&BoardId::from("b1"))
            .unwrap()
            .cards
            .is_empty());
    }

    #[tokio::test]
    async fn test_rename_and_delete_roll_back_on_failure() {
        let (api, mut store) = loaded().await;
        let before = store.state().to_bundle().unwrap();
        api.fail_writes(Some(BoardError::from_status(503)));

        assert!(store
            .rename_column(&ColumnId::from("c1"), "Backlog")
            .await
            .is_err());
        assert!(store.delete_column(&ColumnId::from("c1")).await.is_err());
        assert!(store.delete_card(&CardId::from("t2")).await.is_err());
        assert!(store.rename_board("Renamed").await.is_err());

        assert_eq!(store.state().to_bundle().unwrap(), before);
    }

    #[tokio::test]
    async fn test_rename_column_success() {
        let (api, mut store) = loaded().await;
        store
            .rename_column(&ColumnId::from("c2"), " Done ")
            .await
            .unwrap();
        assert_eq!(store.state().column(&ColumnId::from("c2")).unwrap().title, "Done");
        let stored = api.stored_bundle(&BoardId::from("b1")).unwrap();
        assert!(stored.columns.iter().any(|c| c.title == "Done"));
    }

    #[tokio::test]
    async fn test_update_card_applies_patch() {
        let (_, mut store) = loaded().await;
        let patch = CardPatch {
            description: Some("details".into()),
            assignees: Some(vec!["Alice".into()]),
            ..CardPatch::default()
        };
        store.update_card(&CardId::from("t1"), &patch).await.unwrap();
        let t1 = store.state().card(&CardId::from("t1")).unwrap();
        assert_eq!(t1.description.as_deref(), Some("details"));
        assert_eq!(t1.assignees, vec!["Alice".to_string()]);
    }

    #[tokio::test]
    async fn test_update_card_sends_trimmed_title() {
        let (api, mut store) = loaded().await;
        let patch = CardPatch {
            title: Some("  Polished  ".into()),
            ..CardPatch::default()
        };
        store.update_card(&CardId::from("t2"), &patch).await.unwrap();

        assert_eq!(store.state().card(&CardId::from("t2")).unwrap().title, "Polished");
        let stored = api.stored_bundle(&BoardId::from("b1")).unwrap();
        let server_t2 = stored.cards.iter().find(|c| c.id == "t2").unwrap();
        assert_eq!(server_t2.title, "Polished");
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_snapshot() {
        let (api, mut store) = loaded().await;
        let before = store.state().to_bundle().unwrap();

        let err = store.load_board(&BoardId::from("missing")).await.unwrap_err();
        assert_eq!(err, BoardError::NotFound("board missing".to_string()));

        api.fail_reads(Some(BoardError::Network("down".into())));
        let err = store.load_board(&BoardId::from("b1")).await.unwrap_err();
        assert!(matches!(err, BoardError::Network(_)));

        assert_eq!(store.state().to_bundle().unwrap(), before);
    }

    #[tokio::test]
    async fn test_load_replaces_snapshot() {
        let (api, mut store) = loaded().await;
        let other = api
            .create_board(&NewBoard {
                name: "Other".into(),
                project_id: None,
                description: None,
            })
            .await
            .unwrap();
        store.load_board(&other.id).await.unwrap();
        assert_eq!(store.board().unwrap().name, "Other");
        assert_eq!(store.state().counts(), (0, 0));
    }

    #[tokio::test]
    async fn test_drag_and_drop_commits() {
        let (_, mut store) = loaded().await;
        store.start_drag(CardId::from("t1"));
        let target = store.drop_on(Some("c2")).await.unwrap().unwrap();

        assert_eq!(target.destination, "c2");
        assert!(matches!(store.drag_phase(), DragPhase::Committed { .. }));
        assert_eq!(view(&store, "c2"), vec!["t1"]);
    }

    #[tokio::test]
    async fn test_drag_and_drop_rolls_back() {
        let (api, mut store) = loaded().await;
        api.fail_writes(Some(BoardError::from_status(500)));

        store.start_drag(CardId::from("t1"));
        assert!(store.drop_on(Some("c2")).await.is_err());
        assert!(matches!(store.drag_phase(), DragPhase::RolledBack { .. }));
        assert_eq!(view(&store, "c1"), vec!["t1", "t2"]);
    }

    #[tokio::test]
    async fn test_drop_on_unknown_target_is_noop() {
        let (api, mut store) = loaded().await;
        let requests = api.request_count();

        store.start_drag(CardId::from("t1"));
        assert_eq!(store.drop_on(Some("t2")).await.unwrap(), None);
        store.start_drag(CardId::from("ghost"));
        assert_eq!(store.drop_on(Some("c2")).await.unwrap(), None);
        assert_eq!(store.drop_on(None).await.unwrap(), None);

        assert_eq!(api.request_count(), requests);
        assert_eq!(store.drag_phase(), &DragPhase::Idle);
    }

    #[tokio::test]
    async fn test_reorder_columns_round_trip() {
        let (api, mut store) = loaded().await;
        store
            .reorder_columns(&[ColumnId::from("c2"), ColumnId::from("c1")])
            .await
            .unwrap();
        let stored = api.stored_bundle(&BoardId::from("b1")).unwrap();
        let c2 = stored.columns.iter().find(|c| c.id == "c2").unwrap();
        assert_eq!(c2.position, 1);
        assert_eq!(store.state().ordered_columns()[0].id, "c2");
    }

    #[tokio::test]
    async fn test_linked_project() {
        let (api, store) = loaded().await;
        let err = store.linked_project(api.as_ref()).await.unwrap_err();
        assert!(err.is_not_found());

        api.insert_project(Project {
            id: ProjectId::from("p1"),
            name: "E-Commerce Platform".into(),
            status: ProjectStatus::InProgress,
            owner: OwnerRef {
                id: "u1".into(),
                name: "Dana".into(),
            },
            stakeholders: vec![],
            okr: None,
            timeline_start: None,
            timeline_end: None,
            milestones: vec![],
            risks_assumptions: vec![],
            next_action: None,
            blockers: vec![],
            notes: None,
            description: None,
            due_date: None,
        });
        let project = store.linked_project(api.as_ref()).await.unwrap().unwrap();
        assert_eq!(project.status, ProjectStatus::InProgress);
    }
}
