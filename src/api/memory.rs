use crate::{
    api::{BoardApi, ProjectApi},
    domain::{
        Board, BoardBundle, BoardId, BoardList, Card, CardId, CardPatch, Column, ColumnId,
        ColumnPatch, NewBoard, NewCard, NewColumn, PositionUpdate, Project, ProjectId,
        ProjectList, ProjectQuery,
    },
    error::{BoardError, Result},
};
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex, MutexGuard, PoisonError,
};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    boards: Vec<Board>,
    columns: Vec<Column>,
    cards: Vec<Card>,
    projects: Vec<Project>,
}

/// In-process backend.
///
/// Assigns UUID ids, cascades deletes (board → columns → cards) and answers
/// `NotFound` for unknown ids. Failures can be injected separately for reads
/// and writes to rehearse outages; an injected failure leaves the tables
/// untouched.
#[derive(Default)]
pub struct InMemoryBoardApi {
    tables: Mutex<Tables>,
    read_failure: Mutex<Option<BoardError>>,
    write_failure: Mutex<Option<BoardError>>,
    requests: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl InMemoryBoardApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with the given board, columns and cards already stored
    pub fn with_bundle(bundle: BoardBundle) -> Self {
        let api = Self::new();
        api.insert_bundle(bundle);
        api
    }

    pub fn insert_bundle(&self, bundle: BoardBundle) {
        let mut tables = lock(&self.tables);
        tables.boards.push(bundle.board);
        tables.columns.extend(bundle.columns);
        tables.cards.extend(bundle.cards);
    }

    pub fn insert_project(&self, project: Project) {
        lock(&self.tables).projects.push(project);
    }

    /// Every subsequent write fails with `failure` until cleared with `None`
    pub fn fail_writes(&self, failure: Option<BoardError>) {
        *lock(&self.write_failure) = failure;
    }

    /// Every subsequent read fails with `failure` until cleared with `None`
    pub fn fail_reads(&self, failure: Option<BoardError>) {
        *lock(&self.read_failure) = failure;
    }

    /// Number of requests served, failed ones included
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Current server-side copy of one board
    pub fn stored_bundle(&self, id: &BoardId) -> Option<BoardBundle> {
        let tables = lock(&self.tables);
        Self::bundle_of(&tables, id)
    }

    fn bundle_of(tables: &Tables, id: &BoardId) -> Option<BoardBundle> {
        let board = tables.boards.iter().find(|b| &b.id == id)?.clone();
        let columns: Vec<Column> = tables
            .columns
            .iter()
            .filter(|c| &c.board_id == id)
            .cloned()
            .collect();
        let cards = tables
            .cards
            .iter()
            .filter(|card| columns.iter().any(|c| c.id == card.column_id))
            .cloned()
            .collect();
        Some(BoardBundle {
            board,
            columns,
            cards,
        })
    }

    fn read(&self) -> Result<MutexGuard<'_, Tables>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.read_failure).clone() {
            return Err(err);
        }
        Ok(lock(&self.tables))
    }

    fn write(&self) -> Result<MutexGuard<'_, Tables>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = lock(&self.write_failure).clone() {
            return Err(err);
        }
        Ok(lock(&self.tables))
    }
}

#[async_trait]
impl BoardApi for InMemoryBoardApi {
    async fn list_boards(&self) -> Result<BoardList> {
        let tables = self.read()?;
        let mut items = tables.boards.clone();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        let total = items.len();
        Ok(BoardList { items, total })
    }

    async fn list_project_boards(&self, project_id: &ProjectId) -> Result<BoardList> {
        let tables = self.read()?;
        let items: Vec<Board> = tables
            .boards
            .iter()
            .filter(|b| b.project_id.as_ref() == Some(project_id))
            .cloned()
            .collect();
        let total = items.len();
        Ok(BoardList { items, total })
    }

    async fn get_board(&self, id: &BoardId) -> Result<BoardBundle> {
        let tables = self.read()?;
        Self::bundle_of(&tables, id).ok_or_else(|| BoardError::NotFound(format!("board {}", id)))
    }

    async fn create_board(&self, body: &NewBoard) -> Result<Board> {
        let mut tables = self.write()?;
        let board = Board {
            id: BoardId::new(new_id()),
            name: body.name.clone(),
            project_id: body.project_id.clone(),
            description: body.description.clone(),
        };
        tables.boards.push(board.clone());
        Ok(board)
    }

    async fn rename_board(&self, id: &BoardId, name: &str) -> Result<()> {
        let mut tables = self.write()?;
        let board = tables
            .boards
            .iter_mut()
            .find(|b| &b.id == id)
            .ok_or_else(|| BoardError::NotFound(format!("board {}", id)))?;
        board.name = name.to_string();
        Ok(())
    }

    async fn delete_board(&self, id: &BoardId) -> Result<()> {
        let mut tables = self.write()?;
        let before = tables.boards.len();
        tables.boards.retain(|b| &b.id != id);
        if tables.boards.len() == before {
            return Err(BoardError::NotFound(format!("board {}", id)));
        }

        let removed: Vec<ColumnId> = tables
            .columns
            .iter()
            .filter(|c| &c.board_id == id)
            .map(|c| c.id.clone())
            .collect();
        tables.columns.retain(|c| &c.board_id != id);
        tables.cards.retain(|card| !removed.contains(&card.column_id));
        Ok(())
    }

    async fn create_column(&self, body: &NewColumn) -> Result<Column> {
        let mut tables = self.write()?;
        if !tables.boards.iter().any(|b| b.id == body.board_id) {
            return Err(BoardError::NotFound(format!("board {}", body.board_id)));
        }
        let column = Column {
            id: ColumnId::new(new_id()),
            board_id: body.board_id.clone(),
            title: body.title.clone(),
            position: body.position,
        };
        tables.columns.push(column.clone());
        Ok(column)
    }

    async fn update_column(&self, id: &ColumnId, patch: &ColumnPatch) -> Result<()> {
        let mut tables = self.write()?;
        let column = tables
            .columns
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| BoardError::NotFound(format!("column {}", id)))?;
        if let Some(title) = &patch.title {
            column.title = title.clone();
        }
        if let Some(position) = patch.position {
            column.position = position;
        }
        Ok(())
    }

    async fn delete_column(&self, id: &ColumnId) -> Result<()> {
        let mut tables = self.write()?;
        let before = tables.columns.len();
        tables.columns.retain(|c| &c.id != id);
        if tables.columns.len() == before {
            return Err(BoardError::NotFound(format!("column {}", id)));
        }
        tables.cards.retain(|card| &card.column_id != id);
        Ok(())
    }

    async fn create_card(&self, body: &NewCard) -> Result<Card> {
        let mut tables = self.write()?;
        if !tables.columns.iter().any(|c| c.id == body.column_id) {
            return Err(BoardError::NotFound(format!("column {}", body.column_id)));
        }
        let fields = &body.fields;
        let card = Card {
            id: CardId::new(new_id()),
            column_id: body.column_id.clone(),
            board_id: body.board_id.clone(),
            title: body.title.clone(),
            description: fields.description.clone(),
            position: body.position,
            project_id: fields.project_id.clone(),
            assignees: fields.assignees.clone(),
            labels: fields.labels.clone(),
            due_date: fields.due_date.clone(),
            checklist: fields.checklist.clone(),
            attachment_count: fields.attachment_count,
            comment_count: fields.comment_count,
        };
        tables.cards.push(card.clone());
        Ok(card)
    }

    async fn update_card(&self, id: &CardId, patch: &CardPatch) -> Result<()> {
        let mut tables = self.write()?;
        let card = tables
            .cards
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| BoardError::NotFound(format!("card {}", id)))?;
        patch.apply_to(card);
        Ok(())
    }

    async fn delete_card(&self, id: &CardId) -> Result<()> {
        let mut tables = self.write()?;
        let before = tables.cards.len();
        tables.cards.retain(|c| &c.id != id);
        if tables.cards.len() == before {
            return Err(BoardError::NotFound(format!("card {}", id)));
        }
        Ok(())
    }

    async fn reorder_cards(&self, updates: &[PositionUpdate]) -> Result<()> {
        let mut tables = self.write()?;
        for update in updates {
            if let Some(card) = tables.cards.iter_mut().find(|c| c.id == update.id.as_str()) {
                card.position = update.position;
                if let Some(column_id) = &update.column_id {
                    card.column_id = column_id.clone();
                }
            }
        }
        Ok(())
    }

    async fn reorder_columns(&self, updates: &[PositionUpdate]) -> Result<()> {
        let mut tables = self.write()?;
        for update in updates {
            if let Some(column) = tables
                .columns
                .iter_mut()
                .find(|c| c.id == update.id.as_str())
            {
                column.position = update.position;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectApi for InMemoryBoardApi {
    async fn list_projects(&self, query: &ProjectQuery) -> Result<ProjectList> {
        let tables = self.read()?;
        let needle = query.filter.as_deref().unwrap_or("").to_lowercase();
        let matching: Vec<Project> = tables
            .projects
            .iter()
            .filter(|p| needle.is_empty() || p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        let total = matching.len();

        let limit = query.limit.filter(|l| *l > 0).map(|l| l as usize);
        let page = query.page.filter(|p| *p > 0).unwrap_or(1) as usize;
        let items = match limit {
            Some(limit) => matching
                .into_iter()
                .skip((page - 1) * limit)
                .take(limit)
                .collect(),
            None => matching,
        };
        Ok(ProjectList { items, total })
    }

    async fn get_project(&self, id: &ProjectId) -> Result<Project> {
        let tables = self.read()?;
        tables
            .projects
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| BoardError::NotFound(format!("project {}", id)))
    }
}
