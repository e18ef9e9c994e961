//! In-memory board snapshot with optimistic-mutation bookkeeping.
//!
//! Every optimistic mutation is split in two phases. A `begin_*` method
//! validates the intent, applies it to the snapshot and returns a
//! [`PendingMutation`] holding the undo record. Once the server has answered,
//! the caller hands the pending mutation back to [`BoardState::commit`] or
//! [`BoardState::rollback`].
//!
//! A rollback is discarded when it is stale: the snapshot was replaced since
//! the mutation began, or a later mutation touched the same entity.

use crate::{
    domain::{
        ordering, Board, BoardBundle, BoardId, Card, CardFields, CardId, CardPatch, Column,
        ColumnId, NewCard, NewColumn, PositionUpdate,
    },
    error::{BoardError, Result},
};
use std::collections::{HashMap, HashSet};

/// Entity a mutation touched
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Board(BoardId),
    Column(ColumnId),
    Card(CardId),
}

/// What it takes to put the snapshot back the way it was
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Undo {
    RestoreCard(Card),
    ReinsertCard {
        index: usize,
        card: Card,
    },
    RestoreColumnTitle {
        column_id: ColumnId,
        title: String,
    },
    ReinsertColumn {
        index: usize,
        column: Column,
        cards: Vec<(usize, Card)>,
    },
    RestoreColumnPositions(Vec<(ColumnId, i64)>),
    RestoreBoardName(String),
}

/// An optimistic mutation awaiting the server's verdict
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a pending mutation must be committed or rolled back"]
pub struct PendingMutation {
    epoch: u64,
    generation: u64,
    /// Each touched entity with the generation that touched it before this one
    keys: Vec<(EntityKey, Option<u64>)>,
    undo: Undo,
}

impl PendingMutation {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn undo(&self) -> &Undo {
        &self.undo
    }
}

/// Outcome of [`BoardState::rollback`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackOutcome {
    Restored,
    /// A newer mutation or a reload superseded this one; nothing was reverted
    Stale,
}

/// One column with its derived, position-ordered cards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnView<'a> {
    pub column: &'a Column,
    pub cards: Vec<&'a Card>,
}

/// The currently open board: columns, cards and mutation bookkeeping
#[derive(Debug, Default)]
pub struct BoardState {
    board: Option<Board>,
    columns: Vec<Column>,
    cards: Vec<Card>,
    epoch: u64,
    generation: u64,
    touched: HashMap<EntityKey, u64>,
}

fn require_title(kind: &str, title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(BoardError::Validation(format!("{} title must not be empty", kind)));
    }
    Ok(trimmed.to_string())
}

impl BoardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bundle(bundle: BoardBundle) -> Self {
        let mut state = Self::new();
        state.replace(bundle);
        state
    }

    /// Replaces the whole snapshot. Rollbacks issued before this are stale.
    pub fn replace(&mut self, bundle: BoardBundle) {
        self.board = Some(bundle.board);
        self.columns = bundle.columns;
        self.cards = bundle.cards;
        self.epoch += 1;
        self.touched.clear();
    }

    pub fn is_loaded(&self) -> bool {
        self.board.is_some()
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    /// Columns in snapshot order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Columns left to right
    pub fn ordered_columns(&self) -> Vec<&Column> {
        ordering::columns_in_order(&self.columns)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.cards.iter().find(|c| &c.id == id)
    }

    pub fn column(&self, id: &ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| &c.id == id)
    }

    /// Cards of one column, derived from the card set on every call
    pub fn column_view(&self, column_id: &ColumnId) -> Vec<&Card> {
        ordering::cards_in_column(&self.cards, column_id)
    }

    /// Render-ready columns, left to right, each with its ordered cards
    pub fn column_views(&self) -> Vec<ColumnView<'_>> {
        self.ordered_columns()
            .into_iter()
            .map(|column| ColumnView {
                column,
                cards: self.column_view(&column.id),
            })
            .collect()
    }

    /// (columns, cards)
    pub fn counts(&self) -> (usize, usize) {
        (self.columns.len(), self.cards.len())
    }

    /// Owned copy of the snapshot
    pub fn to_bundle(&self) -> Option<BoardBundle> {
        self.board.as_ref().map(|board| BoardBundle {
            board: board.clone(),
            columns: self.columns.clone(),
            cards: self.cards.clone(),
        })
    }

    fn loaded_board(&self) -> Result<&Board> {
        self.board
            .as_ref()
            .ok_or_else(|| BoardError::Validation("no board is loaded".to_string()))
    }

    fn column_index(&self, id: &ColumnId) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| BoardError::NotFound(format!("column {}", id)))
    }

    fn card_index(&self, id: &CardId) -> Result<usize> {
        self.cards
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| BoardError::NotFound(format!("card {}", id)))
    }

    fn pending(&mut self, keys: Vec<EntityKey>, undo: Undo) -> PendingMutation {
        self.generation += 1;
        let keys = keys
            .into_iter()
            .map(|key| {
                let previous = self.touched.insert(key.clone(), self.generation);
                (key, previous)
            })
            .collect();
        PendingMutation {
            epoch: self.epoch,
            generation: self.generation,
            keys,
            undo,
        }
    }

    // ---- write-after operations ----

    /// Validates a new column and computes its position (appended right)
    pub fn prepare_new_column(&self, title: &str) -> Result<NewColumn> {
        let board = self.loaded_board()?;
        Ok(NewColumn {
            board_id: board.id.clone(),
            title: require_title("column", title)?,
            position: ordering::next_column_position(&self.columns),
        })
    }

    /// Validates a new card and computes its position (appended at the bottom)
    pub fn prepare_new_card(
        &self,
        column_id: &ColumnId,
        title: &str,
        fields: CardFields,
    ) -> Result<NewCard> {
        let board = self.loaded_board()?;
        let title = require_title("card", title)?;
        if self.column(column_id).is_none() {
            return Err(BoardError::Validation(format!(
                "column {} is not on this board",
                column_id
            )));
        }
        Ok(NewCard {
            column_id: column_id.clone(),
            board_id: Some(board.id.clone()),
            title,
            position: ordering::next_card_position(&self.cards, column_id),
            fields,
        })
    }

    /// Adds a server-confirmed column. Returns false when it belongs to a
    /// board other than the one loaded now.
    pub fn insert_column(&mut self, column: Column) -> bool {
        match &self.board {
            Some(board) if board.id == column.board_id => {
                self.columns.push(column);
                true
            }
            _ => false,
        }
    }

    /// Adds a server-confirmed card. Returns false when its column is no
    /// longer in the snapshot.
    pub fn insert_card(&mut self, card: Card) -> bool {
        if self.column(&card.column_id).is_none() {
            return false;
        }
        self.cards.push(card);
        true
    }

    // ---- optimistic operations ----

    pub fn begin_rename_column(
        &mut self,
        column_id: &ColumnId,
        title: &str,
    ) -> Result<PendingMutation> {
        let title = require_title("column", title)?;
        let index = self.column_index(column_id)?;
        let previous = std::mem::replace(&mut self.columns[index].title, title);

        Ok(self.pending(
            vec![EntityKey::Column(column_id.clone())],
            Undo::RestoreColumnTitle {
                column_id: column_id.clone(),
                title: previous,
            },
        ))
    }

    /// Removes the column and every card in it in one step
    pub fn begin_delete_column(&mut self, column_id: &ColumnId) -> Result<PendingMutation> {
        let index = self.column_index(column_id)?;
        let column = self.columns.remove(index);

        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.cards.len());
        for (i, card) in std::mem::take(&mut self.cards).into_iter().enumerate() {
            if &card.column_id == column_id {
                removed.push((i, card));
            } else {
                kept.push(card);
            }
        }
        self.cards = kept;

        let mut keys = vec![EntityKey::Column(column_id.clone())];
        keys.extend(removed.iter().map(|(_, c)| EntityKey::Card(c.id.clone())));

        Ok(self.pending(
            keys,
            Undo::ReinsertColumn {
                index,
                column,
                cards: removed,
            },
        ))
    }

    /// Moves a card to the bottom of `destination`.
    ///
    /// Returns the pending mutation and the patch to send. Only the moved
    /// card's `column_id` and `position` change.
    pub fn begin_move_card(
        &mut self,
        card_id: &CardId,
        destination: &ColumnId,
    ) -> Result<(PendingMutation, CardPatch)> {
        let index = self.card_index(card_id)?;
        self.column_index(destination)?;

        let position = ordering::next_card_position(&self.cards, destination);
        let previous = self.cards[index].clone();
        self.cards[index].column_id = destination.clone();
        self.cards[index].position = position;

        let pending = self.pending(
            vec![EntityKey::Card(card_id.clone())],
            Undo::RestoreCard(previous),
        );
        Ok((pending, CardPatch::relocate(destination.clone(), position)))
    }

    pub fn begin_update_card(
        &mut self,
        card_id: &CardId,
        patch: &CardPatch,
    ) -> Result<PendingMutation> {
        let title = match &patch.title {
            Some(title) => Some(require_title("card", title)?),
            None => None,
        };
        if let Some(column_id) = &patch.column_id {
            self.column_index(column_id)?;
        }
        let index = self.card_index(card_id)?;
        let previous = self.cards[index].clone();
        patch.apply_to(&mut self.cards[index]);
        if let Some(title) = title {
            self.cards[index].title = title;
        }

        Ok(self.pending(
            vec![EntityKey::Card(card_id.clone())],
            Undo::RestoreCard(previous),
        ))
    }

    pub fn begin_delete_card(&mut self, card_id: &CardId) -> Result<PendingMutation> {
        let index = self.card_index(card_id)?;
        let card = self.cards.remove(index);
        Ok(self.pending(
            vec![EntityKey::Card(card_id.clone())],
            Undo::ReinsertCard { index, card },
        ))
    }

    pub fn begin_rename_board(&mut self, name: &str) -> Result<PendingMutation> {
        let name = require_title("board", name)?;
        let board = self
            .board
            .as_mut()
            .ok_or_else(|| BoardError::Validation("no board is loaded".to_string()))?;
        let previous = std::mem::replace(&mut board.name, name);
        let key = EntityKey::Board(board.id.clone());
        Ok(self.pending(vec![key], Undo::RestoreBoardName(previous)))
    }

    /// Renumbers columns 1..=n in the given order.
    ///
    /// `order` must name every column of the board exactly once.
    pub fn begin_reorder_columns(
        &mut self,
        order: &[ColumnId],
    ) -> Result<(PendingMutation, Vec<PositionUpdate>)> {
        let known: HashSet<&ColumnId> = self.columns.iter().map(|c| &c.id).collect();
        let requested: HashSet<&ColumnId> = order.iter().collect();
        if order.len() != self.columns.len() || requested != known {
            return Err(BoardError::Validation(
                "column order must list every column exactly once".to_string(),
            ));
        }

        let previous: Vec<(ColumnId, i64)> = self
            .columns
            .iter()
            .map(|c| (c.id.clone(), c.position))
            .collect();
        let mut updates = Vec::with_capacity(order.len());
        for (i, id) in order.iter().enumerate() {
            let position = i as i64 + 1;
            if let Some(column) = self.columns.iter_mut().find(|c| &c.id == id) {
                column.position = position;
            }
            updates.push(PositionUpdate::column(id, position));
        }

        let keys = order.iter().cloned().map(EntityKey::Column).collect();
        Ok((
            self.pending(keys, Undo::RestoreColumnPositions(previous)),
            updates,
        ))
    }

    // ---- resolution ----

    /// The server accepted the mutation; the snapshot already reflects it
    pub fn commit(&mut self, pending: PendingMutation) {
        tracing::debug!(generation = pending.generation, "optimistic mutation confirmed");
    }

    /// The server rejected the mutation: restore the captured prior values
    /// unless a newer mutation or a reload has superseded them.
    pub fn rollback(&mut self, pending: PendingMutation) -> RollbackOutcome {
        if self.is_stale(&pending) {
            tracing::debug!(
                generation = pending.generation,
                "discarding stale rollback"
            );
            return RollbackOutcome::Stale;
        }

        // the rejected mutation no longer shadows older ones on these entities
        for (key, previous) in &pending.keys {
            match previous {
                Some(generation) => {
                    self.touched.insert(key.clone(), *generation);
                }
                None => {
                    self.touched.remove(key);
                }
            }
        }

        match pending.undo {
            Undo::RestoreCard(card) => {
                if let Some(slot) = self.cards.iter_mut().find(|c| c.id == card.id) {
                    *slot = card;
                }
            }
            Undo::ReinsertCard { index, card } => {
                let index = index.min(self.cards.len());
                self.cards.insert(index, card);
            }
            Undo::RestoreColumnTitle { column_id, title } => {
                if let Some(column) = self.columns.iter_mut().find(|c| c.id == column_id) {
                    column.title = title;
                }
            }
            Undo::ReinsertColumn {
                index,
                column,
                cards,
            } => {
                let index = index.min(self.columns.len());
                self.columns.insert(index, column);
                for (i, card) in cards {
                    let i = i.min(self.cards.len());
                    self.cards.insert(i, card);
                }
            }
            Undo::RestoreColumnPositions(positions) => {
                for (id, position) in positions {
                    if let Some(column) = self.columns.iter_mut().find(|c| c.id == id) {
                        column.position = position;
                    }
                }
            }
            Undo::RestoreBoardName(name) => {
                if let Some(board) = self.board.as_mut() {
                    board.name = name;
                }
            }
        }

        tracing::debug!(generation = pending.generation, "optimistic mutation rolled back");
        RollbackOutcome::Restored
    }

    fn is_stale(&self, pending: &PendingMutation) -> bool {
        pending.epoch != self.epoch
            || pending.keys.iter().any(|(key, _)| {
                self.touched
                    .get(key)
                    .is_some_and(|latest| *latest > pending.generation)
            })
    }
}
