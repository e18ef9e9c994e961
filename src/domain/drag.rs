use crate::domain::board::{Card, CardId, Column, ColumnId};
use crate::error::BoardError;

/// Phase of the current drag gesture
///
/// `Idle → Dragging → Resolving → Committed | RolledBack`, back to `Dragging`
/// on the next pointer-down. A drop that resolves to nothing returns to `Idle`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging {
        card_id: CardId,
    },
    Resolving {
        card_id: CardId,
        destination: ColumnId,
    },
    Committed {
        card_id: CardId,
        destination: ColumnId,
    },
    RolledBack {
        card_id: CardId,
        error: BoardError,
    },
}

/// A drop that resolved to a known card and a known column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropTarget {
    pub card_id: CardId,
    pub destination: ColumnId,
}

/// Tracks the most recent drag gesture.
///
/// Only one gesture is tracked. Starting a new drag while an earlier move
/// is still resolving is allowed; the earlier outcome is then ignored.
#[derive(Debug, Default)]
pub struct DragMachine {
    phase: DragPhase,
}

impl DragMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, DragPhase::Dragging { .. })
    }

    /// Pointer went down on a card
    pub fn pointer_down(&mut self, card_id: CardId) {
        self.phase = DragPhase::Dragging { card_id };
    }

    /// Pointer released over `over` (a drop-zone id, if any).
    ///
    /// Drop zones are columns; the target resolves only by exact column id
    /// match. Returns the move to perform, or `None` when the drop is a no-op
    /// (no target, unknown column, unknown card, not dragging).
    pub fn drop_over(
        &mut self,
        over: Option<&str>,
        columns: &[Column],
        cards: &[Card],
    ) -> Option<DropTarget> {
        let card_id = match &self.phase {
            DragPhase::Dragging { card_id } => card_id.clone(),
            _ => return None,
        };

        let destination = over.and_then(|id| columns.iter().find(|c| c.id == id));
        let card_known = cards.iter().any(|c| c.id == card_id);

        match destination {
            Some(column) if card_known => {
                let destination = column.id.clone();
                self.phase = DragPhase::Resolving {
                    card_id: card_id.clone(),
                    destination: destination.clone(),
                };
                Some(DropTarget {
                    card_id,
                    destination,
                })
            }
            _ => {
                self.phase = DragPhase::Idle;
                None
            }
        }
    }

    /// The server accepted the move of `card_id`
    pub fn resolve_success(&mut self, card_id: &CardId) -> bool {
        match &self.phase {
            DragPhase::Resolving {
                card_id: current,
                destination,
            } if current == card_id => {
                self.phase = DragPhase::Committed {
                    card_id: card_id.clone(),
                    destination: destination.clone(),
                };
                true
            }
            _ => false,
        }
    }

    /// The server rejected the move of `card_id`
    pub fn resolve_failure(&mut self, card_id: &CardId, error: BoardError) -> bool {
        match &self.phase {
            DragPhase::Resolving { card_id: current, .. } if current == card_id => {
                self.phase = DragPhase::RolledBack {
                    card_id: card_id.clone(),
                    error,
                };
                true
            }
            _ => false,
        }
    }

    /// Abandons a drag that has not been dropped yet
    pub fn cancel(&mut self) {
        if self.is_dragging() {
            self.phase = DragPhase::Idle;
        }
    }
}
