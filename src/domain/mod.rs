pub mod board;
pub mod drag;
pub mod ordering;
pub mod patch;
pub mod project;

pub use board::{
    Board, BoardBundle, BoardId, BoardList, Card, CardId, ChecklistItem, Column, ColumnId, Label,
    ProjectId,
};
pub use drag::{DragMachine, DragPhase, DropTarget};
pub use ordering::{cards_in_column, group_by_column, next_card_position, next_column_position};
pub use patch::{CardFields, CardPatch, ColumnPatch, NewBoard, NewCard, NewColumn, PositionUpdate};
pub use project::{Project, ProjectList, ProjectQuery, ProjectStatus};
