//! Create and partial-update payloads.
//!
//! Every payload serializes only the fields that are set, so a `PATCH`
//! never overwrites server data the caller did not mean to touch.

use crate::domain::board::{
    BoardId, Card, CardId, ChecklistItem, ColumnId, Label, ProjectId,
};
use serde::{Deserialize, Serialize};

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// `POST /api/boards` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBoard {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `POST /api/columns` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewColumn {
    pub board_id: BoardId,
    pub title: String,
    pub position: i64,
}

/// `PATCH /api/columns/{id}` body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

impl ColumnPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

/// Optional fields accepted when creating a card.
///
/// Empty collections and zero counters are left out of the request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignees: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub attachment_count: u32,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub comment_count: u32,
}

impl CardFields {
    /// Parses a comma-separated assignee list, dropping blanks
    pub fn with_assignees_csv(mut self, csv: &str) -> Self {
        self.assignees = csv
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.trim().is_empty()).then_some(description);
        self
    }
}

/// `POST /api/cards` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    pub column_id: ColumnId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<BoardId>,
    pub title: String,
    pub position: i64,
    #[serde(flatten)]
    pub fields: CardFields,
}

/// `PATCH /api/cards/{id}` body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<ColumnId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Label>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist: Option<Vec<ChecklistItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<u32>,
}

impl CardPatch {
    /// The patch sent for a drag/drop move
    pub fn relocate(column_id: ColumnId, position: i64) -> Self {
        Self {
            column_id: Some(column_id),
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Applies every set field to `card`
    pub fn apply_to(&self, card: &mut Card) {
        if let Some(column_id) = &self.column_id {
            card.column_id = column_id.clone();
        }
        if let Some(title) = &self.title {
            card.title = title.clone();
        }
        if let Some(position) = self.position {
            card.position = position;
        }
        if let Some(description) = &self.description {
            card.description = Some(description.clone());
        }
        if let Some(project_id) = &self.project_id {
            card.project_id = Some(project_id.clone());
        }
        if let Some(assignees) = &self.assignees {
            card.assignees = assignees.clone();
        }
        if let Some(labels) = &self.labels {
            card.labels = labels.clone();
        }
        if let Some(due_date) = &self.due_date {
            card.due_date = Some(due_date.clone());
        }
        if let Some(checklist) = &self.checklist {
            card.checklist = checklist.clone();
        }
        if let Some(count) = self.attachment_count {
            card.attachment_count = count;
        }
        if let Some(count) = self.comment_count {
            card.comment_count = count;
        }
    }
}

/// One entry of a `PATCH /api/{cards,columns}/reorder` batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUpdate {
    pub id: String,
    pub position: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<ColumnId>,
}

impl PositionUpdate {
    pub fn card(id: &CardId, column_id: &ColumnId, position: i64) -> Self {
        Self {
            id: id.to_string(),
            position,
            column_id: Some(column_id.clone()),
        }
    }

    pub fn column(id: &ColumnId, position: i64) -> Self {
        Self {
            id: id.to_string(),
            position,
            column_id: None,
        }
    }
}
