use crate::domain::board::{Card, Column, ColumnId};
use std::collections::BTreeMap;

/// Derives the view of one column: every card whose `column_id` matches,
/// ascending by `position`.
///
/// The sort is stable, so cards sharing a position keep their snapshot order.
/// Nothing here is cached; call it again after every mutation.
///
/// # Examples
/// ```
/// use pulseboard_core::domain::{ordering::cards_in_column, Card, ColumnId};
///
/// let cards = vec![
///     Card::new("t2", "c1", "Second", 2),
///     Card::new("t9", "c2", "Elsewhere", 1),
///     Card::new("t1", "c1", "First", 1),
/// ];
///
/// let view = cards_in_column(&cards, &ColumnId::from("c1"));
/// assert_eq!(view[0].id.as_str(), "t1");
/// assert_eq!(view.len(), 2);
/// ```
pub fn cards_in_column<'a>(cards: &'a [Card], column_id: &ColumnId) -> Vec<&'a Card> {
    let mut view: Vec<&Card> = cards
        .iter()
        .filter(|card| &card.column_id == column_id)
        .collect();
    view.sort_by_key(|card| card.position);
    view
}

/// Groups cards by column in one pass.
///
/// Every known column gets an entry, possibly empty. Cards pointing at a
/// column that is not in `columns` are grouped under their own id rather
/// than dropped.
pub fn group_by_column<'a>(
    columns: &[Column],
    cards: &'a [Card],
) -> BTreeMap<ColumnId, Vec<&'a Card>> {
    let mut map: BTreeMap<ColumnId, Vec<&Card>> = columns
        .iter()
        .map(|column| (column.id.clone(), Vec::new()))
        .collect();

    for card in cards {
        map.entry(card.column_id.clone()).or_default().push(card);
    }
    for view in map.values_mut() {
        view.sort_by_key(|card| card.position);
    }
    map
}

/// Columns left to right
pub fn columns_in_order(columns: &[Column]) -> Vec<&Column> {
    let mut ordered: Vec<&Column> = columns.iter().collect();
    ordered.sort_by_key(|column| column.position);
    ordered
}

/// Position for a card appended to the end of `column_id`:
/// the last card's position plus one, or 1 for an empty column.
pub fn next_card_position(cards: &[Card], column_id: &ColumnId) -> i64 {
    cards_in_column(cards, column_id)
        .last()
        .map(|card| card.position)
        .unwrap_or(0)
        + 1
}

/// Position for a column appended to the right of the board
pub fn next_column_position(columns: &[Column]) -> i64 {
    columns_in_order(columns)
        .last()
        .map(|column| column.position)
        .unwrap_or(0)
        + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::board::BoardId;

    fn column(id: &str, position: i64) -> Column {
        Column {
            id: ColumnId::from(id),
            board_id: BoardId::from("b1"),
            title: id.to_uppercase(),
            position,
        }
    }

    fn ids(view: &[&Card]) -> Vec<String> {
        view.iter().map(|c| c.id.to_string()).collect()
    }

    #[test]
    fn test_cards_in_column_filters_and_sorts() {
        let cards = vec![
            Card::new("t3", "c1", "C", 5),
            Card::new("t1", "c1", "A", 1),
            Card::new("x1", "c2", "X", 0),
            Card::new("t2", "c1", "B", 3),
        ];

        let view = cards_in_column(&cards, &ColumnId::from("c1"));
        assert_eq!(ids(&view), vec!["t1", "t2", "t3"]);

        let empty = cards_in_column(&cards, &ColumnId::from("nope"));
        assert!(empty.is_empty());
    }

    #[test]
    fn test_ties_keep_snapshot_order() {
        let cards = vec![
            Card::new("b", "c1", "B", 1),
            Card::new("a", "c1", "A", 1),
        ];
        let view = cards_in_column(&cards, &ColumnId::from("c1"));
        assert_eq!(ids(&view), vec!["b", "a"]);
    }

    #[test]
    fn test_group_by_column() {
        let columns = vec![column("c1", 1), column("c2", 2)];
        let cards = vec![
            Card::new("t2", "c1", "B", 2),
            Card::new("t1", "c1", "A", 1),
            Card::new("orphan", "gone", "O", 1),
        ];

        let grouped = group_by_column(&columns, &cards);
        assert_eq!(ids(&grouped[&ColumnId::from("c1")]), vec!["t1", "t2"]);
        assert!(grouped[&ColumnId::from("c2")].is_empty());
        assert_eq!(ids(&grouped[&ColumnId::from("gone")]), vec!["orphan"]);
    }

    #[test]
    fn test_next_positions() {
        let columns = vec![column("c2", 7), column("c1", 2)];
        assert_eq!(next_column_position(&columns), 8);
        assert_eq!(next_column_position(&[]), 1);

        let cards = vec![
            Card::new("t1", "c1", "A", 4),
            Card::new("t2", "c1", "B", 9),
        ];
        assert_eq!(next_card_position(&cards, &ColumnId::from("c1")), 10);
        assert_eq!(next_card_position(&cards, &ColumnId::from("c2")), 1);
    }

    #[test]
    fn test_columns_in_order() {
        let columns = vec![column("c3", 3), column("c1", 1), column("c2", 2)];
        let ordered: Vec<_> = columns_in_order(&columns)
            .iter()
            .map(|c| c.id.to_string())
            .collect();
        assert_eq!(ordered, vec!["c1", "c2", "c3"]);
    }
}
