//! Layout position store and the deterministic grid fallback.
//!
//! View blocks carry element coordinates as metadata lines
//! (`// element api 300 120`, or the `element api { position 300 120 }`
//! block form). The parser records them here keyed by the DSL identifier
//! as written, then asks for each declared element's position once the
//! whole document has been scanned.

use crate::model::{Position, Size};
use std::collections::{BTreeMap, HashMap};

/// Grid used for elements whose position can't be recovered from the text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub padding: f32,
    pub cell_width: f32,
    pub cell_height: f32,
    pub col_gap: f32,
    pub row_gap: f32,
    pub columns: usize,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            padding: 40.0,
            cell_width: 220.0,
            cell_height: 140.0,
            col_gap: 60.0,
            row_gap: 80.0,
            columns: 4,
        }
    }
}

impl GridLayout {
    /// Position of the `index`-th element (0-based declaration order).
    pub fn position_for(&self, index: usize) -> Position {
        let columns = self.columns.max(1);
        let col = (index % columns) as f32;
        let row = (index / columns) as f32;
        Position {
            x: self.padding + col * (self.cell_width + self.col_gap),
            y: self.padding + row * (self.cell_height + self.row_gap),
        }
    }
}

/// Recovered placement of a group: groups have no DSL identifier, so they
/// are keyed by display name and may also carry a fixed size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupPlacement {
    pub position: Position,
    pub size: Option<Size>,
}

/// Positions recovered from view metadata during one parse.
#[derive(Debug, Default)]
pub struct PositionStore {
    positions: BTreeMap<String, Position>,
    groups: HashMap<String, GroupPlacement>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a position for a DSL identifier. Later records win.
    pub fn record(&mut self, ident: &str, position: Position) {
        self.positions.insert(ident.to_string(), position);
    }

    pub fn record_group(&mut self, name: &str, placement: GroupPlacement) {
        self.groups.insert(name.to_string(), placement);
    }

    /// Look up the position of an element declared as `qualified`
    /// (e.g. `shop.api`).
    ///
    /// Tries the exact identifier, then its trailing segment, then any
    /// recorded long-form identifier ending in that segment.
    pub fn lookup(&self, qualified: &str) -> Option<Position> {
        if let Some(&p) = self.positions.get(qualified) {
            return Some(p);
        }
        let tail = qualified.rsplit('.').next().unwrap_or(qualified);
        if let Some(&p) = self.positions.get(tail) {
            return Some(p);
        }
        let suffix = format!(".{tail}");
        self.positions
            .iter()
            .find(|(key, _)| key.ends_with(&suffix))
            .map(|(_, &p)| p)
    }

    pub fn group(&self, name: &str) -> Option<GroupPlacement> {
        self.groups.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_formula() {
        let grid = GridLayout::default();
        assert_eq!(grid.position_for(0), Position::new(40.0, 40.0));
        assert_eq!(grid.position_for(1), Position::new(320.0, 40.0));
        assert_eq!(grid.position_for(3), Position::new(880.0, 40.0));
        // 5th element wraps to the second row.
        assert_eq!(grid.position_for(4), Position::new(40.0, 260.0));
        assert_eq!(grid.position_for(9), Position::new(320.0, 480.0));
    }

    #[test]
    fn lookup_exact_then_tail() {
        let mut store = PositionStore::new();
        store.record("api", Position::new(10.0, 20.0));
        store.record("shop.db", Position::new(30.0, 40.0));

        assert_eq!(store.lookup("api"), Some(Position::new(10.0, 20.0)));
        // Declared nested, metadata written short-form.
        assert_eq!(store.lookup("shop.api"), Some(Position::new(10.0, 20.0)));
        // Declared short-form, metadata written long-form.
        assert_eq!(store.lookup("db"), Some(Position::new(30.0, 40.0)));
        assert_eq!(store.lookup("cache"), None);
    }

    #[test]
    fn later_record_wins() {
        let mut store = PositionStore::new();
        store.record("u", Position::new(1.0, 1.0));
        store.record("u", Position::new(2.0, 2.0));
        assert_eq!(store.lookup("u"), Some(Position::new(2.0, 2.0)));
    }

    #[test]
    fn groups_keyed_by_name() {
        let mut store = PositionStore::new();
        store.record_group(
            "Internal",
            GroupPlacement {
                position: Position::new(5.0, 6.0),
                size: Some(Size {
                    width: 400.0,
                    height: 300.0,
                }),
            },
        );
        let g = store.group("Internal").unwrap();
        assert_eq!(g.position, Position::new(5.0, 6.0));
        assert!(store.group("External").is_none());
    }
}
