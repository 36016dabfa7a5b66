use std::collections::BTreeMap;

use crate::foundation::core::Shape4;

/// Per-pass record of each level's shape as the encoder left it.
///
/// The encoder writes one entry per populated level (overwriting earlier passes); the decoder
/// of the same pass reads them to undo odd-extent rounding. Owned by the caller and threaded
/// through both calls, so concurrent passes never share one.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ShapeTable {
    levels: BTreeMap<usize, Shape4>,
}

impl ShapeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `shape` for `level`, replacing any earlier entry.
    pub fn record(&mut self, level: usize, shape: Shape4) {
        self.levels.insert(level, shape);
    }

    pub fn get(&self, level: usize) -> Option<Shape4> {
        self.levels.get(&level).copied()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn clear(&mut self) {
        self.levels.clear();
    }

    /// Entries in ascending level order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Shape4)> + '_ {
        self.levels.iter().map(|(&l, &s)| (l, s))
    }
}
