use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Context;

use crate::color::Rgb;
use crate::error::{Result, ViewerError};

#[derive(Debug, Clone, PartialEq)]
pub struct LassoSelection {
    pub id: u32,
    pub color: Rgb,
    /// Visibility toggle.
    pub selected: bool,
    /// Member cell indices, ascending.
    pub points: Vec<usize>,
}

impl LassoSelection {
    pub fn contains(&self, index: usize) -> bool {
        self.points.binary_search(&index).is_ok()
    }
}

/// Lasso selections of the current session. Ids are sequential and are never
/// handed out twice, even after removal.
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    selections: BTreeMap<u32, LassoSelection>,
    next_id: u32,
}

impl SelectionStore {
    pub fn create(&mut self, mut points: Vec<usize>, color: Rgb) -> &LassoSelection {
        points.sort_unstable();
        points.dedup();
        let id = self.next_id;
        self.next_id += 1;
        log::info!("Lasso selection {id}: {} cells, color #{color}", points.len());
        self.selections.entry(id).or_insert(LassoSelection {
            id,
            color,
            selected: true,
            points,
        })
    }

    pub fn get(&self, id: u32) -> Result<&LassoSelection> {
        self.selections.get(&id).ok_or(ViewerError::SelectionNotFound(id))
    }

    pub fn set_visible(&mut self, id: u32, selected: bool) -> Result<&LassoSelection> {
        let selection = self
            .selections
            .get_mut(&id)
            .ok_or(ViewerError::SelectionNotFound(id))?;
        selection.selected = selected;
        Ok(selection)
    }

    pub fn toggle(&mut self, id: u32) -> Result<&LassoSelection> {
        let selected = self.get(id)?.selected;
        self.set_visible(id, !selected)
    }

    pub fn remove(&mut self, id: u32) -> Result<LassoSelection> {
        self.selections
            .remove(&id)
            .ok_or(ViewerError::SelectionNotFound(id))
    }

    /// Drops every selection. Id numbering carries on.
    pub fn clear(&mut self) {
        self.selections.clear();
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LassoSelection> {
        self.selections.values()
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    /// Color of the newest visible selection holding `index`.
    pub fn visible_color(&self, index: usize) -> Option<Rgb> {
        self.iter()
            .rev()
            .find(|s| s.selected && s.contains(index))
            .map(|s| s.color)
    }

    /// Writes member indices of selection `id`, one per line.
    pub fn export<W: Write>(&self, id: u32, mut writer: W) -> anyhow::Result<()> {
        let selection = self.get(id)?;
        for index in &selection.points {
            writeln!(writer, "{index}")
                .with_context(|| format!("Failed to export lasso selection {id}"))?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgb = Rgb::new(255, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);

    #[test]
    fn ids_are_sequential_and_never_reused() {
        let mut store = SelectionStore::default();
        assert_eq!(store.create(vec![1, 2], RED).id, 0);
        assert_eq!(store.create(vec![3, 4], BLUE).id, 1);
        store.remove(1).unwrap();
        assert_eq!(store.create(vec![5, 6], BLUE).id, 2);
        assert_eq!(store.iter().map(|s| s.id).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn removed_selection_is_not_found() {
        let mut store = SelectionStore::default();
        store.create(vec![1, 2], RED);
        store.create(vec![2, 3], BLUE);
        store.remove(0).unwrap();
        assert_eq!(store.get(0), Err(ViewerError::SelectionNotFound(0)));
        assert_eq!(store.remove(0), Err(ViewerError::SelectionNotFound(0)));
        assert_eq!(store.get(1).unwrap().points, vec![2, 3]);
    }

    #[test]
    fn newest_visible_selection_wins() {
        let mut store = SelectionStore::default();
        store.create(vec![1, 2], RED);
        store.create(vec![2, 3], BLUE);
        assert_eq!(store.visible_color(2), Some(BLUE));
        store.toggle(1).unwrap();
        assert_eq!(store.visible_color(2), Some(RED));
        assert_eq!(store.visible_color(3), None);
    }

    #[test]
    fn points_are_sorted_and_deduplicated() {
        let mut store = SelectionStore::default();
        let s = store.create(vec![9, 3, 3, 1], RED);
        assert_eq!(s.points, vec![1, 3, 9]);
        assert!(s.contains(3));
        assert!(!s.contains(4));
    }

    #[test]
    fn export_writes_one_index_per_line() {
        let mut store = SelectionStore::default();
        store.create(vec![4, 7], RED);
        let mut out = Vec::new();
        store.export(0, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "4\n7\n");
        assert!(store.export(3, Vec::new()).is_err());
    }
}
