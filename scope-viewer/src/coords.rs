use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::error::{Result, ViewerError};

/// Per-cell embedding coordinates. `x` and `y` always have the same length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoordinateSet {
    x: Vec<f32>,
    y: Vec<f32>,
}

impl CoordinateSet {
    pub fn new(x: Vec<f32>, y: Vec<f32>) -> Result<Self> {
        if x.len() != y.len() {
            return Err(ViewerError::DataShape(format!(
                "coordinate arrays differ in length: x has {}, y has {}",
                x.len(),
                y.len()
            )));
        }
        if let Some(index) = x
            .iter()
            .zip(y.iter())
            .position(|(a, b)| !a.is_finite() || !b.is_finite())
        {
            return Err(ViewerError::DataShape(format!(
                "non-finite coordinate for cell {index}"
            )));
        }
        Ok(Self { x, y })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<(f32, f32)> {
        Some((*self.x.get(index)?, *self.y.get(index)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    pub fn x(&self) -> &[f32] {
        &self.x
    }

    pub fn y(&self) -> &[f32] {
        &self.y
    }
}

/// Coordinates fetched per dataset path. Oldest entry is evicted first once
/// `capacity` is reached.
#[derive(Debug, Clone)]
pub struct CoordinateStore {
    entries: HashMap<Arc<str>, Arc<CoordinateSet>>,
    order: VecDeque<Arc<str>>,
    capacity: usize,
}

impl CoordinateStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, path: &str) -> Option<Arc<CoordinateSet>> {
        self.entries.get(path).cloned()
    }

    pub fn insert(&mut self, path: Arc<str>, set: Arc<CoordinateSet>) {
        if self.entries.insert(path.clone(), set).is_some() {
            self.order.retain(|p| p != &path);
        }
        self.order.push_back(path);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                log::debug!("Evicting cached coordinates for {oldest}");
                self.entries.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(n: usize) -> Arc<CoordinateSet> {
        Arc::new(CoordinateSet::new(vec![0.0; n], vec![0.0; n]).unwrap())
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = CoordinateSet::new(vec![0.0; 5], vec![0.0; 4]).unwrap_err();
        assert!(matches!(err, ViewerError::DataShape(_)));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let err = CoordinateSet::new(vec![0.0, f32::NAN], vec![0.0, 1.0]).unwrap_err();
        assert_eq!(
            err,
            ViewerError::DataShape("non-finite coordinate for cell 1".to_string())
        );
    }

    #[test]
    fn iterates_pairs() {
        let c = CoordinateSet::new(vec![1.0, 2.0], vec![3.0, 4.0]).unwrap();
        assert_eq!(c.iter().collect::<Vec<_>>(), vec![(1.0, 3.0), (2.0, 4.0)]);
        assert_eq!(c.get(1), Some((2.0, 4.0)));
        assert_eq!(c.get(2), None);
    }

    #[test]
    fn store_evicts_oldest() {
        let mut store = CoordinateStore::new(2);
        store.insert("a.loom".into(), set(1));
        store.insert("b.loom".into(), set(2));
        store.insert("a.loom".into(), set(3));
        store.insert("c.loom".into(), set(4));

        assert!(store.get("b.loom").is_none());
        assert_eq!(store.get("a.loom").unwrap().len(), 3);
        assert_eq!(store.get("c.loom").unwrap().len(), 4);
        assert_eq!(store.len(), 2);
    }
}
