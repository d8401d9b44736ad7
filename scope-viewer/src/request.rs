use std::sync::Arc;

use crate::error::{Result, ViewerError};
use crate::resolver::FeatureQuery;

/// Identifies an outstanding coordinate fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatesTicket {
    pub path: Arc<str>,
    pub(crate) dataset_epoch: u64,
}

/// Identifies an outstanding color fetch, tied to the dataset it was issued
/// for and to its position among color requests.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorTicket {
    pub path: Arc<str>,
    pub query: FeatureQuery,
    pub(crate) dataset_epoch: u64,
    pub(crate) color_epoch: u64,
}

/// Monotonic counters; a completion whose epoch is behind is stale.
#[derive(Debug, Clone, Default)]
pub struct Epochs {
    dataset: u64,
    colors: u64,
}

impl Epochs {
    pub fn dataset(&self) -> u64 {
        self.dataset
    }

    pub fn next_dataset(&mut self, path: Arc<str>) -> CoordinatesTicket {
        self.dataset += 1;
        CoordinatesTicket {
            path,
            dataset_epoch: self.dataset,
        }
    }

    pub fn next_colors(&mut self, path: Arc<str>, query: FeatureQuery) -> ColorTicket {
        self.colors += 1;
        ColorTicket {
            path,
            query,
            dataset_epoch: self.dataset,
            color_epoch: self.colors,
        }
    }

    pub fn check_coordinates(&self, ticket: &CoordinatesTicket) -> Result<()> {
        if ticket.dataset_epoch != self.dataset {
            return Err(ViewerError::StaleResponse {
                kind: "coordinates",
                epoch: ticket.dataset_epoch,
                current: self.dataset,
            });
        }
        Ok(())
    }

    pub fn check_colors(&self, ticket: &ColorTicket) -> Result<()> {
        if ticket.dataset_epoch != self.dataset {
            return Err(ViewerError::StaleResponse {
                kind: "dataset for color",
                epoch: ticket.dataset_epoch,
                current: self.dataset,
            });
        }
        if ticket.color_epoch != self.colors {
            return Err(ViewerError::StaleResponse {
                kind: "color",
                epoch: ticket.color_epoch,
                current: self.colors,
            });
        }
        Ok(())
    }

    /// Checks `ticket` and consumes it, so a second completion of the same
    /// request is stale.
    pub fn retire_colors(&mut self, ticket: &ColorTicket) -> Result<()> {
        self.check_colors(ticket)?;
        self.colors += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_dataset_invalidates_color_ticket() {
        let mut epochs = Epochs::default();
        epochs.next_dataset("a.loom".into());
        let colors = epochs.next_colors("a.loom".into(), FeatureQuery::default());
        assert!(epochs.check_colors(&colors).is_ok());

        let coords = epochs.next_dataset("b.loom".into());
        assert!(epochs.check_colors(&colors).unwrap_err().is_stale());
        assert!(epochs.check_coordinates(&coords).is_ok());
    }

    #[test]
    fn newer_color_request_supersedes_older() {
        let mut epochs = Epochs::default();
        epochs.next_dataset("a.loom".into());
        let first = epochs.next_colors("a.loom".into(), FeatureQuery::default());
        let second = epochs.next_colors("a.loom".into(), FeatureQuery::default());
        assert_eq!(
            epochs.check_colors(&first),
            Err(ViewerError::StaleResponse {
                kind: "color",
                epoch: 1,
                current: 2
            })
        );
        assert!(epochs.check_colors(&second).is_ok());
    }

    #[test]
    fn color_ticket_completes_once() {
        let mut epochs = Epochs::default();
        epochs.next_dataset("a.loom".into());
        let ticket = epochs.next_colors("a.loom".into(), FeatureQuery::default());
        assert!(epochs.retire_colors(&ticket).is_ok());
        assert!(epochs.check_colors(&ticket).unwrap_err().is_stale());
        assert!(epochs.retire_colors(&ticket).unwrap_err().is_stale());

        let next = epochs.next_colors("a.loom".into(), FeatureQuery::default());
        assert!(epochs.check_colors(&next).is_ok());
    }
}
