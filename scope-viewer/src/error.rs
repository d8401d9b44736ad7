use thiserror::Error;

pub type Result<T> = std::result::Result<T, ViewerError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewerError {
    #[error("Data shape mismatch: {0}")]
    DataShape(String),
    #[error("Dataset has {requested} cells but the viewer holds at most {capacity} sprites")]
    CapacityExceeded { requested: usize, capacity: usize },
    #[error("Stale {kind} response (epoch {epoch}, current {current})")]
    StaleResponse {
        kind: &'static str,
        epoch: u64,
        current: u64,
    },
    #[error("No lasso selection with id {0}")]
    SelectionNotFound(u32),
    #[error("Invalid color: {0:?}")]
    InvalidColor(String),
    #[error("Cell index {index} out of range for {len} sprites")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("No dataset loaded")]
    NoDataset,
    #[error("Backend error: {0}")]
    Backend(String),
}

impl ViewerError {
    pub fn is_stale(&self) -> bool {
        matches!(self, ViewerError::StaleResponse { .. })
    }
}
