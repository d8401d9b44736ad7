use std::fmt;
use std::future::Future;

use crate::color::{Rgb, parse_color_vector};
use crate::error::{Result, ViewerError};

/// Number of feature slots a query carries.
pub const FEATURE_SLOTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FeatureKind {
    Gene,
    Regulon,
    Metric,
    Annotation,
    /// Clustering column, named after the clustering.
    Clustering(String),
    #[default]
    Empty,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Gene => write!(f, "gene"),
            FeatureKind::Regulon => write!(f, "regulon"),
            FeatureKind::Metric => write!(f, "metric"),
            FeatureKind::Annotation => write!(f, "annotation"),
            FeatureKind::Clustering(name) => write!(f, "Clustering: {name}"),
            FeatureKind::Empty => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Feature {
    pub kind: FeatureKind,
    pub value: String,
}

impl Feature {
    pub fn new(kind: FeatureKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn gene(symbol: impl Into<String>) -> Self {
        Self::new(FeatureKind::Gene, symbol)
    }

    pub fn is_empty(&self) -> bool {
        self.kind == FeatureKind::Empty || self.value.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Normalization {
    pub log_transform: bool,
    pub cpm_normalize: bool,
}

/// Up to three features plus normalisation flags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FeatureQuery {
    pub features: [Feature; FEATURE_SLOTS],
    pub normalization: Normalization,
}

impl FeatureQuery {
    /// Fills the slots in order; missing slots stay empty.
    pub fn new(features: &[Feature], normalization: Normalization) -> Result<Self> {
        if features.len() > FEATURE_SLOTS {
            return Err(ViewerError::DataShape(format!(
                "at most {FEATURE_SLOTS} features can be combined, got {}",
                features.len()
            )));
        }
        let mut query = FeatureQuery {
            normalization,
            ..Default::default()
        };
        for (slot, feature) in query.features.iter_mut().zip(features) {
            *slot = feature.clone();
        }
        Ok(query)
    }

    pub fn is_empty(&self) -> bool {
        self.features.iter().all(Feature::is_empty)
    }

    pub fn feature_types(&self) -> [String; FEATURE_SLOTS] {
        std::array::from_fn(|i| self.features[i].kind.to_string())
    }

    pub fn feature_values(&self) -> [String; FEATURE_SLOTS] {
        std::array::from_fn(|i| self.features[i].value.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoordinateReply {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColorReply {
    pub color: Vec<String>,
    /// Per-slot upper bound used to scale each channel.
    pub vmax: [f32; FEATURE_SLOTS],
}

/// Remote data service the viewer reads from. Connection lifecycle and
/// timeouts belong to the implementation.
pub trait ScopeBackend {
    fn get_coordinates(&self, loom_file_path: &str) -> impl Future<Output = Result<CoordinateReply>>;

    /// `None` means the cells should go back to neutral coloring.
    fn get_cell_color_by_features(
        &self,
        loom_file_path: &str,
        query: &FeatureQuery,
    ) -> impl Future<Output = Result<Option<ColorReply>>>;
}

/// Fetches and parses the color vector for `query`.
pub async fn resolve_colors<B: ScopeBackend>(
    backend: &B,
    loom_file_path: &str,
    query: &FeatureQuery,
) -> Result<Option<Vec<Rgb>>> {
    match backend.get_cell_color_by_features(loom_file_path, query).await? {
        Some(reply) => parse_color_vector(&reply.color).map(Some),
        None => Ok(None),
    }
}
