//! Core of an interactive single-cell embedding viewer: cell sprites placed
//! from 2D coordinates, colored by up to three features, with semantic or
//! geometric zoom and lasso selections.

pub mod bench;
pub mod color;
pub mod config;
pub mod coords;
pub mod error;
pub mod expression;
pub mod geometry;
pub mod lasso;
pub mod request;
pub mod resolver;
pub mod selection;
pub mod settings;
pub mod sprite;
pub mod surface;
pub mod viewer;
pub mod zoom;

pub use color::Rgb;
pub use config::ViewerConfig;
pub use error::{Result, ViewerError};
pub use expression::{Dataset, MemoryBackend};
pub use geometry::{Affine, Point};
pub use resolver::{Feature, FeatureKind, FeatureQuery, ScopeBackend};
pub use selection::LassoSelection;
pub use settings::{Settings, SettingsHandle};
pub use surface::{BitmapSurface, Surface};
pub use viewer::{Tool, Viewer, load_dataset, refresh_colors};
pub use zoom::{Gesture, ZoomBehavior, ZoomMode};
