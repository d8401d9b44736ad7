//! In-process backend that colors cells from expression values, the way the
//! SCope server does: each of up to three numeric features drives one RGB
//! channel, scaled by the feature's 99th percentile.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::color::{CATEGORY_PALETTE, Rgb};
use crate::error::{Result, ViewerError};
use crate::resolver::{
    ColorReply, CoordinateReply, FEATURE_SLOTS, Feature, FeatureKind, FeatureQuery, Normalization,
    ScopeBackend,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    /// Raw counts per gene, one value per cell.
    pub genes: HashMap<String, Vec<f32>>,
    /// AUC values per regulon.
    pub regulons: HashMap<String, Vec<f32>>,
    pub metrics: HashMap<String, Vec<f32>>,
    /// Categorical columns, also used for clusterings.
    pub annotations: HashMap<String, Vec<String>>,
}

impl Dataset {
    pub fn load_json(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid dataset {}", path.display()))
    }

    pub fn cell_count(&self) -> usize {
        self.x.len()
    }

    fn total_counts(&self) -> Vec<f32> {
        let mut totals = vec![0.0; self.cell_count()];
        for values in self.genes.values() {
            for (t, v) in totals.iter_mut().zip(values) {
                *t += v;
            }
        }
        totals
    }

    fn numeric(&self, feature: &Feature, normalization: Normalization) -> Result<Vec<f32>> {
        let lookup = |table: &HashMap<String, Vec<f32>>| {
            table
                .get(&feature.value)
                .cloned()
                .ok_or_else(|| ViewerError::Backend(format!("Unknown {} {:?}", feature.kind, feature.value)))
        };
        match feature.kind {
            FeatureKind::Gene => {
                let mut values = lookup(&self.genes)?;
                if normalization.cpm_normalize {
                    for (v, total) in values.iter_mut().zip(self.total_counts()) {
                        *v = if total > 0.0 { *v / total * 1e6 } else { 0.0 };
                    }
                }
                if normalization.log_transform {
                    values.iter_mut().for_each(|v| *v = v.ln_1p());
                }
                Ok(values)
            }
            FeatureKind::Regulon => lookup(&self.regulons),
            FeatureKind::Metric => {
                let mut values = lookup(&self.metrics)?;
                if normalization.log_transform {
                    values.iter_mut().for_each(|v| *v = v.ln_1p());
                }
                Ok(values)
            }
            _ => Err(ViewerError::Backend(format!(
                "{} is not a numeric feature",
                feature.kind
            ))),
        }
    }

    fn categorical(&self, column: &str) -> Result<Vec<Rgb>> {
        let labels = self
            .annotations
            .get(column)
            .ok_or_else(|| ViewerError::Backend(format!("Unknown annotation {column:?}")))?;
        if labels.len() != self.cell_count() {
            return Err(ViewerError::Backend(format!(
                "Annotation {column:?} has {} labels for {} cells",
                labels.len(),
                self.cell_count()
            )));
        }
        let mut categories: Vec<&str> = Vec::new();
        Ok(labels
            .iter()
            .map(|label| {
                let slot = match categories.iter().position(|c| *c == label.as_str()) {
                    Some(slot) => slot,
                    None => {
                        categories.push(label);
                        categories.len() - 1
                    }
                };
                CATEGORY_PALETTE[slot % CATEGORY_PALETTE.len()]
            })
            .collect())
    }
}

/// 99th percentile with linear interpolation, falling back to the maximum
/// when the percentile is zero and to 0.01 when everything is zero.
pub fn vmax(values: &[f32]) -> f32 {
    let mut sorted: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return 0.01;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let max = sorted[sorted.len() - 1];
    let pos = 0.99 * (sorted.len() - 1) as f32;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let mut v = sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f32);
    if v == 0.0 && max != 0.0 {
        v = max;
    }
    if v == 0.0 {
        v = 0.01;
    }
    v
}

fn channel(value: f32, vmax: f32) -> u8 {
    (value / vmax * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Server-style compressed color: the high nibble of each channel.
pub fn compress_hex(color: Rgb) -> String {
    let a = color.to_u32();
    format!("{:x}{:x}{:x}", a >> 20 & 0xf, a >> 12 & 0xf, a >> 4 & 0xf)
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    datasets: HashMap<String, Dataset>,
    compress: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit three-digit compressed colors instead of six digits.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn insert(&mut self, loom_file_path: impl Into<String>, dataset: Dataset) {
        self.datasets.insert(loom_file_path.into(), dataset);
    }

    fn dataset(&self, loom_file_path: &str) -> Result<&Dataset> {
        self.datasets
            .get(loom_file_path)
            .ok_or_else(|| ViewerError::Backend(format!("Unknown loom file {loom_file_path:?}")))
    }

    /// Colors for `query` on `loom_file_path`; `None` when no slot is set.
    pub fn colors(&self, loom_file_path: &str, query: &FeatureQuery) -> Result<Option<ColorReply>> {
        let dataset = self.dataset(loom_file_path)?;
        if query.is_empty() {
            return Ok(None);
        }
        let n = dataset.cell_count();

        for feature in query.features.iter().filter(|f| !f.is_empty()) {
            match &feature.kind {
                FeatureKind::Annotation => {
                    return Ok(Some(self.reply(dataset.categorical(&feature.value)?, Default::default())));
                }
                FeatureKind::Clustering(name) => {
                    return Ok(Some(self.reply(dataset.categorical(name)?, Default::default())));
                }
                _ => {}
            }
        }

        let mut channels: [Option<Vec<u8>>; FEATURE_SLOTS] = Default::default();
        let mut vmaxes = [0.0; FEATURE_SLOTS];
        for (slot, feature) in query.features.iter().enumerate() {
            if feature.is_empty() {
                continue;
            }
            let values = dataset.numeric(feature, query.normalization)?;
            if values.len() != n {
                return Err(ViewerError::Backend(format!(
                    "{} {:?} has {} values for {n} cells",
                    feature.kind,
                    feature.value,
                    values.len()
                )));
            }
            let v = vmax(&values);
            vmaxes[slot] = v;
            channels[slot] = Some(values.iter().map(|&x| channel(x, v)).collect());
        }

        let at = |slot: usize, i: usize| channels[slot].as_ref().map_or(0, |c| c[i]);
        let colors = (0..n).map(|i| Rgb::new(at(0, i), at(1, i), at(2, i))).collect();
        Ok(Some(self.reply(colors, vmaxes)))
    }

    fn reply(&self, colors: Vec<Rgb>, vmax: [f32; FEATURE_SLOTS]) -> ColorReply {
        let color = colors
            .into_iter()
            .map(|c| if self.compress { compress_hex(c) } else { c.to_hex() })
            .collect();
        ColorReply { color, vmax }
    }
}

impl ScopeBackend for MemoryBackend {
    async fn get_coordinates(&self, loom_file_path: &str) -> Result<CoordinateReply> {
        let dataset = self.dataset(loom_file_path)?;
        Ok(CoordinateReply {
            x: dataset.x.clone(),
            y: dataset.y.clone(),
        })
    }

    async fn get_cell_color_by_features(
        &self,
        loom_file_path: &str,
        query: &FeatureQuery,
    ) -> Result<Option<ColorReply>> {
        self.colors(loom_file_path, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve_colors;

    fn dataset() -> Dataset {
        let mut d = Dataset {
            x: vec![0.0, 1.0, 2.0, 3.0],
            y: vec![0.0, 1.0, 2.0, 3.0],
            ..Default::default()
        };
        d.genes.insert("Actb".into(), vec![0.0, 1.0, 2.0, 4.0]);
        d.genes.insert("Gapdh".into(), vec![4.0, 0.0, 0.0, 0.0]);
        d.annotations.insert(
            "tissue".into(),
            vec!["brain".into(), "gut".into(), "brain".into(), "eye".into()],
        );
        d
    }

    fn raw() -> Normalization {
        Normalization::default()
    }

    #[test]
    fn vmax_uses_percentile_with_fallbacks() {
        let values: Vec<f32> = (0..=100).map(|v| v as f32).collect();
        assert!((vmax(&values) - 99.0).abs() < 1e-4);
        assert_eq!(vmax(&[0.0, 0.0, 0.0]), 0.01);
        let mut sparse = vec![0.0; 200];
        sparse[0] = 5.0;
        assert_eq!(vmax(&sparse), 5.0);
    }

    #[test]
    fn slots_map_to_rgb_channels() {
        let mut backend = MemoryBackend::new();
        backend.insert("a.loom", dataset());
        let query = FeatureQuery::new(
            &[Feature::gene("Actb"), Feature::default(), Feature::gene("Gapdh")],
            raw(),
        )
        .unwrap();
        let reply = backend.colors("a.loom", &query).unwrap().unwrap();

        assert_eq!(reply.color.len(), 4);
        // Actb drives red; the last cell sits at the top of its range
        assert_eq!(reply.color[3], "ff0000");
        assert_eq!(&reply.color[0][..2], "00");
        assert_eq!(&reply.color[0][4..], "ff");
        assert_eq!(reply.vmax[1], 0.0);
    }

    #[test]
    fn cpm_and_log_are_applied_to_genes() {
        let d = dataset();
        let norm = Normalization {
            log_transform: true,
            cpm_normalize: true,
        };
        let values = d.numeric(&Feature::gene("Gapdh"), norm).unwrap();
        assert!((values[0] - (1e6f32).ln_1p()).abs() < 1e-3);
        assert_eq!(values[1], 0.0);
    }

    #[test]
    fn annotation_colors_by_category() {
        let mut backend = MemoryBackend::new();
        backend.insert("a.loom", dataset());
        let query = FeatureQuery::new(&[Feature::new(FeatureKind::Annotation, "tissue")], raw()).unwrap();
        let reply = backend.colors("a.loom", &query).unwrap().unwrap();
        assert_eq!(reply.color[0], reply.color[2]);
        assert_ne!(reply.color[0], reply.color[1]);
        assert_eq!(reply.color[3], CATEGORY_PALETTE[2].to_hex());
    }

    #[test]
    fn short_annotation_column_is_rejected() {
        let mut d = dataset();
        d.annotations.insert("tissue".into(), vec!["brain".into(), "gut".into()]);
        let mut backend = MemoryBackend::new();
        backend.insert("a.loom", d);
        let query = FeatureQuery::new(&[Feature::new(FeatureKind::Annotation, "tissue")], raw()).unwrap();
        match backend.colors("a.loom", &query) {
            Err(ViewerError::Backend(message)) => assert!(message.contains("2 labels for 4 cells")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_query_means_reset() {
        let mut backend = MemoryBackend::new();
        backend.insert("a.loom", dataset());
        assert!(backend.colors("a.loom", &FeatureQuery::default()).unwrap().is_none());
    }

    #[test]
    fn unknown_inputs_are_backend_errors() {
        let mut backend = MemoryBackend::new();
        backend.insert("a.loom", dataset());
        let query = FeatureQuery::new(&[Feature::gene("Nope")], raw()).unwrap();
        assert!(matches!(backend.colors("a.loom", &query), Err(ViewerError::Backend(_))));
        assert!(matches!(backend.colors("b.loom", &query), Err(ViewerError::Backend(_))));
    }

    #[test]
    fn compressed_colors_parse_back() {
        assert_eq!(compress_hex(Rgb::from_u32(0xf1a2c3)), "fac");
        assert_eq!("fac".parse::<Rgb>().unwrap(), Rgb::from_u32(0xffaacc));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn resolves_through_the_backend_trait() {
        let mut backend = MemoryBackend::new().with_compression(true);
        backend.insert("a.loom", dataset());
        let query = FeatureQuery::new(&[Feature::gene("Actb")], raw()).unwrap();
        let colors = resolve_colors(&backend, "a.loom", &query).await.unwrap().unwrap();
        assert_eq!(colors[3], Rgb::new(0xff, 0, 0));
        assert_eq!(colors[0], Rgb::NEUTRAL);

        let coords = backend.get_coordinates("a.loom").await.unwrap();
        assert_eq!(coords.x.len(), 4);
    }
}
