use std::cell::RefCell;
use std::io::Write;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::bench::Benchmarks;
use crate::color::Rgb;
use crate::config::ViewerConfig;
use crate::coords::{CoordinateSet, CoordinateStore};
use crate::error::{Result, ViewerError};
use crate::geometry::{Affine, Point};
use crate::lasso::{Lasso, OverlayShape};
use crate::request::{ColorTicket, CoordinatesTicket, Epochs};
use crate::resolver::{CoordinateReply, Feature, FeatureQuery, ScopeBackend, resolve_colors};
use crate::selection::{LassoSelection, SelectionStore};
use crate::settings::SettingsHandle;
use crate::sprite::{Placement, Sprite, SpriteLayer};
use crate::surface::{Frame, Surface};
use crate::zoom::{Gesture, ZoomController, ZoomMode, ZoomOutcome};

/// Decides how pointer input is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    Lasso,
    #[default]
    SemanticZoom,
    GeometricZoom,
}

impl Tool {
    pub fn zoom_mode(self) -> ZoomMode {
        match self {
            Tool::GeometricZoom => ZoomMode::Geometric,
            Tool::Lasso | Tool::SemanticZoom => ZoomMode::Semantic,
        }
    }
}

/// The point-cloud viewer: sprites, zoom, lasso and selections for one
/// dataset at a time. All mutation happens through `&mut self`, so pointer
/// events and fetch completions are applied one after another.
pub struct Viewer {
    config: ViewerConfig,
    settings: SettingsHandle,
    tool: Tool,
    zoom: ZoomController,
    layer: SpriteLayer,
    lasso: Lasso,
    overlay_dirty: bool,
    presented_radius: Option<f32>,
    selections: SelectionStore,
    feature_colors: Option<Vec<Rgb>>,
    dataset: Option<Arc<str>>,
    loaded_epoch: Option<u64>,
    epochs: Epochs,
    store: CoordinateStore,
    rng: StdRng,
    benchmarks: Benchmarks,
}

impl Viewer {
    pub fn new(config: ViewerConfig, settings: SettingsHandle) -> anyhow::Result<Self> {
        config.validate()?;
        let (cx, cy) = config.center();
        let tool = Tool::default();
        Ok(Self {
            zoom: ZoomController::new(tool.zoom_mode(), config.scale_extent, config.deferred_rebin),
            layer: SpriteLayer::new(
                config.max_sprites,
                Placement {
                    unit_scale: config.unit_scale,
                    center: Point::new(cx, cy),
                },
            ),
            lasso: Lasso::default(),
            overlay_dirty: false,
            presented_radius: None,
            selections: SelectionStore::default(),
            feature_colors: None,
            dataset: None,
            loaded_epoch: None,
            epochs: Epochs::default(),
            store: CoordinateStore::new(config.coordinate_cache),
            rng: StdRng::from_entropy(),
            benchmarks: Benchmarks::default(),
            tool,
            settings,
            config,
        })
    }

    /// Fixes the selection color sequence.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn settings(&self) -> &SettingsHandle {
        &self.settings
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn set_tool(&mut self, tool: Tool) {
        if self.tool == tool {
            return;
        }
        log::debug!("Active tool {tool:?}");
        self.tool = tool;
        if tool != Tool::Lasso && self.lasso.is_drawing() {
            self.lasso.cancel();
            self.overlay_dirty = true;
        }
        if self.zoom.set_mode(tool.zoom_mode()) {
            self.layer.set_transform(Affine::IDENTITY);
            self.rebin(self.zoom.k());
        }
    }

    // ---- data ----

    pub fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    pub fn cached_coordinates(&self, path: &str) -> Option<Arc<CoordinateSet>> {
        self.store.get(path)
    }

    /// Starts loading `path`. Every response issued before this call becomes
    /// stale.
    pub fn begin_dataset(&mut self, path: &str) -> CoordinatesTicket {
        if self.lasso.is_drawing() {
            self.lasso.cancel();
            self.overlay_dirty = true;
        }
        self.epochs.next_dataset(Arc::from(path))
    }

    pub fn complete_coordinates(
        &mut self,
        ticket: &CoordinatesTicket,
        reply: CoordinateReply,
    ) -> Result<()> {
        self.epochs.check_coordinates(ticket)?;
        let set = match CoordinateSet::new(reply.x, reply.y) {
            Ok(set) => set,
            Err(e) => {
                self.fail_coordinates(ticket, &e);
                return Err(e);
            }
        };
        self.apply_coordinates(ticket, Arc::new(set))
    }

    /// Gives up on `ticket`. The dataset shown before it was issued stays
    /// loaded and can be recolored.
    pub fn fail_coordinates(&mut self, ticket: &CoordinatesTicket, error: &ViewerError) {
        if self.epochs.check_coordinates(ticket).is_err() {
            return;
        }
        log::warn!("Loading {} failed: {error}", ticket.path);
        if self.dataset.is_some() {
            self.loaded_epoch = Some(ticket.dataset_epoch);
        }
    }

    /// Replaces all sprites with one per cell of `set`. Selections and
    /// feature colors of the previous dataset are dropped.
    pub fn apply_coordinates(
        &mut self,
        ticket: &CoordinatesTicket,
        set: Arc<CoordinateSet>,
    ) -> Result<()> {
        self.epochs.check_coordinates(ticket)?;
        let k = self.zoom.k();
        let initialized = self
            .benchmarks
            .time("initializeDataPoints", || self.layer.initialize(&set, k));
        if let Err(e) = initialized {
            self.fail_coordinates(ticket, &e);
            return Err(e);
        }

        self.store.insert(ticket.path.clone(), set.clone());
        self.selections.clear();
        self.feature_colors = None;
        self.lasso.cancel();
        self.overlay_dirty = true;
        self.dataset = Some(ticket.path.clone());
        self.loaded_epoch = Some(ticket.dataset_epoch);
        log::info!("The coordinates have been loaded: {} cells from {}", set.len(), ticket.path);
        Ok(())
    }

    fn current_dataset(&self) -> Result<Arc<str>> {
        match (&self.dataset, self.loaded_epoch) {
            (Some(path), Some(epoch)) if epoch == self.epochs.dataset() => Ok(path.clone()),
            _ => Err(ViewerError::NoDataset),
        }
    }

    /// Starts a color request for the loaded dataset. Earlier color requests
    /// become stale.
    pub fn begin_colors(&mut self, features: &[Feature]) -> Result<ColorTicket> {
        let path = self.current_dataset()?;
        let query = FeatureQuery::new(features, self.settings.get().normalization())?;
        Ok(self.epochs.next_colors(path, query))
    }

    /// Applies a color vector, or neutral coloring for `None`. Visible
    /// selections are painted back on top.
    /// A ticket completes at most once.
    pub fn complete_colors(&mut self, ticket: &ColorTicket, colors: Option<Vec<Rgb>>) -> Result<()> {
        self.epochs.retire_colors(ticket)?;
        match colors {
            Some(colors) => {
                self.benchmarks.start("updateDataPoints");
                self.layer.recolor(&colors)?;
                self.benchmarks.end("updateDataPoints");
                self.feature_colors = Some(colors);
            }
            None => {
                self.benchmarks.time("resetDataPoints", || self.layer.reset());
                self.feature_colors = None;
            }
        }
        for selection in self.selections.iter().filter(|s| s.selected) {
            let color = selection.color;
            self.layer.tint_each(&selection.points, |_| color)?;
        }
        self.rebin(self.zoom.k());
        Ok(())
    }

    /// A failed color fetch leaves the cells neutral instead of erroring out.
    pub fn fail_colors(&mut self, ticket: &ColorTicket, error: &ViewerError) -> Result<()> {
        self.epochs.check_colors(ticket)?;
        log::warn!("Color request for {} failed: {error}", ticket.path);
        self.complete_colors(ticket, None)
    }

    pub fn feature_colors(&self) -> Option<&[Rgb]> {
        self.feature_colors.as_deref()
    }

    // ---- input ----

    pub fn pointer_down(&mut self, p: Point) {
        if self.tool == Tool::Lasso {
            self.lasso.begin(p);
            self.overlay_dirty = true;
        }
    }

    pub fn pointer_move(&mut self, p: Point, primary_held: bool) -> bool {
        if self.tool != Tool::Lasso {
            return false;
        }
        let grew = self.lasso.extend(p, primary_held);
        self.overlay_dirty |= grew;
        grew
    }

    /// Closes the lasso. Returns the id of the new selection, if the lasso
    /// enclosed more than one cell.
    pub fn pointer_up(&mut self) -> Result<Option<u32>> {
        let Some(polygon) = self.lasso.close() else {
            return Ok(None);
        };
        self.overlay_dirty = true;

        let members = self
            .benchmarks
            .time("getPointsInLasso", || self.lasso.members(&polygon, &self.layer));
        log::debug!("Number of selected points: {}", members.len());
        if members.len() < 2 {
            return Ok(None);
        }

        let color = Rgb::random(&mut self.rng);
        let id = self.selections.create(members, color).id;
        self.highlight(id)?;
        Ok(Some(id))
    }

    pub fn gesture(&mut self, gesture: Gesture) -> ZoomOutcome {
        let drawing = self.tool == Tool::Lasso && self.lasso.is_drawing();
        let outcome = self.zoom.on_gesture(gesture, drawing);
        match outcome {
            ZoomOutcome::Ignored => {}
            ZoomOutcome::Layer(transform) => self.layer.set_transform(transform),
            ZoomOutcome::Rebin { layer, k } => {
                self.layer.set_transform(layer);
                self.rebin(k);
            }
        }
        outcome
    }

    /// Applies a deferred semantic rescale, if one is pending.
    pub fn flush_zoom(&mut self) -> bool {
        match self.zoom.flush() {
            Some(k) => {
                self.rebin(k);
                true
            }
            None => false,
        }
    }

    fn rebin(&mut self, k: f32) {
        let name = format!("transformPoints{}", self.layer.len());
        self.benchmarks.start(name.as_str());
        self.layer.reposition_all(k);
        self.benchmarks.end(&name);
    }

    // ---- selections ----

    /// Paints the members of selection `id` with its color when visible, or
    /// with what lies underneath when hidden, and re-places them.
    fn highlight(&mut self, id: u32) -> Result<()> {
        let selection = self.selections.get(id)?;
        let (selected, color) = (selection.selected, selection.color);
        let selections = &self.selections;
        let feature_colors = self.feature_colors.as_deref();

        self.benchmarks.start("highlightPointsInLasso");
        self.layer.tint_each(&selection.points, |i| {
            if selected {
                color
            } else {
                selections
                    .visible_color(i)
                    .or_else(|| feature_colors.map(|c| c[i]))
                    .unwrap_or(Rgb::NEUTRAL)
            }
        })?;
        self.benchmarks.end("highlightPointsInLasso");
        self.layer.reposition(&selection.points, self.zoom.k())
    }

    pub fn toggle_selection(&mut self, id: u32) -> Result<bool> {
        let selected = self.selections.toggle(id)?.selected;
        self.highlight(id)?;
        Ok(selected)
    }

    /// Hides the selection, restoring its members' colors, then deletes it.
    pub fn remove_selection(&mut self, id: u32) -> Result<LassoSelection> {
        self.selections.set_visible(id, false)?;
        self.highlight(id)?;
        self.selections.remove(id)
    }

    pub fn export_selection<W: Write>(&self, id: u32, writer: W) -> anyhow::Result<()> {
        self.selections.export(id, writer)
    }

    pub fn selection(&self, id: u32) -> Result<&LassoSelection> {
        self.selections.get(id)
    }

    pub fn selections(&self) -> impl Iterator<Item = &LassoSelection> {
        self.selections.iter()
    }

    // ---- rendering ----

    /// Current zoom factor of either mode.
    pub fn zoom_scale(&self) -> f32 {
        self.zoom.scale()
    }

    pub fn sprite_count(&self) -> usize {
        self.layer.len()
    }

    pub fn sprites(&self) -> &[Sprite] {
        self.layer.sprites()
    }

    pub fn layer_transform(&self) -> Affine {
        self.layer.transform()
    }

    pub fn lasso_path(&self) -> &[Point] {
        self.lasso.path()
    }

    pub fn overlay_shapes(&self) -> Vec<OverlayShape> {
        self.lasso.overlay_shapes()
    }

    pub fn benchmarks(&self) -> &Benchmarks {
        &self.benchmarks
    }

    pub fn frame(&self) -> Frame<'_> {
        Frame {
            width: self.config.width,
            height: self.config.height,
            sprites: self.layer.sprites(),
            layer: self.layer.transform(),
            overlay: self.lasso.overlay_transform(),
            overlay_shapes: self.lasso.overlay_shapes(),
            sprite_radius: self.settings.get().sprite_scale,
        }
    }

    /// Presents a frame if anything changed since the last one. Returns
    /// whether a frame was drawn.
    pub fn render<S: Surface>(&mut self, surface: &mut S) -> anyhow::Result<bool> {
        self.flush_zoom();
        let layer_changed = self.layer.take_redraw();
        let overlay_changed = std::mem::replace(&mut self.overlay_dirty, false);
        let radius = self.settings.get().sprite_scale;
        let radius_changed = self.presented_radius.replace(radius) != Some(radius);
        if !(layer_changed || overlay_changed || radius_changed) {
            return Ok(false);
        }
        surface.present(&self.frame())?;
        Ok(true)
    }
}

fn log_stale(result: Result<()>) -> Result<()> {
    if let Err(e) = &result {
        if e.is_stale() {
            log::warn!("Dropping response: {e}");
        }
    }
    result
}

/// Fetches coordinates for `path` (or takes them from the cache) and installs
/// them, unless another dataset was requested meanwhile.
pub async fn load_dataset<B: ScopeBackend>(
    viewer: &RefCell<Viewer>,
    backend: &B,
    path: &str,
) -> Result<()> {
    let (ticket, cached) = {
        let mut v = viewer.borrow_mut();
        let ticket = v.begin_dataset(path);
        (ticket, v.cached_coordinates(path))
    };
    let set = match cached {
        Some(set) => set,
        None => {
            let fetched = backend
                .get_coordinates(path)
                .await
                .and_then(|reply| CoordinateSet::new(reply.x, reply.y));
            match fetched {
                Ok(set) => Arc::new(set),
                Err(e) => {
                    viewer.borrow_mut().fail_coordinates(&ticket, &e);
                    return Err(e);
                }
            }
        }
    };
    log_stale(viewer.borrow_mut().apply_coordinates(&ticket, set))
}

/// Requests colors for `features` on the loaded dataset and applies them,
/// unless the dataset or the feature selection changed meanwhile.
pub async fn refresh_colors<B: ScopeBackend>(
    viewer: &RefCell<Viewer>,
    backend: &B,
    features: &[Feature],
) -> Result<()> {
    let ticket = viewer.borrow_mut().begin_colors(features)?;
    let result = match resolve_colors(backend, &ticket.path, &ticket.query).await {
        Ok(colors) => viewer.borrow_mut().complete_colors(&ticket, colors),
        Err(e) => viewer.borrow_mut().fail_colors(&ticket, &e),
    };
    log_stale(result)
}
