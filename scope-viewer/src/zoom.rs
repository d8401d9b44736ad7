use crate::geometry::{Affine, Point};

/// Translation and scale decoded from a pointer or wheel gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gesture {
    pub x: f32,
    pub y: f32,
    pub k: f32,
}

impl Gesture {
    pub const IDENTITY: Gesture = Gesture { x: 0.0, y: 0.0, k: 1.0 };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomMode {
    /// Rescale the rendered layer only.
    Geometric,
    /// Recompute every cell position at the new scale.
    Semantic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    pub mode: ZoomMode,
    pub k: f32,
    pub transform: Option<Gesture>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomOutcome {
    /// A lasso drag owns the pointer.
    Ignored,
    /// Only the sprite layer transform changes.
    Layer(Affine),
    /// Layer transform changes and every cell must be placed at `k`.
    Rebin { layer: Affine, k: f32 },
}

#[derive(Debug, Clone)]
pub struct ZoomController {
    state: ZoomState,
    extent: [f32; 2],
    deferred: bool,
    pending: Option<f32>,
}

impl ZoomController {
    pub fn new(mode: ZoomMode, extent: [f32; 2], deferred: bool) -> Self {
        Self {
            state: ZoomState {
                mode,
                k: 1.0,
                transform: None,
            },
            extent,
            deferred,
            pending: None,
        }
    }

    pub fn state(&self) -> &ZoomState {
        &self.state
    }

    pub fn mode(&self) -> ZoomMode {
        self.state.mode
    }

    /// Scale cells are placed at. Stays 1 in geometric mode, where the layer
    /// carries the scale.
    pub fn k(&self) -> f32 {
        self.state.k
    }

    /// Scale the user sees, whichever mode produced it.
    pub fn scale(&self) -> f32 {
        match self.state.mode {
            ZoomMode::Geometric => self.state.transform.map_or(1.0, |t| t.k),
            ZoomMode::Semantic => self.state.k,
        }
    }

    /// Switches mode and resets to unit scale. Returns whether the mode
    /// changed.
    pub fn set_mode(&mut self, mode: ZoomMode) -> bool {
        if self.state.mode == mode {
            return false;
        }
        self.state = ZoomState {
            mode,
            k: 1.0,
            transform: None,
        };
        self.pending = None;
        true
    }

    pub fn on_gesture(&mut self, gesture: Gesture, lasso_drawing: bool) -> ZoomOutcome {
        if lasso_drawing {
            return ZoomOutcome::Ignored;
        }
        let k = gesture.k.clamp(self.extent[0], self.extent[1]);
        let gesture = Gesture { k, ..gesture };
        self.state.transform = Some(gesture);

        match self.state.mode {
            ZoomMode::Geometric => ZoomOutcome::Layer(Affine::new(gesture.x, gesture.y, k)),
            ZoomMode::Semantic => {
                let layer = Affine::translate(gesture.x, gesture.y);
                if self.state.k == k {
                    return ZoomOutcome::Layer(layer);
                }
                self.state.k = k;
                if self.deferred {
                    self.pending = Some(k);
                    ZoomOutcome::Layer(layer)
                } else {
                    ZoomOutcome::Rebin { layer, k }
                }
            }
        }
    }

    /// Latest deferred semantic scale, returned once.
    pub fn flush(&mut self) -> Option<f32> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Accumulates wheel and drag input into a [`Gesture`], keeping the point
/// under the cursor fixed while scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomBehavior {
    transform: Gesture,
    extent: [f32; 2],
}

impl ZoomBehavior {
    pub fn new(extent: [f32; 2]) -> Self {
        Self {
            transform: Gesture::IDENTITY,
            extent,
        }
    }

    pub fn transform(&self) -> Gesture {
        self.transform
    }

    pub fn reset(&mut self) {
        self.transform = Gesture::IDENTITY;
    }

    /// Negative `delta_y` zooms in.
    pub fn wheel(&mut self, mouse: Point, delta_y: f32) -> Gesture {
        let factor = 2f32.powf(-delta_y * 0.002);
        self.zoom_at(mouse, self.transform.k * factor)
    }

    pub fn zoom_at(&mut self, mouse: Point, k: f32) -> Gesture {
        let old = self.transform;
        let k = k.clamp(self.extent[0], self.extent[1]);
        // world point under the mouse: (mouse - t) / k_old
        let wx = (mouse.x - old.x) / old.k;
        let wy = (mouse.y - old.y) / old.k;
        self.transform = Gesture {
            x: mouse.x - wx * k,
            y: mouse.y - wy * k,
            k,
        };
        self.transform
    }

    pub fn pan(&mut self, dx: f32, dy: f32) -> Gesture {
        self.transform.x += dx;
        self.transform.y += dy;
        self.transform
    }
}
