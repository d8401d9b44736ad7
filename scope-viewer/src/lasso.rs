use crate::color::Rgb;
use crate::geometry::{Affine, Point, Polygon};
use crate::sprite::SpriteLayer;

#[derive(Debug, PartialEq, Clone)]
pub struct DrawingStyle {
    pub stroke: Rgb,
    pub fill: Rgb,
    pub fill_opacity: f32,
    pub stroke_width: f32,
}

pub static LASSO_STYLE: DrawingStyle = DrawingStyle {
    stroke: Rgb::NEUTRAL,
    fill: Rgb::from_u32(0x8bc5ff),
    fill_opacity: 0.4,
    stroke_width: 2.0,
};

#[derive(Debug, PartialEq, Clone)]
pub enum OverlayShape {
    Polygon {
        points: Vec<Point>,
        style: &'static DrawingStyle,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LassoState {
    #[default]
    Idle,
    Drawing { path: Vec<Point> },
}

/// Freehand lasso driven by pointer events. Points are recorded in stage
/// (global) pixels; the overlay layer may carry its own transform.
#[derive(Debug, Clone, Default)]
pub struct Lasso {
    state: LassoState,
    overlay: Affine,
}

impl Lasso {
    pub fn state(&self) -> &LassoState {
        &self.state
    }

    pub fn overlay_transform(&self) -> Affine {
        self.overlay
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, LassoState::Drawing { .. })
    }

    pub fn path(&self) -> &[Point] {
        match &self.state {
            LassoState::Drawing { path } => path.as_slice(),
            LassoState::Idle => &[],
        }
    }

    /// Drops any unclosed path and starts a new one at `p`.
    pub fn begin(&mut self, p: Point) {
        self.state = LassoState::Drawing {
            path: vec![self.overlay.invert(p)],
        };
    }

    /// Appends `p` while the primary button is held. Returns whether the path
    /// grew.
    pub fn extend(&mut self, p: Point, primary_held: bool) -> bool {
        let local = self.overlay.invert(p);
        match &mut self.state {
            LassoState::Drawing { path } if primary_held => {
                path.push(local);
                true
            }
            _ => false,
        }
    }

    /// Closes the path onto its first point and returns to idle.
    pub fn close(&mut self) -> Option<Polygon> {
        match std::mem::take(&mut self.state) {
            LassoState::Drawing { mut path } => {
                if let Some(&first) = path.first() {
                    path.push(first);
                }
                Some(Polygon::new(path))
            }
            LassoState::Idle => None,
        }
    }

    pub fn cancel(&mut self) {
        self.state = LassoState::Idle;
    }

    /// Shapes to draw over the sprites, in overlay-local coordinates. Paths
    /// of fewer than two points draw nothing.
    pub fn overlay_shapes(&self) -> Vec<OverlayShape> {
        let path = self.path();
        if path.len() < 2 {
            return vec![];
        }
        vec![OverlayShape::Polygon {
            points: path.to_vec(),
            style: &LASSO_STYLE,
        }]
    }

    /// Indices of every sprite inside `polygon`. Each sprite position is
    /// taken from the sprite layer into overlay space before testing.
    pub fn members(&self, polygon: &Polygon, layer: &SpriteLayer) -> Vec<usize> {
        let from = layer.transform();
        layer
            .sprites()
            .iter()
            .enumerate()
            .filter(|(_, s)| polygon.contains(Affine::to_local(s.position, &from, &self.overlay)))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::CoordinateSet;
    use crate::sprite::Placement;

    fn layer_at(points: &[(f32, f32)]) -> SpriteLayer {
        let mut layer = SpriteLayer::new(
            100,
            Placement {
                unit_scale: 1.0,
                center: Point::new(0.0, 0.0),
            },
        );
        let coords = CoordinateSet::new(
            points.iter().map(|p| p.0).collect(),
            points.iter().map(|p| p.1).collect(),
        )
        .unwrap();
        layer.initialize(&coords, 1.0).unwrap();
        layer
    }

    fn draw(lasso: &mut Lasso, path: &[(f32, f32)]) {
        lasso.begin(path[0].into());
        for &p in &path[1..] {
            lasso.extend(p.into(), true);
        }
    }

    #[test]
    fn triangle_selects_enclosed_cells() {
        let layer = layer_at(&[(10.0, 10.0), (20.0, 20.0), (100.0, 100.0)]);
        let mut lasso = Lasso::default();
        draw(&mut lasso, &[(0.0, 0.0), (50.0, 0.0), (0.0, 50.0)]);
        let polygon = lasso.close().unwrap();
        assert_eq!(lasso.members(&polygon, &layer), vec![0, 1]);
        assert!(!lasso.is_drawing());
    }

    #[test]
    fn moves_without_primary_button_are_ignored() {
        let mut lasso = Lasso::default();
        assert!(!lasso.extend(Point::new(1.0, 1.0), true));
        lasso.begin(Point::new(0.0, 0.0));
        assert!(!lasso.extend(Point::new(1.0, 1.0), false));
        assert!(lasso.extend(Point::new(2.0, 2.0), true));
        assert_eq!(lasso.path().len(), 2);
    }

    #[test]
    fn short_paths_draw_nothing() {
        let mut lasso = Lasso::default();
        lasso.begin(Point::new(0.0, 0.0));
        assert!(lasso.overlay_shapes().is_empty());
        lasso.extend(Point::new(5.0, 0.0), true);
        assert_eq!(lasso.overlay_shapes().len(), 1);
    }

    #[test]
    fn begin_discards_unclosed_path() {
        let mut lasso = Lasso::default();
        draw(&mut lasso, &[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)]);
        lasso.begin(Point::new(9.0, 9.0));
        assert_eq!(lasso.path(), &[Point::new(9.0, 9.0)]);
    }

    #[test]
    fn close_when_idle_is_none() {
        let mut lasso = Lasso::default();
        assert!(lasso.close().is_none());
    }

    #[test]
    fn membership_respects_layer_transform() {
        let mut layer = layer_at(&[(10.0, 10.0), (20.0, 20.0)]);
        // sprite layer shifted right by 100 px
        layer.set_transform(Affine::translate(100.0, 0.0));
        let mut lasso = Lasso::default();
        draw(&mut lasso, &[(0.0, 0.0), (40.0, 0.0), (40.0, 40.0), (0.0, 40.0)]);
        let polygon = lasso.close().unwrap();
        assert!(lasso.members(&polygon, &layer).is_empty());

        draw(&mut lasso, &[(100.0, 0.0), (140.0, 0.0), (140.0, 40.0), (100.0, 40.0)]);
        let polygon = lasso.close().unwrap();
        assert_eq!(lasso.members(&polygon, &layer), vec![0, 1]);
    }
}
