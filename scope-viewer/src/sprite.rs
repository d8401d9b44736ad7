use crate::color::Rgb;
use crate::coords::CoordinateSet;
use crate::error::{Result, ViewerError};
use crate::geometry::{Affine, Point};

/// On-screen representation of one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    /// Dataset coordinate.
    pub raw: Point,
    /// Pixel position inside the sprite layer.
    pub position: Point,
    pub tint: Rgb,
}

/// Maps dataset coordinates to unzoomed pixels:
/// `pixel = coord * unit_scale + center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub unit_scale: f32,
    pub center: Point,
}

impl Placement {
    pub fn raw_pixel(&self, coord: Point) -> Point {
        Point::new(
            coord.x * self.unit_scale + self.center.x,
            coord.y * self.unit_scale + self.center.y,
        )
    }

    pub fn pixel(&self, coord: Point, k: f32) -> Point {
        let raw = self.raw_pixel(coord);
        Point::new(raw.x * k, raw.y * k)
    }
}

/// Fixed-capacity particle layer. Every mutation marks the layer dirty; the
/// owner presents a frame and clears the flag with [`SpriteLayer::take_redraw`].
#[derive(Debug, Clone)]
pub struct SpriteLayer {
    sprites: Vec<Sprite>,
    capacity: usize,
    placement: Placement,
    transform: Affine,
    dirty: bool,
}

impl SpriteLayer {
    pub fn new(capacity: usize, placement: Placement) -> Self {
        Self {
            sprites: Vec::new(),
            capacity,
            placement,
            transform: Affine::IDENTITY,
            dirty: true,
        }
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    pub fn get(&self, index: usize) -> Option<&Sprite> {
        self.sprites.get(index)
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn transform(&self) -> Affine {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Affine) {
        if self.transform != transform {
            self.transform = transform;
            self.dirty = true;
        }
    }

    /// Replaces every sprite with one neutral sprite per coordinate, placed
    /// at zoom `k`. Nothing changes if the set does not fit.
    pub fn initialize(&mut self, coords: &CoordinateSet, k: f32) -> Result<()> {
        if coords.len() > self.capacity {
            return Err(ViewerError::CapacityExceeded {
                requested: coords.len(),
                capacity: self.capacity,
            });
        }
        let placement = self.placement;
        self.sprites = coords
            .iter()
            .map(|(x, y)| {
                let raw = Point::new(x, y);
                Sprite {
                    raw,
                    position: placement.pixel(raw, k),
                    tint: Rgb::NEUTRAL,
                }
            })
            .collect();
        self.dirty = true;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.sprites.clear();
        self.dirty = true;
    }

    /// Swaps in a full replacement set with new tints. The old set stays in
    /// place until the replacement is complete.
    pub fn recolor(&mut self, colors: &[Rgb]) -> Result<()> {
        if colors.len() != self.sprites.len() {
            return Err(ViewerError::DataShape(format!(
                "color vector has {} entries for {} sprites",
                colors.len(),
                self.sprites.len()
            )));
        }
        let replacement: Vec<Sprite> = self
            .sprites
            .iter()
            .zip(colors)
            .map(|(s, &tint)| Sprite { tint, ..*s })
            .collect();
        self.sprites = replacement;
        self.dirty = true;
        Ok(())
    }

    pub fn reset(&mut self) {
        for s in self.sprites.iter_mut() {
            s.tint = Rgb::NEUTRAL;
        }
        self.dirty = true;
    }

    /// Tints a subset, asking `color_of` for each index.
    pub fn tint_each(&mut self, indices: &[usize], mut color_of: impl FnMut(usize) -> Rgb) -> Result<()> {
        self.check_indices(indices)?;
        for &i in indices {
            self.sprites[i].tint = color_of(i);
        }
        self.dirty = true;
        Ok(())
    }

    /// Recomputes pixel positions of exactly `indices` at zoom `k`.
    pub fn reposition(&mut self, indices: &[usize], k: f32) -> Result<()> {
        self.check_indices(indices)?;
        let placement = self.placement;
        for &i in indices {
            let sprite = &mut self.sprites[i];
            sprite.position = placement.pixel(sprite.raw, k);
        }
        self.dirty = true;
        Ok(())
    }

    pub fn reposition_all(&mut self, k: f32) {
        let placement = self.placement;
        for sprite in self.sprites.iter_mut() {
            sprite.position = placement.pixel(sprite.raw, k);
        }
        self.dirty = true;
    }

    /// Sprite position in stage (global) pixels.
    pub fn global_position(&self, index: usize) -> Option<Point> {
        self.sprites.get(index).map(|s| self.transform.apply(s.position))
    }

    pub fn needs_redraw(&self) -> bool {
        self.dirty
    }

    pub fn take_redraw(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    fn check_indices(&self, indices: &[usize]) -> Result<()> {
        let len = self.sprites.len();
        match indices.iter().find(|&&i| i >= len) {
            Some(&index) => Err(ViewerError::IndexOutOfRange { index, len }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(capacity: usize) -> SpriteLayer {
        SpriteLayer::new(
            capacity,
            Placement {
                unit_scale: 10.0,
                center: Point::new(100.0, 50.0),
            },
        )
    }

    fn coords() -> CoordinateSet {
        CoordinateSet::new(vec![0.0, 1.0, -2.0], vec![0.0, 2.0, 3.0]).unwrap()
    }

    #[test]
    fn initialize_places_one_neutral_sprite_per_cell() {
        let mut l = layer(10);
        l.initialize(&coords(), 2.0).unwrap();
        assert_eq!(l.len(), 3);
        assert!(l.sprites().iter().all(|s| s.tint == Rgb::NEUTRAL));
        assert_eq!(l.get(1).unwrap().position, Point::new(220.0, 140.0));
        assert_eq!(l.get(2).unwrap().position, Point::new(160.0, 160.0));
    }

    #[test]
    fn capacity_overflow_leaves_layer_untouched() {
        let mut l = layer(2);
        let small = CoordinateSet::new(vec![1.0], vec![1.0]).unwrap();
        l.initialize(&small, 1.0).unwrap();

        let err = l.initialize(&coords(), 1.0).unwrap_err();
        assert_eq!(
            err,
            ViewerError::CapacityExceeded {
                requested: 3,
                capacity: 2
            }
        );
        assert_eq!(l.len(), 1);
    }

    #[test]
    fn recolor_keeps_positions() {
        let mut l = layer(10);
        l.initialize(&coords(), 1.0).unwrap();
        let before: Vec<Point> = l.sprites().iter().map(|s| s.position).collect();
        let red = Rgb::new(255, 0, 0);
        l.recolor(&[red, red, Rgb::NEUTRAL]).unwrap();

        let after: Vec<Point> = l.sprites().iter().map(|s| s.position).collect();
        assert_eq!(before, after);
        assert_eq!(l.get(0).unwrap().tint, red);
        assert!(matches!(l.recolor(&[red]), Err(ViewerError::DataShape(_))));
    }

    #[test]
    fn reposition_touches_only_given_indices() {
        let mut l = layer(10);
        l.initialize(&coords(), 1.0).unwrap();
        l.reposition(&[2], 3.0).unwrap();
        assert_eq!(l.get(0).unwrap().position, Point::new(100.0, 50.0));
        assert_eq!(l.get(2).unwrap().position, Point::new(240.0, 240.0));
        assert_eq!(
            l.reposition(&[5], 1.0),
            Err(ViewerError::IndexOutOfRange { index: 5, len: 3 })
        );
    }

    #[test]
    fn mutations_mark_dirty() {
        let mut l = layer(10);
        l.initialize(&coords(), 1.0).unwrap();
        assert!(l.take_redraw());
        assert!(!l.needs_redraw());
        l.tint_each(&[0], |_| Rgb::new(1, 2, 3)).unwrap();
        assert!(l.take_redraw());
        l.set_transform(Affine::IDENTITY);
        assert!(!l.needs_redraw());
        l.set_transform(Affine::translate(3.0, 4.0));
        assert_eq!(l.global_position(0), Some(Point::new(103.0, 54.0)));
        assert!(l.needs_redraw());
    }
}
