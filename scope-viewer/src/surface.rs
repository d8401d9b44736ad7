use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use image::ImageEncoder;
use image::codecs::png::PngEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters_bitmap::BitMapBackend;

use crate::color::Rgb;
use crate::geometry::Affine;
use crate::lasso::OverlayShape;
use crate::sprite::Sprite;

pub type ViewerDrawingArea<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Everything needed to draw one frame of the viewer.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub width: u32,
    pub height: u32,
    pub sprites: &'a [Sprite],
    pub layer: Affine,
    pub overlay: Affine,
    pub overlay_shapes: Vec<OverlayShape>,
    pub sprite_radius: f32,
}

/// A 2D drawing target for viewer frames.
pub trait Surface {
    fn present(&mut self, frame: &Frame<'_>) -> anyhow::Result<()>;
}

fn rgb(c: Rgb) -> RGBColor {
    RGBColor(c.r, c.g, c.b)
}

/// Rasterises frames into an RGB buffer and keeps the last one as PNG.
#[derive(Debug, Default)]
pub struct BitmapSurface {
    png: Vec<u8>,
    frames: u64,
}

impl BitmapSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", BASE64_STANDARD.encode(&self.png))
    }

    fn draw(area: &ViewerDrawingArea<'_>, frame: &Frame<'_>) -> anyhow::Result<()> {
        area.fill(&WHITE)?;

        let radius = frame.sprite_radius.round().max(1.0) as i32;
        let (w, h) = (frame.width as i32, frame.height as i32);
        for sprite in frame.sprites {
            let p = frame.layer.apply(sprite.position);
            let (x, y) = (p.x.round() as i32, p.y.round() as i32);
            if x < -radius || y < -radius || x > w + radius || y > h + radius {
                continue;
            }
            area.draw(&Circle::new((x, y), radius, rgb(sprite.tint).filled()))?;
        }

        for shape in &frame.overlay_shapes {
            match shape {
                OverlayShape::Polygon { points, style } => {
                    let pixels: Vec<(i32, i32)> = points
                        .iter()
                        .map(|p| {
                            let g = frame.overlay.apply(*p);
                            (g.x.round() as i32, g.y.round() as i32)
                        })
                        .collect();
                    area.draw(&Polygon::new(
                        pixels.clone(),
                        rgb(style.fill).mix(style.fill_opacity as f64).filled(),
                    ))?;
                    let mut outline = pixels;
                    if let Some(&first) = outline.first() {
                        outline.push(first);
                    }
                    area.draw(&PathElement::new(
                        outline,
                        rgb(style.stroke).stroke_width(style.stroke_width.round() as u32),
                    ))?;
                }
            }
        }
        area.present()?;
        Ok(())
    }
}

impl Surface for BitmapSurface {
    fn present(&mut self, frame: &Frame<'_>) -> anyhow::Result<()> {
        let (width, height) = (frame.width, frame.height);
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let area = BitMapBackend::with_buffer(buffer.as_mut_slice(), (width, height))
                .into_drawing_area();
            Self::draw(&area, frame)?;
        }

        let mut png_data = Vec::new();
        PngEncoder::new(Cursor::new(&mut png_data)).write_image(
            buffer.as_slice(),
            width,
            height,
            image::ColorType::Rgb8.into(),
        )?;
        self.png = png_data;
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::lasso::LASSO_STYLE;

    #[test]
    fn renders_png_with_sprites_and_overlay() {
        let sprites = vec![
            Sprite {
                raw: Point::default(),
                position: Point::new(5.0, 5.0),
                tint: Rgb::new(255, 0, 0),
            },
            Sprite {
                raw: Point::default(),
                position: Point::new(-50.0, 5.0),
                tint: Rgb::NEUTRAL,
            },
        ];
        let frame = Frame {
            width: 20,
            height: 10,
            sprites: &sprites,
            layer: Affine::IDENTITY,
            overlay: Affine::IDENTITY,
            overlay_shapes: vec![OverlayShape::Polygon {
                points: vec![Point::new(1.0, 1.0), Point::new(8.0, 1.0), Point::new(4.0, 8.0)],
                style: &LASSO_STYLE,
            }],
            sprite_radius: 2.5,
        };

        let mut surface = BitmapSurface::new();
        surface.present(&frame).unwrap();
        assert_eq!(surface.frames(), 1);
        assert_eq!(&surface.png()[1..4], b"PNG");
        assert!(surface.data_uri().starts_with("data:image/png;base64,"));
    }
}
