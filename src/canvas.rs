//! Off-screen RGBA drawing surface.
//!
//! Callers draw in logical pixels; the canvas owns a device buffer where each
//! device pixel spans `scale` logical pixels. Pixels are stored premultiplied
//! (`[r, g, b, a]`, color channels in 0..=255, alpha in 0..=1) and every
//! primitive composites source-over with an analytic coverage term, so shapes
//! much smaller than a device pixel still leave a faint mark.

use crate::color::{Rgb, Rgba};
use std::ops::Range;

pub type Pixel = [f32; 4];

/// Ordered color stops, sampled the way a 2D canvas gradient is.
#[derive(Clone, Debug, Default)]
pub struct Gradient {
    stops: Vec<(f32, Rgba)>,
}

impl Gradient {
    pub fn new() -> Self {
        Self { stops: Vec::new() }
    }

    pub fn linear(from: Rgba, to: Rgba) -> Self {
        Self::new().stop(0.0, from).stop(1.0, to)
    }

    /// Adds a stop. Offsets are clamped to [0, 1]; stops must be added in order.
    pub fn stop(mut self, offset: f32, color: Rgba) -> Self {
        self.stops.push((offset.clamp(0.0, 1.0), color));
        self
    }

    /// Interpolates in premultiplied space, so fading to a transparent stop
    /// keeps the hue instead of darkening toward black.
    pub fn at(&self, t: f32) -> Rgba {
        let (Some(first), Some(last)) = (self.stops.first(), self.stops.last()) else {
            return Rgba::TRANSPARENT;
        };
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        if t <= first.0 {
            return first.1;
        }
        for pair in self.stops.windows(2) {
            let (a_off, a) = pair[0];
            let (b_off, b) = pair[1];
            if t <= b_off {
                let span = b_off - a_off;
                let f = if span > 0.0 { (t - a_off) / span } else { 1.0 };
                return mix_premultiplied(a, b, f);
            }
        }
        last.1
    }
}

fn mix_premultiplied(a: Rgba, b: Rgba, f: f32) -> Rgba {
    let alpha = a.alpha + (b.alpha - a.alpha) * f;
    if alpha <= 0.0 {
        return Rgba::new(b.rgb, 0.0);
    }
    let channel = |ca: u8, cb: u8| {
        let pa = ca as f32 * a.alpha;
        let pb = cb as f32 * b.alpha;
        ((pa + (pb - pa) * f) / alpha).round().clamp(0.0, 255.0) as u8
    };
    Rgba::new(
        (
            channel(a.rgb.0, b.rgb.0),
            channel(a.rgb.1, b.rgb.1),
            channel(a.rgb.2, b.rgb.2),
        ),
        alpha,
    )
}

pub struct Canvas {
    width: usize,
    height: usize,
    scale: f32,
    pixels: Vec<Pixel>,
}

impl Canvas {
    pub fn new(width: usize, height: usize, scale: f32) -> Self {
        Self {
            width,
            height,
            scale: if scale > 0.0 { scale } else { 1.0 },
            pixels: vec![[0.0; 4]; width * height],
        }
    }

    /// Device width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Device height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Pixel> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    /// Resizes the device buffer; contents are discarded like a canvas resize.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width * height, [0.0; 4]);
    }

    pub fn clear(&mut self) {
        self.pixels.fill([0.0; 4]);
    }

    /// Paints `color` over the whole surface. With a low alpha this leaves a
    /// fading trail of the previous frames.
    pub fn fill(&mut self, color: Rgba) {
        let alpha = color.alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        for px in &mut self.pixels {
            over(px, color.rgb, alpha);
        }
    }

    /// Top-to-bottom gradient across the full surface.
    pub fn fill_vertical_gradient(&mut self, gradient: &Gradient) {
        if self.height == 0 {
            return;
        }
        for y in 0..self.height {
            let color = gradient.at((y as f32 + 0.5) / self.height as f32);
            let row = &mut self.pixels[y * self.width..(y + 1) * self.width];
            for px in row {
                over(px, color.rgb, color.alpha);
            }
        }
    }

    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba) {
        self.paint_disc(cx, cy, radius, |_| color);
    }

    /// Fills a circle of `outer` radius with a radial gradient running from
    /// `inner` to `outer`, both centered on (cx, cy).
    pub fn fill_radial(&mut self, cx: f32, cy: f32, inner: f32, outer: f32, gradient: &Gradient) {
        let span = outer - inner;
        self.paint_disc(cx, cy, outer, |dist| {
            let t = if span > 0.0 {
                (dist - inner) / span
            } else if dist < inner {
                0.0
            } else {
                1.0
            };
            gradient.at(t)
        });
    }

    /// Strokes a circle of `radius`. The gradient is radial from the center
    /// out to `radius`, so `t` is the distance over the radius.
    pub fn stroke_ring(&mut self, cx: f32, cy: f32, radius: f32, width: f32, gradient: &Gradient) {
        if radius <= 0.0 || width <= 0.0 {
            return;
        }
        let (dcx, dcy) = (cx / self.scale, cy / self.scale);
        let dr = radius / self.scale;
        let half = width / self.scale / 2.0;
        let reach = dr + half + 0.5;
        let xs = span(dcx - reach, dcx + reach, self.width);
        let ys = span(dcy - reach, dcy + reach, self.height);
        for py in ys {
            for px in xs.clone() {
                let dx = px as f32 + 0.5 - dcx;
                let dy = py as f32 + 0.5 - dcy;
                let dist = (dx * dx + dy * dy).sqrt();
                let coverage = (half + 0.5 - (dist - dr).abs()).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let color = gradient.at(dist / dr);
                self.blend(px, py, color.rgb, color.alpha * coverage);
            }
        }
    }

    /// Strokes a segment whose color follows `gradient` from (x0, y0) to (x1, y1).
    pub fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: f32, gradient: &Gradient) {
        if width <= 0.0 {
            return;
        }
        let s = self.scale;
        let (ax, ay, bx, by) = (x0 / s, y0 / s, x1 / s, y1 / s);
        let half = width / s / 2.0;
        let reach = half + 0.5;
        let xs = span(ax.min(bx) - reach, ax.max(bx) + reach, self.width);
        let ys = span(ay.min(by) - reach, ay.max(by) + reach, self.height);
        for py in ys {
            for px in xs.clone() {
                let (t, dist) = project(px as f32 + 0.5, py as f32 + 0.5, ax, ay, bx, by);
                let coverage = (half + 0.5 - dist).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let color = gradient.at(t);
                self.blend(px, py, color.rgb, color.alpha * coverage);
            }
        }
    }

    /// Strokes a connected path in a single color. Each pixel is painted once,
    /// using its distance to the nearest segment, so joints do not double up.
    pub fn stroke_polyline(&mut self, points: &[(f32, f32)], width: f32, color: Rgba) {
        if points.len() < 2 || width <= 0.0 {
            return;
        }
        let s = self.scale;
        let device: Vec<(f32, f32)> = points.iter().map(|&(x, y)| (x / s, y / s)).collect();
        let half = width / s / 2.0;
        let reach = half + 0.5;
        let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
        let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
        for &(x, y) in &device {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let xs = span(min_x - reach, max_x + reach, self.width);
        let ys = span(min_y - reach, max_y + reach, self.height);
        for py in ys {
            for px in xs.clone() {
                let (cx, cy) = (px as f32 + 0.5, py as f32 + 0.5);
                let dist = device
                    .windows(2)
                    .map(|seg| project(cx, cy, seg[0].0, seg[0].1, seg[1].0, seg[1].1).1)
                    .fold(f32::INFINITY, f32::min);
                let coverage = (half + 0.5 - dist).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend(px, py, color.rgb, color.alpha * coverage);
                }
            }
        }
    }

    /// Quadratic Bézier from `start` to `end` bent toward `control`.
    pub fn stroke_quadratic(
        &mut self,
        start: (f32, f32),
        control: (f32, f32),
        end: (f32, f32),
        width: f32,
        color: Rgba,
    ) {
        const SEGMENTS: usize = 16;
        let points: Vec<(f32, f32)> = (0..=SEGMENTS)
            .map(|i| {
                let t = i as f32 / SEGMENTS as f32;
                let u = 1.0 - t;
                (
                    u * u * start.0 + 2.0 * u * t * control.0 + t * t * end.0,
                    u * u * start.1 + 2.0 * u * t * control.1 + t * t * end.1,
                )
            })
            .collect();
        self.stroke_polyline(&points, width, color);
    }

    // `shade` receives the logical distance from the center
    fn paint_disc(&mut self, cx: f32, cy: f32, radius: f32, shade: impl Fn(f32) -> Rgba) {
        if radius <= 0.0 || !radius.is_finite() {
            return;
        }
        let (dcx, dcy) = (cx / self.scale, cy / self.scale);
        let dr = radius / self.scale;
        let reach = dr + 0.5;
        let xs = span(dcx - reach, dcx + reach, self.width);
        let ys = span(dcy - reach, dcy + reach, self.height);
        for py in ys {
            for px in xs.clone() {
                let dx = px as f32 + 0.5 - dcx;
                let dy = py as f32 + 0.5 - dcy;
                let dist = (dx * dx + dy * dy).sqrt();
                let coverage = (dr + 0.5 - dist).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                let color = shade(dist * self.scale);
                self.blend(px, py, color.rgb, color.alpha * coverage);
            }
        }
    }

    fn blend(&mut self, x: usize, y: usize, rgb: Rgb, alpha: f32) {
        let alpha = alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let idx = y * self.width + x;
        over(&mut self.pixels[idx], rgb, alpha);
    }
}

fn over(px: &mut Pixel, rgb: Rgb, alpha: f32) {
    let keep = 1.0 - alpha;
    px[0] = rgb.0 as f32 * alpha + px[0] * keep;
    px[1] = rgb.1 as f32 * alpha + px[1] * keep;
    px[2] = rgb.2 as f32 * alpha + px[2] * keep;
    px[3] = alpha + px[3] * keep;
}

// Device pixel indices whose centers may fall within [lo, hi]
fn span(lo: f32, hi: f32, limit: usize) -> Range<usize> {
    if !(lo.is_finite() && hi.is_finite()) || hi < 0.0 {
        return 0..0;
    }
    let start = lo.floor().max(0.0) as usize;
    let end = (hi.ceil().max(0.0) as usize).min(limit);
    start.min(end)..end
}

// Returns (t along the segment, distance to the segment)
fn project(px: f32, py: f32, ax: f32, ay: f32, bx: f32, by: f32) -> (f32, f32) {
    let (vx, vy) = (bx - ax, by - ay);
    let len_sq = vx * vx + vy * vy;
    let t = if len_sq > 0.0 {
        (((px - ax) * vx + (py - ay) * vy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (qx, qy) = (ax + vx * t, ay + vy * t);
    let (dx, dy) = (px - qx, py - qy);
    (t, (dx * dx + dy * dy).sqrt())
}
