use super::Effect;
use crate::canvas::{Canvas, Gradient};
use crate::color::{palette_at, Rgb, Rgba, STARRY_NIGHT, WHITE};
use std::f32::consts::PI;

const PRIMARY_POINTS: usize = 500;
const SECONDARY_POINTS: usize = 200;
const STAR_DENSITY: f32 = 1000.0;
const BRUSH_STROKES: usize = 30;
const BRUSH_ALPHA: f32 = 0.1;
// Spiral points at least this big also get a perpendicular brush mark
const BRUSH_MARK_THRESHOLD: f32 = 1.5;

struct SpiralPoint {
    x: f32,
    y: f32,
    center_x: f32,
    center_y: f32,
    angle: f32,
    radius: f32,
    size: f32,
    speed: f32,
    color: Rgb,
    opacity: f32,
    pulse: f32,
}

impl SpiralPoint {
    fn advance(&mut self) {
        self.angle += self.speed;
        self.x = self.center_x + self.radius * self.angle.cos();
        self.y = self.center_y + self.radius * self.angle.sin();
        self.pulse += 0.05;
        self.size = (self.pulse.sin() * 0.5 + 1.0) * (self.radius / 100.0 + 1.0);
    }
}

struct BackgroundStar {
    x: f32,
    y: f32,
    size: f32,
    opacity: f32,
    pulse: f32,
    pulse_speed: f32,
}

/// Parameters for sampling one Archimedean spiral.
struct SpiralLayout {
    center: (f32, f32),
    max_radius: f32,
    points: usize,
    angle_step: f32,
    // max_radius is reached after this much accumulated angle
    turns_divisor: f32,
    palette_offset: f32,
    size: (f32, f32),
    speed: (f32, f32),
    opacity: (f32, f32),
}

/// Swirling "Starry Night" panel: two spirals of brush-colored points over a
/// night wash, with a ring of curved strokes turning around the center.
pub struct SpiralEffect {
    width: f32,
    height: f32,
    points: Vec<SpiralPoint>,
    stars: Vec<BackgroundStar>,
    time: f32,
}

impl SpiralEffect {
    pub fn new(width: f32, height: f32) -> Self {
        let mut effect = Self {
            width,
            height,
            points: Vec::new(),
            stars: Vec::new(),
            time: 0.0,
        };
        effect.create_spiral_points();
        effect.create_stars();
        effect
    }

    fn create_spiral_points(&mut self) {
        let center_x = self.width / 2.0;
        let center_y = self.height / 2.0;
        let max_radius = self.width.min(self.height) * 0.4;

        self.points.clear();
        self.add_spiral(&SpiralLayout {
            center: (center_x, center_y),
            max_radius,
            points: PRIMARY_POINTS,
            angle_step: 0.1,
            turns_divisor: 50.0,
            palette_offset: 0.0,
            size: (1.0, 2.0),
            speed: (0.002, 0.001),
            opacity: (0.7, 0.3),
        });
        self.add_spiral(&SpiralLayout {
            center: (center_x + max_radius * 0.5, center_y - max_radius * 0.3),
            max_radius: max_radius * 0.5,
            points: SECONDARY_POINTS,
            angle_step: 0.15,
            turns_divisor: 40.0,
            palette_offset: 0.5,
            size: (0.5, 1.5),
            speed: (0.003, 0.002),
            opacity: (0.6, 0.4),
        });
    }

    // Ranges are (base, spread): value = base + random * spread
    fn add_spiral(&mut self, layout: &SpiralLayout) {
        let (center_x, center_y) = layout.center;
        for i in 0..layout.points {
            let angle = layout.angle_step * i as f32;
            let radius = (layout.max_radius / layout.turns_divisor) * angle;
            if radius > layout.max_radius {
                break;
            }
            self.points.push(SpiralPoint {
                x: center_x + radius * angle.cos(),
                y: center_y + radius * angle.sin(),
                center_x,
                center_y,
                angle,
                radius,
                size: layout.size.0 + fastrand::f32() * layout.size.1,
                speed: layout.speed.0 + fastrand::f32() * layout.speed.1,
                color: palette_at(
                    &STARRY_NIGHT,
                    i as f32 / layout.points as f32 + layout.palette_offset,
                ),
                opacity: layout.opacity.0 + fastrand::f32() * layout.opacity.1,
                pulse: fastrand::f32() * PI * 2.0,
            });
        }
    }

    fn create_stars(&mut self) {
        let count = (self.width * self.height / STAR_DENSITY).floor().max(0.0) as usize;
        self.stars = (0..count)
            .map(|_| BackgroundStar {
                x: fastrand::f32() * self.width,
                y: fastrand::f32() * self.height,
                size: fastrand::f32() * 2.0,
                opacity: fastrand::f32() * 0.8,
                pulse: fastrand::f32() * PI * 2.0,
                pulse_speed: 0.02 + fastrand::f32() * 0.02,
            })
            .collect();
    }

    fn draw_brush_strokes(&self, canvas: &mut Canvas) {
        let center_x = self.width / 2.0;
        let center_y = self.height / 2.0;
        let radius = self.width.min(self.height) * 0.45 * 0.7;

        for i in 0..BRUSH_STROKES {
            let angle = (PI * 2.0 / BRUSH_STROKES as f32) * i as f32 + self.time * 0.1;
            let on_ray = |r: f32, a: f32| (center_x + r * a.cos(), center_y + r * a.sin());

            let color = palette_at(&STARRY_NIGHT, i as f32 / BRUSH_STROKES as f32);
            let width = 3.0 + (self.time + i as f32).sin() * 2.0;
            canvas.stroke_quadratic(
                on_ray(radius * 0.5, angle),
                on_ray(radius * 0.7, angle + 0.2),
                on_ray(radius, angle),
                width,
                Rgba::from(color).fade(BRUSH_ALPHA),
            );
        }
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn star_count(&self) -> usize {
        self.stars.len()
    }

    pub fn time(&self) -> f32 {
        self.time
    }
}

impl Effect for SpiralEffect {
    fn name(&self) -> &'static str {
        "spiral"
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.create_spiral_points();
        self.create_stars();
    }

    fn update(&mut self, _dt: f32) {
        self.time += 0.01;

        for point in &mut self.points {
            point.advance();
        }

        for star in &mut self.stars {
            star.pulse += star.pulse_speed;
            star.opacity = 0.3 + star.pulse.sin() * 0.3;
        }
    }

    fn draw(&self, canvas: &mut Canvas) {
        canvas.clear();
        canvas.fill_vertical_gradient(&Gradient::linear(
            Rgba::new((10, 20, 50), 0.8),
            Rgba::new((20, 40, 80), 0.8),
        ));

        for star in &self.stars {
            canvas.fill_circle(star.x, star.y, star.size, Rgba::new(WHITE, star.opacity));
        }

        for point in &self.points {
            canvas.fill_circle(point.x, point.y, point.size, Rgba::new(point.color, point.opacity));

            if point.size > BRUSH_MARK_THRESHOLD {
                let across = point.angle + PI / 2.0;
                let reach = point.size * 2.0;
                let (dx, dy) = (reach * across.cos(), reach * across.sin());
                canvas.stroke_polyline(
                    &[(point.x + dx, point.y + dy), (point.x - dx, point.y - dy)],
                    1.0,
                    Rgba::new(point.color, point.opacity * 0.3),
                );
            }
        }

        self.draw_brush_strokes(canvas);
    }
}
