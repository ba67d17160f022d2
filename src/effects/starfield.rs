use super::{Clock, Effect};
use crate::canvas::{Canvas, Gradient};
use crate::color::{random_from, Rgba, STARRY_NIGHT, WHITE};
use std::f32::consts::PI;

// One background star per this many square logical pixels
const STAR_DENSITY: f32 = 2000.0;
const SPIRAL_STAR_COUNT: usize = 200;
const SHOOTING_STAR_PERIOD_MS: f64 = 3000.0;
const SHOOTING_STAR_LIFETIME_MS: f64 = 3000.0;
const NIGHT_FADE: Rgba = Rgba::new((10, 14, 41), 0.2);

struct Star {
    x: f32,
    y: f32,
    radius: f32,
    alpha: f32,
    alpha_change: f32,
}

impl Star {
    // Triangle-wave flicker: walk by the step and bounce off 0 and 1
    fn twinkle(&mut self) {
        self.alpha += self.alpha_change;
        if self.alpha <= 0.0 {
            self.alpha = 0.0;
            self.alpha_change = self.alpha_change.abs();
        } else if self.alpha >= 1.0 {
            self.alpha = 1.0;
            self.alpha_change = -self.alpha_change.abs();
        }
    }
}

struct SpiralStar {
    x: f32,
    y: f32,
    center_x: f32,
    center_y: f32,
    angle: f32,
    spiral_radius: f32,
    speed: f32,
    radius: f32,
    base_radius: f32,
    pulse: f32,
    pulse_speed: f32,
    color: Rgba,
}

struct ShootingStar {
    x: f32,
    y: f32,
    length: f32,
    speed: f32,
    angle: f32,
    born_ms: f64,
}

impl ShootingStar {
    fn tail(&self) -> (f32, f32) {
        (
            self.x - self.angle.cos() * self.length,
            self.y - self.angle.sin() * self.length,
        )
    }
}

/// Full-viewport night sky: twinkling stars, a slowly turning spiral of
/// colored stars and periodic shooting stars, all painted over a translucent
/// fill so motion leaves a fading trail.
pub struct StarfieldEffect {
    width: f32,
    height: f32,
    stars: Vec<Star>,
    spiral_stars: Vec<SpiralStar>,
    shooting_stars: Vec<ShootingStar>,
    clock: Clock,
    next_shooting_star: f64,
}

impl StarfieldEffect {
    pub fn new(width: f32, height: f32) -> Self {
        let mut effect = Self {
            width,
            height,
            stars: Vec::new(),
            spiral_stars: Vec::new(),
            shooting_stars: Vec::new(),
            clock: Clock::default(),
            next_shooting_star: SHOOTING_STAR_PERIOD_MS,
        };
        effect.populate();
        effect
    }

    fn populate(&mut self) {
        self.create_stars();
        self.create_spiral_stars();
    }

    fn create_stars(&mut self) {
        let count = (self.width * self.height / STAR_DENSITY).floor().max(0.0) as usize;
        self.stars = (0..count)
            .map(|_| Star {
                x: fastrand::f32() * self.width,
                y: fastrand::f32() * self.height,
                radius: fastrand::f32() * 1.5,
                alpha: fastrand::f32(),
                alpha_change: fastrand::f32() * 0.02 - 0.01,
            })
            .collect();
    }

    fn create_spiral_stars(&mut self) {
        let center_x = self.width / 2.0;
        let center_y = self.height / 2.0;
        let radius = self.width.min(self.height) * 0.3;

        self.spiral_stars = (0..SPIRAL_STAR_COUNT)
            .map(|i| {
                let angle = 0.1 * i as f32;
                // Archimedean: radius grows with the accumulated angle
                let spiral_radius = (radius / 30.0) * angle;
                let base_radius = fastrand::f32() * 2.0 + 1.0;
                SpiralStar {
                    x: center_x + spiral_radius * angle.cos(),
                    y: center_y + spiral_radius * angle.sin(),
                    center_x,
                    center_y,
                    angle,
                    spiral_radius,
                    speed: 0.001 * fastrand::f32(),
                    radius: base_radius,
                    base_radius,
                    pulse: 0.0,
                    pulse_speed: 0.03 + fastrand::f32() * 0.02,
                    color: Rgba::new(random_from(&STARRY_NIGHT), 0.8),
                }
            })
            .collect();
    }

    fn spawn_shooting_star(&mut self) {
        self.shooting_stars.push(ShootingStar {
            x: fastrand::f32() * self.width,
            y: 0.0,
            length: fastrand::f32() * 80.0 + 20.0,
            speed: fastrand::f32() * 10.0 + 5.0,
            angle: PI / 4.0,
            born_ms: self.clock.now(),
        });
    }

    pub fn star_count(&self) -> usize {
        self.stars.len()
    }

    pub fn star_alphas(&self) -> impl Iterator<Item = f32> + '_ {
        self.stars.iter().map(|s| s.alpha)
    }

    pub fn spiral_star_count(&self) -> usize {
        self.spiral_stars.len()
    }

    pub fn shooting_star_count(&self) -> usize {
        self.shooting_stars.len()
    }
}

impl Effect for StarfieldEffect {
    fn name(&self) -> &'static str {
        "starfield"
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
        self.populate();
    }

    fn update(&mut self, dt: f32) {
        self.clock.advance(dt);
        let now = self.clock.now();

        while now >= self.next_shooting_star {
            self.spawn_shooting_star();
            self.next_shooting_star += SHOOTING_STAR_PERIOD_MS;
        }
        self.shooting_stars
            .retain(|s| now - s.born_ms < SHOOTING_STAR_LIFETIME_MS);

        for star in &mut self.stars {
            star.twinkle();
        }

        for star in &mut self.spiral_stars {
            star.angle += star.speed;
            star.x = star.center_x + star.spiral_radius * star.angle.cos();
            star.y = star.center_y + star.spiral_radius * star.angle.sin();

            star.pulse += star.pulse_speed;
            star.radius = star.base_radius + star.pulse.sin() * 0.5;
        }

        for star in &mut self.shooting_stars {
            star.x += star.angle.cos() * star.speed;
            star.y += star.angle.sin() * star.speed;
        }
    }

    fn draw(&self, canvas: &mut Canvas) {
        canvas.fill(NIGHT_FADE);

        for star in &self.stars {
            canvas.fill_circle(star.x, star.y, star.radius, Rgba::new(WHITE, star.alpha));
        }

        for star in &self.spiral_stars {
            canvas.fill_circle(star.x, star.y, star.radius, star.color);
            let glow = Gradient::linear(star.color, Rgba::TRANSPARENT);
            canvas.fill_radial(star.x, star.y, star.radius * 0.5, star.radius * 2.0, &glow);
        }

        let streak = Gradient::linear(Rgba::new(WHITE, 0.8), Rgba::new(WHITE, 0.0));
        for star in &self.shooting_stars {
            let (tail_x, tail_y) = star.tail();
            canvas.stroke_line(star.x, star.y, tail_x, tail_y, 2.0, &streak);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: f32 = 1.0 / 60.0;

    #[test]
    fn star_count_follows_area() {
        let effect = StarfieldEffect::new(800.0, 600.0);
        assert_eq!(effect.star_count(), 240);
        assert_eq!(effect.spiral_star_count(), 200);
    }

    #[test]
    fn resize_regenerates_stars() {
        let mut effect = StarfieldEffect::new(800.0, 600.0);
        effect.resize(400.0, 100.0);
        assert_eq!(effect.star_count(), 20);
        assert_eq!(effect.spiral_star_count(), 200);
    }

    #[test]
    fn flicker_stays_in_unit_range_and_bounces() {
        let mut star = Star {
            x: 0.0,
            y: 0.0,
            radius: 1.0,
            alpha: 0.995,
            alpha_change: 0.01,
        };
        star.twinkle();
        assert_eq!(star.alpha, 1.0);
        assert!(star.alpha_change < 0.0);

        star.alpha = 0.004;
        star.twinkle();
        assert_eq!(star.alpha, 0.0);
        assert!(star.alpha_change > 0.0);
        assert!((star.alpha_change - 0.01).abs() < 1e-6);
    }

    #[test]
    fn every_star_alpha_stays_bounded_over_many_ticks() {
        let mut effect = StarfieldEffect::new(400.0, 400.0);
        for _ in 0..500 {
            effect.update(TICK);
            assert!(effect.star_alphas().all(|a| (0.0..=1.0).contains(&a)));
        }
    }

    #[test]
    fn shooting_stars_spawn_on_period_and_expire() {
        let mut effect = StarfieldEffect::new(400.0, 400.0);
        effect.update(2.9);
        assert_eq!(effect.shooting_star_count(), 0);
        effect.update(0.2);
        assert_eq!(effect.shooting_star_count(), 1);
        // The second spawns while the first is still inside its 3000ms
        effect.update(2.95);
        assert_eq!(effect.shooting_star_count(), 2);
        effect.update(0.1);
        assert_eq!(effect.shooting_star_count(), 1);
    }

    #[test]
    fn draw_leaves_fade_over_whole_surface() {
        let effect = StarfieldEffect::new(64.0, 64.0);
        let mut canvas = Canvas::new(8, 8, 8.0);
        effect.draw(&mut canvas);
        assert!(canvas.pixels().iter().all(|px| px[3] >= 0.2 - 1e-6));
    }
}
