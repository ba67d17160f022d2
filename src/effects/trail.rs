use super::{Clock, Effect, PointerEvent};
use crate::canvas::{Canvas, Gradient};
use crate::color::{random_from, Rgb, Rgba, TRAIL};

const JITTER: f32 = 20.0;
const MIN_LIFESPAN_MS: f64 = 5000.0;
const LIFESPAN_SPREAD_MS: f64 = 3000.0;

pub struct TrailParticle {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub opacity: f32,
    pub color: Rgb,
    /// Pointer speed (logical px per ms) when this particle was laid down.
    /// Recorded only; nothing reads it yet.
    pub speed: f32,
    pub created_ms: f64,
    pub lifespan_ms: f64,
}

/// Glowing dots left behind while the pointer is held down and dragged.
#[derive(Default)]
pub struct TrailEffect {
    drawing: bool,
    particles: Vec<TrailParticle>,
    clock: Clock,
}

impl TrailEffect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn particles(&self) -> &[TrailParticle] {
        &self.particles
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    fn speed_from_last(&self, now: f64, x: f32, y: f32) -> f32 {
        let Some(last) = self.particles.last() else {
            return 0.0;
        };
        let elapsed = now - last.created_ms;
        if elapsed <= 0.0 {
            return 0.0;
        }
        let (dx, dy) = (x - last.x, y - last.y);
        ((dx * dx + dy * dy).sqrt() as f64 / elapsed) as f32
    }

    fn deposit(&mut self, x: f32, y: f32) {
        let now = self.clock.now();
        let speed = self.speed_from_last(now, x, y);
        self.particles.push(TrailParticle {
            x: x + (fastrand::f32() - 0.5) * JITTER,
            y: y + (fastrand::f32() - 0.5) * JITTER,
            size: fastrand::f32() * 3.0 + 1.0,
            opacity: 1.0,
            color: random_from(&TRAIL),
            speed,
            created_ms: now,
            lifespan_ms: MIN_LIFESPAN_MS + fastrand::f64() * LIFESPAN_SPREAD_MS,
        });
    }
}

impl Effect for TrailEffect {
    fn name(&self) -> &'static str {
        "trail"
    }

    // Particles keep their logical positions across a resize
    fn resize(&mut self, _width: f32, _height: f32) {}

    fn update(&mut self, dt: f32) {
        self.clock.advance(dt);
        let now = self.clock.now();
        self.particles.retain_mut(|particle| {
            let age = now - particle.created_ms;
            particle.opacity = (1.0 - age / particle.lifespan_ms).max(0.0) as f32;
            age < particle.lifespan_ms
        });
    }

    fn draw(&self, canvas: &mut Canvas) {
        canvas.clear();
        for particle in &self.particles {
            let glow = Rgba::new(particle.color, particle.opacity * 0.8);
            canvas.fill_circle(particle.x, particle.y, particle.size, glow);
            let halo = Gradient::linear(glow, Rgba::new(particle.color, 0.0));
            canvas.fill_radial(particle.x, particle.y, 0.0, particle.size * 2.0, &halo);
        }
    }

    fn handle_event(&mut self, event: &PointerEvent) {
        match *event {
            PointerEvent::Down { x, y } => {
                self.drawing = true;
                self.deposit(x, y);
            }
            PointerEvent::Move { x, y } if self.drawing => self.deposit(x, y),
            PointerEvent::Up { .. } | PointerEvent::Leave => self.drawing = false,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drag(effect: &mut TrailEffect, points: &[(f32, f32)]) {
        let (x, y) = points[0];
        effect.handle_event(&PointerEvent::Down { x, y });
        for &(x, y) in &points[1..] {
            effect.update(0.01);
            effect.handle_event(&PointerEvent::Move { x, y });
        }
        effect.handle_event(&PointerEvent::Up { x, y });
    }

    #[test]
    fn moves_only_deposit_while_pressed() {
        let mut effect = TrailEffect::new();
        effect.handle_event(&PointerEvent::Move { x: 10.0, y: 10.0 });
        assert!(effect.particles().is_empty());

        drag(&mut effect, &[(100.0, 100.0), (110.0, 100.0), (120.0, 100.0)]);
        assert_eq!(effect.particles().len(), 3);
        assert!(!effect.is_drawing());

        effect.handle_event(&PointerEvent::Move { x: 50.0, y: 50.0 });
        assert_eq!(effect.particles().len(), 3);
    }

    #[test]
    fn resize_keeps_existing_particles() {
        let mut effect = TrailEffect::new();
        drag(&mut effect, &[(100.0, 100.0), (110.0, 100.0)]);
        let before: Vec<(f32, f32)> = effect.particles().iter().map(|p| (p.x, p.y)).collect();
        effect.resize(40.0, 30.0);
        let after: Vec<(f32, f32)> = effect.particles().iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn leave_stops_drawing() {
        let mut effect = TrailEffect::new();
        effect.handle_event(&PointerEvent::Down { x: 1.0, y: 1.0 });
        effect.handle_event(&PointerEvent::Leave);
        effect.handle_event(&PointerEvent::Move { x: 5.0, y: 5.0 });
        assert_eq!(effect.particles().len(), 1);
    }

    #[test]
    fn deposits_are_jittered_and_sized_within_range() {
        let mut effect = TrailEffect::new();
        drag(&mut effect, &[(200.0, 200.0); 50]);
        for p in effect.particles() {
            assert!((190.0..=210.0).contains(&p.x));
            assert!((190.0..=210.0).contains(&p.y));
            assert!((1.0..4.0).contains(&p.size));
            assert!((5000.0..8000.0).contains(&p.lifespan_ms));
            assert!(TRAIL.contains(&p.color));
        }
    }

    #[test]
    fn first_particle_has_zero_speed() {
        let mut effect = TrailEffect::new();
        drag(&mut effect, &[(0.0, 0.0), (300.0, 400.0)]);
        assert_eq!(effect.particles()[0].speed, 0.0);
        assert!(effect.particles()[1].speed > 0.0);
    }

    #[test]
    fn expired_particles_are_removed_on_next_update() {
        let mut effect = TrailEffect::new();
        drag(&mut effect, &[(10.0, 10.0), (20.0, 20.0), (30.0, 30.0)]);
        let mut last_len = effect.particles().len();
        for _ in 0..100 {
            effect.update(0.1);
            let now = effect.clock.now();
            for p in effect.particles() {
                assert!(now - p.created_ms < p.lifespan_ms);
                assert!(p.opacity > 0.0 && p.opacity <= 1.0);
            }
            assert!(effect.particles().len() <= last_len);
            last_len = effect.particles().len();
        }
        assert!(effect.particles().is_empty());
    }

    #[test]
    fn opacity_decays_linearly() {
        let mut effect = TrailEffect::new();
        effect.handle_event(&PointerEvent::Down { x: 0.0, y: 0.0 });
        let lifespan = effect.particles()[0].lifespan_ms;
        effect.update((lifespan / 2000.0) as f32);
        assert!((effect.particles()[0].opacity - 0.5).abs() < 1e-3);
    }
}
