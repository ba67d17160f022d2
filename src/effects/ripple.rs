use super::{Clock, Effect, PointerEvent};
use crate::canvas::{Canvas, Gradient};
use crate::color::{lerp_rgb, Rgb, Rgba, STARRY_NIGHT};
use std::f32::consts::PI;

pub const PARTICLES_PER_PULSE: usize = 60;
pub const EXPANSION_MS: f64 = 2000.0;
pub const PULSE_LIFETIME_MS: f64 = 3000.0;
const MAX_RADIUS_RATIO: f32 = 0.3;

pub struct RippleParticle {
    pub angle: f32,
    /// Rolled at spawn but unused: particles ride the parent ring instead.
    pub speed: f32,
    pub size: f32,
    pub x: f32,
    pub y: f32,
    pub opacity: f32,
    pub lifespan_ms: f64,
}

pub struct Pulse {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub max_radius: f32,
    pub progress: f32,
    pub created_ms: f64,
    pub color_index: usize,
    pub next_color_index: usize,
    pub particles: Vec<RippleParticle>,
}

impl Pulse {
    /// Ring color crossfaded from the source to the target palette entry.
    pub fn color(&self) -> Rgb {
        lerp_rgb(
            STARRY_NIGHT[self.color_index],
            STARRY_NIGHT[self.next_color_index],
            self.progress,
        )
    }

    fn advance(&mut self, now: f64) {
        let age = now - self.created_ms;
        self.progress = (age / EXPANSION_MS).min(1.0) as f32;
        self.radius = self.max_radius * self.progress;

        for particle in &mut self.particles {
            let p = (age / particle.lifespan_ms).min(1.0) as f32;
            // Distance follows the ring, scaled by the particle's own progress
            let distance = self.radius * p;
            particle.x = self.x + particle.angle.cos() * distance;
            particle.y = self.y + particle.angle.sin() * distance;
            particle.opacity = 1.0 - p;
        }
    }
}

/// Expanding star-dust ring spawned wherever the user clicks.
pub struct RippleEffect {
    width: f32,
    height: f32,
    pulses: Vec<Pulse>,
    clock: Clock,
}

impl RippleEffect {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            pulses: Vec::new(),
            clock: Clock::default(),
        }
    }

    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    pub fn spawn(&mut self, x: f32, y: f32) {
        let now = self.clock.now();
        let particles = (0..PARTICLES_PER_PULSE)
            .map(|i| RippleParticle {
                angle: (PI * 2.0 / PARTICLES_PER_PULSE as f32) * i as f32,
                speed: 0.5 + fastrand::f32() * 1.5,
                size: 1.0 + fastrand::f32() * 2.0,
                x,
                y,
                opacity: 1.0,
                lifespan_ms: 1000.0 + fastrand::f64() * 1000.0,
            })
            .collect();

        self.pulses.push(Pulse {
            x,
            y,
            radius: 0.0,
            max_radius: self.width.min(self.height) * MAX_RADIUS_RATIO,
            progress: 0.0,
            created_ms: now,
            color_index: fastrand::usize(..STARRY_NIGHT.len()),
            next_color_index: fastrand::usize(..STARRY_NIGHT.len()),
            particles,
        });
    }
}

impl Effect for RippleEffect {
    fn name(&self) -> &'static str {
        "ripple"
    }

    fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    fn update(&mut self, dt: f32) {
        self.clock.advance(dt);
        let now = self.clock.now();
        // Lifetime is independent of the ring's own progress
        self.pulses
            .retain(|pulse| now - pulse.created_ms < PULSE_LIFETIME_MS);
        for pulse in &mut self.pulses {
            pulse.advance(now);
        }
    }

    fn draw(&self, canvas: &mut Canvas) {
        canvas.clear();
        for pulse in &self.pulses {
            let color = pulse.color();
            let ring = Gradient::new()
                .stop(0.0, Rgba::new(color, 0.0))
                .stop(0.5, Rgba::new(color, 0.1))
                .stop(1.0, Rgba::new(color, 0.0));
            canvas.stroke_ring(pulse.x, pulse.y, pulse.radius, 2.0, &ring);

            for particle in pulse.particles.iter().filter(|p| p.opacity > 0.0) {
                canvas.fill_circle(
                    particle.x,
                    particle.y,
                    particle.size,
                    Rgba::new(color, particle.opacity),
                );
                let halo = Gradient::linear(
                    Rgba::new(color, particle.opacity * 0.5),
                    Rgba::new(color, 0.0),
                );
                canvas.fill_radial(particle.x, particle.y, 0.0, particle.size * 2.0, &halo);
            }
        }
    }

    fn handle_event(&mut self, event: &PointerEvent) {
        match event {
            PointerEvent::Click { x, y } => self.spawn(*x, *y),
            PointerEvent::TouchStart { touches } => {
                if let Some(&(x, y)) = touches.first() {
                    self.spawn(x, y);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_spawns_pulse_with_evenly_spaced_particles() {
        let mut effect = RippleEffect::new(1000.0, 600.0);
        effect.handle_event(&PointerEvent::Click { x: 100.0, y: 100.0 });

        let pulse = &effect.pulses()[0];
        assert_eq!(pulse.particles.len(), PARTICLES_PER_PULSE);
        assert!((pulse.max_radius - 180.0).abs() < 1e-3);
        let step = PI * 2.0 / 60.0;
        for (i, p) in pulse.particles.iter().enumerate() {
            assert!((p.angle - step * i as f32).abs() < 1e-5);
            assert!((1000.0..2000.0).contains(&p.lifespan_ms));
            assert!((1.0..3.0).contains(&p.size));
        }
    }

    #[test]
    fn touch_uses_first_point_only() {
        let mut effect = RippleEffect::new(500.0, 500.0);
        effect.handle_event(&PointerEvent::TouchStart {
            touches: vec![(10.0, 20.0), (300.0, 300.0)],
        });
        effect.handle_event(&PointerEvent::TouchStart { touches: vec![] });
        assert_eq!(effect.pulses().len(), 1);
        assert_eq!((effect.pulses()[0].x, effect.pulses()[0].y), (10.0, 20.0));
    }

    #[test]
    fn non_click_events_are_ignored() {
        let mut effect = RippleEffect::new(500.0, 500.0);
        effect.handle_event(&PointerEvent::Down { x: 1.0, y: 1.0 });
        effect.handle_event(&PointerEvent::Up { x: 1.0, y: 1.0 });
        assert!(effect.pulses().is_empty());
    }

    #[test]
    fn particle_opacity_is_monotone_and_ends_at_zero() {
        let mut effect = RippleEffect::new(500.0, 500.0);
        effect.spawn(250.0, 250.0);
        let mut previous: Vec<f32> = vec![1.0; PARTICLES_PER_PULSE];
        for _ in 0..130 {
            effect.update(1.0 / 60.0);
            let Some(pulse) = effect.pulses().first() else {
                break;
            };
            for (p, prev) in pulse.particles.iter().zip(previous.iter_mut()) {
                assert!(p.opacity <= *prev);
                assert!((0.0..=1.0).contains(&p.opacity));
                *prev = p.opacity;
            }
        }
        // 130 ticks is past every 2000ms lifespan
        let pulse = &effect.pulses()[0];
        assert!(pulse.particles.iter().all(|p| p.opacity == 0.0));
    }

    #[test]
    fn particle_fades_out_exactly_at_its_lifespan() {
        let fading = |seconds: f32| {
            let mut effect = RippleEffect::new(500.0, 500.0);
            effect.spawn(250.0, 250.0);
            effect.pulses[0].particles[0].lifespan_ms = 1500.0;
            effect.update(seconds);
            effect.pulses[0].particles[0].opacity
        };

        let before = fading(1.499);
        assert!(before > 0.0 && before < 0.01);
        assert_eq!(fading(1.5), 0.0);
    }

    #[test]
    fn particles_ride_the_ring() {
        let mut effect = RippleEffect::new(500.0, 500.0);
        effect.spawn(0.0, 0.0);
        effect.update(1.0);
        let pulse = &effect.pulses()[0];
        assert!((pulse.radius - pulse.max_radius * 0.5).abs() < 1e-2);
        for p in &pulse.particles {
            let distance = (p.x * p.x + p.y * p.y).sqrt();
            let expected = pulse.radius * (1000.0 / p.lifespan_ms).min(1.0) as f32;
            assert!((distance - expected).abs() < 1e-2);
        }
    }

    #[test]
    fn ring_color_crossfades_between_palette_entries() {
        let mut effect = RippleEffect::new(500.0, 500.0);
        effect.spawn(0.0, 0.0);
        let from = STARRY_NIGHT[effect.pulses[0].color_index];
        let to = STARRY_NIGHT[effect.pulses[0].next_color_index];
        assert_eq!(effect.pulses()[0].color(), from);
        effect.update(2.5);
        assert_eq!(effect.pulses()[0].color(), to);
    }

    #[test]
    fn draw_paints_particles_near_the_center_early_on() {
        let mut effect = RippleEffect::new(64.0, 64.0);
        // Center of device pixel (4, 4) at scale 8
        effect.spawn(36.0, 36.0);
        effect.update(0.01);
        let mut canvas = Canvas::new(8, 8, 8.0);
        effect.draw(&mut canvas);
        assert!(canvas.pixel(4, 4).unwrap()[3] > 0.0);
    }
}
