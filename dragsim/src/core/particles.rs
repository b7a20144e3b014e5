use crate::interfaces::render::{RenderSink, RgbColor};
use rand::Rng;
use std::f64::consts::PI;

const FLAME_COLORS: [RgbColor; 3] = [
    RgbColor::new(255, 60, 0),
    RgbColor::new(255, 150, 0),
    RgbColor::new(255, 220, 0),
];
const SPARK_COLORS: [RgbColor; 3] = [
    RgbColor::new(255, 255, 0),
    RgbColor::new(255, 200, 0),
    RgbColor::new(255, 150, 0),
];
const AIR_COLORS: [RgbColor; 3] = [
    RgbColor::new(200, 200, 255),
    RgbColor::new(220, 220, 255),
    RgbColor::new(180, 180, 255),
];
const BOOST_COLORS: [RgbColor; 4] = [
    RgbColor::new(255, 100, 0),
    RgbColor::new(255, 50, 0),
    RgbColor::new(255, 200, 0),
    RgbColor::new(255, 255, 100),
];
const BOOST_SPARK_COLOR: RgbColor = RgbColor::new(255, 255, 200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleShape {
    Circle,
    Rect,
}

/// * `x`, `y` - Position (world units for vehicle particles, screen units for the environment)
/// * `size` - Initial radius (circle) or half edge length (rect)
/// * `speed` - Distance moved per tick
/// * `direction` - (rad) Direction of movement, 0 pointing right, PI/2 pointing down
/// * `remaining` - Ticks left to live
/// * `lifetime` - Ticks the particle was spawned with
/// * `alpha` - Base opacity, faded linearly with the remaining lifetime
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub color: RgbColor,
    pub size: f64,
    pub speed: f64,
    pub direction: f64,
    pub remaining: u32,
    pub lifetime: u32,
    pub alpha: u8,
    pub shape: ParticleShape,
}

impl Particle {
    /// fade_ratio returns the fraction of the lifetime that is still left, in [0, 1].
    pub fn fade_ratio(&self) -> f64 {
        if self.lifetime == 0 {
            return 0.0;
        }
        self.remaining as f64 / self.lifetime as f64
    }

    pub fn current_alpha(&self) -> u8 {
        (self.alpha as f64 * self.fade_ratio()) as u8
    }

    pub fn current_size(&self) -> f64 {
        (self.size * self.fade_ratio()).max(1.0)
    }
}

/// ParticleEngine owns a set of short-lived visual particles. Particles are kept in insertion
/// order, which is also the draw order.
#[derive(Debug, Clone, Default)]
pub struct ParticleEngine {
    particles: Vec<Particle>,
}

impl ParticleEngine {
    pub fn new() -> ParticleEngine {
        ParticleEngine::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        &mut self,
        x: f64,
        y: f64,
        color: RgbColor,
        size: f64,
        speed: f64,
        direction: f64,
        lifetime: u32,
        alpha: u8,
        shape: ParticleShape,
    ) {
        self.particles.push(Particle {
            x,
            y,
            color,
            size,
            speed,
            direction,
            remaining: lifetime,
            lifetime,
            alpha,
            shape,
        });
    }

    /// flame adds exhaust flame particles pointing backwards.
    pub fn flame<R: Rng + ?Sized>(&mut self, rng: &mut R, x: f64, y: f64) {
        for _ in 0..3 {
            self.spawn(
                x,
                y,
                pick(rng, &FLAME_COLORS),
                rng.gen_range(3.0..=8.0),
                rng.gen_range(1.0..=4.0),
                PI + rng.gen_range(-0.3..=0.3),
                rng.gen_range(10..=30),
                200,
                ParticleShape::Circle,
            );
        }
    }

    /// smoke adds grey tire smoke particles drifting in random directions.
    pub fn smoke<R: Rng + ?Sized>(&mut self, rng: &mut R, x: f64, y: f64) {
        let gray = rng.gen_range(180..=220);

        for _ in 0..2 {
            self.spawn(
                x,
                y,
                RgbColor::new(gray, gray, gray),
                rng.gen_range(5.0..=10.0),
                rng.gen_range(0.5..=2.0),
                rng.gen_range(0.0..=2.0 * PI),
                rng.gen_range(30..=60),
                150,
                ParticleShape::Circle,
            );
        }
    }

    /// sparks adds `count` spark particles (boost, collisions, countdown, finish).
    pub fn sparks<R: Rng + ?Sized>(&mut self, rng: &mut R, x: f64, y: f64, count: usize) {
        for _ in 0..count {
            let shape = if rng.gen::<f64>() > 0.7 {
                ParticleShape::Rect
            } else {
                ParticleShape::Circle
            };
            self.spawn(
                x,
                y,
                pick(rng, &SPARK_COLORS),
                rng.gen_range(1.0..=4.0),
                rng.gen_range(2.0..=6.0),
                rng.gen_range(0.0..=2.0 * PI),
                rng.gen_range(10..=25),
                255,
                shape,
            );
        }
    }

    /// air_stream adds the streaks trailing an airborne car.
    pub fn air_stream<R: Rng + ?Sized>(&mut self, rng: &mut R, x: f64, y: f64) {
        for _ in 0..5 {
            let shape = if rng.gen::<f64>() > 0.5 {
                ParticleShape::Rect
            } else {
                ParticleShape::Circle
            };
            self.spawn(
                x,
                y,
                pick(rng, &AIR_COLORS),
                rng.gen_range(2.0..=5.0),
                rng.gen_range(3.0..=7.0),
                PI + rng.gen_range(-0.2..=0.2),
                rng.gen_range(10..=20),
                150,
                shape,
            );
        }
    }

    /// boost_trail adds a dense flame trail plus a few bright sparks.
    pub fn boost_trail<R: Rng + ?Sized>(&mut self, rng: &mut R, x: f64, y: f64) {
        for _ in 0..8 {
            self.spawn(
                x + rng.gen_range(-5.0..=5.0),
                y + rng.gen_range(-5.0..=5.0),
                pick(rng, &BOOST_COLORS),
                rng.gen_range(3.0..=10.0),
                rng.gen_range(2.0..=5.0),
                PI + rng.gen_range(-0.5..=0.5),
                rng.gen_range(15..=35),
                200,
                ParticleShape::Circle,
            );

            if rng.gen::<f64>() > 0.7 {
                self.spawn(
                    x + rng.gen_range(-10.0..=10.0),
                    y + rng.gen_range(-10.0..=10.0),
                    BOOST_SPARK_COLOR,
                    rng.gen_range(1.0..=3.0),
                    rng.gen_range(3.0..=8.0),
                    rng.gen_range(0.0..=2.0 * PI),
                    rng.gen_range(5..=15),
                    255,
                    ParticleShape::Rect,
                );
            }
        }
    }

    /// advance moves every particle one tick along its direction, ages it and drops the ones
    /// that ran out of lifetime.
    pub fn advance(&mut self) {
        self.particles.retain_mut(|p| {
            p.x += p.direction.cos() * p.speed;
            p.y += p.direction.sin() * p.speed;
            p.remaining = p.remaining.saturating_sub(1);
            p.remaining > 0
        });
    }

    /// render emits one filled shape per particle in insertion order. `camera_offset` is
    /// subtracted from x (0 for particles that already live in screen space).
    pub fn render(&self, sink: &mut dyn RenderSink, camera_offset: f64) {
        for p in self.particles.iter() {
            let size = p.current_size();
            let color = p.color.with_alpha(p.current_alpha());
            let x = p.x - camera_offset;

            match p.shape {
                ParticleShape::Circle => sink.circle(color, (x, p.y), size),
                ParticleShape::Rect => sink.rect(color, x - size, p.y - size, 2.0 * size, 2.0 * size),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn clear(&mut self) {
        self.particles.clear()
    }
}

fn pick<R: Rng + ?Sized>(rng: &mut R, colors: &[RgbColor]) -> RgbColor {
    colors[rng.gen_range(0..colors.len())]
}
