//! The flickering lines between nearby particles.
//!
//! Connection state is kept in a sparse map keyed by the index pair `(i, j)` where `i < j`. A pair
//! only has state whilst it's within range, so it fades in from nothing every time it comes back
//! into range.

use std::collections::HashMap;

use crate::canvas::Canvas;
use crate::config::Config;
use crate::particle::Particle;

/// Each particle only looks for partners amongst the particles that come just after it, up to
/// (but not including) this many indices ahead. Anything further along is never connected, no
/// matter how close it is.
pub const CANDIDATE_WINDOW: usize = 30;

/// The chance, per frame, that a connection changes its mind about fading in or out.
pub const FLICKER_CHANCE: f64 = 0.008;

/// Below this opacity a connection is considered invisible. It's also how close the opacity has
/// to get to its target before easing stops.
pub const VISIBILITY_THRESHOLD: f32 = 0.01;

/// The opacity of a line between two touching particles at full strength.
pub const MAX_LINE_OPACITY: f32 = 0.7;

/// The slowest and fastest a connection fades, in opacity per frame.
const EASING_SPEEDS: std::ops::Range<f32> = 0.02..0.05;

/// The index pair of two connected particles, lowest first.
pub type PairKey = (usize, usize);

/// The animation state of a single connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    /// Current opacity, always between 0.0 and 1.0
    pub opacity: f32,
    /// Either 0.0 or 1.0
    pub target: f32,
    /// How much the opacity changes per frame
    pub speed: f32,
}

impl Connection {
    /// A brand new, invisible, connection that's randomly fading in or staying hidden.
    pub fn fresh<R: rand::Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            opacity: 0.0,
            target: if rng.gen_bool(0.5) { 1.0 } else { 0.0 },
            speed: rng.gen_range(EASING_SPEEDS),
        }
    }

    /// Swap between fading in and fading out.
    pub fn flip(&mut self) {
        self.target = if self.target >= 1.0 { 0.0 } else { 1.0 };
    }

    /// Move the opacity one step towards the target, without overshooting it.
    pub fn ease(&mut self) {
        if (self.opacity - self.target).abs() <= VISIBILITY_THRESHOLD {
            return;
        }

        if self.opacity < self.target {
            self.opacity = (self.opacity + self.speed).min(self.target);
        } else {
            self.opacity = (self.opacity - self.speed).max(self.target);
        }
    }

    /// Is it worth drawing?
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.opacity > VISIBILITY_THRESHOLD
    }
}

/// The state of every connection currently within range.
#[derive(Debug, Default, Clone)]
pub struct Connections {
    /// Connection state keyed by particle index pair
    states: HashMap<PairKey, Connection>,
}

impl Connections {
    /// Instantiate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the state of every candidate pair and draw the visible connections.
    ///
    /// Uses the particles' current positions, so this should be called before they're moved for
    /// the next frame. Returns the number of lines drawn.
    pub fn update_and_draw<C, R>(
        &mut self,
        particles: &[Particle],
        config: &Config,
        canvas: &mut C,
        rng: &mut R,
    ) -> usize
    where
        C: Canvas + ?Sized,
        R: rand::Rng + ?Sized,
    {
        let mut total_drawn = 0;

        for (i, particle) in particles.iter().enumerate() {
            let mut drawn = 0;
            let window_end = i.saturating_add(CANDIDATE_WINDOW).min(particles.len());

            for (j, partner) in particles.iter().enumerate().take(window_end).skip(i + 1) {
                if drawn >= config.max_connections {
                    break;
                }

                let key = (i, j);
                let distance = particle.position.distance(partner.position);
                if distance >= config.line_distance {
                    self.states.remove(&key);
                    continue;
                }

                let connection = self
                    .states
                    .entry(key)
                    .or_insert_with(|| Connection::fresh(rng));
                if rng.gen_bool(FLICKER_CHANCE) {
                    connection.flip();
                }
                connection.ease();

                if connection.is_visible() {
                    let strength = 1.0 - distance / config.line_distance;
                    let alpha = strength * MAX_LINE_OPACITY * connection.opacity;
                    canvas.stroke_line(
                        particle.position,
                        partner.position,
                        config.line_width,
                        config.line_colour,
                        alpha,
                    );
                    drawn += 1;
                }
            }

            total_drawn += drawn;
        }

        total_drawn
    }

    /// The state of the connection between two particles, in either order.
    #[must_use]
    pub fn get(&self, first: usize, second: usize) -> Option<&Connection> {
        self.states.get(&(first.min(second), first.max(second)))
    }

    /// How many pairs have state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Are there no tracked pairs?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Forget all connections.
    pub fn clear(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
#[expect(clippy::indexing_slicing, reason = "Tests aren't so strict")]
mod test {
    use glam::Vec2;
    use rand::SeedableRng as _;

    use super::*;
    use crate::canvas::RecordingCanvas;

    fn rng() -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(42)
    }

    fn still(x: f32, y: f32) -> Particle {
        Particle::new(Vec2::new(x, y), Vec2::ZERO, 1.0)
    }

    fn config(line_distance: f32, max_connections: usize) -> Config {
        let mut config = Config::default();
        config.line_distance = line_distance;
        config.max_connections = max_connections;
        config
    }

    #[test]
    fn easing_never_overshoots() {
        let mut connection = Connection {
            opacity: 0.0,
            target: 1.0,
            speed: 0.03,
        };

        let mut previous = connection.opacity;
        for _ in 0..100 {
            connection.ease();
            assert!(connection.opacity >= previous);
            assert!((0.0..=1.0).contains(&connection.opacity));
            previous = connection.opacity;
        }
        assert!(1.0 - connection.opacity <= VISIBILITY_THRESHOLD);

        connection.flip();
        for _ in 0..100 {
            connection.ease();
            assert!(connection.opacity <= previous);
            assert!((0.0..=1.0).contains(&connection.opacity));
            previous = connection.opacity;
        }
        assert!(connection.opacity <= VISIBILITY_THRESHOLD);
    }

    #[test]
    fn fresh_connections_start_invisible() {
        let mut rng = rng();
        for _ in 0..100 {
            let connection = Connection::fresh(&mut rng);
            assert!(connection.opacity.abs() < f32::EPSILON);
            assert!(connection.target == 0.0 || (connection.target - 1.0).abs() < f32::EPSILON);
            assert!(EASING_SPEEDS.contains(&connection.speed));
            assert!(!connection.is_visible());
        }
    }

    #[test]
    fn state_only_exists_for_pairs_in_range() {
        let particles = vec![still(0.0, 0.0), still(10.0, 0.0), still(500.0, 0.0)];
        let mut connections = Connections::new();
        let mut canvas = RecordingCanvas::new(1000.0, 1000.0);

        connections.update_and_draw(&particles, &config(100.0, 10), &mut canvas, &mut rng());

        assert_eq!(connections.len(), 1);
        assert!(connections.get(1, 0).is_some());
        assert!(connections.get(0, 2).is_none());
        assert!(connections.get(1, 2).is_none());
    }

    #[test]
    fn state_is_dropped_when_pairs_drift_apart() {
        let mut particles = vec![still(0.0, 0.0), still(10.0, 0.0)];
        let mut connections = Connections::new();
        let mut canvas = RecordingCanvas::new(1000.0, 1000.0);
        let config = config(100.0, 10);
        let mut rng = rng();

        connections.update_and_draw(&particles, &config, &mut canvas, &mut rng);
        assert_eq!(connections.len(), 1);

        particles[1].position.x = 100.0;
        for _ in 0..3 {
            connections.update_and_draw(&particles, &config, &mut canvas, &mut rng);
            assert!(connections.is_empty());
        }
    }

    #[test]
    fn partners_outside_the_window_are_never_connected() {
        let particles: Vec<Particle> = (0..40).map(|_| still(5.0, 5.0)).collect();
        let mut connections = Connections::new();
        let mut canvas = RecordingCanvas::new(10.0, 10.0);

        connections.update_and_draw(&particles, &config(100.0, 100), &mut canvas, &mut rng());

        assert!(connections.get(0, 29).is_some());
        assert!(connections.get(0, 30).is_none());
        assert!(connections.get(10, 39).is_some());
        assert!(connections.get(9, 39).is_none());
    }

    #[test]
    fn drawn_lines_are_capped_per_particle() {
        #[expect(
            clippy::cast_precision_loss,
            clippy::as_conversions,
            reason = "Small test numbers"
        )]
        let particles: Vec<Particle> = (0..10).map(|i| still(i as f32, 0.0)).collect();
        let mut connections = Connections::new();
        let mut canvas = RecordingCanvas::new(10.0, 10.0);
        let config = config(100.0, 2);
        let mut rng = rng();

        let mut total = 0;
        for _ in 0..200 {
            connections.update_and_draw(&particles, &config, &mut canvas, &mut rng);
            let mut per_particle: HashMap<u32, usize> = HashMap::new();
            for call in canvas.take_calls() {
                if let crate::canvas::DrawCall::Line { from, .. } = call {
                    #[expect(
                        clippy::cast_possible_truncation,
                        clippy::cast_sign_loss,
                        clippy::as_conversions,
                        reason = "Positions are small whole numbers"
                    )]
                    let origin = from.x as u32;
                    *per_particle.entry(origin).or_default() += 1;
                    total += 1;
                }
            }
            assert!(per_particle.values().all(|count| *count <= 2));
        }

        assert!(total > 0);
    }

    #[test]
    fn line_alpha_fades_with_distance_and_opacity() {
        let particles = vec![still(0.0, 0.0), still(50.0, 0.0)];
        let mut connections = Connections::new();
        connections.states.insert(
            (0, 1),
            Connection {
                opacity: 1.0,
                target: 1.0,
                speed: 0.02,
            },
        );
        let mut canvas = RecordingCanvas::new(100.0, 100.0);

        // Even if it flickers this frame, it can only have faded by one easing step.
        let drawn =
            connections.update_and_draw(&particles, &config(100.0, 3), &mut canvas, &mut rng());
        assert_eq!(drawn, 1);

        let opacity = connections.get(0, 1).map_or(0.0, |connection| connection.opacity);
        assert!(opacity >= 0.95);
        let Some(crate::canvas::DrawCall::Line { alpha, width, .. }) = canvas.calls().first()
        else {
            panic!("Expected a line");
        };
        assert!((alpha - 0.5 * MAX_LINE_OPACITY * opacity).abs() < 0.0001);
        assert!((width - 0.6).abs() < f32::EPSILON);
    }
}
