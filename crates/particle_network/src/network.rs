//! The particle network animator itself.

use std::time::{Duration, Instant};

use glam::Vec2;
use rand::SeedableRng as _;

use crate::canvas::Canvas;
use crate::config::Config;
use crate::connections::Connections;
use crate::debounce::Debouncer;
use crate::particle::Particle;
use crate::scheduler::{FrameRequest, FrameScheduler};

/// How long the container has to stop resizing before the particles are regenerated.
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(250);

/// Particles are always drawn slightly transparent.
pub const PARTICLE_OPACITY: f32 = 0.8;

/// A set of drifting particles with flickering connections, drawn once per frame.
///
/// If there's no surface to draw on then the animator is inert: every method quietly does
/// nothing.
pub struct ParticleNetwork<C: Canvas, S: FrameScheduler> {
    /// Where everything is drawn
    surface: Option<C>,
    /// Source of frames
    scheduler: S,
    /// Counts, colours and sizes
    config: Config,
    /// Every particle, in creation order
    particles: Vec<Particle>,
    /// Animation state of the connections in range
    connections: Connections,
    /// Should frames be rendered?
    is_running: bool,
    /// Has `initialize()` been called (and not undone by `destroy()`)?
    is_initialised: bool,
    /// The frame we're waiting for
    frame: Option<FrameRequest>,
    /// Settles bursts of resizes
    resize: Debouncer,
    /// Source of all randomness
    rng: rand::rngs::StdRng,
    /// How many times the particles have been (re)generated
    generation: u64,
    /// How many frames have been drawn
    frames_drawn: u64,
}

impl<C: Canvas, S: FrameScheduler> ParticleNetwork<C, S> {
    /// Instantiate. Nothing happens until [`Self::initialize`] is called.
    pub fn new(surface: Option<C>, scheduler: S, config: Config) -> Self {
        let rng = config.seed.map_or_else(
            rand::rngs::StdRng::from_entropy,
            rand::rngs::StdRng::seed_from_u64,
        );

        Self {
            surface,
            scheduler,
            config,
            particles: Vec::new(),
            connections: Connections::new(),
            is_running: false,
            is_initialised: false,
            frame: None,
            resize: Debouncer::new(RESIZE_DEBOUNCE),
            rng,
            generation: 0,
            frames_drawn: 0,
        }
    }

    /// Size the surface, create the particles and start animating. From here on, resizes are
    /// listened to.
    pub fn initialize(&mut self) {
        if self.surface.is_none() {
            return;
        }

        self.populate();
        self.is_initialised = true;
        self.start();
        tracing::debug!(
            "Particle network initialised with {} particles",
            self.particles.len()
        );
    }

    /// Resume rendering. Does nothing if already running, or if never initialised.
    pub fn start(&mut self) {
        if self.surface.is_none() || !self.is_initialised || self.is_running {
            return;
        }

        self.is_running = true;
        self.frame = Some(self.scheduler.request_frame());
    }

    /// Pause rendering, leaving whatever was last drawn on the surface. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.is_running = false;
        if let Some(frame) = self.frame.take() {
            self.scheduler.cancel_frame(frame);
        }
    }

    /// Stop for good and blank the surface.
    pub fn destroy(&mut self) {
        self.stop();
        self.resize.cancel();
        self.is_initialised = false;
        if let Some(surface) = self.surface.as_mut() {
            surface.clear();
        }
        tracing::debug!("Particle network destroyed");
    }

    /// The container has changed size. Regeneration happens once resizing settles.
    pub fn on_resize(&mut self, now: Instant) {
        if !self.is_initialised {
            return;
        }
        self.resize.trigger(now);
    }

    /// To be called by the host on every display refresh. Returns whether a frame was drawn.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.resize.poll(now) && self.is_initialised {
            self.populate();
            tracing::debug!(
                "Resize settled, regenerated particles for a {:?} surface",
                self.size()
            );
        }

        let Some(due) = self.scheduler.take_due() else {
            return false;
        };
        if !self.is_running || self.frame != Some(due) {
            return false;
        }

        self.frame = None;
        self.step();
        true
    }

    /// Fit the surface to its container and replace every particle with a fresh random one.
    fn populate(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        surface.fit_to_container();
        let bounds = surface.size();
        let rng = &mut self.rng;
        let config = &self.config;
        self.particles = (0..config.particle_count)
            .map(|_| {
                Particle::random(
                    bounds,
                    config.particle_speed,
                    config.particle_radius,
                    rng,
                )
            })
            .collect();
        self.connections.clear();
        self.generation += 1;
    }

    /// A single frame.
    ///
    /// Connections are drawn from where the particles were at the end of the previous frame, and
    /// only then are the particles moved on. So the lines are always a frame behind.
    fn step(&mut self) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        surface.clear();
        self.connections
            .update_and_draw(&self.particles, &self.config, surface, &mut self.rng);

        for particle in &self.particles {
            surface.fill_circle(
                particle.position,
                particle.radius,
                self.config.particle_colour,
                PARTICLE_OPACITY,
            );
        }

        let bounds = surface.size();
        for particle in &mut self.particles {
            particle.advance(bounds);
        }

        self.frames_drawn += 1;
        self.frame = Some(self.scheduler.request_frame());
    }

    /// The current size of the surface, zero if there isn't one.
    #[must_use]
    pub fn size(&self) -> Vec2 {
        self.surface.as_ref().map_or(Vec2::ZERO, Canvas::size)
    }

    /// All the particles.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Mutable access to the particles, for placing them by hand.
    pub fn particles_mut(&mut self) -> &mut Vec<Particle> {
        &mut self.particles
    }

    /// The state of every connection currently in range.
    #[must_use]
    pub const fn connections(&self) -> &Connections {
        &self.connections
    }

    /// The config this animator was built with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The drawing surface, if there is one.
    #[must_use]
    pub const fn canvas(&self) -> Option<&C> {
        self.surface.as_ref()
    }

    /// Mutable access to the drawing surface, if there is one.
    pub fn canvas_mut(&mut self) -> Option<&mut C> {
        self.surface.as_mut()
    }

    /// The frame scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Is the animation running?
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.is_running
    }

    /// Does the animator have a surface to draw on?
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.surface.is_some()
    }

    /// Is a resize waiting to settle?
    #[must_use]
    pub const fn is_resize_pending(&self) -> bool {
        self.resize.is_pending()
    }

    /// How many times the particles have been generated.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// How many frames have been drawn.
    #[must_use]
    pub const fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Take the surface and scheduler back, so they can be handed to a new animator.
    pub fn into_parts(self) -> (Option<C>, S) {
        (self.surface, self.scheduler)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::canvas::{DrawCall, RecordingCanvas};
    use crate::scheduler::FrameQueue;

    fn network(count: usize) -> ParticleNetwork<RecordingCanvas, FrameQueue> {
        let mut config = Config::default();
        config.particle_count = count;
        config.seed = Some(7);
        ParticleNetwork::new(
            Some(RecordingCanvas::new(400.0, 300.0)),
            FrameQueue::new(),
            config,
        )
    }

    #[test]
    fn missing_surface_is_inert() {
        let now = Instant::now();
        let mut network: ParticleNetwork<RecordingCanvas, FrameQueue> =
            ParticleNetwork::new(None, FrameQueue::new(), Config::default());

        network.initialize();
        network.start();
        network.on_resize(now);
        assert!(!network.tick(now + RESIZE_DEBOUNCE));
        network.stop();
        network.destroy();

        assert!(!network.is_active());
        assert!(!network.is_running());
        assert!(network.particles().is_empty());
        assert!(!network.scheduler().is_pending());
    }

    #[test]
    fn frames_follow_the_documented_order() {
        let now = Instant::now();
        let mut network = network(3);
        network.initialize();
        let before: Vec<Vec2> = network.particles().iter().map(|p| p.position).collect();

        assert!(network.tick(now));

        let calls = network.canvas().map(RecordingCanvas::calls).unwrap_or_default();
        assert_eq!(calls.first(), Some(&DrawCall::Clear));
        let circles: Vec<Vec2> = calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Circle { centre, alpha, .. } => {
                    assert!((alpha - PARTICLE_OPACITY).abs() < f32::EPSILON);
                    Some(*centre)
                }
                DrawCall::Clear | DrawCall::Line { .. } => None,
            })
            .collect();

        // Drawn where they were, then moved.
        assert_eq!(circles, before);
        let after: Vec<Vec2> = network.particles().iter().map(|p| p.position).collect();
        assert_ne!(after, before);

        // Lines always come before the circles.
        let first_circle = calls
            .iter()
            .position(|call| matches!(call, DrawCall::Circle { .. }));
        let last_line = calls
            .iter()
            .rposition(|call| matches!(call, DrawCall::Line { .. }));
        if let (Some(circle), Some(line)) = (first_circle, last_line) {
            assert!(line < circle);
        }
    }

    #[test]
    fn start_is_idempotent() {
        let now = Instant::now();
        let mut network = network(5);
        network.initialize();
        network.start();
        network.start();

        assert!(network.tick(now));
        assert!(network.tick(now));
        assert_eq!(network.frames_drawn(), 2);
    }

    #[test]
    fn destroy_blanks_the_surface_and_stops() {
        let now = Instant::now();
        let mut network = network(5);
        network.initialize();
        network.tick(now);
        network.destroy();

        let calls = network.canvas().map(RecordingCanvas::calls).unwrap_or_default();
        assert_eq!(calls.last(), Some(&DrawCall::Clear));
        assert!(!network.is_running());
        assert!(!network.tick(now));

        // Resizes are no longer listened to.
        network.on_resize(now);
        assert!(!network.is_resize_pending());
    }

    #[test]
    fn empty_network_is_valid() {
        let now = Instant::now();
        let mut network = network(0);
        network.initialize();
        assert!(network.tick(now));
        let calls = network.canvas().map(RecordingCanvas::calls).unwrap_or_default();
        assert_eq!(calls, [DrawCall::Clear]);
    }
}
