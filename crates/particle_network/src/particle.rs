//! A single drifting particle

use glam::Vec2;

/// A point moving in a straight line until it hits an edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Current x,y position
    pub position: Vec2,
    /// Distance travelled per frame
    pub velocity: Vec2,
    /// Rendered radius
    pub radius: f32,
}

impl Particle {
    /// Instantiate
    #[must_use]
    pub const fn new(position: Vec2, velocity: Vec2, radius: f32) -> Self {
        Self {
            position,
            velocity,
            radius,
        }
    }

    /// A particle anywhere within `bounds`, heading in any direction at up to `speed` per frame.
    pub fn random<R: rand::Rng + ?Sized>(
        bounds: Vec2,
        speed: f32,
        radius: f32,
        rng: &mut R,
    ) -> Self {
        let position = Vec2::new(rng.gen::<f32>() * bounds.x, rng.gen::<f32>() * bounds.y);
        let direction = Vec2::from_angle(rng.gen_range(0.0..std::f32::consts::TAU));
        let velocity = direction * rng.gen::<f32>() * speed;
        Self::new(position, velocity, radius)
    }

    /// Move one frame's worth, then bounce off any edge that's been crossed.
    ///
    /// A component of the velocity is only flipped while it still points out of the bounds. So
    /// even if the particle is left outside (it can overshoot by up to a frame's movement, or the
    /// surface may have shrunk underneath it) it won't jitter back and forth, it just heads home.
    pub fn advance(&mut self, bounds: Vec2) {
        self.position += self.velocity;

        let is_leaving_left = self.position.x < 0.0 && self.velocity.x < 0.0;
        let is_leaving_right = self.position.x > bounds.x && self.velocity.x > 0.0;
        if is_leaving_left || is_leaving_right {
            self.velocity.x = -self.velocity.x;
        }

        let is_leaving_top = self.position.y < 0.0 && self.velocity.y < 0.0;
        let is_leaving_bottom = self.position.y > bounds.y && self.velocity.y > 0.0;
        if is_leaving_top || is_leaving_bottom {
            self.velocity.y = -self.velocity.y;
        }
    }
}

#[cfg(test)]
mod test {
    use rand::SeedableRng as _;

    use super::*;

    #[test]
    fn random_particles_are_inside_the_bounds() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let bounds = Vec2::new(300.0, 150.0);
        for _ in 0..1000 {
            let particle = Particle::random(bounds, 0.5, 2.0, &mut rng);
            assert!((0.0..=bounds.x).contains(&particle.position.x));
            assert!((0.0..=bounds.y).contains(&particle.position.y));
            assert!(particle.velocity.length() <= 0.5 + f32::EPSILON);
            assert!((particle.radius - 2.0).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn moves_by_its_velocity() {
        let mut particle = Particle::new(Vec2::new(10.0, 10.0), Vec2::new(1.0, -0.5), 1.0);
        particle.advance(Vec2::new(100.0, 100.0));
        assert_eq!(particle.position, Vec2::new(11.0, 9.5));
        assert_eq!(particle.velocity, Vec2::new(1.0, -0.5));
    }

    #[test]
    fn bounces_off_the_right_edge() {
        let bounds = Vec2::new(100.0, 100.0);
        let mut particle = Particle::new(Vec2::new(99.8, 50.0), Vec2::new(0.5, 0.0), 1.0);

        particle.advance(bounds);
        assert!(particle.position.x > bounds.x);
        assert!(particle.velocity.x < 0.0);

        particle.advance(bounds);
        assert!(particle.position.x < bounds.x);
        assert!(particle.velocity.x < 0.0);
    }

    #[test]
    fn bounces_off_the_top_edge() {
        let mut particle = Particle::new(Vec2::new(50.0, 0.1), Vec2::new(0.0, -0.3), 1.0);
        particle.advance(Vec2::new(100.0, 100.0));
        assert!(particle.velocity.y > 0.0);
    }

    #[test]
    fn stranded_particles_only_reflect_once() {
        let bounds = Vec2::new(100.0, 100.0);
        let mut particle = Particle::new(Vec2::new(150.0, 50.0), Vec2::new(0.2, 0.0), 1.0);

        let mut sign_changes = 0;
        let mut previous = particle.velocity.x.signum();
        for _ in 0..500 {
            particle.advance(bounds);
            let current = particle.velocity.x.signum();
            if (current - previous).abs() > f32::EPSILON {
                sign_changes += 1;
            }
            previous = current;
            if particle.position.x < bounds.x {
                break;
            }
        }

        assert_eq!(sign_changes, 1);
        assert!(particle.position.x < bounds.x);
    }
}
