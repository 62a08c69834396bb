//! Ray-based obstruction probing and elastic bounce response

use super::command::CollisionInput;
use super::state::KinematicState;
use super::vec::Vec3;

/// Default velocity fraction retained after a bounce
pub const DEFAULT_RESTITUTION: f32 = 0.8;

/// A spherical obstruction in the arena
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

/// The static geometry a craft can collide with. Probing is folded into
/// the same deterministic step as movement so replay reproduces bounces
/// identically on every peer.
#[derive(Debug, Clone, Default)]
pub struct ObstructionField {
    spheres: Vec<Sphere>,
}

impl ObstructionField {
    pub fn new(spheres: Vec<Sphere>) -> Self {
        Self { spheres }
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    /// Cast a short ray (one tick's travel) along `velocity` from
    /// `position` and return the first hit's surface normal
    pub fn probe(&self, position: Vec3, velocity: Vec3) -> Option<Vec3> {
        let travel = velocity.length();
        if travel < 1e-6 {
            return None;
        }
        let dir = velocity * (1.0 / travel);

        let mut nearest: Option<(f32, Vec3)> = None;
        for sphere in &self.spheres {
            if let Some(t) = ray_sphere(position, dir, sphere) {
                if t <= travel && nearest.map_or(true, |(best, _)| t < best) {
                    let hit_point = position + dir * t;
                    let normal = (hit_point - sphere.center).normalized();
                    nearest = Some((t, normal));
                }
            }
        }

        nearest.map(|(_, normal)| normal)
    }

    /// Run the probe and wrap a positive result as the collision report
    /// carried alongside the input for `tick`
    pub fn probe_report(&self, tick: u64, kinematics: &KinematicState) -> Option<CollisionInput> {
        self.probe(kinematics.position, kinematics.velocity)
            .map(|hit_normal| CollisionInput {
                tick,
                detected: true,
                hit_normal,
                incoming_velocity: kinematics.velocity,
                position: kinematics.position,
            })
    }
}

/// Nearest non-negative ray/sphere intersection distance, if any
fn ray_sphere(origin: Vec3, dir: Vec3, sphere: &Sphere) -> Option<f32> {
    let to_center = sphere.center - origin;
    let proj = to_center.dot(dir);
    let closest_sq = to_center.length_sq() - proj * proj;
    let radius_sq = sphere.radius * sphere.radius;
    if closest_sq > radius_sq {
        return None;
    }

    let half_chord = (radius_sq - closest_sq).sqrt();
    let t_near = proj - half_chord;
    let t_far = proj + half_chord;

    if t_near >= 0.0 {
        Some(t_near)
    } else if t_far >= 0.0 {
        // Ray starts inside the sphere
        Some(0.0)
    } else {
        None
    }
}

/// Elastic reflection of `velocity` about `hit_normal`, bleeding energy
/// through `restitution`
pub fn reflect(hit_normal: Vec3, velocity: Vec3, restitution: f32) -> Vec3 {
    let speed = velocity.length();
    if speed < 1e-6 {
        return Vec3::ZERO;
    }
    let dir = velocity * (1.0 / speed);
    let reflected = dir - hit_normal * (2.0 * dir.dot(hit_normal));
    reflected * (speed * restitution)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflect_head_on_reverses_and_scales() {
        let v = Vec3::new(1.0, 0.0, 0.0);
        let n = Vec3::new(-1.0, 0.0, 0.0);
        let reflected = reflect(n, v, DEFAULT_RESTITUTION);
        assert!(reflected.approx_eq(Vec3::new(-0.8, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn reflect_preserves_scaled_magnitude() {
        let v = Vec3::new(3.0, -4.0, 1.0);
        let n = Vec3::new(0.0, 1.0, 0.0);
        let reflected = reflect(n, v, 0.8);
        assert!((reflected.length() - v.length() * 0.8).abs() < 1e-4);
        // Component along the normal flips
        assert!(reflected.y > 0.0);
    }

    #[test]
    fn probe_hits_sphere_in_path() {
        let field = ObstructionField::new(vec![Sphere {
            center: Vec3::new(5.0, 0.0, 0.0),
            radius: 1.0,
        }]);
        // Travels 5 units this tick, enough to reach the sphere face at x=4
        let normal = field
            .probe(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0))
            .expect("probe should hit");
        assert!(normal.approx_eq(Vec3::new(-1.0, 0.0, 0.0), 1e-4));
    }

    #[test]
    fn probe_misses_when_out_of_reach() {
        let field = ObstructionField::new(vec![Sphere {
            center: Vec3::new(50.0, 0.0, 0.0),
            radius: 1.0,
        }]);
        assert!(field.probe(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0)).is_none());
    }

    #[test]
    fn probe_misses_when_moving_away() {
        let field = ObstructionField::new(vec![Sphere {
            center: Vec3::new(5.0, 0.0, 0.0),
            radius: 1.0,
        }]);
        assert!(field
            .probe(Vec3::ZERO, Vec3::new(-5.0, 0.0, 0.0))
            .is_none());
    }

    #[test]
    fn probe_none_when_stationary() {
        let field = ObstructionField::new(vec![Sphere {
            center: Vec3::new(0.5, 0.0, 0.0),
            radius: 1.0,
        }]);
        assert!(field.probe(Vec3::ZERO, Vec3::ZERO).is_none());
    }

    #[test]
    fn probe_report_carries_tick_and_velocity() {
        let field = ObstructionField::new(vec![Sphere {
            center: Vec3::new(2.0, 0.0, 0.0),
            radius: 1.0,
        }]);
        let kin = KinematicState {
            position: Vec3::ZERO,
            velocity: Vec3::new(3.0, 0.0, 0.0),
            acceleration: Vec3::ZERO,
        };
        let report = field.probe_report(9, &kin).expect("should detect");
        assert_eq!(report.tick, 9);
        assert!(report.detected);
        assert_eq!(report.incoming_velocity, kin.velocity);
        assert_eq!(report.position, kin.position);
    }
}
