use rand::Rng;

use crate::RoutePoint;
use crate::geo::distance_m;

/// Largest plausible movement between two one-second fixes.
pub const MAX_STEP_M: f64 = 80.0;

const STEP_DEG: f64 = 0.0001;
const MAX_ATTEMPTS: usize = 5;

/// Local motion generator used when no directions provider is available.
#[derive(Debug, Clone, Copy)]
pub struct RandomWalk {
    step_deg: f64,
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self { step_deg: STEP_DEG }
    }
}

impl RandomWalk {
    /// One step from `from`. Each attempt jitters both axes by up to
    /// `step_deg`; steps longer than [`MAX_STEP_M`] are rejected. After
    /// [`MAX_ATTEMPTS`] rejections the position does not move.
    pub fn step(&self, from: RoutePoint, rng: &mut impl Rng) -> RoutePoint {
        for _ in 0..MAX_ATTEMPTS {
            let candidate = RoutePoint {
                latitude: from.latitude + rng.gen_range(-self.step_deg..=self.step_deg),
                longitude: from.longitude + rng.gen_range(-self.step_deg..=self.step_deg),
            };
            if distance_m(from, candidate) <= MAX_STEP_M {
                return candidate;
            }
        }
        from
    }

    /// `count` points starting at `origin` (inclusive).
    pub fn generate(&self, origin: RoutePoint, count: usize, rng: &mut impl Rng) -> Vec<RoutePoint> {
        let mut points = Vec::with_capacity(count);
        let mut current = origin;
        for i in 0..count {
            if i > 0 {
                current = self.step(current, rng);
            }
            points.push(current);
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn steps_stay_plausible() {
        let mut rng = StdRng::seed_from_u64(7);
        let origin = RoutePoint::new(37.5665, 126.9780);
        let points = RandomWalk::default().generate(origin, 120, &mut rng);

        assert_eq!(points.len(), 120);
        assert_eq!(points[0], origin);
        for pair in points.windows(2) {
            assert!(distance_m(pair[0], pair[1]) <= MAX_STEP_M);
        }
    }

    #[test]
    fn oversized_steps_hold_position() {
        let mut rng = StdRng::seed_from_u64(7);
        let origin = RoutePoint::new(37.5665, 126.9780);
        // a full degree of jitter always exceeds 80 m
        let walk = RandomWalk { step_deg: 1.0 };
        assert_eq!(walk.step(origin, &mut rng), origin);
    }
}
