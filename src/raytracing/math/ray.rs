use super::Vec3;

/// Default near bound; keeps freshly spawned rays from re-hitting the
/// surface they start on.
pub const DEFAULT_RAY_MIN: f64 = 1e-4;

/// A ray with a half-open valid parameter range `[min, max)`.
/// The direction is expected to be normalized by the caller before the ray
/// is used for intersection queries.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub min: f64,
    pub max: f64,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Ray {
        Ray {
            origin,
            direction,
            min: DEFAULT_RAY_MIN,
            max: f64::INFINITY,
        }
    }

    pub fn with_range(origin: Vec3, direction: Vec3, min: f64, max: f64) -> Ray {
        Ray {
            origin,
            direction,
            min,
            max,
        }
    }

    pub fn at(self: &Self, t: f64) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Half-open containment: a hit exactly at `max` lies beyond the range.
    pub fn contains(self: &Self, t: f64) -> bool {
        self.min <= t && t < self.max
    }
}
