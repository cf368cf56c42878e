//! Position and attitude generation
//!
//! The drone flies a slow circular loiter around home. Every quantity except
//! heading is a function of elapsed mission seconds plus bounded jitter;
//! heading accumulates from the previous tick.

use gcs_core::GeoPoint;
use rand::Rng;

/// Position and attitude produced for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    pub position: GeoPoint,
    pub altitude: f64,
    pub speed: f64,
    pub roll: f64,
    pub pitch: f64,
    pub heading: f64,
    pub distance_from_home: f64,
}

/// Uniform sample in `[-half_width, half_width)`
fn jitter<R: Rng + ?Sized>(rng: &mut R, half_width: f64) -> f64 {
    rng.gen_range(-half_width..half_width)
}

/// Normalise any angle into `[0, 360)`
pub fn wrap_heading(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Point on the loiter circle for the given second
pub fn loiter_position(home: GeoPoint, elapsed_seconds: u64, radius_deg: f64) -> GeoPoint {
    let t = elapsed_seconds as f64 / 20.0;
    home.offset(t.sin() * radius_deg, t.cos() * radius_deg)
}

/// Distance proxy reported as `distanceFromHome`.
///
/// Grows with elapsed time only and ignores the generated position; this is
/// a known approximation kept as-is.
pub fn distance_from_home(elapsed_seconds: u64) -> f64 {
    let t = elapsed_seconds as f64;
    ((2.0 * t).powi(2) + t.powi(2)).sqrt()
}

/// Compute position and attitude for `elapsed_seconds`
pub fn generate<R: Rng + ?Sized>(
    elapsed_seconds: u64,
    home: GeoPoint,
    previous_heading: f64,
    radius_deg: f64,
    rng: &mut R,
) -> Kinematics {
    let t = elapsed_seconds as f64;

    Kinematics {
        position: loiter_position(home, elapsed_seconds, radius_deg),
        altitude: 50.0 + (t / 10.0).sin() * 5.0 + jitter(rng, 1.0),
        speed: 10.0 + (t / 5.0).cos() * 2.0 + jitter(rng, 0.75),
        roll: (t / 2.0).sin() * 5.0 + jitter(rng, 0.5),
        pitch: (t / 3.0).cos() * 3.0 + jitter(rng, 0.5),
        heading: wrap_heading(previous_heading + 0.5 + jitter(rng, 0.5)),
        distance_from_home: distance_from_home(elapsed_seconds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const HOME: GeoPoint = GeoPoint::new(34.0522, -118.2437);

    #[test]
    fn test_wrap_heading() {
        assert_eq!(wrap_heading(0.0), 0.0);
        assert_eq!(wrap_heading(360.0), 0.0);
        assert!((wrap_heading(361.25) - 1.25).abs() < 1e-9);
        assert!((wrap_heading(-10.0) - 350.0).abs() < 1e-9);
        assert!(wrap_heading(-1e-20) < 360.0);
    }

    #[test]
    fn test_loiter_stays_on_circle() {
        for s in 0..200 {
            let p = loiter_position(HOME, s, 0.0005);
            let r = ((p.latitude - HOME.latitude).powi(2) + (p.longitude - HOME.longitude).powi(2)).sqrt();
            assert!((r - 0.0005).abs() < 1e-12);
        }
    }

    #[test]
    fn test_distance_proxy() {
        assert_eq!(distance_from_home(0), 0.0);
        assert!((distance_from_home(10) - 500f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_values_within_jitter_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut heading = 345.0;

        for s in 1..=500u64 {
            let k = generate(s, HOME, heading, 0.0005, &mut rng);
            let t = s as f64;

            assert!((k.altitude - (50.0 + (t / 10.0).sin() * 5.0)).abs() <= 1.0);
            assert!((k.speed - (10.0 + (t / 5.0).cos() * 2.0)).abs() <= 0.75);
            assert!((k.roll - (t / 2.0).sin() * 5.0).abs() <= 0.5);
            assert!((k.pitch - (t / 3.0).cos() * 3.0).abs() <= 0.5);
            assert!((0.0..360.0).contains(&k.heading));

            let mut step = k.heading - heading;
            if step < -180.0 {
                step += 360.0;
            }
            assert!((0.0..=1.0).contains(&step));
            heading = k.heading;
        }
    }

    #[test]
    fn test_heading_wraps_past_north() {
        let mut rng = StdRng::seed_from_u64(1);
        let k = generate(1, HOME, 359.9, 0.0005, &mut rng);
        assert!(k.heading < 360.0);
    }

    #[test]
    fn test_same_seed_same_output() {
        let a = generate(7, HOME, 10.0, 0.0005, &mut StdRng::seed_from_u64(9));
        let b = generate(7, HOME, 10.0, 0.0005, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
