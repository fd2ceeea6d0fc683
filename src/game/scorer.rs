use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Points awarded for a guess within a kilometre
pub const MAX_POINTS: i32 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Distance/points computation for a single guess
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreResult {
    pub distance: f64,
    pub points: i32,
}

pub struct Scorer;

impl Scorer {
    /// Great-circle distance in kilometres between two coordinates.
    ///
    /// Uses the haversine formula:
    /// - a = sin²(Δlat/2) + cos(lat1)·cos(lat2)·sin²(Δlon/2)
    /// - d = 2 · R · atan2(√a, √(1−a))
    pub fn distance(actual: Coordinate, guess: Coordinate) -> f64 {
        let lat1 = actual.lat.to_radians();
        let lat2 = guess.lat.to_radians();
        let d_lat = (guess.lat - actual.lat).to_radians();
        let d_lng = (guess.lng - actual.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        // Guard against float drift pushing `a` past 1 for antipodal points
        let a = a.clamp(0.0, 1.0);

        2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Points for a guess `distance` km away, in `0..=5000`.
    ///
    /// Piecewise linear, evaluated band by band. A negative distance is the
    /// "no guess" sentinel and scores zero.
    pub fn points(distance: f64) -> i32 {
        if distance.is_nan() || distance < 0.0 {
            return 0;
        }

        let d = distance;
        let points = if d <= 1.0 {
            MAX_POINTS as f64
        } else if d <= 5.0 {
            (5000.0 - ((d - 1.0) / 4.0) * 500.0).round()
        } else if d <= 20.0 {
            (4500.0 - ((d - 5.0) / 15.0) * 500.0).round()
        } else if d <= 100.0 {
            (4000.0 - ((d - 20.0) / 80.0) * 1000.0).round()
        } else if d <= 500.0 {
            (3000.0 - ((d - 100.0) / 400.0) * 1500.0).round()
        } else if d <= 1500.0 {
            (1500.0 - ((d - 500.0) / 1000.0) * 1000.0).round()
        } else if d <= 3000.0 {
            (500.0 - ((d - 1500.0) / 1500.0) * 400.0).round()
        } else {
            (100.0 - ((d - 3000.0) / 50.0).round()).max(0.0)
        };

        points as i32
    }

    /// Distance and points for a guess against the actual location
    pub fn score(actual: Coordinate, guess: Coordinate) -> ScoreResult {
        let distance = Self::distance(actual, guess);
        ScoreResult {
            distance,
            points: Self::points(distance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARIS: Coordinate = Coordinate { lat: 48.8566, lng: 2.3522 };
    const LONDON: Coordinate = Coordinate { lat: 51.5074, lng: -0.1278 };
    const NEW_YORK: Coordinate = Coordinate { lat: 40.7128, lng: -74.0060 };

    #[test]
    fn test_distance_zero_for_same_point() {
        for coord in [PARIS, LONDON, NEW_YORK, Coordinate::new(-89.9, 179.9)] {
            assert_eq!(Scorer::distance(coord, coord), 0.0);
        }
    }

    #[test]
    fn test_distance_symmetric() {
        let pairs = [(PARIS, LONDON), (LONDON, NEW_YORK), (NEW_YORK, PARIS)];
        for (a, b) in pairs {
            let diff = (Scorer::distance(a, b) - Scorer::distance(b, a)).abs();
            assert!(diff < 1e-9, "asymmetric by {}", diff);
        }
    }

    #[test]
    fn test_known_distances() {
        // Paris to London is roughly 343.5 km
        let d = Scorer::distance(PARIS, LONDON);
        assert!((d - 343.5).abs() < 1.0, "Paris-London was {}", d);

        // A quarter of the equator
        let d = Scorer::distance(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 90.0));
        let expected = std::f64::consts::PI * EARTH_RADIUS_KM / 2.0;
        assert!((d - expected).abs() < 1e-6);

        // Antipodes are half the circumference apart
        let d = Scorer::distance(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_points_concrete_values() {
        assert_eq!(Scorer::points(0.0), 5000);
        assert_eq!(Scorer::points(1.0), 5000);
        assert_eq!(Scorer::points(3.0), 4750);
        assert_eq!(Scorer::points(50.0), 3625);
        assert_eq!(Scorer::points(1000.0), 1000);
        assert_eq!(Scorer::points(5000.0), 60);
    }

    #[test]
    fn test_points_band_edges() {
        assert_eq!(Scorer::points(5.0), 4500);
        assert_eq!(Scorer::points(20.0), 4000);
        assert_eq!(Scorer::points(100.0), 3000);
        assert_eq!(Scorer::points(500.0), 1500);
        assert_eq!(Scorer::points(1500.0), 500);
        assert_eq!(Scorer::points(3000.0), 100);
        assert_eq!(Scorer::points(8000.0), 0);
        assert_eq!(Scorer::points(20_000.0), 0);
    }

    #[test]
    fn test_points_negative_is_zero() {
        assert_eq!(Scorer::points(-1.0), 0);
        assert_eq!(Scorer::points(-0.0001), 0);
        assert_eq!(Scorer::points(f64::NAN), 0);
    }

    #[test]
    fn test_points_non_increasing() {
        let mut previous = Scorer::points(0.0);
        let mut d = 0.0;
        while d < 21_000.0 {
            let current = Scorer::points(d);
            assert!(
                current <= previous,
                "points rose from {} to {} at {} km",
                previous,
                current,
                d
            );
            assert!((0..=MAX_POINTS).contains(&current));
            previous = current;
            d += 0.25;
        }
    }

    #[test]
    fn test_score_combines_distance_and_points() {
        let result = Scorer::score(PARIS, PARIS);
        assert_eq!(result.distance, 0.0);
        assert_eq!(result.points, 5000);

        let result = Scorer::score(PARIS, LONDON);
        assert_eq!(result.points, Scorer::points(result.distance));
        assert!(result.points > 1500 && result.points < 3000);
    }
}
