use std::time::Duration;

use route_tracker_lib::Coordinate;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);
pub const DEFAULT_MIN_DISPLACEMENT_M: f64 = 5.;
/// Shortest pacing a source will honor. Timers cannot tick with a zero period.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Delivery cadence a caller asks of a location source: at most one fix per `interval`,
/// and only once the position moved more than `min_displacement_m`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationRequest {
    pub interval: Duration,
    pub min_displacement_m: f64,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            min_displacement_m: DEFAULT_MIN_DISPLACEMENT_M,
        }
    }
}

impl LocationRequest {
    /// Intervals below [`MIN_INTERVAL`] and negative displacements are clamped.
    pub fn new(interval: Duration, min_displacement_m: f64) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            min_displacement_m: min_displacement_m.max(0.),
        }
    }

    /// The interval a timer can actually be paced with.
    pub fn pacing(&self) -> Duration {
        self.interval.max(MIN_INTERVAL)
    }

    /// Whether `next` should be delivered given the last delivered fix.
    pub fn admits(&self, last: Option<&Coordinate>, next: &Coordinate) -> bool {
        match last {
            None => true,
            Some(last) => last.distance_to(next) > self.min_displacement_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fix_is_always_admitted() {
        let request = LocationRequest::default();
        assert!(request.admits(None, &Coordinate::new(10., 20.)));
    }

    #[test]
    fn small_moves_are_filtered() {
        let request = LocationRequest::default();
        let start = Coordinate::new(10., 20.);

        // ~1.1 m north
        assert!(!request.admits(Some(&start), &Coordinate::new(10.00001, 20.)));
        // ~156 m north east
        assert!(request.admits(Some(&start), &Coordinate::new(10.001, 20.001)));
    }

    #[test]
    fn zero_displacement_admits_any_move() {
        let request = LocationRequest::new(Duration::from_millis(10), 0.);
        let start = Coordinate::new(10., 20.);

        assert!(request.admits(Some(&start), &Coordinate::new(10.00001, 20.)));
        assert!(!request.admits(Some(&start), &start));
    }

    #[test]
    fn degenerate_values_are_clamped() {
        let request = LocationRequest::new(Duration::ZERO, -3.);
        assert_eq!(request.interval, MIN_INTERVAL);
        assert_eq!(request.min_displacement_m, 0.);

        let literal = LocationRequest { interval: Duration::ZERO, min_displacement_m: 0. };
        assert_eq!(literal.pacing(), MIN_INTERVAL);
    }
}
