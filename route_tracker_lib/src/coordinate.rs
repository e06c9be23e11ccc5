use geo_types::Point;
use serde::{Deserialize, Serialize};

const EARTH_RADIUS_M: f64 = 6_371_000.;

/// A single geographic sample. Ranges are not enforced, see [`Coordinate::is_valid`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Camera placeholder used when there is nothing to focus on. Never a real sample.
    pub const ORIGIN: Coordinate = Coordinate { latitude: 0., longitude: 0. };

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great circle distance in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        let phi1 = self.latitude.to_radians();
        let phi2 = other.latitude.to_radians();
        let delta_phi = (other.latitude - self.latitude).to_radians();
        let delta_lambda = (other.longitude - self.longitude).to_radians();

        let a = (delta_phi / 2.).sin().powi(2)
            + phi1.cos() * phi2.cos() * (delta_lambda / 2.).sin().powi(2);

        let c = 2. * a.sqrt().atan2((1. - a).sqrt());

        EARTH_RADIUS_M * c
    }
}

impl From<Point> for Coordinate {
    fn from(point: Point) -> Self {
        Self::new(point.y(), point.x())
    }
}

impl From<Coordinate> for Point {
    fn from(coordinate: Coordinate) -> Self {
        Point::new(coordinate.longitude, coordinate.latitude)
    }
}
