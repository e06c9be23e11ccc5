use serde::{Deserialize, Serialize};

use crate::coordinate::Coordinate;

/// A named recording. Coordinates are kept in capture order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Route {
    pub name: String,
    pub coordinates: Vec<Coordinate>,
}

impl Route {
    pub fn new(name: impl Into<String>, coordinates: Vec<Coordinate>) -> Self {
        Self {
            name: name.into(),
            coordinates,
        }
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    pub fn last(&self) -> Option<&Coordinate> {
        self.coordinates.last()
    }

    pub fn length_meters(&self) -> f64 {
        path_length(&self.coordinates)
    }
}

/// Sum of the distances between consecutive points, in meters.
pub fn path_length(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[0].distance_to(&pair[1]))
        .sum()
}
