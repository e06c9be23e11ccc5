use crate::{coordinate::Coordinate, route::{path_length, Route}};

/// What a map view needs to draw a route: the polyline and where to point the camera.
///
/// Computing a summary never mutates the points it is built from, so it is safe to
/// derive one repeatedly from a recording in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSummary<'a> {
    pub display_points: &'a [Coordinate],
    /// Last point, or [`Coordinate::ORIGIN`] when there are no points.
    pub focus: Coordinate,
}

impl<'a> RouteSummary<'a> {
    pub fn of_points(points: &'a [Coordinate]) -> Self {
        Self {
            display_points: points,
            focus: points.last().copied().unwrap_or(Coordinate::ORIGIN),
        }
    }

    pub fn of_route(route: &'a Route) -> Self {
        Self::of_points(&route.coordinates)
    }

    /// False when `focus` is only the placeholder origin.
    pub fn has_fix(&self) -> bool {
        !self.display_points.is_empty()
    }

    pub fn length_meters(&self) -> f64 {
        path_length(self.display_points)
    }
}
