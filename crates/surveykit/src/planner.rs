//! Boustrophedon coverage path over a square box centred on home.
//!
//! Stripes run along the east axis and step north by the stripe spacing.
//! `Path::total_distance` is the running estimate the survey timeout is
//! derived from. It adds one extra box width per double stripe that has no
//! matching waypoint, so it overestimates the flown length. Keep it that way:
//! changing it changes every estimated survey time.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Position in the local NED frame. `down` is negative above home.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub north: f64,
    pub east: f64,
    pub down: f64,
}

impl Waypoint {
    pub const fn new(north: f64, east: f64, down: f64) -> Self {
        Self { north, east, down }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub waypoints: Vec<Waypoint>,
    pub total_distance: f64,
}

impl Path {
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Where the vehicle waits before the sweep: the far end of the first
    /// stripe, so the path opens with a full stripe leg.
    pub fn start_corner(&self) -> Option<Waypoint> {
        self.waypoints
            .first()
            .map(|first| Waypoint::new(first.north, -first.east, first.down))
    }

    /// `total_distance / velocity`, overcount included. Saturates at
    /// `Duration::MAX`.
    pub fn estimated_duration(&self, velocity_mps: f64) -> Duration {
        let secs = (self.total_distance / velocity_mps).max(0.0);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// Sweep the box `[-half_width, half_width]²` at `cruise_altitude`.
///
/// Inputs are not checked; callers go through `MissionConfig::validate`.
/// Each pass emits four waypoints and the last pass may overshoot
/// `half_width` to the north.
pub fn plan(half_width: f64, stripe_spacing: f64, cruise_altitude: f64) -> Path {
    let z = -cruise_altitude;
    let box_width = half_width * 2.0;
    let mut x = -half_width;
    let mut distance = 0.0;
    let mut waypoints = Vec::new();

    while x < half_width {
        waypoints.push(Waypoint::new(x, half_width, z));
        distance += box_width;

        x += stripe_spacing;
        waypoints.push(Waypoint::new(x, half_width, z));
        distance += stripe_spacing;

        waypoints.push(Waypoint::new(x, -half_width, z));
        distance += box_width;

        x += stripe_spacing;
        waypoints.push(Waypoint::new(x, -half_width, z));
        distance += stripe_spacing;

        distance += box_width;
    }

    Path {
        waypoints,
        total_distance: distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_of(path: &Path, wp: Waypoint) -> usize {
        path.waypoints
            .iter()
            .position(|candidate| *candidate == wp)
            .unwrap_or_else(|| panic!("waypoint {wp:?} missing"))
    }

    #[test]
    fn sweeps_box_in_expected_order() {
        let path = plan(10.0, 4.0, 5.0);

        assert_eq!(path.waypoints[0], Waypoint::new(-10.0, 10.0, -5.0));
        let a = position_of(&path, Waypoint::new(-6.0, 10.0, -5.0));
        let b = position_of(&path, Waypoint::new(-6.0, -10.0, -5.0));
        let c = position_of(&path, Waypoint::new(-2.0, -10.0, -5.0));
        assert!(a < b && b < c);
    }

    #[test]
    fn golden_distance_includes_overcount() {
        let path = plan(10.0, 4.0, 5.0);
        assert_eq!(path.len(), 12);
        assert_eq!(path.total_distance, 204.0);
        assert_eq!(path.estimated_duration(4.0), Duration::from_secs(51));
    }

    #[test]
    fn start_corner_opens_the_first_stripe() {
        let path = plan(10.0, 4.0, 5.0);
        assert_eq!(path.start_corner(), Some(Waypoint::new(-10.0, -10.0, -5.0)));

        let empty = Path {
            waypoints: Vec::new(),
            total_distance: 0.0,
        };
        assert_eq!(empty.start_corner(), None);
    }

    #[test]
    fn duration_saturates_for_vanishing_velocity() {
        let path = plan(10.0, 4.0, 5.0);
        assert_eq!(path.estimated_duration(1e-18), Duration::MAX);
        assert_eq!(path.estimated_duration(f64::INFINITY), Duration::ZERO);
    }

    #[test]
    fn last_pass_is_not_trimmed() {
        let path = plan(10.0, 4.0, 5.0);
        let last = path.waypoints.last().copied().unwrap();
        assert_eq!(last, Waypoint::new(14.0, -10.0, -5.0));
    }

    #[test]
    fn waypoint_count_is_multiple_of_four_and_north_is_monotone() {
        for (half_width, spacing) in [(10.0, 4.0), (7.5, 1.3), (1.0, 1.9), (50.0, 0.7), (3.0, 3.0)] {
            let path = plan(half_width, spacing, 12.0);
            assert!(!path.is_empty());
            assert_eq!(path.len() % 4, 0, "hw={half_width} s={spacing}");
            assert!(path
                .waypoints
                .windows(2)
                .all(|pair| pair[1].north >= pair[0].north));
            assert!(path.waypoints.iter().all(|wp| wp.down == -12.0));
            assert!(path
                .waypoints
                .iter()
                .all(|wp| wp.east == half_width || wp.east == -half_width));
        }
    }

    #[test]
    fn identical_inputs_give_identical_paths() {
        assert_eq!(plan(7.5, 1.3, 20.0), plan(7.5, 1.3, 20.0));
    }
}
