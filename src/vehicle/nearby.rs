use super::{VehicleBody, VehicleType};
use crate::lane::RelativeLane;
use crate::VehicleId;
use std::fmt;

/// A snapshot of a neighbouring vehicle as perceived by the ego vehicle.
/// Rebuilt from scratch every step.
#[derive(Clone, Debug)]
pub struct NearbyVehicle {
    body: VehicleBody,
    /// The lane of the vehicle relative to the ego vehicle.
    relative_lane: RelativeLane,
    /// Positive is downstream, negative is upstream; the magnitude counts
    /// vehicles (+1 is the next vehicle ahead).
    relative_position: i64,
    /// Distance of the front end from the middle of the lane in m,
    /// positive to the left.
    lateral_position: f64,
    /// Front bumper to front bumper distance in m.
    distance: f64,
    /// Ego velocity minus this vehicle's velocity, in m/s.
    relative_velocity: f64,
    /// The vehicle's acceleration in m/s^2.
    acceleration: f64,
    /// The direction of an in-progress lane change.
    lane_change_direction: RelativeLane,
}

impl NearbyVehicle {
    pub fn new(id: VehicleId, relative_lane: RelativeLane, relative_position: i64) -> Self {
        Self {
            body: VehicleBody::new(id),
            relative_lane,
            relative_position,
            lateral_position: 0.0,
            distance: 0.0,
            relative_velocity: 0.0,
            acceleration: 0.0,
            lane_change_direction: RelativeLane::Same,
        }
    }

    /// The attributes shared with other vehicles.
    pub fn body(&self) -> &VehicleBody {
        &self.body
    }

    pub fn id(&self) -> VehicleId {
        self.body.id()
    }

    /// The vehicle's length in m.
    pub fn length(&self) -> f64 {
        self.body.length()
    }

    pub fn vehicle_type(&self) -> VehicleType {
        self.body.vehicle_type()
    }

    pub fn relative_lane(&self) -> RelativeLane {
        self.relative_lane
    }

    pub fn relative_position(&self) -> i64 {
        self.relative_position
    }

    pub fn lateral_position(&self) -> f64 {
        self.lateral_position
    }

    /// The front bumper to front bumper distance in m.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    /// Ego velocity minus this vehicle's velocity, in m/s.
    pub fn relative_velocity(&self) -> f64 {
        self.relative_velocity
    }

    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    pub fn lane_change_direction(&self) -> RelativeLane {
        self.lane_change_direction
    }

    pub fn set_lateral_position(&mut self, lateral_position: f64) {
        self.lateral_position = lateral_position;
    }

    pub fn set_distance(&mut self, distance: f64) {
        self.distance = distance;
    }

    pub fn set_relative_velocity(&mut self, relative_velocity: f64) {
        self.relative_velocity = relative_velocity;
    }

    pub fn set_acceleration(&mut self, acceleration: f64) {
        self.acceleration = acceleration;
    }

    pub fn set_lane_change_direction(&mut self, direction: RelativeLane) {
        self.lane_change_direction = direction;
    }

    pub fn set_length(&mut self, length: f64) {
        self.body.set_length(length);
    }

    pub fn set_width(&mut self, width: f64) {
        self.body.set_width(width);
    }

    pub fn set_category(&mut self, code: i64) {
        self.body.set_category(code);
    }

    /// Sets the type as far as the ego vehicle can tell.
    pub fn set_type(&mut self, true_type: VehicleType, ego_type: VehicleType) {
        self.body.set_type(true_type.perceived_by(ego_type));
    }

    /// Whether this vehicle is known to be connected. Only ever true when the
    /// observing ego vehicle is connected too.
    pub fn is_connected(&self) -> bool {
        self.vehicle_type().is_connected()
    }

    /// This vehicle's absolute velocity given the ego velocity.
    pub fn compute_velocity(&self, ego_velocity: f64) -> f64 {
        ego_velocity - self.relative_velocity
    }

    pub fn is_on_same_lane(&self) -> bool {
        self.relative_lane == RelativeLane::Same
    }

    pub fn is_immediately_ahead(&self) -> bool {
        self.relative_position == 1
    }

    pub fn is_immediately_behind(&self) -> bool {
        self.relative_position == -1
    }

    pub fn is_ahead(&self) -> bool {
        self.relative_position > 0
    }

    pub fn is_behind(&self) -> bool {
        !self.is_ahead()
    }

    pub fn is_lane_changing(&self) -> bool {
        self.lane_change_direction != RelativeLane::Same
    }

    /// Whether this vehicle is changing lanes into the ego vehicle's lane ahead of it.
    pub fn is_cutting_in(&self) -> bool {
        if !self.is_ahead() || !self.is_lane_changing() {
            return false;
        }
        // The lateral offset must lie on the ego's side of the vehicle's lane
        // centre, i.e. share the sign of its relative lane.
        let towards_ego = self.relative_lane == self.lane_change_direction.opposite();
        let offset_towards_ego =
            self.lateral_position * self.lane_change_direction.opposite().to_int() as f64 > 0.0;
        towards_ego && offset_towards_ego
    }
}

impl fmt::Display for NearbyVehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={}, relative_lane={}, relative_position={}, lateral_position={}, \
             distance={}, relative_velocity={}, lane_change_direction={}",
            self.id(),
            self.relative_lane,
            self.relative_position,
            self.lateral_position,
            self.distance,
            self.relative_velocity,
            self.lane_change_direction,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn changing(lane: RelativeLane, direction: RelativeLane, lateral: f64) -> NearbyVehicle {
        let mut nv = NearbyVehicle::new(7, lane, 1);
        nv.set_lane_change_direction(direction);
        nv.set_lateral_position(lateral);
        nv
    }

    #[test]
    fn cut_in_requires_offset_towards_ego() {
        // On the left lane, moving right: the lateral offset must point to
        // the left, on the ego's side of the vehicle's lane.
        assert!(changing(RelativeLane::Left, RelativeLane::Right, 0.8).is_cutting_in());
        assert!(!changing(RelativeLane::Left, RelativeLane::Right, -0.8).is_cutting_in());
        // Mirrored on the right lane.
        assert!(changing(RelativeLane::Right, RelativeLane::Left, -0.5).is_cutting_in());
        assert!(!changing(RelativeLane::Right, RelativeLane::Left, 0.5).is_cutting_in());
        // No lateral offset yet.
        assert!(!changing(RelativeLane::Left, RelativeLane::Right, 0.0).is_cutting_in());
    }

    #[test]
    fn not_a_cut_in() {
        // Moving away from the ego lane.
        assert!(!changing(RelativeLane::Left, RelativeLane::Left, 0.8).is_cutting_in());
        // Two lanes over, moving into the adjacent lane.
        assert!(!changing(RelativeLane::LeftLeft, RelativeLane::Right, 0.8).is_cutting_in());
        // Not changing lanes at all.
        assert!(!changing(RelativeLane::Left, RelativeLane::Same, 0.8).is_cutting_in());

        let mut behind = changing(RelativeLane::Left, RelativeLane::Right, 0.8);
        behind.relative_position = -1;
        assert!(!behind.is_cutting_in());
    }

    #[test]
    fn relative_queries() {
        let mut nv = NearbyVehicle::new(3, RelativeLane::Same, 1);
        nv.set_relative_velocity(4.0);
        assert!(nv.is_on_same_lane());
        assert!(nv.is_immediately_ahead());
        assert!(nv.is_ahead());
        assert!(!nv.is_behind());
        assert_approx_eq!(nv.compute_velocity(20.0), 16.0);

        let nv = NearbyVehicle::new(3, RelativeLane::Right, -1);
        assert!(nv.is_immediately_behind());
        assert!(nv.is_behind());
    }

    #[test]
    fn connectivity_is_masked() {
        let mut nv = NearbyVehicle::new(3, RelativeLane::Same, 1);
        nv.set_type(VehicleType::TrafficLightCaccCar, VehicleType::TrafficLightAccCar);
        assert_eq!(nv.vehicle_type(), VehicleType::TrafficLightAccCar);
        assert!(!nv.is_connected());

        nv.set_type(VehicleType::TrafficLightCaccCar, VehicleType::TrafficLightCaccCar);
        assert!(nv.is_connected());

        nv.set_type(VehicleType::Truck, VehicleType::TrafficLightCaccCar);
        assert_eq!(nv.vehicle_type(), VehicleType::HumanDrivenCar);
    }
}
