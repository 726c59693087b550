pub use self::ego::{Capabilities, EgoAttributes, EgoVehicle, LaneChangeState};
pub use self::nearby::NearbyVehicle;
use crate::lane::RelativeLane;
use crate::VehicleId;

mod ego;
pub(crate) mod history;
mod nearby;

/// The gap reported when there is no vehicle to measure against, in m.
pub const MAX_DISTANCE: f64 = 300.0;

/// The maximum braking of a car, as an absolute value in m/s^2.
pub const CAR_MAX_BRAKE: f64 = 6.0;

/// The maximum braking of a truck, as an absolute value in m/s^2.
pub const TRUCK_MAX_BRAKE: f64 = 5.5;

/// The comfortable acceleration of automated vehicles in m/s^2.
pub const COMFORTABLE_ACCELERATION: f64 = 2.0;

/// The comfortable braking of automated vehicles, as an absolute value in m/s^2.
pub const COMFORTABLE_BRAKE: f64 = 4.0;

/// The vehicle categories used by the host simulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VehicleCategory {
    #[default]
    Undefined,
    Car,
    Truck,
    Bus,
    Tram,
    Pedestrian,
    Bike,
}

impl VehicleCategory {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Car,
            2 => Self::Truck,
            3 => Self::Bus,
            4 => Self::Tram,
            5 => Self::Pedestrian,
            6 => Self::Bike,
            _ => Self::Undefined,
        }
    }

    /// The estimated maximum braking, as an absolute value in m/s^2.
    /// Anything that is not a truck is assumed to brake like a car.
    pub fn max_brake(self) -> f64 {
        match self {
            Self::Truck => TRUCK_MAX_BRAKE,
            _ => CAR_MAX_BRAKE,
        }
    }
}

/// The user defined vehicle types.
///
/// Type codes have three digits and the first digit is the category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VehicleType {
    #[default]
    Undefined,
    HumanDrivenCar,
    TrafficLightAccCar,
    TrafficLightCaccCar,
    PlatoonCar,
    Truck,
    Bus,
}

impl VehicleType {
    /// Maps a type code, returning `None` for codes this model doesn't know.
    pub fn from_code(code: i64) -> Option<Self> {
        let ty = match code {
            0 => Self::Undefined,
            100 => Self::HumanDrivenCar,
            130 => Self::TrafficLightAccCar,
            135 => Self::TrafficLightCaccCar,
            140 => Self::PlatoonCar,
            200 => Self::Truck,
            300 => Self::Bus,
            _ => return None,
        };
        Some(ty)
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Undefined => 0,
            Self::HumanDrivenCar => 100,
            Self::TrafficLightAccCar => 130,
            Self::TrafficLightCaccCar => 135,
            Self::PlatoonCar => 140,
            Self::Truck => 200,
            Self::Bus => 300,
        }
    }

    /// The category encoded in the first digit of the type code.
    pub fn category(self) -> VehicleCategory {
        VehicleCategory::from_code(self.code() / 100)
    }

    /// Whether vehicles of this type broadcast their state to each other.
    pub fn is_connected(self) -> bool {
        self == Self::TrafficLightCaccCar
    }

    /// Whether this type belongs to the traffic-light-aware family.
    pub fn is_traffic_light_aware(self) -> bool {
        matches!(self, Self::TrafficLightAccCar | Self::TrafficLightCaccCar)
    }

    /// The type that an observer of type `observer` perceives a vehicle of this type as.
    ///
    /// Connectivity can only be known when both vehicles are connected. Otherwise
    /// automated vehicles are recognised as the non-connected member of their
    /// family and everything else as human driven.
    pub fn perceived_by(self, observer: VehicleType) -> Self {
        if self.is_connected() && observer.is_connected() {
            self
        } else if self.is_traffic_light_aware() {
            Self::TrafficLightAccCar
        } else {
            Self::HumanDrivenCar
        }
    }
}

/// The attributes shared by ego and nearby vehicles.
#[derive(Clone, Debug, Default)]
pub struct VehicleBody {
    /// The vehicle ID assigned by the host.
    id: VehicleId,
    /// The vehicle length in m.
    length: f64,
    /// The vehicle width in m.
    width: f64,
    /// The vehicle category, set once.
    category: VehicleCategory,
    /// The vehicle type.
    ty: VehicleType,
    /// The lane change the vehicle would like to make.
    desired_lane_change: RelativeLane,
}

impl VehicleBody {
    pub(crate) fn new(id: VehicleId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub(crate) fn with_type(id: VehicleId, ty: VehicleType) -> Self {
        Self {
            id,
            category: ty.category(),
            ty,
            ..Default::default()
        }
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The vehicle's length in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// The vehicle's width in m.
    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn category(&self) -> VehicleCategory {
        self.category
    }

    pub fn vehicle_type(&self) -> VehicleType {
        self.ty
    }

    /// The estimated maximum braking, as an absolute value in m/s^2.
    pub fn max_brake(&self) -> f64 {
        self.category.max_brake()
    }

    pub fn desired_lane_change(&self) -> RelativeLane {
        self.desired_lane_change
    }

    pub fn has_lane_change_intention(&self) -> bool {
        self.desired_lane_change != RelativeLane::Same
    }

    pub(crate) fn set_length(&mut self, length: f64) {
        self.length = length;
    }

    pub(crate) fn set_width(&mut self, width: f64) {
        self.width = width;
    }

    /// Sets the category. The host repeats it every step, but only the
    /// first defined value is kept.
    pub(crate) fn set_category(&mut self, code: i64) {
        if self.category == VehicleCategory::Undefined {
            self.category = VehicleCategory::from_code(code);
        }
    }

    pub(crate) fn set_type(&mut self, ty: VehicleType) {
        self.ty = ty;
    }

    pub(crate) fn set_desired_lane_change(&mut self, direction: RelativeLane) {
        self.desired_lane_change = direction;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn category_from_type() {
        assert_eq!(VehicleType::TrafficLightAccCar.category(), VehicleCategory::Car);
        assert_eq!(VehicleType::Truck.category(), VehicleCategory::Truck);
        assert_eq!(VehicleType::Bus.category(), VehicleCategory::Bus);
        assert_eq!(VehicleType::Undefined.category(), VehicleCategory::Undefined);
    }

    #[test]
    fn max_brake_by_category() {
        assert_eq!(VehicleCategory::Car.max_brake(), CAR_MAX_BRAKE);
        assert_eq!(VehicleCategory::Truck.max_brake(), TRUCK_MAX_BRAKE);
        assert_eq!(VehicleCategory::Bus.max_brake(), CAR_MAX_BRAKE);
        assert_eq!(VehicleCategory::Undefined.max_brake(), CAR_MAX_BRAKE);
    }

    #[test]
    fn category_is_set_once() {
        let mut body = VehicleBody::new(4);
        body.set_category(2);
        body.set_category(1);
        assert_eq!(body.category(), VehicleCategory::Truck);
        assert_eq!(body.max_brake(), TRUCK_MAX_BRAKE);

        let mut body = VehicleBody::with_type(5, VehicleType::TrafficLightCaccCar);
        body.set_category(2);
        assert_eq!(body.category(), VehicleCategory::Car);
    }

    #[test]
    fn type_codes() {
        for code in [0, 100, 130, 135, 140, 200, 300] {
            assert_eq!(VehicleType::from_code(code).unwrap().code(), code);
        }
        assert_eq!(VehicleType::from_code(131), None);
    }

    #[test]
    fn perception_masks_connectivity() {
        use VehicleType::*;
        assert_eq!(TrafficLightCaccCar.perceived_by(TrafficLightCaccCar), TrafficLightCaccCar);
        assert_eq!(TrafficLightCaccCar.perceived_by(TrafficLightAccCar), TrafficLightAccCar);
        assert_eq!(TrafficLightAccCar.perceived_by(TrafficLightCaccCar), TrafficLightAccCar);
        assert_eq!(Truck.perceived_by(TrafficLightCaccCar), HumanDrivenCar);
        assert_eq!(PlatoonCar.perceived_by(TrafficLightAccCar), HumanDrivenCar);
    }
}
