pub use self::longitudinal::{
    Approach, Candidate, Candidates, ControllerMode, ControllerParams, Following,
    LongitudinalController,
};
use crate::color::Color;
use crate::vehicle::VehicleType;

mod longitudinal;

/// Decides the acceleration of one ego vehicle.
///
/// Only traffic-light-aware vehicles own a controller; every other vehicle
/// simply applies the acceleration the host suggests.
#[derive(Clone, Debug)]
pub enum ControlManager {
    HostSuggested,
    TrafficLight(LongitudinalController),
}

impl ControlManager {
    /// Picks the control strategy for a vehicle of the given type.
    pub fn for_type(ty: VehicleType, params: ControllerParams) -> Self {
        if ty.is_traffic_light_aware() {
            Self::TrafficLight(LongitudinalController::new(params))
        } else {
            Self::HostSuggested
        }
    }

    /// The longitudinal controller, if this vehicle has one.
    pub fn controller(&self) -> Option<&LongitudinalController> {
        match self {
            Self::TrafficLight(controller) => Some(controller),
            Self::HostSuggested => None,
        }
    }

    /// The mode that realised the last decision, if there is a controller.
    pub fn mode(&self) -> Option<ControllerMode> {
        self.controller().map(LongitudinalController::mode)
    }

    /// Decides the acceleration for this step.
    ///
    /// # Arguments
    /// * `velocity` - The ego velocity (m/s).
    /// * `desired_velocity` - The velocity the vehicle wants to reach (m/s).
    /// * `following` - The state relative to the leader, if there is one.
    /// * `approach` - The state relative to the next traffic light, if there is one.
    /// * `max_brake` - The vehicle's maximum braking as an absolute value (m/s^2).
    /// * `host_acceleration` - The acceleration suggested by the host (m/s^2).
    pub fn desired_acceleration(
        &self,
        velocity: f64,
        desired_velocity: f64,
        following: Option<&Following>,
        approach: Option<&Approach>,
        max_brake: f64,
        host_acceleration: f64,
    ) -> Decision {
        match self {
            Self::HostSuggested => Decision {
                acceleration: host_acceleration,
                candidates: Candidates::new(),
            },
            Self::TrafficLight(controller) => {
                let candidates =
                    controller.candidates(velocity, desired_velocity, following, approach);
                let acceleration = controller.choose_acceleration(&candidates, following, max_brake);
                Decision {
                    acceleration,
                    candidates,
                }
            }
        }
    }

    /// The colour showing the current mode, or white without a controller.
    pub fn color(&self) -> Color {
        self.mode().map(ControllerMode::color).unwrap_or(Color::WHITE)
    }
}

/// The outcome of one acceleration decision.
#[derive(Clone, Debug)]
pub struct Decision {
    /// The commanded acceleration in m/s^2.
    pub acceleration: f64,
    /// The proposals that were weighed; empty without a controller.
    pub candidates: Candidates,
}
