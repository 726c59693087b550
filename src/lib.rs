pub use color::Color;
pub use control::{
    Candidate, ControlManager, ControllerMode, ControllerParams, Decision, LongitudinalController,
};
pub use error::{Error, Result};
pub use factory::create_ego_vehicle;
pub use lane::RelativeLane;
pub use light::{LightState, TrafficLight, TrafficLightSet};
pub use logger::{LoggerConfig, SimulationLogger};
pub use session::{Session, SessionConfig};
pub use vehicle::{
    Capabilities, EgoAttributes, EgoVehicle, LaneChangeState, NearbyVehicle, VehicleCategory,
    VehicleType,
};

mod color;
pub mod control;
#[cfg(feature = "debug")]
mod debug;
mod error;
mod factory;
mod lane;
pub mod light;
mod logger;
mod session;
pub mod vehicle;

/// Unique ID of a vehicle, assigned by the host.
pub type VehicleId = i64;

/// Unique ID of a [TrafficLight], assigned by the timing table.
pub type TrafficLightId = i64;

type VehicleSet = std::collections::HashMap<VehicleId, EgoVehicle>;
