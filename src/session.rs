use crate::color::Color;
use crate::control::ControllerParams;
use crate::error::Result;
use crate::factory::create_ego_vehicle;
use crate::lane::RelativeLane;
use crate::light::{load_timing_file, LightState, TrafficLight, TrafficLightSet};
use crate::logger::SimulationLogger;
use crate::vehicle::{EgoAttributes, EgoVehicle, NearbyVehicle};
use crate::{TrafficLightId, VehicleId, VehicleSet};
use log::{info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The time step assumed until the host sets one, in s.
const DEFAULT_TIME_STEP: f64 = 0.1; // s

/// The configuration of a simulation run.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    /// The time step in s until the host sets one.
    pub default_time_step: f64,
    /// Where to write per-vehicle trajectory logs; `None` disables them.
    pub log_dir: Option<PathBuf>,
    /// The vehicles whose decisions are logged in detail.
    pub verbose_vehicles: HashSet<VehicleId>,
    /// The controller parameters given to every new vehicle.
    pub params: ControllerParams,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_time_step: DEFAULT_TIME_STEP,
            log_dir: None,
            verbose_vehicles: HashSet::new(),
            params: ControllerParams::default(),
        }
    }
}

/// One run of the driver model: the ego vehicles and the traffic lights.
///
/// The host drives each vehicle through a fixed sequence every step:
/// [Self::begin_vehicle_step], then the setters, then [Self::move_vehicle],
/// then [Self::desired_acceleration] and the other queries.
#[derive(Debug, Default)]
pub struct Session {
    config: SessionConfig,
    /// The automated vehicles, keyed by host ID.
    vehicles: VehicleSet,
    /// The traffic lights.
    lights: TrafficLightSet,
    /// The current simulation time in s.
    time: f64,
    /// The time step set by the host in s.
    time_step: Option<f64>,
}

impl Session {
    /// Creates a new session.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Sets the simulation time step. Only the first positive value is used.
    pub fn set_time_step(&mut self, time_step: f64) -> bool {
        if self.time_step.is_some() || time_step <= 0.0 {
            return false;
        }
        self.time_step = Some(time_step);
        true
    }

    /// The simulation time step in s.
    pub fn time_step(&self) -> f64 {
        self.time_step.unwrap_or(self.config.default_time_step)
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// The current simulation time in s.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Loads a signal timing table, returning the number of signals read.
    pub fn load_parameter_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let count = load_timing_file(path.as_ref(), &mut self.lights)?;
        info!("Loaded {} traffic lights from {}", count, path.as_ref().display());
        Ok(count)
    }

    /// Adds a traffic light, replacing any with the same ID.
    pub fn add_traffic_light(&mut self, light: TrafficLight) {
        self.lights.insert(light.id(), light);
    }

    pub fn lights(&self) -> &TrafficLightSet {
        &self.lights
    }

    pub fn light(&self, id: TrafficLightId) -> Option<&TrafficLight> {
        self.lights.get(&id)
    }

    /// Sets the current phase of a signal from its host code. Unknown
    /// signals are added without timing data.
    pub fn set_signal_state(&mut self, id: TrafficLightId, code: i64) {
        self.light_entry(id).set_state(LightState::from_code(code));
    }

    /// Sets when the current phase of a signal started, in s.
    pub fn set_signal_state_start(&mut self, id: TrafficLightId, time: f64) {
        self.light_entry(id).set_state_start_time(time);
    }

    fn light_entry(&mut self, id: TrafficLightId) -> &mut TrafficLight {
        self.lights.entry(id).or_insert_with(|| {
            warn!("Traffic light {} has no timing data", id);
            TrafficLight::unconfigured(id)
        })
    }

    /// Creates an ego vehicle. Returns false if the type is not driven by
    /// this model, in which case the host keeps control of the vehicle.
    pub fn create_vehicle(&mut self, id: VehicleId, type_code: i64, desired_velocity: f64) -> bool {
        let attributes = EgoAttributes {
            id,
            type_code,
            desired_velocity,
            creation_time: self.time,
            time_step: self.time_step(),
            params: self.config.params,
            verbose: self.config.verbose_vehicles.contains(&id),
        };
        let vehicle = match create_ego_vehicle(&attributes, self.config.log_dir.as_deref()) {
            Some(vehicle) => vehicle,
            None => return false,
        };
        if self.vehicles.insert(id, vehicle).is_some() {
            warn!("Veh {}: created twice, the old instance was replaced", id);
        }
        true
    }

    /// Removes a vehicle, closing its trajectory log.
    pub fn kill_vehicle(&mut self, id: VehicleId) -> bool {
        self.vehicles.remove(&id).is_some()
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&EgoVehicle> {
        self.vehicles.get(&id)
    }

    /// Gets a vehicle to set its attributes for this step.
    pub fn vehicle_mut(&mut self, id: VehicleId) -> Option<&mut EgoVehicle> {
        let vehicle = self.vehicles.get_mut(&id);
        if vehicle.is_none() {
            warn!("Veh {}: not an ego vehicle", id);
        }
        vehicle
    }

    /// Returns an iterator over all the ego vehicles.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &EgoVehicle> {
        self.vehicles.values()
    }

    /// Starts a new step for a vehicle.
    pub fn begin_vehicle_step(&mut self, id: VehicleId) -> bool {
        self.vehicle_mut(id).map(EgoVehicle::begin_step).is_some()
    }

    /// Adds a neighbour seen by a vehicle this step, returning it so the
    /// host can fill in its attributes.
    pub fn add_nearby_vehicle(
        &mut self,
        id: VehicleId,
        nearby_id: VehicleId,
        relative_lane: i64,
        relative_position: i64,
    ) -> Option<&mut NearbyVehicle> {
        self.vehicle_mut(id)?.add_nearby_vehicle(
            nearby_id,
            RelativeLane::from_code(relative_lane),
            relative_position,
        )
    }

    /// Reports a traffic light ahead of a vehicle.
    pub fn observe_signal(&mut self, id: VehicleId, light_id: TrafficLightId, distance: f64) -> bool {
        self.vehicle_mut(id)
            .map(|vehicle| vehicle.observe_traffic_light(light_id, distance))
            .is_some()
    }

    /// Recomputes a vehicle's leader and lane change intention once its
    /// attributes for this step are set.
    pub fn move_vehicle(&mut self, id: VehicleId) -> bool {
        self.vehicle_mut(id).map(EgoVehicle::update).is_some()
    }

    /// Decides a vehicle's acceleration for this step in m/s^2.
    pub fn desired_acceleration(&mut self, id: VehicleId) -> Option<f64> {
        match self.vehicles.get_mut(&id) {
            Some(vehicle) => Some(vehicle.decide_acceleration(&self.lights)),
            None => {
                warn!("Veh {}: not an ego vehicle", id);
                None
            }
        }
    }

    /// The lane change a vehicle starts: -1 right, 0 none, 1 left.
    pub fn lane_change_decision(&self, id: VehicleId) -> Option<i64> {
        self.vehicle(id).map(EgoVehicle::decide_lane_change)
    }

    pub fn turning_indicator(&self, id: VehicleId) -> Option<i64> {
        self.vehicle(id).map(EgoVehicle::turning_indicator)
    }

    /// The colour the host should draw a vehicle with.
    pub fn color(&self, id: VehicleId) -> Option<Color> {
        self.vehicle(id).map(EgoVehicle::color)
    }

    /// Takes the decisions recorded since the last call as a JSON array.
    #[cfg(feature = "debug")]
    pub fn take_debug_frame(&mut self) -> serde_json::Value {
        crate::debug::take_debug_frame()
    }

    /// Ends the run: every vehicle's trajectory log is closed, as is the
    /// installed logger.
    pub fn finish(&mut self) {
        let count = self.vehicles.len();
        self.vehicles.clear();
        info!("Simulation finished at t={} with {} vehicles", self.time, count);
        if let Some(logger) = SimulationLogger::installed() {
            logger.finish();
        }
    }
}
