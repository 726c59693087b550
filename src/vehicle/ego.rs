use super::history::{History, TrajectoryLog};
use super::nearby::NearbyVehicle;
use super::{VehicleBody, VehicleType, MAX_DISTANCE};
use crate::color::Color;
use crate::control::{Approach, ControlManager, ControllerParams, Following};
use crate::lane::RelativeLane;
use crate::light::{distance_to_following, TrafficLightSet};
use crate::{TrafficLightId, VehicleId};
use log::{debug, warn};
use smallvec::SmallVec;
use std::fmt;

/// The attributes of an ego vehicle, supplied by the host at creation.
#[derive(Clone, Debug)]
pub struct EgoAttributes {
    /// The vehicle ID assigned by the host.
    pub id: VehicleId,
    /// The host's vehicle type code.
    pub type_code: i64,
    /// The desired velocity in m/s.
    pub desired_velocity: f64,
    /// The simulation time at creation in s.
    pub creation_time: f64,
    /// The simulation time step in s.
    pub time_step: f64,
    /// The controller parameters.
    pub params: ControllerParams,
    /// Whether to log this vehicle's decisions in detail.
    pub verbose: bool,
}

/// What a kind of ego vehicle is able to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Whether the vehicle may start lane changes.
    pub lane_change: bool,
    /// Whether the vehicle tracks the next traffic light on its route.
    pub traffic_light_tracking: bool,
    /// Whether the vehicle exchanges its state with other connected vehicles.
    pub connected: bool,
}

impl Capabilities {
    pub fn for_type(ty: VehicleType) -> Self {
        Self {
            lane_change: !ty.is_traffic_light_aware(),
            traffic_light_tracking: ty.is_traffic_light_aware(),
            connected: ty.is_connected(),
        }
    }
}

/// The lane change intention of an ego vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LaneChangeState {
    #[default]
    LaneKeeping,
    IntentionToChangeLanes,
}

impl fmt::Display for LaneChangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LaneKeeping => f.write_str("lane keeping"),
            Self::IntentionToChangeLanes => f.write_str("intention to LC"),
        }
    }
}

/// Where the ego vehicle is relative to the traffic lights on its route.
#[derive(Clone, Debug, Default)]
struct SignalTracking {
    /// The closest light ahead reported this step.
    next_light: Option<TrafficLightId>,
    /// The distance to `next_light` in m.
    distance: f64,
    /// The last light reported before this step.
    last_seen: Option<TrafficLightId>,
    /// When the vehicle last passed a light, in s.
    time_crossed_last: Option<f64>,
    time_crossed_before_step: Option<f64>,
}

impl SignalTracking {
    fn begin_step(&mut self) {
        if self.next_light.is_some() {
            self.last_seen = self.next_light.take();
        }
        self.time_crossed_before_step = self.time_crossed_last;
    }

    /// Records a light ahead. Within a step the closest one wins.
    fn observe(&mut self, id: TrafficLightId, distance: f64, time: f64) {
        if id <= 0 || distance < 0.0 {
            return;
        }
        if self.next_light.is_some() && distance >= self.distance {
            return;
        }
        self.next_light = Some(id);
        self.distance = distance;
        self.time_crossed_last = match self.last_seen {
            Some(last) if last != id => Some(time),
            _ => self.time_crossed_before_step,
        };
    }
}

/// An automated vehicle whose decisions are made by this model.
#[derive(Debug)]
pub struct EgoVehicle {
    body: VehicleBody,
    capabilities: Capabilities,
    controller: ControlManager,
    /// The vehicles around this one, rebuilt every step.
    nearby: SmallVec<[NearbyVehicle; 8]>,
    /// The index of the leader in `nearby`.
    leader: Option<usize>,
    history: History,
    /// The simulation time at creation in s.
    creation_time: f64,
    /// The simulation time step in s.
    time_step: f64,
    /// The desired velocity in m/s.
    desired_velocity: f64,
    /// The desired lane angle in rad, positive to the left.
    desired_lane_angle: f64,
    /// The turning indicator: -1 right, 0 off, 1 left.
    turning_indicator: i64,
    use_preferred_lane: bool,
    /// The target lane for a discretionary lane change.
    relative_target_lane: RelativeLane,
    signal: SignalTracking,
    verbose: bool,
}

impl EgoVehicle {
    pub(crate) fn new(ty: VehicleType, attributes: &EgoAttributes, log: Option<TrajectoryLog>) -> Self {
        let ego = Self {
            body: VehicleBody::with_type(attributes.id, ty),
            capabilities: Capabilities::for_type(ty),
            controller: ControlManager::for_type(ty, attributes.params),
            nearby: SmallVec::new(),
            leader: None,
            history: History::new(log),
            creation_time: attributes.creation_time,
            time_step: attributes.time_step,
            desired_velocity: attributes.desired_velocity,
            desired_lane_angle: 0.0,
            turning_indicator: 0,
            use_preferred_lane: false,
            relative_target_lane: RelativeLane::Same,
            signal: SignalTracking::default(),
            verbose: attributes.verbose,
        };
        if ego.verbose {
            debug!(
                "Veh {}: created at t={} as {:?} with desired velocity {}",
                ego.id(),
                ego.creation_time,
                ty,
                ego.desired_velocity
            );
        }
        ego
    }

    /// The attributes shared with other vehicles.
    pub fn body(&self) -> &VehicleBody {
        &self.body
    }

    pub fn id(&self) -> VehicleId {
        self.body.id()
    }

    pub fn vehicle_type(&self) -> VehicleType {
        self.body.vehicle_type()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn controller(&self) -> &ControlManager {
        &self.controller
    }

    /// The number of steps begun so far.
    pub fn samples(&self) -> usize {
        self.history.samples()
    }

    /// The simulation time of the current step in s.
    pub fn time(&self) -> f64 {
        self.creation_time + self.history.samples().saturating_sub(1) as f64 * self.time_step
    }

    /// Completes the current step and starts a new one. Nearby vehicles
    /// and the leader are forgotten.
    pub fn begin_step(&mut self) {
        self.history.begin_step(self.time());
        self.nearby.clear();
        self.leader = None;
        self.signal.begin_step();
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

    pub fn set_lane(&mut self, lane: i64) {
        self.history.current_mut().lane = Some(lane);
    }

    pub fn set_link(&mut self, link: i64) {
        self.history.current_mut().link = Some(link);
    }

    pub fn set_lateral_position(&mut self, lateral_position: f64) {
        self.history.current_mut().lateral_position = Some(lateral_position);
    }

    pub fn set_preferred_lane(&mut self, lane: RelativeLane) {
        self.history.current_mut().preferred_lane = Some(lane);
    }

    pub fn set_velocity(&mut self, velocity: f64) {
        self.history.current_mut().velocity = Some(velocity);
    }

    pub fn set_acceleration(&mut self, acceleration: f64) {
        self.history.current_mut().acceleration = Some(acceleration);
    }

    /// Sets the acceleration the host's own driver model would apply.
    pub fn set_host_acceleration(&mut self, acceleration: f64) {
        self.history.current_mut().host_acceleration = Some(acceleration);
    }

    /// Sets the direction of the lane change in progress, if any.
    pub fn set_lane_change_direction(&mut self, direction: RelativeLane) {
        self.history.current_mut().lane_change_direction = Some(direction);
    }

    /// Records the distance to the end of a lane. The host reports every lane
    /// of the link; only the one the vehicle is on is kept.
    pub fn set_lane_end_distance(&mut self, distance: f64, lane: i64) {
        if self.lane() == Some(lane) {
            self.history.current_mut().lane_end_distance = Some(distance);
        }
    }

    pub fn set_relative_target_lane(&mut self, lane: RelativeLane) {
        self.relative_target_lane = lane;
    }

    pub fn set_desired_velocity(&mut self, velocity: f64) {
        self.desired_velocity = velocity;
    }

    pub fn set_desired_lane_angle(&mut self, angle: f64) {
        self.desired_lane_angle = angle;
    }

    pub fn set_turning_indicator(&mut self, indicator: i64) {
        self.turning_indicator = indicator;
    }

    pub fn set_use_preferred_lane(&mut self, use_preferred_lane: bool) {
        self.use_preferred_lane = use_preferred_lane;
    }

    pub fn lane(&self) -> Option<i64> {
        self.history.latest(|r| r.lane)
    }

    pub fn link(&self) -> Option<i64> {
        self.history.latest(|r| r.link)
    }

    /// The velocity in m/s, zero until the host reports one.
    pub fn velocity(&self) -> f64 {
        self.history.latest(|r| r.velocity).unwrap_or(0.0)
    }

    /// The acceleration in m/s^2, zero until the host reports one.
    pub fn acceleration(&self) -> f64 {
        self.history.latest(|r| r.acceleration).unwrap_or(0.0)
    }

    pub fn host_acceleration(&self) -> f64 {
        self.history.latest(|r| r.host_acceleration).unwrap_or(0.0)
    }

    /// The acceleration decided in the current step, if any.
    pub fn desired_acceleration(&self) -> Option<f64> {
        self.history.current(|r| r.desired_acceleration)
    }

    pub fn preferred_lane(&self) -> RelativeLane {
        self.history.latest(|r| r.preferred_lane).unwrap_or_default()
    }

    pub fn lane_end_distance(&self) -> Option<f64> {
        self.history.latest(|r| r.lane_end_distance)
    }

    pub fn lane_change_state(&self) -> LaneChangeState {
        self.history.latest(|r| r.state).unwrap_or_default()
    }

    pub fn relative_target_lane(&self) -> RelativeLane {
        self.relative_target_lane
    }

    pub fn desired_velocity(&self) -> f64 {
        self.desired_velocity
    }

    pub fn desired_lane_angle(&self) -> f64 {
        self.desired_lane_angle
    }

    pub fn turning_indicator(&self) -> i64 {
        self.turning_indicator
    }

    pub fn use_preferred_lane(&self) -> bool {
        self.use_preferred_lane
    }

    /// Adds a vehicle seen this step. The host pads its neighbour lists with
    /// non-positive IDs, which are ignored.
    pub fn add_nearby_vehicle(
        &mut self,
        id: VehicleId,
        relative_lane: RelativeLane,
        relative_position: i64,
    ) -> Option<&mut NearbyVehicle> {
        if id <= 0 {
            return None;
        }
        self.nearby.push(NearbyVehicle::new(id, relative_lane, relative_position));
        self.nearby.last_mut()
    }

    pub fn nearby_vehicles(&self) -> &[NearbyVehicle] {
        &self.nearby
    }

    /// The vehicle most recently added this step.
    pub fn peek_nearby_vehicle(&self) -> Option<&NearbyVehicle> {
        self.nearby.last()
    }

    pub fn peek_nearby_vehicle_mut(&mut self) -> Option<&mut NearbyVehicle> {
        self.nearby.last_mut()
    }

    /// Sets the type of the vehicle most recently added, as this vehicle perceives it.
    pub fn set_nearby_vehicle_type(&mut self, code: i64) -> bool {
        let ego_type = self.vehicle_type();
        let true_type = VehicleType::from_code(code).unwrap_or(VehicleType::HumanDrivenCar);
        match self.nearby.last_mut() {
            Some(nv) => {
                nv.set_type(true_type, ego_type);
                true
            }
            None => false,
        }
    }

    pub fn nearby_vehicle_by_id(&self, id: VehicleId) -> Option<&NearbyVehicle> {
        self.nearby.iter().find(|nv| nv.id() == id)
    }

    /// Records that the next light ahead has the given ID and distance.
    pub fn observe_traffic_light(&mut self, id: TrafficLightId, distance: f64) {
        let time = self.time();
        self.signal.observe(id, distance, time);
    }

    pub fn next_traffic_light_id(&self) -> Option<TrafficLightId> {
        self.signal.next_light
    }

    /// The distance to the next light ahead in m.
    pub fn distance_to_next_traffic_light(&self) -> Option<f64> {
        self.signal.next_light.map(|_| self.signal.distance)
    }

    /// When this vehicle last passed a traffic light, in s.
    pub fn time_crossed_last_traffic_light(&self) -> Option<f64> {
        self.signal.time_crossed_last
    }

    /// Recomputes the lane change intention and the leader from this step's inputs.
    pub fn update(&mut self) {
        self.update_state();
        self.leader = self.find_leader();
        let leader_id = self.leader().map_or(0, NearbyVehicle::id);
        self.history.current_mut().leader_id = Some(leader_id);
        if self.verbose {
            debug!("Veh {}: t={}, leader {}", self.id(), self.time(), leader_id);
        }
    }

    fn update_state(&mut self) {
        let desired = [self.preferred_lane(), self.relative_target_lane]
            .into_iter()
            .map(direction_of)
            .find(|direction| *direction != RelativeLane::Same)
            .unwrap_or(RelativeLane::Same);
        self.body.set_desired_lane_change(desired);

        let state = if desired == RelativeLane::Same {
            LaneChangeState::LaneKeeping
        } else {
            LaneChangeState::IntentionToChangeLanes
        };
        if self.verbose && state != self.lane_change_state() {
            debug!("Veh {}: t={}, {} -> {}", self.id(), self.time(), self.lane_change_state(), state);
        }
        self.history.current_mut().state = Some(state);
    }

    /// The closest vehicle that is either directly ahead in this lane or
    /// cutting into it. The first found wins ties.
    fn find_leader(&self) -> Option<usize> {
        self.nearby
            .iter()
            .enumerate()
            .filter(|(_, nv)| (nv.is_on_same_lane() && nv.is_immediately_ahead()) || nv.is_cutting_in())
            .fold(None, |best, (idx, nv)| match best {
                Some(best) if self.nearby[best].distance() <= nv.distance() => Some(best),
                _ => Some(idx),
            })
    }

    pub fn leader(&self) -> Option<&NearbyVehicle> {
        self.leader.map(|idx| &self.nearby[idx])
    }

    pub fn has_leader(&self) -> bool {
        self.leader.is_some()
    }

    /// The ID of the leader, or 0 if there is none.
    pub fn leader_id(&self) -> VehicleId {
        self.history.latest(|r| r.leader_id).unwrap_or(0)
    }

    /// The bumper to bumper gap to a nearby vehicle in m. Vehicles behind
    /// give a negative gap and a missing vehicle gives [MAX_DISTANCE].
    pub fn compute_gap(&self, nv: Option<&NearbyVehicle>) -> f64 {
        match nv {
            Some(nv) if nv.id() > 0 => {
                if nv.is_ahead() {
                    nv.distance() - nv.length()
                } else {
                    -nv.distance() - self.body.length()
                }
            }
            _ => MAX_DISTANCE,
        }
    }

    pub fn gap_to_leader(&self) -> f64 {
        self.compute_gap(self.leader())
    }

    /// Ego velocity minus leader velocity in m/s, or zero without a leader.
    pub fn relative_velocity_to_leader(&self) -> f64 {
        self.leader().map_or(0.0, NearbyVehicle::relative_velocity)
    }

    /// The state relative to the leader, if there is one.
    pub fn following(&self) -> Option<Following> {
        let leader = self.leader()?;
        let velocity = self.velocity();
        Some(Following {
            gap: self.compute_gap(Some(leader)),
            ego_velocity: velocity,
            leader_velocity: leader.compute_velocity(velocity),
            leader_acceleration: leader.acceleration(),
            cooperative: self.capabilities.connected && leader.is_connected(),
        })
    }

    /// The state relative to the next traffic light, if the vehicle tracks
    /// lights and the next one is known.
    pub fn approach<'a>(&self, lights: &'a TrafficLightSet) -> Option<Approach<'a>> {
        if !self.capabilities.traffic_light_tracking {
            return None;
        }
        let id = self.signal.next_light?;
        let light = match lights.get(&id) {
            Some(light) => light,
            None => {
                warn!("Veh {}: traffic light {} is not in the signal table", self.id(), id);
                return None;
            }
        };
        Some(Approach {
            time: self.time(),
            ego_velocity: self.velocity(),
            distance: self.signal.distance,
            light,
            spacing_to_following: distance_to_following(lights, light),
        })
    }

    /// Decides and records the acceleration for this step.
    pub fn decide_acceleration(&mut self, lights: &TrafficLightSet) -> f64 {
        let following = self.following();
        let approach = self.approach(lights);
        let decision = self.controller.desired_acceleration(
            self.velocity(),
            self.desired_velocity,
            following.as_ref(),
            approach.as_ref(),
            self.body.max_brake(),
            self.host_acceleration(),
        );
        if self.verbose {
            if let Some(mode) = self.controller.mode() {
                debug!(
                    "Veh {}: t={}, candidates {:?}, chose {} ({})",
                    self.id(),
                    self.time(),
                    decision.candidates,
                    decision.acceleration,
                    mode
                );
            }
        }
        #[cfg(feature = "debug")]
        crate::debug::record_decision(self.id(), self.time(), &decision, self.controller.mode());
        self.history.current_mut().desired_acceleration = Some(decision.acceleration);
        decision.acceleration
    }

    /// The lane change to start: -1 right, 0 none, 1 left.
    pub fn decide_lane_change(&self) -> i64 {
        let wants_to_change = self.lane_change_state() == LaneChangeState::IntentionToChangeLanes;
        if wants_to_change && self.capabilities.lane_change {
            self.body.desired_lane_change().to_int()
        } else {
            0
        }
    }

    pub fn color(&self) -> Color {
        self.controller.color()
    }
}

impl Drop for EgoVehicle {
    fn drop(&mut self) {
        self.history.finish(self.time());
        if self.verbose {
            debug!("Veh {}: removed at t={}", self.id(), self.time());
        }
    }
}

/// Reduces a relative lane to a lane change direction.
fn direction_of(lane: RelativeLane) -> RelativeLane {
    if lane.is_to_the_left() {
        RelativeLane::Left
    } else if lane.is_to_the_right() {
        RelativeLane::Right
    } else {
        RelativeLane::Same
    }
}
