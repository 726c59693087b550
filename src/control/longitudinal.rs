use crate::color::Color;
use crate::light::{LightState, TrafficLight};
use crate::vehicle::{COMFORTABLE_ACCELERATION, COMFORTABLE_BRAKE};
use arrayvec::ArrayVec;
use std::cell::Cell;
use std::fmt;

/// The distance assumed to the light after the next one when it is unknown, in m.
const NEXT_LIGHT_SPACING_FALLBACK: f64 = 1000.0; // m

/// The parameters of the longitudinal controller.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControllerParams {
    /// The desired time gap to the leader in s.
    pub time_headway: f64,
    /// The gap to keep at standstill in m.
    pub standstill_distance: f64,
    /// The gain on the gap error when following a vehicle.
    pub vehicle_following_gain: f64,
    /// The gain on the velocity error when tracking the desired velocity.
    pub velocity_control_gain: f64,
    /// The lookahead time of the traffic light safe set in s.
    pub beta: f64,
    /// How far the gap may fall short of the safe gap before braking hard, in m.
    pub too_close_margin: f64,
    /// The comfortable acceleration in m/s^2.
    pub comfortable_acceleration: f64,
    /// The comfortable braking, as an absolute value in m/s^2.
    pub comfortable_braking: f64,
    /// The spacing assumed after the next light when the following one is unknown, in m.
    pub next_light_spacing_fallback: f64,
}

impl Default for ControllerParams {
    fn default() -> Self {
        Self {
            time_headway: 1.0,
            standstill_distance: 3.0,
            vehicle_following_gain: 2.0,
            velocity_control_gain: 1.0,
            beta: 4.0,
            too_close_margin: 0.1,
            comfortable_acceleration: COMFORTABLE_ACCELERATION,
            comfortable_braking: COMFORTABLE_BRAKE,
            next_light_spacing_fallback: NEXT_LIGHT_SPACING_FALLBACK,
        }
    }
}

/// Which proposal produced the chosen acceleration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControllerMode {
    /// Nominal: the comfortable acceleration.
    #[default]
    MaxAccel,
    VehicleFollowing,
    VelocityControl,
    TrafficLight,
    /// The gap is below the safe gap; braking is limited only by the vehicle.
    TooClose,
}

impl ControllerMode {
    /// The colour used to show this mode in the host's visualisation.
    pub fn color(self) -> Color {
        match self {
            Self::MaxAccel => Color::BLUE_GREEN,
            Self::TooClose => Color::RED,
            Self::TrafficLight => Color::YELLOW,
            Self::VehicleFollowing | Self::VelocityControl => Color::DARK_GREEN,
        }
    }
}

impl fmt::Display for ControllerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MaxAccel => "nominal (max accel)",
            Self::VehicleFollowing => "vehicle following",
            Self::VelocityControl => "velocity control",
            Self::TrafficLight => "traffic light",
            Self::TooClose => "too close",
        };
        f.write_str(name)
    }
}

/// One proposed acceleration.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Candidate {
    pub mode: ControllerMode,
    /// The acceleration in m/s^2.
    pub value: f64,
}

/// The proposals applicable in one step, in evaluation order.
pub type Candidates = ArrayVec<Candidate, 4>;

/// The state of the ego vehicle relative to its leader.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Following {
    /// The bumper to bumper gap in m.
    pub gap: f64,
    /// The ego velocity in m/s.
    pub ego_velocity: f64,
    /// The leader velocity in m/s.
    pub leader_velocity: f64,
    /// The leader acceleration in m/s^2.
    pub leader_acceleration: f64,
    /// Whether both vehicles are connected.
    pub cooperative: bool,
}

/// The state of the ego vehicle relative to the next traffic light on its route.
#[derive(Clone, Copy, Debug)]
pub struct Approach<'a> {
    /// The current simulation time in s.
    pub time: f64,
    /// The ego velocity in m/s.
    pub ego_velocity: f64,
    /// The distance from the ego vehicle to the light in m.
    pub distance: f64,
    /// The light itself.
    pub light: &'a TrafficLight,
    /// The distance from this light to the following one, if known, in m.
    pub spacing_to_following: Option<f64>,
}

/// A longitudinal controller that keeps a safe gap to its leader and
/// can always stop before a red light.
#[derive(Clone, Debug)]
pub struct LongitudinalController {
    params: ControllerParams,
    /// The mode that realised the last chosen acceleration.
    mode: Cell<ControllerMode>,
    /// The gap error from the last vehicle following proposal, in m.
    gap_error: Cell<f64>,
    /// The combined traffic light safe set from the last proposal.
    h3: Cell<f64>,
    /// The time derivative of the transient safe set from the last proposal.
    dht: Cell<f64>,
}

impl LongitudinalController {
    pub fn new(params: ControllerParams) -> Self {
        Self {
            params,
            mode: Cell::new(ControllerMode::MaxAccel),
            gap_error: Cell::new(0.0),
            h3: Cell::new(0.0),
            dht: Cell::new(0.0),
        }
    }

    pub fn params(&self) -> &ControllerParams {
        &self.params
    }

    /// The mode chosen by the last call to [Self::choose_acceleration].
    pub fn mode(&self) -> ControllerMode {
        self.mode.get()
    }

    /// The gap error computed by the last vehicle following proposal, in m.
    pub fn gap_error(&self) -> f64 {
        self.gap_error.get()
    }

    /// The combined traffic light safe set from the last traffic light proposal.
    pub fn h3(&self) -> f64 {
        self.h3.get()
    }

    /// The time derivative of the transient safe set from the last traffic light proposal.
    pub fn dht(&self) -> f64 {
        self.dht.get()
    }

    /// The nominal proposal: accelerate comfortably.
    pub fn nominal_input(&self) -> Candidate {
        Candidate {
            mode: ControllerMode::MaxAccel,
            value: self.params.comfortable_acceleration,
        }
    }

    /// The safe gap to a leader in m.
    pub fn safe_gap(&self, ego_vel: f64, leader_vel: f64) -> f64 {
        let p = &self.params;
        p.time_headway * ego_vel
            + p.standstill_distance
            + (ego_vel.powi(2) - leader_vel.powi(2)) / (2.0 * p.comfortable_braking)
    }

    /// Regulates the gap to the leader.
    pub fn vehicle_following_input(&self, following: &Following) -> Candidate {
        let p = &self.params;
        let brake = p.comfortable_braking;
        let ego_vel = following.ego_velocity;
        let leader_vel = following.leader_velocity;
        let rel_vel = ego_vel - leader_vel;

        let gap_error = following.gap - self.safe_gap(ego_vel, leader_vel);
        self.gap_error.set(gap_error);

        let value = if following.cooperative {
            let leader_term = following.leader_acceleration / brake * leader_vel;
            (-rel_vel + p.vehicle_following_gain * gap_error + leader_term) * brake
                / (brake + ego_vel)
        } else {
            (-rel_vel + p.vehicle_following_gain * gap_error) / (p.time_headway + ego_vel / brake)
        };
        Candidate {
            mode: ControllerMode::VehicleFollowing,
            value,
        }
    }

    /// Tracks the desired velocity.
    pub fn velocity_control_input(&self, ego_vel: f64, desired_vel: f64) -> Candidate {
        Candidate {
            mode: ControllerMode::VelocityControl,
            value: self.params.velocity_control_gain * (desired_vel - ego_vel),
        }
    }

    /// Keeps the vehicle able to stop before the next light should it turn red.
    pub fn traffic_light_input(&self, approach: &Approach) -> Candidate {
        let p = &self.params;
        let brake = p.comfortable_braking;
        let ego_vel = approach.ego_velocity;

        let hx = self.stopping_margin(approach.distance, ego_vel);
        let (ht, dht) = self.transient_safe_set(approach);
        let h3 = ht + hx;
        self.h3.set(h3);
        self.dht.set(dht);

        Candidate {
            mode: ControllerMode::TrafficLight,
            value: brake / (p.beta * brake + ego_vel) * (dht - ego_vel + h3),
        }
    }

    /// The static part of the safe set: how much room is left after stopping, in m.
    pub fn stopping_margin(&self, distance: f64, ego_vel: f64) -> f64 {
        let p = &self.params;
        distance
            - p.beta * ego_vel
            - p.standstill_distance
            - ego_vel.powi(2) / (2.0 * p.comfortable_braking)
    }

    /// The time varying part of the safe set and its time derivative.
    ///
    /// On red there is no slack. Otherwise the slack shrinks linearly until
    /// the predicted next red, capped at the spacing to the following light.
    pub fn transient_safe_set(&self, approach: &Approach) -> (f64, f64) {
        if approach.light.state() == LightState::Red {
            return (0.0, 0.0);
        }
        let lambda = self.params.beta * self.params.comfortable_braking;
        let spacing = approach
            .spacing_to_following
            .unwrap_or(self.params.next_light_spacing_fallback);
        let ht = -lambda * (approach.time - approach.light.time_of_next_red());
        if ht > spacing {
            (spacing, 0.0)
        } else {
            (ht, -lambda)
        }
    }

    /// Gathers the proposals that apply this step.
    pub fn candidates(
        &self,
        ego_vel: f64,
        desired_vel: f64,
        following: Option<&Following>,
        approach: Option<&Approach>,
    ) -> Candidates {
        let mut candidates = Candidates::new();
        candidates.push(self.nominal_input());
        if let Some(following) = following {
            candidates.push(self.vehicle_following_input(following));
        }
        candidates.push(self.velocity_control_input(ego_vel, desired_vel));
        if let Some(approach) = approach {
            candidates.push(self.traffic_light_input(approach));
        }
        candidates
    }

    /// Picks the smallest proposal, then limits braking to `max_brake`
    /// if the vehicle is already closer to its leader than the safe gap.
    pub fn choose_acceleration(
        &self,
        candidates: &[Candidate],
        following: Option<&Following>,
        max_brake: f64,
    ) -> f64 {
        let chosen = candidates.iter().fold(None, |best: Option<Candidate>, c| match best {
            Some(best) if c.value >= best.value => Some(best),
            _ => Some(*c),
        });
        let chosen = chosen.unwrap_or_else(|| self.nominal_input());
        self.mode.set(chosen.mode);

        let following = match following {
            Some(following) => following,
            None => return chosen.value,
        };

        let gap_error =
            following.gap - self.safe_gap(following.ego_velocity, following.leader_velocity);
        if gap_error >= -self.params.too_close_margin {
            chosen.value
        } else {
            self.mode.set(ControllerMode::TooClose);
            f64::max(chosen.value, -max_brake)
        }
    }
}
