//! Tests that drive a session the way a host simulator would.

use assert_approx_eq::assert_approx_eq;
use traffic_light_acc::{
    Color, ControllerMode, LightState, RelativeLane, Session, SessionConfig, TrafficLight,
    VehicleType,
};

const EGO: i64 = 1;

/// Starts a step for the ego vehicle at the given velocity.
fn begin_step(session: &mut Session, velocity: f64) {
    assert!(session.begin_vehicle_step(EGO));
    let ego = session.vehicle_mut(EGO).unwrap();
    ego.set_lane(1);
    ego.set_link(10);
    ego.set_lateral_position(0.0);
    ego.set_velocity(velocity);
    ego.set_acceleration(0.0);
    ego.set_host_acceleration(0.5);
    ego.set_preferred_lane(RelativeLane::Same);
    ego.set_lane_change_direction(RelativeLane::Same);
    ego.set_lane_end_distance(-1.0, 1);
    ego.set_length(4.5);
}

fn session_with_ego(type_code: i64) -> Session {
    let mut session = Session::new(SessionConfig::default());
    assert!(session.set_time_step(0.1));
    assert!(session.create_vehicle(EGO, type_code, 25.0));
    session
}

/// A free road gives the comfortable acceleration.
#[test]
fn free_road() {
    let mut session = session_with_ego(130);
    begin_step(&mut session, 20.0);
    assert!(session.move_vehicle(EGO));

    assert_approx_eq!(session.desired_acceleration(EGO).unwrap(), 2.0);
    let ego = session.vehicle(EGO).unwrap();
    assert_eq!(ego.controller().mode(), Some(ControllerMode::MaxAccel));
    assert_eq!(ego.leader_id(), 0);
    assert_eq!(session.color(EGO), Some(Color::BLUE_GREEN));
    assert_eq!(session.lane_change_decision(EGO), Some(0));
}

/// A vehicle cutting in closer than the vehicle ahead becomes the leader,
/// and being far inside the safe gap brakes at the vehicle's limit.
#[test]
fn closer_cut_in_is_followed() {
    let mut session = session_with_ego(130);
    begin_step(&mut session, 20.0);

    let ahead = session.add_nearby_vehicle(EGO, 2, 0, 1).unwrap();
    ahead.set_distance(10.0);
    ahead.set_length(4.0);

    let cutting_in = session.add_nearby_vehicle(EGO, 3, 1, 1).unwrap();
    cutting_in.set_distance(5.0);
    cutting_in.set_length(4.0);
    cutting_in.set_lane_change_direction(RelativeLane::Right);
    cutting_in.set_lateral_position(0.8);

    assert!(session.move_vehicle(EGO));
    let ego = session.vehicle(EGO).unwrap();
    assert_eq!(ego.leader_id(), 3);
    assert_approx_eq!(ego.gap_to_leader(), 1.0);

    assert_approx_eq!(session.desired_acceleration(EGO).unwrap(), -6.0);
    let ego = session.vehicle(EGO).unwrap();
    assert_eq!(ego.controller().mode(), Some(ControllerMode::TooClose));
    assert_eq!(session.color(EGO), Some(Color::RED));
}

/// A comfortable gap to a slower leader is regulated without clamping.
#[test]
fn following_a_slower_leader() {
    let mut session = session_with_ego(130);
    begin_step(&mut session, 20.0);
    let leader = session.add_nearby_vehicle(EGO, 2, 0, 1).unwrap();
    leader.set_distance(49.0);
    leader.set_length(4.0);
    leader.set_relative_velocity(4.0);
    session.move_vehicle(EGO);

    // Gap 45 m against a safe gap of 41 m.
    let acc = session.desired_acceleration(EGO).unwrap();
    assert_approx_eq!(acc, 4.0 / 6.0);
    let ego = session.vehicle(EGO).unwrap();
    assert_eq!(ego.controller().mode(), Some(ControllerMode::VehicleFollowing));
    assert_eq!(ego.relative_velocity_to_leader(), 4.0);
}

/// Only a connected ego vehicle can tell that its neighbour is connected.
#[test]
fn connectivity_is_masked() {
    for (ego_type, expected) in [
        (130, VehicleType::TrafficLightAccCar),
        (135, VehicleType::TrafficLightCaccCar),
    ] {
        let mut session = session_with_ego(ego_type);
        begin_step(&mut session, 20.0);
        session.add_nearby_vehicle(EGO, 2, 0, 1).unwrap();
        assert!(session.vehicle_mut(EGO).unwrap().set_nearby_vehicle_type(135));
        let ego = session.vehicle(EGO).unwrap();
        assert_eq!(ego.nearby_vehicle_by_id(2).unwrap().vehicle_type(), expected);
    }
}

#[test]
fn unknown_type_is_not_created() {
    let mut session = Session::new(SessionConfig::default());
    assert!(!session.create_vehicle(EGO, 100, 25.0));
    assert!(!session.create_vehicle(EGO, 777, 25.0));
    assert!(session.vehicle(EGO).is_none());
    assert_eq!(session.desired_acceleration(EGO), None);
}

/// Sets up a green light 100 m ahead of the ego vehicle, turning red in `time_to_red` s.
fn approach_green_light(session: &mut Session, distance: f64, time_to_red: f64) {
    session.add_traffic_light(TrafficLight::new(1, 100.0, 30.0, 25.0, 5.0));
    session.set_signal_state(1, 3);
    // A green phase ends green + amber = 30 s after it starts.
    session.set_signal_state_start(1, session.time() + time_to_red - 30.0);
    assert_eq!(session.light(1).unwrap().state(), LightState::Green);
    assert!(session.observe_signal(EGO, 1, distance));
}

/// With plenty of time before the red, the light doesn't constrain the vehicle.
#[test]
fn distant_green_light() {
    let mut session = session_with_ego(130);
    begin_step(&mut session, 15.0);
    approach_green_light(&mut session, 100.0, 20.0);
    session.move_vehicle(EGO);

    assert_approx_eq!(session.desired_acceleration(EGO).unwrap(), 2.0);
    let ego = session.vehicle(EGO).unwrap();
    let tl = ego.controller().controller().unwrap();
    // ht = 4 * 4 * 20 and hx = 100 - 60 - 3 - 225 / 8
    assert_approx_eq!(tl.h3(), 320.0 + 8.875);
    assert_approx_eq!(tl.dht(), -16.0);
}

/// Once the red is imminent, the light brakes the vehicle, and harder the closer it is.
#[test]
fn imminent_red_brakes_harder_when_closer() {
    let mut previous = f64::INFINITY;
    for distance in [100.0, 60.0, 30.0] {
        let mut session = session_with_ego(130);
        begin_step(&mut session, 15.0);
        approach_green_light(&mut session, distance, 0.0);
        session.move_vehicle(EGO);

        let acc = session.desired_acceleration(EGO).unwrap();
        let ego = session.vehicle(EGO).unwrap();
        assert_eq!(ego.controller().mode(), Some(ControllerMode::TrafficLight));
        assert_eq!(session.color(EGO), Some(Color::YELLOW));
        assert!(acc < 0.0);
        assert!(acc < previous);
        previous = acc;
    }
    // 4 / 31 * (-16 - 15 + 30 - 60 - 3 - 28.125)
    assert_approx_eq!(previous, -11.887096774193548);
}

/// With the red 2 s away, the light's proposal is positive far from the stop
/// line and turns negative once the vehicle is within its stopping margin.
#[test]
fn light_proposal_changes_sign_approaching_the_stop_line() {
    // ht = 32, dht = -16 at 15 m/s, so the proposal crosses zero where
    // hx = -1, i.e. at 60 + 3 + 28.125 - 1 = 90.125 m.
    let crossing = 90.125;
    for distance in [150.0, 120.0, 100.0, 95.0, 85.0, 60.0, 30.0] {
        let mut session = session_with_ego(130);
        begin_step(&mut session, 15.0);
        approach_green_light(&mut session, distance, 2.0);
        session.move_vehicle(EGO);

        let acc = session.desired_acceleration(EGO).unwrap();
        let ego = session.vehicle(EGO).unwrap();
        let tl = ego.controller().controller().unwrap();
        assert_approx_eq!(tl.h3(), 32.0 + distance - 60.0 - 3.0 - 28.125);
        if distance > crossing {
            assert!(acc > 0.0, "{} m: {}", distance, acc);
        } else {
            assert!(acc < 0.0, "{} m: {}", distance, acc);
            assert_eq!(ego.controller().mode(), Some(ControllerMode::TrafficLight));
        }
    }
}

/// A signal reported by the host but missing from the timing table is ignored.
#[test]
fn unconfigured_light_is_not_applicable() {
    let mut session = session_with_ego(130);
    begin_step(&mut session, 15.0);
    assert!(session.observe_signal(EGO, 9, 20.0));
    session.move_vehicle(EGO);
    assert_approx_eq!(session.desired_acceleration(EGO).unwrap(), 2.0);
}

#[test]
fn loads_timing_table() {
    let dir = std::env::temp_dir().join(format!("tl-session-table-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let good = dir.join("good.csv");
    std::fs::write(&good, "id, position, red, green, amber\n1, 100, 30, 25, 5\n2, 350, 30, 25, 5\n").unwrap();
    let bad = dir.join("bad.csv");
    std::fs::write(&bad, "id, position, red, green, amber\n3, 600, thirty, 25, 5\n").unwrap();

    let mut session = Session::default();
    assert_eq!(session.load_parameter_file(&good).unwrap(), 2);
    assert!(session.load_parameter_file(&bad).is_err());
    assert_eq!(session.lights().len(), 2);
    assert_eq!(session.light(2).unwrap().position(), 350.0);
    std::fs::remove_dir_all(&dir).unwrap();
}

/// Killing a vehicle closes its trajectory log.
#[test]
fn trajectory_is_logged() {
    let dir = std::env::temp_dir().join(format!("tl-session-log-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let mut session = Session::new(SessionConfig {
        log_dir: Some(dir.clone()),
        ..Default::default()
    });
    session.set_time(3.0);
    assert!(session.create_vehicle(EGO, 135, 25.0));
    for step in 0..3 {
        begin_step(&mut session, 20.0 + step as f64);
        session.move_vehicle(EGO);
        session.desired_acceleration(EGO);
    }
    assert!(session.kill_vehicle(EGO));
    assert!(!session.kill_vehicle(EGO));

    let text = std::fs::read_to_string(dir.join("vehicle1.txt")).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("time, lane, link, lat. pos."));
    assert!(lines[1].starts_with("3, 1, 10, 0, same, 20, 0, 2, 0.5, same, "));
    assert!(lines[3].ends_with(", 0, lane keeping"));
    assert_eq!(lines[4], "samples: 3");
    std::fs::remove_dir_all(&dir).unwrap();
}
