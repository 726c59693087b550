use crate::vehicle::history::TrajectoryLog;
use crate::vehicle::{EgoAttributes, EgoVehicle, VehicleType};
use log::warn;
use std::path::Path;

/// Creates the ego vehicle for a host type code.
///
/// Only traffic-light-aware types are driven by this model. Any other code
/// is logged and yields `None`; the host keeps driving that vehicle itself.
/// If `log_dir` is given, the vehicle writes its trajectory there.
pub fn create_ego_vehicle(attributes: &EgoAttributes, log_dir: Option<&Path>) -> Option<EgoVehicle> {
    let ty = match VehicleType::from_code(attributes.type_code) {
        Some(ty) if ty.is_traffic_light_aware() => ty,
        _ => {
            warn!(
                "Veh {}: no ego vehicle for type code {}",
                attributes.id, attributes.type_code
            );
            return None;
        }
    };
    let log = log_dir.and_then(|dir| match TrajectoryLog::create(dir, attributes.id) {
        Ok(log) => Some(log),
        Err(err) => {
            warn!("Veh {}: trajectory will not be logged: {}", attributes.id, err);
            None
        }
    });
    Some(EgoVehicle::new(ty, attributes, log))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::control::ControllerParams;

    fn attributes(type_code: i64) -> EgoAttributes {
        EgoAttributes {
            id: 8,
            type_code,
            desired_velocity: 20.0,
            creation_time: 0.0,
            time_step: 0.1,
            params: ControllerParams::default(),
            verbose: false,
        }
    }

    #[test]
    fn creates_traffic_light_vehicles() {
        let acc = create_ego_vehicle(&attributes(130), None).unwrap();
        assert_eq!(acc.vehicle_type(), VehicleType::TrafficLightAccCar);
        assert!(!acc.capabilities().connected);
        assert!(acc.capabilities().traffic_light_tracking);
        assert!(!acc.capabilities().lane_change);

        let cacc = create_ego_vehicle(&attributes(135), None).unwrap();
        assert!(cacc.capabilities().connected);
    }

    #[test]
    fn other_codes_yield_nothing() {
        for code in [0, 100, 140, 200, 300, 999] {
            assert!(create_ego_vehicle(&attributes(code), None).is_none());
        }
    }

    #[test]
    fn unwritable_log_dir_is_not_fatal() {
        let dir = Path::new("/nonexistent/trajectories");
        assert!(create_ego_vehicle(&attributes(130), Some(dir)).is_some());
    }
}
