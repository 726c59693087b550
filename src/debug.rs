use crate::control::{ControllerMode, Decision};
use crate::VehicleId;
use serde_json::json;

thread_local!(
    static DEBUG_FRAME: std::cell::RefCell<Vec<serde_json::Value>> = Default::default();
);

/// Records the proposals weighed by one acceleration decision.
pub fn record_decision(
    id: VehicleId,
    time: f64,
    decision: &Decision,
    mode: Option<ControllerMode>,
) {
    DEBUG_FRAME.with(|frame| {
        frame.borrow_mut().push(json!({
            "type": "decision",
            "vehicle": id,
            "time": time,
            "candidates": decision.candidates.as_slice(),
            "mode": mode,
            "acceleration": decision.acceleration,
        }))
    })
}

/// Takes every decision recorded since the last call.
pub fn take_debug_frame() -> serde_json::Value {
    json!(DEBUG_FRAME.with(|frame| frame.take()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::control::{Candidate, Candidates};

    #[test]
    fn frame_is_taken_once() {
        let mut candidates = Candidates::new();
        candidates.push(Candidate {
            mode: ControllerMode::MaxAccel,
            value: 2.0,
        });
        let decision = Decision {
            acceleration: 2.0,
            candidates,
        };
        record_decision(3, 1.5, &decision, Some(ControllerMode::MaxAccel));

        let frame = take_debug_frame();
        assert_eq!(frame[0]["vehicle"], 3);
        assert_eq!(frame[0]["candidates"][0]["value"], 2.0);
        assert_eq!(frame[0]["mode"], "MaxAccel");
        assert_eq!(take_debug_frame(), json!([]));
    }
}
