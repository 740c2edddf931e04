//! Reducer for start/stop/step/reset.

use crate::action::TransportAction;
use crate::state::session::{EnginePhase, SessionState};

pub fn reduce(action: &TransportAction, session: &mut SessionState) -> bool {
    match action {
        TransportAction::Start => {
            if session.phase != EnginePhase::Idle {
                return false;
            }
            session.phase = EnginePhase::Running;
            true
        }
        TransportAction::Stop => {
            if session.phase != EnginePhase::Running {
                return false;
            }
            session.phase = EnginePhase::Idle;
            true
        }
        TransportAction::Step => {
            if session.phase == EnginePhase::Transitioning {
                return false;
            }
            session.advance();
            true
        }
        TransportAction::Reset => {
            if session.phase == EnginePhase::Transitioning {
                return false;
            }
            session.reseed_grid();
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_stop_toggle_idle_and_running() {
        let mut session = SessionState::new(1);
        assert!(reduce(&TransportAction::Start, &mut session));
        assert_eq!(session.phase, EnginePhase::Running);
        assert!(!reduce(&TransportAction::Start, &mut session));
        assert!(reduce(&TransportAction::Stop, &mut session));
        assert_eq!(session.phase, EnginePhase::Idle);
        assert!(!reduce(&TransportAction::Stop, &mut session));
    }

    #[test]
    fn step_works_while_idle() {
        let mut session = SessionState::new(1);
        assert!(reduce(&TransportAction::Step, &mut session));
        assert_eq!(session.generation, 1);
        assert_eq!(session.phase, EnginePhase::Idle);
    }

    #[test]
    fn step_is_a_no_op_while_transitioning() {
        let mut session = SessionState::new(1);
        session.phase = EnginePhase::Transitioning;
        assert!(!reduce(&TransportAction::Step, &mut session));
        assert_eq!(session.generation, 0);
    }

    #[test]
    fn reset_reseeds_and_zeroes_generation() {
        let mut session = SessionState::new(1);
        reduce(&TransportAction::Step, &mut session);
        assert!(reduce(&TransportAction::Reset, &mut session));
        assert_eq!(session.generation, 0);
    }
}
