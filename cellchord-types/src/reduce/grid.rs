//! Reducer for structural grid changes.
//!
//! Dimension and size changes rebuild the grid immediately and leave the
//! session in the Transitioning phase. The conductor is responsible for
//! silencing audio and clearing the phase after its settle delay.

use crate::action::GridAction;
use crate::state::session::{EnginePhase, SessionState};

pub fn reduce(action: &GridAction, session: &mut SessionState) -> bool {
    match action {
        GridAction::SetDimension(dimension) => {
            if *dimension == session.dimension() {
                return false;
            }
            let size = SessionState::clamp_grid_size(*dimension, session.grid_size());
            session.phase = EnginePhase::Transitioning;
            session.rebuild_grid(*dimension, size);
            true
        }
        GridAction::SetSize(size) => {
            let size = SessionState::clamp_grid_size(session.dimension(), *size);
            if size == session.grid_size() {
                return false;
            }
            session.phase = EnginePhase::Transitioning;
            session.rebuild_grid(session.dimension(), size);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::grid::Dimension;

    #[test]
    fn dimension_change_enters_transitioning() {
        let mut session = SessionState::new(1);
        session.phase = EnginePhase::Running;
        assert!(reduce(&GridAction::SetDimension(Dimension::Three), &mut session));
        assert_eq!(session.phase, EnginePhase::Transitioning);
        assert_eq!(session.dimension(), Dimension::Three);
        assert_eq!(session.generation, 0);
    }

    #[test]
    fn same_dimension_is_a_no_op() {
        let mut session = SessionState::new(1);
        assert!(!reduce(&GridAction::SetDimension(Dimension::Two), &mut session));
        assert_eq!(session.phase, EnginePhase::Idle);
    }

    #[test]
    fn size_is_clamped_before_comparison() {
        let mut session = SessionState::new(1);
        // Default size is 8; requesting 3 clamps to the minimum of 4.
        assert!(reduce(&GridAction::SetSize(3), &mut session));
        assert_eq!(session.grid_size(), 4);
        assert_eq!(session.phase, EnginePhase::Transitioning);
    }

    #[test]
    fn four_d_caps_the_size() {
        let mut session = SessionState::new(1);
        reduce(&GridAction::SetSize(16), &mut session);
        session.phase = EnginePhase::Idle;
        reduce(&GridAction::SetDimension(Dimension::Four), &mut session);
        assert_eq!(session.grid_size(), 8);
    }
}
