//! Reducer for rule selection and birth/survival edits.

use crate::action::RuleAction;
use crate::state::session::SessionState;

pub fn reduce(action: &RuleAction, session: &mut SessionState) -> bool {
    match action {
        RuleAction::Select(id) => {
            if session.rules.selected() == *id {
                return false;
            }
            session.rules.select(*id);
            // Binary rules never see the three-state dying value.
            let mut grid = session.grid.clone();
            session.rules.normalize_grid(&mut grid);
            session.grid = grid;
            true
        }
        RuleAction::ToggleBirth(count) => {
            session.rules.toggle_birth(*count);
            true
        }
        RuleAction::ToggleSurvival(count) => {
            session.rules.toggle_survival(*count);
            true
        }
    }
}
