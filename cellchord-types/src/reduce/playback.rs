//! Reducer for arpeggiation mode and generation period.

use crate::action::PlaybackAction;
use crate::state::session::{SessionState, MAX_GENERATION_MS, MIN_GENERATION_MS};

pub fn reduce(action: &PlaybackAction, session: &mut SessionState) -> bool {
    match action {
        PlaybackAction::SetArpMode(mode) => {
            if session.arp_mode == *mode {
                return false;
            }
            session.arp_mode = *mode;
            true
        }
        PlaybackAction::CycleArpMode => {
            session.arp_mode = session.arp_mode.cycle();
            true
        }
        PlaybackAction::SetGenerationMs(ms) => {
            let ms = (*ms).clamp(MIN_GENERATION_MS, MAX_GENERATION_MS);
            if ms == session.generation_ms {
                return false;
            }
            session.generation_ms = ms;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::ArpMode;

    #[test]
    fn generation_period_clamps() {
        let mut session = SessionState::new(1);
        reduce(&PlaybackAction::SetGenerationMs(10), &mut session);
        assert_eq!(session.generation_ms, MIN_GENERATION_MS);
        reduce(&PlaybackAction::SetGenerationMs(100_000), &mut session);
        assert_eq!(session.generation_ms, MAX_GENERATION_MS);
    }

    #[test]
    fn arp_mode_set_and_cycle() {
        let mut session = SessionState::new(1);
        assert!(reduce(&PlaybackAction::SetArpMode(ArpMode::Up), &mut session));
        assert!(!reduce(&PlaybackAction::SetArpMode(ArpMode::Up), &mut session));
        assert!(reduce(&PlaybackAction::CycleArpMode, &mut session));
        assert_eq!(session.arp_mode, ArpMode::Down);
    }
}
