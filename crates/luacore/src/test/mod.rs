// Test module organization
pub mod test_gc;

use crate::{GlobalState, SafeOption, TableId};

/// State with a fixed string seed so failures reproduce
pub(crate) fn new_state() -> GlobalState {
    GlobalState::new(SafeOption {
        string_seed: Some(0x2545_f491),
        ..SafeOption::default()
    })
    .unwrap()
}

pub(crate) fn new_table(state: &mut GlobalState) -> TableId {
    state.create_table(0, 0).unwrap().hvalue()
}
