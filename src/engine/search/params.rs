//! Search tunables. Depths and extensions are in half plies.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchParams {
    pub null_move: bool,
    pub static_null_move: bool,
    pub iid: bool,
    pub lmr: bool,
    pub futility: bool,
    pub razoring: bool,

    pub futility_margin_qs: i32,
    pub futility_margin: i32,
    pub futility_margin_aggressive: i32,
    pub razoring_margin: i32,
    pub iid_margin: i32,
    pub singular_margin: i32,

    pub extension_check: i32,
    pub extension_mate_threat: i32,
    pub extension_pawn_push: i32,
    pub extension_passed_pawn: i32,
    pub extension_recapture: i32,
    /// Zero disables singular extensions
    pub extension_singular: i32,

    pub aspiration_windows: Vec<i32>,
    /// Draw score offset; draws are scored as slightly bad for the root side
    pub contempt: i32,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            null_move: true,
            static_null_move: true,
            iid: true,
            lmr: true,
            futility: true,
            razoring: true,

            futility_margin_qs: 80,
            futility_margin: 100,
            futility_margin_aggressive: 150,
            razoring_margin: 325,
            iid_margin: 300,
            singular_margin: 50,

            extension_check: 2,
            extension_mate_threat: 2,
            extension_pawn_push: 0,
            extension_passed_pawn: 0,
            extension_recapture: 0,
            extension_singular: 2,

            aspiration_windows: vec![10, 25, 150, 400, 550, 1025],
            contempt: 90,
        }
    }
}

impl SearchParams {
    pub fn singular_extension(&self) -> bool {
        self.extension_singular > 0
    }

    pub fn set_singular_extension(&mut self, enabled: bool) {
        self.extension_singular = if enabled { 2 } else { 0 };
    }
}
