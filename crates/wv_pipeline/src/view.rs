//! Selection state of the wave view as a pure state machine.
//!
//! The view owns an index into the sorted year list, an index into the sorted
//! class list, and an autoplay flag. Every input is an `Action`; `update` maps
//! (state, action) → state and never touches anything else, so a host UI only
//! has to redraw when the returned selection differs from the previous one.

use wv_core::{BucketKey, ClassNum, Params, Year};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    pub year_index: usize,
    pub class_index: usize,
    pub paused: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Jump to a year; ignored when the year is not present.
    SelectYear(Year),
    /// Jump to a class; ignored when the class is not present.
    SelectClass(ClassNum),
    TogglePause,
    /// Autoplay step: next year, wrapping to the first. No-op while paused.
    Tick,
}

impl ViewState {
    /// First year, first class; autoplay as configured.
    pub fn initial(params: &Params) -> Self {
        Self { year_index: 0, class_index: 0, paused: !params.autoplay }
    }

    /// The bucket currently selected, if both axes are non-empty.
    pub fn selection(&self, years: &[Year], classes: &[ClassNum]) -> Option<BucketKey> {
        let year = years.get(self.year_index)?;
        let class_num = classes.get(self.class_index)?;
        Some(BucketKey::new(*year, *class_num))
    }
}

pub fn update(state: ViewState, action: Action, years: &[Year], classes: &[ClassNum]) -> ViewState {
    match action {
        Action::SelectYear(y) => match years.iter().position(|v| *v == y) {
            Some(i) => ViewState { year_index: i, ..state },
            None => state,
        },
        Action::SelectClass(c) => match classes.iter().position(|v| *v == c) {
            Some(i) => ViewState { class_index: i, ..state },
            None => state,
        },
        Action::TogglePause => ViewState { paused: !state.paused, ..state },
        Action::Tick if state.paused || years.is_empty() => state,
        Action::Tick => ViewState { year_index: (state.year_index + 1) % years.len(), ..state },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YEARS: [Year; 3] = [2019, 2020, 2021];
    const CLASSES: [ClassNum; 2] = [1, 4];

    fn start() -> ViewState {
        ViewState::initial(&Params::default())
    }

    #[test]
    fn initial_selects_first_year_and_class() {
        let s = start();
        assert!(!s.paused);
        assert_eq!(s.selection(&YEARS, &CLASSES), Some(BucketKey::new(2019, 1)));

        let paused = ViewState::initial(&Params { autoplay: false, ..Params::default() });
        assert!(paused.paused);
        assert_eq!(paused.selection(&[], &CLASSES), None);
    }

    #[test]
    fn tick_wraps_and_respects_pause() {
        let mut s = start();
        for expected in [2020, 2021, 2019] {
            s = update(s, Action::Tick, &YEARS, &CLASSES);
            assert_eq!(s.selection(&YEARS, &CLASSES).unwrap().year, expected);
        }

        let p = update(s, Action::TogglePause, &YEARS, &CLASSES);
        assert_eq!(update(p, Action::Tick, &YEARS, &CLASSES), p);
        assert!(!update(p, Action::TogglePause, &YEARS, &CLASSES).paused);
    }

    #[test]
    fn select_unknown_value_is_a_no_op() {
        let s = update(start(), Action::SelectClass(4), &YEARS, &CLASSES);
        assert_eq!(s.selection(&YEARS, &CLASSES), Some(BucketKey::new(2019, 4)));
        assert_eq!(update(s, Action::SelectYear(1990), &YEARS, &CLASSES), s);
        assert_eq!(update(s, Action::SelectClass(7), &YEARS, &CLASSES), s);

        let s = update(s, Action::SelectYear(2021), &YEARS, &CLASSES);
        assert_eq!(s.year_index, 2);
    }

    #[test]
    fn tick_on_empty_axis_stays_put() {
        assert_eq!(update(start(), Action::Tick, &[], &[]), start());
    }
}
