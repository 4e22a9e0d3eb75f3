//! Shift inference from local wall-clock time.

use chrono::{NaiveTime, Timelike};
use med_types::Shift;

/// [07:00, 15:00) is MORNING, [15:00, 23:00) is EVENING, everything else is NIGHT.
pub fn derive_shift(time: NaiveTime) -> Shift {
    match time.hour() {
        7..=14 => Shift::Morning,
        15..=22 => Shift::Evening,
        _ => Shift::Night,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> Shift {
        derive_shift(NaiveTime::from_hms_opt(h, m, 0).unwrap())
    }

    #[test]
    fn boundaries_are_start_inclusive() {
        assert_eq!(at(6, 59), Shift::Night);
        assert_eq!(at(7, 0), Shift::Morning);
        assert_eq!(at(14, 59), Shift::Morning);
        assert_eq!(at(15, 0), Shift::Evening);
        assert_eq!(at(22, 59), Shift::Evening);
        assert_eq!(at(23, 0), Shift::Night);
    }

    #[test]
    fn night_wraps_midnight() {
        assert_eq!(at(0, 0), Shift::Night);
        assert_eq!(at(3, 30), Shift::Night);
        assert_eq!(
            derive_shift(NaiveTime::from_hms_opt(14, 59, 59).unwrap()),
            Shift::Morning
        );
    }
}
