//! IEEE 1149.1 TAP controller automaton
//!
//! Both the hardware driver and the emulator track the TAP position with
//! this type, so the routes they take between states are identical.

use core::fmt;

/// The sixteen TAP controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TapState {
    /// Test-Logic-Reset
    TestLogicReset = 0,
    /// Run-Test/Idle
    RunTestIdle = 1,
    /// Select-DR-Scan
    SelectDrScan = 2,
    /// Capture-DR
    CaptureDr = 3,
    /// Shift-DR
    ShiftDr = 4,
    /// Exit1-DR
    Exit1Dr = 5,
    /// Pause-DR
    PauseDr = 6,
    /// Exit2-DR
    Exit2Dr = 7,
    /// Update-DR
    UpdateDr = 8,
    /// Select-IR-Scan
    SelectIrScan = 9,
    /// Capture-IR
    CaptureIr = 10,
    /// Shift-IR
    ShiftIr = 11,
    /// Exit1-IR
    Exit1Ir = 12,
    /// Pause-IR
    PauseIr = 13,
    /// Exit2-IR
    Exit2Ir = 14,
    /// Update-IR
    UpdateIr = 15,
}

const STATE_COUNT: usize = 16;

impl TapState {
    /// State reached after one TCK with the given TMS level
    pub fn next(self, tms: bool) -> TapState {
        use TapState::*;
        match (self, tms) {
            (TestLogicReset, false) => RunTestIdle,
            (TestLogicReset, true) => TestLogicReset,
            (RunTestIdle, false) => RunTestIdle,
            (RunTestIdle, true) => SelectDrScan,
            (SelectDrScan, false) => CaptureDr,
            (SelectDrScan, true) => SelectIrScan,
            (CaptureDr, false) => ShiftDr,
            (CaptureDr, true) => Exit1Dr,
            (ShiftDr, false) => ShiftDr,
            (ShiftDr, true) => Exit1Dr,
            (Exit1Dr, false) => PauseDr,
            (Exit1Dr, true) => UpdateDr,
            (PauseDr, false) => PauseDr,
            (PauseDr, true) => Exit2Dr,
            (Exit2Dr, false) => ShiftDr,
            (Exit2Dr, true) => UpdateDr,
            (UpdateDr, false) => RunTestIdle,
            (UpdateDr, true) => SelectDrScan,
            (SelectIrScan, false) => CaptureIr,
            (SelectIrScan, true) => TestLogicReset,
            (CaptureIr, false) => ShiftIr,
            (CaptureIr, true) => Exit1Ir,
            (ShiftIr, false) => ShiftIr,
            (ShiftIr, true) => Exit1Ir,
            (Exit1Ir, false) => PauseIr,
            (Exit1Ir, true) => UpdateIr,
            (PauseIr, false) => PauseIr,
            (PauseIr, true) => Exit2Ir,
            (Exit2Ir, false) => ShiftIr,
            (Exit2Ir, true) => UpdateIr,
            (UpdateIr, false) => RunTestIdle,
            (UpdateIr, true) => SelectDrScan,
        }
    }

    /// Whether this is Shift-DR or Shift-IR
    pub fn is_shift(self) -> bool {
        matches!(self, TapState::ShiftDr | TapState::ShiftIr)
    }

    /// Whether this state belongs to the data register column
    pub fn is_dr(self) -> bool {
        (self as usize) >= TapState::SelectDrScan as usize
            && (self as usize) <= TapState::UpdateDr as usize
    }

    /// Shortest TMS sequence leading from `self` to `target`
    ///
    /// Test-Logic-Reset is always reached with five TMS=1 clocks, which
    /// works from any state, including an unknown one.
    pub fn path_to(self, target: TapState) -> TmsPath {
        if target == TapState::TestLogicReset {
            return TmsPath::RESET;
        }
        if self == target {
            return TmsPath::default();
        }

        // Breadth-first search over the 16-node graph, TMS=0 edges first
        let mut prev: [Option<(TapState, bool)>; STATE_COUNT] = [None; STATE_COUNT];
        let mut seen = [false; STATE_COUNT];
        let mut queue = [TapState::TestLogicReset; STATE_COUNT];
        let (mut head, mut tail) = (0, 0);

        queue[tail] = self;
        tail += 1;
        seen[self as usize] = true;

        while head < tail {
            let state = queue[head];
            head += 1;
            if state == target {
                break;
            }
            for tms in [false, true] {
                let next = state.next(tms);
                if !seen[next as usize] {
                    seen[next as usize] = true;
                    prev[next as usize] = Some((state, tms));
                    queue[tail] = next;
                    tail += 1;
                }
            }
        }

        let mut reversed = [false; STATE_COUNT];
        let mut len = 0;
        let mut cursor = target;
        while let Some((from, tms)) = prev[cursor as usize] {
            reversed[len] = tms;
            len += 1;
            cursor = from;
        }

        let mut path = TmsPath::default();
        for &tms in reversed[..len].iter().rev() {
            path.push(tms);
        }
        path
    }

    /// Name as used in the IEEE 1149.1 state diagram
    pub fn name(self) -> &'static str {
        match self {
            TapState::TestLogicReset => "Test-Logic-Reset",
            TapState::RunTestIdle => "Run-Test/Idle",
            TapState::SelectDrScan => "Select-DR-Scan",
            TapState::CaptureDr => "Capture-DR",
            TapState::ShiftDr => "Shift-DR",
            TapState::Exit1Dr => "Exit1-DR",
            TapState::PauseDr => "Pause-DR",
            TapState::Exit2Dr => "Exit2-DR",
            TapState::UpdateDr => "Update-DR",
            TapState::SelectIrScan => "Select-IR-Scan",
            TapState::CaptureIr => "Capture-IR",
            TapState::ShiftIr => "Shift-IR",
            TapState::Exit1Ir => "Exit1-IR",
            TapState::PauseIr => "Pause-IR",
            TapState::Exit2Ir => "Exit2-IR",
            TapState::UpdateIr => "Update-IR",
        }
    }
}

impl fmt::Display for TapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A short TMS sequence; bit 0 is clocked first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TmsPath {
    bits: u16,
    len: u8,
}

impl TmsPath {
    /// Five TMS=1 clocks, reaching Test-Logic-Reset from anywhere
    pub const RESET: TmsPath = TmsPath {
        bits: 0b1_1111,
        len: 5,
    };

    fn push(&mut self, tms: bool) {
        if tms {
            self.bits |= 1 << self.len;
        }
        self.len += 1;
    }

    /// Number of clocks in the sequence
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether no clocks are needed
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// TMS levels packed LSB first
    pub fn bits(&self) -> u16 {
        self.bits
    }

    /// TMS levels in clock order
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.bits & (1 << i) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    const ALL: [TapState; 16] = [
        TapState::TestLogicReset,
        TapState::RunTestIdle,
        TapState::SelectDrScan,
        TapState::CaptureDr,
        TapState::ShiftDr,
        TapState::Exit1Dr,
        TapState::PauseDr,
        TapState::Exit2Dr,
        TapState::UpdateDr,
        TapState::SelectIrScan,
        TapState::CaptureIr,
        TapState::ShiftIr,
        TapState::Exit1Ir,
        TapState::PauseIr,
        TapState::Exit2Ir,
        TapState::UpdateIr,
    ];

    fn walk(from: TapState, path: TmsPath) -> TapState {
        path.iter().fold(from, |state, tms| state.next(tms))
    }

    #[test]
    fn test_every_path_arrives() {
        for &from in &ALL {
            for &to in &ALL {
                let path = from.path_to(to);
                assert_eq!(walk(from, path), to, "{} -> {}", from, to);
                assert!(path.len() <= 8);
            }
        }
    }

    #[test]
    fn test_common_routes() {
        let bits: Vec<bool> = TapState::RunTestIdle
            .path_to(TapState::ShiftDr)
            .iter()
            .collect();
        assert_eq!(bits, [true, false, false]);

        let bits: Vec<bool> = TapState::RunTestIdle
            .path_to(TapState::ShiftIr)
            .iter()
            .collect();
        assert_eq!(bits, [true, true, false, false]);

        let bits: Vec<bool> = TapState::PauseDr
            .path_to(TapState::ShiftDr)
            .iter()
            .collect();
        assert_eq!(bits, [true, false]);

        assert!(TapState::ShiftDr.path_to(TapState::ShiftDr).is_empty());
    }

    #[test]
    fn test_reset_from_anywhere() {
        for &from in &ALL {
            let path = from.path_to(TapState::TestLogicReset);
            assert_eq!(path, TmsPath::RESET);
            assert_eq!(walk(from, path), TapState::TestLogicReset);
        }
    }

    #[test]
    fn test_dr_column() {
        assert!(TapState::CaptureDr.is_dr());
        assert!(TapState::UpdateDr.is_dr());
        assert!(!TapState::ShiftIr.is_dr());
        assert!(!TapState::RunTestIdle.is_dr());
    }
}
