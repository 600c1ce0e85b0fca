//! Console status reporter.
//!
//! Prints a header on entering RUNNING, a banner on entering PAUSED and one
//! carriage-return-refreshed row per period while running.

use std::io::{self, Write};

use balance_common::control_unit::state::RunState;

use crate::state::shared::StatusSnapshot;

const HEADER: &str = "   θ    |  θ_ref  |    φ    |  φ_ref  |    γ    |  D1_u   |  D3_u   |  vBatt  | control";

/// Row formatter with state-change detection.
#[derive(Debug, Default)]
pub struct StatusPrinter {
    last_state: Option<RunState>,
}

impl StatusPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Format one row without any terminal control characters.
    pub fn format_row(snap: &StatusSnapshot) -> String {
        format!(
            "{:7.3} | {:7.3} | {:7.3} | {:7.3} | {:7.3} | {:7.3} | {:7.3} | {:7.3} | {}",
            snap.tilt,
            snap.tilt_ref,
            snap.progression,
            snap.progression_ref,
            snap.heading,
            snap.d1_output,
            snap.d3_output,
            snap.v_batt,
            snap.control.label(),
        )
    }

    /// Write whatever this snapshot calls for.
    pub fn render(&mut self, out: &mut impl Write, snap: &StatusSnapshot) -> io::Result<()> {
        let entered = self.last_state != Some(snap.run_state);
        self.last_state = Some(snap.run_state);

        match snap.run_state {
            RunState::Running => {
                if entered {
                    writeln!(out)?;
                    writeln!(out, "{HEADER}")?;
                }
                write!(out, "\r{}   ", Self::format_row(snap))?;
            }
            RunState::Paused if entered => {
                writeln!(out)?;
                writeln!(out, "PAUSED: press the button to resume, hold it to exit")?;
            }
            _ => {}
        }
        out.flush()
    }
}
