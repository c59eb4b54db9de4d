use std::fmt;

/// Restore phases in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    DisableTriggers,
    InstallDefaults,
    Truncate,
    EnableLoadTriggers,
    Load,
    ResetSequences,
    RestoreDefaults,
    EnableTriggers,
    Commit,
}

impl Phase {
    /// Phases that carry statements, in order. `Commit` closes the transaction.
    pub const STATEMENT_PHASES: [Phase; 8] = [
        Phase::DisableTriggers,
        Phase::InstallDefaults,
        Phase::Truncate,
        Phase::EnableLoadTriggers,
        Phase::Load,
        Phase::ResetSequences,
        Phase::RestoreDefaults,
        Phase::EnableTriggers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::DisableTriggers => "disable_triggers",
            Phase::InstallDefaults => "install_defaults",
            Phase::Truncate => "truncate",
            Phase::EnableLoadTriggers => "enable_load_triggers",
            Phase::Load => "load",
            Phase::ResetSequences => "reset_sequences",
            Phase::RestoreDefaults => "restore_defaults",
            Phase::EnableTriggers => "enable_triggers",
            Phase::Commit => "commit",
        }
    }

    pub(crate) fn description(self) -> &'static str {
        match self {
            Phase::DisableTriggers => "Disable all triggers on every table.",
            Phase::InstallDefaults => "Install temporary defaults for excluded NOT NULL columns.",
            Phase::Truncate => "Truncate every table and restart owned sequences.",
            Phase::EnableLoadTriggers => {
                "Re-enable the triggers that maintain derived columns during load."
            }
            Phase::Load => "Load the flat files.",
            Phase::ResetSequences => "Move owned sequences past the loaded keys.",
            Phase::RestoreDefaults => "Remove the temporary defaults.",
            Phase::EnableTriggers => "Re-enable the remaining triggers.",
            Phase::Commit => "Commit.",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
