//! Pure predicates over one machine's reboot annotations.
//!
//! Selectors never consult other machines and hold no state.
use cadence_model::{Machine, RebootState};

/// Fixed annotation selectors used by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// The agent finished a granted reboot and waits for the grant to be withdrawn:
    /// `OkToReboot == "true" && RebootNeeded == "false" && RebootInProgress == "false"`.
    JustRebooted,
    /// The agent asks for permission and is not paused:
    /// `RebootNeeded == "true" && RebootPaused != "true"`.
    WantsReboot,
}

impl Selector {
    /// Evaluate the selector against a snapshot.
    pub fn matches(&self, state: &RebootState) -> bool {
        match self {
            Selector::JustRebooted => just_rebooted(state),
            Selector::WantsReboot => wants_reboot(state),
        }
    }

    /// Returns the machines matching the selector, preserving listing order.
    pub fn filter<'a>(self, machines: &'a [Machine]) -> impl Iterator<Item = &'a Machine> + 'a {
        machines
            .iter()
            .filter(move |m| self.matches(&m.reboot_state()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Selector::JustRebooted => "just-rebooted",
            Selector::WantsReboot => "wants-reboot",
        }
    }
}

/// All three completion conditions hold on the same snapshot.
///
/// A missing key never equals `"true"` or `"false"`, so it fails the match.
pub fn just_rebooted(s: &RebootState) -> bool {
    s.ok_to_reboot.is_true() && s.reboot_needed.is_false() && s.reboot_in_progress.is_false()
}

/// A missing `RebootPaused` counts as not paused.
pub fn wants_reboot(s: &RebootState) -> bool {
    s.reboot_needed.is_true() && !s.reboot_paused.is_true()
}

/// Completion condition watched for after a grant. Same conjunction as [`just_rebooted`].
pub fn reboot_completed(s: &RebootState) -> bool {
    just_rebooted(s)
}
