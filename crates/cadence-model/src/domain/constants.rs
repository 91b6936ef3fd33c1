//! Annotation keys and values shared with the per-machine reboot agent.
//!
//! These strings are the wire contract with the agent and must match byte-for-byte.
//! Write ownership is split: the operator owns [`ANNOTATION_OK_TO_REBOOT`],
//! the agent (or an operator acting by hand) owns the other three keys.

/// Set by the operator to grant a machine permission to reboot.
pub const ANNOTATION_OK_TO_REBOOT: &str = "OkToReboot";

/// Set by the agent to `"true"` when it wants to reboot, `"false"` once it is back up.
pub const ANNOTATION_REBOOT_NEEDED: &str = "RebootNeeded";

/// Set by the agent while the reboot is being carried out.
pub const ANNOTATION_REBOOT_IN_PROGRESS: &str = "RebootInProgress";

/// Optional. When `"true"` the machine is not considered for rebooting.
pub const ANNOTATION_REBOOT_PAUSED: &str = "RebootPaused";

/// Literal annotation value for an enabled flag.
pub const TRUE: &str = "true";

/// Literal annotation value for a disabled flag.
pub const FALSE: &str = "false";
