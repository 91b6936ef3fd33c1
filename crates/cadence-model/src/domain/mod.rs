mod annotations;
pub use annotations::Annotations;

mod value;
pub use value::AnnotationValue;

mod state;
pub use state::RebootState;

mod machine;
pub use machine::{Machine, MachineChange};

mod constants;
pub use constants::{
    ANNOTATION_OK_TO_REBOOT, ANNOTATION_REBOOT_IN_PROGRESS, ANNOTATION_REBOOT_NEEDED,
    ANNOTATION_REBOOT_PAUSED, FALSE, TRUE,
};

/// Opaque version token of a machine snapshot.
///
/// Used to qualify writes and as the starting point of a change subscription.
/// Tokens are compared only for equality; their ordering is owned by the store.
pub type Version = String;
