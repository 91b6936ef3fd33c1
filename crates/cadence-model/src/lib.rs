mod domain;
pub use domain::{
    ANNOTATION_OK_TO_REBOOT, ANNOTATION_REBOOT_IN_PROGRESS, ANNOTATION_REBOOT_NEEDED,
    ANNOTATION_REBOOT_PAUSED, FALSE, TRUE,
};
pub use domain::{AnnotationValue, Annotations, Machine, MachineChange, RebootState, Version};

mod error;
pub use error::ModelError;

mod event;
pub use event::{Event, Severity};
