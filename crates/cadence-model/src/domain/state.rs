use crate::domain::{AnnotationValue, Annotations};
use crate::{
    ANNOTATION_OK_TO_REBOOT, ANNOTATION_REBOOT_IN_PROGRESS, ANNOTATION_REBOOT_NEEDED,
    ANNOTATION_REBOOT_PAUSED,
};

/// Structured view of the four reboot coordination annotations on one snapshot.
///
/// Selectors are written against this type instead of raw string keys,
/// so a misspelled key is a compile error rather than a silent non-match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebootState {
    pub ok_to_reboot: AnnotationValue,
    pub reboot_needed: AnnotationValue,
    pub reboot_in_progress: AnnotationValue,
    pub reboot_paused: AnnotationValue,
}

impl RebootState {
    /// Read the four keys out of an annotation set.
    pub fn from_annotations(a: &Annotations) -> Self {
        Self {
            ok_to_reboot: a.value(ANNOTATION_OK_TO_REBOOT),
            reboot_needed: a.value(ANNOTATION_REBOOT_NEEDED),
            reboot_in_progress: a.value(ANNOTATION_REBOOT_IN_PROGRESS),
            reboot_paused: a.value(ANNOTATION_REBOOT_PAUSED),
        }
    }
}

impl From<&Annotations> for RebootState {
    fn from(a: &Annotations) -> Self {
        Self::from_annotations(a)
    }
}
