/// Typed reading of one annotation value.
///
/// Only the exact strings `"true"` and `"false"` map to [`AnnotationValue::True`] and
/// [`AnnotationValue::False`]. There is no boolean coercion: `"True"`, `"1"` or `""`
/// all read as [`AnnotationValue::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationValue {
    /// The key is not present.
    Absent,
    /// The value is exactly `"true"`.
    True,
    /// The value is exactly `"false"`.
    False,
    /// Any other present value.
    Other,
}

impl AnnotationValue {
    /// Classify a raw (possibly missing) value.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            None => Self::Absent,
            Some(crate::TRUE) => Self::True,
            Some(crate::FALSE) => Self::False,
            Some(_) => Self::Other,
        }
    }

    /// `true` only for the literal `"true"`.
    pub const fn is_true(&self) -> bool {
        matches!(self, Self::True)
    }

    /// `true` only for the literal `"false"`.
    pub const fn is_false(&self) -> bool {
        matches!(self, Self::False)
    }
}

#[cfg(test)]
mod tests {
    use super::AnnotationValue;

    #[test]
    fn only_exact_literals_are_recognised() {
        assert_eq!(AnnotationValue::from_raw(Some("true")), AnnotationValue::True);
        assert_eq!(AnnotationValue::from_raw(Some("false")), AnnotationValue::False);
        assert_eq!(AnnotationValue::from_raw(None), AnnotationValue::Absent);

        for raw in ["True", "TRUE", "1", "yes", "", " true"] {
            assert_eq!(
                AnnotationValue::from_raw(Some(raw)),
                AnnotationValue::Other,
                "{raw:?} must not be coerced"
            );
        }
    }

    #[test]
    fn absent_is_neither_true_nor_false() {
        let v = AnnotationValue::Absent;
        assert!(!v.is_true());
        assert!(!v.is_false());
    }
}
