/// A record field that may be missing or fail to coerce.
///
/// `Invalid` keeps the raw text so callers can report it; every consumer treats
/// it exactly like `Absent` when computing derived values.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldValue<T> {
    Valid(T),
    Invalid(String),
    #[default]
    Absent,
}

impl<T> FieldValue<T> {
    pub fn valid(&self) -> Option<&T> {
        match self {
            FieldValue::Valid(value) => Some(value),
            FieldValue::Invalid(_) | FieldValue::Absent => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, FieldValue::Valid(_))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, FieldValue::Invalid(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FieldValue<U> {
        match self {
            FieldValue::Valid(value) => FieldValue::Valid(f(value)),
            FieldValue::Invalid(raw) => FieldValue::Invalid(raw),
            FieldValue::Absent => FieldValue::Absent,
        }
    }
}

impl<T: Copy> FieldValue<T> {
    pub fn get(&self) -> Option<T> {
        self.valid().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::FieldValue;

    #[test]
    fn invalid_and_absent_expose_no_value() {
        let invalid: FieldValue<i64> = FieldValue::Invalid("garbage".into());
        let absent: FieldValue<i64> = FieldValue::Absent;
        assert_eq!(invalid.get(), None);
        assert_eq!(absent.get(), None);
        assert!(invalid.is_invalid());
        assert!(!absent.is_invalid());
        assert_eq!(FieldValue::Valid(3).map(|v| v * 2), FieldValue::Valid(6));
        assert_eq!(invalid.map(|v| v * 2), FieldValue::Invalid("garbage".into()));
    }
}
