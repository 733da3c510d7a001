use std::path::PathBuf;

use url::Url;

use super::{SettingValue, TypeHandle, ValueKind};

/// A Rust type that a setting can be bound to.
///
/// `from_value` hands the value back when its variant does not fit the
/// field, which happens when a converter registered for a supertype produced
/// it.
pub trait SettingType: Sized {
    fn kind() -> ValueKind;

    fn from_value(value: SettingValue) -> Result<Self, SettingValue>;

    /// The current value, or `None` if the field holds nothing.
    fn to_value(&self) -> Option<SettingValue>;
}

macro_rules! setting_type {
    ($ty:ty, $variant:ident) => {
        impl SettingType for $ty {
            fn kind() -> ValueKind {
                ValueKind::$variant
            }

            fn from_value(value: SettingValue) -> Result<Self, SettingValue> {
                match value {
                    SettingValue::$variant(v) => Ok(v),
                    other => Err(other),
                }
            }

            fn to_value(&self) -> Option<SettingValue> {
                Some(SettingValue::$variant(self.clone()))
            }
        }
    };
}

setting_type!(i32, I32);
setting_type!(i64, I64);
setting_type!(f32, F32);
setting_type!(f64, F64);
setting_type!(bool, Bool);
setting_type!(String, Text);
setting_type!(Vec<String>, TextList);
setting_type!(TypeHandle, TypeName);
setting_type!(PathBuf, Path);
setting_type!(Url, Uri);

impl<T: SettingType> SettingType for Option<T> {
    fn kind() -> ValueKind {
        T::kind()
    }

    fn from_value(value: SettingValue) -> Result<Self, SettingValue> {
        T::from_value(value).map(Some)
    }

    fn to_value(&self) -> Option<SettingValue> {
        self.as_ref().and_then(T::to_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_uses_inner_kind() {
        assert_eq!(<Option<i32>>::kind(), ValueKind::I32);
        assert!(<Option<i32>>::to_value(&None).is_none());
        assert!(matches!(Some(5i32).to_value(), Some(SettingValue::I32(5))));
    }

    #[test]
    fn test_wrong_variant_is_handed_back() {
        let rejected = i32::from_value(SettingValue::Text("43".into())).unwrap_err();
        assert_eq!(rejected.kind(), ValueKind::Text);
    }
}
