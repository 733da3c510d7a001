use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::trace;
use url::Url;

use super::{ConvertError, SettingValue, TypeHandle, ValueKind};

type ToText = dyn Fn(&SettingValue) -> Option<String> + Send + Sync;
type ToValue = dyn Fn(&str) -> Result<SettingValue, String> + Send + Sync;

/// A pair of conversions between the text form of a setting and its value.
///
/// `to_text` returns `None` when handed a value of a variant it does not
/// understand; `to_value` returns a human-readable reason on failure.
#[derive(Clone)]
pub struct Converter {
    to_text: Arc<ToText>,
    to_value: Arc<ToValue>,
}

impl Converter {
    pub fn new<F, P>(to_text: F, to_value: P) -> Self
    where
        F: Fn(&SettingValue) -> Option<String> + Send + Sync + 'static,
        P: Fn(&str) -> Result<SettingValue, String> + Send + Sync + 'static,
    {
        Self {
            to_text: Arc::new(to_text),
            to_value: Arc::new(to_value),
        }
    }

    pub fn to_text(&self, value: &SettingValue) -> Option<String> {
        (self.to_text)(value)
    }

    pub fn to_value(&self, raw: &str) -> Result<SettingValue, String> {
        (self.to_value)(raw)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter").finish_non_exhaustive()
    }
}

/// Converters keyed by [`ValueKind`], with explicit supertype relations.
///
/// Lookup prefers the exact kind. Otherwise the registered supertypes of the
/// kind are collected and the most specific one is used; two unrelated
/// candidates make the lookup ambiguous.
///
/// A registry is a plain value. Cloning it and registering on the clone never
/// affects the original.
#[derive(Clone)]
pub struct Registry {
    converters: BTreeMap<ValueKind, Converter>,
    supertypes: BTreeMap<ValueKind, BTreeSet<ValueKind>>,
    types: BTreeMap<String, TypeHandle>,
}

macro_rules! parsed {
    ($variant:ident, $ty:ty) => {
        Converter::new(
            |value| match value {
                SettingValue::$variant(v) => Some(v.to_string()),
                _ => None,
            },
            |raw| {
                raw.parse::<$ty>()
                    .map(SettingValue::$variant)
                    .map_err(|e| e.to_string())
            },
        )
    };
}

impl Registry {
    /// Creates a registry with the built-in converters installed.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(ValueKind::I32, parsed!(I32, i32));
        registry.register(ValueKind::I64, parsed!(I64, i64));
        registry.register(ValueKind::F32, parsed!(F32, f32));
        registry.register(ValueKind::F64, parsed!(F64, f64));
        registry.register(ValueKind::Bool, bool_converter());
        registry.register(ValueKind::Text, text_converter());
        registry.register(ValueKind::TextList, text_list_converter());
        registry.register(ValueKind::Path, path_converter());
        registry.register(ValueKind::Uri, uri_converter());

        registry.register_type::<bool>();
        registry.register_type::<i32>();
        registry.register_type::<i64>();
        registry.register_type::<f32>();
        registry.register_type::<f64>();
        registry.register_type::<String>();
        registry.register_type::<Vec<String>>();
        registry.register_type::<PathBuf>();
        registry.register_type::<Url>();
        registry
    }

    /// Creates a registry without any converters.
    pub fn empty() -> Self {
        Self {
            converters: BTreeMap::new(),
            supertypes: BTreeMap::new(),
            types: BTreeMap::new(),
        }
    }

    /// Registers `converter` for `kind`, returning the converter it replaces.
    pub fn register(&mut self, kind: ValueKind, converter: Converter) -> Option<Converter> {
        self.converters.insert(kind, converter)
    }

    /// Declares `sup` as a direct supertype of `sub`.
    pub fn declare_supertype(&mut self, sub: ValueKind, sup: ValueKind) -> Result<(), ConvertError> {
        if sub == sup || self.ancestors(sup).contains(&sub) {
            return Err(ConvertError::SupertypeCycle { sub, sup });
        }
        self.supertypes.entry(sub).or_default().insert(sup);
        Ok(())
    }

    /// Makes `T` nameable by its fully-qualified type name.
    pub fn register_type<T: Any + ?Sized>(&mut self) {
        self.register_type_as::<T>(std::any::type_name::<T>());
    }

    /// Makes `T` nameable by `name`.
    ///
    /// This re-installs the built-in type name converter over the updated
    /// catalog, replacing any custom converter registered for
    /// [`ValueKind::TypeName`].
    pub fn register_type_as<T: Any + ?Sized>(&mut self, name: impl Into<String>) {
        self.types.insert(name.into(), TypeHandle::of::<T>());
        let catalog = Arc::new(self.types.clone());
        self.register(ValueKind::TypeName, type_name_converter(catalog));
    }

    pub fn contains(&self, kind: ValueKind) -> bool {
        self.converters.contains_key(&kind)
    }

    /// Finds the converter for `kind`, falling back to its closest registered supertype.
    pub fn resolve(&self, kind: ValueKind) -> Result<&Converter, ConvertError> {
        if let Some(converter) = self.converters.get(&kind) {
            return Ok(converter);
        }

        let candidates: Vec<ValueKind> = self
            .ancestors(kind)
            .into_iter()
            .filter(|candidate| self.converters.contains_key(candidate))
            .collect();

        let closest: Vec<ValueKind> = candidates
            .iter()
            .copied()
            .filter(|candidate| {
                !candidates
                    .iter()
                    .any(|other| other != candidate && self.ancestors(*other).contains(candidate))
            })
            .collect();

        match closest.as_slice() {
            [] => Err(ConvertError::UnsupportedType(kind)),
            [only] => {
                trace!(%kind, supertype = %only, "resolved converter through supertype");
                self.converters
                    .get(only)
                    .ok_or(ConvertError::UnsupportedType(kind))
            }
            _ => Err(ConvertError::AmbiguousConverter {
                kind,
                candidates: closest,
            }),
        }
    }

    /// Converts the raw text of a setting into a value of `kind`.
    pub fn parse(&self, kind: ValueKind, raw: &str) -> Result<SettingValue, ConvertError> {
        self.resolve(kind)?
            .to_value(raw)
            .map_err(|reason| ConvertError::ConversionFailed {
                kind,
                input: raw.to_string(),
                reason,
            })
    }

    /// Renders a value of `kind` back into its text form.
    pub fn render(&self, kind: ValueKind, value: &SettingValue) -> Result<String, ConvertError> {
        self.resolve(kind)?
            .to_text(value)
            .ok_or(ConvertError::Unrenderable {
                kind,
                found: value.kind(),
            })
    }

    /// All transitive supertypes of `kind`, excluding `kind` itself.
    fn ancestors(&self, kind: ValueKind) -> BTreeSet<ValueKind> {
        let mut seen = BTreeSet::new();
        let mut pending = vec![kind];
        while let Some(current) = pending.pop() {
            if let Some(direct) = self.supertypes.get(&current) {
                for sup in direct {
                    if seen.insert(*sup) {
                        pending.push(*sup);
                    }
                }
            }
        }
        seen.remove(&kind);
        seen
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.converters.keys().collect::<Vec<_>>())
            .field("supertypes", &self.supertypes)
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn bool_converter() -> Converter {
    Converter::new(
        |value| match value {
            SettingValue::Bool(v) => Some(v.to_string()),
            _ => None,
        },
        |raw| {
            if raw.eq_ignore_ascii_case("true") {
                Ok(SettingValue::Bool(true))
            } else if raw.eq_ignore_ascii_case("false") {
                Ok(SettingValue::Bool(false))
            } else {
                Err("expected 'true' or 'false'".to_string())
            }
        },
    )
}

fn text_converter() -> Converter {
    Converter::new(
        |value| match value {
            SettingValue::Text(v) => Some(v.clone()),
            _ => None,
        },
        |raw| Ok(SettingValue::Text(raw.to_string())),
    )
}

// Not quote-aware: an element containing ',' does not survive a round trip.
fn text_list_converter() -> Converter {
    Converter::new(
        |value| match value {
            SettingValue::TextList(items) => Some(items.join(",")),
            _ => None,
        },
        |raw| Ok(SettingValue::TextList(raw.split(',').map(str::to_string).collect())),
    )
}

fn path_converter() -> Converter {
    Converter::new(
        |value| match value {
            SettingValue::Path(path) => Some(path.to_string_lossy().into_owned()),
            _ => None,
        },
        |raw| Ok(SettingValue::Path(PathBuf::from(raw))),
    )
}

fn uri_converter() -> Converter {
    Converter::new(
        |value| match value {
            SettingValue::Uri(url) => Some(url.as_str().to_string()),
            _ => None,
        },
        |raw| Url::parse(raw).map(SettingValue::Uri).map_err(|e| e.to_string()),
    )
}

fn type_name_converter(catalog: Arc<BTreeMap<String, TypeHandle>>) -> Converter {
    Converter::new(
        |value| match value {
            SettingValue::TypeName(handle) => Some(handle.name().to_string()),
            _ => None,
        },
        move |raw| {
            catalog
                .get(raw)
                .copied()
                .map(SettingValue::TypeName)
                .ok_or_else(|| "no such type is registered".to_string())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: ValueKind = ValueKind::Custom("hex");
    const SHORT_HEX: ValueKind = ValueKind::Custom("short-hex");

    #[test]
    fn test_builtin_numbers() {
        let registry = Registry::new();
        assert!(matches!(
            registry.parse(ValueKind::I32, "43"),
            Ok(SettingValue::I32(43))
        ));
        assert!(matches!(
            registry.parse(ValueKind::I64, "-9000000000"),
            Ok(SettingValue::I64(-9_000_000_000))
        ));
        assert!(matches!(
            registry.parse(ValueKind::F64, "2.5"),
            Ok(SettingValue::F64(v)) if v == 2.5
        ));
    }

    #[test]
    fn test_conversion_failure_names_input() {
        let registry = Registry::new();
        let err = registry.parse(ValueKind::I32, "forty").unwrap_err();
        match err {
            ConvertError::ConversionFailed { kind, input, .. } => {
                assert_eq!(kind, ValueKind::I32);
                assert_eq!(input, "forty");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_text_list_splits_on_commas() {
        let registry = Registry::new();
        let value = registry.parse(ValueKind::TextList, "a,b,c").unwrap();
        assert!(matches!(&value, SettingValue::TextList(items) if items.len() == 3));
        assert_eq!(registry.render(ValueKind::TextList, &value).unwrap(), "a,b,c");
    }

    #[test]
    fn test_type_name_lookup() {
        let mut registry = Registry::new();
        let value = registry
            .parse(ValueKind::TypeName, std::any::type_name::<String>())
            .unwrap();
        assert!(matches!(value, SettingValue::TypeName(handle) if handle.is::<String>()));

        assert!(registry.parse(ValueKind::TypeName, "Unknown").is_err());
        registry.register_type_as::<u8>("byte");
        let value = registry.parse(ValueKind::TypeName, "byte").unwrap();
        assert!(matches!(value, SettingValue::TypeName(handle) if handle.is::<u8>()));
    }

    #[test]
    fn test_uri_rejects_relative() {
        let registry = Registry::new();
        assert!(registry.parse(ValueKind::Uri, "http://www.testes.com").is_ok());
        assert!(registry.parse(ValueKind::Uri, "not a uri").is_err());
    }

    #[test]
    fn test_unsupported_kind() {
        let registry = Registry::new();
        assert!(matches!(
            registry.resolve(HEX),
            Err(ConvertError::UnsupportedType(HEX))
        ));
    }

    #[test]
    fn test_exact_kind_wins_over_supertype() {
        let mut registry = Registry::new();
        registry.declare_supertype(HEX, ValueKind::Text).unwrap();
        registry.register(
            HEX,
            Converter::new(|_| Some("exact".into()), |_| Ok(SettingValue::custom("hex", 0u32))),
        );
        let value = registry.parse(HEX, "ff").unwrap();
        assert_eq!(value.kind(), HEX);
    }

    #[test]
    fn test_closest_supertype_is_used() {
        let mut registry = Registry::new();
        registry.declare_supertype(SHORT_HEX, HEX).unwrap();
        registry.declare_supertype(HEX, ValueKind::Text).unwrap();
        registry.register(
            HEX,
            Converter::new(|_| None, |raw| Ok(SettingValue::custom("hex", raw.len()))),
        );

        let value = registry.parse(SHORT_HEX, "fff").unwrap();
        assert_eq!(value.downcast_ref::<usize>(), Some(&3));
    }

    #[test]
    fn test_supertype_fallback_to_builtin() {
        let mut registry = Registry::new();
        registry.declare_supertype(HEX, ValueKind::Text).unwrap();
        let value = registry.parse(HEX, "ff").unwrap();
        assert!(matches!(value, SettingValue::Text(text) if text == "ff"));
    }

    #[test]
    fn test_unrelated_supertypes_are_ambiguous() {
        let mut registry = Registry::new();
        registry.declare_supertype(HEX, ValueKind::Text).unwrap();
        registry.declare_supertype(HEX, ValueKind::I64).unwrap();
        match registry.resolve(HEX) {
            Err(ConvertError::AmbiguousConverter { kind, candidates }) => {
                assert_eq!(kind, HEX);
                assert_eq!(candidates, vec![ValueKind::I64, ValueKind::Text]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn test_supertype_cycle_rejected() {
        let mut registry = Registry::new();
        registry.declare_supertype(SHORT_HEX, HEX).unwrap();
        assert!(matches!(
            registry.declare_supertype(HEX, SHORT_HEX),
            Err(ConvertError::SupertypeCycle { .. })
        ));
        assert!(registry.declare_supertype(HEX, HEX).is_err());
    }

    #[test]
    fn test_register_on_clone_leaves_original() {
        let original = Registry::new();
        let mut copy = original.clone();
        copy.register(HEX, text_converter());
        assert!(copy.contains(HEX));
        assert!(!original.contains(HEX));
    }
}
