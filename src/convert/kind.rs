use std::any::{Any, TypeId};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use url::Url;

/// The semantic kind of a setting value.
///
/// Converters are registered per kind. Caller-defined kinds use
/// [`ValueKind::Custom`] and may be attached to a built-in or custom
/// supertype with [`Registry::declare_supertype`](super::Registry::declare_supertype).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueKind {
    I32,
    I64,
    F32,
    F64,
    Bool,
    Text,
    TextList,
    TypeName,
    Path,
    Uri,
    Custom(&'static str),
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::I32 => f.write_str("i32"),
            ValueKind::I64 => f.write_str("i64"),
            ValueKind::F32 => f.write_str("f32"),
            ValueKind::F64 => f.write_str("f64"),
            ValueKind::Bool => f.write_str("bool"),
            ValueKind::Text => f.write_str("text"),
            ValueKind::TextList => f.write_str("text list"),
            ValueKind::TypeName => f.write_str("type name"),
            ValueKind::Path => f.write_str("path"),
            ValueKind::Uri => f.write_str("uri"),
            ValueKind::Custom(name) => f.write_str(name),
        }
    }
}

/// A converted setting value, tagged with its kind.
#[derive(Clone)]
pub enum SettingValue {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Bool(bool),
    Text(String),
    TextList(Vec<String>),
    TypeName(TypeHandle),
    Path(PathBuf),
    Uri(Url),
    Custom {
        kind: &'static str,
        value: Arc<dyn Any + Send + Sync>,
    },
}

impl SettingValue {
    /// Wraps a caller-defined value under a custom kind.
    pub fn custom<V: Any + Send + Sync>(kind: &'static str, value: V) -> Self {
        SettingValue::Custom {
            kind,
            value: Arc::new(value),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            SettingValue::I32(_) => ValueKind::I32,
            SettingValue::I64(_) => ValueKind::I64,
            SettingValue::F32(_) => ValueKind::F32,
            SettingValue::F64(_) => ValueKind::F64,
            SettingValue::Bool(_) => ValueKind::Bool,
            SettingValue::Text(_) => ValueKind::Text,
            SettingValue::TextList(_) => ValueKind::TextList,
            SettingValue::TypeName(_) => ValueKind::TypeName,
            SettingValue::Path(_) => ValueKind::Path,
            SettingValue::Uri(_) => ValueKind::Uri,
            SettingValue::Custom { kind, .. } => ValueKind::Custom(*kind),
        }
    }

    /// Borrows the payload of a custom value if it has type `V`.
    pub fn downcast_ref<V: Any>(&self) -> Option<&V> {
        match self {
            SettingValue::Custom { value, .. } => value.downcast_ref::<V>(),
            _ => None,
        }
    }
}

impl fmt::Debug for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::I32(v) => f.debug_tuple("I32").field(v).finish(),
            SettingValue::I64(v) => f.debug_tuple("I64").field(v).finish(),
            SettingValue::F32(v) => f.debug_tuple("F32").field(v).finish(),
            SettingValue::F64(v) => f.debug_tuple("F64").field(v).finish(),
            SettingValue::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            SettingValue::Text(v) => f.debug_tuple("Text").field(v).finish(),
            SettingValue::TextList(v) => f.debug_tuple("TextList").field(v).finish(),
            SettingValue::TypeName(v) => f.debug_tuple("TypeName").field(v).finish(),
            SettingValue::Path(v) => f.debug_tuple("Path").field(v).finish(),
            SettingValue::Uri(v) => f.debug_tuple("Uri").field(&v.as_str()).finish(),
            SettingValue::Custom { kind, .. } => {
                f.debug_struct("Custom").field("kind", kind).finish_non_exhaustive()
            }
        }
    }
}

/// An opaque handle to a Rust type, identified by its fully-qualified name.
///
/// Handles are resolved from text through the registry's type catalog, so
/// only types registered there can be named in a settings source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle {
    name: &'static str,
    id: TypeId,
}

impl TypeHandle {
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn is<T: Any + ?Sized>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
