//! Per-type field tables.
//!
//! Instead of discovering fields at run time, every bindable type lists its
//! fields once in [`Bindable::describe`]. The resulting [`Schema`] drives both
//! binding and dumping.

use std::any::{type_name, TypeId};
use std::sync::Arc;

use super::binder::bind_fields;
use super::dump::dump_fields;
use super::{FailureReport, FieldError};
use crate::config::Settings;
use crate::convert::{Registry, SettingType, SettingValue, ValueKind};

/// A type whose fields can be filled from settings.
///
/// ```
/// use settings_binder::{Bindable, Fields};
///
/// #[derive(Default)]
/// struct Server {
///     host: String,
///     port: i32,
/// }
///
/// impl Bindable for Server {
///     fn describe(fields: &mut Fields<Self>) {
///         fields.setting("host", |s| &s.host, |s| &mut s.host);
///         fields
///             .setting("port", |s| &s.port, |s| &mut s.port)
///             .default("8080");
///     }
/// }
/// ```
pub trait Bindable: Default + 'static {
    fn describe(fields: &mut Fields<Self>);

    /// Identity used to detect a type nested inside itself.
    #[doc(hidden)]
    fn nesting_id() -> TypeId {
        TypeId::of::<Self>()
    }
}

impl<N: Bindable> Bindable for Box<N> {
    fn describe(fields: &mut Fields<Self>) {
        fields.inherit(|boxed: &Box<N>| &**boxed, |boxed: &mut Box<N>| &mut **boxed);
    }

    fn nesting_id() -> TypeId {
        N::nesting_id()
    }
}

/// Binding metadata of a plain setting field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingMeta {
    pub descriptor: Option<String>,
    pub default: Option<String>,
    pub optional: bool,
    pub kind: ValueKind,
}

/// How a field takes part in binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Setting(SettingMeta),
    Nested {
        prefix: String,
        type_name: &'static str,
    },
}

/// Describes one bindable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMeta {
    name: &'static str,
    declared_in: &'static str,
    binding: Binding,
}

impl FieldMeta {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name of the type that declared the field.
    pub fn declared_in(&self) -> &'static str {
        self.declared_in
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// The settings key of a plain field: its descriptor, or its name.
    pub fn key(&self) -> Option<&str> {
        match &self.binding {
            Binding::Setting(meta) => Some(meta.descriptor.as_deref().unwrap_or(self.name)),
            Binding::Nested { .. } => None,
        }
    }
}

type ReadFn<T> = Arc<dyn Fn(&T) -> Option<SettingValue> + Send + Sync>;
type WriteFn<T> = Arc<dyn Fn(&mut T, SettingValue) -> Result<(), FieldError> + Send + Sync>;
type BindFn<T> = Arc<
    dyn Fn(&mut T, &Settings, &Registry, &mut Trail) -> Result<FailureReport, FieldError> + Send + Sync,
>;
type DumpFn<T> = Arc<dyn Fn(&T, &Registry, &mut Trail) -> Result<Settings, FieldError> + Send + Sync>;

pub(crate) enum Access<T> {
    Setting { read: ReadFn<T>, write: WriteFn<T> },
    Nested { bind: BindFn<T>, dump: DumpFn<T> },
}

pub(crate) struct Field<T> {
    pub(crate) meta: FieldMeta,
    /// Inheritance distance from the described type; own fields are 0.
    depth: usize,
    pub(crate) access: Access<T>,
}

/// Collects the fields of `T` during [`Bindable::describe`].
pub struct Fields<T> {
    entries: Vec<Field<T>>,
}

impl<T: 'static> Fields<T> {
    fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Adds a plain setting bound to the field reached through `get`/`get_mut`.
    ///
    /// The key defaults to `name`; chain on the returned builder to change
    /// the descriptor, set a default or mark the field optional.
    pub fn setting<V, G, M>(&mut self, name: &'static str, get: G, get_mut: M) -> SettingBuilder<'_>
    where
        V: SettingType + 'static,
        G: Fn(&T) -> &V + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut V + Send + Sync + 'static,
    {
        let read: ReadFn<T> = Arc::new(move |target: &T| get(target).to_value());
        let write: WriteFn<T> = Arc::new(move |target: &mut T, value: SettingValue| {
            let value = V::from_value(value).map_err(|rejected| FieldError::Unassignable {
                expected: V::kind(),
                found: rejected.kind(),
            })?;
            *get_mut(target) = value;
            Ok(())
        });

        let meta = SettingMeta {
            descriptor: None,
            default: None,
            optional: false,
            kind: V::kind(),
        };
        let field = self.push(name, Binding::Setting(meta), Access::Setting { read, write });
        SettingBuilder { field }
    }

    /// Adds a nested object whose settings live under `prefix`.
    pub fn nested<N, G, M>(&mut self, name: &'static str, prefix: impl Into<String>, get: G, get_mut: M)
    where
        N: Bindable,
        G: Fn(&T) -> &N + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut N + Send + Sync + 'static,
    {
        self.push_nested(
            name,
            prefix.into(),
            move |target: &T| Some(get(target)),
            move |target: &mut T, value: N| *get_mut(target) = value,
        );
    }

    /// Adds a nested object held in an `Option`, filled in by binding.
    pub fn nested_optional<N, G, M>(
        &mut self,
        name: &'static str,
        prefix: impl Into<String>,
        get: G,
        get_mut: M,
    ) where
        N: Bindable,
        G: Fn(&T) -> &Option<N> + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut Option<N> + Send + Sync + 'static,
    {
        self.push_nested(
            name,
            prefix.into(),
            move |target: &T| get(target).as_ref(),
            move |target: &mut T, value: N| *get_mut(target) = Some(value),
        );
    }

    /// Adds every field of the embedded ancestor `B`.
    ///
    /// Inherited fields always come before the fields `T` declares itself,
    /// so a descendant field with the same key is bound last and wins.
    pub fn inherit<B, G, M>(&mut self, get: G, get_mut: M)
    where
        B: Bindable,
        G: Fn(&T) -> &B + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut B + Send + Sync + 'static,
    {
        let get = Arc::new(get);
        let get_mut = Arc::new(get_mut);

        for field in Schema::<B>::new().fields {
            let access = match field.access {
                Access::Setting { read, write } => {
                    let (get, get_mut) = (Arc::clone(&get), Arc::clone(&get_mut));
                    Access::Setting {
                        read: Arc::new(move |target: &T| read(get(target))),
                        write: Arc::new(move |target: &mut T, value: SettingValue| {
                            write(get_mut(target), value)
                        }),
                    }
                }
                Access::Nested { bind, dump } => {
                    let (get, get_mut) = (Arc::clone(&get), Arc::clone(&get_mut));
                    Access::Nested {
                        bind: Arc::new(
                            move |target: &mut T,
                                  settings: &Settings,
                                  registry: &Registry,
                                  trail: &mut Trail| {
                                bind(get_mut(target), settings, registry, trail)
                            },
                        ),
                        dump: Arc::new(move |target: &T, registry: &Registry, trail: &mut Trail| {
                            dump(get(target), registry, trail)
                        }),
                    }
                }
            };
            self.entries.push(Field {
                meta: field.meta,
                depth: field.depth + 1,
                access,
            });
        }
    }

    fn push_nested<N, C, F>(&mut self, name: &'static str, prefix: String, current: C, fill: F)
    where
        N: Bindable,
        C: Fn(&T) -> Option<&N> + Send + Sync + 'static,
        F: Fn(&mut T, N) + Send + Sync + 'static,
    {
        let bind: BindFn<T> = Arc::new(
            move |target: &mut T, settings: &Settings, registry: &Registry, trail: &mut Trail| {
                if trail.contains::<N>() {
                    return Err(FieldError::CyclicNesting(type_name::<N>()));
                }
                let mut nested = N::default();
                let report = bind_fields(&mut nested, settings, registry, trail);
                fill(target, nested);
                Ok(report)
            },
        );

        let dump: DumpFn<T> = Arc::new(move |target: &T, registry: &Registry, trail: &mut Trail| {
            if trail.contains::<N>() {
                return Err(FieldError::CyclicNesting(type_name::<N>()));
            }
            let dumped = match current(target) {
                Some(nested) => dump_fields(nested, registry, trail),
                None => dump_fields(&N::default(), registry, trail),
            };
            dumped.map_err(|report| FieldError::NestedBindFailed(Box::new(report)))
        });

        let binding = Binding::Nested {
            prefix,
            type_name: type_name::<N>(),
        };
        self.push(name, binding, Access::Nested { bind, dump });
    }

    fn push(&mut self, name: &'static str, binding: Binding, access: Access<T>) -> &mut FieldMeta {
        self.entries.push(Field {
            meta: FieldMeta {
                name,
                declared_in: type_name::<T>(),
                binding,
            },
            depth: 0,
            access,
        });
        let last = self.entries.len() - 1;
        &mut self.entries[last].meta
    }
}

/// Refines the metadata of a setting added with [`Fields::setting`].
pub struct SettingBuilder<'a> {
    field: &'a mut FieldMeta,
}

impl SettingBuilder<'_> {
    /// Binds to `descriptor` instead of the field name.
    pub fn descriptor(self, descriptor: impl Into<String>) -> Self {
        if let Binding::Setting(meta) = &mut self.field.binding {
            meta.descriptor = Some(descriptor.into());
        }
        self
    }

    /// Value used when the settings hold nothing for the key.
    pub fn default(self, value: impl Into<String>) -> Self {
        if let Binding::Setting(meta) = &mut self.field.binding {
            meta.default = Some(value.into());
        }
        self
    }

    /// Missing or malformed values leave the field untouched instead of failing.
    pub fn optional(self) -> Self {
        if let Binding::Setting(meta) = &mut self.field.binding {
            meta.optional = true;
        }
        self
    }
}

/// The ordered field table of a bindable type.
///
/// Fields declared by ancestors come first, deepest ancestor first; fields
/// declared by the same type keep their declaration order.
pub struct Schema<T> {
    fields: Vec<Field<T>>,
}

impl<T: Bindable> Schema<T> {
    pub fn new() -> Self {
        let mut fields = Fields::new();
        T::describe(&mut fields);
        let mut fields = fields.entries;
        fields.sort_by(|a, b| b.depth.cmp(&a.depth));
        Self { fields }
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields.iter().map(|field| &field.meta)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn entries(&self) -> &[Field<T>] {
        &self.fields
    }
}

impl<T: Bindable> Default for Schema<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The bindable types currently being walked, outermost first.
#[derive(Debug, Default)]
pub(crate) struct Trail {
    stack: Vec<TypeId>,
}

impl Trail {
    pub(crate) fn contains<N: Bindable>(&self) -> bool {
        self.stack.contains(&N::nesting_id())
    }

    pub(crate) fn enter<N: Bindable>(&mut self) {
        self.stack.push(N::nesting_id());
    }

    pub(crate) fn leave(&mut self) {
        self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Base {
        shared: String,
        base_only: i32,
    }

    impl Bindable for Base {
        fn describe(fields: &mut Fields<Self>) {
            fields
                .setting("shared", |b| &b.shared, |b| &mut b.shared)
                .descriptor("override");
            fields.setting("base_only", |b| &b.base_only, |b| &mut b.base_only);
        }
    }

    #[derive(Default)]
    struct Child {
        base: Base,
        own: Option<String>,
        shared: String,
    }

    impl Bindable for Child {
        fn describe(fields: &mut Fields<Self>) {
            // own fields declared before the ancestor on purpose
            fields.setting("own", |c| &c.own, |c| &mut c.own).optional();
            fields
                .setting("shared", |c| &c.shared, |c| &mut c.shared)
                .descriptor("override")
                .default("child");
            fields.inherit(|c| &c.base, |c| &mut c.base);
        }
    }

    #[test]
    fn test_ancestor_fields_come_first() {
        let schema = Schema::<Child>::new();
        let names: Vec<_> = schema.fields().map(|f| (f.declared_in(), f.name())).collect();

        let base = type_name::<Base>();
        let child = type_name::<Child>();
        assert_eq!(
            names,
            vec![(base, "shared"), (base, "base_only"), (child, "own"), (child, "shared")]
        );
    }

    #[test]
    fn test_metadata_builder() {
        let schema = Schema::<Child>::new();
        let own = schema.fields().find(|f| f.name() == "own").unwrap();
        assert_eq!(own.key(), Some("own"));
        assert_eq!(
            own.binding(),
            &Binding::Setting(SettingMeta {
                descriptor: None,
                default: None,
                optional: true,
                kind: ValueKind::Text,
            })
        );

        let keys: Vec<_> = schema.fields().filter_map(FieldMeta::key).collect();
        assert_eq!(keys, vec!["override", "base_only", "own", "override"]);
    }

    #[test]
    fn test_boxed_type_shares_fields() {
        let boxed = Schema::<Box<Base>>::new();
        assert_eq!(boxed.len(), 2);
        assert!(boxed.fields().all(|f| f.declared_in() == type_name::<Base>()));
    }
}
