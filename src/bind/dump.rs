use super::schema::{Access, Binding, Schema, Trail};
use super::{Bindable, FailureReport, FieldError};
use crate::config::Settings;
use crate::convert::Registry;

/// Renders the current field values of `source` back into settings.
///
/// Nested objects are dumped recursively with their prefix put back in
/// front of every key; an absent nested object is dumped as its default.
/// Unset optional values become empty strings. Fields are visited in the
/// same order as for binding, so a descendant's value wins over an
/// ancestor's for a shared key.
pub fn dump<T: Bindable>(source: &T, registry: &Registry) -> Result<Settings, FailureReport> {
    dump_fields(source, registry, &mut Trail::default())
}

pub(crate) fn dump_fields<T: Bindable>(
    source: &T,
    registry: &Registry,
    trail: &mut Trail,
) -> Result<Settings, FailureReport> {
    let schema = Schema::<T>::new();
    let mut settings = Settings::new();
    let mut report = FailureReport::default();

    trail.enter::<T>();
    for field in schema.entries() {
        let name = field.meta.name();
        match (field.meta.binding(), &field.access) {
            (Binding::Setting(meta), Access::Setting { read, .. }) => {
                let key = meta.descriptor.as_deref().unwrap_or(name);
                let text = match read(source) {
                    Some(value) => registry.render(meta.kind, &value),
                    None => Ok(String::new()),
                };
                match text {
                    Ok(text) => {
                        settings.insert(key, text);
                    }
                    Err(error) => report.record_error(name, FieldError::from(error)),
                }
            }
            (Binding::Nested { prefix, .. }, Access::Nested { dump: dump_nested, .. }) => {
                match dump_nested(source, registry, trail) {
                    Ok(nested) => {
                        for (key, value) in nested.iter() {
                            settings.insert(format!("{prefix}{key}"), value);
                        }
                    }
                    Err(error) => report.record_error(name, error),
                }
            }
            _ => unreachable!("field binding and access are created together"),
        }
    }
    trail.leave();

    report.into_result().map(|()| settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::{bind, Fields};
    use crate::convert::{ConvertError, ValueKind};
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Inner {
        depth: f64,
        tags: Vec<String>,
    }

    impl Bindable for Inner {
        fn describe(fields: &mut Fields<Self>) {
            fields.setting("depth", |i| &i.depth, |i| &mut i.depth).default("1.5");
            fields.setting("tags", |i| &i.tags, |i| &mut i.tags).optional();
        }
    }

    #[derive(Default)]
    struct Middle {
        inner: Inner,
        name: Option<String>,
    }

    impl Bindable for Middle {
        fn describe(fields: &mut Fields<Self>) {
            fields.nested("inner", "inner.", |m| &m.inner, |m| &mut m.inner);
            fields.setting("name", |m| &m.name, |m| &mut m.name).optional();
        }
    }

    #[derive(Default)]
    struct Outer {
        count: i64,
        middle: Option<Middle>,
    }

    impl Bindable for Outer {
        fn describe(fields: &mut Fields<Self>) {
            fields.setting("count", |o| &o.count, |o| &mut o.count);
            fields.nested_optional("middle", "mid.", |o| &o.middle, |o| &mut o.middle);
        }
    }

    fn rendered(settings: &Settings) -> Vec<(String, String)> {
        settings
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_absent_nested_dumps_defaults_with_prefix() {
        let outer = Outer {
            count: 3,
            middle: None,
        };
        let settings = dump(&outer, &Registry::new()).unwrap();

        assert_eq!(
            settings.to_string(),
            "count=3\nmid.inner.depth=0\nmid.inner.tags=\nmid.name="
        );
    }

    #[test]
    fn test_bound_values_round_trip() {
        let source: Settings = [
            ("count", "42"),
            ("mid.inner.depth", "2.25"),
            ("mid.inner.tags", "a,b"),
            ("mid.name", "center"),
        ]
        .into_iter()
        .collect();

        let registry = Registry::new();
        let mut outer = Outer::default();
        bind(&mut outer, &source, &registry).unwrap();

        let dumped = dump(&outer, &registry).unwrap();
        assert_eq!(rendered(&dumped), rendered(&source));
    }

    #[test]
    fn test_unrenderable_field_is_reported() {
        let registry = Registry::empty();
        let report = dump(&Outer::default(), &registry).unwrap_err();
        assert!(matches!(
            report.error_for("count"),
            Some(FieldError::Convert(ConvertError::UnsupportedType(ValueKind::I64)))
        ));
        assert!(matches!(report.error_for("middle"), Some(FieldError::NestedBindFailed(_))));
    }
}
