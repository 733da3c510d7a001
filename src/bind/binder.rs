use tracing::{debug, trace};

use super::schema::{Access, Binding, Schema, SettingMeta, Trail};
use super::{Bindable, FailureReport, FieldError};
use crate::config::Settings;
use crate::convert::{Registry, SettingValue};

/// Fills the fields of `target` from `settings`.
///
/// Every field is attempted. Fields without a usable value or whose value
/// fails are collected, and the pass fails with the complete report at the
/// end. Fields that were bound successfully keep their new values either way.
pub fn bind<T: Bindable>(
    target: &mut T,
    settings: &Settings,
    registry: &Registry,
) -> Result<(), FailureReport> {
    bind_fields(target, settings, registry, &mut Trail::default()).into_result()
}

/// Fills `target` like [`bind`] but never fails.
///
/// Whatever could not be bound stays at its initial value. The report is
/// returned for inspection only.
pub fn stump<T: Bindable>(target: &mut T, settings: &Settings, registry: &Registry) -> FailureReport {
    let report = bind_fields(target, settings, registry, &mut Trail::default());
    if !report.is_empty() {
        debug!(%report, "suppressed binding failures");
    }
    report
}

pub(crate) fn bind_fields<T: Bindable>(
    target: &mut T,
    settings: &Settings,
    registry: &Registry,
    trail: &mut Trail,
) -> FailureReport {
    let schema = Schema::<T>::new();
    let mut report = FailureReport::default();

    trail.enter::<T>();
    for field in schema.entries() {
        let name = field.meta.name();
        match (field.meta.binding(), &field.access) {
            (Binding::Setting(meta), Access::Setting { write, .. }) => {
                let outcome = bind_setting(name, meta, settings, registry, |value| write(target, value));
                match outcome {
                    Ok(()) => {}
                    Err(Failure::Missing) => report.record_missing(name),
                    Err(Failure::Errored(error)) => report.record_error(name, error),
                }
            }
            (Binding::Nested { prefix, .. }, Access::Nested { bind: bind_nested, .. }) => {
                let scoped = settings.prefix_view(prefix);
                trace!(field = name, %prefix, entries = scoped.len(), "binding nested settings");
                match bind_nested(target, &scoped, registry, trail) {
                    Ok(nested) if nested.is_empty() => {}
                    Ok(nested) => report.record_error(name, FieldError::NestedBindFailed(Box::new(nested))),
                    Err(error) => report.record_error(name, error),
                }
            }
            _ => unreachable!("field binding and access are created together"),
        }
    }
    trail.leave();

    report
}

enum Failure {
    Missing,
    Errored(FieldError),
}

fn bind_setting<W>(
    name: &'static str,
    meta: &SettingMeta,
    settings: &Settings,
    registry: &Registry,
    write: W,
) -> Result<(), Failure>
where
    W: FnOnce(SettingValue) -> Result<(), FieldError>,
{
    let key = meta.descriptor.as_deref().unwrap_or(name);
    let raw = settings
        .get(key)
        .filter(|value| !value.is_empty())
        .or(meta.default.as_deref())
        .filter(|value| !value.is_empty());

    let Some(raw) = raw else {
        if meta.optional {
            debug!(field = name, key, "optional setting has no value");
            return Ok(());
        }
        return Err(Failure::Missing);
    };

    let outcome = registry
        .parse(meta.kind, raw)
        .map_err(FieldError::from)
        .and_then(write);

    match outcome {
        Ok(()) => {
            trace!(field = name, key, "bound setting");
            Ok(())
        }
        Err(error) if meta.optional => {
            debug!(field = name, key, %error, "skipping malformed optional setting");
            Ok(())
        }
        Err(error) => Err(Failure::Errored(error)),
    }
}
