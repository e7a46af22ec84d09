//! Default-selection resolution.
//!
//! Defaults are selections without a key: each one is applied to every model
//! it fulfills, unless that model already has an explicit selection or two
//! distinct defaults compete for it. Losing defaults are dropped silently;
//! the ambiguous models are reported for tracing.

use std::collections::BTreeMap;

use synet_core::types::ModelRef;

use crate::di::{DependencyInjection, Selection, SelectionKey};

/// Outcome of resolving the defaults against an explicit mapping.
#[derive(Clone, Debug, Default)]
pub struct DefaultResolution {
    /// Unambiguous picks: model to the default selected for it.
    pub selected: BTreeMap<ModelRef, Selection>,
    /// Models for which two or more distinct defaults competed.
    pub ambiguous: Vec<ModelRef>,
}

impl DependencyInjection {
    /// Resolves the default selections against the explicit mapping.
    ///
    /// For every default and every model it fulfills: models already
    /// explicitly selected are skipped; a model matched by one default gets
    /// it; a model matched by two distinct defaults becomes ambiguous and
    /// loses any prior pick.
    pub fn resolve_defaults(&self) -> DefaultResolution {
        let mut resolution = DefaultResolution::default();
        for default in self.defaults() {
            for model in fulfilled_models_of(default) {
                if is_identity(default, &model) {
                    // A default trivially selects itself; recording that
                    // adds nothing.
                    continue;
                }
                if self
                    .explicit()
                    .contains_key(&SelectionKey::Model(model.clone()))
                {
                    tracing::trace!(
                        pass = "inject",
                        model = %model,
                        default = %default,
                        "default dropped, explicit selection wins"
                    );
                    continue;
                }
                if resolution.ambiguous.contains(&model) {
                    continue;
                }
                match resolution.selected.get(&model) {
                    None => {
                        resolution.selected.insert(model, default.clone());
                    }
                    Some(existing) if existing.same_as(default) => {}
                    Some(_) => {
                        tracing::debug!(
                            pass = "inject",
                            model = %model,
                            "default selection ambiguous, dropped"
                        );
                        resolution.selected.remove(&model);
                        resolution.ambiguous.push(model);
                    }
                }
            }
        }
        resolution
    }
}

/// Whether `selection` selects `model` itself.
fn is_identity(selection: &Selection, model: &ModelRef) -> bool {
    matches!(selection, Selection::Model(m) if m == model)
}

/// The models a default selection can stand in for.
///
/// Components enumerate themselves, their supermodel chain, and the
/// transitive closure of their provided services; services enumerate their
/// parent chain. Bare names cannot be enumerated and never match.
fn fulfilled_models_of(selection: &Selection) -> Vec<ModelRef> {
    match selection {
        Selection::Nothing | Selection::Name(_) => Vec::new(),
        Selection::Model(ModelRef::Component(component)) => component.fulfilled_models(),
        Selection::Model(ModelRef::Service(service)) => service
            .fulfilled_services()
            .into_iter()
            .map(ModelRef::Service)
            .collect(),
        Selection::BoundService { service, .. } => service
            .fulfilled_services()
            .into_iter()
            .map(ModelRef::Service)
            .collect(),
        Selection::Requirements(requirements) => {
            let mut out = Vec::new();
            for re in requirements.models.refs() {
                let fulfilled = match re {
                    ModelRef::Component(component) => component.fulfilled_models(),
                    ModelRef::Service(service) => service
                        .fulfilled_services()
                        .into_iter()
                        .map(ModelRef::Service)
                        .collect(),
                };
                for m in fulfilled {
                    if !out.contains(&m) {
                        out.push(m);
                    }
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use synet_core::types::{ComponentModel, DataServiceModel, ProvidedService, TaskContextModel};

    fn service(name: &str) -> Arc<DataServiceModel> {
        Arc::new(DataServiceModel::new(name, vec![]))
    }

    fn impl_of(name: &str, srv: &Arc<DataServiceModel>) -> ModelRef {
        let mut model = TaskContextModel::new(name);
        model.provides.push(ProvidedService::plain(Arc::clone(srv)));
        ModelRef::Component(ComponentModel::Task(Arc::new(model)))
    }

    #[test]
    fn test_default_selects_fulfilled_service() {
        let dev_service = service("dev");
        let dev_impl = impl_of("DevImpl", &dev_service);

        let mut di = DependencyInjection::new();
        di.add_default(Selection::Model(dev_impl.clone()));

        let resolution = di.resolve_defaults();
        let key = ModelRef::Service(dev_service);
        assert!(resolution.selected[&key].same_as(&Selection::Model(dev_impl)));
        assert!(resolution.ambiguous.is_empty());
    }

    #[test]
    fn test_explicit_selection_beats_default() {
        // defaults {DevImpl}, explicit {DevService -> OtherImpl}: the default
        // is dropped and the explicit mapping is untouched.
        let dev_service = service("dev");
        let dev_impl = impl_of("DevImpl", &dev_service);
        let other_impl = impl_of("OtherImpl", &dev_service);

        let mut di = DependencyInjection::new();
        di.add_explicit(
            SelectionKey::Model(ModelRef::Service(Arc::clone(&dev_service))),
            Selection::Model(other_impl.clone()),
        )
        .unwrap();
        di.add_default(Selection::Model(dev_impl));

        let resolution = di.resolve_defaults();
        assert!(resolution.selected.is_empty());

        let resolved = di.resolve().unwrap();
        match resolved.selection_for(&SelectionKey::Model(ModelRef::Service(dev_service))) {
            Some(Selection::BoundService { component, .. }) => {
                assert_eq!(component.name(), "OtherImpl")
            }
            Some(Selection::Model(m)) => assert_eq!(m.name(), "OtherImpl"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_competing_defaults_are_ambiguous() {
        // defaults {DevImplA, DevImplB}, no explicit: DevService stays
        // unselected and is reported ambiguous.
        let dev_service = service("dev");
        let impl_a = impl_of("DevImplA", &dev_service);
        let impl_b = impl_of("DevImplB", &dev_service);

        let mut di = DependencyInjection::new();
        di.add_default(Selection::Model(impl_a));
        di.add_default(Selection::Model(impl_b));

        let resolution = di.resolve_defaults();
        let key = ModelRef::Service(Arc::clone(&dev_service));
        assert!(!resolution.selected.contains_key(&key));
        assert!(resolution.ambiguous.contains(&key));

        let resolved = di.resolve().unwrap();
        assert!(resolved
            .selection_for(&SelectionKey::Model(ModelRef::Service(dev_service)))
            .is_none());
    }

    #[test]
    fn test_same_default_twice_is_not_ambiguous() {
        let dev_service = service("dev");
        let dev_impl = impl_of("DevImpl", &dev_service);

        let mut di = DependencyInjection::new();
        di.add_default(Selection::Model(dev_impl.clone()));
        di.add_default(Selection::Model(dev_impl));

        let resolution = di.resolve_defaults();
        assert!(resolution.ambiguous.is_empty());
        assert_eq!(resolution.selected.len(), 1);
    }
}
