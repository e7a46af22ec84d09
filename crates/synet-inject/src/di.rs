//! Dependency injection: selection keys, selections, and their resolution.
//!
//! A `DependencyInjection` maps keys (bare names or models) to selections and
//! carries a set of default selections applied wherever nothing explicit was
//! given. `resolve` collapses recursive chains and folds unambiguous defaults
//! into the explicit mapping; `component_model_for` turns a placeholder into
//! a concrete component model or a synthesized proxy.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use synet_core::error::ResolutionError;
use synet_core::types::{
    ComponentModel, DataServiceModel, InstanceModel, ModelRef, ModelSet, ProxyModel,
};
use synet_core::ModelCatalog;

use crate::requirements::InstanceRequirements;

/// A selection key: a bare name or a model.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SelectionKey {
    /// A name, local to the composition being instantiated.
    Name(String),
    /// A model; selections under it must fulfill it.
    Model(ModelRef),
}

impl SelectionKey {
    /// Convenience constructor from a name.
    pub fn name(name: impl Into<String>) -> Self {
        SelectionKey::Name(name.into())
    }
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionKey::Name(name) => write!(f, "'{name}'"),
            SelectionKey::Model(model) => write!(f, "{model}"),
        }
    }
}

/// A selection value.
#[derive(Clone, Debug)]
pub enum Selection {
    /// Explicitly select nothing; optional placeholders are dropped.
    Nothing,
    /// A not-yet-resolved name.
    Name(String),
    /// A model.
    Model(ModelRef),
    /// A service bound to the component providing it.
    BoundService {
        /// The providing component.
        component: ComponentModel,
        /// The provided service.
        service: Arc<DataServiceModel>,
    },
    /// A full requirement set.
    Requirements(Box<InstanceRequirements>),
}

impl Selection {
    /// Convenience constructor from a model reference.
    pub fn model(model: ModelRef) -> Self {
        Selection::Model(model)
    }

    /// Whether two selections pick the same thing.
    pub fn same_as(&self, other: &Selection) -> bool {
        match (self, other) {
            (Selection::Nothing, Selection::Nothing) => true,
            (Selection::Name(a), Selection::Name(b)) => a == b,
            (Selection::Model(a), Selection::Model(b)) => a == b,
            (
                Selection::BoundService {
                    component: ca,
                    service: sa,
                },
                Selection::BoundService {
                    component: cb,
                    service: sb,
                },
            ) => ca.name() == cb.name() && sa.name == sb.name,
            _ => false,
        }
    }

    /// The key this selection would resolve through, when it is itself
    /// usable as one.
    fn as_key(&self) -> Option<SelectionKey> {
        match self {
            Selection::Name(name) => Some(SelectionKey::Name(name.clone())),
            Selection::Model(model) => Some(SelectionKey::Model(model.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Nothing => write!(f, "nothing"),
            Selection::Name(name) => write!(f, "'{name}'"),
            Selection::Model(model) => write!(f, "{model}"),
            Selection::BoundService { component, service } => {
                write!(f, "{}.as({})", component.name(), service.name)
            }
            Selection::Requirements(requirements) => {
                write!(f, "requirements({})", requirements.models)
            }
        }
    }
}

/// Result of resolving one placeholder to a component model.
#[derive(Clone, Debug)]
pub struct ComponentSelection {
    /// The selected model; a proxy when nothing concrete was picked.
    pub model: InstanceModel,
    /// Per-required-model selection, for specialization matching and tracing.
    pub service_selections: BTreeMap<ModelRef, Selection>,
    /// Requirements accumulated from requirement-typed selections.
    pub requirements: InstanceRequirements,
    /// Whether the pick came from an explicit entry rather than a fallback.
    pub from_explicit: bool,
    /// Whether the placeholder was explicitly deselected.
    pub explicitly_nothing: bool,
}

/// Mapping from selection keys to selections, with defaults.
#[derive(Clone, Debug, Default)]
pub struct DependencyInjection {
    explicit: BTreeMap<SelectionKey, Selection>,
    defaults: Vec<Selection>,
}

impl DependencyInjection {
    /// The empty injection.
    pub fn new() -> Self {
        DependencyInjection::default()
    }

    /// Adds an explicit selection after normalizing the pair.
    ///
    /// # Errors
    ///
    /// Fails when the pair does not normalize; the mapping is unchanged in
    /// that case.
    pub fn add_explicit(
        &mut self,
        key: SelectionKey,
        selection: Selection,
    ) -> Result<(), ResolutionError> {
        let normalized = normalize(&key, selection)?;
        self.explicit.insert(key, normalized);
        Ok(())
    }

    /// Adds a default selection.
    pub fn add_default(&mut self, selection: Selection) {
        if !self.defaults.iter().any(|d| d.same_as(&selection)) {
            self.defaults.push(selection);
        }
    }

    /// The explicit mapping.
    pub fn explicit(&self) -> &BTreeMap<SelectionKey, Selection> {
        &self.explicit
    }

    /// The default selections.
    pub fn defaults(&self) -> &[Selection] {
        &self.defaults
    }

    /// Looks up the explicit selection for a key.
    pub fn selection_for(&self, key: &SelectionKey) -> Option<&Selection> {
        self.explicit.get(key)
    }

    /// Whether the injection carries neither explicit entries nor defaults.
    pub fn is_empty(&self) -> bool {
        self.explicit.is_empty() && self.defaults.is_empty()
    }

    /// Collapses recursive selection chains to their fixed point.
    ///
    /// A value that is itself a key of the mapping is replaced by that key's
    /// value, repeatedly. Self-loops are left alone; longer cycles fail.
    ///
    /// # Errors
    ///
    /// Fails with `RecursiveSelection` when a chain loops.
    pub fn resolve_recursive(
        explicit: &BTreeMap<SelectionKey, Selection>,
    ) -> Result<BTreeMap<SelectionKey, Selection>, ResolutionError> {
        let mut resolved = BTreeMap::new();
        for (key, selection) in explicit {
            let mut chain = vec![key.clone()];
            let mut current = selection.clone();
            loop {
                let Some(next_key) = current.as_key() else {
                    break;
                };
                if chain.last() == Some(&next_key) {
                    // Self-loop: the key deliberately selects itself.
                    break;
                }
                if chain.contains(&next_key) {
                    chain.push(next_key);
                    return Err(ResolutionError::RecursiveSelection {
                        chain: chain.iter().map(|k| k.to_string()).collect(),
                    });
                }
                let Some(next) = explicit.get(&next_key) else {
                    break;
                };
                chain.push(next_key);
                current = next.clone();
            }
            resolved.insert(key.clone(), current);
        }
        Ok(resolved)
    }

    /// Returns a new injection with defaults folded in and recursive chains
    /// collapsed. Resolution is idempotent.
    ///
    /// # Errors
    ///
    /// Fails with `RecursiveSelection` on selection cycles.
    pub fn resolve(&self) -> Result<DependencyInjection, ResolutionError> {
        let resolution = self.resolve_defaults();
        let mut merged = self.explicit.clone();
        for (model, selection) in resolution.selected {
            merged.entry(SelectionKey::Model(model)).or_insert(selection);
        }
        Ok(DependencyInjection {
            explicit: Self::resolve_recursive(&merged)?,
            defaults: self.defaults.clone(),
        })
    }

    /// Merges `other` into this injection, consuming self.
    ///
    /// # Errors
    ///
    /// Fails with `IncompatibleSelections` when both sides select unrelated
    /// things for the same key.
    pub fn merged(mut self, other: &DependencyInjection) -> Result<Self, ResolutionError> {
        for (key, selection) in &other.explicit {
            let preferred = match self.explicit.get(key) {
                None => selection.clone(),
                Some(existing) if existing.same_as(selection) => continue,
                Some(existing) => more_specific(existing, selection).ok_or_else(|| {
                    ResolutionError::IncompatibleSelections {
                        key: key.to_string(),
                        first: existing.to_string(),
                        second: selection.to_string(),
                    }
                })?,
            };
            self.explicit.insert(key.clone(), preferred);
        }
        for default in &other.defaults {
            self.add_default(default.clone());
        }
        Ok(self)
    }

    /// Projects the injection into the namespace of `child_name`: keys of the
    /// form `child_name.sub_key` are rewritten to `sub_key`, every other
    /// explicit key is dropped at the boundary. Defaults are kept; they are
    /// not keyed.
    pub fn project_child(&self, child_name: &str) -> DependencyInjection {
        let prefix = format!("{child_name}.");
        let explicit = self
            .explicit
            .iter()
            .filter_map(|(key, selection)| match key {
                SelectionKey::Name(name) => name
                    .strip_prefix(&prefix)
                    .map(|rest| (SelectionKey::name(rest), selection.clone())),
                SelectionKey::Model(_) => None,
            })
            .collect();
        DependencyInjection {
            explicit,
            defaults: self.defaults.clone(),
        }
    }

    /// Resolves one placeholder to a component model.
    ///
    /// When `name` has a concrete explicit selection, that selection is used.
    /// Otherwise each required model is looked up in the mapping (falling
    /// back to itself) and the results are united. Without a concrete
    /// component in the union, a proxy model fulfilling the united services
    /// is synthesized.
    ///
    /// # Errors
    ///
    /// Fails with `IncompatibleComponentModels` when the union selects two
    /// unrelated component classes, or with a name-resolution error when a
    /// selected name is unknown to the catalog.
    pub fn component_model_for(
        &self,
        name: Option<&str>,
        requirements: &InstanceRequirements,
        catalog: &ModelCatalog,
    ) -> Result<ComponentSelection, ResolutionError> {
        let mut set = ModelSet::new();
        let mut accumulated = InstanceRequirements::new();
        let mut service_selections = BTreeMap::new();
        let mut from_explicit = false;
        let mut explicitly_nothing = false;

        let name_selection = name.and_then(|n| self.explicit.get(&SelectionKey::name(n)));
        if let Some(selection) = name_selection {
            from_explicit = true;
            if matches!(selection, Selection::Nothing) {
                explicitly_nothing = true;
            } else {
                add_selection_models(&mut set, &mut accumulated, selection, catalog)?;
            }
            for model in requirements.models.refs() {
                service_selections.insert(model.clone(), selection.clone());
            }
        }

        if set.concrete().is_none() && !explicitly_nothing {
            for model in requirements.models.refs() {
                let key = SelectionKey::Model(model.clone());
                let selection = self
                    .explicit
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| Selection::Model(model.clone()));
                if self.explicit.contains_key(&key) {
                    from_explicit = true;
                }
                add_selection_models(&mut set, &mut accumulated, &selection, catalog)?;
                service_selections.insert(model.clone(), selection);
            }
        }

        // The placeholder's own requirements always constrain the result.
        set.merge(&requirements.models)?;

        let model = match set.concrete() {
            Some(component) => InstanceModel::from(component.clone()),
            None => InstanceModel::Proxy(Arc::new(ProxyModel::new(set.services()))),
        };
        Ok(ComponentSelection {
            model,
            service_selections,
            requirements: accumulated,
            from_explicit,
            explicitly_nothing,
        })
    }
}

/// Folds a selection's models into a model set, accumulating requirements.
fn add_selection_models(
    set: &mut ModelSet,
    accumulated: &mut InstanceRequirements,
    selection: &Selection,
    catalog: &ModelCatalog,
) -> Result<(), ResolutionError> {
    match selection {
        Selection::Nothing => Ok(()),
        Selection::Name(name) => {
            let model = catalog.model_by_name(name)?;
            set.add(model)
        }
        Selection::Model(model) => set.add(model.clone()),
        Selection::BoundService { component, service } => {
            set.add(ModelRef::Component(component.clone()))?;
            set.add(ModelRef::Service(Arc::clone(service)))
        }
        Selection::Requirements(requirements) => {
            set.merge(&requirements.models)?;
            accumulated.merge(requirements)
        }
    }
}

/// Of two selections for the same key, the one fulfilling the other. `None`
/// when they are incomparable.
fn more_specific(a: &Selection, b: &Selection) -> Option<Selection> {
    let (Selection::Model(ma), Selection::Model(mb)) = (a, b) else {
        return None;
    };
    if ma.fulfills(mb) {
        Some(a.clone())
    } else if mb.fulfills(ma) {
        Some(b.clone())
    } else {
        None
    }
}

/// Validates and rewrites one selection pair.
///
/// Bare-name keys accept any selection. Component-model keys reduce bound
/// services to their owning component and require the selection to fulfill
/// the key. Service keys resolve components to the unique provided service.
fn normalize(key: &SelectionKey, selection: Selection) -> Result<Selection, ResolutionError> {
    match key {
        SelectionKey::Name(_) => Ok(selection),
        SelectionKey::Model(ModelRef::Component(component_key)) => {
            let selection = match selection {
                // A bound service selected for a component reduces to the
                // owning component.
                Selection::BoundService { component, .. } => {
                    Selection::Model(ModelRef::Component(component))
                }
                other => other,
            };
            match &selection {
                Selection::Nothing | Selection::Name(_) => Ok(selection),
                Selection::Model(model @ ModelRef::Component(_)) => {
                    if model.fulfills(&ModelRef::Component(component_key.clone())) {
                        Ok(selection)
                    } else {
                        Err(ResolutionError::InvalidSelection {
                            key: key.to_string(),
                            reason: format!("{model} does not fulfill the selected component"),
                        })
                    }
                }
                Selection::Model(ModelRef::Service(service)) => {
                    Err(ResolutionError::InvalidSelection {
                        key: key.to_string(),
                        reason: format!(
                            "cannot select service '{}' for a component model",
                            service.name
                        ),
                    })
                }
                Selection::Requirements(requirements) => {
                    let target = ModelRef::Component(component_key.clone());
                    if requirements.models.refs().iter().any(|m| m.fulfills(&target)) {
                        Ok(selection)
                    } else {
                        Err(ResolutionError::InvalidSelection {
                            key: key.to_string(),
                            reason: "requirements do not fulfill the selected component"
                                .to_string(),
                        })
                    }
                }
                Selection::BoundService { .. } => unreachable!("reduced above"),
            }
        }
        SelectionKey::Model(ModelRef::Service(service_key)) => match selection {
            Selection::Model(ModelRef::Component(component)) => {
                bind_unique_service(key, component, service_key)
            }
            Selection::Requirements(requirements) => {
                // Verify the binding is unique, but keep the requirements so
                // their arguments survive resolution.
                if let Some(component) = requirements.models.concrete().cloned() {
                    bind_unique_service(key, component, service_key)?;
                }
                Ok(Selection::Requirements(requirements))
            }
            Selection::Model(ModelRef::Service(selected)) => {
                if selected.fulfills(service_key) {
                    Ok(Selection::Model(ModelRef::Service(selected)))
                } else {
                    Err(ResolutionError::InvalidSelection {
                        key: key.to_string(),
                        reason: format!("service '{}' does not fulfill it", selected.name),
                    })
                }
            }
            Selection::BoundService { component, service } => {
                if service.fulfills(service_key) {
                    Ok(Selection::BoundService { component, service })
                } else {
                    Err(ResolutionError::InvalidSelection {
                        key: key.to_string(),
                        reason: format!("bound service '{}' does not fulfill it", service.name),
                    })
                }
            }
            other @ (Selection::Nothing | Selection::Name(_)) => Ok(other),
        },
    }
}

/// Resolves the unique service of `component` fulfilling `service_key`.
fn bind_unique_service(
    key: &SelectionKey,
    component: ComponentModel,
    service_key: &Arc<DataServiceModel>,
) -> Result<Selection, ResolutionError> {
    let matches = component.services_fulfilling(service_key);
    match matches.len() {
        0 => Err(ResolutionError::InvalidSelection {
            key: key.to_string(),
            reason: format!("'{}' does not provide it", component.name()),
        }),
        1 => Ok(Selection::BoundService {
            service: Arc::clone(&matches[0].service),
            component,
        }),
        _ => Err(ResolutionError::AmbiguousService {
            component: component.name().to_string(),
            service: service_key.name.clone(),
            candidates: matches.iter().map(|p| p.service.name.clone()).collect(),
        }),
    }
}
