//! Composition instantiation.
//!
//! Expands a requirement into a task graph: children are picked through the
//! dependency injection, specializations re-enter the more specific
//! composition model, explicit connections are wired through each child's
//! port mapping, unconnected inputs are autoconnected, and exported ports
//! become forwarding edges.

use std::collections::BTreeMap;
use std::sync::Arc;

use synet_core::error::InstantiationError;
use synet_core::types::{
    ChildSpec, CompositionModel, ConnectionPolicy, InstanceModel, Port, PortDirection, TaskId,
};
use synet_core::ModelCatalog;
use synet_inject::{ComponentSelection, DependencyInjection, InstanceRequirements};
use synet_plan::{Plan, PlanDelta, Transaction};

/// What an instantiation pass produced.
#[derive(Debug)]
pub struct InstantiationResult {
    /// The root task of the instantiated graph.
    pub root: TaskId,
    /// The committed plan difference.
    pub delta: PlanDelta,
}

/// Expands requirements into task graphs against a model catalog.
pub struct Instantiator<'a> {
    catalog: &'a ModelCatalog,
}

impl<'a> Instantiator<'a> {
    /// Creates an instantiator over `catalog`.
    pub fn new(catalog: &'a ModelCatalog) -> Self {
        Instantiator { catalog }
    }

    /// Instantiates `requirements` into `plan` under the given injection.
    ///
    /// The rewrite is staged and committed atomically; on error the plan is
    /// left untouched.
    pub fn instantiate(
        &self,
        plan: &mut Plan,
        requirements: &InstanceRequirements,
        di: &DependencyInjection,
    ) -> Result<InstantiationResult, InstantiationError> {
        let span = synet_core::diag::pass_span("instantiate");
        let _guard = span.enter();

        let mut txn = Transaction::new(plan);
        let di = di
            .clone()
            .merged(&requirements.selections)?
            .resolve()?;
        let selection = di.component_model_for(None, requirements, self.catalog)?;
        let root = self.instantiate_model(txn.plan_mut(), &selection.model, &di)?;
        apply_selection(txn.plan_mut(), root, &selection);
        apply_requirements(txn.plan_mut(), root, requirements);
        let delta = txn.commit(plan);
        Ok(InstantiationResult { root, delta })
    }

    fn instantiate_model(
        &self,
        plan: &mut Plan,
        model: &InstanceModel,
        di: &DependencyInjection,
    ) -> Result<TaskId, InstantiationError> {
        match model {
            InstanceModel::Composition(composition) => {
                self.instantiate_composition(plan, composition, di)
            }
            other => Ok(plan.add_task(other.clone())),
        }
    }

    fn instantiate_composition(
        &self,
        plan: &mut Plan,
        composition: &Arc<CompositionModel>,
        di: &DependencyInjection,
    ) -> Result<TaskId, InstantiationError> {
        let di = di.resolve()?;
        let mut composition = Arc::clone(composition);

        // Pick children, re-entering the specialized model when the explicit
        // selections match a table entry. The visited list keeps matching
        // idempotent: a model is never entered twice.
        let mut visited = vec![composition.name.clone()];
        let mut selections = self.select_children(&composition, &di)?;
        while let Some(target) = matching_specialization(&composition, &selections) {
            if visited.iter().any(|name| name == &target) {
                break;
            }
            tracing::debug!(
                pass = "instantiate",
                from = %composition.name,
                to = %target,
                "selections match specialization"
            );
            composition = self
                .catalog
                .composition(&target)
                .map_err(synet_core::error::ResolutionError::from)?;
            visited.push(composition.name.clone());
            selections = self.select_children(&composition, &di)?;
        }

        let root = plan.add_task(InstanceModel::Composition(Arc::clone(&composition)));

        // Instantiate children, skipping optional ones that stayed abstract.
        let mut children: BTreeMap<String, TaskId> = BTreeMap::new();
        for (child_name, spec) in &composition.children {
            let selection = &selections[child_name];
            if spec.optional && (selection.model.is_proxy() || selection.explicitly_nothing) {
                tracing::debug!(
                    pass = "instantiate",
                    composition = %composition.name,
                    child = %child_name,
                    "optional child left abstract, dropped"
                );
                continue;
            }
            let child_di = di.project_child(child_name);
            let child_id = self.instantiate_model(plan, &selection.model, &child_di)?;
            apply_selection(plan, child_id, selection);
            plan.dependencies.add_child(root, child_id, child_name.clone());
            children.insert(child_name.clone(), child_id);
        }

        self.wire_explicit_connections(plan, &composition, &selections, &children)?;
        self.autoconnect(plan, &composition, &selections, &children)?;
        self.forward_exports(plan, root, &composition, &selections, &children)?;

        Ok(root)
    }

    fn select_children(
        &self,
        composition: &CompositionModel,
        di: &DependencyInjection,
    ) -> Result<BTreeMap<String, ComponentSelection>, InstantiationError> {
        let mut selections = BTreeMap::new();
        for (child_name, spec) in &composition.children {
            let requirements = InstanceRequirements::from_models(spec.models.iter().cloned())?;
            let selection = di.component_model_for(Some(child_name), &requirements, self.catalog)?;
            selections.insert(child_name.clone(), selection);
        }
        Ok(selections)
    }

    fn wire_explicit_connections(
        &self,
        plan: &mut Plan,
        composition: &CompositionModel,
        selections: &BTreeMap<String, ComponentSelection>,
        children: &BTreeMap<String, TaskId>,
    ) -> Result<(), InstantiationError> {
        for connection in &composition.connections {
            // Connections to dropped optional children are dropped with them.
            let (Some(&from_id), Some(&to_id)) = (
                children.get(&connection.from_child),
                children.get(&connection.to_child),
            ) else {
                continue;
            };
            for ((from_port, to_port), policy) in &connection.ports {
                let source = resolve_child_port(
                    composition,
                    &connection.from_child,
                    &selections[&connection.from_child],
                    from_port,
                    PortDirection::Output,
                )?;
                let sink = resolve_child_port(
                    composition,
                    &connection.to_child,
                    &selections[&connection.to_child],
                    to_port,
                    PortDirection::Input,
                )?;
                if !source.data_type.is_empty()
                    && !sink.data_type.is_empty()
                    && !self.catalog.compatible_types(&source.data_type, &sink.data_type)
                {
                    return Err(InstantiationError::PortTypeMismatch {
                        composition: composition.name.clone(),
                        from: connection.from_child.clone(),
                        from_port: source.name,
                        from_type: source.data_type,
                        to: connection.to_child.clone(),
                        to_port: sink.name,
                        to_type: sink.data_type,
                    });
                }
                plan.flow
                    .add_connection(from_id, to_id, source.name, sink.name, *policy);
            }
        }
        Ok(())
    }

    /// Connects every unconnected input port to the unique type-compatible
    /// output on a sibling. Candidate sets with several entries are narrowed
    /// by name identity, then by the input port containing the output
    /// child's name; if neither rule leaves exactly one candidate, the
    /// connection is ambiguous.
    fn autoconnect(
        &self,
        plan: &mut Plan,
        composition: &CompositionModel,
        selections: &BTreeMap<String, ComponentSelection>,
        children: &BTreeMap<String, TaskId>,
    ) -> Result<(), InstantiationError> {
        for (child_name, &child_id) in children {
            let ports = selections[child_name].model.ports();
            let connected = plan.flow.connected_input_ports(child_id);
            for input in ports.iter().filter(|p| p.direction == PortDirection::Input) {
                if input.data_type.is_empty() || connected.contains(&input.name) {
                    continue;
                }
                if is_exported_input(composition, selections, child_name, &input.name) {
                    continue;
                }
                let mut candidates: Vec<(String, TaskId, Port)> = Vec::new();
                for (sibling_name, &sibling_id) in children {
                    if sibling_name == child_name {
                        continue;
                    }
                    for output in selections[sibling_name]
                        .model
                        .ports()
                        .iter()
                        .filter(|p| p.direction == PortDirection::Output)
                    {
                        if !output.data_type.is_empty()
                            && self.catalog.compatible_types(&output.data_type, &input.data_type)
                        {
                            candidates.push((sibling_name.clone(), sibling_id, output.clone()));
                        }
                    }
                }
                let chosen = match candidates.len() {
                    0 => continue,
                    1 => &candidates[0],
                    _ => {
                        let by_name: Vec<_> = candidates
                            .iter()
                            .filter(|(_, _, output)| output.name == input.name)
                            .collect();
                        if by_name.len() == 1 {
                            by_name[0]
                        } else {
                            let by_child: Vec<_> = candidates
                                .iter()
                                .filter(|(sibling, _, _)| input.name.contains(sibling.as_str()))
                                .collect();
                            if by_child.len() == 1 {
                                by_child[0]
                            } else {
                                return Err(InstantiationError::AmbiguousAutoConnection {
                                    composition: composition.name.clone(),
                                    child: child_name.clone(),
                                    port: input.name.clone(),
                                    candidates: candidates
                                        .iter()
                                        .map(|(sibling, _, output)| {
                                            format!("{sibling}.{}", output.name)
                                        })
                                        .collect(),
                                });
                            }
                        }
                    }
                };
                let (sibling_name, sibling_id, output) = chosen;
                tracing::debug!(
                    pass = "instantiate",
                    composition = %composition.name,
                    from = %format!("{sibling_name}.{}", output.name),
                    to = %format!("{child_name}.{}", input.name),
                    "autoconnected"
                );
                plan.flow.add_connection(
                    *sibling_id,
                    child_id,
                    output.name.clone(),
                    input.name.clone(),
                    ConnectionPolicy::Data,
                );
            }
        }
        Ok(())
    }

    /// Adds forwarding edges for exported ports so external peers of the
    /// composition see the child's stream.
    fn forward_exports(
        &self,
        plan: &mut Plan,
        root: TaskId,
        composition: &CompositionModel,
        selections: &BTreeMap<String, ComponentSelection>,
        children: &BTreeMap<String, TaskId>,
    ) -> Result<(), InstantiationError> {
        for export in &composition.exports {
            let Some(&child_id) = children.get(&export.child) else {
                continue;
            };
            let port = resolve_child_port(
                composition,
                &export.child,
                &selections[&export.child],
                &export.child_port,
                export.direction,
            )?;
            match export.direction {
                PortDirection::Output => plan.flow.add_connection(
                    child_id,
                    root,
                    port.name,
                    export.name.clone(),
                    ConnectionPolicy::Data,
                ),
                PortDirection::Input => plan.flow.add_connection(
                    root,
                    child_id,
                    export.name.clone(),
                    port.name,
                    ConnectionPolicy::Data,
                ),
            }
        }
        Ok(())
    }
}

/// Applies a child selection's accumulated requirements to its task.
fn apply_selection(plan: &mut Plan, task: TaskId, selection: &ComponentSelection) {
    apply_requirements(plan, task, &selection.requirements);
}

fn apply_requirements(plan: &mut Plan, task: TaskId, requirements: &InstanceRequirements) {
    let Some(instance) = plan.task_mut(task) else {
        return;
    };
    for (key, value) in &requirements.arguments {
        instance
            .arguments
            .entry(key.clone())
            .or_insert_with(|| value.clone());
    }
    if instance.runtime_name.is_none() {
        instance.runtime_name = requirements.runtime_name.clone();
    }
    for hint in &requirements.hints {
        if !instance.deployment_hints.contains(hint) {
            instance.deployment_hints.push(hint.clone());
        }
    }
    if instance.deployment_group.is_none() {
        instance.deployment_group = requirements.deployment_group.clone();
    }
}

/// The first specialization whose constraints are met by explicit child
/// selections. Matching considers explicit selections only, so applying a
/// specialization can never widen the selection.
fn matching_specialization(
    composition: &CompositionModel,
    selections: &BTreeMap<String, ComponentSelection>,
) -> Option<String> {
    composition
        .specializations
        .iter()
        .find(|specialization| {
            specialization.constraints.iter().all(|(child, models)| {
                selections.get(child).is_some_and(|selection| {
                    selection.from_explicit
                        && models.iter().all(|m| selection.model.fulfills_ref(m))
                })
            })
        })
        .map(|specialization| specialization.target.clone())
}

/// Whether `port` of `child` is fed from the composition boundary.
fn is_exported_input(
    composition: &CompositionModel,
    selections: &BTreeMap<String, ComponentSelection>,
    child: &str,
    port: &str,
) -> bool {
    composition.exports.iter().any(|export| {
        export.direction == PortDirection::Input
            && export.child == child
            && selections
                .get(child)
                .and_then(|selection| {
                    resolve_child_port(
                        composition,
                        child,
                        selection,
                        &export.child_port,
                        PortDirection::Input,
                    )
                    .ok()
                })
                .is_some_and(|p| p.name == port)
    })
}

/// Resolves a declared child port name to the selected component's concrete
/// port, applying the port mapping of the required service that declares it.
fn resolve_child_port(
    composition: &CompositionModel,
    child: &str,
    selection: &ComponentSelection,
    port: &str,
    direction: PortDirection,
) -> Result<Port, InstantiationError> {
    let ports = selection.model.ports();
    // The declared name may already be a concrete port of the selection.
    if let Some(found) = ports
        .iter()
        .find(|p| p.name == port && p.direction == direction)
    {
        return Ok(found.clone());
    }

    // Otherwise it names a port of one of the child's required services;
    // map it through the selection's port mapping.
    let spec = child_spec(composition, child)?;
    let mut mapped: Vec<Port> = Vec::new();
    for service in services_of(spec) {
        let Some(service_port) = service
            .ports
            .iter()
            .find(|p| p.name == port && p.direction == direction)
        else {
            continue;
        };
        let concrete_name = concrete_port_name(selection, &service, port);
        if let Some(found) = ports
            .iter()
            .find(|p| p.name == concrete_name && p.direction == direction)
        {
            if !mapped.iter().any(|p| p.name == found.name) {
                mapped.push(found.clone());
            }
        } else if !mapped.iter().any(|p| p.name == concrete_name) {
            // Proxy selections expose service ports as declared.
            mapped.push(Port {
                name: concrete_name,
                direction,
                data_type: service_port.data_type.clone(),
            });
        }
    }
    match mapped.len() {
        0 => Err(InstantiationError::MissingPort {
            composition: composition.name.clone(),
            child: child.to_string(),
            port: port.to_string(),
            direction: match direction {
                PortDirection::Input => "input",
                PortDirection::Output => "output",
            },
        }),
        1 => Ok(mapped.remove(0)),
        _ => Err(InstantiationError::AmbiguousChildConnection {
            composition: composition.name.clone(),
            child: child.to_string(),
            port: port.to_string(),
        }),
    }
}

fn child_spec<'c>(
    composition: &'c CompositionModel,
    child: &str,
) -> Result<&'c ChildSpec, InstantiationError> {
    composition
        .children
        .get(child)
        .ok_or_else(|| InstantiationError::UnknownChild {
            composition: composition.name.clone(),
            child: child.to_string(),
        })
}

fn services_of(spec: &ChildSpec) -> Vec<Arc<synet_core::types::DataServiceModel>> {
    spec.models
        .iter()
        .filter_map(|m| match m {
            synet_core::types::ModelRef::Service(s) => Some(Arc::clone(s)),
            synet_core::types::ModelRef::Component(_) => None,
        })
        .collect()
}

/// The concrete name `port` of `service` takes on the selected component.
fn concrete_port_name(
    selection: &ComponentSelection,
    service: &Arc<synet_core::types::DataServiceModel>,
    port: &str,
) -> String {
    match &selection.model {
        InstanceModel::Task(task) => {
            let component = synet_core::types::ComponentModel::Task(Arc::clone(task));
            component
                .port_mapping_for(service)
                .and_then(|mapping| mapping.get(port).cloned())
                .unwrap_or_else(|| port.to_string())
        }
        InstanceModel::Composition(composition) => {
            let component =
                synet_core::types::ComponentModel::Composition(Arc::clone(composition));
            component
                .port_mapping_for(service)
                .and_then(|mapping| mapping.get(port).cloned())
                .unwrap_or_else(|| port.to_string())
        }
        InstanceModel::Deployment(_) | InstanceModel::Proxy(_) => port.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synet_core::descriptor::ModelRecord;
    use synet_core::types::Value;
    use synet_inject::{Selection, SelectionKey};

    fn catalog_from(json: &str) -> ModelCatalog {
        let records: Vec<ModelRecord> = serde_json::from_str(json).unwrap();
        let catalog = ModelCatalog::new();
        catalog.load_records(records).unwrap();
        catalog
    }

    fn localization_catalog() -> ModelCatalog {
        catalog_from(
            r#"[
            { "kind": "task_context", "name": "Imu",
              "ports": [{ "name": "samples", "direction": "output", "data_type": "imu" }] },
            { "kind": "task_context", "name": "Filter",
              "ports": [
                { "name": "samples", "direction": "input", "data_type": "imu" },
                { "name": "pose", "direction": "output", "data_type": "pose" }
              ] },
            { "kind": "composition", "name": "Localization",
              "children": [
                { "name": "imu", "models": ["Imu"] },
                { "name": "filter", "models": ["Filter"] }
              ],
              "exports": [
                { "name": "pose", "direction": "output",
                  "child": "filter", "child_port": "pose" }
              ] }
        ]"#,
        )
    }

    #[test]
    fn test_instantiates_composition_with_autoconnect() {
        let catalog = localization_catalog();
        let composition = catalog.composition("Localization").unwrap();
        let mut plan = Plan::new();
        let instantiator = Instantiator::new(&catalog);

        let requirements =
            InstanceRequirements::from_model(synet_core::types::ModelRef::composition(composition));
        let result = instantiator
            .instantiate(&mut plan, &requirements, &DependencyInjection::new())
            .unwrap();

        // Root composition plus two children.
        assert_eq!(plan.len(), 3);
        let children = plan.dependencies.children_of(result.root);
        assert_eq!(children.len(), 2);

        // Autoconnect wired imu.samples -> filter.samples.
        let imu = children.iter().find(|(_, role)| *role == "imu").unwrap().0;
        let filter = children.iter().find(|(_, role)| *role == "filter").unwrap().0;
        let map = plan.flow.connections_between(imu, filter).unwrap();
        assert!(map.contains_key(&("samples".to_string(), "samples".to_string())));

        // Export forwards filter.pose to the composition boundary.
        let export = plan.flow.connections_between(filter, result.root).unwrap();
        assert!(export.contains_key(&("pose".to_string(), "pose".to_string())));
    }

    #[test]
    fn test_autoconnect_ambiguity_is_an_error() {
        let catalog = catalog_from(
            r#"[
            { "kind": "task_context", "name": "SourceA",
              "ports": [{ "name": "out", "direction": "output", "data_type": "imu" }] },
            { "kind": "task_context", "name": "SourceB",
              "ports": [{ "name": "out", "direction": "output", "data_type": "imu" }] },
            { "kind": "task_context", "name": "Sink",
              "ports": [{ "name": "data", "direction": "input", "data_type": "imu" }] },
            { "kind": "composition", "name": "Broken",
              "children": [
                { "name": "a", "models": ["SourceA"] },
                { "name": "b", "models": ["SourceB"] },
                { "name": "sink", "models": ["Sink"] }
              ] }
        ]"#,
        );
        let composition = catalog.composition("Broken").unwrap();
        let mut plan = Plan::new();
        let instantiator = Instantiator::new(&catalog);

        let requirements =
            InstanceRequirements::from_model(synet_core::types::ModelRef::composition(composition));
        let err = instantiator
            .instantiate(&mut plan, &requirements, &DependencyInjection::new())
            .unwrap_err();
        assert!(matches!(
            err,
            InstantiationError::AmbiguousAutoConnection { .. }
        ));
        // The failed pass left the plan untouched.
        assert!(plan.is_empty());
    }

    #[test]
    fn test_autoconnect_tie_break_by_port_name() {
        let catalog = catalog_from(
            r#"[
            { "kind": "task_context", "name": "Odometry",
              "ports": [{ "name": "odometry_samples", "direction": "output", "data_type": "d" }] },
            { "kind": "task_context", "name": "Gps",
              "ports": [{ "name": "position", "direction": "output", "data_type": "d" }] },
            { "kind": "task_context", "name": "Fusion",
              "ports": [
                { "name": "position", "direction": "input", "data_type": "d" },
                { "name": "odometry_samples", "direction": "input", "data_type": "d" }
              ] },
            { "kind": "composition", "name": "Nav",
              "children": [
                { "name": "odometry", "models": ["Odometry"] },
                { "name": "gps", "models": ["Gps"] },
                { "name": "fusion", "models": ["Fusion"] }
              ] }
        ]"#,
        );
        let composition = catalog.composition("Nav").unwrap();
        let mut plan = Plan::new();
        let instantiator = Instantiator::new(&catalog);
        let requirements =
            InstanceRequirements::from_model(synet_core::types::ModelRef::composition(composition));
        let result = instantiator
            .instantiate(&mut plan, &requirements, &DependencyInjection::new())
            .unwrap();

        let children = plan.dependencies.children_of(result.root);
        let by_role = |role: &str| children.iter().find(|(_, r)| *r == role).unwrap().0;
        let gps = by_role("gps");
        let odometry = by_role("odometry");
        let fusion = by_role("fusion");

        // Same-name rule wires gps.position -> fusion.position and
        // odometry.odometry_samples -> fusion.odometry_samples.
        assert!(plan
            .flow
            .connections_between(gps, fusion)
            .unwrap()
            .contains_key(&("position".to_string(), "position".to_string())));
        assert!(plan
            .flow
            .connections_between(odometry, fusion)
            .unwrap()
            .contains_key(&(
                "odometry_samples".to_string(),
                "odometry_samples".to_string()
            )));
    }

    #[test]
    fn test_optional_abstract_child_is_dropped() {
        let catalog = catalog_from(
            r#"[
            { "kind": "data_service", "name": "debug_sink",
              "ports": [{ "name": "data", "direction": "input", "data_type": "d" }] },
            { "kind": "task_context", "name": "Producer",
              "ports": [{ "name": "data", "direction": "output", "data_type": "d" }] },
            { "kind": "composition", "name": "Pipeline",
              "children": [
                { "name": "producer", "models": ["Producer"] },
                { "name": "debug", "models": ["debug_sink"], "optional": true }
              ] }
        ]"#,
        );
        let composition = catalog.composition("Pipeline").unwrap();
        let mut plan = Plan::new();
        let instantiator = Instantiator::new(&catalog);
        let requirements =
            InstanceRequirements::from_model(synet_core::types::ModelRef::composition(composition));
        let result = instantiator
            .instantiate(&mut plan, &requirements, &DependencyInjection::new())
            .unwrap();

        // Only producer remains; the optional service child had no concrete
        // selection.
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.dependencies.children_of(result.root).len(), 1);
    }

    #[test]
    fn test_mandatory_service_child_becomes_proxy() {
        let catalog = catalog_from(
            r#"[
            { "kind": "data_service", "name": "pose_source",
              "ports": [{ "name": "pose", "direction": "output", "data_type": "pose" }] },
            { "kind": "composition", "name": "Consumer",
              "children": [
                { "name": "pose", "models": ["pose_source"] }
              ] }
        ]"#,
        );
        let composition = catalog.composition("Consumer").unwrap();
        let mut plan = Plan::new();
        let instantiator = Instantiator::new(&catalog);
        let requirements =
            InstanceRequirements::from_model(synet_core::types::ModelRef::composition(composition));
        let result = instantiator
            .instantiate(&mut plan, &requirements, &DependencyInjection::new())
            .unwrap();

        let children = plan.dependencies.children_of(result.root);
        assert_eq!(children.len(), 1);
        let child = plan.task(children[0].0).unwrap();
        assert!(child.is_abstract());
        assert_eq!(child.model.name(), "proxy<pose_source>");
    }

    #[test]
    fn test_explicit_connection_uses_port_mapping() {
        let catalog = catalog_from(
            r#"[
            { "kind": "data_service", "name": "imu_source",
              "ports": [{ "name": "samples", "direction": "output", "data_type": "imu" }] },
            { "kind": "task_context", "name": "Xsens",
              "ports": [{ "name": "calibrated_samples", "direction": "output", "data_type": "imu" }],
              "provides": [{ "service": "imu_source",
                             "port_mappings": { "samples": "calibrated_samples" } }] },
            { "kind": "task_context", "name": "Filter",
              "ports": [{ "name": "samples", "direction": "input", "data_type": "imu" }] },
            { "kind": "composition", "name": "Attitude",
              "children": [
                { "name": "imu", "models": ["imu_source"] },
                { "name": "filter", "models": ["Filter"] }
              ],
              "connections": [
                { "from_child": "imu", "from_port": "samples",
                  "to_child": "filter", "to_port": "samples" }
              ] }
        ]"#,
        );
        let composition = catalog.composition("Attitude").unwrap();
        let xsens = catalog.task_context("Xsens").unwrap();
        let mut plan = Plan::new();
        let instantiator = Instantiator::new(&catalog);

        let mut di = DependencyInjection::new();
        di.add_explicit(
            SelectionKey::name("imu"),
            Selection::model(synet_core::types::ModelRef::task(xsens)),
        )
        .unwrap();

        let requirements =
            InstanceRequirements::from_model(synet_core::types::ModelRef::composition(composition));
        let result = instantiator.instantiate(&mut plan, &requirements, &di).unwrap();

        let children = plan.dependencies.children_of(result.root);
        let imu = children.iter().find(|(_, r)| *r == "imu").unwrap().0;
        let filter = children.iter().find(|(_, r)| *r == "filter").unwrap().0;

        // The service port 'samples' was mapped to Xsens' concrete
        // 'calibrated_samples'.
        let map = plan.flow.connections_between(imu, filter).unwrap();
        assert!(map.contains_key(&(
            "calibrated_samples".to_string(),
            "samples".to_string()
        )));
    }

    #[test]
    fn test_specialization_reenters_specialized_model() {
        let catalog = catalog_from(
            r#"[
            { "kind": "task_context", "name": "Camera",
              "ports": [{ "name": "image", "direction": "output", "data_type": "frame" }] },
            { "kind": "task_context", "name": "StereoCamera", "supermodel": "Camera",
              "ports": [{ "name": "depth", "direction": "output", "data_type": "depth" }] },
            { "kind": "task_context", "name": "Detector",
              "ports": [{ "name": "image", "direction": "input", "data_type": "frame" }] },
            { "kind": "task_context", "name": "DepthDetector",
              "ports": [
                { "name": "image", "direction": "input", "data_type": "frame" },
                { "name": "depth", "direction": "input", "data_type": "depth" }
              ] },
            { "kind": "composition", "name": "PerceptionStereo",
              "children": [
                { "name": "camera", "models": ["StereoCamera"] },
                { "name": "detector", "models": ["DepthDetector"] }
              ] },
            { "kind": "composition", "name": "Perception",
              "children": [
                { "name": "camera", "models": ["Camera"] },
                { "name": "detector", "models": ["Detector"] }
              ],
              "specializations": [
                { "constraints": { "camera": ["StereoCamera"] },
                  "target": "PerceptionStereo" }
              ] }
        ]"#,
        );
        let composition = catalog.composition("Perception").unwrap();
        let stereo = catalog.task_context("StereoCamera").unwrap();
        let mut plan = Plan::new();
        let instantiator = Instantiator::new(&catalog);

        let mut di = DependencyInjection::new();
        di.add_explicit(
            SelectionKey::name("camera"),
            Selection::model(synet_core::types::ModelRef::task(stereo)),
        )
        .unwrap();

        let requirements =
            InstanceRequirements::from_model(synet_core::types::ModelRef::composition(composition));
        let result = instantiator.instantiate(&mut plan, &requirements, &di).unwrap();

        let root = plan.task(result.root).unwrap();
        assert_eq!(root.model.name(), "PerceptionStereo");

        // Without the explicit camera selection the base model is kept.
        let mut plan2 = Plan::new();
        let requirements2 = InstanceRequirements::from_model(
            synet_core::types::ModelRef::composition(catalog.composition("Perception").unwrap()),
        );
        let result2 = instantiator
            .instantiate(&mut plan2, &requirements2, &DependencyInjection::new())
            .unwrap();
        assert_eq!(plan2.task(result2.root).unwrap().model.name(), "Perception");
    }

    #[test]
    fn test_requirement_arguments_reach_the_root_task() {
        let catalog = catalog_from(
            r#"[
            { "kind": "task_context", "name": "Driver",
              "arguments": [{ "name": "device" }] }
        ]"#,
        );
        let driver = catalog.task_context("Driver").unwrap();
        let mut plan = Plan::new();
        let instantiator = Instantiator::new(&catalog);

        let requirements =
            InstanceRequirements::from_model(synet_core::types::ModelRef::task(driver))
                .with_argument("device", Value::from("/dev/ttyS0"));
        let result = instantiator
            .instantiate(&mut plan, &requirements, &DependencyInjection::new())
            .unwrap();

        let task = plan.task(result.root).unwrap();
        assert_eq!(task.arguments["device"], Value::from("/dev/ttyS0"));
        assert!(task.fully_instantiated());
    }
}
