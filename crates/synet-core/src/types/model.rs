//! Model definitions for the component catalog.
//!
//! Four model kinds exist: task contexts (leaf components with ports and
//! arguments), data services (interface-only contracts), compositions (named
//! children plus explicit wiring), and deployments (named slots on a process
//! server). Models are shared through `Arc` handles and identified by
//! (kind, name); the `fulfills` relation between them is a partial order with
//! port mappings composing along the fulfillment path.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::types::{ConnectionPolicy, Port, PortDirection, Value};

/// A data service fulfilled by a model, together with the port mapping from
/// the service's port names to the provider's port names. Identity entries
/// may be omitted from the mapping.
#[derive(Clone, Debug)]
pub struct ProvidedService {
    /// The fulfilled service.
    pub service: Arc<DataServiceModel>,
    /// Service port name to provider port name.
    pub port_mappings: BTreeMap<String, String>,
}

impl ProvidedService {
    /// Provision without any port renaming.
    pub fn plain(service: Arc<DataServiceModel>) -> Self {
        ProvidedService {
            service,
            port_mappings: BTreeMap::new(),
        }
    }

    /// Port mapping from `target`'s port names to the provider's port names,
    /// composed along the service parent chain. `None` if this provision does
    /// not reach `target`.
    pub fn mapping_for(&self, target: &DataServiceModel) -> Option<BTreeMap<String, String>> {
        let to_service = self.service.port_mapping_to(target)?;
        Some(compose_mappings(&to_service, &self.port_mappings))
    }
}

/// Composes `a_to_b` with `b_to_c`, treating missing `b_to_c` entries as
/// identity.
fn compose_mappings(
    a_to_b: &BTreeMap<String, String>,
    b_to_c: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    a_to_b
        .iter()
        .map(|(a, b)| {
            let c = b_to_c.get(b).cloned().unwrap_or_else(|| b.clone());
            (a.clone(), c)
        })
        .collect()
}

/// An interface-only model: ports plus the parent services it refines.
#[derive(Clone, Debug)]
pub struct DataServiceModel {
    /// Unique service name.
    pub name: String,
    /// Ports promised by the service.
    pub ports: Vec<Port>,
    /// Parent services this one refines, with port mappings.
    pub parents: Vec<ProvidedService>,
}

impl DataServiceModel {
    /// Creates a root service with the given ports.
    pub fn new(name: impl Into<String>, ports: Vec<Port>) -> Self {
        DataServiceModel {
            name: name.into(),
            ports,
            parents: Vec::new(),
        }
    }

    /// Whether this service fulfills `other` (reflexive, transitive over
    /// parents).
    pub fn fulfills(&self, other: &DataServiceModel) -> bool {
        self.port_mapping_to(other).is_some()
    }

    /// Port mapping from `target`'s port names to this service's port names.
    /// `None` when this service does not fulfill `target`.
    pub fn port_mapping_to(&self, target: &DataServiceModel) -> Option<BTreeMap<String, String>> {
        if self.name == target.name {
            return Some(
                target
                    .ports
                    .iter()
                    .map(|p| (p.name.clone(), p.name.clone()))
                    .collect(),
            );
        }
        for parent in &self.parents {
            if let Some(mapping) = parent.mapping_for(target) {
                return Some(mapping);
            }
        }
        None
    }

    /// This service plus its transitive parents.
    pub fn fulfilled_services(self: &Arc<Self>) -> Vec<Arc<DataServiceModel>> {
        let mut out = vec![Arc::clone(self)];
        let mut i = 0;
        while i < out.len() {
            let parents: Vec<_> = out[i]
                .parents
                .iter()
                .map(|p| Arc::clone(&p.service))
                .collect();
            for parent in parents {
                if !out.iter().any(|s| s.name == parent.name) {
                    out.push(parent);
                }
            }
            i += 1;
        }
        out
    }
}

/// Specification of one task-context argument.
#[derive(Clone, Debug, PartialEq)]
pub struct ArgumentSpec {
    /// Argument name.
    pub name: String,
    /// Whether instantiation requires a value.
    pub required: bool,
    /// Default used when no value is given.
    pub default: Option<Value>,
}

impl ArgumentSpec {
    /// A required argument without default.
    pub fn required(name: impl Into<String>) -> Self {
        ArgumentSpec {
            name: name.into(),
            required: true,
            default: None,
        }
    }

    /// An optional argument.
    pub fn optional(name: impl Into<String>) -> Self {
        ArgumentSpec {
            name: name.into(),
            required: false,
            default: None,
        }
    }
}

/// A leaf component: typed ports, arguments, and the services it provides.
#[derive(Clone, Debug)]
pub struct TaskContextModel {
    /// Unique task model name.
    pub name: String,
    /// Parent task model, if any.
    pub supermodel: Option<Arc<TaskContextModel>>,
    /// Ports declared on this model (inherited ports excluded).
    pub ports: Vec<Port>,
    /// Arguments declared on this model.
    pub arguments: Vec<ArgumentSpec>,
    /// Services provided by this model.
    pub provides: Vec<ProvidedService>,
}

impl TaskContextModel {
    /// Creates a root task-context model.
    pub fn new(name: impl Into<String>) -> Self {
        TaskContextModel {
            name: name.into(),
            supermodel: None,
            ports: Vec::new(),
            arguments: Vec::new(),
            provides: Vec::new(),
        }
    }

    /// Whether this model is `other` or derives from it.
    pub fn fulfills_task(&self, other: &TaskContextModel) -> bool {
        if self.name == other.name {
            return true;
        }
        let mut current = self.supermodel.as_deref();
        while let Some(model) = current {
            if model.name == other.name {
                return true;
            }
            current = model.supermodel.as_deref();
        }
        false
    }

    /// Ports declared on this model and its supermodel chain.
    pub fn all_ports(&self) -> Vec<Port> {
        let mut out = self.ports.clone();
        let mut current = self.supermodel.as_deref();
        while let Some(model) = current {
            for port in &model.ports {
                if !out.iter().any(|p| p.name == port.name && p.direction == port.direction) {
                    out.push(port.clone());
                }
            }
            current = model.supermodel.as_deref();
        }
        out
    }

    /// Arguments declared on this model and its supermodel chain.
    pub fn all_arguments(&self) -> Vec<ArgumentSpec> {
        let mut out = self.arguments.clone();
        let mut current = self.supermodel.as_deref();
        while let Some(model) = current {
            for arg in &model.arguments {
                if !out.iter().any(|a| a.name == arg.name) {
                    out.push(arg.clone());
                }
            }
            current = model.supermodel.as_deref();
        }
        out
    }

    /// Provided services declared on this model and its supermodel chain.
    pub fn all_provides(&self) -> Vec<ProvidedService> {
        let mut out = self.provides.clone();
        let mut current = self.supermodel.as_deref();
        while let Some(model) = current {
            out.extend(model.provides.iter().cloned());
            current = model.supermodel.as_deref();
        }
        out
    }
}

/// One child slot of a composition.
#[derive(Clone, Debug)]
pub struct ChildSpec {
    /// Models the selected child must fulfill.
    pub models: Vec<ModelRef>,
    /// Optional children are dropped when their selection stays abstract.
    pub optional: bool,
}

impl ChildSpec {
    /// A mandatory child requiring the given models.
    pub fn new(models: Vec<ModelRef>) -> Self {
        ChildSpec {
            models,
            optional: false,
        }
    }
}

/// Explicit port wiring between two children of a composition. Port names are
/// those of the children's required models; they are mapped to the selected
/// components' concrete names at instantiation time.
#[derive(Clone, Debug)]
pub struct ChildConnection {
    /// Name of the source child.
    pub from_child: String,
    /// Name of the sink child.
    pub to_child: String,
    /// (source port, sink port) pairs with their policies.
    pub ports: BTreeMap<(String, String), ConnectionPolicy>,
}

/// A composition port forwarded from one of its children.
#[derive(Clone, Debug)]
pub struct ExportedPort {
    /// Name of the port on the composition.
    pub name: String,
    /// Direction seen from the composition.
    pub direction: PortDirection,
    /// Child owning the forwarded port.
    pub child: String,
    /// Port name on the child (in the child's required-model namespace).
    pub child_port: String,
}

/// A specialization table entry: when every constrained child's selection
/// fulfills the listed models, the composition is re-instantiated as
/// `target`. Targets are referenced by name and resolved through the catalog,
/// keeping the model graph acyclic.
#[derive(Clone, Debug)]
pub struct Specialization {
    /// Child name to models the selection must fulfill.
    pub constraints: BTreeMap<String, Vec<ModelRef>>,
    /// Name of the specialized composition model.
    pub target: String,
}

/// A named group of children with explicit wiring and exported ports.
#[derive(Clone, Debug)]
pub struct CompositionModel {
    /// Unique composition name.
    pub name: String,
    /// Services provided by the composition itself.
    pub provides: Vec<ProvidedService>,
    /// Children by name.
    pub children: BTreeMap<String, ChildSpec>,
    /// Explicit child-to-child connections.
    pub connections: Vec<ChildConnection>,
    /// Ports exported to the composition boundary.
    pub exports: Vec<ExportedPort>,
    /// Specialization table.
    pub specializations: Vec<Specialization>,
}

impl CompositionModel {
    /// Creates an empty composition model.
    pub fn new(name: impl Into<String>) -> Self {
        CompositionModel {
            name: name.into(),
            provides: Vec::new(),
            children: BTreeMap::new(),
            connections: Vec::new(),
            exports: Vec::new(),
            specializations: Vec::new(),
        }
    }
}

/// A named physical configuration: task slots hosted by one process.
#[derive(Clone, Debug)]
pub struct DeploymentModel {
    /// Unique deployment name.
    pub name: String,
    /// Slot name to the task model deployed in that slot.
    pub slots: BTreeMap<String, Arc<TaskContextModel>>,
}

impl DeploymentModel {
    /// Creates an empty deployment model.
    pub fn new(name: impl Into<String>) -> Self {
        DeploymentModel {
            name: name.into(),
            slots: BTreeMap::new(),
        }
    }
}

/// A concrete component model: task context or composition.
#[derive(Clone, Debug)]
pub enum ComponentModel {
    /// Leaf task context.
    Task(Arc<TaskContextModel>),
    /// Composition of children.
    Composition(Arc<CompositionModel>),
}

impl ComponentModel {
    /// The model's name.
    pub fn name(&self) -> &str {
        match self {
            ComponentModel::Task(m) => &m.name,
            ComponentModel::Composition(m) => &m.name,
        }
    }

    /// Services provided by the component, including inherited ones.
    pub fn provides(&self) -> Vec<ProvidedService> {
        match self {
            ComponentModel::Task(m) => m.all_provides(),
            ComponentModel::Composition(m) => m.provides.clone(),
        }
    }

    /// The component's external ports.
    pub fn ports(&self) -> Vec<Port> {
        match self {
            ComponentModel::Task(m) => m.all_ports(),
            ComponentModel::Composition(m) => m
                .exports
                .iter()
                .map(|e| Port {
                    name: e.name.clone(),
                    direction: e.direction,
                    // Export types are resolved against the child at
                    // instantiation time; the boundary port carries no type
                    // of its own.
                    data_type: String::new(),
                })
                .collect(),
        }
    }

    /// Provisions of this component that fulfill `service`.
    pub fn services_fulfilling(&self, service: &DataServiceModel) -> Vec<ProvidedService> {
        self.provides()
            .into_iter()
            .filter(|p| p.service.fulfills(service))
            .collect()
    }

    /// Port mapping from `service`'s port names to this component's port
    /// names, if the component fulfills it unambiguously through its first
    /// matching provision.
    pub fn port_mapping_for(&self, service: &DataServiceModel) -> Option<BTreeMap<String, String>> {
        self.provides()
            .into_iter()
            .find_map(|p| p.mapping_for(service))
    }

    /// Whether this component fulfills `other`.
    pub fn fulfills(&self, other: &ModelRef) -> bool {
        match other {
            ModelRef::Service(service) => !self.services_fulfilling(service).is_empty(),
            ModelRef::Component(ComponentModel::Task(task)) => match self {
                ComponentModel::Task(m) => m.fulfills_task(task),
                ComponentModel::Composition(_) => false,
            },
            ModelRef::Component(ComponentModel::Composition(composition)) => match self {
                ComponentModel::Composition(m) => m.name == composition.name,
                ComponentModel::Task(_) => false,
            },
        }
    }

    /// Every model this component fulfills: itself, its supermodel chain, and
    /// the transitive closure of provided services.
    pub fn fulfilled_models(&self) -> Vec<ModelRef> {
        let mut out = vec![ModelRef::Component(self.clone())];
        if let ComponentModel::Task(task) = self {
            let mut current = task.supermodel.clone();
            while let Some(model) = current {
                out.push(ModelRef::Component(ComponentModel::Task(Arc::clone(&model))));
                current = model.supermodel.clone();
            }
        }
        for provided in self.provides() {
            for service in provided.service.fulfilled_services() {
                let re = ModelRef::Service(service);
                if !out.contains(&re) {
                    out.push(re);
                }
            }
        }
        out
    }
}

/// Reference to any catalog model usable as a requirement or selection key.
#[derive(Clone, Debug)]
pub enum ModelRef {
    /// A data service.
    Service(Arc<DataServiceModel>),
    /// A component model.
    Component(ComponentModel),
}

impl ModelRef {
    /// The referenced model's name.
    pub fn name(&self) -> &str {
        match self {
            ModelRef::Service(m) => &m.name,
            ModelRef::Component(m) => m.name(),
        }
    }

    /// Short model-kind tag, for error messages and ordering.
    pub fn kind(&self) -> &'static str {
        match self {
            ModelRef::Service(_) => "service",
            ModelRef::Component(ComponentModel::Task(_)) => "task",
            ModelRef::Component(ComponentModel::Composition(_)) => "composition",
        }
    }

    /// Whether the referenced model fulfills `other`.
    pub fn fulfills(&self, other: &ModelRef) -> bool {
        match (self, other) {
            (ModelRef::Service(a), ModelRef::Service(b)) => a.fulfills(b),
            (ModelRef::Service(_), ModelRef::Component(_)) => false,
            (ModelRef::Component(a), _) => a.fulfills(other),
        }
    }

    /// Convenience constructor from a task model.
    pub fn task(model: Arc<TaskContextModel>) -> Self {
        ModelRef::Component(ComponentModel::Task(model))
    }

    /// Convenience constructor from a composition model.
    pub fn composition(model: Arc<CompositionModel>) -> Self {
        ModelRef::Component(ComponentModel::Composition(model))
    }

    /// Convenience constructor from a service model.
    pub fn service(model: Arc<DataServiceModel>) -> Self {
        ModelRef::Service(model)
    }
}

// Model identity is (kind, name): names are unique per kind in a catalog.

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.name() == other.name()
    }
}

impl Eq for ModelRef {}

impl PartialOrd for ModelRef {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModelRef {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.kind()
            .cmp(other.kind())
            .then_with(|| self.name().cmp(other.name()))
    }
}

impl Hash for ModelRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.name().hash(state);
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.name())
    }
}

/// A synthesized planning model standing in for "some task fulfilling this
/// service set". Resolved to a concrete deployed task later in the pipeline.
#[derive(Clone, Debug)]
pub struct ProxyModel {
    /// Synthesized name, derived from the fulfilled services.
    pub name: String,
    /// Services the eventual task must fulfill.
    pub services: Vec<Arc<DataServiceModel>>,
}

impl ProxyModel {
    /// Creates a proxy for the given service set.
    pub fn new(services: Vec<Arc<DataServiceModel>>) -> Self {
        let mut names: Vec<&str> = services.iter().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        ProxyModel {
            name: format!("proxy<{}>", names.join(",")),
            services,
        }
    }

    /// Union of the service port sets, using the services' own port names.
    pub fn ports(&self) -> Vec<Port> {
        let mut out: Vec<Port> = Vec::new();
        for service in &self.services {
            for port in &service.ports {
                if !out.iter().any(|p| p.name == port.name && p.direction == port.direction) {
                    out.push(port.clone());
                }
            }
        }
        out
    }

    /// Whether the proxied service set covers `other`.
    pub fn fulfills(&self, other: &ModelRef) -> bool {
        match other {
            ModelRef::Service(service) => self.services.iter().any(|s| s.fulfills(service)),
            ModelRef::Component(_) => false,
        }
    }
}

/// The model of a task instance inside a plan. Concrete models come from the
/// catalog; proxies are synthesized during planning; deployments appear as
/// execution agents once the deployer ran.
#[derive(Clone, Debug)]
pub enum InstanceModel {
    /// A concrete task context.
    Task(Arc<TaskContextModel>),
    /// A concrete composition.
    Composition(Arc<CompositionModel>),
    /// A deployment acting as execution agent.
    Deployment(Arc<DeploymentModel>),
    /// A service proxy placeholder.
    Proxy(Arc<ProxyModel>),
}

impl InstanceModel {
    /// The model's name.
    pub fn name(&self) -> &str {
        match self {
            InstanceModel::Task(m) => &m.name,
            InstanceModel::Composition(m) => &m.name,
            InstanceModel::Deployment(m) => &m.name,
            InstanceModel::Proxy(m) => &m.name,
        }
    }

    /// Whether this is a service proxy.
    pub fn is_proxy(&self) -> bool {
        matches!(self, InstanceModel::Proxy(_))
    }

    /// Whether this is a task context.
    pub fn is_task_context(&self) -> bool {
        matches!(self, InstanceModel::Task(_))
    }

    /// Whether this is a composition.
    pub fn is_composition(&self) -> bool {
        matches!(self, InstanceModel::Composition(_))
    }

    /// The instance's external ports.
    pub fn ports(&self) -> Vec<Port> {
        match self {
            InstanceModel::Task(m) => m.all_ports(),
            InstanceModel::Composition(m) => {
                ComponentModel::Composition(Arc::clone(m)).ports()
            }
            InstanceModel::Deployment(_) => Vec::new(),
            InstanceModel::Proxy(m) => m.ports(),
        }
    }

    /// Whether this instance's model fulfills `other`.
    pub fn fulfills_ref(&self, other: &ModelRef) -> bool {
        match self {
            InstanceModel::Task(m) => {
                ComponentModel::Task(Arc::clone(m)).fulfills(other)
            }
            InstanceModel::Composition(m) => {
                ComponentModel::Composition(Arc::clone(m)).fulfills(other)
            }
            InstanceModel::Deployment(_) => false,
            InstanceModel::Proxy(m) => m.fulfills(other),
        }
    }

    /// Every model reference this instance fulfills.
    pub fn fulfilled_models(&self) -> Vec<ModelRef> {
        match self {
            InstanceModel::Task(m) => ComponentModel::Task(Arc::clone(m)).fulfilled_models(),
            InstanceModel::Composition(m) => {
                ComponentModel::Composition(Arc::clone(m)).fulfilled_models()
            }
            InstanceModel::Deployment(_) => Vec::new(),
            InstanceModel::Proxy(m) => m
                .services
                .iter()
                .flat_map(|s| s.fulfilled_services())
                .map(ModelRef::Service)
                .collect(),
        }
    }

    /// Whether this instance can stand in for every model `other` fulfills.
    pub fn fulfills_instance(&self, other: &InstanceModel) -> bool {
        match other {
            InstanceModel::Task(m) => {
                self.fulfills_ref(&ModelRef::Component(ComponentModel::Task(Arc::clone(m))))
            }
            InstanceModel::Composition(m) => self.fulfills_ref(&ModelRef::Component(
                ComponentModel::Composition(Arc::clone(m)),
            )),
            InstanceModel::Deployment(m) => match self {
                InstanceModel::Deployment(own) => own.name == m.name,
                _ => false,
            },
            InstanceModel::Proxy(proxy) => proxy
                .services
                .iter()
                .all(|s| self.fulfills_ref(&ModelRef::Service(Arc::clone(s)))),
        }
    }
}

impl From<ComponentModel> for InstanceModel {
    fn from(model: ComponentModel) -> Self {
        match model {
            ComponentModel::Task(m) => InstanceModel::Task(m),
            ComponentModel::Composition(m) => InstanceModel::Composition(m),
        }
    }
}

impl fmt::Display for InstanceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn srv(name: &str, ports: Vec<Port>) -> Arc<DataServiceModel> {
        Arc::new(DataServiceModel::new(name, ports))
    }

    #[test]
    fn test_service_fulfills_is_reflexive_and_transitive() {
        let base = srv("base", vec![Port::output("samples", "double")]);
        let mut mid = DataServiceModel::new("mid", vec![Port::output("readings", "double")]);
        mid.parents.push(ProvidedService {
            service: Arc::clone(&base),
            port_mappings: BTreeMap::from([("samples".to_string(), "readings".to_string())]),
        });
        let mid = Arc::new(mid);
        let mut leaf = DataServiceModel::new("leaf", vec![Port::output("out", "double")]);
        leaf.parents.push(ProvidedService {
            service: Arc::clone(&mid),
            port_mappings: BTreeMap::from([("readings".to_string(), "out".to_string())]),
        });

        assert!(leaf.fulfills(&leaf));
        assert!(leaf.fulfills(&mid));
        assert!(leaf.fulfills(&base));
        assert!(!base.fulfills(&mid));
    }

    #[test]
    fn test_port_mappings_compose_along_the_chain() {
        let base = srv("base", vec![Port::output("samples", "double")]);
        let mut mid = DataServiceModel::new("mid", vec![Port::output("readings", "double")]);
        mid.parents.push(ProvidedService {
            service: Arc::clone(&base),
            port_mappings: BTreeMap::from([("samples".to_string(), "readings".to_string())]),
        });
        let mid = Arc::new(mid);
        let mut leaf = DataServiceModel::new("leaf", vec![Port::output("out", "double")]);
        leaf.parents.push(ProvidedService {
            service: Arc::clone(&mid),
            port_mappings: BTreeMap::from([("readings".to_string(), "out".to_string())]),
        });

        let mapping = leaf.port_mapping_to(&base).unwrap();
        assert_eq!(mapping.get("samples"), Some(&"out".to_string()));
    }

    #[test]
    fn test_task_fulfills_supermodel_chain() {
        let root = Arc::new(TaskContextModel::new("Device"));
        let mut imu = TaskContextModel::new("Imu");
        imu.supermodel = Some(Arc::clone(&root));
        let imu = Arc::new(imu);

        assert!(imu.fulfills_task(&root));
        assert!(!root.fulfills_task(&imu));
    }

    #[test]
    fn test_component_port_mapping_for_service() {
        let service = srv("pose", vec![Port::output("pose", "Pose")]);
        let mut task = TaskContextModel::new("PoseEstimator");
        task.ports.push(Port::output("pose_out", "Pose"));
        task.provides.push(ProvidedService {
            service: Arc::clone(&service),
            port_mappings: BTreeMap::from([("pose".to_string(), "pose_out".to_string())]),
        });
        let component = ComponentModel::Task(Arc::new(task));

        let mapping = component.port_mapping_for(&service).unwrap();
        assert_eq!(mapping.get("pose"), Some(&"pose_out".to_string()));
        assert!(component.fulfills(&ModelRef::Service(service)));
    }

    #[test]
    fn test_model_ref_identity() {
        let a = ModelRef::service(srv("pose", vec![]));
        let b = ModelRef::service(srv("pose", vec![]));
        let c = ModelRef::task(Arc::new(TaskContextModel::new("pose")));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_proxy_name_is_stable() {
        let a = srv("b_srv", vec![]);
        let b = srv("a_srv", vec![]);
        let proxy = ProxyModel::new(vec![a, b]);
        assert_eq!(proxy.name, "proxy<a_srv,b_srv>");
    }

    #[test]
    fn test_fulfilled_models_enumeration() {
        let base = srv("base", vec![]);
        let mut derived = DataServiceModel::new("derived", vec![]);
        derived.parents.push(ProvidedService::plain(Arc::clone(&base)));
        let derived = Arc::new(derived);

        let mut task = TaskContextModel::new("Sensor");
        task.provides.push(ProvidedService::plain(Arc::clone(&derived)));
        let component = ComponentModel::Task(Arc::new(task));

        let fulfilled = component.fulfilled_models();
        assert!(fulfilled.contains(&ModelRef::Service(derived)));
        assert!(fulfilled.contains(&ModelRef::Service(base)));
        assert_eq!(fulfilled[0].name(), "Sensor");
    }
}
