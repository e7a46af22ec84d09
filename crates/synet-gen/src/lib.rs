//! Synet Gen - the network transformation passes.
//!
//! Three passes turn an abstract component network into a deployable graph:
//! the [`Instantiator`] expands compositions into task graphs, the
//! [`MergeSolver`] collapses semantically identical tasks, and the
//! [`Deployer`] binds the remaining task contexts to deployment slots. Every
//! pass stages its rewrite in a transaction and commits atomically.

pub mod deploy;
pub mod instantiate;
pub mod merge;

pub use deploy::Deployer;
pub use instantiate::{InstantiationResult, Instantiator};
pub use merge::MergeSolver;

#[cfg(test)]
mod pipeline_tests {
    use super::*;
    use std::sync::Arc;

    use synet_core::descriptor::ModelRecord;
    use synet_core::types::{DeploymentGroup, ModelRef};
    use synet_core::ModelCatalog;
    use synet_inject::{DependencyInjection, InstanceRequirements, Selection, SelectionKey};
    use synet_plan::Plan;

    /// Two compositions sharing an IMU requirement, deployable on one
    /// process server.
    fn catalog() -> ModelCatalog {
        let records: Vec<ModelRecord> = serde_json::from_str(
            r#"[
            { "kind": "data_service", "name": "imu_source",
              "ports": [{ "name": "samples", "direction": "output", "data_type": "imu" }] },
            { "kind": "task_context", "name": "XsensImu",
              "ports": [{ "name": "samples", "direction": "output", "data_type": "imu" }],
              "provides": [{ "service": "imu_source" }] },
            { "kind": "task_context", "name": "PoseFilter",
              "ports": [
                { "name": "samples", "direction": "input", "data_type": "imu" },
                { "name": "pose", "direction": "output", "data_type": "pose" }
              ] },
            { "kind": "task_context", "name": "Stabilizer",
              "ports": [
                { "name": "samples", "direction": "input", "data_type": "imu" },
                { "name": "command", "direction": "output", "data_type": "cmd" }
              ] },
            { "kind": "composition", "name": "Localization",
              "children": [
                { "name": "imu", "models": ["imu_source"] },
                { "name": "filter", "models": ["PoseFilter"] }
              ] },
            { "kind": "composition", "name": "Stabilization",
              "children": [
                { "name": "imu", "models": ["imu_source"] },
                { "name": "stabilizer", "models": ["Stabilizer"] }
              ] },
            { "kind": "deployment", "name": "platform",
              "slots": [
                { "name": "imu", "task_model": "XsensImu" },
                { "name": "pose_filter", "task_model": "PoseFilter" },
                { "name": "stabilizer", "task_model": "Stabilizer" }
              ] }
        ]"#,
        )
        .unwrap();
        let catalog = ModelCatalog::new();
        catalog.load_records(records).unwrap();
        catalog
    }

    fn instantiate_both(catalog: &ModelCatalog, plan: &mut Plan) {
        let instantiator = Instantiator::new(catalog);
        let imu = catalog.task_context("XsensImu").unwrap();
        let mut di = DependencyInjection::new();
        di.add_explicit(
            SelectionKey::Model(ModelRef::Service(catalog.service("imu_source").unwrap())),
            Selection::model(ModelRef::task(imu)),
        )
        .unwrap();

        for name in ["Localization", "Stabilization"] {
            let requirements = InstanceRequirements::from_model(ModelRef::composition(
                catalog.composition(name).unwrap(),
            ));
            instantiator.instantiate(plan, &requirements, &di).unwrap();
        }
    }

    #[test]
    fn test_merge_deduplicates_shared_sensor() {
        let catalog = catalog();
        let mut plan = Plan::new();
        instantiate_both(&catalog, &mut plan);

        // Two compositions, each with an IMU and its consumer.
        assert_eq!(plan.len(), 6);
        let imus = plan
            .each_task()
            .filter(|t| t.model.name() == "XsensImu")
            .count();
        assert_eq!(imus, 2);

        MergeSolver::new().merge_identical_tasks(&mut plan).unwrap();

        // The duplicate IMU collapsed; both consumers read from the
        // survivor.
        let imus: Vec<_> = plan
            .each_task()
            .filter(|t| t.model.name() == "XsensImu")
            .map(|t| t.id)
            .collect();
        assert_eq!(imus.len(), 1);
        assert_eq!(plan.flow.sinks_of(imus[0]).len(), 2);
    }

    #[test]
    fn test_merge_preserves_external_ports() {
        let catalog = catalog();
        let mut plan = Plan::new();
        instantiate_both(&catalog, &mut plan);

        let port_pairs = |plan: &Plan| -> Vec<(String, String, String)> {
            let mut out: Vec<_> = plan
                .flow
                .each_edge()
                .flat_map(|(_, sink, map)| {
                    let sink_model = plan.task(sink).unwrap().model.name().to_string();
                    map.keys()
                        .map(move |(src, dst)| (sink_model.clone(), src.clone(), dst.clone()))
                        .collect::<Vec<_>>()
                })
                .collect();
            out.sort();
            out.dedup();
            out
        };
        let before = port_pairs(&plan);
        MergeSolver::new().merge_identical_tasks(&mut plan).unwrap();
        let after = port_pairs(&plan);
        // Every externally visible (sink model, ports) connection survived
        // the reduction.
        assert_eq!(before, after);
    }

    #[test]
    fn test_full_pipeline_deploys_everything() {
        let catalog = catalog();
        let mut plan = Plan::new();
        instantiate_both(&catalog, &mut plan);
        MergeSolver::new().merge_identical_tasks(&mut plan).unwrap();

        let mut group = DeploymentGroup::new();
        group.register("main", catalog.deployment("platform").unwrap());
        Deployer::new(group).deploy(&mut plan).unwrap();

        // Every task context ended up bound; one agent hosts them all.
        let mut agents = 0;
        for task in plan.each_task() {
            if task.model.is_composition() {
                continue;
            }
            if matches!(task.model, synet_core::types::InstanceModel::Deployment(_)) {
                agents += 1;
                continue;
            }
            assert!(
                task.binding.is_some(),
                "task {} has no deployment binding",
                task.id
            );
        }
        assert_eq!(agents, 1);
    }
}
