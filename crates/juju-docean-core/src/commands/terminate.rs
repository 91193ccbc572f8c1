//! TerminateMachine: remove machines from the environment and destroy their
//! instances

use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::CommandContext;
use crate::error::{OperationError, Result};
use crate::operation::{DestroyOutcome, OperationOutput};
use crate::reconcile::{DestroyDirective, ReconciliationView};

#[derive(Debug, Default)]
pub struct TerminateReport {
    /// What was planned, one per selected machine
    pub directives: Vec<DestroyDirective>,
    pub destroyed: Vec<DestroyOutcome>,
    /// Failed destroys, labelled by operation
    pub failed: Vec<(String, OperationError)>,
    /// Requested ids the environment does not know
    pub unknown: Vec<String>,
}

impl TerminateReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct TerminateMachine<'a> {
    ctx: &'a CommandContext,
    machine_ids: Vec<String>,
}

impl<'a> TerminateMachine<'a> {
    pub fn new(ctx: &'a CommandContext, machine_ids: Vec<String>) -> Self {
        Self { ctx, machine_ids }
    }

    pub async fn run(&self) -> Result<TerminateReport> {
        self.ctx.check_preconditions().await?;
        let (view, mut report) =
            terminate_machines(self.ctx, |id| self.machine_ids.iter().any(|m| m == id)).await?;

        report.unknown = self
            .machine_ids
            .iter()
            .filter(|id| view.status().machine(id).is_none())
            .cloned()
            .collect();
        for id in &report.unknown {
            warn!("Machine {} not found in environment", id);
        }
        Ok(report)
    }
}

/// Destroy the machines selected by `filter`, resolving each to its
/// instance by address. Returns the view the plan was built from.
pub(crate) async fn terminate_machines<F>(
    ctx: &CommandContext,
    filter: F,
) -> Result<(ReconciliationView, TerminateReport)>
where
    F: Fn(&str) -> bool,
{
    debug!("Checking for machines to terminate");
    let view = ReconciliationView::fetch(ctx.provider.as_ref(), ctx.env.as_ref()).await?;
    let directives = view.destroy_directives(filter);

    let mut report = TerminateReport {
        directives: directives.clone(),
        ..Default::default()
    };
    if directives.is_empty() {
        return Ok((view, report));
    }

    info!(
        "Terminating machines {}",
        directives
            .iter()
            .map(|d| d.machine_id.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    );

    let mut runner = ctx.runner();
    for directive in directives {
        runner.queue(directive.into_operation(Arc::clone(&ctx.provider), Arc::clone(&ctx.env)));
    }

    let mut results = runner.iter_results();
    while let Some(completed) = results.next().await {
        match completed.result {
            Ok(OperationOutput::Destroyed(outcome)) => report.destroyed.push(outcome),
            Ok(other) => warn!("Unexpected outcome {:?}", other),
            Err(e) => {
                let label = completed.operation.describe();
                error!("Failed to {}: {}", label, e);
                report.failed.push((label, e));
            }
        }
    }
    Ok((view, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::DestroyMode;
    use crate::testing::{
        Event, Journal, StubEnvironment, StubProvider, context, instance, juju_home, test_config,
    };

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_unresolvable_machine_gets_env_only_directive() {
        let home = juju_home();
        let journal = Journal::default();
        let provider = Arc::new(
            StubProvider::with_journal(journal.clone())
                .with_instance(instance(10, "prod-0", Some("10.0.0.5")))
                .with_instance(instance(11, "prod-a", Some("10.0.0.6"))),
        );
        let env = Arc::new(
            StubEnvironment::with_journal(journal.clone())
                .with_machine("0", Some("10.0.0.5"))
                .with_machine("1", Some("10.0.0.6"))
                .with_machine("2", Some("10.0.0.7")),
        );
        let ctx = context(test_config(home.path()), provider.clone(), env.clone());

        let report = TerminateMachine::new(&ctx, ids(&["1", "2"]))
            .run()
            .await
            .unwrap();

        assert_eq!(report.directives.len(), 2);
        let one = report.directives.iter().find(|d| d.machine_id == "1").unwrap();
        let two = report.directives.iter().find(|d| d.machine_id == "2").unwrap();
        assert_eq!((one.mode, one.instance_id), (DestroyMode::Full, Some(11)));
        assert_eq!((two.mode, two.instance_id), (DestroyMode::EnvironmentOnly, None));

        assert!(report.is_success());
        assert_eq!(report.destroyed.len(), 2);
        for outcome in &report.destroyed {
            let full = outcome.machine_id.as_deref() == Some("1");
            assert_eq!(outcome.instance_destroyed, full);
        }
        assert_eq!(journal.count(|e| matches!(e, Event::DestroyInstance(_))), 1);
        assert_eq!(provider.instance_ids(), vec![10]);
        assert_eq!(env.machine_ids(), vec!["0"]);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_reported() {
        let home = juju_home();
        let journal = Journal::default();
        let ctx = context(
            test_config(home.path()),
            Arc::new(StubProvider::with_journal(journal.clone())),
            Arc::new(
                StubEnvironment::with_journal(journal.clone()).with_machine("0", Some("10.0.0.5")),
            ),
        );

        let report = TerminateMachine::new(&ctx, ids(&["7"])).run().await.unwrap();
        assert!(report.directives.is_empty());
        assert_eq!(report.unknown, vec!["7"]);
        assert_eq!(
            journal.count(|e| matches!(e, Event::TerminateMachines(_))),
            0
        );
    }

    #[tokio::test]
    async fn test_failures_are_collected() {
        let home = juju_home();
        let journal = Journal::default();
        let provider = Arc::new(
            StubProvider::with_journal(journal.clone())
                .with_instance(instance(11, "prod-a", Some("10.0.0.6")))
                .failing_destroy(),
        );
        let env = Arc::new(
            StubEnvironment::with_journal(journal.clone()).with_machine("1", Some("10.0.0.6")),
        );
        let ctx = context(test_config(home.path()), provider, env);

        let report = TerminateMachine::new(&ctx, ids(&["1"])).run().await.unwrap();
        assert!(!report.is_success());
        assert!(matches!(report.failed[0].1, OperationError::Provider(_)));
    }
}
