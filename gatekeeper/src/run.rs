//! Drive a task to a terminal stage in one call.

use anyhow::{Result, bail};
use tracing::{info, instrument};

use crate::core::stage::Stage;
use crate::core::task::Task;
use crate::io::executor::Executor;
use crate::io::verifier::Verifier;
use crate::scheduler::{Scheduler, SchedulerError};

/// Result of [`run_to_terminal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub stage: Stage,
    /// Transitions executed, including retries.
    pub steps: u32,
}

/// Advance `task` until it reaches a terminal stage, consuming retries as
/// blocks occur.
///
/// The step bound is derived from the attempt cap: each attempt costs at most
/// five transitions (plan, execute, verify, score, retry), so exceeding the
/// bound means the stage machine is cycling and is reported as an error
/// rather than looped on forever.
#[instrument(skip_all, fields(task_id = %task.id()))]
pub fn run_to_terminal<E: Executor>(
    scheduler: &Scheduler,
    task: &mut Task,
    executor: &E,
    verifiers: &[Box<dyn Verifier>],
) -> Result<RunOutcome> {
    let max_steps = (scheduler.config().max_attempts + 1) * 5 + 1;
    let mut steps = 0u32;
    while !task.stage.is_terminal() {
        if steps >= max_steps {
            bail!(
                "task '{}' did not reach a terminal stage within {} transitions",
                task.id(),
                max_steps
            );
        }
        match scheduler.advance(task, executor, verifiers) {
            Ok(_) => {}
            // Exhausted retries end the run at Escalated rather than failing it.
            Err(err) if is_exhausted(&err) => break,
            Err(err) => return Err(err),
        }
        steps += 1;
    }
    info!(stage = %task.stage, steps, "run finished");
    Ok(RunOutcome {
        stage: task.stage,
        steps,
    })
}

fn is_exhausted(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<SchedulerError>(),
        Some(SchedulerError::MaxAttemptsExceeded { .. })
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ArtifactKind, Severity, Track};
    use crate::scheduler::NewTask;
    use crate::test_support::{ScriptedExecutor, ScriptedVerifier, ScriptedVerify, TestStore, finding};

    fn start(store: &TestStore, scheduler: &Scheduler) -> Task {
        let artifact = store.write_artifact("analysis/gmm.R", "x <- 1\n");
        scheduler
            .start(NewTask {
                artifact,
                kind: ArtifactKind::NumericScript,
                track: Track::Production,
                plan: Vec::new(),
            })
            .expect("start")
    }

    #[test]
    fn clean_task_runs_to_committed() {
        let store = TestStore::new();
        let scheduler = store.scheduler();
        let mut task = start(&store, &scheduler);

        let outcome = run_to_terminal(
            &scheduler,
            &mut task,
            &ScriptedExecutor::new(),
            &ScriptedVerifier::clean("scripted").boxed(),
        )
        .expect("run");
        assert_eq!(outcome.stage, Stage::Committed);
        assert_eq!(outcome.steps, 3);
    }

    #[test]
    fn persistent_blocks_end_at_escalated() {
        let store = TestStore::new();
        let mut config = store.config();
        config.max_attempts = 2;
        let scheduler = store.scheduler_with(config);
        let mut task = start(&store, &scheduler);

        let blocked = || ScriptedVerify::Findings(vec![finding(Severity::Critical, "execution")]);
        let verifiers =
            ScriptedVerifier::new("scripted", vec![blocked(), blocked(), blocked()]).boxed();
        let outcome =
            run_to_terminal(&scheduler, &mut task, &ScriptedExecutor::new(), &verifiers)
                .expect("run");
        assert_eq!(outcome.stage, Stage::Escalated);
        assert_eq!(task.attempts, 2);
    }
}
