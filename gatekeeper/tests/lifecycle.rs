//! End-to-end lifecycle tests against the library API with scripted
//! collaborators, covering resume-after-restart and audit-trail shape.

use gatekeeper::core::stage::Stage;
use gatekeeper::core::types::{ArtifactKind, GateDecision, Severity, Track};
use gatekeeper::scheduler::NewTask;
use gatekeeper::test_support::{
    ScriptedExecutor, ScriptedVerifier, ScriptedVerify, TestStore, deduction_finding,
};

fn start_production(store: &TestStore, scheduler: &gatekeeper::scheduler::Scheduler) -> String {
    let artifact = store.write_artifact("analysis/gmm.R", "x <- 1\n");
    let task = scheduler
        .start(NewTask {
            artifact,
            kind: ArtifactKind::NumericScript,
            track: Track::Production,
            plan: Vec::new(),
        })
        .expect("start");
    task.id().to_string()
}

#[test]
fn task_resumes_across_scheduler_instances() {
    let store = TestStore::new();
    let executor = ScriptedExecutor::new();

    // First "process": run up to the scored stage, then stop.
    let task_id = {
        let scheduler = store.scheduler();
        let task_id = start_production(&store, &scheduler);
        let mut task = scheduler.load(&task_id).expect("load");
        let verifiers = ScriptedVerifier::new(
            "scripted",
            vec![ScriptedVerify::Findings(vec![deduction_finding(
                Severity::Minor,
                5,
            )])],
        )
        .boxed();
        scheduler.advance(&mut task, &executor, &verifiers).expect("advance");
        scheduler.advance(&mut task, &executor, &verifiers).expect("advance");
        assert_eq!(task.stage, Stage::Scored);
        task_id
    };

    // Second "process": replay from the session log and finish.
    let scheduler = store.scheduler();
    let mut task = scheduler.load(&task_id).expect("reload");
    assert_eq!(task.stage, Stage::Scored);
    assert_eq!(task.findings.len(), 1);

    let verifiers = ScriptedVerifier::clean("scripted").boxed();
    let stage = scheduler.advance(&mut task, &executor, &verifiers).expect("advance");
    assert_eq!(stage, Stage::Committed);
}

#[test]
fn required_fixes_survive_replay_after_a_block() {
    let store = TestStore::new();
    let executor = ScriptedExecutor::new();
    let scheduler = store.scheduler();
    let task_id = start_production(&store, &scheduler);

    let mut task = scheduler.load(&task_id).expect("load");
    let verifiers = ScriptedVerifier::new(
        "scripted",
        vec![ScriptedVerify::Findings(vec![deduction_finding(
            Severity::Major,
            30,
        )])],
    )
    .boxed();
    scheduler.advance(&mut task, &executor, &verifiers).expect("advance");
    scheduler.advance(&mut task, &executor, &verifiers).expect("advance");
    assert_eq!(
        scheduler.advance(&mut task, &executor, &verifiers).expect("advance"),
        Stage::Retrying
    );

    let reloaded = store.scheduler().load(&task_id).expect("reload");
    assert_eq!(reloaded.stage, Stage::Retrying);
    assert_eq!(reloaded.required_fixes().len(), 1);
}

#[test]
fn audit_trail_lists_every_stage_in_order() {
    let store = TestStore::new();
    let executor = ScriptedExecutor::new();
    let scheduler = store.scheduler();
    let task_id = start_production(&store, &scheduler);

    let mut task = scheduler.load(&task_id).expect("load");
    let verifiers = ScriptedVerifier::new(
        "scripted",
        vec![
            ScriptedVerify::Findings(vec![deduction_finding(Severity::Major, 30)]),
            ScriptedVerify::Findings(Vec::new()),
        ],
    )
    .boxed();
    while !task.stage.is_terminal() {
        scheduler.advance(&mut task, &executor, &verifiers).expect("advance");
    }
    assert_eq!(task.stage, Stage::Committed);

    let stages: Vec<Stage> = scheduler
        .recorder()
        .history(&task_id)
        .expect("history")
        .into_iter()
        .map(|record| record.stage)
        .collect();
    assert_eq!(
        stages,
        vec![
            Stage::Executing,
            Stage::Verifying,
            Stage::Scored,
            Stage::Retrying,
            Stage::Executing,
            Stage::Verifying,
            Stage::Scored,
            Stage::Committed,
        ]
    );
}

#[test]
fn configured_thresholds_drive_the_gate() {
    let store = TestStore::new();
    let mut config = store.config();
    config.thresholds.production.block_below = 50;
    config.thresholds.production.warn_below = Some(70);
    let scheduler = store.scheduler_with(config);
    let executor = ScriptedExecutor::new();
    let task_id = start_production(&store, &scheduler);

    // Score 60: below the default bar, above the tuned one.
    let mut task = scheduler.load(&task_id).expect("load");
    let verifiers = ScriptedVerifier::new(
        "scripted",
        vec![ScriptedVerify::Findings(vec![deduction_finding(
            Severity::Major,
            40,
        )])],
    )
    .boxed();
    scheduler.advance(&mut task, &executor, &verifiers).expect("advance");
    scheduler.advance(&mut task, &executor, &verifiers).expect("advance");
    assert_eq!(
        scheduler.advance(&mut task, &executor, &verifiers).expect("advance"),
        Stage::Committed
    );
    let last = scheduler
        .recorder()
        .history(&task_id)
        .expect("history")
        .pop()
        .expect("record");
    assert_eq!(last.decision, Some(GateDecision::Warn));
}
