// tests/property/main.rs

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use cmdqueue::engine::{Engine, EngineOptions};
use cmdqueue::errors::EngineError;
use cmdqueue::store::{MemoryStore, ResourceStore};
use cmdqueue_test_utils::fake_runner::{FakeRunner, Script};

/// One generated task: its dependencies (indices of earlier tasks only, so
/// the graph is acyclic), how many polls it runs for, and whether it fails.
#[derive(Debug, Clone)]
struct GenTask {
    deps: Vec<usize>,
    polls: u32,
    fails: bool,
    cached: bool,
}

#[derive(Debug, Clone)]
struct Scenario {
    tasks: Vec<GenTask>,
    /// Order in which the tasks are submitted.
    submit_order: Vec<usize>,
    workers: usize,
}

fn name(i: usize) -> String {
    format!("task_{i}")
}

// Acyclic by construction: task N may only depend on tasks 0..N.
fn scenario_strategy(max_tasks: usize) -> impl Strategy<Value = Scenario> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let task = (
            proptest::collection::vec(any::<usize>(), 0..4),
            0..4u32,
            proptest::bool::weighted(0.1),
            proptest::bool::weighted(0.2),
        );
        (
            proptest::collection::vec(task, num_tasks),
            Just((0..num_tasks).collect::<Vec<_>>()).prop_shuffle(),
            1..5usize,
        )
            .prop_map(|(raw, submit_order, workers)| {
                let tasks = raw
                    .into_iter()
                    .enumerate()
                    .map(|(i, (potential, polls, fails, cached))| {
                        let deps: HashSet<usize> = if i == 0 {
                            HashSet::new()
                        } else {
                            potential.into_iter().map(|d| d % i).collect()
                        };
                        let mut deps: Vec<usize> = deps.into_iter().collect();
                        deps.sort();
                        GenTask {
                            deps,
                            polls,
                            fails,
                            cached,
                        }
                    })
                    .collect();
                Scenario {
                    tasks,
                    submit_order,
                    workers,
                }
            })
    })
}

fn run_scenario(
    scenario: &Scenario,
) -> (Result<(), EngineError>, cmdqueue_test_utils::fake_runner::RunLog) {
    let cached: Vec<String> = scenario
        .tasks
        .iter()
        .enumerate()
        .filter(|(_, t)| t.cached)
        .map(|(i, _)| name(i))
        .collect();
    let store = MemoryStore::with_entries(cached);

    let mut runner = FakeRunner::new().with_store(store.clone());
    for (i, task) in scenario.tasks.iter().enumerate() {
        let script = if task.fails {
            Script::fail_after(1, task.polls)
        } else {
            Script::succeed_after(task.polls)
        };
        runner = runner.script(&name(i), script);
    }
    let log = runner.log_handle();

    let shared: Arc<dyn ResourceStore> = Arc::new(store);
    let mut engine = Engine::new(
        runner,
        shared,
        EngineOptions::new(scenario.workers, Duration::from_millis(1)),
    );

    for &i in scenario.submit_order.iter() {
        let deps: Vec<String> = scenario.tasks[i].deps.iter().map(|&d| name(d)).collect();
        engine
            .submit(name(i), deps, ["true"])
            .expect("generated identities are unique");
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("failed to build runtime");
    let result = rt.block_on(engine.run());

    let log = log.lock().unwrap().clone();
    (result, log)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_worker_limit_and_dependency_order(scenario in scenario_strategy(12)) {
        let (_, log) = run_scenario(&scenario);

        prop_assert!(log.max_running <= scenario.workers);
        prop_assert!(log.violations.is_empty(), "violations: {:?}", log.violations);
        prop_assert_eq!(log.running, 0);
    }

    #[test]
    fn test_cached_outputs_are_never_launched(scenario in scenario_strategy(12)) {
        let (_, log) = run_scenario(&scenario);

        for (i, task) in scenario.tasks.iter().enumerate() {
            if task.cached {
                prop_assert!(!log.launched.contains(&name(i)));
            }
        }
        let unique: HashSet<&String> = log.launched.iter().collect();
        prop_assert_eq!(unique.len(), log.launched.len());
    }

    #[test]
    fn test_run_succeeds_iff_no_failing_task_was_launched(scenario in scenario_strategy(12)) {
        let (result, log) = run_scenario(&scenario);

        let failing_launched = scenario
            .tasks
            .iter()
            .enumerate()
            .any(|(i, t)| t.fails && log.launched.contains(&name(i)));

        match result {
            Ok(()) => {
                prop_assert!(!failing_launched);
                // Every task either ran or was already there.
                for (i, task) in scenario.tasks.iter().enumerate() {
                    prop_assert!(task.cached || log.launched.contains(&name(i)));
                }
            }
            Err(EngineError::CommandFailed { identity, exit_code, .. }) => {
                prop_assert!(failing_launched);
                prop_assert_eq!(exit_code, 1);
                prop_assert!(log.finished.contains(&(identity, 1)));
            }
            Err(other) => {
                prop_assert!(false, "acyclic graph reported {:?}", other);
            }
        }
    }
}
