// tests/integration/graph.rs

use cmdqueue::dag::TaskGraph;
use cmdqueue::engine::TaskDefinition;
use cmdqueue::store::MemoryStore;
use cmdqueue_test_utils::builders::TaskBuilder;

fn thumbnails() -> Vec<TaskDefinition> {
    vec![
        TaskBuilder::new("md/1.jpg", "convert").dep("orig/1.jpg").definition(),
        TaskBuilder::new("ld/1.jpg", "convert").dep("md/1.jpg").definition(),
        TaskBuilder::new("md/2.jpg", "convert").dep("orig/2.jpg").definition(),
        TaskBuilder::new("index.html", "ls")
            .deps(["ld/1.jpg", "md/2.jpg", "style.css"])
            .definition(),
    ]
}

#[test]
fn test_roots_and_external_inputs() {
    let graph = TaskGraph::from_definitions(&thumbnails());

    assert_eq!(graph.tasks().len(), 4);
    assert_eq!(graph.roots(), vec!["md/1.jpg", "md/2.jpg"]);
    assert_eq!(
        graph.external_inputs(),
        vec!["orig/1.jpg", "orig/2.jpg", "style.css"]
    );
    assert!(graph.is_task("ld/1.jpg"));
    assert!(!graph.is_task("orig/1.jpg"));
    assert_eq!(graph.dependencies_of("ld/1.jpg"), ["md/1.jpg".to_string()]);
    assert!(graph.dependencies_of("unknown").is_empty());
    assert!(graph.cycles().is_empty());
}

#[test]
fn test_missing_inputs_consult_store() {
    let graph = TaskGraph::from_definitions(&thumbnails());
    let store = MemoryStore::with_entries(["orig/1.jpg", "orig/2.jpg"]);

    assert_eq!(graph.missing_inputs(&store), vec!["style.css"]);
}

#[test]
fn test_cycles_include_self_loops() {
    let defs = vec![
        TaskBuilder::new("b", "true").dep("a").definition(),
        TaskBuilder::new("a", "true").dep("b").definition(),
        TaskBuilder::new("self", "true").dep("self").definition(),
        TaskBuilder::new("free", "true").definition(),
    ];
    let graph = TaskGraph::from_definitions(&defs);

    assert_eq!(
        graph.cycles(),
        vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["self".to_string()],
        ]
    );
}

#[test]
fn test_diagnose_separates_causes() {
    let defs = vec![
        TaskBuilder::new("needs-input", "true").dep("gone.dat").definition(),
        TaskBuilder::new("x", "true").dep("y").definition(),
        TaskBuilder::new("y", "true").dep("x").definition(),
        TaskBuilder::new("downstream", "true").dep("needs-input").definition(),
    ];
    let graph = TaskGraph::from_definitions(&defs);
    let stuck: Vec<String> = ["needs-input", "x", "y", "downstream"]
        .into_iter()
        .map(String::from)
        .collect();

    let report = graph.diagnose(&stuck, &MemoryStore::new());

    assert_eq!(
        report.missing_inputs,
        vec![("needs-input".to_string(), vec!["gone.dat".to_string()])]
    );
    assert_eq!(report.cycles, vec![vec!["x".to_string(), "y".to_string()]]);
    assert_eq!(report.blocked, vec!["downstream"]);
}
