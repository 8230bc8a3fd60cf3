//! Full-stack tests: config file in, looper-driven applies out. These run
//! against the real clock, so assertions poll with generous deadlines
//! instead of assuming exact wake timing.

use std::io::Write as _;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use hintd_core::{ApplySink, ArbiterConfig, HintManager, SystemTimeSource};

#[derive(Debug, Default)]
struct RecordingSink {
    calls: Mutex<Vec<(String, String, String)>>,
}

impl RecordingSink {
    fn values_for(&self, node: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(name, _, _)| name == node)
            .map(|(_, _, value)| value.clone())
            .collect()
    }
}

impl ApplySink for RecordingSink {
    fn apply(&self, name: &str, identifier: &str, value: &str) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_owned(), identifier.to_owned(), value.to_owned()));
    }
}

fn wait_until(predicate: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    predicate()
}

const CONFIG: &str = r#"
[[nodes]]
name = "cpu-governor"
identifier = "cpu0"
reset_on_init = true

[[nodes.tiers]]
name = "interactive"

[[nodes.tiers]]
name = "default"
default = "schedutil"

[[nodes]]
name = "gpu-freq"
identifier = "gpu0"

[[nodes.tiers]]
name = "boost"

[[nodes.tiers]]
name = "default"
default = "min"
"#;

fn manager_from_file() -> (Arc<RecordingSink>, HintManager) {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();
    let config = ArbiterConfig::from_file(file.path()).unwrap();

    let sink = Arc::new(RecordingSink::default());
    let manager =
        HintManager::from_config(&config, sink.clone(), Arc::new(SystemTimeSource)).unwrap();
    (sink, manager)
}

#[test]
fn startup_synchronizes_reset_nodes_only() {
    let (sink, manager) = manager_from_file();
    assert_eq!(manager.node_count(), 2);

    assert!(wait_until(|| sink.values_for("cpu-governor") == ["schedutil"]));
    assert!(sink.values_for("gpu-freq").is_empty());
}

#[test]
fn lease_lifecycle_without_client_calls() {
    let (sink, manager) = manager_from_file();

    manager
        .submit(
            "cpu-governor",
            "interactive",
            "performance",
            Some(Duration::from_millis(150)),
        )
        .unwrap();

    // The looper applies the winner on submission, then applies the
    // fallback once the lease lapses, with no further client traffic.
    assert!(wait_until(|| {
        let values = sink.values_for("cpu-governor");
        values.ends_with(&["performance".to_owned(), "schedutil".to_owned()])
    }));
}

#[test]
fn nodes_arbitrate_independently() {
    let (sink, manager) = manager_from_file();

    manager
        .submit("gpu-freq", "boost", "high", None)
        .unwrap();
    assert!(wait_until(|| sink.values_for("gpu-freq") == ["high"]));

    // Activity on one node must not disturb the other's applied state.
    let cpu_before = sink.values_for("cpu-governor");
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(sink.values_for("cpu-governor"), cpu_before);
}

#[test]
fn submission_storm_settles_to_fallback() {
    let (sink, manager) = manager_from_file();
    let manager = Arc::new(manager);

    let mut clients = Vec::new();
    for thread_index in 0u64..4 {
        let manager = Arc::clone(&manager);
        clients.push(std::thread::spawn(move || {
            for round in 0u64..50 {
                let handle = manager
                    .submit(
                        "gpu-freq",
                        "boost",
                        format!("c{thread_index}-{round}"),
                        Some(Duration::from_millis(round % 20 + 1)),
                    )
                    .unwrap();
                if round % 4 == 0 {
                    // Racing the lease: the request may already be pruned.
                    let _ = manager.withdraw(handle);
                }
            }
        }));
    }
    for client in clients {
        client.join().unwrap();
    }

    // Every lease was short; the node must settle back to the fallback.
    assert!(wait_until(|| {
        sink.values_for("gpu-freq")
            .last()
            .is_some_and(|value| value == "min")
    }));

    // And every applied value was a real submission or the fallback.
    for value in sink.values_for("gpu-freq") {
        assert!(
            value == "min" || value.starts_with('c'),
            "unexpected applied value: {value}"
        );
    }
}

#[test]
fn dump_reflects_live_state() {
    let (sink, manager) = manager_from_file();

    manager
        .submit("gpu-freq", "boost", "high", None)
        .unwrap();
    assert!(wait_until(|| sink.values_for("gpu-freq") == ["high"]));

    let mut out = Vec::new();
    manager.dump(&mut out);
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("gpu-freq\tgpu0\t0\thigh"));
    assert!(text.contains("high@forever"));
}
