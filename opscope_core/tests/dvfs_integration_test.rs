// Frequency table + applier against a fake cpufreq tree
use opscope_core::dvfs::{FailurePolicy, FrequencyApplier, FrequencyTable, SysfsFrequencySink};
use opscope_core::{OpKind, OpscopeConfig, OpscopeRuntime};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

/// Creates cpu4/cpu7 `scaling_max_freq` files under a temp dir
fn fake_cpufreq(dir: &tempfile::TempDir) -> Vec<PathBuf> {
    [4, 7]
        .iter()
        .map(|cpu| {
            let cpufreq = dir.path().join(format!("cpu{}/cpufreq", cpu));
            fs::create_dir_all(&cpufreq).unwrap();
            let path = cpufreq.join("scaling_max_freq");
            fs::write(&path, "2841600").unwrap();
            path
        })
        .collect()
}

fn read_khz(path: &PathBuf) -> u32 {
    fs::read_to_string(path).unwrap().trim().parse().unwrap()
}

#[test]
fn test_apply_writes_every_core() {
    let dir = tempfile::tempdir().unwrap();
    let paths = fake_cpufreq(&dir);
    let table = Arc::new(FrequencyTable::new());
    let applier = FrequencyApplier::new(table.clone(), SysfsFrequencySink::new(paths.clone()));

    table.set(OpKind::MulMat, 1_396_000);
    table.set(OpKind::Glu, 1_557_000);

    applier.apply_if_needed(OpKind::MulMat);
    assert!(paths.iter().all(|p| read_khz(p) == 1_396_000));

    applier.apply_if_needed(OpKind::Glu);
    assert!(paths.iter().all(|p| read_khz(p) == 1_557_000));
    assert_eq!(applier.last_applied(), 1_557_000);
}

#[test]
fn test_debounce_leaves_external_changes_alone() {
    let dir = tempfile::tempdir().unwrap();
    let paths = fake_cpufreq(&dir);
    let table = Arc::new(FrequencyTable::new());
    let applier = FrequencyApplier::new(table.clone(), SysfsFrequencySink::new(paths.clone()));

    table.set(OpKind::Add, 1_200_000);
    applier.apply_if_needed(OpKind::Add);

    // someone else moves the cap; an unchanged target must not touch it
    fs::write(&paths[0], "999").unwrap();
    applier.apply_if_needed(OpKind::Add);
    assert_eq!(read_khz(&paths[0]), 999);
}

#[test]
fn test_missing_control_files_never_fail_caller() {
    let dir = tempfile::tempdir().unwrap();
    let missing = vec![dir.path().join("cpu4/cpufreq/scaling_max_freq")];
    let table = Arc::new(FrequencyTable::new());

    let legacy = FrequencyApplier::new(table.clone(), SysfsFrequencySink::new(missing.clone()));
    let retrying = FrequencyApplier::new(table.clone(), SysfsFrequencySink::new(missing.clone()))
        .with_policy(FailurePolicy::RecordOnSuccess);

    table.set(OpKind::SoftMax, 1_000_000);
    legacy.apply_if_needed(OpKind::SoftMax);
    retrying.apply_if_needed(OpKind::SoftMax);

    assert_eq!(legacy.last_applied(), 1_000_000);
    assert_eq!(retrying.last_applied(), 0);

    // once the file shows up the retrying applier catches up
    fs::create_dir_all(missing[0].parent().unwrap()).unwrap();
    fs::write(&missing[0], "0").unwrap();
    legacy.apply_if_needed(OpKind::SoftMax);
    assert_eq!(read_khz(&missing[0]), 0);
    retrying.apply_if_needed(OpKind::SoftMax);
    assert_eq!(read_khz(&missing[0]), 1_000_000);
    assert_eq!(retrying.last_applied(), 1_000_000);
}

#[test]
fn test_concurrent_workers_converge() {
    let dir = tempfile::tempdir().unwrap();
    let paths = fake_cpufreq(&dir);
    let table = Arc::new(FrequencyTable::new());
    let applier = Arc::new(FrequencyApplier::new(
        table.clone(),
        SysfsFrequencySink::new(paths.clone()),
    ));
    table.set(OpKind::MulMat, 1_800_000);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let applier = applier.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    applier.apply_if_needed(OpKind::MulMat);
                    applier.apply_if_needed(OpKind::Add); // unset, no-op
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(applier.last_applied(), 1_800_000);
    assert!(paths.iter().all(|p| read_khz(p) == 1_800_000));
}

#[cfg(any(target_os = "linux", target_os = "android"))]
#[test]
fn test_runtime_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let paths = fake_cpufreq(&dir);

    let mut config = OpscopeConfig::default();
    config.probe.signal = None;
    config.dvfs.control_paths = paths.clone();
    config.dvfs.frequencies.insert(OpKind::Rope, 1_113_600);
    let config_path = dir.path().join("opscope.yaml");
    config.save_to_path(&config_path).unwrap();

    let loaded = OpscopeConfig::load_from_path(&config_path).unwrap();
    let runtime = OpscopeRuntime::from_config(&loaded).unwrap();

    runtime.apply_if_needed(OpKind::Rope);
    assert!(paths.iter().all(|p| read_khz(p) == 1_113_600));

    runtime.set_frequency(OpKind::Rope, 0);
    runtime.apply_if_needed(OpKind::Rope);
    assert_eq!(runtime.applier().last_applied(), 1_113_600);
}
