mod common;

use tempfile::tempdir;

#[test]
fn engine_runs_hook_each_tick() {
    let scenario = common::tiny_kolkhoz();
    let temp = tempdir().expect("tempdir");
    let (mut engine, mut world) = common::start(&scenario, temp.path(), 0);

    let mut ticks = Vec::new();
    engine
        .run_with_hook(&mut world, 6, |result| ticks.push(result.tick()))
        .expect("run succeeds");

    assert_eq!(ticks, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(engine.chronology().clock().day, 3);
}

#[test]
fn same_seed_replays_identically() {
    let scenario = common::tiny_kolkhoz();
    let temp = tempdir().expect("tempdir");
    let mut runs = Vec::new();
    for _ in 0..2 {
        let (mut engine, mut world) = common::start(&scenario, temp.path(), 0);
        let mut trace = Vec::new();
        engine
            .run_with_hook(&mut world, 720, |result| {
                trace.push(serde_json::to_string(result).expect("result serializes"))
            })
            .expect("run succeeds");
        runs.push(trace);
    }
    assert_eq!(runs[0], runs[1]);
}

#[test]
fn a_different_seed_diverges() {
    let mut scenario = common::tiny_kolkhoz();
    let temp = tempdir().expect("tempdir");
    let (mut first, mut first_world) = common::start(&scenario, temp.path(), 0);
    scenario.seed += 1;
    let (mut second, mut second_world) = common::start(&scenario, temp.path(), 0);
    first.run(&mut first_world, 360).expect("run succeeds");
    second.run(&mut second_world, 360).expect("run succeeds");
    assert_ne!(
        serde_json::to_string(&first_world.serialize()).unwrap(),
        serde_json::to_string(&second_world.serialize()).unwrap()
    );
}
