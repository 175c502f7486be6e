mod common;

use kolkhoz::{
    buildings::BuildingRegistry,
    engine::{Engine, EngineBuilder},
    snapshot::{SaveError, SaveGame},
    world::World,
};
use serde_json::Value;
use tempfile::tempdir;

/// Every saved section except the wall-clock timestamp.
fn state_of(engine: &Engine, world: &World) -> Value {
    let mut value = serde_json::to_value(engine.save(world)).expect("save serializes");
    if let Some(object) = value.as_object_mut() {
        object.remove("saved_at");
    }
    value
}

#[test]
fn resumed_game_continues_on_the_same_stream() {
    let scenario = common::tiny_kolkhoz();
    let temp = tempdir().expect("tempdir");
    let (mut engine, mut world) = common::start(&scenario, temp.path(), 0);
    engine.run(&mut world, 150).expect("run succeeds");

    let path = temp.path().join("manual").join("save.json");
    engine.save(&world).write_to(&path).expect("save written");
    let save = SaveGame::load(&path).expect("save loads");
    let (mut resumed, mut resumed_world) =
        EngineBuilder::new(common::settings(&scenario, temp.path(), 0))
            .resume(save, BuildingRegistry::standard())
            .expect("save resumes");
    assert_eq!(state_of(&engine, &world), state_of(&resumed, &resumed_world));

    engine.run(&mut world, 400).expect("run succeeds");
    resumed.run(&mut resumed_world, 400).expect("run succeeds");
    assert_eq!(state_of(&engine, &world), state_of(&resumed, &resumed_world));
}

#[test]
fn autosaves_land_on_the_interval() {
    let scenario = common::tiny_kolkhoz();
    let temp = tempdir().expect("tempdir");
    let (mut engine, mut world) = common::start(&scenario, temp.path(), 90);
    let mut written = Vec::new();
    engine
        .run_with_hook(&mut world, 180, |result| {
            if let Some(path) = &result.autosave {
                written.push((result.tick(), path.clone()));
            }
        })
        .expect("run succeeds");

    let ticks: Vec<u64> = written.iter().map(|(tick, _)| *tick).collect();
    assert_eq!(ticks, vec![90, 180]);
    let dir = temp.path().join(&scenario.name);
    assert!(dir.join("tick_000090.json").exists());
    assert!(dir.join("tick_000180.json").exists());

    // Resuming the first autosave and playing to the second reproduces it.
    let early = SaveGame::load(dir.join("tick_000090.json")).expect("autosave loads");
    let late = SaveGame::load(dir.join("tick_000180.json")).expect("autosave loads");
    let other = tempdir().expect("tempdir");
    let (mut resumed, mut resumed_world) =
        EngineBuilder::new(common::settings(&scenario, other.path(), 0))
            .resume(early, BuildingRegistry::standard())
            .expect("autosave resumes");
    resumed.run(&mut resumed_world, 90).expect("run succeeds");
    let replayed = resumed.save(&resumed_world);
    assert_eq!(
        serde_json::to_value(&replayed.world).unwrap(),
        serde_json::to_value(&late.world).unwrap()
    );
    assert_eq!(replayed.rng, late.rng);
}

#[test]
fn saves_without_a_version_are_refused() {
    let scenario = common::tiny_kolkhoz();
    let temp = tempdir().expect("tempdir");
    let (engine, world) = common::start(&scenario, temp.path(), 0);
    let mut value = serde_json::to_value(engine.save(&world)).unwrap();
    value["chronology"]
        .as_object_mut()
        .expect("chronology is an object")
        .remove("version");
    let save: SaveGame = serde_json::from_value(value).expect("still well-formed");
    let error = EngineBuilder::new(common::settings(&scenario, temp.path(), 0))
        .resume(save, BuildingRegistry::standard())
        .err()
        .expect("resume fails");
    assert!(matches!(
        error,
        SaveError::MissingVersion {
            section: "chronology"
        }
    ));
}
