mod common;

use kolkhoz::{systems::chronology::TICKS_PER_YEAR, world::MemberRole};
use tempfile::tempdir;

#[test]
fn households_and_citizens_stay_in_step() {
    let scenario = common::tiny_kolkhoz();
    let temp = tempdir().expect("tempdir");
    let (mut engine, mut world) = common::start(&scenario, temp.path(), 0);

    for _ in 0..TICKS_PER_YEAR * 6 {
        let before = world.households().member_count() as i64;
        let result = engine.tick(&mut world).expect("tick succeeds");
        let after = world.households().member_count() as i64;

        let births = i64::from(result.demography.births);
        let deaths = i64::from(result.demography.deaths) + i64::from(result.disease.deaths);
        assert_eq!(after, before + births - deaths, "tick {}", result.tick());
        assert_eq!(result.demography.born.len() as i64, births);
        assert_eq!(result.disease.dead_entities.len() as u32, result.disease.deaths);

        assert_eq!(world.citizens().len() as i64, after);
        assert_eq!(world.resources().population, after as u64);
        assert!(world.resources().food >= 0.0);
        assert!(world.resources().money >= 0.0);

        for dvor in world.households().iter() {
            assert!(!dvor.members.is_empty());
            let heads = dvor
                .members
                .iter()
                .filter(|m| m.role == MemberRole::Head)
                .count();
            assert_eq!(heads, 1, "dvor {}", dvor.surname);
        }
        for citizen in world.citizens().iter() {
            let dvor = world
                .households()
                .get(citizen.dvor.expect("citizen has a dvor"))
                .expect("dvor exists");
            let member = dvor
                .member(citizen.member.expect("citizen has a member"))
                .expect("member exists");
            assert_eq!(member.age, citizen.age);
            assert_eq!(member.disease, citizen.disease);
        }
    }
}

#[test]
fn the_first_winter_is_reached_in_order() {
    use kolkhoz::systems::milestones::MilestoneId;

    let scenario = common::tiny_kolkhoz();
    let temp = tempdir().expect("tempdir");
    let (mut engine, mut world) = common::start(&scenario, temp.path(), 0);
    // October start: winter begins with month 11, thirty ticks in.
    engine.run(&mut world, 31).expect("run succeeds");
    let completed = engine.milestones().completed();
    assert_eq!(
        &completed[..2],
        &[MilestoneId::FirstDelivery, MilestoneId::FirstWinter]
    );
}
