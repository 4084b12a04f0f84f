//! End-to-end scenarios from spec.md §8 (S1–S6), exercised against the
//! public `World`/`Query` surface rather than internal module state.

use arche_ecs::bitmask::BitMask256;
use arche_ecs::{Entity, World};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pos {
    x: f32,
    y: f32,
}
#[derive(Debug, Clone, Copy, PartialEq)]
struct Vel {
    dx: f32,
    dy: f32,
}
#[derive(Debug, Clone, Copy, PartialEq)]
struct A(i32);
#[derive(Debug, Clone, Copy, PartialEq)]
struct B(i32);
#[derive(Debug, Clone, Copy, PartialEq)]
struct C(i32);

#[test]
fn s1_creation_and_remove_basic() {
    let mut world = World::new(4);
    let e1 = world.create_entity_in(BitMask256::EMPTY, &[]);
    let e2 = world.create_entity_in(BitMask256::EMPTY, &[]);
    let e3 = world.create_entity_in(BitMask256::EMPTY, &[]);
    let e4 = world.create_entity_in(BitMask256::EMPTY, &[]);
    let e5 = world.create_entity_in(BitMask256::EMPTY, &[]);
    assert_eq!(world.entity_capacity(), 8);

    for e in [e1, e2, e3, e4, e5] {
        assert!(world.is_valid(e));
    }

    world.remove_entity(e3).unwrap();
    assert!(!world.is_valid(e3));
    for e in [e1, e2, e4, e5] {
        assert!(world.is_valid(e));
    }

    let e6 = world.create_entity_in(BitMask256::EMPTY, &[]);
    assert_eq!(e6.id, e3.id);
    assert_ne!(e6.version, e3.version);
}

#[test]
fn s2_structural_migration() {
    let mut world = World::new(4);
    let e = world.create_entity_in(BitMask256::EMPTY, &[]);

    world.set_component(e, Pos { x: 1.0, y: 2.0 }).unwrap();
    assert_eq!(world.get_component::<Pos>(e), Some(&Pos { x: 1.0, y: 2.0 }));

    world.set_component(e, Vel { dx: 3.0, dy: 4.0 }).unwrap();
    assert_eq!(world.get_component::<Pos>(e), Some(&Pos { x: 1.0, y: 2.0 }));
    assert_eq!(world.get_component::<Vel>(e), Some(&Vel { dx: 3.0, dy: 4.0 }));

    world.remove_component::<Pos>(e).unwrap();
    assert_eq!(world.get_component::<Pos>(e), None);
    assert_eq!(world.get_component::<Vel>(e), Some(&Vel { dx: 3.0, dy: 4.0 }));
}

#[test]
fn s3_swap_remove_preserves_others() {
    let mut world = World::new(4);
    let e1 = world.create_entity_in(BitMask256::EMPTY, &[]);
    let e2 = world.create_entity_in(BitMask256::EMPTY, &[]);
    let e3 = world.create_entity_in(BitMask256::EMPTY, &[]);
    world.set_component(e1, Pos { x: 1.0, y: 1.0 }).unwrap();
    world.set_component(e2, Pos { x: 2.0, y: 2.0 }).unwrap();
    world.set_component(e3, Pos { x: 3.0, y: 3.0 }).unwrap();

    world.remove_entity(e2).unwrap();

    assert_eq!(world.archetype_count(), 2); // empty + {Pos}
    assert!(world.is_valid(e1));
    assert!(world.is_valid(e3));
    assert!(!world.is_valid(e2));
    assert_eq!(world.get_component::<Pos>(e1), Some(&Pos { x: 1.0, y: 1.0 }));
    assert_eq!(world.get_component::<Pos>(e3), Some(&Pos { x: 3.0, y: 3.0 }));
}

fn spawn_ab(world: &mut World, n: i32) {
    for i in 0..n {
        let e = world.create_entity_in(BitMask256::EMPTY, &[]);
        world.set_component(e, A(i)).unwrap();
        world.set_component(e, B(i)).unwrap();
    }
}

fn spawn_a_only(world: &mut World, n: i32) {
    for i in 0..n {
        let e = world.create_entity_in(BitMask256::EMPTY, &[]);
        world.set_component(e, A(i)).unwrap();
    }
}

#[test]
fn s4_query_iteration_counts() {
    use arche_ecs::Query;

    let mut world = World::new(16);
    spawn_ab(&mut world, 1000);
    spawn_a_only(&mut world, 500);

    let cid_a = world.register_component::<A>();
    let mut mask_a = BitMask256::EMPTY;
    mask_a.set(cid_a);

    let mut q_a = Query::new(mask_a);
    q_a.reset(&world);
    let mut count = 0;
    let mut sum = 0i64;
    while q_a.next(&world) {
        count += 1;
        sum += q_a.get::<A>(&world).unwrap().0 as i64;
    }
    assert_eq!(count, 1500);
    let expected: i64 = (0..1000i64).sum::<i64>() + (0..500i64).sum::<i64>();
    assert_eq!(sum, expected);

    let cid_b = world.register_component::<B>();
    let mut mask_ab = mask_a;
    mask_ab.set(cid_b);
    let mut q_ab = Query::new(mask_ab);
    q_ab.reset(&world);
    let mut count_ab = 0;
    while q_ab.next(&world) {
        count_ab += 1;
    }
    assert_eq!(count_ab, 1000);
}

#[test]
fn s5_query_invalidated_by_new_archetype() {
    use arche_ecs::Query;

    let mut world = World::new(16);
    spawn_a_only(&mut world, 100);
    let cid_a = world.register_component::<A>();
    let mut mask_a = BitMask256::EMPTY;
    mask_a.set(cid_a);

    let mut q = Query::new(mask_a);
    q.reset(&world);
    let mut first_pass = 0;
    let mut some_entity: Option<Entity> = None;
    while q.next(&world) {
        first_pass += 1;
        if some_entity.is_none() {
            some_entity = Some(q.entity(&world));
        }
    }
    assert_eq!(first_pass, 100);

    // Adding B to one entity creates archetype {A,B}; still matches mask{A}.
    world.set_component(some_entity.unwrap(), B(42)).unwrap();

    q.reset(&world);
    let mut second_pass = 0;
    while q.next(&world) {
        second_pass += 1;
    }
    assert_eq!(second_pass, 100);
}

#[test]
fn s6_batch_remove_via_query() {
    use arche_ecs::Query;

    let mut world = World::new(16);
    spawn_ab(&mut world, 1000);

    let mut ac_entities = Vec::new();
    for i in 0..500 {
        let e = world.create_entity_in(BitMask256::EMPTY, &[]);
        world.set_component(e, A(i)).unwrap();
        world.set_component(e, C(i)).unwrap();
        ac_entities.push(e);
    }

    let cid_a = world.register_component::<A>();
    let cid_b = world.register_component::<B>();
    let mut mask_ab = BitMask256::EMPTY;
    mask_ab.set(cid_a);
    mask_ab.set(cid_b);

    let mut collector = Query::new(mask_ab);
    collector.reset(&world);
    let doomed: Vec<Entity> = collector.entities(&world).to_vec();
    assert_eq!(doomed.len(), 1000);

    let mut q = Query::new(mask_ab);
    q.reset(&world);
    q.remove_entities(&mut world);

    for e in doomed {
        assert!(!world.is_valid(e));
    }
    for e in ac_entities {
        assert!(world.is_valid(e));
    }

    // The recycled ids must come back out on the next creation.
    let fresh = world.create_entity_in(BitMask256::EMPTY, &[]);
    assert!(fresh.id < 1000);
}

#[test]
fn clearing_the_world_makes_every_prior_entity_stale() {
    let mut world = World::new(8);
    let e1 = world.create_entity_in(BitMask256::EMPTY, &[]);
    let e2 = world.create_entity_in(BitMask256::EMPTY, &[]);
    world.set_component(e1, Pos { x: 1.0, y: 1.0 }).unwrap();

    world.clear_entities();

    assert!(!world.is_valid(e1));
    assert!(!world.is_valid(e2));

    let fresh = world.create_entity_in(BitMask256::EMPTY, &[]);
    assert_eq!(fresh.id, 0);
    assert_eq!(fresh.version, 1);
}

#[test]
fn add_remove_add_roundtrip_lands_on_second_insert() {
    let mut world = World::new(4);
    let e = world.create_entity_in(BitMask256::EMPTY, &[]);

    world.set_component(e, A(1)).unwrap();
    let arch_after_first_add = world.archetype_count();

    world.remove_component::<A>(e).unwrap();
    world.set_component(e, A(2)).unwrap();

    assert_eq!(world.get_component::<A>(e), Some(&A(2)));
    // {A} was already cached by the first add, so no new archetype needed.
    assert_eq!(world.archetype_count(), arch_after_first_add);
}
