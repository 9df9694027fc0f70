//! Property tests: random sequences of registry operations must preserve
//! the store's core invariants (spec §8).

use archetype_ecs::prelude::*;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
struct Pos {
    x: f32,
    y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
struct Vel {
    dx: f32,
    dy: f32,
}

#[derive(Debug, Clone)]
enum Op {
    SpawnPos(f32, f32),
    SpawnPosVel(f32, f32, f32, f32),
    Erase(usize),
    PutVel(usize, f32, f32),
    EraseVel(usize),
    CountPos,
    CountPosVel,
}

fn finite_f32() -> impl Strategy<Value = f32> {
    (-1_000_000i32..1_000_000i32).prop_map(|v| v as f32 * 0.01)
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (finite_f32(), finite_f32()).prop_map(|(x, y)| Op::SpawnPos(x, y)),
        (finite_f32(), finite_f32(), finite_f32(), finite_f32())
            .prop_map(|(x, y, dx, dy)| Op::SpawnPosVel(x, y, dx, dy)),
        (0..100usize).prop_map(Op::Erase),
        (0..100usize, finite_f32(), finite_f32()).prop_map(|(i, dx, dy)| Op::PutVel(i, dx, dy)),
        (0..100usize).prop_map(Op::EraseVel),
        Just(Op::CountPos),
        Just(Op::CountPosVel),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(2_000))]

    /// After any sequence of structural operations, the registry's live
    /// count matches our own tracking, every handle we believe alive
    /// resolves successfully, and view counts never exceed it (spec §8
    /// invariants 1, 3, 7).
    #[test]
    fn random_ops_preserve_core_invariants(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let registry = Registry::new();
        let mut alive: Vec<Handle> = Vec::new();

        for op in ops {
            match op {
                Op::SpawnPos(x, y) => {
                    alive.push(registry.insert((Pos { x, y },)));
                }
                Op::SpawnPosVel(x, y, dx, dy) => {
                    alive.push(registry.insert((Pos { x, y }, Vel { dx, dy })));
                }
                Op::Erase(idx) => {
                    if !alive.is_empty() {
                        let idx = idx % alive.len();
                        let h = alive.remove(idx);
                        let _ = registry.erase_entity(h);
                    }
                }
                Op::PutVel(idx, dx, dy) => {
                    if !alive.is_empty() {
                        let idx = idx % alive.len();
                        let _ = registry.put(alive[idx], (Vel { dx, dy },));
                    }
                }
                Op::EraseVel(idx) => {
                    if !alive.is_empty() {
                        let idx = idx % alive.len();
                        let _ = registry.erase_components::<(Vel,)>(alive[idx]);
                    }
                }
                Op::CountPos => {
                    prop_assert!(registry.count_view(&[type_id_of::<Pos>()], &[]) <= alive.len());
                }
                Op::CountPosVel => {
                    prop_assert!(
                        registry.count_view(&[type_id_of::<Pos>(), type_id_of::<Vel>()], &[]) <= alive.len()
                    );
                }
            }

            prop_assert_eq!(registry.size(), alive.len());
            for &h in &alive {
                prop_assert!(registry.exists(h));
            }
        }
    }

    /// A handle's generation is bumped on every free/reuse cycle, so a
    /// handle captured before an erase never resolves again afterward,
    /// even once its slot index has been recycled by a fresh insert (spec
    /// §8 invariant 4).
    #[test]
    fn erased_handles_never_resolve_again(
        spawn_count in 1..20usize,
        erase_indices in prop::collection::vec(0..20usize, 1..10),
    ) {
        let registry = Registry::new();
        let mut entities: Vec<Handle> = (0..spawn_count)
            .map(|i| registry.insert((Pos { x: i as f32, y: 0.0 },)))
            .collect();

        let mut erased = Vec::new();
        for idx in erase_indices {
            if !entities.is_empty() {
                let idx = idx % entities.len();
                let h = entities.remove(idx);
                let _ = registry.erase_entity(h);
                erased.push(h);
            }
        }

        for _ in 0..erased.len() {
            entities.push(registry.insert((Pos { x: 999.0, y: 999.0 },)));
        }

        for h in erased {
            prop_assert!(!registry.exists(h));
            prop_assert_eq!(registry.get::<Pos, _>(h, |p| *p), Err(EcsError::DeadHandle));
        }
        for &h in &entities {
            prop_assert!(registry.exists(h));
        }
    }

    /// `Put`-triggered migration preserves every pre-existing component's
    /// value exactly, in both directions (spec §8 invariant 2).
    #[test]
    fn migration_preserves_existing_component_values(
        x in finite_f32(),
        y in finite_f32(),
        dx in finite_f32(),
        dy in finite_f32(),
        remove_after in proptest::bool::ANY,
    ) {
        let registry = Registry::new();
        let h = registry.insert((Pos { x, y },));

        registry.put(h, (Vel { dx, dy },)).unwrap();
        prop_assert_eq!(registry.get::<Pos, _>(h, |p| *p).unwrap(), Pos { x, y });
        prop_assert_eq!(registry.get::<Vel, _>(h, |v| *v).unwrap(), Vel { dx, dy });

        if remove_after {
            registry.erase_components::<(Vel,)>(h).unwrap();
            prop_assert_eq!(registry.get::<Pos, _>(h, |p| *p).unwrap(), Pos { x, y });
            prop_assert!(!registry.has::<Vel>(h).unwrap());
        }
    }
}
