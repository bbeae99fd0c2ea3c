use sparse_pool::prelude::*;

fn entity(index: u32) -> Entity {
    Entity::new(index, 0)
}

fn pool_with(entities: &[Entity], values: &[u32]) -> Storage<u32> {
    let mut pool = Storage::new();
    pool.insert_from(entities, values.iter().copied());
    pool
}

#[test]
fn sort_on_already_ordered_entries_changes_nothing() {
    let entities = [entity(12), entity(42), entity(7), entity(3), entity(9)];
    let values = [12, 9, 6, 3, 1];
    let mut pool = pool_with(&entities, &values);

    pool.sort_by(|lhs, rhs| lhs < rhs);

    let iterated: Vec<u32> = pool.iter().copied().collect();
    let mut expected = values.to_vec();
    expected.reverse();
    assert_eq!(iterated, expected);

    let packed: Vec<Entity> = pool.packed().to_vec();
    assert_eq!(packed, entities.to_vec());
}

#[test]
fn sort_reverses_fully_inverted_entries() {
    let entities = [entity(12), entity(42), entity(7), entity(3), entity(9)];
    let values = [1, 3, 6, 9, 12];
    let mut pool = pool_with(&entities, &values);

    pool.sort_by(|lhs, rhs| lhs < rhs);

    let iterated: Vec<u32> = pool.iter().copied().collect();
    assert_eq!(iterated, vec![1, 3, 6, 9, 12]);

    let packed: Vec<Entity> = pool.packed().to_vec();
    let mut expected = entities.to_vec();
    expected.reverse();
    assert_eq!(packed, expected);
}

#[test]
fn sort_orders_unordered_entries_by_value() {
    let entities = [entity(12), entity(42), entity(7), entity(3), entity(9)];
    let values = [6, 3, 1, 9, 12];
    let mut pool = pool_with(&entities, &values);

    pool.sort_by(|lhs, rhs| lhs < rhs);

    let iterated: Vec<u32> = pool.iter().copied().collect();
    assert_eq!(iterated, vec![1, 3, 6, 9, 12]);

    // Packed runs descending so iteration (tail to head) runs ascending.
    assert_eq!(
        pool.packed(),
        &[entity(9), entity(3), entity(12), entity(42), entity(7)]
    );
}

#[test]
fn sort_by_entity_key_matches_value_sort_results() {
    let entities = [entity(5), entity(1), entity(3)];
    let values = [50, 10, 30];
    let mut pool = pool_with(&entities, &values);

    pool.sort(|lhs, rhs| lhs.index() < rhs.index());

    let iterated: Vec<u32> = pool.iter().copied().collect();
    assert_eq!(iterated, vec![10, 30, 50]);
}

#[test]
fn sort_preserves_membership_and_value_multiset() {
    let entities: Vec<Entity> = (0..20).map(entity).collect();
    let values: Vec<u32> = (0..20).map(|i| (i * 7) % 13).collect();
    let mut pool = pool_with(&entities, &values);

    pool.sort_by(|lhs, rhs| lhs < rhs);

    assert_eq!(pool.len(), 20);
    for (i, &e) in entities.iter().enumerate() {
        assert!(pool.contains(e));
        assert_eq!(pool.at(pool.index(e)), Some(e));
        assert_eq!(pool.get(e), Some(&values[i]));
    }

    let mut iterated: Vec<u32> = pool.iter().copied().collect();
    let mut expected = values.clone();
    iterated.sort_unstable();
    expected.sort_unstable();
    assert_eq!(iterated, expected);
}

#[test]
fn sort_n_only_touches_the_leading_entries() {
    let entities = [entity(12), entity(42), entity(7), entity(3), entity(9)];
    let values = [3, 6, 1, 9, 12];
    let mut pool = pool_with(&entities, &values);

    pool.sort_n_by(0, |lhs, rhs| lhs < rhs);
    assert_eq!(pool.packed(), &entities);

    pool.sort_n_by(2, |lhs, rhs| lhs < rhs);
    assert_eq!(pool.packed()[..3], [entity(42), entity(12), entity(7)]);
    assert_eq!(pool.get(entity(42)), Some(&6));
    assert_eq!(pool.get(entity(12)), Some(&3));

    pool.sort_n_by(5, |lhs, rhs| lhs < rhs);
    let iterated: Vec<u32> = pool.iter().copied().collect();
    assert_eq!(iterated, vec![1, 3, 6, 9, 12]);
    assert_eq!(
        pool.packed(),
        &[entity(9), entity(3), entity(42), entity(12), entity(7)]
    );
}

#[test]
#[should_panic(expected = "sort range exceeds")]
fn sort_n_rejects_ranges_past_the_end() {
    let mut pool: Storage<u32> = Storage::new();
    pool.emplace(entity(1), 1);
    pool.sort_n_by(2, |lhs, rhs| lhs < rhs);
}

#[test]
fn sort_as_with_a_disjoint_donor_changes_nothing() {
    let entities = [entity(3), entity(12), entity(42)];
    let values = [3, 6, 9];
    let mut lhs = pool_with(&entities, &values);
    let rhs: Storage<u32> = Storage::new();

    lhs.sort_as(rhs.set());

    assert_eq!(lhs.packed(), &entities);
    let iterated: Vec<u32> = lhs.iter().copied().collect();
    assert_eq!(iterated, vec![9, 6, 3]);
}

#[test]
fn sort_as_moves_the_shared_entity_to_the_tail() {
    let mut lhs = pool_with(&[entity(3), entity(12), entity(42)], &[3, 6, 9]);
    let rhs = pool_with(&[entity(12)], &[6]);

    lhs.sort_as(rhs.set());

    assert_eq!(lhs.packed(), &[entity(3), entity(42), entity(12)]);
    let iterated: Vec<u32> = lhs.iter().copied().collect();
    assert_eq!(iterated, vec![6, 9, 3]);
}

#[test]
fn sort_as_is_a_no_op_when_orders_already_agree() {
    let lhs_entities: Vec<Entity> = (1..=5).map(entity).collect();
    let lhs = pool_with(&lhs_entities, &[1, 2, 3, 4, 5]);

    let rhs_entities: Vec<Entity> = [6, 1, 2, 3, 4, 5].map(entity).to_vec();
    let mut rhs = pool_with(&rhs_entities, &[6, 1, 2, 3, 4, 5]);

    rhs.sort_as(lhs.set());

    assert_eq!(rhs.packed(), rhs_entities.as_slice());
}

#[test]
fn sort_as_realigns_a_reversed_pool() {
    let lhs_entities: Vec<Entity> = (1..=5).map(entity).collect();
    let lhs = pool_with(&lhs_entities, &[1, 2, 3, 4, 5]);

    let rhs_entities: Vec<Entity> = [5, 4, 3, 2, 1, 6].map(entity).to_vec();
    let mut rhs = pool_with(&rhs_entities, &[5, 4, 3, 2, 1, 6]);

    rhs.sort_as(lhs.set());

    assert_eq!(
        rhs.packed(),
        &[entity(6), entity(1), entity(2), entity(3), entity(4), entity(5)]
    );
    let iterated: Vec<u32> = rhs.iter().copied().collect();
    assert_eq!(iterated, vec![5, 4, 3, 2, 1, 6]);
}

#[test]
fn sort_as_packs_the_overlap_towards_the_tail() {
    let lhs_entities: Vec<Entity> = (1..=5).map(entity).collect();
    let lhs = pool_with(&lhs_entities, &[1, 2, 3, 4, 5]);

    let rhs_entities: Vec<Entity> = [3, 2, 6, 1, 4, 5].map(entity).to_vec();
    let mut rhs = pool_with(&rhs_entities, &[3, 2, 6, 1, 4, 5]);

    rhs.sort_as(lhs.set());

    assert_eq!(
        rhs.packed(),
        &[entity(6), entity(1), entity(2), entity(3), entity(4), entity(5)]
    );
    let iterated: Vec<u32> = rhs.iter().copied().collect();
    assert_eq!(iterated, vec![5, 4, 3, 2, 1, 6]);
}

#[test]
fn sort_as_is_idempotent_while_the_donor_is_unchanged() {
    let lhs = pool_with(&[entity(2), entity(4)], &[2, 4]);
    let mut rhs = pool_with(&[entity(1), entity(2), entity(3), entity(4)], &[1, 2, 3, 4]);

    rhs.sort_as(lhs.set());
    let once: Vec<Entity> = rhs.packed().to_vec();

    rhs.sort_as(lhs.set());
    assert_eq!(rhs.packed(), once.as_slice());
}

#[test]
fn swap_elements_exchanges_positions_and_values() {
    let mut pool = pool_with(&[entity(1), entity(2), entity(3)], &[10, 20, 30]);

    pool.swap_elements(entity(1), entity(3));

    assert_eq!(pool.index(entity(1)), 2);
    assert_eq!(pool.index(entity(3)), 0);
    assert_eq!(pool.get(entity(1)), Some(&10));
    assert_eq!(pool.get(entity(3)), Some(&30));
    assert_eq!(pool.packed(), &[entity(3), entity(2), entity(1)]);
}

#[test]
fn swap_elements_twice_is_the_identity() {
    let mut pool = pool_with(&[entity(1), entity(2), entity(3)], &[10, 20, 30]);
    let before: Vec<Entity> = pool.packed().to_vec();

    pool.swap_elements(entity(1), entity(2));
    pool.swap_elements(entity(1), entity(2));

    assert_eq!(pool.packed(), before.as_slice());
    assert_eq!(pool.get(entity(1)), Some(&10));
    assert_eq!(pool.get(entity(2)), Some(&20));
}

/// In-place pools refuse to reorder while tombstones are present.
#[derive(Clone, Debug, PartialEq)]
struct Stable(u32);

impl Component for Stable {
    const IN_PLACE_DELETE: bool = true;
}

#[test]
#[should_panic(expected = "compact first")]
fn sorting_an_in_place_pool_with_tombstones_panics() {
    let mut pool: Storage<Stable> = Storage::new();
    pool.emplace(entity(1), Stable(1));
    pool.emplace(entity(2), Stable(2));
    pool.erase(entity(1));

    pool.sort_by(|lhs, rhs| lhs.0 < rhs.0);
}

#[test]
fn in_place_pools_sort_normally_after_a_compact() {
    let mut pool: Storage<Stable> = Storage::new();
    for i in 0..5 {
        pool.emplace(entity(i), Stable(9 - i));
    }
    pool.erase(entity(2));
    pool.compact();

    pool.sort_by(|lhs, rhs| lhs.0 < rhs.0);

    let iterated: Vec<u32> = pool.iter().map(|v| v.0).collect();
    let mut expected = iterated.clone();
    expected.sort_unstable();
    assert_eq!(iterated, expected);
}

#[test]
fn untyped_set_sorts_like_a_typed_pool() {
    let mut set = SparseSet::default();
    set.push_all([entity(5), entity(1), entity(3)]);

    set.sort(|lhs, rhs| lhs.index() < rhs.index());

    let iterated: Vec<Entity> = set.iter().collect();
    assert_eq!(iterated, vec![entity(1), entity(3), entity(5)]);
}
