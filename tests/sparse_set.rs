use sparse_pool::prelude::*;

fn entity(index: u32) -> Entity {
    Entity::new(index, 0)
}

#[test]
fn default_set_uses_swap_and_pop() {
    let set = SparseSet::default();
    assert_eq!(set.policy(), DeletionPolicy::SwapAndPop);
    assert!(set.is_empty());
}

#[test]
fn push_reports_position_and_rejects_duplicates() {
    let mut set = SparseSet::default();

    assert_eq!(set.push(entity(3)), Some(0));
    assert_eq!(set.push(entity(12)), Some(1));
    assert_eq!(set.push(entity(3)), None);
    assert_eq!(set.len(), 2);
}

#[test]
fn membership_respects_versions() {
    let mut set = SparseSet::default();
    set.push(Entity::new(7, 2));

    assert!(set.contains(Entity::new(7, 2)));
    assert!(!set.contains(Entity::new(7, 1)));
    assert_eq!(set.index_of(Entity::new(7, 1)), None);
    assert_eq!(set.index(Entity::new(7, 2)), 0);
}

#[test]
fn swap_and_pop_erase_moves_the_tail_entry() {
    let mut set = SparseSet::default();
    set.push_all([entity(3), entity(12), entity(42)]);

    set.erase(entity(12));

    assert_eq!(set.len(), 2);
    assert_eq!(set.index(entity(3)), 0);
    assert_eq!(set.index(entity(42)), 1);
    assert_eq!(set.at(2), None);
}

#[test]
fn in_place_erase_tombstones_and_reuses() {
    let mut set = SparseSet::new(DeletionPolicy::InPlace);
    set.push_all([entity(3), entity(12), entity(42)]);

    set.erase(entity(12));

    assert_eq!(set.len(), 3);
    assert_eq!(set.live_len(), 2);
    assert!(set.at(1).unwrap().is_tombstone());

    assert_eq!(set.push(entity(7)), Some(1));
    assert_eq!(set.live_len(), 3);
}

#[test]
fn iteration_runs_in_reverse_insertion_order() {
    let mut set = SparseSet::default();
    set.push_all([entity(1), entity(2), entity(3)]);

    let forward: Vec<Entity> = set.iter().collect();
    assert_eq!(forward, vec![entity(3), entity(2), entity(1)]);

    let backward: Vec<Entity> = set.iter().rev().collect();
    assert_eq!(backward, vec![entity(1), entity(2), entity(3)]);
}

#[test]
fn remove_all_counts_only_stored_entities() {
    let mut set = SparseSet::default();
    set.push_all([entity(1), entity(2)]);

    let removed = set.remove_all([entity(1), entity(9), entity(2), entity(1)]);
    assert_eq!(removed, 2);
    assert!(set.is_empty());
}

#[test]
fn compact_squeezes_out_every_tombstone() {
    let mut set = SparseSet::new(DeletionPolicy::InPlace);
    set.push_all((0..8).map(entity));

    set.erase_all([entity(0), entity(7), entity(3)]);
    assert_eq!(set.live_len(), 5);

    set.compact();

    assert_eq!(set.len(), 5);
    assert_eq!(set.live_len(), 5);
    for i in [1, 2, 4, 5, 6] {
        assert_eq!(set.at(set.index(entity(i))), Some(entity(i)));
    }
}

#[test]
fn clear_then_shrink_releases_the_sparse_index() {
    let mut set = SparseSet::default();
    set.push_all((0..64).map(entity));

    set.clear();
    set.shrink_to_fit();

    assert!(set.is_empty());
    assert_eq!(set.capacity(), 0);
    assert!(!set.contains(entity(0)));
}

#[test]
fn swap_elements_twice_is_the_identity() {
    let mut set = SparseSet::default();
    set.push_all([entity(1), entity(2), entity(3)]);
    let before: Vec<Entity> = set.packed().to_vec();

    set.swap_elements(entity(1), entity(3));
    assert_eq!(set.index(entity(1)), 2);
    assert_eq!(set.index(entity(3)), 0);

    set.swap_elements(entity(1), entity(3));
    assert_eq!(set.packed(), before.as_slice());
}

#[test]
fn sort_as_aligns_the_intersection_with_the_donor() {
    let mut lhs = SparseSet::default();
    lhs.push_all([entity(3), entity(12), entity(42)]);

    let mut rhs = SparseSet::default();
    rhs.push(entity(12));

    lhs.sort_as(&rhs);

    assert_eq!(lhs.packed(), &[entity(3), entity(42), entity(12)]);
}

#[test]
fn reserve_pre_allocates_packed_capacity() {
    let mut set = SparseSet::default();
    set.reserve(100);
    assert!(set.capacity() >= 100);

    let cap = set.capacity();
    set.push_all((0..100).map(entity));
    assert_eq!(set.capacity(), cap);
}
