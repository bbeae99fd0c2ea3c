#![allow(dead_code)]

use sparse_pool::prelude::*;

pub const POOL_SMALL: usize = 10_000;
pub const POOL_MED: usize = 100_000;
pub const POOL_LARGE: usize = 1_000_000;

#[derive(Clone, Copy)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Component for Position {}

#[derive(Clone, Copy)]
pub struct StablePosition {
    pub x: f32,
    pub y: f32,
}

impl Component for StablePosition {
    const IN_PLACE_DELETE: bool = true;
}

pub fn entity(index: usize) -> Entity {
    Entity::new(index as u32, 0)
}

pub fn filled_pool(count: usize) -> Storage<Position> {
    let mut pool = Storage::with_capacity(count);
    for i in 0..count {
        pool.emplace(entity(i), Position { x: i as f32, y: 0.0 });
    }
    pool
}

pub fn filled_stable_pool(count: usize) -> Storage<StablePosition> {
    let mut pool = Storage::with_capacity(count);
    for i in 0..count {
        pool.emplace(entity(i), StablePosition { x: i as f32, y: 0.0 });
    }
    pool
}
