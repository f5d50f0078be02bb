// LOT search benchmarks.
//
// A 64x64 grid of one-block boxes with rolling floor heights. `full_search`
// reseeds at one corner and runs until the frontier is exhausted;
// `budgeted_tick` measures the per-tick cost a creature actually pays: one
// `calculate_target` call at the default expansion budget.

use std::hint::black_box;

use cavern_ai::boxes::{BoxGraphBuilder, BoxInfo};
use cavern_ai::config::AiConfig;
use cavern_ai::level::Level;
use cavern_ai::lot::{Lot, MoveEnvelope};
use cavern_ai::prng::GameRng;
use cavern_ai::target::{calculate_target, target_box};
use cavern_ai::types::{BoxId, Position, STEP_L, WALL_L};
use criterion::{Criterion, criterion_group, criterion_main};

const GRID: i32 = 64;

fn grid_level() -> Level {
    let mut b = BoxGraphBuilder::new();
    for x in 0..GRID {
        for z in 0..GRID {
            let height = -STEP_L * ((x / 4 + z / 4) % 3);
            b.add_box(BoxInfo::from_tiles(x, x + 1, z, z + 1, height));
        }
    }
    b.connect_touching();
    Level::new(b.build().expect("grid boxes are well formed")).expect("grid zones fit")
}

fn full_search(c: &mut Criterion) {
    let level = grid_level();
    c.bench_function("lot_full_search_64x64", |bench| {
        bench.iter(|| {
            let mut lot = Lot::new(level.graph().len(), MoveEnvelope::default());
            lot.required_box = Some(BoxId(0));
            let mut report = lot.update(&level, u32::MAX);
            while !report.exhausted {
                report = lot.search(&level, u32::MAX);
            }
            black_box(lot.epoch())
        })
    });
}

fn budgeted_tick(c: &mut Criterion) {
    let level = grid_level();
    let budget = AiConfig::default().expansion_budget;
    let far_corner = BoxId((GRID * GRID - 1) as u32);
    let pos = Position::new(WALL_L / 2, 0, WALL_L / 2);
    c.bench_function("lot_budgeted_tick_64x64", |bench| {
        let mut rng = GameRng::new(42);
        let mut lot = Lot::new(level.graph().len(), MoveEnvelope::default());
        target_box(&mut lot, &level, far_corner, &mut rng, 0);
        bench.iter(|| black_box(calculate_target(&mut lot, &level, pos, Some(BoxId(0)), budget, &mut rng, 0)))
    });
}

criterion_group!(benches, full_search, budgeted_tick);
criterion_main!(benches);
