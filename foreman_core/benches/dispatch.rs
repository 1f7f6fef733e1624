// Dispatch benchmark: one `tick()` over many live tasks.
//
// Stub collaborators grant everything except the worker pool, which runs
// dry after a few acquisitions, so most tasks park in `AcquiringWorker` and
// the measured cost is the steady-state update pass plus event routing.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use foreman_core::config::AgentConfig;
use foreman_core::error::LedgerError;
use foreman_core::event::{EntityRef, WorldEvent};
use foreman_core::ledger::ResourceLedger;
use foreman_core::scheduler::TaskScheduler;
use foreman_core::services::{Order, PlacementOracle, Services, UnitControl, WorkerPool};
use foreman_core::types::{Cost, Position, Priority, TilePosition, UnitId, UnitKind};
use std::hint::black_box;

struct Bottomless;

impl ResourceLedger for Bottomless {
    fn reserve(&mut self, _cost: Cost) -> bool {
        true
    }

    fn release(&mut self, _cost: Cost) -> Result<(), LedgerError> {
        Ok(())
    }
}

struct FewWorkers {
    next: u32,
    limit: u32,
}

impl WorkerPool for FewWorkers {
    fn acquire(&mut self, _capability: UnitKind, _near: Position) -> Option<UnitId> {
        (self.next < self.limit).then(|| {
            self.next += 1;
            UnitId(self.next)
        })
    }

    fn release(&mut self, _worker: UnitId) {}
}

struct OpenField;

impl PlacementOracle for OpenField {
    fn resolve(&self, _kind: UnitKind, near: TilePosition) -> Option<TilePosition> {
        Some(near)
    }

    fn is_valid(&self, _kind: UnitKind, _at: TilePosition, _worker: UnitId) -> bool {
        true
    }
}

struct Statues;

impl UnitControl for Statues {
    fn position(&self, _unit: UnitId) -> Option<Position> {
        Some(Position::new(0, 0))
    }

    fn current_order(&self, _unit: UnitId) -> Option<Order> {
        Some(Order::Idle)
    }

    fn issue_move(&mut self, _unit: UnitId, _to: Position) -> bool {
        true
    }

    fn issue_build(&mut self, _unit: UnitId, _kind: UnitKind, _at: TilePosition) -> bool {
        true
    }

    fn issue_train(&mut self, _producer: UnitId, _kind: UnitKind) -> bool {
        true
    }

    fn halt(&mut self, _unit: UnitId) -> bool {
        true
    }

    fn cancel_construction(&mut self, _entity: UnitId) -> bool {
        false
    }

    fn remaining_build_time(&self, _entity: UnitId) -> Option<u32> {
        None
    }
}

fn bench_tick(c: &mut Criterion) {
    let config = AgentConfig::default();
    let mut group = c.benchmark_group("tick");
    for count in [16u64, 256, 2048] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut scheduler = TaskScheduler::new();
            for i in 0..count {
                let location = TilePosition::new((i % 64) as i32 * 4, (i / 64) as i32 * 3);
                let kind = if i % 3 == 0 {
                    UnitKind::Marine
                } else {
                    UnitKind::SupplyDepot
                };
                scheduler
                    .create_task(&config, kind, Priority::Normal, location, false)
                    .expect("default profiles cover bench kinds");
            }
            let mut ledger = Bottomless;
            let mut workers = FewWorkers { next: 0, limit: 8 };
            let mut units = Statues;
            let mut frame = 0u32;
            b.iter(|| {
                frame += 1;
                scheduler.notify(WorldEvent::UnitCreated(EntityRef {
                    id: UnitId(10_000 + frame),
                    kind: UnitKind::Scv,
                    owned: true,
                }));
                let mut services = Services {
                    config: &config,
                    ledger: &mut ledger,
                    workers: &mut workers,
                    placement: &OpenField,
                    units: &mut units,
                };
                black_box(scheduler.tick(&mut services))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
