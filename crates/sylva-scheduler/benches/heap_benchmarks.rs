//! Benchmark: heap throughput and scheduler flush cost

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sylva_scheduler::{HeapNode, ManualClock, MinHeap, PriorityLevel, Scheduler};

struct Node(u64, u64);

impl HeapNode for Node {
	type Key = (u64, u64);

	fn key(&self) -> Self::Key {
		(self.0, self.1)
	}
}

fn bench_heap_push_pop(c: &mut Criterion) {
	let mut group = c.benchmark_group("heap_push_pop");
	for size in [64u64, 1024, 16384] {
		group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
			b.iter(|| {
				let mut heap = MinHeap::with_capacity(size as usize);
				// Pseudo-random keys without pulling in an RNG
				for id in 0..size {
					heap.push(Node(id.wrapping_mul(2654435761) % 997, id));
				}
				while let Some(node) = heap.pop() {
					black_box(node.0);
				}
			});
		});
	}
	group.finish();
}

fn bench_scheduler_flush(c: &mut Criterion) {
	c.bench_function("scheduler_flush_1000_tasks", |b| {
		b.iter(|| {
			let scheduler = Scheduler::with_clock(ManualClock::new());
			for i in 0..1000u32 {
				let priority = PriorityLevel::from_level((i % 5 + 1) as u8);
				scheduler.schedule_callback(priority, move |_, _| {
					black_box(i);
					None
				});
			}
			scheduler.run_until_idle();
		});
	});
}

criterion_group!(benches, bench_heap_push_pop, bench_scheduler_flush);
criterion_main!(benches);
