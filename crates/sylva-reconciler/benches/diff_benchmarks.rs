//! Benchmark: keyed list renders through a root

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sylva_reconciler::{Element, MemoryHost, create_root};
use sylva_scheduler::{ManualClock, Scheduler};

fn list(keys: impl Iterator<Item = u32>) -> Element {
	Element::host("ul").children(
		keys.map(|key| Element::host("li").key(key).text(key.to_string()))
			.collect::<Vec<_>>(),
	)
}

fn bench_initial_render(c: &mut Criterion) {
	let mut group = c.benchmark_group("initial_render");
	for size in [100u32, 1000] {
		group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
			b.iter(|| {
				let scheduler = Scheduler::with_clock(ManualClock::new());
				let mut host = MemoryHost::new();
				let container = host.create_container();
				let root = create_root(container, host, &scheduler);
				root.render(list(0..size)).ok();
				scheduler.run_until_idle();
				black_box(root.unit_count());
			});
		});
	}
	group.finish();
}

fn bench_reverse_keyed_list(c: &mut Criterion) {
	c.bench_function("reverse_1000_keyed_items", |b| {
		let scheduler = Scheduler::with_clock(ManualClock::new());
		let mut host = MemoryHost::new();
		let container = host.create_container();
		let root = create_root(container, host, &scheduler);
		let mut reversed = false;
		b.iter(|| {
			let tree = if reversed {
				list(0..1000)
			} else {
				list((0..1000).rev())
			};
			reversed = !reversed;
			root.render(tree).ok();
			scheduler.run_until_idle();
			black_box(root.host_mut().take_ops().len());
		});
	});
}

criterion_group!(benches, bench_initial_render, bench_reverse_keyed_list);
criterion_main!(benches);
