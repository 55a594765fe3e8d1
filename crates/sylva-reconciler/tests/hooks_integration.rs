//! Hooks driven through real renders and commits.

use std::cell::RefCell;

use rstest::{fixture, rstest};
use sylva_reconciler::{
	Children, Element, Event, HookContext, MemoryHost, NodeId, Props, Root, RootError, SetState,
	Teardown, deps,
};
use sylva_scheduler::{ManualClock, Scheduler};

thread_local! {
	static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
	static SETTER: RefCell<Option<SetState<i64>>> = const { RefCell::new(None) };
}

fn log(entry: impl Into<String>) {
	LOG.with(|log| log.borrow_mut().push(entry.into()));
}

fn take_log() -> Vec<String> {
	LOG.with(|log| log.borrow_mut().drain(..).collect())
}

struct Fixture {
	scheduler: Scheduler,
	root: Root<MemoryHost>,
	container: NodeId,
}

impl Fixture {
	fn render(&self, children: impl Into<Children>) {
		self.root.render(children).unwrap();
		self.scheduler.run_until_idle();
	}

	fn markup(&self) -> String {
		self.root.host().to_markup(self.container)
	}

	/// Delivers `event` to the first element named `tag`, then lets the
	/// scheduler drain.
	fn fire(&self, tag: &str, event: Event) {
		let target = self.root.host().elements_by_tag(self.container, tag)[0];
		let called = self.root.host().dispatch_event(target, &event);
		assert_eq!(called, 1);
		self.scheduler.run_until_idle();
	}
}

#[fixture]
fn fixture() -> Fixture {
	take_log();
	SETTER.with(|setter| setter.borrow_mut().take());
	let scheduler = Scheduler::with_clock(ManualClock::new());
	let mut host = MemoryHost::new();
	let container = host.create_container();
	let root = sylva_reconciler::create_root(container, host, &scheduler);
	Fixture {
		scheduler,
		root,
		container,
	}
}

fn counter(cx: &mut HookContext, _props: &Props) -> Children {
	let (count, set_count) = cx.use_state(|| 0_i64);
	let current = *count;
	SETTER.with(|setter| *setter.borrow_mut() = Some(set_count.clone()));
	cx.use_effect(
		move || {
			log(format!("effect {current}"));
			Teardown::new(move || log(format!("cleanup {current}")))
		},
		Some(deps![current]),
	);
	Element::host("button")
		.on("click", move |_| set_count.update(|n| n + 1))
		.text(current.to_string())
		.into()
}

fn set_counter(value: i64) {
	SETTER.with(|setter| {
		if let Some(setter) = setter.borrow().as_ref() {
			setter.set(value);
		}
	});
}

#[rstest]
fn test_click_updates_state_and_reruns_effect(fixture: Fixture) {
	// Arrange
	fixture.render(Element::function(counter));
	assert_eq!(fixture.markup(), "<button>0</button>");
	assert_eq!(take_log(), vec!["effect 0"]);

	// Act
	fixture.fire("button", Event::new("click"));

	// Assert
	assert_eq!(fixture.markup(), "<button>1</button>");
	assert_eq!(take_log(), vec!["cleanup 0", "effect 1"]);
}

#[rstest]
fn test_effect_is_skipped_when_deps_are_unchanged(fixture: Fixture) {
	fixture.render(Element::function(counter));
	take_log();

	fixture.render(Element::function(counter));

	assert_eq!(fixture.markup(), "<button>0</button>");
	assert!(take_log().is_empty());
}

#[rstest]
fn test_updates_before_the_render_are_batched(fixture: Fixture) {
	fixture.render(Element::function(counter));
	take_log();

	set_counter(4);
	set_counter(5);
	assert_eq!(fixture.root.pending_updates(), 1);
	fixture.scheduler.run_until_idle();

	assert_eq!(fixture.markup(), "<button>5</button>");
	assert_eq!(take_log(), vec!["cleanup 0", "effect 5"]);
}

#[rstest]
fn test_localized_update_leaves_siblings_alone(fixture: Fixture) {
	// Arrange
	fixture.render(
		Element::host("main")
			.child(Element::host("h1").text("title"))
			.child(Element::function(counter)),
	);
	fixture.root.host_mut().take_ops();

	// Act
	set_counter(7);
	fixture.scheduler.run_until_idle();

	// Assert
	assert_eq!(fixture.markup(), "<main><h1>title</h1><button>7</button></main>");
	let button = fixture.root.host().elements_by_tag(fixture.container, "button")[0];
	let ops = fixture.root.host_mut().take_ops();
	assert!(!ops.is_empty());
	assert!(ops.iter().all(|op| format!("{op:?}").contains(&format!("{button:?}"))));
}

#[rstest]
fn test_unmount_runs_teardowns_and_rejects_renders(fixture: Fixture) {
	// Arrange
	fixture.render(Element::function(counter));
	take_log();

	// Act
	fixture.root.unmount().unwrap();

	// Assert
	assert_eq!(fixture.markup(), "");
	assert_eq!(take_log(), vec!["cleanup 0"]);
	assert_eq!(
		fixture.root.render(Element::host("p")),
		Err(RootError::Unmounted)
	);
	assert_eq!(fixture.root.unmount(), Err(RootError::Unmounted));

	set_counter(3);
	fixture.scheduler.run_until_idle();
	assert_eq!(fixture.markup(), "");
}

#[rstest]
fn test_removed_component_ignores_stale_setter(fixture: Fixture) {
	fixture.render(Element::function(counter));
	fixture.render(Element::host("p").text("gone"));
	assert_eq!(take_log(), vec!["effect 0", "cleanup 0"]);

	set_counter(9);
	fixture.scheduler.run_until_idle();

	assert_eq!(fixture.markup(), "<p>gone</p>");
	assert!(take_log().is_empty());
}

fn ordered_effects(cx: &mut HookContext, _props: &Props) -> Children {
	cx.use_effect(|| log("passive"), None);
	cx.use_layout_effect(|| log("layout"), None);
	Element::host("div").into()
}

#[rstest]
fn test_layout_effects_run_before_passive_effects(fixture: Fixture) {
	fixture.render(Element::function(ordered_effects));
	assert_eq!(take_log(), vec!["layout", "passive"]);

	fixture.render(Element::function(ordered_effects));
	assert_eq!(take_log(), vec!["layout", "passive"]);
}

fn nested_effects(cx: &mut HookContext, props: &Props) -> Children {
	let name = props.get_str("name").unwrap_or_default().to_string();
	let passive = name.clone();
	cx.use_effect(move || log(format!("passive {passive}")), None);
	let layout = name.clone();
	cx.use_layout_effect(move || log(format!("layout {layout}")), None);
	if name == "parent" {
		Element::function(nested_effects).prop("name", "child").into()
	} else {
		Element::host("i").into()
	}
}

#[rstest]
fn test_both_effect_flavors_run_children_first(fixture: Fixture) {
	fixture.render(Element::function(nested_effects).prop("name", "parent"));

	assert_eq!(
		take_log(),
		vec!["layout child", "layout parent", "passive child", "passive parent"]
	);
}

#[derive(Debug)]
enum Action {
	Add(i64),
	Reset,
}

fn tally(cx: &mut HookContext, _props: &Props) -> Children {
	let (total, dispatch) = cx.use_reducer(
		|state: &i64, action: Action| match action {
			Action::Add(amount) => state + amount,
			Action::Reset => 0,
		},
		|| 0_i64,
	);
	let reset = dispatch.clone();
	Element::host("div")
		.child(
			Element::host("input").on("input", move |event: &Event| {
				let amount = event.value.as_deref().and_then(|value| value.parse().ok()).unwrap_or(0);
				dispatch.dispatch(Action::Add(amount));
			}),
		)
		.child(Element::host("button").on("click", move |_| reset.dispatch(Action::Reset)))
		.child(Element::host("output").text(total.to_string()))
		.into()
}

#[rstest]
fn test_reducer_applies_actions(fixture: Fixture) {
	fixture.render(Element::function(tally));

	fixture.fire("input", Event::new("input").with_value("5"));
	fixture.fire("input", Event::new("input").with_value("7"));
	assert!(fixture.markup().ends_with("<output>12</output></div>"));

	fixture.fire("button", Event::new("click"));
	assert!(fixture.markup().ends_with("<output>0</output></div>"));
}

fn memoized(cx: &mut HookContext, props: &Props) -> Children {
	let n = props.get_int("n").unwrap_or(0);
	let square = cx.use_memo(
		move || {
			log(format!("compute {n}"));
			n * n
		},
		deps![n],
	);
	let renders = cx.use_ref(|| 0_u32);
	*renders.borrow_mut() += 1;
	let renders = *renders.borrow();
	Element::host("span")
		.prop("data-renders", i64::from(renders))
		.text(square.to_string())
		.into()
}

#[rstest]
fn test_memo_recomputes_only_on_changed_deps(fixture: Fixture) {
	// Act
	fixture.render(Element::function(memoized).prop("n", 3));
	fixture.render(Element::function(memoized).prop("n", 3));
	fixture.render(Element::function(memoized).prop("n", 4));

	// Assert
	assert_eq!(take_log(), vec!["compute 3", "compute 4"]);
	assert_eq!(fixture.markup(), "<span data-renders=\"3\">16</span>");
}

fn mounted_item(cx: &mut HookContext, props: &Props) -> Children {
	let label = props.get_str("label").unwrap_or_default().to_string();
	let name = label.clone();
	cx.use_layout_effect(
		move || {
			log(format!("mount {name}"));
			Teardown::new(move || log(format!("unmount {name}")))
		},
		Some(deps![]),
	);
	Element::host("li").text(label).into()
}

#[rstest]
fn test_deleted_children_tear_down_before_layout_effects(fixture: Fixture) {
	let items = |labels: &[&str]| {
		Element::host("ul").children(
			labels
				.iter()
				.map(|label| {
					Element::function(mounted_item)
						.key(*label)
						.prop("label", *label)
				})
				.collect::<Vec<_>>(),
		)
	};
	fixture.render(items(&["a", "b"]));
	assert_eq!(take_log(), vec!["mount a", "mount b"]);

	fixture.render(items(&["b", "c"]));

	assert_eq!(take_log(), vec!["unmount a", "mount c"]);
	assert_eq!(fixture.markup(), "<ul><li>b</li><li>c</li></ul>");
}
