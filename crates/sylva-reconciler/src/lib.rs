//! # Sylva Reconciler
//!
//! Incremental rendering of declarative element trees onto a mutable host
//! tree.
//!
//! ## Architecture
//!
//! - [`element`]: element descriptions and property bags
//! - [`fiber`]: work units, stored in a generational arena, each paired with
//!   its alternate from the previous render
//! - `child_fiber`: the keyed child diff
//! - [`hooks`]: per-unit hook chains (`use_state`, `use_effect`, ...)
//! - [`context`]: context objects and the provider stack
//! - `work_loop` / `begin_work`: the depth-first render driver, which yields
//!   to the scheduler between units
//! - `commit`: applies the finished render to the host tree
//! - [`host`]: the [`HostRenderer`] contract and the in-memory [`MemoryHost`]
//! - [`Root`]: queues updates and runs renders as scheduler tasks
//!
//! ## Example
//!
//! ```rust
//! use sylva_reconciler::{Children, Element, HookContext, MemoryHost, Props, create_root};
//! use sylva_scheduler::{ManualClock, Scheduler};
//!
//! fn greeting(cx: &mut HookContext, props: &Props) -> Children {
//! 	let (name, _) = cx.use_state(|| props.get_str("name").unwrap_or("world").to_string());
//! 	Element::host("h1").text(format!("hello {name}")).into()
//! }
//!
//! let scheduler = Scheduler::with_clock(ManualClock::new());
//! let mut host = MemoryHost::new();
//! let container = host.create_container();
//! let root = create_root(container, host, &scheduler);
//!
//! root.render(Element::function(greeting).prop("name", "sylva")).unwrap();
//! scheduler.run_until_idle();
//!
//! assert_eq!(root.host().to_markup(container), "<h1>hello sylva</h1>");
//! ```

mod begin_work;
mod child_fiber;
mod commit;
pub mod context;
pub mod element;
pub mod error;
pub mod fiber;
pub mod hooks;
pub mod host;
mod root;
mod work_loop;

pub use context::{Context, ContextHandle, ContextId, create_context};
pub use element::{
	ClassType, Children, Component, Element, ElementType, Event, Key, Listener, Node, PropValue,
	Props, RenderFn, text,
};
pub use error::RootError;
pub use fiber::{FiberId, Flags, WorkTag};
pub use hooks::{Dep, Deps, Dispatch, HookContext, SetState, Teardown, are_hook_inputs_equal};
pub use host::{HostOp, HostRenderer, MemoryHost, NodeId, PropPatch, Snapshot, diff_properties};
pub use root::{Root, create_root};
