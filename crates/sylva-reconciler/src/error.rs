//! Root error types

/// Error returned by [`crate::Root`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RootError {
	/// The root was unmounted and accepts no further work.
	#[error("root has been unmounted")]
	Unmounted,

	/// The operation was attempted from inside a component render.
	#[error("root is in the middle of rendering")]
	RenderInProgress,
}
