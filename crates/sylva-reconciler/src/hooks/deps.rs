//! Dependency arrays for memo and effect hooks

use core::any::Any;
use std::rc::Rc;

/// One entry of a dependency array.
///
/// Entries compare like `Object.is`: floats by bit pattern (so `NaN` equals
/// itself and `0.0` differs from `-0.0`) and shared values by address.
#[derive(Clone, Debug)]
pub enum Dep {
	Unit,
	Bool(bool),
	Int(i64),
	UInt(u64),
	Float(f64),
	Str(Rc<str>),
	Char(char),
	Ptr(Rc<dyn Any>),
}

impl Dep {
	/// Identity of a shared value.
	pub fn ptr<T: 'static>(value: &Rc<T>) -> Self {
		Dep::Ptr(value.clone())
	}

	/// `Object.is` comparison.
	pub fn is(&self, other: &Dep) -> bool {
		match (self, other) {
			(Dep::Unit, Dep::Unit) => true,
			(Dep::Bool(a), Dep::Bool(b)) => a == b,
			(Dep::Int(a), Dep::Int(b)) => a == b,
			(Dep::UInt(a), Dep::UInt(b)) => a == b,
			(Dep::Float(a), Dep::Float(b)) => a.to_bits() == b.to_bits(),
			(Dep::Str(a), Dep::Str(b)) => a == b,
			(Dep::Char(a), Dep::Char(b)) => a == b,
			(Dep::Ptr(a), Dep::Ptr(b)) => core::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
			_ => false,
		}
	}
}

impl PartialEq for Dep {
	fn eq(&self, other: &Self) -> bool {
		self.is(other)
	}
}

/// A dependency array.
pub type Deps = Vec<Dep>;

impl From<()> for Dep {
	fn from(_: ()) -> Self {
		Dep::Unit
	}
}

impl From<bool> for Dep {
	fn from(value: bool) -> Self {
		Dep::Bool(value)
	}
}

impl From<char> for Dep {
	fn from(value: char) -> Self {
		Dep::Char(value)
	}
}

impl From<f64> for Dep {
	fn from(value: f64) -> Self {
		Dep::Float(value)
	}
}

impl From<&str> for Dep {
	fn from(value: &str) -> Self {
		Dep::Str(Rc::from(value))
	}
}

impl From<String> for Dep {
	fn from(value: String) -> Self {
		Dep::Str(Rc::from(value))
	}
}

impl From<Rc<str>> for Dep {
	fn from(value: Rc<str>) -> Self {
		Dep::Str(value)
	}
}

impl<T: 'static> From<&Rc<T>> for Dep {
	fn from(value: &Rc<T>) -> Self {
		Dep::ptr(value)
	}
}

macro_rules! dep_from_int {
	($variant:ident($target:ty): $($ty:ty),*) => {
		$(
			impl From<$ty> for Dep {
				fn from(value: $ty) -> Self {
					Dep::$variant(value as $target)
				}
			}
		)*
	};
}

dep_from_int!(Int(i64): i8, i16, i32, i64, isize);
dep_from_int!(UInt(u64): u8, u16, u32, u64, usize);

/// Builds a dependency array.
///
/// ```rust
/// use sylva_reconciler::{Dep, deps};
///
/// let deps = deps![1, "label", true];
/// assert_eq!(deps, vec![Dep::Int(1), Dep::from("label"), Dep::Bool(true)]);
/// assert!(deps![].is_empty());
/// ```
#[macro_export]
macro_rules! deps {
	() => {
		::std::vec::Vec::<$crate::Dep>::new()
	};
	($($dep:expr),+ $(,)?) => {
		::std::vec![$($crate::Dep::from($dep)),+]
	};
}

/// Shallow comparison of two dependency arrays.
///
/// No previous array never matches. Otherwise entries are compared up to the
/// length of the shorter array.
pub fn are_hook_inputs_equal(next: &[Dep], previous: Option<&[Dep]>) -> bool {
	let Some(previous) = previous else {
		return false;
	};
	next.iter()
		.zip(previous.iter())
		.all(|(next, previous)| next.is(previous))
}
