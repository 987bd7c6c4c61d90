//! Concrete combinator types. Each is a small struct implementing
//! [`crate::effect::trait_def::MicroEffect`]; see [`crate::effect::ext::MicroEffectExt`]
//! for the ergonomic method-call form.

pub mod as_;
pub mod as_result;
pub mod async_;
pub mod flat_map;
pub mod map;
pub mod never;
pub mod sleep;
pub mod tap;
pub mod zip_right;

pub use as_::{As, AsVoid};
pub use as_result::AsResult;
pub use async_::{async_effect, AsyncEffect, Resume};
pub use flat_map::FlatMap;
pub use map::Map;
pub use never::{never, Never};
pub use sleep::{sleep, Sleep};
pub use tap::Tap;
pub use zip_right::ZipRight;
