//! Quiz pool shaping
//!
//! Model output is normalized item by item, padded with placeholders up to the
//! pool size, and checked by the validator. All three return new values and
//! never mutate their input.

mod normalizer;
mod placeholder;
mod validator;

pub use normalizer::{normalize_item, normalize_pool, OPTION_COUNT};
pub use placeholder::{fill_placeholders, placeholder_item};
pub use validator::validate_pool;
