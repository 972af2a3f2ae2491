//! Traits implemented by user components.

mod dispose;

pub use dispose::Dispose;
