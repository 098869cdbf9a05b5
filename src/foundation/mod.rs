pub(crate) mod core;
pub(crate) mod error;
pub(crate) mod event;
pub(crate) mod math;
