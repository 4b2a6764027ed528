pub(crate) mod arc;
pub(crate) mod builder;
pub(crate) mod scratch;
pub(crate) mod stream;
