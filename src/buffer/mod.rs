pub(crate) mod convert;
pub(crate) mod descriptor;
pub(crate) mod format;
