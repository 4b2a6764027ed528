pub(crate) mod blend;
pub(crate) mod device;
pub(crate) mod dispatch;
pub(crate) mod fallback;
pub(crate) mod raster;
pub(crate) mod renderer;
pub(crate) mod software;
pub(crate) mod vello;
