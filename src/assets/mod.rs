pub(crate) mod cache;
pub(crate) mod import;
pub(crate) mod prepare;
pub(crate) mod raster;
pub(crate) mod vector;
