pub mod device;
pub mod errlog;
pub mod farm;
pub mod smart;
pub mod trip;
