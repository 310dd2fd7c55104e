pub mod bytes;
pub mod human;
