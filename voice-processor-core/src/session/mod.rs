pub mod capture;
pub mod listeners;
pub mod pending;
pub mod permission;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;
