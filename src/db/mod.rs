pub mod entities;
pub mod enums;
pub mod schema;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
