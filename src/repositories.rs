pub mod carts;
pub mod catalog;
pub mod kv;
pub mod orders;
pub mod users;
