pub mod callback;
pub mod payment;
pub mod transaction;
