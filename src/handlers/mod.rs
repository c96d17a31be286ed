pub mod mpesa_handlers;
