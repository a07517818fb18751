pub mod client_queries;
pub mod consumption_queries;
