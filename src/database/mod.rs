pub mod participant_repo;
pub mod schema;
