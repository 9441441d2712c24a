pub mod participant_id;
pub mod participant_service;
pub mod storage_service;
