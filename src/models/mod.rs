pub mod participants;

pub use participants::{Participant, ParticipantRow};
