// Purpose: Voices, their envelope snapshots, and the messages that carry
// them from the control side to the audio side

pub mod envelope;
pub mod message;
pub mod voice;
