pub mod announcement;
pub mod temp_voice;
