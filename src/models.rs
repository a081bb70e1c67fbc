pub mod temp_channel;
