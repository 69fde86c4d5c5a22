pub mod channel_result_sink;
