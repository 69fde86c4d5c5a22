pub mod capture {
    pub mod capture_session;
    pub mod domain {
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod detection {
    pub mod domain {
        pub mod coin_detector;
    }
    pub mod infrastructure;
}

pub mod mapping {
    pub mod coordinate_mapper;
}

pub mod pipeline {
    pub mod diagnostics;
    pub mod frame_fault;
    pub mod infrastructure;
    pub mod pipeline_logger;
    pub mod processing_pipeline;
    pub mod result_sink;
}

pub mod processing {
    pub mod frame_converter;
    pub mod processor_config;
    pub mod rate_limiter;
}

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod region;
}
