pub mod config;
pub mod constants;
pub mod data_collection;
pub mod error;
pub mod evaluation;
pub mod pipeline;
pub mod regression;
#[cfg(test)]
pub mod test;
pub mod types;

pub mod util {
    pub mod date_parser;
    pub mod file_utils;
    pub mod model_logger;
    #[cfg(test)]
    pub mod test_utils;
}

/// Package and toolchain details recorded at build time
#[allow(dead_code)]
pub mod build_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
