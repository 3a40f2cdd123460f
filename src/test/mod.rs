/// Integration-style tests that run several modules together
///
/// * `file_utils_tests` - Reading price and series CSVs, writing outputs
/// * `data_collect_tests` - Row, label and cache behaviour of `DataCollect`
/// * `pipeline_tests` - End-to-end runs on generated price files
pub mod data_collect_tests;
pub mod pipeline_tests;
