//! Assembly of labelled feature rows from prices, indicators and fundamentals
//!
//! * `base_class` - date range, loaded prices, date-keyed merging and the on-disk cache
//! * `handle_stock_price` - sliding price windows and label normalization
//! * `stock_indicator` - technical indicators aligned by date
//! * `fundamental_analysis` - external per-date series aligned by date
//! * `data_collect` - ties the sources together into `LabeledPoint`s

pub mod base_class;
pub mod data_collect;
pub mod fundamental_analysis;
pub mod handle_stock_price;
pub mod stock_indicator;

pub use base_class::BaseClass;
pub use data_collect::{
    split_train_test, CollectedData, CsvPriceSource, DataCollect, PriceSource, RequiredInfo,
};
pub use fundamental_analysis::FundamentalSource;
pub use stock_indicator::{IndicatorKind, IndicatorSpec};
