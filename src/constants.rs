// Order of the per-window price features
pub const PRICE_FEATURES: [&str; 4] = ["open_avg", "max_high", "min_low", "close_avg"];
pub const MAX_PRICE_INDEX: usize = 1;
pub const MIN_PRICE_INDEX: usize = 2;

// Fundamental analysis series
pub const US10Y_BOND: &str = "US10Y_BOND";
pub const US30Y_BOND: &str = "US30Y_BOND";
pub const HSI: &str = "HSI";
pub const FXI: &str = "FXI";
pub const IC: &str = "IC";
pub const IA: &str = "IA";
pub const FUNDAMENTAL_KEYS: [&str; 6] = [US10Y_BOND, US30Y_BOND, HSI, FXI, IC, IA];

// Normalization
pub const MIN_MAX_EPSILON: f64 = 1e-4;

// Data split
pub const TRAIN_SPLIT_RATIO: f64 = 0.8;

// Linear regression with SGD
pub const SGD_STEP: f64 = 0.0001;
pub const SGD_ITERATIONS: usize = 1000;
pub const SGD_MINI_BATCH_FRACTION: f64 = 1.0;

// Window sizes swept by the experiment command
pub const EXPERIMENT_WINDOWS: std::ops::RangeInclusive<usize> = 3..=8;

// File locations
pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATA_PATH: &str = "data";
pub const CACHE_PATH: &str = "cache";
pub const MODEL_PATH: &str = "models";
pub const EXPERIMENT_PATH: &str = "experiments";
pub const CACHE_FILE_EXTENSION: &str = "dat";
pub const PRICE_FEATURES_FILE: &str = "price_features";
pub const MODEL_FILE_NAME: &str = "_linear_regression";
