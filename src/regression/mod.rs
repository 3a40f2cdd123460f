pub mod step_1_tensor_preparation;
pub mod step_2_model_arch;
pub mod step_3_train_model;
pub mod step_4_prediction;
pub mod step_5_model_serialization;

pub use step_1_tensor_preparation::FeatureScaler;
pub use step_2_model_arch::LinearRegression;
pub use step_3_train_model::{train_linear_regression_with_sgd, RegressionConfig, TrainedRegression};
pub use step_4_prediction::{predict, predict_one};
pub use step_5_model_serialization::{
    get_model_path, load_model_with_metadata, model_file_name, save_model_with_metadata,
    ModelMetadata,
};
