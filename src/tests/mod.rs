pub mod test_helpers;

mod data_tests;
mod features_tests;
