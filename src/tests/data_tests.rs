#[cfg(test)]
mod data_tests {
    use crate::config::FeatureConfig;
    use crate::data::*;
    use crate::errors::HydroError;
    use crate::tests::test_helpers::synthetic_hydro_frame;
    use polars::prelude::*;

    #[test]
    fn test_prepare_dataset_separates_target() {
        let df = synthetic_hydro_frame(30, 1);
        let cfg = FeatureConfig::default();
        let dataset = prepare_dataset(&df, "marginal_cost", Some("timestamp"), &cfg).unwrap();

        // Two lag rows lost to the largest offset.
        assert_eq!(dataset.n_rows(), 28);
        assert_eq!(dataset.features.height(), dataset.n_rows());

        let names = dataset.features.get_column_names();
        assert!(!names.contains(&"marginal_cost"));
        assert!(names.contains(&"timestamp"));
        let expected = [
            "hour",
            "dayofweek",
            "month",
            "flow_m3s_lag2",
            "head_m_lag1",
            "flow_m3s__x__head_m",
            "gate_opening__x__efficiency",
        ];
        for name in expected {
            assert!(names.contains(&name), "missing {}", name);
        }
    }

    #[test]
    fn test_timestamp_can_be_dropped_after_time_features() {
        let df = synthetic_hydro_frame(10, 1);
        let cfg = FeatureConfig {
            keep_timestamp: false,
            ..FeatureConfig::default()
        };
        let frame = assemble_features(&df, Some("timestamp"), &cfg).unwrap();
        assert!(frame.column("timestamp").is_err());
        assert!(frame.column("hour").is_ok());
        assert!(frame.column("marginal_cost").is_ok());
    }

    #[test]
    fn test_missing_target_lists_first_twenty_columns() {
        let columns: Vec<Series> = (0..25)
            .map(|i| Series::new(&format!("sensor_{:02}", i), [1.0, 2.0, 3.0]))
            .collect();
        let df = DataFrame::new(columns).unwrap();

        let cfg = FeatureConfig::default();
        let err = prepare_dataset(&df, "marginal_cost", None, &cfg).unwrap_err();
        match err {
            HydroError::MissingTarget { available, .. } => {
                let expected: Vec<String> = (0..20).map(|i| format!("sensor_{:02}", i)).collect();
                assert_eq!(available, expected);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_target_is_a_config_error() {
        let df = synthetic_hydro_frame(10, 1);
        let cfg = FeatureConfig::default();
        let err = prepare_dataset(&df, "price_eur", Some("timestamp"), &cfg).unwrap_err();

        assert!(err.is_config_error());
        match err {
            HydroError::MissingTarget { target, available } => {
                assert_eq!(target, "price_eur");
                assert!(available.contains(&"marginal_cost".to_string()));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_describe_columns_reports_dtypes() {
        let df = synthetic_hydro_frame(5, 1);
        let summary = describe_columns(&df);
        assert_eq!(summary.len(), 6);
        assert_eq!(summary[0].name, "timestamp");
        assert_eq!(summary[1].null_count, 0);
    }
}
