#[cfg(test)]
mod features_tests {
    use crate::config::TimeFeature;
    use crate::errors::HydroError;
    use crate::features::*;
    use crate::tests::test_helpers::column_f64;
    use chrono::NaiveDate;
    use polars::prelude::*;

    fn int_column(df: &DataFrame, name: &str) -> Vec<Option<i32>> {
        df.column(name).unwrap().i32().unwrap().into_iter().collect()
    }

    fn plant_frame() -> DataFrame {
        df! {
            "flow_m3s" => [Some(10.0), Some(20.0), None, Some(40.0)],
            "head_m" => [1.0, 2.0, 3.0, 4.0],
            "unit" => ["a", "b", "a", "b"],
        }
        .unwrap()
    }

    #[test]
    fn test_time_features_decompose_calendar() {
        let df = df! {
            "timestamp" => [
                "2024-01-01 05:00:00",
                "2024-03-16T23:30:00",
                "not a date",
                "2024-12-31T10:00:00+02:00",
            ],
        }
        .unwrap();

        let all = [TimeFeature::Hour, TimeFeature::DayOfWeek, TimeFeature::Month];
        let out = add_time_features(&df, "timestamp", &all, ColumnPolicy::BestEffort).unwrap();

        assert_eq!(out.get_column_names(), vec!["timestamp", "hour", "dayofweek", "month"]);
        assert_eq!(int_column(&out, "hour"), vec![Some(5), Some(23), None, Some(10)]);
        assert_eq!(int_column(&out, "dayofweek"), vec![Some(0), Some(5), None, Some(1)]);
        assert_eq!(int_column(&out, "month"), vec![Some(1), Some(3), None, Some(12)]);
    }

    #[test]
    fn test_time_features_only_add_requested_columns() {
        let df = df! { "timestamp" => ["2024-06-01"] }.unwrap();
        let requested = [TimeFeature::Month, TimeFeature::Hour];
        let out =
            add_time_features(&df, "timestamp", &requested, ColumnPolicy::BestEffort).unwrap();
        assert_eq!(out.get_column_names(), vec!["timestamp", "hour", "month"]);
        assert_eq!(int_column(&out, "hour"), vec![Some(0)]);
    }

    #[test]
    fn test_missing_timestamp_respects_policy() {
        let df = plant_frame();
        let hour = [TimeFeature::Hour];
        let out = add_time_features(&df, "timestamp", &hour, ColumnPolicy::BestEffort).unwrap();
        assert_eq!(out.width(), df.width());

        let err = add_time_features(&df, "timestamp", &hour, ColumnPolicy::Strict).unwrap_err();
        assert!(matches!(err, HydroError::MissingColumn { .. }));
    }

    #[test]
    fn test_lags_shift_by_offset() {
        let df = plant_frame();
        let columns = ["head_m", "absent"];
        let out = add_lags(&df, &columns[..], &[1, 2], ColumnPolicy::BestEffort).unwrap();

        assert_eq!(out.width(), df.width() + 2);
        assert_eq!(column_f64(&out, "head_m_lag1"), vec![None, Some(1.0), Some(2.0), Some(3.0)]);
        assert_eq!(column_f64(&out, "head_m_lag2"), vec![None, None, Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_strict_lags_reject_missing_column() {
        let columns = ["absent"];
        let err = add_lags(&plant_frame(), &columns[..], &[1], ColumnPolicy::Strict).unwrap_err();
        assert!(matches!(err, HydroError::MissingColumn { ref column, .. } if column == "absent"));
    }

    #[test]
    fn test_interactions_multiply_and_skip_absent_pairs() {
        let df = plant_frame();
        let pairs = vec![
            ("flow_m3s".to_string(), "head_m".to_string()),
            ("flow_m3s".to_string(), "absent".to_string()),
        ];
        let out = add_interactions(&df, &pairs, ColumnPolicy::BestEffort).unwrap();

        assert_eq!(out.width(), df.width() + 1);
        assert_eq!(
            column_f64(&out, &interaction_column_name("flow_m3s", "head_m")),
            vec![Some(10.0), Some(40.0), None, Some(160.0)]
        );
    }

    #[test]
    fn test_interaction_with_text_column_is_an_error() {
        let pairs = vec![("unit".to_string(), "head_m".to_string())];
        let err = add_interactions(&plant_frame(), &pairs, ColumnPolicy::BestEffort).unwrap_err();
        assert!(matches!(err, HydroError::NonNumericColumn { .. }));
    }

    #[test]
    fn test_finalize_drops_incomplete_rows() {
        let df = df! {
            "flow_m3s" => [Some(1.0), Some(f64::NAN), Some(3.0), Some(4.0)],
            "unit" => [Some("a"), Some("b"), None, Some("d")],
        }
        .unwrap();

        let out = finalize_frame(&df).unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(column_f64(&out, "flow_m3s"), vec![Some(1.0), Some(4.0)]);
        assert_eq!(out.column("unit").unwrap().null_count(), 0);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .and_then(|d| d.and_hms_opt(13, 0, 0))
            .unwrap();
        for raw in [
            "2024-01-15 13:00",
            "2024/01/15 13:00:00",
            "01/15/2024 13:00",
            "01/15/2024 13:00:00",
            "20240115 13:00",
            "2024-01-15 13:00:00.000+0000",
            "2024-01-15 13:00:00+00:00",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "failed on {}", raw);
        }

        let midnight = NaiveDate::from_ymd_opt(2024, 1, 15)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        assert_eq!(parse_timestamp("01/15/2024"), Some(midnight));
        assert_eq!(parse_timestamp("20240115"), Some(midnight));

        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("last tuesday").is_none());
    }

    #[test]
    fn test_month_first_export_keeps_every_row() {
        let df = df! {
            "timestamp" => ["01/15/2024 13:00", "01/15/2024 14:00", "01/16/2024 09:30"],
            "flow_m3s" => [100.0, 110.0, 120.0],
        }
        .unwrap();

        let all = [TimeFeature::Hour, TimeFeature::DayOfWeek, TimeFeature::Month];
        let out = add_time_features(&df, "timestamp", &all, ColumnPolicy::BestEffort).unwrap();
        let out = finalize_frame(&out).unwrap();

        assert_eq!(out.height(), 3);
        assert_eq!(int_column(&out, "hour"), vec![Some(13), Some(14), Some(9)]);
        assert_eq!(int_column(&out, "dayofweek"), vec![Some(0), Some(0), Some(1)]);
    }
}
