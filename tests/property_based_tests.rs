//! Property-based tests for sampler line filtering and time extraction

use benchio::csv_output::format_sample;
use benchio::iostat::SampleParser;
use benchio::timing::extract_execution_time;
use proptest::prelude::*;

const DEVICE: &str = "nvme2n1";

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_foreign_lines_never_produce_rows(
        first in "[A-Za-z0-9_%/-]{1,12}",
        rest in prop::collection::vec("[0-9]{1,5}\\.[0-9]{2}", 0..20),
    ) {
        prop_assume!(first != DEVICE);
        let parser = SampleParser::new(DEVICE);
        let line = format!("{} {}", first, rest.join(" "));

        // Property: only the monitored device's rows are ever accepted
        prop_assert_eq!(parser.parse_line(1, &line), Ok(None));
    }

    #[test]
    fn prop_device_rows_map_schema_columns(
        values in prop::collection::vec(0u32..1_000_000, 9..24),
    ) {
        let parser = SampleParser::new(DEVICE);
        let tokens: Vec<String> = values.iter().map(|v| format!("{}.00", v)).collect();
        let line = format!("{} {}", DEVICE, tokens.join(" "));

        let sample = parser.parse_line(1, &line).unwrap().unwrap();

        // token[i] of the line is values[i - 1]
        prop_assert_eq!(sample.reads_per_sec, values[0] as f64);
        prop_assert_eq!(sample.read_mb_per_sec, values[1] as f64 / 1024.0);
        prop_assert_eq!(sample.writes_per_sec, values[6] as f64);
        prop_assert_eq!(sample.write_mb_per_sec, values[7] as f64 / 1024.0);
        prop_assert_eq!(sample.util_percent, *values.last().unwrap() as f64);

        let row = format_sample(&sample);
        prop_assert!(row.starts_with("nvme2n1, "));
        prop_assert_eq!(row.split(", ").count(), 6);
    }

    #[test]
    fn prop_short_device_rows_are_rejected(
        values in prop::collection::vec(0u32..1000, 0..8),
    ) {
        let parser = SampleParser::new(DEVICE);
        let tokens: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        let line = format!("{} {}", DEVICE, tokens.join(" "));

        prop_assert!(parser.parse_line(1, &line).is_err());
    }

    #[test]
    fn prop_result_text_is_returned_verbatim(
        whole in "[0-9]{1,6}",
        frac in "[0-9]{1,6}",
        prefix in "[a-z \n]{0,40}",
    ) {
        let time = format!("{}.{}", whole, frac);
        let output = format!("{}\nResult: {}\ntrailing", prefix, time);
        prop_assert_eq!(extract_execution_time(&output), Some(time.as_str()));
    }
}
