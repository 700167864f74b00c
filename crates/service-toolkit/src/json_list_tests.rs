//! Tests for the json_list module.

use super::*;
use serde::Deserialize;
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CostRecord {
    country_id: u32,
    year_id: String,
    cost: f64,
}

const COST_ANALYSIS: &str = r#"[
    {"CountryId": 0, "YearId": "2016", "Cost": 69437.0683739},
    {"CountryId": 1, "YearId": "2016", "Cost": 11554.3060812},
    {"CountryId": 2, "YearId": "2015", "Cost": 52012.75},
    {"CountryId": 3, "YearId": "2017", "Cost": 125.5}
]"#;

fn json_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

mod deserialize_tests {
    use super::*;

    /// Verify a cost list can be loaded and queried
    #[test]
    fn test_cost_analysis() {
        let file = json_file(COST_ANALYSIS);

        let records: Vec<CostRecord> = deserialize_list(file.path()).unwrap();

        assert_eq!(records.len(), 4);

        let top = records
            .iter()
            .max_by(|a, b| a.cost.total_cmp(&b.cost))
            .unwrap();
        assert_eq!(top.country_id, 0);

        let total_2016: f64 = records
            .iter()
            .filter(|r| r.year_id == "2016")
            .map(|r| r.cost)
            .sum();
        assert!((total_2016 - 80991.3744551).abs() < 1e-7);
    }

    #[test]
    fn test_empty_array_is_empty_list() {
        let file = json_file("[]");

        let records: Vec<CostRecord> = deserialize_list(file.path()).unwrap();

        assert!(records.is_empty());
    }

    #[test]
    fn test_empty_path() {
        let result = deserialize_list::<CostRecord>("");

        assert!(matches!(
            result,
            Err(JsonListError::InvalidArgument { ref field, .. }) if field == "path"
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Cost Analysis.json");

        let error = deserialize_list::<CostRecord>(&path).unwrap_err();

        assert!(matches!(error, JsonListError::NotFound { .. }));
        assert!(error.to_string().contains("Cost Analysis.json"));
    }

    #[test]
    fn test_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();

        let error = deserialize_list::<CostRecord>(dir.path()).unwrap_err();

        assert!(matches!(error, JsonListError::Io { .. }));
    }

    #[test]
    fn test_malformed_json() {
        let file = json_file("[{\"CountryId\": 0,");

        let error = deserialize_list::<CostRecord>(file.path()).unwrap_err();

        assert!(matches!(error, JsonListError::Parse { .. }));
        assert!(error.to_string().starts_with("Failed to deserialize JSON"));
    }

    #[test]
    fn test_wrong_shape_is_parse_error() {
        let file = json_file(r#"{"CountryId": 0, "YearId": "2016", "Cost": 1.0}"#);

        let error = deserialize_list::<CostRecord>(file.path()).unwrap_err();

        assert!(matches!(error, JsonListError::Parse { .. }));
    }

    #[test]
    fn test_null_is_empty_error() {
        let file = json_file("null");

        let error = deserialize_list::<CostRecord>(file.path()).unwrap_err();

        assert!(matches!(error, JsonListError::Empty { .. }));
    }
}

mod reader_tests {
    use super::*;

    #[test]
    fn test_reader_without_base_dir() {
        let file = json_file("[1, 2, 3]");

        let values: Vec<u32> = JsonListReader::new().read(file.path()).unwrap();

        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_reader_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("years.json"), r#"["2015", "2016"]"#).unwrap();
        let reader = JsonListReader::with_base_dir(dir.path());

        let years: Vec<String> = reader.read("years.json").unwrap();

        assert_eq!(years, vec!["2015", "2016"]);
    }

    #[test]
    fn test_reader_keeps_empty_path_invalid() {
        let reader = JsonListReader::with_base_dir("/tmp");

        let result = reader.read::<u32>("");

        assert!(matches!(result, Err(JsonListError::InvalidArgument { .. })));
    }
}
