//! End-to-end pipeline test: lookup CSV in, profile CSV out, with
//! in-memory source fetchers standing in for the remote families.

use geoprof_common::MeasureValue;
use geoprof_ingest::catalog::MeasureCatalog;
use geoprof_ingest::geography::ResolvedGeography;
use geoprof_ingest::lookup::LookupTable;
use geoprof_ingest::output::write_table_path;
use geoprof_ingest::types::{FetchError, FetchOutcome, RawRow, SourceFamily, SourceFetcher};
use geoprof_ingest::ProfileBuilder;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

/// Canned per-place outcomes for one source family
struct CannedFetcher {
    family: SourceFamily,
    rows_by_place: HashMap<String, Vec<RawRow>>,
}

#[async_trait::async_trait]
impl SourceFetcher for CannedFetcher {
    fn family(&self) -> SourceFamily {
        self.family
    }

    async fn fetch(&self, geography: &ResolvedGeography) -> Result<FetchOutcome, FetchError> {
        match self.rows_by_place.get(&geography.place_id) {
            Some(rows) => Ok(FetchOutcome::Rows(rows.clone())),
            None => Ok(FetchOutcome::NoData),
        }
    }
}

const LOOKUP_CSV: &str = "\
id,name,GEOIDFQ,AREATYPE,PLACENAME,COMMENT
AK1,Adak,0500000US02013,County,Aleutians West Census Area,
AK95,Chignik Lagoon,1400000US02090001700,Census tract,Census Tract 17,merged
AK95,Chignik Lagoon,1400000US02090001800,Census tract,Census Tract 18,merged
";

fn decennial_row(keys: &[(&str, &str)], population: &str) -> RawRow {
    let mut row = RawRow::new();
    for (column, value) in keys {
        row.set(*column, *value);
    }
    row.set("P12_001N", population);
    // quiet age brackets: every resident is an adult
    for code in [
        "P12_003N", "P12_004N", "P12_005N", "P12_006N", "P12_020N", "P12_021N", "P12_022N",
        "P12_023N", "P12_024N", "P12_025N", "P12_027N", "P12_028N", "P12_029N", "P12_030N",
        "P12_044N", "P12_045N", "P12_046N", "P12_047N", "P12_048N", "P12_049N",
    ] {
        row.set(code, "0");
    }
    row
}

fn survey_row(keys: &[(&str, &str)], estimate: &str, moe: &str) -> RawRow {
    let mut row = RawRow::new();
    for (column, value) in keys {
        row.set(*column, *value);
    }
    row.set("S2701_C03_001E", estimate);
    row.set("S2701_C03_001M", moe);
    row
}

fn health_row(location_id: &str, value: &str, low: &str, high: &str) -> RawRow {
    let mut row = RawRow::new();
    row.set("locationid", location_id);
    row.set("CASTHMA", value);
    row.set("lo_pct_asthma", low);
    row.set("hi_pct_asthma", high);
    row
}

fn fetchers() -> Vec<Arc<dyn SourceFetcher>> {
    let decennial = CannedFetcher {
        family: SourceFamily::Decennial,
        rows_by_place: HashMap::from([
            (
                "AK1".to_string(),
                vec![decennial_row(&[("state", "02"), ("county", "013")], "3420")],
            ),
            (
                "AK95".to_string(),
                vec![
                    decennial_row(
                        &[("state", "02"), ("county", "090"), ("tract", "001700")],
                        "100",
                    ),
                    decennial_row(
                        &[("state", "02"), ("county", "090"), ("tract", "001800")],
                        "300",
                    ),
                ],
            ),
        ]),
    };
    let survey = CannedFetcher {
        family: SourceFamily::Survey,
        rows_by_place: HashMap::from([
            (
                "AK1".to_string(),
                vec![survey_row(&[("state", "02"), ("county", "013")], "91.2", "2.5")],
            ),
            (
                "AK95".to_string(),
                vec![
                    survey_row(
                        &[("state", "02"), ("county", "090"), ("tract", "001700")],
                        "80",
                        "3",
                    ),
                    survey_row(
                        &[("state", "02"), ("county", "090"), ("tract", "001800")],
                        "90",
                        "4",
                    ),
                ],
            ),
        ]),
    };
    let health = CannedFetcher {
        family: SourceFamily::Health,
        rows_by_place: HashMap::from([
            (
                "AK1".to_string(),
                vec![health_row("02013", "9.4", "8.1", "10.7")],
            ),
            (
                "AK95".to_string(),
                vec![
                    health_row("02090001700", "10", "8", "12"),
                    health_row("02090001800", "20", "18", "22"),
                ],
            ),
        ]),
    };
    vec![Arc::new(decennial), Arc::new(survey), Arc::new(health)]
}

#[tokio::test]
async fn test_full_pipeline_single_and_pooled_places() {
    let table = LookupTable::from_reader(LOOKUP_CSV.as_bytes()).unwrap();
    let builder = ProfileBuilder::new(MeasureCatalog::builtin(), fetchers(), 2);

    let run = builder.build_profiles(&table).await;
    assert!(run.failures.is_empty(), "failures: {:?}", run.failures);
    assert_eq!(run.records.len(), 2);

    // single-geography place passes through
    let adak = &run.records[0];
    assert_eq!(adak.place_id, "AK1");
    assert_eq!(adak.value("total_population"), MeasureValue::Known(3420.0));
    assert_eq!(adak.value("pct_insured"), MeasureValue::Known(91.2));
    assert_eq!(adak.value("pct_asthma"), MeasureValue::Known(9.4));
    assert_eq!(adak.value("lo_pct_asthma"), MeasureValue::Known(8.1));
    assert_eq!(adak.comment, "");

    // two merged tracts, populations 100 and 300
    let chignik = &run.records[1];
    assert_eq!(chignik.place_id, "AK95");
    assert_eq!(chignik.value("total_population"), MeasureValue::Known(400.0));
    // insured: (0.80×100 + 0.90×300)/400 × 100 = 87.5, MOE √(3²+4²) = 5
    assert_eq!(chignik.value("pct_insured"), MeasureValue::Known(87.5));
    assert_eq!(chignik.value("moe_pct_insured"), MeasureValue::Known(5.0));
    assert_eq!(chignik.value("lo_pct_insured"), MeasureValue::Known(82.5));
    assert_eq!(chignik.value("hi_pct_insured"), MeasureValue::Known(92.5));
    // asthma: adults = totals here, so (0.10×100 + 0.20×300)/400 × 100 = 17.5
    assert_eq!(chignik.value("pct_asthma"), MeasureValue::Known(17.5));
    let low = chignik.value("lo_pct_asthma").as_f64().unwrap();
    let high = chignik.value("hi_pct_asthma").as_f64().unwrap();
    assert!(low >= 0.0 && low < 17.5);
    assert!(high > 17.5);
    // no race counts were fetched: shares stay unknown
    assert!(chignik.value("pct_white").is_unknown());
    assert_eq!(
        chignik.comment,
        "Data for this place represent multiple merged census tracts: \
         Census Tract 17 and Census Tract 18"
    );
    assert_eq!(chignik.geo_keys, "090001700; 090001800");
}

#[tokio::test]
async fn test_pipeline_writes_csv_from_lookup_file() {
    let dir = tempfile::tempdir().unwrap();
    let lookup_path = dir.path().join("lookup.csv");
    let output_path = dir.path().join("profiles.csv");
    let mut lookup_file = std::fs::File::create(&lookup_path).unwrap();
    lookup_file.write_all(LOOKUP_CSV.as_bytes()).unwrap();
    drop(lookup_file);

    let table = LookupTable::from_csv_path(&lookup_path).unwrap();
    let catalog = MeasureCatalog::builtin();
    let builder = ProfileBuilder::new(catalog.clone(), fetchers(), 4);
    let run = builder.build_profiles(&table).await;

    write_table_path(&run.records, &catalog, &output_path).unwrap();

    let written = std::fs::read_to_string(&output_path).unwrap();
    let mut lines = written.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("id,name,areatype,placename,geoid"));
    assert!(header.ends_with("comment"));
    // one row per place, lookup order
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("AK1,Adak,county,"));
    assert!(rows[1].starts_with("AK95,Chignik Lagoon,census tract,"));
}

#[tokio::test]
async fn test_missing_family_data_leaves_measures_unknown() {
    let table = LookupTable::from_reader(LOOKUP_CSV.as_bytes()).unwrap();
    // only the decennial family answers
    let only_decennial: Vec<Arc<dyn SourceFetcher>> = vec![fetchers().remove(0)];
    let builder = ProfileBuilder::new(MeasureCatalog::builtin(), only_decennial, 2);

    let run = builder.build_profiles(&table).await;
    assert!(run.failures.is_empty());
    for record in &run.records {
        assert!(record.value("pct_insured").is_unknown());
        assert!(record.value("pct_asthma").is_unknown());
        assert!(!record.value("total_population").is_unknown());
    }
}
