//! End-to-end scenarios: artifacts on disk, single records and CSV batches.

use starclass::artifacts::{ArtifactPaths, Artifacts};
use starclass::batch::run_batch;
use starclass::encoding::OovPolicy;
use starclass::error::{BatchError, PredictionError};
use starclass::pipeline::PredictionPipeline;
use starclass::record::{Field, RawStarRecord, StarRecord};
use starclass::star_type::StarType;
use starclass::test_util::write_reference_artifacts;
use std::sync::Arc;
use tempfile::TempDir;

fn load_pipeline(policy: OovPolicy) -> (TempDir, PredictionPipeline) {
    let dir = TempDir::new().unwrap();
    let paths = write_reference_artifacts(dir.path()).unwrap();
    let artifacts = Artifacts::load(&paths).expect("reference artifacts load");
    (dir, PredictionPipeline::new(Arc::new(artifacts), policy))
}

fn read_rows(csv: &[u8]) -> Vec<Vec<String>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(csv)
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

const SCENARIO_2_CSV: &str = "Temperature,L,R,A_M,Color,Spectral_Class\n\
    5778,1.0,1.0,4.83,Yellow,G\n\
    12000,250000,80,-7.0,Blue,Z\n\
    3000,0.002,0.2,12.0,Red,M\n";

#[test]
fn test_sun_like_star_is_main_sequence() {
    let (_dir, pipeline) = load_pipeline(OovPolicy::Fallback);
    let record = StarRecord::new(5778.0, 1.0, 1.0, 4.83, "Yellow", "G");
    let prediction = pipeline.predict_one(&record).unwrap();
    assert_eq!(prediction.star_type, StarType::MainSequence);
    assert_eq!(prediction.star_type.to_string(), "Main Sequence");
}

#[test]
fn test_batch_with_invalid_spectral_class_falls_back() {
    let (_dir, pipeline) = load_pipeline(OovPolicy::Fallback);
    let mut out = Vec::new();
    let report = run_batch(&pipeline, SCENARIO_2_CSV.as_bytes(), &mut out).unwrap();

    assert_eq!(report.total_rows, 3);
    assert_eq!(report.predicted, 3);
    assert_eq!(report.fallback_rows, 1);
    assert!(report.failures.is_empty());

    let rows = read_rows(&out);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1][6], "Main Sequence");
    assert_eq!(rows[2][6], "Supergiant");
    assert_eq!(rows[3][6], "Red Dwarf");
}

#[test]
fn test_batch_with_invalid_spectral_class_rejects_row() {
    let (_dir, pipeline) = load_pipeline(OovPolicy::Reject);
    let mut out = Vec::new();
    let report = run_batch(&pipeline, SCENARIO_2_CSV.as_bytes(), &mut out).unwrap();

    assert_eq!(report.total_rows, 3);
    assert_eq!(report.predicted, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].row, 2);
    assert_eq!(
        report.failures[0].error,
        PredictionError::UnknownCategory {
            field: Field::SpectralClass,
            value: "Z".to_string()
        }
    );

    let rows = read_rows(&out);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[1][6], "Main Sequence");
    assert_eq!(rows[2][6], "");
    assert_eq!(rows[3][6], "Red Dwarf");
}

#[test]
fn test_missing_radius_column_is_schema_mismatch() {
    let (_dir, pipeline) = load_pipeline(OovPolicy::Fallback);
    let csv = "Temperature,Luminosity,Absolute_Magnitude,Color,Spectral_Class\n\
               5778,1.0,4.83,Yellow,G\n";
    let mut out = Vec::new();

    match run_batch(&pipeline, csv.as_bytes(), &mut out) {
        Err(BatchError::SchemaMismatch(mismatch)) => {
            assert_eq!(mismatch.missing, vec![Field::Radius]);
            assert!(mismatch.to_string().contains("Radius"));
        }
        other => panic!("expected schema mismatch, got {other:?}"),
    }
    assert!(out.is_empty(), "no partial output may be written");
}

#[test]
fn test_unknown_color_does_not_abort_batch() {
    for policy in [OovPolicy::Fallback, OovPolicy::Reject] {
        let (_dir, pipeline) = load_pipeline(policy);
        let csv = "Temperature,L,R,A_M,Color,Spectral_Class\n\
                   5778,1.0,1.0,4.83,Ultraviolet,G\n\
                   5778,1.0,1.0,4.83,Yellow,G\n";
        let report = run_batch(&pipeline, csv.as_bytes(), Vec::<u8>::new()).unwrap();
        assert_eq!(report.total_rows, 2, "policy {policy}");
        assert!(report.predicted >= 1, "policy {policy}");
    }
}

#[test]
fn test_field_order_at_the_boundary_is_irrelevant() {
    let (_dir, pipeline) = load_pipeline(OovPolicy::Reject);

    let forward: RawStarRecord = serde_json::from_str(
        r#"{"temperature": 25000, "luminosity": 0.056, "radius": 0.0084,
            "absolute_magnitude": 10.58, "color": "Blue White", "spectral_class": "B"}"#,
    )
    .unwrap();
    let reversed: RawStarRecord = serde_json::from_str(
        r#"{"spectral_class": "B", "color": "Blue White", "absolute_magnitude": 10.58,
            "radius": 0.0084, "luminosity": 0.056, "temperature": 25000}"#,
    )
    .unwrap();

    let a = pipeline
        .predict_one(&forward.into_record().unwrap())
        .unwrap();
    let b = pipeline
        .predict_one(&reversed.into_record().unwrap())
        .unwrap();
    assert_eq!(a, b);
    assert_eq!(a.star_type, StarType::WhiteDwarf);

    let csv_a = "Temperature,L,R,A_M,Color,Spectral_Class\n25000,0.056,0.0084,10.58,Blue White,B\n";
    let csv_b = "Spectral_Class,Color,A_M,R,L,Temperature\nB,Blue White,10.58,0.0084,0.056,25000\n";
    let mut out_a = Vec::new();
    let mut out_b = Vec::new();
    run_batch(&pipeline, csv_a.as_bytes(), &mut out_a).unwrap();
    run_batch(&pipeline, csv_b.as_bytes(), &mut out_b).unwrap();
    assert_eq!(read_rows(&out_a)[1][6], read_rows(&out_b)[1][6]);
}

#[test]
fn test_every_valid_record_maps_to_a_star_type() {
    let (_dir, pipeline) = load_pipeline(OovPolicy::Reject);
    let colors = pipeline.artifacts().color_encoder().classes().to_vec();
    let classes = pipeline.artifacts().spectral_encoder().classes().to_vec();

    for temperature in [1939.0, 3500.0, 5778.0, 12000.0, 40000.0] {
        for magnitude in [-11.0, -6.0, 0.0, 4.83, 10.0, 13.0, 16.0, 20.0] {
            for (color, class) in colors.iter().zip(classes.iter().cycle()) {
                let record = StarRecord::new(temperature, 1.0, 1.0, magnitude, color, class);
                let prediction = pipeline.predict_one(&record).unwrap();
                assert!(StarType::ALL.contains(&prediction.star_type));
            }
        }
    }
}

#[test]
fn test_pipeline_is_shareable_across_threads() {
    let (_dir, pipeline) = load_pipeline(OovPolicy::Fallback);
    let records: Vec<StarRecord> = (0..64)
        .map(|i| StarRecord::new(3000.0 + 500.0 * i as f64, 1.0, 1.0, -10.0 + i as f64 * 0.5, "Red", "M"))
        .collect();
    let expected = pipeline.predict(&records);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = pipeline.clone();
            let records = records.clone();
            std::thread::spawn(move || pipeline.predict(&records))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_startup_fails_without_artifacts() {
    let dir = TempDir::new().unwrap();
    let paths = ArtifactPaths::in_dir(dir.path());
    let err = Artifacts::load(&paths).unwrap_err();
    assert!(err.to_string().contains("classifier artifact not found"));
}
