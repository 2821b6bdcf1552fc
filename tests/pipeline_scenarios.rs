//! End-to-end scenarios through the public API, on synthetic images.

use tone_calibration::{
    BodyRatioCalculator, BoundingBox, CalibrationConfig, CalibrationPipeline, ConfidenceGrade,
    CorrectionGains, Error, FaceJob, FallbackProducer, Fallbacks, ImageBuffer, Landmark,
    LightingAnalyzer, LightingConfig, Season, Stage, WhiteBalanceConfig, WhiteBalanceCorrector,
    WhiteBalanceMethod,
};

const SKIN: [u8; 3] = [205, 155, 130];
const BACKDROP: [u8; 3] = [150, 165, 190];

/// Fine diagonal stripes: 40% skin, 60% cool backdrop.
fn portrait(width: u32, height: u32) -> ImageBuffer {
    ImageBuffer::from_fn(width, height, |x, y| if (x + y) % 5 < 2 { SKIN } else { BACKDROP }).unwrap()
}

/// 468 landmarks spread deterministically over `bbox`, all equally visible.
fn face_mesh(bbox: BoundingBox, visibility: f32) -> Vec<Landmark> {
    (0..468)
        .map(|i| {
            let u = ((i * 37) % 101) as f32 / 100.0;
            let v = ((i * 53) % 103) as f32 / 102.0;
            Landmark::new(
                bbox.x_min + u * bbox.width(),
                bbox.y_min + v * bbox.height(),
                0.0,
                visibility,
            )
        })
        .collect()
}

fn face_box() -> BoundingBox {
    BoundingBox::new(0.25, 0.2, 0.75, 0.8)
}

#[test]
fn frontal_face_in_neutral_light() {
    let pipeline = CalibrationPipeline::default();
    let analysis = pipeline
        .analyze_face(&portrait(120, 120), &[face_mesh(face_box(), 0.92)])
        .unwrap();

    assert!(analysis.face.confidence > 0.8);
    assert!(!analysis.face.is_fallback);
    assert!((analysis.skin.coverage_percent - 40.0).abs() < 1.5);

    let lighting = &analysis.lighting;
    assert!(
        (5500.0..7000.0).contains(&lighting.cct_kelvin),
        "cct {}",
        lighting.cct_kelvin
    );
    assert!(lighting.suitable, "issues {:?}", lighting.issues);

    assert!(analysis.tone.confidence > 0.6);
    assert_eq!(analysis.tone.season, Season::BrightSpring);
    assert_eq!(analysis.tone.ranking.len(), 12);

    assert!(!analysis.overall.is_fallback);
    assert_eq!(analysis.overall.grade, ConfidenceGrade::High);
}

#[test]
fn empty_landmarks_give_sample_result() {
    let pipeline = CalibrationPipeline::default();
    let analysis = pipeline.analyze_face(&portrait(120, 120), &[]).unwrap();

    assert!(analysis.face.is_fallback);
    assert_eq!(analysis.face.confidence, 0.5);
    assert!(Season::ALL.contains(&analysis.tone.season));
    assert!((0.0..=1.0).contains(&analysis.tone.confidence));

    assert!(analysis.overall.sample_result);
    assert!(analysis.overall.is_fallback);
    assert!(analysis
        .overall
        .stages
        .iter()
        .any(|s| s.stage == Stage::Face && s.is_fallback));
}

#[test]
fn low_visibility_candidate_falls_back() {
    let pipeline = CalibrationPipeline::default();
    let analysis = pipeline
        .analyze_face(&portrait(80, 80), &[face_mesh(face_box(), 0.3)])
        .unwrap();
    assert!(analysis.face.is_fallback);
    assert!(analysis.overall.sample_result);
}

#[test]
fn short_pose_is_surfaced() {
    let pose = vec![Landmark::new(0.5, 0.5, 0.0, 1.0); 20];
    let calculator = BodyRatioCalculator::new(CalibrationConfig::default().body);
    let err = calculator.calculate(&pose).unwrap_err();
    assert!(matches!(err, Error::IncompletePoseLandmarks { .. }));
    assert!(err.to_string().contains("20"));

    // The orchestrated body branch substitutes and flags instead.
    let body = CalibrationPipeline::default().analyze_body(&pose, 1.0).unwrap();
    assert!(body.ratios.is_fallback);
    assert!(body.overall.is_fallback);
}

#[test]
fn out_of_range_gain_is_replaced_by_identity() {
    let corrector = WhiteBalanceCorrector::new(WhiteBalanceConfig::default());
    let region = ImageBuffer::from_fn(6, 6, |_, _| [25, 150, 125]).unwrap();

    let result = corrector.skin_aware(&region, [25.0, 150.0, 125.0], 50.0);
    match &result {
        Err(Error::InvalidCorrectionGains { r, .. }) => assert!((r - 5.0).abs() < 0.1),
        other => panic!("expected rejected gains, got {other:?}"),
    }

    let fallbacks = Fallbacks::default();
    let substituted = tone_calibration::recover(
        Stage::WhiteBalance,
        result,
        &fallbacks.white_balance,
        &region,
    )
    .unwrap();
    assert_eq!(substituted.gains, CorrectionGains::IDENTITY);
    assert_eq!(substituted.method, WhiteBalanceMethod::Identity);
    assert!(substituted.is_fallback);
    assert_eq!(substituted.corrected, region);
}

#[test]
fn unbalanceable_image_keeps_running() {
    // No blue at all: gray-world would need an infinite blue gain.
    let image = ImageBuffer::from_fn(50, 50, |_, _| [200, 120, 0]).unwrap();
    let analysis = CalibrationPipeline::default()
        .analyze_face(&image, &[face_mesh(face_box(), 0.95)])
        .unwrap();

    assert!(analysis.white_balance.is_fallback);
    assert_eq!(analysis.white_balance.gains, CorrectionGains::IDENTITY);
    assert!(analysis.tone.is_fallback);
    assert!(analysis.overall.is_fallback);
    assert!(!analysis.overall.sample_result);
}

#[test]
fn one_shadowed_zone() {
    let analyzer = LightingAnalyzer::new(LightingConfig::default());
    let lighting = analyzer.assess_luminances(6000.0, [200.0, 195.0, 205.0, 30.0]);
    assert!((lighting.shadow_score - 0.75).abs() < 1e-6);
    assert!(!lighting.suitable);
    assert_eq!(lighting.zones.iter().filter(|z| z.shadowed).count(), 1);
}

#[test]
fn malformed_buffer_reaches_the_caller() {
    let err = CalibrationPipeline::default()
        .analyze_raw(vec![0; 47], 4, 4, tone_calibration::PixelFormat::Rgb, &[])
        .unwrap_err();
    assert!(matches!(err, Error::MalformedImageBuffer { .. }));
    assert!(!err.is_recoverable());
}

#[test]
fn batch_keeps_input_order() {
    let jobs: Vec<FaceJob> = (0..6)
        .map(|i| FaceJob {
            image: portrait(60 + i * 10, 60),
            candidates: if i % 2 == 0 {
                vec![face_mesh(face_box(), 0.95)]
            } else {
                Vec::new()
            },
        })
        .collect();

    let results = CalibrationPipeline::default().analyze_batch(&jobs);
    assert_eq!(results.len(), jobs.len());
    for (i, result) in results.iter().enumerate() {
        let analysis = result.as_ref().unwrap();
        assert_eq!(analysis.face.is_fallback, i % 2 == 1, "job {i}");
    }
}

#[test]
fn report_serializes_without_pixels() {
    let analysis = CalibrationPipeline::default()
        .analyze_face(&portrait(60, 60), &[face_mesh(face_box(), 0.95)])
        .unwrap();
    let json = serde_json::to_value(&analysis).unwrap();

    assert!(json["white_balance"].get("corrected").is_none());
    assert!(json["face"].get("landmarks").is_none());
    assert_eq!(json["face"]["is_fallback"], false);
    assert_eq!(json["tone"]["season"], "BrightSpring");
    assert!(json["overall"]["stages"].as_array().unwrap().len() == 4);
}

#[test]
fn config_file_overrides_are_partial() {
    let config = CalibrationConfig::from_json_str(
        r#"{ "white_balance": { "policy": "gray_world" }, "region": { "padding_ratio": 0.1 } }"#,
    )
    .unwrap();
    let analysis = CalibrationPipeline::new(config)
        .unwrap()
        .analyze_face(&portrait(80, 80), &[face_mesh(face_box(), 0.95)])
        .unwrap();
    assert_eq!(analysis.white_balance.method, WhiteBalanceMethod::GrayWorld);
}

#[test]
fn fallback_face_is_always_valid() {
    let face = Fallbacks::default().face.produce(&());
    assert!(face.is_fallback);
    let validator = tone_calibration::LandmarkValidator::new(tone_calibration::Topology::FaceMesh, 0.5);
    assert!(validator.select_best(&[face.landmarks]).is_ok());
}
