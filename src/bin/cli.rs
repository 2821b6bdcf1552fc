//! CLI application for face colour calibration and body ratios.
//!
//! Usage:
//!   tone-calibration <image> --landmarks face.json              # Human-readable output
//!   tone-calibration <image> --landmarks face.json --json       # JSON output
//!   tone-calibration <image> --landmarks face.json -o out.json  # Save to file
//!   tone-calibration <image> --pose pose.json                   # Include body ratios

use clap::Parser;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tone_calibration::{
    BodyAnalysis, CalibrationConfig, CalibrationPipeline, FaceAnalysis, ImageAccess, ImageBuffer,
    Landmark,
};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "tone-calibration")]
#[command(author, version, about = "Face colour calibration and personal-colour analysis", long_about = None)]
struct Args {
    /// Input image file
    #[arg(required = true)]
    image: PathBuf,

    /// Face landmark candidates (JSON: one landmark array or an array of them)
    #[arg(long)]
    landmarks: Option<PathBuf>,

    /// Pose landmarks (JSON array of 33 landmarks)
    #[arg(long)]
    pose: Option<PathBuf>,

    /// Configuration overrides (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the white-balanced face region to this image file
    #[arg(long)]
    save_corrected: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Landmark files hold either a single candidate or several.
#[derive(Deserialize)]
#[serde(untagged)]
enum Candidates {
    Many(Vec<Vec<Landmark>>),
    One(Vec<Landmark>),
}

impl Candidates {
    fn into_vec(self) -> Vec<Vec<Landmark>> {
        match self {
            Candidates::Many(many) => many,
            Candidates::One(one) => vec![one],
        }
    }
}

/// Output structure for JSON serialization
#[derive(Serialize)]
struct Output {
    image: String,
    width: u32,
    height: u32,
    face: FaceAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<BodyAnalysis>,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => CalibrationConfig::from_json_file(path)?,
        None => CalibrationConfig::default(),
    };
    let pipeline = CalibrationPipeline::new(config)?;

    tracing::info!(image = %args.image.display(), "loading image");
    let img = image::open(&args.image)?.to_rgb8();
    let image = ImageBuffer::from_rgb_image(&img)?;

    let candidates = match &args.landmarks {
        Some(path) => read_json::<Candidates>(path)?.into_vec(),
        None => Vec::new(),
    };
    tracing::info!(candidates = candidates.len(), "running face analysis");
    let face = pipeline.analyze_face(&image, &candidates)?;

    if let Some(ref path) = args.save_corrected {
        face.white_balance.corrected.to_rgb_image().save(path)?;
        tracing::info!(path = %path.display(), "corrected region written");
    }

    let body = match &args.pose {
        Some(path) => {
            let pose: Vec<Landmark> = read_json(path)?;
            let aspect_ratio = image.width() as f32 / image.height() as f32;
            Some(pipeline.analyze_body(&pose, aspect_ratio)?)
        }
        None => None,
    };

    let output = Output {
        image: args.image.display().to_string(),
        width: image.width(),
        height: image.height(),
        face,
        body,
    };

    // Generate output
    let output_str = if args.json {
        serde_json::to_string_pretty(&output)?
    } else {
        format_human_readable(&output)
    };

    // Write output
    if let Some(ref path) = args.output {
        std::fs::write(path, &output_str)?;
        tracing::info!(path = %path.display(), "output written");
    } else {
        println!("{}", output_str);
    }

    Ok(())
}

fn format_human_readable(output: &Output) -> String {
    let mut s = String::new();
    let face = &output.face;
    let marker = |fallback: bool| if fallback { " [fallback]" } else { "" };

    s.push_str(&format!("Image: {} ({}x{})\n", output.image, output.width, output.height));
    if face.overall.sample_result {
        s.push_str("\nNo usable face found; showing a sample result.\n");
    }

    s.push_str("\nFace:\n");
    let b = &face.face.bounding_box;
    s.push_str(&format!(
        "  Box: ({:.3}, {:.3}) - ({:.3}, {:.3}){}\n",
        b.x_min, b.y_min, b.x_max, b.y_max,
        marker(face.face.is_fallback)
    ));
    s.push_str(&format!("  Confidence: {:.2}\n", face.face.confidence));
    s.push_str(&format!("  Skin coverage: {:.1}%\n", face.skin.coverage_percent));

    let wb = &face.white_balance;
    s.push_str("\nWhite balance:\n");
    s.push_str(&format!(
        "  {:?} gains R {:.3} G {:.3} B {:.3}{}\n",
        wb.method, wb.gains.r, wb.gains.g, wb.gains.b,
        marker(wb.is_fallback)
    ));

    let light = &face.lighting;
    s.push_str("\nLighting:\n");
    s.push_str(&format!(
        "  {:.0} K ({:?}){}\n",
        light.cct_kelvin, light.lighting_type,
        marker(light.is_fallback)
    ));
    s.push_str(&format!("  Uniformity: {:.2}\n", light.zone_uniformity));
    s.push_str(&format!("  Shadow score: {:.2}\n", light.shadow_score));
    for zone in &light.zones {
        s.push_str(&format!(
            "    {:<10} L {:6.1}{}\n",
            format!("{:?}", zone.zone),
            zone.luminance,
            if zone.shadowed { "  shadowed" } else { "" }
        ));
    }
    if light.suitable {
        s.push_str("  Suitable: yes\n");
    } else {
        s.push_str(&format!("  Suitable: no ({:?})\n", light.issues));
    }

    let tone = &face.tone;
    s.push_str("\nPersonal colour:\n");
    s.push_str(&format!(
        "  {:?} ({:?}, {:?}){}\n",
        tone.season, tone.tone, tone.depth,
        marker(tone.is_fallback)
    ));
    s.push_str(&format!("  Confidence: {:.2}\n", tone.confidence));
    s.push_str(&format!(
        "  Skin Lab: {:.1}, {:.1}, {:.1} (dE2000 {:.2} to centroid)\n",
        tone.lab.l, tone.lab.a, tone.lab.b, tone.delta_e
    ));

    if let Some(body) = &output.body {
        let r = &body.ratios;
        s.push_str("\nBody:\n");
        s.push_str(&format!("  Type: {:?}{}\n", r.body_type, marker(r.is_fallback)));
        s.push_str(&format!("  Shoulder/Hip: {:.2}\n", r.shoulder_to_hip));
        s.push_str(&format!("  Waist/Hip:    {:.2}\n", r.waist_to_hip));
        s.push_str(&format!("  Leg/Torso:    {:.2}\n", r.leg_to_torso));
        s.push_str(&format!("  Arm/Torso:    {:.2}\n", r.arm_to_torso));
        s.push_str(&format!("  Symmetry:     {:.2}\n", r.symmetry_score));
    }

    s.push_str(&format!(
        "\nOverall: {:.2} ({:?}){}\n",
        face.overall.score,
        face.overall.grade,
        marker(face.overall.is_fallback)
    ));

    s
}
