//! Command-line front end for the `vision-gauge` workspace.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use vision_gauge::aruco::{Matcher, QuadDetectParams, DICT_4X4_16};
use vision_gauge::calib::{calibrate_from_dir, ChessboardGridParams};
use vision_gauge::core::{
    init_with_level, integral_image, normalize_integral, object_dimension, PixelPoint,
};
use vision_gauge::detect::gray_view;
use vision_gauge::stereo::{AnnotatedFrames, DirFrameSource, StereoRig};
use vision_gauge::stitch::{stitch_all, StitchParams};

#[derive(Parser)]
#[command(name = "vision-gauge", version, about = "Camera metrology toolkit")]
struct Cli {
    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    log: log::LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Estimate an object dimension from two image points.
    Measure(MeasureArgs),
    /// Calibrate camera intrinsics from a directory of chessboard photos.
    Calibrate(CalibrateArgs),
    /// Write the min-max normalized integral image of a photo.
    Integral(IntegralArgs),
    /// Stitch overlapping photos into a panorama.
    Stitch(StitchArgs),
    /// Annotate stereo+RGB frame triplets with marker distance and size.
    Annotate(AnnotateArgs),
}

#[derive(Args)]
struct MeasureArgs {
    /// Directory of chessboard photos used to calibrate `fx` first.
    #[arg(long)]
    calib_dir: PathBuf,
    /// First endpoint, `x,y` in pixels.
    #[arg(long)]
    point1: PixelPoint,
    /// Second endpoint, `x,y` in pixels.
    #[arg(long)]
    point2: PixelPoint,
    /// Camera-to-object distance; the result uses the same unit.
    #[arg(long)]
    distance: f64,
    /// Inner-corner pattern of the calibration boards, `COLSxROWS`.
    #[arg(long, default_value = "8x6", value_parser = parse_pattern)]
    pattern: (usize, usize),
    /// Chessboard square size in millimeters.
    #[arg(long, default_value_t = 25.0)]
    square_mm: f64,
}

#[derive(Args)]
struct CalibrateArgs {
    /// Directory of chessboard photos.
    #[arg(long)]
    dir: PathBuf,
    /// Inner-corner pattern as `COLSxROWS`.
    #[arg(long, default_value = "8x6", value_parser = parse_pattern)]
    pattern: (usize, usize),
    /// Chessboard square size in millimeters.
    #[arg(long, default_value_t = 25.0)]
    square_mm: f64,
}

#[derive(Args)]
struct IntegralArgs {
    /// Input photo (any format the `image` crate reads).
    #[arg(long)]
    input: PathBuf,
    /// Output PNG path.
    #[arg(long)]
    output: PathBuf,
}

#[derive(Args)]
struct StitchArgs {
    /// Panorama output path.
    #[arg(long)]
    output: PathBuf,
    /// Input photos, left to right.
    #[arg(num_args = 2.., required = true)]
    images: Vec<PathBuf>,
}

#[derive(Args)]
struct AnnotateArgs {
    #[arg(long)]
    left_dir: PathBuf,
    #[arg(long)]
    right_dir: PathBuf,
    #[arg(long)]
    rgb_dir: PathBuf,
    /// Output directory for annotated JPEG frames.
    #[arg(long)]
    out_dir: PathBuf,
    /// Rig focal length in pixels.
    #[arg(long, default_value_t = StereoRig::default().focal_px)]
    focal_px: f32,
    /// Stereo baseline in centimeters.
    #[arg(long, default_value_t = StereoRig::default().baseline_cm)]
    baseline_cm: f32,
    /// Physical marker side length in centimeters.
    #[arg(long, default_value_t = StereoRig::default().marker_size_cm)]
    marker_cm: f32,
}

fn parse_pattern(s: &str) -> Result<(usize, usize), String> {
    let (cols, rows) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected COLSxROWS, got {s:?}"))?;
    let cols = cols.parse().map_err(|e| format!("bad column count: {e}"))?;
    let rows = rows.parse().map_err(|e| format!("bad row count: {e}"))?;
    Ok((cols, rows))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_with_level(cli.log)?;
    match cli.command {
        Command::Measure(args) => run_measure(args),
        Command::Calibrate(args) => run_calibrate(args),
        Command::Integral(args) => run_integral(args),
        Command::Stitch(args) => run_stitch(args),
        Command::Annotate(args) => run_annotate(args),
    }
}

fn run_measure(args: MeasureArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (cols, rows) = args.pattern;
    let params = ChessboardGridParams {
        cols,
        rows,
        ..ChessboardGridParams::default()
    };
    let calib = calibrate_from_dir(&args.calib_dir, &params, args.square_mm)?;
    let fx = calib.intrinsics.fx;
    let dim = object_dimension(fx, args.distance, args.point1, args.point2)?;
    println!("{}", serde_json::json!({ "fx": fx, "dimension": dim }));
    Ok(())
}

fn run_calibrate(args: CalibrateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (cols, rows) = args.pattern;
    let params = ChessboardGridParams {
        cols,
        rows,
        ..ChessboardGridParams::default()
    };
    let result = calibrate_from_dir(&args.dir, &params, args.square_mm)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run_integral(args: IntegralArgs) -> Result<(), Box<dyn std::error::Error>> {
    let img = image::ImageReader::open(&args.input)?.decode()?.to_luma8();
    let view = gray_view(&img);
    let integral = integral_image(&view);
    let norm = normalize_integral(&integral, view.width, view.height);
    let out = image::GrayImage::from_raw(img.width(), img.height(), norm.data)
        .ok_or("normalized buffer does not match image dimensions")?;
    out.save(&args.output)?;
    Ok(())
}

fn run_stitch(args: StitchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut images = Vec::with_capacity(args.images.len());
    for path in &args.images {
        images.push(image::ImageReader::open(path)?.decode()?.to_rgb8());
    }
    let report = stitch_all(&images, &StitchParams::default())?;
    report.panorama.save(&args.output)?;
    println!("{}", serde_json::to_string_pretty(&report.pair_results)?);
    Ok(())
}

fn run_annotate(args: AnnotateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let rig = StereoRig {
        focal_px: args.focal_px,
        baseline_cm: args.baseline_cm,
        marker_size_cm: args.marker_cm,
    };
    std::fs::create_dir_all(&args.out_dir)?;
    let source = DirFrameSource::new(&args.left_dir, &args.right_dir, &args.rgb_dir)?;
    let stream = AnnotatedFrames::new(
        source,
        rig,
        Matcher::new(DICT_4X4_16, 0),
        QuadDetectParams::default(),
    );
    let mut written = 0usize;
    for (i, frame) in stream.enumerate() {
        let bytes = frame?;
        let path = args.out_dir.join(format!("frame_{i:04}.jpg"));
        std::fs::write(&path, bytes)?;
        written += 1;
    }
    log::info!("wrote {written} annotated frames to {:?}", args.out_dir);
    println!("{}", serde_json::json!({ "frames": written }));
    Ok(())
}
