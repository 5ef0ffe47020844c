//! PDF Workbench CLI tool
//!
//! A command-line front end for the page, stamping, compression, image and
//! OCR tools.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glob::glob;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use pdf_workbench::layout::VerticalPosition;
use pdf_workbench::ocr::{self, OcrOptions, Rasterizer, TesseractRecognizer};
use pdf_workbench::pages::{self, PageRange};
use pdf_workbench::payment::{self, PaymentConfirmation};
use pdf_workbench::pdf::{
    self, CompressionLevel, MergeOptions, PageNumberOptions, Rotation, SourceFile,
    WatermarkOptions,
};
use pdf_workbench::tools::Tool;

/// PDF Workbench - Everyday PDF tools from the command line
#[derive(Parser)]
#[command(name = "pdf-workbench")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Merge PDFs in order
    pdf-workbench merge -o combined.pdf intro.pdf \"chapter-*.pdf\"

    # Split pages 1-3 and 4-6 into separate files
    pdf-workbench split report.pdf --ranges 1-3,4-6 -d parts/

    # Keep pages 3 and 1, in that order
    pdf-workbench extract report.pdf --pages 3,1 -o short.pdf

    # Recognize text in a scan and save a searchable copy
    pdf-workbench ocr scan.pdf --searchable scan-searchable.pdf")]
struct Cli {
    /// Log debug detail to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge multiple PDF files into one
    Merge {
        /// Input PDF files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Write each page range to its own PDF
    Split {
        /// Input PDF file
        input: PathBuf,

        /// Page ranges, e.g. "1-3,4,5-9"
        #[arg(short, long)]
        ranges: String,

        /// Directory for the output files
        #[arg(short = 'd', long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Write every page to its own PDF
    Burst {
        /// Input PDF file
        input: PathBuf,

        /// Directory for the output files
        #[arg(short = 'd', long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Copy selected pages, in the order given, to a new PDF
    Extract {
        /// Input PDF file
        input: PathBuf,

        /// Pages to keep, e.g. "3,1,5-7"
        #[arg(short, long)]
        pages: String,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Remove selected pages from a PDF
    Delete {
        /// Input PDF file
        input: PathBuf,

        /// Pages to remove, e.g. "2,4-5"
        #[arg(short, long)]
        pages: String,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Rotate pages clockwise
    Rotate {
        /// Input PDF file
        input: PathBuf,

        /// Angle: 90, 180 or 270
        #[arg(short, long, default_value_t = 90)]
        angle: i64,

        /// Pages to rotate (default: all)
        #[arg(short, long)]
        pages: Option<String>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Stamp text diagonally across every page
    Watermark {
        /// Input PDF file
        input: PathBuf,

        /// Watermark text
        #[arg(short, long)]
        text: String,

        /// Opacity from 0 to 1
        #[arg(long, default_value_t = 0.3)]
        opacity: f32,

        /// Counter-clockwise rotation in degrees
        #[arg(long, default_value_t = 45.0)]
        rotation: f32,

        /// Font size in points
        #[arg(long, default_value_t = 50.0)]
        font_size: f32,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print page numbers on every page
    Number {
        /// Input PDF file
        input: PathBuf,

        /// Edge to print the numbers against
        #[arg(long, value_enum, default_value_t = Edge::Bottom)]
        position: Edge,

        /// Font size in points
        #[arg(long, default_value_t = 12.0)]
        font_size: f32,

        /// Number printed on the first page
        #[arg(long, default_value_t = 1)]
        start_at: u32,

        /// Label template, e.g. "Page {n} of {total}"
        #[arg(long, default_value = "{n}")]
        format: String,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Rewrite a PDF with compressed object streams
    Compress {
        /// Input PDF file
        input: PathBuf,

        /// Compression level
        #[arg(short, long, value_enum, default_value_t = Level::Medium)]
        level: Level,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Turn PNG and JPEG images into a PDF, one page per image
    Images {
        /// Input images (in order). Supports glob patterns like "*.jpg"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Recognize text in an image or scanned PDF
    Ocr {
        /// Input image or PDF
        input: PathBuf,

        /// Recognition language, e.g. "eng" or "deu+fra"
        #[arg(short, long, default_value = ocr::DEFAULT_LANGUAGE)]
        language: String,

        /// Tesseract program to run
        #[arg(long, env = "TESSERACT_CMD", default_value = "tesseract")]
        tesseract: PathBuf,

        /// Directory holding the pdfium library (default: system library)
        #[arg(long, env = "PDFIUM_LIB_DIR")]
        pdfium_dir: Option<PathBuf>,

        /// Also write a copy of a PDF input with an invisible text layer
        #[arg(long)]
        searchable: Option<PathBuf>,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },

    /// List the available tools
    Tools,

    /// Check a payment confirmation signature
    VerifyPayment {
        /// Order id issued at checkout
        #[arg(long)]
        order_id: String,

        /// Payment id returned by the gateway
        #[arg(long)]
        payment_id: String,

        /// Hex signature returned by the gateway
        #[arg(long)]
        signature: String,

        /// Merchant signing secret
        #[arg(long, env = "RAZORPAY_KEY_SECRET", hide_env_values = true)]
        secret: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Edge {
    Top,
    Bottom,
}

impl From<Edge> for VerticalPosition {
    fn from(edge: Edge) -> Self {
        match edge {
            Edge::Top => VerticalPosition::Top,
            Edge::Bottom => VerticalPosition::Bottom,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Level {
    Low,
    Medium,
    High,
}

impl From<Level> for CompressionLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Low => CompressionLevel::Low,
            Level::Medium => CompressionLevel::Medium,
            Level::High => CompressionLevel::High,
        }
    }
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Merge { inputs, output, open } => cmd_merge(inputs, output, open),
        Commands::Split { input, ranges, output_dir } => cmd_split(input, ranges, output_dir),
        Commands::Burst { input, output_dir } => cmd_burst(input, output_dir),
        Commands::Extract { input, pages, output } => cmd_extract(input, pages, output),
        Commands::Delete { input, pages, output } => cmd_delete(input, pages, output),
        Commands::Rotate { input, angle, pages, output } => cmd_rotate(input, angle, pages, output),
        Commands::Watermark {
            input, text, opacity, rotation, font_size, output,
        } => {
            let options = WatermarkOptions {
                opacity,
                rotation_degrees: rotation,
                font_size,
                ..Default::default()
            };
            cmd_watermark(input, text, options, output)
        }
        Commands::Number {
            input, position, font_size, start_at, format, output,
        } => {
            let options = PageNumberOptions {
                position: position.into(),
                font_size,
                start_at,
                format,
            };
            cmd_number(input, options, output)
        }
        Commands::Compress { input, level, output } => cmd_compress(input, level.into(), output),
        Commands::Images { inputs, output, open } => cmd_images(inputs, output, open),
        Commands::Ocr {
            input, language, tesseract, pdfium_dir, searchable,
        } => cmd_ocr(input, language, tesseract, pdfium_dir, searchable),
        Commands::Info { input } => cmd_info(input),
        Commands::Tools => cmd_tools(),
        Commands::VerifyPayment {
            order_id, payment_id, signature, secret,
        } => cmd_verify_payment(
            PaymentConfirmation { order_id, payment_id, signature },
            secret,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Expand glob patterns in input paths
///
/// Matches of one pattern are sorted; the patterns themselves keep the
/// order they were given in, so merge order follows the command line.
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched: Vec<PathBuf> = Vec::new();
            for entry in glob(&pattern).with_context(|| format!("Bad glob pattern: {}", pattern))? {
                match entry {
                    Ok(path) => matched.push(path),
                    Err(e) => warn!(%pattern, error = %e, "glob error"),
                }
            }
            if matched.is_empty() {
                bail!("No files matched pattern: {}", pattern);
            }
            matched.sort();
            paths.extend(matched);
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }

    Ok(paths)
}

/// Open a file with the system default application
fn open_file(path: &Path) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(path).spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(path).spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

fn read_source(path: &Path) -> Result<SourceFile> {
    SourceFile::from_path(path).with_context(|| format!("Cannot read {}", path.display()))
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Cannot write {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote output");
    Ok(())
}

/// Write numbered parts as `<stem>-<k>.pdf` in `dir`
fn write_parts(input: &Path, dir: &Path, parts: &[Vec<u8>]) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))?;
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    for (k, part) in parts.iter().enumerate() {
        write_output(&dir.join(format!("{}-{}.pdf", stem, k + 1)), part)?;
    }
    eprintln!("Wrote {} files to {}", parts.len(), dir.display());
    Ok(())
}

fn parse_pages(list: &str) -> Result<Vec<u32>> {
    let ranges = pages::parse_page_list(list).with_context(|| format!("Bad page list: {}", list))?;
    Ok(pages::expand_ranges(&ranges))
}

/// Merge multiple PDFs into one
fn cmd_merge(inputs: Vec<String>, output: PathBuf, open: bool) -> Result<()> {
    let inputs = expand_globs(inputs)?;

    eprintln!("Merging {} PDF files...", inputs.len());

    let options = MergeOptions {
        input_paths: inputs,
        output_path: output.clone(),
    };
    pdf::merge_files(&options)?;

    eprintln!("Merged to: {}", output.display());

    if open {
        open_file(&output)?;
    }
    Ok(())
}

fn cmd_split(input: PathBuf, ranges: String, output_dir: PathBuf) -> Result<()> {
    let source = read_source(&input)?;
    let ranges: Vec<PageRange> =
        pages::parse_page_list(&ranges).with_context(|| format!("Bad page ranges: {}", ranges))?;

    let parts = pdf::split_ranges(&source.data, &ranges)?;
    write_parts(&input, &output_dir, &parts)
}

fn cmd_burst(input: PathBuf, output_dir: PathBuf) -> Result<()> {
    let source = read_source(&input)?;
    let parts = pdf::split_pages(&source.data)?;
    write_parts(&input, &output_dir, &parts)
}

fn cmd_extract(input: PathBuf, pages: String, output: PathBuf) -> Result<()> {
    let source = read_source(&input)?;
    let selection = parse_pages(&pages)?;
    write_output(&output, &pdf::extract_pages(&source.data, &selection)?)
}

fn cmd_delete(input: PathBuf, pages: String, output: PathBuf) -> Result<()> {
    let source = read_source(&input)?;
    let selection = parse_pages(&pages)?;
    write_output(&output, &pdf::delete_pages(&source.data, &selection)?)
}

fn cmd_rotate(input: PathBuf, angle: i64, pages: Option<String>, output: PathBuf) -> Result<()> {
    let rotation = Rotation::try_from(angle)?;
    let source = read_source(&input)?;

    let indices: Option<Vec<usize>> = match pages {
        Some(list) => {
            let page_count = pdf::extract_metadata(&source)?.reachable_pages as u32;
            Some(pages::to_indices(&parse_pages(&list)?, page_count)?)
        }
        None => None,
    };

    let rotated = pdf::rotate_pages(&source.data, rotation, indices.as_deref())?;
    write_output(&output, &rotated)
}

fn cmd_watermark(input: PathBuf, text: String, options: WatermarkOptions, output: PathBuf) -> Result<()> {
    let source = read_source(&input)?;
    write_output(&output, &pdf::add_watermark(&source.data, &text, &options)?)
}

fn cmd_number(input: PathBuf, options: PageNumberOptions, output: PathBuf) -> Result<()> {
    let source = read_source(&input)?;
    write_output(&output, &pdf::add_page_numbers(&source.data, &options)?)
}

fn cmd_compress(input: PathBuf, level: CompressionLevel, output: PathBuf) -> Result<()> {
    let source = read_source(&input)?;
    let compressed = pdf::compress(&source.data, level)?;

    eprintln!(
        "{} -> {} bytes ({} compression)",
        source.data.len(),
        compressed.len(),
        level
    );
    write_output(&output, &compressed)
}

fn cmd_images(inputs: Vec<String>, output: PathBuf, open: bool) -> Result<()> {
    let sources = expand_globs(inputs)?
        .iter()
        .map(|path| read_source(path))
        .collect::<Result<Vec<_>>>()?;

    eprintln!("Converting {} images...", sources.len());
    write_output(&output, &pdf::images_to_pdf(&sources)?)?;

    if open {
        open_file(&output)?;
    }
    Ok(())
}

#[cfg(feature = "pdfium")]
fn page_renderer(pdfium_dir: Option<&Path>) -> Result<Option<Box<dyn Rasterizer>>> {
    let rasterizer = ocr::raster::PdfiumRasterizer::new(pdfium_dir)?;
    Ok(Some(Box::new(rasterizer)))
}

#[cfg(not(feature = "pdfium"))]
fn page_renderer(pdfium_dir: Option<&Path>) -> Result<Option<Box<dyn Rasterizer>>> {
    if pdfium_dir.is_some() {
        warn!("built without the pdfium feature; --pdfium-dir is ignored");
    }
    Ok(None)
}

fn cmd_ocr(
    input: PathBuf,
    language: String,
    tesseract: PathBuf,
    pdfium_dir: Option<PathBuf>,
    searchable: Option<PathBuf>,
) -> Result<()> {
    let source = read_source(&input)?;
    let kind = ocr::input_kind(&source)?;
    if searchable.is_some() && kind != ocr::InputKind::Pdf {
        bail!("--searchable needs a PDF input");
    }

    let rasterizer = match kind {
        ocr::InputKind::Pdf => page_renderer(pdfium_dir.as_deref())?,
        ocr::InputKind::Image => None,
    };

    let options = OcrOptions {
        language,
        ..Default::default()
    };
    let mut progress = |percent: u8| debug!(percent, "OCR progress");

    let results = ocr::recognize(
        &source,
        &options,
        |language: &str| TesseractRecognizer::start(&tesseract, language),
        rasterizer.as_deref(),
        Some(&mut progress),
    )?;

    for result in &results {
        println!("--- Page {} (confidence {:.0}%) ---", result.page_number, result.confidence);
        println!("{}", result.text);
    }

    if let Some(path) = searchable {
        write_output(&path, &ocr::add_text_layer(&source.data, &results)?)?;
    }
    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: PathBuf) -> Result<()> {
    let source = read_source(&input)?;
    let metadata = pdf::extract_metadata(&source)?;

    println!("File: {}", input.display());
    println!("Version: {}", metadata.version);
    println!("Pages: {}", metadata.page_count);
    if metadata.reachable_pages != metadata.page_count {
        println!("Reachable pages: {}", metadata.reachable_pages);
    }

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }

    Ok(())
}

fn cmd_tools() -> Result<()> {
    for tool in Tool::all() {
        println!("{:<10} {:<18} {}", tool.id(), tool.title(), tool.description());
    }
    Ok(())
}

fn cmd_verify_payment(confirmation: PaymentConfirmation, secret: String) -> Result<()> {
    if payment::verify_payment_signature(&confirmation, &secret)? {
        println!("Payment verified");
        Ok(())
    } else {
        bail!("Payment signature does not match")
    }
}
