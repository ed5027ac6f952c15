use clap::Parser;
use log::info;
use seqlens::document::{import_len_str, DesignDocument};
use seqlens::error::{LensResult, SeqLensError};
use seqlens::surface::SurfaceShape;
use seqlens::{Design, MaterialCatalog};
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;

/// Evaluate a sequential lens design.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// path of the design to evaluate (`.len` prescription or JSON document)
    file_path: PathBuf,

    /// run autofocus and report the adjusted back thickness
    #[arg(short, long)]
    autofocus: bool,
}

fn read_design(args: &Args, catalog: &MaterialCatalog) -> LensResult<Design> {
    let contents = fs::read_to_string(&args.file_path).map_err(|e| {
        SeqLensError::Configuration(format!(
            "cannot read file {}: {e}",
            args.file_path.display()
        ))
    })?;
    if args.file_path.extension() == Some(OsStr::new("len")) {
        import_len_str(&contents, catalog)
    } else {
        DesignDocument::from_json_string(&contents)?.to_design(catalog)
    }
}

fn print_surface_table(design: &Design) {
    println!("  # {:>12} {:>8} {:>10} {:>10}  material", "radius", "conic", "thickness", "aperture");
    for (i, surface) in design.surfaces().iter().enumerate() {
        let (radius, conic) = match *surface.shape() {
            SurfaceShape::Flat => ("flat".to_owned(), 0.0),
            SurfaceShape::Conic {
                radius,
                conic_constant,
            } => (format!("{radius:.2}"), conic_constant),
        };
        println!(
            "{:>3} {radius:>12} {conic:>8.2} {:>10.2} {:>10.2}  {}",
            i + 1,
            surface.thickness(),
            surface.aperture_radius(),
            surface.material().name()
        );
    }
}

fn main() -> LensResult<()> {
    env_logger::init();
    let args = Args::parse();
    let catalog = MaterialCatalog::standard();
    let mut design = read_design(&args, &catalog)?;
    info!("loaded design with {} surfaces", design.surfaces().len());

    print_surface_table(&design);
    let power = design.equivalent_power()?;
    println!("equivalent power:       {power:.6}");
    println!("effective focal length: {:.3}", 1.0 / power);

    if args.autofocus {
        let image_distance = design.autofocus()?;
        let last = design.surfaces().len() - 1;
        println!("marginal image distance: {image_distance:.3}");
        println!(
            "autofocus back thickness: {:.3}",
            design.surfaces()[last].thickness()
        );
    }
    Ok(())
}
