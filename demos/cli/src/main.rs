use std::num::NonZeroUsize;
use std::ops::Range;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{info, warn};
use nalgebra::Point3;
use serde::Deserialize;

use sdfem::{
    boundary::Analysis,
    export::{ExportSettings, write_inp},
    field::{BoundingBox, Field},
    mesh::{ElementType, Mesh, Settings},
    sample::ThreadCount,
    tessellate::{ElementKind, Surface},
};

/// Meshes implicit surfaces into CalculiX input decks
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,

    /// Model file (JSON)
    #[clap(short, long)]
    input: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Builds the mesh and prints statistics
    Mesh {
        #[clap(flatten)]
        settings: MeshSettings,
    },
    /// Builds the mesh and writes an `.inp` deck
    Export {
        #[clap(flatten)]
        settings: MeshSettings,

        /// Name of the master `.inp` file to write
        #[clap(short, long)]
        out: PathBuf,

        /// First layer to export
        #[clap(long, requires = "layer_end")]
        layer_start: Option<usize>,

        /// End of the exported layers (exclusive)
        #[clap(long, requires = "layer_start")]
        layer_end: Option<usize>,
    },
}

#[derive(ValueEnum, Copy, Clone)]
enum ElementFlag {
    Tet4,
    Tet10,
    Hex8,
    Hex20r,
}

impl From<ElementFlag> for ElementKind {
    fn from(e: ElementFlag) -> Self {
        match e {
            ElementFlag::Tet4 => ElementKind::Tet4,
            ElementFlag::Tet10 => ElementKind::Tet10,
            ElementFlag::Hex8 => ElementKind::Hex8,
            ElementFlag::Hex20r => ElementKind::Hex20R,
        }
    }
}

#[derive(Parser)]
struct MeshSettings {
    /// Grid resolution (overrides the model file)
    #[clap(short, long)]
    resolution: Option<usize>,

    /// Element family (overrides the model file)
    #[clap(short, long, value_enum)]
    element: Option<ElementFlag>,

    /// Use voxel surfaces instead of clipping boundary cells
    #[clap(long)]
    voxel: bool,

    /// Number of threads to use
    #[clap(short, long)]
    threads: Option<NonZeroUsize>,
}

/// Contents of a model file
#[derive(Deserialize)]
struct Model {
    /// Rhai expression in `x`, `y`, `z`; negative inside the solid
    shape: String,
    /// Region to mesh
    bounds: BoundingBox,
    #[serde(default)]
    mesh: Settings,
    #[serde(default)]
    analysis: Analysis,
    #[serde(default)]
    layers: Option<Range<usize>>,
}

////////////////////////////////////////////////////////////////////////////////

/// Field defined by a compiled Rhai expression
struct RhaiField {
    engine: rhai::Engine,
    ast: rhai::AST,
    bounds: BoundingBox,
}

impl RhaiField {
    fn new(shape: &str, bounds: BoundingBox) -> Result<Self> {
        let engine = rhai::Engine::new();
        let ast = engine
            .compile_expression(shape)
            .with_context(|| format!("could not compile shape {shape:?}"))?;
        let out = Self {
            engine,
            ast,
            bounds,
        };
        // Catch type errors once, rather than at every sample
        let center = out.bounds.center();
        if let Err(e) = out.eval(center) {
            bail!("could not evaluate shape at {center}: {e}");
        }
        Ok(out)
    }

    fn eval(&self, p: Point3<f64>) -> Result<f64> {
        let mut scope = rhai::Scope::new();
        scope.push("x", p.x);
        scope.push("y", p.y);
        scope.push("z", p.z);
        let v = self
            .engine
            .eval_ast_with_scope::<rhai::Dynamic>(&mut scope, &self.ast)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        if let Ok(f) = v.as_float() {
            Ok(f)
        } else if let Ok(i) = v.as_int() {
            Ok(i as f64)
        } else {
            bail!("shape returned {}, not a number", v.type_name())
        }
    }
}

impl Field for RhaiField {
    fn evaluate(&self, p: Point3<f64>) -> f64 {
        // Errors count as outside
        self.eval(p).unwrap_or(f64::NAN)
    }
    fn bounding_box(&self) -> BoundingBox {
        self.bounds
    }
}

////////////////////////////////////////////////////////////////////////////////

fn run_mesh(model: &Model, settings: &MeshSettings) -> Result<Mesh> {
    let field = RhaiField::new(&model.shape, model.bounds)?;
    let mut cfg = model.mesh.clone();
    if let Some(r) = settings.resolution {
        cfg.resolution = r;
    }
    if let Some(e) = settings.element {
        cfg.element = e.into();
    }
    if settings.voxel {
        cfg.surface = Surface::Voxel;
    }
    if let Some(t) = settings.threads {
        cfg.threads = ThreadCount::from(t);
    }

    let start = Instant::now();
    let mesh = Mesh::build(&field, &cfg)?;
    info!("Built mesh in {:?}", start.elapsed());
    info!(
        "{} nodes, {} elements over {} layers",
        mesh.vertex_count(),
        mesh.element_count(),
        mesh.layer_count()
    );
    for t in ElementType::SOLID {
        let n = mesh.element_count_of(t);
        if n > 0 {
            info!("  {t}: {n}");
        }
    }
    if mesh.degenerate().iter().any(|d| !d.defect.is_collapsed()) {
        warn!(
            "rejected elements left {} units of volume unmeshed",
            mesh.rejected_volume()
        );
    }
    if !mesh.ties().is_empty() {
        info!("  {} hanging nodes tied to hexahedron faces", mesh.ties().len());
    }
    match mesh.count_components() {
        1 => (),
        n => warn!("mesh has {n} disconnected components"),
    }
    Ok(mesh)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .init();

    let now = Instant::now();
    let args = Args::parse();
    let file = std::fs::File::open(&args.input)
        .with_context(|| format!("could not open {:?}", args.input))?;
    let mut model: Model = serde_json::from_reader(std::io::BufReader::new(file))?;
    info!("Loaded file in {:?}", now.elapsed());

    match args.cmd {
        Command::Mesh { settings } => {
            run_mesh(&model, &settings)?;
        }
        Command::Export {
            settings,
            out,
            layer_start,
            layer_end,
        } => {
            let mesh = run_mesh(&model, &settings)?;
            model.analysis.resolve(&mesh)?;
            let layers = match (layer_start, layer_end) {
                (Some(start), Some(end)) => Some(start..end),
                _ => model.layers.clone(),
            };
            let start = Instant::now();
            let report = write_inp(
                &out,
                &mesh,
                &model.analysis,
                &ExportSettings { layers },
            )?;
            info!(
                "Wrote {} files in {:?} ({} nodes, {} elements)",
                report.files.len(),
                start.elapsed(),
                report.nodes,
                report.element_total()
            );
            if report.equations > 0 {
                info!("  {} tie equations", report.equations);
            }
        }
    }

    Ok(())
}
