//! CalculiX / ABAQUS `.inp` deck writer
//!
//! A deck is split over several files.  The master file holds the heading,
//! material, and step definitions, and pulls in everything else with
//! `*INCLUDE` lines:
//!
//! | File | Contents |
//! |------|----------|
//! | `<path>` | heading, includes, material, step |
//! | `<path>.nodes` | `*NODE` |
//! | `<path>.elements_C3D4` (etc) | `*ELEMENT` for one element type |
//! | `<path>.boundary` | `*NSET` and `*BOUNDARY` per restraint |
//! | `<path>.equations` | `*EQUATION` (only with [`FaceTie`]s) |
//! | `<path>.load` | `*CLOAD` (only with loads) |
//! | `<path>.gravity` | `*DLOAD` (only with gravity) |
//!
//! Ids are 1-based: node `n` is written as `n + 1`, and the element with
//! ordinal `i` in [`Mesh::elements`] is written as `i + 1`.
//!
//! Every exported [`FaceTie`] becomes one equation per translational degree
//! of freedom, with the hanging node's term first.  CalculiX eliminates the
//! first term, so degrees of freedom fixed by a restraint are left untied.
//!
//! [`FaceTie`]: crate::mesh::FaceTie
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{Error, boundary::Analysis, mesh::ElementType, mesh::Mesh};

mod config;
mod plan;
pub mod record;

pub use config::{ExportSettings, Gravity, Material};
use plan::Plan;
use record::{real, sci, write_equation, write_record};

/// Summary of a finished export
#[derive(Clone, Debug, Default)]
pub struct ExportReport {
    /// Number of nodes written
    pub nodes: usize,
    /// Number of elements written per type, in [`ElementType::SOLID`] order
    pub elements: [usize; 4],
    /// Number of elements skipped because of an unknown type
    pub skipped_unknown: usize,
    /// Number of `*EQUATION` records written
    pub equations: usize,
    /// Every file written, master file first
    pub files: Vec<PathBuf>,
}

impl ExportReport {
    /// Returns the number of elements written of the given type
    pub fn elements_of(&self, kind: ElementType) -> usize {
        kind.solid_index().map(|i| self.elements[i]).unwrap_or(0)
    }

    /// Returns the total number of elements written
    pub fn element_total(&self) -> usize {
        self.elements.iter().sum()
    }
}

/// Returns `path` with `suffix` appended to its file name
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(suffix);
    s.into()
}

/// Writer stage; each stage writes one section of the deck
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Stage {
    Init,
    Header,
    Nodes,
    Elements(ElementType),
    Boundary,
    Equations,
    Material,
    Step,
    Loads,
    Gravity,
    Results,
    Done,
}

/// Optional sections present in a deck
#[derive(Copy, Clone, Debug, Default)]
struct Sections {
    equations: bool,
    loads: bool,
    gravity: bool,
}

impl Stage {
    fn next(self, sections: Sections) -> Self {
        let Sections {
            equations,
            loads,
            gravity,
        } = sections;
        match self {
            Stage::Init => Stage::Header,
            Stage::Header => Stage::Nodes,
            Stage::Nodes => Stage::Elements(ElementType::SOLID[0]),
            Stage::Elements(t) => match t.solid_index() {
                Some(i) if i + 1 < ElementType::SOLID.len() => {
                    Stage::Elements(ElementType::SOLID[i + 1])
                }
                _ => Stage::Boundary,
            },
            Stage::Boundary if equations => Stage::Equations,
            Stage::Boundary | Stage::Equations => Stage::Material,
            Stage::Material => Stage::Step,
            Stage::Step if loads => Stage::Loads,
            Stage::Step | Stage::Loads if gravity => Stage::Gravity,
            Stage::Step | Stage::Loads | Stage::Gravity => Stage::Results,
            Stage::Results | Stage::Done => Stage::Done,
        }
    }
}

struct InpWriter<'a> {
    path: &'a Path,
    mesh: &'a Mesh,
    analysis: &'a Analysis,
    plan: Plan,
    master: BufWriter<File>,
    report: ExportReport,
}

impl InpWriter<'_> {
    /// Creates an auxiliary file and references it from the master file
    fn include(&mut self, suffix: &str) -> Result<BufWriter<File>, Error> {
        let path = with_suffix(self.path, suffix);
        writeln!(self.master, "*INCLUDE,INPUT={}", path.display())?;
        let out = BufWriter::new(File::create(&path)?);
        self.report.files.push(path);
        Ok(out)
    }

    fn run(&mut self, stage: Stage) -> Result<(), Error> {
        log::debug!("writing {stage:?}");
        match stage {
            Stage::Init | Stage::Done => (),
            Stage::Header => self.header()?,
            Stage::Nodes => self.nodes()?,
            Stage::Elements(t) => self.elements(t)?,
            Stage::Boundary => self.boundary()?,
            Stage::Equations => self.equations()?,
            Stage::Material => self.material()?,
            Stage::Step => writeln!(self.master, "*STEP\n*STATIC")?,
            Stage::Loads => self.loads()?,
            Stage::Gravity => self.gravity()?,
            Stage::Results => writeln!(
                self.master,
                "*EL FILE\nS\n*NODE FILE\nU\n*END STEP"
            )?,
        }
        Ok(())
    }

    fn header(&mut self) -> Result<(), Error> {
        let layers = &self.plan.layers;
        writeln!(self.master, "**")?;
        writeln!(self.master, "** Structure: finite elements of a 3D model.")?;
        writeln!(
            self.master,
            "** Generated by: sdfem {}",
            env!("CARGO_PKG_VERSION")
        )?;
        writeln!(self.master, "**")?;
        writeln!(self.master, "*HEADING")?;
        writeln!(
            self.master,
            "Model: 3D model, layers {} to {} of {}",
            layers.start,
            layers.end,
            self.mesh.layer_count()
        )?;
        Ok(())
    }

    fn nodes(&mut self) -> Result<(), Error> {
        let mut out = self.include(".nodes")?;
        writeln!(out, "*NODE")?;
        for &n in &self.plan.nodes {
            let p = self.mesh.vertex(n);
            writeln!(out, "{},{},{},{}", n + 1, real(p.x), real(p.y), real(p.z))?;
        }
        out.flush()?;
        self.report.nodes = self.plan.nodes.len();
        Ok(())
    }

    fn elements(&mut self, kind: ElementType) -> Result<(), Error> {
        let mut out = self.include(&format!(".elements_{kind}"))?;
        writeln!(out, "*ELEMENT,TYPE={kind},ELSET={}", kind.element_set())?;
        let mut count = 0;
        for (i, c, e) in self.mesh.elements() {
            if e.kind() != kind || !self.plan.layers.contains(&c.z) {
                continue;
            }
            let ids = e.nodes().iter().map(|&n| n as usize + 1);
            write_record(&mut out, std::iter::once(i + 1).chain(ids))?;
            count += 1;
        }
        out.flush()?;
        if let Some(i) = kind.solid_index() {
            self.report.elements[i] = count;
        }
        Ok(())
    }

    fn boundary(&mut self) -> Result<(), Error> {
        let mut out = self.include(".boundary")?;
        if self.analysis.restraints.is_empty() {
            log::warn!("no restraints given; the model is unconstrained");
        }
        for (i, (r, set)) in self
            .analysis
            .restraints
            .iter()
            .zip(&self.plan.node_sets)
            .enumerate()
        {
            let name = format!("restraint{}", i + 1);
            writeln!(out, "*NSET,NSET={name}")?;
            write_record(&mut out, set.iter().map(|&n| n + 1))?;
            writeln!(out, "*BOUNDARY")?;
            for dof in r.fixed.dofs() {
                writeln!(out, "{name},{dof}")?;
            }
        }
        out.flush()?;
        Ok(())
    }

    fn equations(&mut self) -> Result<(), Error> {
        let mut out = self.include(".equations")?;
        writeln!(out, "*EQUATION")?;
        let mut count = 0;
        for (tie, dofs) in &self.plan.ties {
            let terms: Vec<_> = tie.terms().collect();
            for &dof in dofs {
                write_equation(&mut out, dof, &terms)?;
                count += 1;
            }
        }
        out.flush()?;
        log::debug!(
            "tied {} hanging node(s) with {count} equation(s)",
            self.plan.ties.len()
        );
        self.report.equations = count;
        Ok(())
    }

    fn material(&mut self) -> Result<(), Error> {
        let m = &self.analysis.material;
        writeln!(self.master, "*MATERIAL,NAME={}", m.name)?;
        writeln!(self.master, "*ELASTIC,TYPE=ISO")?;
        writeln!(
            self.master,
            "{},{},0",
            sci(m.youngs_modulus),
            sci(m.poisson_ratio)
        )?;
        writeln!(self.master, "*DENSITY")?;
        writeln!(self.master, "{}", sci(m.density))?;
        for t in ElementType::SOLID {
            writeln!(
                self.master,
                "*SOLID SECTION,MATERIAL={},ELSET={}",
                m.name,
                t.element_set()
            )?;
        }
        Ok(())
    }

    fn loads(&mut self) -> Result<(), Error> {
        let mut out = self.include(".load")?;
        writeln!(out, "*CLOAD")?;
        for l in &self.analysis.loads {
            // Resolution was checked while planning
            let Some(t) = l.target() else { continue };
            for (dof, f) in (1..).zip(l.force.iter()) {
                writeln!(out, "{},{dof},{}", t.node + 1, real(*f))?;
            }
        }
        out.flush()?;
        Ok(())
    }

    fn gravity(&mut self) -> Result<(), Error> {
        let Some((mag, dir)) = self.plan.gravity else {
            return Ok(());
        };
        let mut out = self.include(".gravity")?;
        writeln!(out, "*DLOAD")?;
        for t in ElementType::SOLID {
            writeln!(
                out,
                "{},GRAV,{},{},{},{}",
                t.element_set(),
                real(mag),
                real(dir.x),
                real(dir.y),
                real(dir.z)
            )?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Writes a mesh and its analysis as a multi-file `.inp` deck
///
/// Every restraint and load in `analysis` must already be resolved against
/// `mesh` (see [`Analysis::resolve`]).  Configuration problems are reported
/// before any file is created; an I/O error part-way through may leave
/// partial files behind.
pub fn write_inp<P: AsRef<Path>>(
    path: P,
    mesh: &Mesh,
    analysis: &Analysis,
    settings: &ExportSettings,
) -> Result<ExportReport, Error> {
    let path = path.as_ref();
    let plan = Plan::new(mesh, analysis, settings)?;
    let sections = Sections {
        equations: !plan.ties.is_empty(),
        loads: !analysis.loads.is_empty(),
        gravity: plan.gravity.is_some(),
    };

    let mut w = InpWriter {
        path,
        mesh,
        analysis,
        report: ExportReport {
            skipped_unknown: plan.skipped_unknown,
            files: vec![path.to_owned()],
            ..Default::default()
        },
        plan,
        master: BufWriter::new(File::create(path)?),
    };

    let mut stage = Stage::Init;
    while stage != Stage::Done {
        w.run(stage)?;
        stage = stage.next(sections);
    }
    w.master.flush()?;

    let r = w.report;
    log::info!(
        "wrote {} nodes and {} elements to {}",
        r.nodes,
        r.element_total(),
        path.display()
    );
    Ok(r)
}
