use crate::io::error::ImportError;
use crate::io::json_loader::load_json;
use crate::io::obj_loader::load_obj;
use crate::scene::mesh::Mesh;
use crate::scene::tangent::{DeterminantFormula, compute_tangent_space_with};
use log::{info, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// On-disk mesh encodings understood by [`import_mesh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MeshFormat {
    /// Face-index text (`v`/`vn`/`vt`/`f`). Carries no tangents.
    Obj,
    /// assimp JSON export with precomputed tangents.
    Json,
}

impl MeshFormat {
    /// Guesses the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "obj" => Some(Self::Obj),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// A mesh file plus an optional explicit format; `None` means sniff the extension.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshSource {
    pub path: PathBuf,
    pub format: Option<MeshFormat>,
}

impl MeshSource {
    pub fn new<P: Into<PathBuf>>(path: P, format: Option<MeshFormat>) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    pub fn resolved_format(&self) -> Result<MeshFormat, ImportError> {
        self.format
            .or_else(|| MeshFormat::from_path(&self.path))
            .ok_or_else(|| ImportError::UnknownFormat(self.path.clone()))
    }
}

/// Imports the mesh exactly as stored; the text path comes back with zero tangents.
pub fn import_mesh(source: &MeshSource) -> Result<(Mesh, MeshFormat), ImportError> {
    let format = source.resolved_format()?;
    let mesh = match format {
        MeshFormat::Obj => load_obj(&source.path)?,
        MeshFormat::Json => load_json(&source.path)?,
    };
    Ok((mesh, format))
}

/// Imports a mesh and makes sure it carries a usable tangent basis.
///
/// Text meshes get tangents generated with `formula`. Any triangle whose
/// basis is not finite afterwards fails the load.
pub fn load_mesh(source: &MeshSource, formula: DeterminantFormula) -> Result<Mesh, ImportError> {
    let (mut mesh, format) = import_mesh(source)?;
    if format == MeshFormat::Obj {
        info!("Generating tangent space ({:?} determinant)", formula);
        compute_tangent_space_with(&mut mesh, formula);
    }
    if let Some(triangle) = mesh.first_non_finite_triangle() {
        warn!(
            "Triangle {} of {} has a non-finite tangent basis with the {:?} determinant",
            triangle,
            source.path.display(),
            formula
        );
        return Err(ImportError::DegenerateTangentSpace { triangle });
    }
    Ok(mesh)
}
