use crate::core::geometry::Vertex;
use crate::io::error::ImportError;
use crate::scene::mesh::Mesh;
use log::{debug, info};
use nalgebra::{Point3, Vector2, Vector3};
use std::fs;
use std::path::Path;

/// Loads a triangulated `.obj`-style file into a flat mesh.
///
/// Only `v`, `vn`, `vt` and `f` records are read. Every face must have
/// exactly three `p/t/n` corners; the referenced attributes are copied into
/// three fresh vertices in corner order. Tangents are left zeroed.
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Mesh, ImportError> {
    let path = path.as_ref();
    info!("Loading OBJ file: {}", path.display());
    let text = fs::read_to_string(path)?;
    let mesh = parse_obj(&text)?;
    info!(
        "Loaded {} triangles from {}",
        mesh.triangle_count(),
        path.display()
    );
    Ok(mesh)
}

/// Parses OBJ text already in memory. See [`load_obj`].
pub fn parse_obj(text: &str) -> Result<Mesh, ImportError> {
    let mut positions: Vec<Point3<f32>> = Vec::new();
    let mut normals: Vec<Vector3<f32>> = Vec::new();
    let mut uvs: Vec<Vector2<f32>> = Vec::new();
    let mut vertices = Vec::new();
    let mut skipped = 0usize;

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let mut tokens = raw.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };

        match keyword {
            "v" => {
                let [x, y, z] = read_floats::<3>(&mut tokens, line, keyword)?;
                positions.push(Point3::new(x, y, z));
            }
            "vn" => {
                let [x, y, z] = read_floats::<3>(&mut tokens, line, keyword)?;
                normals.push(Vector3::new(x, y, z));
            }
            "vt" => {
                // An optional third (w) component is ignored.
                let [u, v] = read_floats::<2>(&mut tokens, line, keyword)?;
                uvs.push(Vector2::new(u, v));
            }
            "f" => {
                let corners: Vec<&str> = tokens.collect();
                if corners.len() != 3 {
                    return Err(ImportError::parse(
                        line,
                        format!("face has {} corners, expected 3", corners.len()),
                    ));
                }
                for corner in corners {
                    let [p, t, n] = parse_corner(corner, line)?;
                    let position = *lookup(&positions, p, "position")?;
                    let uv = *lookup(&uvs, t, "texcoord")?;
                    let normal = *lookup(&normals, n, "normal")?;
                    vertices.push(Vertex::new(position, normal, uv));
                }
            }
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!("Ignored {} unsupported OBJ records", skipped);
    }
    debug!(
        "OBJ source arrays: {} positions, {} normals, {} texcoords",
        positions.len(),
        normals.len(),
        uvs.len()
    );

    Ok(Mesh::from_triangles(vertices))
}

fn read_floats<'a, const N: usize>(
    tokens: &mut impl Iterator<Item = &'a str>,
    line: usize,
    keyword: &str,
) -> Result<[f32; N], ImportError> {
    let mut out = [0.0; N];
    for (k, slot) in out.iter_mut().enumerate() {
        let token = tokens.next().ok_or_else(|| {
            ImportError::parse(
                line,
                format!("'{}' needs {} components, found {}", keyword, N, k),
            )
        })?;
        *slot = token
            .parse()
            .map_err(|_| ImportError::parse(line, format!("invalid number '{}'", token)))?;
    }
    Ok(out)
}

/// Splits a `p/t/n` corner into its three 1-based indices.
fn parse_corner(corner: &str, line: usize) -> Result<[i64; 3], ImportError> {
    let parts: Vec<&str> = corner.split('/').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(ImportError::parse(
            line,
            format!("corner '{}' must have the form p/t/n", corner),
        ));
    }
    let mut out = [0i64; 3];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part
            .parse()
            .map_err(|_| ImportError::parse(line, format!("invalid index '{}' in corner '{}'", part, corner)))?;
    }
    Ok(out)
}

/// Resolves a 1-based index against the entries seen so far.
fn lookup<'a, T>(items: &'a [T], one_based: i64, what: &'static str) -> Result<&'a T, ImportError> {
    let index = one_based - 1;
    usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i))
        .ok_or(ImportError::IndexOutOfRange {
            what,
            index,
            len: items.len(),
        })
}
