use crate::core::geometry::Vertex;
use crate::io::error::ImportError;
use crate::scene::mesh::Mesh;
use log::{debug, info};
use nalgebra::{Point3, Vector2, Vector3};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct Document {
    meshes: Option<Vec<MeshRecord>>,
}

/// One record of an assimp JSON export. Every field is optional here so a
/// missing one surfaces as [`ImportError::MissingField`] rather than a serde error.
#[derive(Debug, Deserialize)]
struct MeshRecord {
    vertices: Option<Vec<f32>>,
    normals: Option<Vec<f32>>,
    tangents: Option<Vec<f32>>,
    bitangents: Option<Vec<f32>>,
    texturecoords: Option<Vec<Vec<f32>>>,
    numuvcomponents: Option<Vec<usize>>,
    faces: Option<Vec<Vec<i64>>>,
}

/// Loads the first mesh of an assimp-style JSON document.
pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Mesh, ImportError> {
    let path = path.as_ref();
    info!("Loading JSON mesh: {}", path.display());
    let text = fs::read_to_string(path)?;
    let mesh = parse_json(&text)?;
    info!(
        "Loaded {} triangles from {}",
        mesh.triangle_count(),
        path.display()
    );
    Ok(mesh)
}

/// Parses an assimp-style JSON document already in memory.
///
/// Flat attribute arrays are zipped into an intermediate vertex list, then
/// `faces` is expanded so that output vertex `k` is intermediate vertex
/// `faces[k / 3][k % 3]`. Tangents and bitangents are copied as given.
pub fn parse_json(text: &str) -> Result<Mesh, ImportError> {
    let document: Document = serde_json::from_str(text)?;
    let mut meshes = document.meshes.ok_or_else(|| missing("meshes"))?;
    if meshes.is_empty() {
        return Err(missing("meshes[0]"));
    }
    if meshes.len() > 1 {
        debug!("Document has {} meshes, using only the first", meshes.len());
    }
    let record = meshes.swap_remove(0);

    let positions = required(record.vertices, "vertices")?;
    let normals = required(record.normals, "normals")?;
    let tangents = required(record.tangents, "tangents")?;
    let bitangents = required(record.bitangents, "bitangents")?;
    let uv_channels = required(record.texturecoords, "texturecoords")?;
    let faces = required(record.faces, "faces")?;
    let uvs = uv_channels
        .into_iter()
        .next()
        .ok_or_else(|| missing("texturecoords[0]"))?;

    let uv_stride = record
        .numuvcomponents
        .as_ref()
        .and_then(|n| n.first().copied())
        .unwrap_or(2);
    if uv_stride < 2 {
        return Err(ImportError::Format(format!(
            "numuvcomponents[0] is {}, need at least 2",
            uv_stride
        )));
    }

    let count = element_count(&positions, 3, "vertices")?;
    check_len(&normals, 3, count, "normals")?;
    check_len(&tangents, 3, count, "tangents")?;
    check_len(&bitangents, 3, count, "bitangents")?;
    check_len(&uvs, uv_stride, count, "texturecoords[0]")?;

    let intermediate: Vec<Vertex> = (0..count)
        .map(|i| {
            let p = &positions[i * 3..i * 3 + 3];
            let n = &normals[i * 3..i * 3 + 3];
            let t = &tangents[i * 3..i * 3 + 3];
            let b = &bitangents[i * 3..i * 3 + 3];
            let uv = &uvs[i * uv_stride..i * uv_stride + 2];
            Vertex::new(
                Point3::new(p[0], p[1], p[2]),
                Vector3::new(n[0], n[1], n[2]),
                Vector2::new(uv[0], uv[1]),
            )
            .with_tangent_basis(Vector3::new(t[0], t[1], t[2]), Vector3::new(b[0], b[1], b[2]))
        })
        .collect();

    let mut vertices = Vec::with_capacity(faces.len() * 3);
    for (f, face) in faces.iter().enumerate() {
        if face.len() != 3 {
            return Err(ImportError::Format(format!(
                "face {} has {} indices, expected 3",
                f,
                face.len()
            )));
        }
        for &index in face {
            let vertex = usize::try_from(index)
                .ok()
                .and_then(|i| intermediate.get(i))
                .ok_or(ImportError::IndexOutOfRange {
                    what: "vertex",
                    index,
                    len: intermediate.len(),
                })?;
            vertices.push(*vertex);
        }
    }

    Ok(Mesh::from_triangles(vertices))
}

fn missing(field: &str) -> ImportError {
    ImportError::MissingField(field.to_string())
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ImportError> {
    value.ok_or_else(|| missing(field))
}

fn element_count(data: &[f32], stride: usize, field: &str) -> Result<usize, ImportError> {
    if data.len() % stride != 0 {
        return Err(ImportError::Format(format!(
            "'{}' has {} values, not a multiple of {}",
            field,
            data.len(),
            stride
        )));
    }
    Ok(data.len() / stride)
}

fn check_len(data: &[f32], stride: usize, count: usize, field: &str) -> Result<(), ImportError> {
    let have = element_count(data, stride, field)?;
    if have < count {
        return Err(ImportError::Format(format!(
            "'{}' holds {} elements but there are {} vertices",
            field, have, count
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = r#"{
        "meshes": [{
            "vertices":   [0, 0, 0,  1, 0, 0,  0, 1, 0],
            "normals":    [0, 0, 1,  0, 0, 1,  0, 0, 1],
            "tangents":   [1, 0, 0,  1, 0, 0,  1, 0, 0],
            "bitangents": [0, 1, 0,  0, 1, 0,  0, 1, 0],
            "texturecoords": [[0, 0,  1, 0,  0, 1]],
            "faces": [[0, 1, 2]]
        }]
    }"#;

    #[test]
    fn test_single_triangle_matches_source_arrays() {
        let mesh = parse_json(TRIANGLE).unwrap();
        assert_eq!(mesh.len(), 3);
        let v = mesh.vertices();
        assert_eq!(v[0].position, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(v[1].position, Point3::new(1.0, 0.0, 0.0));
        assert_eq!(v[2].position, Point3::new(0.0, 1.0, 0.0));
        assert_eq!(v[2].uv, Vector2::new(0.0, 1.0));
        for x in v {
            assert_eq!(x.normal, Vector3::z());
            assert_eq!(x.tangent, Vector3::x());
            assert_eq!(x.bitangent, Vector3::y());
        }
    }

    #[test]
    fn test_faces_expand_by_index() {
        let src = r#"{ "meshes": [{
            "vertices":   [0,0,0, 1,0,0, 1,1,0, 0,1,0],
            "normals":    [0,0,1, 0,0,1, 0,0,1, 0,0,1],
            "tangents":   [1,0,0, 1,0,0, 1,0,0, 1,0,0],
            "bitangents": [0,1,0, 0,1,0, 0,1,0, 0,1,0],
            "texturecoords": [[0,0,9, 1,0,9, 1,1,9, 0,1,9]],
            "numuvcomponents": [3],
            "faces": [[0,1,2],[2,3,0]]
        }]}"#;
        let mesh = parse_json(src).unwrap();
        let faces = [[0usize, 1, 2], [2, 3, 0]];
        let corners = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        assert_eq!(mesh.len(), 3 * faces.len());
        for (k, v) in mesh.vertices().iter().enumerate() {
            let source = faces[k / 3][k % 3];
            assert_eq!(v.position, corners[source]);
            assert_eq!(v.uv, Vector2::new(corners[source].x, corners[source].y));
        }
    }

    #[test]
    fn test_extra_meshes_are_ignored() {
        let src = TRIANGLE.replace("}]\n    }", "}, {}]\n    }");
        let mesh = parse_json(&src).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_missing_fields() {
        assert!(matches!(parse_json("{}"), Err(ImportError::MissingField(f)) if f == "meshes"));
        assert!(matches!(
            parse_json(r#"{"meshes": []}"#),
            Err(ImportError::MissingField(_))
        ));
        let no_tangents = TRIANGLE.replace(r#""tangents":   [1, 0, 0,  1, 0, 0,  1, 0, 0],"#, "");
        assert!(matches!(
            parse_json(&no_tangents),
            Err(ImportError::MissingField(f)) if f == "tangents"
        ));
        let no_channel = TRIANGLE.replace("[[0, 0,  1, 0,  0, 1]]", "[]");
        assert!(matches!(
            parse_json(&no_channel),
            Err(ImportError::MissingField(f)) if f == "texturecoords[0]"
        ));
    }

    #[test]
    fn test_bad_face_length_is_format_error() {
        let src = TRIANGLE.replace("[[0, 1, 2]]", "[[0, 1, 2, 0]]");
        assert!(matches!(parse_json(&src), Err(ImportError::Format(_))));
    }

    #[test]
    fn test_face_index_past_end() {
        let src = TRIANGLE.replace("[[0, 1, 2]]", "[[0, 1, 3]]");
        assert!(matches!(
            parse_json(&src),
            Err(ImportError::IndexOutOfRange { index: 3, len: 3, .. })
        ));
    }

    #[test]
    fn test_ragged_arrays_are_format_errors() {
        let src = TRIANGLE.replace("[0, 0, 1,  0, 0, 1,  0, 0, 1]", "[0, 0, 1,  0, 0, 1,  0, 0]");
        assert!(matches!(parse_json(&src), Err(ImportError::Format(_))));

        let short = TRIANGLE.replace("[[0, 0,  1, 0,  0, 1]]", "[[0, 0,  1, 0]]");
        assert!(matches!(parse_json(&short), Err(ImportError::Format(_))));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(parse_json("{ meshes: "), Err(ImportError::Json(_))));
    }
}
