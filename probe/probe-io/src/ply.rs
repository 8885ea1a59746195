//! PLY (Polygon File Format) support.
//!
//! Reads ASCII, binary little-endian and binary big-endian PLY files.
//! Vertex `x`, `y`, `z` properties are required; faces are read when present
//! and fan-triangulated.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use nalgebra::Point3;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};
use probe_types::SurfaceMesh;

use crate::error::{IoError, IoResult};

/// Load a surface from a PLY file.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The file is not valid PLY
/// - A vertex lacks a numeric `x`, `y` or `z` property
/// - A face references a vertex that does not exist
///
/// # Example
///
/// ```no_run
/// use probe_io::load_ply;
///
/// let mesh = load_ply("white.ply").unwrap();
/// println!("Loaded {} vertices", mesh.vertex_count());
/// ```
pub fn load_ply<P: AsRef<Path>>(path: P) -> IoResult<SurfaceMesh> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| IoError::from_open(path, e))?;
    let mut reader = BufReader::new(file);

    let parser = Parser::<DefaultElement>::new();

    let header = parser
        .read_header(&mut reader)
        .map_err(|e| IoError::invalid_content(format!("failed to parse PLY header: {e}")))?;

    let payload = parser
        .read_payload(&mut reader, &header)
        .map_err(|e| IoError::invalid_content(format!("failed to read PLY payload: {e}")))?;

    let mut mesh = SurfaceMesh::new();

    if let Some(vertex_elements) = payload.get("vertex") {
        mesh.vertices.reserve(vertex_elements.len());
        for (index, element) in vertex_elements.iter().enumerate() {
            let coord = |key: &str| {
                scalar_property(element, key).ok_or_else(|| {
                    IoError::invalid_content(format!("vertex {index} has no numeric '{key}'"))
                })
            };
            mesh.vertices
                .push(Point3::new(coord("x")?, coord("y")?, coord("z")?));
        }
    }

    if let Some(face_elements) = payload.get("face") {
        mesh.faces.reserve(face_elements.len());
        for element in face_elements {
            let indices = index_list(element);
            if indices.len() >= 3 {
                for i in 1..indices.len() - 1 {
                    mesh.faces.push([indices[0], indices[i], indices[i + 1]]);
                }
            }
        }
    }

    if !mesh.faces_in_bounds() {
        return Err(IoError::invalid_content(
            "PLY face references a missing vertex",
        ));
    }

    Ok(mesh)
}

/// Extract a numeric scalar property as `f64`.
fn scalar_property(element: &DefaultElement, key: &str) -> Option<f64> {
    match element.get(key)? {
        Property::Float(v) => Some(f64::from(*v)),
        Property::Double(v) => Some(*v),
        Property::Char(v) => Some(f64::from(*v)),
        Property::UChar(v) => Some(f64::from(*v)),
        Property::Short(v) => Some(f64::from(*v)),
        Property::UShort(v) => Some(f64::from(*v)),
        Property::Int(v) => Some(f64::from(*v)),
        Property::UInt(v) => Some(f64::from(*v)),
        _ => None,
    }
}

/// Extract the vertex index list from a face element.
fn index_list(element: &DefaultElement) -> Vec<u32> {
    for key in &["vertex_indices", "vertex_index"] {
        if let Some(prop) = element.get(*key) {
            return match prop {
                Property::ListInt(v) => v.iter().filter_map(|&i| u32::try_from(i).ok()).collect(),
                Property::ListUInt(v) => v.clone(),
                Property::ListUChar(v) => v.iter().map(|&i| u32::from(i)).collect(),
                Property::ListChar(v) => v.iter().filter_map(|&i| u32::try_from(i).ok()).collect(),
                Property::ListShort(v) => {
                    v.iter().filter_map(|&i| u32::try_from(i).ok()).collect()
                }
                Property::ListUShort(v) => v.iter().map(|&i| u32::from(i)).collect(),
                _ => continue,
            };
        }
    }
    Vec::new()
}
