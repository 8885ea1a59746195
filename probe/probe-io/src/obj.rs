//! OBJ surface support.
//!
//! Two unrelated formats share the `.obj` extension and both are read here:
//!
//! - **MNI polygon objects** (ASCII), used by cortical surface pipelines.
//!   The file starts with `P`, followed by surface properties, the point
//!   count, points, normals, colours, polygon end indices and indices.
//! - **Wavefront OBJ**, read from `v` and `f` lines only.
//!
//! The flavour is detected from the first non-whitespace character.
//!
//! # MNI ASCII layout
//!
//! ```text
//! P ambient diffuse specular shininess transparency n_points
//! x y z                        (n_points times)
//! nx ny nz                     (n_points times)
//! n_items
//! colour_flag colours...       (flag 0: one RGBA, 1: per item, 2: per point)
//! end_index                    (n_items times)
//! index                        (last end_index times)
//! ```

use std::path::Path;

use nalgebra::Point3;
use probe_types::SurfaceMesh;

use crate::error::{IoError, IoResult};

/// Load a surface from an `.obj` file of either flavour.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is malformed. Binary MNI
/// objects (leading `p`) are rejected.
///
/// # Example
///
/// ```no_run
/// use probe_io::load_obj;
///
/// let mesh = load_obj("mid_surface.obj").unwrap();
/// println!("{} vertices", mesh.vertex_count());
/// ```
pub fn load_obj<P: AsRef<Path>>(path: P) -> IoResult<SurfaceMesh> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| IoError::from_open(path, e))?;
    let text = std::str::from_utf8(&bytes)
        .map_err(|e| IoError::invalid_content(format!("OBJ is not UTF-8 text: {e}")))?;
    parse_obj(text)
}

/// Parse `.obj` text of either flavour.
///
/// # Errors
///
/// Returns an error if the text is malformed.
pub fn parse_obj(text: &str) -> IoResult<SurfaceMesh> {
    match text.trim_start().chars().next() {
        Some('P') => parse_mni(text),
        Some('p') => Err(IoError::invalid_content(
            "binary MNI objects are not supported",
        )),
        _ => parse_wavefront(text),
    }
}

/// Whitespace token stream with position tracking for error messages.
struct Tokens<'a> {
    inner: std::str::SplitWhitespace<'a>,
    consumed: u64,
    max_tokens: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.split_whitespace(),
            consumed: 0,
            // Every token needs a byte plus a separator
            max_tokens: text.len() / 2 + 1,
        }
    }

    fn next_token(&mut self) -> IoResult<&'a str> {
        let token = self.inner.next().ok_or(IoError::UnexpectedEof {
            position: self.consumed,
        })?;
        self.consumed += 1;
        Ok(token)
    }

    fn next_f64(&mut self) -> IoResult<f64> {
        Ok(self.next_token()?.parse()?)
    }

    fn next_usize(&mut self) -> IoResult<usize> {
        Ok(self.next_token()?.parse()?)
    }

    /// Caps a count read from the header by what the text can hold.
    fn capacity(&self, wanted: usize) -> usize {
        wanted.min(self.max_tokens)
    }

    fn skip(&mut self, count: usize) -> IoResult<()> {
        for _ in 0..count {
            self.next_token()?;
        }
        Ok(())
    }
}

fn parse_mni(text: &str) -> IoResult<SurfaceMesh> {
    let mut tokens = Tokens::new(text);

    if tokens.next_token()? != "P" {
        return Err(IoError::invalid_content("MNI object must start with 'P'"));
    }
    // ambient, diffuse, specular, shininess, transparency
    tokens.skip(5)?;

    let n_points = tokens.next_usize()?;
    let capacity = tokens.capacity(n_points);
    let mut mesh = SurfaceMesh::with_capacity(capacity, capacity.saturating_mul(2));
    for _ in 0..n_points {
        let x = tokens.next_f64()?;
        let y = tokens.next_f64()?;
        let z = tokens.next_f64()?;
        mesh.vertices.push(Point3::new(x, y, z));
    }

    // normals
    tokens.skip(scaled(n_points, 3)?)?;

    let n_items = tokens.next_usize()?;
    let colour_flag = tokens.next_usize()?;
    let colours = match colour_flag {
        0 => 1,
        1 => n_items,
        2 => n_points,
        other => {
            return Err(IoError::invalid_content(format!(
                "unknown MNI colour flag {other}"
            )));
        }
    };
    tokens.skip(scaled(colours, 4)?)?;

    let mut end_indices = Vec::with_capacity(tokens.capacity(n_items));
    for _ in 0..n_items {
        end_indices.push(tokens.next_usize()?);
    }

    let total = end_indices.last().copied().unwrap_or(0);
    let mut indices = Vec::with_capacity(tokens.capacity(total));
    for _ in 0..total {
        let index = tokens.next_usize()?;
        let index = u32::try_from(index)
            .ok()
            .filter(|&i| (i as usize) < n_points)
            .ok_or_else(|| {
                IoError::invalid_content(format!("polygon index {index} out of range"))
            })?;
        indices.push(index);
    }

    let mut start = 0;
    for &end in &end_indices {
        if end < start || end > indices.len() {
            return Err(IoError::invalid_content(format!(
                "polygon end index {end} out of order"
            )));
        }
        fan_triangulate(&indices[start..end], &mut mesh.faces);
        start = end;
    }

    Ok(mesh)
}

fn scaled(count: usize, per_item: usize) -> IoResult<usize> {
    count
        .checked_mul(per_item)
        .ok_or_else(|| IoError::invalid_content(format!("MNI count {count} is too large")))
}

fn parse_wavefront(text: &str) -> IoResult<SurfaceMesh> {
    let mut mesh = SurfaceMesh::new();
    let mut polygons: Vec<Vec<i64>> = Vec::new();

    for (line_no, line) in text.lines().enumerate() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => {
                let mut coord = || -> IoResult<f64> {
                    let token = parts.next().ok_or_else(|| {
                        IoError::invalid_content(format!(
                            "line {}: vertex needs three coordinates",
                            line_no + 1
                        ))
                    })?;
                    Ok(token.parse()?)
                };
                let x = coord()?;
                let y = coord()?;
                let z = coord()?;
                mesh.vertices.push(Point3::new(x, y, z));
            }
            Some("f") => {
                // "7", "7/1", "7//3" and "7/1/3" all reference vertex 7
                let polygon = parts
                    .map(|p| p.split('/').next().unwrap_or(p).parse::<i64>())
                    .collect::<Result<Vec<_>, _>>()?;
                polygons.push(polygon);
            }
            _ => {}
        }
    }

    let n = i64::try_from(mesh.vertices.len())
        .map_err(|_| IoError::invalid_content("too many vertices"))?;
    for polygon in polygons {
        let resolved = polygon
            .iter()
            .map(|&i| {
                // 1-based, negative values count back from the last vertex
                let zero_based = if i < 0 { n + i } else { i - 1 };
                if (0..n).contains(&zero_based) {
                    u32::try_from(zero_based)
                        .map_err(|_| IoError::invalid_content("face index too large"))
                } else {
                    Err(IoError::invalid_content(format!(
                        "face index {i} out of range"
                    )))
                }
            })
            .collect::<IoResult<Vec<_>>>()?;
        fan_triangulate(&resolved, &mut mesh.faces);
    }

    Ok(mesh)
}

fn fan_triangulate(polygon: &[u32], faces: &mut Vec<[u32; 3]>) {
    if polygon.len() >= 3 {
        for i in 1..polygon.len() - 1 {
            faces.push([polygon[0], polygon[i], polygon[i + 1]]);
        }
    }
}
