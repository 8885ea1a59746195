//! NIfTI-1 label volume support.
//!
//! Reads single-file NIfTI-1 images (`.nii`, magic `n+1`) in either byte
//! order. Only the first 3D frame of a higher-dimensional image is used.
//!
//! # Voxel to world
//!
//! The world position of voxel `(i, j, k)` follows the NIfTI-1 rules:
//!
//! 1. `sform_code > 0`: the `srow_x`, `srow_y`, `srow_z` affine rows.
//! 2. `qform_code > 0`: the quaternion, `pixdim` and `qoffset` fields.
//! 3. Otherwise plain `pixdim` scaling without offset.
//!
//! # Header layout (348 bytes)
//!
//! ```text
//! 0    i32      sizeof_hdr (348, also detects byte order)
//! 40   i16[8]   dim
//! 70   i16      datatype
//! 72   i16      bitpix
//! 76   f32[8]   pixdim (pixdim[0] is qfac)
//! 108  f32      vox_offset
//! 112  f32      scl_slope
//! 116  f32      scl_inter
//! 252  i16      qform_code
//! 254  i16      sform_code
//! 256  f32[6]   quatern_b, quatern_c, quatern_d, qoffset_x, qoffset_y, qoffset_z
//! 280  f32[12]  srow_x, srow_y, srow_z
//! 344  u8[4]    magic
//! ```

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::{Matrix3, Matrix4, Vector3};
use tracing::{debug, warn};

use crate::error::{IoError, IoResult};
use crate::grid::{LabelGrid, voxel_count};

/// Size of the NIfTI-1 header in bytes.
const HEADER_SIZE: usize = 348;

/// Offset of voxel data in files this crate writes (header + empty extension flag).
const DATA_OFFSET: usize = 352;

/// Magic for single-file images.
const MAGIC_SINGLE: &[u8; 4] = b"n+1\0";

/// Magic for detached header/image pairs.
const MAGIC_PAIR: &[u8; 4] = b"ni1\0";

/// Voxel storage types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Datatype {
    U8,
    I8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl Datatype {
    const fn from_code(code: i16) -> Option<Self> {
        match code {
            2 => Some(Self::U8),
            4 => Some(Self::I16),
            8 => Some(Self::I32),
            16 => Some(Self::F32),
            64 => Some(Self::F64),
            256 => Some(Self::I8),
            512 => Some(Self::U16),
            768 => Some(Self::U32),
            1024 => Some(Self::I64),
            1280 => Some(Self::U64),
            _ => None,
        }
    }

    const fn size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

/// Fixed-size reads from header or data bytes in the file's byte order.
struct Fields<'a> {
    bytes: &'a [u8],
    order: ByteOrder,
}

impl Fields<'_> {
    fn array<const N: usize>(&self, offset: usize) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[offset..offset + N]);
        out
    }

    fn i16(&self, offset: usize) -> i16 {
        let raw = self.array(offset);
        match self.order {
            ByteOrder::Little => i16::from_le_bytes(raw),
            ByteOrder::Big => i16::from_be_bytes(raw),
        }
    }

    fn f32(&self, offset: usize) -> f32 {
        let raw = self.array(offset);
        match self.order {
            ByteOrder::Little => f32::from_le_bytes(raw),
            ByteOrder::Big => f32::from_be_bytes(raw),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn value(&self, offset: usize, datatype: Datatype) -> f64 {
        macro_rules! decode {
            ($ty:ty) => {{
                let raw = self.array(offset);
                match self.order {
                    ByteOrder::Little => <$ty>::from_le_bytes(raw),
                    ByteOrder::Big => <$ty>::from_be_bytes(raw),
                }
            }};
        }
        match datatype {
            Datatype::U8 => f64::from(self.bytes[offset]),
            Datatype::I8 => f64::from(i8::from_ne_bytes([self.bytes[offset]])),
            Datatype::I16 => f64::from(decode!(i16)),
            Datatype::U16 => f64::from(decode!(u16)),
            Datatype::I32 => f64::from(decode!(i32)),
            Datatype::U32 => f64::from(decode!(u32)),
            Datatype::I64 => decode!(i64) as f64,
            Datatype::U64 => decode!(u64) as f64,
            Datatype::F32 => f64::from(decode!(f32)),
            Datatype::F64 => decode!(f64),
        }
    }
}

/// Load a label volume from a NIfTI-1 file.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The header is not NIfTI-1 or describes a detached image
/// - The voxel datatype is not a plain integer or float type
/// - The file is shorter than the header says
///
/// # Example
///
/// ```no_run
/// use probe_io::load_nifti;
///
/// let grid = load_nifti("labels.nii").unwrap();
/// println!("{:?}", grid.dims());
/// ```
pub fn load_nifti<P: AsRef<Path>>(path: P) -> IoResult<LabelGrid> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| IoError::from_open(path, e))?;
    let grid = parse_nifti(&bytes)?;
    debug!(path = %path.display(), dims = ?grid.dims(), "Loaded NIfTI volume");
    Ok(grid)
}

/// Decode a NIfTI-1 image held in memory.
///
/// # Errors
///
/// Same as [`load_nifti`], minus file access.
pub fn parse_nifti(bytes: &[u8]) -> IoResult<LabelGrid> {
    if bytes.len() < HEADER_SIZE {
        return Err(IoError::UnexpectedEof {
            position: bytes.len() as u64,
        });
    }

    let order = byte_order(bytes)?;
    let header = Fields { bytes, order };

    match &bytes[344..348] {
        m if m == MAGIC_SINGLE => {}
        m if m == MAGIC_PAIR => {
            return Err(IoError::invalid_content(
                "detached .hdr/.img NIfTI pairs are not supported",
            ));
        }
        _ => return Err(IoError::invalid_content("missing NIfTI-1 magic")),
    }

    let dims = read_dims(&header)?;
    let count = voxel_count(dims)?;

    let code = header.i16(70);
    let datatype = Datatype::from_code(code).ok_or(IoError::UnsupportedDatatype { code })?;

    let vox_offset = header.f32(108);
    if !vox_offset.is_finite() || vox_offset < 0.0 {
        return Err(IoError::invalid_content(format!(
            "invalid vox_offset {vox_offset}"
        )));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let data_start = (vox_offset as usize).max(HEADER_SIZE);

    let data_len = count
        .checked_mul(datatype.size())
        .ok_or_else(|| IoError::invalid_content("voxel data size overflows"))?;
    let data_end = data_start
        .checked_add(data_len)
        .ok_or_else(|| IoError::invalid_content("voxel data size overflows"))?;
    if bytes.len() < data_end {
        return Err(IoError::UnexpectedEof {
            position: bytes.len() as u64,
        });
    }

    let slope = f64::from(header.f32(112));
    let inter = f64::from(header.f32(116));
    let scaled = slope.is_finite() && slope != 0.0;

    let step = datatype.size();
    let values = (0..count)
        .map(|i| {
            let raw = header.value(data_start + i * step, datatype);
            if scaled { slope.mul_add(raw, inter) } else { raw }
        })
        .collect();

    LabelGrid::new(dims, voxel_to_world(&header), values)
}

/// Save a grid as a little-endian float64 NIfTI-1 file with an sform.
///
/// # Errors
///
/// Returns an error if a dimension does not fit the header or the file
/// cannot be written.
pub fn save_nifti<P: AsRef<Path>>(grid: &LabelGrid, path: P) -> IoResult<()> {
    let mut header = [0u8; DATA_OFFSET];
    let mut put = |offset: usize, raw: &[u8]| {
        header[offset..offset + raw.len()].copy_from_slice(raw);
    };

    put(0, &348i32.to_le_bytes());

    let mut dim = [1i16; 8];
    dim[0] = 3;
    for (axis, &n) in grid.dims().iter().enumerate() {
        dim[axis + 1] = i16::try_from(n).map_err(|_| {
            IoError::invalid_content(format!("dimension {n} does not fit a NIfTI-1 header"))
        })?;
    }
    for (i, d) in dim.iter().enumerate() {
        put(40 + 2 * i, &d.to_le_bytes());
    }

    put(70, &64i16.to_le_bytes());
    put(72, &64i16.to_le_bytes());

    let affine = grid.affine();
    let mut pixdim = [1f32; 8];
    for axis in 0..3 {
        #[allow(clippy::cast_possible_truncation)]
        let spacing = affine.fixed_view::<3, 1>(0, axis).norm() as f32;
        pixdim[axis + 1] = spacing;
    }
    for (i, p) in pixdim.iter().enumerate() {
        put(76 + 4 * i, &p.to_le_bytes());
    }

    #[allow(clippy::cast_precision_loss)]
    put(108, &(DATA_OFFSET as f32).to_le_bytes());
    put(112, &1f32.to_le_bytes());
    put(254, &2i16.to_le_bytes());
    for row in 0..3 {
        for col in 0..4 {
            #[allow(clippy::cast_possible_truncation)]
            let v = affine[(row, col)] as f32;
            put(280 + 16 * row + 4 * col, &v.to_le_bytes());
        }
    }
    put(344, MAGIC_SINGLE);

    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&header)?;
    for value in grid.values() {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

fn byte_order(bytes: &[u8]) -> IoResult<ByteOrder> {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[0..4]);
    if usize::try_from(i32::from_le_bytes(raw)).ok() == Some(HEADER_SIZE) {
        Ok(ByteOrder::Little)
    } else if usize::try_from(i32::from_be_bytes(raw)).ok() == Some(HEADER_SIZE) {
        Ok(ByteOrder::Big)
    } else {
        Err(IoError::invalid_content(
            "sizeof_hdr is not 348; not a NIfTI-1 header",
        ))
    }
}

fn read_dims(header: &Fields<'_>) -> IoResult<[usize; 3]> {
    let ndim = header.i16(40);
    if !(1..=7).contains(&ndim) {
        return Err(IoError::invalid_content(format!(
            "dim[0] must be in 1..=7, got {ndim}"
        )));
    }

    let mut dims = [1usize; 3];
    for (axis, d) in dims.iter_mut().enumerate() {
        let i = axis + 1;
        if i16::try_from(i).is_ok_and(|i| i <= ndim) {
            let n = header.i16(40 + 2 * i);
            *d = usize::try_from(n)
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| IoError::invalid_content(format!("dim[{i}] is {n}")))?;
        }
    }

    let frames: i64 = (4..=7)
        .filter(|&i| i16::try_from(i).is_ok_and(|i| i <= ndim))
        .map(|i| i64::from(header.i16(40 + 2 * i)).max(1))
        .product();
    if frames > 1 {
        warn!(frames, "Volume has more than one frame; using the first");
    }

    Ok(dims)
}

/// Voxel-to-world affine following the sform, qform, pixdim precedence.
fn voxel_to_world(header: &Fields<'_>) -> Matrix4<f64> {
    let pixdim = |i: usize| f64::from(header.f32(76 + 4 * i));

    if header.i16(254) > 0 {
        let mut affine = Matrix4::identity();
        for row in 0..3 {
            for col in 0..4 {
                affine[(row, col)] = f64::from(header.f32(280 + 16 * row + 4 * col));
            }
        }
        return affine;
    }

    if header.i16(252) > 0 {
        let b = f64::from(header.f32(256));
        let c = f64::from(header.f32(260));
        let d = f64::from(header.f32(264));
        let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();

        let rotation = Matrix3::new(
            a * a + b * b - c * c - d * d,
            2.0 * (b * c - a * d),
            2.0 * (b * d + a * c),
            2.0 * (b * c + a * d),
            a * a + c * c - b * b - d * d,
            2.0 * (c * d - a * b),
            2.0 * (b * d - a * c),
            2.0 * (c * d + a * b),
            a * a + d * d - c * c - b * b,
        );

        let qfac = if pixdim(0) < 0.0 { -1.0 } else { 1.0 };
        let scale = Vector3::new(pixdim(1), pixdim(2), qfac * pixdim(3));
        let linear = rotation * Matrix3::from_diagonal(&scale);

        let mut affine = linear.to_homogeneous();
        affine[(0, 3)] = f64::from(header.f32(268));
        affine[(1, 3)] = f64::from(header.f32(272));
        affine[(2, 3)] = f64::from(header.f32(276));
        return affine;
    }

    Matrix4::from_diagonal(&nalgebra::Vector4::new(pixdim(1), pixdim(2), pixdim(3), 1.0))
}
