//! Minimal NumPy `.npy` (format 1.0) codec for row-major `<f4` matrices.
//!
//! Only the layout the index store writes is supported: little-endian
//! 32-bit floats, C order, two-dimensional shape `(rows, dim)`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use hmokb_core::error::{HmoKbError, Result};
use std::io::{Read, Write};

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const ALIGNMENT: usize = 64;
/// Magic, two version bytes and the u16 header length.
const PREAMBLE_LEN: usize = MAGIC.len() + 2 + 2;

/// Write `vectors` as a `(vectors.len(), dim)` matrix.
pub fn write_matrix<W: Write>(writer: &mut W, vectors: &[Vec<f32>], dim: usize) -> Result<()> {
    if let Some(bad) = vectors.iter().position(|v| v.len() != dim) {
        return Err(HmoKbError::Store(format!(
            "vector {bad} has dimension {}, expected {dim}",
            vectors[bad].len()
        )));
    }

    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        vectors.len(),
        dim
    );
    let unpadded = PREAMBLE_LEN + header.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    header.push_str(&" ".repeat(padding));
    header.push('\n');

    let header_len = u16::try_from(header.len())
        .map_err(|_| HmoKbError::Store("npy header too long".into()))?;

    writer.write_all(MAGIC)?;
    writer.write_u8(1)?;
    writer.write_u8(0)?;
    writer.write_u16::<LittleEndian>(header_len)?;
    writer.write_all(header.as_bytes())?;
    for vector in vectors {
        for value in vector {
            writer.write_f32::<LittleEndian>(*value)?;
        }
    }
    Ok(())
}

/// Read a matrix written by [`write_matrix`]. Returns `(rows, dim)`.
pub fn read_matrix<R: Read>(reader: &mut R) -> Result<(Vec<Vec<f32>>, usize)> {
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(HmoKbError::Store("not an npy file".into()));
    }
    let major = reader.read_u8()?;
    let _minor = reader.read_u8()?;
    if major != 1 {
        return Err(HmoKbError::Store(format!("unsupported npy version {major}")));
    }
    let header_len = reader.read_u16::<LittleEndian>()? as usize;
    let mut header = vec![0u8; header_len];
    reader.read_exact(&mut header)?;
    let header = String::from_utf8_lossy(&header);

    if !header.contains("'descr': '<f4'") {
        return Err(HmoKbError::Store(format!("unsupported dtype in header {header:?}")));
    }
    if header.contains("'fortran_order': True") {
        return Err(HmoKbError::Store("fortran order is not supported".into()));
    }
    let (rows, dim) = parse_shape(&header)?;

    let mut matrix = Vec::with_capacity(rows);
    for _ in 0..rows {
        let mut row = vec![0f32; dim];
        reader.read_f32_into::<LittleEndian>(&mut row)?;
        matrix.push(row);
    }
    Ok((matrix, dim))
}

fn parse_shape(header: &str) -> Result<(usize, usize)> {
    let malformed = || HmoKbError::Store(format!("malformed npy shape in {header:?}"));
    let start = header.find("'shape': (").ok_or_else(malformed)? + "'shape': (".len();
    let end = start + header[start..].find(')').ok_or_else(malformed)?;
    let dims: Vec<usize> = header[start..end]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(|_| malformed()))
        .collect::<Result<_>>()?;
    match dims.as_slice() {
        [rows, dim] => Ok((*rows, *dim)),
        _ => Err(malformed()),
    }
}
