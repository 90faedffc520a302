use super::DeviceError;

/// Where a named uniform lives inside a linked program.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UniformLocation {
    /// Byte range inside the program's uniform block.
    Block { offset: u32, size: u32 },
    /// Resource binding slot (textures and samplers).
    Binding(u32),
}

/// Value written through [`Device::set_uniform`](super::Device::set_uniform).
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Vec2([f32; 2]),
    Vec4([f32; 4]),
}

impl UniformValue {
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        match self {
            UniformValue::Vec2(v) => v,
            UniformValue::Vec4(v) => v,
        }
    }
}

/// Writes `value` into a CPU-side copy of a uniform block.
pub(crate) fn write_uniform(
    block: &mut [u8],
    location: UniformLocation,
    value: UniformValue,
) -> Result<(), DeviceError> {
    let UniformLocation::Block { offset, size } = location else {
        return Err(DeviceError::UniformMismatch(format!(
            "{location:?} is a resource binding, not a block member"
        )));
    };

    let bytes: &[u8] = bytemuck::cast_slice(value.as_slice());
    if bytes.len() != size as usize {
        return Err(DeviceError::UniformMismatch(format!(
            "{} byte value written to {size} byte member",
            bytes.len()
        )));
    }

    let start = offset as usize;
    let Some(dst) = block.get_mut(start..start + bytes.len()) else {
        return Err(DeviceError::UniformMismatch(format!(
            "member at offset {offset} lies outside a {} byte block",
            block.len()
        )));
    };
    dst.copy_from_slice(bytes);
    Ok(())
}

/// Reads a block member back as floats.
pub(crate) fn read_uniform(block: &[u8], offset: u32, size: u32) -> Option<Vec<f32>> {
    let start = offset as usize;
    let raw = block.get(start..start + size as usize)?;
    Some(
        raw.chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}
