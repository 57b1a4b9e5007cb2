/// Strided addressing for a logical 4-axis tensor inside a flat buffer.
///
/// `dims` are given in logical axis order; `strides[k]` is the distance in the
/// flat buffer between neighbours along logical axis `k`. A permuted or padded
/// storage order is expressed purely through the strides, so callers index
/// every layout with the same logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorLayout {
    dims: [usize; 4],
    strides: [usize; 4],
}

impl TensorLayout {
    pub fn row_major(dims: [usize; 4]) -> Self {
        let strides = [dims[1] * dims[2] * dims[3], dims[2] * dims[3], dims[3], 1];
        Self { dims, strides }
    }

    pub fn with_strides(dims: [usize; 4], strides: [usize; 4]) -> Self {
        Self { dims, strides }
    }

    pub fn dims(&self) -> [usize; 4] {
        self.dims
    }

    pub fn strides(&self) -> [usize; 4] {
        self.strides
    }

    #[inline]
    pub fn offset(&self, idx: [usize; 4]) -> usize {
        idx[0] * self.strides[0]
            + idx[1] * self.strides[1]
            + idx[2] * self.strides[2]
            + idx[3] * self.strides[3]
    }

    /// Number of buffer cells spanned by the layout.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        1 + self
            .dims
            .iter()
            .zip(self.strides.iter())
            .map(|(&d, &s)| (d - 1) * s)
            .sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.dims.contains(&0)
    }
}
