//! Fixed-rank iteration domains and the index types kernels receive.
//!
//! A domain is a sequence of global extents, one per axis, optionally split
//! into tiles. The rank is a const parameter, so flattening always produces
//! arrays whose length is known before any launch happens.

use std::fmt;

/// An iteration space a kernel can be launched over.
pub trait Domain<const N: usize> {
    /// Index type handed to the kernel body for each work item.
    ///
    /// Part of the kernel identity: the same body over a tiled and an untiled
    /// domain is two kernels.
    type Index: 'static;

    /// Global extent of every axis, in axis order.
    fn global_extents(&self) -> [usize; N];

    /// Tile extent of every axis; all zero when the domain is not tiled.
    fn local_extents(&self) -> [usize; N] {
        [0; N]
    }

    /// Scratch memory, in bytes, reserved per dispatch for the work group.
    fn dynamic_group_segment_size(&self) -> usize {
        0
    }
}

/// Untiled N-dimensional extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent<const N: usize> {
    dims: [usize; N],
}

impl<const N: usize> Extent<N> {
    pub const RANK: usize = N;

    pub fn new(dims: [usize; N]) -> Self {
        Self { dims }
    }

    pub fn dims(&self) -> &[usize; N] {
        &self.dims
    }

    /// Total number of work items, saturating at `usize::MAX`.
    pub fn size(&self) -> usize {
        self.checked_size().unwrap_or(usize::MAX)
    }

    /// Total number of work items, or `None` if the product overflows.
    pub fn checked_size(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Split this extent into tiles of the given shape.
    pub fn tile(self, tile: [usize; N]) -> TiledExtent<N> {
        TiledExtent::new(self, tile)
    }
}

impl<const N: usize> std::ops::Index<usize> for Extent<N> {
    type Output = usize;

    fn index(&self, axis: usize) -> &usize {
        &self.dims[axis]
    }
}

impl<const N: usize> From<[usize; N]> for Extent<N> {
    fn from(dims: [usize; N]) -> Self {
        Self::new(dims)
    }
}

impl<const N: usize> Domain<N> for Extent<N> {
    type Index = Index<N>;

    fn global_extents(&self) -> [usize; N] {
        self.dims
    }
}

/// Extent split into work-group tiles, with optional per-dispatch scratch memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TiledExtent<const N: usize> {
    extent: Extent<N>,
    tile: [usize; N],
    dynamic_group_segment_size: usize,
}

impl<const N: usize> TiledExtent<N> {
    pub const RANK: usize = N;

    pub fn new(extent: Extent<N>, tile: [usize; N]) -> Self {
        Self {
            extent,
            tile,
            dynamic_group_segment_size: 0,
        }
    }

    /// Reserve `bytes` of dynamic group memory for every dispatch.
    pub fn with_dynamic_group_memory(mut self, bytes: usize) -> Self {
        self.dynamic_group_segment_size = bytes;
        self
    }

    pub fn extent(&self) -> &Extent<N> {
        &self.extent
    }

    pub fn tile_dims(&self) -> &[usize; N] {
        &self.tile
    }

    /// Whether every axis is a whole number of tiles.
    pub fn is_evenly_tiled(&self) -> bool {
        self.extent
            .dims
            .iter()
            .zip(self.tile.iter())
            .all(|(&d, &t)| t != 0 && d % t == 0)
    }
}

impl<const N: usize> std::ops::Index<usize> for TiledExtent<N> {
    type Output = usize;

    fn index(&self, axis: usize) -> &usize {
        &self.extent.dims[axis]
    }
}

impl<const N: usize> Domain<N> for TiledExtent<N> {
    type Index = TiledIndex<N>;

    fn global_extents(&self) -> [usize; N] {
        self.extent.dims
    }

    fn local_extents(&self) -> [usize; N] {
        self.tile
    }

    fn dynamic_group_segment_size(&self) -> usize {
        self.dynamic_group_segment_size
    }
}

/// Position of one work item in an untiled domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Index<const N: usize>(pub [usize; N]);

impl<const N: usize> Index<N> {
    pub const RANK: usize = N;
}

impl<const N: usize> fmt::Display for Index<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Position of one work item in a tiled domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TiledIndex<const N: usize> {
    /// Position in the whole domain.
    pub global: [usize; N],
    /// Position inside the work item's tile.
    pub local: [usize; N],
    /// Which tile the work item belongs to.
    pub tile: [usize; N],
}

impl<const N: usize> TiledIndex<N> {
    pub const RANK: usize = N;

    /// Decompose a global position for the given tile shape.
    ///
    /// Axes with a zero tile extent are treated as one tile spanning the axis.
    pub fn from_global(global: [usize; N], tile_dims: [usize; N]) -> Self {
        let mut local = [0; N];
        let mut tile = [0; N];
        for axis in 0..N {
            match tile_dims[axis] {
                0 => local[axis] = global[axis],
                t => {
                    local[axis] = global[axis] % t;
                    tile[axis] = global[axis] / t;
                }
            }
        }
        Self { global, local, tile }
    }
}
