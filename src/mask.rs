use bitvec::prelude::*;
use crate::{ EDGE_CORNERS, CORNER_OFFSETS };
use glam::IVec3;

/// Solidity of the 8 corners of a cube, one bit per corner.
///
/// ```text
/// Bit i is set when corner i is solid (density < 0).
/// Corner i sits at CORNER_OFFSETS[i]:
///
///       2-----------------6
///      /|                /|
///     / |               / |
///    3-----------------7  |
///    |  0--------------|--4
///    | /               | /
///    |/                |/
///    1-----------------5
///
/// (x is bit 2 of the index, y is bit 1, z is bit 0)
/// ```
#[repr(transparent)]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CornerMask(u8);

impl CornerMask {
    pub const EMPTY: Self = Self(0x00);
    pub const FULL: Self = Self(0xff);

    #[inline(always)]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    #[inline(always)]
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Builds a mask from 8 corner densities, ordered like [`CORNER_OFFSETS`].
    pub fn from_densities(densities: &[f32; 8]) -> Self {
        let mut mask = Self::EMPTY;
        densities.iter().enumerate().for_each(|(corner, density)| {
            mask.set_solid(corner, *density < 0.0);
        });
        mask
    }

    pub fn is_solid(&self, corner: usize) -> bool {
        self.0.view_bits::<Lsb0>()[corner]
    }

    pub fn set_solid(&mut self, corner: usize, solid: bool) {
        self.0.view_bits_mut::<Lsb0>().set(corner, solid);
    }

    /// Uniformly air or uniformly solid: no surface passes through the cube.
    #[inline(always)]
    pub fn is_homogeneous(&self) -> bool {
        *self == Self::EMPTY || *self == Self::FULL
    }

    pub fn complement(&self) -> Self {
        Self(!self.0)
    }

    pub fn solid_count(&self) -> usize {
        self.0.view_bits::<Lsb0>().count_ones()
    }

    /// Whether the two corners of cube edge `edge` (see [`EDGE_CORNERS`]) differ in solidity.
    pub fn edge_crosses(&self, edge: usize) -> bool {
        let [c0, c1] = EDGE_CORNERS[edge];
        self.is_solid(c0) != self.is_solid(c1)
    }

    /// Iterates over the lattice offsets of the solid corners.
    pub fn solid_corners(&self) -> impl Iterator<Item = IVec3> + '_ {
        self.0.view_bits::<Lsb0>()
            .iter_ones()
            .map(|corner| CORNER_OFFSETS[corner])
    }
}

#[test]
fn corner_mask_bits() {
    let mut mask = CornerMask::EMPTY;
    mask.set_solid(0, true);
    mask.set_solid(5, true);
    assert_eq!(mask.bits(), 0b0010_0001);
    assert!(mask.is_solid(5));
    assert!(!mask.is_solid(4));
    assert_eq!(mask.solid_count(), 2);
    assert_eq!(mask.complement().bits(), 0b1101_1110);

    mask.set_solid(0, false);
    assert_eq!(mask.bits(), 0b0010_0000);
}

#[test]
fn corner_mask_from_densities() {
    // zero counts as air
    let mask = CornerMask::from_densities(&[-1.0, 0.0, 1.0, -0.5, 1.0, 1.0, 1.0, 1.0]);
    assert_eq!(mask.bits(), 0b0000_1001);
    assert!(!mask.is_homogeneous());

    assert!(CornerMask::from_densities(&[1.0; 8]).is_homogeneous());
    assert!(CornerMask::from_densities(&[-1.0; 8]).is_homogeneous());
}

#[test]
fn corner_mask_edges() {
    // Only corner 0 is solid, so exactly the 3 edges touching it cross.
    let mask = CornerMask::from_bits(0b0000_0001);
    let crossing: Vec<usize> = (0..12).filter(|edge| mask.edge_crosses(*edge)).collect();
    assert_eq!(crossing, vec![0, 4, 8]);

    let offsets: Vec<IVec3> = mask.solid_corners().collect();
    assert_eq!(offsets, vec![IVec3::ZERO]);
}
