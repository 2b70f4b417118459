//! Cube topology tables for the cell/face/edge recursion.
//!
//! Child and corner indices follow [`CORNER_OFFSETS`](crate::CORNER_OFFSETS);
//! edge indices follow [`EDGE_CORNERS`](crate::EDGE_CORNERS). Axis 0 is x,
//! 1 is y, 2 is z.

/// Pairs of children sharing a face inside a cell: `[first, second, axis]`,
/// `first` being on the low side along `axis`.
pub const CELL_PROC_FACE_MASK: [[usize; 3]; 12] = [
    [0, 4, 0], [1, 5, 0], [2, 6, 0], [3, 7, 0],
    [0, 2, 1], [4, 6, 1], [1, 3, 1], [5, 7, 1],
    [0, 1, 2], [2, 3, 2], [4, 5, 2], [6, 7, 2],
];

/// Quadruples of children sharing an edge inside a cell: `[c0, c1, c2, c3, axis]`.
pub const CELL_PROC_EDGE_MASK: [[usize; 5]; 6] = [
    [0, 1, 2, 3, 0],
    [4, 5, 6, 7, 0],
    [0, 4, 1, 5, 1],
    [2, 6, 3, 7, 1],
    [0, 2, 4, 6, 2],
    [1, 3, 5, 7, 2],
];

/// Per face axis, the 4 sub-face pairs across a shared face:
/// `[child of first, child of second, axis]`.
pub const FACE_PROC_FACE_MASK: [[[usize; 3]; 4]; 3] = [
    [[4, 0, 0], [5, 1, 0], [6, 2, 0], [7, 3, 0]],
    [[2, 0, 1], [6, 4, 1], [3, 1, 1], [7, 5, 1]],
    [[1, 0, 2], [3, 2, 2], [5, 4, 2], [7, 6, 2]],
];

/// Per face axis, the 4 sub-edges lying in a shared face:
/// `[order, c0, c1, c2, c3, axis]`, where `order` picks from [`FACE_PROC_EDGE_ORDER`]
/// which side of the face each of the 4 nodes comes from.
pub const FACE_PROC_EDGE_MASK: [[[usize; 6]; 4]; 3] = [
    [[1, 4, 0, 5, 1, 1], [1, 6, 2, 7, 3, 1], [0, 4, 6, 0, 2, 2], [0, 5, 7, 1, 3, 2]],
    [[0, 2, 3, 0, 1, 0], [0, 6, 7, 4, 5, 0], [1, 2, 0, 6, 4, 2], [1, 3, 1, 7, 5, 2]],
    [[1, 1, 0, 3, 2, 0], [1, 5, 4, 7, 6, 0], [0, 1, 5, 0, 4, 1], [0, 3, 7, 2, 6, 1]],
];

pub const FACE_PROC_EDGE_ORDER: [[usize; 4]; 2] = [
    [0, 0, 1, 1],
    [0, 1, 0, 1],
];

/// Per edge axis, the 2 halves of a shared edge: `[c0, c1, c2, c3, axis]`.
pub const EDGE_PROC_EDGE_MASK: [[[usize; 5]; 2]; 3] = [
    [[3, 2, 1, 0, 0], [7, 6, 5, 4, 0]],
    [[5, 1, 4, 0, 1], [7, 3, 6, 2, 1]],
    [[6, 4, 2, 0, 2], [7, 5, 3, 1, 2]],
];

/// Per edge axis, which cube edge of each of the 4 nodes is the shared edge.
pub const PROCESS_EDGE_MASK: [[usize; 4]; 3] = [
    [3, 2, 1, 0],
    [7, 5, 6, 4],
    [11, 10, 9, 8],
];

#[test]
fn face_pairs_are_neighbours() {
    use crate::CORNER_OFFSETS;

    for [a, b, axis] in CELL_PROC_FACE_MASK {
        let delta = CORNER_OFFSETS[b] - CORNER_OFFSETS[a];
        assert_eq!(delta.to_array()[axis], 1);
        assert_eq!(delta.abs().to_array().iter().sum::<i32>(), 1);
    }
}

#[test]
fn process_edges_run_along_axis() {
    for (axis, edges) in PROCESS_EDGE_MASK.iter().enumerate() {
        for edge in edges {
            assert_eq!(edge / 4, axis);
        }
        // Each of the 4 nodes contributes a different edge of the same axis
        let mut sorted = *edges;
        sorted.sort();
        assert_eq!(sorted, [axis * 4, axis * 4 + 1, axis * 4 + 2, axis * 4 + 3]);
    }
}

#[test]
fn edge_quads_surround_their_edge() {
    use crate::CORNER_OFFSETS;

    // The 4 children around an internal edge differ only off its axis
    for [c0, c1, c2, c3, axis] in CELL_PROC_EDGE_MASK {
        for child in [c1, c2, c3] {
            assert_eq!(CORNER_OFFSETS[child].to_array()[axis], CORNER_OFFSETS[c0].to_array()[axis]);
        }
    }
}
