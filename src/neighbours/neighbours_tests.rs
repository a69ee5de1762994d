use nalgebra::Vector3;

use crate::neighbours::NeighbourList;

#[test]
fn test_neighbours_from_flat() {
    let rij = [1.0, 0.0, 0.0, 0.0, 1.5, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 2.0];
    let jlist = [1, 2, 0, 3];
    let nbrs = NeighbourList::from_flat(2, 2, 2, &rij, &jlist, 1.0, 3.0).unwrap();
    assert_eq!(nbrs.nlocal(), 2);
    assert_eq!(nbrs.nghost(), 2);
    assert_eq!(nbrs.ntotal(), 4);
    assert_eq!(nbrs.ninside(), 2);
    assert_eq!(nbrs.of_atom(1)[1].rij, Vector3::new(0.0, 0.0, 2.0));
    assert_eq!(nbrs.of_atom(1)[1].index, 3);
    assert_eq!(nbrs.neighbours()[[0, 1]].rcutij, 3.0);

    let shifted = nbrs.map_displacements(|atom, _, r| r + Vector3::new(atom as f64, 0.0, 0.0));
    assert_eq!(shifted.of_atom(1)[0].rij, Vector3::zeros());
    assert_eq!(shifted.of_atom(0)[1].rij, Vector3::new(0.0, 1.5, 0.0));
}

#[test]
fn test_neighbours_shape_mismatch() {
    let err = NeighbourList::from_flat(2, 0, 1, &[1.0, 0.0, 0.0], &[1, 0], 1.0, 3.0).unwrap_err();
    assert!(err.0.contains("displacement components"));
}

#[test]
fn test_neighbours_invalid_index() {
    let err = NeighbourList::from_flat(1, 1, 1, &[1.0, 0.0, 0.0], &[2], 1.0, 3.0).unwrap_err();
    assert!(err.0.contains("there are only 2 atoms"));

    let err = NeighbourList::from_flat(1, 1, 1, &[1.0, 0.0, 0.0], &[0], 1.0, 3.0).unwrap_err();
    assert!(err.0.contains("its own neighbour"));

    let err = NeighbourList::from_flat(1, 1, 1, &[0.0, 0.0, 0.0], &[1], 1.0, 3.0).unwrap_err();
    assert!(err.0.contains("degenerate"));
}
