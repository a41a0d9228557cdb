use utils::zip;

#[test]
fn flat_tuples() {
    let pos = [[0.0, 1.0, 0.0], [1.0, 1.0, 0.0], [2.0, 1.0, 0.0]];
    let vel = vec![[0.0, -1.0, 0.0]; 3];
    let inv_mass = [1.0, 0.0, 0.5];
    let dt = 0.5;

    let predicted: Vec<[f64; 3]> = zip!(pos.iter(), vel.iter(), inv_mass.iter())
        .map(|(x, v, &w)| {
            if w == 0.0 {
                *x
            } else {
                [x[0] + dt * v[0], x[1] + dt * v[1], x[2] + dt * v[2]]
            }
        })
        .collect();

    assert_eq!(
        predicted,
        vec![[0.0, 0.5, 0.0], [1.0, 1.0, 0.0], [2.0, 0.5, 0.0]]
    );
}

#[test]
fn shortest_wins() {
    let ids = [0usize, 1, 2, 3];
    let names = ["a", "b"];
    let flags = vec![true, false, true];
    let weights = [0.5, 0.25, 0.125, 0.0625];
    let all: Vec<_> = zip!(&ids, &names, &flags, &weights).collect();
    assert_eq!(all, vec![(&0, &"a", &true, &0.5), (&1, &"b", &false, &0.25)]);

    // Single and trailing comma forms.
    assert_eq!(zip!(ids.iter(),).count(), 4);
    assert_eq!(zip!(&ids, &names).count(), 2);
}
