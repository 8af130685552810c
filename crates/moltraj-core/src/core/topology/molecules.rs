/// Groups atoms into connected components of the bond graph.
///
/// Returns one molecule id per atom. Ids are dense and numbered in order of
/// first appearance when scanning atoms by ascending index. Bonds that
/// reference atoms outside `0..n_atoms` are ignored.
pub fn assign_molecule_ids(n_atoms: usize, bonds: impl IntoIterator<Item = [usize; 2]>) -> Vec<usize> {
    let mut groups: Vec<usize> = (0..n_atoms).collect();
    for [i, j] in bonds {
        if i >= n_atoms || j >= n_atoms {
            continue;
        }
        let (a, b) = (groups[i], groups[j]);
        if a == b {
            continue;
        }
        let (keep, replace) = (a.min(b), a.max(b));
        for group in groups.iter_mut() {
            if *group == replace {
                *group = keep;
            }
        }
    }

    let mut dense = vec![usize::MAX; n_atoms];
    let mut next = 0;
    groups
        .into_iter()
        .map(|raw| {
            if dense[raw] == usize::MAX {
                dense[raw] = next;
                next += 1;
            }
            dense[raw]
        })
        .collect()
}
