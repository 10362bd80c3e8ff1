//! Edit scripts between two list snapshots.
//!
//! Items are matched by identity with a longest-common-subsequence pass over
//! the part of both lists that differs; matched items whose content changed
//! become updates, everything else becomes removals and insertions.

/// Identity and content rules for list diffing.
pub trait ItemIdentity {
    /// Whether `self` and `other` represent the same list item.
    fn same_item(&self, other: &Self) -> bool;

    /// Whether an item that is the same must be redrawn.
    fn same_content(&self, other: &Self) -> bool;
}

/// A single step of an edit script.
///
/// Steps are ordered so they can be applied one after another: removals
/// first (highest index first, indices into the old list), then insertions
/// (lowest index first, indices into the new list), then updates (indices
/// into the new list).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Remove(usize),
    Insert(usize),
    Update(usize),
}

pub fn edit_script<T: ItemIdentity>(old: &[T], new: &[T]) -> Vec<Edit> {
    let prefix = old
        .iter()
        .zip(new)
        .take_while(|(a, b)| a.same_item(b))
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a.same_item(b))
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mut matched = Vec::with_capacity(old.len().min(new.len()));
    matched.extend((0..prefix).map(|i| (i, i)));
    matched.extend(
        common_subsequence(old_mid, new_mid)
            .into_iter()
            .map(|(i, j)| (prefix + i, prefix + j)),
    );
    matched.extend((0..suffix).map(|k| (old.len() - suffix + k, new.len() - suffix + k)));

    let mut kept_old = vec![false; old.len()];
    let mut kept_new = vec![false; new.len()];
    for &(i, j) in &matched {
        kept_old[i] = true;
        kept_new[j] = true;
    }

    let mut edits = Vec::new();
    edits.extend(
        (0..old.len())
            .rev()
            .filter(|&i| !kept_old[i])
            .map(Edit::Remove),
    );
    edits.extend((0..new.len()).filter(|&j| !kept_new[j]).map(Edit::Insert));
    edits.extend(
        matched
            .iter()
            .filter(|&&(i, j)| !old[i].same_content(&new[j]))
            .map(|&(_, j)| Edit::Update(j)),
    );

    edits
}

/// Index pairs of a longest common subsequence under `same_item`.
fn common_subsequence<T: ItemIdentity>(old: &[T], new: &[T]) -> Vec<(usize, usize)> {
    let (n, m) = (old.len(), new.len());
    if n == 0 || m == 0 {
        return Vec::new();
    }

    // lengths[i][j] = LCS length of old[i..] and new[j..]
    let mut lengths = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lengths[i][j] = if old[i].same_item(&new[j]) {
                lengths[i + 1][j + 1] + 1
            } else {
                lengths[i + 1][j].max(lengths[i][j + 1])
            };
        }
    }

    let mut pairs = Vec::with_capacity(lengths[0][0]);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i].same_item(&new[j]) {
            pairs.push((i, j));
            i += 1;
            j += 1;
        } else if lengths[i + 1][j] >= lengths[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }

    pairs
}
