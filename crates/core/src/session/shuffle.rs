use rand::Rng;
use rand::seq::SliceRandom;

/// Return a uniformly shuffled copy of `items`, leaving the input untouched.
///
/// `SliceRandom::shuffle` performs a Fisher–Yates pass over the copy.
#[must_use]
pub fn shuffled<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    out.shuffle(rng);
    out
}
