/// Zip up to four iterables into an iterator over flat tuples.
///
/// `zip!(a, b, c)` yields `(a_i, b_i, c_i)` instead of the nested `((a_i, b_i), c_i)` produced
/// by chaining `Iterator::zip`. Arguments may be anything implementing `IntoIterator`, so
/// slices and `Vec`s can be passed directly.
#[macro_export]
macro_rules! zip {
    ($a:expr $(,)?) => {
        ::std::iter::IntoIterator::into_iter($a)
    };
    ($a:expr, $b:expr $(,)?) => {
        ::std::iter::IntoIterator::into_iter($a).zip($b)
    };
    ($a:expr, $b:expr, $c:expr $(,)?) => {
        ::std::iter::IntoIterator::into_iter($a)
            .zip($b)
            .zip($c)
            .map(|((a, b), c)| (a, b, c))
    };
    ($a:expr, $b:expr, $c:expr, $d:expr $(,)?) => {
        ::std::iter::IntoIterator::into_iter($a)
            .zip($b)
            .zip($c)
            .zip($d)
            .map(|(((a, b), c), d)| (a, b, c, d))
    };
}
