use flexstr::SharedStr as FlexStr;

// join at most max_items items for an error message, with a count of
// whatever was left out
pub fn sample_join<'a, I>(items: I, max_items: usize, connector: &str) -> String
    where I: IntoIterator<Item = &'a FlexStr>
{
    let mut iter = items.into_iter();
    let mut result =
        itertools::join(iter.by_ref().take(max_items).map(FlexStr::as_ref),
                        connector);
    let left_out = iter.count();

    if left_out > 0 {
        result.push_str(&format!(" ({} more)", left_out));
    }

    result
}
