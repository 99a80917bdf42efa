use std::borrow::Cow;

/// Return the input string with an added "s" at the end unless `count` is exactly one.
pub fn pluralize(value: &str, count: usize) -> Cow<'_, str> {
    if count == 1 {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(format!("{value}s"))
    }
}

#[cfg(test)]
mod tests {
    use crate::common::utils::str::pluralize;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("job", 0), "jobs");
        assert_eq!(pluralize("job", 1), "job");
        assert_eq!(pluralize("chunk", 10), "chunks");
    }
}
