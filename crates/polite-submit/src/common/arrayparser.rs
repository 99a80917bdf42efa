use crate::common::arraydef::IntRange;
use crate::common::parser::{NomResult, consume_all, p_u32};
use anyhow::anyhow;
use nom::character::complete::{char, space0};
use nom::combinator::{map_res, opt};
use nom::sequence::{delimited, preceded, tuple};

/// Parse integer range in the format n[-end].
fn p_range(input: &str) -> NomResult<IntRange> {
    map_res(
        delimited(
            space0,
            tuple((p_u32, opt(preceded(char('-'), p_u32)))),
            space0,
        ),
        |parsed| match parsed {
            (start, None) => Ok(IntRange::new(start, 1)),
            (start, Some(end)) if end >= start && end - start < u32::MAX => {
                Ok(IntRange::from_bounds(start, end))
            }
            (start, Some(end)) => Err(anyhow!("Invalid range {start}-{end}")),
        },
    )(input)
}

/// Parses an array range in the format `<start>[-<end>]`, e.g. `0-99` or `5`.
pub fn parse_array_range(input: &str) -> anyhow::Result<IntRange> {
    consume_all(p_range, input)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_single_index() {
        let range = parse_array_range("34").unwrap();
        assert_eq!(range.iter().collect::<Vec<_>>(), vec![34]);
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(
            parse_array_range("34-40").unwrap().iter().collect::<Vec<_>>(),
            vec![34, 35, 36, 37, 38, 39, 40]
        );
        assert_eq!(
            parse_array_range("101-101").unwrap(),
            IntRange::new(101, 1)
        );
        assert_eq!(parse_array_range(" 0-99 ").unwrap(), IntRange::new(0, 100));
    }

    #[test]
    fn test_parse_range_error() {
        assert!(parse_array_range("101-100").is_err());
        assert!(parse_array_range("").is_err());
        assert!(parse_array_range("1-").is_err());
        assert!(parse_array_range("x-5").is_err());
        assert!(parse_array_range("0-10:2").is_err());
    }
}
