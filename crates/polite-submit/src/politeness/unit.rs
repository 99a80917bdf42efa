use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use serde::Serialize;

use crate::common::arraydef::IntRange;

/// A single `sbatch` invocation: a script, optionally restricted to a slice of array indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionUnit {
    pub payload: PathBuf,
    pub array_slice: Option<IntRange>,
}

impl SubmissionUnit {
    pub fn script(payload: PathBuf) -> Self {
        Self {
            payload,
            array_slice: None,
        }
    }

    pub fn array_chunk(payload: PathBuf, slice: IntRange) -> Self {
        Self {
            payload,
            array_slice: Some(slice),
        }
    }
}

impl Display for SubmissionUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.array_slice {
            Some(slice) => write!(f, "{} [{}]", self.payload.display(), slice),
            None => write!(f, "{}", self.payload.display()),
        }
    }
}

/// One unit per script, in the given order.
pub fn units_from_scripts(scripts: Vec<PathBuf>) -> Vec<SubmissionUnit> {
    scripts.into_iter().map(SubmissionUnit::script).collect()
}

/// Splits an array job into units that cover at most `chunk_size` indices each.
pub fn units_from_array(
    script: PathBuf,
    range: IntRange,
    chunk_size: u32,
) -> Vec<SubmissionUnit> {
    range
        .chunks(chunk_size.max(1))
        .map(|slice| SubmissionUnit::array_chunk(script.clone(), slice))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::common::arraydef::IntRange;
    use crate::politeness::unit::{SubmissionUnit, units_from_array, units_from_scripts};

    #[test]
    fn scripts_keep_order() {
        let units = units_from_scripts(vec!["b.sh".into(), "a.sh".into()]);
        assert_eq!(
            units,
            vec![
                SubmissionUnit::script("b.sh".into()),
                SubmissionUnit::script("a.sh".into())
            ]
        );
    }

    #[test]
    fn array_chunks() {
        let units = units_from_array("job.sh".into(), IntRange::from_bounds(0, 99), 10);
        assert_eq!(units.len(), 10);
        for (index, unit) in units.iter().enumerate() {
            let index = index as u32;
            assert_eq!(unit.payload, PathBuf::from("job.sh"));
            assert_eq!(
                unit.array_slice,
                Some(IntRange::from_bounds(index * 10, index * 10 + 9))
            );
        }
    }

    #[test]
    fn array_last_chunk_is_shorter() {
        let units = units_from_array("job.sh".into(), IntRange::from_bounds(1, 25), 10);
        let slices: Vec<_> = units
            .iter()
            .map(|u| u.array_slice.unwrap().to_string())
            .collect();
        assert_eq!(slices, vec!["1-10", "11-20", "21-25"]);
    }

    #[test]
    fn array_chunk_larger_than_range() {
        let units = units_from_array("job.sh".into(), IntRange::from_bounds(3, 5), 100);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].to_string(), "job.sh [3-5]");
    }

    #[test]
    fn script_display() {
        assert_eq!(
            SubmissionUnit::script("dir/job.sh".into()).to_string(),
            "dir/job.sh"
        );
    }
}
