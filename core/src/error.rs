use thiserror::Error;

// Every failure is detected before any cell is written.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TerrainError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("n_power {n_power} exceeds the maximum of {max}")]
    SizeLimitExceeded { n_power: u32, max: u32 },

    #[error("heightmap has {actual} cells but {width}x{height} declares {expected}")]
    DimensionMismatch {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, TerrainError>;

impl TerrainError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        TerrainError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

// Check that a flat buffer really holds width×height cells
pub(crate) fn check_dimensions(len: usize, width: usize, height: usize) -> Result<()> {
    if width == 0 {
        return Err(TerrainError::invalid("width", "must be greater than 0"));
    }
    if height == 0 {
        return Err(TerrainError::invalid("height", "must be greater than 0"));
    }
    let expected = width.saturating_mul(height);
    if expected != len {
        return Err(TerrainError::DimensionMismatch {
            width,
            height,
            expected,
            actual: len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{TerrainError, check_dimensions};

    #[test]
    fn dimensions_match() {
        assert!(check_dimensions(12, 4, 3).is_ok());
    }

    #[test]
    fn dimensions_mismatch_reports_counts() {
        let err = check_dimensions(10, 4, 3).unwrap_err();
        assert_eq!(
            err,
            TerrainError::DimensionMismatch {
                width: 4,
                height: 3,
                expected: 12,
                actual: 10,
            }
        );
    }

    #[test]
    fn zero_width_is_invalid() {
        assert!(matches!(
            check_dimensions(0, 0, 3),
            Err(TerrainError::InvalidParameter { name: "width", .. })
        ));
    }
}
