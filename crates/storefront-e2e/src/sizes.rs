//! Size codes offered by the storefront's filter.

use crate::result::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Filterable size, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Size {
    /// Extra small
    XS,
    /// Small
    S,
    /// Medium
    M,
    /// Medium-large
    ML,
    /// Large
    L,
    /// Extra large
    XL,
    /// Double extra large
    XXL,
}

impl Size {
    /// Every size, in display order
    pub const ALL: [Self; 7] = [
        Self::XS,
        Self::S,
        Self::M,
        Self::ML,
        Self::L,
        Self::XL,
        Self::XXL,
    ];

    /// Checkbox value / label text
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::XS => "XS",
            Self::S => "S",
            Self::M => "M",
            Self::ML => "ML",
            Self::L => "L",
            Self::XL => "XL",
            Self::XXL => "XXL",
        }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Size {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|size| size.code() == s.trim())
            .ok_or_else(|| StoreError::parse("size code", s))
    }
}

/// Set of sizes, e.g. the checked filters
pub type SizeSet = BTreeSet<Size>;

/// Build a size set from codes
pub fn size_set<'a>(codes: impl IntoIterator<Item = &'a str>) -> Result<SizeSet, StoreError> {
    codes.into_iter().map(str::parse).collect()
}
