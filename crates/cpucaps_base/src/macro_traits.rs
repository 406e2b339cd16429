//! Contains traits implemented by the cpucaps derive macros


/// Trait to get the number of elements in an enum
pub trait EnumCountT {
    /// Count or number of element in an enum
    const COUNT : usize;
}

/// Trait to get an enum from a given index
pub trait EnumFromIndexT: Sized {
    /// Try to convert an index to an enum
    fn from_idx(idx: usize) -> Option<Self>;

    /// Try to convert an index to an enum, if it couldn't convert it, return a default value
    fn from_idx_or(idx: usize, default: Self) -> Self;

    /// Get the index of the variant, this is the inverse of [`EnumFromIndexT::from_idx`]
    fn to_idx(self) -> usize;
}

pub trait EnumFromNameT: Sized {
    /// Try to parse the enum from a string slice, matching the variant's `parse_name`.
    fn parse(s: &str) -> Option<Self>;

    /// Get the name the variant would be parsed from.
    fn parse_name(&self) -> &'static str;
}
