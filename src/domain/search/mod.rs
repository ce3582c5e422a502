//! Search domain - result model, backend trait, and ranking policy

mod detail;
mod policy;
mod result;
mod source;

pub use detail::{DetailLookup, DetailRecord};
pub use policy::{ScorePolicy, TieBreak};
pub use result::{KeywordDocument, RawVectorRow, SourceType, VectorResult};
pub use source::{SearchSource, SourceKind, SourceQuery};

#[cfg(test)]
pub use detail::MockDetailLookup;
#[cfg(test)]
pub use source::mock::MockSearchSource;
