//! Parameterized query construction.
//!
//! Values always travel as bound parameters; request input is never spliced
//! into SQL text.

mod builder;
mod filters;
mod fragment;

pub use builder::{DateRange, FilterQueryBuilder, Page, Predicate, end_of_day};
pub use filters::{
    ConceptFilter, ConditionFilter, DeathFilter, DrugFilter, EntitySearch, PersonFilter,
    SearchEntity, VisitFilter,
};
pub use fragment::{DATE_FORMAT, SqlFragment, SqlParam, TIMESTAMP_FORMAT};
