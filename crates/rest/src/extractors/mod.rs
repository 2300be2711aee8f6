//! Request parameter extraction.
//!
//! - [`SearchParams`] - query parameters of the search endpoints

mod search_params;

pub use search_params::{
    ParamError, RANGE_SEPARATOR, SearchParams, parse_date, parse_date_range, parse_id,
};
