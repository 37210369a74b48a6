pub mod filter;
pub mod period;

pub use filter::{
    apply_filters, available_creators, available_identifiers, FilterSpec, StatusFilter,
};
pub use period::{available_months, filter_by_month, MonthFilter};
