//! Column names used across the Olist exports and the derived fact table,
//! plus helpers that pull typed vectors out of a DataFrame.

use chrono::NaiveDate;
use polars::prelude::*;

pub const ORDER_ID: &str = "order_id";
pub const CUSTOMER_ID: &str = "customer_id";
pub const PURCHASE_TS: &str = "order_purchase_timestamp";
pub const DELIVERED_TS: &str = "order_delivered_customer_date";
pub const ESTIMATED_TS: &str = "order_estimated_delivery_date";

pub const PAYMENT_TYPE: &str = "payment_type";
pub const PAYMENT_VALUE: &str = "payment_value";

pub const PRODUCT_ID: &str = "product_id";
pub const PRODUCT_CATEGORY: &str = "product_category_name";

pub const REVIEW_SCORE: &str = "review_score";

pub const CUSTOMER_ZIP: &str = "customer_zip_code_prefix";
pub const GEO_ZIP: &str = "geolocation_zip_code_prefix";
pub const GEO_STATE: &str = "geolocation_state";

// Derived
pub const MONTH: &str = "month";
pub const REVENUE: &str = "revenue";

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Column values as optional strings (non-string columns are cast).
pub fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let casted = df.column(name)?.cast(&DataType::String)?;
    let ca = casted.str()?;
    Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Column values coerced to f64; unparsable entries become `None`.
pub fn f64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    // `cast` is non-strict: "abc" becomes null rather than an error.
    let casted = df.column(name)?.cast(&DataType::Float64)?;
    let ca = casted.f64()?;
    Ok(ca.into_iter().collect())
}

pub fn i64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i64>>> {
    let casted = df.column(name)?.cast(&DataType::Int64)?;
    let ca = casted.i64()?;
    Ok(ca.into_iter().collect())
}

/// Date column values (physical days since epoch) as calendar dates.
pub fn date_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<NaiveDate>>> {
    let casted = df.column(name)?.cast(&DataType::Int32)?;
    let ca = casted.i32()?;
    Ok(ca
        .into_iter()
        .map(|days| days.and_then(crate::data::time::date_from_epoch_days))
        .collect())
}
