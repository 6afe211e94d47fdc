//! Per-column filter grammar.

pub mod list;
pub mod scalar;

pub use list::{ListFilter, ListOp};
pub use scalar::{AggregateFilter, FieldOp, Negation, ScalarFilter};

use crate::context::Ctx;
use crate::model::Field;
use serde_json::Value;

/// Filter on one column, chosen by whether the column is array-valued
#[derive(Debug, Clone, PartialEq)]
pub enum FieldFilter {
    Scalar(ScalarFilter),
    List(ListFilter),
}

pub(crate) fn parse_field_filter(
    ctx: &mut Ctx<'_>,
    field: &Field,
    value: &Value,
) -> Option<FieldFilter> {
    if field.list {
        list::parse(ctx, field, value).map(FieldFilter::List)
    } else {
        scalar::parse(ctx, scalar::ScalarSpec::of(field), value).map(FieldFilter::Scalar)
    }
}
