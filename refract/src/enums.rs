//! Built-in enumerations shared by every entity.

use crate::context::Ctx;
use crate::error::ErrorKind;
use serde::Serialize;
use serde_json::Value;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NullsOrder {
    First,
    Last,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    #[default]
    Default,
    Insensitive,
}

/// Enumerations accepted as plain strings in raw input
pub(crate) trait BuiltinEnum: Sized + Copy + PartialEq + 'static {
    const NAME: &'static str;
    const VARIANTS: &'static [(&'static str, Self)];

    fn as_str(&self) -> &'static str {
        Self::VARIANTS
            .iter()
            .find(|(_, v)| v == self)
            .map(|(name, _)| *name)
            .unwrap_or_default()
    }

    fn parse(ctx: &mut Ctx<'_>, value: &Value) -> Option<Self> {
        let Value::String(raw) = value else {
            ctx.type_mismatch(&format!("a {} string", Self::NAME), value);
            return None;
        };
        match Self::VARIANTS.iter().find(|(name, _)| name == raw) {
            Some((_, variant)) => Some(*variant),
            None => {
                let names: Vec<&str> = Self::VARIANTS.iter().map(|(name, _)| *name).collect();
                ctx.report(
                    ErrorKind::EnumDomainViolation,
                    value,
                    format!(
                        "`{}` is not a {}; expected one of {}",
                        raw,
                        Self::NAME,
                        names.join(", ")
                    ),
                );
                None
            }
        }
    }
}

impl BuiltinEnum for SortOrder {
    const NAME: &'static str = "SortOrder";
    const VARIANTS: &'static [(&'static str, Self)] = &[("asc", Self::Asc), ("desc", Self::Desc)];
}

impl BuiltinEnum for NullsOrder {
    const NAME: &'static str = "NullsOrder";
    const VARIANTS: &'static [(&'static str, Self)] =
        &[("first", Self::First), ("last", Self::Last)];
}

impl BuiltinEnum for QueryMode {
    const NAME: &'static str = "QueryMode";
    const VARIANTS: &'static [(&'static str, Self)] = &[
        ("default", Self::Default),
        ("insensitive", Self::Insensitive),
    ];
}
