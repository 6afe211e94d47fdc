use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Process-wide validation settings, frozen together with the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SchemaOptions {
    /// Maximum nesting of recursive inputs (predicates, nested writes, nested reads)
    pub max_depth: usize,
    /// Whether string filters accept `mode: "insensitive"`
    pub insensitive_mode: bool,
    /// Upper bound on the absolute value of `take`
    pub max_take: Option<u64>,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            insensitive_mode: true,
            max_take: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults_fill_missing_keys() {
        let options: SchemaOptions = serde_json::from_str(r#"{ "maxTake": 100 }"#).unwrap();
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
        assert!(options.insensitive_mode);
        assert_eq!(options.max_take, Some(100));
    }

    #[test]
    fn test_options_reject_unknown_keys() {
        let parsed = serde_json::from_str::<SchemaOptions>(r#"{ "maxDepht": 3 }"#);
        assert!(parsed.is_err());
    }
}
